//! Purpose: Define the gateway seam every controller talks through.
//! Exports: `ApiResult`, `SpyCatGateway`.
//! Role: Lets the dashboard run against HTTP, in-memory, or test gateways alike.
//! Invariants: Implementations hold no entity state the caller can observe between calls.
//! Invariants: Failures are already decoded into an `ErrorKind` when they reach callers.
#![allow(clippy::result_large_err)]

use crate::core::cat::{SpyCat, SpyCatInput};
use crate::core::error::Error;
use std::sync::Arc;

pub type ApiResult<T> = Result<T, Error>;

/// The four remote operations on the spy cat collection.
///
/// `list` is never cached: each call is a fresh read of server state.
/// `update_salary` and `delete` report `ErrorKind::NotFound` for ids the
/// service no longer has; `create` and `update_salary` report
/// `ErrorKind::Validation` with the service's field map on rejection.
pub trait SpyCatGateway {
    fn list(&self) -> ApiResult<Vec<SpyCat>>;

    fn create(&self, input: &SpyCatInput) -> ApiResult<SpyCat>;

    fn update_salary(&self, id: u64, salary: f64) -> ApiResult<SpyCat>;

    fn delete(&self, id: u64) -> ApiResult<()>;
}

impl<G: SpyCatGateway + ?Sized> SpyCatGateway for &G {
    fn list(&self) -> ApiResult<Vec<SpyCat>> {
        (**self).list()
    }

    fn create(&self, input: &SpyCatInput) -> ApiResult<SpyCat> {
        (**self).create(input)
    }

    fn update_salary(&self, id: u64, salary: f64) -> ApiResult<SpyCat> {
        (**self).update_salary(id, salary)
    }

    fn delete(&self, id: u64) -> ApiResult<()> {
        (**self).delete(id)
    }
}

impl<G: SpyCatGateway + ?Sized> SpyCatGateway for Arc<G> {
    fn list(&self) -> ApiResult<Vec<SpyCat>> {
        (**self).list()
    }

    fn create(&self, input: &SpyCatInput) -> ApiResult<SpyCat> {
        (**self).create(input)
    }

    fn update_salary(&self, id: u64, salary: f64) -> ApiResult<SpyCat> {
        (**self).update_salary(id, salary)
    }

    fn delete(&self, id: u64) -> ApiResult<()> {
        (**self).delete(id)
    }
}
