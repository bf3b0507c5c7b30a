//! Purpose: Public boundary for talking to the spy cat service and the breed directory.
//! Exports: Gateway trait and implementations, breed cache, core types and errors.
//! Role: Controllers and the CLI import remote-facing types only from here.
//! Invariants: HTTP details never leak past this module; callers see `Error` kinds.
//! Invariants: Additive-only surface.

mod breeds;
mod client;
mod memory;
mod remote;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::cat::{BreedOption, EXPERIENCE_MAX, EXPERIENCE_MIN, SpyCat, SpyCatInput};
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::fields::FieldErrors;
pub use breeds::{BreedCache, BreedSource, DEFAULT_BREEDS_URL, HttpBreedSource};
pub use client::{ApiResult, SpyCatGateway};
pub use memory::MemoryGateway;
pub use remote::RemoteGateway;
