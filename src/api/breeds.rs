//! Purpose: Fetch and cache the external breed directory for form validation and suggestions.
//! Exports: `BreedSource`, `HttpBreedSource`, `BreedCache`, `DEFAULT_BREEDS_URL`.
//! Role: Component-owned, process-lifetime cache with an explicit init/invalidate lifecycle.
//! Invariants: At most one fetch is in flight; concurrent callers wait behind it.
//! Invariants: Failures are never cached; the next call retries the fetch.
//! Invariants: Every caller after a successful fetch observes the identical `Arc` slice.
#![allow(clippy::result_large_err)]

use super::client::ApiResult;
use crate::core::cat::BreedOption;
use crate::core::error::{Error, ErrorKind};
use serde::Deserialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, TryLockError};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_BREEDS_URL: &str = "https://api.thecatapi.com/v1/breeds";

const UNAVAILABLE_MESSAGE: &str = "Failed to load cat breeds from TheCatAPI.";
const BREEDS_URL_HINT: &str = "Pass --breeds-url or set SPYCATS_BREEDS_URL.";

/// Anything that can produce the full breed list in one call.
pub trait BreedSource {
    fn fetch_breeds(&self) -> ApiResult<Vec<BreedOption>>;
}

impl<S: BreedSource + ?Sized> BreedSource for Arc<S> {
    fn fetch_breeds(&self) -> ApiResult<Vec<BreedOption>> {
        (**self).fetch_breeds()
    }
}

#[derive(Clone)]
pub struct HttpBreedSource {
    url: Url,
    agent: ureq::Agent,
}

#[derive(Deserialize)]
struct RawBreed {
    id: Value,
    name: String,
}

impl HttpBreedSource {
    pub fn new(url: impl Into<String>) -> ApiResult<Self> {
        let url = parse_breeds_url(&url.into())?;
        Ok(Self {
            url,
            agent: ureq::AgentBuilder::new().build(),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::AgentBuilder::new().timeout(timeout).build();
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl BreedSource for HttpBreedSource {
    fn fetch_breeds(&self) -> ApiResult<Vec<BreedOption>> {
        let response = self
            .agent
            .get(self.url.as_str())
            .set("Accept", "application/json")
            .call();
        let response = match response {
            Ok(resp) => resp,
            Err(ureq::Error::Status(code, _)) => {
                return Err(Error::new(ErrorKind::DirectoryUnavailable)
                    .with_message(UNAVAILABLE_MESSAGE)
                    .with_status(code));
            }
            Err(ureq::Error::Transport(err)) => {
                return Err(Error::new(ErrorKind::DirectoryUnavailable)
                    .with_message(UNAVAILABLE_MESSAGE)
                    .with_source(err));
            }
        };
        let body = response.into_string().map_err(|err| {
            Error::new(ErrorKind::DirectoryUnavailable)
                .with_message(UNAVAILABLE_MESSAGE)
                .with_source(err)
        })?;
        let raw: Vec<RawBreed> = serde_json::from_str(&body).map_err(|err| {
            Error::new(ErrorKind::DirectoryUnavailable)
                .with_message(UNAVAILABLE_MESSAGE)
                .with_hint("The breed directory returned an unexpected body.")
                .with_source(err)
        })?;
        Ok(raw.into_iter().map(breed_from_raw).collect())
    }
}

/// Query parameters such as an API key are part of the directory address and are kept.
fn parse_breeds_url(raw: &str) -> ApiResult<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("breeds url is empty")
            .with_hint(BREEDS_URL_HINT));
    }
    let mut url = Url::parse(trimmed).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid breeds url")
            .with_hint(BREEDS_URL_HINT)
            .with_source(err)
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("breeds url must use http or https scheme")
            .with_hint(BREEDS_URL_HINT));
    }
    url.set_fragment(None);
    Ok(url)
}

fn breed_from_raw(raw: RawBreed) -> BreedOption {
    let id = match raw.id {
        Value::String(id) => id,
        other => other.to_string(),
    };
    BreedOption { id, name: raw.name }
}

pub struct BreedCache<S> {
    source: S,
    slot: Mutex<Option<Arc<[BreedOption]>>>,
    fetches: AtomicU64,
}

impl<S: BreedSource> BreedCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            slot: Mutex::new(None),
            fetches: AtomicU64::new(0),
        }
    }

    /// Returns the cached list, fetching it first if this is the first successful call.
    pub fn get_breeds(&self) -> ApiResult<Arc<[BreedOption]>> {
        // The lock is held across the fetch so concurrent callers share its result.
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(breeds) = slot.as_ref() {
            return Ok(Arc::clone(breeds));
        }

        let attempt = self.fetches.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(attempt, "fetching breed directory");
        match self.source.fetch_breeds() {
            Ok(breeds) => {
                let breeds: Arc<[BreedOption]> = breeds.into();
                debug!(count = breeds.len(), "breed directory cached");
                *slot = Some(Arc::clone(&breeds));
                Ok(breeds)
            }
            Err(err) => {
                warn!(error = %err, "breed directory unavailable");
                Err(unavailable(err))
            }
        }
    }

    /// Eagerly warms the cache.
    pub fn init(&self) -> ApiResult<()> {
        self.get_breeds().map(|_| ())
    }

    /// Cached list if present; never fetches and never waits on an in-flight fetch.
    pub fn peek(&self) -> Option<Arc<[BreedOption]>> {
        match self.slot.try_lock() {
            Ok(slot) => slot.clone(),
            Err(TryLockError::Poisoned(poison)) => poison.into_inner().clone(),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    pub fn invalidate(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
    }

    /// Number of fetches issued to the source, successful or not.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }
}

fn unavailable(err: Error) -> Error {
    if err.kind() == ErrorKind::DirectoryUnavailable {
        return err;
    }
    let message = err.message().unwrap_or(UNAVAILABLE_MESSAGE).to_string();
    Error::new(ErrorKind::DirectoryUnavailable)
        .with_message(message)
        .with_source(err)
}
