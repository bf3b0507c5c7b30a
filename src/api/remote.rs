//! Purpose: HTTP gateway for the `/cats/spycats/` resource family.
//! Exports: `RemoteGateway`.
//! Role: Blocking JSON client; the only place HTTP statuses are interpreted.
//! Invariants: 400 + JSON object body (not a detail envelope) => `Validation` with field map.
//! Invariants: 404 => `NotFound`; every other failure => `RequestFailed` with status/body when known.
//! Invariants: Resource URLs keep the base path prefix and always end with a slash.
#![allow(clippy::result_large_err)]

use super::client::{ApiResult, SpyCatGateway};
use crate::core::cat::{SpyCat, SpyCatInput};
use crate::core::error::{Error, ErrorKind};
use crate::core::fields::FieldErrors;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

const COLLECTION: [&str; 2] = ["cats", "spycats"];

#[derive(Clone)]
pub struct RemoteGateway {
    inner: Arc<RemoteGatewayInner>,
}

struct RemoteGatewayInner {
    base_url: Url,
    agent: ureq::Agent,
}

#[derive(Serialize)]
struct SalaryUpdateRequest {
    salary: f64,
}

impl RemoteGateway {
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let agent = ureq::AgentBuilder::new().build();
        Ok(Self {
            inner: Arc::new(RemoteGatewayInner { base_url, agent }),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.agent = agent;
        } else {
            self.inner = Arc::new(RemoteGatewayInner {
                base_url: self.inner.base_url.clone(),
                agent,
            });
        }
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn collection_url(&self) -> ApiResult<Url> {
        build_url(&self.inner.base_url, &COLLECTION)
    }

    fn item_url(&self, id: u64) -> ApiResult<Url> {
        let id = id.to_string();
        build_url(&self.inner.base_url, &[COLLECTION[0], COLLECTION[1], &id])
    }

    fn send<T>(&self, method: &str, url: &Url, body: Option<&T>) -> ApiResult<ureq::Response>
    where
        T: Serialize,
    {
        let request = self
            .inner
            .agent
            .request(method, url.as_str())
            .set("Accept", "application/json");
        let response = match body {
            None => request.call(),
            Some(body) => {
                let payload = serde_json::to_string(body).map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to encode request json")
                        .with_source(err)
                })?;
                request
                    .set("Content-Type", "application/json")
                    .send_string(&payload)
            }
        };

        match response {
            Ok(resp) => {
                debug!(method, url = %url, status = resp.status(), "spy cat request");
                Ok(resp)
            }
            Err(ureq::Error::Status(code, resp)) => {
                debug!(method, url = %url, status = code, "spy cat request rejected");
                Err(parse_error_response(code, resp))
            }
            Err(ureq::Error::Transport(err)) => {
                debug!(method, url = %url, error = %err, "spy cat request failed");
                Err(Error::new(ErrorKind::RequestFailed)
                    .with_message("request failed")
                    .with_hint(format!(
                        "Check that the API at {} is reachable.",
                        self.inner.base_url
                    ))
                    .with_source(err))
            }
        }
    }
}

impl SpyCatGateway for RemoteGateway {
    fn list(&self) -> ApiResult<Vec<SpyCat>> {
        let url = self.collection_url()?;
        let response = self.send::<()>("GET", &url, None)?;
        read_json_response(response)
    }

    fn create(&self, input: &SpyCatInput) -> ApiResult<SpyCat> {
        let url = self.collection_url()?;
        let response = self.send("POST", &url, Some(input))?;
        read_json_response(response)
    }

    fn update_salary(&self, id: u64, salary: f64) -> ApiResult<SpyCat> {
        let url = self.item_url(id)?;
        let payload = SalaryUpdateRequest { salary };
        let response = self.send("PATCH", &url, Some(&payload))?;
        read_json_response(response)
    }

    fn delete(&self, id: u64) -> ApiResult<()> {
        let url = self.item_url(id)?;
        // 200 may carry a body and 204 carries none; neither is inspected.
        self.send::<()>("DELETE", &url, None)?;
        Ok(())
    }
}

pub(crate) fn normalize_base_url(raw: String) -> ApiResult<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("api base url is empty")
            .with_hint("Pass --api-url or set SPYCATS_API_BASE_URL."));
    }
    let mut url = Url::parse(trimmed).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid api base url")
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(
            Error::new(ErrorKind::Usage).with_message("api base url must use http or https scheme")
        );
    }
    if url.cannot_be_a_base() {
        return Err(Error::new(ErrorKind::Usage).with_message("api base url cannot be a base"));
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

pub(crate) fn build_url(base_url: &Url, segments: &[&str]) -> ApiResult<Url> {
    let mut url = base_url.clone();
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| Error::new(ErrorKind::Usage).with_message("api base url cannot be a base"))?;
        path.pop_if_empty();
        for segment in segments {
            path.push(segment);
        }
        path.push("");
    }
    Ok(url)
}

fn read_json_response<R>(response: ureq::Response) -> ApiResult<R>
where
    R: DeserializeOwned,
{
    let status = response.status();
    let body = response.into_string().map_err(|err| {
        Error::new(ErrorKind::RequestFailed)
            .with_message("failed to read response body")
            .with_status(status)
            .with_source(err)
    })?;
    serde_json::from_str(&body).map_err(|err| {
        Error::new(ErrorKind::RequestFailed)
            .with_message("invalid response json")
            .with_status(status)
            .with_body(body)
            .with_source(err)
    })
}

fn parse_error_response(status: u16, response: ureq::Response) -> Error {
    let status_text = response.status_text().trim().to_string();
    let body = response.into_string().unwrap_or_default();
    decode_error_body(status, &status_text, body)
}

pub(crate) fn decode_error_body(status: u16, status_text: &str, body: String) -> Error {
    let value = serde_json::from_str::<Value>(&body).ok();
    let detail = value.as_ref().and_then(envelope_message);
    let message = detail
        .or_else(|| (!status_text.is_empty()).then(|| status_text.to_string()))
        .unwrap_or_else(|| "Request failed".to_string());

    let fields = match status {
        400 => value.as_ref().and_then(field_map),
        _ => None,
    };
    let err = match (status, fields) {
        (404, _) => Error::new(ErrorKind::NotFound).with_message(message),
        (_, Some(fields)) => Error::validation(fields).with_message(message),
        _ => Error::new(ErrorKind::RequestFailed).with_message(message),
    };
    let err = err.with_status(status);
    if body.is_empty() { err } else { err.with_body(body) }
}

// Field keys survive next to a `detail` envelope; a 400 with no field keys is not a rejection.
fn field_map(value: &Value) -> Option<FieldErrors> {
    let object = value.as_object()?;
    let rest: serde_json::Map<String, Value> = object
        .iter()
        .filter(|(key, message)| !(is_envelope_key(key) && message.is_string()))
        .map(|(key, message)| (key.clone(), message.clone()))
        .collect();
    FieldErrors::from_json(&Value::Object(rest)).filter(|fields| !fields.is_empty())
}

fn is_envelope_key(key: &str) -> bool {
    key == "detail" || key == "error"
}

fn envelope_message(value: &Value) -> Option<String> {
    ["detail", "error"].iter().find_map(|key| {
        value
            .get(key)
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    })
}

#[cfg(test)]
mod tests {
    use super::{RemoteGateway, build_url, decode_error_body, normalize_base_url};
    use crate::core::error::ErrorKind;

    #[test]
    fn normalize_base_url_keeps_path_prefix() {
        let url = normalize_base_url("http://localhost:8000/api?x=1#top".to_string()).expect("url");
        assert_eq!(url.as_str(), "http://localhost:8000/api");
    }

    #[test]
    fn normalize_base_url_rejects_other_schemes() {
        let err = normalize_base_url("ftp://localhost".to_string()).expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
        let err = normalize_base_url("   ".to_string()).expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn resource_urls_end_with_slash() {
        let base = normalize_base_url("http://localhost:8000".to_string()).expect("url");
        let url = build_url(&base, &["cats", "spycats"]).expect("url");
        assert_eq!(url.as_str(), "http://localhost:8000/cats/spycats/");

        let base = normalize_base_url("http://localhost:8000/api/".to_string()).expect("url");
        let url = build_url(&base, &["cats", "spycats", "12"]).expect("url");
        assert_eq!(url.as_str(), "http://localhost:8000/api/cats/spycats/12/");
    }

    #[test]
    fn gateway_item_url_uses_id() {
        let gateway = RemoteGateway::new("http://127.0.0.1:8000").expect("gateway");
        assert_eq!(
            gateway.item_url(5).expect("url").as_str(),
            "http://127.0.0.1:8000/cats/spycats/5/"
        );
    }

    #[test]
    fn bad_request_with_field_map_is_validation() {
        let body = r#"{"experience":["Ensure this value is less than or equal to 15."]}"#;
        let err = decode_error_body(400, "Bad Request", body.to_string());
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.body(), Some(body));
        let fields = err.fields().expect("fields");
        assert!(fields.contains("experience"));
        assert_eq!(err.message(), Some("Bad Request"));
    }

    #[test]
    fn bad_request_with_detail_is_request_failed() {
        let err = decode_error_body(400, "Bad Request", r#"{"detail":"JSON parse error"}"#.into());
        assert_eq!(err.kind(), ErrorKind::RequestFailed);
        assert_eq!(err.message(), Some("JSON parse error"));
    }

    #[test]
    fn bad_request_with_detail_and_fields_keeps_the_fields() {
        let body = r#"{"detail":"Invalid input.","salary":["A valid number is required."]}"#;
        let err = decode_error_body(400, "Bad Request", body.to_string());
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.message(), Some("Invalid input."));
        let fields = err.fields().expect("fields");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.joined("salary").as_deref(), Some("A valid number is required."));
    }

    #[test]
    fn bad_request_with_text_body_is_request_failed() {
        let err = decode_error_body(400, "Bad Request", "nope".into());
        assert_eq!(err.kind(), ErrorKind::RequestFailed);
        assert_eq!(err.status(), Some(400));
        assert!(err.fields().is_none());
    }

    #[test]
    fn not_found_uses_detail_message() {
        let err = decode_error_body(404, "Not Found", r#"{"detail":"Not found."}"#.into());
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.message(), Some("Not found."));
    }

    #[test]
    fn server_error_falls_back_to_status_text_then_generic() {
        let err = decode_error_body(502, "Bad Gateway", String::new());
        assert_eq!(err.kind(), ErrorKind::RequestFailed);
        assert_eq!(err.message(), Some("Bad Gateway"));
        assert!(err.body().is_none());

        let err = decode_error_body(500, "", "<html>".into());
        assert_eq!(err.message(), Some("Request failed"));
        assert_eq!(err.body(), Some("<html>"));
    }

    #[test]
    fn error_envelope_field_is_used_when_detail_is_missing() {
        let err = decode_error_body(503, "Service Unavailable", r#"{"error":"maintenance"}"#.into());
        assert_eq!(err.message(), Some("maintenance"));
    }
}
