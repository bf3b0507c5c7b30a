//! Purpose: In-memory spy cat store that answers like the remote service does.
//! Exports: `MemoryGateway`.
//! Role: Backs the development server and drives controllers in tests without HTTP.
//! Invariants: Ids start at 1, ascend, and are never reused after delete.
//! Invariants: Rejections use the remote field-map shape and messages.
//! Invariants: Only `salary` is writable after create.
#![allow(clippy::result_large_err)]

use super::client::{ApiResult, SpyCatGateway};
use crate::core::cat::{EXPERIENCE_MAX, EXPERIENCE_MIN, SpyCat, SpyCatInput};
use crate::core::error::{Error, ErrorKind};
use crate::core::fields::FieldErrors;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";
const NOT_A_STRING: &str = "Not a valid string.";
const NOT_AN_INTEGER: &str = "A valid integer is required.";
const NOT_A_NUMBER: &str = "A valid number is required.";

#[derive(Default)]
pub struct MemoryGateway {
    state: Mutex<MemoryState>,
    known_breeds: Option<Vec<String>>,
    requests: AtomicUsize,
}

#[derive(Default)]
struct MemoryState {
    last_id: u64,
    cats: BTreeMap<u64, SpyCat>,
    fail_next: Option<Error>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts `breed` on create to the given names.
    pub fn with_known_breeds<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_breeds = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Number of gateway operations served so far, including rejected ones.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Makes the next operation fail with `err` instead of touching the store.
    pub fn fail_next(&self, err: Error) {
        self.lock().fail_next = Some(err);
    }

    pub fn get(&self, id: u64) -> Option<SpyCat> {
        self.lock().cats.get(&id).cloned()
    }

    /// Creates from an untyped body, validating every field the way the remote service does.
    pub fn create_from_json(&self, body: &Value) -> ApiResult<SpyCat> {
        let mut state = self.begin()?;
        let Some(object) = body.as_object() else {
            return Err(non_object_body());
        };

        let mut fields = FieldErrors::new();
        let name = required_text(object, "name", &mut fields);
        let experience = required_experience(object, &mut fields);
        let breed = required_text(object, "breed", &mut fields);
        let salary = required_salary(object, &mut fields);

        if let (Some(breed), Some(known)) = (&breed, &self.known_breeds) {
            if !known.iter().any(|name| name == breed) {
                fields.push("breed", format!("'{breed}' is not a recognised breed."));
            }
        }

        match (name, experience, breed, salary) {
            (Some(name), Some(experience), Some(breed), Some(salary)) if fields.is_empty() => {
                state.last_id += 1;
                let cat = SpyCat {
                    id: state.last_id,
                    name,
                    experience,
                    breed,
                    salary,
                };
                state.cats.insert(cat.id, cat.clone());
                Ok(cat)
            }
            _ => Err(rejected(fields)),
        }
    }

    /// Partial update; fields other than `salary` are ignored.
    pub fn update_from_json(&self, id: u64, body: &Value) -> ApiResult<SpyCat> {
        let mut state = self.begin()?;
        let Some(object) = body.as_object() else {
            return Err(non_object_body());
        };
        if !state.cats.contains_key(&id) {
            return Err(not_found());
        }

        let mut fields = FieldErrors::new();
        let salary = match object.get("salary") {
            None => None,
            Some(value) => salary_value(value, &mut fields),
        };
        if !fields.is_empty() {
            return Err(rejected(fields));
        }

        let cat = state.cats.get_mut(&id).ok_or_else(not_found)?;
        if let Some(salary) = salary {
            cat.salary = salary;
        }
        Ok(cat.clone())
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> ApiResult<MutexGuard<'_, MemoryState>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock();
        match state.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(state),
        }
    }
}

impl SpyCatGateway for MemoryGateway {
    fn list(&self) -> ApiResult<Vec<SpyCat>> {
        let state = self.begin()?;
        Ok(state.cats.values().cloned().collect())
    }

    fn create(&self, input: &SpyCatInput) -> ApiResult<SpyCat> {
        self.create_from_json(&json!({
            "name": input.name,
            "experience": input.experience,
            "breed": input.breed,
            "salary": input.salary,
        }))
    }

    fn update_salary(&self, id: u64, salary: f64) -> ApiResult<SpyCat> {
        self.update_from_json(id, &json!({ "salary": salary }))
    }

    fn delete(&self, id: u64) -> ApiResult<()> {
        let mut state = self.begin()?;
        match state.cats.remove(&id) {
            Some(_) => Ok(()),
            None => Err(not_found()),
        }
    }
}

fn required_text(object: &Map<String, Value>, field: &str, fields: &mut FieldErrors) -> Option<String> {
    match object.get(field) {
        None | Some(Value::Null) => {
            fields.push(field, REQUIRED);
            None
        }
        Some(Value::String(text)) if text.trim().is_empty() => {
            fields.push(field, BLANK);
            None
        }
        Some(Value::String(text)) => Some(text.trim().to_string()),
        Some(_) => {
            fields.push(field, NOT_A_STRING);
            None
        }
    }
}

fn required_experience(object: &Map<String, Value>, fields: &mut FieldErrors) -> Option<u32> {
    let value = match object.get("experience") {
        None | Some(Value::Null) => {
            fields.push("experience", REQUIRED);
            return None;
        }
        Some(value) => value,
    };
    let parsed = match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|v| v.fract() == 0.0).map(|v| v as i64)),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    let Some(experience) = parsed else {
        fields.push("experience", NOT_AN_INTEGER);
        return None;
    };
    if experience > i64::from(EXPERIENCE_MAX) {
        fields.push(
            "experience",
            format!("Ensure this value is less than or equal to {EXPERIENCE_MAX}."),
        );
        return None;
    }
    if experience < i64::from(EXPERIENCE_MIN) {
        fields.push(
            "experience",
            format!("Ensure this value is greater than or equal to {EXPERIENCE_MIN}."),
        );
        return None;
    }
    u32::try_from(experience).ok()
}

fn required_salary(object: &Map<String, Value>, fields: &mut FieldErrors) -> Option<f64> {
    match object.get("salary") {
        None | Some(Value::Null) => {
            fields.push("salary", REQUIRED);
            None
        }
        Some(value) => salary_value(value, fields),
    }
}

fn salary_value(value: &Value, fields: &mut FieldErrors) -> Option<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed.filter(|salary| salary.is_finite()) {
        None => {
            fields.push("salary", NOT_A_NUMBER);
            None
        }
        Some(salary) if salary < 0.0 => {
            fields.push("salary", "Ensure this value is greater than or equal to 0.");
            None
        }
        Some(salary) => Some(salary),
    }
}

fn rejected(fields: FieldErrors) -> Error {
    Error::validation(fields)
        .with_message("Bad Request")
        .with_status(400)
}

fn non_object_body() -> Error {
    let mut fields = FieldErrors::new();
    fields.push("non_field_errors", "Invalid data. Expected a dictionary.");
    rejected(fields)
}

fn not_found() -> Error {
    Error::new(ErrorKind::NotFound)
        .with_message("Not found.")
        .with_status(404)
}

#[cfg(test)]
mod tests {
    use super::MemoryGateway;
    use crate::api::SpyCatGateway;
    use crate::core::cat::SpyCatInput;
    use crate::core::error::{Error, ErrorKind};
    use serde_json::json;

    fn tom() -> SpyCatInput {
        SpyCatInput {
            name: "Tom".to_string(),
            experience: 3,
            breed: "Abyssinian".to_string(),
            salary: 50000.0,
        }
    }

    #[test]
    fn create_assigns_ascending_ids_and_lists_in_order() {
        let gateway = MemoryGateway::new();
        let first = gateway.create(&tom()).expect("create");
        let second = gateway.create(&tom()).expect("create");
        assert_eq!((first.id, second.id), (1, 2));

        gateway.delete(first.id).expect("delete");
        let third = gateway.create(&tom()).expect("create");
        assert_eq!(third.id, 3);
        let ids: Vec<_> = gateway.list().expect("list").iter().map(|cat| cat.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn create_rejects_each_bad_field_with_its_own_message() {
        let gateway = MemoryGateway::new();
        let err = gateway
            .create_from_json(&json!({"name": " ", "experience": 16, "salary": -1}))
            .expect_err("rejected");
        assert_eq!(err.kind(), ErrorKind::Validation);
        let fields = err.fields().expect("fields");
        assert_eq!(
            fields.joined("name").as_deref(),
            Some("This field may not be blank.")
        );
        assert_eq!(
            fields.joined("experience").as_deref(),
            Some("Ensure this value is less than or equal to 15.")
        );
        assert_eq!(fields.joined("breed").as_deref(), Some("This field is required."));
        assert_eq!(
            fields.joined("salary").as_deref(),
            Some("Ensure this value is greater than or equal to 0.")
        );
        assert!(gateway.list().expect("list").is_empty());
    }

    #[test]
    fn known_breeds_restrict_create() {
        let gateway = MemoryGateway::new().with_known_breeds(["Bengal"]);
        let err = gateway.create(&tom()).expect_err("unknown breed");
        assert_eq!(
            err.fields().and_then(|fields| fields.joined("breed")).as_deref(),
            Some("'Abyssinian' is not a recognised breed.")
        );
    }

    #[test]
    fn update_touches_only_salary() {
        let gateway = MemoryGateway::new();
        let cat = gateway.create(&tom()).expect("create");
        let updated = gateway
            .update_from_json(cat.id, &json!({"salary": "1200.5", "name": "Renamed"}))
            .expect("update");
        assert_eq!(updated.salary, 1200.5);
        assert_eq!(updated.name, "Tom");
    }

    #[test]
    fn update_and_delete_report_missing_ids() {
        let gateway = MemoryGateway::new();
        let err = gateway.update_salary(9, 10.0).expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = gateway.delete(9).expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn fail_next_applies_once_and_counts_requests() {
        let gateway = MemoryGateway::new();
        gateway.fail_next(Error::new(ErrorKind::RequestFailed).with_message("down"));
        let err = gateway.list().expect_err("injected");
        assert_eq!(err.message(), Some("down"));
        assert!(gateway.list().expect("list").is_empty());
        assert_eq!(gateway.request_count(), 2);
    }
}
