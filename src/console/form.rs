//! Purpose: Create-form draft: raw field text, local validation, breed suggestions, submit lifecycle.
//! Exports: `FormDraft`, `Field`, `FormStatus`, `SubmitTicket`, `SubmitOutcome`, `filter_breeds`.
//! Role: Driven by user input; submission is routed through the dashboard.
//! Invariants: Local validation runs before any network call; first failure wins.
//! Invariants: Remote field errors are shown as received; only a successful create clears the draft.
//! Invariants: A reset invalidates in-flight submissions; their late results are ignored.
use crate::api::{
    BreedOption, EXPERIENCE_MAX, EXPERIENCE_MIN, Error, ErrorKind, FieldErrors, SpyCat, SpyCatInput,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

const CREATE_FALLBACK: &str = "Failed to create spy cat.";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Field {
    Name,
    Experience,
    Breed,
    Salary,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Experience => "experience",
            Field::Breed => "breed",
            Field::Salary => "salary",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FormStatus {
    Idle,
    Submitting,
}

#[derive(Clone, Debug)]
enum BreedDirectory {
    Loading,
    Ready(Arc<[BreedOption]>),
    Unavailable(String),
}

/// One pending `create` call issued by the form.
#[derive(Clone, Debug, PartialEq)]
pub struct SubmitTicket {
    input: SpyCatInput,
    generation: u64,
}

impl SubmitTicket {
    pub fn input(&self) -> &SpyCatInput {
        &self.input
    }
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// Local validation failed or a submission was already pending; nothing was sent.
    Blocked(Error),
    Created(SpyCat),
    /// The service rejected the draft; field errors are on the form.
    Rejected,
    Failed(Error),
    /// The draft was reset while the request was in flight.
    Stale,
}

/// Holds the filter query back until input has been quiet for a while.
#[derive(Clone, Debug, Default)]
struct QueryDebounce {
    quiet: Duration,
    settled: String,
    pending: Option<(String, Instant)>,
}

impl QueryDebounce {
    fn input(&mut self, text: &str, now: Instant) {
        if self.quiet.is_zero() {
            self.settle_to(text);
        } else {
            self.pending = Some((text.to_string(), now));
        }
    }

    fn settle_to(&mut self, text: &str) {
        self.settled = text.to_string();
        self.pending = None;
    }

    fn current(&self, now: Instant) -> &str {
        match &self.pending {
            Some((text, at)) if now.saturating_duration_since(*at) >= self.quiet => text,
            _ => &self.settled,
        }
    }
}

#[derive(Clone, Debug)]
pub struct FormDraft {
    name: String,
    experience: String,
    breed: String,
    salary: String,
    status: FormStatus,
    field_errors: FieldErrors,
    rejection: Option<(Field, String)>,
    non_field_error: Option<String>,
    directory: BreedDirectory,
    suggestions_visible: bool,
    query: QueryDebounce,
    generation: u64,
}

impl Default for FormDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl FormDraft {
    pub fn new() -> Self {
        Self {
            name: String::new(),
            experience: String::new(),
            breed: String::new(),
            salary: String::new(),
            status: FormStatus::Idle,
            field_errors: FieldErrors::new(),
            rejection: None,
            non_field_error: None,
            directory: BreedDirectory::Loading,
            suggestions_visible: false,
            query: QueryDebounce::default(),
            generation: 0,
        }
    }

    pub fn with_suggest_debounce(mut self, quiet: Duration) -> Self {
        self.query.quiet = quiet;
        self
    }

    pub fn status(&self) -> FormStatus {
        self.status
    }

    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Experience => &self.experience,
            Field::Breed => &self.breed,
            Field::Salary => &self.salary,
        }
    }

    pub fn set_name(&mut self, text: impl Into<String>) {
        self.name = text.into();
    }

    pub fn set_experience(&mut self, text: impl Into<String>) {
        self.experience = text.into();
    }

    pub fn set_salary(&mut self, text: impl Into<String>) {
        self.salary = text.into();
    }

    pub fn set_breed(&mut self, text: impl Into<String>) {
        self.set_breed_at(text, Instant::now());
    }

    /// Typing into the breed input also opens the suggestion list.
    pub fn set_breed_at(&mut self, text: impl Into<String>, now: Instant) {
        self.breed = text.into();
        self.suggestions_visible = true;
        self.query.input(&self.breed, now);
    }

    pub fn focus_breed(&mut self) {
        self.suggestions_visible = true;
        self.query.settle_to(&self.breed);
    }

    /// Focus moved outside the breed input and its suggestion list.
    pub fn blur_breed(&mut self) {
        self.suggestions_visible = false;
    }

    pub fn suggestions_visible(&self) -> bool {
        self.suggestions_visible
    }

    /// Picks a listed breed by exact name; returns false if it is not in the directory.
    pub fn select_suggestion(&mut self, name: &str) -> bool {
        let Some(picked) = self
            .breeds()
            .iter()
            .find(|breed| breed.name == name)
            .map(|breed| breed.name.clone())
        else {
            return false;
        };
        self.breed = picked;
        self.query.settle_to(&self.breed);
        self.suggestions_visible = false;
        true
    }

    pub fn suggestions(&self) -> Vec<&BreedOption> {
        self.suggestions_at(Instant::now())
    }

    pub fn suggestions_at(&self, now: Instant) -> Vec<&BreedOption> {
        if !self.suggestions_visible {
            return Vec::new();
        }
        filter_breeds(self.breeds(), self.query.current(now))
    }

    /// Records the outcome of loading the breed directory.
    pub fn attach_breeds(&mut self, result: Result<Arc<[BreedOption]>, Error>) {
        self.directory = match result {
            Ok(breeds) => BreedDirectory::Ready(breeds),
            Err(err) => {
                let message = err
                    .message()
                    .unwrap_or("Failed to load breeds")
                    .trim_end_matches('.')
                    .to_string();
                BreedDirectory::Unavailable(message)
            }
        };
    }

    pub fn breeds(&self) -> &[BreedOption] {
        match &self.directory {
            BreedDirectory::Ready(breeds) => breeds,
            BreedDirectory::Loading | BreedDirectory::Unavailable(_) => &[],
        }
    }

    pub fn breeds_loading(&self) -> bool {
        matches!(self.directory, BreedDirectory::Loading)
    }

    /// Shown under the breed input when the directory could not be loaded.
    pub fn breed_notice(&self) -> Option<String> {
        match &self.directory {
            BreedDirectory::Unavailable(message) => {
                Some(format!("{message}. You can still type a breed."))
            }
            _ => None,
        }
    }

    pub fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    /// Remote messages for one field, joined for display beneath its input.
    pub fn field_error(&self, field: Field) -> Option<String> {
        self.field_errors.joined(field.as_str())
    }

    /// The local validation failure that blocked the last submit, if any.
    pub fn rejection(&self) -> Option<(Field, &str)> {
        self.rejection
            .as_ref()
            .map(|(field, message)| (*field, message.as_str()))
    }

    pub fn non_field_error(&self) -> Option<&str> {
        self.non_field_error.as_deref()
    }

    pub fn validate(&self) -> Result<SpyCatInput, (Field, &'static str)> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err((Field::Name, "Name is required."));
        }
        let breed = self.breed.trim();
        if breed.is_empty() {
            return Err((Field::Breed, "Breed is required."));
        }
        let experience = parse_experience(&self.experience).ok_or((
            Field::Experience,
            "Experience must be an integer between 0 and 15.",
        ))?;
        let salary = parse_non_negative(&self.salary)
            .ok_or((Field::Salary, "Salary must be a non-negative number."))?;
        let breeds = self.breeds();
        if !breeds.is_empty() && !breeds.iter().any(|option| option.name == breed) {
            return Err((Field::Breed, "Please select a valid breed from the list."));
        }
        Ok(SpyCatInput {
            name: name.to_string(),
            experience,
            breed: breed.to_string(),
            salary,
        })
    }

    /// Validates and moves to `Submitting`; the ticket carries the payload to send.
    pub fn begin_submit(&mut self) -> Result<SubmitTicket, Error> {
        if self.status == FormStatus::Submitting {
            return Err(Error::new(ErrorKind::Usage).with_message("a submission is already pending"));
        }
        let input = match self.validate() {
            Ok(input) => input,
            Err((field, message)) => {
                debug!(field = field.as_str(), message, "draft blocked by local validation");
                self.rejection = Some((field, message.to_string()));
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(message)
                    .with_hint(format!("Fix the {} field and submit again.", field.as_str())));
            }
        };
        self.rejection = None;
        self.field_errors = FieldErrors::new();
        self.non_field_error = None;
        self.status = FormStatus::Submitting;
        Ok(SubmitTicket {
            input,
            generation: self.generation,
        })
    }

    pub fn finish_submit(&mut self, ticket: SubmitTicket, result: Result<SpyCat, Error>) -> SubmitOutcome {
        if ticket.generation != self.generation {
            debug!("ignoring create result for a reset draft");
            return SubmitOutcome::Stale;
        }
        self.status = FormStatus::Idle;
        match result {
            Ok(cat) => {
                self.reset();
                SubmitOutcome::Created(cat)
            }
            Err(err) if err.kind() == ErrorKind::Validation => {
                self.field_errors = err.into_fields().unwrap_or_default();
                SubmitOutcome::Rejected
            }
            Err(err) => {
                self.non_field_error = Some(
                    err.message()
                        .filter(|message| !message.is_empty())
                        .unwrap_or(CREATE_FALLBACK)
                        .to_string(),
                );
                SubmitOutcome::Failed(err)
            }
        }
    }

    /// Clears every field and message; keeps the breed directory.
    pub fn reset(&mut self) {
        self.name.clear();
        self.experience.clear();
        self.breed.clear();
        self.salary.clear();
        self.status = FormStatus::Idle;
        self.field_errors = FieldErrors::new();
        self.rejection = None;
        self.non_field_error = None;
        self.suggestions_visible = false;
        self.query.settle_to("");
        self.generation += 1;
    }
}

/// Case-insensitive substring match on breed names; a blank query matches everything.
pub fn filter_breeds<'a>(breeds: &'a [BreedOption], query: &str) -> Vec<&'a BreedOption> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return breeds.iter().collect();
    }
    breeds
        .iter()
        .filter(|breed| breed.name.to_lowercase().contains(&query))
        .collect()
}

fn parse_experience(text: &str) -> Option<u32> {
    let trimmed = text.trim();
    let value = match trimmed.parse::<i64>() {
        Ok(value) => value,
        // "3.0" is still an integer.
        Err(_) => {
            let value = trimmed.parse::<f64>().ok()?;
            if !value.is_finite() || value.fract() != 0.0 {
                return None;
            }
            value as i64
        }
    };
    let range = i64::from(EXPERIENCE_MIN)..=i64::from(EXPERIENCE_MAX);
    if !range.contains(&value) {
        return None;
    }
    u32::try_from(value).ok()
}

fn parse_non_negative(text: &str) -> Option<f64> {
    super::row::parse_salary(text)
}
