//! Purpose: Own the displayed spy cat list and route every mutation through the gateway.
//! Exports: `Dashboard`, `ListState`, `RefreshTicket`, `DeleteOutcome`, `EMPTY_MESSAGE`.
//! Role: Page-level controller; the form and rows only reach the gateway through it.
//! Invariants: The list is always exactly the last successful `list()` response.
//! Invariants: Every successful mutation is followed by a full refresh; nothing is patched locally.
//! Invariants: A failed refresh keeps the previous list and attaches a message.
use super::form::{FormDraft, SubmitOutcome};
use super::row::{RowEdit, SaveOutcome, SaveTicket};
use crate::api::{ApiResult, Error, ErrorKind, SpyCat, SpyCatGateway};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

pub const EMPTY_MESSAGE: &str = "No spy cats yet. Add your first one above.";

const LOAD_FALLBACK: &str = "Failed to load Spy Cats.";
const CREATE_FALLBACK: &str = "Failed to create spy cat.";
const SALARY_FALLBACK: &str = "Failed to update salary.";
const SALARY_VALIDATION_FALLBACK: &str = "Validation error while updating salary.";
const DELETE_FALLBACK: &str = "Failed to delete spy cat.";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ListState {
    Loading,
    Ready,
    ReadyWithError,
}

/// One pending `list()` call.
#[derive(Debug)]
pub struct RefreshTicket {
    seq: u64,
}

#[derive(Debug)]
pub enum DeleteOutcome {
    Deleted,
    /// The service no longer had the id; treated as done, with a page message.
    AlreadyGone,
    Failed(Error),
}

pub struct Dashboard<G> {
    gateway: G,
    cats: Vec<SpyCat>,
    rows: BTreeMap<u64, RowEdit>,
    error: Option<String>,
    pending_refreshes: usize,
    refresh_seq: u64,
}

impl<G: SpyCatGateway> Dashboard<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            cats: Vec::new(),
            rows: BTreeMap::new(),
            error: None,
            pending_refreshes: 0,
            refresh_seq: 0,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn mount(&mut self) -> ListState {
        self.refresh();
        self.state()
    }

    pub fn state(&self) -> ListState {
        if self.pending_refreshes > 0 {
            ListState::Loading
        } else if self.error.is_some() {
            ListState::ReadyWithError
        } else {
            ListState::Ready
        }
    }

    pub fn cats(&self) -> &[SpyCat] {
        &self.cats
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn count(&self) -> usize {
        self.cats.len()
    }

    pub fn total_salary(&self) -> f64 {
        self.cats.iter().map(|cat| cat.salary).sum()
    }

    /// The empty-state line, when there is nothing to list.
    pub fn empty_message(&self) -> Option<&'static str> {
        self.cats.is_empty().then_some(EMPTY_MESSAGE)
    }

    pub fn refresh(&mut self) {
        let ticket = self.begin_refresh();
        let result = self.gateway.list();
        self.finish_refresh(ticket, result);
    }

    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.pending_refreshes += 1;
        self.refresh_seq += 1;
        self.error = None;
        RefreshTicket {
            seq: self.refresh_seq,
        }
    }

    /// Applies a list result; whichever refresh completes last wins.
    pub fn finish_refresh(&mut self, ticket: RefreshTicket, result: ApiResult<Vec<SpyCat>>) {
        self.pending_refreshes = self.pending_refreshes.saturating_sub(1);
        match result {
            Ok(cats) => {
                debug!(seq = ticket.seq, count = cats.len(), "spy cat list refreshed");
                self.cats = cats;
                self.error = None;
                self.sync_rows();
            }
            Err(err) => {
                warn!(seq = ticket.seq, error = %err, "spy cat list refresh failed");
                self.error = Some(message_or(&err, LOAD_FALLBACK));
            }
        }
    }

    pub fn row(&self, id: u64) -> Option<&RowEdit> {
        self.rows.get(&id)
    }

    pub fn begin_edit(&mut self, id: u64) -> bool {
        let Some(cat) = self.cats.iter().find(|cat| cat.id == id) else {
            return false;
        };
        let row = self.rows.entry(id).or_insert_with(|| RowEdit::new(id));
        row.begin_edit(cat);
        true
    }

    pub fn set_row_salary(&mut self, id: u64, text: impl Into<String>) {
        if let Some(row) = self.rows.get_mut(&id) {
            row.set_salary_text(text);
        }
    }

    pub fn cancel_edit(&mut self, id: u64) {
        if let Some(row) = self.rows.get_mut(&id) {
            row.cancel();
        }
    }

    /// Validates, sends the draft, and refreshes on success.
    pub fn on_create(&mut self, form: &mut FormDraft) -> SubmitOutcome {
        let ticket = match form.begin_submit() {
            Ok(ticket) => ticket,
            Err(err) => return SubmitOutcome::Blocked(err),
        };
        self.error = None;
        let result = self.gateway.create(ticket.input());
        match result {
            Ok(cat) => {
                info!(id = cat.id, name = %cat.name, "spy cat created");
                let outcome = form.finish_submit(ticket, Ok(cat));
                self.refresh();
                outcome
            }
            // Field maps go to the form untouched.
            Err(err) if err.kind() == ErrorKind::Validation => form.finish_submit(ticket, Err(err)),
            Err(err) => {
                self.error = Some(message_or(&err, CREATE_FALLBACK));
                form.finish_submit(ticket, Err(err))
            }
        }
    }

    /// Saves the row's working salary; skipped without a network call if the row cannot save.
    pub fn on_update_salary(&mut self, id: u64) -> SaveOutcome {
        let Some(ticket) = self.rows.get_mut(&id).and_then(RowEdit::begin_save) else {
            return SaveOutcome::Skipped;
        };
        self.error = None;
        let result = self.gateway.update_salary(id, ticket.salary());
        self.finish_update_salary(&ticket, result)
    }

    pub fn finish_update_salary(&mut self, ticket: &SaveTicket, result: ApiResult<SpyCat>) -> SaveOutcome {
        let succeeded = result.is_ok();
        if let Some(row) = self.rows.get_mut(&ticket.cat_id()) {
            row.finish_save(ticket, succeeded);
        }
        match result {
            Ok(cat) => {
                info!(id = cat.id, salary = cat.salary, "spy cat salary updated");
                self.refresh();
                SaveOutcome::Saved(cat)
            }
            Err(err) => {
                self.error = Some(salary_error_message(&err));
                SaveOutcome::Failed(err)
            }
        }
    }

    pub fn on_delete(&mut self, id: u64) -> DeleteOutcome {
        self.error = None;
        match self.gateway.delete(id) {
            Ok(()) => {
                info!(id, "spy cat deleted");
                self.refresh();
                DeleteOutcome::Deleted
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(id, "spy cat already gone");
                self.refresh();
                if self.error.is_none() {
                    self.error = Some(message_or(&err, DELETE_FALLBACK));
                }
                DeleteOutcome::AlreadyGone
            }
            Err(err) => {
                self.error = Some(message_or(&err, DELETE_FALLBACK));
                DeleteOutcome::Failed(err)
            }
        }
    }

    fn sync_rows(&mut self) {
        let ids: Vec<u64> = self.cats.iter().map(|cat| cat.id).collect();
        self.rows.retain(|id, _| ids.contains(id));
        for id in ids {
            self.rows.entry(id).or_insert_with(|| RowEdit::new(id));
        }
    }
}

fn message_or(err: &Error, fallback: &str) -> String {
    err.message()
        .filter(|message| !message.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

// Rows have no per-field error surface, so field maps collapse into one line.
fn salary_error_message(err: &Error) -> String {
    match err.fields() {
        Some(fields) if err.kind() == ErrorKind::Validation => {
            let flat = fields.flatten();
            if flat.is_empty() {
                SALARY_VALIDATION_FALLBACK.to_string()
            } else {
                flat
            }
        }
        _ => message_or(err, SALARY_FALLBACK),
    }
}
