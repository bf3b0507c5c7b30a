//! Purpose: Per-row salary edit state, kept apart from list refreshes.
//! Exports: `RowEdit`, `SaveTicket`, `SaveOutcome`.
//! Role: Owned by the dashboard, one per listed spy cat, keyed by id.
//! Invariants: Save never produces a ticket for an empty, non-numeric, or negative salary.
//! Invariants: While a save is pending the working value is frozen.
//! Invariants: Cancel invalidates any pending save; its late result is ignored.
use crate::api::{Error, SpyCat};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RowEdit {
    cat_id: u64,
    editing: bool,
    saving: bool,
    salary_text: String,
    generation: u64,
}

/// One pending `update_salary` call issued by a row.
#[derive(Clone, Debug, PartialEq)]
pub struct SaveTicket {
    cat_id: u64,
    salary: f64,
    generation: u64,
}

#[derive(Debug)]
pub enum SaveOutcome {
    /// The row was not editing, was busy, or held an invalid value; nothing was sent.
    Skipped,
    Saved(SpyCat),
    Failed(Error),
}

impl SaveTicket {
    pub fn cat_id(&self) -> u64 {
        self.cat_id
    }

    pub fn salary(&self) -> f64 {
        self.salary
    }
}

impl RowEdit {
    pub fn new(cat_id: u64) -> Self {
        Self {
            cat_id,
            editing: false,
            saving: false,
            salary_text: String::new(),
            generation: 0,
        }
    }

    pub fn cat_id(&self) -> u64 {
        self.cat_id
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn salary_text(&self) -> &str {
        &self.salary_text
    }

    /// Enters edit mode seeded from the cat's current salary; no-op when already editing.
    pub fn begin_edit(&mut self, cat: &SpyCat) {
        if self.editing {
            return;
        }
        self.editing = true;
        self.salary_text = format_salary(cat.salary);
    }

    pub fn set_salary_text(&mut self, text: impl Into<String>) {
        if !self.editing || self.saving {
            return;
        }
        self.salary_text = text.into();
    }

    pub fn parsed_salary(&self) -> Option<f64> {
        parse_salary(&self.salary_text)
    }

    pub fn can_save(&self) -> bool {
        self.editing && !self.saving && self.parsed_salary().is_some()
    }

    pub fn begin_save(&mut self) -> Option<SaveTicket> {
        if !self.editing || self.saving {
            return None;
        }
        let salary = self.parsed_salary()?;
        self.saving = true;
        Some(SaveTicket {
            cat_id: self.cat_id,
            salary,
            generation: self.generation,
        })
    }

    /// Applies a save result; returns false when the ticket was invalidated by a cancel.
    pub fn finish_save(&mut self, ticket: &SaveTicket, succeeded: bool) -> bool {
        if ticket.generation != self.generation || ticket.cat_id != self.cat_id {
            return false;
        }
        self.saving = false;
        if succeeded {
            // The displayed salary comes from the next list refresh, not from here.
            self.editing = false;
            self.salary_text.clear();
        }
        true
    }

    pub fn cancel(&mut self) {
        self.editing = false;
        self.saving = false;
        self.salary_text.clear();
        self.generation += 1;
    }
}

pub(crate) fn parse_salary(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|salary| salary.is_finite() && *salary >= 0.0)
}

pub(crate) fn format_salary(salary: f64) -> String {
    format!("{salary}")
}

#[cfg(test)]
mod tests {
    use super::RowEdit;
    use crate::api::SpyCat;

    fn cat(salary: f64) -> SpyCat {
        SpyCat {
            id: 4,
            name: "Tom".to_string(),
            experience: 3,
            breed: "Abyssinian".to_string(),
            salary,
        }
    }

    #[test]
    fn begin_edit_seeds_current_salary() {
        let mut row = RowEdit::new(4);
        row.begin_edit(&cat(1000.0));
        assert!(row.is_editing());
        assert_eq!(row.salary_text(), "1000");
        assert!(row.can_save());
    }

    #[test]
    fn invalid_values_never_produce_a_ticket() {
        let mut row = RowEdit::new(4);
        row.begin_edit(&cat(1000.0));
        for text in ["", "  ", "-5", "abc", "NaN", "inf"] {
            row.set_salary_text(text);
            assert!(row.begin_save().is_none(), "{text:?} should not save");
            assert!(row.is_editing());
            assert!(!row.is_saving());
        }
        assert_eq!(row.salary_text(), "inf");
    }

    #[test]
    fn save_not_possible_outside_edit_mode() {
        let mut row = RowEdit::new(4);
        assert!(row.begin_save().is_none());
        row.set_salary_text("10");
        assert_eq!(row.salary_text(), "");
    }

    #[test]
    fn pending_save_freezes_the_row() {
        let mut row = RowEdit::new(4);
        row.begin_edit(&cat(1000.0));
        row.set_salary_text("1500");
        let ticket = row.begin_save().expect("ticket");
        assert_eq!(ticket.salary(), 1500.0);
        assert!(row.is_saving());

        row.set_salary_text("9");
        assert_eq!(row.salary_text(), "1500");
        assert!(row.begin_save().is_none());
    }

    #[test]
    fn failed_save_keeps_the_entered_value() {
        let mut row = RowEdit::new(4);
        row.begin_edit(&cat(1000.0));
        row.set_salary_text("1500");
        let ticket = row.begin_save().expect("ticket");
        assert!(row.finish_save(&ticket, false));
        assert!(row.is_editing());
        assert!(!row.is_saving());
        assert_eq!(row.salary_text(), "1500");
    }

    #[test]
    fn successful_save_collapses_the_row() {
        let mut row = RowEdit::new(4);
        row.begin_edit(&cat(1000.0));
        let ticket = row.begin_save().expect("ticket");
        assert!(row.finish_save(&ticket, true));
        assert!(!row.is_editing());
        assert!(!row.is_saving());
    }

    #[test]
    fn cancel_discards_and_ignores_late_results() {
        let mut row = RowEdit::new(4);
        row.begin_edit(&cat(1000.0));
        row.set_salary_text("1500");
        let ticket = row.begin_save().expect("ticket");
        row.cancel();
        assert!(!row.is_editing());

        assert!(!row.finish_save(&ticket, false));
        assert!(!row.is_editing());

        row.begin_edit(&cat(1000.0));
        assert_eq!(row.salary_text(), "1000");
    }
}
