//! Purpose: UI-facing controllers for the spy cat dashboard.
//! Exports: `Dashboard`, `FormDraft`, `RowEdit`, `Session` and their outcome/ticket types.
//! Role: Holds all client-side state; talks to the service only through `api` traits.
//! Invariants: Controllers never block on each other; only gateway and breed calls suspend.
//! Invariants: `begin_*`/`finish_*` pairs let a front end apply late responses safely.

mod dashboard;
mod form;
mod row;
mod session;

pub use dashboard::{Dashboard, DeleteOutcome, EMPTY_MESSAGE, ListState, RefreshTicket};
pub use form::{Field, FormDraft, FormStatus, SubmitOutcome, SubmitTicket, filter_breeds};
pub use row::{RowEdit, SaveOutcome, SaveTicket};
pub use session::Session;
