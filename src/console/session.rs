//! Purpose: Wire one dashboard, one create form, and the shared breed cache together.
//! Exports: `Session`.
//! Role: What a front end holds for the lifetime of the page.
//! Invariants: Opening loads the list and the breed directory; a breed failure never blocks the list.
use super::dashboard::{Dashboard, ListState};
use super::form::{FormDraft, SubmitOutcome};
use crate::api::{BreedCache, BreedSource, SpyCatGateway};
use std::time::Duration;

pub struct Session<G, S> {
    dashboard: Dashboard<G>,
    form: FormDraft,
    breeds: BreedCache<S>,
}

impl<G: SpyCatGateway, S: BreedSource> Session<G, S> {
    pub fn new(gateway: G, breeds: BreedCache<S>) -> Self {
        Self {
            dashboard: Dashboard::new(gateway),
            form: FormDraft::new(),
            breeds,
        }
    }

    pub fn with_suggest_debounce(mut self, quiet: Duration) -> Self {
        self.form = self.form.with_suggest_debounce(quiet);
        self
    }

    pub fn open(&mut self) -> ListState {
        let state = self.dashboard.mount();
        self.form.attach_breeds(self.breeds.get_breeds());
        state
    }

    /// Retries the breed directory after a failed load; served from cache once loaded.
    pub fn reload_breeds(&mut self) {
        self.form.attach_breeds(self.breeds.get_breeds());
    }

    pub fn submit(&mut self) -> SubmitOutcome {
        self.dashboard.on_create(&mut self.form)
    }

    pub fn dashboard(&self) -> &Dashboard<G> {
        &self.dashboard
    }

    pub fn dashboard_mut(&mut self) -> &mut Dashboard<G> {
        &mut self.dashboard
    }

    pub fn form(&self) -> &FormDraft {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FormDraft {
        &mut self.form
    }

    pub fn breed_cache(&self) -> &BreedCache<S> {
        &self.breeds
    }
}
