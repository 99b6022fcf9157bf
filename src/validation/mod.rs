//! Dirty-check/save/correct cycle over a summary's row set.
//!
//! A session is opened when the validation view comes up and captures the
//! current rows as the `last_saved` baseline. Edits flow straight through
//! the store (the store stays the single owner of every entity); the
//! baseline exists for the dirty-check, the save, and the discard path.
//! Dirty-checks compare the row set only: conversations mutating
//! concurrently (a stream still receiving, say) never make a save appear
//! meaningful or block a clean close.

use tracing::info;

use crate::backend::Backend;
use crate::core::models::{Row, RowState, SummaryId};
use crate::errors::AppError;
use crate::store::EntityStore;
use crate::workflow::busy::{BusyFlags, OperationKind};

/// What `close` tells the caller to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// No unsaved changes; close immediately.
    Clean,
    /// Rows differ from the last-saved baseline; ask the user before
    /// discarding.
    UnsavedChanges,
}

/// One open validation pass over a summary.
#[derive(Debug)]
pub struct ValidationSession {
    summary_id: SummaryId,
    last_saved: Vec<Row>,
    rejected_keys: Vec<String>,
}

impl ValidationSession {
    /// Opens a session, capturing the current row set as the baseline.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::UnknownSummary`] when the summary does not exist.
    pub fn open(store: &EntityStore, summary_id: SummaryId) -> Result<Self, AppError> {
        let snapshot = store.get();
        let summary = snapshot
            .summary(summary_id)
            .ok_or(AppError::UnknownSummary(summary_id))?;

        Ok(Self {
            summary_id,
            last_saved: summary.rows.clone(),
            rejected_keys: summary.rejected_keys(),
        })
    }

    #[must_use]
    pub const fn summary_id(&self) -> SummaryId {
        self.summary_id
    }

    /// Keys currently marked rejected, recomputed after every mutation.
    #[must_use]
    pub fn rejected_keys(&self) -> &[String] {
        &self.rejected_keys
    }

    fn current_rows(&self, store: &EntityStore) -> Result<Vec<Row>, AppError> {
        let snapshot = store.get();
        let summary = snapshot
            .summary(self.summary_id)
            .ok_or(AppError::UnknownSummary(self.summary_id))?;
        Ok(summary.rows.clone())
    }

    /// Sets one row's validation state.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::RowOutOfRange`] for a bad index,
    /// [`AppError::UnknownSummary`] when the summary vanished.
    pub fn set_row_state(
        &mut self,
        store: &EntityStore,
        row_index: usize,
        new_state: RowState,
    ) -> Result<(), AppError> {
        let summary_id = self.summary_id;
        let snapshot = store.apply(|snapshot| {
            let mut next = snapshot.clone();
            let summary = next
                .summary_mut(summary_id)
                .ok_or(AppError::UnknownSummary(summary_id))?;
            let row = summary
                .rows
                .get_mut(row_index)
                .ok_or(AppError::RowOutOfRange(row_index))?;
            row.state = new_state;
            Ok(next)
        })?;

        self.rejected_keys = snapshot
            .summary(summary_id)
            .ok_or(AppError::UnknownSummary(summary_id))?
            .rejected_keys();
        Ok(())
    }

    /// Commits the current rows: marks the summary validated and advances
    /// the baseline.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NoChange`] when the rows are structurally
    /// identical to the baseline (surfaced to the user, not fatal).
    pub fn save(&mut self, store: &EntityStore) -> Result<(), AppError> {
        let current = self.current_rows(store)?;
        if current == self.last_saved {
            return Err(AppError::NoChange);
        }

        let summary_id = self.summary_id;
        store.apply(|snapshot| {
            let mut next = snapshot.clone();
            let summary = next
                .summary_mut(summary_id)
                .ok_or(AppError::UnknownSummary(summary_id))?;
            summary.validated = true;
            Ok(next)
        })?;

        info!("Validation changes saved for summary {summary_id}");
        self.last_saved = current;
        Ok(())
    }

    /// Recomputes the rejected-keys list for the correction step.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::IncompleteValidation`] while any row is still
    /// `Unset` (non-fatal; the list is still refreshed).
    pub fn request_corrections(&mut self, store: &EntityStore) -> Result<Vec<String>, AppError> {
        let current = self.current_rows(store)?;
        self.rejected_keys = current
            .iter()
            .filter(|row| row.state == RowState::Rejected)
            .map(|row| row.key.clone())
            .collect();

        if current.iter().any(|row| row.state == RowState::Unset) {
            return Err(AppError::IncompleteValidation);
        }
        Ok(self.rejected_keys.clone())
    }

    /// Replaces a rejected row's value with an expert-provided one and
    /// confirms it. A key that is not currently rejected, or a blank value,
    /// is a no-op; the return value says whether anything changed.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::UnknownSummary`] when the summary vanished.
    pub fn correct_with_expert(
        &mut self,
        store: &EntityStore,
        row_key: &str,
        new_value: &str,
    ) -> Result<bool, AppError> {
        let new_value = new_value.trim();
        if new_value.is_empty() || !self.rejected_keys.iter().any(|k| k == row_key) {
            return Ok(false);
        }

        let summary_id = self.summary_id;
        let key = row_key.to_string();
        let value = new_value.to_string();
        let snapshot = store.apply(move |snapshot| {
            let mut next = snapshot.clone();
            let summary = next
                .summary_mut(summary_id)
                .ok_or(AppError::UnknownSummary(summary_id))?;
            if let Some(row) = summary.row_mut(&key) {
                row.value = value;
                row.state = RowState::Confirmed;
            }
            Ok(next)
        })?;

        self.rejected_keys = snapshot
            .summary(summary_id)
            .ok_or(AppError::UnknownSummary(summary_id))?
            .rejected_keys();
        Ok(true)
    }

    /// Asks the backend corrector for a replacement value, then behaves like
    /// [`Self::correct_with_expert`] with the reply. An empty reply mutates
    /// nothing; a transport failure leaves the row untouched.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Assistant`] on backend failure,
    /// [`AppError::OperationInFlight`] when another correction is running.
    pub async fn correct_with_assistant(
        &mut self,
        store: &EntityStore,
        client: &impl Backend,
        busy: &BusyFlags,
        row_key: &str,
        example_phrase: &str,
        guiding_question: &str,
    ) -> Result<bool, AppError> {
        if !self.rejected_keys.iter().any(|k| k == row_key) {
            return Ok(false);
        }

        let _guard = busy.try_acquire(OperationKind::Correction)?;

        let document_ref = {
            let snapshot = store.get();
            snapshot
                .summary(self.summary_id)
                .ok_or(AppError::UnknownSummary(self.summary_id))?
                .source_file_name
                .clone()
        };

        let reply = client
            .assist_correction(&document_ref, example_phrase, guiding_question)
            .await?;

        if reply.trim().is_empty() {
            info!("Assisted correction returned nothing for \"{row_key}\"; row untouched");
            return Ok(false);
        }

        self.correct_with_expert(store, row_key, &reply)
    }

    /// Whether closing now would discard unsaved row changes.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::UnknownSummary`] when the summary vanished.
    pub fn close(&self, store: &EntityStore) -> Result<CloseOutcome, AppError> {
        if self.current_rows(store)? == self.last_saved {
            Ok(CloseOutcome::Clean)
        } else {
            Ok(CloseOutcome::UnsavedChanges)
        }
    }

    /// Restores the baseline rows after the user confirms a discard.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::UnknownSummary`] when the summary vanished.
    pub fn discard_changes(&mut self, store: &EntityStore) -> Result<(), AppError> {
        let summary_id = self.summary_id;
        let baseline = self.last_saved.clone();
        let snapshot = store.apply(move |snapshot| {
            let mut next = snapshot.clone();
            let summary = next
                .summary_mut(summary_id)
                .ok_or(AppError::UnknownSummary(summary_id))?;
            summary.rows = baseline;
            Ok(next)
        })?;

        self.rejected_keys = snapshot
            .summary(summary_id)
            .ok_or(AppError::UnknownSummary(summary_id))?
            .rejected_keys();
        Ok(())
    }
}
