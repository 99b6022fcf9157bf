//! Summary lifecycle: upload/extract, rename, delete, evaluation.

use tracing::{info, warn};

use crate::backend::{Backend, DeleteOutcome, DeleteStatus};
use crate::core::models::{Summary, SummaryId};
use crate::errors::AppError;
use crate::store::EntityStore;
use crate::workflow::busy::{BusyFlags, OperationKind};

/// Derives the backend-side source name from the uploaded file name.
#[must_use]
pub fn source_name_of(file_name: &str) -> &str {
    file_name.strip_suffix(".pdf").unwrap_or(file_name)
}

/// Uploads a document, runs extraction, and creates the summary with its
/// full row batch. The duplicate check runs once up front (cheap rejection
/// before the network round trip) and again inside the commit against the
/// latest snapshot, since another upload may have landed meanwhile.
///
/// # Errors
///
/// Returns [`AppError::DuplicateUpload`] when the source file is already
/// known, [`AppError::OperationInFlight`] when another upload is running,
/// or [`AppError::Extraction`] when the backend fails.
pub async fn upload_document(
    store: &EntityStore,
    client: &impl Backend,
    busy: &BusyFlags,
    file_name: &str,
    payload: Vec<u8>,
) -> Result<SummaryId, AppError> {
    let source_name = source_name_of(file_name).to_string();

    if let Some(existing) = store.get().summary_by_source(&source_name) {
        return Err(AppError::DuplicateUpload(existing.display_name.clone()));
    }

    let _guard = busy.try_acquire(OperationKind::Upload)?;

    let fields = client.extract(file_name, payload).await?;
    let summary = Summary::from_extracted_fields(&source_name, fields);
    let summary_id = summary.id;

    store.apply(move |snapshot| {
        if let Some(existing) = snapshot.summary_by_source(&summary.source_file_name) {
            return Err(AppError::DuplicateUpload(existing.display_name.clone()));
        }
        let mut next = snapshot.clone();
        next.summaries.push(summary);
        Ok(next)
    })?;

    info!("Created summary {summary_id} from {file_name}");
    Ok(summary_id)
}

/// Renames a summary. Blank input is a no-op; renaming to the summary's own
/// current name is too.
///
/// # Errors
///
/// Returns [`AppError::DuplicateName`] when another summary already uses the
/// name, [`AppError::UnknownSummary`] when the id does not resolve.
pub fn rename_summary(
    store: &EntityStore,
    summary_id: SummaryId,
    new_name: &str,
) -> Result<(), AppError> {
    let new_name = new_name.trim();
    if new_name.is_empty() {
        return Ok(());
    }

    let name = new_name.to_string();
    store.apply(move |snapshot| {
        if snapshot.display_name_taken(&name, Some(summary_id)) {
            return Err(AppError::DuplicateName(name));
        }
        let mut next = snapshot.clone();
        let summary = next
            .summary_mut(summary_id)
            .ok_or(AppError::UnknownSummary(summary_id))?;
        summary.display_name = name;
        Ok(next)
    })?;
    Ok(())
}

/// Deletes a summary's backend artifact first. Only a confirmed success
/// status removes the summary and every conversation it owns, resetting the
/// selection when it pointed into the deleted summary. A failure status
/// leaves the store untouched; the backend's message is returned either way.
///
/// # Errors
///
/// Returns [`AppError::UnknownSummary`] when the id does not resolve,
/// [`AppError::Deletion`] on a transport-level failure.
pub async fn delete_summary(
    store: &EntityStore,
    client: &impl Backend,
    summary_id: SummaryId,
) -> Result<DeleteOutcome, AppError> {
    let document_ref = {
        let snapshot = store.get();
        snapshot
            .summary(summary_id)
            .ok_or(AppError::UnknownSummary(summary_id))?
            .source_file_name
            .clone()
    };

    let outcome = client.delete_artifact(&document_ref).await?;
    if outcome.status == DeleteStatus::Failure {
        warn!("Backend refused to delete {document_ref}: {}", outcome.message);
        return Ok(outcome);
    }

    store.apply(move |snapshot| {
        let mut next = snapshot.clone();
        next.summaries.retain(|s| s.id != summary_id);
        if next
            .selected
            .is_some_and(|selection| selection.summary_id == summary_id)
        {
            next.selected = None;
        }
        Ok(next)
    })?;

    info!("Deleted summary {summary_id} and its conversations");
    Ok(outcome)
}

/// Fires the backend's extraction-quality evaluation run. The result is an
/// acknowledgment only; failures are surfaced transiently to the user.
///
/// # Errors
///
/// Returns [`AppError::Evaluation`] when the backend reports failure.
pub async fn run_evaluation(client: &impl Backend) -> Result<(), AppError> {
    client.trigger_evaluation().await
}
