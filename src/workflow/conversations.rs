//! Conversation management: opening, selecting, renaming, deleting.

use crate::core::models::{Conversation, ConversationId, SummaryId, NEW_CONVERSATION_TITLE};
use crate::errors::AppError;
use crate::store::{EntityStore, Selection};

/// Opens a chat thread on a summary and selects it.
///
/// At most one sentinel-titled conversation exists per summary: when one is
/// already there it is reused instead of creating another empty thread.
///
/// # Errors
///
/// Returns [`AppError::UnknownSummary`] when the id does not resolve.
pub fn open_conversation(
    store: &EntityStore,
    summary_id: SummaryId,
) -> Result<ConversationId, AppError> {
    let snapshot = store.apply(move |snapshot| {
        let mut next = snapshot.clone();
        let summary = next
            .summary_mut(summary_id)
            .ok_or(AppError::UnknownSummary(summary_id))?;

        let conversation_id = match summary.untitled_conversation() {
            Some(existing) => existing.id,
            None => {
                let conversation = Conversation::new();
                let id = conversation.id;
                summary.conversations.push(conversation);
                id
            }
        };

        next.selected = Some(Selection {
            summary_id,
            conversation_id,
        });
        Ok(next)
    })?;

    // The transform above always sets a selection on success.
    snapshot
        .selected
        .map(|selection| selection.conversation_id)
        .ok_or(AppError::UnknownSummary(summary_id))
}

/// Makes an existing conversation the selected one.
///
/// # Errors
///
/// Returns [`AppError::UnknownSummary`] or [`AppError::UnknownConversation`]
/// when either id does not resolve.
pub fn select_conversation(
    store: &EntityStore,
    summary_id: SummaryId,
    conversation_id: ConversationId,
) -> Result<(), AppError> {
    store.apply(move |snapshot| {
        if snapshot.summary(summary_id).is_none() {
            return Err(AppError::UnknownSummary(summary_id));
        }
        if snapshot.conversation(summary_id, conversation_id).is_none() {
            return Err(AppError::UnknownConversation(conversation_id));
        }
        let mut next = snapshot.clone();
        next.selected = Some(Selection {
            summary_id,
            conversation_id,
        });
        Ok(next)
    })?;
    Ok(())
}

/// Renames a conversation. Blank input is a no-op, and so is the reserved
/// new-thread title: accepting it would let a summary carry two
/// sentinel-titled conversations, and `open_conversation` would then hand
/// back a thread with history instead of a fresh one. Titles are otherwise
/// free-form; uniqueness is not required.
///
/// # Errors
///
/// Returns [`AppError::UnknownSummary`] or [`AppError::UnknownConversation`]
/// when either id does not resolve.
pub fn rename_conversation(
    store: &EntityStore,
    summary_id: SummaryId,
    conversation_id: ConversationId,
    new_title: &str,
) -> Result<(), AppError> {
    let new_title = new_title.trim();
    if new_title.is_empty() || new_title == NEW_CONVERSATION_TITLE {
        return Ok(());
    }

    let title = new_title.to_string();
    store.apply(move |snapshot| {
        let mut next = snapshot.clone();
        let summary = next
            .summary_mut(summary_id)
            .ok_or(AppError::UnknownSummary(summary_id))?;
        let conversation = summary
            .conversation_mut(conversation_id)
            .ok_or(AppError::UnknownConversation(conversation_id))?;
        conversation.title = title;
        Ok(next)
    })?;
    Ok(())
}

/// Removes a conversation from its summary. When the removed conversation was
/// the selected one, the selection is cleared.
///
/// # Errors
///
/// Returns [`AppError::UnknownSummary`] or [`AppError::UnknownConversation`]
/// when either id does not resolve.
pub fn delete_conversation(
    store: &EntityStore,
    summary_id: SummaryId,
    conversation_id: ConversationId,
) -> Result<(), AppError> {
    store.apply(move |snapshot| {
        let mut next = snapshot.clone();
        let summary = next
            .summary_mut(summary_id)
            .ok_or(AppError::UnknownSummary(summary_id))?;
        if summary.conversation(conversation_id).is_none() {
            return Err(AppError::UnknownConversation(conversation_id));
        }
        summary.conversations.retain(|c| c.id != conversation_id);
        if next
            .selected
            .is_some_and(|selection| selection.conversation_id == conversation_id)
        {
            next.selected = None;
        }
        Ok(next)
    })?;
    Ok(())
}

/// Clears the current selection, returning the view to the summary list.
pub fn clear_selection(store: &EntityStore) -> Result<(), AppError> {
    store.apply(|snapshot| {
        let mut next = snapshot.clone();
        next.selected = None;
        Ok(next)
    })?;
    Ok(())
}
