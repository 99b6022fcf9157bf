//! One streaming chat exchange against a conversation.
//!
//! The exchange is a small state machine: `Idle → Sending → Receiving →
//! Done`, `Cancelled`, or `Failed`. The user's input is appended
//! optimistically before any
//! network confirmation; the reply grows inside a single placeholder message
//! appended on the first decoded chunk. On failure the conversation keeps
//! whatever partial text arrived, there is no rollback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::backend::Backend;
use crate::chat::stream::ReplyStream;
use crate::core::models::{ConversationId, SummaryId};
use crate::errors::AppError;
use crate::store::EntityStore;
use crate::workflow::busy::{BusyFlags, OperationKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangePhase {
    Idle,
    Sending,
    Receiving,
    Done,
    /// The cancel token fired mid-stream; the reply is incomplete even
    /// though the exchange itself did not fail.
    Cancelled,
    Failed,
}

/// Capability invalidated by the UI when the user navigates away from a
/// conversation mid-stream. Ingestion checks it before every store mutation,
/// so a cancelled exchange stops folding chunks into a conversation nobody
/// is looking at anymore.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// What gets sent to the chat backend, captured from the same snapshot that
/// received the optimistic append.
#[derive(Debug, Clone)]
struct ExchangeRequest {
    document_ref: String,
    input_text: String,
    /// History so far, excluding the just-appended input.
    prior_messages: Vec<String>,
}

/// One request/response exchange with the chat backend.
pub struct ChatExchange {
    summary_id: SummaryId,
    conversation_id: ConversationId,
    phase: ExchangePhase,
    cancel: CancelToken,
}

impl ChatExchange {
    #[must_use]
    pub fn new(summary_id: SummaryId, conversation_id: ConversationId) -> Self {
        Self {
            summary_id,
            conversation_id,
            phase: ExchangePhase::Idle,
            cancel: CancelToken::new(),
        }
    }

    #[must_use]
    pub const fn phase(&self) -> ExchangePhase {
        self.phase
    }

    /// Token the presentation layer holds to invalidate this exchange on
    /// navigation.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Runs the whole exchange. Blank input is ignored. The send busy flag
    /// is held for the full exchange and released on every exit path.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::OperationInFlight`] when another send is running,
    /// [`AppError::ChatTransport`] on transport failure (partial reply text
    /// is retained), or an unknown-entity error when the target summary or
    /// conversation no longer exists.
    pub async fn run(
        &mut self,
        store: &EntityStore,
        client: &impl Backend,
        busy: &BusyFlags,
        input: &str,
    ) -> Result<(), AppError> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(());
        }

        let _guard = busy.try_acquire(OperationKind::Send)?;

        match self.drive(store, client, input).await {
            Ok(()) => {
                self.phase = if self.cancel.is_cancelled() {
                    ExchangePhase::Cancelled
                } else {
                    ExchangePhase::Done
                };
                Ok(())
            }
            Err(e) => {
                self.phase = ExchangePhase::Failed;
                error!("Chat exchange failed: {e}");
                Err(e)
            }
        }
    }

    async fn drive(
        &mut self,
        store: &EntityStore,
        client: &impl Backend,
        input: &str,
    ) -> Result<(), AppError> {
        let request = self.begin(store, input)?;
        let mut stream = client
            .chat(
                &request.document_ref,
                &request.input_text,
                &request.prior_messages,
            )
            .await?;
        self.fold(store, &mut stream).await
    }

    /// Appends the user's input optimistically, renames a still-untitled
    /// conversation to the input text, and captures the request payload from
    /// that same snapshot.
    fn begin(&mut self, store: &EntityStore, input: &str) -> Result<ExchangeRequest, AppError> {
        self.phase = ExchangePhase::Sending;

        let summary_id = self.summary_id;
        let conversation_id = self.conversation_id;
        let mut document_ref = String::new();
        let mut prior_messages = Vec::new();

        store.apply(|snapshot| {
            let mut next = snapshot.clone();
            let summary = next
                .summary_mut(summary_id)
                .ok_or(AppError::UnknownSummary(summary_id))?;
            document_ref = summary.source_file_name.clone();

            let conversation = summary
                .conversation_mut(conversation_id)
                .ok_or(AppError::UnknownConversation(conversation_id))?;

            if !conversation.has_balanced_messages() {
                warn!(
                    "Conversation {conversation_id} has an unanswered message before send; \
                     roles derived by parity will be shifted"
                );
            }

            prior_messages = conversation.messages.clone();
            conversation.messages.push(input.to_string());
            if conversation.is_untitled() {
                conversation.title = input.to_string();
            }
            Ok(next)
        })?;

        Ok(ExchangeRequest {
            document_ref,
            input_text: input.to_string(),
            prior_messages,
        })
    }

    /// Folds the streaming reply into the conversation: an empty placeholder
    /// message on the first chunk, concatenation onto that same message for
    /// every later chunk. Never inserts a second message.
    async fn fold(&mut self, store: &EntityStore, stream: &mut ReplyStream) -> Result<(), AppError> {
        let summary_id = self.summary_id;
        let conversation_id = self.conversation_id;
        let mut received_any = false;

        while let Some(chunk) = stream.next_chunk().await? {
            if self.cancel.is_cancelled() {
                info!("Exchange cancelled; dropping remaining chunks for {conversation_id}");
                break;
            }

            if !received_any {
                received_any = true;
                self.phase = ExchangePhase::Receiving;
                store.apply(|snapshot| {
                    let mut next = snapshot.clone();
                    let conversation = next
                        .summary_mut(summary_id)
                        .ok_or(AppError::UnknownSummary(summary_id))?
                        .conversation_mut(conversation_id)
                        .ok_or(AppError::UnknownConversation(conversation_id))?;
                    conversation.messages.push(String::new());
                    Ok(next)
                })?;
            }

            store.apply(|snapshot| {
                let mut next = snapshot.clone();
                let conversation = next
                    .summary_mut(summary_id)
                    .ok_or(AppError::UnknownSummary(summary_id))?
                    .conversation_mut(conversation_id)
                    .ok_or(AppError::UnknownConversation(conversation_id))?;
                let last = conversation
                    .messages
                    .last_mut()
                    .ok_or(AppError::UnknownConversation(conversation_id))?;
                last.push_str(&chunk);
                Ok(next)
            })?;
        }

        Ok(())
    }
}
