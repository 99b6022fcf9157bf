//! Domain model for extracted summaries and their chat conversations.
//!
//! All entities are located by stable ids, never by object identity: a
//! snapshot is an immutable value and the "same" summary in two snapshots is
//! only the one with the same `SummaryId`.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title given to a conversation before its first message is sent. At most
/// one conversation per summary may hold this title at a time.
pub const NEW_CONVERSATION_TITLE: &str = "New conversation";

/// Stable identifier for a [`Summary`], assigned at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SummaryId(Uuid);

impl SummaryId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SummaryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SummaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Stable identifier for a [`Conversation`], assigned at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(Uuid);

impl ConversationId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Validation state of a single extracted row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowState {
    /// The user has not judged this row yet.
    Unset,
    /// The user confirmed the extracted value.
    Confirmed,
    /// The user rejected the extracted value; it is a candidate for
    /// correction.
    Rejected,
}

/// One (key, value, state) triple in a summary's extracted field set.
///
/// Rows are created in a single batch when their summary is created and are
/// never added or removed afterwards, only mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub key: String,
    pub value: String,
    pub state: RowState,
}

/// Role of a chat message, derived from its position: even indices are the
/// user's lines, odd indices the assistant's replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        if index % 2 == 0 {
            Self::User
        } else {
            Self::Assistant
        }
    }
}

/// One named chat thread associated with a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<String>,
}

impl Conversation {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: ConversationId::new(),
            title: NEW_CONVERSATION_TITLE.to_string(),
            messages: Vec::new(),
        }
    }

    /// Whether the conversation still carries the sentinel title.
    #[must_use]
    pub fn is_untitled(&self) -> bool {
        self.title == NEW_CONVERSATION_TITLE
    }

    /// Role of the message at `index`, by parity.
    #[must_use]
    pub const fn role_of(&self, index: usize) -> MessageRole {
        MessageRole::from_index(index)
    }

    /// True when every user line has a matching assistant reply. Holds
    /// between exchanges; a failed exchange can leave the count odd, which
    /// the streaming engine logs rather than assumes away.
    #[must_use]
    pub fn has_balanced_messages(&self) -> bool {
        self.messages.len() % 2 == 0
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

/// The structured result of extracting fields from one uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub id: SummaryId,
    /// Names the backend-side extracted artifact (vector store). Immutable.
    pub source_file_name: String,
    /// User-facing name, unique across all summaries.
    pub display_name: String,
    pub rows: Vec<Row>,
    #[serde(default, deserialize_with = "lenient_conversations")]
    pub conversations: Vec<Conversation>,
    pub validated: bool,
}

impl Summary {
    /// Builds a summary from one batch of extracted fields. Every row starts
    /// `Unset`; the display name starts as the source file name.
    #[must_use]
    pub fn from_extracted_fields(source_file_name: &str, fields: Vec<(String, String)>) -> Self {
        let rows = fields
            .into_iter()
            .map(|(key, value)| Row {
                key,
                value,
                state: RowState::Unset,
            })
            .collect();

        Self {
            id: SummaryId::new(),
            source_file_name: source_file_name.to_string(),
            display_name: source_file_name.to_string(),
            rows,
            conversations: Vec::new(),
            validated: false,
        }
    }

    /// Keys of all currently rejected rows, in row order.
    #[must_use]
    pub fn rejected_keys(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter(|row| row.state == RowState::Rejected)
            .map(|row| row.key.clone())
            .collect()
    }

    #[must_use]
    pub fn row(&self, key: &str) -> Option<&Row> {
        self.rows.iter().find(|row| row.key == key)
    }

    pub fn row_mut(&mut self, key: &str) -> Option<&mut Row> {
        self.rows.iter_mut().find(|row| row.key == key)
    }

    #[must_use]
    pub fn conversation(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn conversation_mut(&mut self, id: ConversationId) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id == id)
    }

    /// The conversation still holding the sentinel title, if any.
    #[must_use]
    pub fn untitled_conversation(&self) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.is_untitled())
    }
}

/// Accepts a missing or malformed conversation list by defaulting it to
/// empty, keeping older persisted shapes loadable.
fn lenient_conversations<'de, D>(deserializer: D) -> Result<Vec<Conversation>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}
