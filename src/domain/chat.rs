//! Chat channels and messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::board::Board;
use super::identifier::Identifier;
use super::member::TeamMember;
use super::task::TaskAttachment;

/// A message in a chat channel.
///
/// Voice notes carry their audio location and duration inline; both fields
/// are absent for ordinary text messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Identifier<ChatMessage>,
    pub channel_id: Identifier<ChatChannel>,
    pub author_id: Identifier<TeamMember>,
    pub body: String,
    #[serde(default)]
    pub attachments: Vec<TaskAttachment>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_system_message: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_note_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_note_duration: Option<f64>,
}

impl ChatMessage {
    /// New text message with a generated id and current timestamp.
    pub fn new(
        channel_id: Identifier<ChatChannel>,
        author_id: Identifier<TeamMember>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: Identifier::new(),
            channel_id,
            author_id,
            body: body.into(),
            attachments: Vec::new(),
            created_at: Utc::now(),
            is_system_message: false,
            voice_note_url: None,
            voice_note_duration: None,
        }
    }
}

/// A chat channel, optionally linked to a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatChannel {
    pub id: Identifier<ChatChannel>,
    pub title: String,
    pub participant_ids: Vec<Identifier<TeamMember>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_board_id: Option<Identifier<Board>>,
    pub created_at: DateTime<Utc>,
}
