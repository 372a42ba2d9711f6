//! Plain entity records shared by every repository.
//!
//! These are the domain types the sync layer moves around: boards with
//! their columns, tasks, chat channels and messages, and team members.
//! All of them serialize with the camelCase field names of the backend's
//! document format, with [`Identifier`] as a transparent string.

pub mod board;
pub mod chat;
pub mod identifier;
pub mod member;
pub mod task;

pub use board::{Board, TaskColumn, Team};
pub use chat::{ChatChannel, ChatMessage};
pub use identifier::Identifier;
pub use member::{TeamMember, TeamRole};
pub use task::{Task, TaskAttachment, TaskComment, TaskPriority, TaskStatus};
