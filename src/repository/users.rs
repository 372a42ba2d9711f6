//! Guest user backend for demo and offline deployments.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::{Identifier, Team, TeamMember, TeamRole};
use crate::errors::RepositoryError;
use crate::registry::ChannelRegistry;
use crate::source::SnapshotStream;

use super::UserRepository;

/// Demo sign-in with a fixed member roster.
///
/// Whoever signs in is appended to (or replaces their entry in) the
/// roster, and every member-list subscriber is notified. The team id is
/// ignored: the demo deployment has a single implicit team.
pub struct GuestUserRepository {
    current: Mutex<Option<TeamMember>>,
    default_members: Vec<TeamMember>,
    registry: ChannelRegistry<TeamMember>,
}

impl Default for GuestUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl GuestUserRepository {
    pub fn new() -> Self {
        let default_members = vec![
            TeamMember::new(
                Identifier::from_raw("owner"),
                "Alex Ivanov",
                "alex@example.com",
                TeamRole::Owner,
            ),
            TeamMember::new(
                Identifier::from_raw("designer"),
                "Maria Petrova",
                "maria@example.com",
                TeamRole::Contributor,
            ),
            TeamMember::new(
                Identifier::from_raw("developer"),
                "Ivan Sidorov",
                "ivan@example.com",
                TeamRole::Contributor,
            ),
        ];
        Self {
            current: Mutex::new(None),
            default_members,
            registry: ChannelRegistry::new(),
        }
    }

    fn snapshot_members(&self) -> Vec<TeamMember> {
        let mut members = self.default_members.clone();
        let current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(current) = current.as_ref() {
            match members.iter_mut().find(|m| m.id == current.id) {
                Some(slot) => *slot = current.clone(),
                None => members.push(current.clone()),
            }
        }
        members
    }

    fn notify_members(&self) {
        let members = self.snapshot_members();
        self.registry.update_scopes(|_, latest| {
            *latest = members.clone();
            true
        });
    }
}

#[async_trait]
impl UserRepository for GuestUserRepository {
    async fn current_user(&self) -> Result<Option<TeamMember>, RepositoryError> {
        Ok(self
            .current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    async fn sign_in(&self, email: &str, _password: &str) -> Result<TeamMember, RepositoryError> {
        let display_name = email
            .split('@')
            .next()
            .filter(|prefix| !prefix.is_empty())
            .map(capitalized)
            .unwrap_or_else(|| "Guest".to_string());
        let member = TeamMember::new(
            Identifier::from_raw(email),
            display_name,
            email,
            TeamRole::Contributor,
        );
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(member.clone());
        self.notify_members();
        Ok(member)
    }

    async fn sign_out(&self) -> Result<(), RepositoryError> {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = None;
        self.notify_members();
        Ok(())
    }

    fn observe_team_members(&self, team_id: &Identifier<Team>) -> SnapshotStream<TeamMember> {
        let scope = team_id.as_str();
        let members = self.snapshot_members();
        self.registry.update(scope, |latest| {
            if *latest == members {
                false
            } else {
                *latest = members;
                true
            }
        });
        Box::pin(self.registry.subscribe(scope))
    }
}

fn capitalized(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
