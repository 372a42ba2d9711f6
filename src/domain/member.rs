//! Team members and roles.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::identifier::Identifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TeamRole {
    Owner,
    Admin,
    Contributor,
    Viewer,
}

impl TeamRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Contributor => "contributor",
            Self::Viewer => "viewer",
        }
    }
}

impl std::fmt::Display for TeamRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TeamRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "contributor" => Ok(Self::Contributor),
            "viewer" => Ok(Self::Viewer),
            _ => Err(format!("Invalid team role: {}", s)),
        }
    }
}

/// A member of the team, as shown in assignee pickers and the member list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub id: Identifier<TeamMember>,
    pub display_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub role: TeamRole,
    pub is_active: bool,
}

impl TeamMember {
    pub fn new(
        id: Identifier<TeamMember>,
        display_name: impl Into<String>,
        email: impl Into<String>,
        role: TeamRole,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            email: email.into(),
            avatar_url: None,
            role,
            is_active: true,
        }
    }
}
