use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a role credit can be attached
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Event,
    Section,
    Video,
}

/// A named contribution credit attached to a user
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Organizer,
    #[serde(rename = "DJ", alias = "Dj")]
    Dj,
    #[serde(rename = "MC", alias = "Mc")]
    Mc,
    Judge,
    Host,
    Teacher,
    Videographer,
    Photographer,
    Winner,
    Dancer,
}

impl Role {
    pub const ALL: [Role; 10] = [
        Role::Organizer,
        Role::Dj,
        Role::Mc,
        Role::Judge,
        Role::Host,
        Role::Teacher,
        Role::Videographer,
        Role::Photographer,
        Role::Winner,
        Role::Dancer,
    ];

    /// Display name, as shown on credits
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Organizer => "Organizer",
            Role::Dj => "DJ",
            Role::Mc => "MC",
            Role::Judge => "Judge",
            Role::Host => "Host",
            Role::Teacher => "Teacher",
            Role::Videographer => "Videographer",
            Role::Photographer => "Photographer",
            Role::Winner => "Winner",
            Role::Dancer => "Dancer",
        }
    }

    /// Whether this role may be credited at the given scope
    pub fn allowed_in(&self, scope: ScopeKind) -> bool {
        match scope {
            ScopeKind::Event => matches!(
                self,
                Role::Organizer
                    | Role::Dj
                    | Role::Mc
                    | Role::Judge
                    | Role::Host
                    | Role::Teacher
                    | Role::Videographer
                    | Role::Photographer
            ),
            ScopeKind::Section => matches!(self, Role::Judge | Role::Winner | Role::Dj | Role::Mc),
            ScopeKind::Video => {
                matches!(self, Role::Dancer | Role::Winner | Role::Dj | Role::Videographer)
            }
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Role::ALL
            .iter()
            .copied()
            .find(|role| role.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("Unknown role: {}", s))
    }
}

/// A role credited to a user on an event, section or video
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RoleAssignment {
    pub role: Role,
    #[serde(rename = "userId")]
    pub user_id: String,
}

impl RoleAssignment {
    pub fn new(role: Role, user_id: impl Into<String>) -> Self {
        Self {
            role,
            user_id: user_id.into(),
        }
    }
}
