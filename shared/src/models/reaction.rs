use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Collection holding one reaction row per (user, video)
pub const REACTION_COLLECTION: &str = "reaction";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ReactionKind {
    Fire,
    Clap,
    Wow,
    Laugh,
}

impl ReactionKind {
    pub const ALL: [ReactionKind; 4] = [
        ReactionKind::Fire,
        ReactionKind::Clap,
        ReactionKind::Wow,
        ReactionKind::Laugh,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::Fire => "fire",
            ReactionKind::Clap => "clap",
            ReactionKind::Wow => "wow",
            ReactionKind::Laugh => "laugh",
        }
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReactionKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown reaction: {}", s))
    }
}

/// At most one playback timestamp (seconds) per reaction kind
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReactionSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fire: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wow: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub laugh: Option<f64>,
}

impl ReactionSet {
    pub fn get(&self, kind: ReactionKind) -> Option<f64> {
        match kind {
            ReactionKind::Fire => self.fire,
            ReactionKind::Clap => self.clap,
            ReactionKind::Wow => self.wow,
            ReactionKind::Laugh => self.laugh,
        }
    }

    pub fn set(&mut self, kind: ReactionKind, timestamp: Option<f64>) {
        let slot = match kind {
            ReactionKind::Fire => &mut self.fire,
            ReactionKind::Clap => &mut self.clap,
            ReactionKind::Wow => &mut self.wow,
            ReactionKind::Laugh => &mut self.laugh,
        };
        *slot = timestamp;
    }

    pub fn is_empty(&self) -> bool {
        ReactionKind::ALL.iter().all(|k| self.get(*k).is_none())
    }

    /// Kinds that carry a timestamp, in declaration order
    pub fn kinds(&self) -> impl Iterator<Item = ReactionKind> + '_ {
        ReactionKind::ALL
            .into_iter()
            .filter(move |k| self.get(*k).is_some())
    }
}

/// A user's reactions to one video
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoReaction {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(rename = "_key", default, skip_serializing_if = "String::is_empty")]
    pub key: String,

    #[serde(rename = "_rev", default, skip_serializing_if = "String::is_empty")]
    pub rev: String,

    pub user_id: String,
    pub video_id: String,
    pub reactions: ReactionSet,
    pub updated_at: DateTime<FixedOffset>,
}
