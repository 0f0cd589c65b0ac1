use crate::models::reaction::{ReactionKind, ReactionSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

/// Set (or clear, with `timestamp: null`) one reaction on a video
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ReactRequest {
    pub kind: ReactionKind,
    /// Playback position in seconds
    #[serde(default)]
    #[validate(range(min = 0.0, max = 86400.0))]
    pub timestamp: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserReactionDto {
    pub user_id: String,
    pub reactions: ReactionSet,
}

/// Reactions on a video as seen by one viewer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoReactionsDto {
    pub video_id: String,
    pub mine: ReactionSet,
    pub others: Vec<UserReactionDto>,
    pub totals: BTreeMap<ReactionKind, usize>,
}

impl VideoReactionsDto {
    /// Split the caller's own set out of per-user sets and count each kind
    pub fn assemble(video_id: &str, viewer: &str, sets: Vec<(String, ReactionSet)>) -> Self {
        let mut mine = ReactionSet::default();
        let mut others = Vec::new();
        let mut totals: BTreeMap<ReactionKind, usize> =
            ReactionKind::ALL.iter().map(|k| (*k, 0)).collect();

        for (user_id, set) in sets {
            if set.is_empty() {
                continue;
            }
            for kind in set.kinds() {
                *totals.entry(kind).or_default() += 1;
            }
            if user_id == viewer {
                mine = set;
            } else {
                others.push(UserReactionDto {
                    user_id,
                    reactions: set,
                });
            }
        }
        others.sort_by(|a, b| a.user_id.cmp(&b.user_id));

        Self {
            video_id: video_id.to_string(),
            mine,
            others,
            totals,
        }
    }
}
