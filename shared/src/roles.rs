//! Flattening of role credits and the old/new diff applied to `tagged` edges.

use crate::models::event::Event;
use crate::models::role::{Role, ScopeKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Where inside an event a credit lives
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum RoleScope {
    Event,
    Section {
        #[serde(rename = "sectionId")]
        section_id: String,
    },
    Video {
        #[serde(rename = "sectionId")]
        section_id: String,
        #[serde(rename = "videoId")]
        video_id: String,
    },
}

impl RoleScope {
    pub fn kind(&self) -> ScopeKind {
        match self {
            RoleScope::Event => ScopeKind::Event,
            RoleScope::Section { .. } => ScopeKind::Section,
            RoleScope::Video { .. } => ScopeKind::Video,
        }
    }
}

/// One user credited with one role at one place in an event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaggedRole {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub role: Role,
    #[serde(flatten)]
    pub scope: RoleScope,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleChanges {
    pub added: Vec<TaggedRole>,
    pub removed: Vec<TaggedRole>,
}

impl RoleChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Every credit in the event; duplicates collapse
pub fn collect_tagged_roles(event: &Event) -> BTreeSet<TaggedRole> {
    let mut out = BTreeSet::new();

    for assignment in &event.roles {
        out.insert(TaggedRole {
            user_id: assignment.user_id.clone(),
            role: assignment.role,
            scope: RoleScope::Event,
        });
    }

    for section in &event.sections {
        for assignment in &section.roles {
            out.insert(TaggedRole {
                user_id: assignment.user_id.clone(),
                role: assignment.role,
                scope: RoleScope::Section {
                    section_id: section.id.clone(),
                },
            });
        }
        for video in section.all_videos() {
            for assignment in &video.roles {
                out.insert(TaggedRole {
                    user_id: assignment.user_id.clone(),
                    role: assignment.role,
                    scope: RoleScope::Video {
                        section_id: section.id.clone(),
                        video_id: video.id.clone(),
                    },
                });
            }
        }
    }

    out
}

/// Credits to insert and to remove when `old` becomes `new`.
/// `old == None` means the event is being created.
pub fn diff_roles(old: Option<&Event>, new: &Event) -> RoleChanges {
    let before = old.map(collect_tagged_roles).unwrap_or_default();
    let after = collect_tagged_roles(new);

    RoleChanges {
        added: after.difference(&before).cloned().collect(),
        removed: before.difference(&after).cloned().collect(),
    }
}

/// Users credited anywhere in the event, sorted
pub fn tagged_users(event: &Event) -> Vec<String> {
    let users: BTreeSet<String> = collect_tagged_roles(event)
        .into_iter()
        .map(|t| t.user_id)
        .collect();
    users.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::fixtures::*;
    use crate::models::event::EventKind;
    use crate::models::role::RoleAssignment;
    use pretty_assertions::assert_eq;

    fn sample() -> Event {
        let mut event = event(
            EventKind::Competition,
            vec![
                bracketed_section("s1", vec![("b1", vec!["v1"])]),
                flat_section("s2", &["v2"]),
            ],
        );
        event.sections[0].roles.push(RoleAssignment::new(Role::Judge, "user/j"));
        event.sections[0].brackets[0].videos[0]
            .roles
            .push(RoleAssignment::new(Role::Dancer, "user/d1"));
        event.sections[1].videos[0]
            .roles
            .push(RoleAssignment::new(Role::Dancer, "user/d2"));
        event
    }

    #[test]
    fn creation_adds_everything() {
        let event = sample();
        let changes = diff_roles(None, &event);
        assert_eq!(changes.added.len(), 4);
        assert!(changes.removed.is_empty());
        assert!(changes.added.contains(&TaggedRole {
            user_id: "user/d1".into(),
            role: Role::Dancer,
            scope: RoleScope::Video {
                section_id: "s1".into(),
                video_id: "v1".into()
            },
        }));
    }

    #[test]
    fn unchanged_event_has_no_changes() {
        let event = sample();
        assert!(diff_roles(Some(&event), &event.clone()).is_empty());
    }

    #[test]
    fn swapped_dancer_is_removed_and_added() {
        let old = sample();
        let mut new = old.clone();
        new.sections[1].videos[0].roles = vec![RoleAssignment::new(Role::Dancer, "user/d3")];

        let changes = diff_roles(Some(&old), &new);
        assert_eq!(changes.added.len(), 1);
        assert_eq!(changes.added[0].user_id, "user/d3");
        assert_eq!(changes.removed.len(), 1);
        assert_eq!(changes.removed[0].user_id, "user/d2");
    }

    #[test]
    fn deleting_a_section_removes_its_credits() {
        let old = sample();
        let mut new = old.clone();
        new.sections.remove(0);

        let changes = diff_roles(Some(&old), &new);
        assert!(changes.added.is_empty());
        let removed: Vec<_> = changes.removed.iter().map(|t| t.user_id.as_str()).collect();
        assert_eq!(removed, vec!["user/d1", "user/j"]);
    }

    #[test]
    fn duplicates_collapse() {
        let mut event = sample();
        event.roles.push(RoleAssignment::new(Role::Organizer, "user/owner"));
        let changes = diff_roles(None, &event);
        let organizers = changes
            .added
            .iter()
            .filter(|t| t.role == Role::Organizer)
            .count();
        assert_eq!(organizers, 1);
    }

    #[test]
    fn same_user_different_scope_is_distinct() {
        let mut event = sample();
        event.sections[1].roles.push(RoleAssignment::new(Role::Judge, "user/j"));
        let roles = collect_tagged_roles(&event);
        let judge_scopes = roles.iter().filter(|t| t.user_id == "user/j").count();
        assert_eq!(judge_scopes, 2);
    }

    #[test]
    fn tagged_users_are_unique_and_sorted() {
        let event = sample();
        assert_eq!(
            tagged_users(&event),
            vec!["user/d1", "user/d2", "user/j", "user/owner"]
        );
    }

    #[test]
    fn scope_serializes_flat() {
        let tagged = TaggedRole {
            user_id: "user/a".into(),
            role: Role::Winner,
            scope: RoleScope::Section {
                section_id: "s1".into(),
            },
        };
        let json = serde_json::to_value(&tagged).unwrap();
        assert_eq!(json["scope"], "section");
        assert_eq!(json["sectionId"], "s1");
        assert_eq!(json["role"], "Winner");
    }
}
