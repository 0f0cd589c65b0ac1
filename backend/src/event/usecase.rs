use crate::error::ApiError;
use crate::event::media::{image_keys, orphaned_keys, resolve_images};
use crate::event::repository::{event_id, EventRepository};
use crate::storage::object_store::{delete_quietly, ObjectStore};
use crate::user::session::SessionUser;
use chrono::Utc;
use log::{info, warn};
use shared::roles::{diff_roles, tagged_users};
use shared::models::event::is_user_id;
use shared::{
    organizer, Event, EventFormDto, EventListQuery, MoveVideoRequest, ReorderBracketsRequest,
    Section,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

#[async_trait::async_trait]
pub trait EventUseCase: Send + Sync {
    async fn create(&self, form: EventFormDto, user: &SessionUser) -> Result<Event, ApiError>;
    async fn update(&self, id: &str, form: EventFormDto, user: &SessionUser) -> Result<Event, ApiError>;
    /// Returns the removed event
    async fn delete(&self, id: &str, user: &SessionUser) -> Result<Event, ApiError>;
    async fn get(&self, id: &str) -> Result<Event, ApiError>;
    async fn list(&self, query: &EventListQuery) -> Result<Vec<Event>, ApiError>;
    async fn list_user_events(&self, user_id: &str) -> Result<Vec<Event>, ApiError>;
    async fn move_video(
        &self,
        id: &str,
        section_id: &str,
        request: &MoveVideoRequest,
        user: &SessionUser,
    ) -> Result<Event, ApiError>;
    async fn reorder_brackets(
        &self,
        id: &str,
        section_id: &str,
        request: &ReorderBracketsRequest,
        user: &SessionUser,
    ) -> Result<Event, ApiError>;
}

pub struct EventUseCaseImpl<R: EventRepository> {
    pub repo: R,
    pub store: Arc<dyn ObjectStore>,
}

/// Team members without blanks, duplicates or the owner
fn team_members(form: &EventFormDto, owner_id: &str) -> Vec<String> {
    let mut members: Vec<String> = Vec::new();
    for member in &form.team_members {
        let member = member.trim();
        if member.is_empty() || member == owner_id || members.iter().any(|m| m == member) {
            continue;
        }
        members.push(member.to_string());
    }
    members
}

impl<R: EventRepository> EventUseCaseImpl<R> {
    async fn load(&self, id: &str) -> Result<Event, ApiError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found(&format!("Event {} not found", event_id(id))))
    }

    async fn load_for_edit(&self, id: &str, user: &SessionUser) -> Result<Event, ApiError> {
        let event = self.load(id).await?;
        if !event.can_edit(&user.user_id, user.is_admin) {
            return Err(ApiError::forbidden("You cannot edit this event"));
        }
        Ok(event)
    }

    /// Every credited user and team member must have an account
    async fn check_people(&self, event: &Event) -> Result<(), ApiError> {
        let mut people = tagged_users(event);
        for member in &event.team_members {
            if !people.contains(member) {
                people.push(member.clone());
            }
        }
        if let Some(bad) = people.iter().find(|id| !is_user_id(id)) {
            return Err(ApiError::bad_request(&format!("{} is not a user id", bad)));
        }
        let missing = self.repo.missing_users(&people).await?;
        if !missing.is_empty() {
            return Err(ApiError::bad_request(&format!(
                "Unknown users: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }

    /// Apply an in-place change to one section and persist the event
    async fn edit_section<F>(
        &self,
        id: &str,
        section_id: &str,
        user: &SessionUser,
        change: F,
    ) -> Result<Event, ApiError>
    where
        F: FnOnce(&mut Section) -> shared::Result<()> + Send,
    {
        let mut event = self.load_for_edit(id, user).await?;
        let section = event
            .find_section_mut(section_id)
            .ok_or_else(|| ApiError::not_found(&format!("Section {} not found", section_id)))?;
        change(section)?;
        event.updated_at = Utc::now().fixed_offset();
        Ok(self.repo.replace(event).await?)
    }
}

#[async_trait::async_trait]
impl<R: EventRepository> EventUseCase for EventUseCaseImpl<R> {
    async fn create(&self, form: EventFormDto, user: &SessionUser) -> Result<Event, ApiError> {
        form.validate()?;

        let key = Uuid::new_v4().simple().to_string();
        let now = Utc::now().fixed_offset();
        let mut event = Event {
            id: format!("event/{}", key),
            key: key.clone(),
            rev: String::new(),
            kind: form.kind,
            owner_id: user.user_id.clone(),
            team_members: team_members(&form, &user.user_id),
            details: form.details.clone(),
            poster: None,
            gallery: Vec::new(),
            roles: form.roles.clone(),
            sections: form.build_sections(),
            created_at: now,
            updated_at: now,
        };
        event.validate_all()?;
        self.check_people(&event).await?;

        let images = resolve_images(
            self.store.as_ref(),
            &key,
            None,
            form.poster.as_ref(),
            &form.gallery,
        )
        .await?;
        event.poster = images.poster;
        event.gallery = images.gallery;

        let created = match self.repo.insert(event).await {
            Ok(created) => created,
            Err(e) => {
                warn!("Event insert failed, removing {} uploads", images.uploaded.len());
                delete_quietly(self.store.as_ref(), &images.uploaded).await;
                return Err(e.into());
            }
        };

        let changes = diff_roles(None, &created);
        self.repo.add_edges(&created.id, &changes.added).await?;
        info!(
            "Event {} created by {} with {} credits",
            created.id,
            user.user_id,
            changes.added.len()
        );
        Ok(created)
    }

    async fn update(&self, id: &str, form: EventFormDto, user: &SessionUser) -> Result<Event, ApiError> {
        form.validate()?;
        let old = self.load_for_edit(id, user).await?;

        let mut event = Event {
            id: old.id.clone(),
            key: old.key.clone(),
            rev: old.rev.clone(),
            kind: form.kind,
            owner_id: old.owner_id.clone(),
            team_members: team_members(&form, &old.owner_id),
            details: form.details.clone(),
            poster: None,
            gallery: Vec::new(),
            roles: form.roles.clone(),
            sections: form.build_sections(),
            created_at: old.created_at,
            updated_at: Utc::now().fixed_offset(),
        };
        event.validate_all()?;
        self.check_people(&event).await?;

        let images = resolve_images(
            self.store.as_ref(),
            &old.key,
            Some(&old),
            form.poster.as_ref(),
            &form.gallery,
        )
        .await?;
        event.poster = images.poster;
        event.gallery = images.gallery;

        let updated = match self.repo.replace(event).await {
            Ok(updated) => updated,
            Err(e) => {
                delete_quietly(self.store.as_ref(), &images.uploaded).await;
                return Err(e.into());
            }
        };

        delete_quietly(self.store.as_ref(), &orphaned_keys(&old, &updated)).await;

        let changes = diff_roles(Some(&old), &updated);
        if !changes.is_empty() {
            self.repo.remove_edges(&updated.id, &changes.removed).await?;
            self.repo.add_edges(&updated.id, &changes.added).await?;
            info!(
                "Event {} credits: {} added, {} removed",
                updated.id,
                changes.added.len(),
                changes.removed.len()
            );
        }
        Ok(updated)
    }

    async fn delete(&self, id: &str, user: &SessionUser) -> Result<Event, ApiError> {
        let event = self.load(id).await?;
        if !(user.is_admin || event.owner_id == user.user_id) {
            return Err(ApiError::forbidden("Only the owner can delete this event"));
        }
        self.repo.delete_cascade(&event).await?;
        delete_quietly(self.store.as_ref(), &image_keys(&event)).await;
        info!("Event {} deleted by {}", event.id, user.user_id);
        Ok(event)
    }

    async fn get(&self, id: &str) -> Result<Event, ApiError> {
        self.load(id).await
    }

    async fn list(&self, query: &EventListQuery) -> Result<Vec<Event>, ApiError> {
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        Ok(self
            .repo
            .list(
                query.kind,
                query.city_id.as_deref(),
                query.offset.unwrap_or(0),
                limit,
            )
            .await?)
    }

    async fn list_user_events(&self, user_id: &str) -> Result<Vec<Event>, ApiError> {
        Ok(self.repo.list_for_user(user_id).await?)
    }

    async fn move_video(
        &self,
        id: &str,
        section_id: &str,
        request: &MoveVideoRequest,
        user: &SessionUser,
    ) -> Result<Event, ApiError> {
        self.edit_section(id, section_id, user, |section| {
            organizer::move_video(section, &request.from, &request.to)
        })
        .await
    }

    async fn reorder_brackets(
        &self,
        id: &str,
        section_id: &str,
        request: &ReorderBracketsRequest,
        user: &SessionUser,
    ) -> Result<Event, ApiError> {
        self.edit_section(id, section_id, user, |section| {
            organizer::reorder_brackets(section, request.from, request.to)
        })
        .await
    }
}
