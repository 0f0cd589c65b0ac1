//! Poster and gallery handling for event forms.

use crate::error::ApiError;
use crate::storage::object_store::{
    decode_upload, delete_quietly, object_key, put_recorded, ObjectStore,
};
use shared::dto::event::new_item_id;
use shared::{Event, FileUpload, GalleryItemPayload, Image, ImagePayload};
use std::collections::HashSet;

/// Images an event ends up with, plus the keys written while resolving them
#[derive(Debug, Default)]
pub struct ResolvedImages {
    pub poster: Option<Image>,
    pub gallery: Vec<Image>,
    pub uploaded: Vec<String>,
}

enum Slot<'a> {
    Kept(Image),
    Pending {
        upload: &'a FileUpload,
        bytes: Vec<u8>,
        caption: Option<String>,
    },
}

fn prepare<'a>(
    payload: &'a ImagePayload,
    caption: Option<String>,
    existing: Option<&Event>,
    kept: &mut HashSet<String>,
) -> Result<Slot<'a>, ApiError> {
    match payload {
        ImagePayload::Keep { id } => {
            let image = existing
                .and_then(|event| event.images().find(|img| &img.id == id))
                .ok_or_else(|| ApiError::bad_request(&format!("Unknown image {}", id)))?;
            if !kept.insert(id.clone()) {
                return Err(ApiError::bad_request(&format!("Image {} is used twice", id)));
            }
            Ok(Slot::Kept(Image {
                caption,
                ..image.clone()
            }))
        }
        ImagePayload::Upload(upload) => Ok(Slot::Pending {
            upload,
            bytes: decode_upload(upload)?,
            caption,
        }),
    }
}

async fn store(
    store: &dyn ObjectStore,
    event_key: &str,
    purpose: &str,
    slot: Slot<'_>,
    uploaded: &mut Vec<String>,
) -> Result<Image, ApiError> {
    match slot {
        Slot::Kept(image) => Ok(image),
        Slot::Pending {
            upload,
            bytes,
            caption,
        } => {
            let key = object_key(event_key, purpose, &upload.content_type)?;
            let stored = put_recorded(store, &key, bytes, &upload.content_type).await?;
            uploaded.push(stored.key.clone());
            Ok(Image {
                id: new_item_id(),
                key: stored.key,
                url: stored.url,
                caption,
            })
        }
    }
}

/// Turn form payloads into stored images. Every upload is decoded before
/// anything is written; when a write fails the objects already written are
/// removed again.
pub async fn resolve_images(
    object_store: &dyn ObjectStore,
    event_key: &str,
    existing: Option<&Event>,
    poster: Option<&ImagePayload>,
    gallery: &[GalleryItemPayload],
) -> Result<ResolvedImages, ApiError> {
    let mut kept = HashSet::new();
    let poster_slot = poster
        .map(|p| {
            let caption = existing
                .and_then(|e| e.poster.as_ref())
                .and_then(|img| img.caption.clone());
            prepare(p, caption, existing, &mut kept)
        })
        .transpose()?;
    let mut gallery_slots = Vec::with_capacity(gallery.len());
    for item in gallery {
        gallery_slots.push(prepare(&item.image, item.caption.clone(), existing, &mut kept)?);
    }

    let mut resolved = ResolvedImages::default();
    let outcome: Result<(), ApiError> = async {
        if let Some(slot) = poster_slot {
            resolved.poster =
                Some(store(object_store, event_key, "poster", slot, &mut resolved.uploaded).await?);
        }
        for slot in gallery_slots {
            let image = store(object_store, event_key, "gallery", slot, &mut resolved.uploaded).await?;
            resolved.gallery.push(image);
        }
        Ok(())
    }
    .await;

    if let Err(e) = outcome {
        delete_quietly(object_store, &resolved.uploaded).await;
        return Err(e);
    }
    Ok(resolved)
}

/// Storage keys referenced by `old` that `new` no longer uses
pub fn orphaned_keys(old: &Event, new: &Event) -> Vec<String> {
    let still_used: HashSet<&str> = new.images().map(|img| img.key.as_str()).collect();
    old.images()
        .filter(|img| !still_used.contains(img.key.as_str()))
        .map(|img| img.key.clone())
        .collect()
}

pub fn image_keys(event: &Event) -> Vec<String> {
    event.images().map(|img| img.key.clone()).collect()
}
