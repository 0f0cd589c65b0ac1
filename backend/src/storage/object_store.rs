//! Object storage abstraction used for event posters and gallery images.

use crate::config::{StorageBackend, StorageConfig};
use crate::error::ApiError;
use crate::metrics::record_storage_operation;
use async_trait::async_trait;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use shared::FileUpload;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::filesystem::FilesystemStore;
use super::http::HttpStore;

/// Largest accepted upload after base64 decoding
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("unsupported content type: {0}")]
    UnsupportedType(String),

    #[error("upload too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("invalid upload data: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("gateway error: {0}")]
    Gateway(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => ApiError::not_found(&format!("Object not found: {}", key)),
            StorageError::InvalidKey(_)
            | StorageError::UnsupportedType(_)
            | StorageError::TooLarge { .. }
            | StorageError::Decode(_) => ApiError::bad_request(&err.to_string()),
            other => ApiError::new("STORAGE_ERROR", &other.to_string(), 500),
        }
    }
}

/// Where a stored object lives and how clients fetch it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<StoredObject>;
    async fn get(&self, key: &str) -> StorageResult<Vec<u8>>;
    async fn delete(&self, key: &str) -> StorageResult<()>;
    async fn exists(&self, key: &str) -> StorageResult<bool>;
    async fn health(&self) -> StorageResult<()>;
    fn backend_name(&self) -> &'static str;
}

/// Create an object store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn ObjectStore>> {
    match config.backend {
        StorageBackend::Filesystem => {
            let store = FilesystemStore::new(&config.path, &config.public_url).await?;
            Ok(Arc::new(store))
        }
        StorageBackend::Http => {
            let endpoint = config
                .endpoint
                .as_deref()
                .ok_or_else(|| StorageError::Config("STORAGE_ENDPOINT is not set".to_string()))?;
            let bucket = config
                .bucket
                .as_deref()
                .ok_or_else(|| StorageError::Config("STORAGE_BUCKET is not set".to_string()))?;
            let store = HttpStore::new(endpoint, bucket, config.token.clone(), &config.public_url)?;
            Ok(Arc::new(store))
        }
    }
}

/// Reject keys that could escape the bucket or root directory
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("empty key".to_string()));
    }
    if key.starts_with('/') || key.starts_with('\\') {
        return Err(StorageError::InvalidKey(format!("absolute key not allowed: {}", key)));
    }
    for segment in key.split(['/', '\\']) {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(StorageError::InvalidKey(format!("unsafe segment in key: {}", key)));
        }
    }
    Ok(())
}

/// File extension for the image types we accept
pub fn extension_for(content_type: &str) -> StorageResult<&'static str> {
    match content_type.trim().to_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Ok("jpg"),
        "image/png" => Ok("png"),
        "image/webp" => Ok("webp"),
        "image/gif" => Ok("gif"),
        other => Err(StorageError::UnsupportedType(other.to_string())),
    }
}

/// Content type served back for a stored key
pub fn content_type_for(key: &str) -> &'static str {
    match key.rsplit('.').next().map(|e| e.to_lowercase()).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

/// `events/{event_key}/{purpose}-{uuid}.{ext}`
pub fn object_key(event_key: &str, purpose: &str, content_type: &str) -> StorageResult<String> {
    let ext = extension_for(content_type)?;
    let key = format!("events/{}/{}-{}.{}", event_key, purpose, Uuid::new_v4(), ext);
    validate_key(&key)?;
    Ok(key)
}

const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode an inline upload, enforcing type and size limits
pub fn decode_upload(upload: &FileUpload) -> StorageResult<Vec<u8>> {
    extension_for(&upload.content_type)?;

    // Accept data urls as produced by FileReader.readAsDataURL
    let data = match upload.data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => upload.data.as_str(),
    };
    let data: String = data.chars().filter(|c| !c.is_whitespace()).collect();

    // Base64 inflates by 4/3; bail before decoding anything huge
    if data.len() / 4 * 3 > MAX_UPLOAD_BYTES + 3 {
        return Err(StorageError::TooLarge {
            size: data.len() / 4 * 3,
            max: MAX_UPLOAD_BYTES,
        });
    }

    let bytes = LENIENT
        .decode(data.as_bytes())
        .map_err(|e| StorageError::Decode(format!("{}: {}", upload.filename, e)))?;
    if bytes.is_empty() {
        return Err(StorageError::Decode(format!("{} is empty", upload.filename)));
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(StorageError::TooLarge {
            size: bytes.len(),
            max: MAX_UPLOAD_BYTES,
        });
    }
    Ok(bytes)
}

/// Put an object and count the outcome
pub async fn put_recorded(
    store: &dyn ObjectStore,
    key: &str,
    data: Vec<u8>,
    content_type: &str,
) -> StorageResult<StoredObject> {
    let result = store.put(key, data, content_type).await;
    record_storage_operation("put", result.is_ok());
    if let Err(e) = &result {
        log::error!("Failed to store {}: {}", key, e);
    }
    result
}

/// Delete objects, logging failures instead of returning them
pub async fn delete_quietly(store: &dyn ObjectStore, keys: &[String]) {
    for key in keys {
        let result = store.delete(key).await;
        record_storage_operation("delete", result.is_ok() || matches!(result, Err(StorageError::NotFound(_))));
        match result {
            Ok(()) => log::debug!("Deleted object {}", key),
            Err(StorageError::NotFound(_)) => log::debug!("Object {} already gone", key),
            Err(e) => log::warn!("Failed to delete object {}: {}", key, e),
        }
    }
}

/// Join a base url and key without doubling slashes
pub fn public_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}
