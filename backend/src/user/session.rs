use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Seconds a session stays valid after login
pub const SESSION_TTL_SECS: u64 = 3600;

/// What a session id resolves to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    /// Format: "user/{key}"
    pub user_id: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl SessionUser {
    pub fn new(user_id: impl Into<String>, is_admin: bool) -> Self {
        Self {
            user_id: user_id.into(),
            is_admin,
        }
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn set_session(&self, session_id: &str, user: &SessionUser) -> Result<(), String>;
    async fn get_session(&self, session_id: &str) -> Result<Option<SessionUser>, String>;
    async fn delete_session(&self, session_id: &str) -> Result<(), String>;
}

#[derive(Clone)]
pub struct RedisSessionStore {
    pub client: redis::Client,
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn set_session(&self, session_id: &str, user: &SessionUser) -> Result<(), String> {
        let value = serde_json::to_string(user).map_err(|e| e.to_string())?;
        let mut conn = self
            .client
            .get_async_connection()
            .await
            .map_err(|e| e.to_string())?;
        redis::cmd("SETEX")
            .arg(session_id)
            .arg(SESSION_TTL_SECS)
            .arg(value)
            .query_async(&mut conn)
            .await
            .map_err(|e| e.to_string())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionUser>, String> {
        let mut conn = self
            .client
            .get_async_connection()
            .await
            .map_err(|e| e.to_string())?;
        let raw: Option<String> = redis::cmd("GET")
            .arg(session_id)
            .query_async(&mut conn)
            .await
            .map_err(|e| e.to_string())?;

        match raw {
            Some(raw) => match serde_json::from_str::<SessionUser>(&raw) {
                Ok(user) => Ok(Some(user)),
                Err(e) => {
                    log::warn!("Discarding unreadable session {}: {}", session_id, e);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), String> {
        let mut conn = self
            .client
            .get_async_connection()
            .await
            .map_err(|e| e.to_string())?;
        redis::cmd("DEL")
            .arg(session_id)
            .query_async(&mut conn)
            .await
            .map_err(|e| e.to_string())
    }
}

#[derive(Clone, Default)]
pub struct MockSessionStore {
    pub sessions: Arc<Mutex<HashMap<String, SessionUser>>>,
}

#[async_trait]
impl SessionStore for MockSessionStore {
    async fn set_session(&self, session_id: &str, user: &SessionUser) -> Result<(), String> {
        let mut sessions = self.sessions.lock().await;
        sessions.insert(session_id.to_string(), user.clone());
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionUser>, String> {
        let sessions = self.sessions.lock().await;
        Ok(sessions.get(session_id).cloned())
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), String> {
        let mut sessions = self.sessions.lock().await;
        sessions.remove(session_id);
        Ok(())
    }
}
