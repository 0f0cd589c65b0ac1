use crate::error::ApiError;
use crate::user::session::{SessionStore, SessionUser};
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::ErrorUnauthorized,
    http::header,
    Error, FromRequest, HttpMessage, HttpRequest,
};
use futures_util::future::{ready, Ready};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Session id from an `Authorization: Bearer <id>` header
pub fn bearer_token(headers: &header::HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

fn is_public(path: &str) -> bool {
    path.starts_with("/health")
}

/// Rejects requests without a live session and exposes the session's
/// [`SessionUser`] to handlers through request extensions.
pub struct AuthMiddleware {
    pub sessions: Arc<dyn SessionStore>,
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Arc::new(service),
            sessions: self.sessions.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Arc<S>,
    sessions: Arc<dyn SessionStore>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let sessions = self.sessions.clone();
        let service = self.service.clone();
        let path = req.path().to_string();
        let method = req.method().to_string();

        Box::pin(async move {
            let Some(session_id) = bearer_token(req.headers()) else {
                if is_public(&path) {
                    log::debug!("Public endpoint {} {} - allowing without auth", method, path);
                    return service.call(req).await;
                }
                log::debug!("No Authorization header for {} {}", method, path);
                return Err(ErrorUnauthorized("Authentication required"));
            };

            match sessions.get_session(&session_id).await {
                Ok(Some(user)) => {
                    log::debug!("Authenticated {} for {} {}", user.user_id, method, path);
                    req.extensions_mut().insert(user);
                    service.call(req).await
                }
                Ok(None) => {
                    log::warn!("Invalid or expired session for {} {}", method, path);
                    Err(ErrorUnauthorized("Invalid or expired session"))
                }
                Err(e) => {
                    log::error!("Error retrieving session: {}", e);
                    Err(ErrorUnauthorized("Session service unavailable"))
                }
            }
        })
    }
}

impl FromRequest for SessionUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<SessionUser>()
                .cloned()
                .ok_or_else(|| ApiError::unauthorized("Authentication required")),
        )
    }
}
