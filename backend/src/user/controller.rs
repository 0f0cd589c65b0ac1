use crate::auth::bearer_token;
use crate::error::ApiError;
use crate::user::error::UserError;
use crate::user::repository::{UserRepository, UserRepositoryImpl};
use crate::user::session::{RedisSessionStore, SessionStore, SessionUser};
use crate::user::usecase::{UserUseCase, UserUseCaseImpl};
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use log::{error, info, warn};
use shared::{LoginRequest, LoginResponse, RegisterRequest, User, UserDto};
use uuid::Uuid;

async fn open_session<S: SessionStore>(session_store: &S, user: &User) -> Result<LoginResponse, ApiError> {
    let session_id = Uuid::new_v4().to_string();
    session_store
        .set_session(&session_id, &SessionUser::new(user.id.clone(), user.is_admin))
        .await
        .map_err(|e| {
            error!("Session store error for {}: {}", user.id, e);
            UserError::Session(format!("Session store error: {}", e))
        })?;
    Ok(LoginResponse {
        user: UserDto::from(user),
        session_id,
    })
}

pub async fn register_handler_impl<R, S>(
    registration: web::Json<RegisterRequest>,
    session_store: web::Data<S>,
    repo: web::Data<R>,
) -> Result<HttpResponse, ApiError>
where
    R: UserRepository + Clone + 'static,
    S: SessionStore + 'static,
{
    let username = registration.username.clone();
    let usecase = UserUseCaseImpl { repo: repo.get_ref().clone() };

    match usecase.register(registration.into_inner()).await {
        Ok(user) => {
            info!("User {} registered as {}", username, user.id);
            let response = open_session(session_store.get_ref(), &user).await?;
            Ok(HttpResponse::Created().json(response))
        }
        Err(e @ UserError::AlreadyExists(_)) => {
            info!("Registration rejected for {}: {}", username, e);
            Err(e.into())
        }
        Err(e) => {
            warn!("Registration failed for {}: {}", username, e);
            Err(e.into())
        }
    }
}

#[post("/register")]
pub async fn register_handler_prod(
    registration: web::Json<RegisterRequest>,
    session_store: web::Data<RedisSessionStore>,
    repo: web::Data<UserRepositoryImpl>,
) -> Result<HttpResponse, ApiError> {
    register_handler_impl(registration, session_store, repo).await
}

pub async fn login_handler_impl<R, S>(
    login: web::Json<LoginRequest>,
    session_store: web::Data<S>,
    repo: web::Data<R>,
) -> Result<HttpResponse, ApiError>
where
    R: UserRepository + Clone + 'static,
    S: SessionStore + 'static,
{
    let email = login.email.clone();
    let usecase = UserUseCaseImpl { repo: repo.get_ref().clone() };

    match usecase.login(login.into_inner()).await {
        Ok(user) => {
            let response = open_session(session_store.get_ref(), &user).await?;
            info!("User {} logged in", user.id);
            Ok(HttpResponse::Ok().json(response))
        }
        Err(UserError::InvalidCredentials) => {
            info!("Failed login attempt for {}", email);
            Err(UserError::InvalidCredentials.into())
        }
        Err(e) => {
            error!("Unexpected login error for {}: {}", email, e);
            Err(e.into())
        }
    }
}

#[post("/login")]
pub async fn login_handler_prod(
    login: web::Json<LoginRequest>,
    session_store: web::Data<RedisSessionStore>,
    repo: web::Data<UserRepositoryImpl>,
) -> Result<HttpResponse, ApiError> {
    login_handler_impl(login, session_store, repo).await
}

pub async fn logout_handler_impl<S: SessionStore + 'static>(
    req: HttpRequest,
    session_store: web::Data<S>,
) -> Result<HttpResponse, ApiError> {
    let Some(session_id) = bearer_token(req.headers()) else {
        warn!("Logout attempt without Authorization header");
        return Err(ApiError::bad_request("Missing Authorization header"));
    };

    session_store.delete_session(&session_id).await.map_err(|e| {
        error!("Session store error during logout: {}", e);
        UserError::Session(format!("Session store error: {}", e))
    })?;

    info!("Session terminated");
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Logged out successfully",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

#[post("/logout")]
pub async fn logout_handler_prod(
    req: HttpRequest,
    session_store: web::Data<RedisSessionStore>,
) -> Result<HttpResponse, ApiError> {
    logout_handler_impl(req, session_store).await
}

pub async fn me_handler_impl<R: UserRepository + Clone + 'static>(
    user: SessionUser,
    repo: web::Data<R>,
) -> Result<HttpResponse, ApiError> {
    let usecase = UserUseCaseImpl { repo: repo.get_ref().clone() };
    let found = usecase.get_user(&user.user_id).await?;
    Ok(HttpResponse::Ok().json(UserDto::from(&found)))
}

#[get("")]
pub async fn me_handler_prod(
    user: SessionUser,
    repo: web::Data<UserRepositoryImpl>,
) -> Result<HttpResponse, ApiError> {
    me_handler_impl(user, repo).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{InjectUser, MemoryDb};
    use crate::user::session::MockSessionStore;
    use actix_web::{test, App};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn register_body() -> serde_json::Value {
        json!({
            "username": "bgirl_jo",
            "displayName": "Bgirl Jo",
            "email": "jo@example.com",
            "password": "password123"
        })
    }

    #[actix_web::test]
    async fn register_login_me_logout() {
        let repo = MemoryDb::default();
        let sessions = MockSessionStore::default();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(repo.clone()))
                .app_data(web::Data::new(sessions.clone()))
                .route("/register", web::post().to(register_handler_impl::<MemoryDb, MockSessionStore>))
                .route("/login", web::post().to(login_handler_impl::<MemoryDb, MockSessionStore>))
                .route("/logout", web::post().to(logout_handler_impl::<MockSessionStore>)),
        )
        .await;

        let req = test::TestRequest::post().uri("/register").set_json(register_body()).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 201);
        let created: LoginResponse = test::read_body_json(resp).await;
        assert_eq!(created.user.username, "bgirl_jo");

        let req = test::TestRequest::post()
            .uri("/login")
            .set_json(json!({"email": "jo@example.com", "password": "password123"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 200);
        let login: LoginResponse = test::read_body_json(resp).await;
        let stored = sessions.get_session(&login.session_id).await.unwrap().unwrap();
        assert_eq!(stored.user_id, created.user.id);

        let req = test::TestRequest::post()
            .uri("/logout")
            .insert_header(("Authorization", format!("Bearer {}", login.session_id)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 200);
        assert_eq!(sessions.get_session(&login.session_id).await.unwrap(), None);
    }

    #[actix_web::test]
    async fn duplicate_registration_conflicts_and_bad_login_is_401() {
        let repo = MemoryDb::default();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(repo))
                .app_data(web::Data::new(MockSessionStore::default()))
                .route("/register", web::post().to(register_handler_impl::<MemoryDb, MockSessionStore>))
                .route("/login", web::post().to(login_handler_impl::<MemoryDb, MockSessionStore>)),
        )
        .await;

        let req = test::TestRequest::post().uri("/register").set_json(register_body()).to_request();
        assert_eq!(test::call_service(&app, req).await.status().as_u16(), 201);
        let req = test::TestRequest::post().uri("/register").set_json(register_body()).to_request();
        assert_eq!(test::call_service(&app, req).await.status().as_u16(), 409);

        let req = test::TestRequest::post()
            .uri("/login")
            .set_json(json!({"email": "jo@example.com", "password": "nope-nope"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status().as_u16(), 401);
    }

    #[actix_web::test]
    async fn me_returns_current_user() {
        let repo = MemoryDb::default();
        let user = repo.insert_user("bboy_me", "me@example.com").await;

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(repo))
                .wrap(InjectUser(SessionUser::new(user.id.clone(), false)))
                .route("/me", web::get().to(me_handler_impl::<MemoryDb>)),
        )
        .await;

        let req = test::TestRequest::get().uri("/me").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 200);
        let dto: UserDto = test::read_body_json(resp).await;
        assert_eq!(dto.username, "bboy_me");
    }

    #[actix_web::test]
    async fn logout_without_header_is_bad_request() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(MockSessionStore::default()))
                .route("/logout", web::post().to(logout_handler_impl::<MockSessionStore>)),
        )
        .await;
        let req = test::TestRequest::post().uri("/logout").to_request();
        assert_eq!(test::call_service(&app, req).await.status().as_u16(), 400);
    }
}
