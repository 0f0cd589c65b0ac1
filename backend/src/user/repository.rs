use crate::error::db_failure;
use arangors::client::reqwest::ReqwestClient;
use arangors::document::options::InsertOptions;
use arangors::Database;
use shared::models::user::USER_COLLECTION;
use shared::{Result, SharedError, User};

#[derive(Clone)]
pub struct UserRepositoryImpl {
    pub db: Database<ReqwestClient>,
}

impl UserRepositoryImpl {
    pub fn new(db: Database<ReqwestClient>) -> Self {
        Self { db }
    }

    async fn first(&self, query: arangors::AqlQuery<'_>, context: &str) -> Result<Option<User>> {
        let mut users: Vec<User> = self
            .db
            .aql_query(query)
            .await
            .map_err(|e| db_failure(context, e))?;
        Ok(users.pop())
    }
}

#[async_trait::async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
    /// Contains-match on username or display name, ordered by username
    async fn search(&self, term: &str, limit: usize) -> Result<Vec<User>>;
    async fn create(&self, user: User) -> Result<User>;
}

#[async_trait::async_trait]
impl UserRepository for UserRepositoryImpl {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let query = arangors::AqlQuery::builder()
            .query("FOR u IN user FILTER u._id == @id LIMIT 1 RETURN u")
            .bind_var("id", id)
            .build();
        self.first(query, "Failed to load user").await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let query = arangors::AqlQuery::builder()
            .query("FOR u IN user FILTER LOWER(u.email) == LOWER(@email) LIMIT 1 RETURN u")
            .bind_var("email", email)
            .build();
        self.first(query, "Failed to look up email").await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let query = arangors::AqlQuery::builder()
            .query("FOR u IN user FILTER LOWER(u.username) == LOWER(@username) LIMIT 1 RETURN u")
            .bind_var("username", username)
            .build();
        self.first(query, "Failed to look up username").await
    }

    async fn search(&self, term: &str, limit: usize) -> Result<Vec<User>> {
        let query = arangors::AqlQuery::builder()
            .query(
                "FOR u IN user \
                 FILTER CONTAINS(LOWER(u.username), LOWER(@term)) \
                     OR CONTAINS(LOWER(u.displayName), LOWER(@term)) \
                 SORT u.username ASC \
                 LIMIT @limit \
                 RETURN u",
            )
            .bind_var("term", term)
            .bind_var("limit", limit)
            .build();
        self.db
            .aql_query(query)
            .await
            .map_err(|e| db_failure("Failed to search users", e))
    }

    async fn create(&self, user: User) -> Result<User> {
        let collection = self
            .db
            .collection(USER_COLLECTION)
            .await
            .map_err(|e| db_failure("Failed to get user collection", e))?;

        let insert_options = InsertOptions::builder().return_new(true).build();
        let result = collection
            .create_document(user, insert_options)
            .await
            .map_err(|e| db_failure("Failed to create user", e))?;

        result
            .new_doc()
            .cloned()
            .ok_or_else(|| SharedError::Database("No document returned after creation".to_string()))
    }
}
