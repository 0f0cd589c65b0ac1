use crate::error::db_failure;
use arangors::client::reqwest::ReqwestClient;
use arangors::document::options::InsertOptions;
use arangors::Database;
use shared::models::city::CITY_COLLECTION;
use shared::{City, Result, SharedError};
use validator::Validate;

#[derive(Clone)]
pub struct CityRepositoryImpl {
    pub db: Database<ReqwestClient>,
}

impl CityRepositoryImpl {
    pub fn new(db: Database<ReqwestClient>) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
pub trait CityRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<City>>;
    /// Case-insensitive name prefix match, most populous first
    async fn search_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<City>>;
    async fn create(&self, city: City) -> Result<City>;
}

#[async_trait::async_trait]
impl CityRepository for CityRepositoryImpl {
    async fn find_by_id(&self, id: &str) -> Result<Option<City>> {
        let query = arangors::AqlQuery::builder()
            .query("FOR c IN city FILTER c._id == @id LIMIT 1 RETURN c")
            .bind_var("id", id)
            .build();
        let mut cities: Vec<City> = self
            .db
            .aql_query(query)
            .await
            .map_err(|e| db_failure("Failed to load city", e))?;
        Ok(cities.pop())
    }

    async fn search_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<City>> {
        let query = arangors::AqlQuery::builder()
            .query(
                "FOR c IN city \
                 FILTER STARTS_WITH(LOWER(c.name), LOWER(@prefix)) \
                 SORT c.population DESC, c.name ASC \
                 LIMIT @limit \
                 RETURN c",
            )
            .bind_var("prefix", prefix)
            .bind_var("limit", limit)
            .build();
        self.db
            .aql_query(query)
            .await
            .map_err(|e| db_failure("Failed to search cities", e))
    }

    async fn create(&self, city: City) -> Result<City> {
        city.validate()?;
        let collection = self
            .db
            .collection(CITY_COLLECTION)
            .await
            .map_err(|e| db_failure("Failed to get city collection", e))?;
        let result = collection
            .create_document(city, InsertOptions::builder().return_new(true).build())
            .await
            .map_err(|e| db_failure("Failed to create city", e))?;
        result
            .new_doc()
            .cloned()
            .ok_or_else(|| SharedError::Database("No document returned after creation".to_string()))
    }
}
