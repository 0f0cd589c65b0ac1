pub mod app;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod health;
pub mod metrics;
pub mod middleware;
pub mod openapi;
pub mod schema;

pub mod storage {
    pub mod controller;
    pub mod filesystem;
    pub mod http;
    pub mod object_store;
}

pub mod user {
    pub mod controller;
    pub mod error;
    pub mod repository;
    pub mod session;
    pub mod usecase;
}

pub mod city {
    pub mod repository;
}

pub mod search {
    pub mod controller;
}

pub mod event {
    pub mod controller;
    pub mod media;
    pub mod repository;
    pub mod usecase;
}

pub mod tagging {
    pub mod controller;
    pub mod repository;
    pub mod usecase;
}

pub mod reactions {
    pub mod batch;
    pub mod cache;
    pub mod controller;
    pub mod repository;

    pub use batch::ReactionBatcher;
    pub use cache::ReactionCache;
}

pub mod tv {
    pub mod controller;
}

// In-memory repositories and stores shared by unit tests
#[cfg(test)]
mod mocks;
