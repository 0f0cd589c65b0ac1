use arangors::client::ClientExt;
use arangors::index::{Index, IndexSettings};
use arangors::Database;
use log::{debug, info};
use shared::models::{
    city::CITY_COLLECTION, event::EVENT_COLLECTION, reaction::REACTION_COLLECTION,
    tagging::TAGGING_COLLECTION, user::USER_COLLECTION,
};
use shared::{Result, SharedError};

/// Edge collection linking users to events they are credited on
pub const TAGGED_COLLECTION: &str = "tagged";

pub const DOCUMENT_COLLECTIONS: [&str; 5] = [
    USER_COLLECTION,
    CITY_COLLECTION,
    EVENT_COLLECTION,
    TAGGING_COLLECTION,
    REACTION_COLLECTION,
];

/// A persistent index the service relies on
pub struct IndexSpec {
    pub collection: &'static str,
    pub name: &'static str,
    pub fields: &'static [&'static str],
    pub unique: bool,
}

pub const INDEXES: [IndexSpec; 7] = [
    IndexSpec {
        collection: USER_COLLECTION,
        name: "idx_user_email",
        fields: &["email"],
        unique: true,
    },
    IndexSpec {
        collection: USER_COLLECTION,
        name: "idx_user_username",
        fields: &["username"],
        unique: true,
    },
    IndexSpec {
        collection: CITY_COLLECTION,
        name: "idx_city_population",
        fields: &["population"],
        unique: false,
    },
    IndexSpec {
        collection: EVENT_COLLECTION,
        name: "idx_event_owner",
        fields: &["ownerId"],
        unique: false,
    },
    IndexSpec {
        collection: TAGGING_COLLECTION,
        name: "idx_tagging_event_status",
        fields: &["eventId", "status"],
        unique: false,
    },
    IndexSpec {
        collection: TAGGING_COLLECTION,
        name: "idx_tagging_user",
        fields: &["userId"],
        unique: false,
    },
    IndexSpec {
        collection: REACTION_COLLECTION,
        name: "idx_reaction_user_video",
        fields: &["userId", "videoId"],
        unique: true,
    },
];

fn failure(what: &str, name: &str, e: arangors::ClientError) -> SharedError {
    SharedError::Database(format!("Failed to create {} {}: {}", what, name, e))
}

/// Create missing collections and indexes; safe to run on every start
pub async fn ensure_schema<C: ClientExt>(db: &Database<C>) -> Result<()> {
    for name in DOCUMENT_COLLECTIONS {
        if db.collection(name).await.is_ok() {
            debug!("Collection {} already exists", name);
            continue;
        }
        info!("Creating collection {}", name);
        db.create_collection(name)
            .await
            .map_err(|e| failure("collection", name, e))?;
    }

    if db.collection(TAGGED_COLLECTION).await.is_err() {
        info!("Creating edge collection {}", TAGGED_COLLECTION);
        db.create_edge_collection(TAGGED_COLLECTION)
            .await
            .map_err(|e| failure("edge collection", TAGGED_COLLECTION, e))?;
    }

    for spec in INDEXES.iter() {
        let index = Index::builder()
            .name(spec.name.to_string())
            .fields(spec.fields.iter().map(|f| f.to_string()).collect())
            .settings(IndexSettings::Persistent {
                unique: spec.unique,
                sparse: false,
                deduplicate: false,
            })
            .build();
        // Creating an index that already exists returns the existing one
        db.create_index(spec.collection, &index)
            .await
            .map_err(|e| failure("index", spec.name, e))?;
    }

    info!(
        "Schema ready: {} collections, {} indexes",
        DOCUMENT_COLLECTIONS.len() + 1,
        INDEXES.len()
    );
    Ok(())
}
