// Pet Registry - Core Library
// Cat and dog resource services over a document store, plus the HTTP layer

pub mod cats;
pub mod config;
pub mod dogs;
pub mod error;
pub mod input;
pub mod logging;
pub mod store;

#[cfg(feature = "server")]
pub mod http;

// Re-export commonly used types
pub use cats::{Cat, CatSearch, CatService, CatSummary, CreateCat, UNKNOWN_NAME};
pub use config::{Config, DatabaseLocation};
pub use dogs::{AgeIncrement, CreateDog, Dog, DogService, IncreaseDogAge};
pub use error::{ServiceError, ServiceResult};
pub use logging::{init_logging, LogFormat};
pub use store::{
    Document, DocumentId, DocumentStore, Filter, FindOptions, SortOrder, SqliteStore,
    StoreError, StoreResult, Update,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
