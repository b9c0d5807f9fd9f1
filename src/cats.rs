// Cat Resource Service
//
// Owns the `cats` collection. "Most recent" always means latest createdDate
// (insertion order breaks ties).
//
// Two lookups share the same recency query on purpose:
// - most_recent_name(): best-effort, never fails, falls back to "unknown"
// - last_created_name(): strict, surfaces NotFound / StoreUnavailable

use crate::error::{present, ServiceError, ServiceResult};
use crate::input::lenient_count;
use crate::store::{
    Document, DocumentStore, Filter, FindOptions, SortOrder, StoreError, StoreResult, Update,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

pub const COLLECTION: &str = "cats";

/// Name shown on the home page when no cat can be found
pub const UNKNOWN_NAME: &str = "unknown";

const CREATED_DATE: &str = "createdDate";
const BEDS_OWNED: &str = "bedsOwned";

// ============================================================================
// CAT ENTITY
// ============================================================================

/// Stored cat document (also the list snapshot handed to views)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cat {
    /// "<firstname> <lastname>"
    pub name: String,

    pub beds_owned: u32,

    /// Assigned once at creation, only used for recency ordering
    #[serde(with = "created_date")]
    pub created_date: DateTime<Utc>,
}

impl Cat {
    pub fn new(firstname: &str, lastname: &str, beds_owned: u32) -> Self {
        Cat {
            name: format!("{firstname} {lastname}"),
            beds_owned,
            created_date: Utc::now(),
        }
    }
}

/// Fixed-width RFC 3339 (microseconds, `Z`) so that string order in the
/// store equals chronological order.
mod created_date {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        DateTime::<Utc>::deserialize(d)
    }
}

/// `{name, beds}` as returned by the cat API routes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatSummary {
    pub name: String,
    pub beds: u32,
}

impl From<Cat> for CatSummary {
    fn from(cat: Cat) -> Self {
        Self {
            name: cat.name,
            beds: cat.beds_owned,
        }
    }
}

/// Cat creation request (JSON or form body)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCat {
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub beds: Option<u32>,
}

/// Query string for the search route
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatSearch {
    #[serde(default)]
    pub name: Option<String>,
}

fn decode(doc: Document) -> StoreResult<Cat> {
    Ok(serde_json::from_value(doc.body)?)
}

fn by_recency() -> FindOptions {
    FindOptions::sorted(CREATED_DATE, SortOrder::Descending)
}

// ============================================================================
// CAT SERVICE
// ============================================================================

#[derive(Clone)]
pub struct CatService {
    store: Arc<dyn DocumentStore>,
}

impl CatService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    async fn find_most_recent(&self) -> StoreResult<Option<Cat>> {
        self.store
            .find_one(COLLECTION, &Filter::all(), &by_recency())
            .await?
            .map(decode)
            .transpose()
    }

    /// Name of the most recently created cat, or `"unknown"`.
    ///
    /// Best-effort: store failures are logged and swallowed because this only
    /// feeds a page default.
    pub async fn most_recent_name(&self) -> String {
        match self.find_most_recent().await {
            Ok(Some(cat)) => cat.name,
            Ok(None) => UNKNOWN_NAME.to_string(),
            Err(err) => {
                warn!(error = %err, "most recent cat lookup failed, using default name");
                UNKNOWN_NAME.to_string()
            }
        }
    }

    /// Strict variant of `most_recent_name`
    pub async fn last_created_name(&self) -> ServiceResult<String> {
        match self.find_most_recent().await {
            Ok(Some(cat)) => Ok(cat.name),
            Ok(None) => Err(ServiceError::not_found("No cat found")),
            Err(err) => Err(ServiceError::StoreUnavailable(err)),
        }
    }

    /// Every cat as a detached snapshot, in insertion order
    pub async fn list_all(&self) -> ServiceResult<Vec<Cat>> {
        let docs = self
            .store
            .find(COLLECTION, &Filter::all(), &FindOptions::default())
            .await
            .map_err(ServiceError::StoreUnavailable)?;

        docs.into_iter()
            .map(|doc| decode(doc).map_err(ServiceError::StoreUnavailable))
            .collect()
    }

    pub async fn create(&self, input: CreateCat) -> ServiceResult<CatSummary> {
        let (firstname, lastname, beds) = match (
            present(input.firstname.as_deref()),
            present(input.lastname.as_deref()),
            input.beds,
        ) {
            (Some(first), Some(last), Some(beds)) if beds > 0 => (first, last, beds),
            _ => {
                return Err(ServiceError::validation(
                    "firstname, lastname and beds are all required",
                ))
            }
        };

        let cat = Cat::new(firstname, lastname, beds);
        let body = serde_json::to_value(&cat)
            .map_err(|err| ServiceError::Persistence(StoreError::Json(err)))?;

        let id = self
            .store
            .insert_one(COLLECTION, body)
            .await
            .map_err(ServiceError::Persistence)?;

        info!(id = %id, name = %cat.name, beds = cat.beds_owned, "cat created");
        Ok(cat.into())
    }

    /// Exact-match lookup on `name`
    pub async fn search_by_name(&self, name: &str) -> ServiceResult<CatSummary> {
        let name = present(Some(name))
            .ok_or_else(|| ServiceError::validation("Name is required to perform a search"))?;

        let doc = self
            .store
            .find_one(COLLECTION, &Filter::eq("name", name), &FindOptions::default())
            .await
            .map_err(ServiceError::StoreUnavailable)?
            .ok_or_else(|| ServiceError::not_found("No cats found"))?;

        let cat = decode(doc).map_err(ServiceError::StoreUnavailable)?;
        Ok(cat.into())
    }

    /// Adds one bed to the most recently created cat.
    ///
    /// Selection and increment are a single store-side operation, so
    /// concurrent calls never lose an update. An empty collection is
    /// `NotFound`; a count already at `u32::MAX` is left as is and rejected.
    pub async fn increment_beds_of_most_recent(&self) -> ServiceResult<CatSummary> {
        let doc = self
            .store
            .find_one_and_update(
                COLLECTION,
                &Filter::all(),
                &by_recency(),
                &Update::inc(BEDS_OWNED, 1).at_most(i64::from(u32::MAX)),
            )
            .await
            .map_err(|err| match err {
                StoreError::LimitExceeded { .. } => {
                    ServiceError::validation("Beds cannot be increased any further")
                }
                other => ServiceError::Persistence(other),
            })?
            .ok_or_else(|| ServiceError::not_found("No cat found"))?;

        let cat = decode(doc).map_err(ServiceError::Persistence)?;
        info!(name = %cat.name, beds = cat.beds_owned, "cat beds increased");
        Ok(cat.into())
    }
}

// ============================================================================
// TESTS
// ============================================================================
