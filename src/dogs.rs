// Dog Resource Service
//
// Owns the `dogs` collection. `name` is the lookup key for mutation but is not
// unique: with duplicates, the earliest inserted dog is the one that changes.

use crate::error::{present, ServiceError, ServiceResult};
use crate::input::lenient_count;
use crate::store::{Document, DocumentStore, Filter, FindOptions, StoreError, StoreResult, Update};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

pub const COLLECTION: &str = "dogs";

const AGE: &str = "age";

// ============================================================================
// DOG ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dog {
    pub name: String,
    pub breed: String,
    pub age: u32,
}

/// Dog creation request (JSON or form body)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateDog {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub breed: Option<String>,
    /// `None` means missing; `Some(0)` is a valid age
    #[serde(default, deserialize_with = "lenient_count")]
    pub age: Option<u32>,
}

/// Age increase request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncreaseDogAge {
    #[serde(default)]
    pub name: Option<String>,
}

// ============================================================================
// AGE INCREMENT STRATEGY
// ============================================================================

/// How `increment_age_by_name` talks to the store. Both strategies have the
/// same external contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AgeIncrement {
    /// Load, add one in memory, write back keyed by the loaded id.
    ///
    /// Two concurrent increments for the same name can both read the same
    /// age and one update is lost. Callers are assumed single-actor.
    #[default]
    ReadModifyWrite,

    /// One store-side `$inc`; no lost updates.
    Atomic,
}

impl AgeIncrement {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgeIncrement::ReadModifyWrite => "read-modify-write",
            AgeIncrement::Atomic => "atomic",
        }
    }
}

impl fmt::Display for AgeIncrement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgeIncrement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "read-modify-write" | "rmw" => Ok(AgeIncrement::ReadModifyWrite),
            "atomic" => Ok(AgeIncrement::Atomic),
            other => Err(format!(
                "unsupported age increment strategy `{other}`; expected read-modify-write|atomic"
            )),
        }
    }
}

fn age_limit() -> ServiceError {
    ServiceError::validation("Age cannot be increased any further")
}

fn decode(doc: Document) -> StoreResult<Dog> {
    Ok(serde_json::from_value(doc.body)?)
}

// ============================================================================
// DOG SERVICE
// ============================================================================

#[derive(Clone)]
pub struct DogService {
    store: Arc<dyn DocumentStore>,
    strategy: AgeIncrement,
}

impl DogService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_strategy(store, AgeIncrement::default())
    }

    pub fn with_strategy(store: Arc<dyn DocumentStore>, strategy: AgeIncrement) -> Self {
        Self { store, strategy }
    }

    pub async fn create(&self, input: CreateDog) -> ServiceResult<()> {
        let dog = match (
            present(input.name.as_deref()),
            present(input.breed.as_deref()),
            input.age,
        ) {
            (Some(name), Some(breed), Some(age)) => Dog {
                name: name.to_string(),
                breed: breed.to_string(),
                age,
            },
            _ => return Err(ServiceError::validation("Name, breed, and age are required.")),
        };

        let body = serde_json::to_value(&dog)
            .map_err(|err| ServiceError::Persistence(StoreError::Json(err)))?;
        let id = self
            .store
            .insert_one(COLLECTION, body)
            .await
            .map_err(ServiceError::Persistence)?;

        info!(id = %id, name = %dog.name, breed = %dog.breed, age = dog.age, "dog created");
        Ok(())
    }

    /// Adds one year to the first dog (in insertion order) named `name`
    pub async fn increment_age_by_name(&self, name: &str) -> ServiceResult<()> {
        let name = present(Some(name))
            .ok_or_else(|| ServiceError::validation("Name is required to find a dog."))?;

        match self.strategy {
            AgeIncrement::ReadModifyWrite => self.increment_read_modify_write(name).await,
            AgeIncrement::Atomic => self.increment_atomic(name).await,
        }
    }

    async fn increment_read_modify_write(&self, name: &str) -> ServiceResult<()> {
        let doc = self
            .store
            .find_one(COLLECTION, &Filter::eq("name", name), &FindOptions::default())
            .await
            .map_err(ServiceError::Persistence)?
            .ok_or_else(|| ServiceError::not_found("Dog not found"))?;

        let id = doc.id.clone();
        let mut dog = decode(doc).map_err(ServiceError::Persistence)?;
        dog.age = dog.age.checked_add(1).ok_or_else(age_limit)?;

        // Race window: another writer may have changed this dog since the
        // read above; its update is overwritten here.
        let body = serde_json::to_value(&dog)
            .map_err(|err| ServiceError::Persistence(StoreError::Json(err)))?;
        let written = self
            .store
            .replace_one(COLLECTION, &id, body)
            .await
            .map_err(ServiceError::Persistence)?;
        if !written {
            return Err(ServiceError::not_found("Dog not found"));
        }

        debug!(id = %id, strategy = %self.strategy, "dog age written back");
        info!(name = %dog.name, age = dog.age, "dog age increased");
        Ok(())
    }

    async fn increment_atomic(&self, name: &str) -> ServiceResult<()> {
        let doc = self
            .store
            .find_one_and_update(
                COLLECTION,
                &Filter::eq("name", name),
                &FindOptions::default(),
                &Update::inc(AGE, 1).at_most(i64::from(u32::MAX)),
            )
            .await
            .map_err(|err| match err {
                StoreError::LimitExceeded { .. } => age_limit(),
                other => ServiceError::Persistence(other),
            })?
            .ok_or_else(|| ServiceError::not_found("Dog not found"))?;

        let dog = decode(doc).map_err(ServiceError::Persistence)?;
        info!(name = %dog.name, age = dog.age, "dog age increased");
        Ok(())
    }

    /// Every dog as a detached snapshot, in insertion order
    pub async fn list_all(&self) -> ServiceResult<Vec<Dog>> {
        let docs = self
            .store
            .find(COLLECTION, &Filter::all(), &FindOptions::default())
            .await
            .map_err(ServiceError::StoreUnavailable)?;

        docs.into_iter()
            .map(|doc| decode(doc).map_err(ServiceError::StoreUnavailable))
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
