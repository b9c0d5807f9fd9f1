//! Route handlers.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::Html;
use axum::Json;
use serde::Serialize;

use super::error::{ApiError, ApiResult, MessageBody, OrApiError};
use super::extract::Payload;
use super::views;
use super::AppState;
use crate::cats::{CatSearch, CatSummary, CreateCat};
use crate::dogs::{CreateDog, IncreaseDogAge};

#[derive(Debug, Serialize)]
pub struct NameBody {
    pub name: String,
}

// ============================================================================
// Pages
// ============================================================================

/// GET / - never fails, falls back to "unknown"
pub async fn home(State(state): State<AppState>) -> Html<String> {
    Html(views::index(&state.cats.most_recent_name().await))
}

/// GET /page1
pub async fn cat_page(State(state): State<AppState>) -> ApiResult<Html<String>> {
    let cats = state.cats.list_all().await.or_api_error("failed to find cats")?;
    Ok(Html(views::cat_list(&cats)))
}

/// GET /page2
pub async fn add_cat_page() -> Html<String> {
    Html(views::add_cat())
}

/// GET /page3
pub async fn find_cat_page() -> Html<String> {
    Html(views::find_cat())
}

/// GET /page4
pub async fn dog_page(State(state): State<AppState>) -> ApiResult<Html<String>> {
    let dogs = state.dogs.list_all().await.or_api_error("Failed to retrieve dogs")?;
    Ok(Html(views::dog_list(&dogs)))
}

/// Fallback for unmatched routes
pub async fn not_found(uri: Uri) -> (StatusCode, Html<String>) {
    let requested = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_string(), |pq| pq.as_str().to_string());
    let page = match urlencoding::decode(&requested) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => requested.clone(),
    };

    (StatusCode::NOT_FOUND, Html(views::not_found(&page)))
}

// ============================================================================
// Cat API
// ============================================================================

/// GET /getName - name of the last created cat (strict)
pub async fn get_name(State(state): State<AppState>) -> ApiResult<Json<NameBody>> {
    let name = state
        .cats
        .last_created_name()
        .await
        .or_api_error("Something went wrong contacting the database")?;
    Ok(Json(NameBody { name }))
}

/// POST /setName - create a cat
pub async fn set_name(
    State(state): State<AppState>,
    Payload(input): Payload<CreateCat>,
) -> ApiResult<(StatusCode, Json<CatSummary>)> {
    let created = state.cats.create(input).await.or_api_error("failed to create cat")?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /search?name=
pub async fn search_name(
    State(state): State<AppState>,
    query: Result<Query<CatSearch>, QueryRejection>,
) -> ApiResult<Json<CatSummary>> {
    let Query(search) = query.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let name = search.name.unwrap_or_default();

    let cat = state
        .cats
        .search_by_name(&name)
        .await
        .or_api_error("Something went wrong")?;
    Ok(Json(cat))
}

/// POST /updateLast - one more bed for the most recent cat
pub async fn update_last(State(state): State<AppState>) -> ApiResult<Json<CatSummary>> {
    let cat = state
        .cats
        .increment_beds_of_most_recent()
        .await
        .or_api_error("Something went wrong")?;
    Ok(Json(cat))
}

// ============================================================================
// Dog API
// ============================================================================

/// POST /createDog
pub async fn create_dog(
    State(state): State<AppState>,
    Payload(input): Payload<CreateDog>,
) -> ApiResult<(StatusCode, Json<MessageBody>)> {
    state.dogs.create(input).await.or_api_error("Failed to create dog")?;
    Ok((
        StatusCode::CREATED,
        Json(MessageBody {
            message: "Dog created successfully",
        }),
    ))
}

/// POST /increaseDogAge
pub async fn increase_dog_age(
    State(state): State<AppState>,
    Payload(input): Payload<IncreaseDogAge>,
) -> ApiResult<Json<MessageBody>> {
    let name = input.name.unwrap_or_default();
    state
        .dogs
        .increment_age_by_name(&name)
        .await
        .or_api_error("Failed to increase dog age")?;
    Ok(Json(MessageBody {
        message: "Dog age increased successfully",
    }))
}
