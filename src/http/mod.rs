// HTTP Layer - axum router, handlers and response mapping
//
// Handlers stay thin: extract input, call one service operation, map the
// result. All business rules live in the cat/dog services.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod views;

use axum::routing::{get, post};
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::cats::CatService;
use crate::dogs::{AgeIncrement, DogService};
use crate::store::DocumentStore;

/// Shared application state: the two resource services over one store handle
#[derive(Clone)]
pub struct AppState {
    pub cats: CatService,
    pub dogs: DogService,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, age_increment: AgeIncrement) -> Self {
        Self {
            cats: CatService::new(Arc::clone(&store)),
            dogs: DogService::with_strategy(store, age_increment),
        }
    }
}

/// Page and API routes plus the not-found fallback
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/page1", get(handlers::cat_page))
        .route("/page2", get(handlers::add_cat_page))
        .route("/page3", get(handlers::find_cat_page))
        .route("/page4", get(handlers::dog_page))
        .route("/getName", get(handlers::get_name))
        .route("/setName", post(handlers::set_name))
        .route("/search", get(handlers::search_name))
        .route("/updateLast", post(handlers::update_last))
        .route("/createDog", post(handlers::create_dog))
        .route("/increaseDogAge", post(handlers::increase_dog_age))
        .fallback(handlers::not_found)
        .with_state(state)
}

/// Full application: routes, static assets under `/assets`, request tracing
pub fn app(state: AppState, assets_dir: impl AsRef<Path>) -> Router {
    router(state)
        .nest_service("/assets", ServeDir::new(assets_dir.as_ref()))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
