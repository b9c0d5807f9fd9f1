use axum::http::{self, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use pet_registry::http::{app, router, AppState};
use pet_registry::{AgeIncrement, DocumentStore, SqliteStore};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::{Service, ServiceExt};

fn store() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::open_in_memory(Duration::from_secs(5)).unwrap())
}

fn app_with(store: Arc<SqliteStore>, strategy: AgeIncrement) -> Router {
    router(AppState::new(store, strategy))
}

fn new_app() -> Router {
    app_with(store(), AgeIncrement::default())
}

async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn post(uri: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(String::new())
        .unwrap()
}

fn json_request(uri: &str, body: Value) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn form_request(uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            http::header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        )
        .body(body.to_string())
        .unwrap()
}

/// Sends one request through a shared router
async fn send(app: &mut Router, request: Request<String>) -> Response {
    ServiceExt::<Request<String>>::ready(app)
        .await
        .unwrap()
        .call(request)
        .await
        .unwrap()
}

// --- home ---

#[tokio::test]
async fn home_on_empty_store_shows_unknown() {
    let resp = new_app().oneshot(get("/")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains("<strong id=\"currentName\">unknown</strong>"));
}

#[tokio::test]
async fn home_degrades_when_store_is_down() {
    let store = store();
    let app = app_with(store.clone(), AgeIncrement::default());
    store.shutdown().await.unwrap();

    let resp = app.oneshot(get("/")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains(">unknown<"));
}

// --- cats ---

#[tokio::test]
async fn create_cat_returns_201() {
    let resp = new_app()
        .oneshot(json_request(
            "/setName",
            json!({"firstname": "Tom", "lastname": "Cat", "beds": 3}),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(body_json(resp).await, json!({"name": "Tom Cat", "beds": 3}));
}

#[tokio::test]
async fn create_cat_from_form_body() {
    let resp = new_app()
        .oneshot(form_request("/setName", "firstname=Kit&lastname=Kat&beds=2"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(body_json(resp).await, json!({"name": "Kit Kat", "beds": 2}));
}

#[tokio::test]
async fn create_cat_missing_field_returns_400_and_persists_nothing() {
    let mut app = new_app();

    let bodies = [
        json!({"lastname": "Cat", "beds": 3}),
        json!({"firstname": "Tom", "beds": 3}),
        json!({"firstname": "Tom", "lastname": "Cat"}),
        json!({"firstname": "Tom", "lastname": "Cat", "beds": ""}),
    ];
    for body in bodies {
        let resp = send(&mut app, json_request("/setName", body)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(resp).await,
            json!({"error": "firstname, lastname and beds are all required"})
        );
    }

    let resp = send(&mut app, post("/setName")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = send(&mut app, get("/page1")).await;
    assert!(body_text(resp).await.contains("No cats yet."));
}

#[tokio::test]
async fn create_cat_malformed_body_returns_400() {
    let mut app = new_app();

    let resp = send(
        &mut app,
        json_request("/setName", json!({"firstname": "Tom", "lastname": "Cat", "beds": "lots"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(resp).await["error"].is_string());

    let broken = Request::builder()
        .method("POST")
        .uri("/setName")
        .header(http::header::CONTENT_TYPE, "application/json")
        .body("{not json".to_string())
        .unwrap();
    let resp = send(&mut app, broken).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_cat_with_zero_beds_returns_400() {
    let resp = new_app()
        .oneshot(form_request("/setName", "firstname=Tom&lastname=Cat&beds=0"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await,
        json!({"error": "firstname, lastname and beds are all required"})
    );
}

#[tokio::test]
async fn update_last_at_max_beds_returns_400_and_keeps_cats_readable() {
    let mut app = new_app();
    let resp = send(
        &mut app,
        json_request(
            "/setName",
            json!({"firstname": "Full", "lastname": "Cat", "beds": u32::MAX}),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = send(&mut app, post("/updateLast")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await,
        json!({"error": "Beds cannot be increased any further"})
    );

    let resp = send(&mut app, get("/getName")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = send(&mut app, get("/page1")).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn get_name_not_found_on_empty_store() {
    let resp = new_app().oneshot(get("/getName")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await, json!({"error": "No cat found"}));
}

#[tokio::test]
async fn get_name_returns_500_when_store_is_down() {
    let store = store();
    let app = app_with(store.clone(), AgeIncrement::default());
    store.shutdown().await.unwrap();

    let resp = app.oneshot(get("/getName")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(resp).await,
        json!({"error": "Something went wrong contacting the database"})
    );
}

#[tokio::test]
async fn search_requires_name() {
    let mut app = new_app();

    for uri in ["/search", "/search?name="] {
        let resp = send(&mut app, get(uri)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(resp).await,
            json!({"error": "Name is required to perform a search"})
        );
    }
}

#[tokio::test]
async fn search_nonexistent_returns_404() {
    let resp = new_app()
        .oneshot(get("/search?name=nonexistent"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await, json!({"error": "No cats found"}));
}

#[tokio::test]
async fn update_last_on_empty_store_returns_404() {
    let resp = new_app().oneshot(post("/updateLast")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await, json!({"error": "No cat found"}));
}

#[tokio::test]
async fn list_cats_returns_500_when_store_is_down() {
    let store = store();
    let app = app_with(store.clone(), AgeIncrement::default());
    store.shutdown().await.unwrap();

    let resp = app.oneshot(get("/page1")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(resp).await, json!({"error": "failed to find cats"}));
}

#[tokio::test]
async fn cat_lifecycle() {
    let mut app = new_app();

    // empty list renders, not an error
    let resp = send(&mut app, get("/page1")).await;
    assert_eq!(resp.status(), StatusCode::OK);

    for (first, beds) in [("Old", 5), ("New", 1)] {
        let resp = send(
            &mut app,
            json_request(
                "/setName",
                json!({"firstname": first, "lastname": "Cat", "beds": beds}),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    // most recent name everywhere
    let resp = send(&mut app, get("/getName")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({"name": "New Cat"}));

    let resp = send(&mut app, get("/")).await;
    assert!(body_text(resp).await.contains(">New Cat<"));

    // increment touches only the most recent cat
    let resp = send(&mut app, post("/updateLast")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({"name": "New Cat", "beds": 2}));

    let resp = send(&mut app, get("/search?name=Old%20Cat")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({"name": "Old Cat", "beds": 5}));

    let resp = send(&mut app, get("/search?name=New+Cat")).await;
    assert_eq!(body_json(resp).await, json!({"name": "New Cat", "beds": 2}));

    // exact match, surrounding spaces included
    let resp = send(&mut app, get("/search?name=%20New%20Cat%20")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // list page shows both
    let resp = send(&mut app, get("/page1")).await;
    let html = body_text(resp).await;
    assert!(html.contains("Old Cat</span> owns 5 bed(s)"));
    assert!(html.contains("New Cat</span> owns 2 bed(s)"));
}

// --- dogs ---

#[tokio::test]
async fn create_dog_returns_201_message() {
    let resp = new_app()
        .oneshot(json_request(
            "/createDog",
            json!({"name": "Rex", "breed": "Lab", "age": 0}),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(
        body_json(resp).await,
        json!({"message": "Dog created successfully"})
    );
}

#[tokio::test]
async fn create_dog_missing_field_returns_400() {
    let mut app = new_app();

    for body in [
        json!({"breed": "Lab", "age": 3}),
        json!({"name": "Rex", "age": 3}),
        json!({"name": "Rex", "breed": "Lab"}),
    ] {
        let resp = send(&mut app, json_request("/createDog", body)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(resp).await,
            json!({"error": "Name, breed, and age are required."})
        );
    }

    let resp = send(&mut app, get("/page4")).await;
    assert!(body_text(resp).await.contains("No dogs yet."));
}

#[tokio::test]
async fn increase_dog_age_validation_and_not_found() {
    let mut app = new_app();

    let resp = send(&mut app, json_request("/increaseDogAge", json!({}))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await,
        json!({"error": "Name is required to find a dog."})
    );

    let resp = send(
        &mut app,
        json_request("/increaseDogAge", json!({"name": "Ghost"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await, json!({"error": "Dog not found"}));
}

#[tokio::test]
async fn dog_lifecycle() {
    for strategy in [AgeIncrement::ReadModifyWrite, AgeIncrement::Atomic] {
        let store = store();
        let mut app = app_with(store.clone(), strategy);

        let resp = send(&mut app, form_request("/createDog", "name=Rex&breed=Lab&age=3")).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        // listed exactly once with fields unchanged
        let resp = send(&mut app, get("/page4")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_text(resp).await;
        assert_eq!(html.matches("<td>Rex</td>").count(), 1);
        assert!(html.contains("<tr><td>Rex</td><td>Lab</td><td>3</td></tr>"));

        let resp = send(&mut app, form_request("/increaseDogAge", "name=Rex")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            body_json(resp).await,
            json!({"message": "Dog age increased successfully"})
        );

        let resp = send(&mut app, get("/page4")).await;
        assert!(body_text(resp)
            .await
            .contains("<tr><td>Rex</td><td>Lab</td><td>4</td></tr>"));
    }
}

#[tokio::test]
async fn dog_routes_return_500_when_store_is_down() {
    let store = store();
    let mut app = app_with(store.clone(), AgeIncrement::default());
    store.shutdown().await.unwrap();

    let resp = send(&mut app, get("/page4")).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(resp).await, json!({"error": "Failed to retrieve dogs"}));

    let resp = send(
        &mut app,
        json_request("/createDog", json!({"name": "Rex", "breed": "Lab", "age": 1})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(resp).await, json!({"error": "Failed to create dog"}));

    let resp = send(
        &mut app,
        json_request("/increaseDogAge", json!({"name": "Rex"})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(resp).await,
        json!({"error": "Failed to increase dog age"})
    );
}

// --- pages & fallback ---

#[tokio::test]
async fn static_pages_render() {
    let mut app = new_app();

    let resp = send(&mut app, get("/page2")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("action=\"/setName\""));

    let resp = send(&mut app, get("/page3")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("action=\"/search\""));
}

#[tokio::test]
async fn unmatched_route_renders_not_found_page() {
    let resp = new_app()
        .oneshot(get("/no/such/page?x=1"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let html = body_text(resp).await;
    assert!(html.contains("<code>/no/such/page?x=1</code>"));
}

#[tokio::test]
async fn assets_are_served_from_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("style.css"), "body { color: black; }").unwrap();
    let app = app(AppState::new(store(), AgeIncrement::default()), dir.path());

    let resp = app.clone().oneshot(get("/assets/style.css")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_text(resp).await, "body { color: black; }");

    let resp = app.oneshot(get("/assets/missing.css")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
