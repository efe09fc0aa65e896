use axum::{
    body::{Body, Bytes, to_bytes},
    http::{HeaderValue, Request, StatusCode, header},
};
use item_user_api::{
    config::AppConfig,
    db::{Db, DuplicateKey},
    dto::{
        auth::LoginRequest,
        items::CreateItemRequest,
        profile::ImageUpload,
        users::{CreateUserRequest, ReplaceUserRequest},
    },
    error::AppError,
    middleware::auth::AuthUser,
    routes::{create_app, params::ListQuery},
    services::{auth_service, item_service, profile_service, user_service},
    state::AppState,
};
use mongodb::{IndexModel, bson::doc, bson::oid::ObjectId, options::IndexOptions};
use serde_json::{Map, Value, json};
use tower::ServiceExt;
use uuid::Uuid;

// Store-backed flows. Skipped unless TEST_MONGODB_URI points at a server;
// every run works in its own throwaway database.
fn test_uri() -> Option<String> {
    match std::env::var("TEST_MONGODB_URI") {
        Ok(uri) => Some(uri),
        Err(_) => {
            eprintln!("Skipping test: set TEST_MONGODB_URI to run store-backed flow tests.");
            None
        }
    }
}

fn test_database() -> String {
    format!("item_user_api_test_{}", Uuid::new_v4().simple())
}

async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let Some(uri) = test_uri() else {
        return Ok(None);
    };

    let database = test_database();
    let db = Db::open(&uri, &database).await?;
    db.ping().await?;
    db.ensure_indexes().await?;

    let config = AppConfig {
        mongodb_uri: uri,
        mongodb_database: database.clone(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "flow-secret".into(),
        jwt_ttl_hours: 1,
        cors_allow_origin: HeaderValue::from_static("http://localhost:3000"),
        upload_dir: std::env::temp_dir().join(database),
        max_upload_bytes: 1024 * 1024,
    };
    Ok(Some(AppState::new(db, config)))
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn new_user(username: &str, email: &str) -> CreateUserRequest {
    CreateUserRequest {
        username: Some(username.into()),
        email: Some(email.into()),
        password: Some("secret123".into()),
        ..Default::default()
    }
}

#[tokio::test]
async fn item_crud_lifecycle() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let created = item_service::create_item(
        &state,
        CreateItemRequest {
            name: Some("Ferris Mug".into()),
            category: Some("Kitchen".into()),
            price: Some(json!("12.5")),
        },
    )
    .await?;
    assert_eq!(created.message, "Item created");

    let item = item_service::get_item(&state, &created.id).await?;
    assert_eq!(item["_id"], created.id.as_str());
    assert_eq!(item["itemPrice"], 12.5);
    assert_eq!(item["status"], "ACTIVE");
    assert_eq!(item["createdAt"], item["updatedAt"]);

    // An empty patch only touches updatedAt.
    let patched = item_service::update_item(&state, &created.id, Map::new()).await?;
    assert_eq!(patched.message, "Item updated");
    let after = item_service::get_item(&state, &created.id).await?;
    assert_eq!(after["itemName"], "Ferris Mug");
    assert_eq!(after["createdAt"], item["createdAt"]);

    let patch = object(json!({ "price": 15, "category": "Mugs" }));
    item_service::update_item(&state, &created.id, patch).await?;
    let after = item_service::get_item(&state, &created.id).await?;
    assert_eq!(after["itemPrice"], 15.0);
    assert_eq!(after["itemCategory"], "Mugs");
    assert_eq!(after["itemName"], "Ferris Mug");
    assert_eq!(after["status"], "ACTIVE");

    let replacement = object(json!({
        "_id": "ignored",
        "createdAt": "ignored",
        "itemName": "Big Mug",
        "itemCategory": "Kitchen",
        "itemPrice": 20.0,
        "status": "INACTIVE",
    }));
    let replaced = item_service::replace_item(&state, &created.id, replacement).await?;
    assert_eq!(replaced.message, "Item replaced");
    let after = item_service::get_item(&state, &created.id).await?;
    assert_eq!(after["_id"], created.id.as_str());
    assert_eq!(after["createdAt"], item["createdAt"]);
    assert_eq!(after["status"], "INACTIVE");

    let deleted = item_service::delete_item(&state, &created.id).await?;
    assert_eq!(deleted.deleted_count, 1);
    let again = item_service::delete_item(&state, &created.id).await;
    assert!(matches!(again, Err(AppError::NotFound(_))));
    let missing = item_service::get_item(&state, &created.id).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    state.db.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn items_paginate_in_insertion_order() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    for n in 0..5 {
        item_service::create_item(
            &state,
            CreateItemRequest {
                name: Some(format!("item-{n}")),
                category: Some("Test".into()),
                price: Some(json!(n)),
            },
        )
        .await?;
    }

    let first = item_service::list_items(&state, ListQuery::new(1, 2)).await?;
    assert_eq!(first.data.len(), 2);
    assert_eq!(first.pagination.total_items, 5);
    assert_eq!(first.pagination.total_pages, 3);
    assert!(first.pagination.has_next_page);
    assert!(!first.pagination.has_prev_page);

    // Walking every page yields each document once, in order.
    let mut seen = Vec::new();
    for page in 1..=first.pagination.total_pages {
        let current = item_service::list_items(&state, ListQuery::new(page, 2)).await?;
        assert_eq!(current.pagination.has_prev_page, page > 1);
        seen.extend(current.data.into_iter().map(|item| item["itemName"].clone()));
    }
    let expected: Vec<Value> = (0..5).map(|n| json!(format!("item-{n}"))).collect();
    assert_eq!(seen, expected);

    let last = item_service::list_items(&state, ListQuery::new(3, 2)).await?;
    assert_eq!(last.data.len(), 1);
    assert!(!last.pagination.has_next_page);

    let beyond = item_service::list_items(&state, ListQuery::new(9, 2)).await?;
    assert!(beyond.data.is_empty());
    assert_eq!(beyond.pagination.current_page, 9);
    assert!(!beyond.pagination.has_next_page);

    state.db.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn users_hide_passwords_and_reject_duplicates() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let created = user_service::create_user(&state, new_user("ferris", "ferris@example.com")).await?;
    let user = user_service::get_user(&state, &created.id).await?;
    assert!(user.get("password").is_none());
    assert_eq!(user["firstname"], "");

    let page = user_service::list_users(&state, ListQuery::default()).await?;
    assert!(page.data.iter().all(|user| user.get("password").is_none()));

    let same_name = user_service::create_user(&state, new_user("ferris", "other@example.com")).await;
    match same_name {
        Err(err @ AppError::Duplicate(_)) => assert_eq!(err.to_string(), "Duplicate Username!"),
        other => panic!("expected duplicate username, got {other:?}"),
    }
    let same_email = user_service::create_user(&state, new_user("crab", "ferris@example.com")).await;
    match same_email {
        Err(err @ AppError::Duplicate(_)) => assert_eq!(err.to_string(), "Duplicate Email!"),
        other => panic!("expected duplicate email, got {other:?}"),
    }

    let other = user_service::create_user(&state, new_user("crab", "crab@example.com")).await?;
    let clash = object(json!({ "email": "ferris@example.com" }));
    let patched = user_service::update_user(&state, &other.id, clash).await;
    assert!(matches!(patched, Err(AppError::Duplicate(_))));

    let customised = object(json!({ "firstname": "Crab", "status": "INACTIVE" }));
    user_service::update_user(&state, &other.id, customised).await?;
    let before = user_service::get_user(&state, &other.id).await?;
    assert_eq!(before["firstname"], "Crab");
    assert_eq!(before["status"], "INACTIVE");
    assert_eq!(before["username"], "crab");

    let replaced = user_service::replace_user(
        &state,
        &other.id,
        ReplaceUserRequest {
            username: Some("crab".into()),
            email: Some("crab@example.com".into()),
            lastname: Some("Rustacean".into()),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(replaced.message, "User replaced");
    let after = user_service::get_user(&state, &other.id).await?;
    assert_eq!(after["lastname"], "Rustacean");
    // omitted fields reset to defaults rather than keeping the patched values
    assert_eq!(after["firstname"], "");
    assert_eq!(after["status"], "ACTIVE");

    // replace without a password keeps the stored hash
    let login = auth_service::login_user(
        &state,
        LoginRequest {
            email: "crab@example.com".into(),
            password: "secret123".into(),
        },
    )
    .await?;
    assert!(!login.token.is_empty());

    let bad_login = auth_service::login_user(
        &state,
        LoginRequest {
            email: "crab@example.com".into(),
            password: "wrong".into(),
        },
    )
    .await;
    assert!(matches!(bad_login, Err(AppError::Unauthorized(_))));

    user_service::delete_user(&state, &other.id).await?;
    let again = user_service::delete_user(&state, &other.id).await;
    assert!(matches!(again, Err(AppError::NotFound(_))));

    state.db.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn profile_image_replace_removes_previous_file() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    user_service::create_user(&state, new_user("ferris", "ferris@example.com")).await?;
    let me = AuthUser {
        email: "ferris@example.com".into(),
    };
    let upload = |name: &str, data: &'static [u8]| ImageUpload {
        file_name: Some(name.into()),
        content_type: Some("image/png".into()),
        bytes: Bytes::from_static(data),
    };

    let first = profile_service::upload_image(&state, &me, upload("a.png", b"first")).await?;
    let first_path = state.images.resolve(&first.image_url).expect("first path");
    assert!(first_path.exists());

    let second = profile_service::upload_image(&state, &me, upload("b.png", b"second")).await?;
    let second_path = state.images.resolve(&second.image_url).expect("second path");
    assert!(second_path.exists());
    assert!(!first_path.exists());

    let profile = profile_service::get_profile(&state, &me).await?.expect("profile");
    assert_eq!(profile["profileImage"], second.image_url.as_str());
    assert!(profile.get("password").is_none());

    let message = profile_service::delete_image(&state, &me).await?;
    assert_eq!(message.message, "Image deleted");
    assert!(!second_path.exists());
    let profile = profile_service::get_profile(&state, &me).await?.expect("profile");
    assert!(profile["profileImage"].is_null());

    // nothing left to delete still succeeds
    profile_service::delete_image(&state, &me).await?;

    let stranger = AuthUser {
        email: "nobody@example.com".into(),
    };
    assert!(profile_service::get_profile(&state, &stranger).await?.is_none());
    let orphan = profile_service::upload_image(&state, &stranger, upload("c.png", b"c")).await;
    assert!(matches!(orphan, Err(AppError::Internal(_))));
    let leftovers = std::fs::read_dir(state.images.dir())?.count();
    assert_eq!(leftovers, 0);

    let _ = tokio::fs::remove_dir_all(&state.config.upload_dir).await;
    state.db.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn writes_to_missing_ids_are_not_found() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let missing = ObjectId::new().to_hex();

    let patch = item_service::update_item(&state, &missing, object(json!({ "name": "x" }))).await;
    assert!(matches!(patch, Err(AppError::NotFound(_))));
    let put = item_service::replace_item(&state, &missing, object(json!({ "itemName": "x" }))).await;
    assert!(matches!(put, Err(AppError::NotFound(_))));

    let patch = user_service::update_user(&state, &missing, object(json!({ "firstname": "x" }))).await;
    assert!(matches!(patch, Err(AppError::NotFound(_))));
    let put = user_service::replace_user(
        &state,
        &missing,
        ReplaceUserRequest {
            username: Some("ghost".into()),
            email: Some("ghost@example.com".into()),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(put, Err(AppError::NotFound(_))));

    state.db.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn reads_over_http_are_not_cached() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let db = state.db.clone();
    let created = item_service::create_item(
        &state,
        CreateItemRequest {
            name: Some("Desk Lamp".into()),
            category: Some("Lighting".into()),
            price: Some(json!(29.9)),
        },
    )
    .await?;
    let app = create_app(state);

    for uri in [
        "/item".to_string(),
        format!("/item/{}", created.id),
        "/user".to_string(),
    ] {
        let request = Request::builder().uri(uri.as_str()).body(Body::empty())?;
        let response = app.clone().oneshot(request).await?;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");

        let headers = response.headers();
        assert_eq!(
            headers[header::CACHE_CONTROL],
            "no-store, no-cache, must-revalidate, proxy-revalidate"
        );
        assert_eq!(headers[header::PRAGMA], "no-cache");
        assert_eq!(headers[header::EXPIRES], "0");
    }

    // repeated query keys fall back to the first value instead of failing
    let request = Request::builder()
        .uri("/item?page=1&page=2&limit=5")
        .body(Body::empty())?;
    let response = app.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await?)?;
    assert_eq!(body["pagination"]["currentPage"], 1);
    assert_eq!(body["pagination"]["itemsPerPage"], 5);

    db.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn default_named_indexes_are_kept_and_mapped() -> anyhow::Result<()> {
    let Some(uri) = test_uri() else {
        return Ok(());
    };
    let db = Db::open(&uri, &test_database()).await?;
    db.ping().await?;

    // the indexes a driver creates without explicit names
    let unique = || IndexOptions::builder().unique(true).build();
    db.users()
        .create_indexes([
            IndexModel::builder()
                .keys(doc! { "username": 1 })
                .options(unique())
                .build(),
            IndexModel::builder()
                .keys(doc! { "email": 1 })
                .options(unique())
                .build(),
        ])
        .await?;

    db.ensure_indexes().await?;
    db.ensure_indexes().await?;

    db.users()
        .insert_one(doc! { "username": "ann", "email": "ann@example.com" })
        .await?;
    let same_name = db
        .users()
        .insert_one(doc! { "username": "ann", "email": "other@example.com" })
        .await
        .expect_err("duplicate username");
    assert_eq!(DuplicateKey::from_error(&same_name), Some(DuplicateKey::Username));
    let same_email = db
        .users()
        .insert_one(doc! { "username": "bob", "email": "ann@example.com" })
        .await
        .expect_err("duplicate email");
    assert_eq!(DuplicateKey::from_error(&same_email), Some(DuplicateKey::Email));

    db.shutdown().await;
    Ok(())
}
