use futures::TryStreamExt;
use mongodb::bson::{DateTime, Document, doc, oid::ObjectId};
use serde_json::{Map, Value};

use crate::{
    dto::users::{CreateUserRequest, ReplaceUserRequest},
    error::{AppError, AppResult},
    fields::{FieldRule, merge_present, missing_fields},
    models::{Status, document_to_json},
    response::{Created, Deleted, Modified, Page, Pagination},
    routes::params::ListQuery,
    services::{auth_service::hash_password, item_service::inserted_id},
    state::AppState,
};

const PATCH_FIELDS: &[FieldRule] = &[
    FieldRule::verbatim("username", "username"),
    FieldRule::verbatim("email", "email"),
    FieldRule::verbatim("firstname", "firstname"),
    FieldRule::verbatim("lastname", "lastname"),
    FieldRule::verbatim("status", "status"),
];

const MISSING_MANDATORY: &str = "Missing mandatory data";

/// Projection applied to every read of a user document.
pub fn without_password() -> Document {
    doc! { "password": 0 }
}

pub async fn list_users(state: &AppState, query: ListQuery) -> AppResult<Page<Value>> {
    let (page, limit, skip) = query.normalize();
    let users = state.db.users();

    let total = users.count_documents(doc! {}).await? as i64;
    let data = users
        .find(doc! {})
        .projection(without_password())
        .sort(doc! { "_id": 1 })
        .skip(skip)
        .limit(limit)
        .await?
        .try_collect::<Vec<Document>>()
        .await?
        .into_iter()
        .map(document_to_json)
        .collect();

    Ok(Page::new(data, Pagination::new(page, limit, total)))
}

pub async fn get_user(state: &AppState, id: &str) -> AppResult<Value> {
    let id = ObjectId::parse_str(id)?;
    let user = state
        .db
        .users()
        .find_one(doc! { "_id": id })
        .projection(without_password())
        .await?
        .ok_or_else(not_found)?;
    Ok(document_to_json(user))
}

pub async fn create_user(state: &AppState, payload: CreateUserRequest) -> AppResult<Created> {
    let username = non_empty(payload.username);
    let email = non_empty(payload.email);
    let password = non_empty(payload.password);

    let present = [
        ("username", username.is_some()),
        ("email", email.is_some()),
        ("password", password.is_some()),
    ];
    let (Some(username), Some(email), Some(password)) = (username, email, password) else {
        return Err(missing_fields(MISSING_MANDATORY, &present));
    };

    let now = DateTime::now();
    let result = state
        .db
        .users()
        .insert_one(doc! {
            "username": username,
            "email": email,
            "password": hash_password(&password)?,
            "firstname": payload.firstname.unwrap_or_default(),
            "lastname": payload.lastname.unwrap_or_default(),
            "status": Status::Active.as_str(),
            "createdAt": now,
            "updatedAt": now,
        })
        .await
        .map_err(AppError::from_user_write)?;

    let id = inserted_id(result.inserted_id);
    tracing::debug!(user_id = %id, "user created");
    Ok(Created {
        id,
        message: "User created".into(),
    })
}

pub async fn update_user(
    state: &AppState,
    id: &str,
    payload: Map<String, Value>,
) -> AppResult<Modified> {
    let id = ObjectId::parse_str(id)?;
    let mut update = merge_present(&payload, PATCH_FIELDS)?;
    if let Some(password) = payload.get("password").and_then(Value::as_str) {
        if !password.trim().is_empty() {
            update.insert("password", hash_password(password)?);
        }
    }
    update.insert("updatedAt", DateTime::now());

    let result = state
        .db
        .users()
        .update_one(doc! { "_id": id }, doc! { "$set": update })
        .await
        .map_err(AppError::from_user_write)?;
    if result.matched_count == 0 {
        return Err(not_found());
    }

    Ok(Modified {
        message: "User updated".into(),
        modified_count: result.modified_count,
    })
}

pub async fn replace_user(
    state: &AppState,
    id: &str,
    payload: ReplaceUserRequest,
) -> AppResult<Modified> {
    let id = ObjectId::parse_str(id)?;
    let username = non_empty(payload.username);
    let email = non_empty(payload.email);
    let present = [("username", username.is_some()), ("email", email.is_some())];
    let (Some(username), Some(email)) = (username, email) else {
        return Err(missing_fields(MISSING_MANDATORY, &present));
    };

    let mut update = doc! {
        "username": username,
        "email": email,
        "firstname": non_empty(payload.firstname).unwrap_or_default(),
        "lastname": non_empty(payload.lastname).unwrap_or_default(),
        "status": non_empty(payload.status).unwrap_or_else(|| Status::Active.as_str().to_string()),
        "updatedAt": DateTime::now(),
    };
    if let Some(password) = payload.password.filter(|p| !p.trim().is_empty()) {
        update.insert("password", hash_password(&password)?);
    }

    let result = state
        .db
        .users()
        .update_one(doc! { "_id": id }, doc! { "$set": update })
        .await
        .map_err(AppError::from_user_write)?;
    if result.matched_count == 0 {
        return Err(not_found());
    }

    Ok(Modified {
        message: "User replaced".into(),
        modified_count: result.modified_count,
    })
}

pub async fn delete_user(state: &AppState, id: &str) -> AppResult<Deleted> {
    let id = ObjectId::parse_str(id)?;
    let result = state.db.users().delete_one(doc! { "_id": id }).await?;
    if result.deleted_count == 0 {
        return Err(not_found());
    }

    Ok(Deleted {
        message: "User deleted".into(),
        deleted_count: result.deleted_count,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

fn not_found() -> AppError {
    AppError::NotFound("User not found".into())
}
