use futures::TryStreamExt;
use mongodb::bson::{Bson, DateTime, Document, doc, oid::ObjectId};
use serde_json::{Map, Value};

use crate::{
    dto::items::CreateItemRequest,
    error::{AppError, AppResult},
    fields::{FieldRule, coerce_float, copy_except, merge_present, missing_fields},
    models::{Status, document_to_json},
    response::{Created, Deleted, Modified, Page, Pagination},
    routes::params::ListQuery,
    state::AppState,
};

const PATCH_FIELDS: &[FieldRule] = &[
    FieldRule::verbatim("name", "itemName"),
    FieldRule::verbatim("category", "itemCategory"),
    FieldRule::float("price", "itemPrice"),
    FieldRule::verbatim("status", "status"),
];

/// Keys a full replace may not overwrite.
const SERVER_OWNED: &[&str] = &["_id", "createdAt", "updatedAt"];

pub async fn list_items(state: &AppState, query: ListQuery) -> AppResult<Page<Value>> {
    let (page, limit, skip) = query.normalize();
    let items = state.db.items();

    let total = items.count_documents(doc! {}).await? as i64;
    let data = items
        .find(doc! {})
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

pub async fn get_item(state: &AppState, id: &str) -> AppResult<Value> {
    let id = ObjectId::parse_str(id)?;
    let item = state
        .db
        .items()
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(not_found)?;
    Ok(document_to_json(item))
}

pub async fn create_item(state: &AppState, payload: CreateItemRequest) -> AppResult<Created> {
    let name = payload.name.filter(|s| !s.is_empty());
    let category = payload.category.filter(|s| !s.is_empty());

    let present = [
        ("name", name.is_some()),
        ("category", category.is_some()),
        ("price", payload.price.is_some()),
    ];
    let (Some(name), Some(category), Some(price)) = (name, category, payload.price) else {
        return Err(missing_fields("Missing required fields", &present));
    };
    let price = coerce_float(&price)
        .ok_or_else(|| AppError::BadRequest("Invalid value for price".into()))?;

    let now = DateTime::now();
    let result = state
        .db
        .items()
        .insert_one(doc! {
            "itemName": name,
            "itemCategory": category,
            "itemPrice": price,
            "status": Status::Active.as_str(),
            "createdAt": now,
            "updatedAt": now,
        })
        .await?;

    let id = inserted_id(result.inserted_id);
    tracing::debug!(item_id = %id, "item created");
    Ok(Created {
        id,
        message: "Item created".into(),
    })
}

pub async fn update_item(
    state: &AppState,
    id: &str,
    payload: Map<String, Value>,
) -> AppResult<Modified> {
    let id = ObjectId::parse_str(id)?;
    let mut update = merge_present(&payload, PATCH_FIELDS)?;
    update.insert("updatedAt", DateTime::now());

    let result = state
        .db
        .items()
        .update_one(doc! { "_id": id }, doc! { "$set": update })
        .await?;
    if result.matched_count == 0 {
        return Err(not_found());
    }

    Ok(Modified {
        message: "Item updated".into(),
        modified_count: result.modified_count,
    })
}

pub async fn replace_item(
    state: &AppState,
    id: &str,
    payload: Map<String, Value>,
) -> AppResult<Modified> {
    let id = ObjectId::parse_str(id)?;
    let mut update = copy_except(&payload, SERVER_OWNED)?;
    update.insert("updatedAt", DateTime::now());

    let result = state
        .db
        .items()
        .update_one(doc! { "_id": id }, doc! { "$set": update })
        .await?;
    if result.matched_count == 0 {
        return Err(not_found());
    }

    Ok(Modified {
        message: "Item replaced".into(),
        modified_count: result.modified_count,
    })
}

pub async fn delete_item(state: &AppState, id: &str) -> AppResult<Deleted> {
    let id = ObjectId::parse_str(id)?;
    let result = state.db.items().delete_one(doc! { "_id": id }).await?;
    if result.deleted_count == 0 {
        return Err(not_found());
    }

    Ok(Deleted {
        message: "Item deleted".into(),
        deleted_count: result.deleted_count,
    })
}

pub(crate) fn inserted_id(id: Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        other => other.to_string(),
    }
}

fn not_found() -> AppError {
    AppError::NotFound("Item not found".into())
}
