use item_user_api::{
    config::AppConfig,
    db::Db,
    models::Status,
    services::auth_service::hash_password,
};
use mongodb::bson::{DateTime, doc};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let db = Db::open(&config.mongodb_uri, &config.mongodb_database).await?;
    db.ping().await?;
    db.ensure_indexes().await?;

    ensure_user(&db, "admin", "admin@example.com", "admin123").await?;
    ensure_user(&db, "user", "user@example.com", "user123").await?;
    seed_items(&db).await?;

    println!("Seed completed");
    db.shutdown().await;
    Ok(())
}

async fn ensure_user(db: &Db, username: &str, email: &str, password: &str) -> anyhow::Result<()> {
    let password_hash = hash_password(password)?;
    let now = DateTime::now();

    // Existing users keep their data; only missing ones are inserted.
    db.users()
        .update_one(
            doc! { "email": email },
            doc! {
                "$setOnInsert": {
                    "username": username,
                    "password": password_hash,
                    "firstname": "",
                    "lastname": "",
                    "status": Status::Active.as_str(),
                    "profileImage": null,
                    "createdAt": now,
                    "updatedAt": now,
                }
            },
        )
        .upsert(true)
        .await?;

    println!("Ensured user {email}");
    Ok(())
}

async fn seed_items(db: &Db) -> anyhow::Result<()> {
    let items = [
        ("Ferris Mug", "Kitchen", 12.5),
        ("Standing Desk", "Furniture", 349.0),
        ("Desk Lamp", "Lighting", 29.9),
        ("Rust Sticker Pack", "Stationery", 4.0),
    ];

    for (name, category, price) in items {
        let now = DateTime::now();
        db.items()
            .update_one(
                doc! { "itemName": name },
                doc! {
                    "$setOnInsert": {
                        "itemCategory": category,
                        "itemPrice": price,
                        "status": Status::Active.as_str(),
                        "createdAt": now,
                        "updatedAt": now,
                    }
                },
            )
            .upsert(true)
            .await?;
    }

    println!("Seeded items");
    Ok(())
}
