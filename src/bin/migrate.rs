use item_user_api::{config::AppConfig, db::Db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    let db = Db::open(&config.mongodb_uri, &config.mongodb_database).await?;
    db.ping().await?;
    db.ensure_indexes().await?;
    println!("Indexes ensured on {}", config.mongodb_database);
    db.shutdown().await;
    Ok(())
}
