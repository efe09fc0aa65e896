use anyhow::Result;
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{Document, doc},
    error::{CommandError, Error, ErrorKind, WriteFailure},
    options::IndexOptions,
};

pub const ITEM_COLLECTION: &str = "item";
pub const USER_COLLECTION: &str = "user";

pub const USERNAME_INDEX: &str = "username_unique";
pub const EMAIL_INDEX: &str = "email_unique";

const DUPLICATE_KEY_CODE: i32 = 11000;
/// IndexOptionsConflict and IndexKeySpecsConflict: an equivalent index exists
/// under another name, e.g. the driver default `username_1`.
const EXISTING_INDEX_CODES: [i32; 2] = [85, 86];

/// Handle to the document store. Clones share the driver's connection pool.
#[derive(Debug, Clone)]
pub struct Db {
    client: Client,
    database: Database,
}

impl Db {
    /// Build a client for `uri`. The driver connects lazily, so this does not
    /// touch the network for plain `mongodb://` URIs; call [`Db::ping`] to
    /// verify the server is reachable.
    pub async fn open(uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        let database = client.database(database);
        Ok(Self { client, database })
    }

    pub async fn ping(&self) -> Result<()> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    pub fn items(&self) -> Collection<Document> {
        self.database.collection(ITEM_COLLECTION)
    }

    pub fn users(&self) -> Collection<Document> {
        self.database.collection(USER_COLLECTION)
    }

    /// Create the unique indexes that back username/email uniqueness.
    /// Idempotent: the server ignores an identical existing index, and an
    /// index on the same key under a different name is left in place.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let users = self.users();
        for (field, name) in [("username", USERNAME_INDEX), ("email", EMAIL_INDEX)] {
            match users.create_index(unique_index(field, name)).await {
                Ok(_) => {}
                Err(err) if index_already_exists(&err) => {
                    tracing::warn!(field, error = %err, "keeping existing index on user field");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    pub async fn shutdown(self) {
        self.client.shutdown().await;
    }
}

fn index_already_exists(err: &Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Command(CommandError { code, .. }) if EXISTING_INDEX_CODES.contains(code)
    )
}

fn unique_index(field: &str, name: &str) -> IndexModel {
    let mut keys = Document::new();
    keys.insert(field, 1);
    IndexModel::builder()
        .keys(keys)
        .options(
            IndexOptions::builder()
                .unique(true)
                .name(name.to_string())
                .build(),
        )
        .build()
}

/// Which unique user field a rejected write collided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateKey {
    Username,
    Email,
    Other,
}

impl DuplicateKey {
    /// `Some` only for duplicate-key write errors (code 11000).
    pub fn from_error(err: &Error) -> Option<Self> {
        match err.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(write_error))
                if write_error.code == DUPLICATE_KEY_CODE =>
            {
                Some(Self::from_index_message(&write_error.message))
            }
            _ => None,
        }
    }

    /// The server names the violated index and the colliding key in the
    /// write error. Our own index names are checked first; databases whose
    /// indexes carry other names fall back to the `dup key` document.
    pub fn from_index_message(message: &str) -> Self {
        if message.contains(&format!("index: {USERNAME_INDEX}")) {
            Self::Username
        } else if message.contains(&format!("index: {EMAIL_INDEX}")) {
            Self::Email
        } else if message.contains("dup key: { username:") {
            Self::Username
        } else if message.contains("dup key: { email:") {
            Self::Email
        } else {
            Self::Other
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Username => "Duplicate Username!",
            Self::Email => "Duplicate Email!",
            Self::Other => "An error occurred",
        }
    }
}
