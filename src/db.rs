use log::{debug, warn};

pub use crate::db_pool::{create_db_pool, create_in_memory_pool, DbPool};
pub use crate::db_types::{Account, AccountRole, ImageDocument};

use crate::filter::{FacetPipeline, FacetResults};

/// User values that are served the admin account's collections.
const ANONYMOUS_USERS: [&str; 2] = ["visitor", "unauthorized"];

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Stored document {id} is malformed: {source}")]
    Corrupt {
        id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Document {id} is dated {year} but targets collection {collection}")]
    YearMismatch {
        id: String,
        year: i32,
        collection: String,
    },
    #[error("Document {id} has month {month}, expected 1-12")]
    InvalidMonth { id: String, month: i64 },
    #[error("No admin account configured")]
    NoAdminAccount,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Access to accounts and the yearly image collections.
#[derive(Debug, Clone)]
pub struct PhotoStore {
    pool: DbPool,
}

impl PhotoStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Round-trips a trivial query to prove the database answers.
    pub async fn ping(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    // ===== ACCOUNTS =====

    pub async fn upsert_account(&self, account: &Account) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO accounts (id, email, role) VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET email = excluded.email, role = excluded.role",
        )
        .bind(&account.id)
        .bind(&account.email)
        .bind(account.role.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let row: Option<(String, String, String)> =
            sqlx::query_as("SELECT id, email, role FROM accounts WHERE email = ?")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.and_then(account_from_row))
    }

    pub async fn admin_account(&self) -> StoreResult<Account> {
        let row: Option<(String, String, String)> = sqlx::query_as(
            "SELECT id, email, role FROM accounts WHERE role = 'admin' ORDER BY id LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        row.and_then(account_from_row)
            .ok_or(StoreError::NoAdminAccount)
    }

    /// Maps the request's user to the account whose collections are served.
    /// Anonymous and unknown users see the admin account.
    pub async fn resolve_owner(&self, user: Option<&str>) -> StoreResult<Account> {
        let email = user
            .map(str::trim)
            .filter(|u| !u.is_empty() && !ANONYMOUS_USERS.contains(u));

        if let Some(email) = email {
            if let Some(account) = self.find_account_by_email(email).await? {
                return Ok(account);
            }
            debug!("Unknown user {}, serving admin collections", email);
        }

        self.admin_account().await
    }

    // ===== COLLECTIONS =====

    /// Collection names owned by an account, ascending.
    pub async fn collections(&self, owner: &str) -> StoreResult<Vec<String>> {
        let years = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT collection FROM images WHERE owner = ? ORDER BY collection",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;
        Ok(years)
    }

    pub async fn find_all(&self, collection: &str, owner: &str) -> StoreResult<Vec<ImageDocument>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT id, document FROM images WHERE collection = ? AND owner = ? ORDER BY rowid",
        )
        .bind(collection)
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(document_from_row).collect()
    }

    pub async fn find_by_id(&self, collection: &str, id: &str) -> StoreResult<Option<ImageDocument>> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT id, document FROM images WHERE collection = ? AND id = ?")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(document_from_row).transpose()
    }

    /// Runs each facet over the whole collection, one after another.
    pub async fn run_facets(
        &self,
        collection: &str,
        owner: &str,
        pipelines: &[FacetPipeline],
    ) -> StoreResult<FacetResults> {
        let mut results = FacetResults::default();
        for pipeline in pipelines {
            let mut query = pipeline.to_query(collection, owner);
            let rows: Vec<(String, String)> = query
                .build_query_as()
                .fetch_all(&self.pool)
                .await?;
            let docs = rows
                .into_iter()
                .map(document_from_row)
                .collect::<StoreResult<Vec<_>>>()?;
            debug!("Facet {} matched {} documents", pipeline.name(), docs.len());
            results.push(pipeline.field, docs);
        }
        Ok(results)
    }

    // ===== WRITES =====

    /// Normalizes and inserts a document into its yearly collection.
    pub async fn insert(&self, collection: &str, doc: &ImageDocument) -> StoreResult<()> {
        let mut doc = doc.clone();
        doc.normalize();
        check_document(collection, &doc)?;

        sqlx::query("INSERT INTO images (id, collection, owner, document) VALUES (?, ?, ?, ?)")
            .bind(&doc.id)
            .bind(collection)
            .bind(&doc.owner)
            .bind(encode_document(&doc)?)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Replaces a stored document. Returns false when no row matched.
    pub async fn update_document(&self, collection: &str, doc: &ImageDocument) -> StoreResult<bool> {
        let mut doc = doc.clone();
        doc.normalize();
        check_document(collection, &doc)?;

        let result = sqlx::query(
            "UPDATE images SET document = ?, updated_at = CURRENT_TIMESTAMP
             WHERE collection = ? AND id = ?",
        )
        .bind(encode_document(&doc)?)
        .bind(collection)
        .bind(&doc.id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Ingestion invariants that the read path relies on.
fn check_document(collection: &str, doc: &ImageDocument) -> StoreResult<()> {
    if !(1..=12).contains(&doc.date.month) {
        return Err(StoreError::InvalidMonth {
            id: doc.id.clone(),
            month: doc.date.month,
        });
    }
    if doc.collection_name() != collection {
        return Err(StoreError::YearMismatch {
            id: doc.id.clone(),
            year: doc.date.year,
            collection: collection.to_string(),
        });
    }
    Ok(())
}

fn encode_document(doc: &ImageDocument) -> StoreResult<String> {
    serde_json::to_string(doc).map_err(|source| StoreError::Corrupt {
        id: doc.id.clone(),
        source,
    })
}

fn document_from_row((id, document): (String, String)) -> StoreResult<ImageDocument> {
    serde_json::from_str(&document).map_err(|source| StoreError::Corrupt { id, source })
}

fn account_from_row((id, email, role): (String, String, String)) -> Option<Account> {
    match role.parse() {
        Ok(role) => Some(Account { id, email, role }),
        Err(()) => {
            warn!("Account {} has unknown role '{}'", id, role);
            None
        }
    }
}
