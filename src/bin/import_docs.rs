use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;

use photo_diary::db::{create_db_pool, Account, AccountRole, ImageDocument, PhotoStore, StoreError};

/// Imports JSON arrays of image documents into their yearly collections.
#[derive(Debug, Parser)]
#[command(name = "import_docs")]
struct Args {
    /// SQLite database file, created if missing
    #[arg(long)]
    db: String,

    /// Owner account; created as admin when it does not exist yet
    #[arg(long)]
    owner_email: String,

    /// JSON files, each holding an array of documents
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

/// Whether an insert failure is a problem with the document itself.
/// Anything else means the database is unusable and the import stops.
fn is_rejection(err: &StoreError) -> bool {
    matches!(
        err,
        StoreError::YearMismatch { .. } | StoreError::InvalidMonth { .. } | StoreError::Corrupt { .. }
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let pool = create_db_pool(&args.db, 1)
        .await
        .with_context(|| format!("opening database {}", args.db))?;
    let store = PhotoStore::new(pool);

    let owner = match store.find_account_by_email(&args.owner_email).await? {
        Some(account) => account,
        None => {
            let account = Account {
                id: format!("account-{}", args.owner_email),
                email: args.owner_email.clone(),
                role: AccountRole::Admin,
            };
            store.upsert_account(&account).await?;
            info!("Created admin account {}", account.email);
            account
        }
    };

    let mut inserted = 0usize;
    let mut rejected = 0usize;

    for path in &args.files {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let docs: Vec<ImageDocument> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing {}", path.display()))?;

        for mut doc in docs {
            doc.owner = owner.id.clone();
            let collection = doc.collection_name();
            match store.insert(&collection, &doc).await {
                Ok(()) => inserted += 1,
                Err(e) if is_rejection(&e) => {
                    warn!("Rejected {} from {}: {}", doc.id, path.display(), e);
                    rejected += 1;
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("inserting {} after {} documents", doc.id, inserted)
                    })
                }
            }
        }
    }

    println!("Imported {} documents, rejected {}", inserted, rejected);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let args = Args::try_parse_from([
            "import_docs",
            "--db",
            "diary.db",
            "--owner-email",
            "me@example.com",
            "a.json",
            "b.json",
        ])
        .unwrap();
        assert_eq!(args.db, "diary.db");
        assert_eq!(args.owner_email, "me@example.com");
        assert_eq!(args.files, vec![PathBuf::from("a.json"), PathBuf::from("b.json")]);
    }

    #[test]
    fn test_parse_args_rejects_incomplete() {
        assert!(Args::try_parse_from(["import_docs", "--db", "diary.db", "a.json"]).is_err());
        assert!(Args::try_parse_from([
            "import_docs",
            "--db",
            "diary.db",
            "--owner-email",
            "me@example.com"
        ])
        .is_err());
        assert!(Args::try_parse_from(["import_docs", "--verbose", "a.json"]).is_err());
        assert!(Args::try_parse_from(["import_docs", "--db"]).is_err());
    }

    #[test]
    fn test_only_document_problems_are_rejections() {
        assert!(is_rejection(&StoreError::InvalidMonth {
            id: "a".to_string(),
            month: 13
        }));
        assert!(is_rejection(&StoreError::YearMismatch {
            id: "a".to_string(),
            year: 2022,
            collection: "2021".to_string()
        }));
        assert!(!is_rejection(&StoreError::Database(sqlx::Error::PoolClosed)));
        assert!(!is_rejection(&StoreError::NoAdminAccount));
    }
}
