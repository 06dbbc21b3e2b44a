//! libSQL graph store for people and the connections between them.
//!
//! The [`Storage`] struct wraps a local libSQL database holding one row per
//! person (keyed by page URL) and one row per directed connection.
//! Writes are upserts, so re-running a traversal never duplicates nodes or
//! edges.

mod migrations;

use std::path::Path;

use chrono::Utc;
use libsql::{Connection, Database, params};
use personlink_shared::{PersonDetails, PersonLinkError, Result};
use uuid::Uuid;

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

/// A stored connection, as read back from the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredConnection {
    /// Linked-to person.
    pub to: PersonDetails,
    /// Context sentence(s) that justified the link.
    pub context: String,
    /// RFC 3339 timestamp of the first time the edge was recorded.
    pub created_at: String,
}

fn storage_err(e: impl std::fmt::Display) -> PersonLinkError {
    PersonLinkError::Storage(e.to_string())
}

impl Storage {
    /// Open or create a database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PersonLinkError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;

        let conn = db.connect().map_err(storage_err)?;

        let storage = Self { db, conn };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        PersonLinkError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    // -----------------------------------------------------------------------
    // Person operations
    // -----------------------------------------------------------------------

    /// Insert a person, or refresh its details if the URL is already known.
    pub async fn save_person(&self, person: &PersonDetails) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO persons (url, name, birth_date, death_date, saved_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(url) DO UPDATE SET
                   name = excluded.name,
                   birth_date = excluded.birth_date,
                   death_date = excluded.death_date,
                   saved_at = excluded.saved_at",
                params![
                    person.url.as_str(),
                    person.name.as_str(),
                    person.birth_date.as_str(),
                    person.death_date.as_deref(),
                    now.as_str(),
                ],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// Get a person by page URL.
    pub async fn get_person(&self, url: &str) -> Result<Option<PersonDetails>> {
        let mut rows = self
            .conn
            .query(
                "SELECT url, name, birth_date, death_date FROM persons WHERE url = ?1",
                params![url],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_person(&row, 0)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    /// Number of stored persons.
    pub async fn count_persons(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM persons", params![])
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => row.get::<i64>(0).map(|n| n as u64).map_err(storage_err),
            Ok(None) => Ok(0),
            Err(e) => Err(storage_err(e)),
        }
    }

    // -----------------------------------------------------------------------
    // Connection operations
    // -----------------------------------------------------------------------

    /// Record a directed edge. Both persons must already be saved. Re-linking
    /// the same pair replaces the context.
    pub async fn link_persons(
        &self,
        from: &PersonDetails,
        to: &PersonDetails,
        context: &str,
    ) -> Result<()> {
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO connections (id, from_url, to_url, context, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(from_url, to_url) DO UPDATE SET
                   context = excluded.context",
                params![
                    id.as_str(),
                    from.url.as_str(),
                    to.url.as_str(),
                    context,
                    now.as_str()
                ],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// Outgoing connections of the person at `url`, oldest first.
    pub async fn connections_from(&self, url: &str) -> Result<Vec<StoredConnection>> {
        let mut rows = self
            .conn
            .query(
                "SELECT p.url, p.name, p.birth_date, p.death_date, c.context, c.created_at
                 FROM connections c JOIN persons p ON p.url = c.to_url
                 WHERE c.from_url = ?1
                 ORDER BY c.created_at, c.id",
                params![url],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(StoredConnection {
                to: row_to_person(&row, 0)?,
                context: row.get::<String>(4).map_err(storage_err)?,
                created_at: row.get::<String>(5).map_err(storage_err)?,
            });
        }
        Ok(results)
    }
}

/// Read a person from four consecutive columns starting at `offset`.
fn row_to_person(row: &libsql::Row, offset: i32) -> Result<PersonDetails> {
    Ok(PersonDetails {
        url: row.get::<String>(offset).map_err(storage_err)?,
        name: row.get::<String>(offset + 1).map_err(storage_err)?,
        birth_date: row.get::<String>(offset + 2).map_err(storage_err)?,
        death_date: row.get::<String>(offset + 3).ok(),
    })
}
