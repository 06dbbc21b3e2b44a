//! SQL migration definitions for the personlink graph database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed as one batch.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Initial schema: persons, connections",
            sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One node per biography page
CREATE TABLE IF NOT EXISTS persons (
    url        TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    birth_date TEXT NOT NULL,
    death_date TEXT,
    saved_at   TEXT NOT NULL
);

-- Directed person-to-person edges
CREATE TABLE IF NOT EXISTS connections (
    id         TEXT PRIMARY KEY,
    from_url   TEXT NOT NULL REFERENCES persons(url) ON DELETE CASCADE,
    to_url     TEXT NOT NULL REFERENCES persons(url) ON DELETE CASCADE,
    context    TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE(from_url, to_url)
);

CREATE INDEX IF NOT EXISTS idx_connections_from ON connections(from_url);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
        Migration {
            version: 2,
            description: "Index incoming edges",
            sql: r#"
CREATE INDEX IF NOT EXISTS idx_connections_to ON connections(to_url);

INSERT INTO schema_migrations (version) VALUES (2);
"#,
        },
    ]
}
