//! Forward-only schema migrations for the phylodb store.
//!
//! Files are applied in order: `0001_phylogeny` (projects, taxa, loci,
//! alleles), `0002_typing` (datasets, profiles), `0003_inference` (runs and
//! distance edges), `0004_visualization` (stored layouts).
//!
//! # Invariants
//! - Every versioned entity kind owns an identity table plus a
//!   `<kind>_versions` table with at most one open record per entity.
//! - The applied version is mirrored to `PRAGMA user_version`.
//! - Pending migrations run inside one IMMEDIATE transaction and the
//!   version is re-read under that lock, so connections opening a fresh
//!   file at the same time apply each migration exactly once.
//! - A store written by a newer binary is never touched.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::{Connection, TransactionBehavior};

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "0001_phylogeny",
        sql: include_str!("0001_phylogeny.sql"),
    },
    Migration {
        version: 2,
        name: "0002_typing",
        sql: include_str!("0002_typing.sql"),
    },
    Migration {
        version: 3,
        name: "0003_inference",
        sql: include_str!("0003_inference.sql"),
    },
    Migration {
        version: 4,
        name: "0004_visualization",
        sql: include_str!("0004_visualization.sql"),
    },
];

/// Schema version this binary writes.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Schema version recorded in the store.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?)
}

/// Brings the store up to `latest_version()`.
///
/// # Errors
/// - `DbError::UnsupportedSchemaVersion` when the store is newer.
/// - `DbError::Migration` naming the file whose SQL failed; nothing from
///   the pending set is kept.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let latest = latest_version();
    let recorded = schema_version(conn)?;
    ensure_supported(recorded, latest)?;
    if recorded == latest {
        return Ok(());
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let from = schema_version(&tx)?;
    ensure_supported(from, latest)?;
    if from == latest {
        // Another connection finished the upgrade while this one waited.
        return Ok(());
    }

    for migration in MIGRATIONS.iter().filter(|migration| migration.version > from) {
        tx.execute_batch(migration.sql)
            .and_then(|()| {
                tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))
            })
            .map_err(|source| DbError::Migration {
                version: migration.version,
                name: migration.name,
                source,
            })?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={}",
        from, latest
    );
    Ok(())
}

fn ensure_supported(recorded: u32, latest: u32) -> DbResult<()> {
    if recorded > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: recorded,
            latest_supported: latest,
        });
    }
    Ok(())
}
