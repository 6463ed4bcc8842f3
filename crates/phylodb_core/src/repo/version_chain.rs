//! Version-chain mechanics shared by every `<kind>_versions` table.
//!
//! # Invariants
//! - Version numbers per entity start at 1 and strictly increase.
//! - At most one record per entity has `to_ms IS NULL` (the open record).
//! - Closing the open record and inserting its successor happen in one
//!   IMMEDIATE transaction, or inside the caller's enclosing transaction.

use super::{RepoError, RepoResult};
use crate::model::VersionSelector;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, ToSql, Transaction, TransactionBehavior};
use std::time::{SystemTime, UNIX_EPOCH};

/// Names one `<kind>_versions` table.
#[derive(Debug, Clone, Copy)]
pub(crate) struct VersionChain {
    pub kind: &'static str,
    pub table: &'static str,
}

/// Runs `f` inside a write transaction on `conn`.
///
/// Joins the caller's transaction when one is already open; otherwise begins
/// an IMMEDIATE transaction and commits it when `f` succeeds. An error from
/// `f` drops the transaction, which rolls every write back.
pub fn in_write_transaction<T, F>(conn: &Connection, f: F) -> RepoResult<T>
where
    F: FnOnce() -> RepoResult<T>,
{
    if !conn.is_autocommit() {
        return f();
    }

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let value = f()?;
    tx.commit()?;
    Ok(value)
}

/// Highest stored version, `None` when the entity has no history.
pub(crate) fn max_version(
    conn: &Connection,
    chain: VersionChain,
    row_id: i64,
) -> RepoResult<Option<i64>> {
    let max: Option<i64> = conn.query_row(
        &format!(
            "SELECT MAX(version) FROM {} WHERE entity_row_id = ?1;",
            chain.table
        ),
        [row_id],
        |row| row.get(0),
    )?;
    Ok(max)
}

/// Version and deprecated flag of the open record.
pub(crate) fn open_record(
    conn: &Connection,
    chain: VersionChain,
    row_id: i64,
) -> RepoResult<Option<(i64, bool)>> {
    let record = conn
        .query_row(
            &format!(
                "SELECT version, deprecated
                 FROM {}
                 WHERE entity_row_id = ?1
                   AND to_ms IS NULL;",
                chain.table
            ),
            [row_id],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        )
        .optional()?;

    match record {
        Some((version, flag)) => Ok(Some((version, parse_bool(chain, flag)?))),
        None => Ok(None),
    }
}

/// True when the entity has an open, non-deprecated record.
pub(crate) fn is_live(conn: &Connection, chain: VersionChain, row_id: i64) -> RepoResult<bool> {
    Ok(matches!(open_record(conn, chain, row_id)?, Some((_, false))))
}

/// Resolves a selector to a stored version number.
pub(crate) fn resolve(
    conn: &Connection,
    chain: VersionChain,
    row_id: i64,
    selector: VersionSelector,
) -> RepoResult<Option<i64>> {
    match selector {
        VersionSelector::Current => match open_record(conn, chain, row_id)? {
            Some((version, false)) => Ok(Some(version)),
            _ => Ok(None),
        },
        VersionSelector::Exact(version) if version <= 0 => Ok(None),
        VersionSelector::Exact(version) => {
            let exists: i64 = conn.query_row(
                &format!(
                    "SELECT EXISTS(
                        SELECT 1 FROM {} WHERE entity_row_id = ?1 AND version = ?2
                    );",
                    chain.table
                ),
                params![row_id, version],
                |row| row.get(0),
            )?;
            Ok((exists == 1).then_some(version))
        }
    }
}

/// Appends the next revision for `row_id` and returns its version.
///
/// `payload` lists the kind-specific columns with their values. Must run
/// inside `in_write_transaction`; a failed post-condition returns
/// `RepoError::VersionConflict` so the enclosing transaction rolls back.
pub(crate) fn append(
    conn: &Connection,
    chain: VersionChain,
    row_id: i64,
    deprecated: bool,
    payload: &[(&str, &dyn ToSql)],
) -> RepoResult<i64> {
    let previous = max_version(conn, chain, row_id)?.unwrap_or(0);
    let next = previous + 1;
    let now = now_ms();

    conn.execute(
        &format!(
            "UPDATE {}
             SET to_ms = ?2
             WHERE entity_row_id = ?1
               AND to_ms IS NULL;",
            chain.table
        ),
        params![row_id, now],
    )?;

    let deprecated_flag = i64::from(deprecated);
    let mut columns = String::from("entity_row_id, version, from_ms, deprecated");
    let mut placeholders = String::from("?1, ?2, ?3, ?4");
    let mut values: Vec<&dyn ToSql> = vec![&row_id, &next, &now, &deprecated_flag];
    for (index, (column, value)) in payload.iter().enumerate() {
        columns.push_str(", ");
        columns.push_str(column);
        placeholders.push_str(&format!(", ?{}", index + 5));
        values.push(*value);
    }
    conn.execute(
        &format!(
            "INSERT INTO {} ({columns}) VALUES ({placeholders});",
            chain.table
        ),
        values.as_slice(),
    )?;

    let stored = max_version(conn, chain, row_id)?.unwrap_or(0);
    if stored != next || stored <= previous {
        return Err(RepoError::VersionConflict {
            kind: chain.kind,
            expected: next,
            found: stored,
        });
    }
    let open: i64 = conn.query_row(
        &format!(
            "SELECT COUNT(*) FROM {} WHERE entity_row_id = ?1 AND to_ms IS NULL;",
            chain.table
        ),
        [row_id],
        |row| row.get(0),
    )?;
    if open != 1 {
        return Err(RepoError::VersionConflict {
            kind: chain.kind,
            expected: next,
            found: stored,
        });
    }

    debug!(
        "event=version_append module=repo status=ok kind={} row_id={} version={} deprecated={}",
        chain.kind, row_id, next, deprecated
    );
    Ok(next)
}

pub(crate) fn parse_bool(chain: VersionChain, value: i64) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(RepoError::InvalidData(format!(
            "invalid deprecated flag `{value}` in {}",
            chain.table
        ))),
    }
}

pub(crate) fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{append, in_write_transaction, is_live, max_version, open_record, resolve};
    use super::VersionChain;
    use crate::model::VersionSelector;
    use rusqlite::Connection;

    const CHAIN: VersionChain = VersionChain {
        kind: "sample",
        table: "sample_versions",
    };

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE sample_versions (
                entity_row_id INTEGER NOT NULL,
                version INTEGER NOT NULL,
                from_ms INTEGER NOT NULL,
                to_ms INTEGER,
                deprecated INTEGER NOT NULL,
                label TEXT,
                PRIMARY KEY (entity_row_id, version)
            );",
        )
        .unwrap();
        conn
    }

    #[test]
    fn append_closes_the_previous_open_record() {
        let conn = setup();
        let label = "first".to_string();
        let v1 = in_write_transaction(&conn, || {
            append(&conn, CHAIN, 7, false, &[("label", &label)])
        })
        .unwrap();
        let v2 = in_write_transaction(&conn, || {
            append(&conn, CHAIN, 7, true, &[("label", &label)])
        })
        .unwrap();

        assert_eq!((v1, v2), (1, 2));
        assert_eq!(max_version(&conn, CHAIN, 7).unwrap(), Some(2));
        assert_eq!(open_record(&conn, CHAIN, 7).unwrap(), Some((2, true)));
        assert!(!is_live(&conn, CHAIN, 7).unwrap());

        let closed: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sample_versions WHERE to_ms IS NOT NULL;",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(closed, 1);
    }

    #[test]
    fn resolve_distinguishes_current_from_exact() {
        let conn = setup();
        in_write_transaction(&conn, || append(&conn, CHAIN, 1, false, &[])).unwrap();
        in_write_transaction(&conn, || append(&conn, CHAIN, 1, true, &[])).unwrap();

        assert_eq!(resolve(&conn, CHAIN, 1, VersionSelector::Current).unwrap(), None);
        assert_eq!(
            resolve(&conn, CHAIN, 1, VersionSelector::Exact(2)).unwrap(),
            Some(2)
        );
        assert_eq!(resolve(&conn, CHAIN, 1, VersionSelector::Exact(0)).unwrap(), None);
        assert_eq!(resolve(&conn, CHAIN, 1, VersionSelector::Exact(3)).unwrap(), None);
    }

    #[test]
    fn failed_body_rolls_back_the_transaction() {
        let conn = setup();
        let result: crate::repo::RepoResult<()> = in_write_transaction(&conn, || {
            append(&conn, CHAIN, 1, false, &[])?;
            Err(crate::repo::RepoError::InvalidData("boom".to_string()))
        });

        assert!(result.is_err());
        assert!(conn.is_autocommit());
        assert_eq!(max_version(&conn, CHAIN, 1).unwrap(), None);
    }
}
