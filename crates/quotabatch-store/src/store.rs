use crate::error::{Result, StoreError};
use crate::item::JobItem;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, ToSql};
use std::path::Path;
use std::time::Duration;

/// How `claim_next` orders candidate rows before taking the first one.
///
/// Both reference strategies in the Python original exposed a
/// `random_order` flag that swapped `ORDER BY id DESC` for
/// `ORDER BY RANDOM()`; this is that flag, made explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOrder {
    Descending,
    Random,
}

impl ClaimOrder {
    fn sql_clause(self) -> &'static str {
        match self {
            ClaimOrder::Descending => "ORDER BY id DESC",
            ClaimOrder::Random => "ORDER BY RANDOM()",
        }
    }
}

/// A single connection to the job store's SQLite file.
///
/// One `Store` is owned per worker for the worker's lifetime; connections
/// are never shared across threads. The busy timeout absorbs transient
/// write-lock contention between workers racing on `claim_next` so that a
/// losing worker blocks briefly rather than failing outright, though
/// `claim_next` itself still treats `SQLITE_BUSY` as "nothing claimed" per
/// the store's contract, not as a hard error.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Opens (creating if absent) the SQLite file at `path`, with a busy
    /// timeout generous enough to ride out a worker pool's write-lock churn.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(30))?;
        Ok(Self { conn })
    }

    /// Opens an in-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.busy_timeout(Duration::from_secs(30))?;
        Ok(Self { conn })
    }

    /// Runs strategy-supplied `CREATE TABLE IF NOT EXISTS` (and any
    /// auxiliary table) DDL. Idempotent by construction of the DDL itself.
    pub fn execute_ddl(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Atomically claims one row matching `ready_predicate` from `table`,
    /// transitioning it to `in-progress` and stamping `request_timestamp`.
    ///
    /// Begins an immediate-mode transaction so the write lock is taken
    /// before the read, closing the race where two workers both see the
    /// same row as claimable. If another connection already holds the
    /// write lock, or the predicate matches nothing, rolls back and
    /// returns `Ok(None)` — the caller's outer loop is expected to retry.
    pub fn claim_next(
        &self,
        table: &str,
        ready_predicate: &str,
        order: ClaimOrder,
        now: &str,
    ) -> Result<Option<JobItem>> {
        if let Err(err) = self.conn.execute_batch("BEGIN IMMEDIATE") {
            return if is_busy(&err) {
                #[cfg(feature = "tracing")]
                tracing::debug!(table, "claim_next found the write lock held, yielding this round");
                Ok(None)
            } else {
                Err(err.into())
            };
        }

        let select_sql = format!(
            "SELECT * FROM {table} WHERE {ready_predicate} {order} LIMIT 1",
            order = order.sql_clause()
        );

        let claimed = match self
            .conn
            .query_row(&select_sql, [], JobItem::from_row)
            .optional()
        {
            Ok(item) => item,
            Err(err) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                return Err(err.into());
            }
        };

        let Some(item) = claimed else {
            self.conn.execute_batch("ROLLBACK")?;
            #[cfg(feature = "tracing")]
            tracing::debug!(table, ready_predicate, "claim_next found nothing ready");
            return Ok(None);
        };

        let update_sql = format!(
            "UPDATE {table} SET state = 'in-progress', request_timestamp = ?1 WHERE id = ?2"
        );
        if let Err(err) = self
            .conn
            .execute(&update_sql, rusqlite::params![now, item.id])
        {
            let _ = self.conn.execute_batch("ROLLBACK");
            return Err(err.into());
        }

        self.conn.execute_batch("COMMIT")?;
        #[cfg(feature = "tracing")]
        tracing::debug!(table, id = item.id, "claimed row, transitioned to in-progress");
        Ok(Some(item))
    }

    /// Sets an arbitrary set of columns on one row by id. Used by a
    /// Strategy's `interpret_success`/`interpret_failure` to record
    /// terminal outcome fields.
    pub fn update_row(&self, table: &str, id: i64, columns: &[(&str, &dyn ToSql)]) -> Result<()> {
        if columns.is_empty() {
            return Ok(());
        }
        let set_clause = columns
            .iter()
            .enumerate()
            .map(|(index, (name, _))| format!("{name} = ?{}", index + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE {table} SET {set_clause} WHERE id = ?{}", columns.len() + 1);

        let mut params: Vec<&dyn ToSql> = columns.iter().map(|(_, value)| *value).collect();
        params.push(&id);
        self.conn.execute(&sql, params.as_slice())?;
        Ok(())
    }

    /// Resets every row matching `predicate` to the given `columns`,
    /// returning the number of rows touched. This is `reset_failed`'s
    /// primitive: the Strategy supplies both the predicate (typically
    /// `state = 'failed'`) and the reset target (back to `pending` or
    /// directly to `ready`, per the Strategy's own retry semantics).
    pub fn reset_rows(&self, table: &str, predicate: &str, columns: &[(&str, &dyn ToSql)]) -> Result<u64> {
        let set_clause = columns
            .iter()
            .enumerate()
            .map(|(index, (name, _))| format!("{name} = ?{}", index + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE {table} SET {set_clause} WHERE {predicate}");
        let params: Vec<&dyn ToSql> = columns.iter().map(|(_, value)| *value).collect();
        let count = self.conn.execute(&sql, params.as_slice())?;

        #[cfg(feature = "tracing")]
        tracing::info!(table, predicate, count, "reset rows for retry");

        Ok(count as u64)
    }

    /// Runs a parameterized query returning zero or more rows, mapped by
    /// `map`. Used by a Strategy's `prepare()` pass to bulk-read pending
    /// rows for offline classification.
    pub fn query_rows<T>(
        &self,
        sql: &str,
        params: &[&dyn ToSql],
        mut map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>> {
        let mut statement = self.conn.prepare(sql)?;
        let rows = statement.query_map(params, |row| map(row))?;
        rows.collect::<rusqlite::Result<Vec<T>>>().map_err(StoreError::from)
    }

    /// Runs a parameterized query expected to return at most one row.
    /// Used by a Strategy's lookup tables (e.g. a valid-value set or an
    /// old-to-new mapping table) during `prepare()`.
    pub fn query_optional<T>(
        &self,
        sql: &str,
        params: &[&dyn ToSql],
        map: impl FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Option<T>> {
        self.conn.query_row(sql, params, map).optional().map_err(StoreError::from)
    }
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(error, _) if error.code == ErrorCode::DatabaseBusy
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    const CREATE_TICKETS: &str = "
        CREATE TABLE IF NOT EXISTS tickets (
            id INTEGER PRIMARY KEY,
            state TEXT NOT NULL DEFAULT 'pending',
            request_timestamp TEXT,
            response_status_code INTEGER,
            error_message TEXT,
            response_foreign_id INTEGER
        );
    ";

    fn seed(store: &Store, ids: impl IntoIterator<Item = i64>) {
        for id in ids {
            store
                .conn
                .execute(
                    "INSERT INTO tickets (id, state) VALUES (?1, 'ready')",
                    rusqlite::params![id],
                )
                .unwrap();
        }
    }

    #[test]
    fn claim_next_transitions_to_in_progress_and_stamps_timestamp() {
        let store = Store::open_in_memory().unwrap();
        store.execute_ddl(CREATE_TICKETS).unwrap();
        seed(&store, [1]);

        let item = store
            .claim_next("tickets", "state = 'ready'", ClaimOrder::Descending, "2026-01-01T00:00:00")
            .unwrap()
            .expect("row should be claimed");

        assert_eq!(item.id, 1);
        let state: String = store
            .conn
            .query_row("SELECT state FROM tickets WHERE id = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(state, "in-progress");
    }

    #[test]
    fn claim_next_returns_none_when_nothing_ready() {
        let store = Store::open_in_memory().unwrap();
        store.execute_ddl(CREATE_TICKETS).unwrap();

        let claimed = store
            .claim_next("tickets", "state = 'ready'", ClaimOrder::Descending, "now")
            .unwrap();
        assert!(claimed.is_none());
    }

    #[test]
    fn descending_order_claims_highest_id_first() {
        let store = Store::open_in_memory().unwrap();
        store.execute_ddl(CREATE_TICKETS).unwrap();
        seed(&store, [10, 11, 12]);

        let mut claimed_order = Vec::new();
        while let Some(item) = store
            .claim_next("tickets", "state = 'ready'", ClaimOrder::Descending, "now")
            .unwrap()
        {
            claimed_order.push(item.id);
        }

        assert_eq!(claimed_order, vec![12, 11, 10]);
    }

    #[test]
    fn reset_rows_only_touches_matching_predicate_and_returns_count() {
        let store = Store::open_in_memory().unwrap();
        store.execute_ddl(CREATE_TICKETS).unwrap();
        seed(&store, [1, 2, 3]);
        store
            .conn
            .execute("UPDATE tickets SET state = 'failed' WHERE id IN (1, 2)", [])
            .unwrap();

        let error_message: &dyn ToSql = &"boom";
        store
            .update_row("tickets", 1, &[("error_message", error_message)])
            .unwrap();

        let count = store
            .reset_rows(
                "tickets",
                "state = 'failed'",
                &[
                    ("state", &"pending" as &dyn ToSql),
                    ("request_timestamp", &rusqlite::types::Null as &dyn ToSql),
                    ("response_status_code", &rusqlite::types::Null as &dyn ToSql),
                    ("error_message", &rusqlite::types::Null as &dyn ToSql),
                ],
            )
            .unwrap();

        assert_eq!(count, 2);

        let untouched_state: String = store
            .conn
            .query_row("SELECT state FROM tickets WHERE id = 3", [], |row| row.get(0))
            .unwrap();
        assert_eq!(untouched_state, "ready");

        let reset_error: Option<String> = store
            .conn
            .query_row("SELECT error_message FROM tickets WHERE id = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(reset_error, None);
    }

    #[test]
    fn concurrent_workers_claim_every_row_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contention.sqlite");

        {
            let store = Store::open(&path).unwrap();
            store.execute_ddl(CREATE_TICKETS).unwrap();
            seed(&store, 1..=100);
        }

        let path = Arc::new(path);
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let path = Arc::clone(&path);
                thread::spawn(move || {
                    let store = Store::open(path.as_ref()).unwrap();
                    let mut claimed = Vec::new();
                    loop {
                        match store
                            .claim_next("tickets", "state = 'ready'", ClaimOrder::Descending, "now")
                            .unwrap()
                        {
                            Some(item) => claimed.push(item.id),
                            None => {
                                // Another worker may still be mid-transaction on the
                                // last row; a short retry distinguishes "exhausted"
                                // from "lost the race this time".
                                thread::sleep(Duration::from_millis(2));
                                let remaining: i64 = store
                                    .conn
                                    .query_row(
                                        "SELECT COUNT(*) FROM tickets WHERE state = 'ready'",
                                        [],
                                        |row| row.get(0),
                                    )
                                    .unwrap();
                                if remaining == 0 {
                                    break;
                                }
                            }
                        }
                    }
                    claimed
                })
            })
            .collect();

        let mut all_claimed: Vec<i64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        all_claimed.sort_unstable();
        all_claimed.dedup();
        assert_eq!(all_claimed.len(), 100);
    }
}
