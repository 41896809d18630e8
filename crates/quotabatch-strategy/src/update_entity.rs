use crate::error::Result;
use crate::request::ApiRequest;
use crate::strategy::{JobStrategy, PrepareSummary};
use quotabatch_store::{ClaimOrder, JobItem, Store};
use rusqlite::types::Value as SqlValue;
use rusqlite::ToSql;
use serde_json::{json, Value};

/// Grounded on `ticket_category_updater.py` / `batch_ticket_category_updater.py`:
/// a two-phase update job. `prepare()` classifies every pending row against
/// a `valid_categories` lookup table and a `category_mappings` table,
/// leaving it `skipped`, `ready`, or `unmapped`; the run phase then `PUT`s
/// only the `ready` rows.
pub struct UpdateEntityStrategy {
    table: String,
    entity_kind: String,
}

impl UpdateEntityStrategy {
    pub fn new(table: impl Into<String>, entity_kind: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            entity_kind: entity_kind.into(),
        }
    }

    /// The default strategy for ticket category updates, matching the
    /// Python original's `tickets` table and `ticket` envelope.
    pub fn ticket_categories() -> Self {
        Self::new("tickets", "ticket")
    }

    /// Mirrors `validate_category`: a row's current category triple is
    /// valid if it (or its most specific non-null prefix) appears in
    /// `valid_categories`. Matches on the most specific prefix first,
    /// exactly as the Python original does, rather than a looser
    /// `COALESCE`-style comparison.
    fn category_is_valid(&self, store: &Store, category: Option<&str>, sub: Option<&str>, item: Option<&str>) -> Result<bool> {
        let Some(category) = category else {
            return Ok(false);
        };

        let sql = match (sub, item) {
            (Some(_), Some(_)) => {
                "SELECT 1 FROM valid_categories WHERE category = ?1 AND sub_category = ?2 AND item_category = ?3 LIMIT 1"
            }
            (Some(_), None) => {
                "SELECT 1 FROM valid_categories WHERE category = ?1 AND sub_category = ?2 AND item_category IS NULL LIMIT 1"
            }
            (None, _) => "SELECT 1 FROM valid_categories WHERE category = ?1 AND sub_category IS NULL AND item_category IS NULL LIMIT 1",
        };

        let params: Vec<&dyn ToSql> = match (sub, item) {
            (Some(s), Some(i)) => vec![&category as &dyn ToSql, &s as &dyn ToSql, &i as &dyn ToSql],
            (Some(s), None) => vec![&category as &dyn ToSql, &s as &dyn ToSql],
            (None, _) => vec![&category as &dyn ToSql],
        };

        let found: Option<i64> = store.query_optional(sql, &params, |row| row.get(0))?;
        Ok(found.is_some())
    }

    /// Mirrors `get_new_category`: looks up the mapping row for the most
    /// specific non-null prefix of the old category triple.
    fn new_category_mapping(
        &self,
        store: &Store,
        category: &str,
        sub: Option<&str>,
        item: Option<&str>,
    ) -> Result<Option<(Option<String>, Option<String>, Option<String>)>> {
        let sql = match (sub, item) {
            (Some(_), Some(_)) => {
                "SELECT new_category, new_sub_category, new_item_category FROM category_mappings \
                 WHERE old_category = ?1 AND old_sub_category = ?2 AND old_item_category = ?3 LIMIT 1"
            }
            (Some(_), None) => {
                "SELECT new_category, new_sub_category, new_item_category FROM category_mappings \
                 WHERE old_category = ?1 AND old_sub_category = ?2 AND old_item_category IS NULL LIMIT 1"
            }
            (None, _) => {
                "SELECT new_category, new_sub_category, new_item_category FROM category_mappings \
                 WHERE old_category = ?1 AND old_sub_category IS NULL AND old_item_category IS NULL LIMIT 1"
            }
        };

        let params: Vec<&dyn ToSql> = match (sub, item) {
            (Some(s), Some(i)) => vec![&category as &dyn ToSql, &s as &dyn ToSql, &i as &dyn ToSql],
            (Some(s), None) => vec![&category as &dyn ToSql, &s as &dyn ToSql],
            (None, _) => vec![&category as &dyn ToSql],
        };

        store.query_optional(sql, &params, |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })
    }
}

const CREATE_TICKETS_DDL: &str = "
    CREATE TABLE IF NOT EXISTS tickets (
        id                   INTEGER PRIMARY KEY,
        category             TEXT,
        sub_category         TEXT,
        item_category        TEXT,
        new_category         TEXT,
        new_sub_category     TEXT,
        new_item_category    TEXT,
        state                TEXT      NOT NULL DEFAULT 'pending',
        request_timestamp    TEXT      DEFAULT NULL,
        response_status_code INTEGER   DEFAULT NULL,
        error_message        TEXT      DEFAULT NULL
    );
    CREATE TABLE IF NOT EXISTS valid_categories (
        id            INTEGER PRIMARY KEY,
        category      TEXT NOT NULL,
        sub_category  TEXT,
        item_category TEXT
    );
    CREATE TABLE IF NOT EXISTS category_mappings (
        id                INTEGER PRIMARY KEY,
        old_category      TEXT NOT NULL,
        old_sub_category  TEXT,
        old_item_category TEXT,
        new_category      TEXT,
        new_sub_category  TEXT,
        new_item_category TEXT
    );
";

impl JobStrategy for UpdateEntityStrategy {
    fn table_name(&self) -> &str {
        &self.table
    }

    fn ready_predicate(&self) -> &str {
        "state = 'ready'"
    }

    fn claim_order(&self) -> ClaimOrder {
        ClaimOrder::Descending
    }

    fn create_tables_ddl(&self) -> &str {
        CREATE_TICKETS_DDL
    }

    fn prepare(&self, store: &Store) -> Result<PrepareSummary> {
        let pending = store.query_rows(
            "SELECT * FROM tickets WHERE state = 'pending' ORDER BY id DESC",
            &[],
            JobItem::from_row,
        )?;

        let mut summary = PrepareSummary::default();

        for ticket in &pending {
            summary.total += 1;

            let category = ticket.get_str("category");
            let sub_category = ticket.get_str("sub_category");
            let item_category = ticket.get_str("item_category");
            let is_empty = category.is_none() && sub_category.is_none() && item_category.is_none();

            let is_valid = self.category_is_valid(store, category, sub_category, item_category)?;

            if is_valid || is_empty {
                let state_value: &dyn ToSql = &"skipped";
                store.update_row(&self.table, ticket.id, &[("state", state_value)])?;
                summary.skipped += 1;
                continue;
            }

            let mapping = match category {
                Some(category) => self.new_category_mapping(store, category, sub_category, item_category)?,
                None => None,
            };

            match mapping {
                Some((new_category, new_sub_category, new_item_category)) => {
                    let state_value: &dyn ToSql = &"ready";
                    let new_category_value: &dyn ToSql = &new_category;
                    let new_sub_value: &dyn ToSql = &new_sub_category;
                    let new_item_value: &dyn ToSql = &new_item_category;
                    store.update_row(
                        &self.table,
                        ticket.id,
                        &[
                            ("state", state_value),
                            ("new_category", new_category_value),
                            ("new_sub_category", new_sub_value),
                            ("new_item_category", new_item_value),
                        ],
                    )?;
                    summary.ready += 1;
                }
                None => {
                    let state_value: &dyn ToSql = &"unmapped";
                    store.update_row(&self.table, ticket.id, &[("state", state_value)])?;
                    summary.unmapped += 1;
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::info!(
            total = summary.total,
            ready = summary.ready,
            skipped = summary.skipped,
            unmapped = summary.unmapped,
            "prepare classified pending rows"
        );

        Ok(summary)
    }

    fn build_request(&self, item: &JobItem) -> Result<ApiRequest> {
        let mut fields = json!({
            "category": item.get_str("new_category"),
        });

        if let Some(sub_category) = item.get_str("new_sub_category") {
            fields["sub_category"] = json!(sub_category);
        }
        if let Some(item_category) = item.get_str("new_item_category") {
            fields["item_category"] = json!(item_category);
        }

        Ok(ApiRequest::Put {
            path: format!("tickets/{}", item.id),
            body: json!({ self.entity_kind.clone(): fields }),
        })
    }

    fn interpret_success(&self, store: &Store, item: &JobItem, status: u16, _response: &Value) -> Result<()> {
        let status_value: &dyn ToSql = &(status as i64);
        let state_value: &dyn ToSql = &"done";
        store.update_row(&self.table, item.id, &[("state", state_value), ("response_status_code", status_value)])?;
        Ok(())
    }

    fn interpret_failure(&self, store: &Store, item: &JobItem, status: Option<u16>, message: &str) -> Result<()> {
        let status_value = status.map(|s| s as i64);
        let status_value: &dyn ToSql = &status_value;
        let message_value: &dyn ToSql = &message;
        let state_value: &dyn ToSql = &"failed";
        store.update_row(
            &self.table,
            item.id,
            &[("state", state_value), ("response_status_code", status_value), ("error_message", message_value)],
        )?;

        #[cfg(feature = "tracing")]
        tracing::warn!(id = item.id, status = ?status, message, "row failed");

        Ok(())
    }

    fn retry_failed(&self, store: &Store) -> Result<u64> {
        // Mirrors TicketCategoryUpdater::retry_failed: reset straight back
        // to `pending`, not `ready`, so the next `prepare()` re-classifies
        // the row rather than assuming its stale mapping still applies.
        let state_value: &dyn ToSql = &"pending";
        let null_value: &dyn ToSql = &SqlValue::Null;
        let count = store.reset_rows(
            &self.table,
            "state = 'failed'",
            &[
                ("state", state_value),
                ("request_timestamp", null_value),
                ("response_status_code", null_value),
                ("error_message", null_value),
            ],
        )?;

        #[cfg(feature = "tracing")]
        tracing::info!(count, "reset failed rows back to pending for reclassification");

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_lookup_tables(store: &Store) {
        store.execute_ddl(CREATE_TICKETS_DDL).unwrap();
        store
            .execute_ddl("INSERT INTO valid_categories (category, sub_category, item_category) VALUES ('Hardware', 'Laptop', NULL)")
            .unwrap();
        store
            .execute_ddl(
                "INSERT INTO category_mappings (old_category, old_sub_category, old_item_category, new_category, new_sub_category, new_item_category) \
                 VALUES ('HW', 'Notebook', NULL, 'Hardware', 'Laptop', NULL)",
            )
            .unwrap();
    }

    #[test]
    fn prepare_skips_already_valid_rows() {
        let store = Store::open_in_memory().unwrap();
        seed_lookup_tables(&store);
        store
            .execute_ddl("INSERT INTO tickets (id, category, sub_category) VALUES (1, 'Hardware', 'Laptop')")
            .unwrap();

        let strategy = UpdateEntityStrategy::ticket_categories();
        let summary = strategy.prepare(&store).unwrap();

        assert_eq!(summary, PrepareSummary { total: 1, ready: 0, skipped: 1, unmapped: 0 });
    }

    #[test]
    fn prepare_skips_wholly_empty_rows() {
        let store = Store::open_in_memory().unwrap();
        seed_lookup_tables(&store);
        store.execute_ddl("INSERT INTO tickets (id) VALUES (1)").unwrap();

        let strategy = UpdateEntityStrategy::ticket_categories();
        let summary = strategy.prepare(&store).unwrap();

        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn prepare_maps_rows_with_a_known_mapping_to_ready() {
        let store = Store::open_in_memory().unwrap();
        seed_lookup_tables(&store);
        store
            .execute_ddl("INSERT INTO tickets (id, category, sub_category) VALUES (1, 'HW', 'Notebook')")
            .unwrap();

        let strategy = UpdateEntityStrategy::ticket_categories();
        let summary = strategy.prepare(&store).unwrap();

        assert_eq!(summary, PrepareSummary { total: 1, ready: 1, skipped: 0, unmapped: 0 });

        let (new_category, new_sub): (String, String) = store
            .query_optional("SELECT new_category, new_sub_category FROM tickets WHERE id = 1", &[], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap()
            .unwrap();
        assert_eq!(new_category, "Hardware");
        assert_eq!(new_sub, "Laptop");
    }

    #[test]
    fn prepare_marks_unmappable_rows_unmapped() {
        let store = Store::open_in_memory().unwrap();
        seed_lookup_tables(&store);
        store
            .execute_ddl("INSERT INTO tickets (id, category, sub_category) VALUES (1, 'Nonexistent', 'Thing')")
            .unwrap();

        let strategy = UpdateEntityStrategy::ticket_categories();
        let summary = strategy.prepare(&store).unwrap();

        assert_eq!(summary, PrepareSummary { total: 1, ready: 0, skipped: 0, unmapped: 1 });
    }

    #[test]
    fn build_request_puts_only_the_non_null_new_components() {
        let store = Store::open_in_memory().unwrap();
        store.execute_ddl(CREATE_TICKETS_DDL).unwrap();
        store
            .execute_ddl("INSERT INTO tickets (id, new_category, new_sub_category, state) VALUES (7, 'Hardware', 'Laptop', 'ready')")
            .unwrap();

        let item = store
            .claim_next("tickets", "id = 7", ClaimOrder::Descending, "now")
            .unwrap()
            .unwrap();

        let strategy = UpdateEntityStrategy::ticket_categories();
        let request = strategy.build_request(&item).unwrap();

        match request {
            ApiRequest::Put { path, body } => {
                assert_eq!(path, "tickets/7");
                assert_eq!(body["ticket"]["category"], "Hardware");
                assert_eq!(body["ticket"]["sub_category"], "Laptop");
                assert!(body["ticket"]["item_category"].is_null());
            }
            other => panic!("expected a PUT request, got {other:?}"),
        }
    }

    #[test]
    fn retry_failed_resets_to_pending_not_ready() {
        let store = Store::open_in_memory().unwrap();
        store.execute_ddl(CREATE_TICKETS_DDL).unwrap();
        store
            .execute_ddl("INSERT INTO tickets (id, state, error_message) VALUES (1, 'failed', 'boom')")
            .unwrap();

        let strategy = UpdateEntityStrategy::ticket_categories();
        let count = strategy.retry_failed(&store).unwrap();

        assert_eq!(count, 1);
        let (state, error): (String, Option<String>) = store
            .query_optional("SELECT state, error_message FROM tickets WHERE id = 1", &[], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap()
            .unwrap();
        assert_eq!(state, "pending");
        assert_eq!(error, None);
    }
}
