//! End-to-end acceptance scenarios from spec.md §8, exercising the full
//! stack: processor worker pool, durable store, HTTP client, and
//! coordinator together against a mocked ticketing server.

use quotabatch_http::ClientConfigBuilder;
use quotabatch_processor::Processor;
use quotabatch_quota::Coordinator;
use quotabatch_store::Store;
use quotabatch_strategy::CreateEntityStrategy;
use std::sync::Arc;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn seed_tickets(store: &Store, ids: impl IntoIterator<Item = i64>) {
    store.execute_ddl(CreateEntityStrategy::tickets().create_tables_ddl()).unwrap();
    for id in ids {
        store
            .execute_ddl(&format!(
                "INSERT INTO tickets (id, email, subject, category, state) \
                 VALUES ({id}, 'a@b.com', 'subj', 'Hardware', 'ready')"
            ))
            .unwrap();
    }
}

/// Scenario 6: seed 5 rows, mock fails all with 500, run, observe 5
/// `failed`; flip the mock to 200, invoke `retry-failed`, expect 5 `done`
/// with no residual `error_message`.
#[tokio::test]
async fn retry_failed_round_trip_recovers_every_row() {
    let server = MockServer::start().await;

    let failing = Mock::given(method("POST"))
        .and(path_regex("^/tickets$"))
        .respond_with(ResponseTemplate::new(500).set_body_string("server error"))
        .expect(5)
        .named("initial failures")
        .mount_as_scoped(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("jobs.sqlite");
    let base_url = server.uri();

    {
        let db_path = db_path.clone();
        tokio::task::spawn_blocking(move || {
            let store = Store::open(&db_path).unwrap();
            seed_tickets(&store, 1..=5);
        })
        .await
        .unwrap();
    }

    let first_report = {
        let db_path = db_path.clone();
        let base_url = base_url.clone();
        tokio::task::spawn_blocking(move || {
            let coordinator = Arc::new(Coordinator::new(Coordinator::builder().build()));
            let processor = Processor::new(
                db_path,
                Arc::new(CreateEntityStrategy::tickets()),
                coordinator,
                ClientConfigBuilder::new(base_url, "key").max_retries(0).build(),
                Processor::builder().worker_count(1).build(),
            );
            processor.run()
        })
        .await
        .unwrap()
    };

    assert_eq!(first_report.attempted, 5);
    assert_eq!(first_report.failed, 5);
    assert_eq!(first_report.succeeded, 0);

    drop(failing);
    Mock::given(method("POST"))
        .and(path_regex("^/tickets$"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"ticket": {"id": 99}})))
        .mount(&server)
        .await;

    let reset_count = {
        let db_path = db_path.clone();
        let base_url = base_url.clone();
        tokio::task::spawn_blocking(move || {
            let coordinator = Arc::new(Coordinator::new(Coordinator::builder().build()));
            let processor = Processor::new(
                db_path,
                Arc::new(CreateEntityStrategy::tickets()),
                coordinator,
                ClientConfigBuilder::new(base_url, "key").build(),
                Processor::builder().build(),
            );
            processor.retry_failed().unwrap()
        })
        .await
        .unwrap()
    };
    assert_eq!(reset_count, 5);

    let second_report = tokio::task::spawn_blocking(move || {
        let coordinator = Arc::new(Coordinator::new(Coordinator::builder().build()));
        let processor = Processor::new(
            db_path.clone(),
            Arc::new(CreateEntityStrategy::tickets()),
            coordinator,
            ClientConfigBuilder::new(base_url, "key").build(),
            Processor::builder().worker_count(1).build(),
        );
        let report = processor.run();

        let store = Store::open(&db_path).unwrap();
        let residual_errors: i64 = store
            .query_optional(
                "SELECT COUNT(*) FROM tickets WHERE error_message IS NOT NULL",
                &[],
                |row| row.get(0),
            )
            .unwrap()
            .unwrap();
        let done_count: i64 = store
            .query_optional("SELECT COUNT(*) FROM tickets WHERE state = 'done'", &[], |row| row.get(0))
            .unwrap()
            .unwrap();

        (report, residual_errors, done_count)
    })
    .await
    .unwrap();

    let (report, residual_errors, done_count) = second_report;
    assert_eq!(report.succeeded, 5);
    assert_eq!(report.failed, 0);
    assert_eq!(residual_errors, 0);
    assert_eq!(done_count, 5);
}

/// Scenario 3: every call returns 429; after `max_retries + 1` calls the
/// row is recorded `failed` with `response_status_code = 429`.
#[tokio::test]
async fn rate_limit_exhaustion_terminal_fails_the_row() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex("^/tickets$"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("jobs.sqlite");
    let base_url = server.uri();

    let (report, status) = tokio::task::spawn_blocking(move || {
        {
            let store = Store::open(&db_path).unwrap();
            seed_tickets(&store, [1]);
        }

        let coordinator = Arc::new(Coordinator::new(Coordinator::builder().build()));
        let processor = Processor::new(
            db_path.clone(),
            Arc::new(CreateEntityStrategy::tickets()),
            coordinator,
            ClientConfigBuilder::new(base_url, "key").max_retries(2).build(),
            Processor::builder().worker_count(1).build(),
        );
        let report = processor.run();

        let store = Store::open(&db_path).unwrap();
        let status: Option<i64> = store
            .query_optional("SELECT response_status_code FROM tickets WHERE id = 1", &[], |row| row.get(0))
            .unwrap()
            .unwrap();

        (report, status)
    })
    .await
    .unwrap();

    assert_eq!(report.attempted, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(status, Some(429));
}
