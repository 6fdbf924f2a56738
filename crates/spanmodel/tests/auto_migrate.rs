//! Auto-migration against the in-memory Spanner double.

mod support;

use asupersync::runtime::RuntimeBuilder;
use spanmodel::prelude::*;
use spanmodel_core::ConnectionErrorKind;
use spanmodel_schema::introspect::{COLUMN_TYPES_SQL, IS_GENERATED_SQL};
use spanmodel_schema::{DRY_RUN_UNSUPPORTED, UNIQUE_CONSTRAINTS_UNSUPPORTED};
use support::{
    Album, MockDriver, MockServer, PlainConnection, Singer, TestRecord, column_row, count_row, open_db,
};

const SINGERS_SEQ: &str =
    r#"CREATE SEQUENCE IF NOT EXISTS singers_seq OPTIONS (sequence_kind = "bit_reversed_positive")"#;
const SINGERS_TABLE: &str = "CREATE TABLE `singers` (\
    `id` INT64 DEFAULT (GET_NEXT_SEQUENCE_VALUE(Sequence singers_seq)),`created_at` TIMESTAMP,`updated_at` TIMESTAMP,`deleted_at` TIMESTAMP,\
    `first_name` STRING(MAX),`last_name` STRING(MAX),`full_name` STRING(MAX),`active` BOOL) \
    PRIMARY KEY (`id`)";
const SINGERS_INDEX: &str = "CREATE INDEX `idx_singers_deleted_at` ON `singers`(`deleted_at`)";

fn all_schemas() -> Vec<TableSchema> {
    vec![Singer::schema(), Album::schema(), TestRecord::schema()]
}

fn unchanged_singer_columns() -> Vec<Row> {
    vec![
        column_row(
            "id",
            Some("GET_NEXT_SEQUENCE_VALUE(Sequence singers_seq)"),
            "INT64",
            None,
        ),
        column_row("created_at", None, "TIMESTAMP", None),
        column_row("updated_at", None, "TIMESTAMP", None),
        column_row("deleted_at", None, "TIMESTAMP", None),
        column_row("first_name", None, "STRING", None),
        column_row("last_name", None, "STRING", None),
        column_row("full_name", None, "STRING", None),
        column_row("active", None, "BOOL", None),
    ]
}

#[test]
fn auto_migrate_sends_one_batched_request() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let server = MockServer::new();
    let db = open_db(&server);

    let outcome = rt.block_on(async { db.auto_migrate(&cx, &all_schemas()).await });
    assert!(matches!(outcome, Outcome::Ok(())), "{:?}", outcome);

    let requests = server.ddl_requests();
    assert_eq!(requests.len(), 1);
    let statements = &requests[0];
    assert_eq!(statements.len(), 8);
    assert_eq!(statements[0], SINGERS_SEQ);
    assert_eq!(statements[1], SINGERS_TABLE);
    assert_eq!(statements[2], SINGERS_INDEX);
    assert_eq!(
        statements[3],
        r#"CREATE SEQUENCE IF NOT EXISTS albums_seq OPTIONS (sequence_kind = "bit_reversed_positive")"#
    );
    assert_eq!(
        statements[4],
        "CREATE TABLE `albums` (`id` INT64 DEFAULT (GET_NEXT_SEQUENCE_VALUE(Sequence albums_seq)),\
         `created_at` TIMESTAMP,`updated_at` TIMESTAMP,`deleted_at` TIMESTAMP,\
         `title` STRING(MAX),`rating` FLOAT32,`singer_id` INT64,\
         CONSTRAINT `fk_albums_singer` FOREIGN KEY (`singer_id`) REFERENCES `singers`(`id`)) \
         PRIMARY KEY (`id`)"
    );
    assert_eq!(
        statements[5],
        "CREATE INDEX `idx_albums_deleted_at` ON `albums`(`deleted_at`)"
    );
    assert_eq!(
        statements[6],
        r#"CREATE SEQUENCE IF NOT EXISTS overrided_sequence_name OPTIONS (sequence_kind = "bit_reversed_positive")"#
    );
    assert_eq!(
        statements[7],
        "CREATE TABLE `tests` (`id` INT64 DEFAULT (GET_NEXT_SEQUENCE_VALUE(Sequence overrided_sequence_name)),\
         `test` STRING(MAX),`singer_id` INT64,\
         CONSTRAINT `fk_tests_singer` FOREIGN KEY (`singer_id`) REFERENCES `singers`(`id`)) \
         PRIMARY KEY (`id`)"
    );

    let executed = server.executed_sql();
    assert_eq!(executed.first().map(String::as_str), Some("START BATCH DDL"));
    assert_eq!(executed.last().map(String::as_str), Some("RUN BATCH"));
}

#[test]
fn dependencies_are_created_first() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let server = MockServer::new();
    let db = open_db(&server);

    let schemas = vec![TestRecord::schema(), Album::schema(), Singer::schema()];
    let outcome = rt.block_on(async { db.auto_migrate(&cx, &schemas).await });
    assert!(matches!(outcome, Outcome::Ok(())));

    let tables: Vec<String> = server.ddl_requests()[0]
        .iter()
        .filter(|s| s.starts_with("CREATE TABLE"))
        .cloned()
        .collect();
    assert!(tables[0].starts_with("CREATE TABLE `singers`"));
    assert!(tables[1].starts_with("CREATE TABLE `tests`"));
    assert!(tables[2].starts_with("CREATE TABLE `albums`"));
}

#[test]
fn migrating_an_unchanged_model_sends_no_ddl() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let server = MockServer::new();
    let db = open_db(&server);

    rt.block_on(async {
        let first = db.auto_migrate(&cx, &all_schemas()).await;
        assert!(matches!(first, Outcome::Ok(())));
        assert_eq!(server.ddl_requests().len(), 1);

        server.put_result(COLUMN_TYPES_SQL, unchanged_singer_columns());
        let second = db.auto_migrate(&cx, &[Singer::schema()]).await;
        assert!(matches!(second, Outcome::Ok(())), "{:?}", second);
    });

    assert_eq!(server.ddl_requests().len(), 1);
}

#[test]
fn changed_and_missing_columns_are_migrated() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let server = MockServer::new();
    let db = open_db(&server);

    let mut columns = unchanged_singer_columns();
    columns.pop();
    columns[5] = column_row("last_name", None, "INT64", None);

    rt.block_on(async {
        let first = db.auto_migrate(&cx, &[Singer::schema()]).await;
        assert!(matches!(first, Outcome::Ok(())));

        server.put_result(COLUMN_TYPES_SQL, columns);
        let second = db.auto_migrate(&cx, &[Singer::schema()]).await;
        assert!(matches!(second, Outcome::Ok(())), "{:?}", second);
    });

    let requests = server.ddl_requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[1],
        vec![
            "ALTER TABLE `singers` ALTER COLUMN `last_name` STRING(MAX)".to_string(),
            "ALTER TABLE `singers` ADD COLUMN `active` BOOL".to_string(),
        ]
    );
}

#[test]
fn generated_columns_are_never_altered() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let server = MockServer::new();
    let db = open_db(&server);

    let mut columns = unchanged_singer_columns();
    columns.pop();
    columns[6] = column_row("full_name", None, "INT64", None);

    rt.block_on(async {
        let first = db.auto_migrate(&cx, &[Singer::schema()]).await;
        assert!(matches!(first, Outcome::Ok(())));

        server.put_result(COLUMN_TYPES_SQL, columns);
        server.put_result(IS_GENERATED_SQL, vec![count_row(1)]);
        let second = db.auto_migrate(&cx, &[Singer::schema()]).await;
        assert!(matches!(second, Outcome::Ok(())), "{:?}", second);
    });

    let requests = server.ddl_requests();
    assert_eq!(
        requests[1],
        vec!["ALTER TABLE `singers` ADD COLUMN `active` BOOL".to_string()]
    );
    assert!(!server.executed_sql().iter().any(|s| s.contains("ALTER COLUMN")));
    let generated_checks: Vec<Vec<Value>> = server
        .state()
        .queried
        .iter()
        .filter(|(sql, _)| sql == IS_GENERATED_SQL)
        .map(|(_, params)| params.clone())
        .collect();
    assert_eq!(generated_checks.len(), 1);
    assert!(generated_checks[0].contains(&Value::from("full_name")));
}

#[test]
fn missing_foreign_keys_and_indexes_are_added() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let server = MockServer::new();
    server.state().tables.insert("albums".to_string());
    server.put_result(
        COLUMN_TYPES_SQL,
        vec![
            column_row(
                "id",
                Some("GET_NEXT_SEQUENCE_VALUE(Sequence albums_seq)"),
                "INT64",
                None,
            ),
            column_row("created_at", None, "TIMESTAMP", None),
            column_row("updated_at", None, "TIMESTAMP", None),
            column_row("deleted_at", None, "TIMESTAMP", None),
            column_row("title", None, "STRING", None),
            column_row("rating", None, "FLOAT32", None),
            column_row("singer_id", None, "INT64", None),
        ],
    );
    let db = open_db(&server);

    let outcome = rt.block_on(async { db.auto_migrate(&cx, &[Album::schema()]).await });
    assert!(matches!(outcome, Outcome::Ok(())), "{:?}", outcome);

    assert_eq!(
        server.ddl_requests(),
        vec![vec![
            "ALTER TABLE `albums` ADD CONSTRAINT `fk_albums_singer` FOREIGN KEY (`singer_id`) REFERENCES `singers`(`id`)"
                .to_string(),
            "CREATE INDEX `idx_albums_deleted_at` ON `albums`(`deleted_at`)".to_string(),
        ]]
    );
}

#[test]
fn dry_run_returns_statements_without_applying_them() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let server = MockServer::new();
    let db = open_db(&server);

    let outcome = rt.block_on(async { db.auto_migrate_dry_run(&cx, &[Singer::schema()]).await });
    let Outcome::Ok(statements) = outcome else {
        panic!("dry run failed: {:?}", outcome);
    };
    let sql: Vec<&str> = statements.iter().map(|s| s.sql.as_str()).collect();
    assert_eq!(sql, vec![SINGERS_SEQ, SINGERS_TABLE, SINGERS_INDEX]);

    assert!(server.ddl_requests().is_empty());
    assert!(server.state().tables.is_empty());
    let executed = server.executed_sql();
    assert_eq!(executed.last().map(String::as_str), Some("ABORT BATCH"));
    assert!(!executed.iter().any(|s| s == "RUN BATCH"));

    let json = serde_json::to_string(&statements[2]).expect("serialize statement");
    assert!(json.contains("idx_singers_deleted_at"));
}

#[test]
fn dry_run_needs_a_spanner_connection() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let server = MockServer::new();
    let conn = PlainConnection(server.connection());
    let migrator = SpannerMigrator::new(&conn, MigratorOptions::default());

    let outcome = rt.block_on(async { migrator.auto_migrate_dry_run(&cx, &[Singer::schema()]).await });
    match outcome {
        Outcome::Err(Error::Connection(e)) => {
            assert_eq!(e.kind, ConnectionErrorKind::Capability);
            assert_eq!(e.message, DRY_RUN_UNSUPPORTED);
        }
        other => panic!("expected capability error, got {:?}", other),
    }
    assert_eq!(
        server.executed_sql().last().map(String::as_str),
        Some("ABORT BATCH")
    );
    assert!(server.ddl_requests().is_empty());
}

#[test]
fn unique_constraints_abort_the_batch() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let server = MockServer::new();
    let db = open_db(&server);
    let outcome =
        rt.block_on(async { db.auto_migrate(&cx, &[Singer::schema(), users_schema()]).await });
    match outcome {
        Outcome::Err(e) => assert_eq!(e.to_string(), UNIQUE_CONSTRAINTS_UNSUPPORTED),
        other => panic!("expected unique constraint error, got {:?}", other),
    }
    assert!(server.ddl_requests().is_empty());
    let executed = server.executed_sql();
    assert_eq!(executed.first().map(String::as_str), Some("START BATCH DDL"));
    assert_eq!(executed.last().map(String::as_str), Some("ABORT BATCH"));
}

fn users_schema() -> TableSchema {
    TableSchema::new(
        "users",
        vec![
            FieldInfo::new("id", "id", DataType::Int).primary_key(true),
            FieldInfo::new("email", "email", DataType::String).unique(true),
        ],
    )
}

#[test]
fn unique_constraints_are_rejected_on_every_attempt() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let server = MockServer::new();
    let db = open_db(&server);

    rt.block_on(async {
        for _ in 0..2 {
            match db.auto_migrate(&cx, &[users_schema()]).await {
                Outcome::Err(e) => assert_eq!(e.to_string(), UNIQUE_CONSTRAINTS_UNSUPPORTED),
                other => panic!("expected unique constraint error, got {:?}", other),
            }
        }
    });

    assert!(server.ddl_requests().is_empty());
    let aborts = server
        .executed_sql()
        .iter()
        .filter(|s| s.as_str() == "ABORT BATCH")
        .count();
    assert_eq!(aborts, 2);
}

#[test]
fn unique_constraints_cannot_be_created_or_dropped() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let server = MockServer::new();
    let conn = server.connection();
    let migrator = SpannerMigrator::new(&conn, MigratorOptions::default());
    let users = users_schema();

    rt.block_on(async {
        for name in ["uni_users_email", "email"] {
            match migrator.create_constraint(&cx, &users, name).await {
                Outcome::Err(e) => assert_eq!(e.to_string(), UNIQUE_CONSTRAINTS_UNSUPPORTED),
                other => panic!("expected unique constraint error, got {:?}", other),
            }
            match migrator.drop_constraint(&cx, &users, name).await {
                Outcome::Err(e) => assert_eq!(e.to_string(), UNIQUE_CONSTRAINTS_UNSUPPORTED),
                other => panic!("expected unique constraint error, got {:?}", other),
            }
        }
    });

    assert!(server.executed_sql().is_empty());
}

#[test]
fn cancelled_migration_aborts_the_batch() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let server = MockServer::new();
    server.cancel_on(SINGERS_INDEX);
    let db = open_db(&server);

    let outcome = rt.block_on(async { db.auto_migrate(&cx, &all_schemas()).await });
    assert!(matches!(outcome, Outcome::Cancelled(_)), "{:?}", outcome);

    assert!(server.ddl_requests().is_empty());
    assert!(server.state().batch.is_none());
    let executed = server.executed_sql();
    assert_eq!(executed.last().map(String::as_str), Some("ABORT BATCH"));
    assert!(!executed.iter().any(|s| s == "RUN BATCH"));
    assert!(!executed.iter().any(|s| s.contains("`albums`")));
}

#[test]
fn batching_can_be_disabled() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let server = MockServer::new();
    let config = SpannerConfig::<MockDriver>::new()
        .pool(server.pool())
        .disable_auto_migrate_batching(true);
    let db = SpannerDb::open(config, &MockDriver::default()).expect("open db");

    let outcome = rt.block_on(async { db.auto_migrate(&cx, &[Singer::schema()]).await });
    assert!(matches!(outcome, Outcome::Ok(())));

    assert_eq!(
        server.ddl_requests(),
        vec![
            vec![SINGERS_SEQ.to_string()],
            vec![SINGERS_TABLE.to_string()],
            vec![SINGERS_INDEX.to_string()],
        ]
    );
    assert!(!server.executed_sql().iter().any(|s| s == "START BATCH DDL"));
}

#[test]
fn disabled_sequence_kind_skips_sequences() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let server = MockServer::new();
    let config = SpannerConfig::<MockDriver>::new()
        .pool(server.pool())
        .default_sequence_kind("disabled");
    let db = SpannerDb::open(config, &MockDriver::default()).expect("open db");

    let outcome = rt.block_on(async { db.auto_migrate(&cx, &[Singer::schema()]).await });
    assert!(matches!(outcome, Outcome::Ok(())));

    let requests = server.ddl_requests();
    assert_eq!(requests[0].len(), 2);
    assert!(requests[0][0].starts_with("CREATE TABLE `singers` (`id` INT64,`created_at` TIMESTAMP"));
}

#[test]
fn custom_sequence_kind_is_used() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let server = MockServer::new();
    let config = SpannerConfig::<MockDriver>::new()
        .pool(server.pool())
        .default_sequence_kind("bit_reversed_signed");
    let db = SpannerDb::open(config, &MockDriver::default()).expect("open db");

    let outcome = rt.block_on(async { db.auto_migrate(&cx, &[Singer::schema()]).await });
    assert!(matches!(outcome, Outcome::Ok(())));
    assert_eq!(
        server.ddl_requests()[0][0],
        r#"CREATE SEQUENCE IF NOT EXISTS singers_seq OPTIONS (sequence_kind = "bit_reversed_signed")"#
    );
}

#[test]
fn drop_table_drops_dependents_first() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    let server = MockServer::new();
    let db = open_db(&server);

    rt.block_on(async {
        let Outcome::Ok(session) = db.session(&cx).await else {
            panic!("acquire session");
        };
        let outcome = session.migrator().drop_table(&cx, &all_schemas()).await;
        assert!(matches!(outcome, Outcome::Ok(())));
    });

    assert_eq!(
        server.ddl_requests(),
        vec![
            vec!["DROP TABLE `tests`".to_string()],
            vec!["DROP TABLE `albums`".to_string()],
            vec!["DROP TABLE `singers`".to_string()],
        ]
    );
}
