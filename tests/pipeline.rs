//! End-to-end exports from SQLite into a filesystem store.

use std::sync::Arc;

use chiv::error::{ExportErrorKind, Stage};
use chiv::export::{Archiver, ExportOption, FormatKind};
use chiv::source::SqliteExecutor;
use chiv::upload::FsUploader;
use tempfile::TempDir;

async fn executor() -> SqliteExecutor {
    let executor = SqliteExecutor::connect("sqlite::memory:", 1).await.unwrap();
    sqlx::query(
        "CREATE TABLE base_case (first_column INTEGER, second_column TEXT, third_column FLOAT)",
    )
    .execute(executor.pool())
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO base_case VALUES (1, 'first_row', 100), (2, 'second_row', 12.12), (3, 'third_row', 42.42)",
    )
    .execute(executor.pool())
    .await
    .unwrap();
    sqlx::query("CREATE TABLE sparse (id INTEGER, note TEXT)")
        .execute(executor.pool())
        .await
        .unwrap();
    sqlx::query("INSERT INTO sparse VALUES (1, NULL), (2, 'kept')")
        .execute(executor.pool())
        .await
        .unwrap();
    executor
}

async fn archiver(store: &TempDir) -> Archiver {
    Archiver::new(
        Arc::new(executor().await),
        Arc::new(FsUploader::new(store.path())),
    )
}

fn read(store: &TempDir, bucket: &str, key: &str) -> String {
    std::fs::read_to_string(store.path().join(bucket).join(key)).unwrap()
}

#[tokio::test]
async fn test_json_export_of_base_case() {
    let store = TempDir::new().unwrap();
    let archiver = archiver(&store)
        .await
        .configure(&[ExportOption::format(FormatKind::Json)]);

    let summary = archiver.export("base_case", "archive", &[]).await.unwrap();

    assert_eq!(summary.key, "base_case.json");
    assert_eq!(summary.records, 3);
    let stored = read(&store, "archive", "base_case.json");
    assert_eq!(summary.bytes, stored.len() as u64);
    assert_eq!(
        stored,
        r#"[{"first_column":1,"second_column":"first_row","third_column":100},{"first_column":2,"second_column":"second_row","third_column":12.12},{"first_column":3,"second_column":"third_row","third_column":42.42}]"#
    );
}

#[tokio::test]
async fn test_csv_export_with_columns_and_null() {
    let store = TempDir::new().unwrap();
    let archiver = archiver(&store).await;

    let summary = archiver
        .export(
            "sparse",
            "archive",
            &[
                ExportOption::columns(["note", "id"]),
                ExportOption::null("custom_null"),
            ],
        )
        .await
        .unwrap();

    assert_eq!(summary.key, "sparse.csv");
    let stored = read(&store, "archive", "sparse.csv");
    let mut lines = stored.lines();
    assert_eq!(lines.next(), Some("note,id"));
    let mut rows: Vec<&str> = lines.collect();
    rows.sort();
    assert_eq!(rows, vec!["custom_null,1", "kept,2"]);
}

#[tokio::test]
async fn test_yaml_export_parses_as_list() {
    let store = TempDir::new().unwrap();
    let archiver = archiver(&store).await;

    let summary = archiver
        .export(
            "base_case",
            "archive",
            &[
                ExportOption::format(FormatKind::Yaml),
                ExportOption::key("daily/base.yaml"),
            ],
        )
        .await
        .unwrap();
    assert_eq!(summary.key, "daily/base.yaml");

    let stored = read(&store, "archive", "daily/base.yaml");
    let records: Vec<serde_yaml::Mapping> = serde_yaml::from_str(&stored).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(
        records[1]["second_column"],
        serde_yaml::Value::from("second_row")
    );
}

#[tokio::test]
async fn test_empty_result_still_has_framing() {
    let store = TempDir::new().unwrap();
    let executor = executor().await;
    sqlx::query("CREATE TABLE empty (id INTEGER, name TEXT)")
        .execute(executor.pool())
        .await
        .unwrap();
    let archiver = Archiver::new(Arc::new(executor), Arc::new(FsUploader::new(store.path())));

    archiver.export("empty", "archive", &[]).await.unwrap();
    archiver
        .export("empty", "archive", &[ExportOption::format(FormatKind::Json)])
        .await
        .unwrap();

    assert_eq!(read(&store, "archive", "empty.csv"), "id,name\n");
    assert_eq!(read(&store, "archive", "empty.json"), "[]");
}

#[tokio::test]
async fn test_missing_table_fails_while_querying() {
    let store = TempDir::new().unwrap();
    let archiver = archiver(&store).await;

    let err = archiver
        .export("does_not_exist", "archive", &[])
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Stage::Querying);
    assert!(matches!(err.kind(), ExportErrorKind::Source(_)));
    assert!(!store.path().join("archive").join("does_not_exist.csv").exists());
}
