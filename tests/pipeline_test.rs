mod common;

use common::{build_pipeline, generate_payments, read_output, test_config, write_payments};
use payflow::application::audit::AuditTrail;
use payflow::config::AckMode;
use payflow::domain::files::Folder;
use payflow::domain::ports::Repository;
use payflow::error::PipelineError;
use payflow::infrastructure::mock_provider::MockPaymentProvider;
use tempfile::tempdir;

#[tokio::test]
async fn test_single_file_end_to_end() {
    let dir = tempdir().unwrap();
    let input = write_payments(
        &dir.path().join("payments.csv"),
        &[("1", "Alice", "10.00"), ("2", "Bob", "20.00")],
    )
    .unwrap();

    let pipeline = build_pipeline(test_config(), MockPaymentProvider::new(), None);
    let reports = pipeline.run(Folder::new(dir.path())).await.unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].input, input);
    assert_eq!(reports[0].summary.records_written, 2);
    assert_eq!(reports[0].failed, 0);

    let rows = read_output(&dir.path().join("payments.csv.out"));
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "1");
    assert_eq!(&rows[0][1], "Alice");
    assert_eq!(&rows[0][2], "10.00");
    assert_eq!(&rows[0][3], "EUR");
    assert_eq!(&rows[0][5], "2000");
    assert_eq!(&rows[0][7], "1.01");
    assert_eq!(&rows[1][0], "2");
    assert_ne!(&rows[0][4], &rows[1][4]);
}

#[tokio::test]
async fn test_empty_folder_produces_no_reports() {
    let dir = tempdir().unwrap();
    let pipeline = build_pipeline(test_config(), MockPaymentProvider::new(), None);
    let reports = pipeline.run(Folder::new(dir.path())).await.unwrap();
    assert!(reports.is_empty());
}

#[tokio::test]
async fn test_missing_folder_is_an_error() {
    let dir = tempdir().unwrap();
    let pipeline = build_pipeline(test_config(), MockPaymentProvider::new(), None);
    let err = pipeline
        .run(Folder::new(dir.path().join("nope")))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Remote(_)));
}

#[tokio::test]
async fn test_files_are_processed_in_name_order() {
    let dir = tempdir().unwrap();
    generate_payments(&dir.path().join("b.csv"), 3).unwrap();
    generate_payments(&dir.path().join("a.csv"), 2).unwrap();
    std::fs::write(dir.path().join("notes.txt"), "not a payment file").unwrap();

    let pipeline = build_pipeline(test_config(), MockPaymentProvider::new(), None);
    let reports = pipeline.run(Folder::new(dir.path())).await.unwrap();

    let names: Vec<_> = reports
        .iter()
        .map(|r| r.input.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.csv", "b.csv"]);
    assert_eq!(reports[0].summary.records_written, 2);
    assert_eq!(reports[1].summary.records_written, 3);
}

#[tokio::test]
async fn test_output_preserves_input_order_under_concurrency() {
    let dir = tempdir().unwrap();
    generate_payments(&dir.path().join("many.csv"), 50).unwrap();

    let mut config = test_config();
    config.pipeline.max_in_flight = 8;
    config.pipeline.channel_capacity = 4;
    config.pipeline.batch_size = 7;
    let pipeline = build_pipeline(config, MockPaymentProvider::new(), None);
    pipeline.run(Folder::new(dir.path())).await.unwrap();

    let ids: Vec<String> = read_output(&dir.path().join("many.csv.out"))
        .iter()
        .map(|row| row[0].to_string())
        .collect();
    let expected: Vec<String> = (1..=50).map(|i| i.to_string()).collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn test_receive_mode_matches_poll_mode() {
    let dir = tempdir().unwrap();
    write_payments(
        &dir.path().join("pushed.csv"),
        &[("1", "Alice", "10.00"), ("2", "Bob", "1,000.50")],
    )
    .unwrap();

    let mut config = test_config();
    config.pipeline.ack_mode = AckMode::Receive;
    let pipeline = build_pipeline(config, MockPaymentProvider::new(), None);
    let reports = pipeline.run(Folder::new(dir.path())).await.unwrap();
    assert_eq!(reports[0].summary.records_written, 2);

    let rows = read_output(&dir.path().join("pushed.csv.out"));
    assert_eq!(&rows[1][2], "1000.50");
    assert!(rows.iter().all(|row| &row[5] == "2000"));
}

#[tokio::test]
async fn test_declined_payment_is_written_with_failure_status() {
    let dir = tempdir().unwrap();
    write_payments(
        &dir.path().join("mixed.csv"),
        &[("1", "Alice", "10.00"), ("2", "Mallory", "20.00")],
    )
    .unwrap();

    let provider = MockPaymentProvider::new().decline("Mallory");
    let pipeline = build_pipeline(test_config(), provider, None);
    let reports = pipeline.run(Folder::new(dir.path())).await.unwrap();
    assert_eq!(reports[0].failed, 0);

    let rows = read_output(&dir.path().join("mixed.csv.out"));
    assert_eq!(&rows[0][5], "2000");
    assert_eq!(&rows[1][5], "4000");
}

#[tokio::test]
async fn test_refused_payment_is_counted_and_skipped() {
    let dir = tempdir().unwrap();
    write_payments(
        &dir.path().join("refused.csv"),
        &[("1", "Alice", "10.00"), ("2", "Eve", "20.00"), ("3", "Bob", "30.00")],
    )
    .unwrap();

    let provider = MockPaymentProvider::new().refuse("Eve");
    let pipeline = build_pipeline(test_config(), provider, None);
    let reports = pipeline.run(Folder::new(dir.path())).await.unwrap();
    assert_eq!(reports[0].summary.records_written, 2);
    assert_eq!(reports[0].failed, 1);

    let ids: Vec<_> = read_output(&dir.path().join("refused.csv.out"))
        .iter()
        .map(|row| row[0].to_string())
        .collect();
    assert_eq!(ids, vec!["1", "3"]);
}

#[tokio::test]
async fn test_invalid_row_is_counted_as_failed() {
    let dir = tempdir().unwrap();
    write_payments(
        &dir.path().join("bad.csv"),
        &[("1", "Alice", "10.00"), ("2", "Bob", "-5.00")],
    )
    .unwrap();

    let pipeline = build_pipeline(test_config(), MockPaymentProvider::new(), None);
    let reports = pipeline.run(Folder::new(dir.path())).await.unwrap();
    assert_eq!(reports[0].summary.records_written, 1);
    assert_eq!(reports[0].failed, 1);
}

#[tokio::test]
async fn test_throttled_provider_is_retried() {
    let dir = tempdir().unwrap();
    generate_payments(&dir.path().join("busy.csv"), 5).unwrap();

    let mut config = test_config();
    config.retry.limit = 50;
    config.retry.wait_ms = 20;
    config.retry.max_backoff_ms = 50;
    let provider = MockPaymentProvider::new().with_rate_limit(200);
    let pipeline = build_pipeline(config, provider, None);
    let reports = pipeline.run(Folder::new(dir.path())).await.unwrap();
    assert_eq!(reports[0].summary.records_written, 5);
    assert_eq!(reports[0].failed, 0);
}

#[tokio::test]
async fn test_audit_trail_records_every_stage() {
    let dir = tempdir().unwrap();
    write_payments(&dir.path().join("audit.csv"), &[("1", "Alice", "10.00")]).unwrap();

    let audit = AuditTrail::in_memory();
    let pipeline = build_pipeline(test_config(), MockPaymentProvider::new(), Some(&audit));
    let reports = pipeline.run(Folder::new(dir.path())).await.unwrap();

    let summary = &reports[0].summary;
    let stored = audit.output_files.find_by_id(summary.id).await.unwrap();
    assert_eq!(stored.as_ref(), Some(summary));
}
