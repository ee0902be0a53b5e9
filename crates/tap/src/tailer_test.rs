//! Tests for the record source follower

use super::*;
use std::fs::OpenOptions;
use std::io::Write;

use tempfile::NamedTempFile;

const WAIT: Duration = Duration::from_secs(5);

fn config(start_at: StartAt, on_malformed: MalformedPolicy) -> TailerConfig {
    TailerConfig {
        start_at,
        poll_interval: Duration::from_millis(10),
        max_read_retries: 3,
        retry_delay: Duration::from_millis(10),
        on_malformed,
    }
}

fn append(path: &Path, text: &str) {
    append_bytes(path, text.as_bytes());
}

fn append_bytes(path: &Path, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
}

async fn next(tailer: &mut Tailer) -> Record {
    tokio::time::timeout(WAIT, tailer.next_record())
        .await
        .expect("timed out waiting for record")
        .expect("tailer failed")
}

fn seq(record: &Record) -> u64 {
    record.value()["seq"].as_u64().unwrap()
}

// ============================================================================
// Opening
// ============================================================================

#[tokio::test]
async fn test_open_missing_source_is_unavailable() {
    let result = Tailer::open("/no/such/dir/messages.json", TailerConfig::default()).await;
    assert!(matches!(result, Err(TapError::SourceUnavailable { .. })));
    assert!(result.unwrap_err().is_fatal());
}

#[tokio::test]
async fn test_start_at_beginning_reads_existing_lines() {
    let file = NamedTempFile::new().unwrap();
    append(file.path(), "{\"seq\":1}\n{\"seq\":2}\n");

    let mut tailer = Tailer::open(file.path(), config(StartAt::Beginning, MalformedPolicy::Skip))
        .await
        .unwrap();

    assert_eq!(seq(&next(&mut tailer).await), 1);
    assert_eq!(seq(&next(&mut tailer).await), 2);
}

#[tokio::test]
async fn test_start_at_end_skips_backlog() {
    let file = NamedTempFile::new().unwrap();
    append(file.path(), "{\"seq\":1}\n{\"seq\":2}\n");

    let mut tailer = Tailer::open(file.path(), config(StartAt::End, MalformedPolicy::Skip))
        .await
        .unwrap();
    assert_eq!(tailer.position(), 20);

    append(file.path(), "{\"seq\":3}\n");
    assert_eq!(seq(&next(&mut tailer).await), 3);
}

#[tokio::test]
async fn test_start_at_end_discards_half_written_line() {
    let file = NamedTempFile::new().unwrap();
    append(file.path(), "{\"seq\":1}\n{\"se");

    let mut tailer = Tailer::open(file.path(), config(StartAt::End, MalformedPolicy::Fatal))
        .await
        .unwrap();

    append(file.path(), "q\":2}\n{\"seq\":3}\n");
    assert_eq!(seq(&next(&mut tailer).await), 3);
}

// ============================================================================
// Following
// ============================================================================

#[tokio::test]
async fn test_waits_for_appended_lines() {
    let file = NamedTempFile::new().unwrap();
    let mut tailer = Tailer::open(file.path(), config(StartAt::End, MalformedPolicy::Skip))
        .await
        .unwrap();

    let path = file.path().to_path_buf();
    let writer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        append(&path, "{\"seq\":7}\n");
    });

    assert_eq!(seq(&next(&mut tailer).await), 7);
    writer.await.unwrap();
}

#[tokio::test]
async fn test_partial_line_is_held_until_complete() {
    let file = NamedTempFile::new().unwrap();
    let mut tailer = Tailer::open(file.path(), config(StartAt::End, MalformedPolicy::Fatal))
        .await
        .unwrap();

    append(file.path(), "{\"seq\":");
    let pending = tokio::time::timeout(Duration::from_millis(100), tailer.next_record()).await;
    assert!(pending.is_err(), "partial line must not be emitted");

    append(file.path(), "5}\n");
    assert_eq!(seq(&next(&mut tailer).await), 5);
}

#[tokio::test]
async fn test_blank_lines_are_ignored() {
    let file = NamedTempFile::new().unwrap();
    append(file.path(), "\n  \r\n{\"seq\":1}\r\n\n{\"seq\":2}\n");

    let mut tailer = Tailer::open(file.path(), config(StartAt::Beginning, MalformedPolicy::Fatal))
        .await
        .unwrap();

    assert_eq!(seq(&next(&mut tailer).await), 1);
    assert_eq!(seq(&next(&mut tailer).await), 2);
    assert_eq!(tailer.report().skipped, 0);
}

#[tokio::test]
async fn test_truncation_restarts_from_beginning() {
    let file = NamedTempFile::new().unwrap();
    append(file.path(), "{\"seq\":1}\n{\"seq\":2}\n");

    let mut tailer = Tailer::open(file.path(), config(StartAt::Beginning, MalformedPolicy::Skip))
        .await
        .unwrap();
    next(&mut tailer).await;
    next(&mut tailer).await;

    std::fs::write(file.path(), "{\"seq\":10}\n").unwrap();
    assert_eq!(seq(&next(&mut tailer).await), 10);
}

#[cfg(unix)]
#[tokio::test]
async fn test_replaced_file_is_reopened() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("messages.json");
    std::fs::write(&path, "{\"seq\":1}\n").unwrap();

    let mut tailer = Tailer::open(&path, config(StartAt::Beginning, MalformedPolicy::Skip))
        .await
        .unwrap();
    assert_eq!(seq(&next(&mut tailer).await), 1);

    // Rotate: new file with more content than the old one moved into place
    let rotated = dir.path().join("messages.json.new");
    std::fs::write(&rotated, "{\"seq\":100}\n{\"seq\":101}\n").unwrap();
    std::fs::rename(&rotated, &path).unwrap();

    assert_eq!(seq(&next(&mut tailer).await), 100);
    assert_eq!(seq(&next(&mut tailer).await), 101);
}

// ============================================================================
// Malformed lines
// ============================================================================

#[tokio::test]
async fn test_skip_policy_continues_past_malformed_line() {
    let file = NamedTempFile::new().unwrap();
    append(file.path(), "{\"seq\":1}\nnot json at all\n{\"seq\":2}\n");

    let mut tailer = Tailer::open(file.path(), config(StartAt::Beginning, MalformedPolicy::Skip))
        .await
        .unwrap();

    assert_eq!(seq(&next(&mut tailer).await), 1);
    assert_eq!(seq(&next(&mut tailer).await), 2);

    let report = tailer.report();
    assert_eq!(report.lines, 3);
    assert_eq!(report.skipped, 1);
}

#[tokio::test]
async fn test_fatal_policy_stops_at_malformed_line() {
    let file = NamedTempFile::new().unwrap();
    append(file.path(), "{\"seq\":1}\n{broken\n{\"seq\":2}\n");

    let mut tailer = Tailer::open(file.path(), config(StartAt::Beginning, MalformedPolicy::Fatal))
        .await
        .unwrap();

    assert_eq!(seq(&next(&mut tailer).await), 1);
    let err = tailer.next_record().await.unwrap_err();
    assert!(matches!(err, TapError::MalformedRecord { line: 2, .. }));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_fatal_policy_rejects_invalid_utf8() {
    let file = NamedTempFile::new().unwrap();
    append_bytes(file.path(), b"{\"seq\":1}\n{\"content\":\"bad \xff\xfe bytes\",\"seq\":2}\n");

    let mut tailer = Tailer::open(file.path(), config(StartAt::Beginning, MalformedPolicy::Fatal))
        .await
        .unwrap();

    assert_eq!(seq(&next(&mut tailer).await), 1);
    let err = tailer.next_record().await.unwrap_err();
    assert!(matches!(err, TapError::MalformedRecord { line: 2, .. }));
}

#[tokio::test]
async fn test_skip_policy_skips_invalid_utf8() {
    let file = NamedTempFile::new().unwrap();
    append_bytes(file.path(), b"{\"content\":\"\xc3\x28\",\"seq\":1}\n{\"seq\":2}\n");

    let mut tailer = Tailer::open(file.path(), config(StartAt::Beginning, MalformedPolicy::Skip))
        .await
        .unwrap();

    assert_eq!(seq(&next(&mut tailer).await), 2);
    assert_eq!(tailer.report().skipped, 1);
}

#[tokio::test]
async fn test_malformed_line_number_restarts_after_truncation() {
    let file = NamedTempFile::new().unwrap();
    append(file.path(), "{\"seq\":1}\n{\"seq\":2}\n{\"seq\":3}\n");

    let mut tailer = Tailer::open(file.path(), config(StartAt::Beginning, MalformedPolicy::Fatal))
        .await
        .unwrap();
    for _ in 0..3 {
        next(&mut tailer).await;
    }

    std::fs::write(file.path(), "{broken\n").unwrap();
    let err = tokio::time::timeout(WAIT, tailer.next_record())
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, TapError::MalformedRecord { line: 1, .. }));
    assert_eq!(tailer.report().lines, 4);
}

// ============================================================================
// Read failures
// ============================================================================

#[cfg(unix)]
#[tokio::test]
async fn test_read_failures_give_up_after_retry_budget() {
    // A directory opens fine but every read fails
    let dir = tempfile::tempdir().unwrap();

    let mut tailer = Tailer::open(dir.path(), config(StartAt::Beginning, MalformedPolicy::Skip))
        .await
        .unwrap();

    let err = tokio::time::timeout(WAIT, tailer.next_record())
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, TapError::SourceRead { attempts: 4, .. }));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_successful_read_resets_failure_count() {
    let file = NamedTempFile::new().unwrap();
    append(file.path(), "{\"seq\":1}\n");

    let mut tailer = Tailer::open(file.path(), config(StartAt::Beginning, MalformedPolicy::Skip))
        .await
        .unwrap();
    tailer.failures = 3;

    assert_eq!(seq(&next(&mut tailer).await), 1);
    assert_eq!(tailer.failures, 0);
}

// ============================================================================
// Run loop
// ============================================================================

#[tokio::test]
async fn test_run_publishes_in_order_until_shutdown() {
    let file = NamedTempFile::new().unwrap();
    let broker = Arc::new(Broker::new(16));
    let mut mailbox = broker.join();
    let shutdown = CancellationToken::new();

    let tailer = Tailer::open(file.path(), config(StartAt::End, MalformedPolicy::Skip))
        .await
        .unwrap();
    let task = tokio::spawn(tailer.run(Arc::clone(&broker), shutdown.clone()));

    append(file.path(), "{\"seq\":1}\n{\"seq\":2}\n{\"seq\":3}\n");
    for expected in 1..=3 {
        let record = tokio::time::timeout(WAIT, mailbox.take()).await.unwrap().unwrap();
        assert_eq!(seq(&record), expected);
    }

    shutdown.cancel();
    let report = tokio::time::timeout(WAIT, task).await.unwrap().unwrap().unwrap();
    assert_eq!(report.published, 3);
    assert_eq!(broker.stats().published, 3);
}

#[tokio::test]
async fn test_run_skip_policy_delivers_both_valid_records() {
    let file = NamedTempFile::new().unwrap();
    let broker = Arc::new(Broker::new(16));
    let mut mailbox = broker.join();
    let shutdown = CancellationToken::new();

    let tailer = Tailer::open(file.path(), config(StartAt::End, MalformedPolicy::Skip))
        .await
        .unwrap();
    let task = tokio::spawn(tailer.run(Arc::clone(&broker), shutdown.clone()));

    append(file.path(), "{\"seq\":1}\n<<garbage>>\n{\"seq\":2}\n");
    let first = tokio::time::timeout(WAIT, mailbox.take()).await.unwrap().unwrap();
    let second = tokio::time::timeout(WAIT, mailbox.take()).await.unwrap().unwrap();
    assert_eq!((seq(&first), seq(&second)), (1, 2));

    shutdown.cancel();
    let report = task.await.unwrap().unwrap();
    assert_eq!(report.skipped, 1);
}

#[tokio::test]
async fn test_run_fatal_policy_stops_delivery() {
    let file = NamedTempFile::new().unwrap();
    let broker = Arc::new(Broker::new(16));
    let mut mailbox = broker.join();

    let tailer = Tailer::open(file.path(), config(StartAt::End, MalformedPolicy::Fatal))
        .await
        .unwrap();
    let task = tokio::spawn(tailer.run(Arc::clone(&broker), CancellationToken::new()));

    append(file.path(), "{\"seq\":1}\n<<garbage>>\n{\"seq\":2}\n");

    let result = tokio::time::timeout(WAIT, task).await.unwrap().unwrap();
    assert!(matches!(result, Err(TapError::MalformedRecord { .. })));

    assert_eq!(seq(&mailbox.try_take().unwrap()), 1);
    assert!(mailbox.try_take().is_none());
    assert_eq!(broker.stats().published, 1);
}
