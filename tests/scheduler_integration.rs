//! Integration tests for the download scheduler.
//!
//! These tests run `DownloadScheduler::run_batch` against a mock HTTP server
//! and a temporary mirror folder.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use listing_mirror::download::{DownloadBatch, DownloadScheduler, HttpClient, RetryPolicy};
use listing_mirror::failure::FailureLog;
use listing_mirror::stats::RunStats;
use listing_mirror::CrawlError;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Respond, ResponseTemplate};

struct Harness {
    scheduler: DownloadScheduler,
    failures: FailureLog,
    stats: Arc<RunStats>,
}

fn harness(max_concurrency: usize, retry_policy: RetryPolicy) -> Harness {
    let failures = FailureLog::new();
    let stats = Arc::new(RunStats::new());
    let scheduler = DownloadScheduler::new(
        max_concurrency,
        retry_policy,
        HttpClient::new(),
        failures.clone(),
        Arc::clone(&stats),
    );
    Harness {
        scheduler,
        failures,
        stats,
    }
}

/// Ten retries with a short pause, so exhausting the budget stays fast.
fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(10, Duration::from_millis(10))
}

// ==================== Skip-if-exists Tests ====================

#[tokio::test]
async fn test_existing_non_empty_file_is_skipped_without_request()
-> Result<(), Box<dyn std::error::Error>> {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("remote"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mirror = TempDir::new()?;
    let target = mirror.path().join("Art").join("cover.jpg");
    std::fs::create_dir_all(target.parent().ok_or("no parent")?)?;
    std::fs::write(&target, "local")?;

    let mut batch = DownloadBatch::new();
    batch.insert(format!("{}/Art/cover.jpg", mock_server.uri()), &target);

    let h = harness(2, RetryPolicy::no_retry());
    h.scheduler.run_batch(batch, &CancellationToken::new()).await?;

    assert_eq!(std::fs::read_to_string(&target)?, "local");
    assert_eq!(h.stats.snapshot().skipped, 1);
    assert_eq!(h.stats.snapshot().downloaded, 0);
    Ok(())
}

#[tokio::test]
async fn test_empty_file_is_downloaded_again() -> Result<(), Box<dyn std::error::Error>> {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cover.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_string("jpeg"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mirror = TempDir::new()?;
    let target = mirror.path().join("cover.jpg");
    std::fs::write(&target, "")?;

    let mut batch = DownloadBatch::new();
    batch.insert(format!("{}/cover.jpg", mock_server.uri()), &target);

    let h = harness(2, RetryPolicy::no_retry());
    h.scheduler.run_batch(batch, &CancellationToken::new()).await?;

    assert_eq!(std::fs::read_to_string(&target)?, "jpeg");
    assert_eq!(h.stats.snapshot().downloaded, 1);
    Ok(())
}

#[tokio::test]
async fn test_truncated_file_is_treated_as_complete() -> Result<(), Box<dyn std::error::Error>> {
    // Only emptiness is checked; a short file from an interrupted run is kept as is.
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; 4096]))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mirror = TempDir::new()?;
    let target = mirror.path().join("archive.zip");
    std::fs::write(&target, b"PK\x03")?;

    let mut batch = DownloadBatch::new();
    batch.insert(format!("{}/archive.zip", mock_server.uri()), &target);

    let h = harness(1, RetryPolicy::no_retry());
    h.scheduler.run_batch(batch, &CancellationToken::new()).await?;

    assert_eq!(std::fs::metadata(&target)?.len(), 3);
    assert_eq!(h.stats.snapshot().skipped, 1);
    Ok(())
}

// ==================== Concurrency Limit Tests ====================

/// Responder that tracks peak concurrent requests using atomic counters.
///
/// wiremock's `Respond` is synchronous and runs on the mock server's own
/// threads, so a blocking sleep keeps requests overlapping without stalling
/// the test runtime.
struct ConcurrencyTrackingResponder {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    delay_ms: u64,
}

impl Respond for ConcurrencyTrackingResponder {
    fn respond(&self, _request: &wiremock::Request) -> ResponseTemplate {
        let current_count = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current_count, Ordering::SeqCst);

        std::thread::sleep(Duration::from_millis(self.delay_ms));

        self.current.fetch_sub(1, Ordering::SeqCst);
        ResponseTemplate::new(200).set_body_bytes(b"content".to_vec())
    }
}

#[tokio::test]
async fn test_semaphore_limits_concurrent_downloads() -> Result<(), Box<dyn std::error::Error>> {
    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ConcurrencyTrackingResponder {
            current: Arc::clone(&current),
            peak: Arc::clone(&peak),
            delay_ms: 100,
        })
        .mount(&mock_server)
        .await;

    let mirror = TempDir::new()?;
    let mut batch = DownloadBatch::new();
    for i in 0..10 {
        batch.insert(
            format!("{}/file{i}.txt", mock_server.uri()),
            mirror.path().join(format!("file{i}.txt")),
        );
    }

    let h = harness(3, RetryPolicy::no_retry());
    h.scheduler.run_batch(batch, &CancellationToken::new()).await?;

    assert_eq!(h.stats.snapshot().downloaded, 10);
    for i in 0..10 {
        assert_eq!(
            std::fs::read(mirror.path().join(format!("file{i}.txt")))?,
            b"content"
        );
    }

    let observed_peak = peak.load(Ordering::SeqCst);
    assert!(
        observed_peak <= 3,
        "Peak concurrency {observed_peak} should not exceed semaphore limit of 3"
    );
    Ok(())
}

// ==================== Retry Tests ====================

#[tokio::test]
async fn test_retry_succeeds_after_transient_failure() -> Result<(), Box<dyn std::error::Error>> {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("finally"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mirror = TempDir::new()?;
    let target = mirror.path().join("flaky.txt");
    let mut batch = DownloadBatch::new();
    batch.insert(format!("{}/flaky.txt", mock_server.uri()), &target);

    let h = harness(1, fast_retry());
    h.scheduler.run_batch(batch, &CancellationToken::new()).await?;

    assert_eq!(std::fs::read_to_string(&target)?, "finally");
    let stats = h.stats.snapshot();
    assert_eq!(stats.retried, 2);
    assert_eq!(stats.downloaded, 1);

    let last = h.failures.last().ok_or("failure not recorded")?;
    assert_eq!(last.attempt, 2);
    Ok(())
}

#[tokio::test]
async fn test_retry_budget_is_eleven_attempts_then_fatal()
-> Result<(), Box<dyn std::error::Error>> {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken.pdf"))
        .respond_with(ResponseTemplate::new(500))
        .expect(11)
        .mount(&mock_server)
        .await;

    let mirror = TempDir::new()?;
    let target = mirror.path().join("broken.pdf");
    let url = format!("{}/broken.pdf", mock_server.uri());
    let mut batch = DownloadBatch::new();
    batch.insert(&url, &target);

    let h = harness(1, fast_retry());
    let result = h.scheduler.run_batch(batch, &CancellationToken::new()).await;

    match result {
        Err(CrawlError::Download {
            url: failed_url,
            path,
            attempts,
            ..
        }) => {
            assert_eq!(failed_url, url);
            assert_eq!(path, target);
            assert_eq!(attempts, 11);
        }
        other => panic!("expected Download error, got {other:?}"),
    }

    let last = h.failures.last().ok_or("failure not recorded")?;
    assert_eq!(last.attempt, 11);
    assert_eq!(last.url, url);
    assert!(last.chain[0].message.contains("500"));
    assert_eq!(h.stats.snapshot().retried, 10);
    Ok(())
}

#[tokio::test]
async fn test_fatal_failure_stops_launching_new_tasks() -> Result<(), Box<dyn std::error::Error>> {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bad.bin"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/good.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mirror = TempDir::new()?;
    let mut batch = DownloadBatch::new();
    batch.insert(
        format!("{}/bad.bin", mock_server.uri()),
        mirror.path().join("bad.bin"),
    );
    batch.insert(
        format!("{}/good.bin", mock_server.uri()),
        mirror.path().join("good.bin"),
    );

    let root = CancellationToken::new();
    let h = harness(1, RetryPolicy::no_retry());
    let result = h.scheduler.run_batch(batch, &root).await;

    assert!(matches!(result, Err(CrawlError::Download { attempts: 1, .. })));
    assert!(!mirror.path().join("good.bin").exists());
    assert!(!root.is_cancelled(), "batch failure must not cancel the run token");
    Ok(())
}
