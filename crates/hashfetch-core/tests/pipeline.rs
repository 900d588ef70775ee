//! End-to-end pipeline runs against a scripted fetcher: success, retry bound,
//! mismatch handling, resume, concurrency bound and shutdown.

mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use common::scripted::{Script, ScriptedFetcher};
use hashfetch_core::checkpoint::{self, CheckpointRecord, ResumeKey};
use hashfetch_core::checksum::sha256_hex;
use hashfetch_core::config::{HashfetchConfig, RetryConfig};
use hashfetch_core::control::ShutdownSignal;
use hashfetch_core::fetch::FetchError;
use hashfetch_core::manifest::ManifestRecord;
use hashfetch_core::outcome::Outcome;
use hashfetch_core::scheduler::{run_with_config, RunSummary};
use tempfile::tempdir;

fn test_config(dir: &Path, batch_size: usize) -> HashfetchConfig {
    HashfetchConfig {
        output_dir: dir.join("image"),
        checkpoint_file: dir.join("completed.txt"),
        mismatch_file: dir.join("hash_different.txt"),
        failed_file: dir.join("failed.txt"),
        processed_file: Some(dir.join("processed.txt")),
        batch_size,
        timeout_secs: 5,
        retry: Some(RetryConfig {
            max_attempts: 3,
            backoff_secs: 0.0,
            ..RetryConfig::default()
        }),
        ..HashfetchConfig::default()
    }
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_default()
}

fn stored_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|rd| {
            rd.filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

async fn run(
    cfg: &HashfetchConfig,
    records: Vec<ManifestRecord>,
    fetcher: Arc<ScriptedFetcher>,
) -> RunSummary {
    run_with_config(cfg, records, fetcher, &ShutdownSignal::new(), None)
        .await
        .expect("run")
}

#[tokio::test]
async fn matching_content_is_stored_and_checkpointed() {
    let dir = tempdir().unwrap();
    let cfg = test_config(dir.path(), 20);
    let body = b"image A".to_vec();
    let h1 = sha256_hex(&body);
    let fetcher = Arc::new(ScriptedFetcher::new(vec![("A".into(), Script::Bytes(body.clone()))]));

    let summary = run(&cfg, vec![ManifestRecord::new("A", &h1)], Arc::clone(&fetcher)).await;

    assert_eq!(summary.succeeded, 1);
    assert_eq!(fetcher.calls("A"), 1);
    assert_eq!(read(&cfg.checkpoint_file), format!("A:::::{h1}:{h1}\n"));
    let stored = cfg.output_dir.join(format!("{h1}.jpg"));
    assert_eq!(std::fs::read(&stored).unwrap(), body);
    assert_eq!(read(&cfg.failed_file), "");
    assert_eq!(read(&cfg.mismatch_file), "");
    assert_eq!(read(cfg.processed_file.as_ref().unwrap()), "A\n");
}

#[tokio::test]
async fn always_timing_out_url_is_tried_max_attempts_then_logged_once() {
    let dir = tempdir().unwrap();
    let cfg = test_config(dir.path(), 20);
    let h2 = sha256_hex(b"never arrives");
    let fetcher = Arc::new(ScriptedFetcher::new(vec![(
        "B".into(),
        Script::Fail(FetchError::Timeout),
    )]));

    let summary = run(&cfg, vec![ManifestRecord::new("B", &h2)], Arc::clone(&fetcher)).await;

    assert_eq!(summary.failed, 1);
    assert_eq!(fetcher.calls("B"), 3);
    assert_eq!(read(&cfg.failed_file), "B\n");
    assert_eq!(read(&cfg.checkpoint_file), "");
    assert!(!cfg.output_dir.join(format!("{h2}.jpg")).exists());
    assert_eq!(read(cfg.processed_file.as_ref().unwrap()).lines().count(), 3);
}

#[tokio::test]
async fn second_run_skips_completed_urls_without_fetching() {
    let dir = tempdir().unwrap();
    let cfg = test_config(dir.path(), 20);
    let body = b"image A".to_vec();
    let h1 = sha256_hex(&body);
    let records = vec![ManifestRecord::new("A", &h1)];

    let first = Arc::new(ScriptedFetcher::new(vec![("A".into(), Script::Bytes(body.clone()))]));
    run(&cfg, records.clone(), Arc::clone(&first)).await;
    let files_after_first = stored_files(&cfg.output_dir);

    let second = Arc::new(ScriptedFetcher::new(vec![("A".into(), Script::Bytes(body))]));
    let summary = run(&cfg, records, Arc::clone(&second)).await;

    assert_eq!(second.calls("A"), 0);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.succeeded, 0);
    assert_eq!(stored_files(&cfg.output_dir), files_after_first);
    assert_eq!(read(&cfg.checkpoint_file).lines().count(), 1);
    assert_eq!(read(cfg.processed_file.as_ref().unwrap()), "A\n");
}

#[tokio::test]
async fn interrupted_run_resumes_only_missing_items() {
    let dir = tempdir().unwrap();
    let cfg = test_config(dir.path(), 20);
    let bodies: Vec<Vec<u8>> = (0..4).map(|i| format!("img {i}").into_bytes()).collect();
    let records: Vec<ManifestRecord> = bodies
        .iter()
        .enumerate()
        .map(|(i, b)| ManifestRecord::new(format!("u{i}"), sha256_hex(b)))
        .collect();
    std::fs::write(
        &cfg.checkpoint_file,
        format!(
            "{}{}",
            CheckpointRecord {
                url: "u0".into(),
                expected_hash: records[0].expected_hash.clone(),
                computed_hash: records[0].expected_hash.clone(),
            }
            .encode()
            .unwrap(),
            "u1:::::half-written"
        ),
    )
    .unwrap();

    let fetcher = Arc::new(ScriptedFetcher::new(
        bodies
            .iter()
            .enumerate()
            .map(|(i, b)| (format!("u{i}"), Script::Bytes(b.clone())))
            .collect(),
    ));
    let summary = run(&cfg, records, Arc::clone(&fetcher)).await;

    assert_eq!(fetcher.calls("u0"), 0);
    assert_eq!(fetcher.calls("u1"), 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.succeeded, 3);
    let set = checkpoint::load(&cfg.checkpoint_file, ResumeKey::Url)
        .await
        .unwrap();
    assert_eq!(set.len(), 4);
    assert_eq!(read(&cfg.checkpoint_file).lines().count(), 4);
}

#[tokio::test]
async fn mismatched_content_is_retried_then_logged_and_never_stored() {
    let dir = tempdir().unwrap();
    let cfg = test_config(dir.path(), 20);
    let expected = sha256_hex(b"the real image");
    let served = b"a stale proxy page".to_vec();
    let computed = sha256_hex(&served);
    let fetcher = Arc::new(ScriptedFetcher::new(vec![("M".into(), Script::Bytes(served))]));

    let summary = run(&cfg, vec![ManifestRecord::new("M", &expected)], Arc::clone(&fetcher)).await;

    assert_eq!(summary.mismatched, 1);
    assert_eq!(fetcher.calls("M"), 3);
    let line = format!("URL: M, Expected hash: {expected}, Computed hash: {computed}\n");
    assert_eq!(read(&cfg.mismatch_file), line.repeat(3));
    assert_eq!(read(&cfg.failed_file), "");
    assert_eq!(read(&cfg.checkpoint_file), "");
    assert!(stored_files(&cfg.output_dir).is_empty());
}

#[tokio::test]
async fn transient_failures_are_reported_then_success() {
    let dir = tempdir().unwrap();
    let cfg = test_config(dir.path(), 20);
    let body = b"eventually".to_vec();
    let hash = sha256_hex(&body);
    let fetcher = Arc::new(ScriptedFetcher::new(vec![(
        "T".into(),
        Script::FailThen(2, FetchError::Status(503), body),
    )]));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    let summary = run_with_config(
        &cfg,
        vec![ManifestRecord::new("T", &hash)],
        Arc::clone(&fetcher),
        &ShutdownSignal::new(),
        Some(tx),
    )
    .await
    .unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(fetcher.calls("T"), 3);
    let mut events = Vec::new();
    while let Some(o) = rx.recv().await {
        events.push(o);
    }
    assert_eq!(events.len(), 3);
    assert!(matches!(&events[0], Outcome::TransientFailure { error, .. } if error == "HTTP 503"));
    assert!(!events[1].is_terminal());
    assert!(matches!(&events[2], Outcome::Success { url, .. } if url == "T"));
}

#[tokio::test]
async fn never_more_than_batch_size_fetches_in_flight() {
    let dir = tempdir().unwrap();
    let cfg = test_config(dir.path(), 4);
    let n = 40;
    let bodies: Vec<Vec<u8>> = (0..n).map(|i| format!("body {i}").into_bytes()).collect();
    let fetcher = Arc::new(
        ScriptedFetcher::new(
            bodies
                .iter()
                .enumerate()
                .map(|(i, b)| (format!("https://img/{i}.jpg"), Script::Bytes(b.clone())))
                .collect(),
        )
        .with_latency(Duration::from_millis(15)),
    );
    let records = bodies
        .iter()
        .enumerate()
        .map(|(i, b)| ManifestRecord::new(format!("https://img/{i}.jpg"), sha256_hex(b)))
        .collect();

    let summary = run(&cfg, records, Arc::clone(&fetcher)).await;

    assert_eq!(summary.succeeded, n);
    assert!(fetcher.peak_in_flight() <= 4, "peak {}", fetcher.peak_in_flight());
    assert!(fetcher.peak_in_flight() >= 2, "expected some parallelism");

    let text = read(&cfg.checkpoint_file);
    assert_eq!(text.lines().count(), n);
    for line in text.lines() {
        CheckpointRecord::decode(line).expect("well-formed line");
    }
    let set = checkpoint::load(&cfg.checkpoint_file, ResumeKey::Url)
        .await
        .unwrap();
    assert_eq!(set.len(), n);
    assert_eq!(stored_files(&cfg.output_dir).len(), n);
}

#[tokio::test]
async fn panicking_attempt_consumes_retries_without_crashing_the_run() {
    let dir = tempdir().unwrap();
    let cfg = test_config(dir.path(), 20);
    let ok = b"fine".to_vec();
    let fetcher = Arc::new(ScriptedFetcher::new(vec![
        ("P".into(), Script::Panic),
        ("OK".into(), Script::Bytes(ok.clone())),
    ]));

    let summary = run(
        &cfg,
        vec![
            ManifestRecord::new("P", sha256_hex(b"whatever")),
            ManifestRecord::new("OK", sha256_hex(&ok)),
        ],
        Arc::clone(&fetcher),
    )
    .await;

    assert_eq!(fetcher.calls("P"), 3);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(read(&cfg.failed_file), "P\n");
}

#[tokio::test]
async fn invalid_url_is_attempted_max_attempts_times() {
    let dir = tempdir().unwrap();
    let cfg = test_config(dir.path(), 20);
    let fetcher = Arc::new(ScriptedFetcher::new(vec![(
        "::bad::".into(),
        Script::Fail(FetchError::InvalidUrl("::bad::".into())),
    )]));

    let summary = run(&cfg, vec![ManifestRecord::new("::bad::", "00")], Arc::clone(&fetcher)).await;

    assert_eq!(fetcher.calls("::bad::"), 3);
    assert_eq!(summary.failed, 1);
    assert_eq!(read(&cfg.failed_file), "::bad::\n");
    assert_eq!(read(cfg.processed_file.as_ref().unwrap()).lines().count(), 3);
}

#[tokio::test]
async fn every_mismatched_attempt_is_logged_even_when_the_last_attempt_times_out() {
    let dir = tempdir().unwrap();
    let cfg = test_config(dir.path(), 20);
    let expected = sha256_hex(b"the real image");
    let served = b"a stale proxy page".to_vec();
    let computed = sha256_hex(&served);
    let fetcher = Arc::new(ScriptedFetcher::new(vec![(
        "http://x/a.jpg".into(),
        Script::Sequence(vec![
            Ok(served.clone()),
            Ok(served),
            Err(FetchError::Timeout),
        ]),
    )]));

    let summary = run(
        &cfg,
        vec![ManifestRecord::new("http://x/a.jpg", &expected)],
        Arc::clone(&fetcher),
    )
    .await;

    assert_eq!(fetcher.calls("http://x/a.jpg"), 3);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.mismatched, 0);
    let line =
        format!("URL: http://x/a.jpg, Expected hash: {expected}, Computed hash: {computed}\n");
    assert_eq!(read(&cfg.mismatch_file), line.repeat(2));
    assert_eq!(read(&cfg.failed_file), "http://x/a.jpg\n");
    assert!(stored_files(&cfg.output_dir).is_empty());
}

#[tokio::test]
async fn url_with_line_break_is_rejected_before_any_attempt() {
    let dir = tempdir().unwrap();
    let cfg = test_config(dir.path(), 20);
    let body = b"payload".to_vec();
    let url = "https://img.example/a\n.jpg";
    let fetcher = Arc::new(ScriptedFetcher::new(vec![(
        url.into(),
        Script::Bytes(body.clone()),
    )]));

    let summary = run(
        &cfg,
        vec![ManifestRecord::new(url, sha256_hex(&body))],
        Arc::clone(&fetcher),
    )
    .await;

    assert_eq!(fetcher.total_calls(), 0);
    assert_eq!(summary.failed, 1);
    assert!(stored_files(&cfg.output_dir).is_empty());
    assert_eq!(read(&cfg.checkpoint_file), "");
    assert_eq!(read(cfg.processed_file.as_ref().unwrap()), "");
}

#[tokio::test]
async fn identical_content_under_two_urls_collapses_to_one_file() {
    let dir = tempdir().unwrap();
    let cfg = test_config(dir.path(), 20);
    let body = b"same bytes".to_vec();
    let hash = sha256_hex(&body);
    let fetcher = Arc::new(ScriptedFetcher::new(vec![
        ("X".into(), Script::Bytes(body.clone())),
        ("Y".into(), Script::Bytes(body)),
    ]));

    let summary = run(
        &cfg,
        vec![ManifestRecord::new("X", &hash), ManifestRecord::new("Y", &hash)],
        Arc::clone(&fetcher),
    )
    .await;

    assert_eq!(summary.succeeded, 2);
    assert_eq!(stored_files(&cfg.output_dir), vec![format!("{hash}.jpg")]);
    assert_eq!(read(&cfg.checkpoint_file).lines().count(), 2);
}

#[tokio::test]
async fn expected_hash_resume_key_skips_other_urls_with_stored_content() {
    let dir = tempdir().unwrap();
    let mut cfg = test_config(dir.path(), 20);
    cfg.resume_key = ResumeKey::ExpectedHash;
    let body = b"mirrored".to_vec();
    let hash = sha256_hex(&body);

    let first = Arc::new(ScriptedFetcher::new(vec![("primary".into(), Script::Bytes(body.clone()))]));
    run(&cfg, vec![ManifestRecord::new("primary", &hash)], Arc::clone(&first)).await;

    let second = Arc::new(ScriptedFetcher::new(vec![("mirror".into(), Script::Bytes(body))]));
    let summary = run(&cfg, vec![ManifestRecord::new("mirror", &hash)], Arc::clone(&second)).await;

    assert_eq!(second.total_calls(), 0);
    assert_eq!(summary.skipped, 1);
}

#[tokio::test]
async fn shutdown_before_start_admits_nothing() {
    let dir = tempdir().unwrap();
    let cfg = test_config(dir.path(), 20);
    let fetcher = Arc::new(ScriptedFetcher::new(vec![("A".into(), Script::Bytes(b"a".to_vec()))]));
    let shutdown = ShutdownSignal::new();
    shutdown.trigger();

    let summary = run_with_config(
        &cfg,
        vec![
            ManifestRecord::new("A", sha256_hex(b"a")),
            ManifestRecord::new("B", sha256_hex(b"b")),
        ],
        Arc::clone(&fetcher),
        &shutdown,
        None,
    )
    .await
    .unwrap();

    assert_eq!(fetcher.total_calls(), 0);
    assert_eq!(summary.total, 2);
    assert_eq!(summary.interrupted, 2);
    assert_eq!(summary.finished(), 0);
}

#[tokio::test]
async fn shutdown_mid_run_lets_admitted_tasks_finish() {
    let dir = tempdir().unwrap();
    let cfg = test_config(dir.path(), 2);
    let n = 20;
    let bodies: Vec<Vec<u8>> = (0..n).map(|i| format!("item {i}").into_bytes()).collect();
    let fetcher = Arc::new(
        ScriptedFetcher::new(
            bodies
                .iter()
                .enumerate()
                .map(|(i, b)| (format!("s{i}"), Script::Bytes(b.clone())))
                .collect(),
        )
        .with_latency(Duration::from_millis(30)),
    );
    let records: Vec<ManifestRecord> = bodies
        .iter()
        .enumerate()
        .map(|(i, b)| ManifestRecord::new(format!("s{i}"), sha256_hex(b)))
        .collect();

    let shutdown = ShutdownSignal::new();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let watcher = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            while let Some(o) = rx.recv().await {
                if matches!(o, Outcome::Success { .. }) {
                    shutdown.trigger();
                }
            }
        })
    };

    let summary = run_with_config(&cfg, records, Arc::clone(&fetcher), &shutdown, Some(tx))
        .await
        .unwrap();
    watcher.await.unwrap();

    assert!(summary.interrupted > 0);
    assert!(summary.succeeded >= 1);
    assert_eq!(summary.succeeded + summary.interrupted, n);
    assert_eq!(fetcher.total_calls(), summary.succeeded);
    assert_eq!(read(&cfg.checkpoint_file).lines().count(), summary.succeeded);
}
