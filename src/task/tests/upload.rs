use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::tempdir;

use crate::config::{FileDestination, ImageDestination, TextDestination};
use crate::payload::Payload;
use crate::task::WorkerTask;
use crate::task::test_helpers::*;
use crate::types::{DataType, TaskEvent, TaskStatus};

#[tokio::test]
async fn test_always_failing_uploader_attempts_n_plus_one() {
    let dir = tempdir().unwrap();
    let mut settings = test_settings(dir.path());
    settings.upload.max_upload_fail_retry = 3;
    settings.after_upload.copy_url_to_clipboard = true;

    let uploader = MockUploader::new("pastebin", Behavior::Fail);
    let factory = Arc::new(MockFactory::with(&[&uploader]));
    let clipboard = Arc::new(RecordingClipboard::default());
    let task = WorkerTask::text_upload(
        "retry me",
        Arc::new(settings),
        services(&factory).with_clipboard(clipboard.clone()),
    )
    .unwrap();

    task.run().await;

    assert_eq!(uploader.calls(), 4);
    let result = task.result();
    assert_eq!(result.errors.len(), 4);
    assert!(result.errors[0].contains("503"));
    assert!(clipboard.texts().is_empty(), "post-upload skipped after failure");
    assert_eq!(task.status(), TaskStatus::Completed);
}

#[tokio::test]
async fn test_result_errors_count_as_failed_attempts() {
    let dir = tempdir().unwrap();
    let mut settings = test_settings(dir.path());
    settings.upload.max_upload_fail_retry = 2;

    let uploader = MockUploader::new("pastebin", Behavior::ResultError);
    let factory = Arc::new(MockFactory::with(&[&uploader]));
    let task =
        WorkerTask::text_upload("nope", Arc::new(settings), services(&factory)).unwrap();

    task.run().await;

    assert_eq!(uploader.calls(), 3);
    assert_eq!(task.result().errors.len(), 3);
}

#[tokio::test]
async fn test_zero_retries_makes_single_attempt() {
    let dir = tempdir().unwrap();
    let mut settings = test_settings(dir.path());
    settings.upload.max_upload_fail_retry = 0;

    let uploader = MockUploader::new("pastebin", Behavior::Fail);
    let factory = Arc::new(MockFactory::with(&[&uploader]));
    let task = WorkerTask::text_upload("once", Arc::new(settings), services(&factory)).unwrap();

    task.run().await;

    assert_eq!(uploader.calls(), 1);
    assert_eq!(task.result().errors.len(), 1);
}

#[tokio::test]
async fn test_failover_uses_secondary_for_retry_k() {
    let dir = tempdir().unwrap();
    let mut settings = test_settings(dir.path());
    settings.upload.max_upload_fail_retry = 2;
    settings.destinations.use_secondary_uploaders = true;
    settings.destinations.secondary_text_uploaders = vec![
        TextDestination::Host("paste-a".into()),
        TextDestination::Host("paste-b".into()),
    ];

    let primary = MockUploader::new("pastebin", Behavior::Fail);
    let first = MockUploader::new("paste-a", Behavior::Fail);
    let second = MockUploader::new("paste-b", Behavior::Succeed("https://b/1".into()));
    let factory = Arc::new(MockFactory::with(&[&primary, &first, &second]));
    let task =
        WorkerTask::text_upload("failover", Arc::new(settings), services(&factory)).unwrap();

    task.run().await;

    assert_eq!(factory.requested(), vec!["pastebin", "paste-a", "paste-b"]);
    let result = task.result();
    assert_eq!(result.url, "https://b/1");
    assert_eq!(result.errors.len(), 2, "errors accumulate across attempts");
    assert_eq!(
        task.info().destinations.text,
        TextDestination::Host("paste-b".into())
    );
}

#[tokio::test]
async fn test_backoff_retries_same_destination() {
    let dir = tempdir().unwrap();
    let mut settings = test_settings(dir.path());
    settings.upload.max_upload_fail_retry = 2;
    settings.upload.retry_delay = Duration::from_millis(30);

    let uploader = MockUploader::new("pastebin", Behavior::FailTimes(1, "https://p/ok".into()));
    let factory = Arc::new(MockFactory::with(&[&uploader]));
    let task =
        WorkerTask::text_upload("backoff", Arc::new(settings), services(&factory)).unwrap();

    let started = Instant::now();
    task.run().await;

    assert!(started.elapsed() >= Duration::from_millis(30));
    assert_eq!(factory.requested(), vec!["pastebin", "pastebin"]);
    assert_eq!(uploader.calls(), 2, "a successful attempt ends the loop");
    assert_eq!(task.result().url, "https://p/ok");

    let received = uploader.received();
    assert_eq!(received[0].1, received[1].1, "payload rewound before retry");
}

#[tokio::test]
async fn test_unconfigured_destination_reports_empty_url() {
    let dir = tempdir().unwrap();
    let factory = Arc::new(MockFactory::default());
    let task = WorkerTask::text_upload(
        "nowhere",
        Arc::new(test_settings(dir.path())),
        services(&factory),
    )
    .unwrap();

    task.run().await;

    assert_eq!(factory.requested(), vec!["pastebin"]);
    assert_eq!(task.result().errors, vec!["URL is empty".to_string()]);
}

#[tokio::test]
async fn test_first_upload_warning_declined_requests_setting_update() {
    let dir = tempdir().unwrap();
    let mut settings = test_settings(dir.path());
    settings.upload.show_upload_warning = true;

    let uploader = MockUploader::new("pastebin", Behavior::Succeed("https://p/1".into()));
    let factory = Arc::new(MockFactory::with(&[&uploader]));
    let confirmation = FixedConfirmation {
        first_upload: false,
        ..FixedConfirmation::default()
    };
    let task = WorkerTask::text_upload(
        "warn",
        Arc::new(settings),
        services(&factory).with_confirmation(Arc::new(confirmation)),
    )
    .unwrap();

    task.run().await;

    assert!(task.request_setting_update());
    assert!(task.stop_requested());
    assert_eq!(uploader.calls(), 0);
    assert!(!task.result().is_url_expected);
    assert_eq!(task.status(), TaskStatus::Completed);
}

#[tokio::test]
async fn test_large_file_declined_stops_task() {
    let dir = tempdir().unwrap();
    let mut settings = test_settings(dir.path());
    settings.upload.large_file_size_warning = 1;

    let uploader = MockUploader::new("dropbox", Behavior::Succeed("https://d/1".into()));
    let factory = Arc::new(MockFactory::with(&[&uploader]));
    let confirmation = FixedConfirmation {
        large_file: false,
        ..FixedConfirmation::default()
    };
    let task = WorkerTask::data_upload(
        DataType::File,
        Payload::from_bytes(vec![0; 2 * 1024 * 1024]),
        "big.bin",
        Arc::new(settings),
        services(&factory).with_confirmation(Arc::new(confirmation)),
    )
    .unwrap();

    task.run().await;

    assert!(task.stop_requested());
    assert!(!task.request_setting_update());
    assert_eq!(uploader.calls(), 0);
}

#[tokio::test]
async fn test_before_upload_window_declined_skips_upload() {
    let dir = tempdir().unwrap();
    let mut settings = test_settings(dir.path());
    settings.after_capture.show_before_upload_window = true;

    let uploader = MockUploader::new("pastebin", Behavior::Succeed("https://p/1".into()));
    let factory = Arc::new(MockFactory::with(&[&uploader]));
    let confirmation = FixedConfirmation {
        before_upload: false,
        ..FixedConfirmation::default()
    };
    let task = WorkerTask::text_upload(
        "declined",
        Arc::new(settings),
        services(&factory).with_confirmation(Arc::new(confirmation)),
    )
    .unwrap();

    task.run().await;

    assert_eq!(uploader.calls(), 0);
    let result = task.result();
    assert!(!result.is_url_expected);
    assert!(result.errors.is_empty());
    assert!(!task.stop_requested(), "declining the window is not a stop");
}

#[tokio::test]
async fn test_images_routed_through_file_uploader() {
    let dir = tempdir().unwrap();
    let mut settings = test_settings(dir.path());
    settings.destinations.image = ImageDestination::FileUploader;
    settings.destinations.image_file = FileDestination("ftp".into());

    let uploader = MockUploader::new("ftp", Behavior::Succeed("ftp://host/a.png".into()));
    let factory = Arc::new(MockFactory::with(&[&uploader]));
    let task = WorkerTask::data_upload(
        DataType::Image,
        Payload::from_bytes(vec![9, 9, 9]),
        "a.png",
        Arc::new(settings),
        services(&factory),
    )
    .unwrap();

    task.run().await;

    assert_eq!(factory.requested(), vec!["ftp"]);
    assert_eq!(uploader.received(), vec![("a.png".to_string(), vec![9, 9, 9])]);
}

#[tokio::test]
async fn test_progress_reports_update_task() {
    let dir = tempdir().unwrap();
    let uploader = MockUploader::new("pastebin", Behavior::Succeed("https://p/1".into()));
    let factory = Arc::new(MockFactory::with(&[&uploader]));
    let task = WorkerTask::text_upload(
        "12345",
        Arc::new(test_settings(dir.path())),
        services(&factory),
    )
    .unwrap();
    let mut rx = task.subscribe();

    task.run().await;

    let progress = task.info().progress.unwrap();
    assert_eq!(progress.position, 5);
    assert_eq!(progress.length, 5);

    let events = drain(&mut rx).await;
    let reported = events.iter().find_map(|e| match e {
        TaskEvent::UploadProgressChanged { task } => task.info.progress,
        _ => None,
    });
    assert_eq!(reported.map(|p| p.position), Some(5));
}

#[tokio::test]
async fn test_early_url_copied_before_completion() {
    let dir = tempdir().unwrap();
    let mut settings = test_settings(dir.path());
    settings.after_upload.copy_url_to_clipboard = true;
    settings.advanced.early_copy_url = true;

    let uploader = MockUploader::with_early_url("pastebin", "https://p/early");
    let factory = Arc::new(MockFactory::with(&[&uploader]));
    let clipboard = Arc::new(RecordingClipboard::default());
    let task = WorkerTask::text_upload(
        "early",
        Arc::new(settings),
        services(&factory).with_clipboard(clipboard.clone()),
    )
    .unwrap();

    task.run().await;

    assert_eq!(
        clipboard.texts(),
        vec!["https://p/early".to_string(), "https://p/early".to_string()]
    );
}
