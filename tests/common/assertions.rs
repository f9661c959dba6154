//! Custom test assertions for integration tests

use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::broadcast;
use upload_task::{TaskEvent, TaskId, TaskSnapshot, TaskStatus};

/// Wait for the terminal event of task `id`
///
/// Returns `None` on timeout or if the channel closes first.
pub async fn wait_for_completion(
    events: &mut broadcast::Receiver<TaskEvent>,
    id: TaskId,
    timeout: Duration,
) -> Option<TaskSnapshot> {
    tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(TaskEvent::UploadCompleted { task }) if task.id == id => return Some(task),
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
    })
    .await
    .ok()
    .flatten()
}

/// Collect events until every task in `ids` has completed
pub async fn collect_until_all_complete(
    events: &mut broadcast::Receiver<TaskEvent>,
    ids: &[TaskId],
    timeout: Duration,
) -> Vec<TaskEvent> {
    let mut pending: HashSet<TaskId> = ids.iter().copied().collect();
    let mut collected = Vec::new();

    let _ = tokio::time::timeout(timeout, async {
        while !pending.is_empty() {
            match events.recv().await {
                Ok(event) => {
                    if event.is_completed() {
                        pending.remove(&event.task_id());
                    }
                    collected.push(event);
                }
                Err(_) => break,
            }
        }
    })
    .await;

    collected
}

/// Assert a snapshot describes a successful task
pub fn assert_succeeded(snapshot: &TaskSnapshot, expected_url: &str) {
    assert_eq!(snapshot.status, TaskStatus::Completed);
    assert!(
        snapshot.info.result.errors.is_empty(),
        "unexpected errors: {:?}",
        snapshot.info.result.errors
    );
    assert_eq!(snapshot.info.result.url, expected_url);
}
