use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use agentdeck::backend::api::models::{AgentResult, DebateMessage, DebateStatus, RunStatus};
use agentdeck::backend::{ApiError, ApiResult};
use agentdeck::controllers::{
    BrainstormApi, BrainstormController, DebateApi, DebateController, STOP_TIMED_OUT, StopOutcome,
};
use async_trait::async_trait;

const INTERVAL: Duration = Duration::from_secs(1);

fn result(profile: &str, status: RunStatus) -> AgentResult {
    AgentResult {
        profile_id: profile.to_string(),
        status,
        output: None,
        error: None,
    }
}

/// Agent `a` finishes on the third poll, agent `b` fails on the fourth.
/// The second poll errors out.
struct FakeRun {
    polls: AtomicUsize,
    cancels: AtomicUsize,
}

#[async_trait]
impl BrainstormApi for FakeRun {
    async fn start_parallel_run(&self, _prompt: &str, profile_ids: &[String]) -> ApiResult<String> {
        assert_eq!(profile_ids.len(), 2);
        Ok(String::from("run-1"))
    }

    async fn get_run_status(&self, _run_id: &str) -> ApiResult<RunStatus> {
        Ok(RunStatus::Running)
    }

    async fn get_run_results(&self, run_id: &str) -> ApiResult<Vec<AgentResult>> {
        assert_eq!(run_id, "run-1");
        let n = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        match n {
            1 => Ok(Vec::new()),
            2 => Err(ApiError::Malformed(String::from("flaky"))),
            3 => Ok(vec![result("a", RunStatus::Complete), result("b", RunStatus::Running)]),
            _ => Ok(vec![result("a", RunStatus::Complete), result("b", RunStatus::Failed)]),
        }
    }

    async fn cancel_run(&self, _run_id: &str) -> ApiResult<()> {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn brainstorm_polling_stops_once_every_result_is_terminal() {
    let api = Arc::new(FakeRun {
        polls: AtomicUsize::new(0),
        cancels: AtomicUsize::new(0),
    });
    let controller = BrainstormController::new(api.clone(), INTERVAL);
    let mut updates = controller.subscribe();

    let run_id = controller
        .start("name the product", &[String::from("a"), String::from("b")])
        .await
        .unwrap();
    assert_eq!(run_id, "run-1");

    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(controller.snapshot().last_error.as_deref(), Some("unexpected backend response: flaky"));
    assert!(controller.is_polling());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(api.polls.load(Ordering::SeqCst), 4);
    assert!(!controller.is_polling());

    let snapshot = controller.snapshot();
    assert!(snapshot.finished);
    assert_eq!(snapshot.last_error, None);
    assert_eq!(
        snapshot.results,
        vec![result("a", RunStatus::Complete), result("b", RunStatus::Failed)]
    );
    assert!(updates.has_changed().unwrap());
    updates.borrow_and_update();

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(api.polls.load(Ordering::SeqCst), 4);
    assert!(!updates.has_changed().unwrap());

    controller.cancel().await.unwrap();
    assert_eq!(api.cancels.load(Ordering::SeqCst), 1);
}

/// A run that never reports any agent results. Cancelling it flips the run
/// status to `cancelled`.
struct SilentRun {
    polls: AtomicUsize,
    cancelled: AtomicBool,
}

#[async_trait]
impl BrainstormApi for SilentRun {
    async fn start_parallel_run(&self, _prompt: &str, _profile_ids: &[String]) -> ApiResult<String> {
        Ok(String::from("run-2"))
    }

    async fn get_run_status(&self, _run_id: &str) -> ApiResult<RunStatus> {
        Ok(if self.cancelled.load(Ordering::SeqCst) {
            RunStatus::Cancelled
        } else {
            RunStatus::Running
        })
    }

    async fn get_run_results(&self, _run_id: &str) -> ApiResult<Vec<AgentResult>> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    async fn cancel_run(&self, _run_id: &str) -> ApiResult<()> {
        self.cancelled.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn cancelled_run_without_results_stops_polling() {
    let api = Arc::new(SilentRun {
        polls: AtomicUsize::new(0),
        cancelled: AtomicBool::new(false),
    });
    let controller = BrainstormController::new(api.clone(), INTERVAL);
    controller.start("anything", &[String::from("a")]).await.unwrap();

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert!(controller.is_polling());
    assert!(!controller.snapshot().finished);

    controller.cancel().await.unwrap();
    tokio::time::sleep(Duration::from_secs(3_600)).await;

    assert!(!controller.is_polling());
    assert!(controller.snapshot().finished);
    assert!(controller.snapshot().results.is_empty());
    assert!(api.polls.load(Ordering::SeqCst) <= 5);
}

/// A debate whose stop request never answers. It ends on its own at the
/// twelfth status poll.
struct StuckDebate {
    polls: AtomicUsize,
}

#[async_trait]
impl DebateApi for StuckDebate {
    async fn start_debate(&self, _topic: &str, _profile_ids: &[String], rounds: u32) -> ApiResult<String> {
        assert_eq!(rounds, 2);
        Ok(String::from("d-1"))
    }

    async fn get_debate_status(&self, _debate_id: &str) -> ApiResult<DebateStatus> {
        let n = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(DebateStatus {
            status: if n >= 12 { RunStatus::Complete } else { RunStatus::Running },
            current_round: n.min(2) as u32,
            total_rounds: 2,
            error: None,
        })
    }

    async fn get_debate_messages(&self, _debate_id: &str) -> ApiResult<Vec<DebateMessage>> {
        let seen = self.polls.load(Ordering::SeqCst);
        Ok((1..=seen.min(3))
            .map(|id| DebateMessage {
                id: id.to_string(),
                round: 1,
                content: format!("point {id}"),
                ..DebateMessage::default()
            })
            .collect())
    }

    async fn stop_debate(&self, _debate_id: &str) -> ApiResult<()> {
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn debate_stop_times_out_without_failing() {
    let api = Arc::new(StuckDebate {
        polls: AtomicUsize::new(0),
    });
    let controller = DebateController::new(api.clone(), INTERVAL, Duration::from_secs(8));
    controller
        .start("tabs or spaces", &[String::from("a"), String::from("b")], 2)
        .await
        .unwrap();

    let started = tokio::time::Instant::now();
    let outcome = controller.stop().await;
    assert_eq!(outcome, StopOutcome::TimedOut);
    assert!(started.elapsed() >= Duration::from_secs(8));
    assert!(started.elapsed() < Duration::from_secs(9));

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.notice.as_deref(), Some(STOP_TIMED_OUT));
    assert_eq!(snapshot.notice.as_deref(), Some("stop timed out"));
    assert_eq!(snapshot.messages.len(), 3);
    assert!(!snapshot.finished);
    assert!(controller.is_polling());

    tokio::time::sleep(Duration::from_secs(10)).await;
    let snapshot = controller.snapshot();
    assert!(snapshot.finished);
    assert_eq!(snapshot.status.status, RunStatus::Complete);
    assert_eq!(snapshot.messages.len(), 3);
    assert!(!controller.is_polling());
}
