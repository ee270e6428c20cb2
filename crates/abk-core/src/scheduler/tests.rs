//! Tests for tree walking, retry and failure aggregation.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::Error;
use crate::job::{CompositeJob, DiscreteJob, Job, JobExecutor, JobProgress};
use crate::work::BoundedScheduler;

use super::JobScheduler;

/// Leaf that fails its first `fail_first` attempts.
struct ScriptedJob {
    name: String,
    fail_first: usize,
    progress: Option<JobProgress>,
    attempts: AtomicUsize,
    succeeded: AtomicBool,
    progress_at_start: Mutex<Vec<f64>>,
}

impl ScriptedJob {
    fn new(name: &str, fail_first: usize, progress: Option<JobProgress>) -> Self {
        Self {
            name: name.to_string(),
            fail_first,
            progress,
            attempts: AtomicUsize::new(0),
            succeeded: AtomicBool::new(false),
            progress_at_start: Mutex::new(Vec::new()),
        }
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn succeeded(&self) -> bool {
        self.succeeded.load(Ordering::SeqCst)
    }
}

impl DiscreteJob for ScriptedJob {
    fn description(&self) -> String {
        self.name.clone()
    }

    fn progress(&self) -> Option<&JobProgress> {
        self.progress.as_ref()
    }
}

#[derive(Default)]
struct ScriptedExecutor {
    running: AtomicUsize,
    peak: AtomicUsize,
    delay: Duration,
}

#[async_trait]
impl JobExecutor<ScriptedJob> for ScriptedExecutor {
    async fn execute(&self, job: Arc<ScriptedJob>) -> anyhow::Result<()> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(p) = job.progress() {
            job.progress_at_start.lock().unwrap().push(p.progress());
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let attempt = job.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        self.running.fetch_sub(1, Ordering::SeqCst);

        if let Some(p) = job.progress() {
            p.update(0.5);
        }
        if attempt <= job.fail_first {
            anyhow::bail!("{} failed attempt {}", job.name, attempt);
        }
        if let Some(p) = job.progress() {
            p.update(1.0);
        }
        job.succeeded.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn retrying(attempts: u32) -> JobProgress {
    JobProgress::new().with_retry(attempts, Duration::ZERO)
}

fn scheduler(max_concurrency: usize) -> JobScheduler<ScriptedJob, ScriptedExecutor> {
    JobScheduler::new(
        ScriptedExecutor::default(),
        BoundedScheduler::new(max_concurrency).unwrap(),
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn always_failing_job_uses_exactly_its_attempts() {
    let sched = scheduler(1);
    let job = Arc::new(ScriptedJob::new("flaky", usize::MAX, Some(retrying(3))));
    let err = sched
        .schedule_job(Job::Discrete(Arc::clone(&job)))
        .await
        .unwrap_err();
    match err {
        Error::ExhaustedRetries {
            description,
            attempts,
            ..
        } => {
            assert_eq!(description, "flaky");
            assert_eq!(attempts, 3);
        }
        other => panic!("expected ExhaustedRetries, got {other:?}"),
    }
    assert_eq!(job.attempts(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn job_without_progress_gets_one_attempt() {
    let sched = scheduler(1);
    let job = Arc::new(ScriptedJob::new("plain", usize::MAX, None));
    let err = sched
        .schedule_job(Job::Discrete(Arc::clone(&job)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ExhaustedRetries { attempts: 1, .. }));
    assert_eq!(job.attempts(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn retry_resets_progress_and_then_succeeds() {
    let sched = scheduler(1);
    let job = Arc::new(ScriptedJob::new("second time", 1, Some(retrying(3))));
    sched
        .schedule_job(Job::Discrete(Arc::clone(&job)))
        .await
        .unwrap();
    assert_eq!(job.attempts(), 2);
    assert!(job.succeeded());
    assert_eq!(*job.progress_at_start.lock().unwrap(), vec![0.0, 0.0]);
    assert_eq!(job.progress().unwrap().progress(), 1.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelled_job_never_executes() {
    let sched = scheduler(1);
    let progress = retrying(3);
    progress.cancellation().cancel();
    let job = Arc::new(ScriptedJob::new("cancelled", 0, Some(progress)));
    let err = sched
        .schedule_job(Job::Discrete(Arc::clone(&job)))
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(job.attempts(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn retry_delay_is_observed() {
    let sched = scheduler(1);
    let progress = JobProgress::new().with_retry(2, Duration::from_millis(80));
    let job = Arc::new(ScriptedJob::new("slow retry", 1, Some(progress)));
    let started = Instant::now();
    sched.schedule_job(Job::Discrete(job)).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(80));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn composite_on_discrete_path_is_invalid_state() {
    let sched = scheduler(1);
    let composite = Job::composite(CompositeJob::new("tree", vec![]));
    let err = sched.schedule_discrete(composite).await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn one_failing_child_is_a_partial_failure() {
    let sched = scheduler(2);
    let a = Arc::new(ScriptedJob::new("A", 0, Some(retrying(2))));
    let b = Arc::new(ScriptedJob::new("B", usize::MAX, Some(retrying(2))));
    let c = Arc::new(ScriptedJob::new("C", 0, Some(retrying(2))));
    let tree = Job::composite(CompositeJob::new(
        "backup",
        vec![
            Job::Discrete(Arc::clone(&a)),
            Job::Discrete(Arc::clone(&b)),
            Job::Discrete(Arc::clone(&c)),
        ],
    ));

    let err = sched.schedule_job(tree).await.unwrap_err();
    match err {
        Error::PartialFailure {
            description,
            failed,
            total,
        } => {
            assert_eq!(description, "backup");
            assert_eq!(failed, 1);
            assert_eq!(total, 3);
        }
        other => panic!("expected PartialFailure, got {other:?}"),
    }
    assert!(a.succeeded());
    assert!(c.succeeded());
    assert!(!b.succeeded());
    assert_eq!(b.attempts(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn nested_tree_runs_every_leaf_once() {
    let sched = scheduler(2);
    let leaves: Vec<Arc<ScriptedJob>> = (0..5)
        .map(|i| Arc::new(ScriptedJob::new(&format!("leaf {i}"), 0, None)))
        .collect();
    let inner = Job::composite(CompositeJob::new(
        "inner",
        leaves[2..].iter().cloned().map(Job::Discrete).collect(),
    ));
    let tree = Job::composite(CompositeJob::new(
        "outer",
        vec![
            Job::Discrete(Arc::clone(&leaves[0])),
            inner,
            Job::Discrete(Arc::clone(&leaves[1])),
        ],
    ));
    assert_eq!(tree.leaves().len(), 5);

    sched.schedule_job(tree).await.unwrap();
    for leaf in &leaves {
        assert_eq!(leaf.attempts(), 1);
        assert!(leaf.succeeded());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn wide_tree_executes_at_most_the_ceiling() {
    let executor = ScriptedExecutor {
        delay: Duration::from_millis(20),
        ..ScriptedExecutor::default()
    };
    let executor = Arc::new(executor);
    let work = BoundedScheduler::new(2).unwrap();
    let sched = JobScheduler::with_shared_executor(Arc::clone(&executor), work);
    let children = (0..8)
        .map(|i| Job::discrete(ScriptedJob::new(&format!("leaf {i}"), 0, None)))
        .collect();
    sched
        .schedule_job(Job::composite(CompositeJob::new("wide", children)))
        .await
        .unwrap();
    assert!(executor.peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn composite_cancellation_wins_over_failures() {
    let sched = scheduler(2);
    let root = Arc::new(JobProgress::new());
    let ok = Arc::new(ScriptedJob::new("ok", 0, None));
    let bad = Arc::new(ScriptedJob::new("bad", usize::MAX, None));
    let children = vec![
        Job::Discrete(Arc::clone(&ok)),
        Job::Discrete(Arc::clone(&bad)),
    ];
    let tree = Job::composite(
        CompositeJob::new("cancelled tree", children).with_progress(Arc::clone(&root)),
    );
    // Cancelling the composite's own signal does not reach children that
    // don't share it: they still run to completion.
    root.cancellation().cancel();

    let err = sched.schedule_job(tree).await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(ok.succeeded());
    assert_eq!(bad.attempts(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shared_cancellation_stops_descendants_before_execution() {
    let sched = scheduler(1);
    let root = Arc::new(JobProgress::new());
    let child_token = root.cancellation().child_token();
    let child_progress = JobProgress::new().with_cancellation(child_token);
    let leaf = Arc::new(ScriptedJob::new("leaf", 0, Some(child_progress)));
    let tree = Job::composite(
        CompositeJob::new("tree", vec![Job::Discrete(Arc::clone(&leaf))])
            .with_progress(Arc::clone(&root)),
    );
    root.cancellation().cancel();

    let err = sched.schedule_job(tree).await.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(leaf.attempts(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn composite_progress_is_reset_before_children_run() {
    let sched = scheduler(1);
    let root = Arc::new(JobProgress::new());
    root.update(0.75);
    let leaf = Job::discrete(ScriptedJob::new("leaf", 0, None));
    let tree = Job::composite(
        CompositeJob::new("tree", vec![leaf]).with_progress(Arc::clone(&root)),
    );
    sched.schedule_job(tree).await.unwrap();
    assert_eq!(root.progress(), 0.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn empty_composite_succeeds() {
    let sched = scheduler(1);
    let tree = Job::composite(CompositeJob::new("nothing", vec![]));
    sched.schedule_job(tree).await.unwrap();
}
