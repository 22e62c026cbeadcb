use crate::client::{HttpClient, DEFAULT_REQUEST_TIMEOUT};
use crate::profile::UserBehaviorProfile;
use crate::statistics::{RequestStats, RunReport};
use crate::transport::Transport;
use crate::user::HttpUser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub users: usize,
    /// Users started per second.
    pub spawn_rate: f64,
    pub run_time: Option<Duration>,
    /// Tasks each user runs before it stops on its own.
    pub iterations: Option<usize>,
    pub request_timeout: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            users: 1,
            spawn_rate: 1.0,
            run_time: None,
            iterations: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Drives `options.users` instances of `profile` until `stop` flips to `true`,
/// the run time elapses or every user has used up its iterations.
pub async fn run(
    profile: Arc<UserBehaviorProfile>,
    transport: Arc<dyn Transport>,
    options: RunOptions,
    stop: watch::Receiver<bool>,
) -> anyhow::Result<RunReport> {
    let start = Instant::now();
    let (halt_tx, halt_rx) = watch::channel(false);
    let mut running = AbortOnDrop(vec![
        tokio::spawn(halt_on_stop(options.run_time, stop, halt_tx)).abort_handle(),
    ]);
    info!(
        user_class = profile.name(),
        host = %profile.host(),
        users = options.users,
        spawn_rate = options.spawn_rate,
        "starting run"
    );

    // A rate that is not positive and finite spawns everyone at once.
    let spawn_interval =
        Duration::try_from_secs_f64(1.0 / options.spawn_rate).unwrap_or(Duration::ZERO);
    let mut halted = halt_rx.clone();
    let mut tasks = Vec::with_capacity(options.users);
    for id in 0..options.users {
        if id > 0 {
            tokio::select! {
                () = tokio::time::sleep(spawn_interval) => {}
                () = wait_halted(&mut halted) => break,
            }
        }
        if *halted.borrow() {
            break;
        }
        let client = HttpClient::new(
            profile.host().clone(),
            transport.clone(),
            options.request_timeout,
        );
        let handle = tokio::spawn(run_user(
            id,
            profile.clone(),
            HttpUser::new(client),
            options.iterations,
            halt_rx.clone(),
        ));
        running.0.push(handle.abort_handle());
        tasks.push(handle);
    }
    let spawned = tasks.len();
    debug!(spawned, "all users spawned");

    let mut stats = RequestStats::default();
    for (id, t) in tasks.into_iter().enumerate() {
        match t.await {
            Ok(user_stats) => stats.merge(&user_stats),
            Err(e) => {
                warn!(user = id, error = %e, "user task died, its requests are not counted");
            }
        }
    }
    drop(running);
    let report = RunReport::from_stats(profile.name(), spawned, start.elapsed(), &stats);
    info!(
        requests = report.aggregated.num_requests,
        failures = report.aggregated.num_failures,
        elapsed_secs = report.elapsed_secs,
        "run finished"
    );
    Ok(report)
}

async fn halt_on_stop(
    run_time: Option<Duration>,
    mut stop: watch::Receiver<bool>,
    halt: watch::Sender<bool>,
) {
    let deadline = async move {
        match run_time {
            Some(run_time) => tokio::time::sleep(run_time).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);
    tokio::select! {
        () = &mut deadline => info!("run time elapsed, stopping users"),
        stopped = async { stop.wait_for(|stopped| *stopped).await.is_ok() } => {
            if stopped {
                warn!("stop requested, stopping users");
            } else {
                // Stop sender went away, only the run time can end the run now.
                (&mut deadline).await;
                info!("run time elapsed, stopping users");
            }
        }
    }
    halt.send_replace(true);
}

/// Aborts the tracked tasks when dropped, so none outlive `run`.
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

async fn wait_halted(halt: &mut watch::Receiver<bool>) {
    let _ = halt.wait_for(|halt| *halt).await;
}

/// Task, idle, repeat. The idle wait is cut short by a halt.
pub(crate) async fn run_user(
    id: usize,
    profile: Arc<UserBehaviorProfile>,
    mut user: HttpUser,
    iterations: Option<usize>,
    mut halt: watch::Receiver<bool>,
) -> RequestStats {
    let mut rng = StdRng::from_entropy();
    let mut completed = 0;
    debug!(user = id, "user started");
    loop {
        if *halt.borrow() {
            break;
        }
        let Some(task) = profile.tasks().pick(&mut rng).copied() else {
            break;
        };
        if let Err(e) = task.run(&mut user).await {
            debug!(user = id, task = task.name(), error = %e, "task failed");
        }
        completed += 1;
        if iterations.is_some_and(|max| completed >= max) {
            break;
        }
        let wait = profile.wait_time().sample(&mut rng);
        tokio::select! {
            () = tokio::time::sleep(wait) => {}
            () = wait_halted(&mut halt) => break,
        }
    }
    debug!(user = id, completed, "user stopped");
    user.client.take_stats()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RequestError;
    use crate::task::{Task, TaskFuture};
    use crate::transport::RecordingTransport;
    use crate::user::{checkout_user, CHECKOUT_HOST};
    use crate::wait::WaitTime;

    fn fast_checkout() -> Arc<UserBehaviorProfile> {
        Arc::new(
            checkout_user()
                .unwrap()
                .with_wait_time(WaitTime::between(0.0, 0.005).unwrap()),
        )
    }

    #[tokio::test]
    async fn users_stop_after_iterations() {
        let transport = RecordingTransport::new();
        let (_stop_tx, stop_rx) = watch::channel(false);
        let options = RunOptions {
            users: 3,
            spawn_rate: 1000.0,
            iterations: Some(4),
            ..RunOptions::default()
        };
        let report = run(fast_checkout(), Arc::new(transport.clone()), options, stop_rx)
            .await
            .unwrap();
        assert_eq!(3, report.users);
        assert_eq!(12, report.aggregated.num_requests);
        assert_eq!(0, report.aggregated.num_failures);
        assert_eq!(12, report.endpoints["GET /checkout"].num_requests);
        assert_eq!(12, transport.captured().len());
    }

    #[tokio::test(start_paused = true)]
    async fn run_time_bounds_the_run() {
        let transport = RecordingTransport::new();
        let (_stop_tx, stop_rx) = watch::channel(false);
        let options = RunOptions {
            users: 2,
            spawn_rate: 1000.0,
            run_time: Some(Duration::from_millis(100)),
            ..RunOptions::default()
        };
        let profile = Arc::new(checkout_user().unwrap());
        let report = run(profile, Arc::new(transport.clone()), options, stop_rx)
            .await
            .unwrap();
        // Each user runs one task, then its 1..2s idle is interrupted.
        assert_eq!(2, report.aggregated.num_requests);
        assert!((0.1..1.0).contains(&report.elapsed_secs), "{}", report.elapsed_secs);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_signal_halts_idle_users() {
        let transport = RecordingTransport::new();
        let (stop_tx, stop_rx) = watch::channel(false);
        let profile = Arc::new(checkout_user().unwrap());
        let handle = tokio::spawn(run(
            profile,
            Arc::new(transport.clone()),
            RunOptions::default(),
            stop_rx,
        ));
        tokio::time::sleep(Duration::from_millis(50)).await;
        stop_tx.send_replace(true);
        let report = handle.await.unwrap().unwrap();
        assert_eq!(1, report.aggregated.num_requests);
        assert!((0.05..1.0).contains(&report.elapsed_secs), "{}", report.elapsed_secs);
    }

    #[tokio::test]
    async fn stop_before_spawn_skips_users() {
        let transport = RecordingTransport::new();
        let (_stop_tx, stop_rx) = watch::channel(true);
        let options = RunOptions {
            users: 5,
            spawn_rate: 0.5,
            ..RunOptions::default()
        };
        let profile = Arc::new(checkout_user().unwrap());
        let report = run(profile, Arc::new(transport.clone()), options, stop_rx)
            .await
            .unwrap();
        assert!(report.users <= 1, "{}", report.users);
        assert!(transport.captured().len() <= 1);
    }

    fn crashing_task(_: &mut HttpUser) -> TaskFuture<'_> {
        Box::pin(async {
            let cart: Option<u32> = None;
            let _ = cart.expect("cart vanished mid-checkout");
            Ok::<(), RequestError>(())
        })
    }

    #[tokio::test]
    async fn crashed_user_does_not_fail_the_run() {
        let profile = UserBehaviorProfile::new(
            "CrashingUser",
            CHECKOUT_HOST,
            WaitTime::constant(0.0).unwrap(),
            [Task::new("crash", crashing_task)],
        )
        .unwrap();
        let (_stop_tx, stop_rx) = watch::channel(false);
        let options = RunOptions {
            users: 2,
            spawn_rate: 1000.0,
            iterations: Some(1),
            ..RunOptions::default()
        };
        let report = run(
            Arc::new(profile),
            Arc::new(RecordingTransport::new()),
            options,
            stop_rx,
        )
        .await
        .unwrap();
        assert_eq!(2, report.users);
        assert_eq!(0, report.aggregated.num_requests);
    }
}
