#![allow(clippy::unwrap_used)] // Tests can use unwrap for brevity
#![allow(clippy::expect_used)] // Tests can use expect for better error messages

use super::*;
use crate::server::{create_metrics, HostState};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Scripted checker - returns a configured outcome per host name
///
/// Unscripted hosts are up. Every check is recorded with the (tokio) time
/// it started, so tests can assert on order and cadence.
struct ScriptedChecker {
    outcomes: Mutex<HashMap<String, Result<(), CheckError>>>,
    delay: Duration,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedChecker {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(HashMap::new()),
            delay,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn set(&self, host: &str, outcome: Result<(), CheckError>) {
        self.outcomes
            .lock()
            .unwrap()
            .insert(host.to_string(), outcome);
    }

    fn calls(&self) -> Vec<(String, Instant)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HostChecker for ScriptedChecker {
    async fn check(&self, target: &Target) -> Result<(), CheckError> {
        self.calls
            .lock()
            .unwrap()
            .push((target.name.clone(), Instant::now()));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.outcomes
            .lock()
            .unwrap()
            .get(&target.name)
            .cloned()
            .unwrap_or(Ok(()))
    }
}

fn targets(names: &[&str]) -> Vec<Target> {
    names
        .iter()
        .map(|name| Target {
            name: name.to_string(),
            url: format!("http://{name}.test"),
        })
        .collect()
}

fn poller(
    interval: Duration,
    names: &[&str],
    checker: Arc<ScriptedChecker>,
) -> (Poller, SharedMetrics, ReadinessState) {
    let metrics = create_metrics().expect("metrics");
    let readiness = ReadinessState::new();
    let config = PollConfig {
        interval,
        timeout: Duration::from_secs(10),
        targets: targets(names),
    };
    let poller = Poller::new(config, metrics.clone(), readiness.clone(), checker);
    (poller, metrics, readiness)
}

fn refused() -> Result<(), CheckError> {
    Err(CheckError::Transport("connection refused".to_string()))
}

#[test]
fn test_sleep_for_subtracts_elapsed() {
    assert_eq!(
        sleep_for(Duration::from_millis(100), Duration::from_millis(30)),
        Duration::from_millis(70)
    );
}

#[test]
fn test_sleep_for_overrun_is_zero() {
    assert_eq!(
        sleep_for(Duration::from_millis(100), Duration::from_millis(150)),
        Duration::ZERO
    );
    assert_eq!(
        sleep_for(Duration::from_millis(100), Duration::from_millis(100)),
        Duration::ZERO
    );
}

#[tokio::test]
async fn test_one_cycle_records_up_and_down_hosts() {
    let checker = ScriptedChecker::new(Duration::ZERO);
    checker.set("b", refused());
    let (poller, metrics, _) = poller(Duration::from_secs(1), &["a", "b"], checker);

    poller.run_cycle().await;

    assert_eq!(metrics.host_state("a"), HostState::Up);
    assert_eq!(metrics.host_state("b"), HostState::Down);

    let text = metrics.encode().unwrap();
    assert!(text.contains(r#"pingz_host_up{host="a"} 1"#), "{text}");
    assert!(text.contains(r#"pingz_host_up{host="b"} 0"#), "{text}");
}

#[tokio::test]
async fn test_host_recovers_on_next_cycle() {
    let checker = ScriptedChecker::new(Duration::ZERO);
    checker.set("b", refused());
    let (poller, metrics, _) = poller(Duration::from_secs(1), &["a", "b"], checker.clone());

    poller.run_cycle().await;
    assert_eq!(metrics.host_state("b"), HostState::Down);

    checker.set("b", Ok(()));
    poller.run_cycle().await;

    assert_eq!(metrics.host_state("b"), HostState::Up);
}

#[tokio::test]
async fn test_host_goes_down_after_being_up() {
    let checker = ScriptedChecker::new(Duration::ZERO);
    let (poller, metrics, _) = poller(Duration::from_secs(1), &["a"], checker.clone());

    poller.run_cycle().await;
    assert_eq!(metrics.host_state("a"), HostState::Up);

    checker.set("a", Err(CheckError::Status(500)));
    poller.run_cycle().await;

    assert_eq!(metrics.host_state("a"), HostState::Down);
}

#[tokio::test]
async fn test_503_is_down_like_a_transport_error() {
    let checker = ScriptedChecker::new(Duration::ZERO);
    checker.set("status", Err(CheckError::Status(503)));
    checker.set("transport", refused());
    let (poller, metrics, _) =
        poller(Duration::from_secs(1), &["status", "transport"], checker);

    poller.run_cycle().await;

    assert_eq!(metrics.host_state("status"), HostState::Down);
    assert_eq!(metrics.host_state("transport"), HostState::Down);
}

#[tokio::test]
async fn test_failing_host_does_not_affect_others() {
    let checker = ScriptedChecker::new(Duration::ZERO);
    checker.set("b", refused());
    let (poller, metrics, _) = poller(Duration::from_secs(1), &["a", "b", "c"], checker);

    for _ in 0..3 {
        poller.run_cycle().await;

        assert_eq!(metrics.host_state("a"), HostState::Up);
        assert_eq!(metrics.host_state("b"), HostState::Down);
        assert_eq!(metrics.host_state("c"), HostState::Up);
    }
}

#[tokio::test]
async fn test_hosts_are_checked_in_config_order() {
    let checker = ScriptedChecker::new(Duration::ZERO);
    let (poller, _, _) = poller(Duration::from_secs(1), &["z", "a", "m"], checker.clone());

    poller.run_cycle().await;
    poller.run_cycle().await;

    let names: Vec<_> = checker.calls().into_iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["z", "a", "m", "z", "a", "m"]);
}

#[tokio::test]
async fn test_first_cycle_marks_ready_and_is_counted() {
    let checker = ScriptedChecker::new(Duration::ZERO);
    let (poller, metrics, readiness) = poller(Duration::from_secs(1), &["a"], checker);
    assert!(!readiness.is_ready());
    assert_eq!(metrics.host_state("a"), HostState::Unknown);

    poller.run_cycle().await;

    assert!(readiness.is_ready());
    assert_eq!(metrics.cycles(), 1);
}

#[tokio::test]
async fn test_empty_target_list_still_completes_cycles() {
    let checker = ScriptedChecker::new(Duration::ZERO);
    let (poller, metrics, readiness) = poller(Duration::from_secs(1), &[], checker);

    poller.run_cycle().await;

    assert!(readiness.is_ready());
    assert_eq!(metrics.cycles(), 1);
}

/// Cycle start times recorded by the checker for the first host
fn cycle_starts(checker: &ScriptedChecker, first_host: &str) -> Vec<Instant> {
    checker
        .calls()
        .into_iter()
        .filter(|(name, _)| name == first_host)
        .map(|(_, at)| at)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_overrunning_cycle_starts_next_immediately() {
    // Checking takes 150ms against a 100ms interval.
    let checker = ScriptedChecker::new(Duration::from_millis(150));
    let (poller, _, _) = poller(Duration::from_millis(100), &["a"], checker.clone());

    let handle = tokio::spawn(async move { poller.run().await });
    tokio::time::sleep(Duration::from_millis(460)).await;
    handle.abort();

    let starts = cycle_starts(&checker, "a");
    assert!(starts.len() >= 3, "expected at least 3 cycles, got {}", starts.len());
    for pair in starts.windows(2) {
        assert_eq!(
            pair[1] - pair[0],
            Duration::from_millis(150),
            "next cycle must start right after the previous one ends"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_fast_cycle_waits_out_the_interval() {
    // Two hosts at 20ms each: 40ms of work per 100ms interval.
    let checker = ScriptedChecker::new(Duration::from_millis(20));
    let (poller, _, _) = poller(Duration::from_millis(100), &["a", "b"], checker.clone());

    let handle = tokio::spawn(async move { poller.run().await });
    tokio::time::sleep(Duration::from_millis(350)).await;
    handle.abort();

    let starts = cycle_starts(&checker, "a");
    assert!(starts.len() >= 3, "expected at least 3 cycles, got {}", starts.len());
    for pair in starts.windows(2) {
        assert_eq!(pair[1] - pair[0], Duration::from_millis(100));
    }
}

#[tokio::test(start_paused = true)]
async fn test_slow_host_delays_later_hosts_in_same_cycle() {
    let checker = ScriptedChecker::new(Duration::from_millis(50));
    let (poller, _, _) = poller(Duration::from_secs(1), &["a", "b", "c"], checker.clone());

    poller.run_cycle().await;

    let calls = checker.calls();
    assert_eq!(calls[1].1 - calls[0].1, Duration::from_millis(50));
    assert_eq!(calls[2].1 - calls[1].1, Duration::from_millis(50));
}

/// End to end: real HTTP checks against an in-process target, scraped over HTTP.
#[tokio::test]
async fn test_real_checks_show_up_in_scrape() {
    use axum::{routing::get, Router};
    use tokio::net::TcpListener;

    let target_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let target_addr = target_listener.local_addr().unwrap();
    let target_server = tokio::spawn(async move {
        let app = Router::new().route("/", get(|| async { "ok" }));
        let _ = axum::serve(target_listener, app).await;
    });

    let closed = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let closed_addr = closed.local_addr().unwrap();
    drop(closed);

    let metrics = create_metrics().unwrap();
    let readiness = ReadinessState::new();
    let config = PollConfig {
        interval: Duration::from_secs(1),
        timeout: Duration::from_secs(5),
        targets: vec![
            Target {
                name: "a".to_string(),
                url: format!("http://{target_addr}/"),
            },
            Target {
                name: "b".to_string(),
                url: format!("http://{closed_addr}/"),
            },
        ],
    };
    let checker = Arc::new(HttpChecker::new(config.timeout).unwrap());
    let poller = Poller::new(config, metrics.clone(), readiness.clone(), checker);

    poller.run_cycle().await;

    let metrics_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let metrics_addr = metrics_listener.local_addr().unwrap();
    let metrics_server = tokio::spawn(crate::server::serve(metrics_listener, readiness, metrics));

    let body = reqwest::get(format!("http://{metrics_addr}/metrics"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(body.contains(r#"pingz_host_up{host="a"} 1"#), "{body}");
    assert!(body.contains(r#"pingz_host_up{host="b"} 0"#), "{body}");

    metrics_server.abort();
    target_server.abort();
}
