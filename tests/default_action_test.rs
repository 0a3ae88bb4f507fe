//! Default-action coupling tests: automatic relaunch of fallback actions.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use action_arbiter::builders::ArbiterBuilder;
use action_arbiter::config::ArbiterConfig;
use action_arbiter::core::{
    Arbiter, InMemoryEventSink, Resource, SchedulingDecision, UseRequest, DEFAULT_ACTION_NAME,
};
use action_arbiter::runtime::TokioSpawner;

fn start() -> Arbiter {
    let spawner = TokioSpawner::from_current().expect("test runs inside a runtime");
    let (arbiter, runner) = Arbiter::new(spawner);
    tokio::spawn(runner.run());
    arbiter
}

async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    settle().await;
}

/// A resource whose default action bumps a counter and then holds the
/// resource until evicted, like a real subsystem's hold-position default.
fn counting_default(name: &str, calls: Arc<AtomicUsize>) -> Arc<Resource> {
    Arc::new(Resource::new(name).with_default_action(move |_cx| {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::pending::<()>().await;
            Ok(())
        }
    }))
}

#[tokio::test(start_paused = true)]
async fn default_starts_once_after_release() {
    let arbiter = start();
    let calls = Arc::new(AtomicUsize::new(0));
    let resource = counting_default("Resource", calls.clone());

    let a = arbiter.clone();
    let r = resource.clone();
    tokio::spawn(async move {
        a.use_resources(UseRequest::new([r]).named("Action"), |_cx| async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            Ok(())
        })
        .await
    });
    settle().await;
    assert!(resource.is_in_use());
    assert!(!resource.is_running_default());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    advance(1).await;
    assert!(resource.is_running_default());
    assert_eq!(
        resource.current_action_name().as_deref(),
        Some(DEFAULT_ACTION_NAME)
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn default_keeps_running_without_relaunching() {
    let arbiter = start();
    let calls = Arc::new(AtomicUsize::new(0));
    let resource = counting_default("Resource", calls.clone());

    let a = arbiter.clone();
    let r = resource.clone();
    tokio::spawn(async move {
        a.use_resources(UseRequest::new([r]).named("Action"), |_cx| async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            Ok(())
        })
        .await
    });
    advance(1).await;
    assert!(resource.is_running_default());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    advance(1).await;
    assert!(resource.is_running_default());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn default_is_evicted_and_relaunched_between_actions() {
    let arbiter = start();
    let calls = Arc::new(AtomicUsize::new(0));
    let resource = counting_default("Resource", calls.clone());

    let a = arbiter.clone();
    let r = resource.clone();
    tokio::spawn(async move {
        a.use_resources(UseRequest::new([r]).named("Action"), |_cx| async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            Ok(())
        })
        .await
    });
    advance(1).await;
    assert!(resource.is_running_default());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // An authorized claim evicts the default.
    let a = arbiter.clone();
    let r = resource.clone();
    tokio::spawn(async move {
        a.use_resources(
            UseRequest::new([r])
                .named("Override Action")
                .cancel_conflicts(true),
            |_cx| async {
                tokio::time::sleep(Duration::from_millis(1)).await;
                Ok(())
            },
        )
        .await
    });
    settle().await;
    assert_eq!(
        resource.current_action_name().as_deref(),
        Some("Override Action")
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // And when the override releases, the default comes back exactly once.
    advance(1).await;
    assert!(resource.is_running_default());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn resource_without_default_stays_free() {
    let arbiter = start();
    let resource = Arc::new(Resource::new("Resource"));
    assert!(!resource.has_default());

    let outcome = arbiter
        .use_resources(UseRequest::new([resource.clone()]).named("Action"), |_cx| async {
            Ok(())
        })
        .await;
    assert!(outcome.is_ok());

    settle().await;
    assert!(resource.is_free());
    assert!(!resource.is_running_default());
}

#[tokio::test(start_paused = true)]
async fn scheduling_decisions_are_recorded_in_order() {
    let sink = InMemoryEventSink::new(64);
    let spawner = TokioSpawner::from_current().expect("test runs inside a runtime");
    let (arbiter, runner) = ArbiterBuilder::new()
        .config(ArbiterConfig::default())
        .event_sink(Box::new(sink.clone()))
        .build(spawner)
        .expect("valid configuration");
    tokio::spawn(runner.run());

    let calls = Arc::new(AtomicUsize::new(0));
    let resource = counting_default("Resource", calls);

    let a = arbiter.clone();
    let r = resource.clone();
    tokio::spawn(async move {
        a.use_resources(UseRequest::new([r]).named("Action"), |_cx| async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            Ok(())
        })
        .await
    });
    advance(1).await;
    assert!(resource.is_running_default());

    let decisions: Vec<_> = sink
        .events()
        .into_iter()
        .map(|event| (event.action, event.decision))
        .collect();
    assert_eq!(
        decisions,
        vec![
            ("Action".to_string(), SchedulingDecision::Admitted),
            ("Action".to_string(), SchedulingDecision::Released),
            (
                DEFAULT_ACTION_NAME.to_string(),
                SchedulingDecision::DefaultScheduled
            ),
            (
                DEFAULT_ACTION_NAME.to_string(),
                SchedulingDecision::Admitted
            ),
        ]
    );
}
