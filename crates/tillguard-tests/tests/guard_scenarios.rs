//! End-to-end guard scenarios
//!
//! Drives the guard the way the dashboard does: the router moves a shared
//! route, the operator submits PINs, and countdown ticks arrive once per
//! second.

use std::sync::Arc;
use std::time::Duration;

use tillguard_core::{
    AccessGuard, GuardDriver, GuardPhase, JsonFileStore, KeyValueStore, ManualClock, MemoryStore,
    Notification, SharedRoute, StaticVerifier, SubmitOutcome,
};

const PIN: &str = "4827163";
const WRONG: &str = "0000000";
const KEY: &str = "temp_unlock_until";
const START_MS: i64 = 1_735_689_600_000;

struct Dashboard {
    store: Arc<dyn KeyValueStore>,
    route: SharedRoute,
    clock: Arc<ManualClock>,
}

impl Dashboard {
    fn new(start: &str) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), start)
    }

    fn with_store(store: Arc<dyn KeyValueStore>, start: &str) -> Self {
        Self {
            store,
            route: SharedRoute::new(start),
            clock: Arc::new(ManualClock::new(START_MS)),
        }
    }

    /// Mount a fresh guard over the same store, as a page reload would
    fn mount(&self) -> AccessGuard {
        AccessGuard::builder(
            Arc::new(StaticVerifier::new(PIN)),
            self.store.clone(),
            Arc::new(self.route.clone()),
        )
        .clock(self.clock.clone())
        .mount()
    }

    fn navigate(&self, guard: &mut AccessGuard, path: &str) {
        self.route.set(path);
        guard.sync_route();
    }

    /// Let `secs` seconds pass for both the wall clock and the countdowns
    fn wait(&self, guard: &mut AccessGuard, secs: u64) {
        for _ in 0..secs {
            self.clock.advance_secs(1);
            guard.tick_lockout();
            guard.tick_temporary_unlock();
        }
    }
}

// ==========================================
// Scenario A: three wrong PINs lock the form
// ==========================================

#[tokio::test]
async fn scenario_a_lockout_ignores_further_submissions() {
    let dashboard = Dashboard::new("/accounts");
    let mut guard = dashboard.mount();

    assert_eq!(
        guard.submit_pin(WRONG).await,
        SubmitOutcome::Rejected {
            attempts_remaining: 2
        }
    );
    assert_eq!(
        guard.submit_pin(WRONG).await,
        SubmitOutcome::Rejected {
            attempts_remaining: 1
        }
    );
    assert_eq!(
        guard.submit_pin(WRONG).await,
        SubmitOutcome::LockedOut {
            remaining_secs: 300
        }
    );

    let notifications = guard.take_notifications();
    assert_eq!(
        notifications.last(),
        Some(&Notification::LockedOut {
            remaining_secs: 300
        })
    );

    let before = guard.state();
    assert_eq!(guard.submit_pin(PIN).await, SubmitOutcome::Ignored);
    assert_eq!(guard.state(), before);
    assert!(!guard.is_content_visible());
    assert!(guard.take_notifications().is_empty());
}

// ==========================================
// Scenario B: a session covers one route only
// ==========================================

#[tokio::test]
async fn scenario_b_session_ends_on_navigation() {
    let dashboard = Dashboard::new("/accounts");
    let mut guard = dashboard.mount();

    assert_eq!(
        guard.submit_pin(PIN).await,
        SubmitOutcome::Granted {
            route: "/accounts".to_string()
        }
    );
    assert_eq!(
        guard.phase(),
        &GuardPhase::Authorized {
            route: "/accounts".to_string()
        }
    );
    guard.take_notifications();

    dashboard.navigate(&mut guard, "/customers");
    assert_eq!(guard.phase(), &GuardPhase::AwaitingInput);
    assert_eq!(
        guard.take_notifications(),
        vec![Notification::SessionEnded {
            route: "/accounts".to_string()
        }]
    );
}

// ==========================================
// Scenario C: temporal request opens a persisted window
// ==========================================

#[tokio::test]
async fn scenario_c_temporal_unlock_is_persisted() {
    let dashboard = Dashboard::new("/finances");
    let mut guard = dashboard.mount();

    guard.request_temporary_unlock();
    assert_eq!(
        guard.submit_pin(PIN).await,
        SubmitOutcome::TemporaryUnlockGranted {
            remaining_secs: 3600
        }
    );

    let state = guard.state();
    assert!(state.temporary_unlock_active);
    assert_eq!(state.temporary_unlock_remaining_seconds, 3600);

    let stored: i64 = dashboard.store.get(KEY).unwrap().unwrap().parse().unwrap();
    assert!((stored - (START_MS + 3_600_000)).abs() <= 1_000);
}

// ==========================================
// Scenario D: logout with ten seconds left
// ==========================================

#[tokio::test]
async fn scenario_d_logout_clears_window() {
    let dashboard = Dashboard::new("/finances");
    let mut guard = dashboard.mount();

    guard.request_temporary_unlock();
    guard.submit_pin(PIN).await;
    dashboard.wait(&mut guard, 3590);
    assert_eq!(guard.state().temporary_unlock_remaining_seconds, 10);

    assert!(guard.logout());
    assert_eq!(guard.phase(), &GuardPhase::AwaitingInput);
    assert_eq!(dashboard.store.get(KEY).unwrap(), None);

    dashboard.wait(&mut guard, 20);
    assert!(!guard
        .take_notifications()
        .contains(&Notification::TemporaryUnlockExpired));
}

// ==========================================
// Properties
// ==========================================

#[tokio::test]
async fn returning_to_granted_route_needs_a_new_pin() {
    let dashboard = Dashboard::new("/a");
    let mut guard = dashboard.mount();

    guard.submit_pin(PIN).await;
    dashboard.navigate(&mut guard, "/b");
    assert!(!guard.is_content_visible());

    dashboard.navigate(&mut guard, "/a");
    assert!(!guard.is_content_visible());
    assert_eq!(guard.phase(), &GuardPhase::AwaitingInput);
}

#[tokio::test]
async fn temporary_unlock_holds_across_routes_until_expiry() {
    let dashboard = Dashboard::new("/accounts");
    let mut guard = dashboard.mount();

    guard.request_temporary_unlock();
    guard.submit_pin(PIN).await;

    for path in ["/customers", "/employees", "/finances", "/orders", "/reports"] {
        dashboard.navigate(&mut guard, path);
        assert!(guard.is_content_visible(), "hidden on {}", path);
        dashboard.wait(&mut guard, 600);
    }
    assert!(guard.is_content_visible());

    dashboard.wait(&mut guard, 599);
    assert!(guard.is_content_visible());

    dashboard.wait(&mut guard, 1);
    assert!(!guard.is_content_visible());
    assert_eq!(dashboard.store.get(KEY).unwrap(), None);
}

#[tokio::test]
async fn reload_resumes_then_expires_window() {
    let dashboard = Dashboard::new("/accounts");
    let mut guard = dashboard.mount();
    guard.request_temporary_unlock();
    guard.submit_pin(PIN).await;
    drop(guard);

    dashboard.clock.advance_secs(1234);
    let reloaded = dashboard.mount();
    assert_eq!(
        reloaded.phase(),
        &GuardPhase::TemporarilyUnlocked {
            remaining_secs: 3600 - 1234
        }
    );
    drop(reloaded);

    dashboard.clock.advance_secs(3600);
    let mut expired = dashboard.mount();
    assert_eq!(expired.phase(), &GuardPhase::AwaitingInput);
    assert!(!expired.is_content_visible());
    assert_eq!(dashboard.store.get(KEY).unwrap(), None);
}

#[tokio::test]
async fn reload_from_file_store() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("store.json");

    let dashboard =
        Dashboard::with_store(Arc::new(JsonFileStore::new(&path).unwrap()), "/accounts");
    let mut guard = dashboard.mount();
    guard.request_temporary_unlock();
    guard.submit_pin(PIN).await;
    drop(guard);

    // Fresh store instance over the same file
    let reopened = Dashboard {
        store: Arc::new(JsonFileStore::new(&path).unwrap()),
        route: SharedRoute::new("/employees"),
        clock: dashboard.clock.clone(),
    };
    dashboard.clock.advance_secs(60);

    let mut guard = reopened.mount();
    assert_eq!(guard.state().temporary_unlock_remaining_seconds, 3540);
    assert!(guard.is_content_visible());
}

#[tokio::test]
async fn requesting_temporal_unlock_twice_grants_one_window() {
    let dashboard = Dashboard::new("/accounts");
    let mut guard = dashboard.mount();

    assert!(guard.request_temporary_unlock());
    assert!(guard.request_temporary_unlock());
    assert_eq!(
        guard.take_notifications(),
        vec![Notification::TemporaryUnlockRequested]
    );

    guard.submit_pin(PIN).await;
    assert_eq!(guard.state().temporary_unlock_remaining_seconds, 3600);
    assert!(!guard.pending_temporal_request());

    // Window over, the next PIN opens a plain session
    dashboard.wait(&mut guard, 3600);
    assert_eq!(
        guard.submit_pin(PIN).await,
        SubmitOutcome::Granted {
            route: "/accounts".to_string()
        }
    );
}

#[tokio::test]
async fn lockout_expiry_reopens_form() {
    let dashboard = Dashboard::new("/accounts");
    let mut guard = dashboard.mount();

    for _ in 0..3 {
        guard.submit_pin(WRONG).await;
    }
    dashboard.wait(&mut guard, 299);
    assert!(guard.state().is_locked);
    assert_eq!(guard.state().lockout_remaining_seconds, 1);

    dashboard.wait(&mut guard, 1);
    let state = guard.state();
    assert!(!state.is_locked);
    assert_eq!(state.failed_attempts, 0);
    assert!(guard.take_notifications().contains(&Notification::LockoutEnded));

    assert_eq!(
        guard.submit_pin(WRONG).await,
        SubmitOutcome::Rejected {
            attempts_remaining: 2
        }
    );
}

#[tokio::test]
async fn temporal_request_ignored_while_locked() {
    let dashboard = Dashboard::new("/accounts");
    let mut guard = dashboard.mount();

    for _ in 0..3 {
        guard.submit_pin(WRONG).await;
    }
    assert!(!guard.request_temporary_unlock());
    assert!(!guard.pending_temporal_request());
}

#[tokio::test]
async fn lockout_is_not_persisted() {
    let dashboard = Dashboard::new("/accounts");
    let mut guard = dashboard.mount();

    for _ in 0..3 {
        guard.submit_pin(WRONG).await;
    }
    assert!(guard.state().is_locked);
    drop(guard);

    let reloaded = dashboard.mount();
    assert_eq!(reloaded.phase(), &GuardPhase::AwaitingInput);
    assert_eq!(reloaded.failed_attempts(), 0);
}

// ==========================================
// Driver with real timers
// ==========================================

#[tokio::test(start_paused = true)]
async fn driver_runs_full_day_at_the_counter() {
    let route = SharedRoute::new("/orders");
    let store = Arc::new(MemoryStore::new());
    let guard = AccessGuard::builder(
        Arc::new(StaticVerifier::new(PIN)),
        store.clone(),
        Arc::new(route.clone()),
    )
    .clock(Arc::new(ManualClock::new(START_MS)))
    .mount();
    let (handle, task) = GuardDriver::spawn(guard);
    let mut notifications = handle.subscribe();

    // Clerk fumbles the PIN and gets locked out
    for _ in 0..3 {
        handle.submit_pin(WRONG).await.unwrap();
    }
    assert_eq!(handle.submit_pin(PIN).await.unwrap(), SubmitOutcome::Ignored);
    tokio::time::sleep(Duration::from_millis(300_500)).await;

    // Manager opens the hour-long window
    assert!(handle.request_temporary_unlock().await.unwrap());
    assert_eq!(
        handle.submit_pin(PIN).await.unwrap(),
        SubmitOutcome::TemporaryUnlockGranted {
            remaining_secs: 3600
        }
    );

    route.set("/employees");
    handle.route_changed().await.unwrap();
    assert!(handle.is_content_visible().await.unwrap());

    tokio::time::sleep(Duration::from_secs(3601)).await;
    assert!(!handle.is_content_visible().await.unwrap());
    assert_eq!(store.get(KEY).unwrap(), None);

    handle.shutdown().await.unwrap();
    task.await.unwrap();

    let mut seen = Vec::new();
    while let Ok(notification) = notifications.try_recv() {
        seen.push(notification);
    }
    assert_eq!(
        seen,
        vec![
            Notification::PinRejected {
                attempts_remaining: 2
            },
            Notification::PinRejected {
                attempts_remaining: 1
            },
            Notification::LockedOut {
                remaining_secs: 300
            },
            Notification::LockoutEnded,
            Notification::TemporaryUnlockRequested,
            Notification::TemporaryUnlockGranted {
                remaining_secs: 3600
            },
            Notification::TemporaryUnlockExpired,
        ]
    );
}
