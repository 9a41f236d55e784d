#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tillguard_core::{
    AccessGuard, KeyValueStore, ManualClock, MemoryStore, SharedRoute, StaticVerifier,
};

const PIN: &str = "4827163";

#[derive(Arbitrary, Debug)]
enum Event {
    Submit(bool),
    RequestTemporal,
    Logout,
    Navigate(u8),
    Tick(u16),
    Reload,
    CorruptRecord(String),
}

fuzz_target!(|events: Vec<Event>| {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    let store = Arc::new(MemoryStore::new());
    let route = SharedRoute::new("/0");
    let clock = Arc::new(ManualClock::new(1_735_689_600_000));
    let mount = || {
        AccessGuard::builder(
            Arc::new(StaticVerifier::new(PIN)),
            store.clone(),
            Arc::new(route.clone()),
        )
        .clock(clock.clone())
        .mount()
    };

    let mut guard = mount();
    for event in events.into_iter().take(256) {
        match event {
            Event::Submit(correct) => {
                let pin = if correct { PIN } else { "0000000" };
                runtime.block_on(guard.submit_pin(pin));
            }
            Event::RequestTemporal => {
                guard.request_temporary_unlock();
            }
            Event::Logout => {
                guard.logout();
            }
            Event::Navigate(n) => {
                route.set(format!("/{}", n % 4));
                guard.sync_route();
            }
            Event::Tick(secs) => {
                for _ in 0..(secs % 4000) {
                    clock.advance_secs(1);
                    guard.tick_lockout();
                    guard.tick_temporary_unlock();
                }
            }
            Event::Reload => guard = mount(),
            Event::CorruptRecord(raw) => {
                store.set("temp_unlock_until", &raw).unwrap();
                guard = mount();
            }
        }

        let state = guard.state();
        let flags = [
            state.is_locked,
            state.session_authorized,
            state.temporary_unlock_active,
        ];
        assert!(flags.iter().filter(|f| **f).count() <= 1);
        assert!(state.failed_attempts <= 3);
        assert_eq!(state.is_locked, state.failed_attempts == 3);
        assert!(state.temporary_unlock_remaining_seconds <= 3600);

        // Drain so the queue stays bounded
        guard.take_notifications();
    }
});
