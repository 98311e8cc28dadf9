//! Per-collaborator minimum inter-request interval and circuit breaker
//! (spec §4.2, §5). Module-level singletons by design (spec §9: "process-wide
//! components constructed at startup and passed by handle" would be the
//! purer shape, but the rate limiter and circuit breaker are explicitly
//! called out in spec §5 as the one piece of state shared across runs —
//! mirroring the teacher's `OnceLock`-backed shared HTTP client in
//! `cli/health.rs`).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

/// Process-wide cap on external collaborator calls for the run (spec §6
/// `max_external_calls_per_run`), enforced in `guarded_send`/`retry_send`
/// alongside the rate limiter and circuit breaker.
fn budget() -> &'static AtomicU32 {
    static BUDGET: OnceLock<AtomicU32> = OnceLock::new();
    BUDGET.get_or_init(|| AtomicU32::new(u32::MAX))
}

/// Sets the remaining external-call budget for the run. Call once at
/// startup before any collaborator client issues a request.
pub fn set_call_budget(max_calls: u32) {
    budget().store(max_calls, Ordering::SeqCst);
}

/// Consumes one unit of the call budget. Returns `false` once the budget is
/// exhausted, in which case the caller must not perform the network call.
pub fn take_call_budget() -> bool {
    loop {
        let remaining = budget().load(Ordering::SeqCst);
        if remaining == 0 {
            return false;
        }
        if budget()
            .compare_exchange(remaining, remaining - 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            return true;
        }
    }
}

#[cfg(test)]
pub fn reset_call_budget_for_test() {
    budget().store(u32::MAX, Ordering::SeqCst);
}

#[derive(Debug, Default)]
struct ApiState {
    last_request: Option<Instant>,
    consecutive_failures: u32,
    open: bool,
}

fn registry() -> &'static Mutex<HashMap<String, ApiState>> {
    static REGISTRY: OnceLock<Mutex<HashMap<String, ApiState>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Default minimum inter-request interval per collaborator, keyed by the
/// short API tag each `sources::*` client passes to `retry_send`/`wait`.
/// Per spec §4.2: 3.0s for the drug-mechanism DB, none for ontology lookups.
pub fn default_min_interval(api: &str) -> Duration {
    match api {
        "chembl" => Duration::from_secs_f64(3.0),
        _ => Duration::ZERO,
    }
}

/// Blocks until at least `min_interval` has elapsed since the last
/// completed request for `api`.
pub async fn wait(api: &str, min_interval: Duration) {
    if min_interval.is_zero() {
        return;
    }
    loop {
        let sleep_for = {
            let mut guard = registry().lock().expect("rate limiter lock poisoned");
            let state = guard.entry(api.to_string()).or_default();
            match state.last_request {
                Some(last) => {
                    let elapsed = last.elapsed();
                    if elapsed >= min_interval {
                        state.last_request = Some(Instant::now());
                        None
                    } else {
                        Some(min_interval - elapsed)
                    }
                }
                None => {
                    state.last_request = Some(Instant::now());
                    None
                }
            }
        };
        match sleep_for {
            Some(duration) => tokio::time::sleep(duration).await,
            None => return,
        }
    }
}

/// Convenience wrapper that derives the minimum interval from the
/// collaborator tag's default table.
pub async fn wait_for_api(api: &str) {
    wait(api, default_min_interval(api)).await;
}

pub fn is_open(api: &str) -> bool {
    registry()
        .lock()
        .expect("rate limiter lock poisoned")
        .get(api)
        .map(|s| s.open)
        .unwrap_or(false)
}

pub fn record_success(api: &str) {
    let mut guard = registry().lock().expect("rate limiter lock poisoned");
    let state = guard.entry(api.to_string()).or_default();
    state.consecutive_failures = 0;
    state.open = false;
}

/// Records a failure; opens the breaker once `DEFAULT_FAILURE_THRESHOLD`
/// consecutive failures have been observed. Returns whether the breaker is
/// now open.
pub fn record_failure(api: &str) -> bool {
    let mut guard = registry().lock().expect("rate limiter lock poisoned");
    let state = guard.entry(api.to_string()).or_default();
    state.consecutive_failures += 1;
    if state.consecutive_failures >= DEFAULT_FAILURE_THRESHOLD {
        state.open = true;
    }
    state.open
}

#[cfg(test)]
pub fn reset_for_test(api: &str) {
    registry()
        .lock()
        .expect("rate limiter lock poisoned")
        .remove(api);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wait_enforces_minimum_gap() {
        reset_for_test("test.gap");
        let start = Instant::now();
        wait("test.gap", Duration::from_millis(50)).await;
        wait("test.gap", Duration::from_millis(50)).await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn call_budget_is_exhausted_after_max_calls() {
        set_call_budget(2);
        assert!(take_call_budget());
        assert!(take_call_budget());
        assert!(!take_call_budget());
        reset_call_budget_for_test();
    }

    #[test]
    fn breaker_opens_after_threshold_and_resets_on_success() {
        reset_for_test("test.breaker");
        for _ in 0..DEFAULT_FAILURE_THRESHOLD - 1 {
            assert!(!record_failure("test.breaker"));
        }
        assert!(record_failure("test.breaker"));
        assert!(is_open("test.breaker"));

        record_success("test.breaker");
        assert!(!is_open("test.breaker"));
    }
}
