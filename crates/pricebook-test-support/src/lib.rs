//! Pricebook Test Support — deterministic fakes for replica tests.
//!
//! Everything here implements the collaborator traits from `pricebook-core`
//! with fully controllable behavior: a live log that can be published to,
//! expired, and forcibly disconnected; a scripted log for exact delivery
//! sequences; a scripted archive with optional holes; and in-memory snapshot
//! stores with failure injection.

pub mod archive;
pub mod clock;
pub mod log;
pub mod record;
pub mod snapshot;

use std::future::Future;
use std::time::Duration;

/// Installs a test-writer tracing subscriber honoring `RUST_LOG`. Idempotent;
/// later calls in the same process are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Polls `condition` every few milliseconds until it holds.
///
/// # Panics
///
/// Panics if the condition does not hold within two seconds.
pub async fn wait_until<F>(description: &str, condition: F)
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting until: {description}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Awaits `future` with a two-second guard so a wedged test fails instead of
/// hanging the suite.
///
/// # Panics
///
/// Panics if the future does not complete within two seconds.
pub async fn within_deadline<F, T>(description: &str, future: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(Duration::from_secs(2), future).await {
        Ok(value) => value,
        Err(_) => panic!("timed out awaiting: {description}"),
    }
}
