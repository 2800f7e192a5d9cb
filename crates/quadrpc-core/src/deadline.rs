//! Deadline and cancellation control.
//!
//! Both ways of ending a call from the outside go through
//! `CallHandle::terminate_with`, so a cancel racing a deadline settles on
//! whichever reaches the call first.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::call::CallHandle;

/// Why a call is being ended from outside its handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Cancelled,
    DeadlineExceeded,
}

/// Deadline `timeout` from now.
pub fn deadline_after(timeout: Duration) -> Instant {
    Instant::now() + timeout
}

/// Starts the timer that ends `call` with `DEADLINE_EXCEEDED` at `deadline`.
///
/// The timer task exits as soon as the call ends for any other reason.
/// Without a Tokio runtime no timer is started; the deadline is then only
/// enforced when the call is used.
pub fn arm(call: &CallHandle, deadline: Instant) -> Option<JoinHandle<()>> {
    let runtime = tokio::runtime::Handle::try_current().ok()?;
    let call = call.clone();

    Some(runtime.spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => {
                if call.terminate_with(Termination::DeadlineExceeded) {
                    tracing::debug!(call_id = call.id(), "call deadline exceeded");
                }
            }
            _ = call.terminated() => {}
        }
    }))
}

/// Cancels `call` on behalf of an external controller.
pub fn cancel(call: &CallHandle) -> bool {
    call.terminate_with(Termination::Cancelled)
}
