//! Cooperative cancellation for long-running operations.
//!
//! Bulk load, SPARQL execution and the reasoner's fixpoint all accept a
//! [`CancellationToken`] that is checked at coarse granularity (per outer-loop
//! iteration, per Pregel superstep, per Datalog delta-round). There is no
//! reliance on thread interruption or signals: a token is just a value passed
//! by the caller, the same way the rest of this crate avoids global state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cooperative, shareable cancellation flag.
///
/// Cloning shares the same underlying flag: cancelling one clone cancels all
/// of them. The default token never cancels, so call sites that don't care
/// about cancellation can pass `CancellationToken::default()`.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Creates a fresh, not-yet-cancelled token.
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns `true` once [`Self::cancel`] has been called on this token or
    /// any of its clones.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Convenience check that returns [`crate::error::Cancelled`] if the
    /// token has been cancelled, for use with `?` in loops.
    pub fn check(&self) -> Result<(), crate::error::Cancelled> {
        if self.is_cancelled() {
            Err(crate::error::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_across_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
        assert!(token.check().is_err());
    }

    #[test]
    fn default_never_cancels() {
        assert!(!CancellationToken::default().is_cancelled());
    }
}
