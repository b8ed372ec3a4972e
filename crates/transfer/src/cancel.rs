//! Cooperative cancellation shared by producer, consumer and driver

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;

/// Shared stop flag observed by every retry loop
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create an untripped token
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the token; all clones observe it
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check whether any clone has tripped the token
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Guard that trips the token if dropped during a panic
    pub fn panic_guard(&self) -> PanicGuard {
        PanicGuard { token: self.clone() }
    }
}

/// Trips its token when the owning task unwinds, so the peer task stops
/// retrying against a buffer nobody will service.
#[derive(Debug)]
pub struct PanicGuard {
    token: CancelToken,
}

impl Drop for PanicGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            self.token.cancel();
        }
    }
}

const RUNNING: u8 = 0;
const FINISHED: u8 = 1;
const EXPIRED: u8 = 2;

/// Settles the race between a run completing and its deadline firing
///
/// Exactly one of [`finish`](Self::finish) and [`expire`](Self::expire)
/// wins. The deadline only trips the token when it wins, so a run that
/// completed first never leaves the caller's token cancelled.
#[derive(Debug, Default)]
pub(crate) struct Completion {
    state: AtomicU8,
}

impl Completion {
    /// Mark the run complete; `false` if the deadline already fired
    pub(crate) fn finish(&self) -> bool {
        self.settle(FINISHED)
    }

    /// Fire the deadline and trip `cancel`; `false` if the run already completed
    pub(crate) fn expire(&self, cancel: &CancelToken) -> bool {
        let won = self.settle(EXPIRED);
        if won {
            cancel.cancel();
        }
        won
    }

    pub(crate) fn is_settled(&self) -> bool {
        self.state.load(Ordering::SeqCst) != RUNNING
    }

    pub(crate) fn expired(&self) -> bool {
        self.state.load(Ordering::SeqCst) == EXPIRED
    }

    fn settle(&self, to: u8) -> bool {
        self.state
            .compare_exchange(RUNNING, to, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_flag() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_guard_trips_only_on_panic() {
        let token = CancelToken::new();
        drop(token.panic_guard());
        assert!(!token.is_cancelled());

        let guarded = token.clone();
        let result = thread::spawn(move || {
            let _guard = guarded.panic_guard();
            panic!("task failure");
        })
        .join();

        assert!(result.is_err());
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_late_deadline_leaves_token_alone() {
        let token = CancelToken::new();
        let completion = Completion::default();

        assert!(completion.finish());
        assert!(!completion.expire(&token));
        assert!(!token.is_cancelled());
        assert!(!completion.expired());
    }

    #[test]
    fn test_deadline_before_finish_wins() {
        let token = CancelToken::new();
        let completion = Completion::default();

        assert!(completion.expire(&token));
        assert!(!completion.finish());
        assert!(token.is_cancelled());
        assert!(completion.expired());
    }
}
