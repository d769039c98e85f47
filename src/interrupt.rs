//! Cooperative cancellation driven by Ctrl-C.
//!
//! The signal handler never touches control flow itself; it only raises the
//! token. The session checks the token at its checkpoints and races every
//! blocking step against [`Interrupt::triggered`].

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, Default)]
struct State {
    raised: bool,
    /// Last time the token was raised, kept after `clear`.
    at: Option<Instant>,
}

#[derive(Debug, Clone)]
pub struct Interrupt {
    tx: Arc<watch::Sender<State>>,
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::new()
    }
}

impl Interrupt {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(State::default());
        Interrupt { tx: Arc::new(tx) }
    }

    /// Raise the token.
    pub fn trigger(&self) {
        self.tx.send_modify(|state| {
            state.raised = true;
            state.at = Some(Instant::now());
        });
    }

    /// Lower the token, returning whether it was raised.
    pub fn clear(&self) -> bool {
        let mut was_raised = false;
        self.tx.send_if_modified(|state| {
            was_raised = state.raised;
            state.raised = false;
            was_raised
        });
        was_raised
    }

    pub fn is_pending(&self) -> bool {
        self.tx.borrow().raised
    }

    /// True once per trigger if that trigger happened within `window`.
    ///
    /// A Windows console read interrupted by Ctrl-C returns end of input,
    /// sometimes after the token has already been handled and cleared.
    pub fn take_recent(&self, window: Duration) -> bool {
        let mut recent = false;
        self.tx.send_if_modified(|state| {
            if let Some(at) = state.at {
                if at.elapsed() <= window {
                    state.at = None;
                    recent = true;
                }
            }
            false
        });
        recent
    }

    /// Resolves as soon as the token is raised (immediately if it already is).
    pub async fn triggered(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|state| state.raised).await;
    }

    /// Install the Ctrl-C handler. From now on the signal raises the token
    /// instead of terminating the process.
    pub fn listen(&self) {
        let interrupt = self.clone();
        tokio::spawn(async move {
            loop {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        tracing::debug!("interrupt received");
                        interrupt.trigger();
                    }
                    Err(err) => {
                        tracing::warn!("unable to listen for Ctrl-C: {}", err);
                        return;
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_and_clear() {
        let interrupt = Interrupt::new();
        assert!(!interrupt.is_pending());
        interrupt.trigger();
        assert!(interrupt.is_pending());
        assert!(interrupt.clone().is_pending());
        assert!(interrupt.clear());
        assert!(!interrupt.clear());
        assert!(!interrupt.is_pending());
    }

    #[tokio::test]
    async fn triggered_wakes_waiter() {
        let interrupt = Interrupt::new();
        let trigger = interrupt.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.trigger();
        });
        tokio::time::timeout(Duration::from_secs(5), interrupt.triggered())
            .await
            .unwrap();
        assert!(interrupt.is_pending());
    }

    #[tokio::test]
    async fn triggered_returns_when_already_raised() {
        let interrupt = Interrupt::new();
        interrupt.trigger();
        tokio::time::timeout(Duration::from_millis(100), interrupt.triggered())
            .await
            .unwrap();
    }

    #[test]
    fn recent_trigger_is_taken_once() {
        let interrupt = Interrupt::new();
        assert!(!interrupt.take_recent(Duration::from_secs(5)));
        interrupt.trigger();
        interrupt.clear();
        assert!(interrupt.take_recent(Duration::from_secs(5)));
        assert!(!interrupt.take_recent(Duration::from_secs(5)));
        assert!(!interrupt.is_pending());
    }

    #[test]
    fn old_trigger_is_not_recent() {
        let interrupt = Interrupt::new();
        interrupt.trigger();
        std::thread::sleep(Duration::from_millis(20));
        assert!(!interrupt.take_recent(Duration::from_millis(1)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn sigint_raises_token() {
        let interrupt = Interrupt::new();
        interrupt.listen();
        // let the listener task register its handler
        tokio::time::sleep(Duration::from_millis(100)).await;

        let status = std::process::Command::new("kill")
            .args(["-INT", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        tokio::time::timeout(Duration::from_secs(5), interrupt.triggered())
            .await
            .unwrap();
        assert!(interrupt.is_pending());
    }
}
