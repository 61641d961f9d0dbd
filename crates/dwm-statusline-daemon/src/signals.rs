//! SIGINT/SIGTERM handling.
//!
//! The first signal asks the scheduler to stop; a second one gets the
//! default disposition and terminates the process immediately.

use std::io;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Installed SIGINT and SIGTERM listeners.
pub struct TerminationSignals {
    interrupt: Signal,
    terminate: Signal,
}

impl TerminationSignals {
    /// Installs the listeners. Must be called from within the runtime.
    pub fn install() -> io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Waits for the first signal, then restores the default disposition.
    pub async fn recv(mut self) -> &'static str {
        let name = tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        };
        info!(
            "Received {}. Gracefully stopping... (send signal again to force)",
            name
        );
        restore_default_disposition();
        name
    }

    /// Sets `stop` to true when the first signal arrives.
    pub fn notify(self, stop: watch::Sender<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.recv().await;
            let _ = stop.send(true);
        })
    }
}

fn restore_default_disposition() {
    for signum in [libc::SIGINT, libc::SIGTERM] {
        // SAFETY: SIG_DFL is a valid disposition for SIGINT and SIGTERM.
        let previous = unsafe { libc::signal(signum, libc::SIG_DFL) };
        if previous == libc::SIG_ERR {
            warn!(
                "Failed to restore default handler for signal {}: {}",
                signum,
                io::Error::last_os_error()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disposition(signum: libc::c_int) -> libc::sighandler_t {
        // SAFETY: a null new action only queries the current one.
        unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            libc::sigaction(signum, std::ptr::null(), &mut action);
            action.sa_sigaction
        }
    }

    #[tokio::test]
    async fn test_first_signal_stops_and_restores_default() {
        let signals = TerminationSignals::install().unwrap();
        assert_ne!(disposition(libc::SIGINT), libc::SIG_DFL);

        let (stop_tx, stop_rx) = watch::channel(false);
        let notifier = signals.notify(stop_tx);

        // SAFETY: SIGINT is handled by the listener installed above.
        assert_eq!(unsafe { libc::raise(libc::SIGINT) }, 0);
        notifier.await.unwrap();

        assert!(*stop_rx.borrow());
        assert_eq!(disposition(libc::SIGINT), libc::SIG_DFL);
        assert_eq!(disposition(libc::SIGTERM), libc::SIG_DFL);
    }
}
