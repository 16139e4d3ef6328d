//! Port watchdog.
//!
//! Backends do not report a vanished device on the input callback, so an
//! open connection polls port enumeration and fails its sink when the port
//! is gone.
use std::{
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use tracing::{debug, warn};

/// Poll interval for open connections.
pub const WATCH_INTERVAL: Duration = Duration::from_millis(500);

/// Background poller for one open port. Dropping it stops and joins the
/// poller thread.
pub(crate) struct PortWatchdog {
    /// Dropping the sender wakes and stops the poller.
    stop: Option<Sender<()>>,
    /// Poller thread.
    handle: Option<JoinHandle<()>>,
}

impl PortWatchdog {
    /// Poll `present(port)` every `interval`. The first `Ok(false)` calls
    /// `on_lost` once and ends the poller; enumeration errors are retried.
    pub(crate) fn spawn<P, L>(port: String, interval: Duration, mut present: P, on_lost: L) -> Self
    where
        P: FnMut(&str) -> Result<bool, String> + Send + 'static,
        L: FnOnce(String) + Send + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let spawned = thread::Builder::new()
            .name("midi-port-watch".into())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        _ => return,
                    }
                    match present(&port) {
                        Ok(true) => {}
                        Ok(false) => {
                            warn!(port, "midi_port_lost");
                            on_lost(format!("port {port} disappeared"));
                            return;
                        }
                        Err(e) => debug!(port, error = %e, "port_poll_failed"),
                    }
                }
            });
        match spawned {
            Ok(handle) => Self {
                stop: Some(stop_tx),
                handle: Some(handle),
            },
            Err(e) => {
                warn!(error = %e, "port_watchdog_unavailable");
                Self {
                    stop: None,
                    handle: None,
                }
            }
        }
    }
}

impl Drop for PortWatchdog {
    fn drop(&mut self) {
        self.stop.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("port_watchdog_panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicBool, AtomicUsize, Ordering},
        },
        time::Instant,
    };

    use super::*;

    const FAST: Duration = Duration::from_millis(5);

    #[test]
    fn vanished_port_is_reported_once() {
        let present = Arc::new(AtomicBool::new(true));
        let (lost_tx, lost_rx) = bounded(4);
        let polls = Arc::new(AtomicUsize::new(0));
        let (p, n) = (present.clone(), polls.clone());
        let _watch = PortWatchdog::spawn(
            "pads".into(),
            FAST,
            move |_| {
                n.fetch_add(1, Ordering::SeqCst);
                Ok(p.load(Ordering::SeqCst))
            },
            move |reason| lost_tx.send(reason).unwrap(),
        );
        let deadline = Instant::now() + Duration::from_secs(2);
        while polls.load(Ordering::SeqCst) < 2 && Instant::now() < deadline {
            thread::sleep(FAST);
        }
        assert!(lost_rx.try_recv().is_err());
        present.store(false, Ordering::SeqCst);
        let reason = lost_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(reason.contains("pads"));
        assert!(lost_rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn poll_errors_are_not_failures() {
        let (lost_tx, lost_rx) = bounded(1);
        let _watch = PortWatchdog::spawn(
            "pads".into(),
            FAST,
            |_| Err("backend busy".into()),
            move |reason| lost_tx.send(reason).unwrap(),
        );
        assert!(lost_rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn drop_stops_polling() {
        let polls = Arc::new(AtomicUsize::new(0));
        let n = polls.clone();
        let watch = PortWatchdog::spawn(
            "pads".into(),
            FAST,
            move |_| {
                n.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            },
            |_| {},
        );
        drop(watch);
        let after = polls.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(polls.load(Ordering::SeqCst), after);
    }
}
