//! Device lifecycle: owns the open connection and forwards its traffic.
//!
//! The transport delivers on its own receive context; the sink only parses
//! and pushes onto an unbounded channel, so device reads never wait on the
//! dispatch loop or the control surface. Each connection is tagged with a
//! generation; events from a closed or replaced connection are discarded by
//! the loop.
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use midi_input::{MidiConnection, MidiTransport, RawMessage, TransportError, TransportSink};
use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, trace};

/// Monotonic event clock shared by every connection of one engine.
///
/// Backend timestamps restart per connection; debounce needs one timeline.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Clock {
    /// Zero point.
    epoch: Instant,
}

impl Clock {
    /// Clock starting now.
    pub(crate) fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Time since the engine started.
    pub(crate) fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

/// Traffic forwarded from the receive context to the dispatch loop.
#[derive(Debug)]
pub(crate) enum ListenerEvent {
    /// A parsed message.
    Message {
        /// Connection generation.
        generation: u64,
        /// The message.
        raw: RawMessage,
        /// Receipt time on the engine clock.
        at: Duration,
    },
    /// The connection failed.
    Failed {
        /// Connection generation.
        generation: u64,
        /// Failure description.
        reason: String,
    },
}

/// Sink installed on each opened connection.
struct ChannelSink {
    /// Generation of the connection this sink belongs to.
    generation: u64,
    /// Channel to the dispatch loop.
    tx: UnboundedSender<ListenerEvent>,
    /// Engine clock.
    clock: Clock,
}

impl ChannelSink {
    /// Forward `event`, noting a closed loop at trace level.
    fn forward(&self, event: ListenerEvent) {
        if self.tx.send(event).is_err() {
            trace!("dispatch_loop_gone");
        }
    }
}

impl TransportSink for ChannelSink {
    fn on_message(&mut self, _timestamp_us: u64, bytes: &[u8]) {
        let at = self.clock.now();
        match midi_input::parse(bytes) {
            Some(raw) => self.forward(ListenerEvent::Message {
                generation: self.generation,
                raw,
                at,
            }),
            None => trace!(len = bytes.len(), "unparsed_midi_bytes"),
        }
    }

    fn on_error(&mut self, reason: String) {
        self.forward(ListenerEvent::Failed {
            generation: self.generation,
            reason,
        });
    }
}

/// Owner of the transport and the currently open connection.
pub(crate) struct Listener {
    /// Device backend.
    transport: Arc<dyn MidiTransport>,
    /// Open connection with its generation.
    conn: Mutex<Option<(u64, Box<dyn MidiConnection>)>>,
    /// Generation of the newest connection; bumped on every connect and
    /// disconnect.
    generation: AtomicU64,
    /// Channel to the dispatch loop.
    tx: UnboundedSender<ListenerEvent>,
    /// Engine clock.
    clock: Clock,
}

impl Listener {
    /// Listener over `transport` forwarding into `tx`.
    pub(crate) fn new(
        transport: Arc<dyn MidiTransport>,
        tx: UnboundedSender<ListenerEvent>,
        clock: Clock,
    ) -> Self {
        Self {
            transport,
            conn: Mutex::new(None),
            generation: AtomicU64::new(0),
            tx,
            clock,
        }
    }

    /// Generation whose events are current.
    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Available input ports. May block on the backend.
    pub(crate) fn ports(&self) -> Result<Vec<String>, TransportError> {
        self.transport.ports()
    }

    /// Open `port`, closing any previous connection first. May block.
    ///
    /// The connection lock is never held across the backend open, so a slow
    /// port cannot stall `disconnect`. A connect or disconnect issued while
    /// this one is opening wins; this one then fails with
    /// [`TransportError::Superseded`].
    pub(crate) fn connect(&self, port: &str) -> Result<(), TransportError> {
        let previous = self.conn.lock().take();
        if let Some((_, old)) = previous {
            debug!(port = old.port(), "closing_previous_connection");
            old.close();
        }
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let sink = ChannelSink {
            generation,
            tx: self.tx.clone(),
            clock: self.clock,
        };
        let opened = self.transport.open(port, Box::new(sink))?;
        let mut conn = self.conn.lock();
        if self.generation() != generation {
            drop(conn);
            debug!(port, generation, "connection_superseded");
            opened.close();
            return Err(TransportError::Superseded(port.to_string()));
        }
        let replaced = conn.replace((generation, opened));
        drop(conn);
        if let Some((_, old)) = replaced {
            old.close();
        }
        info!(port, generation, "listener_connected");
        Ok(())
    }

    /// Close the open connection, if any, returning its port. Events already
    /// queued from it are discarded. May block.
    pub(crate) fn disconnect(&self) -> Option<String> {
        self.generation.fetch_add(1, Ordering::AcqRel);
        let taken = self.conn.lock().take();
        let (_, conn) = taken?;
        let port = conn.port().to_string();
        conn.close();
        info!(port, "listener_disconnected");
        Some(port)
    }

    /// Close the connection of `generation` after it failed. A newer
    /// connection is left alone. May block.
    pub(crate) fn release(&self, generation: u64) {
        let failed = {
            let mut conn = self.conn.lock();
            if conn.as_ref().is_some_and(|(g, _)| *g == generation) {
                conn.take()
            } else {
                None
            }
        };
        if let Some((_, failed)) = failed {
            debug!(port = failed.port(), generation, "releasing_failed_connection");
            failed.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::mpsc as std_mpsc, thread};

    use midi_input::mock::MockTransport;
    use tokio::sync::mpsc;

    use super::*;

    /// Transport whose `open` waits for a release signal.
    struct GatedTransport {
        /// Backing mock.
        inner: MockTransport,
        /// Signalled when `open` is entered.
        entered: std_mpsc::Sender<()>,
        /// `open` proceeds once this yields.
        release: Mutex<std_mpsc::Receiver<()>>,
    }

    impl MidiTransport for GatedTransport {
        fn ports(&self) -> Result<Vec<String>, TransportError> {
            self.inner.ports()
        }

        fn open(
            &self,
            port: &str,
            sink: Box<dyn TransportSink>,
        ) -> Result<Box<dyn MidiConnection>, TransportError> {
            self.entered.send(()).ok();
            self.release.lock().recv().ok();
            self.inner.open(port, sink)
        }
    }

    fn listener(ports: &[&str]) -> (Listener, MockTransport, mpsc::UnboundedReceiver<ListenerEvent>) {
        let mock = MockTransport::new(ports);
        let (tx, rx) = mpsc::unbounded_channel();
        (Listener::new(Arc::new(mock.clone()), tx, Clock::new()), mock, rx)
    }

    #[test]
    fn messages_carry_current_generation() {
        let (l, mock, mut rx) = listener(&["pad"]);
        l.connect("pad").unwrap();
        assert!(mock.emit(0, &[0x90, 60, 0]));
        // Unparseable input is dropped by the sink.
        assert!(mock.emit(0, &[]));
        match rx.try_recv().unwrap() {
            ListenerEvent::Message { generation, raw, .. } => {
                assert_eq!(generation, l.generation());
                assert_eq!(raw, RawMessage::note_on(0, 60, 0));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn disconnect_invalidates_queued_events() {
        let (l, mock, mut rx) = listener(&["pad"]);
        l.connect("pad").unwrap();
        mock.emit(0, &[0x90, 60, 0]);
        assert_eq!(l.disconnect().as_deref(), Some("pad"));
        let ListenerEvent::Message { generation, .. } = rx.try_recv().unwrap() else {
            panic!("expected message");
        };
        assert_ne!(generation, l.generation());
        assert!(!mock.is_open());
        assert_eq!(l.disconnect(), None);
    }

    #[test]
    fn reconnect_closes_previous() {
        let (l, mock, _rx) = listener(&["a", "b"]);
        l.connect("a").unwrap();
        l.connect("b").unwrap();
        assert_eq!((mock.opens(), mock.closes()), (2, 1));
    }

    #[test]
    fn failure_is_forwarded_and_released() {
        let (l, mock, mut rx) = listener(&["pad"]);
        l.connect("pad").unwrap();
        assert!(mock.fail("unplugged"));
        let ListenerEvent::Failed { generation, reason } = rx.try_recv().unwrap() else {
            panic!("expected failure");
        };
        assert_eq!(reason, "unplugged");
        l.release(generation);
        assert_eq!(mock.closes(), 1);
    }

    #[test]
    fn slow_open_does_not_block_disconnect() {
        let mock = MockTransport::new(&["pad"]);
        let (entered_tx, entered_rx) = std_mpsc::channel();
        let (release_tx, release_rx) = std_mpsc::channel();
        let gated = GatedTransport {
            inner: mock.clone(),
            entered: entered_tx,
            release: Mutex::new(release_rx),
        };
        let (tx, _rx) = mpsc::unbounded_channel();
        let l = Arc::new(Listener::new(Arc::new(gated), tx, Clock::new()));
        let opener = {
            let l = l.clone();
            thread::spawn(move || l.connect("pad"))
        };
        entered_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        // The open is still in flight here.
        assert_eq!(l.disconnect(), None);
        release_tx.send(()).unwrap();
        assert_eq!(
            opener.join().unwrap(),
            Err(TransportError::Superseded("pad".into()))
        );
        assert!(!mock.is_open());
        assert_eq!((mock.opens(), mock.closes()), (1, 1));
    }

    #[test]
    fn unknown_port_is_an_error() {
        let (l, _mock, _rx) = listener(&["pad"]);
        assert!(matches!(
            l.connect("nope"),
            Err(TransportError::PortNotFound(_))
        ));
    }
}
