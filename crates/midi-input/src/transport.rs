//! Device boundary: enumerate ports, open a connection, receive raw bytes.
//!
//! A connection owns its receive context. With `midir` the backend runs the
//! callback on its own thread, so the control surface never shares a lock
//! with device reads. A [`PortWatchdog`] reports a vanished device through
//! the same sink. Closing a connection releases the port deterministically.
use std::sync::Arc;

use midir::{Ignore, MidiInput, MidiInputConnection};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::{
    TransportError,
    watchdog::{PortWatchdog, WATCH_INTERVAL},
};

/// Receiver of raw traffic from an open connection.
///
/// Called from the transport's own receive context; implementations must
/// not block.
pub trait TransportSink: Send + 'static {
    /// A raw message arrived. `timestamp_us` is backend-specific and only
    /// meaningful within one connection.
    fn on_message(&mut self, timestamp_us: u64, bytes: &[u8]);

    /// The connection failed; no further messages will arrive.
    fn on_error(&mut self, reason: String);
}

/// An open input connection.
pub trait MidiConnection: Send {
    /// Name of the connected port.
    fn port(&self) -> &str;

    /// Close the connection and release the port.
    fn close(self: Box<Self>);
}

/// Port enumeration and connection factory.
pub trait MidiTransport: Send + Sync {
    /// Names of the available input ports.
    fn ports(&self) -> Result<Vec<String>, TransportError>;

    /// Open `port`, delivering traffic to `sink` until closed.
    fn open(
        &self,
        port: &str,
        sink: Box<dyn TransportSink>,
    ) -> Result<Box<dyn MidiConnection>, TransportError>;
}

/// `midir`-backed transport.
pub struct MidirTransport {
    /// Client name registered with the MIDI backend.
    client_name: String,
}

impl Default for MidirTransport {
    fn default() -> Self {
        Self::new("midimacros")
    }
}

impl MidirTransport {
    /// Create a transport registering as `client_name`.
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
        }
    }

    /// A fresh backend handle; `midir` consumes it on connect.
    fn input(&self) -> Result<MidiInput, TransportError> {
        let mut input =
            MidiInput::new(&self.client_name).map_err(|e| TransportError::Init(e.to_string()))?;
        // Timing messages are delivered and dropped by the normalizer.
        input.ignore(Ignore::Sysex);
        Ok(input)
    }

    /// True when `port` is currently enumerable.
    fn port_present(client_name: &str, port: &str) -> Result<bool, String> {
        let input = MidiInput::new(&format!("{client_name}-watch")).map_err(|e| e.to_string())?;
        Ok(input
            .ports()
            .iter()
            .any(|p| input.port_name(p).is_ok_and(|n| n == port)))
    }
}

impl MidiTransport for MidirTransport {
    fn ports(&self) -> Result<Vec<String>, TransportError> {
        let input = self.input()?;
        Ok(input
            .ports()
            .iter()
            .filter_map(|p| input.port_name(p).ok())
            .collect())
    }

    fn open(
        &self,
        port: &str,
        sink: Box<dyn TransportSink>,
    ) -> Result<Box<dyn MidiConnection>, TransportError> {
        let input = self.input()?;
        let found = input
            .ports()
            .into_iter()
            .find(|p| input.port_name(p).map(|n| n == port).unwrap_or(false))
            .ok_or_else(|| TransportError::PortNotFound(port.to_string()))?;
        debug!(port, "midir_connect");
        let sink = Arc::new(Mutex::new(sink));
        let rx_sink = sink.clone();
        let inner = input
            .connect(
                &found,
                &format!("{}-input", self.client_name),
                move |stamp, bytes, _| rx_sink.lock().on_message(stamp, bytes),
                (),
            )
            .map_err(|e| TransportError::Open {
                port: port.to_string(),
                message: e.to_string(),
            })?;
        info!(port, "midi_port_opened");
        let client = self.client_name.clone();
        let watchdog = PortWatchdog::spawn(
            port.to_string(),
            WATCH_INTERVAL,
            move |p| Self::port_present(&client, p),
            move |reason| sink.lock().on_error(reason),
        );
        Ok(Box::new(MidirConnection {
            port: port.to_string(),
            inner,
            watchdog,
        }))
    }
}

/// Live `midir` connection.
struct MidirConnection {
    /// Port name.
    port: String,
    /// Backend connection handle.
    inner: MidiInputConnection<()>,
    /// Vanished-port detection; stopped before the port is released.
    watchdog: PortWatchdog,
}

impl MidiConnection for MidirConnection {
    fn port(&self) -> &str {
        &self.port
    }

    fn close(self: Box<Self>) {
        let Self {
            port,
            inner,
            watchdog,
        } = *self;
        drop(watchdog);
        drop(inner.close());
        info!(port, "midi_port_closed");
    }
}

/// In-memory transport for tests: emit bytes or failures into the open sink.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use parking_lot::Mutex;

    use super::{MidiConnection, MidiTransport, TransportSink};
    use crate::TransportError;

    /// Shared state between the transport and its connections.
    #[derive(Default)]
    struct Shared {
        /// Sink of the currently open connection.
        sink: Mutex<Option<Box<dyn TransportSink>>>,
        /// Number of successful opens.
        opens: AtomicUsize,
        /// Number of closes.
        closes: AtomicUsize,
    }

    /// Mock transport exposing a fixed set of ports.
    #[derive(Clone, Default)]
    pub struct MockTransport {
        /// Available ports.
        ports: Vec<String>,
        /// State shared with open connections.
        shared: Arc<Shared>,
    }

    impl MockTransport {
        /// Create a mock with the given port names.
        pub fn new(ports: &[&str]) -> Self {
            Self {
                ports: ports.iter().map(|p| p.to_string()).collect(),
                shared: Arc::new(Shared::default()),
            }
        }

        /// Deliver raw bytes to the open connection. Returns false when closed.
        pub fn emit(&self, timestamp_us: u64, bytes: &[u8]) -> bool {
            match self.shared.sink.lock().as_mut() {
                Some(sink) => {
                    sink.on_message(timestamp_us, bytes);
                    true
                }
                None => false,
            }
        }

        /// Report a read failure on the open connection.
        pub fn fail(&self, reason: &str) -> bool {
            match self.shared.sink.lock().take() {
                Some(mut sink) => {
                    sink.on_error(reason.to_string());
                    true
                }
                None => false,
            }
        }

        /// True when a connection is open.
        pub fn is_open(&self) -> bool {
            self.shared.sink.lock().is_some()
        }

        /// Number of successful opens so far.
        pub fn opens(&self) -> usize {
            self.shared.opens.load(Ordering::SeqCst)
        }

        /// Number of closes so far.
        pub fn closes(&self) -> usize {
            self.shared.closes.load(Ordering::SeqCst)
        }
    }

    /// Connection handle of the mock transport.
    struct MockConnection {
        /// Port name.
        port: String,
        /// Shared state.
        shared: Arc<Shared>,
    }

    impl MidiConnection for MockConnection {
        fn port(&self) -> &str {
            &self.port
        }

        fn close(self: Box<Self>) {
            self.shared.sink.lock().take();
            self.shared.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl MidiTransport for MockTransport {
        fn ports(&self) -> Result<Vec<String>, TransportError> {
            Ok(self.ports.clone())
        }

        fn open(
            &self,
            port: &str,
            sink: Box<dyn TransportSink>,
        ) -> Result<Box<dyn MidiConnection>, TransportError> {
            if !self.ports.iter().any(|p| p == port) {
                return Err(TransportError::PortNotFound(port.to_string()));
            }
            *self.shared.sink.lock() = Some(sink);
            self.shared.opens.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(MockConnection {
                port: port.to_string(),
                shared: self.shared.clone(),
            }))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        struct Collect(Arc<Mutex<Vec<Vec<u8>>>>);

        impl TransportSink for Collect {
            fn on_message(&mut self, _ts: u64, bytes: &[u8]) {
                self.0.lock().push(bytes.to_vec());
            }
            fn on_error(&mut self, _reason: String) {}
        }

        #[test]
        fn emit_reaches_open_sink_until_closed() {
            let t = MockTransport::new(&["pad"]);
            let seen = Arc::new(Mutex::new(Vec::new()));
            let conn = t.open("pad", Box::new(Collect(seen.clone()))).expect("open");
            assert!(t.emit(0, &[0x90, 60, 0]));
            conn.close();
            assert!(!t.emit(0, &[0x90, 61, 0]));
            assert_eq!(seen.lock().len(), 1);
            assert_eq!((t.opens(), t.closes()), (1, 1));
        }

        #[test]
        fn unknown_port_is_rejected() {
            let t = MockTransport::new(&["pad"]);
            let seen = Arc::new(Mutex::new(Vec::new()));
            assert!(matches!(
                t.open("other", Box::new(Collect(seen))),
                Err(TransportError::PortNotFound(_))
            ));
        }
    }
}
