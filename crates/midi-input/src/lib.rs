//! midi-input: MIDI device input for the macro engine.
//!
//! - [`RawMessage`]: a parsed device message (kind tag plus channel/data bytes).
//! - [`TriggerIdentity`] and [`TriggerEvent`]: the canonical trigger stream.
//! - [`Normalizer`]: filters raw messages down to actionable trigger events.
//! - [`MidiTransport`]: the device boundary, with a `midir` implementation.
//!
//! Everything except the transport is pure and testable without a device.

mod error;
mod message;
mod normalize;
mod transport;
mod trigger;
mod watchdog;

pub use error::TransportError;
pub use message::{MessageKind, RawMessage, parse};
pub use normalize::{DEFAULT_RELEASE_VELOCITY, Normalizer};
pub use transport::{MidiConnection, MidiTransport, MidirTransport, TransportSink};
pub use trigger::{ParseIdentityError, TriggerEvent, TriggerIdentity};
pub use watchdog::WATCH_INTERVAL;

#[cfg(any(test, feature = "test-utils"))]
pub use transport::mock;
