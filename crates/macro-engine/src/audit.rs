//! File-backed audit trail of raw traffic and dispatch decisions.
//!
//! Truncated with a header when opened, then append-only. Write failures are
//! logged once and otherwise ignored; the trail never changes dispatch.
use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
};

use chrono::Local;
use macro_protocol::Outcome;
use midi_input::{RawMessage, TriggerIdentity};
use parking_lot::Mutex;
use tracing::warn;

use crate::Decision;

/// Open audit trail file.
pub struct AuditTrail {
    /// Trail location.
    path: PathBuf,
    /// Open handle.
    file: Mutex<File>,
    /// Set after the first failed write.
    failed: AtomicBool,
}

impl AuditTrail {
    /// Create or truncate the trail at `path` and write the header.
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        writeln!(
            file,
            "midimacros audit trail - started at {}",
            Local::now().to_rfc3339()
        )?;
        writeln!(file, "{}", "=".repeat(50))?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            failed: AtomicBool::new(false),
        })
    }

    /// Trail location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped line.
    pub fn record(&self, line: &str) {
        let stamp = Local::now().format("%H:%M:%S%.3f");
        let res = writeln!(self.file.lock(), "{stamp} {line}");
        if let Err(e) = res
            && !self.failed.swap(true, Ordering::Relaxed)
        {
            warn!(path = %self.path.display(), error = %e, "audit_write_failed");
        }
    }

    /// Record a received message. Timing messages are skipped.
    pub fn raw(&self, msg: &RawMessage, bound: bool) {
        if msg.kind.is_timing() {
            return;
        }
        if bound {
            self.record(&format!("{msg} -> HAS MACRO"));
        } else {
            self.record(&msg.to_string());
        }
    }

    /// Record a dispatch decision.
    pub fn decision(&self, identity: TriggerIdentity, decision: &Decision) {
        let line = match decision {
            Decision::Unbound => format!("   UNBOUND {identity}"),
            Decision::Suppressed(m) => format!("   DEBOUNCED {identity} ({})", m.name),
            Decision::Skipped(m) => format!("   TEST MODE {identity}: {}", m.action.summary()),
            Decision::Execute(m) => format!("   EXECUTING {identity}: {}", m.action.summary()),
        };
        self.record(&line);
    }

    /// Record the outcome of an execution.
    pub fn outcome(&self, identity: TriggerIdentity, outcome: &Outcome) {
        self.record(&format!("   RESULT {identity}: {outcome}"));
    }

    /// Record a captured trigger.
    pub fn captured(&self, identity: TriggerIdentity) {
        self.record(&format!("   CAPTURED {identity}"));
    }
}
