//! Audit logging for wallet sessions
//!
//! Records pairings, session changes and failed operations to a local JSONL
//! file for later review.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::events::{EventHub, SessionEvent, Subscription};
use crate::session::EIP155;

/// Audit log entry
#[derive(Debug, Serialize)]
struct AuditEntry {
    timestamp: String,
    operation: String,
    details: String,
}

/// Append-only audit log of session activity
pub struct AuditLog {
    path: PathBuf,
    enabled: bool,
}

impl AuditLog {
    /// Create a new audit log next to the given config file
    pub fn new(config_path: &Path) -> Self {
        Self {
            path: Self::path_for(config_path),
            enabled: true,
        }
    }

    /// Audit log location derived from the config file path
    pub fn path_for(config_path: &Path) -> PathBuf {
        config_path.with_extension("audit.jsonl")
    }

    /// Create a disabled audit log (for testing)
    pub fn disabled() -> Self {
        Self {
            path: PathBuf::from("/dev/null"),
            enabled: false,
        }
    }

    /// Record an audit event
    pub fn record(&mut self, operation: &str, details: &str) {
        if !self.enabled {
            return;
        }

        let entry = AuditEntry {
            timestamp: chrono::Utc::now().to_rfc3339(),
            operation: operation.to_string(),
            details: details.to_string(),
        };

        // Best-effort append; a failed write never fails the session operation
        if let Ok(json) = serde_json::to_string(&entry) {
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
            {
                let _ = writeln!(file, "{}", json);
            }
        }
    }

    /// Record a session event
    pub fn record_event(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::QrReady(uri) => {
                // The query string carries the pairing key; keep only the topic part.
                let public = uri.split('?').next().unwrap_or_default();
                self.record("pairing_uri_issued", &format!("uri: {public}"));
            }
            SessionEvent::Connected(session) => {
                self.record(
                    "session_connected",
                    &format!(
                        "topic: {}, accounts: {}",
                        session.topic,
                        session.accounts(EIP155).join(",")
                    ),
                );
            }
            SessionEvent::SessionUpdated(session) => {
                self.record(
                    "session_updated",
                    &format!(
                        "topic: {}, accounts: {}",
                        session.topic,
                        session.accounts(EIP155).join(",")
                    ),
                );
            }
            SessionEvent::Disconnected => self.record("session_disconnected", ""),
            SessionEvent::SessionExpired => self.record("session_expired", ""),
            SessionEvent::Error(err) => self.record("error", &err.to_string()),
        }
    }

    /// Record every event published on `hub` until the subscription drops
    pub fn attach(self, hub: &EventHub) -> Subscription {
        let log = Arc::new(Mutex::new(self));
        hub.subscribe(move |event| log.lock().record_event(event))
    }

    /// Get the audit log file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}
