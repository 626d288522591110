//! Caller position and the panic flow that depends on it.
//!
//! The host environment pushes position fixes into [`LocationTracker`];
//! report submission and panic alerts read the latest fix. Delivering
//! alerts to contacts is left to an [`AlertSink`].

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use crate::coordinate::Coordinate;
use crate::error::{CoordinateError, LocationError};

/// Latest known caller position, fed by the host's geolocation stream.
#[derive(Debug)]
pub struct LocationTracker {
    tracking: AtomicBool,
    current: watch::Sender<Option<Coordinate>>,
}

impl Default for LocationTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationTracker {
    #[must_use]
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            tracking: AtomicBool::new(false),
            current,
        }
    }

    pub fn start_tracking(&self) {
        self.tracking.store(true, Ordering::SeqCst);
        log::debug!("Location tracking started");
    }

    /// Stops accepting fixes. The last known position is kept.
    pub fn stop_tracking(&self) {
        self.tracking.store(false, Ordering::SeqCst);
        log::debug!("Location tracking stopped");
    }

    #[must_use]
    pub fn is_tracking(&self) -> bool {
        self.tracking.load(Ordering::SeqCst)
    }

    /// Records a position fix. Returns `Ok(false)` when tracking is off and
    /// the fix was ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] for out-of-range fixes.
    pub fn update(&self, fix: Coordinate) -> Result<bool, CoordinateError> {
        let fix = fix.validate()?;
        if !self.is_tracking() {
            return Ok(false);
        }
        self.current.send_replace(Some(fix));
        Ok(true)
    }

    #[must_use]
    pub fn current(&self) -> Option<Coordinate> {
        *self.current.borrow()
    }

    /// # Errors
    ///
    /// Returns [`LocationError::LocationUnavailable`] when no fix is known.
    pub fn require_current(&self) -> Result<Coordinate, LocationError> {
        self.current().ok_or(LocationError::LocationUnavailable)
    }

    /// Change feed of the current position.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Coordinate>> {
        self.current.subscribe()
    }
}

/// An emergency notification ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanicAlert {
    pub contacts: Vec<String>,
    pub location: Coordinate,
    pub message: String,
    pub triggered_at: DateTime<Utc>,
}

impl PanicAlert {
    #[must_use]
    pub fn new(contacts: Vec<String>, location: Coordinate) -> Self {
        Self {
            message: format!(
                "EMERGENCY: User needs help at location: https://maps.google.com/?q={},{}",
                location.lat, location.lng
            ),
            contacts,
            location,
            triggered_at: Utc::now(),
        }
    }
}

/// Delivery channel for panic alerts (SMS, messaging, ...).
pub trait AlertSink: Send + Sync {
    fn deliver(&self, alert: &PanicAlert);
}

/// Writes alerts to the log instead of notifying anyone.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn deliver(&self, alert: &PanicAlert) {
        log::warn!(
            "PANIC TRIGGERED - alerting {} emergency contact(s): {}",
            alert.contacts.len(),
            alert.message
        );
    }
}
