use crate::models::UserPosition;
use async_trait::async_trait;
use std::sync::Mutex;
use tokio::sync::oneshot;

/// Position returned by a successful location request
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedPosition {
    pub position: UserPosition,
    /// City name detected for the position, if the platform knows it
    pub city: Option<String>,
}

/// Tagged outcome of one location request
#[derive(Debug, Clone, PartialEq)]
pub enum LocationOutcome {
    Located(LocatedPosition),
    Denied,
    Unavailable,
}

impl LocationOutcome {
    pub fn located(position: UserPosition) -> Self {
        LocationOutcome::Located(LocatedPosition { position, city: None })
    }
}

/// Platform service yielding the user's current position
///
/// Single-shot and best-effort: it may never resolve, and it is never retried.
#[async_trait]
pub trait LocationService: Send + Sync {
    async fn request_position(&self) -> LocationOutcome;
}

/// Location service that always answers the same way
#[derive(Debug, Clone)]
pub struct FixedLocation {
    outcome: LocationOutcome,
}

impl FixedLocation {
    pub fn new(outcome: LocationOutcome) -> Self {
        Self { outcome }
    }
}

#[async_trait]
impl LocationService for FixedLocation {
    async fn request_position(&self) -> LocationOutcome {
        self.outcome.clone()
    }
}

/// Sending half of a [`ReportedLocation`]
#[derive(Debug)]
pub struct LocationReporter {
    sender: Mutex<Option<oneshot::Sender<LocationOutcome>>>,
}

impl LocationReporter {
    /// Deliver the outcome. Only the first report is accepted.
    pub fn report(&self, outcome: LocationOutcome) -> bool {
        let sender = match self.sender.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        match sender {
            Some(sender) => sender.send(outcome).is_ok(),
            None => false,
        }
    }

    pub fn is_reported(&self) -> bool {
        match self.sender.lock() {
            Ok(guard) => guard.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }
}

/// Location service resolved by an externally reported outcome
///
/// Stays pending until the paired [`LocationReporter`] reports; a reporter
/// dropped without reporting resolves as `Unavailable`.
#[derive(Debug)]
pub struct ReportedLocation {
    receiver: tokio::sync::Mutex<Option<oneshot::Receiver<LocationOutcome>>>,
}

impl ReportedLocation {
    pub fn channel() -> (Self, LocationReporter) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                receiver: tokio::sync::Mutex::new(Some(rx)),
            },
            LocationReporter {
                sender: Mutex::new(Some(tx)),
            },
        )
    }
}

#[async_trait]
impl LocationService for ReportedLocation {
    async fn request_position(&self) -> LocationOutcome {
        let receiver = self.receiver.lock().await.take();

        match receiver {
            Some(receiver) => receiver.await.unwrap_or(LocationOutcome::Unavailable),
            None => LocationOutcome::Unavailable,
        }
    }
}
