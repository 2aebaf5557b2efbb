//! Outbound events and their subscription bus

use chrono::{DateTime, Local};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use image::RgbImage;
use parking_lot::Mutex;

use crate::models::{DetectedCode, Frame};

/// Something observers may want to render or log
#[derive(Debug, Clone)]
pub enum InspectionEvent {
    /// Annotated frame after processing
    FrameReady(RgbImage),
    /// A code passed emission suppression
    CodeDetected {
        /// The detection
        code: DetectedCode,
        /// Variant picked by the thumbnail mode
        display: Frame,
        /// Wall-clock detection time
        timestamp: DateTime<Local>,
    },
    /// Timeout reached
    InspectionComplete {
        /// Exactly `expected` codes were seen
        success: bool,
        /// Unique codes seen
        detected: u32,
        /// Codes the session expected
        expected: u32,
    },
    /// Stopped by the caller
    InspectionStopped {
        /// Unique codes seen before the stop
        detected: u32,
    },
}

impl InspectionEvent {
    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            InspectionEvent::FrameReady(_) => "frame_ready",
            InspectionEvent::CodeDetected { .. } => "code_detected",
            InspectionEvent::InspectionComplete { .. } => "inspection_complete",
            InspectionEvent::InspectionStopped { .. } => "inspection_stopped",
        }
    }
}

/// `HH:MM:SS.mmm`
pub fn format_timestamp(ts: &DateTime<Local>) -> String {
    ts.format("%H:%M:%S%.3f").to_string()
}

/// Fan-out of events to bounded per-subscriber queues.
///
/// A full queue drops the event for that subscriber only; a subscriber whose
/// receiver was dropped is forgotten.
#[derive(Debug)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<InspectionEvent>>>,
    capacity: usize,
}

impl EventBus {
    /// Bus whose subscribers each buffer up to `capacity` events
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }

    /// Register a new observer
    pub fn subscribe(&self) -> Receiver<InspectionEvent> {
        let (tx, rx) = crossbeam_channel::bounded(self.capacity);
        self.subscribers.lock().push(tx);
        rx
    }

    /// Live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Deliver `event` to every subscriber
    pub fn publish(&self, event: InspectionEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::warn!("subscriber queue full, dropping {} event", event.kind());
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::settings::event_queue_depth())
    }
}
