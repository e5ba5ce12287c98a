//! Host-facing recording callbacks

use tokio::sync::mpsc;
use tracing::debug;

/// Recording lifecycle events, for hosts that prefer a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordEvent {
    Started,
    Tick { elapsed_ms: u64 },
    TooShort { min_duration_secs: u32 },
    Stopped { duration_ms: u64 },
    Cancelled,
}

/// Callbacks fired by the recording controller.
///
/// Exactly one of `on_stop_record` / `on_cancel_record` fires for every
/// recording that started.
pub trait RecordListener {
    fn on_start_record(&mut self) {}

    /// Recording completed normally, by manual stop or max duration
    fn on_stop_record(&mut self, duration_ms: u64);

    /// Recording was cancelled
    fn on_cancel_record(&mut self);

    /// Elapsed time, roughly once a second while recording
    fn on_tick(&mut self, _elapsed_ms: u64) {}

    /// A manual stop was refused because the clip is still too short
    fn on_record_too_short(&mut self, _min_duration_secs: u32) {}
}

impl RecordListener for Vec<RecordEvent> {
    fn on_start_record(&mut self) {
        self.push(RecordEvent::Started);
    }

    fn on_stop_record(&mut self, duration_ms: u64) {
        self.push(RecordEvent::Stopped { duration_ms });
    }

    fn on_cancel_record(&mut self) {
        self.push(RecordEvent::Cancelled);
    }

    fn on_tick(&mut self, elapsed_ms: u64) {
        self.push(RecordEvent::Tick { elapsed_ms });
    }

    fn on_record_too_short(&mut self, min_duration_secs: u32) {
        self.push(RecordEvent::TooShort { min_duration_secs });
    }
}

/// Forwards events to a channel; a closed receiver drops them
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<RecordEvent>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RecordEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: RecordEvent) {
        if self.tx.send(event).is_err() {
            debug!("Record event receiver dropped");
        }
    }
}

impl RecordListener for ChannelListener {
    fn on_start_record(&mut self) {
        self.send(RecordEvent::Started);
    }

    fn on_stop_record(&mut self, duration_ms: u64) {
        self.send(RecordEvent::Stopped { duration_ms });
    }

    fn on_cancel_record(&mut self) {
        self.send(RecordEvent::Cancelled);
    }

    fn on_tick(&mut self, elapsed_ms: u64) {
        self.send(RecordEvent::Tick { elapsed_ms });
    }

    fn on_record_too_short(&mut self, min_duration_secs: u32) {
        self.send(RecordEvent::TooShort { min_duration_secs });
    }
}
