use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tracing::trace;

/// Label of the last event of a completed cycle.
pub const DONE_LABEL: &str = "done";
/// Label of the last event of a cancelled cycle.
pub const CANCELLED_LABEL: &str = "cancelled";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub current: usize,
    pub total: usize,
    pub label: String,
}

impl ProgressEvent {
    pub fn new(current: usize, total: usize, label: impl Into<String>) -> Self {
        Self {
            current,
            total,
            label: label.into(),
        }
    }

    pub fn is_final(&self) -> bool {
        self.label == DONE_LABEL || self.label == CANCELLED_LABEL
    }
}

pub type ProgressSender = UnboundedSender<ProgressEvent>;

/// Sends to `sender` if there is one. A dropped receiver is not an error.
pub(crate) fn emit(sender: Option<&ProgressSender>, event: ProgressEvent) {
    if let Some(sender) = sender {
        if sender.send(event).is_err() {
            trace!("progress receiver dropped");
        }
    }
}
