pub mod progress;
pub mod scheduler;
pub mod service;
pub mod tracker;


pub use progress::{ProgressEvent, ProgressSender, CANCELLED_LABEL, DONE_LABEL};
pub use scheduler::BackgroundService;
pub use service::{ServiceResponse, TrendService};
pub use tracker::{CycleOutcome, Tracker, CYCLE_BUSY};
