pub mod jobs;
pub mod scheduler;

pub use jobs::epoch_release::{next_epoch, EpochCursor, EpochPipeline};
pub use scheduler::EpochScheduler;
