pub mod client;
pub mod error;
pub mod model;

pub use client::QueuesApi;
pub use error::QueuesError;
pub use model::{QueueEntry, QueuePriority, QueueStatus};
