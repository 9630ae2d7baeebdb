pub mod consumer;
pub mod error;
pub mod producer;
pub mod progress;
pub mod queue;
pub mod retry;
pub mod transform;
