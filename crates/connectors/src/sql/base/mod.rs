pub mod error;
pub mod target;
