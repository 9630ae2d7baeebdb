pub mod error;
pub mod jsonl;
