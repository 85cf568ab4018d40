//! Persistent storage for the Archive and Shadow logs.

pub mod jsonl;

pub use jsonl::LogStore;
