//! Row writers.

pub mod jsonl;
