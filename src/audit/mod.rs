//! Generation provenance — BLAKE3 content hashing, the append-only JSONL
//! event log, and drift detection over generated files.

pub mod drift;
pub mod eventlog;
pub mod hasher;
