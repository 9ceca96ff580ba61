//! Document repository contracts and persistence implementations.
//!
//! # Responsibility
//! - Define the `load()` / `save(patch)` contract the timeline service uses.
//! - Isolate SQLite and file-format details from business orchestration.
//!
//! # Invariants
//! - `load` never fails; missing or corrupt data degrades to defaults.
//! - `save` merges the patch field by field over what is stored.

pub mod document_repo;
pub mod json_file_repo;
