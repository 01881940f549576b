// src/config/mod.rs

//! Manifest loading and validation for bootdag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a manifest from disk (`loader.rs`).
//! - Validate manifest-level invariants (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, parse_manifest};
pub use model::{ConfigSection, Manifest, RawManifest, TaskManifest, timeout_from_millis};
pub use validate::validate_raw_manifest;
