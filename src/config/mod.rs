// src/config/mod.rs

//! Configuration loading and validation for pipegraph.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate it and seed the initial graph (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, parse_config};
pub use model::{ConfigFile, EdgeConfig, EngineSection, EngineSettings, NodeConfig, RawConfigFile};
pub use validate::parse_duration;
