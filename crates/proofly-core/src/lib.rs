//! Proofly core — settings, configuration store, errors and shared types.
//!
//! # Modules
//!
//! - [`config`] — on-disk schema (`Config`, `ProviderSettings`) and loader
//! - [`store`] — the `ConfigStore` key-value seam plus file and memory stores
//! - [`error`] — `ProofreadError` taxonomy shared by every crate
//! - [`types`] — correction requests/results, connectivity reports, suggestions
//! - [`utils`] — paths, timestamps, string helpers

pub mod config;
pub mod error;
pub mod store;
pub mod types;
pub mod utils;

pub use config::{Config, ProviderSettings, SettingsPatch, TimeoutConfig};
pub use error::{ErrorKind, ProofreadError};
pub use store::{ConfigStore, JsonFileStore, MemoryStore};
pub use types::{
    ConnectivityDetails, ConnectivityReport, CorrectionRequest, CorrectionResult, InferenceTest,
    ProofreadContext, Suggestion,
};
