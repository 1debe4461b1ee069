//! Provider adaptation layer for Proofly.
//!
//! Turns one logical operation ("correct this text") into the request shape
//! of whichever LLM backend the user picked, and turns the answer back into
//! plain text.
//!
//! # Architecture
//!
//! - [`registry`] — static descriptors for all 21 providers + settings resolution
//! - [`wire`] — one request builder and one extractor per [`registry::WireFormat`]
//! - [`traits::Dispatcher`] — the seam the service calls through
//! - [`dispatcher::HttpDispatcher`] — the `reqwest`-backed dispatcher
//! - [`normalize`] — strips conversational wrappers, quotes and fences
//! - [`probe::ConnectivityProber`] — connection tests and model resolution

pub mod dispatcher;
pub mod normalize;
pub mod probe;
pub mod registry;
pub mod traits;
pub mod wire;

// Re-export main types for convenience
pub use dispatcher::HttpDispatcher;
pub use normalize::{normalize, normalize_opt};
pub use probe::{resolve_model, ConnectivityProber};
pub use registry::{
    by_category, find_by_key, resolve, ProviderCategory, ProviderDescriptor, ResolvedProvider,
    WireFormat, PROVIDERS,
};
pub use traits::Dispatcher;
