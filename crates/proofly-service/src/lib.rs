//! Proofly service layer.
//!
//! Sits between a UI and the provider layer: templates prompts, cleans and
//! parses replies, persists settings and exposes the JSON message surface.
//!
//! - [`proofreader::Proofreader`] — the façade every surface calls
//! - [`messages`] — `action`-tagged requests and their responses
//! - [`prompt`] — correction and suggestion instructions
//! - [`suggestions`] — reply parsing with JSON and line fallbacks

pub mod messages;
pub mod prompt;
pub mod proofreader;
pub mod suggestions;

pub use messages::{handle, handle_line, handle_value, ClientRequest, ClientResponse};
pub use proofreader::Proofreader;
pub use suggestions::{parse_suggestions, MAX_SUGGESTIONS};
