//! Editor-side AI writing actions: capture text, dispatch a background generation
//! call, and route the reply back into the document or the conversation log.

pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod prompt;
pub mod runtime;
pub mod state;
pub mod types;
pub mod util;

#[cfg(test)]
mod test_support;

pub use controller::{ControllerState, EditorActionController, Notice};
pub use error::{ActionError, ActionResult, ErrorKind, ServiceError};
