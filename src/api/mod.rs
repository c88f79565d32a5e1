pub mod client;
pub mod http;
pub mod logging;
pub mod mock_client;

pub use client::{GenerationBackend, GenerationClient, GenerationRequest};
pub use mock_client::{MockBackend, MockGate, MockReply};
