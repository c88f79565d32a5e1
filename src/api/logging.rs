use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;

use crate::util::{env_non_empty, parse_bool_str};

const DEBUG_PAYLOAD_ENV: &str = "PENWRIGHT_DEBUG_PAYLOAD";
const API_LOG_PATH_ENV: &str = "PENWRIGHT_API_LOG_PATH";

pub fn debug_payload_enabled() -> bool {
    std::env::var(DEBUG_PAYLOAD_ENV)
        .ok()
        .and_then(|v| parse_bool_str(&v))
        .unwrap_or(false)
}

/// Records an outgoing request body. Credentials travel in headers and never reach this log.
pub fn emit_debug_payload(request_url: &str, payload: &Value) {
    let formatted_payload = serde_json::to_string_pretty(payload)
        .unwrap_or_else(|_| "<payload serialization error>".to_string());
    let message = format!(
        "PENWRIGHT_API DEBUG payload_request url={request_url}\npayload:\n{formatted_payload}\n"
    );
    emit_log_message(&message);
}

pub fn emit_response_debug(request_url: &str, status: u16, body: &str) {
    let message =
        format!("PENWRIGHT_API DEBUG response url={request_url} status={status}\nbody:\n{body}\n");
    emit_log_message(&message);
}

fn emit_log_message(message: &str) {
    if let Some(path) = env_non_empty(API_LOG_PATH_ENV) {
        match append_log_file(&path, message) {
            Ok(()) => return,
            Err(error) => {
                tracing::warn!(path = %path, %error, "cannot append to api debug log");
            }
        }
    }

    tracing::debug!(target: "penwright::api", "{message}");
}

fn append_log_file(path: &str, message: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(message.as_bytes())
}
