//! `POST /solve` transport.
//!
//! The browser build goes through `gloo-net` (fetch); the native build uses a
//! blocking `reqwest` client and must be driven from a worker thread.

use crate::error::SolveError;
use crate::protocol::{SolveRequest, SolveResponse};

#[cfg(target_arch = "wasm32")]
pub async fn solve(endpoint: &str, request: &SolveRequest) -> Result<SolveResponse, SolveError> {
    use gloo_net::http::Request;

    let response = Request::post(endpoint)
        .json(request)
        .map_err(|e| SolveError::Body(e.to_string()))?
        .send()
        .await
        .map_err(|e| SolveError::Transport(e.to_string()))?;
    check_status(response.status(), &response.status_text())?;
    let text = response
        .text()
        .await
        .map_err(|e| SolveError::Transport(e.to_string()))?;
    parse_response(&text)
}

#[cfg(not(target_arch = "wasm32"))]
pub async fn solve(endpoint: &str, request: &SolveRequest) -> Result<SolveResponse, SolveError> {
    let response = reqwest::blocking::Client::new()
        .post(endpoint)
        .json(request)
        .send()
        .map_err(|e| SolveError::Transport(e.to_string()))?;
    let status = response.status();
    check_status(status.as_u16(), status.canonical_reason().unwrap_or_default())?;
    let text = response
        .text()
        .map_err(|e| SolveError::Transport(e.to_string()))?;
    parse_response(&text)
}

/// Anything outside 2xx is a failed solve.
pub fn check_status(status: u16, text: &str) -> Result<(), SolveError> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(SolveError::Status { status, text: text.to_owned() })
    }
}

pub fn parse_response(text: &str) -> Result<SolveResponse, SolveError> {
    serde_json::from_str(text).map_err(|e| SolveError::Body(e.to_string()))
}
