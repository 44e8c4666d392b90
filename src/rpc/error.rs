use thiserror::Error;

use super::hosts::HostType;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("no {0} host available")]
    NoHostAvailable(HostType),
    #[error("node transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("node unavailable: {0}")]
    Network(String),
    #[error("node returned HTTP status {status} for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("node JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected node response: {0}")]
    UnexpectedResponse(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
}
