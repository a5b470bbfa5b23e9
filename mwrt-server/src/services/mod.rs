//! Outbound services: token management and upstream forwarding

pub mod forwarder;
pub mod token_manager;

pub use forwarder::{ForwardError, UpstreamForwarder};
pub use token_manager::{TokenError, TokenManager, TokenSnapshot};
