//! HTTP API handlers for mwrt-server

pub mod rule_of_thumb;

pub use rule_of_thumb::rule_of_thumb;
