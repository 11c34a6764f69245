//! Error types for ZoneFlow

use thiserror::Error;

/// ZoneFlow error type
#[derive(Error, Debug)]
pub enum ZoneflowError {
    /// Malformed MAC address text
    #[error("invalid MAC address: {0}")]
    InvalidMac(String),

    /// Malformed CIDR prefix in a zone declaration
    #[error("invalid CIDR prefix: {0}")]
    InvalidCidr(String),

    /// Address range with start above end
    #[error("inverted address range: {start} > {end}")]
    InvertedRange {
        /// Declared range start
        start: std::net::Ipv4Addr,
        /// Declared range end
        end: std::net::Ipv4Addr,
    },

    /// Zone referenced by policy but never declared
    #[error("policy references undeclared zone: {0}")]
    UndeclaredZone(String),

    /// Control-channel send failure
    #[error("control channel: {0}")]
    Channel(String),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for ZoneFlow
pub type ZoneflowResult<T> = Result<T, ZoneflowError>;
