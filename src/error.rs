//! Error types for lifx-lan
//!
//! # Error Recovery Strategies
//!
//! Different error types require different recovery approaches:
//!
//! ## Transport Errors (Retry Recommended)
//!
//! - **`Io`**: UDP socket error during send or receive. Read timeouts are
//!   handled internally by the receive loop and never surface as errors;
//!   any other socket failure during receive shuts the controller down.
//!   Send failures are returned to the caller, which may retry.
//!
//! ## Protocol Errors (Log and Continue)
//!
//! - **`Codec`**: A frame failed to decode (short buffer, unknown payload
//!   tag). The receive loop logs and drops the frame; the socket remains
//!   usable for future frames.
//!
//! ## Configuration Errors (Fix and Restart)
//!
//! - **`Config`**: Invalid configuration (bad TOML, zero period, source
//!   identifier below 2). Fix the configuration and recreate the client.
//! - **`NoBroadcastInterface`**: No usable IPv4 interface with a broadcast
//!   address was found. Discovery cannot work without one.
//!
//! ## Effect Control Flow (Not Failures)
//!
//! - **`Stopped`**: A matrix effect was cancelled through its stop flag.
//!   This is the cooperative-cancellation sentinel, not a system error.
//! - **`MissingColors`**: An effect that needs a palette was invoked with
//!   an empty one.

use thiserror::Error;

/// Errors that can occur in lifx-lan
///
/// See module-level documentation for recovery strategies.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("no broadcast-capable interface found")]
    NoBroadcastInterface,

    #[error("effect requires at least one color")]
    MissingColors,

    #[error("effect stopped")]
    Stopped,
}

pub type Result<T> = std::result::Result<T, Error>;
