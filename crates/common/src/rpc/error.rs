//! Error kinds carried over the bus RPC boundary, plus the two declarative
//! macros used to render any domain error enum into an HTTP response in the
//! conductor's ingress API.

use serde::{Deserialize, Serialize};
use strum_macros::AsRefStr;
use thiserror::Error;

/// Implements `From<&E> for String` using the variant's `AsRef<str>` name,
/// or a caller-supplied mapping.
#[macro_export]
macro_rules! impl_into_type_str {
    ($name:path) => {
        impl From<&$name> for String {
            fn from(e: &$name) -> Self {
                e.as_ref().to_string()
            }
        }
    };

    ($name:path, |_| $body:expr) => {
        impl From<&$name> for String {
            fn from(_: &$name) -> Self {
                $body
            }
        }
    };

    ($name:path, |$from_var:ident| $body:expr) => {
        impl From<&$name> for String {
            fn from($from_var: &$name) -> Self {
                use $name::*;

                $body
            }
        }
    };
}

/// Implements `From<&E> for http::StatusCode`, defaulting to 500 unless a
/// per-variant mapping is supplied.
#[macro_export]
macro_rules! impl_into_status_code {
    ($name:path) => {
        impl From<&$name> for ::http::status::StatusCode {
            fn from(_: &$name) -> Self {
                Self::INTERNAL_SERVER_ERROR
            }
        }
    };

    ($name:path, |_| $body:expr) => {
        impl From<&$name> for ::http::status::StatusCode {
            fn from(_: &$name) -> Self {
                $body
            }
        }
    };

    ($name:path, |$from_var:ident| $body:expr) => {
        impl From<&$name> for ::http::status::StatusCode {
            fn from($from_var: &$name) -> Self {
                use $name::*;

                $body
            }
        }
    };
}

/// Errors returned by `ConductorBusService` methods: malformed or
/// out-of-protocol calls from a connected bus agent.
#[derive(Debug, Error, Clone, Serialize, Deserialize, AsRefStr)]
pub enum ProtocolError {
    #[error("unknown board: {0}")]
    UnknownBoard(String),
    #[error("unknown session: {0}")]
    UnknownSession(u64),
    #[error("unknown request: {0}")]
    UnknownRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors returned by `BoardBusService` methods: the agent could not carry
/// out a dispatched procedure or proxy/network operation.
#[derive(Debug, Error, Clone, Serialize, Deserialize, AsRefStr)]
pub enum DispatchError {
    #[error("bus agent for this board is not connected")]
    AgentUnavailable,
    #[error("the device did not have a valid session")]
    NoValidSession,
    #[error("request timed out waiting for a response")]
    TimedOut,
    #[error("failed to write proxy configuration: {0}")]
    ProxyWriteFailed(String),
    #[error("failed to update allowlist file: {0}")]
    AllowlistWriteFailed(String),
    #[error("failed to create network interface: {0}")]
    InterfaceSetupFailed(String),
    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors returned by the registration agent's `register` call.
#[derive(Debug, Error, Clone, Serialize, Deserialize, AsRefStr)]
pub enum RegistrationError {
    #[error("no board is registered under this code")]
    UnknownCode,
    #[error("internal error: {0}")]
    Internal(String),
}
