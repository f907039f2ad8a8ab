//! Error types for sinks and the routing directory.
//!
//! Transient transport conditions (full queues, disconnected peers) are not
//! errors; they surface as [`PublishResult`](crate::PublishResult) codes.
//! `MessagingError` is reserved for wiring mistakes that should stop the
//! administrative component before the system reaches its running state.

use thiserror::Error;

use crate::types::ServiceType;

/// Messaging substrate errors.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// A sink id does not fit the directory's slot array.
    #[error(
        "sink id {sink_id} exceeds the maximum allowable sink id {max_sink_id}; \
         increase the directory capacity"
    )]
    SinkIdOutOfRange {
        /// Offending sink id
        sink_id: i32,
        /// Largest sink id the directory accepts
        max_sink_id: i32,
    },

    /// A stable reference was asked to switch to a sink playing another role.
    #[error(
        "cannot replace sink [{sink_id}, {current}] with a sink of different type [{requested}]"
    )]
    IncompatibleRebind {
        /// Sink id of the reference being rebound
        sink_id: i32,
        /// Service type currently bound
        current: ServiceType,
        /// Service type of the rejected sink
        requested: ServiceType,
    },

    /// The sink has no transport that can be cloned under another identity.
    #[error("cannot clone sink {name} under a new identity")]
    UnsupportedClone {
        /// Name of the sink that could not be cloned
        name: String,
    },

    /// `commit()` or `abort()` was called without a successful claim.
    #[error("commit called without a successful claim")]
    NothingClaimed,

    /// Invalid construction parameters.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (network)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MessagingError {
    /// Create a new configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a sink-id range error for a directory of `capacity` slots.
    pub fn sink_id_out_of_range(sink_id: i32, capacity: usize) -> Self {
        Self::SinkIdOutOfRange {
            sink_id,
            max_sink_id: capacity as i32 - 1,
        }
    }

    /// Whether this error indicates a wiring mistake rather than an IO failure.
    pub fn is_configuration_error(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

/// Result alias used across the crate.
pub type Result<T, E = MessagingError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_message_names_limit() {
        let err = MessagingError::sink_id_out_of_range(12, 8);
        assert_eq!(
            err.to_string(),
            "sink id 12 exceeds the maximum allowable sink id 7; increase the directory capacity"
        );
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_incompatible_rebind_message() {
        let err = MessagingError::IncompatibleRebind {
            sink_id: 3,
            current: ServiceType::Admin,
            requested: ServiceType::Strategy,
        };
        assert_eq!(
            err.to_string(),
            "cannot replace sink [3, admin] with a sink of different type [strategy]"
        );
    }

    #[test]
    fn test_io_error_is_not_configuration() {
        let err: MessagingError =
            std::io::Error::new(std::io::ErrorKind::AddrInUse, "busy").into();
        assert!(!err.is_configuration_error());
    }
}
