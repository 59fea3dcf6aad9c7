use thiserror::Error;

use crate::core::orchestrator::SessionId;

/// Failures raised by the sweep core.
///
/// `Network` and `Protocol` abort the active sweep. `StaleResponse` is only
/// ever logged; it never reaches the user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SweepError {
    #[error("network error: {0}")]
    Network(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("stale response for superseded session {0}")]
    StaleResponse(SessionId),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("out-of-order point: expected distance {expected:?}, got {got}")]
    OutOfOrder { expected: Option<f64>, got: f64 },

    #[error("duplicate point at distance {0} km")]
    DuplicateDistance(f64),

    #[error("io error: {0}")]
    Io(String),
}

impl SweepError {
    pub fn network(message: impl Into<String>) -> Self { SweepError::Network(message.into()) }
    pub fn protocol(message: impl Into<String>) -> Self { SweepError::Protocol(message.into()) }
    pub fn configuration(message: impl Into<String>) -> Self { SweepError::Configuration(message.into()) }

    /// True for the kinds that abort a running sweep.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SweepError::Network(_)
                | SweepError::Protocol(_)
                | SweepError::OutOfOrder { .. }
                | SweepError::DuplicateDistance(_)
        )
    }
}

impl From<std::io::Error> for SweepError {
    fn from(e: std::io::Error) -> Self { SweepError::Io(e.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test] fn network_display() {
        let err = SweepError::network("connection refused");
        assert_eq!(format!("{}", err), "network error: connection refused");
    }
    #[test] fn protocol_display() {
        let err = SweepError::protocol("missing field `qber`");
        assert_eq!(format!("{}", err), "protocol error: missing field `qber`");
    }
    #[test] fn out_of_order_display() {
        let err = SweepError::OutOfOrder { expected: Some(20.0), got: 30.0 };
        assert_eq!(format!("{}", err), "out-of-order point: expected distance Some(20.0), got 30");
    }
    #[test] fn fatal_kinds() {
        assert!(SweepError::network("x").is_fatal());
        assert!(SweepError::protocol("x").is_fatal());
        assert!(SweepError::DuplicateDistance(10.0).is_fatal());
        assert!(!SweepError::StaleResponse(SessionId::new(1)).is_fatal());
        assert!(!SweepError::configuration("x").is_fatal());
    }
}
