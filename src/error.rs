//! Error types for buffering, resampling and waveform reduction.

/// Errors produced by the streaming and waveform operations.
///
/// Wraparound is deliberately absent: discarding data older than the preserved
/// tail is reported through [`crate::streaming::WrappedAround`] and never fails
/// a write.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WaveformError {
    /// Illegal buffer, preservation or extraction parameters.
    ///
    /// Raised eagerly at construction or configuration time.
    #[error("Invalid configuration for '{parameter}': {reason}")]
    InvalidConfiguration {
        /// Name of the rejected parameter.
        parameter: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The requested operation does not support this channel-count/encoding combination.
    #[error("Unsupported format for {operation}: {format}")]
    UnsupportedFormat {
        /// Operation that rejected the input.
        operation: &'static str,
        /// Description of the offending format.
        format: String,
    },

    /// The channel was disposed and no longer accepts samples.
    #[error("Streaming channel '{0}' is closed")]
    ChannelClosed(String),
}

impl WaveformError {
    /// Create an invalid configuration error
    pub fn invalid_configuration(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            parameter,
            reason: reason.into(),
        }
    }

    /// Create an unsupported format error
    pub fn unsupported_format(operation: &'static str, format: impl ToString) -> Self {
        Self::UnsupportedFormat {
            operation,
            format: format.to_string(),
        }
    }

    /// Check if this error came from configuration rather than from a per-call input
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::InvalidConfiguration { .. })
    }
}

/// Result type for waveform and streaming operations
pub type WaveResult<T> = Result<T, WaveformError>;
