//! Error handling for the field visualization core
//!
//! Construction failures surface here as `EngineError`; degenerate data
//! (zero-variance ranges, non-finite depths) never does.

use std::error::Error as StdError;
use std::fmt;

use crate::config::ConfigError;
use crate::gpu::GpuError;

/// Main error type for the engine
#[derive(Debug)]
pub enum EngineError {
    // Buffer errors
    EmptyBuffer {
        label: String,
    },
    BufferSizeMismatch {
        label: String,
        expected: usize,
        found: usize,
    },
    ElementKindMismatch {
        label: String,
        kind: String,
        reason: String,
    },

    // Transfer function errors
    InvalidSampleCount {
        name: String,
        count: usize,
        max: usize,
    },
    TransferTableMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    TransferValueOutOfRange {
        name: String,
        index: usize,
        value: f32,
    },
    InvalidControlPoints {
        name: String,
        reason: String,
    },

    // Cluster tree errors
    EmptyPointSet,

    // Depth sort errors
    InvalidBucketCount {
        count: usize,
        max: usize,
    },

    // Subsystems
    Gpu(GpuError),
    Config(ConfigError),

    // Generic fallback
    Internal {
        message: String,
    },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::EmptyBuffer { label } => {
                write!(f, "Buffer '{}' has no elements", label)
            }
            EngineError::BufferSizeMismatch {
                label,
                expected,
                found,
            } => write!(
                f,
                "Buffer '{}' size mismatch: expected {} bytes, found {}",
                label, expected, found
            ),
            EngineError::ElementKindMismatch {
                label,
                kind,
                reason,
            } => write!(f, "Buffer '{}' cannot hold {}: {}", label, kind, reason),

            EngineError::InvalidSampleCount { name, count, max } => write!(
                f,
                "Transfer function '{}' sample count {} out of range 1..={}",
                name, count, max
            ),
            EngineError::TransferTableMismatch {
                name,
                expected,
                found,
            } => write!(
                f,
                "Transfer function '{}' expects {} RGBA floats, found {}",
                name, expected, found
            ),
            EngineError::TransferValueOutOfRange { name, index, value } => write!(
                f,
                "Transfer function '{}' value {} at index {} is outside [0, 1]",
                name, value, index
            ),
            EngineError::InvalidControlPoints { name, reason } => {
                write!(f, "Transfer function '{}' control points: {}", name, reason)
            }

            EngineError::EmptyPointSet => write!(f, "Cannot build a cluster tree from zero points"),

            EngineError::InvalidBucketCount { count, max } => {
                write!(f, "Bucket count {} out of range 1..={}", count, max)
            }

            EngineError::Gpu(err) => write!(f, "GPU error: {}", err),
            EngineError::Config(err) => write!(f, "Config error: {}", err),

            EngineError::Internal { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl StdError for EngineError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            EngineError::Gpu(err) => Some(err),
            EngineError::Config(err) => Some(err),
            _ => None,
        }
    }
}

/// Type alias for Results in the engine
pub type EngineResult<T> = Result<T, EngineError>;

impl From<GpuError> for EngineError {
    fn from(error: GpuError) -> Self {
        EngineError::Gpu(error)
    }
}

impl From<ConfigError> for EngineError {
    fn from(error: ConfigError) -> Self {
        EngineError::Config(error)
    }
}

/// Convert Option to Result with context
pub trait OptionExt<T> {
    fn ok_or_engine<F>(self, f: F) -> EngineResult<T>
    where
        F: FnOnce() -> EngineError;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_engine<F>(self, f: F) -> EngineResult<T>
    where
        F: FnOnce() -> EngineError,
    {
        self.ok_or_else(f)
    }
}

/// Extension trait for adding context to errors
pub trait ErrorContext<T> {
    fn context(self, msg: &str) -> EngineResult<T>;
    fn with_context<F>(self, f: F) -> EngineResult<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: fmt::Display,
{
    fn context(self, msg: &str) -> EngineResult<T> {
        self.map_err(|e| EngineError::Internal {
            message: format!("{}: {}", msg, e),
        })
    }

    fn with_context<F>(self, f: F) -> EngineResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| EngineError::Internal {
            message: format!("{}: {}", f(), e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::BufferSizeMismatch {
            label: "positions".to_string(),
            expected: 24,
            found: 12,
        };
        assert_eq!(
            err.to_string(),
            "Buffer 'positions' size mismatch: expected 24 bytes, found 12"
        );
    }

    #[test]
    fn test_option_ext() {
        let opt: Option<i32> = None;
        let result = opt.ok_or_engine(|| EngineError::EmptyPointSet);
        assert!(matches!(result, Err(EngineError::EmptyPointSet)));
    }

    #[test]
    fn test_error_context() {
        let result: Result<i32, std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));
        let err = result.context("loading config").unwrap_err();
        assert!(err.to_string().contains("loading config"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_gpu_error_source() {
        let err: EngineError = GpuError::DeviceNotFound.into();
        assert!(err.source().is_some());
    }
}
