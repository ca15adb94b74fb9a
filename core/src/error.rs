//! Error types for itdk-path-core.

use std::fmt;

use thiserror::Error;

/// Coarse error category, used by callers to tell a bad request apart from
/// an unreadable input or a malformed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    Format,
    Io,
    ThreadPool,
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::Format => "format",
            ErrorKind::Io => "io",
            ErrorKind::ThreadPool => "thread_pool",
            ErrorKind::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a [`PathError::Format`] failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    Address,
    LinkLine,
    LinkToken,
    NodeLine,
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FormatKind::Address => "IPv4 address",
            FormatKind::LinkLine => "link line",
            FormatKind::LinkToken => "link token",
            FormatKind::NodeLine => "node line",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum PathError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("malformed {kind}: {input:?}")]
    Format { kind: FormatKind, input: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start worker pool: {0}")]
    ThreadPool(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PathError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        PathError::InvalidArgument(message.into())
    }

    pub fn format(kind: FormatKind, input: impl Into<String>) -> Self {
        PathError::Format {
            kind,
            input: input.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        PathError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PathError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            PathError::Format { .. } => ErrorKind::Format,
            PathError::Io { .. } => ErrorKind::Io,
            PathError::ThreadPool(_) => ErrorKind::ThreadPool,
            PathError::Config(_) => ErrorKind::Config,
        }
    }
}

impl From<serde_yaml::Error> for PathError {
    fn from(err: serde_yaml::Error) -> Self {
        PathError::Config(err.to_string())
    }
}

impl From<rayon::ThreadPoolBuildError> for PathError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        PathError::ThreadPool(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PathError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_format_error_display() {
        let err = PathError::format(FormatKind::Address, "10.0.0.256");
        assert_eq!(err.kind(), ErrorKind::Format);
        assert_eq!(err.to_string(), "malformed IPv4 address: \"10.0.0.256\"");
    }

    #[test]
    fn test_invalid_argument_kind() {
        let err = PathError::invalid_argument("destination set is empty");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.kind().as_str(), "invalid_argument");
        assert!(err.to_string().contains("destination set is empty"));
    }

    #[test]
    fn test_io_error_keeps_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = PathError::io("reading midar-iff.links", io_err);
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.source().unwrap().to_string().contains("no such file"));
        assert!(err.to_string().starts_with("reading midar-iff.links"));
    }

    #[test]
    fn test_yaml_error_maps_to_config() {
        let yaml_err = serde_yaml::from_str::<u32>("[not, a, number]").unwrap_err();
        let err: PathError = yaml_err.into();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
