use serde::Serialize;
use std::fmt;
use std::io;

/// Closed classification of filesystem access failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanErrorKind {
    PermissionDenied,
    NotFound,
    Io,
    /// Scan-fatal failure, always recorded at path `/`
    Fatal,
}

impl ScanErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission_denied",
            Self::NotFound => "not_found",
            Self::Io => "io",
            Self::Fatal => "fatal",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "permission_denied" => Self::PermissionDenied,
            "not_found" => Self::NotFound,
            "fatal" => Self::Fatal,
            _ => Self::Io,
        }
    }
}

impl From<&io::Error> for ScanErrorKind {
    fn from(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            io::ErrorKind::NotFound => Self::NotFound,
            _ => Self::Io,
        }
    }
}

impl fmt::Display for ScanErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One filesystem access failure observed during a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanErrorRecord {
    pub path: String,
    pub kind: ScanErrorKind,
    pub message: String,
    /// Unix seconds
    pub timestamp: i64,
}

impl ScanErrorRecord {
    pub fn from_io(path: impl Into<String>, err: &io::Error, timestamp: i64) -> Self {
        Self {
            path: path.into(),
            kind: ScanErrorKind::from(err),
            message: err.to_string(),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        let missing = io::Error::from(io::ErrorKind::NotFound);
        let other = io::Error::other("disk on fire");

        assert_eq!(ScanErrorKind::from(&denied), ScanErrorKind::PermissionDenied);
        assert_eq!(ScanErrorKind::from(&missing), ScanErrorKind::NotFound);
        assert_eq!(ScanErrorKind::from(&other), ScanErrorKind::Io);
    }

    #[test]
    fn test_kind_roundtrip() {
        for kind in [
            ScanErrorKind::PermissionDenied,
            ScanErrorKind::NotFound,
            ScanErrorKind::Io,
            ScanErrorKind::Fatal,
        ] {
            assert_eq!(ScanErrorKind::parse(kind.as_str()), kind);
        }
    }
}
