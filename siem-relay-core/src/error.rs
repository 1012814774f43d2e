use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Config Error - {0}")]
    Config(String),

    #[error("Secret Error - {0}")]
    Secret(String),

    #[error("Watermark Error - {0}")]
    Watermark(String),

    #[error("Transport Error - {0}")]
    Transport(String),

    #[error("Vendor API responded with HTTP {status} - {body}")]
    Status { status: u16, body: String },

    #[error("Decode Error - {0}")]
    Decode(String),

    #[error("Protocol Error - {0}")]
    Protocol(String),

    #[error("Encode Error - {0}")]
    Encode(String),

    #[error("Sink Error - {0}")]
    Sink(String),
}

impl Error {
    /// Whether repeating the same vendor request may succeed: network failures, throttling and
    /// server-side errors.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::Status { status, .. } => *status == 429 || (500..=599).contains(status),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error::Transport(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16) -> Error {
        Error::Status {
            status,
            body: String::new(),
        }
    }

    #[test]
    fn transient_classification() {
        assert!(Error::Transport("connection reset".into()).is_transient());
        assert!(status(429).is_transient());
        assert!(status(500).is_transient());
        assert!(status(503).is_transient());

        assert!(!status(400).is_transient());
        assert!(!status(401).is_transient());
        assert!(!status(404).is_transient());
        assert!(!Error::Decode("expected value".into()).is_transient());
        assert!(!Error::Protocol("missing cursor".into()).is_transient());
        assert!(!Error::Sink("rejected".into()).is_transient());
    }

    #[test]
    fn status_display() {
        let err = Error::Status {
            status: 401,
            body: "Unauthorized".into(),
        };
        assert_eq!(
            err.to_string(),
            "Vendor API responded with HTTP 401 - Unauthorized"
        );
    }
}
