use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response (connect, TLS, timeout).
    #[error("could not reach the server: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("{prefix}{message}", prefix = status_prefix(.status))]
    Api { status: u16, message: String },

    /// A 2xx response whose body was not the expected envelope.
    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("local storage error: {0}")]
    Storage(String),

    #[error("cannot {action} while {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: &'static str,
    },

    #[error("device registration failed after {attempts} attempts: {last}")]
    RegistrationFailed {
        attempts: u32,
        last: Box<ClientError>,
    },

    #[error("session closed")]
    Cancelled,
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

fn status_prefix(status: &u16) -> &'static str {
    match *status {
        404 => "Resource not found: ",
        401 | 403 => "Authentication error: ",
        500..=599 => "Server error: ",
        _ => "",
    }
}
