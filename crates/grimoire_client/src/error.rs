use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug)]
pub enum ClientError {
    /// Figure did not serialize to a JSON object.
    InvalidFigure(String),
    /// Transport failure or undecodable response.
    Http(reqwest::Error),
    /// Server answered with a non-success status.
    Status { status: u16, detail: String },
}

impl Display for ClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFigure(message) => write!(f, "invalid figure: {message}"),
            Self::Http(err) => write!(f, "http error: {err}"),
            Self::Status { status, detail } => {
                write!(f, "server rejected plot with status {status}: {detail}")
            }
        }
    }
}

impl Error for ClientError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Http(err) => Some(err),
            Self::InvalidFigure(_) | Self::Status { .. } => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}
