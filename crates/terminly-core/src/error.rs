use std::fmt;

#[derive(Debug)]
pub enum TerminError {
    Sms(String),
    Llm { provider: String, message: String },
    Integration(String),
    Config(String),
    Http { status: u16, body: String },
}

impl fmt::Display for TerminError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sms(msg) => write!(f, "sms error: {msg}"),
            Self::Llm { provider, message } => write!(f, "llm error ({provider}): {message}"),
            Self::Integration(msg) => write!(f, "integration error: {msg}"),
            Self::Config(msg) => write!(f, "config error: {msg}"),
            Self::Http { status, body } => write!(f, "http error ({status}): {body}"),
        }
    }
}

impl std::error::Error for TerminError {}

pub type Result<T> = std::result::Result<T, TerminError>;
