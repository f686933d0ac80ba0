use thiserror::Error;

/// Library-wide error taxonomy.
///
/// Remote failures carry the upstream message verbatim so the CLI can show
/// the user exactly what the platform said (quota exceeded, bad key, ...).
#[derive(Debug, Error)]
pub enum Error {
    /// The platform or the LLM service returned a structured error payload.
    #[error("{0}")]
    RemoteApi(String),

    /// A required API key was absent before the call was attempted.
    #[error("{0}")]
    MissingCredential(String),

    /// The LLM's structured-output response was not valid JSON or omitted
    /// required fields.
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    /// Transport-level failure (connection refused, DNS, ...).
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Config file unreadable/unparseable, or an api_key_command failed.
    #[error("{0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
