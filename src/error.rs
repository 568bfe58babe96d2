use thiserror::Error;

/// Errors surfaced by the session API.
///
/// Decoding an incoming token is deliberately not represented here: a missing, malformed, or
/// tampered token always degrades to an empty session rather than an error.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No signing secret was configured, or it was empty. Fatal at startup, before any
    /// request is served.
    #[error("signing secret is missing or empty")]
    MissingSecret,

    /// The encoded token exceeds the configured size ceiling. The caller decides whether to
    /// fail the request or shed session data; nothing is truncated.
    #[error("encoded session token is {size} bytes, exceeding the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    /// A value passed to [`Session::insert`](crate::Session::insert) falls outside the
    /// supported shapes (e.g. a float or a null).
    #[error("value is not representable in a session: {0}")]
    UnsupportedValue(String),

    /// Serialization of session data failed.
    #[error("session serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}
