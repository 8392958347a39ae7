use std::fmt;

use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

/// Failures of the single JWKS HTTP request.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("JWKS request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("JWKS endpoint returned HTTP {status}: {body_snippet}")]
    NonSuccessStatus {
        status: StatusCode,
        body_snippet: String,
    },
    #[error("failed to read JWKS response body: {0}")]
    BodyRead(#[source] reqwest::Error),
    #[error("JWKS endpoint returned an empty body")]
    EmptyBody,
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Transport(_) => ErrorKind::TransportFailure,
            FetchError::NonSuccessStatus { .. } => ErrorKind::NonSuccessStatus,
            FetchError::BodyRead(_) | FetchError::EmptyBody => ErrorKind::BodyReadFailure,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("failed to parse JWKS response: {0}")]
    KeySetParse(#[source] serde_json::Error),
    #[error("no verification key published for kid '{0}'")]
    UnknownKeyId(String),
    #[error("token signature is invalid: {0}")]
    SignatureInvalid(String),
    #[error("token has expired")]
    Expired,
    /// `nbf` or `iat` lies in the future beyond the allowed clock skew.
    #[error("token is not valid yet")]
    NotYetValid,
    #[error("token issuer does not match '{expected}'")]
    IssuerMismatch { expected: String },
    #[error("token audience does not contain '{expected}'")]
    AudienceMismatch { expected: String },
    #[error("malformed token: {0}")]
    MalformedToken(String),
    #[error("JWKS unavailable: {0}")]
    KeySetUnavailable(#[source] Box<AuthError>),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Fetch(err) => err.kind(),
            AuthError::KeySetParse(_) => ErrorKind::KeySetParseFailure,
            AuthError::UnknownKeyId(_) => ErrorKind::UnknownKeyId,
            AuthError::SignatureInvalid(_) => ErrorKind::SignatureInvalid,
            AuthError::Expired => ErrorKind::Expired,
            AuthError::NotYetValid => ErrorKind::NotYetValid,
            AuthError::IssuerMismatch { .. } => ErrorKind::IssuerMismatch,
            AuthError::AudienceMismatch { .. } => ErrorKind::AudienceMismatch,
            AuthError::MalformedToken(_) => ErrorKind::MalformedToken,
            AuthError::KeySetUnavailable(_) => ErrorKind::KeySetUnavailable,
        }
    }

    /// Classifies a `jsonwebtoken` failure. `issuer` and `audience` are the
    /// configured expectations, echoed back in mismatch errors.
    pub(crate) fn from_jwt(
        err: jsonwebtoken::errors::Error,
        issuer: &str,
        audience: Option<&str>,
    ) -> Self {
        let issuer_mismatch = || AuthError::IssuerMismatch {
            expected: issuer.to_string(),
        };
        let audience_mismatch = || AuthError::AudienceMismatch {
            expected: audience.unwrap_or_default().to_string(),
        };

        match err.kind() {
            JwtErrorKind::InvalidSignature
            | JwtErrorKind::InvalidAlgorithm
            | JwtErrorKind::InvalidKeyFormat => AuthError::SignatureInvalid(err.to_string()),
            JwtErrorKind::ExpiredSignature => AuthError::Expired,
            JwtErrorKind::ImmatureSignature => AuthError::NotYetValid,
            JwtErrorKind::InvalidIssuer => issuer_mismatch(),
            JwtErrorKind::InvalidAudience => audience_mismatch(),
            JwtErrorKind::MissingRequiredClaim(claim) if claim == "iss" => issuer_mismatch(),
            JwtErrorKind::MissingRequiredClaim(claim) if claim == "aud" => audience_mismatch(),
            _ => AuthError::MalformedToken(err.to_string()),
        }
    }
}

/// Flat classification of every failure the verifier can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    TransportFailure,
    NonSuccessStatus,
    BodyReadFailure,
    KeySetParseFailure,
    UnknownKeyId,
    SignatureInvalid,
    Expired,
    NotYetValid,
    IssuerMismatch,
    AudienceMismatch,
    MalformedToken,
    KeySetUnavailable,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::TransportFailure => "TransportFailure",
            ErrorKind::NonSuccessStatus => "NonSuccessStatus",
            ErrorKind::BodyReadFailure => "BodyReadFailure",
            ErrorKind::KeySetParseFailure => "KeySetParseFailure",
            ErrorKind::UnknownKeyId => "UnknownKeyId",
            ErrorKind::SignatureInvalid => "SignatureInvalid",
            ErrorKind::Expired => "Expired",
            ErrorKind::NotYetValid => "NotYetValid",
            ErrorKind::IssuerMismatch => "IssuerMismatch",
            ErrorKind::AudienceMismatch => "AudienceMismatch",
            ErrorKind::MalformedToken => "MalformedToken",
            ErrorKind::KeySetUnavailable => "KeySetUnavailable",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
