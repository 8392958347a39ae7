pub mod bearer;
pub mod cache;
pub mod claims;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod keys;
pub mod verifier;

pub use bearer::parse_bearer;
pub use cache::{KeySetCache, RefreshOutcome};
pub use claims::Claims;
pub use config::{
    VerifierConfig, VerifierOptions, DEFAULT_ISSUER, DEFAULT_JWKS_ENDPOINT, MAX_LEEWAY_SECONDS,
};
pub use error::{AuthError, AuthResult, ErrorKind, FetchError};
pub use fetcher::{KeySetFetcher, RawKeySet};
pub use keys::{KeySet, VerificationKey};
pub use verifier::{TokenVerifier, VerificationResult};
