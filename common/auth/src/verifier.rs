use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{KeySetCache, RefreshOutcome};
use crate::claims::Claims;
use crate::config::{VerifierConfig, VerifierOptions};
use crate::error::{AuthError, AuthResult, ErrorKind};
use crate::fetcher::KeySetFetcher;
use crate::keys::{KeySet, VerificationKey};

/// Outcome of [`TokenVerifier::verify_token`].
///
/// An invalid result always carries exactly one error. Claims are attached
/// whenever the token payload could be read, even if verification failed.
#[derive(Debug)]
pub struct VerificationResult {
    claims: Option<Claims>,
    error: Option<AuthError>,
}

impl VerificationResult {
    fn valid(claims: Claims) -> Self {
        Self {
            claims: Some(claims),
            error: None,
        }
    }

    fn invalid(claims: Option<Claims>, error: AuthError) -> Self {
        Self {
            claims,
            error: Some(error),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }

    pub fn claims(&self) -> Option<&Claims> {
        self.claims.as_ref()
    }

    pub fn error(&self) -> Option<&AuthError> {
        self.error.as_ref()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(AuthError::kind)
    }

    /// Verified claims, or the verification error.
    pub fn into_result(self) -> AuthResult<Claims> {
        match (self.error, self.claims) {
            (Some(error), _) => Err(error),
            (None, Some(claims)) => Ok(claims),
            (None, None) => Err(AuthError::MalformedToken("no claims decoded".to_string())),
        }
    }
}

/// Verifies Memberstack member tokens against the provider's JWKS.
///
/// The key set is fetched on first use and cached for the lifetime of the
/// verifier. Calls block while that fetch is in flight; afterwards
/// verification does no network I/O.
pub struct TokenVerifier {
    config: VerifierConfig,
    cache: KeySetCache,
}

impl TokenVerifier {
    pub fn new(options: VerifierOptions) -> AuthResult<Self> {
        let config = VerifierConfig::from(options);
        let fetcher = KeySetFetcher::new(config.jwks_endpoint.clone(), config.http_timeout)?;
        Ok(Self::with_fetcher(config, fetcher))
    }

    /// Builds a verifier around an existing fetcher; `config.jwks_endpoint`
    /// is informational in that case.
    pub fn with_fetcher(config: VerifierConfig, fetcher: KeySetFetcher) -> Self {
        Self {
            config,
            cache: KeySetCache::new(fetcher),
        }
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    pub fn cache(&self) -> &KeySetCache {
        &self.cache
    }

    pub fn verify_token(&self, token: &str) -> VerificationResult {
        let keys = match self.keys() {
            Ok(keys) => keys,
            Err(err) => {
                warn!(error = %err, "cannot verify token without JWKS");
                return VerificationResult::invalid(None, err);
            }
        };

        match self.verify_with(&keys, token) {
            Ok(claims) => VerificationResult::valid(claims),
            Err(err) => {
                warn!(kind = %err.kind(), error = %err, "token rejected");
                VerificationResult::invalid(peek_claims(token), err)
            }
        }
    }

    /// Like [`TokenVerifier::verify_token`] but for `?` call sites.
    pub fn verify(&self, token: &str) -> AuthResult<Claims> {
        let keys = self.keys()?;
        self.verify_with(&keys, token)
    }

    /// Fetches the JWKS again regardless of the cache. See
    /// [`KeySetCache::force_refresh`] for the failure policy.
    pub fn force_refresh(&self) -> AuthResult<RefreshOutcome> {
        self.cache.force_refresh()
    }

    fn keys(&self) -> AuthResult<Arc<KeySet>> {
        self.cache
            .get_or_fetch()
            .map_err(|err| AuthError::KeySetUnavailable(Box::new(err)))
    }

    fn verify_with(&self, keys: &KeySet, token: &str) -> AuthResult<Claims> {
        let header = decode_header(token)
            .map_err(|err| AuthError::MalformedToken(format!("token header: {err}")))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::MalformedToken("token header has no kid".to_string()))?;
        let key = keys
            .get(&kid)
            .ok_or_else(|| AuthError::UnknownKeyId(kid.clone()))?;

        let token_data = decode::<Value>(token, key.decoding_key(), &self.validation(key))
            .map_err(|err| {
                AuthError::from_jwt(err, &self.config.issuer, self.config.audience.as_deref())
            })?;
        let claims = Claims::try_from(token_data.claims)?;
        self.check_issued_at(&claims)?;

        debug!(kid, member = %claims.subject_id, "verified JWT successfully");
        Ok(claims)
    }

    fn validation(&self, key: &VerificationKey) -> Validation {
        let algorithms = key.algorithms();
        let default_alg = algorithms.first().copied().unwrap_or(Algorithm::RS256);
        let mut validation = Validation::new(default_alg);
        validation.algorithms = algorithms.to_vec();
        validation.set_issuer(&[self.config.issuer.as_str()]);
        validation.required_spec_claims.insert("iss".to_string());
        match self.config.audience.as_deref() {
            Some(audience) => {
                validation.set_audience(&[audience]);
                validation.required_spec_claims.insert("aud".to_string());
            }
            None => validation.validate_aud = false,
        }
        validation.validate_nbf = true;
        validation.leeway = self.config.leeway_seconds;
        validation
    }

    fn check_issued_at(&self, claims: &Claims) -> AuthResult<()> {
        let Some(issued_at) = claims.issued_at else {
            return Ok(());
        };
        let leeway = i64::try_from(self.config.leeway_seconds).unwrap_or(i64::MAX);
        if issued_at.timestamp() > Utc::now().timestamp().saturating_add(leeway) {
            return Err(AuthError::NotYetValid);
        }
        Ok(())
    }
}

/// Reads the payload without checking signature or claims.
fn peek_claims(token: &str) -> Option<Claims> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<Value>(token, &DecodingKey::from_secret(&[]), &validation).ok()?;
    Claims::try_from(data.claims).ok()
}
