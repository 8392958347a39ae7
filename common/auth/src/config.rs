use std::time::Duration;

/// Issuer Memberstack stamps into every member token.
pub const DEFAULT_ISSUER: &str = "https://api.memberstack.com";
/// Location of Memberstack's published JWKS.
pub const DEFAULT_JWKS_ENDPOINT: &str = "http://member-jwt.s3-website-us-east-1.amazonaws.com/";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
/// Upper bound for the clock-skew leeway (one day). Larger requests are
/// clamped so the validity window arithmetic cannot overflow.
pub const MAX_LEEWAY_SECONDS: u64 = 86_400;

/// Caller-supplied verifier settings. Unset (empty or zero) fields fall back
/// to the defaults when the options are resolved into a [`VerifierConfig`].
#[derive(Debug, Clone, Default)]
pub struct VerifierOptions {
    pub issuer: Option<String>,
    pub jwks_endpoint: Option<String>,
    /// Memberstack app id expected in `aud`. Leave unset to skip the
    /// audience check entirely.
    pub audience: Option<String>,
    pub http_timeout_seconds: u64,
    pub leeway_seconds: u64,
}

impl VerifierOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_jwks_endpoint(mut self, url: impl Into<String>) -> Self {
        self.jwks_endpoint = Some(url.into());
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn with_http_timeout_seconds(mut self, seconds: u64) -> Self {
        self.http_timeout_seconds = seconds;
        self
    }

    /// Adjust the allowed clock skew for `exp`, `nbf` and `iat`. Capped at
    /// [`MAX_LEEWAY_SECONDS`].
    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway_seconds = seconds;
        self
    }
}

/// Resolved runtime configuration for token verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierConfig {
    /// Expected issuer claim (iss), compared verbatim.
    pub issuer: String,
    pub jwks_endpoint: String,
    /// Expected audience claim (aud); `None` disables the check.
    pub audience: Option<String>,
    pub http_timeout: Duration,
    /// Allowable clock skew in seconds.
    pub leeway_seconds: u64,
}

impl From<VerifierOptions> for VerifierConfig {
    fn from(options: VerifierOptions) -> Self {
        let http_timeout = if options.http_timeout_seconds == 0 {
            DEFAULT_HTTP_TIMEOUT
        } else {
            Duration::from_secs(options.http_timeout_seconds)
        };

        Self {
            issuer: normalize_optional(options.issuer)
                .unwrap_or_else(|| DEFAULT_ISSUER.to_string()),
            jwks_endpoint: normalize_optional(options.jwks_endpoint)
                .unwrap_or_else(|| DEFAULT_JWKS_ENDPOINT.to_string()),
            audience: normalize_optional(options.audience),
            http_timeout,
            leeway_seconds: options.leeway_seconds.min(MAX_LEEWAY_SECONDS),
        }
    }
}

impl Default for VerifierConfig {
    fn default() -> Self {
        VerifierOptions::default().into()
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
