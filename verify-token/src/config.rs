use clap::Parser;
use memberstack_auth::VerifierOptions;

#[derive(Parser, Debug)]
#[command(
    about = "Verify a Memberstack member token against the published JWKS",
    long_about = None
)]
pub struct Options {
    /// Encoded token, optionally prefixed with "Bearer "
    #[arg(value_name = "TOKEN")]
    pub token: String,

    /// Memberstack app id the token must belong to (JWT aud). Unset skips the audience check
    #[arg(long, env = "MEMBERSTACK_APP_ID")]
    pub aud: Option<String>,

    /// Expected issuer (defaults to https://api.memberstack.com)
    #[arg(long, env = "MEMBERSTACK_ISSUER")]
    pub issuer: Option<String>,

    /// JWKS endpoint (defaults to Memberstack's published key set)
    #[arg(long = "jwks-url", env = "MEMBERSTACK_JWKS_URL")]
    pub jwks_url: Option<String>,

    /// HTTP timeout for the JWKS fetch; 0 uses the 10 second default
    #[arg(long = "timeout-secs", env = "MEMBERSTACK_HTTP_TIMEOUT_SECONDS", default_value_t = 0)]
    pub timeout_secs: u64,

    /// Allowed clock skew for exp, nbf and iat
    #[arg(long = "leeway-secs", env = "MEMBERSTACK_LEEWAY_SECONDS", default_value_t = 0)]
    pub leeway_secs: u64,
}

impl Options {
    pub fn verifier_options(&self) -> VerifierOptions {
        VerifierOptions {
            issuer: self.issuer.clone(),
            jwks_endpoint: self.jwks_url.clone(),
            audience: self.aud.clone(),
            http_timeout_seconds: self.timeout_secs,
            leeway_seconds: self.leeway_secs,
        }
    }
}
