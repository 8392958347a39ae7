use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{AuthError, AuthResult};
use crate::fetcher::RawKeySet;

const RSA_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
];

/// Decoding key published under one `kid`, together with the algorithms a
/// token may declare when it is signed by that key.
#[derive(Clone)]
pub struct VerificationKey {
    key: DecodingKey,
    algorithms: Vec<Algorithm>,
}

impl VerificationKey {
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.key
    }

    pub fn algorithms(&self) -> &[Algorithm] {
        &self.algorithms
    }
}

/// Lookup from key id to verification key, built once from a fetched JWKS.
#[derive(Clone, Default)]
pub struct KeySet {
    keys: HashMap<String, VerificationKey>,
}

impl KeySet {
    /// Parses a JWKS document. Only a document that is not valid JSON (or
    /// lacks `keys`) is an error; individual keys this client cannot use are
    /// skipped.
    pub fn parse(raw: &RawKeySet) -> AuthResult<Self> {
        let document: JwksDocument =
            serde_json::from_str(raw.as_str()).map_err(AuthError::KeySetParse)?;

        let mut keys = HashMap::with_capacity(document.keys.len());
        for entry in document.keys {
            let Some(kid) = entry.kid.clone() else {
                warn!("skipping JWKS entry without kid");
                continue;
            };
            match entry.into_verification_key() {
                Ok(key) => {
                    keys.insert(kid, key);
                }
                Err(reason) => warn!(kid, reason, "skipping unusable JWKS entry"),
            }
        }

        if keys.is_empty() {
            warn!("JWKS contains no usable verification keys");
        } else {
            debug!(count = keys.len(), "parsed JWKS");
        }
        Ok(Self { keys })
    }

    pub fn get(&self, kid: &str) -> Option<&VerificationKey> {
        self.keys.get(kid)
    }

    pub fn contains(&self, kid: &str) -> bool {
        self.keys.contains_key(kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn kids(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }
}

impl fmt::Debug for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kids: Vec<&str> = self.kids().collect();
        kids.sort_unstable();
        f.debug_struct("KeySet").field("kids", &kids).finish()
    }
}

#[derive(Debug, Deserialize)]
struct JwksDocument {
    keys: Vec<JwkEntry>,
}

#[derive(Debug, Deserialize)]
struct JwkEntry {
    kid: Option<String>,
    kty: Option<String>,
    alg: Option<String>,
    #[serde(rename = "use")]
    key_use: Option<String>,
    n: Option<String>,
    e: Option<String>,
    crv: Option<String>,
    x: Option<String>,
    y: Option<String>,
}

impl JwkEntry {
    fn into_verification_key(self) -> Result<VerificationKey, String> {
        if let Some(key_use) = self.key_use.as_deref() {
            if key_use != "sig" {
                return Err(format!("key use '{key_use}' is not 'sig'"));
            }
        }

        let declared = match self.alg.as_deref() {
            Some(alg) => {
                Some(Algorithm::from_str(alg).map_err(|_| format!("unsupported alg '{alg}'"))?)
            }
            None => None,
        };

        match self.kty.as_deref() {
            Some("RSA") => {
                let algorithms = match declared {
                    Some(alg) if RSA_ALGORITHMS.contains(&alg) => vec![alg],
                    Some(alg) => return Err(format!("alg {alg:?} does not fit an RSA key")),
                    None => RSA_ALGORITHMS.to_vec(),
                };
                let (Some(n), Some(e)) = (self.n.as_deref(), self.e.as_deref()) else {
                    return Err("missing RSA components".to_string());
                };
                let key = DecodingKey::from_rsa_components(n, e).map_err(|err| err.to_string())?;
                Ok(VerificationKey { key, algorithms })
            }
            Some("EC") => {
                let curve_alg = match self.crv.as_deref() {
                    Some("P-256") => Algorithm::ES256,
                    Some("P-384") => Algorithm::ES384,
                    other => return Err(format!("unsupported curve {other:?}")),
                };
                if declared.is_some_and(|alg| alg != curve_alg) {
                    return Err(format!("alg does not fit curve {:?}", self.crv));
                }
                let (Some(x), Some(y)) = (self.x.as_deref(), self.y.as_deref()) else {
                    return Err("missing EC coordinates".to_string());
                };
                let key = DecodingKey::from_ec_components(x, y).map_err(|err| err.to_string())?;
                Ok(VerificationKey {
                    key,
                    algorithms: vec![curve_alg],
                })
            }
            other => Err(format!("unsupported key type {other:?}")),
        }
    }
}
