#![allow(dead_code)]

use std::sync::OnceLock;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use httpmock::prelude::*;
use httpmock::Mock;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use memberstack_auth::{TokenVerifier, VerifierOptions};
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::rand_core::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde_json::{json, Value};

pub const ISSUER: &str = "https://api.memberstack.com";
pub const APP_ID: &str = "app_someid";
pub const MEMBER_ID: &str = "mem_sb_cm0l6tg1400l40ssa6wpx224r";
pub const PRIMARY_KID: &str = "5b159001-e6a4-4b19-a9f0-7f0ea18f6f75";

/// RSA signing key published in a test JWKS under `kid`.
#[derive(Clone)]
pub struct TestKey {
    pub kid: String,
    encoding: EncodingKey,
    modulus: String,
    exponent: String,
}

impl TestKey {
    pub fn generate(kid: &str) -> Self {
        let mut rng = OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("key generation");
        let public_key = private_key.to_public_key();
        let private_pem = private_key
            .to_pkcs1_pem(LineEnding::LF)
            .expect("private pem");

        Self {
            kid: kid.to_string(),
            encoding: EncodingKey::from_rsa_pem(private_pem.as_bytes()).expect("encoding key"),
            modulus: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
            exponent: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
        }
    }

    pub fn jwk(&self) -> Value {
        json!({
            "kty": "RSA",
            "use": "sig",
            "alg": "RS256",
            "kid": self.kid,
            "n": self.modulus,
            "e": self.exponent
        })
    }

    pub fn sign(&self, claims: &Value) -> String {
        self.sign_as(&self.kid, claims)
    }

    /// Signs with this key but advertises `kid` in the header.
    pub fn sign_as(&self, kid: &str, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid.to_string());
        encode(&header, claims, &self.encoding).expect("sign token")
    }
}

/// Shared key; RSA generation is slow enough to do only once per binary.
pub fn primary_key() -> &'static TestKey {
    static KEY: OnceLock<TestKey> = OnceLock::new();
    KEY.get_or_init(|| TestKey::generate(PRIMARY_KID))
}

pub fn jwks_body(keys: &[&TestKey]) -> String {
    let keys: Vec<Value> = keys.iter().map(|key| key.jwk()).collect();
    json!({ "keys": keys }).to_string()
}

pub fn serve_jwks<'a>(server: &'a MockServer, body: &str) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(GET).path("/jwks");
        then.status(200)
            .header("content-type", "application/json")
            .body(body);
    })
}

pub fn serve_status(server: &MockServer, status: u16) -> Mock<'_> {
    server.mock(|when, then| {
        when.method(GET).path("/jwks");
        then.status(status).body("upstream unavailable");
    })
}

pub fn options_for(server: &MockServer) -> VerifierOptions {
    VerifierOptions::new()
        .with_jwks_endpoint(server.url("/jwks"))
        .with_http_timeout_seconds(5)
}

pub fn verifier_for(server: &MockServer, audience: Option<&str>) -> TokenVerifier {
    let mut options = options_for(server);
    if let Some(audience) = audience {
        options = options.with_audience(audience);
    }
    TokenVerifier::new(options).expect("verifier builds")
}

/// Member claims valid for ten minutes, issued by Memberstack for `APP_ID`.
pub fn member_claims() -> Value {
    let now = Utc::now().timestamp();
    json!({
        "id": MEMBER_ID,
        "type": "member",
        "isAdmin": true,
        "iss": ISSUER,
        "aud": APP_ID,
        "iat": now - 60,
        "exp": now + 600
    })
}

pub fn with_claim(mut claims: Value, name: &str, value: Value) -> Value {
    claims[name] = value;
    claims
}

pub fn without_claim(mut claims: Value, name: &str) -> Value {
    if let Some(object) = claims.as_object_mut() {
        object.remove(name);
    }
    claims
}

/// Rewrites the payload segment of a signed token, keeping its signature.
pub fn tamper_payload(token: &str, edit: impl FnOnce(&mut Value)) -> String {
    let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
    let decoded = URL_SAFE_NO_PAD.decode(&parts[1]).expect("payload base64");
    let mut payload: Value = serde_json::from_slice(&decoded).expect("payload json");
    edit(&mut payload);
    parts[1] = URL_SAFE_NO_PAD.encode(payload.to_string());
    parts.join(".")
}
