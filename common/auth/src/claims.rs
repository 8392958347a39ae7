use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{AuthError, AuthResult};

/// Memberstack member claims plus the registered claims the verifier checks.
///
/// Serializes back to the wire claim names so it can be printed or logged
/// as the provider issued it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Claims {
    /// Memberstack member id (`id`).
    #[serde(rename = "id")]
    pub subject_id: String,
    #[serde(rename = "type")]
    pub member_type: String,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
    #[serde(rename = "sub", skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(rename = "iss")]
    pub issuer: String,
    #[serde(rename = "aud")]
    pub audience: Vec<String>,
    #[serde(rename = "iat", serialize_with = "as_timestamp")]
    pub issued_at: Option<DateTime<Utc>>,
    #[serde(rename = "exp", serialize_with = "as_timestamp")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(rename = "nbf", serialize_with = "as_timestamp", skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub raw: serde_json::Value,
}

impl Claims {
    /// True when the audience list contains `audience`.
    pub fn has_audience(&self, audience: &str) -> bool {
        self.audience.iter().any(|value| value == audience)
    }
}

#[derive(Debug, Deserialize)]
struct ClaimsRepr {
    #[serde(default)]
    id: String,
    #[serde(default, rename = "type")]
    member_type: String,
    #[serde(default, rename = "isAdmin")]
    is_admin: bool,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    iss: String,
    #[serde(default)]
    aud: Option<AudienceRepr>,
    #[serde(default)]
    iat: Option<f64>,
    #[serde(default)]
    exp: Option<f64>,
    #[serde(default)]
    nbf: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AudienceRepr {
    Single(String),
    Many(Vec<String>),
}

impl TryFrom<ClaimsRepr> for Claims {
    type Error = AuthError;

    fn try_from(value: ClaimsRepr) -> AuthResult<Self> {
        let audience = match value.aud {
            Some(AudienceRepr::Single(item)) => vec![item],
            Some(AudienceRepr::Many(items)) => items,
            None => Vec::new(),
        };

        Ok(Self {
            subject_id: value.id,
            member_type: value.member_type,
            is_admin: value.is_admin,
            subject: value.sub,
            issuer: value.iss,
            audience,
            issued_at: timestamp("iat", value.iat)?,
            expires_at: timestamp("exp", value.exp)?,
            not_before: timestamp("nbf", value.nbf)?,
            raw: serde_json::Value::Null,
        })
    }
}

impl TryFrom<serde_json::Value> for Claims {
    type Error = AuthError;

    fn try_from(value: serde_json::Value) -> AuthResult<Self> {
        let repr: ClaimsRepr = serde_json::from_value(value.clone())
            .map_err(|err| AuthError::MalformedToken(format!("claims payload: {err}")))?;
        let mut claims = Claims::try_from(repr)?;
        claims.raw = value;
        Ok(claims)
    }
}

// NumericDate values may carry a fractional part; it is dropped.
fn timestamp(name: &str, value: Option<f64>) -> AuthResult<Option<DateTime<Utc>>> {
    value
        .map(|seconds| {
            Utc.timestamp_opt(seconds.trunc() as i64, 0)
                .single()
                .ok_or_else(|| AuthError::MalformedToken(format!("{name} out of range: {seconds}")))
        })
        .transpose()
}

fn as_timestamp<S: Serializer>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(time) => serializer.serialize_i64(time.timestamp()),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_memberstack_payload() {
        let payload = json!({
            "id": "mem_sb_cm0l6tg1400l40ssa6wpx224r",
            "type": "member",
            "isAdmin": true,
            "iat": 1725297115,
            "exp": 1725300715,
            "aud": "app_clztbqqjh00450ss51dw00vy7",
            "iss": "https://api.memberstack.com"
        });
        let claims = Claims::try_from(payload.clone()).expect("claims decode");

        assert_eq!(claims.subject_id, "mem_sb_cm0l6tg1400l40ssa6wpx224r");
        assert_eq!(claims.member_type, "member");
        assert!(claims.is_admin);
        assert_eq!(claims.issuer, "https://api.memberstack.com");
        assert_eq!(claims.audience, vec!["app_clztbqqjh00450ss51dw00vy7".to_string()]);
        assert_eq!(claims.issued_at.map(|t| t.timestamp()), Some(1725297115));
        assert_eq!(claims.expires_at.map(|t| t.timestamp()), Some(1725300715));
        assert!(claims.has_audience("app_clztbqqjh00450ss51dw00vy7"));
        assert_eq!(claims.raw, payload);
    }

    #[test]
    fn missing_member_fields_default() {
        let claims = Claims::try_from(json!({ "aud": ["a", "b"] })).expect("claims decode");
        assert!(claims.subject_id.is_empty());
        assert!(!claims.is_admin);
        assert_eq!(claims.audience, vec!["a".to_string(), "b".to_string()]);
        assert!(claims.expires_at.is_none());
    }

    #[test]
    fn fractional_timestamps_are_truncated() {
        let claims = Claims::try_from(json!({ "iat": 1725297115.75, "exp": 1725300715.5 }))
            .expect("claims decode");
        assert_eq!(claims.issued_at.map(|t| t.timestamp()), Some(1725297115));
        assert_eq!(claims.expires_at.map(|t| t.timestamp()), Some(1725300715));
    }

    #[test]
    fn out_of_range_timestamp_is_malformed() {
        let err = Claims::try_from(json!({ "exp": 1e300 })).expect_err("exp out of range");
        assert!(matches!(err, AuthError::MalformedToken(_)));
    }

    #[test]
    fn wrongly_typed_claim_is_malformed() {
        let err = Claims::try_from(json!({ "exp": "tomorrow" })).expect_err("bad exp");
        assert!(matches!(err, AuthError::MalformedToken(_)));
    }

    #[test]
    fn serializes_with_wire_names() {
        let claims = Claims::try_from(json!({
            "id": "mem_1",
            "type": "member",
            "isAdmin": false,
            "iss": "https://api.memberstack.com",
            "aud": "app_1",
            "exp": 1725300715
        }))
        .expect("claims decode");

        let value = serde_json::to_value(&claims).expect("serialize");
        assert_eq!(
            value,
            json!({
                "id": "mem_1",
                "type": "member",
                "isAdmin": false,
                "iss": "https://api.memberstack.com",
                "aud": ["app_1"],
                "iat": null,
                "exp": 1725300715
            })
        );
    }
}
