use crate::error::{AuthError, AuthResult};

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn parse_bearer(value: &str) -> AuthResult<&str> {
    let token = value
        .trim()
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::MalformedToken("authorization scheme is not Bearer".to_string()))?
        .trim();

    if token.is_empty() {
        return Err(AuthError::MalformedToken("bearer token is empty".to_string()));
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bearer_accepts_valid_token() {
        let token = parse_bearer("Bearer abc.def.ghi").expect("token");
        assert_eq!(token, "abc.def.ghi");
    }

    #[test]
    fn parse_bearer_rejects_wrong_scheme() {
        let err = parse_bearer("Basic credentials").expect_err("should reject");
        assert!(matches!(err, AuthError::MalformedToken(_)));
    }

    #[test]
    fn parse_bearer_rejects_empty_value() {
        let err = parse_bearer("Bearer    ").expect_err("should reject empty token");
        assert!(matches!(err, AuthError::MalformedToken(_)));
    }
}
