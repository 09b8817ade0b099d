use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use sha2::{Digest, Sha256};

use crate::config::{SecretScheme, ToolSecret};
use crate::error::AppError;

/// Check the shared secret the agent's save tool presents.
///
/// An unconfigured secret rejects every caller: the record endpoint is never
/// open by omission.
pub fn require_tool_secret(
    headers: &HeaderMap,
    expected: Option<&ToolSecret>,
) -> Result<(), AppError> {
    let Some(expected) = expected else {
        tracing::warn!("Tool call refused: TOOL_SECRET not configured");
        return Err(AppError::Unauthorized);
    };

    match presented_secret(headers, &expected.scheme) {
        Some(token) if secrets_match(token, &expected.value) => Ok(()),
        Some(_) => {
            tracing::warn!(decision = "deny", reason = "mismatch", "tool secret check");
            Err(AppError::Unauthorized)
        }
        None => {
            tracing::warn!(decision = "deny", reason = "missing", "tool secret check");
            Err(AppError::Unauthorized)
        }
    }
}

fn presented_secret<'a>(headers: &'a HeaderMap, scheme: &SecretScheme) -> Option<&'a str> {
    let token = match scheme {
        SecretScheme::Bearer => strip_bearer(headers.get(AUTHORIZATION)?.to_str().ok()?),
        SecretScheme::Header(name) => headers.get(name)?.to_str().ok()?,
    };
    Some(token.trim()).filter(|token| !token.is_empty())
}

/// Drop a leading `Bearer ` (any case). A bare token is passed through.
fn strip_bearer(value: &str) -> &str {
    let value = value.trim();
    match value.split_once(char::is_whitespace) {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim_start(),
        _ => value,
    }
}

/// Compare SHA-256 digests so timing does not reveal a common prefix.
fn secrets_match(presented: &str, expected: &str) -> bool {
    digest(presented) == digest(expected)
}

fn digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderName, HeaderValue};

    use super::*;

    fn bearer_secret() -> ToolSecret {
        ToolSecret {
            value: "s3cret".to_string(),
            scheme: SecretScheme::Bearer,
        }
    }

    fn headers(name: &'static str, value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn accepts_bearer_token_in_any_case() {
        let secret = bearer_secret();
        assert!(require_tool_secret(&headers("authorization", "Bearer s3cret"), Some(&secret)).is_ok());
        assert!(require_tool_secret(&headers("authorization", "bearer   s3cret"), Some(&secret)).is_ok());
        assert!(require_tool_secret(&headers("authorization", "s3cret"), Some(&secret)).is_ok());
    }

    #[test]
    fn rejects_wrong_missing_or_unconfigured_secret() {
        let secret = bearer_secret();
        assert!(matches!(
            require_tool_secret(&headers("authorization", "Bearer nope"), Some(&secret)),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            require_tool_secret(&HeaderMap::new(), Some(&secret)),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            require_tool_secret(&headers("authorization", "Bearer "), Some(&secret)),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            require_tool_secret(&headers("authorization", "Bearer s3cret"), None),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn custom_header_scheme_ignores_authorization() {
        let secret = ToolSecret {
            value: "s3cret".to_string(),
            scheme: SecretScheme::Header(HeaderName::from_static("x-tool-secret")),
        };
        assert!(require_tool_secret(&headers("x-tool-secret", "s3cret"), Some(&secret)).is_ok());
        assert!(matches!(
            require_tool_secret(&headers("authorization", "Bearer s3cret"), Some(&secret)),
            Err(AppError::Unauthorized)
        ));
    }
}
