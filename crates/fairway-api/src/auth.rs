use axum::http::HeaderMap;

use crate::error::AppError;

/// Static bearer key shared by every client of one site.
#[derive(Clone)]
pub struct SiteKey(String);

impl SiteKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Accept the request only if it carries `Authorization: Bearer <key>`.
    pub fn verify(&self, headers: &HeaderMap) -> Result<(), AppError> {
        let token = extract_bearer_token(headers)?;
        if constant_time_eq(token.as_bytes(), self.0.as_bytes()) {
            Ok(())
        } else {
            tracing::warn!("Rejected request with wrong site key");
            Err(AppError::Unauthorized)
        }
    }
}

impl std::fmt::Debug for SiteKey {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("SiteKey([REDACTED])")
    }
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let Some(header) = headers.get("authorization") else {
        tracing::debug!("Missing Authorization header");
        return Err(AppError::Unauthorized);
    };
    let header = header.to_str().map_err(|_| {
        tracing::debug!("Authorization header is not valid UTF-8");
        AppError::Unauthorized
    })?;

    let Some((scheme, token)) = header.split_once(' ') else {
        tracing::debug!("Authorization header must be `Bearer <token>`");
        return Err(AppError::Unauthorized);
    };
    if !scheme.eq_ignore_ascii_case("bearer") {
        tracing::debug!(scheme, "Authorization scheme must be `Bearer`");
        return Err(AppError::Unauthorized);
    }
    let token = token.trim();
    if token.is_empty() {
        tracing::debug!("Bearer token is empty");
        return Err(AppError::Unauthorized);
    }

    Ok(token)
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter()
        .zip(right)
        .fold(0_u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn bearer_token_extractor_accepts_standard_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_static("Bearer site-key-1"),
        );

        assert_eq!(extract_bearer_token(&headers).unwrap(), "site-key-1");
    }

    #[test]
    fn bearer_token_extractor_rejects_wrong_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert!(extract_bearer_token(&headers).is_err());
    }

    #[test]
    fn bearer_token_extractor_rejects_empty_token() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer   "));
        assert!(extract_bearer_token(&headers).is_err());
    }

    #[test]
    fn site_key_requires_exact_match() {
        let key = SiteKey::new("s3cret");
        let mut headers = HeaderMap::new();
        assert!(key.verify(&headers).is_err());

        headers.insert("authorization", HeaderValue::from_static("Bearer s3cre"));
        assert!(key.verify(&headers).is_err());

        headers.insert("authorization", HeaderValue::from_static("bearer s3cret"));
        assert!(key.verify(&headers).is_ok());
    }

    #[test]
    fn site_key_debug_is_redacted() {
        assert!(!format!("{:?}", SiteKey::new("s3cret")).contains("s3cret"));
    }
}
