use crate::error::{Result, SyncError};
use jsonwebtoken::{decode, errors::ErrorKind, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Option<String>, // user_id
    pub exp: Option<i64>,
}

/// Reject bearer tokens that are JWTs past their expiry.
///
/// The signature is not checked here; the backend owns the secret. Opaque
/// (non-JWT) tokens are passed through untouched.
pub fn ensure_not_expired(token: &str) -> Result<()> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    match decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(_) => Ok(()),
        Err(e) => match e.kind() {
            ErrorKind::ExpiredSignature => {
                Err(SyncError::Auth("Token expired".to_string()))
            }
            _ => Ok(()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token_expiring_in(offset: Duration) -> String {
        let claims = Claims {
            sub: Some("64f1c0ffee".to_string()),
            exp: Some((Utc::now() + offset).timestamp()),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"mysecretkey"),
        )
        .unwrap()
    }

    #[test]
    fn test_fresh_token_passes() {
        let token = token_expiring_in(Duration::minutes(15));
        assert!(ensure_not_expired(&token).is_ok());
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = token_expiring_in(Duration::days(-1));
        let err = ensure_not_expired(&token).unwrap_err();
        assert!(err.is_auth());
    }

    #[test]
    fn test_opaque_token_passes() {
        assert!(ensure_not_expired("not-a-jwt-session-token").is_ok());
    }
}
