//! RS512 access token verification.
//!
//! The public key is loaded once at startup. Verification runs on the
//! blocking pool and resolves exactly once per call.

use std::sync::Arc;

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Serialize;
use serde_json::Value;

use super::AuthError;

/// Verified subject of an access token. Lives for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub sub: String,
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("invalid public key: {0}")]
    InvalidKey(jsonwebtoken::errors::Error),

    #[error("signature check failed: {0}")]
    Signature(jsonwebtoken::errors::Error),

    #[error("token has no string `sub` claim")]
    MissingSubject,

    #[error("verification task failed: {0}")]
    Task(String),
}

#[derive(Clone)]
pub struct TokenVerifier {
    key: Arc<DecodingKey>,
    validation: Validation,
}

impl TokenVerifier {
    /// Build from a PEM-encoded RSA public key (PKCS#1 or SPKI).
    pub fn from_pem(pem: &str) -> Result<Self, VerifyError> {
        let key = DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(VerifyError::InvalidKey)?;

        // Signature and expiry only: no claim is mandatory and audience is not pinned.
        let mut validation = Validation::new(Algorithm::RS512);
        validation.required_spec_claims.clear();
        validation.validate_aud = false;

        Ok(Self {
            key: Arc::new(key),
            validation,
        })
    }

    /// Check the signature and extract the subject.
    pub fn verify_blocking(&self, token: &str) -> Result<Principal, VerifyError> {
        let data = decode::<Value>(token, &self.key, &self.validation)
            .map_err(VerifyError::Signature)?;

        match data.claims.get("sub") {
            Some(Value::String(sub)) => Ok(Principal { sub: sub.clone() }),
            _ => Err(VerifyError::MissingSubject),
        }
    }

    pub async fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let verifier = self.clone();
        let token = token.to_owned();

        let outcome = tokio::task::spawn_blocking(move || verifier.verify_blocking(&token))
            .await
            .unwrap_or_else(|e| Err(VerifyError::Task(e.to_string())));

        outcome.map_err(|e| {
            tracing::debug!(error = %e, "access token rejected");
            AuthError::Unauthorized(e)
        })
    }
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("algorithm", &Algorithm::RS512)
            .finish_non_exhaustive()
    }
}


#[cfg(test)]
mod tests {
    use super::test_keys::{OTHER, PRIMARY, sign};
    use super::*;
    use serde_json::json;

    fn verifier() -> TokenVerifier {
        TokenVerifier::from_pem(&PRIMARY.public_pem).unwrap()
    }

    #[tokio::test]
    async fn test_valid_token_yields_subject() {
        let token = sign(&PRIMARY, &json!({"sub": "user-1", "exp": 4102444800u64}));
        let principal = verifier().verify(&token).await.unwrap();
        assert_eq!(principal, Principal { sub: "user-1".into() });
    }

    #[tokio::test]
    async fn test_verification_is_repeatable() {
        let v = verifier();
        let good = sign(&PRIMARY, &json!({"sub": "user-1"}));
        for _ in 0..2 {
            assert_eq!(v.verify(&good).await.unwrap().sub, "user-1");
            assert!(v.verify("not.a.token").await.is_err());
        }
    }

    #[tokio::test]
    async fn test_missing_subject_rejected() {
        let token = sign(&PRIMARY, &json!({"email": "a@example.com"}));
        assert!(matches!(
            verifier().verify(&token).await,
            Err(AuthError::Unauthorized(VerifyError::MissingSubject))
        ));
    }

    #[tokio::test]
    async fn test_non_string_subject_rejected() {
        let token = sign(&PRIMARY, &json!({"sub": 42}));
        assert!(matches!(
            verifier().verify(&token).await,
            Err(AuthError::Unauthorized(VerifyError::MissingSubject))
        ));
    }

    #[tokio::test]
    async fn test_foreign_key_rejected() {
        let token = sign(&OTHER, &json!({"sub": "user-1"}));
        assert!(matches!(
            verifier().verify(&token).await,
            Err(AuthError::Unauthorized(VerifyError::Signature(_)))
        ));
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let token = sign(&PRIMARY, &json!({"sub": "user-1", "exp": 1000}));
        assert!(verifier().verify(&token).await.is_err());
    }

    #[test]
    fn test_wrong_algorithm_rejected() {
        use base64::Engine;
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;

        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(r#"{"sub":"user-1"}"#);
        let token = format!("{header}.{payload}.");
        assert!(verifier().verify_blocking(&token).is_err());
    }

    #[test]
    fn test_bad_pem_rejected() {
        assert!(matches!(
            TokenVerifier::from_pem("not a key"),
            Err(VerifyError::InvalidKey(_))
        ));
    }
}
