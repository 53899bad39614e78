//! Test utilities: RSA keypair, JWT factory, test app builder.

#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rsa::RsaPrivateKey;
use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey, LineEnding};
use serde_json::json;
use std::sync::{Arc, LazyLock};
use tracker_bff::config::Config;
use tracker_bff::{AppState, create_app};

/// Test RSA keypair for signing access tokens.
pub struct TestKeys {
    pub private_pem: String,
    pub public_pem: String,
}

impl TestKeys {
    pub fn generate() -> Self {
        let mut rng = rsa::rand_core::OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("failed to generate key");
        Self {
            private_pem: private_key
                .to_pkcs1_pem(LineEnding::LF)
                .expect("failed to encode private key")
                .to_string(),
            public_pem: private_key
                .to_public_key()
                .to_pkcs1_pem(LineEnding::LF)
                .expect("failed to encode public key"),
        }
    }

    /// Build an RS512-signed JWT with the given claims.
    pub fn sign_jwt(&self, claims: &serde_json::Value) -> String {
        let key = jsonwebtoken::EncodingKey::from_rsa_pem(self.private_pem.as_bytes())
            .expect("failed to load private key");
        let header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS512);
        jsonwebtoken::encode(&header, claims, &key).expect("failed to sign JWT")
    }

    /// Build a JWT whose signature is garbage.
    pub fn make_unsigned_jwt(claims: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS512","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
        let sig = URL_SAFE_NO_PAD.encode(b"fake-signature");
        format!("{header}.{payload}.{sig}")
    }
}

/// Key generation is slow; all tests share one pair.
pub static KEYS: LazyLock<TestKeys> = LazyLock::new(TestKeys::generate);

/// Claims for a user whose token is valid for another hour.
pub fn test_claims(sub: &str) -> serde_json::Value {
    let exp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs()
        + 3600;
    json!({ "sub": sub, "exp": exp, "iat": exp - 3600 })
}

pub fn expired_claims(sub: &str) -> serde_json::Value {
    json!({ "sub": sub, "exp": 1000, "iat": 900 })
}

/// Signed access token for `sub`.
pub fn access_token(sub: &str) -> String {
    KEYS.sign_jwt(&test_claims(sub))
}

/// Build a test app whose upstream API is `upstream` (usually a wiremock server).
pub fn build_test_app(upstream: &str) -> (axum::Router, Arc<AppState>) {
    let config = Config {
        api_base_url: upstream.into(),
        jwt_public_key: KEYS.public_pem.clone(),
        ..Config::test_default()
    };
    build_test_app_with_config(config)
}

pub fn build_test_app_with_config(config: Config) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::from_config(config).expect("test key must load"));
    let app = create_app(state.clone());
    (app, state)
}
