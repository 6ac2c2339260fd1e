use application::auth::{SessionClaims, TokenService};
use application::error::AppError;
use bcrypt::hash as bcrypt_hash;
use bcrypt::verify as bcrypt_verify;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

pub trait AuthConfig {
    fn session_secret(&self) -> &str;
    fn session_expiration_hours(&self) -> i64;
    fn salt_cost(&self) -> u32;
}

#[derive(Debug, Clone)]
pub struct BcryptPasswordHasher {
    salt_cost: u32,
}

impl BcryptPasswordHasher {
    pub fn new(salt_cost: u32) -> Self {
        Self { salt_cost }
    }
}

impl application::auth::PasswordHasher for BcryptPasswordHasher {
    fn hash(&self, plain: &str) -> Result<String, AppError> {
        bcrypt_hash(plain, self.salt_cost).map_err(|e| AppError::Credential(e.to_string()))
    }

    fn verify(&self, pwd: &str, hashed_pwd: &str) -> Result<(), AppError> {
        if bcrypt_verify(pwd, hashed_pwd).unwrap_or(false) {
            Ok(())
        } else {
            Err(AppError::Unauthorized("invalid password".to_string()))
        }
    }
}

/// Signs and checks session tokens (HS256).
#[derive(Debug, Clone)]
pub struct JwtSessionCodec {
    secret: String,
    exp_secs: i64,
}

impl JwtSessionCodec {
    pub fn new(secret: &str, exp_secs: i64) -> Self {
        Self {
            secret: secret.to_string(),
            exp_secs,
        }
    }

    pub fn from_config(cfg: &impl AuthConfig) -> Self {
        Self::new(cfg.session_secret(), cfg.session_expiration_hours() * 3600)
    }

    pub fn exp_secs(&self) -> i64 {
        self.exp_secs
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct JwtClaims {
    pub sub: String,
    pub typ: String,
    pub exp: i64,
    pub iat: i64,
}

impl JwtClaims {
    fn new(claims: &SessionClaims, exp_secs: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: claims.subject.clone(),
            typ: claims.user_type.clone(),
            exp: now + exp_secs,
            iat: now,
        }
    }
}

impl From<JwtClaims> for SessionClaims {
    fn from(claims: JwtClaims) -> Self {
        Self {
            subject: claims.sub,
            user_type: claims.typ,
        }
    }
}

impl TokenService for JwtSessionCodec {
    fn issue(&self, claims: &SessionClaims) -> Result<String, AppError> {
        let claims = JwtClaims::new(claims, self.exp_secs);
        let key = EncodingKey::from_secret(self.secret.as_bytes());
        encode(&Header::new(Algorithm::HS256), &claims, &key)
            .map_err(|e| AppError::Unauthorized(e.to_string()))
    }

    fn verify(&self, token: &str) -> Result<SessionClaims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        let token_data = decode::<JwtClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

        Ok(token_data.claims.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use application::auth::PasswordHasher;

    fn claims() -> SessionClaims {
        SessionClaims {
            subject: "12".to_string(),
            user_type: "panel".to_string(),
        }
    }

    #[test]
    fn bcrypt_hash_verifies_and_differs_from_plaintext() {
        let hasher = BcryptPasswordHasher::new(4);
        let hashed = hasher.hash("secret").unwrap();
        assert_ne!(hashed, "secret");
        assert!(hasher.verify("secret", &hashed).is_ok());
        assert!(hasher.verify("Secret", &hashed).is_err());
        assert!(hasher.verify("secret", "not-a-hash").is_err());
    }

    #[test]
    fn session_token_carries_claims() {
        let codec = JwtSessionCodec::new("s3cret", 3600);
        let token = codec.issue(&claims()).unwrap();
        assert_eq!(codec.verify(&token).unwrap(), claims());
    }

    #[test]
    fn session_token_rejects_other_secret_and_garbage() {
        let token = JwtSessionCodec::new("one", 3600).issue(&claims()).unwrap();
        assert!(JwtSessionCodec::new("two", 3600).verify(&token).is_err());
        assert!(JwtSessionCodec::new("one", 3600).verify("garbage").is_err());
    }

    #[test]
    fn expired_session_token_is_rejected() {
        let codec = JwtSessionCodec::new("s3cret", -3600);
        let token = codec.issue(&claims()).unwrap();
        assert!(codec.verify(&token).is_err());
    }
}
