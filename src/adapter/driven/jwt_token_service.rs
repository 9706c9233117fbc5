use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::env;

use crate::adapter::config::{parse_var, var_or, ConfigError};
use crate::domain::model::{User, UserId};
use crate::domain::port::{TokenError, TokenService};

const MIN_SECRET_LEN: usize = 32;

/// JWT設定
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// 署名鍵（32バイト以上）
    pub secret: String,
    /// 有効期限（分）
    pub expiration_minutes: i64,
    /// 発行者
    pub issuer: String,
}

impl JwtConfig {
    /// 環境変数から設定を読み取る
    /// JWT_SECRETは必須、それ以外は未設定ならデフォルト値を使用
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = env::var("JWT_SECRET")
            .map_err(|_| ConfigError::Missing("JWT_SECRET".to_string()))?;
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::InvalidValue(format!(
                "JWT_SECRET must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }

        let expiration_minutes = parse_var("JWT_EXPIRATION_MINUTES", 1440)?;
        let issuer = var_or("JWT_ISSUER", "storefront".to_string());

        Ok(Self {
            secret,
            expiration_minutes,
            issuer,
        })
    }
}

/// トークンに格納するクレーム
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    /// ユーザーID
    sub: String,
    /// ユーザー名
    name: String,
    iss: String,
    iat: i64,
    exp: i64,
}

/// HS256で署名するJWTトークンサービス
pub struct JwtTokenService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtTokenService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }
}

impl TokenService for JwtTokenService {
    fn issue(&self, user: &User) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id().to_string(),
            name: user.name().to_string(),
            iss: self.config.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(self.config.expiration_minutes)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::IssuanceFailed(e.to_string()))
    }

    fn verify(&self, token: &str) -> Result<UserId, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Invalid("token has expired".to_string()),
                ErrorKind::InvalidSignature => TokenError::Invalid("invalid signature".to_string()),
                _ => TokenError::Invalid(e.to_string()),
            }
        })?;

        UserId::from_string(&data.claims.sub)
            .map_err(|e| TokenError::Invalid(format!("invalid subject: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-that-is-long-enough-123";

    fn service_with(secret: &str, expiration_minutes: i64) -> JwtTokenService {
        JwtTokenService::new(JwtConfig {
            secret: secret.to_string(),
            expiration_minutes,
            issuer: "storefront".to_string(),
        })
    }

    fn user() -> User {
        User::new(UserId::new(), "Budi".to_string(), "budi@example.com".to_string())
    }

    #[test]
    fn test_issue_and_verify() {
        let service = service_with(SECRET, 60);
        let user = user();
        let token = service.issue(&user).unwrap();
        assert_eq!(service.verify(&token).unwrap(), user.id());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let service = service_with(SECRET, -10);
        let token = service.issue(&user()).unwrap();
        assert_eq!(
            service.verify(&token),
            Err(TokenError::Invalid("token has expired".to_string()))
        );
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let token = service_with("another-secret-key-that-is-long-enough", 60)
            .issue(&user())
            .unwrap();
        assert!(service_with(SECRET, 60).verify(&token).is_err());
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        assert!(service_with(SECRET, 60).verify("not-a-jwt").is_err());
    }
}
