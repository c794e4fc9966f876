use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AppConfig;

/// Verifies access tokens issued by the platform's identity service.
///
/// `generate_token` exists for operators and tests; the HTTP surface never
/// mints tokens itself.
#[derive(Clone)]
pub struct JwtService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    expiry: Duration,
}

impl JwtService {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.jwt_issuer.clone(),
            audience: config.jwt_audience.clone(),
            expiry: Duration::minutes(config.jwt_expiry_minutes),
        })
    }

    pub fn generate_token(&self, user_id: Uuid, company_id: Uuid, role: &str) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            company_id,
            role: role.to_owned(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp() as usize,
            exp: (now + self.expiry).timestamp() as usize,
        };

        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(&[self.audience.clone()]);
        validation.set_issuer(&[self.issuer.clone()]);
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub company_id: Uuid,
    pub role: String,
    pub iss: String,
    pub aud: String,
    pub iat: usize,
    pub exp: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::MandatoryGuard;

    fn config(secret: &str, audience: &str) -> AppConfig {
        AppConfig {
            database_url: "postgres://localhost/compliance".to_string(),
            database_max_pool_size: 1,
            server_host: "127.0.0.1".to_string(),
            server_port: 3000,
            jwt_secret: secret.to_string(),
            jwt_issuer: "hr-platform".to_string(),
            jwt_audience: audience.to_string(),
            jwt_expiry_minutes: 5,
            cors_allowed_origin: None,
            mandatory_guard: MandatoryGuard::Strict,
        }
    }

    #[test]
    fn issued_tokens_verify() {
        let service = JwtService::from_config(&config("secret", "doc-compliance")).unwrap();
        let user = Uuid::new_v4();
        let company = Uuid::new_v4();

        let token = service.generate_token(user, company, "hr_admin").unwrap();
        let claims = service.verify_token(&token).unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.company_id, company);
        assert_eq!(claims.role, "hr_admin");
    }

    #[test]
    fn rejects_foreign_secret_and_audience() {
        let issuer = JwtService::from_config(&config("secret", "doc-compliance")).unwrap();
        let token = issuer
            .generate_token(Uuid::new_v4(), Uuid::new_v4(), "employee")
            .unwrap();

        let other_secret = JwtService::from_config(&config("other", "doc-compliance")).unwrap();
        assert!(other_secret.verify_token(&token).is_err());

        let other_audience = JwtService::from_config(&config("secret", "payroll")).unwrap();
        assert!(other_audience.verify_token(&token).is_err());
    }
}
