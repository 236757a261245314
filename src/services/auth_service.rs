//! src/services/auth_service.rs
//!
//! Admin sign-in and password reset.
//!
//! Reset tokens are random strings mailed to the admin; only their SHA-256
//! hash is stored, with an expiry and a single-use marker.

use crate::{
    auth::{
        jwt::{IssuedToken, JwtConfig, issue_token},
        password::{hash_password, validate_password_strength, verify_password},
    },
    models::admin::Admin,
    services::mailer::Mailer,
};
use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

const RESET_TOKEN_TTL_MINS: i64 = 60;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("reset link is invalid or has expired")]
    InvalidResetToken,
    #[error("{0}")]
    Validation(String),
    #[error("admin {0} not found")]
    AdminNotFound(i64),
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AuthError::Hash(err.to_string())
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Clone)]
pub struct AuthService {
    db: Arc<SqlitePool>,
    jwt: Arc<JwtConfig>,
    mailer: Option<Arc<dyn Mailer>>,
    /// Link mailed for resets; the token is appended as `?token=`.
    reset_url_base: String,
}

impl AuthService {
    pub fn new(
        db: Arc<SqlitePool>,
        jwt: Arc<JwtConfig>,
        mailer: Option<Arc<dyn Mailer>>,
        reset_url_base: impl Into<String>,
    ) -> Self {
        Self {
            db,
            jwt,
            mailer,
            reset_url_base: reset_url_base.into(),
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> AuthResult<IssuedToken> {
        let admin = match self.find_by_email(email).await? {
            Some(admin) => admin,
            None => {
                info!("login rejected: unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };
        if !verify_password(password, &admin.password_hash)? {
            info!(admin_id = admin.id, "login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }
        info!(admin_id = admin.id, "admin signed in");
        Ok(issue_token(admin.id, &admin.email, &self.jwt)?)
    }

    pub async fn get_admin(&self, id: i64) -> AuthResult<Admin> {
        sqlx::query_as::<_, Admin>(
            "SELECT id, email, password_hash, created_at FROM admins WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(AuthError::AdminNotFound(id))
    }

    /// Create an admin unless one with this email exists. Returns whether one
    /// was created.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> AuthResult<bool> {
        if self.find_by_email(email).await?.is_some() {
            return Ok(false);
        }
        validate_password_strength(password).map_err(AuthError::Validation)?;
        let hash = hash_password(password)?;
        sqlx::query("INSERT INTO admins (email, password_hash, created_at) VALUES (?, ?, ?)")
            .bind(normalize_email(email))
            .bind(hash)
            .bind(Utc::now())
            .execute(&*self.db)
            .await?;
        info!(email = %normalize_email(email), "created admin account");
        Ok(true)
    }

    /// Start a password reset. Succeeds whether or not the email is known.
    pub async fn forgot_password(&self, email: &str) -> AuthResult<()> {
        let Some(admin) = self.find_by_email(email).await? else {
            info!("password reset requested for unknown email");
            return Ok(());
        };

        let token = Uuid::new_v4().simple().to_string();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO password_resets (admin_id, token_hash, expires_at, used_at, created_at)
             VALUES (?, ?, ?, NULL, ?)",
        )
        .bind(admin.id)
        .bind(hash_reset_token(&token))
        .bind(now + Duration::minutes(RESET_TOKEN_TTL_MINS))
        .bind(now)
        .execute(&*self.db)
        .await?;

        let link = format!("{}?token={}", self.reset_url_base, token);
        match &self.mailer {
            Some(mailer) => {
                let body = format!(
                    "A password reset was requested for your account.\n\n\
                     Open this link within {} minutes to choose a new password:\n{}\n\n\
                     If you did not request this, you can ignore this email.",
                    RESET_TOKEN_TTL_MINS, link
                );
                if let Err(err) = mailer.send(&admin.email, "Password reset", &body).await {
                    warn!(admin_id = admin.id, error = %err, "password reset email not sent");
                }
            }
            None => warn!(admin_id = admin.id, "mail is not configured; reset email not sent"),
        }
        Ok(())
    }

    /// Consume a reset token and set the new password.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> AuthResult<()> {
        validate_password_strength(new_password).map_err(AuthError::Validation)?;
        let hash = hash_password(new_password)?;

        let mut tx = self.db.begin().await?;
        let reset: Option<(i64, i64)> = sqlx::query_as(
            "SELECT id, admin_id FROM password_resets
             WHERE token_hash = ? AND used_at IS NULL AND expires_at > ?",
        )
        .bind(hash_reset_token(token))
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await?;
        let (reset_id, admin_id) = reset.ok_or(AuthError::InvalidResetToken)?;

        sqlx::query("UPDATE admins SET password_hash = ? WHERE id = ?")
            .bind(hash)
            .bind(admin_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE password_resets SET used_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(reset_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(admin_id, "password reset completed");
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<Admin>> {
        Ok(sqlx::query_as::<_, Admin>(
            "SELECT id, email, password_hash, created_at FROM admins WHERE email = ?",
        )
        .bind(normalize_email(email))
        .fetch_optional(&*self.db)
        .await?)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn hash_reset_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::jwt::validate_token, db, services::mailer::testing::RecordingMailer};

    async fn setup() -> (AuthService, Arc<RecordingMailer>) {
        let mailer = Arc::new(RecordingMailer::default());
        let auth = AuthService::new(
            Arc::new(db::memory_pool().await.unwrap()),
            Arc::new(JwtConfig {
                secret: "test-secret".into(),
                expiry_mins: 30,
            }),
            Some(mailer.clone() as Arc<dyn Mailer>),
            "https://site.test/reset",
        );
        auth.ensure_admin("Owner@Example.com", "initial-pass").await.unwrap();
        (auth, mailer)
    }

    fn token_from(body: &str) -> String {
        body.split("token=")
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn login_issues_token_for_valid_credentials() {
        let (auth, _) = setup().await;
        let issued = auth.login("owner@example.com", "initial-pass").await.unwrap();
        let claims = validate_token(&issued.token, &auth.jwt).unwrap();
        assert_eq!(claims.email, "owner@example.com");

        assert!(matches!(
            auth.login("owner@example.com", "wrong-pass").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody@example.com", "initial-pass").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn ensure_admin_is_idempotent() {
        let (auth, _) = setup().await;
        assert!(!auth.ensure_admin("owner@example.com", "other-pass").await.unwrap());
        assert!(auth.login("owner@example.com", "initial-pass").await.is_ok());
    }

    #[tokio::test]
    async fn reset_flow_changes_password_once() {
        let (auth, mailer) = setup().await;
        auth.forgot_password("owner@example.com").await.unwrap();

        let body = mailer.sent.lock().unwrap()[0].2.clone();
        let token = token_from(&body);

        auth.reset_password(&token, "brand-new-pass").await.unwrap();
        assert!(auth.login("owner@example.com", "brand-new-pass").await.is_ok());
        assert!(matches!(
            auth.reset_password(&token, "another-pass").await,
            Err(AuthError::InvalidResetToken)
        ));
    }

    #[tokio::test]
    async fn unknown_email_sends_nothing() {
        let (auth, mailer) = setup().await;
        auth.forgot_password("stranger@example.com").await.unwrap();
        assert!(mailer.sent.lock().unwrap().is_empty());
        assert!(matches!(
            auth.reset_password("made-up", "brand-new-pass").await,
            Err(AuthError::InvalidResetToken)
        ));
    }

    #[tokio::test]
    async fn expired_tokens_are_rejected() {
        let (auth, mailer) = setup().await;
        auth.forgot_password("owner@example.com").await.unwrap();
        let token = token_from(&mailer.sent.lock().unwrap()[0].2.clone());
        sqlx::query("UPDATE password_resets SET expires_at = ?")
            .bind(Utc::now() - Duration::minutes(1))
            .execute(&*auth.db)
            .await
            .unwrap();
        assert!(matches!(
            auth.reset_password(&token, "brand-new-pass").await,
            Err(AuthError::InvalidResetToken)
        ));
    }
}
