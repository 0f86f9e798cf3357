use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::contract::model::UserProfile;
use crate::domain::error::DomainError;
use crate::domain::model::{normalize_email, AuthSession, NewRegistration, User};
use crate::domain::password::{hash_password, verify_password};
use crate::domain::ports::{MailerPort, TokenIssuer};
use crate::domain::repo::UsersRepository;
use modkit::Role;

const RESET_TOKEN_BYTES: usize = 32;

/// Registration, login and password reset rules.
#[derive(Clone)]
pub struct Service {
    repo: Arc<dyn UsersRepository>,
    mailer: Arc<dyn MailerPort>,
    tokens: Arc<dyn TokenIssuer>,
    config: ServiceConfig,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub password_iterations: u32,
    pub reset_token_ttl: Duration,
    pub frontend_url: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            password_iterations: 100_000,
            reset_token_ttl: Duration::from_secs(10 * 60),
            frontend_url: "http://localhost:5500".to_string(),
        }
    }
}

impl Service {
    pub fn new(
        repo: Arc<dyn UsersRepository>,
        mailer: Arc<dyn MailerPort>,
        tokens: Arc<dyn TokenIssuer>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            repo,
            mailer,
            tokens,
            config,
        }
    }

    #[instrument(
        name = "identity.service.register",
        skip(self, reg),
        fields(email = %reg.email, role = %reg.role)
    )]
    pub async fn register(&self, reg: NewRegistration) -> Result<AuthSession, DomainError> {
        let email = normalize_email(&reg.email);
        if self
            .repo
            .email_exists(&email)
            .await
            .map_err(DomainError::database)?
        {
            return Err(DomainError::email_already_registered(email));
        }

        let password_hash =
            hash_blocking(reg.password.clone(), self.config.password_iterations).await?;
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            first_name: reg.first_name.trim().to_string(),
            last_name: reg.last_name.trim().to_string(),
            email,
            phone: reg.phone.trim().to_string(),
            password_hash,
            role: reg.role,
            hospital_name: match reg.role {
                Role::Staff => reg
                    .hospital_name
                    .map(|h| h.trim().to_string())
                    .filter(|h| !h.is_empty()),
                Role::Patient => None,
            },
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.repo.insert(user.clone()).await {
            // A concurrent registration can win between the check and the insert.
            if is_unique_violation(&e) {
                return Err(DomainError::email_already_registered(user.email));
            }
            return Err(DomainError::database(format!("{e:#}")));
        }
        info!(user_id = %user.id, "user registered");

        if let Err(e) = self.mailer.send_welcome(&user.email, &user.first_name).await {
            warn!(user_id = %user.id, error = %e, "welcome email failed");
        }

        self.session_for(&user)
    }

    /// Unknown account and wrong password are indistinguishable to the caller.
    #[instrument(name = "identity.service.login", skip_all)]
    pub async fn login(
        &self,
        email_or_phone: &str,
        password: &str,
    ) -> Result<AuthSession, DomainError> {
        let user = self
            .repo
            .find_by_login(email_or_phone.trim())
            .await
            .map_err(DomainError::database)?
            .ok_or(DomainError::InvalidCredentials)?;

        let matches = {
            let (password, stored) = (password.to_owned(), user.password_hash.clone());
            tokio::task::spawn_blocking(move || verify_password(&password, &stored))
                .await
                .map_err(DomainError::internal)?
        };
        if !matches {
            debug!(user_id = %user.id, "password mismatch");
            return Err(DomainError::InvalidCredentials);
        }
        info!(user_id = %user.id, "user logged in");
        self.session_for(&user)
    }

    /// Succeeds whether or not the account exists.
    #[instrument(name = "identity.service.forgot_password", skip_all)]
    pub async fn forgot_password(&self, email: &str) -> Result<(), DomainError> {
        let email = normalize_email(email);
        let Some(user) = self
            .repo
            .find_by_email(&email)
            .await
            .map_err(DomainError::database)?
        else {
            debug!("password reset requested for unknown email");
            return Ok(());
        };

        let token = generate_reset_token();
        let ttl = chrono::Duration::from_std(self.config.reset_token_ttl)
            .unwrap_or_else(|_| chrono::Duration::minutes(10));
        let expires_at = Utc::now() + ttl;
        self.repo
            .set_reset_token(user.id, &token_digest(&token), expires_at)
            .await
            .map_err(DomainError::database)?;
        info!(user_id = %user.id, %expires_at, "password reset token issued");

        let link = format!(
            "{}/reset-password.html?token={token}",
            self.config.frontend_url.trim_end_matches('/')
        );
        if let Err(e) = self.mailer.send_password_reset(&user.email, &link).await {
            warn!(user_id = %user.id, error = %e, "password reset email failed");
        }
        Ok(())
    }

    /// Accepts a token exactly once and only before its expiry.
    #[instrument(name = "identity.service.reset_password", skip_all)]
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), DomainError> {
        let new_hash =
            hash_blocking(new_password.to_owned(), self.config.password_iterations).await?;
        let consumed = self
            .repo
            .consume_reset_token(&token_digest(token.trim()), Utc::now(), &new_hash)
            .await
            .map_err(DomainError::database)?;
        if !consumed {
            return Err(DomainError::InvalidResetToken);
        }
        info!("password reset completed");
        Ok(())
    }

    #[instrument(name = "identity.service.get_profile", skip(self), fields(user_id = %id))]
    pub async fn get_profile(&self, id: Uuid) -> Result<UserProfile, DomainError> {
        self.repo
            .find_by_id(id)
            .await
            .map_err(DomainError::database)?
            .map(|u| u.profile())
            .ok_or_else(|| DomainError::user_not_found(id))
    }

    #[instrument(name = "identity.service.get_profiles", skip_all, fields(count = ids.len()))]
    pub async fn get_profiles(&self, ids: &[Uuid]) -> Result<Vec<UserProfile>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let users = self
            .repo
            .find_by_ids(ids)
            .await
            .map_err(DomainError::database)?;
        Ok(users.iter().map(User::profile).collect())
    }

    fn session_for(&self, user: &User) -> Result<AuthSession, DomainError> {
        let token = self.tokens.issue(user).map_err(DomainError::token)?;
        Ok(AuthSession {
            token,
            user: user.profile(),
        })
    }
}

/// PBKDF2 is CPU-bound; keep it off the async workers.
async fn hash_blocking(password: String, iterations: u32) -> Result<String, DomainError> {
    tokio::task::spawn_blocking(move || hash_password(&password, iterations))
        .await
        .map_err(DomainError::internal)
}

fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    rand::rng().fill(&mut bytes[..]);
    hex::encode(bytes)
}

/// Only this digest is persisted.
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn is_unique_violation(e: &anyhow::Error) -> bool {
    e.chain().any(|cause| {
        let msg = cause.to_string().to_ascii_lowercase();
        msg.contains("unique") || msg.contains("duplicate key")
    })
}
