use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use modkit::{Caller, ADMIN_ROLE};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::contract::model::{AccessToken, NewUser, User, UserPatch};
use crate::domain::error::DomainError;
use crate::domain::ports::{PasswordHasher, TokenIssuer};
use crate::domain::repo::{
    InsertOutcome, NewUserRecord, UpdateOutcome, UserFields, UserRecord, UsersRepository,
    Visibility,
};

pub const DEFAULT_ROLE: &str = "user";

/// Account rules: registration, credentials and profile changes.
/// Depends only on ports, not on infra types.
#[derive(Clone)]
pub struct Service {
    repo: Arc<dyn UsersRepository>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenIssuer>,
    config: ServiceConfig,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub token_ttl: Duration,
    pub min_password_len: usize,
    pub max_username_len: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            token_ttl: Duration::seconds(86_400),
            min_password_len: 8,
            max_username_len: 64,
        }
    }
}

impl Service {
    pub fn new(
        repo: Arc<dyn UsersRepository>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenIssuer>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            repo,
            hasher,
            tokens,
            config,
        }
    }

    #[instrument(name = "accounts.service.register", skip(self, new_user), fields(username = %new_user.username))]
    pub async fn register(&self, new_user: NewUser) -> Result<User, DomainError> {
        info!("Registering user");
        let roles = BTreeSet::from([DEFAULT_ROLE.to_string()]);
        let user = self.create(new_user, roles).await?;
        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    #[instrument(name = "accounts.service.login", skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AccessToken, DomainError> {
        debug!("Login attempt");
        let email = normalize_email(email);
        let Some(record) = self
            .repo
            .find_by_email(&email, None)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
        else {
            debug!("Unknown email");
            return Err(DomainError::InvalidCredentials);
        };

        if !self.verify_password(password, &record.password_hash).await? {
            debug!(user_id = %record.user.id, "Wrong password");
            return Err(DomainError::InvalidCredentials);
        }

        let now = Utc::now();
        let token = self
            .tokens
            .issue(&record.user, now, self.config.token_ttl)
            .map_err(|e| DomainError::credentials(e.to_string()))?;
        info!(user_id = %record.user.id, "Token issued");
        Ok(AccessToken {
            token,
            expires_at: now + self.config.token_ttl,
            user: record.user,
        })
    }

    #[instrument(name = "accounts.service.get_user", skip(self), fields(user_id = %id))]
    pub async fn get_user(&self, id: Uuid) -> Result<User, DomainError> {
        debug!("Getting user by id");
        Ok(self.load(id, Visibility::ActiveOnly).await?.user)
    }

    #[instrument(name = "accounts.service.find_by_username", skip(self))]
    pub async fn find_by_username(&self, username: &str) -> Result<User, DomainError> {
        self.repo
            .find_by_username(username, None)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
            .map(|r| r.user)
            .ok_or_else(|| DomainError::user_not_found(username))
    }

    #[instrument(name = "accounts.service.find_by_email", skip(self))]
    pub async fn find_by_email(&self, email: &str) -> Result<User, DomainError> {
        let email = normalize_email(email);
        self.repo
            .find_by_email(&email, None)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
            .map(|r| r.user)
            .ok_or_else(|| DomainError::user_not_found(email))
    }

    #[instrument(name = "accounts.service.list_users", skip(self))]
    pub async fn list_users(&self) -> Result<Vec<User>, DomainError> {
        let users = self
            .repo
            .list_active()
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        debug!("Listed {} users", users.len());
        Ok(users)
    }

    #[instrument(
        name = "accounts.service.update_user",
        skip(self, patch, caller),
        fields(user_id = %id, caller_id = %caller.user_id)
    )]
    pub async fn update_user(
        &self,
        id: Uuid,
        patch: UserPatch,
        caller: &Caller,
    ) -> Result<User, DomainError> {
        info!("Updating user");
        if !caller.may_act_for(id) {
            return Err(DomainError::forbidden("cannot modify another user"));
        }
        if patch.roles.is_some() && !caller.is_admin() {
            return Err(DomainError::forbidden("only admins may change roles"));
        }

        let current = self.load(id, Visibility::ActiveOnly).await?;
        let mut fields = UserFields::default();

        if let Some(username) = patch.username {
            if username != current.user.username {
                self.validate_username(&username)?;
                self.ensure_username_free(&username, Some(id)).await?;
                fields.username = Some(username);
            }
        }
        if let Some(email) = patch.email {
            let email = normalize_email(&email);
            if email != current.user.email {
                validate_email(&email)?;
                self.ensure_email_free(&email, Some(id)).await?;
                fields.email = Some(email);
            }
        }
        if let Some(password) = patch.password {
            self.validate_password(&password)?;
            if !self
                .verify_password(&password, &current.password_hash)
                .await?
            {
                fields.password_hash = Some(self.hash_password(password).await?);
            }
        }
        if let Some(roles) = patch.roles {
            if roles != current.user.roles {
                fields.roles = Some(roles);
            }
        }

        if fields.username.is_none()
            && fields.email.is_none()
            && fields.password_hash.is_none()
            && fields.roles.is_none()
        {
            return Err(DomainError::NoChanges);
        }
        fields.updated_at = Some(Utc::now());

        let user = self.apply(id, fields).await?;
        info!("User updated");
        Ok(user)
    }

    /// Idempotent: deleting an already deleted user succeeds.
    #[instrument(
        name = "accounts.service.soft_delete",
        skip(self, caller),
        fields(user_id = %id, caller_id = %caller.user_id)
    )]
    pub async fn soft_delete(&self, id: Uuid, caller: &Caller) -> Result<(), DomainError> {
        if !caller.may_act_for(id) {
            return Err(DomainError::forbidden("cannot delete another user"));
        }
        let current = self.load(id, Visibility::IncludeDeleted).await?;
        if current.user.is_deleted() {
            debug!("User already deleted");
            return Ok(());
        }

        let now = Utc::now();
        self.apply(
            id,
            UserFields {
                deleted_at: Some(Some(now)),
                updated_at: Some(now),
                ..Default::default()
            },
        )
        .await?;
        info!("User soft-deleted");
        Ok(())
    }

    #[instrument(name = "accounts.service.recover", skip(self), fields(user_id = %id))]
    pub async fn recover(&self, id: Uuid) -> Result<User, DomainError> {
        let current = self.load(id, Visibility::IncludeDeleted).await?;
        if !current.user.is_deleted() {
            debug!("User is active; nothing to recover");
            return Ok(current.user);
        }

        self.ensure_username_free(&current.user.username, Some(id))
            .await?;
        self.ensure_email_free(&current.user.email, Some(id)).await?;

        let user = self
            .apply(
                id,
                UserFields {
                    deleted_at: Some(None),
                    updated_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await?;
        info!("User recovered");
        Ok(user)
    }

    /// Verify a bearer token and load the caller's current roles.
    #[instrument(name = "accounts.service.resolve_caller", skip_all)]
    pub async fn resolve_caller(&self, token: &str) -> Result<Caller, DomainError> {
        let user_id = self
            .tokens
            .verify(token)
            .map_err(|e| DomainError::invalid_token(e.to_string()))?;
        let record = self
            .repo
            .find_by_id(user_id, Visibility::ActiveOnly)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
            .ok_or_else(|| DomainError::invalid_token("user no longer exists"))?;
        Ok(Caller {
            user_id,
            roles: record.user.roles,
        })
    }

    /// Create the configured administrator unless the username is already in use.
    #[instrument(name = "accounts.service.ensure_admin", skip(self, admin), fields(username = %admin.username))]
    pub async fn ensure_admin(&self, admin: NewUser) -> Result<Option<User>, DomainError> {
        if let Some(existing) = self
            .repo
            .find_by_username(&admin.username, None)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
        {
            if !existing.user.roles.contains(ADMIN_ROLE) {
                warn!("Bootstrap admin username belongs to a non-admin user");
            }
            return Ok(None);
        }
        let roles = BTreeSet::from([ADMIN_ROLE.to_string(), DEFAULT_ROLE.to_string()]);
        let user = self.create(admin, roles).await?;
        info!(user_id = %user.id, "Bootstrap admin created");
        Ok(Some(user))
    }

    async fn create(&self, new_user: NewUser, roles: BTreeSet<String>) -> Result<User, DomainError> {
        let email = normalize_email(&new_user.email);
        self.validate_username(&new_user.username)?;
        validate_email(&email)?;
        self.validate_password(&new_user.password)?;

        self.ensure_username_free(&new_user.username, None).await?;
        self.ensure_email_free(&email, None).await?;

        let password_hash = self.hash_password(new_user.password).await?;
        let record = NewUserRecord {
            id: Uuid::new_v4(),
            username: new_user.username.clone(),
            email: email.clone(),
            password_hash,
            roles,
            created_at: Utc::now(),
        };

        match self
            .repo
            .insert(record)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
        {
            InsertOutcome::Inserted(user) => Ok(user),
            InsertOutcome::UsernameTaken => Err(DomainError::username_taken(new_user.username)),
            InsertOutcome::EmailTaken => Err(DomainError::email_taken(email)),
        }
    }

    async fn apply(&self, id: Uuid, fields: UserFields) -> Result<User, DomainError> {
        let username = fields.username.clone();
        let email = fields.email.clone();
        match self
            .repo
            .update_fields(id, fields)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
        {
            UpdateOutcome::Updated(user) => Ok(user),
            UpdateOutcome::NotFound => Err(DomainError::user_not_found(id)),
            UpdateOutcome::UsernameTaken => {
                Err(DomainError::username_taken(username.unwrap_or_default()))
            }
            UpdateOutcome::EmailTaken => Err(DomainError::email_taken(email.unwrap_or_default())),
        }
    }

    async fn load(&self, id: Uuid, visibility: Visibility) -> Result<UserRecord, DomainError> {
        self.repo
            .find_by_id(id, visibility)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
            .ok_or_else(|| DomainError::user_not_found(id))
    }

    async fn ensure_username_free(
        &self,
        username: &str,
        exclude: Option<Uuid>,
    ) -> Result<(), DomainError> {
        let taken = self
            .repo
            .find_by_username(username, exclude)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        match taken {
            Some(_) => Err(DomainError::username_taken(username)),
            None => Ok(()),
        }
    }

    async fn ensure_email_free(&self, email: &str, exclude: Option<Uuid>) -> Result<(), DomainError> {
        let taken = self
            .repo
            .find_by_email(email, exclude)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        match taken {
            Some(_) => Err(DomainError::email_taken(email)),
            None => Ok(()),
        }
    }

    async fn hash_password(&self, password: String) -> Result<String, DomainError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| DomainError::credentials(e.to_string()))?
            .map_err(|e| DomainError::credentials(e.to_string()))
    }

    async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, DomainError> {
        let hasher = self.hasher.clone();
        let (password, hash) = (password.to_owned(), hash.to_owned());
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| DomainError::credentials(e.to_string()))?
            .map_err(|e| DomainError::credentials(e.to_string()))
    }

    fn validate_username(&self, username: &str) -> Result<(), DomainError> {
        let len = username.chars().count();
        if len < 3 || len > self.config.max_username_len {
            return Err(DomainError::invalid_username(format!(
                "must be 3 to {} characters",
                self.config.max_username_len
            )));
        }
        if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        {
            return Err(DomainError::invalid_username(
                "only letters, digits, '_', '.' and '-' are allowed",
            ));
        }
        Ok(())
    }

    fn validate_password(&self, password: &str) -> Result<(), DomainError> {
        if password.chars().count() < self.config.min_password_len {
            return Err(DomainError::PasswordTooShort {
                min: self.config.min_password_len,
            });
        }
        Ok(())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> Result<(), DomainError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(DomainError::invalid_email(email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_rules() {
        assert!(validate_email("ann@example.com").is_ok());
        assert!(validate_email("ann@example").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ann example@x.io").is_err());
        assert!(validate_email("ann@.io").is_err());
    }

    #[test]
    fn emails_are_lowercased_and_trimmed() {
        assert_eq!(normalize_email("  Ann@Example.COM "), "ann@example.com");
    }
}
