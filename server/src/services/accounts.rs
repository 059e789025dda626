use serde::Serialize;
use std::sync::Arc;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::{Identity, TokenService};
use crate::config::AdminBootstrap;
use crate::domain::validation::is_email;
use crate::models::{LoginRequest, NewUser, RegisterRequest, Role, User, UserProfile};
use crate::store::{StoreError, UserRepository};
use crate::utils::{AppError, FieldViolation};

pub const PASSWORD_MIN_CHARS: usize = 6;

/// Token plus profile, returned by register and login.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<TokenService>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

async fn hash_blocking(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::InternalServerError(format!("hashing task failed: {e}")))?
        .map_err(|e| AppError::InternalServerError(format!("failed to hash password: {e}")))
}

async fn verify_blocking(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::InternalServerError(format!("verification task failed: {e}")))
}

impl AccountService {
    pub fn new(users: Arc<dyn UserRepository>, tokens: Arc<TokenService>) -> Self {
        Self { users, tokens }
    }

    fn session_for(&self, user: &User) -> Result<AuthSession, AppError> {
        let token = self
            .tokens
            .issue(user.id)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        Ok(AuthSession {
            token,
            user: UserProfile::from(user),
        })
    }

    /// Self-service sign-up as a student or organizer.
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthSession, AppError> {
        let mut violations = Vec::new();

        let name = request
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());
        if name.is_none() {
            violations.push(FieldViolation::new("name", "Name is required"));
        }

        let email = request.email.as_deref().map(normalize_email);
        if !email.as_deref().is_some_and(is_email) {
            violations.push(FieldViolation::new("email", "Valid email is required"));
        }

        let password = request.password.unwrap_or_default();
        if password.chars().count() < PASSWORD_MIN_CHARS {
            violations.push(FieldViolation::new(
                "password",
                format!("Password must be at least {PASSWORD_MIN_CHARS} characters"),
            ));
        }

        let role = match request.role.as_deref().map(str::trim) {
            None | Some("") => Role::Student,
            Some(raw) => match raw.parse::<Role>() {
                Ok(role @ (Role::Student | Role::Organizer)) => role,
                _ => {
                    violations.push(FieldViolation::new(
                        "role",
                        "Role must be student or organizer",
                    ));
                    Role::Student
                }
            },
        };

        let (Some(name), Some(email), true) = (name, email, violations.is_empty()) else {
            return Err(AppError::ValidationFailed(violations));
        };

        let user = self
            .insert(NewUser {
                name: name.to_string(),
                email,
                password_hash: hash_blocking(password).await?,
                role,
                organization: request
                    .organization
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty()),
            })
            .await?;

        tracing::info!(user_id = %user.id, role = %user.role, "User registered");
        self.session_for(&user)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthSession, AppError> {
        let invalid = || AppError::Unauthenticated("Invalid credentials".to_string());

        let user = self
            .users
            .find_user_by_email(&normalize_email(&request.email))
            .await?
            .ok_or_else(invalid)?;

        if !verify_blocking(request.password, user.password_hash.clone()).await? {
            return Err(invalid());
        }

        tracing::info!(user_id = %user.id, "User logged in");
        self.session_for(&user)
    }

    /// Current profile of an authenticated caller.
    pub async fn profile(&self, identity: &Identity) -> Result<UserProfile, AppError> {
        self.users
            .find_user(identity.id)
            .await?
            .map(|user| UserProfile::from(&user))
            .ok_or_else(|| AppError::Unauthenticated("User not found".to_string()))
    }

    /// Creates the configured admin account unless its email is taken.
    pub async fn ensure_admin(&self, admin: &AdminBootstrap) -> Result<(), AppError> {
        let email = normalize_email(&admin.email);
        if self.users.find_user_by_email(&email).await?.is_some() {
            tracing::debug!(email = %email, "Bootstrap admin already present");
            return Ok(());
        }

        let user = self
            .insert(NewUser {
                name: admin.name.clone(),
                email,
                password_hash: hash_blocking(admin.password.clone()).await?,
                role: Role::Admin,
                organization: None,
            })
            .await?;

        tracing::info!(user_id = %user.id, "Bootstrap admin created");
        Ok(())
    }

    async fn insert(&self, user: NewUser) -> Result<User, AppError> {
        match self.users.insert_user(user).await {
            Ok(user) => Ok(user),
            Err(StoreError::Conflict(_)) => Err(AppError::invalid(
                "email",
                "An account with this email already exists",
            )),
            Err(e) => Err(e.into()),
        }
    }
}
