use std::sync::Arc;

use axum::{extract::FromRef, http::StatusCode};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    auth::{
        jwt::JwtKeys,
        password::HashingPool,
        repo::UserStore,
        repo_types::{NewUser, User},
        validation::{normalize_msisdn, validate_name, validate_password},
    },
    error::ApiError,
    state::AppState,
};

pub const LOGOUT_MESSAGE: &str = "Logged out successfully. Please remove the token from client.";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid name format")]
    InvalidName,
    #[error("invalid MSISDN format")]
    InvalidMsisdn,
    #[error("password must be at least 6 characters long")]
    WeakPassword,
    #[error("user already exists with this MSISDN")]
    AlreadyExists,
    /// Covers unknown MSISDN and wrong password alike.
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("User not found or inactive")]
    UserNotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    /// Maps to an HTTP error; `label` names the failed operation.
    pub fn into_api(self, label: &'static str) -> ApiError {
        let status = match &self {
            Self::InvalidName | Self::InvalidMsisdn | Self::WeakPassword => StatusCode::BAD_REQUEST,
            Self::AlreadyExists => StatusCode::CONFLICT,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::UserNotFound => return ApiError::unauthorized(self.to_string()),
            Self::Internal(e) => {
                error!(error = %e, "internal error");
                return ApiError::internal();
            }
        };
        ApiError::new(status, label, self.to_string())
    }
}

/// Registration, login and profile lookups over a pluggable user store.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    jwt: JwtKeys,
    hasher: HashingPool,
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.users.clone(), state.jwt.clone(), state.hasher.clone())
    }
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, jwt: JwtKeys, hasher: HashingPool) -> Self {
        Self { users, jwt, hasher }
    }

    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        name: &str,
        msisdn: &str,
        password: &str,
    ) -> Result<(User, String), AuthError> {
        validate_name(name)?;
        let msisdn = normalize_msisdn(msisdn)?;
        validate_password(password)?;

        // Cheap early exit; insert_if_absent below is what actually guarantees uniqueness.
        if self.users.find_by_msisdn(&msisdn).await?.is_some() {
            warn!(%msisdn, "msisdn already registered");
            return Err(AuthError::AlreadyExists);
        }

        let password_hash = self.hasher.hash(password.to_string()).await?;

        let user = self
            .users
            .insert_if_absent(NewUser {
                name: name.trim().to_string(),
                msisdn: msisdn.clone(),
                password_hash,
            })
            .await?
            .ok_or_else(|| {
                warn!(%msisdn, "lost registration race");
                AuthError::AlreadyExists
            })?;

        let token = self.jwt.sign(user.id, &user.msisdn)?;
        info!(user_id = user.id, msisdn = %user.msisdn, "user registered");
        Ok((user, token))
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, msisdn: &str, password: &str) -> Result<(User, String), AuthError> {
        let Ok(msisdn) = normalize_msisdn(msisdn) else {
            warn!("login with malformed msisdn");
            return self.reject_login(password).await;
        };

        let user = match self.users.find_by_msisdn(&msisdn).await? {
            Some(u) if u.is_active => u,
            Some(u) => {
                warn!(user_id = u.id, "login for inactive user");
                return self.reject_login(password).await;
            }
            None => {
                warn!(%msisdn, "login unknown msisdn");
                return self.reject_login(password).await;
            }
        };

        let ok = self
            .hasher
            .verify(password.to_string(), user.password_hash.clone())
            .await?;
        if !ok {
            warn!(user_id = user.id, "login invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.jwt.sign(user.id, &user.msisdn)?;
        info!(user_id = user.id, "user logged in");
        Ok((user, token))
    }

    /// Fails a login that has no stored hash to check, after spending the
    /// same hashing work a wrong password would.
    async fn reject_login<T>(&self, password: &str) -> Result<T, AuthError> {
        self.hasher.verify_dummy(password.to_string()).await?;
        Err(AuthError::InvalidCredentials)
    }

    #[instrument(skip(self))]
    pub async fn get_profile(&self, user_id: i64) -> Result<User, AuthError> {
        self.users
            .find_active_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Tokens are stateless, so there is nothing to revoke.
    pub fn logout(&self, user_id: Option<i64>) -> &'static str {
        debug!(?user_id, "logout");
        LOGOUT_MESSAGE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::repo::MemoryUserStore, config::AppConfig};
    use std::time::Duration;

    fn service_with(store: Arc<MemoryUserStore>) -> AuthService {
        let cfg = AppConfig::for_tests();
        AuthService::new(
            store,
            JwtKeys::new(&cfg.jwt),
            HashingPool::new(&cfg.hashing).unwrap(),
        )
    }

    fn service() -> AuthService {
        service_with(Arc::new(MemoryUserStore::new()))
    }

    #[tokio::test]
    async fn register_normalizes_and_issues_token() {
        let svc = service();
        let (user, token) = svc
            .register("Test User", "017-1234-5678", "password123")
            .await
            .unwrap();
        assert_eq!(user.msisdn, "+8801712345678");
        assert!(user.is_active);
        assert_ne!(user.password_hash, "password123");

        let claims = svc.jwt.verify(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), user.id);
    }

    #[tokio::test]
    async fn register_conflicts_across_msisdn_spellings() {
        let svc = service();
        svc.register("Test User", "01712345678", "password123")
            .await
            .unwrap();
        let err = svc
            .register("Other User", "+8801712345678", "password123")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AlreadyExists));
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn register_runs_business_rules() {
        let svc = service();
        assert!(matches!(
            svc.register("Test User", "123456789", "password123").await,
            Err(AuthError::InvalidMsisdn)
        ));
        assert!(matches!(
            svc.register("T3st", "01712345678", "password123").await,
            Err(AuthError::InvalidName)
        ));
        assert!(matches!(
            svc.register("Test User", "01712345678", "123").await,
            Err(AuthError::WeakPassword)
        ));
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let svc = service();
        svc.register("Test User", "01712345678", "password123")
            .await
            .unwrap();

        let wrong_pw = svc.login("01712345678", "wrongpassword").await.unwrap_err();
        let unknown = svc.login("01799999999", "password123").await.unwrap_err();
        let malformed = svc.login("12345", "password123").await.unwrap_err();
        for err in [wrong_pw, unknown, malformed] {
            assert!(matches!(err, AuthError::InvalidCredentials));
            assert_eq!(err.to_string(), "invalid credentials");
        }
    }

    #[tokio::test]
    async fn login_without_a_stored_hash_still_waits_for_the_hashing_pool() {
        let svc = service();
        svc.register("Test User", "01712345678", "password123")
            .await
            .unwrap();

        let permits = svc.hasher.permits();
        let held = permits
            .clone()
            .acquire_many_owned(AppConfig::for_tests().hashing.max_concurrency as u32)
            .await
            .unwrap();

        for msisdn in ["01799999999", "12345"] {
            let pending =
                tokio::time::timeout(Duration::from_millis(100), svc.login(msisdn, "password123"))
                    .await;
            assert!(pending.is_err(), "{msisdn} login finished without hashing");
        }

        drop(held);
        for msisdn in ["01799999999", "12345"] {
            assert!(matches!(
                svc.login(msisdn, "password123").await,
                Err(AuthError::InvalidCredentials)
            ));
        }
    }

    #[tokio::test]
    async fn login_accepts_any_spelling_of_the_number() {
        let svc = service();
        let (registered, _) = svc
            .register("Test User", "01712345678", "password123")
            .await
            .unwrap();
        let (user, token) = svc.login("+880 1712-345678", "password123").await.unwrap();
        assert_eq!(user.id, registered.id);
        assert!(!token.is_empty());
    }

    #[tokio::test]
    async fn inactive_users_cannot_log_in_or_read_profile() {
        let store = Arc::new(MemoryUserStore::new());
        let svc = service_with(store.clone());
        let (user, _) = svc
            .register("Test User", "01712345678", "password123")
            .await
            .unwrap();
        assert!(svc.get_profile(user.id).await.is_ok());

        store.set_active(user.id, false).await;
        assert!(matches!(
            svc.login("01712345678", "password123").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            svc.get_profile(user.id).await,
            Err(AuthError::UserNotFound)
        ));
    }

    #[test]
    fn logout_always_succeeds() {
        let svc = service();
        assert_eq!(svc.logout(None), LOGOUT_MESSAGE);
        assert_eq!(svc.logout(Some(1)), LOGOUT_MESSAGE);
    }

    #[test]
    fn error_mapping_uses_operation_label() {
        let conflict = AuthError::AlreadyExists.into_api("Registration Failed");
        assert_eq!(conflict.status, StatusCode::CONFLICT);
        assert_eq!(conflict.label, "Registration Failed");

        let bad = AuthError::InvalidMsisdn.into_api("Registration Failed");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad.message, "invalid MSISDN format");

        let creds = AuthError::InvalidCredentials.into_api("Login Failed");
        assert_eq!(creds.status, StatusCode::UNAUTHORIZED);
        assert_eq!(creds.label, "Login Failed");

        let gone = AuthError::UserNotFound.into_api("Profile");
        assert_eq!(gone.label, "Unauthorized");

        let internal = AuthError::Internal(anyhow::anyhow!("db down")).into_api("Login Failed");
        assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!internal.message.contains("db down"));
    }
}
