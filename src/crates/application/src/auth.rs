use std::sync::Arc;

use crate::error::AppError;
use domain::user::{User, UserError, UserRepository};
use domain::value::UserId;
use log::{error, info, warn};

const INVALID_CREDENTIALS: &str = "invalid account or password";

pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plain: &str) -> Result<String, AppError>;
    fn verify(&self, pwd: &str, hashed_pwd: &str) -> Result<(), AppError>;
}

/// What a session remembers about its user.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionClaims {
    pub subject: String,   // user id
    pub user_type: String, // dashboard | panel
}

impl From<&User> for SessionClaims {
    fn from(user: &User) -> Self {
        Self {
            subject: user.id.to_string(),
            user_type: user.user_type.as_str().to_string(),
        }
    }
}

pub trait TokenService: Send + Sync {
    fn issue(&self, claims: &SessionClaims) -> Result<String, AppError>;
    fn verify(&self, token: &str) -> Result<SessionClaims, AppError>;
}

#[derive(Clone)]
pub struct AuthService {
    user_repo: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
}

impl AuthService {
    pub fn new(user_repo: Arc<dyn UserRepository>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { user_repo, hasher }
    }

    /// Checks the credentials and returns the user they belong to.
    ///
    /// Unknown accounts, wrong passwords and inactive users all produce the
    /// same `Unauthorized` error.
    pub async fn login(&self, account: &str, pwd: &str) -> Result<User, AppError> {
        let user = match self.user_repo.find_by_account(account).await {
            Ok(user) => user,
            Err(UserError::UserNotFound(_)) => {
                info!("login rejected: unknown account {}", account);
                return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
            }
            Err(e) => {
                error!("login lookup failed for {}: {}", account, e);
                return Err(AppError::Persistence("login is unavailable".to_string()));
            }
        };
        if self.hasher.verify(pwd, &user.password).is_err() {
            info!("login rejected: bad password for user {}", user.id);
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
        if !user.is_active() {
            warn!("login rejected: user {} is inactive", user.id);
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
        Ok(user)
    }

    /// Loads the user a session points at.
    pub async fn profile(&self, id: UserId) -> Result<User, AppError> {
        self.user_repo.find_by_id(id).await.map_err(|e| {
            error!("profile load failed for user {}: {}", id, e);
            AppError::from_user_error(e, "profile could not be loaded")
        })
    }
}
