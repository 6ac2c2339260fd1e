use super::value::UserId;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::fmt::{self, Display};
use thiserror::Error;

/// User domain errors.
///
/// Callers match on the variant, never on the message text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UserError {
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("account already in use: {0}")]
    DuplicateAccount(String),
    #[error("invalid user type: {0}")]
    InvalidUserType(String),
    #[error("{0}")]
    DbErr(String),
}

/// Access class of a user. Decides which area of the application the user may enter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserType {
    Dashboard,
    Panel,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Dashboard => "dashboard",
            UserType::Panel => "panel",
        }
    }
}

impl TryFrom<&str> for UserType {
    type Error = UserError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "dashboard" => Ok(UserType::Dashboard),
            "panel" => Ok(UserType::Panel),
            other => Err(UserError::InvalidUserType(other.to_string())),
        }
    }
}

impl Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User aggregate.
///
/// `password` always holds a bcrypt hash. A user with `deleted_at` set is
/// soft-deleted and invisible to every regular read.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub account: String,
    pub password: String,
    pub status: bool,
    pub user_type: UserType,
    pub created_by: Option<UserId>,
    pub updated_by: Option<UserId>,
    pub deleted_by: Option<UserId>,
    pub deleted_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status && self.deleted_at.is_none()
    }
}

/// A user ready to be inserted. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub account: String,
    pub password_hash: String,
    pub status: bool,
    pub user_type: UserType,
    pub created_by: Option<UserId>,
}

/// Partial update of a user. Only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserChanges {
    pub name: Option<String>,
    pub account: Option<String>,
    pub password_hash: Option<String>,
    pub status: Option<bool>,
    pub user_type: Option<UserType>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.account.is_none()
            && self.password_hash.is_none()
            && self.status.is_none()
            && self.user_type.is_none()
    }
}

/// Columns a user list may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    #[default]
    Id,
    Name,
    Account,
    CreatedAt,
    Status,
    Type,
}

impl SortColumn {
    /// Maps a request parameter onto the allow-list, falling back to the default column.
    pub fn from_param(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "id" => SortColumn::Id,
            "name" => SortColumn::Name,
            "account" => SortColumn::Account,
            "created_at" => SortColumn::CreatedAt,
            "status" => SortColumn::Status,
            "type" => SortColumn::Type,
            _ => SortColumn::default(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortColumn::Id => "id",
            SortColumn::Name => "name",
            SortColumn::Account => "account",
            SortColumn::CreatedAt => "created_at",
            SortColumn::Status => "status",
            SortColumn::Type => "type",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn from_param(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => SortOrder::Asc,
            "desc" => SortOrder::Desc,
            _ => SortOrder::default(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// One page of the user list as asked for by the caller.
///
/// `sort_by` and `order_by` are raw request values; the store maps them
/// through [`SortColumn::from_param`] and [`SortOrder::from_param`].
#[derive(Debug, Clone, PartialEq)]
pub struct UserListQuery {
    pub name: String,
    pub sort_by: String,
    pub order_by: String,
    pub page: u64,
    pub per_page: u64,
}

impl UserListQuery {
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }

    pub fn sort_column(&self) -> SortColumn {
        SortColumn::from_param(&self.sort_by)
    }

    pub fn sort_order(&self) -> SortOrder {
        SortOrder::from_param(&self.order_by)
    }
}

/// Persistence port for users. Every read skips soft-deleted rows.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Returns one page of users plus the total number of matching users.
    async fn list(&self, query: &UserListQuery) -> Result<(Vec<User>, u64), UserError>;
    async fn find_by_id(&self, id: UserId) -> Result<User, UserError>;
    async fn find_by_account(&self, account: &str) -> Result<User, UserError>;
    async fn count(&self) -> Result<u64, UserError>;
    async fn create(&self, user: NewUser) -> Result<User, UserError>;
    /// Writes only the supplied fields and stamps `updated_by` with `acting`.
    async fn update(
        &self,
        id: UserId,
        changes: UserChanges,
        acting: UserId,
    ) -> Result<(), UserError>;
    /// Soft-deletes the user, recording `acting` as the deleter.
    async fn delete(&self, id: UserId, acting: UserId) -> Result<(), UserError>;
}
