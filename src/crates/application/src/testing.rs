use crate::auth::PasswordHasher;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use domain::user::{NewUser, User, UserChanges, UserError, UserListQuery, UserRepository, UserType};
use domain::value::UserId;
use std::sync::{Arc, Mutex};

/// Reversible "hash" so assertions can see what was stored.
pub struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash(&self, plain: &str) -> Result<String, AppError> {
        Ok(format!("hashed:{}", plain))
    }

    fn verify(&self, pwd: &str, hashed_pwd: &str) -> Result<(), AppError> {
        if hashed_pwd == format!("hashed:{}", pwd) {
            Ok(())
        } else {
            Err(AppError::Unauthorized("invalid password".to_string()))
        }
    }
}

pub fn plain_hasher() -> Arc<dyn PasswordHasher> {
    Arc::new(PlainHasher)
}

pub fn user(id: i64, account: &str, password: &str, user_type: UserType) -> User {
    let now = Utc::now().naive_utc();
    User {
        id: UserId::from(id),
        name: account.to_uppercase(),
        account: account.to_string(),
        password: format!("hashed:{}", password),
        status: true,
        user_type,
        created_by: None,
        updated_by: None,
        deleted_by: None,
        deleted_at: None,
        created_at: now,
        updated_at: now,
    }
}

/// Records what the services hand to the store.
#[derive(Default)]
pub struct StubUserRepository {
    users: Mutex<Vec<User>>,
    fail: bool,
    pub queries: Mutex<Vec<UserListQuery>>,
    pub updates: Mutex<Vec<(UserId, UserChanges, UserId)>>,
    pub created: Mutex<Vec<NewUser>>,
}

impl StubUserRepository {
    pub fn with(users: Vec<User>) -> Self {
        Self {
            users: Mutex::new(users),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn check(&self) -> Result<(), UserError> {
        if self.fail {
            Err(UserError::DbErr("connection refused".to_string()))
        } else {
            Ok(())
        }
    }

    fn live(&self) -> Vec<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.deleted_at.is_none())
            .cloned()
            .collect()
    }
}

#[async_trait]
impl UserRepository for StubUserRepository {
    async fn list(&self, query: &UserListQuery) -> Result<(Vec<User>, u64), UserError> {
        self.check()?;
        self.queries.lock().unwrap().push(query.clone());
        let live = self.live();
        let total = live.len() as u64;
        let page = live
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.per_page as usize)
            .collect();
        Ok((page, total))
    }

    async fn find_by_id(&self, id: UserId) -> Result<User, UserError> {
        self.check()?;
        self.live()
            .into_iter()
            .find(|u| u.id == id)
            .ok_or_else(|| UserError::UserNotFound(id.to_string()))
    }

    async fn find_by_account(&self, account: &str) -> Result<User, UserError> {
        self.check()?;
        self.live()
            .into_iter()
            .find(|u| u.account == account)
            .ok_or_else(|| UserError::UserNotFound(account.to_string()))
    }

    async fn count(&self) -> Result<u64, UserError> {
        self.check()?;
        Ok(self.live().len() as u64)
    }

    async fn create(&self, new_user: NewUser) -> Result<User, UserError> {
        self.check()?;
        self.created.lock().unwrap().push(new_user.clone());
        let mut users = self.users.lock().unwrap();
        let mut created = user(users.len() as i64 + 1, &new_user.account, "", new_user.user_type);
        created.name = new_user.name;
        created.password = new_user.password_hash;
        created.status = new_user.status;
        created.created_by = new_user.created_by;
        users.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: UserId, changes: UserChanges, acting: UserId) -> Result<(), UserError> {
        self.check()?;
        self.updates.lock().unwrap().push((id, changes.clone(), acting));
        let mut users = self.users.lock().unwrap();
        let target = users
            .iter_mut()
            .find(|u| u.id == id && u.deleted_at.is_none())
            .ok_or_else(|| UserError::UserNotFound(id.to_string()))?;
        if let Some(name) = changes.name {
            target.name = name;
        }
        if let Some(account) = changes.account {
            target.account = account;
        }
        if let Some(hash) = changes.password_hash {
            target.password = hash;
        }
        if let Some(status) = changes.status {
            target.status = status;
        }
        if let Some(user_type) = changes.user_type {
            target.user_type = user_type;
        }
        target.updated_by = Some(acting);
        Ok(())
    }

    async fn delete(&self, id: UserId, acting: UserId) -> Result<(), UserError> {
        self.check()?;
        let mut users = self.users.lock().unwrap();
        let target = users
            .iter_mut()
            .find(|u| u.id == id && u.deleted_at.is_none())
            .ok_or_else(|| UserError::UserNotFound(id.to_string()))?;
        target.deleted_by = Some(acting);
        target.deleted_at = Some(Utc::now().naive_utc());
        Ok(())
    }
}
