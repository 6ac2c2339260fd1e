use crate::auth::PasswordHasher;
use crate::error::AppError;
use crate::query::pagination::{ListParams, PaginatedResult, PaginationMeta};
use domain::user::{NewUser, User, UserChanges, UserError, UserRepository, UserType};
use domain::value::UserId;
use log::{error, info};
use std::sync::Arc;

/// Create user command. `password` is the plain text submitted by the operator.
#[derive(Debug, Clone)]
pub struct CreateUserCmd {
    pub name: String,
    pub account: String,
    pub password: String,
    pub status: bool,
    pub user_type: UserType,
}

/// Update user command. `password: None` keeps the stored credential.
#[derive(Debug, Clone)]
pub struct UpdateUserCmd {
    pub name: String,
    pub account: String,
    pub password: Option<String>,
    pub status: bool,
    pub user_type: UserType,
}

/// User directory: listing and administration of user accounts.
#[derive(Clone)]
pub struct UserDirectoryService {
    user_repo: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
}

impl UserDirectoryService {
    pub fn new(user_repo: Arc<dyn UserRepository>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { user_repo, hasher }
    }

    pub async fn list_paginated(&self, params: ListParams) -> Result<PaginatedResult<User>, AppError> {
        let params = params.normalized();
        let query = params.to_query();
        let (data, total) = self.user_repo.list(&query).await.map_err(|e| {
            error!("user list failed: {}", e);
            AppError::Persistence("users could not be loaded".to_string())
        })?;
        Ok(PaginatedResult {
            data,
            meta: PaginationMeta::new(query.page, query.per_page, total),
        })
    }

    pub async fn get_by_id(&self, id: UserId) -> Result<User, AppError> {
        self.user_repo.find_by_id(id).await.map_err(|e| {
            if !matches!(e, UserError::UserNotFound(_)) {
                error!("user lookup failed for {}: {}", id, e);
            }
            AppError::from_user_error(e, "user could not be loaded")
        })
    }

    pub async fn create(&self, acting: UserId, cmd: CreateUserCmd) -> Result<User, AppError> {
        if cmd.password.is_empty() {
            return Err(AppError::Credential("password is required".to_string()));
        }
        let name = required("name", &cmd.name)?;
        let account = required("account", &cmd.account)?;
        let password_hash = self.hasher.hash(&cmd.password).map_err(|e| {
            error!("password hashing failed: {}", e);
            AppError::Credential("password could not be processed".to_string())
        })?;

        let created = self
            .user_repo
            .create(NewUser {
                name,
                account,
                password_hash,
                status: cmd.status,
                user_type: cmd.user_type,
                created_by: Some(acting),
            })
            .await
            .map_err(|e| {
                error!("user create failed: {}", e);
                AppError::Persistence("user could not be saved".to_string())
            })?;
        info!("user {} created by {}", created.id, acting);
        Ok(created)
    }

    pub async fn update(&self, acting: UserId, id: UserId, cmd: UpdateUserCmd) -> Result<(), AppError> {
        self.get_by_id(id).await?;

        let mut changes = UserChanges {
            name: Some(required("name", &cmd.name)?),
            account: Some(required("account", &cmd.account)?),
            password_hash: None,
            status: Some(cmd.status),
            user_type: Some(cmd.user_type),
        };
        if let Some(password) = cmd.password.as_deref().filter(|p| !p.is_empty()) {
            let hash = self.hasher.hash(password).map_err(|e| {
                error!("password hashing failed: {}", e);
                AppError::Credential("password could not be processed".to_string())
            })?;
            changes.password_hash = Some(hash);
        }

        self.user_repo.update(id, changes, acting).await.map_err(|e| {
            if !matches!(e, UserError::UserNotFound(_)) {
                error!("user update failed for {}: {}", id, e);
            }
            AppError::from_user_error(e, "user could not be updated")
        })?;
        info!("user {} updated by {}", id, acting);
        Ok(())
    }

    pub async fn delete(&self, acting: UserId, id: UserId) -> Result<(), AppError> {
        self.user_repo.delete(id, acting).await.map_err(|e| {
            if !matches!(e, UserError::UserNotFound(_)) {
                error!("user delete failed for {}: {}", id, e);
            }
            AppError::from_user_error(e, "user could not be deleted")
        })?;
        info!("user {} deleted by {}", id, acting);
        Ok(())
    }

    pub async fn count(&self) -> Result<u64, AppError> {
        self.user_repo.count().await.map_err(|e| {
            error!("user count failed: {}", e);
            AppError::Persistence("users could not be counted".to_string())
        })
    }
}

fn required(field: &str, value: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{plain_hasher, user, StubUserRepository};

    const ADMIN: i64 = 1;

    fn setup(users: Vec<User>) -> (Arc<StubUserRepository>, UserDirectoryService) {
        let repo = Arc::new(StubUserRepository::with(users));
        let svc = UserDirectoryService::new(repo.clone(), plain_hasher());
        (repo, svc)
    }

    fn create_cmd(password: &str) -> CreateUserCmd {
        CreateUserCmd {
            name: "Ada".into(),
            account: "ada1".into(),
            password: password.into(),
            status: true,
            user_type: UserType::Dashboard,
        }
    }

    fn update_cmd(password: Option<&str>) -> UpdateUserCmd {
        UpdateUserCmd {
            name: "Ada L".into(),
            account: "ada1".into(),
            password: password.map(str::to_string),
            status: false,
            user_type: UserType::Panel,
        }
    }

    #[tokio::test]
    async fn create_stores_a_hash_and_the_creator() {
        let (repo, svc) = setup(vec![]);
        let created = svc.create(UserId::from(ADMIN), create_cmd("secret")).await.unwrap();

        assert_ne!(created.password, "secret");
        assert!(plain_hasher().verify("secret", &created.password).is_ok());
        assert_eq!(created.created_by, Some(UserId::from(ADMIN)));
        assert_eq!(repo.created.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn create_rejects_empty_password_before_touching_the_store() {
        let (repo, svc) = setup(vec![]);
        let err = svc.create(UserId::from(ADMIN), create_cmd("")).await.unwrap_err();
        assert!(matches!(err, AppError::Credential(_)));
        assert!(repo.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_requires_name_and_account() {
        let (_, svc) = setup(vec![]);
        let mut cmd = create_cmd("secret");
        cmd.account = "   ".into();
        let err = svc.create(UserId::from(ADMIN), cmd).await.unwrap_err();
        assert_eq!(err, AppError::Validation("account is required".into()));
    }

    #[tokio::test]
    async fn create_hides_store_failures() {
        let repo = Arc::new(StubUserRepository::failing());
        let svc = UserDirectoryService::new(repo, plain_hasher());
        let err = svc.create(UserId::from(ADMIN), create_cmd("secret")).await.unwrap_err();
        assert_eq!(err, AppError::Persistence("user could not be saved".into()));
    }

    #[tokio::test]
    async fn update_without_password_keeps_the_hash() {
        let (repo, svc) = setup(vec![user(2, "ada1", "secret", UserType::Dashboard)]);
        svc.update(UserId::from(ADMIN), UserId::from(2), update_cmd(None))
            .await
            .unwrap();

        let updates = repo.updates.lock().unwrap();
        let (id, changes, acting) = &updates[0];
        assert_eq!(*id, UserId::from(2));
        assert_eq!(*acting, UserId::from(ADMIN));
        assert_eq!(changes.password_hash, None);
        assert_eq!(changes.user_type, Some(UserType::Panel));
        assert_eq!(changes.status, Some(false));
        drop(updates);

        let stored = svc.get_by_id(UserId::from(2)).await.unwrap();
        assert_eq!(stored.password, "hashed:secret");
        assert_eq!(stored.updated_by, Some(UserId::from(ADMIN)));
    }

    #[tokio::test]
    async fn update_with_password_rehashes() {
        let (_, svc) = setup(vec![user(2, "ada1", "secret", UserType::Dashboard)]);
        svc.update(UserId::from(ADMIN), UserId::from(2), update_cmd(Some("fresh")))
            .await
            .unwrap();
        let stored = svc.get_by_id(UserId::from(2)).await.unwrap();
        assert!(plain_hasher().verify("fresh", &stored.password).is_ok());
    }

    #[tokio::test]
    async fn update_of_missing_user_is_not_found() {
        let (repo, svc) = setup(vec![]);
        let err = svc
            .update(UserId::from(ADMIN), UserId::from(77), update_cmd(None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(repo.updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_hides_the_user_and_decrements_count() {
        let (_, svc) = setup(vec![
            user(2, "ada1", "a", UserType::Dashboard),
            user(3, "bob", "b", UserType::Panel),
        ]);
        assert_eq!(svc.count().await.unwrap(), 2);

        svc.delete(UserId::from(ADMIN), UserId::from(2)).await.unwrap();

        assert_eq!(svc.count().await.unwrap(), 1);
        assert!(matches!(
            svc.get_by_id(UserId::from(2)).await,
            Err(AppError::NotFound(_))
        ));
        let page = svc.list_paginated(ListParams::default()).await.unwrap();
        assert!(page.data.iter().all(|u| u.id != UserId::from(2)));
    }

    #[tokio::test]
    async fn delete_of_missing_user_is_not_found() {
        let (_, svc) = setup(vec![user(2, "ada1", "a", UserType::Dashboard)]);
        let err = svc.delete(UserId::from(ADMIN), UserId::from(99)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(svc.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn list_normalizes_params_and_computes_pages() {
        let users = (1..=23)
            .map(|i| user(i, &format!("u{}", i), "x", UserType::Panel))
            .collect();
        let (repo, svc) = setup(users);

        let page = svc
            .list_paginated(ListParams {
                page: 0,
                per_page: 1000,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.data.len(), 10);
        assert_eq!(page.meta.current_page, 1);
        assert_eq!(page.meta.per_page, 10);
        assert_eq!(page.meta.total_items, 23);
        assert_eq!(page.meta.total_pages, 3);

        let query = repo.queries.lock().unwrap()[0].clone();
        assert_eq!(query.sort_by, "id");
        assert_eq!(query.order_by, "desc");
    }

    #[tokio::test]
    async fn list_far_past_the_end_is_empty() {
        let (repo, svc) = setup(vec![user(2, "ada1", "a", UserType::Dashboard)]);

        let page = svc
            .list_paginated(ListParams {
                page: i64::MAX,
                per_page: 10,
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(page.data.is_empty());
        assert_eq!(page.meta.total_items, 1);
        assert!(!page.meta.has_next());
        let query = repo.queries.lock().unwrap()[0].clone();
        assert_eq!(query.page, (i64::MAX / 10) as u64);
    }

    #[tokio::test]
    async fn list_reports_store_failure() {
        let repo = Arc::new(StubUserRepository::failing());
        let svc = UserDirectoryService::new(repo, plain_hasher());
        let err = svc.list_paginated(ListParams::default()).await.unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));
    }
}
