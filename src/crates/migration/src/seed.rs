use crate::bootstrap::BootstrapError;
use application::auth::PasswordHasher;
use chrono::Utc;
use infra::repository::postgres::command::db_data::user;
use log::info;
use sea_orm_migration::sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, Set,
};

pub const SYSTEM_NAME: &str = "SYSTEM";
pub const SYSTEM_ACCOUNT: &str = "system@gatehouse";

/// Identity of the distinguished system account.
#[derive(Debug, Clone)]
pub struct SystemUser {
    pub name: String,
    pub account: String,
    /// Used only when the account has to be created.
    pub initial_password: String,
}

impl SystemUser {
    pub fn new(initial_password: &str) -> Self {
        Self {
            name: SYSTEM_NAME.to_string(),
            account: SYSTEM_ACCOUNT.to_string(),
            initial_password: initial_password.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SeedOutcome {
    Created(i64),
    Reconciled(i64),
    Unchanged(i64),
}

/// Makes sure the system account exists as an active dashboard user.
///
/// An existing account only gets its name and status reconciled; its
/// password and account are left alone.
pub async fn ensure_system_user<C: ConnectionTrait>(
    db: &C,
    system: &SystemUser,
    hasher: &dyn PasswordHasher,
) -> Result<SeedOutcome, BootstrapError> {
    let existing = user::Entity::find()
        .filter(user::Column::Account.eq(system.account.as_str()))
        .filter(user::Column::DeletedAt.is_null())
        .one(db)
        .await?;

    let now = Utc::now().naive_utc();
    match existing {
        Some(model) if model.user_type != user::UserType::Dashboard => {
            Err(BootstrapError::Seed(format!(
                "account {} exists with type {:?}",
                system.account, model.user_type
            )))
        }
        Some(model) if model.name == system.name && model.status => {
            info!("system user {} already present", model.id);
            Ok(SeedOutcome::Unchanged(model.id))
        }
        Some(model) => {
            let id = model.id;
            let mut active: user::ActiveModel = model.into();
            active.name = Set(system.name.clone());
            active.status = Set(true);
            active.updated_at = Set(now);
            active.update(db).await?;
            info!("system user {} reconciled", id);
            Ok(SeedOutcome::Reconciled(id))
        }
        None => {
            let password_hash = hasher
                .hash(&system.initial_password)
                .map_err(|e| BootstrapError::Seed(e.to_string()))?;
            let created = user::ActiveModel {
                id: NotSet,
                name: Set(system.name.clone()),
                account: Set(system.account.clone()),
                password: Set(password_hash),
                status: Set(true),
                user_type: Set(user::UserType::Dashboard),
                created_by: Set(None),
                updated_by: Set(None),
                deleted_by: Set(None),
                deleted_at: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(db)
            .await?;
            info!("system user {} created", created.id);
            Ok(SeedOutcome::Created(created.id))
        }
    }
}
