use super::db_data::user::{ActiveModel, Column, Entity};
use crate::normalize::{name_like_pattern, NAME_MATCH_SQL};
use async_trait::async_trait;
use chrono::Utc;
use domain::user::{
    NewUser, SortColumn, SortOrder, User, UserChanges, UserError, UserListQuery, UserRepository,
};
use domain::value::UserId;
use log::debug;
use sea_orm::sea_query::Expr;
use sea_orm::*;

pub struct UserRepositoryImpl {
    db: DatabaseConnection,
}

impl UserRepositoryImpl {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Every regular read goes through here so soft-deleted rows never leak.
fn live() -> Select<Entity> {
    Entity::find().filter(Column::DeletedAt.is_null())
}

fn sort_column(column: SortColumn) -> Column {
    match column {
        SortColumn::Id => Column::Id,
        SortColumn::Name => Column::Name,
        SortColumn::Account => Column::Account,
        SortColumn::CreatedAt => Column::CreatedAt,
        SortColumn::Status => Column::Status,
        SortColumn::Type => Column::UserType,
    }
}

fn sort_order(order: SortOrder) -> Order {
    match order {
        SortOrder::Asc => Order::Asc,
        SortOrder::Desc => Order::Desc,
    }
}

fn db_err(e: DbErr) -> UserError {
    UserError::DbErr(e.to_string())
}

#[async_trait]
impl UserRepository for UserRepositoryImpl {
    async fn list(&self, query: &UserListQuery) -> Result<(Vec<User>, u64), UserError> {
        let mut select = live();
        if let Some(pattern) = name_like_pattern(&query.name) {
            select = select.filter(Expr::cust_with_values(NAME_MATCH_SQL, [pattern]));
        }

        let total = select.clone().count(&self.db).await.map_err(db_err)?;
        if total == 0 {
            return Ok((Vec::new(), 0));
        }

        let models = select
            .order_by(sort_column(query.sort_column()), sort_order(query.sort_order()))
            .offset(query.offset())
            .limit(query.per_page)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        debug!(
            "user list: page={} per_page={} total={} returned={}",
            query.page,
            query.per_page,
            total,
            models.len()
        );
        Ok((models.into_iter().map(User::from).collect(), total))
    }

    async fn find_by_id(&self, id: UserId) -> Result<User, UserError> {
        live()
            .filter(Column::Id.eq(id.as_i64()))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(User::from)
            .ok_or_else(|| UserError::UserNotFound(id.to_string()))
    }

    async fn find_by_account(&self, account: &str) -> Result<User, UserError> {
        live()
            .filter(Column::Account.eq(account))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(User::from)
            .ok_or_else(|| UserError::UserNotFound(account.to_string()))
    }

    async fn count(&self) -> Result<u64, UserError> {
        live().count(&self.db).await.map_err(db_err)
    }

    async fn create(&self, new_user: NewUser) -> Result<User, UserError> {
        let now = Utc::now().naive_utc();
        let account = new_user.account.clone();
        let active_model = ActiveModel {
            id: NotSet,
            name: Set(new_user.name),
            account: Set(new_user.account),
            password: Set(new_user.password_hash),
            status: Set(new_user.status),
            user_type: Set(new_user.user_type.into()),
            created_by: Set(new_user.created_by.map(i64::from)),
            updated_by: Set(None),
            deleted_by: Set(None),
            deleted_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let model = active_model.insert(&self.db).await.map_err(|e| {
            if let Some(SqlErr::UniqueConstraintViolation(_)) = e.sql_err() {
                UserError::DuplicateAccount(account)
            } else {
                db_err(e)
            }
        })?;
        Ok(model.into())
    }

    async fn update(
        &self,
        id: UserId,
        changes: UserChanges,
        acting: UserId,
    ) -> Result<(), UserError> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut active_model = ActiveModel {
            updated_by: Set(Some(acting.as_i64())),
            updated_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        };
        if let Some(name) = changes.name {
            active_model.name = Set(name);
        }
        let account = changes.account.clone();
        if let Some(account) = changes.account {
            active_model.account = Set(account);
        }
        if let Some(hash) = changes.password_hash {
            active_model.password = Set(hash);
        }
        if let Some(status) = changes.status {
            active_model.status = Set(status);
        }
        if let Some(user_type) = changes.user_type {
            active_model.user_type = Set(user_type.into());
        }

        let result = Entity::update_many()
            .set(active_model)
            .filter(Column::Id.eq(id.as_i64()))
            .filter(Column::DeletedAt.is_null())
            .exec(&self.db)
            .await
            .map_err(|e| match (e.sql_err(), account) {
                (Some(SqlErr::UniqueConstraintViolation(_)), Some(account)) => {
                    UserError::DuplicateAccount(account)
                }
                _ => db_err(e),
            })?;
        if result.rows_affected == 0 {
            return Err(UserError::UserNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, id: UserId, acting: UserId) -> Result<(), UserError> {
        self.find_by_id(id).await?;

        let active_model = ActiveModel {
            deleted_by: Set(Some(acting.as_i64())),
            deleted_at: Set(Some(Utc::now().naive_utc())),
            ..Default::default()
        };
        let result = Entity::update_many()
            .set(active_model)
            .filter(Column::Id.eq(id.as_i64()))
            .filter(Column::DeletedAt.is_null())
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        // lost a race with a concurrent delete
        if result.rows_affected == 0 {
            return Err(UserError::UserNotFound(id.to_string()));
        }
        Ok(())
    }
}
