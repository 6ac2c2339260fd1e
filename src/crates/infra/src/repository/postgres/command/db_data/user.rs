//! `SeaORM` Entity for users table

use domain::user::{self as user_domain, User};
use domain::value::UserId;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Postgres enum `user_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "user_type")]
pub enum UserType {
    #[sea_orm(string_value = "dashboard")]
    Dashboard,
    #[sea_orm(string_value = "panel")]
    Panel,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub account: String,
    pub password: String,
    pub status: bool,
    #[sea_orm(column_name = "type")]
    pub user_type: UserType,
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
    pub deleted_by: Option<i64>,
    pub deleted_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<UserType> for user_domain::UserType {
    fn from(value: UserType) -> Self {
        match value {
            UserType::Dashboard => user_domain::UserType::Dashboard,
            UserType::Panel => user_domain::UserType::Panel,
        }
    }
}

impl From<user_domain::UserType> for UserType {
    fn from(value: user_domain::UserType) -> Self {
        match value {
            user_domain::UserType::Dashboard => UserType::Dashboard,
            user_domain::UserType::Panel => UserType::Panel,
        }
    }
}

impl From<Model> for User {
    fn from(model: Model) -> Self {
        User {
            id: UserId::from(model.id),
            name: model.name,
            account: model.account,
            password: model.password,
            status: model.status,
            user_type: model.user_type.into(),
            created_by: model.created_by.map(UserId::from),
            updated_by: model.updated_by.map(UserId::from),
            deleted_by: model.deleted_by.map(UserId::from),
            deleted_at: model.deleted_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
