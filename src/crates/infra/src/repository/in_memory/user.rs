use crate::normalize::{fold_turkish, name_matches};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use domain::user::{
    NewUser, SortColumn, SortOrder, User, UserChanges, UserError, UserListQuery, UserRepository,
};
use domain::value::UserId;
use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Process-local user store with the same contract as the Postgres one.
#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    store: Arc<DashMap<UserId, User>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn live(&self) -> Vec<User> {
        self.store
            .iter()
            .filter(|e| e.value().deleted_at.is_none())
            .map(|e| e.value().clone())
            .collect()
    }

    fn account_taken(&self, account: &str, except: Option<UserId>) -> bool {
        self.store.iter().any(|e| {
            let u = e.value();
            u.deleted_at.is_none() && u.account == account && Some(u.id) != except
        })
    }
}

fn compare(a: &User, b: &User, column: SortColumn) -> CmpOrdering {
    match column {
        SortColumn::Id => a.id.as_i64().cmp(&b.id.as_i64()),
        SortColumn::Name => fold_turkish(&a.name).cmp(&fold_turkish(&b.name)),
        SortColumn::Account => a.account.cmp(&b.account),
        SortColumn::CreatedAt => a.created_at.cmp(&b.created_at),
        SortColumn::Status => a.status.cmp(&b.status),
        SortColumn::Type => a.user_type.as_str().cmp(b.user_type.as_str()),
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn list(&self, query: &UserListQuery) -> Result<(Vec<User>, u64), UserError> {
        let mut matches: Vec<User> = self
            .live()
            .into_iter()
            .filter(|u| name_matches(&u.name, &query.name))
            .collect();
        let total = matches.len() as u64;
        if total == 0 {
            return Ok((Vec::new(), 0));
        }

        let column = query.sort_column();
        let order = query.sort_order();
        matches.sort_by(|a, b| {
            let ord = compare(a, b, column).then_with(|| a.id.as_i64().cmp(&b.id.as_i64()));
            match order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });
        let page = matches
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.per_page as usize)
            .collect();
        Ok((page, total))
    }

    async fn find_by_id(&self, id: UserId) -> Result<User, UserError> {
        self.store
            .get(&id)
            .map(|e| e.value().clone())
            .filter(|u| u.deleted_at.is_none())
            .ok_or_else(|| UserError::UserNotFound(id.to_string()))
    }

    async fn find_by_account(&self, account: &str) -> Result<User, UserError> {
        self.live()
            .into_iter()
            .find(|u| u.account == account)
            .ok_or_else(|| UserError::UserNotFound(account.to_string()))
    }

    async fn count(&self) -> Result<u64, UserError> {
        Ok(self.live().len() as u64)
    }

    async fn create(&self, new_user: NewUser) -> Result<User, UserError> {
        if self.account_taken(&new_user.account, None) {
            return Err(UserError::DuplicateAccount(new_user.account));
        }
        let now = Utc::now().naive_utc();
        let id = UserId::from(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let user = User {
            id,
            name: new_user.name,
            account: new_user.account,
            password: new_user.password_hash,
            status: new_user.status,
            user_type: new_user.user_type,
            created_by: new_user.created_by,
            updated_by: None,
            deleted_by: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        self.store.insert(id, user.clone());
        Ok(user)
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
        if let Some(account) = &changes.account {
            if self.account_taken(account, Some(id)) {
                return Err(UserError::DuplicateAccount(account.clone()));
            }
        }
        let mut entry = self
            .store
            .get_mut(&id)
            .filter(|e| e.value().deleted_at.is_none())
            .ok_or_else(|| UserError::UserNotFound(id.to_string()))?;
        let user = entry.value_mut();
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(account) = changes.account {
            user.account = account;
        }
        if let Some(hash) = changes.password_hash {
            user.password = hash;
        }
        if let Some(status) = changes.status {
            user.status = status;
        }
        if let Some(user_type) = changes.user_type {
            user.user_type = user_type;
        }
        user.updated_by = Some(acting);
        user.updated_at = Utc::now().naive_utc();
        Ok(())
    }

    async fn delete(&self, id: UserId, acting: UserId) -> Result<(), UserError> {
        let mut entry = self
            .store
            .get_mut(&id)
            .filter(|e| e.value().deleted_at.is_none())
            .ok_or_else(|| UserError::UserNotFound(id.to_string()))?;
        let user = entry.value_mut();
        user.deleted_by = Some(acting);
        user.deleted_at = Some(Utc::now().naive_utc());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::user::UserType;

    fn new_user(name: &str, account: &str) -> NewUser {
        NewUser {
            name: name.to_string(),
            account: account.to_string(),
            password_hash: "hash".to_string(),
            status: true,
            user_type: UserType::Dashboard,
            created_by: None,
        }
    }

    fn query(name: &str, sort_by: &str, order_by: &str, page: u64, per_page: u64) -> UserListQuery {
        UserListQuery {
            name: name.to_string(),
            sort_by: sort_by.to_string(),
            order_by: order_by.to_string(),
            page,
            per_page,
        }
    }

    #[tokio::test]
    async fn search_folds_turkish_letters() {
        let repo = InMemoryUserRepository::new();
        repo.create(new_user("ALİ", "a1")).await.unwrap();
        repo.create(new_user("ali", "a2")).await.unwrap();
        repo.create(new_user("Ayşe", "a3")).await.unwrap();

        let (items, total) = repo.list(&query("Ali", "name", "asc", 1, 10)).await.unwrap();
        assert_eq!(total, 2);
        let mut accounts: Vec<_> = items.iter().map(|u| u.account.as_str()).collect();
        accounts.sort();
        assert_eq!(accounts, vec!["a1", "a2"]);
    }

    #[tokio::test]
    async fn pages_are_windows_over_the_sorted_list() {
        let repo = InMemoryUserRepository::new();
        for i in 1..=25 {
            repo.create(new_user(&format!("user {:02}", i), &format!("u{}", i)))
                .await
                .unwrap();
        }

        let (items, total) = repo.list(&query("", "id", "desc", 3, 10)).await.unwrap();
        assert_eq!(total, 25);
        let ids: Vec<i64> = items.iter().map(|u| u.id.as_i64()).collect();
        assert_eq!(ids, vec![5, 4, 3, 2, 1]);

        let (items, _) = repo.list(&query("", "bogus", "sideways", 1, 2)).await.unwrap();
        assert_eq!(items[0].id, UserId::from(25));
    }

    #[tokio::test]
    async fn accounts_are_unique_among_live_users() {
        let repo = InMemoryUserRepository::new();
        let first = repo.create(new_user("Ada", "ada")).await.unwrap();
        assert_eq!(
            repo.create(new_user("Ada 2", "ada")).await.unwrap_err(),
            UserError::DuplicateAccount("ada".to_string())
        );

        repo.delete(first.id, UserId::from(1)).await.unwrap();
        assert!(repo.create(new_user("Ada 2", "ada")).await.is_ok());
    }

    #[tokio::test]
    async fn deleted_users_disappear_from_reads() {
        let repo = InMemoryUserRepository::new();
        let ada = repo.create(new_user("Ada", "ada")).await.unwrap();
        repo.create(new_user("Bob", "bob")).await.unwrap();

        repo.delete(ada.id, UserId::from(9)).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);
        assert!(repo.find_by_id(ada.id).await.is_err());
        assert!(repo.find_by_account("ada").await.is_err());
        assert_eq!(
            repo.delete(ada.id, UserId::from(9)).await.unwrap_err(),
            UserError::UserNotFound(ada.id.to_string())
        );
        let stored = repo.store.get(&ada.id).unwrap().value().clone();
        assert_eq!(stored.deleted_by, Some(UserId::from(9)));
    }

    #[tokio::test]
    async fn update_writes_only_supplied_fields() {
        let repo = InMemoryUserRepository::new();
        let ada = repo.create(new_user("Ada", "ada")).await.unwrap();

        let changes = UserChanges {
            status: Some(false),
            ..Default::default()
        };
        repo.update(ada.id, changes, UserId::from(3)).await.unwrap();

        let stored = repo.find_by_id(ada.id).await.unwrap();
        assert!(!stored.status);
        assert_eq!(stored.name, "Ada");
        assert_eq!(stored.password, "hash");
        assert_eq!(stored.updated_by, Some(UserId::from(3)));
    }
}
