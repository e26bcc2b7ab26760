use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use cartline_core::{Email, UserId, UserRole};

use crate::db::{RepositoryError, UserRepository};
use crate::models::{NewUser, User};

#[derive(Debug)]
struct Row {
    user: User,
    password_hash: String,
}

#[derive(Debug, Default)]
struct State {
    rows: BTreeMap<UserId, Row>,
    last_id: i32,
}

/// Users held in process memory.
#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    state: RwLock<State>,
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut state = self.state.write();
        if state.rows.values().any(|row| row.user.email == user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        state.last_id += 1;
        let now = Utc::now();
        let created = User {
            id: UserId::new(state.last_id),
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        state.rows.insert(
            created.id,
            Row {
                user: created.clone(),
                password_hash: user.password_hash,
            },
        );
        Ok(created)
    }

    async fn find_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let state = self.state.read();
        Ok(state
            .rows
            .values()
            .find(|row| &row.user.email == email)
            .map(|row| (row.user.clone(), row.password_hash.clone())))
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.state.read().rows.get(&id).map(|row| row.user.clone()))
    }

    async fn set_role(&self, email: &Email, role: UserRole) -> Result<User, RepositoryError> {
        let mut state = self.state.write();
        let row = state
            .rows
            .values_mut()
            .find(|row| &row.user.email == email)
            .ok_or(RepositoryError::NotFound)?;
        row.user.role = role;
        row.user.updated_at = Utc::now();
        Ok(row.user.clone())
    }
}
