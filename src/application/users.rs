use std::sync::Arc;

use crate::{
    application::{error::AppError, stores::UserStore},
    domain::{
        entities::{NewUser, USER_ENTITY, User},
        error::DomainError,
    },
    observe::{Mutation, Observer, Signal},
};

#[derive(Clone)]
pub struct UserService {
    store: UserStore,
    observer: Arc<dyn Observer>,
}

impl UserService {
    pub fn new(store: UserStore, observer: Arc<dyn Observer>) -> Self {
        Self { store, observer }
    }

    pub async fn create(&self, user: NewUser) -> Result<User, AppError> {
        if user.username.trim().is_empty() {
            return Err(DomainError::validation("username must not be empty").into());
        }
        let created = self.store.create(&user).await?;
        self.mutated(Mutation::Created);
        Ok(created)
    }

    pub async fn get(&self, user_id: i64) -> Result<User, AppError> {
        Ok(self.store.get_by_id(user_id).await?)
    }

    /// Admin operation. Lists owned by the user lose their ownership edge.
    pub async fn delete(&self, user_id: i64) -> Result<(), AppError> {
        self.store.delete(user_id).await?;
        self.mutated(Mutation::Deleted);
        Ok(())
    }

    fn mutated(&self, mutation: Mutation) {
        self.observer.record(Signal::EntityMutated {
            entity: USER_ENTITY,
            mutation,
        });
    }
}
