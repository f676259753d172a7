use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::{
    application::{error::AppError, stores::ListStore},
    domain::{
        entities::{LIST_ENTITY, ListPatch, NewList, TodoList},
        events::{ListCreated, ListDeleted, ListUpdated},
    },
    events::EventProducer,
    observe::{Mutation, Observer, Signal},
    search::{DocumentIndex, SearchDocument, SearchQuery},
};

/// Use cases for todo lists. Ownership is checked against the store before
/// any read or write; events go out after the write and its cache effects.
#[derive(Clone)]
pub struct ListService {
    store: ListStore,
    index: Arc<dyn DocumentIndex>,
    producer: Arc<EventProducer>,
    observer: Arc<dyn Observer>,
}

impl ListService {
    pub fn new(
        store: ListStore,
        index: Arc<dyn DocumentIndex>,
        producer: Arc<EventProducer>,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self {
            store,
            index,
            producer,
            observer,
        }
    }

    pub async fn create(&self, user_id: i64, input: NewList) -> Result<TodoList, AppError> {
        input.validate()?;
        let list = self.store.create(user_id, &input).await?;
        self.mutated(Mutation::Created);

        self.producer.publish(&ListCreated {
            user_id,
            list: list.clone(),
        });
        Ok(list)
    }

    pub async fn get_all(&self, user_id: i64) -> Result<Vec<TodoList>, AppError> {
        Ok(self.store.get_all(user_id).await?)
    }

    pub async fn get_one(&self, user_id: i64, list_id: i64) -> Result<TodoList, AppError> {
        self.store.ensure_owner(user_id, list_id).await?;
        Ok(self.store.get_by_id(list_id).await?)
    }

    pub async fn update(
        &self,
        user_id: i64,
        list_id: i64,
        patch: ListPatch,
    ) -> Result<(), AppError> {
        patch.validate()?;
        self.store.ensure_owner(user_id, list_id).await?;
        self.store.update(user_id, list_id, &patch).await?;
        self.mutated(Mutation::Updated);

        self.producer.publish(&ListUpdated { user_id, list_id });
        Ok(())
    }

    pub async fn delete(&self, user_id: i64, list_id: i64) -> Result<(), AppError> {
        self.store.ensure_owner(user_id, list_id).await?;
        self.store.delete(Some(user_id), list_id).await?;
        self.mutated(Mutation::Deleted);

        self.producer.publish(&ListDeleted { list_id });
        Ok(())
    }

    /// Skips the ownership check; the owner's collection key is left to expire.
    pub async fn delete_by_admin(&self, list_id: i64) -> Result<(), AppError> {
        self.store.delete(None, list_id).await?;
        self.mutated(Mutation::Deleted);
        info!(list_id, "List deleted by admin");

        self.producer.publish(&ListDeleted { list_id });
        Ok(())
    }

    /// Hits come back in store order, not relevance order.
    #[instrument(skip(self, text))]
    pub async fn search(&self, user_id: i64, text: &str) -> Result<Vec<TodoList>, AppError> {
        let ids = self
            .index
            .search_ids(&SearchQuery::new(user_id, text))
            .await?;
        self.observer.record(Signal::SearchQueried {
            entity: LIST_ENTITY,
            hits: ids.len(),
        });
        Ok(self.store.get_many_by_ids(&ids).await?)
    }

    pub async fn handle_created(&self, event: &ListCreated) -> Result<(), AppError> {
        self.index
            .upsert(&SearchDocument::for_list(event.user_id, &event.list))
            .await?;
        Ok(())
    }

    /// Re-reads the list so the index gets the committed state.
    pub async fn handle_updated(&self, event: &ListUpdated) -> Result<(), AppError> {
        let list = match self.store.get_by_id(event.list_id).await {
            Ok(list) => list,
            Err(err) => {
                if err.is_not_found() {
                    warn!(list_id = event.list_id, "Updated list is gone; not indexing");
                }
                return Err(err.into());
            }
        };
        self.index
            .upsert(&SearchDocument::for_list(event.user_id, &list))
            .await?;
        Ok(())
    }

    pub async fn handle_deleted(&self, event: &ListDeleted) -> Result<(), AppError> {
        self.index.delete(event.list_id).await?;
        Ok(())
    }

    fn mutated(&self, mutation: Mutation) {
        self.observer.record(Signal::EntityMutated {
            entity: LIST_ENTITY,
            mutation,
        });
    }
}
