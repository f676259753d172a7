use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::{
    application::{
        error::AppError,
        stores::{ItemStore, ListStore},
    },
    domain::{
        entities::{ITEM_ENTITY, ItemPatch, NewItem, TodoItem},
        events::{ItemCreated, ItemDeleted, ItemUpdated},
    },
    events::EventProducer,
    observe::{Mutation, Observer, Signal},
    search::{DocumentIndex, ItemFilter, SearchDocument, SearchQuery},
};

/// Use cases for items inside a list. Calls that name an item check the
/// whole ownership chain in one query so the right collection key is dropped.
#[derive(Clone)]
pub struct ItemService {
    items: ItemStore,
    lists: ListStore,
    index: Arc<dyn DocumentIndex>,
    producer: Arc<EventProducer>,
    observer: Arc<dyn Observer>,
}

impl ItemService {
    pub fn new(
        items: ItemStore,
        lists: ListStore,
        index: Arc<dyn DocumentIndex>,
        producer: Arc<EventProducer>,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self {
            items,
            lists,
            index,
            producer,
            observer,
        }
    }

    pub async fn create(
        &self,
        user_id: i64,
        list_id: i64,
        input: NewItem,
    ) -> Result<TodoItem, AppError> {
        input.validate()?;
        self.lists.ensure_owner(user_id, list_id).await?;
        let item = self.items.create(list_id, &input).await?;
        self.mutated(Mutation::Created);

        self.producer.publish(&ItemCreated {
            user_id,
            list_id,
            item: item.clone(),
        });
        Ok(item)
    }

    pub async fn get_all(&self, user_id: i64, list_id: i64) -> Result<Vec<TodoItem>, AppError> {
        self.lists.ensure_owner(user_id, list_id).await?;
        Ok(self.items.get_all(list_id).await?)
    }

    pub async fn get_one(
        &self,
        user_id: i64,
        list_id: i64,
        item_id: i64,
    ) -> Result<TodoItem, AppError> {
        self.items.ensure_owner(user_id, list_id, item_id).await?;
        Ok(self.items.get_by_id(item_id).await?)
    }

    pub async fn update(
        &self,
        user_id: i64,
        list_id: i64,
        item_id: i64,
        patch: ItemPatch,
    ) -> Result<(), AppError> {
        patch.validate()?;
        self.items.ensure_owner(user_id, list_id, item_id).await?;
        self.items.update(list_id, item_id, &patch).await?;
        self.mutated(Mutation::Updated);

        self.producer.publish(&ItemUpdated {
            user_id,
            list_id,
            item_id,
        });
        Ok(())
    }

    pub async fn delete(&self, user_id: i64, list_id: i64, item_id: i64) -> Result<(), AppError> {
        self.items.ensure_owner(user_id, list_id, item_id).await?;
        self.items.delete(Some(list_id), item_id).await?;
        self.mutated(Mutation::Deleted);

        self.producer.publish(&ItemDeleted { item_id });
        Ok(())
    }

    pub async fn delete_by_admin(&self, item_id: i64) -> Result<(), AppError> {
        self.items.delete(None, item_id).await?;
        self.mutated(Mutation::Deleted);
        info!(item_id, "Item deleted by admin");

        self.producer.publish(&ItemDeleted { item_id });
        Ok(())
    }

    #[instrument(skip(self, text))]
    pub async fn search(
        &self,
        user_id: i64,
        filter: ItemFilter,
        text: &str,
    ) -> Result<Vec<TodoItem>, AppError> {
        let query = SearchQuery::new(user_id, text).with_filter(filter);
        let ids = self.index.search_ids(&query).await?;
        self.observer.record(Signal::SearchQueried {
            entity: ITEM_ENTITY,
            hits: ids.len(),
        });
        Ok(self.items.get_many_by_ids(&ids).await?)
    }

    pub async fn handle_created(&self, event: &ItemCreated) -> Result<(), AppError> {
        self.index
            .upsert(&SearchDocument::for_item(
                event.user_id,
                event.list_id,
                &event.item,
            ))
            .await?;
        Ok(())
    }

    pub async fn handle_updated(&self, event: &ItemUpdated) -> Result<(), AppError> {
        let item = match self.items.get_by_id(event.item_id).await {
            Ok(item) => item,
            Err(err) => {
                if err.is_not_found() {
                    warn!(item_id = event.item_id, "Updated item is gone; not indexing");
                }
                return Err(err.into());
            }
        };
        self.index
            .upsert(&SearchDocument::for_item(event.user_id, event.list_id, &item))
            .await?;
        Ok(())
    }

    pub async fn handle_deleted(&self, event: &ItemDeleted) -> Result<(), AppError> {
        self.index.delete(event.item_id).await?;
        Ok(())
    }

    fn mutated(&self, mutation: Mutation) {
        self.observer.record(Signal::EntityMutated {
            entity: ITEM_ENTITY,
            mutation,
        });
    }
}
