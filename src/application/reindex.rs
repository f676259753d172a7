//! Rebuilds both search indices from the relational store.
//!
//! Events carry no durability guarantee: a crash between commit and publish
//! leaves the index behind the store. Running a reindex is the way back.

use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    application::{
        error::AppError,
        stores::{ItemStore, ListStore},
    },
    search::{DocumentIndex, SearchDocument},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReindexReport {
    pub lists: usize,
    pub items: usize,
    pub failures: usize,
}

pub struct Reindexer {
    lists: ListStore,
    items: ItemStore,
    lists_index: Arc<dyn DocumentIndex>,
    items_index: Arc<dyn DocumentIndex>,
}

impl Reindexer {
    pub fn new(
        lists: ListStore,
        items: ItemStore,
        lists_index: Arc<dyn DocumentIndex>,
        items_index: Arc<dyn DocumentIndex>,
    ) -> Self {
        Self {
            lists,
            items,
            lists_index,
            items_index,
        }
    }

    /// Upserts every list and item. A failed document is logged and counted;
    /// the run keeps going. Store read failures abort the run.
    pub async fn run(&self) -> Result<ReindexReport, AppError> {
        let mut report = ReindexReport::default();

        for owned in self.lists.all_owned().await? {
            let document = SearchDocument::for_list(owned.user_id, &owned.list);
            if self.upsert(self.lists_index.as_ref(), &document).await {
                report.lists += 1;
            } else {
                report.failures += 1;
            }
        }

        for owned in self.items.all_owned().await? {
            let document = SearchDocument::for_item(owned.user_id, owned.list_id, &owned.item);
            if self.upsert(self.items_index.as_ref(), &document).await {
                report.items += 1;
            } else {
                report.failures += 1;
            }
        }

        info!(
            lists = report.lists,
            items = report.items,
            failures = report.failures,
            "Reindex finished"
        );
        Ok(report)
    }

    async fn upsert(&self, index: &dyn DocumentIndex, document: &SearchDocument) -> bool {
        match index.upsert(document).await {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    index = index.name(),
                    document_id = document.id,
                    error = %err,
                    "Failed to index document"
                );
                false
            }
        }
    }
}
