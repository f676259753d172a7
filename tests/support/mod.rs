#![allow(dead_code)]

use std::{
    collections::BTreeMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tasklane::{
    application::{
        items::ItemService,
        lists::ListService,
        repos::{ItemsRepo, ListsRepo, OwnedItem, OwnedList, RepoError, UsersRepo},
        stores::{ItemStore, ListStore},
    },
    cache::{CacheRouter, MemoryCacheStore},
    domain::entities::{
        ItemPatch, ListPatch, NewItem, NewList, NewUser, TodoItem, TodoList, User,
    },
    events::{EventProducer, InMemoryBroker, MessageBroker, ProducerConfig},
    observe::{self, Observer},
    search::MemoryIndex,
};

#[derive(Default)]
struct State {
    next_id: i64,
    users: BTreeMap<i64, User>,
    lists: BTreeMap<i64, (i64, TodoList)>,
    items: BTreeMap<i64, (i64, TodoItem)>,
}

impl State {
    fn allocate(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Relational fake that counts every call made against it.
#[derive(Default)]
pub struct FakeRepos {
    state: Mutex<State>,
    user_calls: AtomicUsize,
    list_calls: AtomicUsize,
    item_calls: AtomicUsize,
}

impl FakeRepos {
    pub fn user_calls(&self) -> usize {
        self.user_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn item_calls(&self) -> usize {
        self.item_calls.load(Ordering::SeqCst)
    }

    fn users_hit(&self) -> std::sync::MutexGuard<'_, State> {
        self.user_calls.fetch_add(1, Ordering::SeqCst);
        self.state.lock().expect("fake state")
    }

    fn lists_hit(&self) -> std::sync::MutexGuard<'_, State> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.state.lock().expect("fake state")
    }

    fn items_hit(&self) -> std::sync::MutexGuard<'_, State> {
        self.item_calls.fetch_add(1, Ordering::SeqCst);
        self.state.lock().expect("fake state")
    }
}

#[async_trait]
impl UsersRepo for FakeRepos {
    async fn create(&self, user: &NewUser) -> Result<User, RepoError> {
        let mut state = self.users_hit();
        if state.users.values().any(|u| u.username == user.username) {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".to_string(),
            });
        }
        let id = state.allocate();
        let created = User {
            id,
            name: user.name.clone(),
            username: user.username.clone(),
        };
        state.users.insert(id, created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, user_id: i64) -> Result<Option<User>, RepoError> {
        let state = self.users_hit();
        Ok(state.users.get(&user_id).cloned())
    }

    async fn delete(&self, user_id: i64) -> Result<bool, RepoError> {
        let mut state = self.users_hit();
        let removed = state.users.remove(&user_id).is_some();
        state.lists.retain(|_, (owner, _)| *owner != user_id);
        Ok(removed)
    }
}

#[async_trait]
impl ListsRepo for FakeRepos {
    async fn create_for_user(&self, user_id: i64, list: &NewList) -> Result<TodoList, RepoError> {
        let mut state = self.lists_hit();
        let id = state.allocate();
        let created = TodoList {
            id,
            title: list.title.clone(),
            description: list.description.clone(),
        };
        state.lists.insert(id, (user_id, created.clone()));
        Ok(created)
    }

    async fn find_by_id(&self, list_id: i64) -> Result<Option<TodoList>, RepoError> {
        let state = self.lists_hit();
        Ok(state.lists.get(&list_id).map(|(_, list)| list.clone()))
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<TodoList>, RepoError> {
        let state = self.lists_hit();
        Ok(state
            .lists
            .values()
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, list)| list.clone())
            .collect())
    }

    async fn find_many(&self, ids: &[i64]) -> Result<Vec<TodoList>, RepoError> {
        let state = self.lists_hit();
        // Reverse order so callers cannot lean on input order.
        Ok(state
            .lists
            .values()
            .rev()
            .filter(|(_, list)| ids.contains(&list.id))
            .map(|(_, list)| list.clone())
            .collect())
    }

    async fn update(&self, list_id: i64, patch: &ListPatch) -> Result<bool, RepoError> {
        let mut state = self.lists_hit();
        match state.lists.get_mut(&list_id) {
            Some((_, list)) => {
                patch.apply_to(list);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, list_id: i64) -> Result<bool, RepoError> {
        let mut state = self.lists_hit();
        Ok(state.lists.remove(&list_id).is_some())
    }

    async fn is_owner(&self, user_id: i64, list_id: i64) -> Result<bool, RepoError> {
        let state = self.lists_hit();
        Ok(matches!(state.lists.get(&list_id), Some((owner, _)) if *owner == user_id))
    }

    async fn list_all_owned(&self) -> Result<Vec<OwnedList>, RepoError> {
        let state = self.lists_hit();
        Ok(state
            .lists
            .values()
            .map(|(user_id, list)| OwnedList {
                user_id: *user_id,
                list: list.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl ItemsRepo for FakeRepos {
    async fn create_in_list(&self, list_id: i64, item: &NewItem) -> Result<TodoItem, RepoError> {
        let mut state = self.items_hit();
        if !state.lists.contains_key(&list_id) {
            return Err(RepoError::InvalidInput {
                message: format!("list {list_id} does not exist"),
            });
        }
        let id = state.allocate();
        let created = TodoItem {
            id,
            title: item.title.clone(),
            description: item.description.clone(),
            done: false,
        };
        state.items.insert(id, (list_id, created.clone()));
        Ok(created)
    }

    async fn find_by_id(&self, item_id: i64) -> Result<Option<TodoItem>, RepoError> {
        let state = self.items_hit();
        Ok(state.items.get(&item_id).map(|(_, item)| item.clone()))
    }

    async fn list_for_list(&self, list_id: i64) -> Result<Vec<TodoItem>, RepoError> {
        let state = self.items_hit();
        Ok(state
            .items
            .values()
            .filter(|(list, _)| *list == list_id)
            .map(|(_, item)| item.clone())
            .collect())
    }

    async fn find_many(&self, ids: &[i64]) -> Result<Vec<TodoItem>, RepoError> {
        let state = self.items_hit();
        Ok(state
            .items
            .values()
            .rev()
            .filter(|(_, item)| ids.contains(&item.id))
            .map(|(_, item)| item.clone())
            .collect())
    }

    async fn update(&self, item_id: i64, patch: &ItemPatch) -> Result<bool, RepoError> {
        let mut state = self.items_hit();
        match state.items.get_mut(&item_id) {
            Some((_, item)) => {
                patch.apply_to(item);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, item_id: i64) -> Result<bool, RepoError> {
        let mut state = self.items_hit();
        Ok(state.items.remove(&item_id).is_some())
    }

    async fn is_owner(&self, user_id: i64, list_id: i64, item_id: i64) -> Result<bool, RepoError> {
        let state = self.items_hit();
        let item_in_list = matches!(state.items.get(&item_id), Some((list, _)) if *list == list_id);
        let list_owned = matches!(state.lists.get(&list_id), Some((owner, _)) if *owner == user_id);
        Ok(item_in_list && list_owned)
    }

    async fn list_all_owned(&self) -> Result<Vec<OwnedItem>, RepoError> {
        let state = self.items_hit();
        Ok(state
            .items
            .values()
            .filter_map(|(list_id, item)| {
                state.lists.get(list_id).map(|(user_id, _)| OwnedItem {
                    user_id: *user_id,
                    list_id: *list_id,
                    item: item.clone(),
                })
            })
            .collect())
    }
}

/// Everything a test needs to drive the services over in-process backends.
pub struct Harness {
    pub repos: Arc<FakeRepos>,
    pub cache: CacheRouter,
    pub broker: Arc<dyn MessageBroker>,
    pub producer: Arc<EventProducer>,
    pub lists_index: Arc<MemoryIndex>,
    pub items_index: Arc<MemoryIndex>,
    pub lists: ListService,
    pub items: ItemService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_observer(observe::noop())
    }

    pub fn with_observer(observer: Arc<dyn Observer>) -> Self {
        let repos = Arc::new(FakeRepos::default());
        let cache = CacheRouter::single(Arc::new(MemoryCacheStore::new()), observer.clone());
        let broker: Arc<dyn MessageBroker> = Arc::new(InMemoryBroker::new(2));
        let producer = Arc::new(EventProducer::start(
            broker.clone(),
            ProducerConfig::default(),
            observer.clone(),
        ));
        let lists_index = Arc::new(MemoryIndex::new("lists"));
        let items_index = Arc::new(MemoryIndex::new("items"));

        let list_store = ListStore::new(repos.clone(), cache.clone());
        let item_store = ItemStore::new(repos.clone(), cache.clone());
        let lists = ListService::new(
            list_store.clone(),
            lists_index.clone(),
            producer.clone(),
            observer.clone(),
        );
        let items = ItemService::new(
            item_store,
            list_store,
            items_index.clone(),
            producer.clone(),
            observer,
        );

        Self {
            repos,
            cache,
            broker,
            producer,
            lists_index,
            items_index,
            lists,
            items,
        }
    }
}

/// Polls `check` until it holds or two seconds pass.
pub async fn eventually<F>(mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
