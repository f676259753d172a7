mod support;

use tasklane::{
    application::{
        error::AppError,
        stores::{ListStore, UserStore},
        users::UserService,
    },
    cache::{LIST_BY_ID, LIST_ITEMS, USER_BY_ID, USER_LISTS},
    domain::{
        entities::{ItemPatch, ListPatch, NewItem, NewList, NewUser},
        error::DomainError,
    },
    observe,
};

use support::Harness;

fn retitle(title: &str) -> ListPatch {
    ListPatch {
        title: Some(title.to_string()),
        description: None,
    }
}

#[tokio::test]
async fn collection_reads_hit_the_store_once() {
    let h = Harness::new();
    h.lists
        .create(1, NewList::new("Groceries", "weekly"))
        .await
        .expect("create list");
    let baseline = h.repos.list_calls();

    let first = h.lists.get_all(1).await.expect("first read");
    let second = h.lists.get_all(1).await.expect("second read");

    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
    assert_eq!(h.repos.list_calls() - baseline, 1);
}

#[tokio::test]
async fn update_invalidates_and_next_read_sees_new_state() {
    let h = Harness::new();
    let list = h
        .lists
        .create(1, NewList::new("Groceries", ""))
        .await
        .expect("create list");
    h.lists.get_all(1).await.expect("warm collection");
    assert!(h.cache.exists(&USER_LISTS.key(1)).await.expect("exists"));

    h.lists
        .update(1, list.id, retitle("Hardware"))
        .await
        .expect("update list");

    assert!(!h.cache.exists(&LIST_BY_ID.key(list.id)).await.expect("exists"));
    assert!(!h.cache.exists(&USER_LISTS.key(1)).await.expect("exists"));

    let fetched = h.lists.get_one(1, list.id).await.expect("read back");
    assert_eq!(fetched.title, "Hardware");
    assert!(h.cache.exists(&LIST_BY_ID.key(list.id)).await.expect("exists"));
}

#[tokio::test]
async fn deleted_list_is_not_found_and_never_cached() {
    let h = Harness::new();
    let store = ListStore::new(h.repos.clone(), h.cache.clone());
    let list = h
        .lists
        .create(1, NewList::new("Groceries", ""))
        .await
        .expect("create list");

    h.lists.delete(1, list.id).await.expect("delete list");

    let before = h.repos.list_calls();
    for _ in 0..2 {
        let err = store.get_by_id(list.id).await.expect_err("list is gone");
        assert!(err.is_not_found());
    }
    assert_eq!(h.repos.list_calls() - before, 2);
    assert!(!h.cache.exists(&LIST_BY_ID.key(list.id)).await.expect("exists"));

    let err = h.lists.get_one(1, list.id).await.expect_err("ownership gone");
    assert!(err.is_not_owner());
}

#[tokio::test]
async fn empty_update_never_reaches_the_store() {
    let h = Harness::new();
    let list = h
        .lists
        .create(1, NewList::new("Groceries", ""))
        .await
        .expect("create list");
    let before = h.repos.list_calls();

    let err = h
        .lists
        .update(1, list.id, ListPatch::default())
        .await
        .expect_err("empty patch");

    assert!(matches!(
        err,
        AppError::Domain(DomainError::EmptyUpdate { entity: "list" })
    ));
    assert_eq!(h.repos.list_calls(), before);
}

#[tokio::test]
async fn failed_update_leaves_cache_untouched() {
    let h = Harness::new();
    let store = ListStore::new(h.repos.clone(), h.cache.clone());
    h.lists
        .create(1, NewList::new("Groceries", ""))
        .await
        .expect("create list");
    h.lists.get_all(1).await.expect("warm collection");

    let err = store
        .update(1, 999, &retitle("Ghost"))
        .await
        .expect_err("missing list");

    assert!(err.is_not_found());
    assert!(h.cache.exists(&USER_LISTS.key(1)).await.expect("exists"));
}

#[tokio::test]
async fn deleting_a_missing_list_leaves_cache_untouched() {
    let h = Harness::new();
    let store = ListStore::new(h.repos.clone(), h.cache.clone());
    h.lists
        .create(1, NewList::new("Groceries", ""))
        .await
        .expect("create list");
    h.lists.get_all(1).await.expect("warm collection");

    let err = store.delete(Some(1), 999).await.expect_err("missing list");

    assert!(err.is_not_found());
    assert!(h.cache.exists(&USER_LISTS.key(1)).await.expect("exists"));
}

#[tokio::test]
async fn admin_delete_drops_only_the_entity_key() {
    let h = Harness::new();
    let list = h
        .lists
        .create(1, NewList::new("Groceries", ""))
        .await
        .expect("create list");
    h.lists.get_all(1).await.expect("warm collection");

    h.lists.delete_by_admin(list.id).await.expect("admin delete");

    assert!(!h.cache.exists(&LIST_BY_ID.key(list.id)).await.expect("exists"));
    assert!(h.cache.exists(&USER_LISTS.key(1)).await.expect("exists"));
}

#[tokio::test]
async fn other_users_cannot_touch_a_list() {
    let h = Harness::new();
    let list = h
        .lists
        .create(1, NewList::new("Groceries", ""))
        .await
        .expect("create list");

    let err = h.lists.get_one(2, list.id).await.expect_err("not owner");
    assert!(err.is_not_owner());

    let err = h
        .lists
        .update(2, list.id, retitle("Mine now"))
        .await
        .expect_err("not owner");
    assert!(err.is_not_owner());

    let err = h
        .items
        .create(2, list.id, NewItem::new("Milk", ""))
        .await
        .expect_err("not owner");
    assert!(err.is_not_owner());

    let unchanged = h.lists.get_one(1, list.id).await.expect("owner read");
    assert_eq!(unchanged.title, "Groceries");
}

#[tokio::test]
async fn item_mutations_invalidate_the_list_collection() {
    let h = Harness::new();
    let list = h
        .lists
        .create(1, NewList::new("Groceries", ""))
        .await
        .expect("create list");
    let item = h
        .items
        .create(1, list.id, NewItem::new("Milk", "2l"))
        .await
        .expect("create item");

    let cached = h.items.get_all(1, list.id).await.expect("warm items");
    assert_eq!(cached.len(), 1);
    assert!(h.cache.exists(&LIST_ITEMS.key(list.id)).await.expect("exists"));

    h.items
        .update(
            1,
            list.id,
            item.id,
            ItemPatch {
                done: Some(true),
                ..ItemPatch::default()
            },
        )
        .await
        .expect("update item");
    assert!(!h.cache.exists(&LIST_ITEMS.key(list.id)).await.expect("exists"));

    let items = h.items.get_all(1, list.id).await.expect("read items");
    assert!(items[0].done);

    let err = h
        .items
        .get_one(1, list.id + 100, item.id)
        .await
        .expect_err("wrong list");
    assert!(err.is_not_owner());
}

#[tokio::test]
async fn user_reads_are_cached_until_delete() {
    let h = Harness::new();
    let users = UserService::new(
        UserStore::new(h.repos.clone(), h.cache.clone()),
        observe::noop(),
    );

    let err = users
        .create(NewUser {
            name: "Ada".into(),
            username: "  ".into(),
            password_hash: "hash".into(),
        })
        .await
        .expect_err("blank username");
    assert!(matches!(err, AppError::Domain(DomainError::Validation { .. })));
    assert_eq!(h.repos.user_calls(), 0);

    let ada = users
        .create(NewUser {
            name: "Ada".into(),
            username: "ada".into(),
            password_hash: "hash".into(),
        })
        .await
        .expect("create user");
    assert_eq!(users.get(ada.id).await.expect("cached read"), ada);
    assert_eq!(h.repos.user_calls(), 1);

    h.lists
        .create(ada.id, NewList::new("Groceries", ""))
        .await
        .expect("create list");
    h.lists.get_all(ada.id).await.expect("warm collection");

    users.delete(ada.id).await.expect("delete user");
    assert!(!h.cache.exists(&USER_BY_ID.key(ada.id)).await.expect("exists"));
    assert!(!h.cache.exists(&USER_LISTS.key(ada.id)).await.expect("exists"));
    assert!(users.get(ada.id).await.expect_err("gone").is_not_found());
}

#[tokio::test]
async fn by_id_read_after_update_queries_once() {
    let h = Harness::new();
    let store = ListStore::new(h.repos.clone(), h.cache.clone());
    let list = store
        .create(1, &NewList::new("Groceries", ""))
        .await
        .expect("create list");

    let before = h.repos.list_calls();
    assert_eq!(store.get_by_id(list.id).await.expect("read"), list);
    assert_eq!(h.repos.list_calls(), before);

    store
        .update(1, list.id, &retitle("Hardware"))
        .await
        .expect("update list");
    let before = h.repos.list_calls();

    let first = store.get_by_id(list.id).await.expect("first read");
    let second = store.get_by_id(list.id).await.expect("second read");

    assert_eq!(first.title, "Hardware");
    assert_eq!(first, second);
    assert_eq!(h.repos.list_calls() - before, 1);
}
