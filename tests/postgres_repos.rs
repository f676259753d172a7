use sqlx::PgPool;
use tasklane::{
    application::repos::{ItemsRepo, ListsRepo, RepoError, UsersRepo},
    domain::entities::{ItemPatch, ListPatch, NewItem, NewList, NewUser},
    infra::db::PostgresRepositories,
};

fn new_user(username: &str) -> NewUser {
    NewUser {
        name: "Ada".to_string(),
        username: username.to_string(),
        password_hash: "argon2id$stub".to_string(),
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn lists_round_through_ownership_edges(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let owner = UsersRepo::create(&repos, &new_user("ada"))
        .await
        .expect("create user");
    let other = UsersRepo::create(&repos, &new_user("grace"))
        .await
        .expect("create user");

    let list = repos
        .create_for_user(owner.id, &NewList::new("Groceries", "weekly"))
        .await
        .expect("create list");

    assert!(ListsRepo::is_owner(&repos, owner.id, list.id).await.expect("owner"));
    assert!(!ListsRepo::is_owner(&repos, other.id, list.id).await.expect("owner"));
    assert_eq!(
        repos.list_for_user(owner.id).await.expect("lists"),
        vec![list.clone()]
    );

    let patch = ListPatch {
        title: Some("Hardware".to_string()),
        description: None,
    };
    assert!(ListsRepo::update(&repos, list.id, &patch).await.expect("update"));
    let updated = ListsRepo::find_by_id(&repos, list.id)
        .await
        .expect("find")
        .expect("list exists");
    assert_eq!(updated.title, "Hardware");
    assert_eq!(updated.description, "weekly");

    assert!(ListsRepo::delete(&repos, list.id).await.expect("delete"));
    assert!(!ListsRepo::delete(&repos, list.id).await.expect("delete"));
    assert!(ListsRepo::find_by_id(&repos, list.id).await.expect("find").is_none());
    assert!(!ListsRepo::is_owner(&repos, owner.id, list.id).await.expect("owner"));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn item_ownership_requires_matching_list(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let owner = UsersRepo::create(&repos, &new_user("ada"))
        .await
        .expect("create user");
    let groceries = repos
        .create_for_user(owner.id, &NewList::new("Groceries", ""))
        .await
        .expect("create list");
    let chores = repos
        .create_for_user(owner.id, &NewList::new("Chores", ""))
        .await
        .expect("create list");

    let milk = repos
        .create_in_list(groceries.id, &NewItem::new("Milk", "2l"))
        .await
        .expect("create item");
    let bread = repos
        .create_in_list(groceries.id, &NewItem::new("Bread", ""))
        .await
        .expect("create item");

    assert!(
        ItemsRepo::is_owner(&repos, owner.id, groceries.id, milk.id)
            .await
            .expect("owner")
    );
    assert!(
        !ItemsRepo::is_owner(&repos, owner.id, chores.id, milk.id)
            .await
            .expect("owner")
    );

    let patch = ItemPatch {
        done: Some(true),
        ..ItemPatch::default()
    };
    assert!(ItemsRepo::update(&repos, milk.id, &patch).await.expect("update"));

    let mut ids: Vec<i64> = ItemsRepo::find_many(&repos, &[milk.id, bread.id, 9_999])
        .await
        .expect("find many")
        .into_iter()
        .map(|item| item.id)
        .collect();
    ids.sort_unstable();
    let mut expected = vec![milk.id, bread.id];
    expected.sort_unstable();
    assert_eq!(ids, expected);

    let owned = ItemsRepo::list_all_owned(&repos).await.expect("owned");
    assert_eq!(owned.len(), 2);
    assert!(owned.iter().all(|entry| entry.user_id == owner.id));
    assert!(
        owned
            .iter()
            .any(|entry| entry.item.id == milk.id && entry.item.done)
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn constraint_violations_map_to_repo_errors(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    UsersRepo::create(&repos, &new_user("ada"))
        .await
        .expect("create user");

    let err = UsersRepo::create(&repos, &new_user("ada"))
        .await
        .expect_err("duplicate username");
    assert!(matches!(err, RepoError::Duplicate { .. }));

    let err = repos
        .create_for_user(424_242, &NewList::new("Orphan", ""))
        .await
        .expect_err("unknown user");
    assert!(matches!(err, RepoError::InvalidInput { .. }));
}
