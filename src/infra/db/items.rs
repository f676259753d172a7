use async_trait::async_trait;

use crate::{
    application::repos::{ItemsRepo, OwnedItem, RepoError},
    domain::entities::{ItemPatch, NewItem, TodoItem},
};

use super::{PostgresRepositories, map_sqlx_error, patch::UpdateBuilder};

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: i64,
    title: String,
    description: String,
    done: bool,
}

impl From<ItemRow> for TodoItem {
    fn from(row: ItemRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            done: row.done,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OwnedItemRow {
    user_id: i64,
    list_id: i64,
    #[sqlx(flatten)]
    item: ItemRow,
}

#[async_trait]
impl ItemsRepo for PostgresRepositories {
    async fn create_in_list(&self, list_id: i64, item: &NewItem) -> Result<TodoItem, RepoError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        let row = sqlx::query_as::<_, ItemRow>(
            r#"
            INSERT INTO items (title, description)
            VALUES ($1, $2)
            RETURNING id, title, description, done
            "#,
        )
        .bind(&item.title)
        .bind(&item.description)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        sqlx::query(
            r#"
            INSERT INTO lists_items (list_id, item_id)
            VALUES ($1, $2)
            "#,
        )
        .bind(list_id)
        .bind(row.id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn find_by_id(&self, item_id: i64) -> Result<Option<TodoItem>, RepoError> {
        let row = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT id, title, description, done
            FROM items
            WHERE id = $1
            "#,
        )
        .bind(item_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(TodoItem::from))
    }

    async fn list_for_list(&self, list_id: i64) -> Result<Vec<TodoItem>, RepoError> {
        let rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT i.id, i.title, i.description, i.done
            FROM items i
            INNER JOIN lists_items li ON li.item_id = i.id
            WHERE li.list_id = $1
            ORDER BY i.id
            "#,
        )
        .bind(list_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(TodoItem::from).collect())
    }

    async fn find_many(&self, ids: &[i64]) -> Result<Vec<TodoItem>, RepoError> {
        let rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT id, title, description, done
            FROM items
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(TodoItem::from).collect())
    }

    async fn update(&self, item_id: i64, patch: &ItemPatch) -> Result<bool, RepoError> {
        let mut update = UpdateBuilder::new("items");
        update
            .set("title", patch.title.clone())
            .set("description", patch.description.clone())
            .set("done", patch.done);
        if update.is_empty() {
            return Err(RepoError::InvalidInput {
                message: "item update carries no fields".to_string(),
            });
        }

        let result = update
            .finish(item_id)
            .build()
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, item_id: i64) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"
            DELETE FROM items
            WHERE id = $1
            "#,
        )
        .bind(item_id)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn is_owner(&self, user_id: i64, list_id: i64, item_id: i64) -> Result<bool, RepoError> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM users_lists ul
                INNER JOIN lists_items li ON li.list_id = ul.list_id
                WHERE ul.user_id = $1 AND ul.list_id = $2 AND li.item_id = $3
            )
            "#,
        )
        .bind(user_id)
        .bind(list_id)
        .bind(item_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_all_owned(&self) -> Result<Vec<OwnedItem>, RepoError> {
        let rows = sqlx::query_as::<_, OwnedItemRow>(
            r#"
            SELECT ul.user_id, li.list_id, i.id, i.title, i.description, i.done
            FROM items i
            INNER JOIN lists_items li ON li.item_id = i.id
            INNER JOIN users_lists ul ON ul.list_id = li.list_id
            ORDER BY i.id
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| OwnedItem {
                user_id: row.user_id,
                list_id: row.list_id,
                item: row.item.into(),
            })
            .collect())
    }
}
