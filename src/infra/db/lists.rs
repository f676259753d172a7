use async_trait::async_trait;

use crate::{
    application::repos::{ListsRepo, OwnedList, RepoError},
    domain::entities::{ListPatch, NewList, TodoList},
};

use super::{PostgresRepositories, map_sqlx_error, patch::UpdateBuilder};

#[derive(sqlx::FromRow)]
struct ListRow {
    id: i64,
    title: String,
    description: String,
}

impl From<ListRow> for TodoList {
    fn from(row: ListRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OwnedListRow {
    user_id: i64,
    id: i64,
    title: String,
    description: String,
}

impl From<OwnedListRow> for OwnedList {
    fn from(row: OwnedListRow) -> Self {
        Self {
            user_id: row.user_id,
            list: TodoList {
                id: row.id,
                title: row.title,
                description: row.description,
            },
        }
    }
}

#[async_trait]
impl ListsRepo for PostgresRepositories {
    async fn create_for_user(&self, user_id: i64, list: &NewList) -> Result<TodoList, RepoError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        let row = sqlx::query_as::<_, ListRow>(
            r#"
            INSERT INTO lists (title, description)
            VALUES ($1, $2)
            RETURNING id, title, description
            "#,
        )
        .bind(&list.title)
        .bind(&list.description)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        sqlx::query(
            r#"
            INSERT INTO users_lists (user_id, list_id)
            VALUES ($1, $2)
            "#,
        )
        .bind(user_id)
        .bind(row.id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn find_by_id(&self, list_id: i64) -> Result<Option<TodoList>, RepoError> {
        let row = sqlx::query_as::<_, ListRow>(
            r#"
            SELECT id, title, description
            FROM lists
            WHERE id = $1
            "#,
        )
        .bind(list_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(TodoList::from))
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<TodoList>, RepoError> {
        let rows = sqlx::query_as::<_, ListRow>(
            r#"
            SELECT l.id, l.title, l.description
            FROM lists l
            INNER JOIN users_lists ul ON ul.list_id = l.id
            WHERE ul.user_id = $1
            ORDER BY l.id
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(TodoList::from).collect())
    }

    async fn find_many(&self, ids: &[i64]) -> Result<Vec<TodoList>, RepoError> {
        let rows = sqlx::query_as::<_, ListRow>(
            r#"
            SELECT id, title, description
            FROM lists
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(TodoList::from).collect())
    }

    async fn update(&self, list_id: i64, patch: &ListPatch) -> Result<bool, RepoError> {
        let mut update = UpdateBuilder::new("lists");
        update
            .set("title", patch.title.clone())
            .set("description", patch.description.clone());
        if update.is_empty() {
            return Err(RepoError::InvalidInput {
                message: "list update carries no fields".to_string(),
            });
        }

        let result = update
            .finish(list_id)
            .build()
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, list_id: i64) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"
            DELETE FROM lists
            WHERE id = $1
            "#,
        )
        .bind(list_id)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn is_owner(&self, user_id: i64, list_id: i64) -> Result<bool, RepoError> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users_lists
                WHERE user_id = $1 AND list_id = $2
            )
            "#,
        )
        .bind(user_id)
        .bind(list_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_all_owned(&self) -> Result<Vec<OwnedList>, RepoError> {
        let rows = sqlx::query_as::<_, OwnedListRow>(
            r#"
            SELECT ul.user_id, l.id, l.title, l.description
            FROM lists l
            INNER JOIN users_lists ul ON ul.list_id = l.id
            ORDER BY l.id
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(OwnedList::from).collect())
    }
}
