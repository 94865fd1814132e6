use anyhow::Context;
use axum::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{NewTodo, Todo, TodoPatch, TodoRow};

/// Todo storage. Every operation is scoped by owner: a row owned by someone
/// else behaves exactly like a missing row.
#[async_trait]
pub trait TodoRepo: Send + Sync {
    /// Most recent first.
    async fn list_by_owner(&self, owner: Uuid) -> anyhow::Result<Vec<Todo>>;
    async fn create(&self, owner: Uuid, todo: NewTodo) -> anyhow::Result<Todo>;
    async fn update(&self, owner: Uuid, id: i64, patch: TodoPatch) -> anyhow::Result<Option<Todo>>;
    /// Returns whether a row was removed.
    async fn delete(&self, owner: Uuid, id: i64) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgTodos {
    db: PgPool,
}

impl PgTodos {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TodoRepo for PgTodos {
    async fn list_by_owner(&self, owner: Uuid) -> anyhow::Result<Vec<Todo>> {
        let rows = sqlx::query_as::<_, TodoRow>(
            r#"
            SELECT id, user_id, title, description, status, created_at
            FROM todos
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(owner)
        .fetch_all(&self.db)
        .await
        .context("list todos")?;
        rows.into_iter().map(Todo::try_from).collect()
    }

    async fn create(&self, owner: Uuid, todo: NewTodo) -> anyhow::Result<Todo> {
        let row = sqlx::query_as::<_, TodoRow>(
            r#"
            INSERT INTO todos (user_id, title, description, status)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, title, description, status, created_at
            "#,
        )
        .bind(owner)
        .bind(&todo.title)
        .bind(&todo.description)
        .bind(todo.status.as_str())
        .fetch_one(&self.db)
        .await
        .context("insert todo")?;
        Todo::try_from(row)
    }

    async fn update(&self, owner: Uuid, id: i64, patch: TodoPatch) -> anyhow::Result<Option<Todo>> {
        let row = sqlx::query_as::<_, TodoRow>(
            r#"
            UPDATE todos
               SET title       = COALESCE($3, title),
                   description = COALESCE($4, description),
                   status      = COALESCE($5, status),
                   updated_at  = now()
             WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, description, status, created_at
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(patch.title)
        .bind(patch.description)
        .bind(patch.status.map(|s| s.as_str()))
        .fetch_optional(&self.db)
        .await
        .context("update todo")?;
        row.map(Todo::try_from).transpose()
    }

    async fn delete(&self, owner: Uuid, id: i64) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM todos WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.db)
            .await
            .context("delete todo")?;
        Ok(res.rows_affected() > 0)
    }
}
