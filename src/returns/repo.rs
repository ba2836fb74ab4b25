use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::returns::repo_types::{NewReturn, ReturnRecord, ReturnRow};

#[async_trait]
pub trait ReturnRepo: Send + Sync {
    /// Persists a record, drawing `return_id` from the store's atomic sequence.
    async fn insert(&self, new: NewReturn<'_>) -> anyhow::Result<ReturnRecord>;
    /// Newest first.
    async fn list_by_owner(&self, user_id: Uuid) -> anyhow::Result<Vec<ReturnRecord>>;
    async fn find_by_return_id(&self, return_id: i64) -> anyhow::Result<Option<ReturnRecord>>;
}

#[async_trait]
impl ReturnRepo for PgPool {
    async fn insert(&self, new: NewReturn<'_>) -> anyhow::Result<ReturnRecord> {
        // return_id is BIGSERIAL: nextval() is atomic across concurrent inserts
        let row = sqlx::query_as::<_, ReturnRow>(
            r#"
            INSERT INTO returns (id, user_id, description, image_kind, image)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, return_id, user_id, description, image_kind, image, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(new.description)
        .bind(new.image.kind())
        .bind(new.image.as_str())
        .fetch_one(self)
        .await
        .context("insert return")?;
        ReturnRecord::try_from(row)
    }

    async fn list_by_owner(&self, user_id: Uuid) -> anyhow::Result<Vec<ReturnRecord>> {
        let rows = sqlx::query_as::<_, ReturnRow>(
            r#"
            SELECT id, return_id, user_id, description, image_kind, image, created_at
            FROM returns
            WHERE user_id = $1
            ORDER BY created_at DESC, return_id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self)
        .await
        .context("list returns by owner")?;
        rows.into_iter().map(ReturnRecord::try_from).collect()
    }

    async fn find_by_return_id(&self, return_id: i64) -> anyhow::Result<Option<ReturnRecord>> {
        let row = sqlx::query_as::<_, ReturnRow>(
            r#"
            SELECT id, return_id, user_id, description, image_kind, image, created_at
            FROM returns
            WHERE return_id = $1
            "#,
        )
        .bind(return_id)
        .fetch_optional(self)
        .await
        .context("find return by return_id")?;
        row.map(ReturnRecord::try_from).transpose()
    }
}
