use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use std::marker::PhantomData;

use crate::error::ConciergeResult;
use crate::ports::{Entity, Repository};

/// Repository storing entities as JSONB documents in the `documents` table
///
/// Every entity type shares the table, partitioned by [`Entity::COLLECTION`].
pub struct PgRepository<T> {
    pool: PgPool,
    _entity: PhantomData<fn() -> T>,
}

impl<T> PgRepository<T> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }
}

impl<T> Clone for PgRepository<T> {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for PgRepository<T> {
    async fn get(&self, id: &T::Id) -> ConciergeResult<Option<T>> {
        let body: Option<Value> =
            sqlx::query_scalar("SELECT body FROM documents WHERE collection = $1 AND id = $2")
                .bind(T::COLLECTION)
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        Ok(body.map(serde_json::from_value).transpose()?)
    }

    async fn put(&self, entity: T) -> ConciergeResult<()> {
        let body = serde_json::to_value(&entity)?;

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, body)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id)
            DO UPDATE SET body = EXCLUDED.body, updated_at = NOW()
            "#,
        )
        .bind(T::COLLECTION)
        .bind(entity.id().to_string())
        .bind(body)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self) -> ConciergeResult<Vec<T>> {
        let bodies: Vec<Value> = sqlx::query_scalar(
            "SELECT body FROM documents WHERE collection = $1 ORDER BY created_at",
        )
        .bind(T::COLLECTION)
        .fetch_all(&self.pool)
        .await?;

        bodies
            .into_iter()
            .map(|body| serde_json::from_value(body).map_err(Into::into))
            .collect()
    }

    async fn list_by_field(&self, field: &str, value: &str) -> ConciergeResult<Vec<T>> {
        let bodies: Vec<Value> = sqlx::query_scalar(
            r#"
            SELECT body FROM documents
            WHERE collection = $1 AND body ->> $2 = $3
            ORDER BY created_at
            "#,
        )
        .bind(T::COLLECTION)
        .bind(field)
        .bind(value)
        .fetch_all(&self.pool)
        .await?;

        bodies
            .into_iter()
            .map(|body| serde_json::from_value(body).map_err(Into::into))
            .collect()
    }

    async fn delete(&self, id: &T::Id) -> ConciergeResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(T::COLLECTION)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> ConciergeResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{KycCase, KycStatus};
    use crate::types::{BuyerId, KycCaseId};
    use chrono::Utc;

    fn case() -> KycCase {
        KycCase {
            id: KycCaseId::new(),
            buyer_id: BuyerId::new(),
            documents: vec![],
            status: KycStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_pg_repository_roundtrip(pool: PgPool) {
        let repo = PgRepository::<KycCase>::new(pool);
        let mut record = case();

        repo.put(record.clone()).await.unwrap();
        let loaded = repo.get(&record.id).await.unwrap().unwrap();
        assert_eq!(loaded.buyer_id, record.buyer_id);

        record.status = KycStatus::Rejected;
        repo.put(record.clone()).await.unwrap();
        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, KycStatus::Rejected);

        let rejected = repo.list_by_field("status", "rejected").await.unwrap();
        assert_eq!(rejected.len(), 1);
        assert!(repo.list_by_field("status", "pending").await.unwrap().is_empty());

        assert!(repo.delete(&record.id).await.unwrap());
        assert!(repo.get(&record.id).await.unwrap().is_none());
        repo.ping().await.unwrap();
    }
}
