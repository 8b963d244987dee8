use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

/// 机读文档清单中的一项
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DocumentSummary {
    pub document_id: String,
    pub title: String,
    pub category: String,
    pub format: String,
    pub size_bytes: i64,
    pub updated_at: DateTime<Utc>,
}

impl DocumentSummary {
    /// 列出已发布文档，可按分类过滤
    pub async fn list_published(
        pool: &PgPool,
        category: Option<&str>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        match category {
            Some(category) => {
                sqlx::query_as::<_, DocumentSummary>(
                    r#"
                    SELECT document_id, title, category, format, size_bytes, updated_at
                    FROM documents
                    WHERE published AND category = $1
                    ORDER BY updated_at DESC
                    "#,
                )
                .bind(category)
                .fetch_all(pool)
                .await
            }
            None => {
                sqlx::query_as::<_, DocumentSummary>(
                    r#"
                    SELECT document_id, title, category, format, size_bytes, updated_at
                    FROM documents
                    WHERE published
                    ORDER BY updated_at DESC
                    "#,
                )
                .fetch_all(pool)
                .await
            }
        }
    }
}
