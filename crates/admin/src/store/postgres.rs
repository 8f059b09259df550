//! `PostgreSQL` document backend.
//!
//! Documents live in a single `campus.documents` table keyed by
//! `(collection, id)` with the fields in a `JSONB` column. Filters compile to
//! `JSONB` containment: `Eq(f, v)` is `fields @> {f: v}` and
//! `ArrayContains(f, v)` is `fields @> {f: [v]}`.
//!
//! Queries are runtime-checked (`sqlx::query`, not `sqlx::query!`) so the
//! crate builds without a live database.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p campus-hub-cli -- migrate
//! ```

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::debug;

use super::{Document, DocumentStore, Fields, Filter, StoreError, generate_key};

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Run the bundled migrations.
///
/// # Errors
///
/// Returns an error if a migration fails to apply.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// [`DocumentStore`] over a `JSONB` documents table.
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Borrow the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn containment(filter: &Filter) -> Value {
    match filter {
        Filter::Eq(field, value) => json!({ field: value }),
        Filter::ArrayContains(field, value) => json!({ field: [value] }),
    }
}

fn into_fields(value: Value) -> Result<Fields, StoreError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Unavailable(format!(
            "stored document is not an object: {other}"
        ))),
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let row: Option<(Value,)> = sqlx::query_as(
            r"
            SELECT fields
            FROM campus.documents
            WHERE collection = $1 AND id = $2
            ",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(fields,)| {
            Ok(Document {
                id: id.to_owned(),
                fields: into_fields(fields)?,
            })
        })
        .transpose()
    }

    async fn list(
        &self,
        collection: &str,
        filters: &[Filter],
    ) -> Result<Vec<Document>, StoreError> {
        let mut sql = String::from("SELECT id, fields FROM campus.documents WHERE collection = $1");
        for index in 0..filters.len() {
            sql.push_str(&format!(" AND fields @> ${}::jsonb", index + 2));
        }
        sql.push_str(" ORDER BY id");

        let mut query = sqlx::query_as::<_, (String, Value)>(&sql).bind(collection);
        for filter in filters {
            query = query.bind(containment(filter));
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|(id, fields)| {
                Ok(Document {
                    id,
                    fields: into_fields(fields)?,
                })
            })
            .collect()
    }

    async fn upsert(
        &self,
        collection: &str,
        id: Option<&str>,
        fields: Fields,
        merge: bool,
    ) -> Result<String, StoreError> {
        let key = id.map_or_else(generate_key, str::to_owned);
        // `||` on two JSONB objects is a shallow merge, right side wins.
        let sql = if merge {
            r"
            INSERT INTO campus.documents (collection, id, fields)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id)
            DO UPDATE SET fields = campus.documents.fields || EXCLUDED.fields, updated_at = NOW()
            "
        } else {
            r"
            INSERT INTO campus.documents (collection, id, fields)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id)
            DO UPDATE SET fields = EXCLUDED.fields, updated_at = NOW()
            "
        };

        sqlx::query(sql)
            .bind(collection)
            .bind(&key)
            .bind(Value::Object(fields))
            .execute(&self.pool)
            .await?;

        debug!(collection, id = %key, merge, "Upserted document");
        Ok(key)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM campus.documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
