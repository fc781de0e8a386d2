use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::db::{CourierChanges, CourierDb, DbError};
use crate::models::courier::{Courier, NewCourier};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS couriers (
    seq            BIGSERIAL,
    id             UUID PRIMARY KEY,
    email          TEXT NOT NULL UNIQUE,
    vehicle_type   TEXT NOT NULL,
    availability   BOOLEAN NOT NULL DEFAULT TRUE,
    order_assigned TEXT,
    created_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at     TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

const COLUMNS: &str =
    "id, email, vehicle_type, availability, order_assigned, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct CourierRow {
    id: Uuid,
    email: String,
    vehicle_type: String,
    availability: bool,
    order_assigned: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CourierRow> for Courier {
    type Error = DbError;

    fn try_from(row: CourierRow) -> Result<Self, Self::Error> {
        Ok(Courier {
            id: row.id,
            email: row.email,
            vehicle_type: row.vehicle_type.parse().map_err(DbError::Query)?,
            availability: row.availability,
            // rows written before nullable assignments stored '' for "none"
            order_assigned: row.order_assigned.filter(|order| !order.is_empty()),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or("couriers");
                return DbError::UniqueViolation(constraint.to_string());
            }
        }
        DbError::Query(err.to_string())
    }
}

/// Postgres-backed `couriers` table. The pool is opened by `connect` and
/// closed by `disconnect`.
pub struct PgDb {
    url: String,
    max_connections: u32,
    pool: OnceCell<PgPool>,
}

impl PgDb {
    pub fn new(url: impl Into<String>, max_connections: u32) -> Self {
        Self {
            url: url.into(),
            max_connections,
            pool: OnceCell::new(),
        }
    }

    fn pool(&self) -> Result<&PgPool, DbError> {
        self.pool.get().ok_or(DbError::NotConnected)
    }

    async fn fetch_one_by(&self, sql: &str, id: Uuid) -> Result<Option<Courier>, DbError> {
        sqlx::query_as::<_, CourierRow>(sql)
            .bind(id)
            .fetch_optional(self.pool()?)
            .await?
            .map(Courier::try_from)
            .transpose()
    }
}

#[async_trait]
impl CourierDb for PgDb {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn connect(&self) -> Result<(), DbError> {
        let pool = self
            .pool
            .get_or_try_init(|| async {
                PgPoolOptions::new()
                    .max_connections(self.max_connections)
                    .connect(&self.url)
                    .await
            })
            .await?;

        sqlx::query(CREATE_TABLE).execute(pool).await?;
        Ok(())
    }

    async fn disconnect(&self) {
        if let Some(pool) = self.pool.get() {
            pool.close().await;
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Courier>, DbError> {
        let sql = format!("SELECT {COLUMNS} FROM couriers WHERE email = $1 LIMIT 1");
        sqlx::query_as::<_, CourierRow>(&sql)
            .bind(email)
            .fetch_optional(self.pool()?)
            .await?
            .map(Courier::try_from)
            .transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Courier>, DbError> {
        let sql = format!("SELECT {COLUMNS} FROM couriers WHERE id = $1");
        self.fetch_one_by(&sql, id).await
    }

    async fn insert(&self, new: NewCourier) -> Result<Courier, DbError> {
        let sql = format!(
            "INSERT INTO couriers (id, email, vehicle_type) VALUES ($1, $2, $3) RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, CourierRow>(&sql)
            .bind(new.id)
            .bind(&new.email)
            .bind(new.vehicle_type.as_str())
            .fetch_one(self.pool()?)
            .await?;
        Courier::try_from(row)
    }

    async fn count(&self) -> Result<u64, DbError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM couriers")
            .fetch_one(self.pool()?)
            .await?;
        Ok(u64::try_from(total).unwrap_or_default())
    }

    async fn find_page(&self, skip: u64, take: u64) -> Result<Vec<Courier>, DbError> {
        let sql = format!("SELECT {COLUMNS} FROM couriers ORDER BY seq OFFSET $1 LIMIT $2");
        let rows = sqlx::query_as::<_, CourierRow>(&sql)
            .bind(i64::try_from(skip).unwrap_or(i64::MAX))
            .bind(i64::try_from(take).unwrap_or(i64::MAX))
            .fetch_all(self.pool()?)
            .await?;
        rows.into_iter().map(Courier::try_from).collect()
    }

    async fn update(&self, id: Uuid, changes: CourierChanges) -> Result<Courier, DbError> {
        let sql = format!(
            "UPDATE couriers SET \
                email = COALESCE($2, email), \
                vehicle_type = COALESCE($3, vehicle_type), \
                availability = COALESCE($4, availability), \
                order_assigned = CASE WHEN $5 THEN $6 ELSE order_assigned END, \
                updated_at = now() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        let (set_order, order_assigned) = match changes.order_assigned {
            Some(order) => (true, order),
            None => (false, None),
        };

        sqlx::query_as::<_, CourierRow>(&sql)
            .bind(id)
            .bind(changes.email)
            .bind(changes.vehicle_type.map(|kind| kind.as_str()))
            .bind(changes.availability)
            .bind(set_order)
            .bind(order_assigned)
            .fetch_optional(self.pool()?)
            .await?
            .map(Courier::try_from)
            .transpose()?
            .ok_or(DbError::RecordNotFound(id))
    }

    async fn delete(&self, id: Uuid) -> Result<Courier, DbError> {
        let sql = format!("DELETE FROM couriers WHERE id = $1 RETURNING {COLUMNS}");
        self.fetch_one_by(&sql, id)
            .await?
            .ok_or(DbError::RecordNotFound(id))
    }
}
