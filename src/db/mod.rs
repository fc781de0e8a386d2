//! Database client interface for the `couriers` table.
//!
//! The store talks to persistence only through [`CourierDb`], so the same
//! courier logic runs against Postgres in production and the in-memory table
//! in tests and local runs.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::courier::{Courier, NewCourier, VehicleType};

pub use memory::MemoryDb;
pub use postgres::PgDb;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record {0} not found")]
    RecordNotFound(Uuid),

    #[error("unique constraint failed on {0}")]
    UniqueViolation(String),

    #[error("database is not connected")]
    NotConnected,

    #[error("query failed: {0}")]
    Query(String),
}

/// Column changes for a single row. `None` leaves the column as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourierChanges {
    pub email: Option<String>,
    pub vehicle_type: Option<VehicleType>,
    pub availability: Option<bool>,
    /// `Some(None)` clears the assignment.
    pub order_assigned: Option<Option<String>>,
}

impl CourierChanges {
    pub fn apply(self, courier: &mut Courier) {
        if let Some(email) = self.email {
            courier.email = email;
        }
        if let Some(vehicle_type) = self.vehicle_type {
            courier.vehicle_type = vehicle_type;
        }
        if let Some(availability) = self.availability {
            courier.availability = availability;
        }
        if let Some(order_assigned) = self.order_assigned {
            courier.order_assigned = order_assigned;
        }
    }
}

#[async_trait]
pub trait CourierDb: Send + Sync {
    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;

    async fn connect(&self) -> Result<(), DbError>;

    async fn disconnect(&self);

    async fn find_by_email(&self, email: &str) -> Result<Option<Courier>, DbError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Courier>, DbError>;

    /// Fails with `UniqueViolation` when the id or email is already taken.
    async fn insert(&self, courier: NewCourier) -> Result<Courier, DbError>;

    async fn count(&self) -> Result<u64, DbError>;

    /// Rows in insertion order.
    async fn find_page(&self, skip: u64, take: u64) -> Result<Vec<Courier>, DbError>;

    /// Fails with `RecordNotFound` when no row has this id.
    async fn update(&self, id: Uuid, changes: CourierChanges) -> Result<Courier, DbError>;

    /// Fails with `RecordNotFound` when no row has this id.
    async fn delete(&self, id: Uuid) -> Result<Courier, DbError>;
}
