use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::db::{CourierChanges, CourierDb};
use crate::error::AppError;
use crate::models::courier::{Courier, CourierPatch, NewCourier};
use crate::models::page::{Page, PageMeta, Pagination};

/// Courier lifecycle on top of a [`CourierDb`].
///
/// Existence and email checks are check-then-act against the database; two
/// racing writers are only kept apart by the table's own constraints.
#[derive(Clone)]
pub struct CourierStore {
    db: Arc<dyn CourierDb>,
}

impl CourierStore {
    pub fn new(db: Arc<dyn CourierDb>) -> Self {
        Self { db }
    }

    pub fn backend(&self) -> &'static str {
        self.db.backend()
    }

    pub async fn init(&self) -> Result<(), AppError> {
        self.db.connect().await?;
        info!(backend = self.db.backend(), "connected to the database");
        Ok(())
    }

    pub async fn shutdown(&self) {
        self.db.disconnect().await;
        info!(backend = self.db.backend(), "database connection closed");
    }

    pub async fn create(&self, new: NewCourier) -> Result<Courier, AppError> {
        if self.db.find_by_email(&new.email).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Courier with email {} already exists",
                new.email
            )));
        }

        Ok(self.db.insert(new).await?)
    }

    /// An empty table is reported as `NotFound` rather than an empty page.
    pub async fn list(&self, pagination: Pagination) -> Result<Page<Courier>, AppError> {
        let total = self.db.count().await?;
        if total == 0 {
            return Err(AppError::NotFound("No couriers found.".to_string()));
        }

        let data = self
            .db
            .find_page(pagination.skip(), pagination.take())
            .await?;

        Ok(Page {
            data,
            meta: PageMeta::new(total, pagination),
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<Courier, AppError> {
        self.db
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Courier #{id} not found")))
    }

    pub async fn update(&self, patch: CourierPatch) -> Result<Courier, AppError> {
        self.get(patch.id).await?;

        let changes = CourierChanges {
            email: patch.email,
            vehicle_type: patch.vehicle_type,
            ..Default::default()
        };
        Ok(self.db.update(patch.id, changes).await?)
    }

    pub async fn toggle_availability(&self, id: Uuid) -> Result<Courier, AppError> {
        let courier = self.get(id).await?;

        let changes = CourierChanges {
            availability: Some(!courier.availability),
            ..Default::default()
        };
        Ok(self.db.update(id, changes).await?)
    }

    /// Binds the courier to `order_id`. There is no existence check; a missing
    /// courier fails in the database layer.
    pub async fn on_courier_assigned(&self, order_id: &str, courier_id: Uuid) -> Result<(), AppError> {
        let changes = CourierChanges {
            order_assigned: Some(Some(order_id.to_string())),
            ..Default::default()
        };
        self.db.update(courier_id, changes).await?;

        info!(%courier_id, order_id, "courier assigned to order");
        Ok(())
    }

    /// Clears the courier's assignment once `order_id` is delivered.
    pub async fn on_order_delivered(&self, order_id: &str, courier_id: Uuid) -> Result<(), AppError> {
        let changes = CourierChanges {
            order_assigned: Some(None),
            ..Default::default()
        };
        self.db.update(courier_id, changes).await?;

        info!(%courier_id, order_id, "courier released after delivery");
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<Courier, AppError> {
        self.get(id).await?;
        Ok(self.db.delete(id).await?)
    }
}
