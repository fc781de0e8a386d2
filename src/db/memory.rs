use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use crate::db::{CourierChanges, CourierDb, DbError};
use crate::models::courier::{Courier, NewCourier};

struct Row {
    seq: u64,
    courier: Courier,
}

/// In-process `couriers` table with the same key and uniqueness rules as the
/// relational schema.
#[derive(Default)]
pub struct MemoryDb {
    rows: DashMap<Uuid, Row>,
    emails: DashMap<String, Uuid>,
    next_seq: AtomicU64,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CourierDb for MemoryDb {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn connect(&self) -> Result<(), DbError> {
        Ok(())
    }

    async fn disconnect(&self) {}

    async fn find_by_email(&self, email: &str) -> Result<Option<Courier>, DbError> {
        let Some(id) = self.emails.get(email).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        Ok(self.rows.get(&id).map(|row| row.courier.clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Courier>, DbError> {
        Ok(self.rows.get(&id).map(|row| row.courier.clone()))
    }

    async fn insert(&self, new: NewCourier) -> Result<Courier, DbError> {
        // Lock order is always rows then emails.
        let Entry::Vacant(row_slot) = self.rows.entry(new.id) else {
            return Err(DbError::UniqueViolation("id".to_string()));
        };
        let Entry::Vacant(email_slot) = self.emails.entry(new.email.clone()) else {
            return Err(DbError::UniqueViolation("email".to_string()));
        };

        let now = Utc::now();
        let courier = Courier {
            id: new.id,
            email: new.email,
            vehicle_type: new.vehicle_type,
            availability: true,
            order_assigned: None,
            created_at: now,
            updated_at: now,
        };

        email_slot.insert(courier.id);
        row_slot.insert(Row {
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            courier: courier.clone(),
        });

        Ok(courier)
    }

    async fn count(&self) -> Result<u64, DbError> {
        Ok(self.rows.len() as u64)
    }

    async fn find_page(&self, skip: u64, take: u64) -> Result<Vec<Courier>, DbError> {
        let mut rows: Vec<(u64, Courier)> = self
            .rows
            .iter()
            .map(|entry| (entry.seq, entry.courier.clone()))
            .collect();
        rows.sort_by_key(|(seq, _)| *seq);

        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        let take = usize::try_from(take).unwrap_or(usize::MAX);

        Ok(rows
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|(_, courier)| courier)
            .collect())
    }

    async fn update(&self, id: Uuid, changes: CourierChanges) -> Result<Courier, DbError> {
        let mut row = self.rows.get_mut(&id).ok_or(DbError::RecordNotFound(id))?;

        if let Some(email) = changes.email.as_ref().filter(|email| **email != row.courier.email) {
            match self.emails.entry(email.clone()) {
                Entry::Occupied(_) => return Err(DbError::UniqueViolation("email".to_string())),
                Entry::Vacant(slot) => {
                    slot.insert(id);
                }
            }
            self.emails.remove(&row.courier.email);
        }

        changes.apply(&mut row.courier);
        row.courier.updated_at = Utc::now();

        Ok(row.courier.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<Courier, DbError> {
        let (_, row) = self.rows.remove(&id).ok_or(DbError::RecordNotFound(id))?;
        self.emails.remove(&row.courier.email);
        Ok(row.courier)
    }
}
