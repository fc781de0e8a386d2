//! Maps inbound pattern names onto courier store operations.

pub mod payload;

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::AppError;
use crate::models::events::{CourierAssigned, OrderDelivered};
use crate::observability::metrics::Metrics;
use crate::store::CourierStore;

/// Request/response patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    CreateCourier,
    FindAllCouriers,
    FindOneCourier,
    UpdateCourier,
    UpdateCourierAvailability,
    DeleteCourier,
}

impl Pattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pattern::CreateCourier => "createCourier",
            Pattern::FindAllCouriers => "findAllCouriers",
            Pattern::FindOneCourier => "findOneCourier",
            Pattern::UpdateCourier => "updateCourier",
            Pattern::UpdateCourierAvailability => "updateCourierAvailability",
            Pattern::DeleteCourier => "deleteCourier",
        }
    }
}

impl FromStr for Pattern {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createCourier" => Ok(Pattern::CreateCourier),
            "findAllCouriers" => Ok(Pattern::FindAllCouriers),
            "findOneCourier" => Ok(Pattern::FindOneCourier),
            "updateCourier" => Ok(Pattern::UpdateCourier),
            "updateCourierAvailability" => Ok(Pattern::UpdateCourierAvailability),
            "deleteCourier" => Ok(Pattern::DeleteCourier),
            other => Err(AppError::NotFound(format!(
                "There is no matching message handler defined for pattern {other}"
            ))),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fire-and-forget patterns published by the orders service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPattern {
    CourierAssigned,
    OrderDelivered,
}

impl EventPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventPattern::CourierAssigned => "courier_assigned",
            EventPattern::OrderDelivered => "order_delivered",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "courier_assigned" => Some(EventPattern::CourierAssigned),
            "order_delivered" => Some(EventPattern::OrderDelivered),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    store: CourierStore,
    metrics: Metrics,
}

impl Dispatcher {
    pub fn new(store: CourierStore, metrics: Metrics) -> Self {
        Self { store, metrics }
    }

    /// Runs a request pattern and returns its JSON result. Domain and
    /// validation errors come back unchanged.
    pub async fn handle(&self, pattern: &str, data: Value) -> Result<Value, AppError> {
        let start = Instant::now();
        let parsed = pattern.parse::<Pattern>();
        let label = parsed.as_ref().map_or("unknown", Pattern::as_str);
        let result = match parsed {
            Ok(parsed) => self.route(parsed, &data).await,
            Err(err) => Err(err),
        };

        let outcome = match &result {
            Ok(_) => "ok",
            Err(err) => outcome_label(err),
        };
        self.metrics
            .messages_total
            .with_label_values(&[label, outcome])
            .inc();
        self.metrics
            .message_latency_seconds
            .with_label_values(&[label])
            .observe(start.elapsed().as_secs_f64());

        match &result {
            Ok(_) => debug!(pattern, "request handled"),
            Err(err @ (AppError::Storage(_) | AppError::Internal(_))) => {
                error!(pattern, error = %err, "request failed")
            }
            Err(err) => debug!(pattern, error = %err, "request rejected"),
        }

        result
    }

    async fn route(&self, pattern: Pattern, data: &Value) -> Result<Value, AppError> {
        match pattern {
            Pattern::CreateCourier => {
                let new = payload::create_courier(data)?;
                to_json(self.store.create(new).await?)
            }
            Pattern::FindAllCouriers => {
                let pagination = payload::pagination(data)?;
                to_json(self.store.list(pagination).await?)
            }
            Pattern::FindOneCourier => {
                let id = payload::courier_id(data)?;
                to_json(self.store.get(id).await?)
            }
            Pattern::UpdateCourier => {
                let patch = payload::update_courier(data)?;
                to_json(self.store.update(patch).await?)
            }
            Pattern::UpdateCourierAvailability => {
                let id = payload::courier_id(data)?;
                to_json(self.store.toggle_availability(id).await?)
            }
            Pattern::DeleteCourier => {
                let id = payload::courier_id(data)?;
                to_json(self.store.delete(id).await?)
            }
        }
    }

    /// Applies an event. Nothing flows back to the publisher; failures are
    /// only logged and counted.
    pub async fn emit(&self, pattern: &str, data: Value) {
        let Some(event) = EventPattern::parse(pattern) else {
            warn!(pattern, "no handler for event pattern; dropping");
            self.count_event("unknown", "unhandled");
            return;
        };

        let result = match event {
            EventPattern::CourierAssigned => match serde_json::from_value::<CourierAssigned>(data) {
                Ok(assigned) => {
                    self.store
                        .on_courier_assigned(&assigned.order.id, assigned.courier_id)
                        .await
                }
                Err(err) => Err(AppError::BadRequest(err.to_string())),
            },
            EventPattern::OrderDelivered => match serde_json::from_value::<OrderDelivered>(data) {
                Ok(delivered) => {
                    self.store
                        .on_order_delivered(&delivered.order_id, delivered.courier_id)
                        .await
                }
                Err(err) => Err(AppError::BadRequest(err.to_string())),
            },
        };

        match result {
            Ok(()) => self.count_event(event.as_str(), "ok"),
            Err(err @ AppError::BadRequest(_)) => {
                warn!(pattern, error = %err, "malformed event payload; dropping");
                self.count_event(event.as_str(), "malformed");
            }
            Err(err) => {
                error!(pattern, error = %err, "event handling failed");
                self.count_event(event.as_str(), outcome_label(&err));
            }
        }
    }

    fn count_event(&self, pattern: &str, outcome: &str) {
        self.metrics
            .events_total
            .with_label_values(&[pattern, outcome])
            .inc();
    }
}

fn outcome_label(err: &AppError) -> &'static str {
    match err {
        AppError::BadRequest(_) => "bad_request",
        AppError::NotFound(_) => "not_found",
        AppError::Conflict(_) => "conflict",
        AppError::Storage(_) | AppError::Internal(_) => "error",
    }
}

fn to_json<T: Serialize>(value: T) -> Result<Value, AppError> {
    serde_json::to_value(value)
        .map_err(|err| AppError::Internal(format!("failed to encode response: {err}")))
}
