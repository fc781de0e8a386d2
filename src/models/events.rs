use serde::{Deserialize, Deserializer};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OrderRef {
    #[serde(deserialize_with = "order_id")]
    pub id: String,
}

/// Published by the orders service once a courier has been picked for an order.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CourierAssigned {
    pub order: OrderRef,
    pub courier_id: Uuid,
}

/// Published by the orders service when the courier hands the order over.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderDelivered {
    #[serde(deserialize_with = "order_id")]
    pub order_id: String,
    pub courier_id: Uuid,
}

// Order ids are opaque to this service; numeric ids are kept as their decimal text.
fn order_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(id) => Ok(id),
        serde_json::Value::Number(id) => Ok(id.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "order id must be a string or number, got {other}"
        ))),
    }
}
