use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleType {
    Bicycle,
    Motorcycle,
    Car,
    Van,
}

impl VehicleType {
    pub const ALL: [VehicleType; 4] = [
        VehicleType::Bicycle,
        VehicleType::Motorcycle,
        VehicleType::Car,
        VehicleType::Van,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleType::Bicycle => "BICYCLE",
            VehicleType::Motorcycle => "MOTORCYCLE",
            VehicleType::Car => "CAR",
            VehicleType::Van => "VAN",
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VehicleType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown vehicle type: {s}"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Courier {
    pub id: Uuid,
    pub email: String,
    pub vehicle_type: VehicleType,
    pub availability: bool,
    pub order_assigned: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Creation record: every field is required and the id is chosen by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewCourier {
    pub id: Uuid,
    pub email: String,
    pub vehicle_type: VehicleType,
}

/// Partial update keyed by `id`; absent fields are left untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CourierPatch {
    pub id: Uuid,
    pub email: Option<String>,
    pub vehicle_type: Option<VehicleType>,
}
