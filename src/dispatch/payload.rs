//! Payload shapes accepted by the request patterns.
//!
//! Every problem in a payload is collected so a caller sees all of them in a
//! single `BadRequest`.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::courier::{CourierPatch, NewCourier, VehicleType};
use crate::models::page::{DEFAULT_LIMIT, DEFAULT_PAGE, Pagination};

pub fn create_courier(data: &Value) -> Result<NewCourier, AppError> {
    let mut fields = Fields::new(data)?;
    let id = fields.uuid("id", None);
    let email = fields.email("email", true);
    let vehicle_type = fields.vehicle_type("vehicleType", true);
    fields.reject_unknown(&["id", "email", "vehicleType"]);
    fields.finish()?;

    match (id, email, vehicle_type) {
        (Some(id), Some(email), Some(vehicle_type)) => Ok(NewCourier {
            id,
            email,
            vehicle_type,
        }),
        _ => Err(AppError::BadRequest("invalid courier payload".to_string())),
    }
}

pub fn update_courier(data: &Value) -> Result<CourierPatch, AppError> {
    let mut fields = Fields::new(data)?;
    let id = fields.uuid("id", Some(4));
    let email = fields.email("email", false);
    let vehicle_type = fields.vehicle_type("vehicleType", false);
    fields.reject_unknown(&["id", "email", "vehicleType"]);
    fields.finish()?;

    let id = id.ok_or_else(|| AppError::BadRequest("id must be a UUID".to_string()))?;
    Ok(CourierPatch {
        id,
        email,
        vehicle_type,
    })
}

pub fn pagination(data: &Value) -> Result<Pagination, AppError> {
    // a bare request with no payload lists the first page
    if data.is_null() {
        return Ok(Pagination::default());
    }

    let mut fields = Fields::new(data)?;
    let page = fields.positive_int("page", DEFAULT_PAGE);
    let limit = fields.positive_int("limit", DEFAULT_LIMIT);
    fields.reject_unknown(&["page", "limit"]);
    fields.finish()?;

    Ok(Pagination { page, limit })
}

/// `{id}` payloads. Extra keys are ignored here, matching how callers reuse
/// whole courier objects as lookups.
pub fn courier_id(data: &Value) -> Result<Uuid, AppError> {
    let mut fields = Fields::new(data)?;
    let id = fields.uuid("id", None);
    fields.finish()?;

    id.ok_or_else(|| AppError::BadRequest("id must be a UUID".to_string()))
}

struct Fields<'a> {
    object: &'a Map<String, Value>,
    errors: Vec<String>,
}

impl<'a> Fields<'a> {
    fn new(data: &'a Value) -> Result<Self, AppError> {
        let object = data
            .as_object()
            .ok_or_else(|| AppError::BadRequest("payload must be an object".to_string()))?;

        Ok(Self {
            object,
            errors: Vec::new(),
        })
    }

    fn present(&self, key: &str) -> Option<&'a Value> {
        self.object.get(key).filter(|value| !value.is_null())
    }

    fn string(&mut self, key: &str, required: bool) -> Option<&'a str> {
        match self.present(key) {
            Some(Value::String(raw)) => Some(raw.as_str()),
            Some(_) => {
                self.errors.push(format!("{key} must be a string"));
                None
            }
            None => {
                if required {
                    self.errors.push(format!("{key} should not be empty"));
                }
                None
            }
        }
    }

    fn uuid(&mut self, key: &str, version: Option<usize>) -> Option<Uuid> {
        let raw = self.string(key, true)?;
        let parsed = Uuid::try_parse(raw)
            .ok()
            .filter(|id| version.is_none_or(|version| id.get_version_num() == version));

        if parsed.is_none() {
            match version {
                Some(version) => self.errors.push(format!("{key} must be a UUID v{version}")),
                None => self.errors.push(format!("{key} must be a UUID")),
            }
        }
        parsed
    }

    fn email(&mut self, key: &str, required: bool) -> Option<String> {
        let raw = self.string(key, required)?;
        if is_email(raw) {
            Some(raw.to_string())
        } else {
            self.errors.push(format!("{key} must be an email"));
            None
        }
    }

    fn vehicle_type(&mut self, key: &str, required: bool) -> Option<VehicleType> {
        let raw = self.string(key, required)?;
        match raw.parse() {
            Ok(kind) => Some(kind),
            Err(_) => {
                let allowed: Vec<&str> = VehicleType::ALL.iter().map(VehicleType::as_str).collect();
                self.errors.push(format!(
                    "{key} must be one of the following values: {}",
                    allowed.join(", ")
                ));
                None
            }
        }
    }

    fn positive_int(&mut self, key: &str, default: u32) -> u32 {
        let Some(value) = self.present(key) else {
            return default;
        };

        match value.as_u64().and_then(|n| u32::try_from(n).ok()) {
            Some(n) if n >= 1 => n,
            _ => {
                self.errors.push(format!("{key} must be a positive integer"));
                default
            }
        }
    }

    fn reject_unknown(&mut self, allowed: &[&str]) {
        for key in self.object.keys() {
            if !allowed.contains(&key.as_str()) {
                self.errors.push(format!("property {key} should not exist"));
            }
        }
    }

    fn finish(self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::BadRequest(self.errors.join("; ")))
        }
    }
}

fn is_email(raw: &str) -> bool {
    let Some((local, domain)) = raw.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !raw.chars().any(char::is_whitespace)
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}
