//! Random time-series entities for smoke-testing a broker.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde_json::{Map, Value};
use thiserror::Error;

use super::models::{Attribute, Entity, ATTR_TYPE_DATETIME, ATTR_TYPE_NUMBER, TIME_INSTANT};
use crate::helpers::iso_millis;

pub const VALUE_ATTR: &str = "value";
const ID_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

#[derive(Error, Debug, PartialEq)]
pub enum GenerateError {
    #[error("invalid range: minimum {min} is greater than maximum {max}")]
    InvalidRange { min: i64, max: i64 },
    #[error("number of data points must be positive")]
    NoDataPoints,
    #[error("metadata attribute '{name}' is not a valid NGSI attribute: {reason}")]
    InvalidMetadata { name: String, reason: String },
}

/// Generates `count` measurements one minute apart, the last one at `end`.
///
/// Each measurement is its own entity, identified by its type and timestamp.
pub fn generate_time_series<R: Rng>(
    rng: &mut R,
    entity_type: &str,
    min: i64,
    max: i64,
    count: usize,
    end: DateTime<Utc>,
) -> Result<Vec<Entity>, GenerateError> {
    if min > max {
        return Err(GenerateError::InvalidRange { min, max });
    }
    if count == 0 {
        return Err(GenerateError::NoDataPoints);
    }

    let entities = (0..count)
        .map(|i| {
            let ts = end - Duration::minutes((count - 1 - i) as i64);
            let value = rng.gen_range(min as f64..=max as f64);
            Entity::new(
                format!(
                    "urn:ngsi-ld:{}:{}",
                    entity_type,
                    ts.format(ID_TIMESTAMP_FORMAT)
                ),
                entity_type,
            )
            .with_attribute(VALUE_ATTR, Attribute::new(ATTR_TYPE_NUMBER, value))
            .with_attribute(TIME_INSTANT, Attribute::new(ATTR_TYPE_DATETIME, iso_millis(ts)))
        })
        .collect();
    Ok(entities)
}

/// Adds the attributes in `metadata` (e.g. a sensor `location`) to every
/// entity. Attributes an entity already has are left untouched.
pub fn add_metadata(
    entities: &mut [Entity],
    metadata: &Map<String, Value>,
) -> Result<(), GenerateError> {
    let mut attributes = Vec::with_capacity(metadata.len());
    for (name, value) in metadata {
        let attribute: Attribute =
            serde_json::from_value(value.clone()).map_err(|e| GenerateError::InvalidMetadata {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        attributes.push((name, attribute));
    }

    for entity in entities.iter_mut() {
        for (name, attribute) in &attributes {
            entity
                .attributes
                .entry(name.to_string())
                .or_insert_with(|| attribute.clone());
        }
    }
    Ok(())
}
