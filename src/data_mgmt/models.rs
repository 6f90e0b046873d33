use std::collections::BTreeMap;

use chrono::{DateTime, offset::Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const ATTR_TYPE_NUMBER: &str = "Number";
pub const ATTR_TYPE_DATETIME: &str = "DateTime";
pub const TIME_INSTANT: &str = "TimeInstant";

/// An NGSI-v2 attribute in normalized representation.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Attribute {
    #[serde(rename = "type")]
    pub attr_type: String,
    pub value: Value,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Attribute {
    pub fn new(attr_type: impl Into<String>, value: impl Into<Value>) -> Self {
        Attribute {
            attr_type: attr_type.into(),
            value: value.into(),
            metadata: Map::new(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Entity {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Attribute>,
}

impl Entity {
    pub fn new(id: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Entity {
            id: id.into(),
            entity_type: entity_type.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }
}

/// Identifies an entity in a bulk delete request.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct EntityRef {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
}

impl EntityRef {
    /// Extracts `id` and `type` from an entity as returned by the broker.
    pub fn from_value(entity: &Value) -> Option<Self> {
        let id = entity.get("id")?.as_str()?.to_string();
        let entity_type = entity
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string);
        Some(EntityRef { id, entity_type })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MeasurementRequest {
    pub urn: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MeasurementResult {
    pub urn: String,
    pub name: String,
    pub value: Value,
    pub timestamp: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_entity_serializes_as_ngsi() {
        let entity = Entity::new("urn:ngsi-ld:AirQuality:STEF", "AirQuality")
            .with_attribute("NO2", Attribute::new(ATTR_TYPE_NUMBER, 21.5));
        assert_eq!(
            serde_json::to_value(&entity).unwrap(),
            json!({
                "id": "urn:ngsi-ld:AirQuality:STEF",
                "type": "AirQuality",
                "NO2": {"type": "Number", "value": 21.5, "metadata": {}}
            })
        );
    }

    #[test]
    fn test_entity_parses_with_missing_metadata() {
        let entity: Entity = serde_json::from_value(json!({
            "id": "k1",
            "type": "Kindergarten",
            "capacity": {"type": "Number", "value": 40}
        }))
        .unwrap();
        assert_eq!(entity.attributes["capacity"].value, json!(40));
        assert!(entity.attributes["capacity"].metadata.is_empty());
    }

    #[test]
    fn test_entity_ref_from_broker_entity() {
        let full = json!({"id": "p1", "type": "Playground", "name": {"type": "Text", "value": "x"}});
        assert_eq!(
            EntityRef::from_value(&full),
            Some(EntityRef {
                id: "p1".into(),
                entity_type: Some("Playground".into())
            })
        );
        assert_eq!(
            serde_json::to_string(&EntityRef::from_value(&json!({"id": "p2"})).unwrap()).unwrap(),
            r#"{"id":"p2"}"#
        );
        assert_eq!(EntityRef::from_value(&json!({"type": "Playground"})), None);
    }
}
