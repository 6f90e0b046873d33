//! The `op/update` request envelope and its encoded size.
//!
//! Every size decision is taken on the compact `serde_json` encoding of the
//! envelope, which is also exactly what gets sent over the wire.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::finite::ensure_finite;

const ENVELOPE_TAIL: &str = "]}";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    AppendStrict,
    Delete,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<'a, E> {
    pub action_type: ActionType,
    pub entities: &'a [E],
}

#[derive(Error, Debug)]
#[error("could not serialize entities: {0}")]
pub struct SerializationError(#[from] serde_json::Error);

impl<'a, E: Serialize> Envelope<'a, E> {
    pub fn new(action_type: ActionType, entities: &'a [E]) -> Self {
        Envelope {
            action_type,
            entities,
        }
    }

    pub fn append_strict(entities: &'a [E]) -> Self {
        Self::new(ActionType::AppendStrict, entities)
    }

    pub fn encode(&self) -> Result<String, SerializationError> {
        to_json(self)
    }

    pub fn encoded_len(&self) -> Result<usize, SerializationError> {
        Ok(self.encode()?.len())
    }
}

/// Compact JSON encoding of `value`. NaN and infinities are an error rather
/// than being written as `null`.
pub(crate) fn to_json<T: ?Sized + Serialize>(value: &T) -> Result<String, SerializationError> {
    ensure_finite(value)?;
    Ok(serde_json::to_string(value)?)
}

/// Size in bytes of `entities` wrapped in an `append_strict` envelope.
pub fn estimate_size<E: Serialize>(entities: &[E]) -> Result<usize, SerializationError> {
    Envelope::append_strict(entities).encoded_len()
}

pub fn kib(bytes: usize) -> f64 {
    bytes as f64 / 1024.0
}

/// Head and tail of an envelope with an empty entity list, used to assemble
/// payloads from entities that were already encoded one by one.
#[derive(Debug, Clone)]
pub(crate) struct Frame {
    head: String,
}

impl Frame {
    pub fn new(action_type: ActionType) -> Result<Self, SerializationError> {
        let empty = Envelope::<Value>::new(action_type, &[]).encode()?;
        let head = empty
            .strip_suffix(ENVELOPE_TAIL)
            .unwrap_or(&empty)
            .to_string();
        Ok(Frame { head })
    }

    pub fn empty_len(&self) -> usize {
        self.head.len() + ENVELOPE_TAIL.len()
    }

    pub fn assemble<S: AsRef<str>>(&self, encoded: &[S]) -> String {
        let body_len: usize = encoded.iter().map(|e| e.as_ref().len() + 1).sum();
        let mut payload = String::with_capacity(self.empty_len() + body_len);
        payload.push_str(&self.head);
        for (i, entity) in encoded.iter().enumerate() {
            if i > 0 {
                payload.push(',');
            }
            payload.push_str(entity.as_ref());
        }
        payload.push_str(ENVELOPE_TAIL);
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    use serde_json::json;

    const EMPTY_APPEND: &str = r#"{"actionType":"append_strict","entities":[]}"#;

    #[test]
    fn test_empty_envelope() {
        let none: [Value; 0] = [];
        assert_eq!(Envelope::append_strict(&none).encode().unwrap(), EMPTY_APPEND);
        assert_eq!(estimate_size(&none).unwrap(), EMPTY_APPEND.len());
    }

    #[test]
    fn test_size_counts_utf8_bytes() {
        let entities = [json!({"id": "Kindergarten:1", "type": "Kindergarten", "name": "Zwergerl Döbling"})];
        let encoded = Envelope::append_strict(&entities).encode().unwrap();
        assert!(encoded.len() > encoded.chars().count());
        assert_eq!(estimate_size(&entities).unwrap(), encoded.len());
    }

    #[test]
    fn test_size_is_independent_of_key_insertion_order() {
        let a = [json!({"type": "Playground", "id": "p1", "area": {"type": "Number", "value": 10}})];
        let b = [json!({"area": {"value": 10, "type": "Number"}, "id": "p1", "type": "Playground"})];
        assert_eq!(
            Envelope::append_strict(&a).encode().unwrap(),
            Envelope::append_strict(&b).encode().unwrap()
        );
    }

    #[test]
    fn test_unencodable_entity_fails() {
        let mut bad = HashMap::new();
        bad.insert(vec![1u8, 2], "value");
        assert!(estimate_size(&[bad]).is_err());
    }

    #[test]
    fn test_non_finite_numbers_fail() {
        #[derive(Serialize)]
        struct Reading {
            id: &'static str,
            value: f64,
        }
        let entities = [
            Reading { id: "r1", value: f64::NAN },
            Reading { id: "r2", value: f64::INFINITY },
        ];
        assert!(estimate_size(&entities).is_err());
        assert!(estimate_size(&entities[1..]).is_err());
        assert_eq!(
            estimate_size(&[Reading { id: "r3", value: 1.5 }]).unwrap(),
            r#"{"actionType":"append_strict","entities":[{"id":"r3","value":1.5}]}"#.len()
        );
    }

    #[test]
    fn test_frame_assembles_same_text_as_serializer() {
        let entities = [
            json!({"id": "w1", "type": "WasteCollectionPoint"}),
            json!({"id": "w2", "type": "WasteCollectionPoint", "fraction": {"type": "Text", "value": "Glas"}}),
            json!({"id": "w3", "type": "WasteCollectionPoint"}),
        ];
        let encoded: Vec<String> = entities
            .iter()
            .map(|e| serde_json::to_string(e).unwrap())
            .collect();

        for action in [ActionType::AppendStrict, ActionType::Delete] {
            let frame = Frame::new(action).unwrap();
            assert_eq!(
                frame.assemble(&encoded),
                Envelope::new(action, &entities).encode().unwrap()
            );
            assert_eq!(
                frame.assemble::<String>(&[]).len(),
                frame.empty_len()
            );
        }
    }

    #[test]
    fn test_delete_envelope_action() {
        let ids = [json!({"id": "a"})];
        assert_eq!(
            Envelope::new(ActionType::Delete, &ids).encode().unwrap(),
            r#"{"actionType":"delete","entities":[{"id":"a"}]}"#
        );
    }

    #[test]
    fn test_kib() {
        assert_eq!(format!("{:.2}", kib(1536 * 1024)), "1536.00");
        assert_eq!(format!("{:.2}", kib(1000)), "0.98");
    }
}
