//! Decoding of the Wikibase action API JSON envelopes.

use crate::core::{Entity, EntityId, PropertyId, Result, Statement, SweepError, TypedValue};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// `error` member of a failure envelope.
#[derive(Debug, Deserialize)]
struct FailureBody {
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    info: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    error: Option<FailureBody>,
    #[serde(default)]
    warnings: Option<Value>,
    #[serde(default)]
    success: Option<Value>,
    #[serde(default)]
    entities: Option<HashMap<String, RawEntity>>,
}

#[derive(Debug, Deserialize)]
struct RawEntity {
    #[serde(default)]
    missing: Option<Value>,
    /// Object keyed by property id; `[]` for entities without claims.
    #[serde(default)]
    claims: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawClaim {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    mainsnak: Option<RawSnak>,
}

#[derive(Debug, Deserialize)]
struct RawSnak {
    #[serde(default)]
    datavalue: Option<Value>,
}

fn parse_envelope(body: &Value) -> Result<Envelope> {
    Ok(Envelope::deserialize(body)?)
}

fn failure_of(envelope: &Envelope, conflict_signal: &str) -> Option<SweepError> {
    let failure = envelope.error.as_ref()?;
    let code = match &failure.code {
        Some(Value::String(code)) => code.clone(),
        Some(other) => other.to_string(),
        None => "unknown".to_string(),
    };
    let info = failure.info.clone().unwrap_or_default();
    let warnings = envelope.warnings.as_ref().map(Value::to_string);
    Some(SweepError::from_envelope(code, info, warnings, conflict_signal))
}

/// Decodes a `wbgetentities` response for a single requested id.
///
/// A failure envelope is returned as classified error; an id that is absent
/// from `entities` or flagged `missing` is [`SweepError::EntityNotFound`].
pub fn decode_entity(body: &Value, id: &EntityId, conflict_signal: &str) -> Result<Entity> {
    let envelope = parse_envelope(body)?;
    if let Some(err) = failure_of(&envelope, conflict_signal) {
        return Err(err);
    }
    let mut entities = envelope
        .entities
        .ok_or_else(|| SweepError::Decode("response has no 'entities' member".to_string()))?;
    let raw = entities
        .remove(id.as_str())
        .ok_or_else(|| SweepError::EntityNotFound(id.clone()))?;
    if raw.missing.is_some() {
        return Err(SweepError::EntityNotFound(id.clone()));
    }

    let mut entity = Entity::new(id.clone());
    let Some(Value::Object(claims)) = raw.claims else {
        return Ok(entity);
    };
    for (property, group) in claims {
        let Value::Array(items) = group else {
            continue;
        };
        let statements = items
            .into_iter()
            .filter_map(|item| decode_statement(item, id))
            .collect();
        entity
            .statements
            .insert(PropertyId::new(property), statements);
    }
    Ok(entity)
}

fn decode_statement(raw: Value, entity: &EntityId) -> Option<Statement> {
    let claim = match RawClaim::deserialize(raw) {
        Ok(claim) => claim,
        Err(err) => {
            debug!(entity = %entity, error = %err, "skipping undecodable claim");
            return None;
        }
    };
    let Some(id) = claim.id else {
        debug!(entity = %entity, "skipping claim without id");
        return None;
    };
    let datavalue = claim.mainsnak.and_then(|snak| snak.datavalue);
    Some(Statement::new(id, typed_value(datavalue)))
}

/// Maps a snak `datavalue` onto [`TypedValue`].
pub fn typed_value(datavalue: Option<Value>) -> TypedValue {
    let Some(Value::Object(mut data)) = datavalue else {
        return TypedValue::Absent;
    };

    if data.get("type").and_then(Value::as_str) == Some("wikibase-entityid") {
        return match data.get("value").and_then(reference_target) {
            Some(target) => TypedValue::Reference {
                target: EntityId::new(target),
            },
            None => TypedValue::Absent,
        };
    }

    match data.remove("value") {
        Some(raw) => TypedValue::Literal { raw },
        None => TypedValue::Literal {
            raw: Value::Object(data),
        },
    }
}

/// `id` of an entity-id value, falling back to `entity-type` + `numeric-id`.
fn reference_target(value: &Value) -> Option<String> {
    if let Some(id) = value.get("id").and_then(Value::as_str) {
        return Some(id.to_string());
    }
    let numeric = value.get("numeric-id").and_then(Value::as_u64)?;
    let prefix = match value.get("entity-type").and_then(Value::as_str)? {
        "item" => "Q",
        "property" => "P",
        "lexeme" => "L",
        _ => return None,
    };
    Some(format!("{}{}", prefix, numeric))
}

/// Decodes the response of a write action (`success: 1` expected).
pub fn decode_write(body: &Value, conflict_signal: &str) -> Result<()> {
    let envelope = parse_envelope(body)?;
    if let Some(err) = failure_of(&envelope, conflict_signal) {
        return Err(err);
    }
    let succeeded = match envelope.success {
        Some(Value::Bool(flag)) => flag,
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        Some(Value::String(s)) => s == "1",
        _ => false,
    };
    if succeeded {
        Ok(())
    } else {
        Err(SweepError::Unsuccessful("success != 1".to_string()))
    }
}
