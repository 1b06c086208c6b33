//! EIP-712 envelopes as returned by the relay, and the signing payload derived
//! from them.
//!
//! The relay decorates every object it returns with a `__typename`
//! discriminator. That field is not part of any signing schema: the payload
//! handed to a signer is rebuilt from the declared schema instead of being a
//! copy of the relay response, so the discriminator cannot leak into it.

use std::{collections::BTreeMap, str::FromStr};

use alloy::primitives::{Address, Bytes, U256};
use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Reserved GraphQL discriminator attached to every relay object.
pub const TYPENAME_FIELD: &str = "__typename";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TypedDataError {
    #[error("Cannot determine primary type from schema {0:?}")]
    AmbiguousPrimaryType(Vec<String>),
    #[error("Field {field} declared by {type_name} is missing from the value")]
    MissingField { type_name: String, field: String },
    #[error("Field {field} of type {kind} has an unexpected shape")]
    UnexpectedShape { field: String, kind: String },
    #[error("Value has no valid deadline")]
    MissingDeadline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataDomain {
    pub name: String,
    pub chain_id: u64,
    pub version: String,
    pub verifying_contract: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedDataField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Message name to ordered field list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TypeSchema(BTreeMap<String, Vec<TypedDataField>>);

impl TypeSchema {
    pub fn new(types: BTreeMap<String, Vec<TypedDataField>>) -> Self {
        Self(types)
    }

    pub fn fields(&self, type_name: &str) -> Option<&[TypedDataField]> {
        self.0.get(type_name).map(Vec::as_slice)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.0.contains_key(type_name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// The single declared type that no other declared type references.
    pub fn primary_type(&self) -> Result<&str, TypedDataError> {
        let referenced: Vec<&str> = self
            .0
            .values()
            .flatten()
            .map(|field| base_type(&field.kind))
            .collect();

        let roots: Vec<&str> = self
            .type_names()
            .filter(|name| !referenced.contains(name))
            .collect();

        match roots.as_slice() {
            [primary] => Ok(*primary),
            _ => Err(TypedDataError::AmbiguousPrimaryType(
                roots.iter().map(|r| r.to_string()).collect(),
            )),
        }
    }
}

impl<'de> Deserialize<'de> for TypeSchema {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Map::<String, Value>::deserialize(deserializer)?;
        let mut types = BTreeMap::new();

        for (name, fields) in raw {
            if name == TYPENAME_FIELD {
                continue;
            }
            let fields: Vec<TypedDataField> =
                serde_json::from_value(fields).map_err(de::Error::custom)?;
            types.insert(name, fields);
        }

        Ok(Self(types))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TypedData {
    pub domain: TypedDataDomain,
    pub types: TypeSchema,
    pub value: Map<String, Value>,
}

impl TypedData {
    pub fn deadline(&self) -> Result<U256, TypedDataError> {
        self.value
            .get("deadline")
            .and_then(parse_uint)
            .ok_or(TypedDataError::MissingDeadline)
    }

    /// Rebuild the message from the schema, copying only declared fields.
    pub fn signing_payload(&self) -> Result<SigningPayload, TypedDataError> {
        let primary_type = self.types.primary_type()?.to_string();
        let message = project_struct(&self.types, &primary_type, &self.value)?;

        Ok(SigningPayload {
            domain: self.domain.clone(),
            types: self.types.clone(),
            primary_type,
            message,
        })
    }

    pub fn decode_value<T>(&self) -> Result<T, serde_json::Error>
    where
        T: for<'de> Deserialize<'de>,
    {
        serde_json::from_value(Value::Object(self.value.clone()))
    }
}

/// Typed data envelope prepared by the relay for one action.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataEnvelope {
    #[serde(default)]
    pub id: String,
    /// Raw `expiresAt` as sent by the relay. Kept unparsed so a malformed
    /// timestamp does not reject the whole envelope.
    #[serde(default)]
    pub expires_at: Option<String>,
    pub typed_data: TypedData,
}

impl TypedDataEnvelope {
    /// RFC 3339 expiry, if present and parseable.
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.expires_at
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|expiry| expiry.with_timezone(&Utc))
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry().is_some_and(|expires_at| expires_at <= now)
    }
}

/// Exactly what the signer sees. Serializes to the standard
/// `{domain, types, primaryType, message}` JSON shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningPayload {
    pub domain: TypedDataDomain,
    pub types: TypeSchema,
    pub primary_type: String,
    pub message: Map<String, Value>,
}

fn base_type(kind: &str) -> &str {
    kind.find('[').map_or(kind, |idx| &kind[..idx])
}

fn project_struct(
    types: &TypeSchema,
    type_name: &str,
    value: &Map<String, Value>,
) -> Result<Map<String, Value>, TypedDataError> {
    let mut projected = Map::new();

    for field in types.fields(type_name).unwrap_or_default() {
        let item = value
            .get(&field.name)
            .ok_or_else(|| TypedDataError::MissingField {
                type_name: type_name.to_string(),
                field: field.name.clone(),
            })?;
        projected.insert(
            field.name.clone(),
            project_value(types, &field.name, &field.kind, item)?,
        );
    }

    Ok(projected)
}

fn project_value(
    types: &TypeSchema,
    field: &str,
    kind: &str,
    value: &Value,
) -> Result<Value, TypedDataError> {
    let unexpected = || TypedDataError::UnexpectedShape {
        field: field.to_string(),
        kind: kind.to_string(),
    };

    if let Some(element_kind) = kind.strip_suffix(']').and_then(|k| k.rfind('[').map(|i| &k[..i])) {
        let items = value.as_array().ok_or_else(unexpected)?;
        return items
            .iter()
            .map(|item| project_value(types, field, element_kind, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array);
    }

    if types.contains(kind) {
        let nested = value.as_object().ok_or_else(unexpected)?;
        return project_struct(types, kind, nested).map(Value::Object);
    }

    // Atomic EIP-712 types are never JSON objects.
    if value.is_object() {
        return Err(unexpected());
    }

    Ok(value.clone())
}

/// Parses a uint from either a JSON number or a decimal/hex string.
pub fn parse_uint(value: &Value) -> Option<U256> {
    match value {
        Value::Number(n) => n.as_u64().map(U256::from),
        Value::String(s) => U256::from_str(s).ok(),
        _ => None,
    }
}

/// uint256 that the relay may encode as number, decimal string or hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uint(pub U256);

impl<'de> Deserialize<'de> for Uint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        parse_uint(&value)
            .map(Uint)
            .ok_or_else(|| de::Error::custom(format!("invalid uint value: {}", value)))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowWithSigValue {
    pub profile_ids: Vec<Uint>,
    pub datas: Vec<Bytes>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnWithSigValue {
    pub token_id: Uint,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostWithSigValue {
    pub profile_id: Uint,
    #[serde(rename = "contentURI")]
    pub content_uri: String,
    pub collect_module: Address,
    pub collect_module_data: Bytes,
    pub reference_module: Address,
    pub reference_module_data: Bytes,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectWithSigValue {
    pub profile_id: Uint,
    pub pub_id: Uint,
    pub data: Bytes,
}
