// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Turns whatever the environment's REST proxy returned for a collection into
//! a flat list of items.
//!
//! Shapes are tried in a fixed order:
//!
//! 1. array: `[{..}, ..]` or `{"<collection>": [{..}, ..], ..}`
//! 2. keyed object: `{"<collection>": {"<id>": ..}}` or `{"<id>": {..}, ..}`
//! 3. bare scalar map, variables only: `{"<key>": "<value>", ..}`
//!
//! Anything else is a [`AdminError::ResponseShape`].

use serde_json::{Map, Value};

use crate::errors::{AdminError, Result};
use crate::models::{Collection, ConfigurationItem, Connection, Variable};

pub fn normalize(collection: Collection, body: &Value) -> Result<Vec<ConfigurationItem>> {
    match body {
        Value::Array(items) => from_array(collection, items),
        // a scalar under the collection key is just another variable
        Value::Object(map) => match map.get(collection.response_key()) {
            Some(Value::Array(items)) => from_array(collection, items),
            Some(Value::Object(keyed)) => from_keyed(collection, keyed),
            None if map.values().all(Value::is_object) => from_keyed(collection, map),
            _ if collection == Collection::Variables && map.values().all(is_scalar) => Ok(map
                .iter()
                .map(|(key, value)| {
                    ConfigurationItem::Variable(Variable::new(key.clone(), value.clone()))
                })
                .collect()),
            Some(Value::Null) => Ok(Vec::new()),
            Some(other) => Err(AdminError::response_shape(format!(
                "'{}' holds a {}, expected a list or an object",
                collection.response_key(),
                kind(other)
            ))),
            None => Err(AdminError::response_shape(format!(
                "unrecognized {collection} object"
            ))),
        },
        other => Err(AdminError::response_shape(format!(
            "expected {collection} as a list or an object, got a {}",
            kind(other)
        ))),
    }
}

fn from_array(collection: Collection, items: &[Value]) -> Result<Vec<ConfigurationItem>> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(fields) => item_from_fields(collection, None, fields),
            other => Err(AdminError::response_shape(format!(
                "{collection} entry {index} is a {}, expected an object",
                kind(other)
            ))),
        })
        .collect()
}

fn from_keyed(collection: Collection, keyed: &Map<String, Value>) -> Result<Vec<ConfigurationItem>> {
    keyed
        .iter()
        .map(|(id, entry)| match (collection, entry) {
            (_, Value::Object(fields)) => item_from_fields(collection, Some(id), fields),
            (Collection::Variables, scalar) => Ok(ConfigurationItem::Variable(Variable::new(
                id.clone(),
                scalar.clone(),
            ))),
            (Collection::Connections, other) => Err(AdminError::response_shape(format!(
                "connection {id} is a {}, expected an object",
                kind(other)
            ))),
        })
        .collect()
}

/// Builds one item from its JSON fields; `id` is the map key in the keyed
/// shape and fills in a missing identifier.
fn item_from_fields(
    collection: Collection,
    id: Option<&str>,
    fields: &Map<String, Value>,
) -> Result<ConfigurationItem> {
    match collection {
        Collection::Variables => {
            let key = fields
                .get("key")
                .and_then(Value::as_str)
                .or(id)
                .ok_or_else(|| AdminError::response_shape("variable entry without a key"))?;

            // keyed entries without a "value" field are the value themselves
            let value = match (fields.get("value"), id) {
                (Some(value), _) => value.clone(),
                (None, Some(_)) => Value::Object(fields.clone()),
                (None, None) => Value::Null,
            };

            Ok(ConfigurationItem::Variable(Variable {
                key: key.to_string(),
                value,
                description: fields
                    .get("description")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }))
        }
        Collection::Connections => {
            let mut fields = fields.clone();
            // both spellings at once would be a duplicate field, conn_id wins
            if fields.contains_key("conn_id") {
                fields.remove("connection_id");
            }
            if let Some(id) = id
                && !fields.contains_key("conn_id")
                && !fields.contains_key("connection_id")
            {
                fields.insert("conn_id".to_string(), Value::String(id.to_string()));
            }

            serde_json::from_value::<Connection>(Value::Object(fields))
                .map(ConfigurationItem::Connection)
                .map_err(|e| AdminError::response_shape(format!("invalid connection entry: {e}")))
        }
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
