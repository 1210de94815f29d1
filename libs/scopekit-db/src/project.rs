//! Row materialization: prune scalar fields, batch-load nested associations
//! and overlay attachment URLs on the rows of one page.

use std::collections::BTreeSet;

use sea_orm::{DatabaseConnection, EntityTrait};
use serde_json::{Map, Value};
use thiserror::Error;

use scopekit::fields::ProjectionSpec;

use crate::descriptor::{NestedKind, ScopeDescriptor};

#[derive(Debug, Error)]
pub enum ProjectionError {
    /// A nested association's foreign key is not present on the projected
    /// row, usually because an explicit `fields_select` dropped it.
    #[error("missing required attribute: {0}")]
    MissingAttribute(String),

    /// A validated nested name has no loader registered. Indicates a
    /// descriptor whose selectable names and loader registry disagree.
    #[error("unknown nested association: {0}")]
    UnknownAssociation(String),

    /// A validated attachment name has no resolver registered.
    #[error("unknown attachment field: {0}")]
    UnknownAttachment(String),

    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),
}

/// Grouping key for a JSON foreign-key value. Strings key by content,
/// everything else by its JSON rendering, so numeric ids group as "7".
#[must_use]
pub fn json_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Shape one page of raw rows into response objects.
///
/// Scalar pruning runs first; nested loaders then read their foreign keys
/// off the pruned rows, so a projection that dropped the key fails with
/// [`ProjectionError::MissingAttribute`]. Attachment resolvers see the
/// unpruned row, since attachment state usually lives in fields the client
/// did not select.
///
/// # Errors
/// Fails on the first missing foreign key, a misregistered descriptor entry,
/// or a database error from a loader.
pub async fn shape_rows<E: EntityTrait>(
    db: &DatabaseConnection,
    descriptor: &ScopeDescriptor<E>,
    spec: &ProjectionSpec,
    rows: Vec<Value>,
) -> Result<Vec<Value>, ProjectionError> {
    let keep: BTreeSet<&str> = spec.scalar.iter().map(String::as_str).collect();

    let originals = rows;
    let mut shaped: Vec<Map<String, Value>> = Vec::with_capacity(originals.len());
    for row in &originals {
        let mut object = Map::new();
        if let Value::Object(map) = row {
            for (key, value) in map {
                if keep.contains(key.as_str()) {
                    object.insert(key.clone(), value.clone());
                }
            }
        }
        shaped.push(object);
    }

    for name in &spec.nested {
        let def = descriptor
            .nested_def(name)
            .ok_or_else(|| ProjectionError::UnknownAssociation(name.clone()))?;

        let mut keys = Vec::with_capacity(shaped.len());
        for object in &shaped {
            let key = object
                .get(&def.foreign_key)
                .ok_or_else(|| ProjectionError::MissingAttribute(def.foreign_key.clone()))?;
            keys.push(key.clone());
        }

        let loaded = def.loader.load(db, &keys).await?;
        for (object, key) in shaped.iter_mut().zip(&keys) {
            let related = loaded.get(&json_key(key)).cloned().unwrap_or_default();
            let value = match def.kind {
                NestedKind::One => related.into_iter().next().unwrap_or(Value::Null),
                NestedKind::Many => Value::Array(related),
            };
            object.insert(name.clone(), value);
        }
    }

    for name in &spec.attachments {
        let resolver = descriptor
            .attachment_resolver(name)
            .ok_or_else(|| ProjectionError::UnknownAttachment(name.clone()))?;
        for (object, original) in shaped.iter_mut().zip(&originals) {
            let url = resolver.url_for(original).map_or(Value::Null, Value::String);
            object.insert(format!("{name}_url"), url);
        }
    }

    Ok(shaped.into_iter().map(Value::Object).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_keys_group_numbers_and_strings() {
        assert_eq!(json_key(&json!(7)), "7");
        assert_eq!(json_key(&json!("7")), "7");
        assert_eq!(json_key(&Value::Null), "null");
    }
}
