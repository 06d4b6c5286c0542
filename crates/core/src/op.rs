//! Operation names and requests.
//!
//! Operations are the "instruction set" of the bridge. Every call a script can
//! make against a backend is one [`OpRequest`]: an [`OpName`], a [`Target`] and
//! the call's arguments, already converted to JSON documents.
//!
//! Requests are:
//! - **Self-contained**: everything the backend needs travels in the request
//! - **Serializable**: `{ "op": "insert_one", "target": {...}, "args": [...] }`
//! - **Shape-agnostic**: arguments are never inspected here, only counted

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::document::Document;
use crate::error::{CoreError, CoreResult};
use crate::types::{CollectionDescriptor, DatabaseDescriptor, Target};

/// Every operation the bridge knows how to forward.
///
/// | Op | Target | Args |
/// |----|--------|------|
/// | `find` | collection | filter |
/// | `insert_one` | collection | document |
/// | `insert_many` | collection | documents |
/// | `update_one` / `update_many` | collection | filter, update |
/// | `delete_one` / `delete_many` | collection | filter |
/// | `aggregate` | collection | pipeline |
/// | `drop` | collection | - |
/// | `save` | collection | document |
/// | `list_collections` | database | - |
/// | `list_databases` | database | - |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpName {
    /// Query documents
    Find,
    /// Insert one document
    InsertOne,
    /// Insert a sequence of documents
    InsertMany,
    /// Update the first matching document
    UpdateOne,
    /// Update all matching documents
    UpdateMany,
    /// Delete the first matching document
    DeleteOne,
    /// Delete all matching documents
    DeleteMany,
    /// Run an aggregation pipeline
    Aggregate,
    /// Drop the collection
    Drop,
    /// Insert, or replace by `_id`
    Save,
    /// Names of the collections in a database
    ListCollections,
    /// Names of the databases on the server
    ListDatabases,
}

impl OpName {
    /// All operations, in bridge registration order
    pub const ALL: [OpName; 12] = [
        OpName::Find,
        OpName::InsertOne,
        OpName::InsertMany,
        OpName::UpdateOne,
        OpName::UpdateMany,
        OpName::DeleteOne,
        OpName::DeleteMany,
        OpName::Aggregate,
        OpName::Drop,
        OpName::Save,
        OpName::ListCollections,
        OpName::ListDatabases,
    ];

    /// Wire name (`"insert_one"`)
    pub fn as_str(&self) -> &'static str {
        match self {
            OpName::Find => "find",
            OpName::InsertOne => "insert_one",
            OpName::InsertMany => "insert_many",
            OpName::UpdateOne => "update_one",
            OpName::UpdateMany => "update_many",
            OpName::DeleteOne => "delete_one",
            OpName::DeleteMany => "delete_many",
            OpName::Aggregate => "aggregate",
            OpName::Drop => "drop",
            OpName::Save => "save",
            OpName::ListCollections => "list_collections",
            OpName::ListDatabases => "list_databases",
        }
    }

    /// Bridge function name (`"op_insert_one"`)
    pub fn bridge_name(&self) -> String {
        format!("op_{}", self.as_str())
    }

    /// Number of arguments following the target
    pub fn arity(&self) -> usize {
        match self {
            OpName::UpdateOne | OpName::UpdateMany => 2,
            OpName::Drop | OpName::ListCollections | OpName::ListDatabases => 0,
            _ => 1,
        }
    }

    /// Whether the op is aimed at a database rather than a collection
    pub fn targets_database(&self) -> bool {
        matches!(self, OpName::ListCollections | OpName::ListDatabases)
    }

    /// Whether the op can change data
    pub fn is_write(&self) -> bool {
        !matches!(
            self,
            OpName::Find | OpName::Aggregate | OpName::ListCollections | OpName::ListDatabases
        )
    }
}

impl fmt::Display for OpName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpName {
    type Err = CoreError;

    /// Accepts both the wire name and the bridge name (`find` / `op_find`).
    fn from_str(s: &str) -> CoreResult<Self> {
        let bare = s.strip_prefix("op_").unwrap_or(s);
        OpName::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == bare)
            .ok_or_else(|| CoreError::UnknownOp {
                name: s.to_string(),
            })
    }
}

/// One call crossing the operation bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpRequest {
    /// Operation to run
    pub op: OpName,
    /// Collection or database the op is aimed at
    pub target: Target,
    /// Arguments, in call order
    #[serde(default)]
    pub args: Vec<Document>,
}

impl OpRequest {
    /// Build a collection-level request
    pub fn collection(op: OpName, collection: CollectionDescriptor, args: Vec<Document>) -> Self {
        Self {
            op,
            target: Target::Collection(collection),
            args,
        }
    }

    /// Build a database-level request (no arguments)
    pub fn database(op: OpName, database: DatabaseDescriptor) -> Self {
        Self {
            op,
            target: Target::Database(database),
            args: Vec::new(),
        }
    }

    /// Check the request against the contract: target kind and argument count.
    ///
    /// Argument contents are not looked at.
    pub fn validate(&self) -> CoreResult<()> {
        match (&self.target, self.op.targets_database()) {
            (Target::Database(_), false) => {
                return Err(CoreError::TargetMismatch {
                    op: self.op,
                    expected: "collection",
                })
            }
            (Target::Collection(_), true) => {
                return Err(CoreError::TargetMismatch {
                    op: self.op,
                    expected: "database",
                })
            }
            _ => {}
        }
        if self.args.len() != self.op.arity() {
            return Err(CoreError::Arity {
                op: self.op,
                expected: self.op.arity(),
                actual: self.args.len(),
            });
        }
        Ok(())
    }

    /// Argument at `index`
    pub fn arg(&self, index: usize) -> Option<&Document> {
        self.args.get(index)
    }

    /// The collection target, or a mismatch error for database-level requests
    pub fn collection_target(&self) -> CoreResult<&CollectionDescriptor> {
        self.target.collection().ok_or(CoreError::TargetMismatch {
            op: self.op,
            expected: "collection",
        })
    }

    /// The database the request touches (for collection targets, the owner)
    pub fn database_target(&self) -> &DatabaseDescriptor {
        self.target.database()
    }

    /// Encode as a JSON string
    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from a JSON string
    pub fn from_json(s: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn users() -> CollectionDescriptor {
        CollectionDescriptor::new(DatabaseDescriptor::new("shop", "127.0.0.1", 27017), "users")
    }

    #[test]
    fn test_op_names_parse_both_forms() {
        for op in OpName::ALL {
            assert_eq!(op.as_str().parse::<OpName>().unwrap(), op);
            assert_eq!(op.bridge_name().parse::<OpName>().unwrap(), op);
        }
        assert!(matches!(
            "op_explode".parse::<OpName>(),
            Err(CoreError::UnknownOp { .. })
        ));
    }

    #[test]
    fn test_serde_name_matches_as_str() {
        for op in OpName::ALL {
            let json = serde_json::to_value(op).unwrap();
            assert_eq!(json, json!(op.as_str()));
        }
    }

    #[test]
    fn test_request_wire_shape() {
        let req = OpRequest::collection(OpName::InsertOne, users(), vec![json!({"name": "a"})]);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            json!({
                "op": "insert_one",
                "target": {
                    "db": { "name": "shop", "address": "127.0.0.1", "port": 27017 },
                    "name": "users"
                },
                "args": [{ "name": "a" }]
            })
        );
        assert_eq!(OpRequest::from_json(&req.to_json().unwrap()).unwrap(), req);
    }

    #[test]
    fn test_validate_arity() {
        let req = OpRequest::collection(OpName::UpdateOne, users(), vec![json!({})]);
        assert!(matches!(
            req.validate(),
            Err(CoreError::Arity {
                expected: 2,
                actual: 1,
                ..
            })
        ));

        let req = OpRequest::collection(OpName::Drop, users(), vec![]);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_validate_target_kind() {
        let req = OpRequest::database(OpName::Find, users().db);
        assert!(matches!(
            req.validate(),
            Err(CoreError::TargetMismatch {
                expected: "collection",
                ..
            })
        ));

        let req = OpRequest::collection(OpName::ListCollections, users(), vec![]);
        assert!(matches!(
            req.validate(),
            Err(CoreError::TargetMismatch {
                expected: "database",
                ..
            })
        ));

        let req = OpRequest::database(OpName::ListCollections, users().db);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_database_target_of_collection_request() {
        let req = OpRequest::collection(OpName::Drop, users(), vec![]);
        assert_eq!(req.database_target().name, "shop");
        assert_eq!(req.collection_target().unwrap().name, "users");
    }

    #[test]
    fn test_write_classification() {
        assert!(!OpName::Find.is_write());
        assert!(!OpName::ListDatabases.is_write());
        assert!(OpName::Save.is_write());
        assert!(OpName::Drop.is_write());
    }
}
