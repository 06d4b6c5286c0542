//! Operation targets
//!
//! This module defines what a bridge call is aimed at:
//! - DatabaseDescriptor: `{ name, address, port }`
//! - CollectionDescriptor: `{ db: DatabaseDescriptor, name }`
//! - Target: either of the two, serialized without a tag

use serde::{Deserialize, Serialize};
use std::fmt;

/// A database as seen on the wire: its name plus the server it lives on.
///
/// The address and port are carried along so a backend can route the call;
/// the runtime never opens a connection itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatabaseDescriptor {
    /// Database name
    pub name: String,
    /// Server host name or address
    pub address: String,
    /// Server port
    pub port: u16,
}

impl DatabaseDescriptor {
    /// Create a new database descriptor
    pub fn new(name: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            port,
        }
    }

    /// Connection string for the server holding this database
    pub fn uri(&self) -> String {
        format!("mongodb://{}:{}/{}", self.address, self.port, self.name)
    }
}

impl fmt::Display for DatabaseDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.address, self.port, self.name)
    }
}

/// A collection as seen on the wire.
///
/// Identity is fully determined by `(db.name, name)` on a given server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionDescriptor {
    /// Owning database
    pub db: DatabaseDescriptor,
    /// Collection name
    pub name: String,
}

impl CollectionDescriptor {
    /// Create a new collection descriptor
    pub fn new(db: DatabaseDescriptor, name: impl Into<String>) -> Self {
        Self {
            db,
            name: name.into(),
        }
    }

    /// `database.collection` namespace string
    pub fn namespace(&self) -> String {
        format!("{}.{}", self.db.name, self.name)
    }
}

impl fmt::Display for CollectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.namespace())
    }
}

/// What a request is aimed at.
///
/// Serialized untagged: a collection target carries a `db` field, a database
/// target does not, which is enough to tell them apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Target {
    /// A single collection
    Collection(CollectionDescriptor),
    /// A whole database
    Database(DatabaseDescriptor),
}

impl Target {
    /// The database this target lives in
    pub fn database(&self) -> &DatabaseDescriptor {
        match self {
            Target::Collection(c) => &c.db,
            Target::Database(d) => d,
        }
    }

    /// The collection, if this is a collection target
    pub fn collection(&self) -> Option<&CollectionDescriptor> {
        match self {
            Target::Collection(c) => Some(c),
            Target::Database(_) => None,
        }
    }
}

impl From<CollectionDescriptor> for Target {
    fn from(c: CollectionDescriptor) -> Self {
        Target::Collection(c)
    }
}

impl From<DatabaseDescriptor> for Target {
    fn from(d: DatabaseDescriptor) -> Self {
        Target::Database(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn shop() -> DatabaseDescriptor {
        DatabaseDescriptor::new("shop", "127.0.0.1", 27017)
    }

    #[test]
    fn test_collection_descriptor_wire_shape() {
        let users = CollectionDescriptor::new(shop(), "users");
        let json = serde_json::to_value(&users).unwrap();
        assert_eq!(
            json,
            json!({
                "db": { "name": "shop", "address": "127.0.0.1", "port": 27017 },
                "name": "users"
            })
        );
    }

    #[test]
    fn test_target_untagged_roundtrip_keeps_kind() {
        let db_target: Target = shop().into();
        let coll_target: Target = CollectionDescriptor::new(shop(), "users").into();

        let db_back: Target =
            serde_json::from_value(serde_json::to_value(&db_target).unwrap()).unwrap();
        let coll_back: Target =
            serde_json::from_value(serde_json::to_value(&coll_target).unwrap()).unwrap();

        assert!(matches!(db_back, Target::Database(_)));
        assert!(matches!(coll_back, Target::Collection(_)));
        assert_eq!(coll_back.database(), &shop());
    }

    #[test]
    fn test_uri_and_namespace() {
        let users = CollectionDescriptor::new(shop(), "users");
        assert_eq!(users.db.uri(), "mongodb://127.0.0.1:27017/shop");
        assert_eq!(users.namespace(), "shop.users");
        assert_eq!(users.to_string(), "shop.users");
    }
}
