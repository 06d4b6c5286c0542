//! Database and collection handles.
//!
//! Handles are plain values: a descriptor and nothing else. They hold no
//! connection and no reference to the session, so they can be cloned, stored
//! and compared freely. Every operation takes the bridge explicitly and turns
//! into exactly one [`OpRequest`].
//!
//! ## Member resolution on `db`
//!
//! | Name | Resolves to |
//! |------|-------------|
//! | `name`, `address`, `port` | the handle's own data |
//! | `listCollections`, `getCollection`, `getName` | the handle's own methods |
//! | anything else | a collection handle with that name |

use serde::Serialize;
use std::fmt;

use docshell_core::{CollectionDescriptor, DatabaseDescriptor, Document, OpName, OpRequest};

use crate::bridge::OperationBridge;
use crate::Result;

/// The currently selected database, as seen by a script.
///
/// Rebuilt from session state on every read of `db`, so it always reflects
/// the latest `use`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DatabaseHandle {
    descriptor: DatabaseDescriptor,
}

/// What a property name on a [`DatabaseHandle`] resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbMember {
    /// `db.name`
    Name,
    /// `db.address`
    Address,
    /// `db.port`
    Port,
    /// `db.listCollections`
    ListCollections,
    /// `db.listDatabases`
    ListDatabases,
    /// `db.getCollection`
    GetCollection,
    /// `db.getName`
    GetName,
    /// Any other name: a collection in this database
    Collection(CollectionHandle),
}

impl DatabaseHandle {
    /// Member names that never resolve to a collection.
    pub const RESERVED: [&'static str; 7] = [
        "name",
        "address",
        "port",
        "listCollections",
        "listDatabases",
        "getCollection",
        "getName",
    ];

    /// Wrap a descriptor
    pub fn new(descriptor: DatabaseDescriptor) -> Self {
        Self { descriptor }
    }

    /// Whether `name` is one of the handle's own members
    pub fn is_reserved(name: &str) -> bool {
        Self::RESERVED.contains(&name)
    }

    /// Resolve a property name. Own members win; anything else is a collection.
    pub fn resolve(&self, name: &str) -> DbMember {
        match name {
            "name" => DbMember::Name,
            "address" => DbMember::Address,
            "port" => DbMember::Port,
            "listCollections" => DbMember::ListCollections,
            "listDatabases" => DbMember::ListDatabases,
            "getCollection" => DbMember::GetCollection,
            "getName" => DbMember::GetName,
            other => DbMember::Collection(self.collection(other)),
        }
    }

    /// Collection handle for `name`, reserved or not.
    ///
    /// This is the always-available spelling of dynamic resolution
    /// (`db.getCollection("name")`).
    pub fn collection(&self, name: &str) -> CollectionHandle {
        CollectionHandle::new(self.descriptor.clone(), name)
    }

    /// Database name
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Server address
    pub fn address(&self) -> &str {
        &self.descriptor.address
    }

    /// Server port
    pub fn port(&self) -> u16 {
        self.descriptor.port
    }

    /// Wire descriptor
    pub fn descriptor(&self) -> &DatabaseDescriptor {
        &self.descriptor
    }

    /// Names of the collections in this database, as the backend returns them
    pub fn list_collections(&self, bridge: &OperationBridge) -> Result<Document> {
        bridge.invoke(OpRequest::database(
            OpName::ListCollections,
            self.descriptor.clone(),
        ))
    }

    /// Names of the databases on this database's server
    pub fn list_databases(&self, bridge: &OperationBridge) -> Result<Document> {
        bridge.invoke(OpRequest::database(
            OpName::ListDatabases,
            self.descriptor.clone(),
        ))
    }
}

impl fmt::Display for DatabaseHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.descriptor.name)
    }
}

/// A named collection inside a database. Identity is `(database, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CollectionHandle {
    descriptor: CollectionDescriptor,
}

impl CollectionHandle {
    /// Handle for `name` in `db`
    pub fn new(db: DatabaseDescriptor, name: &str) -> Self {
        Self {
            descriptor: CollectionDescriptor::new(db, name),
        }
    }

    /// Collection name
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Owning database name
    pub fn database_name(&self) -> &str {
        &self.descriptor.db.name
    }

    /// Handle on the owning database
    pub fn database(&self) -> DatabaseHandle {
        DatabaseHandle::new(self.descriptor.db.clone())
    }

    /// Wire descriptor
    pub fn descriptor(&self) -> &CollectionDescriptor {
        &self.descriptor
    }

    /// `database.collection`
    pub fn namespace(&self) -> String {
        self.descriptor.namespace()
    }

    /// The request an operation on this handle produces
    pub fn request(&self, op: OpName, args: Vec<Document>) -> OpRequest {
        OpRequest::collection(op, self.descriptor.clone(), args)
    }

    fn call(&self, bridge: &OperationBridge, op: OpName, args: Vec<Document>) -> Result<Document> {
        bridge.invoke(self.request(op, args))
    }

    /// Matching documents. Pass `{}` for all.
    pub fn find(&self, bridge: &OperationBridge, filter: Document) -> Result<Document> {
        self.call(bridge, OpName::Find, vec![filter])
    }

    /// Insert one document
    pub fn insert_one(&self, bridge: &OperationBridge, doc: Document) -> Result<Document> {
        self.call(bridge, OpName::InsertOne, vec![doc])
    }

    /// Insert a sequence of documents
    pub fn insert_many(&self, bridge: &OperationBridge, docs: Document) -> Result<Document> {
        self.call(bridge, OpName::InsertMany, vec![docs])
    }

    /// Update the first match
    pub fn update_one(
        &self,
        bridge: &OperationBridge,
        filter: Document,
        update: Document,
    ) -> Result<Document> {
        self.call(bridge, OpName::UpdateOne, vec![filter, update])
    }

    /// Update every match
    pub fn update_many(
        &self,
        bridge: &OperationBridge,
        filter: Document,
        update: Document,
    ) -> Result<Document> {
        self.call(bridge, OpName::UpdateMany, vec![filter, update])
    }

    /// Delete the first match
    pub fn delete_one(&self, bridge: &OperationBridge, filter: Document) -> Result<Document> {
        self.call(bridge, OpName::DeleteOne, vec![filter])
    }

    /// Delete every match
    pub fn delete_many(&self, bridge: &OperationBridge, filter: Document) -> Result<Document> {
        self.call(bridge, OpName::DeleteMany, vec![filter])
    }

    /// Run an aggregation pipeline
    pub fn aggregate(&self, bridge: &OperationBridge, pipeline: Document) -> Result<Document> {
        self.call(bridge, OpName::Aggregate, vec![pipeline])
    }

    /// Drop the collection
    pub fn drop(&self, bridge: &OperationBridge) -> Result<Document> {
        self.call(bridge, OpName::Drop, Vec::new())
    }

    /// Insert, or replace the document with the same `_id`
    pub fn save(&self, bridge: &OperationBridge, doc: Document) -> Result<Document> {
        self.call(bridge, OpName::Save, vec![doc])
    }
}

impl fmt::Display for CollectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.descriptor.namespace())
    }
}
