//! MongoDB backend (feature `mongo`).
//!
//! Each request is executed with the driver's blocking API. Clients are cached
//! per `(address, port)` so switching databases with `use` does not reconnect.
//! Documents cross the boundary as relaxed extended JSON, so an identifier
//! wrapper `{ "$oid": "<24 hex>" }` becomes a real ObjectId on the server.

use bson::{Bson, Document as BsonDocument};
use mongodb::error::ErrorKind;
use mongodb::options::ReplaceOptions;
use mongodb::sync::{Client, Collection};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use docshell_core::{CollectionDescriptor, DatabaseDescriptor, Document, OpName, OpRequest};

use crate::backend::{Backend, CancelToken};
use crate::error::{BackendError, BackendResult};

/// Backend talking to a MongoDB server.
#[derive(Default)]
pub struct MongoBackend {
    clients: Mutex<HashMap<(String, u16), Client>>,
}

impl std::fmt::Debug for MongoBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoBackend")
            .field("clients", &self.clients.lock().len())
            .finish()
    }
}

impl MongoBackend {
    /// A backend with no open connections
    pub fn new() -> Self {
        Self::default()
    }

    fn client(&self, db: &DatabaseDescriptor) -> BackendResult<Client> {
        let key = (db.address.clone(), db.port);
        if let Some(client) = self.clients.lock().get(&key) {
            return Ok(client.clone());
        }
        let uri = format!("mongodb://{}:{}", db.address, db.port);
        debug!(%uri, "opening client");
        let client = Client::with_uri_str(&uri).map_err(driver_error)?;
        self.clients.lock().insert(key, client.clone());
        Ok(client)
    }

    fn collection(&self, coll: &CollectionDescriptor) -> BackendResult<Collection<BsonDocument>> {
        Ok(self
            .client(&coll.db)?
            .database(&coll.db.name)
            .collection::<BsonDocument>(&coll.name))
    }

    fn run_collection_op(
        &self,
        request: &OpRequest,
        cancel: &CancelToken,
    ) -> BackendResult<Document> {
        let target = request.collection_target()?;
        let coll = self.collection(target)?;

        match request.op {
            OpName::Find => {
                let filter = bson_doc(request.arg(0), "filter")?;
                let cursor = coll.find(filter, None).map_err(driver_error)?;
                drain(cursor, cancel)
            }
            OpName::InsertOne => {
                let doc = bson_doc(request.arg(0), "document")?;
                let res = coll.insert_one(doc, None).map_err(driver_error)?;
                Ok(json!({ "insertedId": res.inserted_id.into_relaxed_extjson() }))
            }
            OpName::InsertMany => {
                let docs = bson_docs(request.arg(0), "documents")?;
                let res = coll.insert_many(docs, None).map_err(driver_error)?;
                let ids: BTreeMap<usize, Bson> = res.inserted_ids.into_iter().collect();
                let ids: Map<String, Value> = ids
                    .into_iter()
                    .map(|(i, id)| (i.to_string(), id.into_relaxed_extjson()))
                    .collect();
                Ok(json!({ "insertedIds": ids }))
            }
            OpName::UpdateOne | OpName::UpdateMany => {
                let filter = bson_doc(request.arg(0), "filter")?;
                let update = bson_doc(request.arg(1), "update")?;
                let res = if request.op == OpName::UpdateOne {
                    coll.update_one(filter, update, None)
                } else {
                    coll.update_many(filter, update, None)
                }
                .map_err(driver_error)?;
                Ok(update_result(
                    res.matched_count,
                    res.modified_count,
                    res.upserted_id,
                ))
            }
            OpName::DeleteOne | OpName::DeleteMany => {
                let filter = bson_doc(request.arg(0), "filter")?;
                let res = if request.op == OpName::DeleteOne {
                    coll.delete_one(filter, None)
                } else {
                    coll.delete_many(filter, None)
                }
                .map_err(driver_error)?;
                Ok(json!({ "deletedCount": res.deleted_count }))
            }
            OpName::Aggregate => {
                let pipeline = bson_docs(request.arg(0), "pipeline")?;
                let cursor = coll.aggregate(pipeline, None).map_err(driver_error)?;
                drain(cursor, cancel)
            }
            OpName::Drop => {
                coll.drop(None).map_err(driver_error)?;
                Ok(Value::Bool(true))
            }
            OpName::Save => {
                let doc = bson_doc(request.arg(0), "document")?;
                match doc.get("_id").cloned() {
                    Some(id) => {
                        let options = ReplaceOptions::builder().upsert(true).build();
                        let res = coll
                            .replace_one(bson::doc! { "_id": id }, &doc, options)
                            .map_err(driver_error)?;
                        Ok(update_result(
                            res.matched_count,
                            res.modified_count,
                            res.upserted_id,
                        ))
                    }
                    None => {
                        let res = coll.insert_one(doc, None).map_err(driver_error)?;
                        Ok(json!({ "insertedId": res.inserted_id.into_relaxed_extjson() }))
                    }
                }
            }
            OpName::ListCollections | OpName::ListDatabases => {
                Err(BackendError::unsupported(request.op.as_str()))
            }
        }
    }
}

impl Backend for MongoBackend {
    fn name(&self) -> &str {
        "mongodb"
    }

    fn execute(&self, request: &OpRequest, cancel: &CancelToken) -> BackendResult<Document> {
        if cancel.is_cancelled() {
            return Err(BackendError::Cancelled);
        }
        request.validate()?;
        debug!(op = %request.op, target = %request.database_target(), "mongodb backend");

        match request.op {
            OpName::ListCollections => {
                let db = request.database_target();
                let mut names = self
                    .client(db)?
                    .database(&db.name)
                    .list_collection_names(None)
                    .map_err(driver_error)?;
                names.sort();
                Ok(json!(names))
            }
            OpName::ListDatabases => {
                let db = request.database_target();
                let mut names = self
                    .client(db)?
                    .list_database_names(None, None)
                    .map_err(driver_error)?;
                names.sort();
                Ok(json!(names))
            }
            _ => self.run_collection_op(request, cancel),
        }
    }
}

fn driver_error(err: mongodb::error::Error) -> BackendError {
    match err.kind.as_ref() {
        ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) | ErrorKind::DnsResolve { .. } => {
            warn!(error = %err, "mongodb unreachable");
            BackendError::Connection {
                reason: err.to_string(),
            }
        }
        _ => BackendError::rejected(err.to_string()),
    }
}

fn bson_doc(arg: Option<&Value>, what: &str) -> BackendResult<BsonDocument> {
    match arg {
        Some(Value::Object(map)) => BsonDocument::try_from(map.clone())
            .map_err(|e| BackendError::rejected(format!("invalid {}: {}", what, e))),
        _ => Err(BackendError::rejected(format!("{} must be an object", what))),
    }
}

fn bson_docs(arg: Option<&Value>, what: &str) -> BackendResult<Vec<BsonDocument>> {
    let items = arg
        .and_then(Value::as_array)
        .ok_or_else(|| BackendError::rejected(format!("{} must be an array", what)))?;
    items.iter().map(|item| bson_doc(Some(item), what)).collect()
}

fn drain(cursor: mongodb::sync::Cursor<BsonDocument>, cancel: &CancelToken) -> BackendResult<Document> {
    let mut out = Vec::new();
    for doc in cursor {
        if cancel.is_cancelled() {
            return Err(BackendError::Cancelled);
        }
        out.push(Bson::Document(doc.map_err(driver_error)?).into_relaxed_extjson());
    }
    Ok(Value::Array(out))
}

fn update_result(matched: u64, modified: u64, upserted: Option<Bson>) -> Document {
    json!({
        "matchedCount": matched,
        "modifiedCount": modified,
        "upsertedId": upserted.map(Bson::into_relaxed_extjson),
    })
}
