//! In-process document store.
//!
//! `MemoryBackend` behaves like a single small server: databases and
//! collections spring into existence on first insert, `drop` removes them, and
//! every result uses the same field names as the MongoDB backend. The target's
//! address and port are ignored.
//!
//! Used by the test suites and by `docshell --memory`.

mod aggregate;
mod matcher;
mod path;
mod update;

use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

use docshell_core::{object_id, CollectionDescriptor, Document, OpName, OpRequest};

use crate::backend::{Backend, CancelToken};
use crate::error::{BackendError, BackendResult};
use path::values_equal;

type Doc = Map<String, Value>;
type Collections = BTreeMap<String, Vec<Doc>>;

/// Thread-safe in-memory backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    databases: RwLock<BTreeMap<String, Collections>>,
}

impl MemoryBackend {
    /// An empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every document in `db.collection`, in insertion order
    pub fn documents(&self, db: &str, collection: &str) -> Vec<Document> {
        self.databases
            .read()
            .get(db)
            .and_then(|colls| colls.get(collection))
            .map(|docs| docs.iter().cloned().map(Value::Object).collect())
            .unwrap_or_default()
    }

    fn find(&self, coll: &CollectionDescriptor, filter: &Doc) -> BackendResult<Document> {
        let dbs = self.databases.read();
        let mut out = Vec::new();
        if let Some(docs) = dbs.get(&coll.db.name).and_then(|c| c.get(&coll.name)) {
            for doc in docs {
                if matcher::matches(doc, filter)? {
                    out.push(Value::Object(doc.clone()));
                }
            }
        }
        Ok(Value::Array(out))
    }

    fn insert(&self, coll: &CollectionDescriptor, docs: Vec<Doc>) -> BackendResult<Vec<Value>> {
        let mut dbs = self.databases.write();
        let target = dbs
            .entry(coll.db.name.clone())
            .or_default()
            .entry(coll.name.clone())
            .or_default();

        let mut prepared = Vec::with_capacity(docs.len());
        let mut ids: Vec<Value> = Vec::with_capacity(docs.len());
        for mut doc in docs {
            let id = doc
                .entry("_id".to_string())
                .or_insert_with(generate_id)
                .clone();
            let clash = target
                .iter()
                .filter_map(|d| d.get("_id"))
                .chain(ids.iter())
                .any(|existing| values_equal(existing, &id));
            if clash {
                return Err(BackendError::rejected(format!(
                    "E11000 duplicate key error collection: {} dup key: {{ _id: {} }}",
                    coll.namespace(),
                    id
                )));
            }
            ids.push(id);
            prepared.push(doc);
        }
        target.extend(prepared);
        Ok(ids)
    }

    fn update(
        &self,
        coll: &CollectionDescriptor,
        filter: &Doc,
        spec: &Doc,
        multi: bool,
    ) -> BackendResult<Document> {
        update::validate(spec)?;
        let mut dbs = self.databases.write();
        let mut matched = 0u64;
        let mut modified = 0u64;
        if let Some(docs) = dbs.get_mut(&coll.db.name).and_then(|c| c.get_mut(&coll.name)) {
            for doc in docs.iter_mut() {
                if !matcher::matches(doc, filter)? {
                    continue;
                }
                matched += 1;
                let mut candidate = doc.clone();
                if update::apply(&mut candidate, spec)? {
                    *doc = candidate;
                    modified += 1;
                }
                if !multi {
                    break;
                }
            }
        }
        Ok(json!({
            "matchedCount": matched,
            "modifiedCount": modified,
            "upsertedId": null,
        }))
    }

    fn delete(&self, coll: &CollectionDescriptor, filter: &Doc, multi: bool) -> BackendResult<Document> {
        let mut dbs = self.databases.write();
        let mut deleted = 0u64;
        if let Some(docs) = dbs.get_mut(&coll.db.name).and_then(|c| c.get_mut(&coll.name)) {
            // decide first so a filter error leaves the collection untouched
            let mut doomed = vec![false; docs.len()];
            for (slot, doc) in doomed.iter_mut().zip(docs.iter()) {
                if matcher::matches(doc, filter)? {
                    *slot = true;
                    deleted += 1;
                    if !multi {
                        break;
                    }
                }
            }
            let mut flags = doomed.into_iter();
            docs.retain(|_| !flags.next().unwrap_or(false));
        }
        Ok(json!({ "deletedCount": deleted }))
    }

    fn aggregate(&self, coll: &CollectionDescriptor, pipeline: &[Value]) -> BackendResult<Document> {
        let docs = {
            let dbs = self.databases.read();
            dbs.get(&coll.db.name)
                .and_then(|c| c.get(&coll.name))
                .cloned()
                .unwrap_or_default()
        };
        let out = aggregate::run(docs, pipeline)?;
        Ok(Value::Array(out.into_iter().map(Value::Object).collect()))
    }

    fn drop_collection(&self, coll: &CollectionDescriptor) -> Document {
        let mut dbs = self.databases.write();
        if let Some(colls) = dbs.get_mut(&coll.db.name) {
            colls.remove(&coll.name);
            if colls.is_empty() {
                dbs.remove(&coll.db.name);
            }
        }
        Value::Bool(true)
    }

    /// Replace by `_id` (inserting when nothing matches), or insert when there is no `_id`.
    fn save(&self, coll: &CollectionDescriptor, doc: Doc) -> BackendResult<Document> {
        let Some(id) = doc.get("_id").cloned() else {
            let ids = self.insert(coll, vec![doc])?;
            return Ok(json!({ "insertedId": ids.into_iter().next() }));
        };

        let mut dbs = self.databases.write();
        let docs = dbs
            .entry(coll.db.name.clone())
            .or_default()
            .entry(coll.name.clone())
            .or_default();
        match docs
            .iter_mut()
            .find(|d| d.get("_id").map_or(false, |v| values_equal(v, &id)))
        {
            Some(existing) => {
                let changed = !values_equal(&Value::Object(existing.clone()), &Value::Object(doc.clone()));
                *existing = doc;
                Ok(json!({
                    "matchedCount": 1,
                    "modifiedCount": u64::from(changed),
                    "upsertedId": null,
                }))
            }
            None => {
                docs.push(doc);
                Ok(json!({
                    "matchedCount": 0,
                    "modifiedCount": 0,
                    "upsertedId": id,
                }))
            }
        }
    }

    fn list_collections(&self, db: &str) -> Document {
        let dbs = self.databases.read();
        let names = dbs
            .get(db)
            .map(|colls| colls.keys().cloned().map(Value::String).collect())
            .unwrap_or_default();
        Value::Array(names)
    }

    fn list_databases(&self) -> Document {
        let dbs = self.databases.read();
        Value::Array(dbs.keys().cloned().map(Value::String).collect())
    }
}

impl Backend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn execute(&self, request: &OpRequest, cancel: &CancelToken) -> BackendResult<Document> {
        if cancel.is_cancelled() {
            return Err(BackendError::Cancelled);
        }
        request.validate()?;
        debug!(op = %request.op, target = %request.database_target(), "memory backend");

        match request.op {
            OpName::ListDatabases => return Ok(self.list_databases()),
            OpName::ListCollections => {
                return Ok(self.list_collections(&request.database_target().name))
            }
            _ => {}
        }

        let coll = request.collection_target()?;
        match request.op {
            OpName::Find => self.find(coll, object_arg(request, 0, "filter")?),
            OpName::InsertOne => {
                let doc = object_arg(request, 0, "document")?.clone();
                let ids = self.insert(coll, vec![doc])?;
                Ok(json!({ "insertedId": ids.into_iter().next() }))
            }
            OpName::InsertMany => {
                let docs = array_arg(request, 0, "documents")?
                    .iter()
                    .map(|d| {
                        d.as_object()
                            .cloned()
                            .ok_or_else(|| BackendError::rejected("documents must be objects"))
                    })
                    .collect::<BackendResult<Vec<_>>>()?;
                let ids = self.insert(coll, docs)?;
                let inserted: Map<String, Value> = ids
                    .into_iter()
                    .enumerate()
                    .map(|(i, id)| (i.to_string(), id))
                    .collect();
                Ok(json!({ "insertedIds": inserted }))
            }
            OpName::UpdateOne | OpName::UpdateMany => self.update(
                coll,
                object_arg(request, 0, "filter")?,
                object_arg(request, 1, "update")?,
                request.op == OpName::UpdateMany,
            ),
            OpName::DeleteOne | OpName::DeleteMany => self.delete(
                coll,
                object_arg(request, 0, "filter")?,
                request.op == OpName::DeleteMany,
            ),
            OpName::Aggregate => self.aggregate(coll, array_arg(request, 0, "pipeline")?),
            OpName::Drop => Ok(self.drop_collection(coll)),
            OpName::Save => self.save(coll, object_arg(request, 0, "document")?.clone()),
            OpName::ListCollections | OpName::ListDatabases => {
                Err(BackendError::unsupported(request.op.as_str()))
            }
        }
    }
}

fn object_arg<'a>(request: &'a OpRequest, index: usize, what: &str) -> BackendResult<&'a Doc> {
    request
        .arg(index)
        .and_then(Value::as_object)
        .ok_or_else(|| BackendError::rejected(format!("{} must be an object", what)))
}

fn array_arg<'a>(request: &'a OpRequest, index: usize, what: &str) -> BackendResult<&'a Vec<Value>> {
    request
        .arg(index)
        .and_then(Value::as_array)
        .ok_or_else(|| BackendError::rejected(format!("{} must be an array", what)))
}

fn generate_id() -> Value {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    object_id(&hex[..24])
}

#[cfg(test)]
mod tests {
    use super::*;
    use docshell_core::{as_object_id, DatabaseDescriptor};

    fn users() -> CollectionDescriptor {
        CollectionDescriptor::new(DatabaseDescriptor::new("shop", "127.0.0.1", 27017), "users")
    }

    fn call(backend: &MemoryBackend, op: OpName, args: Vec<Value>) -> BackendResult<Value> {
        backend.execute(&OpRequest::collection(op, users(), args), &CancelToken::new())
    }

    #[test]
    fn test_generated_id_shape() {
        let id = generate_id();
        let raw = as_object_id(&id).and_then(Value::as_str).unwrap();
        assert_eq!(raw.len(), 24);
        assert!(raw.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_insert_then_find() {
        let backend = MemoryBackend::new();
        let res = call(&backend, OpName::InsertOne, vec![json!({"name": "a"})]).unwrap();
        assert!(res["insertedId"].is_object());

        let found = call(&backend, OpName::Find, vec![json!({"name": "a"})]).unwrap();
        assert_eq!(found.as_array().unwrap().len(), 1);
        assert_eq!(found[0]["_id"], res["insertedId"]);
    }

    #[test]
    fn test_insert_keeps_given_id_and_rejects_duplicates() {
        let backend = MemoryBackend::new();
        let res = call(&backend, OpName::InsertOne, vec![json!({"_id": 7})]).unwrap();
        assert_eq!(res, json!({"insertedId": 7}));

        let err = call(&backend, OpName::InsertOne, vec![json!({"_id": 7.0})]).unwrap_err();
        assert!(err.to_string().contains("duplicate key"));
    }

    #[test]
    fn test_insert_many_is_all_or_nothing() {
        let backend = MemoryBackend::new();
        let err = call(
            &backend,
            OpName::InsertMany,
            vec![json!([{"_id": 1}, {"_id": 1}])],
        );
        assert!(err.is_err());
        assert!(backend.documents("shop", "users").is_empty());

        let res = call(&backend, OpName::InsertMany, vec![json!([{"_id": 1}, {"_id": 2}])]).unwrap();
        assert_eq!(res, json!({"insertedIds": {"0": 1, "1": 2}}));
    }

    #[test]
    fn test_update_one_vs_many() {
        let backend = MemoryBackend::new();
        call(&backend, OpName::InsertMany, vec![json!([{"k": 1}, {"k": 1}, {"k": 2}])]).unwrap();

        let one = call(
            &backend,
            OpName::UpdateOne,
            vec![json!({"k": 1}), json!({"$set": {"seen": true}})],
        )
        .unwrap();
        assert_eq!(one["matchedCount"], 1);
        assert_eq!(one["modifiedCount"], 1);

        let many = call(
            &backend,
            OpName::UpdateMany,
            vec![json!({"k": 1}), json!({"$set": {"seen": true}})],
        )
        .unwrap();
        assert_eq!(many["matchedCount"], 2);
        assert_eq!(many["modifiedCount"], 1);
        assert!(many["upsertedId"].is_null());
    }

    #[test]
    fn test_delete_one_vs_many() {
        let backend = MemoryBackend::new();
        call(&backend, OpName::InsertMany, vec![json!([{"k": 1}, {"k": 1}, {"k": 1}])]).unwrap();

        let one = call(&backend, OpName::DeleteOne, vec![json!({"k": 1})]).unwrap();
        assert_eq!(one, json!({"deletedCount": 1}));
        let many = call(&backend, OpName::DeleteMany, vec![json!({})]).unwrap();
        assert_eq!(many, json!({"deletedCount": 2}));
    }

    #[test]
    fn test_save_inserts_then_replaces() {
        let backend = MemoryBackend::new();
        let first = call(&backend, OpName::Save, vec![json!({"_id": "x", "v": 1})]).unwrap();
        assert_eq!(first["upsertedId"], "x");

        let second = call(&backend, OpName::Save, vec![json!({"_id": "x", "v": 2})]).unwrap();
        assert_eq!(second["matchedCount"], 1);
        assert_eq!(second["modifiedCount"], 1);
        assert_eq!(backend.documents("shop", "users"), vec![json!({"_id": "x", "v": 2})]);

        let no_id = call(&backend, OpName::Save, vec![json!({"v": 3})]).unwrap();
        assert!(no_id["insertedId"].is_object());
    }

    #[test]
    fn test_drop_and_listings() {
        let backend = MemoryBackend::new();
        call(&backend, OpName::InsertOne, vec![json!({})]).unwrap();
        let shop = users().db;

        let colls = backend
            .execute(&OpRequest::database(OpName::ListCollections, shop.clone()), &CancelToken::new())
            .unwrap();
        assert_eq!(colls, json!(["users"]));
        let dbs = backend
            .execute(&OpRequest::database(OpName::ListDatabases, shop.clone()), &CancelToken::new())
            .unwrap();
        assert_eq!(dbs, json!(["shop"]));

        assert_eq!(call(&backend, OpName::Drop, vec![]).unwrap(), json!(true));
        let colls = backend
            .execute(&OpRequest::database(OpName::ListCollections, shop), &CancelToken::new())
            .unwrap();
        assert_eq!(colls, json!([]));
    }

    #[test]
    fn test_cancelled_token_short_circuits() {
        let backend = MemoryBackend::new();
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = backend
            .execute(&OpRequest::collection(OpName::InsertOne, users(), vec![json!({})]), &cancel)
            .unwrap_err();
        assert_eq!(err, BackendError::Cancelled);
        assert!(backend.documents("shop", "users").is_empty());
    }

    #[test]
    fn test_non_object_filter_rejected() {
        let backend = MemoryBackend::new();
        let err = call(&backend, OpName::Find, vec![json!(5)]).unwrap_err();
        assert!(matches!(err, BackendError::Rejected { .. }));
    }
}
