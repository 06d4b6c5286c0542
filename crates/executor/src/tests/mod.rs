//! Test modules for the executor crate.

pub mod serialization;

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::{Backend, BackendError, BackendResult, CancelToken, Document, OpName, OpRequest};

/// Test double: records every request and answers from a script of canned replies.
#[derive(Default)]
pub struct RecordingBackend {
    requests: Mutex<Vec<OpRequest>>,
    reply: Mutex<Option<BackendResult<Document>>>,
    delay: Option<Duration>,
}

impl RecordingBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A backend that sleeps before answering, for timeout tests
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    /// Answer every following call with `reply`
    pub fn reply_with(&self, reply: BackendResult<Document>) {
        *self.reply.lock() = Some(reply);
    }

    pub fn requests(&self) -> Vec<OpRequest> {
        self.requests.lock().clone()
    }
}

impl Backend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    fn execute(&self, request: &OpRequest, cancel: &CancelToken) -> BackendResult<Document> {
        self.requests.lock().push(request.clone());
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
            if cancel.is_cancelled() {
                return Err(BackendError::Cancelled);
            }
        }
        if let Some(reply) = self.reply.lock().clone() {
            return reply;
        }
        Ok(default_reply(request.op))
    }
}

fn default_reply(op: OpName) -> Value {
    match op {
        OpName::Find | OpName::Aggregate | OpName::ListCollections | OpName::ListDatabases => {
            json!([])
        }
        OpName::InsertOne | OpName::Save => json!({ "insertedId": { "$oid": "000000000000000000000001" } }),
        OpName::InsertMany => json!({ "insertedIds": {} }),
        OpName::UpdateOne | OpName::UpdateMany => {
            json!({ "matchedCount": 0, "modifiedCount": 0, "upsertedId": null })
        }
        OpName::DeleteOne | OpName::DeleteMany => json!({ "deletedCount": 0 }),
        OpName::Drop => json!(true),
    }
}
