//! Serialization tests for errors and requests.
//!
//! Hosts may forward both across process boundaries, so their JSON shape is
//! part of the contract.

use serde_json::json;

use crate::{CollectionDescriptor, DatabaseDescriptor, Error, OpName, OpRequest};

fn test_error_round_trip(err: Error) {
    let json = serde_json::to_string(&err).expect("Failed to serialize error");
    let restored: Error = serde_json::from_str(&json).expect("Failed to deserialize error");
    assert_eq!(err, restored, "Error round-trip failed for: {:?}", err);
}

#[test]
fn test_error_variants_round_trip() {
    test_error_round_trip(Error::Dispatch {
        op: "find".into(),
        reason: "boom".into(),
    });
    test_error_round_trip(Error::Timeout {
        op: "drop".into(),
        millis: 30_000,
    });
    test_error_round_trip(Error::Cancelled { op: "save".into() });
    test_error_round_trip(Error::BridgeClosed);
    test_error_round_trip(Error::InvalidArgument {
        reason: "functions cannot be documents".into(),
    });
    test_error_round_trip(Error::Script {
        reason: "Variable not found: x".into(),
    });
    test_error_round_trip(Error::Config {
        reason: "bad port".into(),
    });
    test_error_round_trip(Error::Io {
        reason: "denied".into(),
    });
}

#[test]
fn test_dispatch_error_shape() {
    let err = Error::Dispatch {
        op: "insert_one".into(),
        reason: "duplicate key".into(),
    };
    assert_eq!(
        serde_json::to_value(&err).unwrap(),
        json!({"Dispatch": {"op": "insert_one", "reason": "duplicate key"}})
    );
    assert_eq!(err.to_string(), "insert_one failed: duplicate key");
}

#[test]
fn test_insert_one_request_matches_bridge_contract() {
    let users = CollectionDescriptor::new(DatabaseDescriptor::new("shop", "localhost", 27017), "users");
    let req = OpRequest::collection(OpName::InsertOne, users, vec![json!({"name": "a"})]);

    assert_eq!(req.op.bridge_name(), "op_insert_one");
    assert_eq!(
        serde_json::to_value(&req).unwrap(),
        json!({
            "op": "insert_one",
            "target": {"db": {"name": "shop", "address": "localhost", "port": 27017}, "name": "users"},
            "args": [{"name": "a"}]
        })
    );
}
