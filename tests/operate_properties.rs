//! Purpose: Pin the observable behavior of `operate` and its sibling entry points.
//! Exports: Integration tests only (no runtime exports).
//! Role: End-to-end checks through `Client` over an in-process store.
//! Invariants: Parameter errors never reach the store.
//! Invariants: Failed calls leave stored records unchanged.
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use recops::api::{
    Client, Error, ErrorKind, Key, MemoryStore, Metadata, OperatePolicy, OperationDescriptor,
    Operations, ReadPolicy, Record, RemovePolicy, StatusCode, Store, StoreOptions, UserKey, WritePolicy,
};
use serde_json::{Map, json};

#[derive(Default)]
struct CountingStore {
    inner: MemoryStore,
    calls: AtomicUsize,
}

impl CountingStore {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl Store for CountingStore {
    fn read(&self, key: &Key, bins: Option<&[String]>, policy: &ReadPolicy) -> Result<Record, Error> {
        self.hit();
        self.inner.read(key, bins, policy)
    }

    fn operate(&self, key: &Key, ops: &Operations, policy: &OperatePolicy) -> Result<Record, Error> {
        self.hit();
        self.inner.operate(key, ops, policy)
    }

    fn put(&self, key: &Key, record: &Record, policy: &WritePolicy) -> Result<(), Error> {
        self.hit();
        self.inner.put(key, record, policy)
    }

    fn remove(&self, key: &Key, policy: &RemovePolicy) -> Result<(), Error> {
        self.hit();
        self.inner.remove(key, policy)
    }

    fn exists(&self, key: &Key, policy: &ReadPolicy) -> Result<Metadata, Error> {
        self.hit();
        self.inner.exists(key, policy)
    }
}

fn key() -> Key {
    Key::new("test", "demo", UserKey::Str("k".into()))
}

fn key_json() -> serde_json::Value {
    json!({"ns": "test", "set": "demo", "key": "k"})
}

fn counting_client() -> (Client, Arc<CountingStore>) {
    let store = Arc::new(CountingStore::default());
    (Client::new(store.clone()), store)
}

fn put(client: &Client, bins: serde_json::Value) {
    let bins: Map<String, serde_json::Value> = bins.as_object().cloned().expect("object");
    client.put(&key(), &bins, None).expect("put");
}

fn bins(client: &Client) -> serde_json::Value {
    serde_json::Value::Object(client.get(&key(), None, None).expect("get").bins)
}

#[test]
fn increment_absent_bin_uses_initial_value() {
    let client = Client::memory(StoreOptions::new());
    client.increment(&key(), "n", 3, 5, None).expect("increment");
    assert_eq!(bins(&client), json!({"n": 5}));
}

#[test]
fn increment_present_bin_adds_offset() {
    let client = Client::memory(StoreOptions::new());
    put(&client, json!({"n": 10}));
    client.increment(&key(), "n", 3, 100, None).expect("increment");
    assert_eq!(bins(&client), json!({"n": 13}));
}

#[test]
fn increment_missing_bin_on_existing_record_uses_initial_value() {
    let client = Client::memory(StoreOptions::new());
    put(&client, json!({"other": 1}));
    client.increment(&key(), "n", 3, 7, None).expect("increment");
    assert_eq!(bins(&client), json!({"other": 1, "n": 7}));
}

#[test]
fn increment_string_bin_is_incompatible() {
    let client = Client::memory(StoreOptions::new());
    put(&client, json!({"n": "ten"}));
    let err = client.increment(&key(), "n", 1, 0, None).unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BinIncompatibleType));
    assert_eq!(err.code(), 12);
}

#[test]
fn increment_costs_one_read_and_one_operate() {
    let (client, store) = counting_client();
    client.increment(&key(), "n", 1, 0, None).expect("increment");
    assert_eq!(store.calls(), 2);
}

#[test]
fn append_concatenates_and_absent_bin_fails() {
    let client = Client::memory(StoreOptions::new());
    put(&client, json!({"s": "foo"}));
    client.append(&key(), "s", "bar", None).expect("append");
    client.prepend(&key(), "s", ">", None).expect("prepend");
    assert_eq!(bins(&client), json!({"s": ">foobar"}));

    let err = client.append(&key(), "missing", "x", None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Store);
    assert_eq!(err.status(), Some(StatusCode::BinNotFound));
}

#[test]
fn touch_changes_ttl_without_touching_bins() {
    let client = Client::memory(StoreOptions::new());
    put(&client, json!({"a": 1, "b": "x"}));
    client.touch(&key(), 60, None).expect("touch");

    let record = client.get(&key(), None, None).expect("get");
    assert_eq!(serde_json::Value::Object(record.bins), json!({"a": 1, "b": "x"}));
    assert!((59..=60).contains(&record.metadata.ttl), "ttl {}", record.metadata.ttl);
}

#[test]
fn touch_on_missing_record_is_not_found() {
    let client = Client::memory(StoreOptions::new());
    assert!(client.touch(&key(), 60, None).unwrap_err().is_not_found());
}

#[test]
fn write_then_read_returns_written_value() {
    let client = Client::memory(StoreOptions::new());
    let out = client
        .operate_json(
            &key_json(),
            &json!([{"op": "write", "bin": "a", "val": 1}, {"op": "read", "bin": "a"}]),
            None,
        )
        .expect("operate");
    assert_eq!(serde_json::Value::Object(out), json!({"a": 1}));
}

#[test]
fn entry_without_op_makes_no_store_calls() {
    let (client, store) = counting_client();
    let err = client
        .operate_json(
            &key_json(),
            &json!([{"op": "incr", "bin": "n", "val": 1}, {"bin": "a", "val": 1}]),
            None,
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Param);
    assert_eq!(err.code(), -2);
    assert_eq!(store.calls(), 0);
}

#[test]
fn bad_options_make_no_store_calls() {
    let (client, store) = counting_client();
    let descriptors = vec![OperationDescriptor::read("a").unwrap()];
    let err = client
        .operate(&key(), descriptors, Some(&json!({"generation": "soon"})))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Param);
    assert!(client.exists(&key(), Some(&json!([]))).is_err());
    assert!(client
        .remove_bins(&key(), &["x".to_string(), String::new()], None)
        .is_err());
    assert_eq!(store.calls(), 0);
}

#[test]
fn remove_bins_removes_exactly_those() {
    let client = Client::memory(StoreOptions::new());
    put(&client, json!({"x": 1, "y": 2, "z": 3}));
    client
        .remove_bins(&key(), &["x".to_string(), "y".to_string()], None)
        .expect("remove bins");
    assert_eq!(bins(&client), json!({"z": 3}));
}

#[test]
fn exists_reports_metadata_or_not_found() {
    let client = Client::memory(StoreOptions::new().with_default_ttl(300));
    let err = client.exists(&key(), None).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.code(), 2);

    put(&client, json!({"a": 1}));
    put(&client, json!({"a": 2}));
    let metadata = client.get_metadata(&key(), None).expect("exists");
    assert_eq!(metadata.generation, 2);
    assert!((299..=300).contains(&metadata.ttl), "ttl {}", metadata.ttl);
}

#[test]
fn failed_batch_leaves_record_unchanged() {
    let client = Client::memory(StoreOptions::new());
    put(&client, json!({"s": "foo", "n": 1}));
    let err = client
        .operate_json(
            &key_json(),
            &json!([
                {"op": "write", "bin": "s", "val": "changed"},
                {"op": "append", "bin": "n", "val": "x"}
            ]),
            None,
        )
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BinIncompatibleType));
    assert_eq!(bins(&client), json!({"s": "foo", "n": 1}));
    assert_eq!(client.exists(&key(), None).unwrap().generation, 1);
}

#[test]
fn generation_constraint_guards_operate() {
    let client = Client::memory(StoreOptions::new());
    put(&client, json!({"n": 1}));
    let ops = json!([{"op": "write", "bin": "n", "val": 2}]);

    let err = client
        .operate_json(&key_json(), &ops, Some(&json!({"generation": 5})))
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::GenerationMismatch));

    client
        .operate_json(&key_json(), &ops, Some(&json!({"generation": 1})))
        .expect("matching generation");
    client
        .operate_json(
            &key_json(),
            &ops,
            Some(&json!({"generation": {"policy": "gt", "value": 3}})),
        )
        .expect("greater generation");
    assert_eq!(client.exists(&key(), None).unwrap().generation, 3);
}

#[test]
fn read_only_batch_on_missing_record_is_not_found() {
    let client = Client::memory(StoreOptions::new());
    let err = client
        .operate(&key(), vec![OperationDescriptor::read("a").unwrap()], None)
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn batch_increment_on_missing_bin_starts_at_zero() {
    let client = Client::memory(StoreOptions::new());
    let out = client
        .operate_json(
            &key_json(),
            &json!([{"op": "incr", "bin": "n", "val": 4}, {"op": "read", "bin": "n"}]),
            None,
        )
        .expect("operate");
    assert_eq!(serde_json::Value::Object(out), json!({"n": 0}));
}
