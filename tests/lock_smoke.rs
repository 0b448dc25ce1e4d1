// Multi-process lock smoke test for operate serialization.
use std::process::{Command, Stdio};

use recops::api::{Client, StoreOptions, UserKey};

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_recops");
    Command::new(exe)
}

const KEY: &str = r#"{"ns":"test","set":"demo","key":"lock"}"#;

#[test]
fn concurrent_append_is_serialized() {
    let temp = tempfile::tempdir().expect("tempdir");
    let store_dir = temp.path().join("store");

    let put = cmd()
        .args(["--dir", store_dir.to_str().unwrap(), "put", KEY, r#"{"s":""}"#])
        .output()
        .expect("put");
    assert!(put.status.success());

    let workers = 8;
    let mut children = Vec::new();
    for _ in 0..workers {
        let child = cmd()
            .args([
                "--dir",
                store_dir.to_str().unwrap(),
                "append",
                KEY,
                "s",
                "x",
                "--options",
                r#"{"write_timeout":10000}"#,
            ])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn");
        children.push(child);
    }

    for mut child in children {
        let status = child.wait().expect("wait");
        assert!(status.success());
    }

    let client = Client::open_dir(&store_dir, StoreOptions::new()).expect("open");
    let key = recops::api::Key::new("test", "demo", UserKey::Str("lock".into()));
    let record = client.get(&key, None, None).expect("get");
    assert_eq!(record.bins["s"], "x".repeat(workers));
    assert_eq!(record.metadata.generation, workers as u32 + 1);
}
