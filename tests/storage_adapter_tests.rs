use qdistinct_core::config::{ExecConfig, KeyStoreKind};
use qdistinct_io::build_storage_from_config;
use std::fs;

fn temp_spill_dir(name: &str) -> String {
    let mut dir = std::env::temp_dir();
    dir.push(format!("qdistinct-storage-tests-{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir.to_string_lossy().to_string()
}

#[test]
fn test_file_storage_builder_write_read() {
    let dir = temp_spill_dir("fs");
    let cfg = ExecConfig {
        spill_dir: dir.clone(),
        ..ExecConfig::default()
    };

    let storage_cfg = cfg.storage_config();
    let storage = build_storage_from_config(&storage_cfg).expect("fs storage");

    let path = format!("{}/keystore-test/entry.key", dir);
    let bytes = b"hello world";
    storage.write(&path, bytes).expect("write");
    let roundtrip = storage.read_range(&path, 0, bytes.len()).expect("read");
    assert_eq!(roundtrip, bytes);
    assert_eq!(storage.size(&path).expect("size"), bytes.len() as u64);

    storage
        .delete_prefix(&format!("{}/keystore-test", dir))
        .expect("delete prefix");
    assert!(!storage.exists(&path).expect("exists"));
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_memory_scheme_builds_memory_storage() {
    let cfg = ExecConfig {
        key_store: KeyStoreKind::Storage,
        spill_uri: Some("memory://".into()),
        ..ExecConfig::default()
    };
    let storage = build_storage_from_config(&cfg.storage_config()).expect("memory storage");
    storage.write("mem/a.key", b"a").expect("write");
    assert_eq!(storage.list("mem/").expect("list"), vec!["mem/a.key".to_string()]);
}

#[test]
fn test_invalid_scheme_errors() {
    let cfg = ExecConfig {
        spill_uri: Some("ftp://example.com/spill".into()),
        ..ExecConfig::default()
    };
    let storage_cfg = cfg.storage_config();
    let err = build_storage_from_config(&storage_cfg)
        .err()
        .expect("should fail");
    assert!(err.to_string().contains("unsupported spill scheme"));
}
