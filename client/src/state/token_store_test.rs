use super::*;

fn memory_store() -> TokenStore {
    TokenStore::new(Arc::new(MemorySlot::new()))
}

#[test]
fn set_then_get_returns_trimmed_token() {
    let store = memory_store();
    store.set("  abc123 \n").expect("set");
    assert_eq!(store.get().as_deref(), Some("abc123"));
}

#[test]
fn whitespace_only_token_reads_as_empty() {
    let store = memory_store();
    store.set("   ").expect("set");
    assert!(store.get().is_none());
}

#[test]
fn blank_set_clears_previous_token() {
    let store = memory_store();
    store.set("first").expect("set");
    store.set("\t").expect("set blank");
    assert!(store.get().is_none());
}

#[test]
fn raw_blank_slot_value_reads_as_empty() {
    let store = TokenStore::new(Arc::new(MemorySlot::with_token("  ")));
    assert!(store.get().is_none());
}

#[test]
fn raw_padded_slot_value_reads_trimmed() {
    let store = TokenStore::new(Arc::new(MemorySlot::with_token(" tok ")));
    assert_eq!(store.get().as_deref(), Some("tok"));
}

#[test]
fn clear_is_idempotent() {
    let store = memory_store();
    store.set("tok").expect("set");
    store.clear().expect("clear");
    store.clear().expect("clear again");
    assert!(store.get().is_none());
}

#[test]
fn clones_share_the_same_slot() {
    let store = memory_store();
    let other = store.clone();
    store.set("shared").expect("set");
    assert_eq!(other.get().as_deref(), Some("shared"));
    other.clear().expect("clear");
    assert!(store.get().is_none());
}

#[test]
fn file_slot_missing_file_is_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = TokenStore::new(Arc::new(FileSlot::new(dir.path().join("session.json"))));
    assert!(store.get().is_none());
}

#[test]
fn file_slot_persists_across_instances() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("session.json");
    TokenStore::new(Arc::new(FileSlot::new(&path)))
        .set(" persisted ")
        .expect("set");

    let reopened = TokenStore::new(Arc::new(FileSlot::new(&path)));
    assert_eq!(reopened.get().as_deref(), Some("persisted"));

    let raw = std::fs::read_to_string(&path).expect("read");
    let parsed: serde_json::Value = serde_json::from_str(&raw).expect("json");
    assert_eq!(parsed[TOKEN_KEY], "persisted");
}

#[test]
fn file_slot_clear_removes_token_entry() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("session.json");
    let store = TokenStore::new(Arc::new(FileSlot::new(&path)));
    store.set("tok").expect("set");
    store.clear().expect("clear");
    assert!(store.get().is_none());
    assert!(path.exists());
}

#[test]
fn corrupt_file_reads_as_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("session.json");
    std::fs::write(&path, "not json").expect("write");
    let slot = FileSlot::new(&path);
    assert!(matches!(slot.read(TOKEN_KEY), Err(TokenStoreError::Corrupt(_))));
    assert!(TokenStore::new(Arc::new(slot)).get().is_none());
}
