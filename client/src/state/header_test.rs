use super::*;

#[test]
fn sync_sets_bearer_value() {
    let header = AuthHeader::new();
    header.sync(Some("abc"));
    let value = header.current().expect("header");
    assert_eq!(value.to_str().expect("ascii"), "Bearer abc");
    assert!(value.is_sensitive());
}

#[test]
fn sync_trims_token() {
    let header = AuthHeader::new();
    header.sync(Some("  abc  "));
    assert_eq!(header.current().expect("header").to_str().expect("ascii"), "Bearer abc");
}

#[test]
fn sync_none_or_blank_removes_header() {
    let header = AuthHeader::new();
    header.sync(Some("abc"));
    header.sync(None);
    assert!(!header.is_set());

    header.sync(Some("abc"));
    header.sync(Some("   "));
    assert!(!header.is_set());
}

#[test]
fn illegal_token_removes_header() {
    let header = AuthHeader::new();
    header.sync(Some("abc"));
    header.sync(Some("bad\ntoken"));
    assert!(!header.is_set());
}

#[test]
fn clones_observe_updates() {
    let header = AuthHeader::new();
    let other = header.clone();
    header.sync(Some("abc"));
    assert!(other.is_set());
    other.clear();
    assert!(!header.is_set());
}

#[test]
fn legal_token_check_matches_header_rules() {
    assert!(is_legal_token("a1b2c3"));
    assert!(!is_legal_token("line\nbreak"));
    assert!(!is_legal_token("nul\0byte"));
}
