use super::*;

// =============================================================================
// AdminAllowList
// =============================================================================

#[test]
fn allow_list_is_case_and_whitespace_insensitive() {
    let list = AdminAllowList::parse(" Owner@Example.com , partner@example.com,, ");
    assert_eq!(list.emails().len(), 2);
    assert!(list.contains("owner@example.com"));
    assert!(list.contains("  PARTNER@example.COM "));
    assert!(!list.contains("guest@example.com"));
}

#[test]
fn empty_allow_list_admits_nobody() {
    let list = AdminAllowList::parse("");
    assert!(list.emails().is_empty());
    assert!(!list.contains(""));
}

// =============================================================================
// env_bool: unique env var names avoid races with parallel tests.
// =============================================================================

#[test]
fn env_bool_true_variants() {
    for (i, val) in ["1", "true", "yes", "on", " TRUE "].iter().enumerate() {
        let key = format!("__LEADDESK_EB_TRUE_{i}__");
        unsafe { std::env::set_var(&key, val) };
        assert_eq!(env_bool(&key), Some(true), "expected true for {val:?}");
        unsafe { std::env::remove_var(&key) };
    }
}

#[test]
fn env_bool_false_variants() {
    for (i, val) in ["0", "false", "no", "off"].iter().enumerate() {
        let key = format!("__LEADDESK_EB_FALSE_{i}__");
        unsafe { std::env::set_var(&key, val) };
        assert_eq!(env_bool(&key), Some(false), "expected false for {val:?}");
        unsafe { std::env::remove_var(&key) };
    }
}

#[test]
fn env_bool_invalid_or_unset_is_none() {
    let key = "__LEADDESK_EB_INVALID__";
    unsafe { std::env::set_var(key, "maybe") };
    assert_eq!(env_bool(key), None);
    unsafe { std::env::remove_var(key) };
    assert_eq!(env_bool("__LEADDESK_EB_SURELY_UNSET__"), None);
}

// =============================================================================
// env_parse
// =============================================================================

#[test]
fn env_parse_uses_default_when_unset() {
    let value: u16 = env_parse("__LEADDESK_PARSE_UNSET__", 42).unwrap();
    assert_eq!(value, 42);
}

#[test]
fn env_parse_rejects_garbage() {
    let key = "__LEADDESK_PARSE_BAD__";
    unsafe { std::env::set_var(key, "forty") };
    let err = env_parse::<u16>(key, 1).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { key: "__LEADDESK_PARSE_BAD__", .. }));
    unsafe { std::env::remove_var(key) };
}
