use super::*;

/// # Safety
/// Every test touching `LLM_*` variables holds `ENV_LOCK` to avoid races.
unsafe fn clear_llm_env() {
    unsafe {
        std::env::remove_var("LLM_MODEL");
        std::env::remove_var("LLM_API_KEY_ENV");
        std::env::remove_var("LLM_BASE_URL");
        std::env::remove_var("LLM_REQUEST_TIMEOUT_SECS");
        std::env::remove_var("LLM_CONNECT_TIMEOUT_SECS");
        std::env::remove_var("LEADDESK_TEST_LLM_KEY");
    }
}

static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[test]
fn from_env_uses_defaults() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_llm_env();
        std::env::set_var("LLM_API_KEY_ENV", "LEADDESK_TEST_LLM_KEY");
        std::env::set_var("LEADDESK_TEST_LLM_KEY", "secret");
    }

    let cfg = LlmConfig::from_env().unwrap();
    assert_eq!(cfg.api_key, "secret");
    assert_eq!(cfg.model, DEFAULT_LLM_MODEL);
    assert_eq!(cfg.base_url, DEFAULT_LLM_BASE_URL);
    assert_eq!(
        cfg.timeouts,
        LlmTimeouts { request_secs: DEFAULT_LLM_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_LLM_CONNECT_TIMEOUT_SECS }
    );

    unsafe { clear_llm_env() };
}

#[test]
fn from_env_parses_overrides() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_llm_env();
        std::env::set_var("LLM_API_KEY_ENV", "LEADDESK_TEST_LLM_KEY");
        std::env::set_var("LEADDESK_TEST_LLM_KEY", "k");
        std::env::set_var("LLM_MODEL", "gpt-4o-mini");
        std::env::set_var("LLM_BASE_URL", "http://localhost:8080/v1/");
        std::env::set_var("LLM_REQUEST_TIMEOUT_SECS", "30");
        std::env::set_var("LLM_CONNECT_TIMEOUT_SECS", "garbage");
    }

    let cfg = LlmConfig::from_env().unwrap();
    assert_eq!(cfg.model, "gpt-4o-mini");
    assert_eq!(cfg.base_url, "http://localhost:8080/v1");
    assert_eq!(cfg.timeouts.request_secs, 30);
    assert_eq!(cfg.timeouts.connect_secs, DEFAULT_LLM_CONNECT_TIMEOUT_SECS);

    unsafe { clear_llm_env() };
}

#[test]
fn from_env_missing_key_var() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe { clear_llm_env() };

    let err = LlmConfig::from_env().unwrap_err();
    assert!(matches!(err, LlmError::MissingApiKey { ref var } if var == "LLM_API_KEY_ENV"));
}

#[test]
fn from_env_empty_key_is_missing() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_llm_env();
        std::env::set_var("LLM_API_KEY_ENV", "LEADDESK_TEST_LLM_KEY");
        std::env::set_var("LEADDESK_TEST_LLM_KEY", "  ");
    }

    let err = LlmConfig::from_env().unwrap_err();
    assert!(matches!(err, LlmError::MissingApiKey { ref var } if var == "LEADDESK_TEST_LLM_KEY"));

    unsafe { clear_llm_env() };
}

#[test]
fn base_url_must_be_http() {
    assert!(matches!(parse_base_url(Some("ftp://gateway")), Err(LlmError::ConfigParse(_))));
    assert_eq!(parse_base_url(None).unwrap(), DEFAULT_LLM_BASE_URL);
}
