use super::*;

fn limiter(per_user: usize, global: usize) -> RateLimiter {
    RateLimiter::with_config(RateLimitConfig {
        per_user_limit: per_user,
        per_user_window: Duration::from_secs(60),
        global_limit: global,
        global_window: Duration::from_secs(60),
    })
}

#[test]
fn per_user_allows_up_to_limit() {
    let rl = limiter(3, 100);
    let user = Uuid::new_v4();
    let now = Instant::now();

    for i in 0..3 {
        assert!(rl.check_and_record_at(user, now).is_ok(), "request {i} should succeed");
    }
    assert!(matches!(
        rl.check_and_record_at(user, now),
        Err(RateLimitError::PerUserExceeded { limit: 3, window_secs: 60 })
    ));
}

#[test]
fn global_allows_up_to_limit() {
    let rl = limiter(100, 4);
    let now = Instant::now();

    // Distinct users so the per-user window never fills first.
    for i in 0..4 {
        assert!(rl.check_and_record_at(Uuid::new_v4(), now).is_ok(), "request {i} should succeed");
    }
    assert!(matches!(
        rl.check_and_record_at(Uuid::new_v4(), now),
        Err(RateLimitError::GlobalExceeded { limit: 4, .. })
    ));
}

#[test]
fn window_expiry_allows_new_requests() {
    let rl = limiter(2, 100);
    let user = Uuid::new_v4();
    let start = Instant::now();

    rl.check_and_record_at(user, start).unwrap();
    rl.check_and_record_at(user, start).unwrap();
    assert!(rl.check_and_record_at(user, start).is_err());

    let later = start + Duration::from_secs(61);
    assert!(rl.check_and_record_at(user, later).is_ok());
}

#[test]
fn rejected_request_is_not_recorded() {
    let rl = limiter(1, 2);
    let user = Uuid::new_v4();
    let now = Instant::now();

    rl.check_and_record_at(user, now).unwrap();
    assert!(rl.check_and_record_at(user, now).is_err());
    // The rejected call above must not have consumed global capacity.
    assert!(rl.check_and_record_at(Uuid::new_v4(), now).is_ok());
}

#[test]
fn users_are_isolated() {
    let rl = limiter(1, 100);
    let now = Instant::now();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();

    rl.check_and_record_at(a, now).unwrap();
    assert!(rl.check_and_record_at(a, now).is_err());
    assert!(rl.check_and_record_at(b, now).is_ok());
}

#[test]
fn rate_limit_error_is_retryable() {
    use crate::frame::ErrorCode;
    let err = RateLimitError::GlobalExceeded { limit: 1, window_secs: 60 };
    assert_eq!(err.error_code(), "E_RATE_LIMITED");
    assert!(err.retryable());
}

#[test]
fn default_config_matches_documented_limits() {
    let cfg = RateLimitConfig::default();
    assert_eq!(cfg.per_user_limit, 5);
    assert_eq!(cfg.global_limit, 20);
    assert_eq!(cfg.per_user_window, Duration::from_secs(60));
}
