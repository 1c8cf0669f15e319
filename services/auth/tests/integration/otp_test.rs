use uuid::Uuid;

use opal_auth::domain::audit::EventKind;
use opal_auth::domain::types::{Purpose, RATE_LIMIT_MAX_ATTEMPTS};
use opal_auth::error::AuthServiceError;
use opal_auth::usecase::otp::{IssueOtpInput, IssueOtpUseCase};

use crate::helpers::{
    MockAudit, MockCountingRateLimiter, MockIdentityRepo, MockMessenger, MockOtpRepo,
    MockRateLimiter, test_client, test_identity, test_one_time_code,
};

// ── IssueOtpUseCase ──────────────────────────────────────────────────────────

#[tokio::test]
async fn should_issue_and_deliver_signup_code() {
    let mock_codes = MockOtpRepo::empty();
    let codes_handle = mock_codes.codes_handle();
    let messenger = MockMessenger::working();
    let sent_handle = messenger.sent_handle();
    let audit = MockAudit::empty();
    let events_handle = audit.events_handle();

    let uc = IssueOtpUseCase {
        identities: MockIdentityRepo::empty(),
        codes: mock_codes,
        audit,
        limiter: MockRateLimiter::allowing(),
        messenger,
    };

    let out = uc
        .execute(IssueOtpInput {
            identifier: "telegram_42".to_owned(),
            purpose: Purpose::Signup,
            client: test_client(),
        })
        .await
        .unwrap();

    assert!(out.delivered);
    assert_eq!(out.expires_in_secs, 600);

    let codes = codes_handle.lock().unwrap();
    assert_eq!(codes.len(), 1);
    let code = &codes[0];
    assert_eq!(code.code.len(), 6, "code should be 6 digits");
    assert!(code.code.bytes().all(|b| b.is_ascii_digit()));
    assert_eq!(code.attempts, 0);
    assert!(!code.consumed);
    assert!(code.identity_id.is_none(), "signup code has no identity yet");

    // The code went out over the messenger.
    let sent = sent_handle.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "telegram_42");
    assert!(sent[0].1.contains(&code.code));

    let events = events_handle.lock().unwrap();
    assert!(events.iter().any(|e| e.kind == EventKind::OtpIssued));
}

#[tokio::test]
async fn should_reissue_replacing_prior_code_and_resetting_attempts() {
    let mut prior = test_one_time_code(None, Purpose::Signup);
    prior.attempts = 3;
    let prior_code = prior.code.clone();

    let mock_codes = MockOtpRepo::new(vec![prior]);
    let codes_handle = mock_codes.codes_handle();

    let uc = IssueOtpUseCase {
        identities: MockIdentityRepo::empty(),
        codes: mock_codes,
        audit: MockAudit::empty(),
        limiter: MockRateLimiter::allowing(),
        messenger: MockMessenger::working(),
    };

    uc.execute(IssueOtpInput {
        identifier: "telegram_42".to_owned(),
        purpose: Purpose::Signup,
        client: test_client(),
    })
    .await
    .unwrap();

    let codes = codes_handle.lock().unwrap();
    assert_eq!(codes.len(), 1, "re-issue must replace, not accumulate");
    assert_ne!(codes[0].code, prior_code, "fresh code expected");
    assert_eq!(codes[0].attempts, 0, "attempt counter must reset");
}

#[tokio::test]
async fn should_require_signup_for_login_code_to_unknown_handle() {
    let mock_codes = MockOtpRepo::empty();
    let codes_handle = mock_codes.codes_handle();
    let audit = MockAudit::empty();
    let events_handle = audit.events_handle();

    let uc = IssueOtpUseCase {
        identities: MockIdentityRepo::empty(),
        codes: mock_codes,
        audit,
        limiter: MockRateLimiter::allowing(),
        messenger: MockMessenger::working(),
    };

    let result = uc
        .execute(IssueOtpInput {
            identifier: "telegram_999".to_owned(),
            purpose: Purpose::Login,
            client: test_client(),
        })
        .await;

    assert!(
        matches!(result, Err(AuthServiceError::SignupRequired)),
        "expected SignupRequired, got {result:?}"
    );
    assert!(
        codes_handle.lock().unwrap().is_empty(),
        "no code may be written for an unknown login handle"
    );
    let events = events_handle.lock().unwrap();
    assert!(events.iter().any(|e| e.kind == EventKind::LoginFailed));
}

#[tokio::test]
async fn should_issue_login_code_bound_to_existing_identity() {
    let identity = test_identity();
    let mock_codes = MockOtpRepo::empty();
    let codes_handle = mock_codes.codes_handle();

    let uc = IssueOtpUseCase {
        identities: MockIdentityRepo::new(vec![identity.clone()]),
        codes: mock_codes,
        audit: MockAudit::empty(),
        limiter: MockRateLimiter::allowing(),
        messenger: MockMessenger::working(),
    };

    uc.execute(IssueOtpInput {
        identifier: identity.telegram_user_id.clone(),
        purpose: Purpose::Login,
        client: test_client(),
    })
    .await
    .unwrap();

    let codes = codes_handle.lock().unwrap();
    assert_eq!(codes[0].identity_id, Some(identity.id));
}

#[tokio::test]
async fn should_keep_code_valid_when_delivery_fails() {
    let mock_codes = MockOtpRepo::empty();
    let codes_handle = mock_codes.codes_handle();

    let uc = IssueOtpUseCase {
        identities: MockIdentityRepo::empty(),
        codes: mock_codes,
        audit: MockAudit::empty(),
        limiter: MockRateLimiter::allowing(),
        messenger: MockMessenger::broken(),
    };

    let out = uc
        .execute(IssueOtpInput {
            identifier: "telegram_42".to_owned(),
            purpose: Purpose::Signup,
            client: test_client(),
        })
        .await
        .unwrap();

    assert!(!out.delivered, "delivery failure must be reported");
    assert_eq!(
        codes_handle.lock().unwrap().len(),
        1,
        "code must be persisted before delivery is attempted"
    );
}

#[tokio::test]
async fn should_rate_limit_issuance_and_record_high_risk_event() {
    let mock_codes = MockOtpRepo::empty();
    let codes_handle = mock_codes.codes_handle();
    let audit = MockAudit::empty();
    let events_handle = audit.events_handle();

    let uc = IssueOtpUseCase {
        identities: MockIdentityRepo::empty(),
        codes: mock_codes,
        audit,
        limiter: MockRateLimiter::denying(),
        messenger: MockMessenger::working(),
    };

    let result = uc
        .execute(IssueOtpInput {
            identifier: "telegram_42".to_owned(),
            purpose: Purpose::Signup,
            client: test_client(),
        })
        .await;

    assert!(
        matches!(result, Err(AuthServiceError::RateLimited)),
        "expected RateLimited, got {result:?}"
    );
    assert!(codes_handle.lock().unwrap().is_empty());

    let events = events_handle.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::RateLimitExceeded);
    assert_eq!(
        events[0].risk_level,
        opal_auth::domain::audit::RiskLevel::High
    );
}

#[tokio::test]
async fn should_deny_sixth_attempt_in_window_and_allow_after_it_elapses() {
    let limiter = MockCountingRateLimiter::empty();
    let counts_handle = limiter.counts_handle();

    let uc = IssueOtpUseCase {
        identities: MockIdentityRepo::empty(),
        codes: MockOtpRepo::empty(),
        audit: MockAudit::empty(),
        limiter,
        messenger: MockMessenger::working(),
    };

    let input = || IssueOtpInput {
        identifier: "telegram_42".to_owned(),
        purpose: Purpose::Signup,
        client: test_client(),
    };

    for attempt in 1..=RATE_LIMIT_MAX_ATTEMPTS {
        uc.execute(input())
            .await
            .unwrap_or_else(|e| panic!("attempt {attempt} must pass, got {e:?}"));
    }

    let sixth = uc.execute(input()).await;
    assert!(
        matches!(sixth, Err(AuthServiceError::RateLimited)),
        "expected RateLimited on the sixth attempt, got {sixth:?}"
    );

    // The window elapsing resets the counter.
    counts_handle.lock().unwrap().clear();
    uc.execute(input())
        .await
        .expect("a fresh window must allow again");
}

// A placeholder identity id used nowhere else, to catch accidental binding.
#[tokio::test]
async fn should_not_bind_signup_code_to_unrelated_identity() {
    let identity = test_identity();
    let unrelated = Uuid::parse_str("00000000-0000-0000-0000-000000000099").unwrap();
    assert_ne!(identity.id, unrelated);

    let mock_codes = MockOtpRepo::empty();
    let codes_handle = mock_codes.codes_handle();

    let uc = IssueOtpUseCase {
        identities: MockIdentityRepo::new(vec![identity]),
        codes: mock_codes,
        audit: MockAudit::empty(),
        limiter: MockRateLimiter::allowing(),
        messenger: MockMessenger::working(),
    };

    // A different handle than the stored identity's.
    uc.execute(IssueOtpInput {
        identifier: "telegram_777".to_owned(),
        purpose: Purpose::Signup,
        client: test_client(),
    })
    .await
    .unwrap();

    let codes = codes_handle.lock().unwrap();
    assert!(codes[0].identity_id.is_none());
}
