use opal_auth::domain::audit::EventKind;
use opal_auth::error::AuthServiceError;
use opal_auth::usecase::flow::issue_continuation;
use opal_auth::usecase::passcode::{
    SetPasscodeUseCase, VerifyPasscodeInput, VerifyPasscodeUseCase,
};

use opal_auth_types::token::validate_session_token;

use crate::helpers::{
    MockAudit, MockIdentityRepo, MockPasscodeRepo, MockRateLimiter, TEST_SESSION_SECRET,
    test_client, test_identity,
};

// ── SetPasscodeUseCase ───────────────────────────────────────────────────────

#[tokio::test]
async fn should_set_passcode_and_complete_setup() {
    let mut identity = test_identity();
    identity.is_setup_complete = false;

    let identities = MockIdentityRepo::new(vec![identity.clone()]);
    let identities_handle = identities.identities_handle();
    let passcodes = MockPasscodeRepo::empty();
    let credentials_handle = passcodes.credentials_handle();
    let audit = MockAudit::empty();
    let events_handle = audit.events_handle();

    let uc = SetPasscodeUseCase {
        identities,
        passcodes,
        audit,
    };

    uc.execute(identity.id, "482913", &test_client())
        .await
        .unwrap();

    let credentials = credentials_handle.lock().unwrap();
    assert_eq!(credentials.len(), 1);
    assert!(
        !credentials[0].passcode_hash.contains("482913"),
        "stored hash must not embed the plaintext"
    );

    assert!(
        identities_handle.lock().unwrap()[0].is_setup_complete,
        "first passcode completes setup"
    );
    let events = events_handle.lock().unwrap();
    assert!(events.iter().any(|e| e.kind == EventKind::PasscodeChanged));
}

#[tokio::test]
async fn should_reject_malformed_passcode_with_audit_event() {
    let identity = test_identity();
    let audit = MockAudit::empty();
    let events_handle = audit.events_handle();

    let uc = SetPasscodeUseCase {
        identities: MockIdentityRepo::new(vec![identity.clone()]),
        passcodes: MockPasscodeRepo::empty(),
        audit,
    };

    let bad_inputs = ["12345", "1234567", "12345a", ""];
    for bad in bad_inputs {
        let result = uc.execute(identity.id, bad, &test_client()).await;
        assert!(
            matches!(result, Err(AuthServiceError::InvalidCredential)),
            "expected InvalidCredential for {bad:?}, got {result:?}"
        );
    }

    let events = events_handle.lock().unwrap();
    assert_eq!(events.len(), bad_inputs.len(), "every rejection is audited");
    assert!(
        events
            .iter()
            .all(|e| e.kind == EventKind::PasscodeChangeFailed)
    );
}

// ── VerifyPasscodeUseCase ────────────────────────────────────────────────────

async fn enroll(identity_id: uuid::Uuid, passcode: &str, passcodes: &MockPasscodeRepo) {
    let uc = SetPasscodeUseCase {
        identities: MockIdentityRepo::new(vec![test_identity()]),
        passcodes: MockPasscodeRepo {
            credentials: passcodes.credentials_handle(),
        },
        audit: MockAudit::empty(),
    };
    uc.execute(identity_id, passcode, &test_client())
        .await
        .unwrap();
}

#[tokio::test]
async fn should_verify_passcode_and_issue_session() {
    let identity = test_identity();
    let passcodes = MockPasscodeRepo::empty();
    enroll(identity.id, "482913", &passcodes).await;

    let continuation = issue_continuation(&identity, TEST_SESSION_SECRET).unwrap();
    let audit = MockAudit::empty();
    let events_handle = audit.events_handle();

    let uc = VerifyPasscodeUseCase {
        identities: MockIdentityRepo::new(vec![identity.clone()]),
        passcodes,
        audit,
        limiter: MockRateLimiter::allowing(),
        session_secret: TEST_SESSION_SECRET.to_owned(),
    };

    let bundle = uc
        .execute(VerifyPasscodeInput {
            continuation,
            passcode: "482913".to_owned(),
            client: test_client(),
        })
        .await
        .unwrap();

    let info = validate_session_token(&bundle.token, TEST_SESSION_SECRET).unwrap();
    assert_eq!(info.identity_id, identity.id);

    let events = events_handle.lock().unwrap();
    assert!(events.iter().any(|e| e.kind == EventKind::LoginSuccess));
    assert!(events.iter().any(|e| e.kind == EventKind::SessionIssued));
}

#[tokio::test]
async fn should_reject_wrong_passcode_with_audit_event() {
    let identity = test_identity();
    let passcodes = MockPasscodeRepo::empty();
    enroll(identity.id, "482913", &passcodes).await;

    let continuation = issue_continuation(&identity, TEST_SESSION_SECRET).unwrap();
    let audit = MockAudit::empty();
    let events_handle = audit.events_handle();

    let uc = VerifyPasscodeUseCase {
        identities: MockIdentityRepo::new(vec![identity]),
        passcodes,
        audit,
        limiter: MockRateLimiter::allowing(),
        session_secret: TEST_SESSION_SECRET.to_owned(),
    };

    let result = uc
        .execute(VerifyPasscodeInput {
            continuation,
            passcode: "000000".to_owned(),
            client: test_client(),
        })
        .await;

    assert!(
        matches!(result, Err(AuthServiceError::InvalidCredential)),
        "expected InvalidCredential, got {result:?}"
    );
    let events = events_handle.lock().unwrap();
    assert!(
        events
            .iter()
            .any(|e| e.kind == EventKind::PasscodeVerifyFailed)
    );
}

#[tokio::test]
async fn should_invalidate_old_passcode_after_change() {
    let identity = test_identity();
    let passcodes = MockPasscodeRepo::empty();
    enroll(identity.id, "482913", &passcodes).await;
    enroll(identity.id, "915370", &passcodes).await;

    let uc = VerifyPasscodeUseCase {
        identities: MockIdentityRepo::new(vec![identity.clone()]),
        passcodes,
        audit: MockAudit::empty(),
        limiter: MockRateLimiter::allowing(),
        session_secret: TEST_SESSION_SECRET.to_owned(),
    };

    let old = uc
        .execute(VerifyPasscodeInput {
            continuation: issue_continuation(&identity, TEST_SESSION_SECRET).unwrap(),
            passcode: "482913".to_owned(),
            client: test_client(),
        })
        .await;
    assert!(
        matches!(old, Err(AuthServiceError::InvalidCredential)),
        "old passcode must stop verifying, got {old:?}"
    );

    uc.execute(VerifyPasscodeInput {
        continuation: issue_continuation(&identity, TEST_SESSION_SECRET).unwrap(),
        passcode: "915370".to_owned(),
        client: test_client(),
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn should_reject_verification_with_tampered_continuation() {
    let identity = test_identity();
    let passcodes = MockPasscodeRepo::empty();
    enroll(identity.id, "482913", &passcodes).await;

    let audit = MockAudit::empty();
    let events_handle = audit.events_handle();

    let uc = VerifyPasscodeUseCase {
        identities: MockIdentityRepo::new(vec![identity.clone()]),
        passcodes,
        audit,
        limiter: MockRateLimiter::allowing(),
        session_secret: TEST_SESSION_SECRET.to_owned(),
    };

    let forged = issue_continuation(&identity, "attacker-secret").unwrap();
    let result = uc
        .execute(VerifyPasscodeInput {
            continuation: forged,
            passcode: "482913".to_owned(),
            client: test_client(),
        })
        .await;

    assert!(
        matches!(result, Err(AuthServiceError::SignatureInvalid)),
        "expected SignatureInvalid, got {result:?}"
    );
    let events = events_handle.lock().unwrap();
    assert!(
        events.iter().any(|e| e.kind == EventKind::LoginFailed),
        "a rejected continuation must be audited"
    );
}

#[tokio::test]
async fn should_rate_limit_passcode_verification() {
    let identity = test_identity();
    let continuation = issue_continuation(&identity, TEST_SESSION_SECRET).unwrap();

    let uc = VerifyPasscodeUseCase {
        identities: MockIdentityRepo::new(vec![identity]),
        passcodes: MockPasscodeRepo::empty(),
        audit: MockAudit::empty(),
        limiter: MockRateLimiter::denying(),
        session_secret: TEST_SESSION_SECRET.to_owned(),
    };

    let result = uc
        .execute(VerifyPasscodeInput {
            continuation,
            passcode: "482913".to_owned(),
            client: test_client(),
        })
        .await;

    assert!(matches!(result, Err(AuthServiceError::RateLimited)));
}
