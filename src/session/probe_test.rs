use super::*;

#[test]
fn classify_ok_with_email_is_authenticated() {
    let outcome = classify(200, r#"{"email":"a@b.com"}"#);
    assert_eq!(outcome, ProbeOutcome::Authenticated(Identity::new("a@b.com")));
}

#[test]
fn classify_ok_ignores_extra_fields() {
    let outcome = classify(200, r#"{"email":"a@b.com","roles":["admin"],"id":7}"#);
    assert_eq!(outcome, ProbeOutcome::Authenticated(Identity::new("a@b.com")));
}

#[test]
fn classify_ok_missing_email_is_transient_payload() {
    let outcome = classify(200, r#"{"user":"a@b.com"}"#);
    assert!(matches!(outcome, ProbeOutcome::Transient(TransientFailure::Payload(_))));
}

#[test]
fn classify_ok_non_string_email_is_transient_payload() {
    let outcome = classify(200, r#"{"email":42}"#);
    assert!(matches!(outcome, ProbeOutcome::Transient(TransientFailure::Payload(_))));
}

#[test]
fn classify_ok_with_non_json_body_is_transient_payload() {
    let outcome = classify(200, "<html>maintenance</html>");
    assert!(matches!(outcome, ProbeOutcome::Transient(TransientFailure::Payload(_))));
}

#[test]
fn classify_unauthorized_ignores_body() {
    assert_eq!(classify(401, r#"{"email":"a@b.com"}"#), ProbeOutcome::Unauthenticated);
    assert_eq!(classify(401, ""), ProbeOutcome::Unauthenticated);
}

#[test]
fn classify_other_statuses_are_transient() {
    for status in [201, 204, 301, 400, 403, 404, 429, 500, 502, 503] {
        assert_eq!(
            classify(status, ""),
            ProbeOutcome::Transient(TransientFailure::Status(status)),
            "status {status} should be transient"
        );
    }
}

#[test]
fn transient_failure_codes_are_stable() {
    assert_eq!(TransientFailure::Status(500).code(), "E_PROBE_STATUS");
    assert_eq!(TransientFailure::Payload(String::new()).code(), "E_PROBE_PAYLOAD");
    assert_eq!(TransientFailure::Transport(String::new()).code(), "E_PROBE_TRANSPORT");
}

#[test]
fn transient_failure_display_includes_status() {
    assert_eq!(TransientFailure::Status(503).to_string(), "unexpected status 503");
}

#[test]
fn http_probe_keeps_joined_url() {
    let probe = HttpSessionProbe::new(
        "http://127.0.0.1:8080/pingauth",
        None,
        ProbeTimeouts { request_secs: 5, connect_secs: 1 },
    )
    .unwrap();
    assert_eq!(probe.url(), "http://127.0.0.1:8080/pingauth");
}
