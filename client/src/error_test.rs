use super::*;

#[test]
fn server_message_wins() {
    let err = ClientError::Status { status: 400, message: Some("Username already exists".into()) };
    assert_eq!(err.user_message(), "Username already exists");
    assert_eq!(err.server_message(), Some("Username already exists"));
}

#[test]
fn auth_statuses_are_auth_failures() {
    assert!(ClientError::Status { status: 401, message: None }.is_auth_failure());
    assert!(ClientError::Status { status: 422, message: None }.is_auth_failure());
    assert!(!ClientError::Status { status: 500, message: None }.is_auth_failure());
    assert!(!ClientError::Cancelled.is_auth_failure());
}

#[test]
fn fallback_messages_by_kind() {
    assert_eq!(
        ClientError::Status { status: 401, message: None }.user_message(),
        "Your session has expired. Please log in again."
    );
    assert_eq!(
        ClientError::Status { status: 503, message: None }.user_message(),
        "The server is unavailable right now. Please try again later."
    );
    assert_eq!(ClientError::Status { status: 404, message: None }.user_message(), "Request failed (404).");
    assert_eq!(ClientError::Cancelled.user_message(), "Request cancelled.");
}

#[test]
fn status_accessor() {
    assert_eq!(ClientError::Status { status: 418, message: None }.status(), Some(418));
    assert_eq!(ClientError::Decode("x".into()).status(), None);
}
