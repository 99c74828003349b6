use super::*;

#[test]
fn document_load_codes() {
    assert_eq!(DocumentLoadError::InvalidPdf("bad".into()).error_code(), "E_INVALID_PDF");
    assert_eq!(DocumentLoadError::Empty.error_code(), "E_EMPTY_DOCUMENT");
    let fetch = DocumentLoadError::from(PersistenceError::Transport("down".into()));
    assert_eq!(fetch.error_code(), "E_DOCUMENT_FETCH");
}

#[test]
fn fetch_failure_inherits_retryability() {
    let fetch = DocumentLoadError::from(PersistenceError::Transport("down".into()));
    assert!(fetch.retryable());
    assert!(!DocumentLoadError::InvalidPdf("bad".into()).retryable());
}

#[test]
fn persistence_retryable_only_for_transient_statuses() {
    assert!(PersistenceError::Status { status: 503, body: String::new() }.retryable());
    assert!(PersistenceError::Status { status: 429, body: String::new() }.retryable());
    assert!(!PersistenceError::Status { status: 400, body: String::new() }.retryable());
    assert!(!PersistenceError::Malformed("x".into()).retryable());
}

#[test]
fn render_errors_never_retryable() {
    let e = RenderError::Page { page: 3, reason: "boom".into() };
    assert_eq!(e.error_code(), "E_RENDER_PAGE");
    assert!(!e.retryable());
    assert!(e.to_string().contains("page 3"));
}

#[test]
fn session_error_delegates_code() {
    let e = SessionError::from(PersistenceError::Malformed("nope".into()));
    assert_eq!(e.error_code(), "E_PERSIST_MALFORMED");
    let e = SessionError::from(DocumentLoadError::Empty);
    assert_eq!(e.error_code(), "E_EMPTY_DOCUMENT");
    assert_eq!(e.to_string(), "document has no pages");
}
