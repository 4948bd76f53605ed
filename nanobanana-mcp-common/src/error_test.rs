//! Property-based tests for the error module.
//!
//! These tests check that error messages keep the context callers rely on,
//! and that each variant lands in the expected externally visible kind.

use proptest::prelude::*;

use crate::error::{Error, ErrorKind};

/// Generate valid HTTP status codes (100-599)
fn http_status_strategy() -> impl Strategy<Value = u16> {
    100u16..600u16
}

/// Generate model-style endpoint URLs
fn endpoint_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9.-]{1,30}".prop_map(|model| {
        format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            model
        )
    })
}

/// Generate error messages
fn message_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 ]{1,100}"
}

/// Generate model identifier lists
fn candidates_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z][a-z0-9.-]{2,30}", 1..5)
}

proptest! {
    /// API errors always carry the endpoint, the status and the body.
    #[test]
    fn api_error_includes_endpoint_and_status(
        endpoint in endpoint_strategy(),
        status_code in http_status_strategy(),
        message in message_strategy()
    ) {
        let err = Error::api(&endpoint, status_code, &message);
        let err_string = err.to_string();

        prop_assert!(err_string.contains(&endpoint));
        prop_assert!(err_string.contains(&status_code.to_string()));
        prop_assert!(err_string.contains(&message));
        prop_assert_eq!(err.kind(), ErrorKind::InternalError);
    }

    /// The aggregate model error names every tried candidate.
    #[test]
    fn model_unavailable_names_every_candidate(
        tried in candidates_strategy(),
        last_error in message_strategy()
    ) {
        let err = Error::ModelUnavailable { tried: tried.clone(), last_error: last_error.clone() };
        let err_string = err.to_string();

        for candidate in &tried {
            prop_assert!(err_string.contains(candidate.as_str()));
        }
        prop_assert!(err_string.contains(&last_error));
    }

    /// Constructor helpers keep the message and pick the right kind.
    #[test]
    fn helper_constructors_keep_message(message in message_strategy()) {
        let cases = [
            (Error::invalid_input(&message), ErrorKind::InvalidInput),
            (Error::precondition(&message), ErrorKind::PreconditionFailed),
            (Error::generation_failed(&message), ErrorKind::GenerationFailed),
            (Error::internal(&message), ErrorKind::InternalError),
            (Error::MethodNotFound(message.clone()), ErrorKind::MethodNotFound),
        ];

        for (err, kind) in cases {
            prop_assert!(err.to_string().contains(&message));
            prop_assert_eq!(err.kind(), kind);
        }
    }
}

#[test]
fn json_errors_are_internal() {
    let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    let err: Error = json_err.into();
    assert_eq!(err.kind(), ErrorKind::InternalError);
}
