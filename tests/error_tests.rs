// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use atelier::error::{ApiError, AtelierError};

#[test]
fn test_error_display_tool_loop_exceeded() {
    let err = AtelierError::ToolLoopExceeded { max_iterations: 5 };
    let message = err.to_string();
    assert!(message.contains("Tool loop exceeded"));
    assert!(message.contains('5'));
}

#[test]
fn test_error_display_fix_limit_exceeded() {
    let err = AtelierError::FixLimitExceeded { attempts: 3 };
    let message = err.to_string();
    assert!(message.contains("Fix limit exceeded"));
    assert!(message.contains('3'));
}

#[test]
fn test_error_display_no_code_section() {
    let err = AtelierError::NoCodeSection;
    assert!(err.to_string().contains("CODE"));
}

#[test]
fn test_api_error_wrapped() {
    let err: AtelierError = ApiError::Timeout.into();
    assert!(err.to_string().contains("timed out"));
}

#[test]
fn test_api_error_server_error_fields() {
    let err = ApiError::ServerError {
        status: 503,
        message: "overloaded".to_string(),
    };
    let message = err.to_string();
    assert!(message.contains("503"));
    assert!(message.contains("overloaded"));
}

#[test]
fn test_json_error_conversion() {
    let json_err = serde_json::from_str::<serde_json::Value>("{bad").unwrap_err();
    let err: AtelierError = json_err.into();
    assert!(err.to_string().contains("JSON error"));
}

#[test]
fn test_io_error_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err: AtelierError = io_err.into();
    assert!(err.to_string().contains("IO error"));
}

#[test]
fn test_errors_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<AtelierError>();
    assert_send_sync::<ApiError>();
}
