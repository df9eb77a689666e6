//! Integration tests driving the reddit-reply-bot binary

use std::process::Command;

const BIN: &str = env!("CARGO_BIN_EXE_reddit-reply-bot");

#[test]
fn version_flag_shows_cargo_version() {
    // Get the version from Cargo.toml
    let cargo_version = env!("CARGO_PKG_VERSION");

    let output = Command::new(BIN)
        .arg("--version")
        .output()
        .expect("Failed to execute reddit-reply-bot --version");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(
        output.status.success(),
        "reddit-reply-bot --version should exit successfully"
    );
    assert!(
        stdout.contains(cargo_version),
        "Output '{}' should contain version '{}'",
        stdout.trim(),
        cargo_version
    );
    assert!(
        stdout.contains("reddit-reply-bot"),
        "Output '{}' should contain 'reddit-reply-bot'",
        stdout.trim()
    );
}

#[test]
fn missing_credentials_exit_non_zero() {
    let output = Command::new(BIN)
        .env_clear()
        .output()
        .expect("Failed to execute reddit-reply-bot");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(output.status.code(), Some(1));
    assert!(
        stdout.contains("missing credential"),
        "Output '{}' should name the missing credential",
        stdout.trim()
    );
}

#[test]
fn invalid_channel_exits_non_zero() {
    let output = Command::new(BIN)
        .env_clear()
        .args(["--channel", "not a subreddit"])
        .output()
        .expect("Failed to execute reddit-reply-bot");

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn rejected_credentials_exit_non_zero() {
    let mut server = mockito::Server::new();
    let token = server
        .mock("POST", "/api/v1/access_token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error": "invalid_grant"}"#)
        .create();
    let url = server.url();

    let output = Command::new(BIN)
        .env_clear()
        .args([
            "--client-id",
            "id",
            "--client-secret",
            "secret",
            "--username",
            "reply_bot",
            "--password",
            "wrong",
            "--auth-url",
            url.as_str(),
            "--api-url",
            url.as_str(),
        ])
        .output()
        .expect("Failed to execute reddit-reply-bot");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(output.status.code(), Some(1));
    assert!(
        stdout.contains("invalid_grant"),
        "Output '{}' should report the authentication error",
        stdout.trim()
    );
    token.assert();
}
