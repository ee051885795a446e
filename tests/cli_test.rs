//! CLI integration tests for the open-fetch binary.

#![cfg(feature = "remote")]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("open-fetch"))
}

// Helper to create a temp config file
fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

mod resolve_command {
    use super::*;

    #[test]
    fn fills_path_template() {
        cmd()
            .args(["resolve", "/pet/{petId}", "--path", "petId=1"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""url": "/pet/1""#))
            .stdout(predicate::str::contains(r#""method": "get""#));
    }

    #[test]
    fn encodes_path_values() {
        cmd()
            .args(["resolve", "/user/{username}", "--path", "username=jane doe"])
            .assert()
            .success()
            .stdout(predicate::str::contains("/user/jane%20doe"));
    }

    #[test]
    fn keeps_unresolved_placeholder() {
        cmd()
            .args(["resolve", "/store/order/{orderId}"])
            .assert()
            .success()
            .stdout(predicate::str::contains("/store/order/{orderId}"));
    }

    #[test]
    fn joins_accept_list() {
        cmd()
            .args([
                "resolve",
                "/pet/1",
                "--accept",
                "application/json",
                "--accept",
                "application/vnd.x.v2+json",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                r#""accept": "application/json, application/vnd.x.v2+json""#,
            ));
    }

    #[test]
    fn no_accept_no_header() {
        cmd()
            .args(["resolve", "/pet/1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("accept").not());
    }

    #[test]
    fn uppercase_method_accepted() {
        cmd()
            .args(["resolve", "/pet", "-X", "POST", "--body", r#"{"name":"doggie"}"#])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""method": "post""#))
            .stdout(predicate::str::contains("doggie"));
    }

    #[test]
    fn unknown_method_fails() {
        cmd()
            .args(["resolve", "/pet", "-X", "FETCH"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("unknown method"));
    }

    #[test]
    fn invalid_path_pair_fails() {
        cmd()
            .args(["resolve", "/pet/{petId}", "--path", "petId"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("NAME=VALUE"));
    }

    #[test]
    fn invalid_body_fails() {
        cmd()
            .args(["resolve", "/pet", "--body", "{not json"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("invalid JSON body"));
    }

    #[test]
    fn uses_client_config() {
        let dir = TempDir::new().unwrap();
        let config = write_temp_file(
            &dir,
            "clients.json",
            r#"{
                "clients": {
                    "pets": {
                        "baseURL": "https://petstore.example/v3",
                        "headers": { "X-Api-Key": "secret" }
                    }
                }
            }"#,
        );

        cmd()
            .args([
                "resolve",
                "/pet/1",
                "--config",
                config.to_str().unwrap(),
                "--client",
                "pets",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("https://petstore.example/v3"))
            .stdout(predicate::str::contains(r#""x-api-key": "secret""#))
            .stdout(predicate::str::contains(r#""transport": "global""#));
    }

    #[test]
    fn unknown_client_fails() {
        let dir = TempDir::new().unwrap();
        let config = write_temp_file(&dir, "clients.json", r#"{"clients":{"pets":{}}}"#);

        cmd()
            .args([
                "resolve",
                "/pet/1",
                "--config",
                config.to_str().unwrap(),
                "--client",
                "users",
            ])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("unknown client"));
    }

    #[test]
    fn missing_config_file() {
        cmd()
            .args([
                "resolve",
                "/pet/1",
                "--config",
                "/nonexistent/clients.json",
                "--client",
                "pets",
            ])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("file not found"));
    }

    #[test]
    fn config_requires_client() {
        cmd()
            .args(["resolve", "/pet/1", "--config", "clients.json"])
            .assert()
            .failure();
    }
}

mod request_command {
    use super::*;

    #[test]
    fn fetches_json() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/pet/7")
            .match_header("accept", "application/json")
            .with_status(200)
            .with_body(r#"{"id":7,"name":"rex"}"#)
            .create();

        cmd()
            .args([
                "request",
                "/pet/{petId}",
                "--base-url",
                &server.url(),
                "--path",
                "petId=7",
                "--accept",
                "application/json",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#"{"id":7,"name":"rex"}"#));

        mock.assert();
    }

    #[test]
    fn pretty_output_to_file() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/store/inventory")
            .with_status(200)
            .with_body(r#"{"available":3}"#)
            .create();
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("inventory.json");

        cmd()
            .args([
                "request",
                "/store/inventory",
                "--base-url",
                &server.url(),
                "--pretty",
                "--output",
                output.to_str().unwrap(),
            ])
            .assert()
            .success()
            .stdout(predicate::str::is_empty());

        let content = fs::read_to_string(&output).unwrap();
        assert!(content.contains("\"available\": 3"));
    }

    #[test]
    fn sends_headers_and_query() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/pet/findByStatus")
            .match_query(mockito::Matcher::UrlEncoded(
                "status".into(),
                "available".into(),
            ))
            .match_header("api_key", "special-key")
            .with_status(200)
            .with_body("[]")
            .create();

        cmd()
            .args([
                "request",
                "/pet/findByStatus",
                "--base-url",
                &server.url(),
                "--query",
                "status=available",
                "-H",
                "api_key: special-key",
            ])
            .assert()
            .success();

        mock.assert();
    }

    #[test]
    fn error_status_exit_code() {
        let mut server = mockito::Server::new();
        server
            .mock("DELETE", "/pet/1")
            .with_status(404)
            .with_body("Pet not found")
            .create();

        cmd()
            .args([
                "request",
                "/pet/{petId}",
                "--base-url",
                &server.url(),
                "-X",
                "delete",
                "--path",
                "petId=1",
            ])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("returned status 404"));
    }

    #[test]
    fn relative_url_without_base_fails() {
        cmd()
            .args(["request", "/pet/1"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("invalid URL"));
    }
}
