//! Integration tests for Jenkins Deck

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn deck() -> Command {
        let mut cmd = cargo_bin_cmd!("deck");
        cmd.env_remove("DECK_CONFIG")
            .env_remove("DECK_LOG")
            .env_remove("DECK_API_TOKEN");
        cmd
    }

    fn deck_with(config: &Path) -> Command {
        let mut cmd = deck();
        cmd.arg("--config").arg(config);
        cmd
    }

    #[test]
    fn help_displays() {
        deck()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Jenkins dashboard client"));
    }

    #[test]
    fn version_displays() {
        deck()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("deck"));
    }

    #[test]
    fn config_path_honours_flag() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deck.toml");

        deck_with(&path)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("deck.toml"));
    }

    #[test]
    fn config_show_defaults() {
        let dir = TempDir::new().unwrap();

        deck_with(&dir.path().join("config.toml"))
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[server]"))
            .stdout(predicate::str::contains("[monitor]"));
    }

    #[test]
    fn config_init_then_show_redacts_token() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        deck_with(&path)
            .args([
                "config",
                "init",
                "--url",
                "https://ci.example.com/",
                "--username",
                "alice",
                "--api-token",
                "s3cret",
            ])
            .assert()
            .success();
        assert!(path.exists());

        deck_with(&path)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("https://ci.example.com/"))
            .stdout(predicate::str::contains("s3cret").not());
    }

    #[test]
    fn config_set_updates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        deck_with(&path)
            .args(["config", "set", "monitor.interval_secs", "45"])
            .assert()
            .success();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("interval_secs = 45"));
    }

    #[test]
    fn config_set_unknown_key_fails() {
        let dir = TempDir::new().unwrap();

        deck_with(&dir.path().join("config.toml"))
            .args(["config", "set", "server.colour", "blue"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown configuration key"));
    }

    #[test]
    fn invalid_config_still_allows_config_command() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server\nurl = ").unwrap();

        deck_with(&path).args(["config", "path"]).assert().success();
        deck_with(&path)
            .arg("jobs")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn jobs_requires_server() {
        let dir = TempDir::new().unwrap();

        deck_with(&dir.path().join("config.toml"))
            .arg("jobs")
            .assert()
            .failure()
            .stderr(predicate::str::contains("not configured"))
            .stderr(predicate::str::contains("deck config init"));
    }

    #[test]
    fn trigger_rejects_malformed_param() {
        deck()
            .args(["trigger", "app", "-p", "novalue"])
            .assert()
            .failure();
    }

    #[test]
    fn completions_bash() {
        deck()
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("deck"));
    }
}

mod client_tests {
    use jenkins_deck::api::{CiApi, ColorBase, JenkinsClient};
    use jenkins_deck::config::ServerConfig;
    use jenkins_deck::error::DeckError;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, use_crumb: bool) -> JenkinsClient {
        JenkinsClient::new(&ServerConfig {
            url: server.uri(),
            username: "alice".to_string(),
            api_token: "token".to_string(),
            use_crumb,
            ..ServerConfig::default()
        })
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn jobs_flatten_folders() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/json"))
            // base64("alice:token")
            .and(header("Authorization", "Basic YWxpY2U6dG9rZW4="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jobs": [
                    {
                        "name": "team",
                        "url": "http://ci/job/team/",
                        "jobs": [{
                            "name": "app",
                            "fullName": "team/app",
                            "url": "http://ci/job/team/job/app/",
                            "color": "red_anime",
                            "lastBuild": { "number": 7, "result": null }
                        }]
                    },
                    { "name": "docs", "url": "http://ci/job/docs/", "color": "blue" }
                ]
            })))
            .mount(&server)
            .await;

        let jobs = client(&server, false).jobs().await.unwrap();
        assert_eq!(jobs.len(), 2);

        let app = jobs.iter().find(|j| j.fullname == "team/app").unwrap();
        assert_eq!(app.color.base, ColorBase::Failure);
        assert!(app.color.running);
        assert_eq!(app.last_build.as_ref().map(|b| b.number), Some(7));

        let docs = jobs.iter().find(|j| j.fullname == "docs").unwrap();
        assert_eq!(docs.color.base, ColorBase::Success);
        assert!(docs.last_build.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_wfapi_means_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/job/freestyle/3/wfapi/describe"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/job/freestyle/3/wfapi/pendingInputActions"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client(&server, false);
        assert!(client.stages("freestyle", 3).await.unwrap().is_empty());
        assert!(client.pending_inputs("freestyle", 3).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn server_error_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/queue/api/json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client(&server, false).queue().await.unwrap_err();
        assert!(matches!(err, DeckError::Status { code: 500, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn trigger_reports_queue_id() {
        let server = MockServer::start().await;
        let location = format!("{}/queue/item/42/", server.uri());
        Mock::given(method("POST"))
            .and(path("/job/team/job/app/buildWithParameters"))
            .respond_with(ResponseTemplate::new(201).insert_header("Location", location.as_str()))
            .expect(1)
            .mount(&server)
            .await;

        let params = vec![("BRANCH".to_string(), "main".to_string())];
        let queue_id = client(&server, false)
            .trigger_build("team/app", &params)
            .await
            .unwrap();
        assert_eq!(queue_id, Some(42));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn mutations_carry_crumb() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/crumbIssuer/api/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "crumb": "abc123",
                "crumbRequestField": "Jenkins-Crumb"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/job/app/12/stop"))
            .and(header("Jenkins-Crumb", "abc123"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/queue/cancelItem"))
            .and(query_param("id", "9"))
            .and(header("Jenkins-Crumb", "abc123"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = client(&server, true);
        client.stop_build("app", 12).await.unwrap();
        client.cancel_queue_item(9).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn input_submit_endpoints() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/job/app/4/input/Deploy/proceedEmpty"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/job/app/4/input/Deploy/submit"))
            .and(body_string_contains("proceed=Proceed"))
            .and(body_string_contains("TARGET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/job/app/4/input/Deploy/abort"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server, false);
        client.submit_input("app", 4, "Deploy", &[]).await.unwrap();
        let params = vec![("TARGET".to_string(), "prod".to_string())];
        client.submit_input("app", 4, "Deploy", &params).await.unwrap();
        client.abort_input("app", 4, "Deploy").await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn console_reads_progressive_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/job/app/5/logText/progressiveText"))
            .and(query_param("start", "100"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("X-Text-Size", "111")
                    .insert_header("X-More-Data", "true")
                    .set_body_string("hello world"),
            )
            .mount(&server)
            .await;

        let chunk = client(&server, false).console_text("app", 5, 100).await.unwrap();
        assert_eq!(chunk.text, "hello world");
        assert_eq!(chunk.next_offset, 111);
        assert!(chunk.more_data);
    }

    #[test]
    fn unconfigured_server_is_rejected() {
        let err = JenkinsClient::new(&ServerConfig::default()).err().unwrap();
        assert!(err.is_not_configured());
    }
}
