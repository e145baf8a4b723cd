//! End-to-end tests for the demo site: the router, the index view, and the
//! bundled templates, locales and site configuration.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use webplus_core::Settings;
use webplus_demo::env::{AppEnvironment, EnvironmentSource};
use webplus_demo::{router, AppState};

const FULL_ENV: [(&str, &str); 6] = [
    ("WP_APP_REGION_ID", "cn-hangzhou"),
    ("WP_APP_ID", "app-1"),
    ("WP_APP_NAME", "shop"),
    ("WP_ENV_ID", "env-1"),
    ("WP_ENV_NAME", "production"),
    ("WP_CHANGE_TRIGGER_FROM", "CLI"),
];

fn settings() -> Settings {
    Settings {
        base_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")),
        ..Settings::default()
    }
}

fn state_with(settings: Settings, vars: &[(&str, &str)]) -> AppState {
    let env = AppEnvironment::from_vars(vars.iter().copied());
    AppState::from_settings(settings, EnvironmentSource::Fixed(Arc::new(env))).unwrap()
}

async fn get(state: AppState, uri: &str, accept_language: Option<&str>) -> (StatusCode, String) {
    let mut builder = Request::builder().uri(uri);
    if let Some(lang) = accept_language {
        builder = builder.header("accept-language", lang);
    }
    let response = router(state)
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn test_index_in_english() {
    let (status, body) = get(state_with(settings(), &FULL_ENV), "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#"<html lang="en">"#), "{body}");
    assert!(body.contains("<title>Webplus Demo</title>"), "{body}");
    assert!(body.contains("Welcome to webplus-demo"), "{body}");
    assert!(body.contains("Deployed from the command line."), "{body}");
    assert!(!body.contains("Deployed from the console"), "{body}");
    assert!(
        body.contains(r#"<a href="https://console.example.com/cn-hangzhou/apps/app-1">shop</a> (app-1)"#),
        "{body}"
    );
    assert!(body.contains("Download the deployment package"), "{body}");
    assert!(!body.contains("default"), "{body}");
}

#[tokio::test]
async fn test_index_in_chinese() {
    let (status, body) = get(state_with(settings(), &FULL_ENV), "/", Some("zh-CN,zh;q=0.9")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#"<html lang="zh">"#), "{body}");
    assert!(body.contains("欢迎访问 webplus-demo"), "{body}");
    assert!(body.contains("通过命令行部署。"), "{body}");
    assert!(body.contains("克隆 webplus-rs-demo 代码仓库："), "{body}");
}

#[tokio::test]
async fn test_other_language_renders_english() {
    let (_, body) = get(state_with(settings(), &FULL_ENV), "/", Some("fr-FR")).await;
    assert!(body.contains("Welcome to webplus-demo"), "{body}");
}

#[tokio::test]
async fn test_console_trigger() {
    let mut vars = FULL_ENV;
    vars[5] = ("WP_CHANGE_TRIGGER_FROM", "Console");
    let (_, body) = get(state_with(settings(), &vars), "/", None).await;
    assert!(
        body.contains("Deployed from the console at https://console.example.com/."),
        "{body}"
    );
    assert!(!body.contains("Deployed from the command line."), "{body}");
}

#[tokio::test]
async fn test_unknown_path_is_404() {
    let (status, body) = get(state_with(settings(), &FULL_ENV), "/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("/missing"));
}

#[tokio::test]
async fn test_missing_env_var_is_500() {
    let vars: Vec<_> = FULL_ENV
        .iter()
        .copied()
        .filter(|(name, _)| *name != "WP_APP_NAME")
        .collect();
    let (status, body) = get(state_with(settings(), &vars), "/", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("WP_APP_NAME"), "{body}");
}

#[tokio::test]
async fn test_missing_site_config_is_500() {
    let settings = Settings {
        site_config: PathBuf::from("does-not-exist.json"),
        ..settings()
    };
    let (status, _) = get(state_with(settings, &FULL_ENV), "/", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_config_is_read_per_request() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.json");
    let source = std::fs::read_to_string(settings().site_config_path()).unwrap();
    std::fs::write(&config_path, &source).unwrap();

    let settings = Settings {
        site_config: config_path.clone(),
        ..settings()
    };
    let state = state_with(settings, &FULL_ENV);

    let (_, body) = get(state.clone(), "/", None).await;
    assert!(body.contains("Welcome to webplus-demo"), "{body}");

    std::fs::write(&config_path, source.replace("webplus-demo", "renamed-site")).unwrap();
    let (_, body) = get(state, "/", None).await;
    assert!(body.contains("Welcome to renamed-site"), "{body}");
}
