use std::sync::Mutex;

use pullman::app::{self, App, TestFailureMode};
use pullman::server::{self, Server};

// Entity CRUD goes through HOME-relative config paths; serialize tests that
// repoint HOME so they do not race.
static HOME_LOCK: Mutex<()> = Mutex::new(());

fn with_temp_home<T>(f: impl FnOnce() -> T) -> T {
    let _guard = HOME_LOCK.lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let old_home = std::env::var("HOME").ok();
    std::env::set_var("HOME", dir.path());
    let result = f();
    match old_home {
        Some(home) => std::env::set_var("HOME", home),
        None => std::env::remove_var("HOME"),
    }
    result
}

fn sample_server(id: &str) -> Server {
    Server {
        id: id.to_string(),
        host: "203.0.113.7".to_string(),
        user: "deploy".to_string(),
        port: 22,
        identity_file: None,
    }
}

fn sample_app(id: &str) -> App {
    let mut app: App = serde_json::from_str(
        r#"{
            "repoUrl": "git@github.com:acme/flaskapp.git",
            "remotePath": "/home/deploy/flaskapp"
        }"#,
    )
    .unwrap();
    app.id = id.to_string();
    app
}

#[test]
fn server_roundtrip() {
    with_temp_home(|| {
        server::create(sample_server("web")).unwrap();
        assert!(server::exists("web"));

        let loaded = server::load("web").unwrap();
        assert_eq!(loaded.host, "203.0.113.7");
        assert_eq!(loaded.user, "deploy");
        assert_eq!(loaded.port, 22);

        let servers = server::list().unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].id, "web");

        server::delete("web").unwrap();
        assert!(!server::exists("web"));
    });
}

#[test]
fn duplicate_server_create_is_rejected() {
    with_temp_home(|| {
        server::create(sample_server("web")).unwrap();
        let err = server::create(sample_server("web")).unwrap_err();
        assert_eq!(err.code.as_str(), "validation.invalid_argument");
    });
}

#[test]
fn app_roundtrip_applies_defaults() {
    with_temp_home(|| {
        app::create(sample_app("flaskapp")).unwrap();

        let loaded = app::load("flaskapp").unwrap();
        assert_eq!(loaded.branch, "main");
        assert_eq!(loaded.manifest, "requirements.txt");
        assert_eq!(loaded.venv_dir, "venv");
        assert_eq!(loaded.python, "python3");
        assert_eq!(loaded.test_failure, TestFailureMode::Suppress);
        assert!(loaded.branches.is_empty());
        assert!(!loaded.create_missing_branch);
    });
}

#[test]
fn load_suggests_similar_ids() {
    with_temp_home(|| {
        app::create(sample_app("flaskapp")).unwrap();

        let err = app::load("flaskap").unwrap_err();
        assert_eq!(err.code.as_str(), "app.not_found");
        assert_eq!(err.details["similar"][0], "flaskapp");
    });
}

#[test]
fn app_and_server_ids_cannot_collide() {
    with_temp_home(|| {
        server::create(sample_server("web")).unwrap();
        let err = app::create(sample_app("web")).unwrap_err();
        assert_eq!(err.code.as_str(), "config.id_collision");
    });
}

#[test]
fn invalid_service_unit_is_rejected_on_save() {
    with_temp_home(|| {
        let mut app = sample_app("flaskapp");
        app.service_unit = Some("not a unit".to_string());
        let err = app::create(app).unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_value");
    });
}

#[test]
fn app_referencing_unknown_server_is_rejected() {
    with_temp_home(|| {
        let mut app = sample_app("flaskapp");
        app.server_id = Some("missing".to_string());
        let err = app::create(app).unwrap_err();
        assert_eq!(err.code.as_str(), "server.not_found");
    });
}
