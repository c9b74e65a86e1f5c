//! Server render, embed snapshot, hydrate on the client.

use std::cell::RefCell;
use std::io::Write as _;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use serde_json::{Value as Json, json};
use wade::http::{RecordingBackend, TransportError, render_snapshot_block};
use wade::prelude::*;

struct Server;

impl HttpBackend for Server {
    fn send(&self, request: &Request) -> Result<Response, TransportError> {
        match request.url.as_str() {
            "/api/todos" => Ok(Response::new(200, r#"["write docs","ship"]"#)
                .with_header("Content-Type", "application/json")),
            _ => Ok(Response::new(404, "")),
        }
    }
}

struct Offline;

impl HttpBackend for Offline {
    fn send(&self, _request: &Request) -> Result<Response, TransportError> {
        Err(TransportError::failed("offline"))
    }
}

fn rendered_page() -> String {
    let recorder = RecordingBackend::new(Server);
    recorder.send(&Request::get("/api/todos")).unwrap();
    let block = render_snapshot_block(&recorder.snapshot_json().unwrap(), "text/wadehttp");
    format!("<!doctype html><html><head>{block}</head><body></body></html>")
}

fn load_todos(model: &ModelObject, response: &Response) {
    let todos: Json = serde_json::from_str(&response.body).unwrap();
    model.set("todos", Value::from_json(todos));
}

#[test]
fn hydrated_response_drives_next_checkpoint() {
    let mut app = App::new(WadeConfig::default());
    let model = ModelObject::new().with("todos", ObservableSeq::from_values(["(none)"]));
    let text: Rc<RefCell<Json>> = Rc::default();
    let sink = Rc::clone(&text);
    app.bind_text("first: {{todos.0}}", &model, move |v: &Json| {
        *sink.borrow_mut() = v.clone();
    })
    .unwrap();
    app.flush();
    assert_eq!(*text.borrow(), json!("first: (none)"));

    let backend = app.hydration_backend(Offline, &rendered_page()).unwrap();
    let response = backend.send(&Request::get("/api/todos")).unwrap();
    assert_eq!(response.header("content-type"), Some("application/json"));
    load_todos(&model, &response);
    assert!(app.scheduler().is_scheduled());

    let report = app.flush();
    assert_eq!(report.wakes, 1);
    assert_eq!(report.evaluated.len(), 1);
    assert_eq!(*text.borrow(), json!("first: write docs"));

    let second = backend.send(&Request::get("/api/todos"));
    assert!(matches!(second, Err(TransportError::Failed { .. })));
}

#[test]
fn responses_on_other_threads_wake_the_app() {
    let mut app = App::new(WadeConfig::default());
    let backend = app.hydration_backend(Offline, &rendered_page()).unwrap();

    let body = thread::scope(|scope| {
        scope
            .spawn(|| backend.send(&Request::get("/api/todos")).map(|r| r.body))
            .join()
            .unwrap()
    })
    .unwrap();
    assert!(body.contains("ship"));

    let report = app.wait(Duration::from_secs(5)).unwrap();
    assert_eq!(report.wakes, 1);
}

#[test]
fn page_without_snapshot_goes_live() {
    let app = App::new(WadeConfig::default());
    let backend = app
        .hydration_backend(Server, "<html><body></body></html>")
        .unwrap();
    assert_eq!(backend.send(&Request::get("/api/todos")).unwrap().status, 200);
}

#[test]
fn malformed_snapshot_is_fatal() {
    let app = App::new(WadeConfig::default());
    let page = r#"<script type="text/wadehttp">{"GET /x -": [</script>"#;
    assert!(matches!(
        app.hydration_backend(Offline, page),
        Err(Error::Snapshot(_))
    ));
}

#[test]
fn config_file_selects_snapshot_block() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[cache]\nsnapshot_script_type = \"application/x-replay\"").unwrap();
    let config = WadeConfig::from_file(file.path()).unwrap();
    assert_eq!(config.cache.snapshot_script_type, "application/x-replay");

    let app = App::new(config);
    let page = rendered_page().replace("text/wadehttp", "application/x-replay");
    let backend = app.hydration_backend(Offline, &page).unwrap();
    assert!(backend.send(&Request::get("/api/todos")).is_ok());
}

#[test]
fn missing_config_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let err = WadeConfig::from_file(&path).unwrap_err();
    assert!(err.to_string().contains("absent.toml"));
}
