//! Lifecycle coordinator ordering guarantees: the backend strictly
//! brackets user startup/shutdown code, and no events are lost at exit.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use jhalog::{Backend, BoxError, Config, Jhalog, LogEvent, MemoryBackend};

/// Records every backend call and lets tests interleave their own marks,
/// so relative ordering can be asserted exactly.
#[derive(Default)]
struct RecordingBackend {
    ops: Arc<Mutex<Vec<String>>>,
    fail_start: bool,
}

impl RecordingBackend {
    fn mark(ops: &Arc<Mutex<Vec<String>>>, what: &str) {
        ops.lock().unwrap().push(what.to_owned());
    }
}

impl Backend for RecordingBackend {
    fn start(&self) -> Result<(), BoxError> {
        if self.fail_start {
            return Err("refused to start".into());
        }
        Self::mark(&self.ops, "start");
        Ok(())
    }

    fn stop(&self) {
        Self::mark(&self.ops, "stop");
    }

    fn emit(&self, event: LogEvent) {
        let kind = event.get("type").and_then(|v| v.as_str()).unwrap_or("?");
        Self::mark(&self.ops, &format!("emit:{kind}"));
    }
}

fn recording() -> (Jhalog, Arc<Mutex<Vec<String>>>) {
    let ops = Arc::new(Mutex::new(Vec::new()));
    let backend = RecordingBackend { ops: Arc::clone(&ops), fail_start: false };
    let log = Jhalog::new(Config::new().backend(Arc::new(backend) as Arc<dyn Backend>)).unwrap();
    (log, ops)
}

#[tokio::test]
async fn startup_brackets_the_user_hook() {
    let (log, ops) = recording();

    let hook_ops = Arc::clone(&ops);
    log.startup(|| async move {
        RecordingBackend::mark(&hook_ops, "user-startup");
    })
    .await
    .unwrap();

    assert_eq!(*ops.lock().unwrap(), ["start", "user-startup", "emit:startup"]);
}

#[tokio::test]
async fn shutdown_event_lands_before_the_backend_closes() {
    let (log, ops) = recording();
    log.startup(|| async {}).await.unwrap();

    let hook_ops = Arc::clone(&ops);
    log.shutdown(|| async move {
        RecordingBackend::mark(&hook_ops, "user-shutdown");
    })
    .await
    .unwrap();

    assert_eq!(
        *ops.lock().unwrap(),
        ["start", "emit:startup", "user-shutdown", "emit:shutdown", "stop"]
    );
}

#[tokio::test]
async fn startup_event_carries_server_identity_and_uptimes() {
    let backend = Arc::new(MemoryBackend::new());
    let log = Jhalog::new(
        Config::new()
            .backend(Arc::clone(&backend) as Arc<dyn Backend>)
            .server_version("2.4.1"),
    )
    .unwrap();

    log.startup(|| async {
        tokio::time::sleep(Duration::from_millis(20)).await;
    })
    .await
    .unwrap();

    let ev = &backend.events()[0];
    assert_eq!(ev.get("type").unwrap(), "startup");
    assert_eq!(ev.get("level").unwrap(), "info");
    assert_eq!(ev.get("server_version").unwrap(), "2.4.1");
    assert!(!ev.get("id").unwrap().as_str().unwrap().is_empty());
    assert!(!ev.get("server_id").unwrap().as_str().unwrap().is_empty());
    // Emitted after the user hook: at least the hook's sleep has elapsed.
    assert!(ev.get("server_uptime").unwrap().as_f64().unwrap() >= 0.02);
    #[cfg(target_os = "linux")]
    assert!(ev.get("os_uptime").unwrap().as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn shutdown_event_reports_uptime_without_os_uptime() {
    let backend = Arc::new(MemoryBackend::new());
    let log =
        Jhalog::new(Config::new().backend(Arc::clone(&backend) as Arc<dyn Backend>)).unwrap();

    log.startup(|| async {}).await.unwrap();
    log.shutdown(|| async {}).await.unwrap();

    let events = backend.events();
    assert_eq!(events.len(), 2);
    let ev = &events[1];
    assert_eq!(ev.get("type").unwrap(), "shutdown");
    assert!(ev.get("server_uptime").unwrap().as_f64().unwrap() >= 0.0);
    assert!(ev.get("os_uptime").is_none());
    // Both lifecycle events name the same server instance.
    assert_eq!(ev.get("server_id").unwrap(), events[0].get("server_id").unwrap());
}

#[tokio::test]
async fn startup_twice_is_a_lifecycle_error() {
    let (log, _ops) = recording();
    log.startup(|| async {}).await.unwrap();

    let err = log.startup(|| async {}).await.unwrap_err();
    assert!(matches!(err, jhalog::Error::Lifecycle { .. }));
}

#[tokio::test]
async fn shutdown_before_startup_is_a_lifecycle_error() {
    let (log, ops) = recording();

    let err = log.shutdown(|| async {}).await.unwrap_err();
    assert!(matches!(err, jhalog::Error::Lifecycle { .. }));
    // Nothing ran: no event, no stop.
    assert!(ops.lock().unwrap().is_empty());
}

#[tokio::test]
async fn backend_start_failure_aborts_startup() {
    let ops = Arc::new(Mutex::new(Vec::new()));
    let backend = RecordingBackend { ops: Arc::clone(&ops), fail_start: true };
    let log = Jhalog::new(Config::new().backend(Arc::new(backend) as Arc<dyn Backend>)).unwrap();

    let hook_ops = Arc::clone(&ops);
    let err = log
        .startup(|| async move {
            RecordingBackend::mark(&hook_ops, "user-startup");
        })
        .await
        .unwrap_err();

    assert!(matches!(err, jhalog::Error::BackendStart(_)));
    // The user hook never ran and no event was emitted.
    assert!(ops.lock().unwrap().is_empty());
}

#[tokio::test]
async fn requests_and_lifecycle_share_one_backend() {
    async fn hello(_req: http::Request<bytes::Bytes>) -> jhalog::Response {
        http::Response::new(http_body_util::Full::new(bytes::Bytes::from_static(b"ok")))
    }

    let backend = Arc::new(MemoryBackend::new());
    let log = Jhalog::new(
        Config::new()
            .backend(Arc::clone(&backend) as Arc<dyn Backend>)
            .request_timeout(Duration::ZERO),
    )
    .unwrap();
    let app = log.wrap(hello);

    log.startup(|| async {}).await.unwrap();
    app.call(http::Request::builder().uri("/").body(bytes::Bytes::new()).unwrap())
        .await;
    log.shutdown(|| async {}).await.unwrap();

    let kinds: Vec<String> = backend
        .events()
        .iter()
        .map(|ev| ev.get("type").unwrap().as_str().unwrap().to_owned())
        .collect();
    assert_eq!(kinds, ["startup", "access", "shutdown"]);
}
