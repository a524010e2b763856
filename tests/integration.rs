//! Integration tests for render-worker.
//!
//! These tests run a worker on an ephemeral port and talk to it over TCP.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

use render_worker::protocol::build_frame;
use render_worker::renderer::builtin::{self, DOCUMENT_RENDERER};
use render_worker::renderer::RenderResult;
use render_worker::{
    RenderCapability, RenderClient, RenderError, RenderRequest, RendererChoice, Worker, WorkerError,
};

/// Start a worker and return its address plus a shutdown trigger.
async fn start(
    seen: Arc<Mutex<Vec<Value>>>,
    with_global: bool,
) -> (SocketAddr, oneshot::Sender<()>) {
    let mut builder = Worker::builder()
        .configure(builtin::install)
        .renderer("home", move |req: &RenderRequest| {
            seen.lock().unwrap().push(req.json_data.clone());
            Ok(format!("<html>{}</html>", req.url))
        })
        .renderer("broken", |_req: &RenderRequest| Err(RenderError::new("template exploded")))
        .declare("admin");
    if with_global {
        builder = builder.global_renderer("home");
    }

    let worker = builder.bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let addr = worker.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        worker
            .serve_with_shutdown(async {
                let _ = rx.await;
            })
            .await
            .unwrap();
    });

    (addr, tx)
}

/// Send raw frame bytes in the given chunk sizes and read the whole reply.
async fn send_raw(addr: SocketAddr, bytes: &[u8], chunk: usize) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.set_nodelay(true).unwrap();
    for part in bytes.chunks(chunk) {
        stream.write_all(part).await.unwrap();
        stream.flush().await.unwrap();
    }
    let mut reply = String::new();
    stream.read_to_string(&mut reply).await.unwrap();
    reply
}

/// The `/home` scenario with hand-built wire bytes.
#[tokio::test]
async fn test_home_scenario_over_tcp() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (addr, _shutdown) = start(Arc::clone(&seen), true).await;

    let frame = build_frame(
        br#"{"requestId":"r1","url":"/home"}"#,
        br#""\"{\\\"a\\\":1}\"""#,
    )
    .unwrap();

    for chunk in [frame.len(), 7, 1] {
        let reply = send_raw(addr, &frame, chunk).await;
        assert_eq!(reply, "<html>/home</html>");
    }

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert!(seen.iter().all(|v| *v == json!({"a": 1})));
}

/// Client round trip through the global renderer.
#[tokio::test]
async fn test_client_global_renderer() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (addr, _shutdown) = start(Arc::clone(&seen), true).await;

    let client = RenderClient::new(addr).with_global_renderer(true);
    let data = json!({"user": {"name": "Ada", "tags": ["a", "b"]}});
    let html = client
        .render("/profile?id=7", &data, RendererChoice::Global)
        .await
        .unwrap();

    assert_eq!(html, "<html>/profile?id=7</html>");
    assert_eq!(seen.lock().unwrap().as_slice(), &[data]);
}

/// Named renderer receives the escaped payload text untouched.
#[tokio::test]
async fn test_client_document_renderer_keeps_escaping() {
    let (addr, _shutdown) = start(Arc::new(Mutex::new(Vec::new())), true).await;

    let client = RenderClient::new(addr);
    let html = client
        .render(
            "/post",
            &json!({"body": "</script><img src=x onerror=alert(1)>"}),
            RendererChoice::Named(DOCUMENT_RENDERER.to_string()),
        )
        .await
        .unwrap();

    assert_eq!(html.matches("</script>").count(), 1);
    assert!(html.contains("\\u003c/script\\u003e"));
}

/// Every dispatch failure comes back as a typed error, never a success.
#[tokio::test]
async fn test_client_error_replies() {
    let (addr, _shutdown) = start(Arc::new(Mutex::new(Vec::new())), true).await;
    let client = RenderClient::new(addr);

    let cases = [
        ("missing", "Renderer not found: missing"),
        ("admin", "Renderer admin does not define a render method"),
        ("broken", "Exception during rendering: template exploded"),
    ];

    for (renderer, expected) in cases {
        let err = client
            .render("/", &json!(null), RendererChoice::Named(renderer.to_string()))
            .await
            .unwrap_err();
        match err {
            WorkerError::RenderFailed(detail) => assert_eq!(detail, expected),
            other => panic!("unexpected error for {renderer}: {other}"),
        }
    }
}

/// Without a global renderer the worker answers with an error.
#[tokio::test]
async fn test_no_global_renderer_over_tcp() {
    let (addr, _shutdown) = start(Arc::new(Mutex::new(Vec::new())), false).await;

    let frame = build_frame(br#"{"requestId":"r1","url":"/"}"#, br#""\"1\"""#).unwrap();
    let reply = send_raw(addr, &frame, frame.len()).await;

    assert!(reply.starts_with("ERROR:Renderer is not provided"));
}

/// Malformed input never takes the worker down.
#[tokio::test]
async fn test_malformed_frames_do_not_crash_worker() {
    let (addr, _shutdown) = start(Arc::new(Mutex::new(Vec::new())), true).await;

    let bad_meta = build_frame(&[0xC3, 0x28], br#""\"1\"""#).unwrap();
    let reply = send_raw(addr, &bad_meta, bad_meta.len()).await;
    assert!(reply.starts_with("ERROR:Failed to decode envelope"));

    let bad_data = build_frame(br#"{"requestId":1,"url":"/"}"#, b"{\"a\":1}").unwrap();
    let reply = send_raw(addr, &bad_data, bad_data.len()).await;
    assert!(reply.starts_with("ERROR:Failed to decode hydration data"));

    // Worker still serves valid requests afterwards.
    let client = RenderClient::new(addr).with_global_renderer(true);
    let html = client
        .render("/still-up", &json!(1), RendererChoice::Global)
        .await
        .unwrap();
    assert_eq!(html, "<html>/still-up</html>");
}

/// Connections are served concurrently and independently.
#[tokio::test]
async fn test_concurrent_requests() {
    let (addr, _shutdown) = start(Arc::new(Mutex::new(Vec::new())), true).await;
    let client = RenderClient::new(addr).with_global_renderer(true);

    let mut tasks = Vec::new();
    for i in 0..16 {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            client
                .render(&format!("/page/{i}"), &json!({"i": i}), RendererChoice::Global)
                .await
        }));
    }

    for (i, task) in tasks.into_iter().enumerate() {
        assert_eq!(task.await.unwrap().unwrap(), format!("<html>/page/{i}</html>"));
    }
}

/// Renders the length of a string payload.
struct SizeRenderer;

impl RenderCapability for SizeRenderer {
    fn render(&self, request: &RenderRequest) -> RenderResult {
        Ok(format!("{} chars", request.json_data.as_str().map_or(0, str::len)))
    }
}

/// A frame over the limit sent in full still gets the error reply.
#[tokio::test]
async fn test_client_oversized_frame_gets_error_reply() {
    let worker = Worker::builder()
        .renderer_impl("size", SizeRenderer)
        .global_renderer("size")
        .max_frame_size(1024)
        .bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let addr = worker.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        worker
            .serve_with_shutdown(async {
                let _ = rx.await;
            })
            .await
            .unwrap();
    });

    let client = RenderClient::new(addr).with_global_renderer(true);

    let html = client
        .render("/", &"y".repeat(100), RendererChoice::Global)
        .await
        .unwrap();
    assert_eq!(html, "100 chars");

    let err = client
        .render("/", &"y".repeat(4 << 20), RendererChoice::Global)
        .await
        .unwrap_err();
    match err {
        WorkerError::RenderFailed(detail) => {
            assert!(detail.starts_with("Frame body of"), "{detail}");
            assert!(detail.ends_with("exceeds maximum 1024"), "{detail}");
        }
        other => panic!("unexpected error: {other}"),
    }

    drop(tx);
}
