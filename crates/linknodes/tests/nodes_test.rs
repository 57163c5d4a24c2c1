// crates/linknodes/tests/nodes_test.rs

use async_trait::async_trait;
use linkcore::{
    predicate, Chain, ChainNode, NodeArgs, NodeError, Transition, Value,
};
use linknodes::{
    DeadlineNode, DebugNode, Fetch, Field, HttpNode, HttpRequest, HttpResponse, JsonParse,
    SuccessStatus, TickerNode,
};
use linkruntime::{ChainRuntime, RunOutcome};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_test_writer()
        .try_init();
}

/// Context counting guard evaluations
#[derive(Default)]
struct Probe {
    guards: AtomicUsize,
}

/// Collect every payload dispatched under `event`.
fn capture<G: Send + Sync + 'static>(chain: &Chain<G>, event: &str) -> Arc<Mutex<Vec<Value>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    chain.subscribe(event, move |_chain, payload| {
        let sink = Arc::clone(&sink);
        async move {
            sink.lock().push(payload);
        }
    });
    seen
}

/// Fetch double answering from a canned result
struct StubFetch {
    result: Result<HttpResponse, NodeError>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

#[async_trait]
impl Fetch for StubFetch {
    async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse, NodeError> {
        self.requests.lock().push(request);
        self.result.clone()
    }
}

fn request_payload() -> Value {
    Value::object([("url", "https://example.test"), ("method", "GET")])
}

fn counting_guard() -> Transition<Probe> {
    Transition::new(
        predicate(|data: &Value, ctx: &Probe| {
            ctx.guards.fetch_add(1, Ordering::SeqCst);
            data.get("status").is_some()
        }),
        "status",
        Field::new("status"),
    )
}

#[tokio::test(start_paused = true)]
async fn test_deadline_fires_once_after_three_ticks() {
    init_tracing();
    let chain = Chain::new(());
    let ticker = TickerNode::new(&chain, NodeArgs::new("ticker"), Duration::from_secs(1));
    let deadline = DeadlineNode::new(
        &chain,
        NodeArgs::new("timeout").with_transition(Transition::always("timed_out")),
        Duration::from_secs(3),
    );
    let fired = capture(&chain, "timeout");
    let downstream = capture(&chain, "timed_out");

    chain.start();
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(fired.lock().is_empty());
    assert!(!deadline.has_fired());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(ticker.ticks(), 3);
    assert_eq!(*fired.lock(), vec![Value::from(3u64)]);
    assert_eq!(*downstream.lock(), vec![Value::from(3u64)]);
    assert_eq!(deadline.node().transformed(), Some(Value::from(3u64)));

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(ticker.ticks(), 4);
    assert_eq!(fired.lock().len(), 1);
    assert!(deadline.has_fired());
    chain.stop();
}

#[tokio::test(start_paused = true)]
async fn test_deadlines_share_one_ticker() {
    let chain = Chain::new(());
    TickerNode::new(&chain, NodeArgs::new("ticker"), Duration::from_secs(1));
    DeadlineNode::new(&chain, NodeArgs::new("short"), Duration::from_secs(1));
    DeadlineNode::new(&chain, NodeArgs::new("long"), Duration::from_secs(2));
    let short = capture(&chain, "short");
    let long = capture(&chain, "long");

    chain.start();
    tokio::time::sleep(Duration::from_millis(5500)).await;
    chain.stop();

    assert_eq!(*short.lock(), vec![Value::from(1u64)]);
    assert_eq!(*long.lock(), vec![Value::from(2u64)]);
}

#[tokio::test(start_paused = true)]
async fn test_runtime_waits_for_deadline() {
    let chain = Chain::new(());
    TickerNode::new(&chain, NodeArgs::new("ticker"), Duration::from_millis(100));
    DeadlineNode::with_unit(
        &chain,
        NodeArgs::new("timeout"),
        Duration::from_millis(450),
        Duration::from_millis(100),
    );

    let outcome = ChainRuntime::new(chain).run(None, "timeout").await;

    assert_eq!(outcome, RunOutcome::Completed(Value::from(5u64)));
}

#[tokio::test]
async fn test_http_node_continues_with_response() {
    init_tracing();
    let chain = Chain::new(Probe::default());
    let requests = Arc::new(Mutex::new(Vec::new()));
    let fetch = StubFetch {
        result: Ok(HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: r#"{"zen":"keep it logically awesome"}"#.to_string(),
        }),
        requests: Arc::clone(&requests),
    };
    HttpNode::with_fetch(
        &chain,
        NodeArgs::new("fetch")
            .with_name("Fetch zen")
            .with_transition(counting_guard())
            .with_transition(Transition::new(SuccessStatus, "parsed", JsonParse)),
        fetch,
    );
    let status = capture(&chain, "status");
    let parsed = capture(&chain, "parsed");

    chain.dispatch("fetch", request_payload()).await;

    assert_eq!(*requests.lock(), vec![HttpRequest::get("https://example.test")]);
    assert_eq!(chain.context().guards.load(Ordering::SeqCst), 1);
    assert_eq!(*status.lock(), vec![Value::Number(200.0)]);
    assert_eq!(
        *parsed.lock(),
        vec![Value::Json(serde_json::json!({"zen": "keep it logically awesome"}))]
    );
    assert!(!chain.is_halted());
}

#[tokio::test]
async fn test_http_failure_halts_without_transitions() {
    let chain = Chain::new(Probe::default());
    let fetch = StubFetch {
        result: Err(NodeError::RequestFailed("connection refused".to_string())),
        requests: Arc::new(Mutex::new(Vec::new())),
    };
    HttpNode::with_fetch(
        &chain,
        NodeArgs::new("fetch").with_transition(counting_guard()),
        fetch,
    );
    let status = capture(&chain, "status");

    chain.dispatch("fetch", request_payload()).await;

    assert_eq!(chain.context().guards.load(Ordering::SeqCst), 0);
    assert!(status.lock().is_empty());
    assert!(chain.is_halted());
    assert_eq!(
        chain.halt_reason().as_deref(),
        Some("Request failed: connection refused")
    );
}

#[tokio::test]
async fn test_http_rejects_payload_without_url() {
    let chain = Chain::new(Probe::default());
    let requests = Arc::new(Mutex::new(Vec::new()));
    let fetch = StubFetch {
        result: Err(NodeError::RequestFailed("unreachable".to_string())),
        requests: Arc::clone(&requests),
    };
    HttpNode::with_fetch(&chain, NodeArgs::new("fetch"), fetch);

    chain.dispatch("fetch", Value::object([("method", "GET")])).await;

    assert!(requests.lock().is_empty());
    assert_eq!(chain.halt_reason().as_deref(), Some("Missing required input: url"));
}

#[tokio::test]
async fn test_debug_node_forwards_payload() {
    let chain = Chain::new(());
    let node = DebugNode::new(
        &chain,
        NodeArgs::new("log").with_transition(Transition::always("next")),
    );
    let next = capture(&chain, "next");

    chain.dispatch("log", Value::from("hello")).await;

    assert_eq!(*next.lock(), vec![Value::from("hello")]);
    assert_eq!(node.transformed(), Some(Value::from("hello")));
}

#[tokio::test]
async fn test_shared_event_reaches_http_and_plain_node() {
    let chain = Chain::new(Probe::default());
    let fetch = StubFetch {
        result: Ok(HttpResponse {
            status: 503,
            headers: HashMap::new(),
            body: String::new(),
        }),
        requests: Arc::new(Mutex::new(Vec::new())),
    };
    HttpNode::with_fetch(
        &chain,
        NodeArgs::new("fetch").with_transition(Transition::new(SuccessStatus, "parsed", JsonParse)),
        fetch,
    );
    let audit = ChainNode::new(&chain, NodeArgs::new("fetch"));
    let parsed = capture(&chain, "parsed");

    chain.dispatch("fetch", request_payload()).await;

    assert!(parsed.lock().is_empty());
    assert_eq!(audit.transformed(), Some(request_payload()));
    assert!(!chain.is_halted());
}
