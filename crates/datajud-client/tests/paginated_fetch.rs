//! End-to-end pagination against a local mock of the `_search` endpoint.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use chrono::NaiveDate;
use datajud_client::{ClientConfig, Fetcher, SearchClient, StopReason};
use datajud_core::{Flattener, QuerySpec, SearchRequest, SearchWindow, dedupe_cases};
use serde_json::{Value, json};

const FIRST_PAGE: usize = 100;
const SECOND_PAGE: usize = 37;

#[derive(Clone, Default)]
struct Mock {
    requests: Arc<Mutex<Vec<Value>>>,
    /// Fail every request after this many with a 500.
    fail_after: Option<usize>,
    /// Replace the last first-page hit's `sort` with a string.
    bad_last_sort: bool,
}

fn hit(i: usize, cnj: &str) -> Value {
    json!({
        "_index": "api_publica_tjgo",
        "_source": {
            "numeroProcesso": cnj,
            "classe": { "codigo": 7, "nome": "Procedimento Comum Cível" },
            "dataAjuizamento": "20230501000000",
            "assuntos": [{ "codigo": 14205, "nome": "Proteção de Dados" }],
            "orgaoJulgador": { "nome": "1ª Vara Cível", "codigoMunicipioIBGE": 5208707 }
        },
        "sort": [1_700_000_000_000i64 - (i as i64) * 1000, sort_id(i)]
    })
}

fn sort_id(i: usize) -> String {
    format!("{i:07}")
}

fn cnj(i: usize) -> String {
    format!("{i:07}-00.2023.8.09.0051")
}

async fn search(
    State(mock): State<Mock>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let seen = {
        let mut reqs = mock.requests.lock().unwrap();
        reqs.push(body.clone());
        reqs.len()
    };

    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if auth != "ApiKey test-key" {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "bad key" })));
    }
    if mock.fail_after.is_some_and(|n| seen > n) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "shard failure" })),
        );
    }

    let mut hits: Vec<Value> = match body.get("search_after") {
        None => (0..FIRST_PAGE).map(|i| hit(i, &cnj(i))).collect(),
        Some(after) if after[1] == sort_id(FIRST_PAGE - 1) => (FIRST_PAGE
            ..FIRST_PAGE + SECOND_PAGE)
            .map(|i| {
                // Page two opens with a case already seen on page one.
                let id = if i == FIRST_PAGE { cnj(0) } else { cnj(i) };
                hit(i, &id)
            })
            .collect(),
        Some(_) => Vec::new(),
    };
    if mock.bad_last_sort && body.get("search_after").is_none() {
        if let Some(last) = hits.last_mut() {
            last["sort"] = json!("oops");
        }
    }

    (
        StatusCode::OK,
        Json(json!({ "took": 3, "hits": { "total": { "value": 137 }, "hits": hits } })),
    )
}

async fn serve(mock: Mock) -> SocketAddr {
    let app = Router::new()
        .route("/api_publica_tjgo/_search", post(search))
        .with_state(mock);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn config(addr: SocketAddr, key: &str) -> ClientConfig {
    ClientConfig::new(Some(key), "tjgo", &format!("http://{addr}"))
        .unwrap()
        .with_timeout(Some(Duration::from_secs(5)))
        .with_page_delay(Duration::ZERO)
}

fn request() -> SearchRequest {
    let d = |m, day| {
        NaiveDate::from_ymd_opt(2023, m, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    };
    SearchRequest::new(SearchWindow::new(d(1, 1), d(12, 31)).unwrap(), QuerySpec::lgpd())
}

#[tokio::test]
async fn two_pages_then_empty() {
    let mock = Mock::default();
    let addr = serve(mock.clone()).await;
    let cfg = config(addr, "test-key");
    let fetcher = Fetcher::from_config(SearchClient::new(&cfg).unwrap(), &cfg);

    let outcome = fetcher.fetch_all(&request()).await;
    assert_eq!(outcome.stop, StopReason::Exhausted);
    assert_eq!(outcome.pages, 2);
    assert_eq!(outcome.records.len(), 137);
    assert_eq!(mock.requests.lock().unwrap().len(), 3);

    let flattener = Flattener::new(NaiveDate::from_ymd_opt(2023, 6, 1).unwrap());
    let rows = dedupe_cases(flattener.flatten(&outcome.records));
    assert!(rows.len() <= 137);
    assert_eq!(rows.len(), 136);
    assert_eq!(rows[0].cnj, cnj(0));
    assert_eq!(rows[0].filing_date, "01/05/2023");
    assert_eq!(rows[0].subjects, "Proteção de Dados");
    assert_eq!(rows[0].court_unit, "1ª Vara Cível");
}

#[tokio::test]
async fn rejected_key_stops_with_401() {
    let mock = Mock::default();
    let addr = serve(mock.clone()).await;
    let cfg = config(addr, "wrong-key");
    let fetcher = Fetcher::from_config(SearchClient::new(&cfg).unwrap(), &cfg);

    let outcome = fetcher.fetch_all(&request()).await;
    assert!(outcome.records.is_empty());
    assert!(matches!(outcome.stop, StopReason::Server { status: 401, .. }));
}

#[tokio::test]
async fn server_failure_mid_run_keeps_first_page() {
    let mock = Mock {
        fail_after: Some(1),
        ..Mock::default()
    };
    let addr = serve(mock.clone()).await;
    let cfg = config(addr, "test-key");
    let fetcher = Fetcher::from_config(SearchClient::new(&cfg).unwrap(), &cfg);

    let outcome = fetcher.fetch_all(&request()).await;
    assert_eq!(outcome.records.len(), 100);
    match outcome.stop {
        StopReason::Server { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("shard failure"));
        }
        other => panic!("expected server error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_server_is_a_transport_stop() {
    // Bind then drop to get a port nobody is listening on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let cfg = config(addr, "test-key");
    let fetcher = Fetcher::from_config(SearchClient::new(&cfg).unwrap(), &cfg);
    let outcome = fetcher.fetch_all(&request()).await;
    assert!(outcome.records.is_empty());
    assert!(matches!(outcome.stop, StopReason::Transport(_)));
}

#[tokio::test]
async fn malformed_sort_on_last_hit_keeps_page() {
    let mock = Mock {
        bad_last_sort: true,
        ..Mock::default()
    };
    let addr = serve(mock.clone()).await;
    let cfg = config(addr, "test-key");
    let fetcher = Fetcher::from_config(SearchClient::new(&cfg).unwrap(), &cfg);

    let outcome = fetcher.fetch_all(&request()).await;
    assert_eq!(outcome.records.len(), FIRST_PAGE);
    assert_eq!(outcome.stop, StopReason::MissingCursor);
    assert_eq!(mock.requests.lock().unwrap().len(), 1);
}
