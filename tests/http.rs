use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, to_bytes};
use axum::extract::Query;
use axum::http::{HeaderMap, Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::util::ServiceExt;

use snomed_annotator::handlers::{AppState, router};
use snomed_annotator::{Annotator, SnowstormClient, Stopwords};

const LOOKUP_TIMEOUT: Duration = Duration::from_millis(300);

fn item(term: &str, concept_id: &str, fsn: &str, tag: &str) -> Value {
    json!({
        "term": term,
        "active": true,
        "concept": {
            "conceptId": concept_id,
            "active": true,
            "fsn": {"term": fsn, "semanticTag": tag, "lang": "en"},
        }
    })
}

/// Stand-in for the Snowstorm descriptions endpoint.
async fn descriptions(
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let fixed = [
        ("active", "true"),
        ("conceptActive", "true"),
        ("groupByConcept", "true"),
        ("searchMode", "STANDARD"),
        ("limit", "5"),
    ];
    for (key, value) in fixed {
        if params.get(key).map(String::as_str) != Some(value) {
            return (StatusCode::BAD_REQUEST, format!("bad {key}")).into_response();
        }
    }
    let lang = headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("none")
        .to_string();
    let term = params
        .get("term")
        .map(|t| t.to_lowercase())
        .unwrap_or_default();

    match term.as_str() {
        "agudo de miocardio" => Json(json!({
            "items": [item(
                "infarto agudo de miocardio",
                "57054005",
                "Acute myocardial infarction (disorder)",
                "disorder",
            )]
        }))
        .into_response(),
        "infarto" => Json(json!({
            "items": [
                item("infarto", "22298006", "Myocardial infarction (disorder)", "disorder"),
                item("infarto de miocardio", "22298006", "Myocardial infarction (disorder)", "disorder"),
            ]
        }))
        .into_response(),
        "infarto agudo" => Json(json!({
            "items": [item("Infarto", "22298006", "duplicate", "disorder")]
        }))
        .into_response(),
        "fibrilación auricular" => Json(json!({
            "items": [],
            "matches": [item("fibrilación auricular", "49436004", "Atrial fibrillation (disorder)", "disorder")]
        }))
        .into_response(),
        "fiebre" => Json(json!({
            "items": [item("fiebre", "386661006", &format!("Fever (finding) [{lang}]"), "finding")]
        }))
        .into_response(),
        "miocardio" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({
                "items": [item("miocardio", "74281007", "Myocardium structure (body structure)", "body structure")]
            }))
            .into_response()
        }
        "auricular" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        "agudo" => "not json".into_response(),
        _ => Json(json!({"items": [], "total": 0})).into_response(),
    }
}

async fn fake_snowstorm() -> String {
    let app = Router::new().route("/snowstorm/snomed-ct/v2/descriptions", get(descriptions));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn make_state(base: &str) -> AppState {
    let client = SnowstormClient::new(base, LOOKUP_TIMEOUT).unwrap();
    let annotator = Annotator::new(client, Arc::new(Stopwords::default()), "es");
    AppState {
        annotator: Arc::new(annotator),
        max_candidates_limit: 200,
    }
}

async fn post_annotate(state: AppState, body: Value) -> (StatusCode, Value) {
    let response = router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/annotate")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    read_json(response).await
}

async fn read_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let body_bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    (status, serde_json::from_slice(&body_bytes).unwrap())
}

fn candidate_list(body: &Value) -> Vec<String> {
    body["candidates"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c.as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn healthz_reports_configuration() {
    let state = make_state("http://snowstorm.test");
    let response = router(state)
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["snowstorm"], "http://snowstorm.test");
    assert_eq!(body["lang"], "es");
}

#[tokio::test]
async fn annotate_returns_validated_deduplicated_matches() {
    let base = fake_snowstorm().await;
    let raw = "Paciente con infarto agudo de miocardio y fibrilación auricular. PA 150/95 mmHg.";
    let (status, body) = post_annotate(make_state(&base), json!({ "text": raw })).await;
    assert_eq!(status, StatusCode::OK);

    let matches = body["matches"].as_array().unwrap();
    let found: Vec<(&str, &str)> = matches
        .iter()
        .map(|m| (m["match"].as_str().unwrap(), m["conceptId"].as_str().unwrap()))
        .collect();
    // The slow "miocardio" lookup times out; the 500 and non-JSON lookups
    // drop out without affecting anything else.
    assert_eq!(
        found,
        vec![
            ("infarto", "22298006"),
            ("fibrilación auricular", "49436004"),
            ("infarto agudo de miocardio", "57054005"),
        ]
    );
    assert!(!found.iter().any(|(term, _)| *term == "infarto de miocardio"));
    assert!(!found.iter().any(|(term, _)| *term == "miocardio"));

    let raw_chars: Vec<char> = raw.chars().collect();
    let mut seen = HashSet::new();
    for m in matches {
        let term = m["match"].as_str().unwrap();
        assert!(seen.insert((m["conceptId"].to_string(), term.to_lowercase())));
        let offsets = m["offsets"].as_array().unwrap();
        assert!(!offsets.is_empty());
        for off in offsets {
            let start = off["start"].as_u64().unwrap() as usize;
            let end = off["end"].as_u64().unwrap() as usize;
            let slice: String = raw_chars[start..end].iter().collect();
            assert_eq!(slice.to_lowercase(), term.to_lowercase());
        }
    }

    let candidates = candidate_list(&body);
    assert!(candidates.len() <= 60);
    assert!(candidates.contains(&"mmHg".to_string()));
    assert!(!candidates.contains(&"PA".to_string()));
    assert!(!candidates.contains(&"Paciente".to_string()));
    assert_eq!(body["lang"], "es");
    assert_eq!(body["source"], base);
    assert!(body["disclaimer"].as_str().unwrap().contains("Demo only"));
    assert!(body.get("note").is_none());
}

#[tokio::test]
async fn annotate_keeps_generation_order_for_first_occurrence() {
    let base = fake_snowstorm().await;
    let (_, body) = post_annotate(
        make_state(&base),
        json!({ "text": "infarto agudo", "max_candidates": 10 }),
    )
    .await;
    let matches = body["matches"].as_array().unwrap();
    // "Infarto" from the bigram lookup duplicates the unigram hit.
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0]["match"], "infarto");
    assert_eq!(matches[0]["fsn"], "Myocardial infarction (disorder)");
    assert_eq!(matches[0]["semanticTag"], "disorder");
}

#[tokio::test]
async fn annotate_empty_text_skips_lookups() {
    let state = make_state("http://127.0.0.1:1");
    for body in [json!({ "text": "" }), json!({ "text": "   " }), json!({})] {
        let (status, body) = post_annotate(state.clone(), body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["matches"], json!([]));
        assert_eq!(body["candidates"], json!([]));
        assert_eq!(body["note"], "Empty text");
    }
}

#[tokio::test]
async fn annotate_honours_cap_and_language() {
    let base = fake_snowstorm().await;
    let (status, body) = post_annotate(
        make_state(&base),
        json!({ "text": "fiebre alta persistente", "max_candidates": 2, "lang": "en" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(candidate_list(&body), vec!["fiebre", "alta"]);
    assert_eq!(body["lang"], "en");
    assert_eq!(body["matches"][0]["fsn"], "Fever (finding) [en]");
}

#[tokio::test]
async fn annotate_rejects_invalid_payloads() {
    let state = make_state("http://127.0.0.1:1");
    let (status, body) = post_annotate(state.clone(), json!({ "text": "fiebre", "max_candidates": 0 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap_or_default().contains("max_candidates"));

    let response = router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/annotate")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body["error"].as_str().unwrap_or_default().is_empty());
}

#[tokio::test]
async fn annotate_get_delegates_to_the_same_pipeline() {
    let base = fake_snowstorm().await;
    let response = router(make_state(&base))
        .oneshot(
            Request::builder()
                .uri("/annotate?q=Fiebre%20y%20tos")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matches"][0]["match"], "fiebre");
    assert_eq!(body["matches"][0]["offsets"], json!([{ "start": 0, "end": 6 }]));
    assert_eq!(body["lang"], "es");
}

#[tokio::test]
async fn annotate_get_requires_query() {
    let response = router(make_state("http://127.0.0.1:1"))
        .oneshot(Request::builder().uri("/annotate").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn unreachable_terminology_server_degrades_to_no_matches() {
    let (status, body) = post_annotate(
        make_state("http://127.0.0.1:1"),
        json!({ "text": "infarto agudo de miocardio" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matches"], json!([]));
    assert!(!candidate_list(&body).is_empty());
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let response = router(make_state("http://snowstorm.test"))
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .header(header::ORIGIN, "https://example.org")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}
