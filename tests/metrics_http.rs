// tests/metrics_http.rs
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusBuilder;
use tower::ServiceExt;

#[tokio::test]
async fn healthz_and_metrics_render() {
    // Local recorder: no global install, so tests stay independent.
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    metrics::with_local_recorder(&recorder, || {
        outage_relay::metrics::ensure_described();
        metrics::counter!("relay_runs_total").increment(2);
        metrics::counter!("relay_failures_total", "stage" => "ocr").increment(1);
    });

    let app = outage_relay::metrics::router_for(handle);

    let resp = app
        .clone()
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body::to_bytes(resp.into_body(), 1024).await.unwrap();
    assert_eq!(&body[..], b"ok");

    let resp = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("relay_runs_total 2"), "{text}");
    assert!(text.contains(r#"relay_failures_total{stage="ocr"} 1"#), "{text}");
}
