use axum::{
    body::Body,
    http::{header, Response, StatusCode, Uri},
    response::IntoResponse,
};

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Wayfinder</title>
</head>
<body>
    <h1>Wayfinder navigation assistant</h1>
    <p>Upload a frame to <code>POST /api/v1/detect</code>, then ask about it with
       <code>POST /api/v1/query</code>.</p>
    <img id="frame" alt="Latest annotated frame" src="/api/v1/detection/annotated">
    <pre id="report">Waiting for detections...</pre>
    <script>
        const proto = location.protocol === 'https:' ? 'wss' : 'ws';
        const ws = new WebSocket(`${proto}://${location.host}/api/v1/stream`);
        ws.onmessage = (event) => {
            const report = JSON.parse(event.data);
            document.getElementById('report').textContent =
                `${report.safety_status}\n` +
                report.objects.map(o => `${o.class} ${o.distance_m ?? '?'}m ${o.position}`).join('\n');
            document.getElementById('frame').src = `/api/v1/detection/annotated?t=${Date.now()}`;
        };
    </script>
</body>
</html>
"#;

/// Status page for browser requests; unknown API paths get a 404.
pub async fn serve_static(uri: Uri) -> impl IntoResponse {
    let path = uri.path().trim_start_matches('/');

    if path.starts_with("api/") {
        return (StatusCode::NOT_FOUND, "Not found").into_response();
    }

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .body(Body::from(INDEX_HTML))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
