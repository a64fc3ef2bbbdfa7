//! HTTP handlers for the dashboard and JSON API

use axum::{
    extract::State,
    response::{Html, IntoResponse},
    Json,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::error::Result;
use super::state::ServeState;

/// GET /api/health
pub async fn health_check(State(state): State<Arc<ServeState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "best_model": state.best_name,
        "started_at": state.started_at.to_rfc3339(),
        "uptime_secs": chrono::Utc::now()
            .signed_duration_since(state.started_at)
            .num_seconds(),
    }))
}

/// GET /api/metrics
pub async fn get_metrics(State(state): State<Arc<ServeState>>) -> impl IntoResponse {
    Json(json!({
        "best_model": state.best_name,
        "best_kind": state.best_kind,
        "best_score": state.best_score,
        "models": state.scores,
    }))
}

/// GET /api/importance
pub async fn get_importance(State(state): State<Arc<ServeState>>) -> impl IntoResponse {
    let features: Vec<serde_json::Value> = state
        .importance
        .iter()
        .map(|(name, value)| json!({ "feature": name, "importance": value }))
        .collect();
    Json(json!({ "model": state.best_name, "importance": features }))
}

/// GET /api/monitor
pub async fn get_monitor(State(state): State<Arc<ServeState>>) -> impl IntoResponse {
    let monitor = state.monitor.read().await;
    Json(json!({
        "threshold": monitor.threshold(),
        "samples": monitor.samples(),
    }))
}

/// GET /api/schema
pub async fn get_schema(State(state): State<Arc<ServeState>>) -> impl IntoResponse {
    Json(json!({
        "inputs": state.predictor.raw_schema(),
        "engineered": state.predictor.feature_names(),
    }))
}

/// POST /api/predict with a flat JSON object of raw feature values
pub async fn predict(
    State(state): State<Arc<ServeState>>,
    Json(row): Json<BTreeMap<String, f64>>,
) -> Result<impl IntoResponse> {
    let prediction = state.predictor.predict(&row)?;
    Ok(Json(json!({
        "model": state.best_name,
        "prediction": prediction,
    })))
}

/// GET / serving the self-contained dashboard page
pub async fn dashboard(State(state): State<Arc<ServeState>>) -> Html<String> {
    let score_rows: String = state
        .scores
        .iter()
        .map(|s| {
            format!(
                "<tr><td>{}</td><td>{:.4}</td><td>{:.4}</td><td>{:.4}</td><td>{:.4} ± {:.4}</td><td>{:.2}s</td></tr>",
                s.name, s.r2, s.rmse, s.mae, s.cv_r2_mean, s.cv_r2_std, s.training_secs
            )
        })
        .collect();

    let importance_rows: String = state
        .importance
        .iter()
        .map(|(name, value)| format!("<tr><td>{name}</td><td>{value:.4}</td></tr>"))
        .collect();

    let input_fields: String = state
        .predictor
        .raw_schema()
        .iter()
        .map(|name| {
            format!(
                "<label>{name} <input type=\"number\" step=\"any\" name=\"{name}\" value=\"5\"></label>"
            )
        })
        .collect();

    let artifact_links: String = state
        .artifact_paths
        .iter()
        .filter_map(|p| p.file_name().and_then(|f| f.to_str()))
        .map(|f| format!("<li><a href=\"/artifacts/{f}\">{f}</a></li>"))
        .collect();

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Floodcast Dashboard</title>
<style>
body {{ font-family: sans-serif; margin: 2rem; color: #222; }}
table {{ border-collapse: collapse; margin-bottom: 1.5rem; }}
th, td {{ border: 1px solid #ccc; padding: 6px 12px; text-align: left; }}
th {{ background: #f0f0f0; }}
label {{ display: inline-block; margin: 4px 8px 4px 0; }}
input {{ width: 90px; }}
#result {{ font-weight: bold; margin-top: 0.5rem; }}
</style>
</head>
<body>
<h1>Floodcast</h1>
<p>Best model: <strong>{best}</strong> (score {score:.4})</p>

<h2>Model comparison</h2>
<table>
<tr><th>Model</th><th>R2</th><th>RMSE</th><th>MAE</th><th>CV R2</th><th>Training</th></tr>
{score_rows}
</table>

<h2>Feature importance</h2>
<table>
<tr><th>Feature</th><th>Importance</th></tr>
{importance_rows}
</table>

<h2>Predict</h2>
<form id="predict-form">
{input_fields}
<button type="submit">Predict</button>
</form>
<div id="result"></div>

<h2>Artifacts</h2>
<ul>{artifact_links}</ul>

<script>
document.getElementById('predict-form').addEventListener('submit', async (e) => {{
  e.preventDefault();
  const inputs = {{}};
  for (const el of e.target.querySelectorAll('input')) {{
    inputs[el.name] = parseFloat(el.value);
  }}
  const res = await fetch('/api/predict', {{
    method: 'POST',
    headers: {{ 'Content-Type': 'application/json' }},
    body: JSON.stringify(inputs),
  }});
  const data = await res.json();
  const out = document.getElementById('result');
  out.textContent = res.ok
    ? 'Predicted flood probability: ' + data.prediction.toFixed(4)
    : 'Error: ' + data.message;
}});
</script>
</body>
</html>"#,
        best = state.best_name,
        score = state.best_score,
    ))
}
