// SPDX-License-Identifier: MIT

//! Web UI and JSON API for the inventory workflow

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json},
    routing::{delete, get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::encoder::stage_image;
use crate::gemini::GeminiClient;
use crate::inventory::{Inventory, InventoryItem};
use crate::PlatescanError;

/// The one generic message shown to users when recognition fails. Detail
/// (transport vs. validation, raw bodies) stays in the logs.
const ANALYZE_FAILED_MESSAGE: &str = "Failed to analyze the image. Please try again.";

/// Shared application state
pub struct AppState {
    pub inventory: Mutex<Inventory>,
    pub client: GeminiClient,
    pub config: AppConfig,
}

/// Create the web application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let max_upload = state.config.upload.max_bytes;

    Router::new()
        // Page
        .route("/", get(index_page))
        // API endpoints
        .route("/api/upload", post(api_upload))
        .route("/api/analyze", post(api_analyze))
        .route("/api/items", get(api_get_items))
        .route("/api/state", get(api_get_state))
        .route("/api/staged", delete(api_clear_staged))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(err: &PlatescanError) -> (StatusCode, Json<ErrorBody>) {
    let (status, message) = match err {
        PlatescanError::UnsupportedFormat(_) | PlatescanError::Image(_) => (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Unsupported image format. Please upload a PNG, JPEG, or WEBP file.".to_string(),
        ),
        PlatescanError::NoStagedImage => (
            StatusCode::BAD_REQUEST,
            "Please select an image first.".to_string(),
        ),
        PlatescanError::AnalysisInFlight => (
            StatusCode::CONFLICT,
            "An analysis is already in progress.".to_string(),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal error.".to_string(),
        ),
    };
    (status, Json(ErrorBody { error: message }))
}

// === API Handlers ===

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    preview: String,
    mime_type: String,
}

async fn api_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut bytes = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let is_image = field.name() == Some("image") || field.file_name().is_some();
                if is_image {
                    match field.bytes().await {
                        Ok(data) => {
                            bytes = Some(data);
                            break;
                        }
                        Err(e) => {
                            return (
                                StatusCode::BAD_REQUEST,
                                Json(ErrorBody {
                                    error: format!("Upload failed: {}", e),
                                }),
                            )
                                .into_response();
                        }
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorBody {
                        error: format!("Upload failed: {}", e),
                    }),
                )
                    .into_response();
            }
        }
    }

    let Some(bytes) = bytes else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: "No image field in upload.".to_string(),
            }),
        )
            .into_response();
    };

    let staged = match stage_image(&bytes) {
        Ok(staged) => staged,
        Err(e) => return error_response(&e).into_response(),
    };

    let response = UploadResponse {
        preview: staged.preview.clone(),
        mime_type: staged.mime_type.clone(),
    };

    let mut inventory = state.inventory.lock().await;
    if let Err(e) = inventory.stage(staged) {
        return error_response(&e).into_response();
    }

    info!("Staged {} upload ({} bytes)", response.mime_type, bytes.len());
    Json(response).into_response()
}

async fn api_analyze(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    // The guard flips inside the lock, before any outbound request exists.
    let staged = {
        let mut inventory = state.inventory.lock().await;
        match inventory.begin_analysis() {
            Ok(staged) => staged,
            Err(e) => return error_response(&e).into_response(),
        }
    };

    info!("Analyzing staged {} image", staged.mime_type);
    let result = state.client.analyze(&staged.data, &staged.mime_type).await;

    let mut inventory = state.inventory.lock().await;
    match result {
        Ok(recognition) => {
            let item = inventory.complete_analysis(recognition);
            info!("Recognized: {} ({})", item.item_name, item.id);
            (StatusCode::OK, Json(item)).into_response()
        }
        Err(e) => {
            error!("Analysis failed: {}", e);
            inventory.fail_analysis(ANALYZE_FAILED_MESSAGE);
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorBody {
                    error: ANALYZE_FAILED_MESSAGE.to_string(),
                }),
            )
                .into_response()
        }
    }
}

async fn api_get_items(State(state): State<Arc<AppState>>) -> Json<Vec<InventoryItem>> {
    let inventory = state.inventory.lock().await;
    Json(inventory.items().to_vec())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StateSnapshot {
    staged: bool,
    preview: Option<String>,
    analyzing: bool,
    error: Option<String>,
    item_count: usize,
}

async fn api_get_state(State(state): State<Arc<AppState>>) -> Json<StateSnapshot> {
    let inventory = state.inventory.lock().await;
    Json(StateSnapshot {
        staged: inventory.staged().is_some(),
        preview: inventory.staged().map(|s| s.preview.clone()),
        analyzing: inventory.is_analyzing(),
        error: inventory.last_error().map(String::from),
        item_count: inventory.len(),
    })
}

async fn api_clear_staged(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut inventory = state.inventory.lock().await;
    match inventory.clear_staged() {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

// === Page Handler ===

async fn index_page(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_index(&state.config))
}

// === Template Rendering ===

fn base_template(title: &str, content: &str) -> String {
    format!(r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{} - Platescan</title>
    <style>
        :root {{
            --bg-primary: #0f172a;
            --bg-card: #1e293b;
            --text-primary: #e2e8f0;
            --text-secondary: #94a3b8;
            --accent: #22d3ee;
            --accent-deep: #6366f1;
            --danger: #f87171;
            --border: #334155;
        }}
        * {{ box-sizing: border-box; margin: 0; padding: 0; }}
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: var(--bg-primary);
            color: var(--text-primary);
            line-height: 1.6;
        }}
        .container {{ max-width: 1200px; margin: 0 auto; padding: 24px; }}
        header {{ text-align: center; margin-bottom: 32px; }}
        header h1 {{
            font-size: 2.2em;
            background: linear-gradient(90deg, var(--accent), var(--accent-deep));
            -webkit-background-clip: text;
            background-clip: text;
            color: transparent;
        }}
        header p {{ color: var(--text-secondary); max-width: 640px; margin: 8px auto 0; }}
        .columns {{ display: grid; grid-template-columns: 1fr 1fr; gap: 24px; }}
        @media (max-width: 900px) {{ .columns {{ grid-template-columns: 1fr; }} }}
        .card {{
            background: var(--bg-card);
            border: 1px solid var(--border);
            border-radius: 12px;
            padding: 20px;
        }}
        .card h2 {{ color: var(--accent); margin-bottom: 14px; }}
        #dropzone {{
            border: 2px dashed var(--border);
            border-radius: 12px;
            padding: 28px;
            text-align: center;
            color: var(--text-secondary);
            cursor: pointer;
            transition: border-color 0.2s;
        }}
        #dropzone.dragover {{ border-color: var(--accent); color: var(--accent); }}
        #preview {{ max-width: 100%; max-height: 280px; border-radius: 8px; margin-top: 12px; }}
        button {{
            width: 100%;
            margin-top: 16px;
            padding: 12px;
            border: none;
            border-radius: 8px;
            background: var(--accent-deep);
            color: white;
            font-size: 1em;
            font-weight: bold;
            cursor: pointer;
        }}
        button:disabled {{ background: var(--border); cursor: not-allowed; }}
        #error {{ color: var(--danger); margin-top: 12px; text-align: center; }}
        #remove {{ background: none; border: 1px solid var(--border); color: var(--text-secondary); }}
        .item {{
            border: 1px solid var(--border);
            border-radius: 10px;
            padding: 14px;
            margin-bottom: 14px;
            display: flex;
            gap: 14px;
        }}
        .item img {{ width: 110px; height: 110px; object-fit: cover; border-radius: 8px; }}
        .item h3 {{ color: var(--accent); }}
        .item dl {{ display: grid; grid-template-columns: auto 1fr; gap: 2px 10px; font-size: 0.85em; }}
        .item dt {{ color: var(--text-secondary); }}
        .item p {{ font-size: 0.9em; margin-top: 6px; }}
        .item time {{ color: var(--text-secondary); font-size: 0.75em; }}
        #empty {{ color: var(--text-secondary); text-align: center; padding: 40px 0; }}
        #spinner {{
            display: none;
            margin: 12px auto 0;
            width: 28px; height: 28px;
            border: 3px solid var(--border);
            border-top-color: var(--accent);
            border-radius: 50%;
            animation: spin 0.8s linear infinite;
        }}
        @keyframes spin {{ to {{ transform: rotate(360deg); }} }}
    </style>
</head>
<body>
    <div class="container">
        {}
    </div>
</body>
</html>"#, title, content)
}

fn render_index(config: &AppConfig) -> String {
    let content = format!(r#"
        <header>
            <h1>AI Factory Inventory</h1>
            <p>Upload a picture of factory equipment. The {model} model will analyze it,
               perform OCR on data plates, and generate a structured inventory entry.</p>
        </header>
        <main class="columns">
            <div class="card">
                <h2>1. Upload Equipment Image</h2>
                <div id="dropzone">Drag &amp; drop an image here, or click to select (PNG, JPEG, WEBP)</div>
                <input type="file" id="file" accept="image/png,image/jpeg,image/webp" hidden>
                <img id="preview" hidden>
                <button id="remove" hidden>Remove image</button>
                <button id="analyze" disabled>Analyze Equipment</button>
                <div id="spinner"></div>
                <p id="error"></p>
            </div>
            <div class="card">
                <h2>2. Generated Inventory</h2>
                <div id="items"><p id="empty">Your inventory will appear here.</p></div>
            </div>
        </main>
    <script>{app_js}</script>"#,
        model = config.gemini.model,
        app_js = APP_JS,
    );

    base_template("Inventory", &content)
}

/// Client-side driver. Pure view logic: it renders server state and forwards
/// user actions; all guards live on the server.
const APP_JS: &str = r##"
const dropzone = document.getElementById('dropzone');
const fileInput = document.getElementById('file');
const preview = document.getElementById('preview');
const removeBtn = document.getElementById('remove');
const analyzeBtn = document.getElementById('analyze');
const spinner = document.getElementById('spinner');
const errorEl = document.getElementById('error');
const itemsEl = document.getElementById('items');

let analyzing = false;

function fieldRow(dl, label, value) {
    const dt = document.createElement('dt');
    dt.textContent = label;
    const dd = document.createElement('dd');
    dd.textContent = value === null || value === undefined ? 'N/A' : value;
    dl.appendChild(dt);
    dl.appendChild(dd);
}

function renderItems(items) {
    itemsEl.textContent = '';
    if (items.length === 0) {
        const empty = document.createElement('p');
        empty.id = 'empty';
        empty.textContent = 'Your inventory will appear here.';
        itemsEl.appendChild(empty);
        return;
    }
    for (const item of items) {
        const card = document.createElement('div');
        card.className = 'item';
        if (item.image) {
            const img = document.createElement('img');
            img.src = item.image;
            card.appendChild(img);
        }
        const body = document.createElement('div');
        const h3 = document.createElement('h3');
        h3.textContent = item.itemName;
        body.appendChild(h3);
        const dl = document.createElement('dl');
        fieldRow(dl, 'Manufacturer', item.manufacturer);
        fieldRow(dl, 'Model No.', item.modelNumber);
        fieldRow(dl, 'Serial No.', item.serialNumber);
        body.appendChild(dl);
        const desc = document.createElement('p');
        desc.textContent = item.description;
        body.appendChild(desc);
        const time = document.createElement('time');
        time.textContent = new Date(item.createdAt).toLocaleString();
        body.appendChild(time);
        card.appendChild(body);
        itemsEl.appendChild(card);
    }
}

function applyState(state) {
    analyzing = state.analyzing;
    preview.hidden = !state.preview;
    if (state.preview) preview.src = state.preview;
    removeBtn.hidden = !state.staged || state.analyzing;
    analyzeBtn.disabled = !state.staged || state.analyzing;
    analyzeBtn.textContent = state.analyzing ? 'Analyzing...' : 'Analyze Equipment';
    spinner.style.display = state.analyzing ? 'block' : 'none';
    errorEl.textContent = state.error || '';
}

async function refresh() {
    const [stateRes, itemsRes] = await Promise.all([
        fetch('/api/state'),
        fetch('/api/items'),
    ]);
    applyState(await stateRes.json());
    renderItems(await itemsRes.json());
}

async function upload(file) {
    const form = new FormData();
    form.append('image', file);
    const res = await fetch('/api/upload', { method: 'POST', body: form });
    if (!res.ok) {
        const body = await res.json().catch(() => ({ error: 'Upload failed.' }));
        errorEl.textContent = body.error;
    }
    await refresh();
}

async function analyze() {
    analyzeBtn.disabled = true;
    spinner.style.display = 'block';
    const res = await fetch('/api/analyze', { method: 'POST' });
    if (!res.ok) {
        const body = await res.json().catch(() => ({ error: 'Analysis failed.' }));
        errorEl.textContent = body.error;
    }
    await refresh();
}

dropzone.addEventListener('click', () => fileInput.click());
fileInput.addEventListener('change', () => {
    if (fileInput.files.length > 0) upload(fileInput.files[0]);
    fileInput.value = '';
});
dropzone.addEventListener('dragover', (e) => {
    e.preventDefault();
    dropzone.classList.add('dragover');
});
dropzone.addEventListener('dragleave', () => dropzone.classList.remove('dragover'));
dropzone.addEventListener('drop', (e) => {
    e.preventDefault();
    dropzone.classList.remove('dragover');
    if (!analyzing && e.dataTransfer.files.length > 0) upload(e.dataTransfer.files[0]);
});
removeBtn.addEventListener('click', async () => {
    await fetch('/api/staged', { method: 'DELETE' });
    await refresh();
});
analyzeBtn.addEventListener('click', analyze);

refresh();
"##;

/// Start the web server
pub async fn start_server(config: AppConfig, client: GeminiClient) -> crate::Result<()> {
    let addr = format!("{}:{}", config.web.host, config.web.port);

    let state = Arc::new(AppState {
        inventory: Mutex::new(Inventory::new()),
        client,
        config,
    });

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Web UI available at http://{}", addr);

    let router = create_router(state);
    axum::serve(listener, router).await?;

    Ok(())
}
