use std::convert::Infallible;
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{get, post};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{DriveConfig, PageConfig};
use crate::drive::StorageProvider;
use crate::error::ProxyError;
use crate::events::WallCommand;
use crate::gallery::Frame;
use crate::gallery::view::escape_html;
use crate::proxy::{self, DEFAULT_MIME_TYPE, IMAGE_CACHE_CONTROL};

struct ProxyState<P> {
    provider: Arc<P>,
    drive: Arc<DriveConfig>,
}

impl<P> Clone for ProxyState<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            drive: Arc::clone(&self.drive),
        }
    }
}

/// The page's way into a running wall session.
#[derive(Clone)]
pub struct WallHandle {
    commands: mpsc::Sender<WallCommand>,
    frames: watch::Receiver<Frame>,
}

impl WallHandle {
    pub fn new(commands: mpsc::Sender<WallCommand>, frames: watch::Receiver<Frame>) -> Self {
        Self { commands, frames }
    }
}

#[derive(Clone)]
struct WallState {
    handle: WallHandle,
    page: Arc<PageConfig>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Deserialize)]
struct KeyPress {
    key: String,
}

#[derive(Serialize)]
struct FullscreenState {
    fullscreen: bool,
}

/// `/api/photos` and `/api/image/{file_id}`.
pub fn api_router<P: StorageProvider>(provider: Arc<P>, drive: Arc<DriveConfig>) -> Router {
    let state = ProxyState { provider, drive };
    Router::new()
        .route("/api/photos", get(list_photos::<P>))
        .route("/api/image/{file_id}", get(serve_image::<P>))
        .with_state(state)
}

/// The wall page plus its live stream and command endpoints.
pub fn wall_router(handle: WallHandle, page: PageConfig) -> Router {
    let state = WallState {
        handle,
        page: Arc::new(page),
    };
    Router::new()
        .route("/", get(wall_page))
        .route("/api/wall/stream", get(stream_frames))
        .route("/api/wall/select/{index}", post(select_photo))
        .route("/api/wall/advance", post(advance))
        .route("/api/wall/key", post(key_press))
        .with_state(state)
}

pub async fn serve(router: Router, addr: SocketAddr, cancel: CancellationToken) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind listener on {addr}"))?;
    info!(%addr, "photo wall listening");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = shutdown_signal() => cancel.cancel(),
                _ = cancel.cancelled() => {},
            }
        })
        .await
        .context("photo wall server exited")?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.ok();
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut term) = signal(SignalKind::terminate()) {
            term.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn list_photos<P: StorageProvider>(State(state): State<ProxyState<P>>) -> Response {
    match proxy::list_photos(state.provider.as_ref(), &state.drive).await {
        Ok(list) => Json(list).into_response(),
        Err(err) => {
            error!(error = %err, "error fetching photos");
            let message = err.to_string();
            error_response(&err, message)
        }
    }
}

async fn serve_image<P: StorageProvider>(
    State(state): State<ProxyState<P>>,
    Path(file_id): Path<String>,
) -> Response {
    match proxy::read_image(state.provider.as_ref(), &file_id).await {
        Ok(content) => {
            let content_type = content
                .mime_type
                .as_deref()
                .filter(|mime| !mime.is_empty())
                .and_then(|mime| HeaderValue::from_str(mime).ok())
                .unwrap_or(HeaderValue::from_static(DEFAULT_MIME_TYPE));
            let mut resp = Response::new(Body::from_stream(content.body));
            let headers = resp.headers_mut();
            headers.insert(header::CONTENT_TYPE, content_type);
            headers.insert(
                header::CACHE_CONTROL,
                HeaderValue::from_static(IMAGE_CACHE_CONTROL),
            );
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            );
            resp
        }
        Err(err) => {
            error!(error = %err, file_id = %file_id, "error serving image");
            error_response(&err, "Failed to load image".to_string())
        }
    }
}

fn error_response(err: &ProxyError, message: String) -> Response {
    let status = match err {
        ProxyError::NotFound(_) => StatusCode::NOT_FOUND,
        ProxyError::Config(_) | ProxyError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorBody { error: message })).into_response()
}

async fn wall_page(State(state): State<WallState>) -> Html<String> {
    Html(render_page(&state.page))
}

async fn stream_frames(
    State(state): State<WallState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut frames = state.handle.frames.clone();
    frames.mark_changed();
    let stream = futures::stream::unfold(frames, |mut frames| async move {
        frames.changed().await.ok()?;
        let rendered = frames.borrow_and_update().render();
        let event = Event::default()
            .event("frame")
            .json_data(&rendered)
            .ok()?;
        Some((Ok::<_, Infallible>(event), frames))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn select_photo(State(state): State<WallState>, Path(index): Path<usize>) -> Response {
    forward(&state, WallCommand::Select(index)).await
}

async fn advance(State(state): State<WallState>) -> Response {
    forward(&state, WallCommand::Advance).await
}

async fn forward(state: &WallState, command: WallCommand) -> Response {
    match state.handle.commands.send(command).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(_) => session_unavailable(),
    }
}

async fn key_press(State(state): State<WallState>, Json(press): Json<KeyPress>) -> Response {
    let (reply, answer) = oneshot::channel();
    let command = WallCommand::Key {
        key: press.key,
        reply,
    };
    if state.handle.commands.send(command).await.is_err() {
        return session_unavailable();
    }
    match answer.await {
        Ok(fullscreen) => Json(FullscreenState { fullscreen }).into_response(),
        Err(_) => session_unavailable(),
    }
}

fn session_unavailable() -> Response {
    warn!("wall session is not running");
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorBody {
            error: "wall session is not running".to_string(),
        }),
    )
        .into_response()
}

fn render_page(page: &PageConfig) -> String {
    let mut body = String::new();
    body.push_str("<div id=\"background-effects\"><div class=\"neon-wave\"></div><div class=\"neon-wave\"></div><div class=\"neon-wave\"></div><div id=\"particles\"></div></div>");
    body.push_str("<div class=\"ambient-light\"></div><div id=\"floating-wall\"></div>");
    write!(
        body,
        "<div id=\"header\"><h1>{}</h1></div>",
        escape_html(&page.heading)
    )
    .ok();
    body.push_str("<div class=\"photo-counter\" id=\"counter\"></div>");
    body.push_str("<div id=\"gallery-space\"><div id=\"carousel-wrapper\"></div></div>");
    if let Some(name) = &page.event_name {
        write!(body, "<div id=\"event-info\"><h2>{}</h2>", escape_html(name)).ok();
        if let Some(year) = &page.event_year {
            write!(body, "<p>{}</p>", escape_html(year)).ok();
        }
        body.push_str("</div>");
    }
    body.push_str("<div id=\"preview-strip\"></div><div class=\"reflection\"></div>");
    body.push_str("<div class=\"loading\" id=\"loading\">Loading photos...</div>");
    body.push_str("<div class=\"loading\" id=\"error\" hidden></div>");
    layout(&page.title, &body)
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\"><meta name=\"viewport\" content=\"width=device-width, initial-scale=1\"><title>{}</title><style>{}</style></head><body><main id=\"wall\">{}</main><script>{}</script></body></html>",
        escape_html(title),
        styles(),
        body,
        script()
    )
}

fn script() -> &'static str {
    r#"(function(){
const byId = (id) => document.getElementById(id);
const regions = {carousel: 'carousel-wrapper', overlays: 'floating-wall', particles: 'particles', thumbnails: 'preview-strip'};
let wantFullscreen = false;
function patch(el, html) {
  if (el.dataset.html === html) return;
  el.dataset.html = html;
  const tpl = document.createElement('template');
  tpl.innerHTML = html;
  const fresh = Array.from(tpl.content.children);
  const keys = new Set(fresh.map((n) => n.dataset.key));
  const old = new Map();
  for (const child of Array.from(el.children)) {
    if (keys.has(child.dataset.key)) old.set(child.dataset.key, child); else child.remove();
  }
  let cursor = el.firstElementChild;
  for (const node of fresh) {
    const prev = old.get(node.dataset.key);
    let next = node;
    if (prev && prev.innerHTML === node.innerHTML) { prev.className = node.className; next = prev; }
    else if (prev) { prev.replaceWith(node); if (cursor === prev) cursor = node; }
    if (next === cursor) { cursor = cursor.nextElementSibling; continue; }
    el.insertBefore(next, cursor);
  }
}
function applyFullscreen(want) {
  wantFullscreen = want;
  const active = !!document.fullscreenElement;
  if (want && !active) document.documentElement.requestFullscreen().catch(() => {});
  else if (!want && active) document.exitFullscreen().catch(() => {});
}
function sendKey(key) {
  return fetch('/api/wall/key', {method: 'POST', headers: {'Content-Type': 'application/json'}, body: JSON.stringify({key})})
    .then((r) => r.json()).then((s) => applyFullscreen(s.fullscreen)).catch(() => {});
}
const events = new EventSource('/api/wall/stream');
events.addEventListener('frame', (e) => {
  const f = JSON.parse(e.data);
  const error = byId('error');
  if (f.error) { error.textContent = 'Error: ' + f.error; error.hidden = false; byId('wall').classList.add('failed'); }
  else { error.hidden = true; byId('wall').classList.remove('failed'); }
  byId('loading').hidden = !f.loading;
  byId('counter').innerHTML = f.counter;
  for (const [field, id] of Object.entries(regions)) patch(byId(id), f[field]);
  if (f.fullscreen !== wantFullscreen) applyFullscreen(f.fullscreen);
});
byId('preview-strip').addEventListener('click', (e) => {
  const thumb = e.target.closest('[data-select]');
  if (thumb) fetch('/api/wall/select/' + thumb.dataset.select, {method: 'POST'}).catch(() => {});
});
document.addEventListener('keydown', (e) => {
  if (e.key !== 'f' && e.key !== 'F11') return;
  e.preventDefault();
  sendKey(e.key);
});
document.addEventListener('fullscreenchange', () => {
  if (!document.fullscreenElement && wantFullscreen) sendKey('f');
});
})();"#
}

fn styles() -> &'static str {
    "*{box-sizing:border-box;margin:0;padding:0;}body{background:radial-gradient(ellipse at center,#1a0b2e 0%,#05010d 100%);color:#f5e6c8;font-family:'Poppins',sans-serif;overflow:hidden;height:100vh;}main{position:relative;width:100vw;height:100vh;}main.failed>*:not(#error){display:none;}\
#background-effects{position:fixed;inset:0;pointer-events:none;overflow:hidden;}.neon-wave{position:absolute;width:200%;height:200px;left:-50%;background:linear-gradient(90deg,transparent,rgba(212,175,55,0.15),transparent);animation:wave 12s linear infinite;}.neon-wave:nth-child(1){top:20%;}.neon-wave:nth-child(2){top:50%;animation-delay:-4s;}.neon-wave:nth-child(3){top:80%;animation-delay:-8s;}@keyframes wave{from{transform:translateX(-25%);}to{transform:translateX(25%);}}\
.gold-particle{position:absolute;bottom:-10px;width:4px;height:4px;border-radius:50%;background:#d4af37;box-shadow:0 0 8px #d4af37;animation:rise 15s linear infinite;}@keyframes rise{from{transform:translateY(0);opacity:1;}to{transform:translateY(-110vh);opacity:0;}}\
.ambient-light{position:fixed;inset:0;background:radial-gradient(circle at 50% 40%,rgba(212,175,55,0.12),transparent 60%);pointer-events:none;}\
#floating-wall{position:fixed;inset:0;pointer-events:none;overflow:hidden;}.floating-photo{position:absolute;bottom:-220px;width:140px;opacity:0.35;animation-name:drift;animation-timing-function:linear;animation-iteration-count:infinite;}.floating-photo img{width:100%;border-radius:8px;}@keyframes drift{from{transform:translateY(0) rotate(-6deg);}to{transform:translateY(-130vh) rotate(6deg);}}\
#header{position:absolute;top:2vh;width:100%;text-align:center;}#header h1{font-family:'Cinzel',serif;font-size:3rem;color:#d4af37;text-shadow:0 0 20px rgba(212,175,55,0.6);}\
.photo-counter{position:absolute;top:2vh;right:2vw;font-size:0.9rem;opacity:0.8;}\
#gallery-space{position:absolute;top:14vh;width:100%;height:60vh;perspective:1400px;}#carousel-wrapper{position:relative;width:100%;height:100%;transform-style:preserve-3d;}\
.glass-card{position:absolute;left:50%;top:50%;width:34vh;height:46vh;margin:-23vh 0 0 -17vh;padding:10px;border-radius:16px;background:rgba(255,255,255,0.08);border:1px solid rgba(212,175,55,0.4);backdrop-filter:blur(8px);transition:transform 0.9s ease,opacity 0.9s ease;}.photo-container,.photo-container img{width:100%;height:100%;border-radius:10px;object-fit:cover;}\
.glass-card.center{transform:translateX(0) scale(1.15);z-index:7;}.glass-card.right-1{transform:translateX(38vh) rotateY(-25deg) scale(0.9);z-index:6;}.glass-card.right-2{transform:translateX(68vh) rotateY(-35deg) scale(0.75);z-index:5;opacity:0.8;}.glass-card.right-3{transform:translateX(92vh) rotateY(-45deg) scale(0.6);z-index:4;opacity:0.5;}.glass-card.left-1{transform:translateX(-38vh) rotateY(25deg) scale(0.9);z-index:6;}.glass-card.left-2{transform:translateX(-68vh) rotateY(35deg) scale(0.75);z-index:5;opacity:0.8;}.glass-card.left-3{transform:translateX(-92vh) rotateY(45deg) scale(0.6);z-index:4;opacity:0.5;}.glass-card.hidden{transform:scale(0.3);opacity:0;pointer-events:none;}\
.glass-card.entering .photo-container{animation:entering 1.5s ease-out;}.glass-card.popup .photo-container{animation:popup 1s ease;}.glass-card.spin .photo-container{animation:spin 1.2s ease;}.glass-card.zoom .photo-container{animation:zoom 1s ease;}.glass-card.swing .photo-container{animation:swing 1.2s ease;}.glass-card.float .photo-container{animation:floaty 2s ease;}.glass-card.bounce .photo-container{animation:bounce 1s ease;}.glass-card.flip .photo-container{animation:flip 1.2s ease;}.glass-card.rotate .photo-container{animation:rotate 1.2s ease;}\
@keyframes entering{from{transform:translateY(-80vh) scale(0.2);opacity:0;}to{transform:none;opacity:1;}}@keyframes popup{50%{transform:scale(1.25);}}@keyframes spin{to{transform:rotate(360deg);}}@keyframes zoom{50%{transform:scale(1.4);}}@keyframes swing{25%{transform:rotate(12deg);}75%{transform:rotate(-12deg);}}@keyframes floaty{50%{transform:translateY(-30px);}}@keyframes bounce{30%{transform:translateY(-40px);}60%{transform:translateY(-15px);}}@keyframes flip{to{transform:rotateY(360deg);}}@keyframes rotate{50%{transform:rotate(-20deg) scale(1.1);}}\
#event-info{position:absolute;bottom:17vh;width:100%;text-align:center;}#event-info h2{font-family:'Playfair Display',serif;color:#d4af37;letter-spacing:0.1em;}\
#preview-strip{position:absolute;bottom:3vh;width:100%;display:flex;justify-content:center;gap:8px;}.preview-thumb{width:64px;height:64px;border-radius:8px;overflow:hidden;opacity:0.5;cursor:pointer;border:2px solid transparent;transition:opacity 0.3s;}.preview-thumb.active{opacity:1;border-color:#d4af37;}.preview-thumb img{width:100%;height:100%;object-fit:cover;}\
.reflection{position:absolute;bottom:0;width:100%;height:12vh;background:linear-gradient(to top,rgba(212,175,55,0.08),transparent);pointer-events:none;}\
.loading{position:fixed;inset:0;display:flex;align-items:center;justify-content:center;font-size:1.5rem;color:#d4af37;background:rgba(5,1,13,0.85);}.loading[hidden]{display:none;}"
}
