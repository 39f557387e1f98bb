//! Request dispatcher.
//!
//! Every request rescans the playground so edits show up on the next
//! reload. The scan result is owned by the request and thrown away after.

use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::bridge::{publish_signals, subscribe_signals, Signals};
use crate::http::request::{extract_signals, is_live_request, request_id};
use crate::http::response::PlaygroundError;
use crate::http::server::AppState;
use crate::live::{into_sse, start_position, Inbox, LiveEngine};
use crate::observability::metrics;
use crate::render::{render, RenderContext};
use crate::routing::{normalize_path, scan, ParsedFile, ResponseKind, RouteEntry, RouteTable};
use crate::sequence::{flatten, select_and_advance, sequence_key};
use crate::session::{attach_cookie, SessionState};

/// Entry point for every playground URL.
pub async fn playground_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let (parts, body) = request.into_parts();
    let method = parts.method.to_string();
    let path = parts.uri.path().to_string();

    tracing::debug!(
        request_id = %request_id(&parts.headers),
        method = %method,
        path = %path,
        "Playground request"
    );

    let (response, kind) = match dispatch(&state, parts, body).await {
        Ok(served) => served,
        Err(e) => (e.into_response(), "error"),
    };
    metrics::record_request(&method, response.status().as_u16(), kind, start);
    response
}

async fn dispatch(
    state: &AppState,
    parts: Parts,
    body: Body,
) -> Result<(Response, &'static str), PlaygroundError> {
    let url = normalize_path(parts.uri.path());
    let method = parts.method.as_str().to_ascii_uppercase();

    let routes = scan_playground(state).await?;
    let Some(entry) = routes.get(&url) else {
        return Err(PlaygroundError::NotFound { method, path: url });
    };

    let live = is_live_request(&parts.headers, &state.config.live.marker_header);
    let signals = if live {
        match extract_signals(&parts.method, &parts.uri, body, state.config.limits.max_body_bytes).await {
            Ok(signals) => signals,
            Err(e) => {
                tracing::warn!(path = %url, error = %e, "Failed to read signals");
                Signals::default()
            }
        }
    } else {
        Signals::default()
    };

    let mut session = state.sessions.load_or_new(&parts.headers);
    let (global_hits, url_hits) = state.counters.hit(&url);
    session.record_hit(&url);

    let mut ctx = RenderContext::new(&session, &url, &method, signals);
    ctx.global_hits = global_hits;
    ctx.url_hits = url_hits;

    // From here on the session has changed, so every outcome carries the cookie.
    let (mut response, kind) = match respond(state, entry, &mut session, ctx, live) {
        Ok(served) => served,
        Err(e) => (e.into_response(), "error"),
    };
    if let Err(e) = attach_cookie(state.sessions.as_ref(), &session, response.headers_mut()) {
        tracing::warn!(error = %e, "Failed to write session cookie");
    }
    Ok((response, kind))
}

/// Pick the live or HTML file list for the request and serve it.
fn respond(
    state: &AppState,
    entry: &RouteEntry,
    session: &mut SessionState,
    ctx: RenderContext,
    live: bool,
) -> Result<(Response, &'static str), PlaygroundError> {
    if live {
        if let Some(files) = entry.lookup(ResponseKind::Live, &ctx.method) {
            let response = serve_live(state, files, session, ctx);
            return Ok((response, ResponseKind::Live.as_str()));
        }
    }

    match entry.lookup(ResponseKind::Html, &ctx.method) {
        Some(files) => {
            let response = serve_html(state, files, session, ctx, live)?;
            Ok((response, ResponseKind::Html.as_str()))
        }
        None => Err(PlaygroundError::NotFound {
            method: ctx.method,
            path: ctx.url,
        }),
    }
}

async fn scan_playground(state: &AppState) -> Result<RouteTable, PlaygroundError> {
    let root = state.config.playground.root.clone();
    let extension = state.config.playground.extension.clone();
    let routes = tokio::task::spawn_blocking(move || scan(&root, &extension))
        .await
        .map_err(|e| PlaygroundError::Internal(format!("scan task failed: {e}")))??;
    Ok(routes)
}

/// Advance the cursor, render the selected section, and publish signals.
fn serve_html(
    state: &AppState,
    files: &[ParsedFile],
    session: &mut SessionState,
    ctx: RenderContext,
    live: bool,
) -> Result<Response, PlaygroundError> {
    let entries = flatten(files);
    let key = sequence_key(&ctx.url, ResponseKind::Html, &ctx.method);
    let position = select_and_advance(session, &key, &entries);
    let section = &entries[position];
    let status = section.options.status;

    let response = if section.body.is_empty() {
        response_status(status, StatusCode::NO_CONTENT).into_response()
    } else {
        let html = render(&section.body, &ctx.to_template_data())?;
        (
            response_status(status, StatusCode::OK),
            [(CONTENT_TYPE, "text/html; charset=utf-8")],
            html,
        )
            .into_response()
    };

    if live && !ctx.signals.is_empty() {
        publish_signals(
            state.bridge.as_ref(),
            &state.config.bridge.namespace,
            &session.session_id,
            &ctx.signals,
        );
    }

    Ok(response)
}

/// Settle the cursor, then hand the connection to a [`LiveEngine`] task.
fn serve_live(
    state: &AppState,
    files: &[ParsedFile],
    session: &mut SessionState,
    ctx: RenderContext,
) -> Response {
    let entries = flatten(files);
    let key = sequence_key(&ctx.url, ResponseKind::Live, &ctx.method);
    let position = start_position(session, &key, &entries);

    let (inbox_tx, inbox_rx) = mpsc::channel(state.config.live.buffer);
    let subscriptions = subscribe_signals(
        state.bridge.as_ref(),
        &state.config.bridge.namespace,
        &session.session_id,
        &ctx.signals,
        inbox_tx,
    );
    let inbox = Inbox::new(inbox_rx, subscriptions);

    let span = tracing::info_span!("live", url = %ctx.url, session_id = %session.session_id);
    let engine = LiveEngine::new(
        entries,
        position,
        ctx,
        state.counters.clone(),
        state.live_settings(),
    );
    let (out_tx, out_rx) = mpsc::channel(state.config.live.buffer);
    tokio::spawn(engine.run(out_tx, inbox, state.shutdown.token()).instrument(span));

    into_sse(out_rx).into_response()
}

/// The frontmatter status when it is a valid code, else `default`.
fn response_status(status: i64, default: StatusCode) -> StatusCode {
    if status <= 0 {
        return default;
    }
    u16::try_from(status)
        .ok()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or_else(|| {
            tracing::warn!(status, "Ignoring invalid status in frontmatter");
            default
        })
}
