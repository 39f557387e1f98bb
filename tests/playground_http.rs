//! End-to-end tests driving the full router against temporary playgrounds.

mod common;

use std::time::Duration;

use axum::http::header::{CONTENT_TYPE, SET_COOKIE};
use axum::http::StatusCode;

use common::{body_text, session_cookie, Call, EventReader, Playground};
use dsplay::Shutdown;

#[tokio::test]
async fn test_unknown_path_is_404() {
    let pg = Playground::new().file("index.html", "<p>home</p>");
    let router = pg.router();

    let response = Call::get("/missing/").send(&router).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, "404 page not found\n");
}

#[tokio::test]
async fn test_html_page_renders_counters() {
    let pg = Playground::new().file(
        "count/index.html",
        "<p>{{.URL}} {{.Method}} {{.URLHits}} {{.SessionURLHits}}</p>",
    );
    let router = pg.router();

    let first = Call::get("/count").send(&router).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(
        first.headers().get(CONTENT_TYPE).unwrap(),
        "text/html; charset=utf-8"
    );
    let cookie = session_cookie(&first);
    assert!(cookie.is_some());
    assert_eq!(body_text(first).await, "<p>/count/ GET 1 1</p>");

    // A fresh client shares the URL counter but not the session counter.
    let stranger = Call::get("/count/").send(&router).await;
    assert_eq!(body_text(stranger).await, "<p>/count/ GET 2 1</p>");

    let again = Call::get("/count/")
        .cookie(cookie.as_deref())
        .send(&router)
        .await;
    assert_eq!(body_text(again).await, "<p>/count/ GET 3 2</p>");
}

#[tokio::test]
async fn test_session_keeps_username() {
    let pg = Playground::new().file("index.html", "{{.Username}}|{{.SessionID}}");
    let router = pg.router();

    let first = Call::get("/").send(&router).await;
    let cookie = session_cookie(&first);
    let identity = body_text(first).await;
    assert!(identity.contains("|s-"));

    let second = Call::get("/").cookie(cookie.as_deref()).send(&router).await;
    assert_eq!(body_text(second).await, identity);
}

#[tokio::test]
async fn test_tampered_cookie_starts_new_session() {
    let pg = Playground::new().file("index.html", "{{.SessionID}}");
    let router = pg.router();

    let first = Call::get("/").send(&router).await;
    let cookie = session_cookie(&first).unwrap();
    let original = body_text(first).await;

    let forged = format!("{cookie}x");
    let second = Call::get("/").cookie(Some(&forged)).send(&router).await;
    assert_ne!(body_text(second).await, original);
}

#[tokio::test]
async fn test_sections_advance_and_stick_on_last() {
    let pg = Playground::new().file("steps/index.html", "one\n===\ntwo\n===\nthree");
    let router = pg.router();

    let mut cookie = None;
    let mut seen = Vec::new();
    for _ in 0..5 {
        let response = Call::get("/steps/").cookie(cookie.as_deref()).send(&router).await;
        cookie = session_cookie(&response);
        seen.push(body_text(response).await);
    }
    assert_eq!(seen, ["one", "two", "three", "three", "three"]);
}

#[tokio::test]
async fn test_looping_sections_wrap() {
    let pg = Playground::new().file("spin/index.html", "---\nloop: true\n---\na\n===\nb");
    let router = pg.router();

    let mut cookie = None;
    let mut seen = Vec::new();
    for _ in 0..4 {
        let response = Call::get("/spin/").cookie(cookie.as_deref()).send(&router).await;
        cookie = session_cookie(&response);
        seen.push(body_text(response).await);
    }
    assert_eq!(seen, ["a", "b", "a", "b"]);
}

#[tokio::test]
async fn test_numbered_files_form_one_sequence() {
    let pg = Playground::new()
        .file("wizard/index_002.html", "second")
        .file("wizard/index_001.html", "first");
    let router = pg.router();

    let first = Call::get("/wizard/").send(&router).await;
    let cookie = session_cookie(&first);
    assert_eq!(body_text(first).await, "first");

    let second = Call::get("/wizard/").cookie(cookie.as_deref()).send(&router).await;
    assert_eq!(body_text(second).await, "second");
}

#[tokio::test]
async fn test_cursors_are_per_method() {
    let pg = Playground::new().file("form/index.html", "a\n===\nb");
    let router = pg.router();

    let first = Call::get("/form/").send(&router).await;
    let cookie = session_cookie(&first);
    assert_eq!(body_text(first).await, "a");

    let post = Call::post("/form/").cookie(cookie.as_deref()).send(&router).await;
    assert_eq!(body_text(post).await, "a");
}

#[tokio::test]
async fn test_empty_section_is_no_content() {
    let pg = Playground::new().file("ack/post.html", "");
    let router = pg.router();

    let response = Call::post("/ack/").send(&router).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.headers().get(SET_COOKIE).is_some());
    assert!(body_text(response).await.is_empty());
}

#[tokio::test]
async fn test_status_override() {
    let pg = Playground::new().file("teapot/index.html", "---\nstatus: 418\n---\n<p>short and stout</p>");
    let router = pg.router();

    let response = Call::get("/teapot/").send(&router).await;
    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(body_text(response).await, "<p>short and stout</p>");
}

#[tokio::test]
async fn test_negative_frontmatter_numbers_are_ignored() {
    let pg = Playground::new().file("neg/index.html", "---\ninterval: -1\nstatus: -1\n---\nok");
    let router = pg.router();

    let response = Call::get("/neg/").send(&router).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_method_specific_file() {
    let pg = Playground::new().file("only/get.html", "got");
    let router = pg.router();

    let get = Call::get("/only/").send(&router).await;
    assert_eq!(get.status(), StatusCode::OK);

    let post = Call::post("/only/").send(&router).await;
    assert_eq!(post.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_method_file_wins_over_any_method() {
    let pg = Playground::new()
        .file("pick/index.html", "any")
        .file("pick/post.html", "posted");
    let router = pg.router();

    assert_eq!(body_text(Call::get("/pick/").send(&router).await).await, "any");
    assert_eq!(body_text(Call::post("/pick/").send(&router).await).await, "posted");
}

#[tokio::test]
async fn test_template_error_is_500() {
    let pg = Playground::new().file("broken/index.html", "{{.NoSuchField}}");
    let router = pg.router();

    let response = Call::get("/broken/").send(&router).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_failed_section_still_advances_cursor() {
    let pg = Playground::new().file("shaky/index.html", "{{.Nope}}\n===\nok");
    let router = pg.router();

    let first = Call::get("/shaky/").send(&router).await;
    assert_eq!(first.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let cookie = session_cookie(&first);
    assert!(cookie.is_some());

    let second = Call::get("/shaky/").cookie(cookie.as_deref()).send(&router).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(body_text(second).await, "ok");
}

#[tokio::test]
async fn test_method_mismatch_keeps_session_hit() {
    let pg = Playground::new().file("only/get.html", "{{.SessionURLHits}}");
    let router = pg.router();

    let miss = Call::post("/only/").send(&router).await;
    assert_eq!(miss.status(), StatusCode::NOT_FOUND);
    let cookie = session_cookie(&miss);
    assert!(cookie.is_some());

    let hit = Call::get("/only/").cookie(cookie.as_deref()).send(&router).await;
    assert_eq!(body_text(hit).await, "2");
}

#[tokio::test]
async fn test_malformed_frontmatter_fails_whole_scan() {
    let pg = Playground::new()
        .file("index.html", "<p>fine</p>")
        .file("bad/index.html", "---\nloop: [\n---\nbody");
    let router = pg.router();

    let response = Call::get("/").send(&router).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_files_are_rescanned_per_request() {
    let pg = Playground::new().file("index.html", "before");
    let router = pg.router();

    assert_eq!(body_text(Call::get("/").send(&router).await).await, "before");

    std::fs::write(pg.root().join("index.html"), "after").unwrap();
    assert_eq!(body_text(Call::get("/").send(&router).await).await, "after");
}

#[tokio::test]
async fn test_static_files_are_served() {
    let pg = Playground::new().file("static/app.css", "body { color: red; }");
    let router = pg.router();

    let response = Call::get("/static/app.css").send(&router).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "body { color: red; }");
}

#[tokio::test]
async fn test_request_id_is_returned() {
    let pg = Playground::new().file("index.html", "hi");
    let router = pg.router();

    let response = Call::get("/").send(&router).await;
    assert!(response.headers().get("x-request-id").is_some());
}

#[tokio::test]
async fn test_live_request_without_live_file_gets_html() {
    let pg = Playground::new().file("plain/index.html", "msg={{.Signals.msg}}");
    let router = pg.router();

    let response = Call::get("/plain/?datastar=%7B%22msg%22%3A%22hey%22%7D")
        .live()
        .send(&router)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "msg=hey");
}

#[tokio::test]
async fn test_live_stream_sends_patch_events() {
    let pg = Playground::new().file(
        "clock/live.html",
        "---\nloop: true\ninterval: 20\n---\n<p>tick {{.LoopIteration}}</p>",
    );
    let router = pg.router();

    let response = Call::get("/clock/").live().send(&router).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(CONTENT_TYPE).unwrap(),
        "text/event-stream"
    );
    assert!(response.headers().get(SET_COOKIE).is_some());

    let mut events = EventReader::new(response);
    let first = events.until("tick").await;
    assert!(first.contains("event: datastar-patch-elements"));
    assert!(first.contains("data: elements <p>tick 0</p>"));

    let later = events.until("tick 2").await;
    assert!(later.contains("data: elements <p>tick 2</p>"));
}

#[tokio::test]
async fn test_live_sections_drain_then_finish_on_shutdown() {
    let pg = Playground::new().file(
        "story/live.html",
        "---\ndelay: 10\n---\n<p>one</p>\n===\n<p>two</p>",
    );
    let shutdown = Shutdown::new();
    let router = common::router_with(pg.config(), shutdown.clone());

    let response = Call::get("/story/").live().send(&router).await;
    let mut events = EventReader::new(response);
    events.until("<p>one</p>").await;
    events.until("<p>two</p>").await;

    // The stream idles after the last section until something stops it.
    assert!(!events.ends_within(Duration::from_millis(100)).await);
    shutdown.trigger();
    assert!(events.ends_within(Duration::from_secs(2)).await);
}

#[tokio::test]
async fn test_html_signals_reach_open_live_stream() {
    let pg = Playground::new()
        .file("chat/get_live.html", "<p>said: {{.Signals.msg}}</p>")
        .file("chat/index.html", "ok");
    let router = pg.router();

    let stream = Call::get("/chat/").live().send(&router).await;
    let cookie = session_cookie(&stream);
    let mut events = EventReader::new(stream);
    events.until("said:").await;

    let post = Call::post("/chat/")
        .live()
        .cookie(cookie.as_deref())
        .body(r#"{"msg":"hello"}"#)
        .send(&router)
        .await;
    assert_eq!(post.status(), StatusCode::OK);

    let update = events.until("said: hello").await;
    assert!(update.contains("data: elements <p>said: hello</p>"));
}

#[tokio::test]
async fn test_signals_do_not_cross_sessions() {
    let pg = Playground::new()
        .file("chat/get_live.html", "<p>said: {{.Signals.msg}}</p>")
        .file("chat/index.html", "ok");
    let router = pg.router();

    let stream = Call::get("/chat/").live().send(&router).await;
    let mut events = EventReader::new(stream);
    events.until("said:").await;

    let other = Call::post("/chat/")
        .live()
        .body(r#"{"msg":"psst"}"#)
        .send(&router)
        .await;
    assert_eq!(other.status(), StatusCode::OK);

    let leaked = tokio::time::timeout(Duration::from_millis(200), events.until("psst")).await;
    assert!(leaked.is_err());
}
