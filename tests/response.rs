use std::net::SocketAddr;
use std::path::PathBuf;

use bytes::Bytes;
use serde_json::{Value, json};
use strata::{
    Application, CookieOptions, Error, Etag, Formats, Next, Outcome, Request, Response, SameSite,
    SendFileOptions, Settings, StatusCode,
};

fn get(uri: &str) -> http::Request<Bytes> {
    http::Request::get(uri).body(Bytes::new()).unwrap()
}

fn get_with(uri: &str, name: &str, value: &str) -> http::Request<Bytes> {
    http::Request::get(uri).header(name, value).body(Bytes::new()).unwrap()
}

fn text(res: &http::Response<Bytes>) -> &str {
    std::str::from_utf8(res.body()).unwrap()
}

fn header<'a>(res: &'a http::Response<Bytes>, name: &str) -> Option<&'a str> {
    res.headers().get(name).and_then(|v| v.to_str().ok())
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("strata-response-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

async fn user(req: Request, mut res: Response, next: Next) -> Outcome {
    let sent = res.json(&json!({ "id": 1, "name": "alice" }));
    next.settle(req, res, sent)
}

// ── Bodies ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn send_encodes_json_scalars() {
    async fn null(req: Request, mut res: Response, next: Next) -> Outcome {
        let sent = res.send(Value::Null);
        next.settle(req, res, sent)
    }
    async fn answer(req: Request, mut res: Response, next: Next) -> Outcome {
        let sent = res.send(42);
        next.settle(req, res, sent)
    }

    let app = Application::new().get("/null", null).get("/answer", answer).freeze();

    let res = app.handle(get("/null")).await;
    assert_eq!(text(&res), "null");
    assert_eq!(header(&res, "content-type"), Some("application/json; charset=utf-8"));

    let res = app.handle(get("/answer")).await;
    assert_eq!(text(&res), "42");
    assert_eq!(header(&res, "content-length"), Some("2"));
}

#[tokio::test]
async fn json_response_revalidates_to_304() {
    let app = Application::new().get("/user", user).freeze();

    let first = app.handle(get("/user")).await;
    assert_eq!(first.status(), StatusCode::OK);
    let tag = header(&first, "etag").unwrap().to_owned();
    assert!(tag.starts_with("W/\""));

    let second = app.handle(get_with("/user", "if-none-match", &tag)).await;
    assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
    assert!(second.body().is_empty());
    assert_eq!(header(&second, "content-type"), None);
    assert_eq!(header(&second, "content-length"), None);

    let stale = app.handle(get_with("/user", "if-none-match", "W/\"nope\"")).await;
    assert_eq!(stale.status(), StatusCode::OK);
}

#[tokio::test]
async fn etag_setting_controls_validators() {
    let strong = Application::with_settings(Settings { etag: Etag::Strong, ..Settings::default() })
        .get("/user", user)
        .freeze();
    let res = strong.handle(get("/user")).await;
    let tag = header(&res, "etag").unwrap();
    assert!(tag.starts_with('"'));

    let off = Application::with_settings(Settings { etag: Etag::Disabled, ..Settings::default() })
        .get("/user", user)
        .freeze();
    assert_eq!(header(&off.handle(get("/user")).await, "etag"), None);

    let custom = Application::with_settings(Settings {
        etag: Etag::custom(|body| Some(format!("\"len-{}\"", body.len()))),
        ..Settings::default()
    })
    .get("/user", user)
    .freeze();
    let res = custom.handle(get("/user")).await;
    assert_eq!(header(&res, "etag"), Some(format!("\"len-{}\"", res.body().len()).as_str()));
}

#[tokio::test]
async fn jsonp_uses_configured_callback_parameter() {
    async fn jsonp(req: Request, mut res: Response, next: Next) -> Outcome {
        let sent = res.jsonp(&json!({ "ok": true }));
        next.settle(req, res, sent)
    }

    let settings = Settings { jsonp_callback_name: "cb".to_owned(), ..Settings::default() };
    let app = Application::with_settings(settings).get("/data", jsonp).freeze();

    let res = app.handle(get("/data?cb=handle")).await;
    assert_eq!(header(&res, "content-type"), Some("text/javascript; charset=utf-8"));
    assert_eq!(text(&res), "/**/ typeof handle === 'function' && handle({\"ok\":true});");

    let res = app.handle(get("/data?callback=ignored")).await;
    assert_eq!(text(&res), "{\"ok\":true}");
}

// ── Negotiation ───────────────────────────────────────────────────────────────

async fn negotiated(req: Request, mut res: Response, next: Next) -> Outcome {
    let sent = res.format(
        Formats::new()
            .on("json", |r| r.json(&json!({ "kind": "json" })))
            .on("txt", |r| r.send("kind: text")),
    );
    next.settle(req, res, sent)
}

#[tokio::test]
async fn format_picks_the_preferred_type() {
    let app = Application::new().get("/", negotiated).freeze();

    let res = app.handle(get_with("/", "accept", "text/plain, application/json;q=0.5")).await;
    assert_eq!(text(&res), "kind: text");
    assert_eq!(header(&res, "content-type"), Some("text/plain; charset=utf-8"));
    assert_eq!(header(&res, "vary"), Some("Accept"));

    let res = app.handle(get("/")).await;
    assert_eq!(text(&res), "{\"kind\":\"json\"}");
}

#[tokio::test]
async fn format_without_acceptable_type_is_406() {
    let app = Application::new().get("/", negotiated).freeze();

    let res = app.handle(get_with("/", "accept", "image/png")).await;
    assert_eq!(res.status(), StatusCode::NOT_ACCEPTABLE);
    assert!(text(&res).contains("Not Acceptable"));
}

#[tokio::test]
async fn format_fallback_runs_when_nothing_matches() {
    async fn with_fallback(req: Request, mut res: Response, next: Next) -> Outcome {
        let sent = res.format(
            Formats::new()
                .on("html", |r| r.send("<p>hi</p>"))
                .fallback(|r| r.send_status(StatusCode::UNSUPPORTED_MEDIA_TYPE)),
        );
        next.settle(req, res, sent)
    }

    let app = Application::new().get("/", with_fallback).freeze();
    let res = app.handle(get_with("/", "accept", "application/xml")).await;
    assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn redirect_back_uses_the_referrer() {
    async fn back(req: Request, mut res: Response, next: Next) -> Outcome {
        let sent = res.redirect(StatusCode::FOUND, "back");
        next.settle(req, res, sent)
    }

    let app = Application::new().post("/form", back).freeze();
    let req = http::Request::post("/form")
        .header("referer", "/previous?page=2")
        .header("accept", "text/html")
        .body(Bytes::new())
        .unwrap();

    let res = app.handle(req).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(header(&res, "location"), Some("/previous?page=2"));
    assert!(text(&res).contains("Found. Redirecting to /previous?page=2"));
}

// ── Headers ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn cookies_are_serialized_in_attribute_order() {
    async fn login(req: Request, mut res: Response, next: Next) -> Outcome {
        let opts = CookieOptions::default()
            .domain("example.com")
            .http_only(true)
            .secure(true)
            .same_site(SameSite::Lax);
        res.cookie("session", "a b", &opts).clear_cookie("legacy", &CookieOptions::default());
        let sent = res.send(());
        next.settle(req, res, sent)
    }

    let app = Application::new().post("/login", login).freeze();
    let res = app.handle(http::Request::post("/login").body(Bytes::new()).unwrap()).await;

    let cookies: Vec<_> = res.headers().get_all("set-cookie").iter().map(|v| v.to_str().unwrap()).collect();
    assert_eq!(cookies[0], "session=a%20b; Domain=example.com; Path=/; HttpOnly; Secure; SameSite=Lax");
    assert_eq!(cookies[1], "legacy=; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT");
}

#[tokio::test]
async fn connection_details_honour_trust_proxy() {
    async fn whoami(req: Request, mut res: Response, next: Next) -> Outcome {
        let body = json!({
            "ip": req.ip(),
            "ips": req.ips(),
            "protocol": req.protocol(),
            "hostname": req.hostname(),
            "subdomains": req.subdomains(2),
            "xhr": req.xhr(),
        });
        let sent = res.json(&body);
        next.settle(req, res, sent)
    }

    let peer: SocketAddr = "10.1.2.3:4000".parse().unwrap();
    let build = || {
        http::Request::get("/whoami")
            .header("host", "tobi.ferrets.example.com:8080")
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .header("x-forwarded-proto", "https")
            .header("x-requested-with", "XMLHttpRequest")
            .body(Bytes::new())
            .unwrap()
    };

    let direct = Application::new().get("/whoami", whoami).freeze();
    let body: Value = serde_json::from_slice(direct.handle_from(build(), Some(peer)).await.body()).unwrap();
    assert_eq!(body["ip"], "10.1.2.3");
    assert_eq!(body["ips"], json!([]));
    assert_eq!(body["protocol"], "http");
    assert_eq!(body["hostname"], "tobi.ferrets.example.com");
    assert_eq!(body["subdomains"], json!(["ferrets", "tobi"]));
    assert_eq!(body["xhr"], true);

    let proxied = Application::with_settings(Settings { trust_proxy: true, ..Settings::default() })
        .get("/whoami", whoami)
        .freeze();
    let body: Value = serde_json::from_slice(proxied.handle_from(build(), Some(peer)).await.body()).unwrap();
    assert_eq!(body["ip"], "203.0.113.7");
    assert_eq!(body["ips"], json!(["203.0.113.7", "10.0.0.1"]));
    assert_eq!(body["protocol"], "https");
}

// ── Files ─────────────────────────────────────────────────────────────────────

fn file_app(dir: PathBuf) -> strata::App {
    let absolute = dir.clone();
    let rooted = dir.clone();
    let unnamed = dir.clone();
    Application::new()
        .get("/abs/:name", move |req: Request, mut res: Response, next: Next| {
            let path = absolute.join(req.param("name").unwrap_or(""));
            async move {
                let sent = res.send_file(&path).await;
                next.settle(req, res, sent)
            }
        })
        .get("/rooted/:name*", move |req: Request, mut res: Response, next: Next| {
            let opts = SendFileOptions { root: Some(rooted.clone()), ..SendFileOptions::default() };
            async move {
                let name = req.param("name").unwrap_or("").to_owned();
                let sent = res.send_file_with(&name, &opts).await;
                next.settle(req, res, sent)
            }
        })
        .get("/relative", |req: Request, mut res: Response, next: Next| async move {
            let sent = res.send_file("notes.txt").await;
            next.settle(req, res, sent)
        })
        .get("/unnamed/:name", move |req: Request, mut res: Response, next: Next| {
            let path = unnamed.join(req.param("name").unwrap_or(""));
            async move {
                let sent = res.download(&path, Some("")).await;
                next.settle(req, res, sent)
            }
        })
        .get("/download/:name", move |req: Request, mut res: Response, next: Next| {
            let path = dir.join(req.param("name").unwrap_or(""));
            async move {
                let sent = res.download(&path, None).await;
                next.settle(req, res, sent)
            }
        })
        .catch(|err: Error, req: Request, mut res: Response, next: Next| async move {
            res.set_status(err.status());
            let disposition = res.get("content-disposition").map(str::to_owned);
            let sent = res.json(&json!({ "status": err.status().as_u16(), "disposition": disposition }));
            next.settle(req, res, sent)
        })
        .freeze()
}

#[tokio::test]
async fn send_file_sets_caching_headers() {
    let dir = scratch_dir("send-file");
    std::fs::write(dir.join("notes.txt"), "plain notes").unwrap();
    let app = file_app(dir);

    let res = app.handle(get("/abs/notes.txt")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(text(&res), "plain notes");
    assert_eq!(header(&res, "content-type"), Some("text/plain; charset=utf-8"));
    assert_eq!(header(&res, "cache-control"), Some("public, max-age=0"));
    assert_eq!(header(&res, "content-length"), Some("11"));
    assert!(header(&res, "last-modified").is_some());
    let tag = header(&res, "etag").unwrap().to_owned();
    assert!(tag.starts_with("W/\"b-"));

    let res = app.handle(get_with("/abs/notes.txt", "if-none-match", &tag)).await;
    assert_eq!(res.status(), StatusCode::NOT_MODIFIED);
}

#[tokio::test]
async fn send_file_failures_map_to_statuses() {
    let dir = scratch_dir("send-file-errors");
    std::fs::create_dir_all(dir.join("sub")).unwrap();
    std::fs::write(dir.join("sub/inner.txt"), "inner").unwrap();
    let app = file_app(dir);

    let status = |res: &http::Response<Bytes>| serde_json::from_slice::<Value>(res.body()).unwrap()["status"].clone();

    assert_eq!(status(&app.handle(get("/abs/missing.txt")).await), 404);
    assert_eq!(status(&app.handle(get("/abs/sub")).await), 404);
    assert_eq!(status(&app.handle(get("/relative")).await), 500);

    let res = app.handle(get("/rooted/sub/inner.txt")).await;
    assert_eq!(text(&res), "inner");
    assert_eq!(status(&app.handle(get("/rooted/../../etc/passwd")).await), 403);
}

#[tokio::test]
async fn download_sets_and_clears_disposition() {
    let dir = scratch_dir("download");
    std::fs::write(dir.join("report.csv"), "a,b\n1,2\n").unwrap();
    let app = file_app(dir);

    let res = app.handle(get("/download/report.csv")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(header(&res, "content-disposition"), Some("attachment; filename=\"report.csv\""));

    let res = app.handle(get("/unnamed/report.csv")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(header(&res, "content-disposition"), Some("attachment"));

    let res = app.handle(get("/download/missing.csv")).await;
    let body: Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(body["status"], 404);
    assert_eq!(body["disposition"], Value::Null);
}
