//! A small tour of browser cookies and signed sessions.
//!
//! Routes come in three groups: a plain-cookie demo (`/form-cookie` and friends), a session
//! demo (`/form-session` and friends), and a secret-code gate (`/login-form`, `/login`,
//! `/secret-invite`). Incoming cookies are logged for every request, so run with
//! `RUST_LOG=debug` and poke at the cookie jar in the browser dev tools to see what the
//! server receives.
//!
//! The signing secret comes from `SESSION_SECRET` and must be set before startup.

use std::net::SocketAddr;

use axum::{
    Router,
    extract::{Query, Request},
    middleware::{self, Next},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use http::header;
use serde::Deserialize;
use signed_session::{SameSite, Secret, Session, SessionCookieConfig, SessionManagerLayer};
use tower_cookies::{Cookie, Cookies};

// The "secret invite" access code. A real application would compare against a credential
// store; the gate only demonstrates a session flag.
const SECRET_CODE: &str = "chickenz_are_gr8";

async fn log_cookies(req: Request, next: Next) -> Response {
    match req
        .headers()
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
    {
        Some(cookies) => tracing::debug!(%cookies, "incoming cookies"),
        None => tracing::debug!("incoming cookies: none"),
    }
    next.run(req).await
}

async fn index() -> Html<&'static str> {
    Html(
        "<h1>Cookies &amp; sessions demo</h1>\
         <ul>\
           <li><a href=\"/form-cookie\">Cookie demo</a></li>\
           <li><a href=\"/form-session\">Session demo</a></li>\
           <li><a href=\"/login-form\">Secret invite</a></li>\
         </ul>",
    )
}

// A response that sets a cookie directly, without involving the session.
async fn cookie_demo(cookies: Cookies) -> Html<&'static str> {
    cookies.add(
        Cookie::build(("jolly_rancher_flavor", "grape"))
            .path("/")
            .build(),
    );
    Html("<h1>HELLO!!</h1>")
}

async fn show_cookie_form() -> Html<&'static str> {
    Html(
        "<form action=\"/handle-form-cookie\">\
           <label>Favorite color: <input name=\"fav_color\"></label>\
           <button>Submit</button>\
         </form>",
    )
}

#[derive(Deserialize)]
struct CookieForm {
    fav_color: String,
}

async fn handle_cookie_form(cookies: Cookies, Query(form): Query<CookieForm>) -> Html<String> {
    let html = Html(format!(
        "<p>Noted! We'll remember your favorite color is {}.</p>\
         <p><a href=\"/later-cookie\">See it later</a></p>",
        form.fav_color
    ));
    cookies.add(Cookie::build(("fav_color", form.fav_color)).path("/").build());
    html
}

async fn later_cookie(cookies: Cookies) -> Html<String> {
    let fav_color = cookies
        .get("fav_color")
        .map(|cookie| cookie.value().to_string())
        .unwrap_or_else(|| "<unset>".to_string());
    Html(format!("<p>Your favorite color is {fav_color}.</p>"))
}

async fn show_session_form() -> Html<&'static str> {
    Html(
        "<form action=\"/handle-form-session\">\
           <label>Nickname: <input name=\"nickname\"></label>\
           <label>Lucky number: <input name=\"lucky_number\" type=\"number\"></label>\
           <button>Submit</button>\
         </form>",
    )
}

#[derive(Deserialize)]
struct SessionForm {
    nickname: String,
    lucky_number: i64,
}

async fn handle_session_form(session: Session, Query(form): Query<SessionForm>) -> Html<String> {
    session
        .insert("nickname", &form.nickname)
        .expect("session insert succeeds");
    session
        .insert("lucky_number", form.lucky_number)
        .expect("session insert succeeds");

    Html(format!(
        "<p>Pleased to meet you, {}! {} is a fine number.</p>\
         <p><a href=\"/later-session\">See it later</a></p>",
        form.nickname, form.lucky_number
    ))
}

async fn later_session(session: Session) -> Html<String> {
    let nickname: String = session
        .get("nickname")
        .expect("session get succeeds")
        .unwrap_or_else(|| "<no nickname>".to_string());
    Html(format!("<p>Welcome back, {nickname}.</p>"))
}

async fn show_login_form() -> Html<&'static str> {
    Html(
        "<form action=\"/login\">\
           <label>Secret code: <input name=\"secret_code\"></label>\
           <button>Enter</button>\
         </form>",
    )
}

#[derive(Deserialize)]
struct LoginForm {
    secret_code: String,
}

async fn login(session: Session, Query(form): Query<LoginForm>) -> Redirect {
    if form.secret_code == SECRET_CODE {
        session
            .insert("entered_pin", true)
            .expect("session insert succeeds");
        Redirect::to("/secret-invite")
    } else {
        Redirect::to("/login-form")
    }
}

async fn secret_invite(session: Session) -> Response {
    let entered_pin = session
        .get::<bool>("entered_pin")
        .expect("session get succeeds")
        .unwrap_or(false);

    if entered_pin {
        Html("<h1>You're invited!</h1><p>Saturday, 8pm. Bring snacks.</p>").into_response()
    } else {
        Redirect::to("/login-form").into_response()
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,cookie_demo=debug".into()),
        )
        .init();

    // A missing secret is fatal before any request is served; a silent default would defeat
    // the tamper evidence entirely.
    let secret = match Secret::from_env("SESSION_SECRET") {
        Ok(secret) => secret,
        Err(err) => {
            eprintln!("fatal: {err}; set SESSION_SECRET to a non-empty value");
            std::process::exit(1);
        }
    };

    let session_config = SessionCookieConfig::default()
        .with_same_site(SameSite::Lax)
        // Local HTTP development; leave Secure on behind TLS.
        .with_secure(false);
    let session_layer = SessionManagerLayer::new(secret).with_config(session_config);

    let app = Router::new()
        .route("/", get(index))
        .route("/demo", get(cookie_demo))
        .route("/form-cookie", get(show_cookie_form))
        .route("/handle-form-cookie", get(handle_cookie_form))
        .route("/later-cookie", get(later_cookie))
        .route("/form-session", get(show_session_form))
        .route("/handle-form-session", get(handle_session_form))
        .route("/later-session", get(later_session))
        .route("/login-form", get(show_login_form))
        .route("/login", get(login))
        .route("/secret-invite", get(secret_invite))
        .layer(middleware::from_fn(log_cookies))
        .layer(session_layer);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("tcp listener binds successfully");
    let local_addr = listener.local_addr().expect("local address is available");
    tracing::info!("listening at http://{local_addr}");

    axum::serve(listener, app)
        .await
        .expect("server runs successfully");
}
