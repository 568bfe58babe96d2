//! Tower middleware wiring the codec into the HTTP exchange.
//!
//! On the way in, the configured cookie (if any) is decoded into a [`Session`] and inserted
//! into request extensions. On the way out, a modified session is re-encoded into a
//! `Set-Cookie`; a session that ends the request empty has its cookie removed.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use http::{Request, Response};
use tower_cookies::{Cookie, CookieManager, Cookies};
use tower_layer::Layer;
use tower_service::Service;

use crate::{
    Secret, Session, SessionData,
    codec::SignedSessionCodec,
    config::SessionCookieConfig,
};

#[derive(Debug, Clone)]
pub struct SessionManagerLayer {
    codec: SignedSessionCodec,
    config: SessionCookieConfig,
}

impl SessionManagerLayer {
    /// Create a layer signing session cookies with `secret`, using the default cookie
    /// configuration.
    #[must_use]
    pub fn new(secret: Secret) -> Self {
        Self::with_codec(SignedSessionCodec::new(secret))
    }

    /// Create a layer around a pre-configured codec (e.g. with a custom token size ceiling).
    #[must_use]
    pub fn with_codec(codec: SignedSessionCodec) -> Self {
        Self {
            codec,
            config: SessionCookieConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: SessionCookieConfig) -> Self {
        self.config = config;
        self
    }
}

#[derive(Debug, Clone)]
pub struct SessionManager<S> {
    inner: S,
    codec: SignedSessionCodec,
    config: SessionCookieConfig,
}

impl<S> Layer<S> for SessionManagerLayer {
    type Service = CookieManager<SessionManager<S>>;

    fn layer(&self, inner: S) -> Self::Service {
        CookieManager::new(SessionManager {
            inner,
            codec: self.codec.clone(),
            config: self.config.clone(),
        })
    }
}

fn remove_cookie(cookies: &Cookies, config: &SessionCookieConfig) {
    let mut cookie = Cookie::new(config.name.clone(), "");
    config.apply_removal_attributes(&mut cookie);
    cookies.remove(cookie);
}

impl<ReqBody, ResBody, S> Service<Request<ReqBody>> for SessionManager<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Default + Send,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let codec = self.codec.clone();
        let config = self.config.clone();

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let cookies = match req.extensions().get::<Cookies>().cloned() {
                Some(cookies) => cookies,
                None => {
                    // CookieManager should wrap this service; without it there is no jar to
                    // read or write.
                    let mut res = Response::default();
                    *res.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
                    return Ok(res);
                }
            };

            let session_cookie = cookies.get(&config.name).map(Cookie::into_owned);
            let had_cookie = session_cookie.is_some();
            let mut initial_cookie_removed = false;

            let data = match session_cookie.as_ref() {
                Some(cookie) => match codec.try_decode(cookie.value()) {
                    Ok(data) => data,
                    Err(err) => {
                        tracing::warn!(err = %err, "session cookie rejected");
                        if config.clear_on_decode_error {
                            remove_cookie(&cookies, &config);
                            initial_cookie_removed = true;
                        }
                        SessionData::new()
                    }
                },
                None => SessionData::new(),
            };

            let session = Session::from_data(data);
            req.extensions_mut().insert(session.clone());

            let res = inner.call(req).await?;

            if session.is_empty() {
                if had_cookie && !initial_cookie_removed {
                    remove_cookie(&cookies, &config);
                }
                return Ok(res);
            }

            if (session.is_modified() || config.always_save) && !res.status().is_server_error() {
                let expiry = session.expiry().or(config.expiry);
                match codec.encode(&session.data()) {
                    Ok(value) => {
                        cookies.add(config.build_cookie(value, expiry));
                    }
                    Err(err) => {
                        tracing::error!(err = %err, "session cookie save failed");
                        let mut res = Response::default();
                        *res.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
                        return Ok(res);
                    }
                }
            }

            Ok(res)
        })
    }
}
