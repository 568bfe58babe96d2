use std::sync::{Arc, Mutex, PoisonError};

use axum_core::extract::FromRequestParts;
use http::{StatusCode, request::Parts};
use serde::{Serialize, de::DeserializeOwned};

use crate::{Error, Expiry, SessionData, Value};

/// Handle to the per-request session.
///
/// Constructed by the session layer from the decoded cookie (or empty when the cookie was
/// absent or invalid) and inserted into request extensions. Route handlers read and mutate it;
/// after the inner service responds, the layer re-encodes the data into a fresh cookie if
/// anything changed. Cloning is cheap and every clone refers to the same underlying data.
#[derive(Debug, Clone, Default)]
pub struct Session {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    data: SessionData,
    expiry: Option<Expiry>,
    modified: bool,
}

impl Session {
    pub(crate) fn from_data(data: SessionData) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                data,
                expiry: None,
                modified: false,
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a serializable value under `key`.
    ///
    /// The value must fit the session shape set (strings, integers, booleans, sequences,
    /// mappings); anything else is [`Error::UnsupportedValue`].
    pub fn insert<T: Serialize>(&self, key: impl Into<String>, value: T) -> Result<(), Error> {
        let json = serde_json::to_value(value)?;
        let value =
            Value::from_json(json.clone()).ok_or_else(|| Error::UnsupportedValue(json.to_string()))?;
        self.insert_value(key, value);
        Ok(())
    }

    /// Insert a raw [`Value`] under `key`.
    ///
    /// Re-inserting a value equal to the current one is a no-op and does not mark the
    /// session modified, so idempotent handlers don't re-issue the cookie on every request.
    pub fn insert_value(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        let mut inner = self.lock();
        if inner.data.get(&key) != Some(&value) {
            inner.data.insert(key, value);
            inner.modified = true;
        }
    }

    /// Get the value under `key`, deserialized as `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Error> {
        self.get_value(key)
            .map(|value| serde_json::from_value(value.into_json()))
            .transpose()
            .map_err(Error::from)
    }

    /// Get the raw [`Value`] under `key`.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.lock().data.get(key).cloned()
    }

    /// Remove the value under `key`, returning it deserialized as `T`.
    pub fn remove<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Error> {
        self.remove_value(key)
            .map(|value| serde_json::from_value(value.into_json()))
            .transpose()
            .map_err(Error::from)
    }

    /// Remove the raw [`Value`] under `key`.
    pub fn remove_value(&self, key: &str) -> Option<Value> {
        let mut inner = self.lock();
        let removed = inner.data.remove(key);
        if removed.is_some() {
            inner.modified = true;
        }
        removed
    }

    /// Empty the session. The layer responds by removing the cookie.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.data.clear();
        inner.modified = true;
    }

    pub fn is_empty(&self) -> bool {
        self.lock().data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().data.len()
    }

    /// Whether the session was mutated during this request. The layer only writes a cookie
    /// for modified sessions (unless configured to always save).
    pub fn is_modified(&self) -> bool {
        self.lock().modified
    }

    /// Override the layer's expiry policy for this response's cookie.
    pub fn set_expiry(&self, expiry: Option<Expiry>) {
        let mut inner = self.lock();
        inner.expiry = expiry;
        inner.modified = true;
    }

    pub fn expiry(&self) -> Option<Expiry> {
        self.lock().expiry
    }

    /// Snapshot of the current session data.
    pub fn data(&self) -> SessionData {
        self.lock().data.clone()
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Session>().cloned().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Request extensions don't contain a Session; is SessionManagerLayer installed?",
        ))
    }
}
