use std::collections::HashMap;
use std::fmt;

use anyhow::anyhow;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Body, Method, Request, Url};

use crate::context::Context;
use crate::error::{Error, Result};

/// Everything needed to send one request: where, what, and how hard to try.
///
/// The description is read-only while a call is in flight. Build it with the
/// chained setters, then hand it to [`send`] or [`send_retriable`]:
///
/// ```no_run
/// use reqwest_attempt::RequestDescription;
///
/// # async fn run() -> reqwest_attempt::Result<()> {
/// let response = RequestDescription::new("POST", "http://localhost:8080/jobs")
///     .header("content-type", "application/json")
///     .body(r#"{"name":"nightly"}"#)
///     .timeout_ms(1000)
///     .attempts(3)
///     .backoff_ms(250)
///     .status_codes([200, 201])
///     .send_retriable()
///     .await?;
/// # Ok(())
/// # }
/// ```
///
/// [`send`]: RequestDescription::send
/// [`send_retriable`]: RequestDescription::send_retriable
#[derive(Clone, Debug, Default)]
pub struct RequestDescription {
    pub context: Context,
    /// HTTP verb. Empty means `GET`.
    pub method: String,
    pub url: String,
    /// Copied into every attempt, so retries resend the same bytes.
    pub body: Vec<u8>,
    /// One value per name; names compare case-insensitively.
    pub headers: HashMap<String, String>,
    /// Retries after the first try in the retriable path.
    pub attempts: u32,
    pub backoff_ms: u64,
    /// Per-attempt timeout. Zero leaves only the context to bound the call.
    pub timeout_ms: u64,
    /// Admitted status codes. Empty admits any status.
    pub status_code_constraint: Vec<u16>,
}

impl RequestDescription {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn context(self, context: Context) -> Self {
        Self { context, ..self }
    }

    pub fn body(self, body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            ..self
        }
    }

    /// Set a header, replacing any previous value under the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn attempts(self, attempts: u32) -> Self {
        Self { attempts, ..self }
    }

    pub fn backoff_ms(self, backoff_ms: u64) -> Self {
        Self { backoff_ms, ..self }
    }

    pub fn timeout_ms(self, timeout_ms: u64) -> Self {
        Self { timeout_ms, ..self }
    }

    pub fn status_codes(self, codes: impl IntoIterator<Item = u16>) -> Self {
        Self {
            status_code_constraint: codes.into_iter().collect(),
            ..self
        }
    }

    /// Turn the description into a request bound to its context.
    ///
    /// No I/O happens here. Fails if the method, URL or a header is rejected,
    /// or if the context is already done.
    pub fn build(&self) -> Result<PreparedRequest> {
        if let Some(err) = self.context.err() {
            return Err(Error::build(err));
        }

        let method = if self.method.is_empty() {
            Method::GET
        } else {
            Method::from_bytes(self.method.as_bytes()).map_err(Error::build)?
        };

        let mut headers = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(Error::build)?;
            let value = HeaderValue::from_str(value).map_err(Error::build)?;
            headers.insert(name, value);
        }

        let url = Url::parse(&self.url).map_err(Error::build)?;
        let mut request = Request::new(method, url);
        *request.headers_mut() = headers;
        *request.body_mut() = Some(Body::from(self.body.clone()));

        Ok(PreparedRequest::new(request, self.context.clone()))
    }
}

/// A request bound to the [`Context`] that may cancel it.
///
/// Every attempt sends a fresh copy of the request, so the body must be
/// replayable (bytes, not a stream).
pub struct PreparedRequest {
    inner: Request,
    context: Context,
}

impl PreparedRequest {
    /// Bind a caller-built request to `context`.
    ///
    /// The body must be clonable even for a single attempt: a streaming body
    /// makes both [`do_once`] and [`do_retriable`] fail with [`Error::Build`].
    ///
    /// [`do_once`]: RequestDescription::do_once
    /// [`do_retriable`]: RequestDescription::do_retriable
    pub fn new(request: Request, context: Context) -> Self {
        Self {
            inner: request,
            context,
        }
    }

    pub fn request(&self) -> &Request {
        &self.inner
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn into_inner(self) -> Request {
        self.inner
    }

    /// Copy of the request for the next attempt.
    pub(crate) fn replay(&self) -> Result<Request> {
        self.inner.try_clone().ok_or_else(|| {
            Error::build(anyhow!(
                "Request object is not clonable. Are you passing a streaming body?"
            ))
        })
    }
}

impl fmt::Debug for PreparedRequest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PreparedRequest")
            .field("method", self.inner.method())
            .field("url", &self.inner.url().as_str())
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
