//! This crate sends a single HTTP request described by a [`RequestDescription`], optionally
//! retrying it, with a per-attempt timeout and status-code admission.
//!
//! A call builds the request once, then either sends it a single time ([`send`]) or up to
//! `1 + attempts` times with a fixed backoff in between ([`send_retriable`]). A response is
//! accepted when the transport succeeded and, if [`status_code_constraint`] is non-empty, its
//! status is listed there. Otherwise the call fails with [`Error::Status`], whose message is
//! `error constraint with status code: <code>`.
//!
//! Every request is bound to a [`Context`]; cancelling it or letting its deadline pass aborts
//! the attempt in flight and any pending backoff.
//!
//! ```no_run
//! use std::time::Duration;
//! use reqwest_attempt::{Context, RequestDescription};
//!
//! async fn run() -> reqwest_attempt::Result<()> {
//!     let ctx = Context::background().with_timeout(Duration::from_secs(10));
//!     let resp = RequestDescription::new("GET", "https://example.com")
//!         .context(ctx)
//!         .timeout_ms(2000)
//!         .attempts(2)
//!         .status_codes([200])
//!         .send_retriable()
//!         .await?;
//!     println!("status: {}", resp.status());
//!     Ok(())
//! }
//! ```
//!
//! The lower-level [`do_once`] and [`do_retriable`] take a [`PreparedRequest`] and a
//! [`ClientWithMiddleware`], so middleware can be attached to the transport.
//!
//! [`send`]: RequestDescription::send
//! [`send_retriable`]: RequestDescription::send_retriable
//! [`do_once`]: RequestDescription::do_once
//! [`do_retriable`]: RequestDescription::do_retriable
//! [`status_code_constraint`]: RequestDescription::status_code_constraint
//! [`ClientWithMiddleware`]: reqwest_middleware::ClientWithMiddleware
mod admission;
mod context;
mod error;
mod executor;
mod policy;
mod request;

pub use admission::is_admitted;
pub use context::Context;
pub use error::{Error, Result};
pub use policy::{FixedBackoff, DEFAULT_BACKOFF};
pub use request::{PreparedRequest, RequestDescription};

pub use reqwest_middleware;
pub use tokio_util::sync::CancellationToken;
