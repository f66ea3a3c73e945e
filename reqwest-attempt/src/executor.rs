//! Single-shot and retriable execution of a [`RequestDescription`].

use std::time::{Duration, SystemTime};

use reqwest::{Client, Response};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use retry_policies::{RetryDecision, RetryPolicy};

use crate::admission::admit;
use crate::error::{Error, Result};
use crate::policy::FixedBackoff;
use crate::request::{PreparedRequest, RequestDescription};

impl RequestDescription {
    /// Build the request and send it once.
    ///
    /// Returns the response if the transport succeeded and its status is admitted
    /// by [`status_code_constraint`](Self::status_code_constraint).
    pub async fn send(&self) -> Result<Response> {
        let req = self.build().inspect_err(|e| tracing::error!("{}", e))?;
        let client = self.client()?;
        self.do_once(&req, &client).await
    }

    /// Build the request and send it up to `1 + attempts` times, sleeping
    /// `backoff_ms` between tries (10ms if zero).
    ///
    /// Both transport errors and status rejections are retried. Once the tries
    /// are exhausted the last error is returned. Cancelling the context while
    /// sleeping returns the context error straight away.
    pub async fn send_retriable(&self) -> Result<Response> {
        let req = self.build().inspect_err(|e| tracing::error!("{}", e))?;
        let client = self.client()?;
        self.execute_with_retry(&req, &client, self.policy().or_default_backoff())
            .await
    }

    /// Send an already-built request once with the given client, applying the
    /// status-code admission.
    ///
    /// The request is sent as a copy, like every retriable attempt, so a
    /// [`PreparedRequest`] with a streaming body fails with [`Error::Build`]
    /// without reaching the transport.
    pub async fn do_once(
        &self,
        req: &PreparedRequest,
        client: &ClientWithMiddleware,
    ) -> Result<Response> {
        self.attempt(req, client, 1).await
    }

    /// Like [`do_once`](Self::do_once) with the retry loop of
    /// [`send_retriable`](Self::send_retriable), except that `backoff_ms` is
    /// used as-is: zero means retrying immediately.
    pub async fn do_retriable(
        &self,
        req: &PreparedRequest,
        client: &ClientWithMiddleware,
    ) -> Result<Response> {
        self.execute_with_retry(req, client, self.policy()).await
    }

    fn policy(&self) -> FixedBackoff {
        FixedBackoff::new(self.attempts, Duration::from_millis(self.backoff_ms))
    }

    /// A fresh client whose timeout bounds each attempt.
    fn client(&self) -> Result<ClientWithMiddleware> {
        let mut builder = Client::builder();
        if self.timeout_ms > 0 {
            builder = builder.timeout(Duration::from_millis(self.timeout_ms));
        }
        let client = builder.build().map_err(Error::build)?;
        Ok(ClientBuilder::new(client).build())
    }

    async fn attempt(
        &self,
        req: &PreparedRequest,
        client: &ClientWithMiddleware,
        n: u32,
    ) -> Result<Response> {
        let request = req.replay()?;
        tracing::debug!(
            method = %request.method(),
            url = %request.url(),
            attempt = n,
            "Sending request"
        );
        let response = req.context().run(client.execute(request)).await??;
        admit(&self.status_code_constraint, response)
    }

    async fn execute_with_retry(
        &self,
        req: &PreparedRequest,
        client: &ClientWithMiddleware,
        policy: FixedBackoff,
    ) -> Result<Response> {
        let start_time = SystemTime::now();
        let mut n_past_retries = 0;
        loop {
            let err = match self.attempt(req, client, n_past_retries + 1).await {
                Ok(response) => return Ok(response),
                Err(err) if !err.is_retriable() => return Err(err),
                Err(err) => err,
            };

            let execute_after = match policy.should_retry(start_time, n_past_retries) {
                RetryDecision::Retry { execute_after } => execute_after,
                RetryDecision::DoNotRetry => return Err(err),
            };
            let duration = wait_before_retry(execute_after, policy.backoff);
            tracing::warn!(
                error = %err,
                "Retry attempt #{}. Sleeping {:?} before the next attempt",
                n_past_retries,
                duration
            );
            req.context().sleep(duration).await?;
            n_past_retries += 1;
        }
    }
}

/// Time left until `execute_after`, never less than `backoff`.
///
/// The policy schedules retries on the wall clock, which may step backwards.
fn wait_before_retry(execute_after: SystemTime, backoff: Duration) -> Duration {
    execute_after
        .duration_since(SystemTime::now())
        .unwrap_or_default()
        .max(backoff)
}
