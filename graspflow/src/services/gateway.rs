//! Blocking service calls behind an availability wait.

use super::poll::{wait_until, PollConfig};
use crate::errors::{GraspflowError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// A client for one remote service.
///
/// Implementations own the transport. They report availability and perform
/// a single request/response exchange; they never retry on their own.
#[async_trait]
pub trait ServiceClient: Send + Sync {
    /// Request message type.
    type Request: Send + Sync;
    /// Response message type.
    type Response: Send;

    /// Returns the service name.
    fn name(&self) -> &str;

    /// Returns true if the service can currently accept a call.
    async fn is_available(&self) -> bool;

    /// Performs one call.
    async fn call(&self, request: Self::Request) -> anyhow::Result<Self::Response>;
}

/// Wraps every service call in a bounded availability wait.
///
/// The gateway holds no per-call state and never touches the pipeline
/// context; it only returns a response or an error.
#[derive(Debug, Clone, Default)]
pub struct ServiceGateway {
    poll: PollConfig,
}

impl ServiceGateway {
    /// Creates a gateway with the given poll schedule.
    #[must_use]
    pub fn new(poll: PollConfig) -> Self {
        Self { poll }
    }

    /// Waits for `client` to become available, then issues exactly one call.
    ///
    /// # Errors
    ///
    /// - [`GraspflowError::ServiceUnavailable`] if the service is not
    ///   reachable before `timeout`; no call is attempted.
    /// - [`GraspflowError::ServiceCallError`] if the call itself fails.
    pub async fn call<C>(
        &self,
        client: &C,
        request: C::Request,
        timeout: Duration,
    ) -> Result<C::Response>
    where
        C: ServiceClient + ?Sized,
    {
        let service = client.name();
        let started = Instant::now();

        if !wait_until(|| client.is_available(), timeout, &self.poll).await {
            warn!(
                service = %service,
                timeout_s = timeout.as_secs_f64(),
                "Service not available"
            );
            return Err(GraspflowError::unavailable(service, timeout.as_secs_f64()));
        }

        debug!(
            service = %service,
            waited_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Service available, calling"
        );

        client
            .call(request)
            .await
            .map_err(|e| GraspflowError::call_failed(service, format!("{e:#}")))
    }
}
