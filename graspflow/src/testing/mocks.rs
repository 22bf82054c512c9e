//! Scripted in-memory service clients for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::services::ServiceClient;

#[derive(Debug, Clone, Copy)]
enum Availability {
    Always,
    Never,
    AfterProbes(usize),
}

/// A service client that replays queued responses and records requests.
///
/// Each call pops the next scripted response; an empty script is reported
/// as a transport error.
pub struct ScriptedService<Req, Resp> {
    name: String,
    availability: Availability,
    responses: Mutex<VecDeque<Result<Resp, String>>>,
    requests: Mutex<Vec<Req>>,
    probes: AtomicUsize,
}

impl<Req, Resp> ScriptedService<Req, Resp> {
    /// Creates an always-available service with an empty script.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            availability: Availability::Always,
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            probes: AtomicUsize::new(0),
        }
    }

    /// Makes the service never available.
    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.availability = Availability::Never;
        self
    }

    /// Makes the first `probes` availability checks fail.
    #[must_use]
    pub fn available_after_probes(mut self, probes: usize) -> Self {
        self.availability = Availability::AfterProbes(probes);
        self
    }

    /// Queues a successful response.
    pub fn push_ok(&self, response: Resp) {
        self.responses.lock().push_back(Ok(response));
    }

    /// Queues a transport failure.
    pub fn push_err(&self, cause: impl Into<String>) {
        self.responses.lock().push_back(Err(cause.into()));
    }

    /// Number of calls actually issued.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Number of availability probes seen.
    #[must_use]
    pub fn availability_probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    /// Responses still queued.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.responses.lock().len()
    }
}

impl<Req: Clone, Resp> ScriptedService<Req, Resp> {
    /// Requests received so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<Req> {
        self.requests.lock().clone()
    }
}

impl<Req, Resp> fmt::Debug for ScriptedService<Req, Resp> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedService")
            .field("name", &self.name)
            .field("availability", &self.availability)
            .field("calls", &self.requests.lock().len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<Req, Resp> ServiceClient for ScriptedService<Req, Resp>
where
    Req: Send + Sync + 'static,
    Resp: Send + 'static,
{
    type Request = Req;
    type Response = Resp;

    fn name(&self) -> &str {
        &self.name
    }

    async fn is_available(&self) -> bool {
        let seen = self.probes.fetch_add(1, Ordering::SeqCst);
        match self.availability {
            Availability::Always => true,
            Availability::Never => false,
            Availability::AfterProbes(n) => seen >= n,
        }
    }

    async fn call(&self, request: Req) -> anyhow::Result<Resp> {
        self.requests.lock().push(request);
        let next = self.responses.lock().pop_front();
        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(cause)) => Err(anyhow::anyhow!(cause)),
            None => Err(anyhow::anyhow!("no scripted response left for '{}'", self.name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order() {
        let svc: ScriptedService<&str, u8> = ScriptedService::new("/svc");
        svc.push_ok(1);
        svc.push_err("boom");

        assert_eq!(svc.call("a").await.unwrap(), 1);
        assert!(svc.call("b").await.is_err());
        assert!(svc.call("c").await.is_err());
        assert_eq!(svc.requests(), vec!["a", "b", "c"]);
        assert_eq!(svc.remaining(), 0);
    }

    #[tokio::test]
    async fn test_available_after_probes() {
        let svc: ScriptedService<(), ()> = ScriptedService::new("/svc").available_after_probes(2);

        assert!(!svc.is_available().await);
        assert!(!svc.is_available().await);
        assert!(svc.is_available().await);
        assert_eq!(svc.availability_probes(), 3);
    }
}
