//! Caller-facing handle to a running requester.

use crate::network::Transport;
use crate::runner::{Command, RequesterRunner};
use crate::ClientError;
use rocon_core::Ticket;
use rocon_requester::{RequesterConfig, RequesterState};
use rocon_types::{
    AllocationOutcome, Identifier, Priority, ReleaseOutcome, RequestError, RequestSet, Resource,
};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Point-in-time copy of the requester's bookkeeping.
#[derive(Debug, Clone)]
pub struct RequesterSnapshot {
    pub requests: RequestSet,
    pub pending: BTreeSet<Identifier>,
    pub allocated: BTreeSet<Identifier>,
}

/// Handle for submitting and tracking resource requests.
///
/// Cheap to clone. The runner task stops on [`shutdown`](Self::shutdown) or
/// once every handle is dropped.
#[derive(Clone)]
pub struct RequesterClient {
    requester_id: Identifier,
    feedback_topic: String,
    default_priority: Priority,
    outcome_timeout: Option<Duration>,
    commands: mpsc::UnboundedSender<Command>,
    next_ticket: Arc<AtomicU64>,
}

impl RequesterClient {
    /// Spawn a requester with a fresh identity on the current tokio runtime.
    pub fn spawn(transport: Arc<dyn Transport>, config: RequesterConfig) -> Self {
        Self::spawn_with_id(Identifier::new(), transport, config)
    }

    /// Spawn a requester with a known identity.
    pub fn spawn_with_id(
        requester_id: Identifier,
        transport: Arc<dyn Transport>,
        config: RequesterConfig,
    ) -> Self {
        let state = RequesterState::with_id(requester_id, config.clone());
        let feedback_topic = state.feedback_topic();
        let (commands, command_rx) = mpsc::unbounded_channel();

        tokio::spawn(RequesterRunner::new(state, transport, command_rx).run());

        Self {
            requester_id,
            feedback_topic,
            default_priority: config.default_priority,
            outcome_timeout: config.outcome_timeout,
            commands,
            next_ticket: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn requester_id(&self) -> Identifier {
        self.requester_id
    }

    /// Channel the scheduler sends this requester's feedback on.
    pub fn feedback_topic(&self) -> &str {
        &self.feedback_topic
    }

    /// Request a single resource at the default priority.
    ///
    /// Returns as soon as the request is recorded and published.
    pub async fn request_allocation(&self, resource: Resource) -> Result<Identifier, ClientError> {
        self.request_allocation_with(vec![resource], self.default_priority, Duration::ZERO)
            .await
    }

    /// Request several resources as one allocation.
    pub async fn request_allocation_with(
        &self,
        resources: Vec<Resource>,
        priority: Priority,
        hold_time: Duration,
    ) -> Result<Identifier, ClientError> {
        let ticket = self.ticket();
        let (reply, rx) = oneshot::channel();
        self.send(Command::Submit {
            ticket,
            resources,
            priority,
            hold_time,
            reply,
        })?;
        self.wait(ticket, rx, None).await
    }

    /// Wait until the request is granted or closed.
    ///
    /// Uses the configured default timeout, if any.
    pub async fn await_allocation_outcome(
        &self,
        request_id: Identifier,
    ) -> Result<AllocationOutcome, ClientError> {
        self.await_outcome(request_id, self.outcome_timeout).await
    }

    /// Wait at most `timeout` for the request to be granted or closed.
    pub async fn await_allocation_outcome_within(
        &self,
        request_id: Identifier,
        timeout: Duration,
    ) -> Result<AllocationOutcome, ClientError> {
        self.await_outcome(request_id, Some(timeout)).await
    }

    /// Cancel the request and wait for the scheduler to confirm it closed.
    pub async fn release_allocation(
        &self,
        request_id: Identifier,
    ) -> Result<ReleaseOutcome, ClientError> {
        self.release(request_id, self.outcome_timeout).await
    }

    /// Like [`release_allocation`](Self::release_allocation), waiting at most `timeout`.
    pub async fn release_allocation_within(
        &self,
        request_id: Identifier,
        timeout: Duration,
    ) -> Result<ReleaseOutcome, ClientError> {
        self.release(request_id, Some(timeout)).await
    }

    /// Cancel every request. Does not wait for confirmation.
    pub fn cancel_all(&self) -> Result<(), ClientError> {
        self.send(Command::CancelAll)
    }

    /// Copy of the current request set and index sets.
    pub async fn snapshot(&self) -> Result<RequesterSnapshot, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { reply })?;
        rx.await.map_err(|_| ClientError::Shutdown)
    }

    /// Cancel every request and stop the runner.
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Shutdown { reply })?;
        rx.await.map_err(|_| ClientError::Shutdown)
    }

    async fn await_outcome(
        &self,
        request_id: Identifier,
        timeout: Option<Duration>,
    ) -> Result<AllocationOutcome, ClientError> {
        let ticket = self.ticket();
        let (reply, rx) = oneshot::channel();
        self.send(Command::AwaitOutcome {
            ticket,
            request_id,
            reply,
        })?;
        self.wait(ticket, rx, timeout).await
    }

    async fn release(
        &self,
        request_id: Identifier,
        timeout: Option<Duration>,
    ) -> Result<ReleaseOutcome, ClientError> {
        let ticket = self.ticket();
        let (reply, rx) = oneshot::channel();
        self.send(Command::Release {
            ticket,
            request_id,
            reply,
        })?;
        self.wait(ticket, rx, timeout).await
    }

    async fn wait<T>(
        &self,
        ticket: Ticket,
        rx: oneshot::Receiver<Result<T, RequestError>>,
        timeout: Option<Duration>,
    ) -> Result<T, ClientError> {
        let received = match timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(received) => received,
                Err(_) => {
                    let _ = self.send(Command::Abandon { ticket });
                    return Err(ClientError::Timeout(limit));
                }
            },
            None => rx.await,
        };
        Ok(received.map_err(|_| ClientError::Shutdown)??)
    }

    fn ticket(&self) -> Ticket {
        Ticket(self.next_ticket.fetch_add(1, Ordering::Relaxed))
    }

    fn send(&self, command: Command) -> Result<(), ClientError> {
        self.commands.send(command).map_err(|_| ClientError::Shutdown)
    }
}
