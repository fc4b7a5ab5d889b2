//! Async runner driving the requester state machine.
//!
//! ```text
//! RequesterClient ──commands──►┐
//!                              │   ┌──────────────────────┐
//! transport handler ──events──►├──►│   RequesterState     │──► actions
//! timers ────────────events──►─┘   └──────────────────────┘      │
//!                                                                 ▼
//!                           publish / subscribe / set timer / answer callers
//! ```
//!
//! Exactly one task owns the state machine, so protocol state needs no locks.

use crate::network::codec;
use crate::network::{MessageHandler, Transport};
use crate::RequesterSnapshot;
use rocon_core::{Action, Event, StateMachine, Ticket, TimerId};
use rocon_requester::RequesterState;
use rocon_types::{AllocationOutcome, Identifier, Priority, ReleaseOutcome, RequestError, Resource};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

pub(crate) type Reply<T> = oneshot::Sender<Result<T, RequestError>>;

/// Requests from client handles to the runner.
pub(crate) enum Command {
    Submit {
        ticket: Ticket,
        resources: Vec<Resource>,
        priority: Priority,
        hold_time: Duration,
        reply: Reply<Identifier>,
    },
    AwaitOutcome {
        ticket: Ticket,
        request_id: Identifier,
        reply: Reply<AllocationOutcome>,
    },
    Release {
        ticket: Ticket,
        request_id: Identifier,
        reply: Reply<ReleaseOutcome>,
    },
    CancelAll,
    Abandon {
        ticket: Ticket,
    },
    Snapshot {
        reply: oneshot::Sender<RequesterSnapshot>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

pub(crate) struct RequesterRunner {
    state: RequesterState,
    transport: Arc<dyn Transport>,
    commands: mpsc::UnboundedReceiver<Command>,
    event_tx: mpsc::UnboundedSender<Event>,
    event_rx: mpsc::UnboundedReceiver<Event>,
    timers: HashMap<TimerId, JoinHandle<()>>,
    submitted: HashMap<Ticket, Reply<Identifier>>,
    outcomes: HashMap<Ticket, Reply<AllocationOutcome>>,
    releases: HashMap<Ticket, Reply<ReleaseOutcome>>,
    started_at: Instant,
}

impl RequesterRunner {
    pub(crate) fn new(
        state: RequesterState,
        transport: Arc<dyn Transport>,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            state,
            transport,
            commands,
            event_tx,
            event_rx,
            timers: HashMap::new(),
            submitted: HashMap::new(),
            outcomes: HashMap::new(),
            releases: HashMap::new(),
            started_at: Instant::now(),
        }
    }

    /// Run until shut down or every client handle is dropped.
    pub(crate) async fn run(mut self) {
        self.dispatch(Event::Started).await;

        loop {
            // Events first, so feedback already queued is merged before a
            // caller command observes the state.
            tokio::select! {
                biased;
                Some(event) = self.event_rx.recv() => self.dispatch(event).await,
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        self.dispatch(Event::CancelAllRequested).await;
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.on_command(command).await,
                    None => {
                        debug!("All client handles dropped");
                        break;
                    }
                },
            }
        }

        info!(requester = %self.state.requester_id(), "Requester runner stopped");
    }

    async fn on_command(&mut self, command: Command) {
        let event = match command {
            Command::Submit {
                ticket,
                resources,
                priority,
                hold_time,
                reply,
            } => {
                self.submitted.insert(ticket, reply);
                Event::AllocationRequested {
                    ticket,
                    resources,
                    priority,
                    hold_time,
                }
            }
            Command::AwaitOutcome {
                ticket,
                request_id,
                reply,
            } => {
                self.outcomes.insert(ticket, reply);
                Event::AllocationOutcomeAwaited { ticket, request_id }
            }
            Command::Release {
                ticket,
                request_id,
                reply,
            } => {
                self.releases.insert(ticket, reply);
                Event::ReleaseRequested { ticket, request_id }
            }
            Command::CancelAll => Event::CancelAllRequested,
            Command::Abandon { ticket } => {
                self.outcomes.remove(&ticket);
                self.releases.remove(&ticket);
                Event::WaitAbandoned { ticket }
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(RequesterSnapshot {
                    requests: self.state.requests().snapshot(),
                    pending: self.state.pending().clone(),
                    allocated: self.state.allocated().clone(),
                });
                return;
            }
            // Handled by the run loop
            Command::Shutdown { reply } => {
                let _ = reply.send(());
                return;
            }
        };
        self.dispatch(event).await;
    }

    async fn dispatch(&mut self, event: Event) {
        self.state.set_time(self.started_at.elapsed());
        let event_name = event.type_name();
        let actions = self.state.handle(event);
        debug!(event = event_name, actions = actions.len(), "Handled event");

        for action in actions {
            self.execute(action).await;
        }
    }

    async fn execute(&mut self, action: Action) {
        match action {
            Action::Subscribe {
                channel,
                message_type,
            } => {
                let event_tx = self.event_tx.clone();
                let handler: MessageHandler =
                    Box::new(move |payload: Value| match codec::decode_feedback(&payload) {
                        Ok(feedback) => {
                            let _ = event_tx.send(Event::FeedbackReceived { feedback });
                        }
                        Err(e) => warn!(error = %e, "Dropping undecodable feedback"),
                    });
                if let Err(e) = self
                    .transport
                    .subscribe(&channel, message_type, handler)
                    .await
                {
                    error!(%channel, error = %e, "Feedback subscription failed");
                }
            }

            Action::Publish { channel, message } => {
                let payload = match codec::encode_message(&message) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(
                            message = message.type_name(),
                            error = %e,
                            "Failed to encode message"
                        );
                        return;
                    }
                };
                if let Err(e) = self
                    .transport
                    .publish(&channel, message.message_type_id(), payload)
                    .await
                {
                    warn!(%channel, error = %e, "Publish failed");
                }
            }

            Action::SetTimer { id, duration } => {
                if let Some(previous) = self.timers.remove(&id) {
                    previous.abort();
                }
                let event_tx = self.event_tx.clone();
                let handle = tokio::spawn(async move {
                    tokio::time::sleep(duration).await;
                    let _ = event_tx.send(timer_event(id));
                });
                self.timers.insert(id, handle);
            }

            Action::EmitAllocationSubmitted { ticket, result } => {
                if let Some(reply) = self.submitted.remove(&ticket) {
                    let _ = reply.send(result);
                }
            }

            Action::EmitAllocationOutcome { ticket, result } => {
                if let Some(reply) = self.outcomes.remove(&ticket) {
                    let _ = reply.send(result);
                }
            }

            Action::EmitReleaseOutcome { ticket, result } => {
                if let Some(reply) = self.releases.remove(&ticket) {
                    let _ = reply.send(result);
                }
            }
        }
    }
}

impl Drop for RequesterRunner {
    fn drop(&mut self) {
        for (_, timer) in self.timers.drain() {
            timer.abort();
        }
    }
}

fn timer_event(id: TimerId) -> Event {
    match id {
        TimerId::Heartbeat => Event::HeartbeatTimer,
        TimerId::StatusCheck => Event::StatusCheckTimer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::TransportError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rocon_requester::RequesterConfig;
    use rocon_types::Identifier;
    use serde_json::json;
    use tracing_test::traced_test;

    #[derive(Default)]
    struct CapturingTransport {
        handlers: Mutex<HashMap<String, MessageHandler>>,
    }

    #[async_trait]
    impl Transport for CapturingTransport {
        async fn publish(
            &self,
            _channel: &str,
            _message_type: &str,
            _payload: Value,
        ) -> Result<(), TransportError> {
            Ok(())
        }

        async fn subscribe(
            &self,
            channel: &str,
            _message_type: &str,
            handler: MessageHandler,
        ) -> Result<(), TransportError> {
            self.handlers.lock().insert(channel.to_string(), handler);
            Ok(())
        }
    }

    #[traced_test]
    #[tokio::test]
    async fn test_undecodable_feedback_is_dropped() {
        let transport = Arc::new(CapturingTransport::default());
        let state = RequesterState::new(RequesterConfig::default());
        let topic = state.feedback_topic();
        let (_commands, command_rx) = mpsc::unbounded_channel();
        let mut runner = RequesterRunner::new(state, transport.clone(), command_rx);
        runner.dispatch(Event::Started).await;

        {
            let handlers = transport.handlers.lock();
            let handler = handlers.get(&topic).unwrap();
            handler(json!({"requests": "nope"}));
            handler(json!({
                "requests": [{"id": {"uuid": Identifier::new().to_base64()}, "status": 9}]
            }));
        }

        assert!(logs_contain("Dropping undecodable feedback"));
        assert!(runner.event_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_feedback_is_queued_as_event() {
        let transport = Arc::new(CapturingTransport::default());
        let state = RequesterState::new(RequesterConfig::default());
        let topic = state.feedback_topic();
        let (_commands, command_rx) = mpsc::unbounded_channel();
        let mut runner = RequesterRunner::new(state, transport.clone(), command_rx);
        runner.dispatch(Event::Started).await;

        let id = Identifier::new();
        {
            let handlers = transport.handlers.lock();
            handlers.get(&topic).unwrap()(json!({
                "requests": [{"id": {"uuid": id.to_base64()}, "status": 3}]
            }));
        }

        match runner.event_rx.try_recv() {
            Ok(Event::FeedbackReceived { feedback }) => {
                assert_eq!(feedback.requests[0].id, id);
            }
            other => panic!("expected feedback event, got {other:?}"),
        }
    }
}
