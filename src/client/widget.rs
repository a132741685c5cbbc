//! The chat widget state machine.
//!
//! Each `submit` appends the user's message right away and spawns one relay
//! call; whichever call finishes appends its reply when it finishes. Calls
//! are never cancelled or de-duplicated, so replies can land out of order
//! when latencies differ.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::transcript::{Message, Transcript};
use super::transport::{RelayReply, RelayTransport, WidgetError};
use crate::relay::RelayRequest;

/// Assistant text when the relay body has no `reply`.
pub const NO_RESPONSE_TEXT: &str = "No response from AI.";
/// Failure description when the error carries no message.
pub const UNKNOWN_ERROR_TEXT: &str = "Unknown error";

/// Change notifications for front-ends.
///
/// Every subscriber sees every event, in the order the widget state changed.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetEvent {
    Appended(Message),
    Loading(bool),
}

#[derive(Debug, Default)]
struct WidgetState {
    transcript: Transcript,
    input: String,
    loading: bool,
    subscribers: Vec<mpsc::UnboundedSender<WidgetEvent>>,
}

impl WidgetState {
    fn append(&mut self, message: Message) {
        self.transcript.push(message.clone());
        self.emit(WidgetEvent::Appended(message));
    }

    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
        self.emit(WidgetEvent::Loading(loading));
    }

    /// Fan out to subscribers, forgetting those whose receiver is gone.
    fn emit(&mut self, event: WidgetEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}

pub struct ChatWidget<T: RelayTransport> {
    transport: Arc<T>,
    state: Arc<Mutex<WidgetState>>,
}

impl<T: RelayTransport> ChatWidget<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            state: Arc::new(Mutex::new(WidgetState::default())),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Replace the pending input line.
    pub fn set_input(&self, input: impl Into<String>) {
        self.state.lock().unwrap().input = input.into();
    }

    pub fn input(&self) -> String {
        self.state.lock().unwrap().input.clone()
    }

    /// Snapshot of the transcript.
    pub fn transcript(&self) -> Transcript {
        self.state.lock().unwrap().transcript.clone()
    }

    /// True from a submit until the most recent settlement. Not a counter.
    pub fn is_loading(&self) -> bool {
        self.state.lock().unwrap().loading
    }

    /// Receive every event from now on.
    ///
    /// The channel is unbounded so a slow reader never misses a message. It
    /// closes once the widget and all of its in-flight calls are gone.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<WidgetEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.lock().unwrap().subscribers.push(tx);
        rx
    }

    /// Submit the current input.
    ///
    /// Blank input is a no-op and returns `None`. Otherwise the user message
    /// is appended, the input cleared and loading set before this returns;
    /// the relay call runs on a spawned task whose handle is returned.
    /// Must be called from within a tokio runtime.
    pub fn submit(&self) -> Option<JoinHandle<()>> {
        let message = {
            let mut state = self.state.lock().unwrap();
            if state.input.trim().is_empty() {
                return None;
            }

            let message = std::mem::take(&mut state.input);
            state.append(Message::user(message.clone()));
            state.set_loading(true);
            message
        };

        let transport = Arc::clone(&self.transport);
        let state = Arc::clone(&self.state);

        Some(tokio::spawn(async move {
            let outcome = transport.send(RelayRequest::new(message)).await;
            let reply = Message::assistant(render_outcome(outcome));

            let mut state = state.lock().unwrap();
            state.append(reply);
            state.set_loading(false);
        }))
    }
}

/// Turn a relay outcome into assistant text.
fn render_outcome(outcome: Result<RelayReply, WidgetError>) -> String {
    match outcome {
        Ok(body) => body
            .reply
            .filter(|reply| !reply.is_empty())
            .unwrap_or_else(|| NO_RESPONSE_TEXT.to_string()),
        Err(err) => {
            tracing::warn!(error = %err, "Relay call failed");
            format!("Error: {}", describe(&err))
        }
    }
}

fn describe(err: &WidgetError) -> String {
    let message = err.to_string();
    if message.is_empty() {
        UNKNOWN_ERROR_TEXT.to_string()
    } else {
        message
    }
}
