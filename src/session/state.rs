//! Turn-taking state for a live session

use std::sync::Mutex;

use tokio::sync::mpsc;

use super::Outbound;

/// Where the agent is in the conversational turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    /// Accepting caller audio
    Listening,
    /// An utterance has finalized; the reply is being generated
    Thinking,
    /// Reply audio is streaming back to the caller
    Speaking,
}

impl AgentState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Listening => "listening",
            Self::Thinking => "thinking",
            Self::Speaking => "speaking",
        }
    }
}

/// Shared state holder that notifies the client on every transition
///
/// Notification is fire-and-forget: a full or closed outbound queue never
/// blocks the pipeline, the transition still takes effect locally.
pub struct StateCell {
    state: Mutex<AgentState>,
    outbound: mpsc::Sender<Outbound>,
}

impl StateCell {
    #[must_use]
    pub fn new(outbound: mpsc::Sender<Outbound>) -> Self {
        Self {
            state: Mutex::new(AgentState::Listening),
            outbound,
        }
    }

    #[must_use]
    pub fn get(&self) -> AgentState {
        self.state.lock().map_or(AgentState::Listening, |s| *s)
    }

    /// Transition to `next` and notify the client
    ///
    /// Setting the current state again is harmless and still re-notifies.
    pub fn set(&self, next: AgentState) {
        let previous = match self.state.lock() {
            Ok(mut state) => std::mem::replace(&mut *state, next),
            Err(_) => return,
        };

        tracing::debug!(from = previous.as_str(), to = next.as_str(), "state change");
        let notification = serde_json::json!({
            "type": "state_change",
            "state": next.as_str(),
        });
        let _ = self.outbound.try_send(Outbound::Text(notification.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_of(frame: Outbound) -> String {
        let Outbound::Text(json) = frame else {
            panic!("expected text frame");
        };
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["type"], "state_change");
        v["state"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn set_notifies_every_call_including_same_state() {
        let (tx, mut rx) = mpsc::channel(8);
        let cell = StateCell::new(tx);

        cell.set(AgentState::Thinking);
        cell.set(AgentState::Thinking);
        cell.set(AgentState::Speaking);

        assert_eq!(state_of(rx.recv().await.unwrap()), "thinking");
        assert_eq!(state_of(rx.recv().await.unwrap()), "thinking");
        assert_eq!(state_of(rx.recv().await.unwrap()), "speaking");
        assert!(rx.try_recv().is_err());
        assert_eq!(cell.get(), AgentState::Speaking);
    }

    #[tokio::test]
    async fn full_queue_does_not_block_transition() {
        let (tx, _rx) = mpsc::channel(1);
        let cell = StateCell::new(tx.clone());
        let _ = tx.try_send(Outbound::Text("filler".into()));

        cell.set(AgentState::Speaking);
        assert_eq!(cell.get(), AgentState::Speaking);
    }
}
