//! Token-budgeted chat history

use serde::{Deserialize, Serialize};

/// Speaker of a chat turn, serialized with chat-completions role names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message in the running conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Rough token estimate, about four characters per token
    #[must_use]
    pub fn estimate_tokens(&self) -> usize {
        self.content.len() / 4
    }
}

/// Conversation log with a fixed system prompt and a trimming view
///
/// Turns accumulate for the life of the session. Trimming happens per LLM
/// request, never destructively.
pub struct ChatHistory {
    system: ChatTurn,
    turns: Vec<ChatTurn>,
}

impl ChatHistory {
    #[must_use]
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system: ChatTurn::system(system_prompt),
            turns: Vec::new(),
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(ChatTurn::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(ChatTurn::assistant(content));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Request view: system prompt plus the newest turns that fit `budget`
    ///
    /// Walks newest to oldest accepting whole turns, stopping at the first
    /// turn that would overflow the budget. The system prompt is always
    /// included and not counted against the budget.
    #[must_use]
    pub fn trimmed(&self, budget: usize) -> Vec<ChatTurn> {
        let mut kept: Vec<&ChatTurn> = Vec::new();
        let mut used = 0_usize;
        for turn in self.turns.iter().rev() {
            let cost = turn.estimate_tokens();
            if used + cost > budget {
                break;
            }
            used += cost;
            kept.push(turn);
        }

        let mut out = Vec::with_capacity(kept.len() + 1);
        out.push(self.system.clone());
        out.extend(kept.into_iter().rev().cloned());
        out
    }
}
