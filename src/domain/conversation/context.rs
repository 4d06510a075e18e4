//! Context window management for model invocations.
//!
//! The window is always: system instructions, then the running summary (if
//! any), then the raw messages the summary does not cover. When the window
//! crosses the high-water mark, everything older than the last K raw
//! messages is collapsed into a new summary. If no summary can be produced,
//! the oldest raw messages are dropped instead; collected facts live in the
//! draft, which the system instructions always carry.

use thiserror::Error;

use super::message::{estimate_tokens, ConversationMessage, Role};
use super::summary::ContextSummary;

/// Token budget for a single invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget {
    /// Maximum tokens for context (messages + system prompt).
    pub max_context_tokens: u32,
    /// Tokens reserved for the model's reply.
    pub reserved_for_response: u32,
}

impl TokenBudget {
    pub fn new(max_context_tokens: u32, reserved_for_response: u32) -> Self {
        Self {
            max_context_tokens,
            reserved_for_response,
        }
    }

    /// Returns the available tokens for messages (context minus reserved).
    pub fn available_for_messages(&self) -> u32 {
        self.max_context_tokens.saturating_sub(self.reserved_for_response)
    }
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self::new(8_000, 1_000)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextConfig {
    pub budget: TokenBudget,
    /// Fraction of the available budget that triggers summarization.
    pub high_water_ratio: f32,
    /// Most recent raw messages always kept verbatim.
    pub retained_messages: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            budget: TokenBudget::default(),
            high_water_ratio: 0.9,
            retained_messages: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("context needs {required} tokens but only {available} are available")]
pub struct ContextOverflowError {
    pub required: u32,
    pub available: u32,
}

/// Messages ready to send, oldest first.
#[derive(Debug, Clone)]
pub struct ContextWindow {
    pub messages: Vec<ConversationMessage>,
    pub estimated_tokens: u32,
    /// Raw messages dropped by hard truncation.
    pub dropped: usize,
}

impl ContextWindow {
    pub fn was_truncated(&self) -> bool {
        self.dropped > 0
    }
}

/// Slice of history a new summary should absorb.
#[derive(Debug, Clone, Copy)]
pub struct CompactionPlan<'a> {
    pub messages: &'a [ConversationMessage],
    pub covers_through: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ContextWindowManager {
    config: ContextConfig,
}

impl ContextWindowManager {
    pub fn new(config: ContextConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Builds the full window without dropping anything.
    pub fn assemble(
        &self,
        system_prompt: &str,
        history: &[ConversationMessage],
        summary: Option<&ContextSummary>,
    ) -> ContextWindow {
        let raw = uncovered(history, summary);
        self.window(system_prompt, summary, raw, 0)
    }

    pub fn over_high_water(&self, window: &ContextWindow) -> bool {
        let limit = self.config.budget.available_for_messages() as f32 * self.config.high_water_ratio;
        window.estimated_tokens as f32 > limit
    }

    pub fn fits(&self, window: &ContextWindow) -> bool {
        window.estimated_tokens <= self.config.budget.available_for_messages()
    }

    /// Returns the uncovered messages older than the retained window, or
    /// `None` when there is nothing to collapse.
    ///
    /// The boundary never splits an assistant tool request from its results.
    pub fn plan_compaction<'a>(
        &self,
        history: &'a [ConversationMessage],
        summary: Option<&ContextSummary>,
    ) -> Option<CompactionPlan<'a>> {
        let raw = uncovered(history, summary);
        if raw.len() <= self.config.retained_messages {
            return None;
        }
        let mut boundary = raw.len() - self.config.retained_messages;
        while boundary > 0 && raw[boundary].role() == Role::ToolResult {
            boundary -= 1;
        }
        if boundary == 0 {
            return None;
        }
        let messages = &raw[..boundary];
        messages.last().map(|last| CompactionPlan {
            messages,
            covers_through: last.seq(),
        })
    }

    /// Drops the oldest raw messages until the window fits. Tries to keep
    /// the summary first, then gives it up. The newest message is never
    /// dropped; if it alone does not fit, the window cannot be built.
    pub fn truncate(
        &self,
        system_prompt: &str,
        history: &[ConversationMessage],
        summary: Option<&ContextSummary>,
    ) -> Result<ContextWindow, ContextOverflowError> {
        let raw = uncovered(history, summary);
        let available = self.config.budget.available_for_messages();

        let mut attempts = vec![summary];
        if summary.is_some() {
            attempts.push(None);
        }
        let mut smallest = u32::MAX;
        for kept_summary in attempts {
            let mut start = 0;
            loop {
                while start < raw.len().saturating_sub(1) && raw[start].role() == Role::ToolResult {
                    start += 1;
                }
                let window = self.window(system_prompt, kept_summary, &raw[start..], start);
                if window.estimated_tokens <= available {
                    return Ok(window);
                }
                smallest = smallest.min(window.estimated_tokens);
                if start + 1 >= raw.len() {
                    break;
                }
                start += 1;
            }
        }
        Err(ContextOverflowError {
            required: smallest,
            available,
        })
    }

    fn window(
        &self,
        system_prompt: &str,
        summary: Option<&ContextSummary>,
        raw: &[ConversationMessage],
        dropped: usize,
    ) -> ContextWindow {
        let mut messages = Vec::with_capacity(raw.len() + 2);
        messages.push(ConversationMessage::system(0, system_prompt));
        if let Some(summary) = summary {
            messages.push(ConversationMessage::system(summary.covers_through(), summary.text()));
        }
        messages.extend(raw.iter().cloned());
        let estimated_tokens = estimate_tokens(system_prompt)
            + messages.iter().skip(1).map(ConversationMessage::estimate_tokens).sum::<u32>();
        ContextWindow {
            messages,
            estimated_tokens,
            dropped,
        }
    }
}

fn uncovered<'a>(history: &'a [ConversationMessage], summary: Option<&ContextSummary>) -> &'a [ConversationMessage] {
    let Some(summary) = summary else {
        return history;
    };
    let first = history
        .iter()
        .position(|message| message.seq() > summary.covers_through())
        .unwrap_or(history.len());
    &history[first..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::{ConstraintLedger, FactSheet};
    use crate::domain::foundation::ToolCallId;
    use crate::domain::project::ProjectDraft;
    use crate::domain::tools::ToolCall;

    fn history(count: u64, chars: usize) -> Vec<ConversationMessage> {
        (1..=count)
            .map(|seq| {
                if seq % 2 == 1 {
                    ConversationMessage::user(seq, "u".repeat(chars))
                } else {
                    ConversationMessage::assistant(seq, "a".repeat(chars))
                }
            })
            .collect()
    }

    fn manager(max: u32, retained: usize) -> ContextWindowManager {
        ContextWindowManager::new(ContextConfig {
            budget: TokenBudget::new(max, 0),
            high_water_ratio: 0.9,
            retained_messages: retained,
        })
    }

    fn summary(covers_through: u64) -> ContextSummary {
        let facts = FactSheet::capture(&ProjectDraft::new(), &ConstraintLedger::new());
        ContextSummary::compose(covers_through, &facts, None)
    }

    mod budget {
        use super::*;

        #[test]
        fn available_for_messages_subtracts_reserved() {
            assert_eq!(TokenBudget::new(16_000, 2_000).available_for_messages(), 14_000);
        }

        #[test]
        fn available_for_messages_handles_underflow() {
            assert_eq!(TokenBudget::new(1_000, 2_000).available_for_messages(), 0);
        }
    }

    mod assembly {
        use super::*;

        #[test]
        fn system_prompt_comes_first() {
            let window = manager(10_000, 4).assemble("instructions", &history(3, 10), None);
            assert_eq!(window.messages[0].role(), Role::System);
            assert_eq!(window.messages[0].content(), "instructions");
            assert_eq!(window.messages.len(), 4);
        }

        #[test]
        fn summary_replaces_covered_messages() {
            let history = history(6, 10);
            let window = manager(10_000, 2).assemble("sys", &history, Some(&summary(4)));
            assert_eq!(window.messages.len(), 4);
            assert!(window.messages[1].content().starts_with(ContextSummary::HEADER));
            assert_eq!(window.messages[2].seq(), 5);
        }

        #[test]
        fn high_water_mark_is_a_fraction_of_budget() {
            let mgr = manager(1_000, 2);
            let small = mgr.assemble("sys", &history(2, 40), None);
            let large = mgr.assemble("sys", &history(20, 200), None);
            assert!(!mgr.over_high_water(&small));
            assert!(mgr.over_high_water(&large));
        }
    }

    mod compaction {
        use super::*;

        #[test]
        fn plan_collapses_everything_older_than_retained_window() {
            let history = history(10, 10);
            let plan = manager(1_000, 4).plan_compaction(&history, None).unwrap();
            assert_eq!(plan.messages.len(), 6);
            assert_eq!(plan.covers_through, 6);
        }

        #[test]
        fn nothing_to_plan_when_history_is_short() {
            let history = history(3, 10);
            assert!(manager(1_000, 4).plan_compaction(&history, None).is_none());
        }

        #[test]
        fn plan_only_considers_uncovered_messages() {
            let history = history(10, 10);
            let plan = manager(1_000, 2).plan_compaction(&history, Some(&summary(6))).unwrap();
            assert_eq!(plan.messages.first().unwrap().seq(), 7);
            assert_eq!(plan.covers_through, 8);
        }

        #[test]
        fn plan_keeps_tool_results_with_their_request() {
            let call_id = ToolCallId::new("call_1").unwrap();
            let call = ToolCall::new(call_id.clone(), "list_missing_fields", serde_json::json!({}));
            let history = vec![
                ConversationMessage::user(1, "hi"),
                ConversationMessage::assistant(2, "hello"),
                ConversationMessage::assistant_tool_calls(3, "", vec![call]),
                ConversationMessage::tool_result(4, call_id, "{}"),
                ConversationMessage::assistant(5, "done"),
            ];
            let plan = manager(1_000, 2).plan_compaction(&history, None).unwrap();
            assert_eq!(plan.covers_through, 2);
        }
    }

    mod truncation {
        use super::*;

        #[test]
        fn drops_oldest_until_it_fits() {
            let history = history(10, 400);
            let window = manager(450, 2).truncate("sys", &history, None).unwrap();
            assert!(window.was_truncated());
            assert!(window.estimated_tokens <= 450);
            assert_eq!(window.messages.last().unwrap().seq(), 10);
        }

        #[test]
        fn gives_up_summary_before_failing() {
            let history = history(2, 400);
            let big = ContextSummary::compose(
                0,
                &FactSheet::capture(&ProjectDraft::new(), &ConstraintLedger::new()),
                Some(&"n".repeat(4_000)),
            );
            let window = manager(150, 2).truncate("sys", &history, Some(&big)).unwrap();
            assert!(window.messages.iter().all(|m| !m.content().starts_with(ContextSummary::HEADER)));
        }

        #[test]
        fn oversized_latest_message_overflows() {
            let history = vec![ConversationMessage::user(1, "x".repeat(8_000))];
            let err = manager(500, 2).truncate("sys", &history, None).unwrap_err();
            assert_eq!(err.available, 500);
            assert!(err.required > 500);
        }
    }
}
