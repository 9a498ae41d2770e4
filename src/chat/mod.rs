//! Chat panel state: message log, input buffer, and the sample questions
//! suggested from the loaded data's columns.

pub mod openai;

use crate::import::TabularData;

/// Records included in the prompt context.
pub const CONTEXT_RECORD_LIMIT: usize = 50;
const SAMPLE_QUESTION_LIMIT: usize = 8;

const QUESTION_TEMPLATES: [&str; 5] = [
    "What is the average {col}?",
    "Show the sum of {col} by category.",
    "List all unique values in {col}.",
    "What is the maximum {col}?",
    "What is the minimum {col}?",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Outcome of one ask round-trip, delivered back over the app channel.
#[derive(Debug, Clone)]
pub enum ChatOutcome {
    Answer { content: String, tokens: u64 },
    Failed(String),
}

#[derive(Debug, Default)]
pub struct ChatPanel {
    pub messages: Vec<ChatMessage>,
    pub input: String,
    pub waiting: bool,
    pub sample_questions: Vec<String>,
    /// Highlighted sample question, insertable with Enter on empty input.
    pub question_cursor: usize,
}

impl ChatPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage { role: Role::User, content: content.into() });
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage { role: Role::Assistant, content: content.into() });
    }

    /// Resolve a finished round-trip. Last write wins; there is at most
    /// one request in flight.
    pub fn resolve(&mut self, outcome: &ChatOutcome) {
        self.waiting = false;
        match outcome {
            ChatOutcome::Answer { content, .. } => self.push_assistant(content.clone()),
            ChatOutcome::Failed(reason) => {
                self.push_assistant(format!("Error fetching response: {reason}"))
            }
        }
    }

    /// Rebuild the suggested questions from the current data's columns.
    pub fn refresh_sample_questions(&mut self, data: Option<&TabularData>) {
        self.sample_questions.clear();
        self.question_cursor = 0;
        let Some(data) = data else {
            return;
        };
        'outer: for column in &data.columns {
            for template in QUESTION_TEMPLATES {
                if self.sample_questions.len() >= SAMPLE_QUESTION_LIMIT {
                    break 'outer;
                }
                self.sample_questions.push(template.replace("{col}", column));
            }
        }
    }

    pub fn question_up(&mut self) {
        if !self.sample_questions.is_empty() {
            self.question_cursor = self
                .question_cursor
                .checked_sub(1)
                .unwrap_or(self.sample_questions.len() - 1);
        }
    }

    pub fn question_down(&mut self) {
        if !self.sample_questions.is_empty() {
            self.question_cursor = (self.question_cursor + 1) % self.sample_questions.len();
        }
    }

    /// Copy the highlighted sample question into the input buffer.
    pub fn take_sample_question(&mut self) -> bool {
        match self.sample_questions.get(self.question_cursor) {
            Some(q) => {
                self.input = q.clone();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::parse_csv;

    #[test]
    fn sample_questions_come_from_columns_capped_at_eight() {
        let data = parse_csv("price,qty\n1,2\n").unwrap();
        let mut panel = ChatPanel::new();
        panel.refresh_sample_questions(Some(&data));
        assert_eq!(panel.sample_questions.len(), 8);
        assert_eq!(panel.sample_questions[0], "What is the average price?");
        // second column contributes the remainder
        assert!(panel.sample_questions[5].contains("qty"));
    }

    #[test]
    fn no_data_means_no_suggestions() {
        let mut panel = ChatPanel::new();
        panel.sample_questions = vec!["stale".into()];
        panel.refresh_sample_questions(None);
        assert!(panel.sample_questions.is_empty());
    }

    #[test]
    fn resolve_appends_assistant_reply_and_clears_waiting() {
        let mut panel = ChatPanel::new();
        panel.push_user("what is the max?");
        panel.waiting = true;
        panel.resolve(&ChatOutcome::Answer { content: "42".into(), tokens: 10 });
        assert!(!panel.waiting);
        assert_eq!(panel.messages.last().unwrap().role, Role::Assistant);
        assert_eq!(panel.messages.last().unwrap().content, "42");
    }

    #[test]
    fn failures_surface_as_assistant_text() {
        let mut panel = ChatPanel::new();
        panel.waiting = true;
        panel.resolve(&ChatOutcome::Failed("timeout".into()));
        assert!(panel.messages.last().unwrap().content.contains("timeout"));
    }

    #[test]
    fn question_cursor_wraps() {
        let mut panel = ChatPanel::new();
        panel.sample_questions = vec!["a".into(), "b".into()];
        panel.question_up();
        assert_eq!(panel.question_cursor, 1);
        panel.question_down();
        assert_eq!(panel.question_cursor, 0);
        assert!(panel.take_sample_question());
        assert_eq!(panel.input, "a");
    }
}
