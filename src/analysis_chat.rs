use crate::llm::ChatMessage;
use crate::query::{GameSearch, SearchMode};

/// Example questions offered next to the analysis chat
pub const EXAMPLE_QUERIES: [&str; 5] = [
    "Show me Shabalov's best games as White",
    "What are some interesting games from the World Senior Championships?",
    "Find games with brilliant tactical combinations",
    "Show games where underdogs defeated higher-rated players",
    "What are some notable games in the Sicilian Defense?",
];

pub const ANALYSIS_RESULTS: usize = 3;

/// Player-analysis conversation
#[derive(Debug, Clone, Default)]
pub struct AnalysisChat {
    messages: Vec<ChatMessage>,
    last_input: Option<String>,
}

impl AnalysisChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Search and record the answer. Returns false when `query` repeats the
    /// previous typed input and was ignored. Failures are recorded as the
    /// assistant's answer.
    pub async fn ask(&mut self, search: &GameSearch, query: &str, from_input: bool) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return false;
        }
        if from_input {
            if self.last_input.as_deref() == Some(query) {
                return false;
            }
            self.last_input = Some(query.to_string());
        }

        self.messages.push(ChatMessage::user(query));
        let answer = match search
            .search_games(query, ANALYSIS_RESULTS, None, SearchMode::Conversational)
            .await
        {
            Ok(outcome) => outcome.into_text(),
            Err(e) => {
                log::warn!("Analysis query failed: {}", e);
                e.to_string()
            }
        };
        self.messages.push(ChatMessage::assistant(answer));
        true
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.last_input = None;
    }
}
