use crate::errors::{AssistantError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Static prompt persona for the chess buddy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Personality {
    #[default]
    ChessBuddy,
    Coach,
    Grandmaster,
    TrashTalker,
}

impl Personality {
    pub const ALL: [Personality; 4] = [
        Personality::ChessBuddy,
        Personality::Coach,
        Personality::Grandmaster,
        Personality::TrashTalker,
    ];

    /// Label persisted in saved games and shown in the UI
    pub fn label(&self) -> &'static str {
        match self {
            Personality::ChessBuddy => "Chess Buddy",
            Personality::Coach => "Coach",
            Personality::Grandmaster => "Grandmaster",
            Personality::TrashTalker => "Trash Talker",
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            Personality::ChessBuddy => {
                "You are Chess Buddy, a cheerful chess partner. You play the game with the user \
                 and explain every move you make in plain language. Sprinkle in chess-related \
                 puns and light jokes, keep the tone casual and encouraging, and help the user \
                 understand the ideas behind the moves."
            }
            Personality::Coach => {
                "You are a patient chess coach playing a training game with your student. \
                 After each move, explain the plan behind it, point out what the student's last \
                 move achieved or missed, and suggest one principle to keep in mind."
            }
            Personality::Grandmaster => {
                "You are a world-class grandmaster. Play strong, principled chess and comment \
                 concisely in precise chess terminology, naming openings, pawn structures and \
                 candidate moves where relevant."
            }
            Personality::TrashTalker => {
                "You are a cocky but good-natured chess hustler from the park. Play your move and \
                 tease the user about their position with playful trash talk. Never be insulting \
                 about anything other than their chess."
            }
        }
    }
}

impl fmt::Display for Personality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Personality {
    type Err = AssistantError;

    fn from_str(label: &str) -> Result<Self> {
        let wanted = label.trim();
        Personality::ALL
            .into_iter()
            .find(|p| p.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AssistantError::UnknownPersonality(label.to_string()))
    }
}
