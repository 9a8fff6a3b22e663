//! Persisted entities shared between the storage backends and the engine.
//!
//! The wire format keeps the historical camelCase field names so existing
//! player files keep loading unchanged.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Normalize a raw email into the canonical player identity.
///
/// Canonicalization is trimming plus lower-casing; it is applied on every
/// store read and write so the same human always resolves to the same record
/// regardless of input casing or stray whitespace.
pub fn canonical_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// One prompt/answer task inside a level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskEntity {
    /// Reference to the media shown for this round (typically a video URL).
    pub prompt: String,
    /// The known-correct answer the player's input is matched against.
    pub right_answer: String,
    /// Points awarded when the answer is accepted.
    pub factor: u32,
}

/// A single recorded answer, appended exactly once per played round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEntity {
    /// Literal text the player submitted; `None` is the "no answer" sentinel
    /// (serialized as `null`, never as a display string).
    pub user_input: Option<String>,
    /// Whether the input cleared the acceptance threshold.
    pub is_right: bool,
}

/// Aggregate player record persisted by the storage layer, one per canonical
/// email.
///
/// `tasks` is fixed at initialization and defines the total round count;
/// `answers.len()` is the resume cursor for interrupted sessions; `score` is
/// the monotonic sum of awarded factors and is never decremented.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEntity {
    /// Display name captured at registration.
    pub name: String,
    /// Canonical email, the primary key.
    pub email: String,
    /// Ordered task list assigned when the record was initialized.
    pub tasks: Vec<TaskEntity>,
    /// Cumulative score across all recorded answers.
    pub score: u32,
    /// Ordered answer log, one entry per completed round.
    pub answers: Vec<AnswerEntity>,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Last time this record was written.
    pub updated_at: SystemTime,
}

impl PlayerEntity {
    /// Build a fresh record for an identity that has never played.
    pub fn new(name: String, email: String, tasks: Vec<TaskEntity>) -> Self {
        let timestamp = SystemTime::now();
        Self {
            name,
            email,
            tasks,
            score: 0,
            answers: Vec::new(),
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Empty base record used when `save` targets an identity that was never
    /// initialized.
    pub fn empty(email: String) -> Self {
        Self::new(String::new(), email, Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalization_trims_and_lowercases() {
        assert_eq!(canonical_email("  A@B.com "), "a@b.com");
        assert_eq!(canonical_email("a@b.com"), "a@b.com");
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let once = canonical_email("  MiXeD@Case.COM");
        assert_eq!(canonical_email(&once), once);
    }

    #[test]
    fn record_round_trips_through_json() {
        let record = PlayerEntity {
            answers: vec![
                AnswerEntity {
                    user_input: Some("git".into()),
                    is_right: true,
                },
                AnswerEntity {
                    user_input: None,
                    is_right: false,
                },
            ],
            score: 5,
            ..PlayerEntity::new(
                "Al".into(),
                "a@b.com".into(),
                vec![TaskEntity {
                    prompt: "videos/git.mp4".into(),
                    right_answer: "git".into(),
                    factor: 5,
                }],
            )
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"rightAnswer\":\"git\""));
        assert!(json.contains("\"userInput\":null"));

        let decoded: PlayerEntity = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, record);
    }
}
