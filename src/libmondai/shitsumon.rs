use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub media: String,
    pub question: String,
    pub answers: BTreeMap<String, String>,
    pub answer: String,
}

/// A whole uploaded question set, keyed by question id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionSet(pub BTreeMap<String, QuestionRecord>);

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("question set has no questions")]
    Empty,
    #[error("question `{question}` is missing `{field}`")]
    MissingField {
        question: String,
        field: &'static str,
    },
    #[error("question `{question}` marks `{answer}` as correct, but it is not one of its answers")]
    UnknownAnswer { question: String, answer: String },
}

// Every field optional so a missing one is reported by name instead of as a serde error.
#[derive(Debug, Deserialize)]
struct RawRecord {
    media: Option<String>,
    question: Option<String>,
    answers: Option<BTreeMap<String, String>>,
    answer: Option<String>,
}

macro_rules! required {
    ($id:expr, $value:expr, $field:literal) => {
        match $value {
            Some(value) if !value.is_empty() => value,
            _ => {
                return Err(ImportError::MissingField {
                    question: $id.to_string(),
                    field: $field,
                })
            }
        }
    };
}

impl QuestionRecord {
    fn from_raw(id: &str, raw: RawRecord) -> Result<QuestionRecord, ImportError> {
        let media = required!(id, raw.media, "media");
        let question = required!(id, raw.question, "question");
        let answers = required!(id, raw.answers, "answers");
        let answer = required!(id, raw.answer, "answer");

        if !answers.contains_key(&answer) {
            return Err(ImportError::UnknownAnswer {
                question: id.to_string(),
                answer,
            });
        }

        Ok(QuestionRecord {
            media,
            question,
            answers,
            answer,
        })
    }

    pub fn is_correct(&self, answer_id: &str) -> bool {
        self.answer == answer_id
    }
}

impl QuestionSet {
    /// Parses and validates an uploaded question set.
    ///
    /// Every record must carry non-empty `media`, `question`, `answers` and `answer`,
    /// and `answer` has to name one of the record's own answers.
    pub fn parse(text: &str) -> Result<QuestionSet, ImportError> {
        let raw: BTreeMap<String, RawRecord> = serde_json::from_str(text).map_err(|err| {
            error!("[Import] Malformed JSON: {}", err);
            ImportError::Json(err)
        })?;
        if raw.is_empty() {
            error!("[Import] Question set is empty");
            return Err(ImportError::Empty);
        }

        let mut records = BTreeMap::new();
        for (id, record) in raw {
            match QuestionRecord::from_raw(&id, record) {
                Ok(record) => {
                    records.insert(id, record);
                }
                Err(err) => {
                    error!("[Import] Rejected question set: {}", err);
                    return Err(err);
                }
            }
        }
        debug!("[Import] Parsed {} questions", records.len());

        Ok(QuestionSet(records))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_records(self) -> Vec<QuestionRecord> {
        self.0.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_PLUS_TWO: &str = r#"{"q1":{"media":"img.png","question":"2+2?","answers":{"a":"3","b":"4"},"answer":"b"}}"#;

    #[test]
    fn parses_valid_set() {
        let set = QuestionSet::parse(TWO_PLUS_TWO).unwrap();
        assert_eq!(set.len(), 1);
        let record = &set.0["q1"];
        assert_eq!(record.media, "img.png");
        assert_eq!(record.answers.len(), 2);
        assert!(record.is_correct("b"));
        assert!(!record.is_correct("a"));
    }

    #[test]
    fn rejects_empty_object() {
        assert!(matches!(QuestionSet::parse("{}"), Err(ImportError::Empty)));
    }

    #[test]
    fn rejects_broken_json() {
        assert!(matches!(
            QuestionSet::parse("{\"q1\":"),
            Err(ImportError::Json(_))
        ));
    }

    #[test]
    fn names_the_missing_field() {
        let text = r#"{"q1":{"media":"img.png","question":"","answers":{"a":"3"},"answer":"a"}}"#;
        match QuestionSet::parse(text) {
            Err(ImportError::MissingField { question, field }) => {
                assert_eq!(question, "q1");
                assert_eq!(field, "question");
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let text = r#"{"q1":{"media":"img.png","question":"?","answers":{},"answer":"a"}}"#;
        assert!(matches!(
            QuestionSet::parse(text),
            Err(ImportError::MissingField { field: "answers", .. })
        ));
    }

    #[test]
    fn validates_every_record_not_just_the_first() {
        let text = r#"{
            "q1":{"media":"a.png","question":"1?","answers":{"a":"1"},"answer":"a"},
            "q2":{"media":"b.png","question":"2?","answers":{"a":"2"}}
        }"#;
        assert!(matches!(
            QuestionSet::parse(text),
            Err(ImportError::MissingField { field: "answer", .. })
        ));
    }

    #[test]
    fn rejects_answer_outside_answers() {
        let text = r#"{"q1":{"media":"img.png","question":"2+2?","answers":{"a":"3"},"answer":"b"}}"#;
        match QuestionSet::parse(text) {
            Err(ImportError::UnknownAnswer { question, answer }) => {
                assert_eq!(question, "q1");
                assert_eq!(answer, "b");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn serializes_as_plain_map() {
        let set = QuestionSet::parse(TWO_PLUS_TWO).unwrap();
        let json = serde_json::to_string(&set).unwrap();
        assert!(json.starts_with("{\"q1\":"));
        assert_eq!(QuestionSet::parse(&json).unwrap(), set);
    }
}
