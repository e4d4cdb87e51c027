use crate::shitsumon::{QuestionRecord, QuestionSet};
use log::{debug, info};
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no questions to ask")]
    Empty,
    #[error("every question has already been shown")]
    Finished,
    #[error("this question has already been answered")]
    AlreadyAnswered,
    #[error("answer the current question first")]
    NotAnswered,
    #[error("`{0}` is not one of the current answers")]
    UnknownAnswer(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Correct,
    Wrong,
}

/// State of the "next question" control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceControl {
    Disabled,
    Enabled,
    /// Terminal: the last question was answered and advanced past.
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOption {
    pub id: String,
    pub text: String,
    pub mark: Option<Mark>,
    pub locked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentQuestion<'a> {
    pub position: usize,
    pub total: usize,
    pub question: &'a str,
    pub media: &'a str,
    pub options: &'a [AnswerOption],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub selected: String,
    pub correct: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub correct: usize,
    pub answered: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Next(usize),
    Finished(Score),
}

/// Shuffle-by-tag: every item gets an independent random tag and the items are
/// ordered by it.
pub fn shuffle_by_tag<T, R: Rng + ?Sized>(items: impl IntoIterator<Item = T>, rng: &mut R) -> Vec<T> {
    let mut tagged: Vec<(f64, T)> = items
        .into_iter()
        .map(|item| (rng.random::<f64>(), item))
        .collect();
    tagged.sort_by(|a, b| a.0.total_cmp(&b.0));
    tagged.into_iter().map(|(_, item)| item).collect()
}

/// One run through a shuffled question set.
///
/// Questions are shown one at a time. A question accepts exactly one answer, and
/// only then can the session advance. Advancing past the last question finishes
/// the session for good.
pub struct QuizSession<R: Rng> {
    rng: R,
    questions: Vec<QuestionRecord>,
    results: Vec<Option<bool>>,
    position: usize,
    answered: bool,
    options: Vec<AnswerOption>,
    control: AdvanceControl,
}

impl<R: Rng> QuizSession<R> {
    pub fn create(set: QuestionSet, mut rng: R) -> Result<QuizSession<R>, SessionError> {
        if set.is_empty() {
            return Err(SessionError::Empty);
        }
        let questions = shuffle_by_tag(set.into_records(), &mut rng);
        info!("[Session] Starting with {} questions", questions.len());

        let mut session = QuizSession {
            rng,
            results: vec![None; questions.len()],
            questions,
            position: 0,
            answered: false,
            options: Vec::new(),
            control: AdvanceControl::Disabled,
        };
        session.show();
        Ok(session)
    }

    // Entry action for the question at `position`.
    fn show(&mut self) {
        let Some(record) = self.questions.get(self.position) else {
            return;
        };
        let entries = record.answers.iter().map(|(id, text)| AnswerOption {
            id: id.clone(),
            text: text.clone(),
            mark: None,
            locked: false,
        });
        self.options = shuffle_by_tag(entries, &mut self.rng);
        self.answered = false;
        self.control = AdvanceControl::Disabled;
        debug!(
            "[Session] Showing question {}/{}",
            self.position + 1,
            self.questions.len()
        );
    }

    pub fn current(&self) -> Option<CurrentQuestion<'_>> {
        let record = self.questions.get(self.position)?;
        Some(CurrentQuestion {
            position: self.position,
            total: self.questions.len(),
            question: &record.question,
            media: &record.media,
            options: &self.options,
        })
    }

    /// Answers the current question, marking and locking every option.
    pub fn submit_answer(&mut self, answer_id: &str) -> Result<Verdict, SessionError> {
        let Some(record) = self.questions.get(self.position) else {
            return Err(SessionError::Finished);
        };
        if self.answered {
            return Err(SessionError::AlreadyAnswered);
        }
        if !self.options.iter().any(|option| option.id == answer_id) {
            return Err(SessionError::UnknownAnswer(answer_id.to_string()));
        }

        let is_correct = record.is_correct(answer_id);
        for option in self.options.iter_mut() {
            if option.id == answer_id {
                option.mark = Some(if is_correct { Mark::Correct } else { Mark::Wrong });
            } else if option.id == record.answer {
                option.mark = Some(Mark::Correct);
            }
            option.locked = true;
        }
        self.results[self.position] = Some(is_correct);
        self.answered = true;
        self.control = AdvanceControl::Enabled;
        debug!(
            "[Session] Answered '{}' on question {} (correct: {})",
            answer_id,
            self.position + 1,
            is_correct
        );

        Ok(Verdict {
            selected: answer_id.to_string(),
            correct: record.answer.clone(),
            is_correct,
        })
    }

    pub fn advance(&mut self) -> Result<Advance, SessionError> {
        if self.control == AdvanceControl::Hidden || self.position >= self.questions.len() {
            return Err(SessionError::Finished);
        }
        if !self.answered {
            return Err(SessionError::NotAnswered);
        }

        self.position += 1;
        if self.position < self.questions.len() {
            self.show();
            Ok(Advance::Next(self.position))
        } else {
            self.options.clear();
            self.control = AdvanceControl::Hidden;
            let score = self.score();
            info!(
                "[Session] Finished: {}/{} correct",
                score.correct, score.total
            );
            Ok(Advance::Finished(score))
        }
    }

    pub fn score(&self) -> Score {
        Score {
            correct: self.results.iter().filter(|r| **r == Some(true)).count(),
            answered: self.results.iter().filter(|r| r.is_some()).count(),
            total: self.questions.len(),
        }
    }

    /// Per question, in play order: `None` until answered.
    pub fn results(&self) -> &[Option<bool>] {
        &self.results
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_answered(&self) -> bool {
        self.answered
    }

    pub fn control(&self) -> AdvanceControl {
        self.control
    }

    pub fn is_finished(&self) -> bool {
        self.control == AdvanceControl::Hidden
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn questions(&self) -> &[QuestionRecord] {
        &self.questions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeMap;

    fn record(n: usize) -> QuestionRecord {
        QuestionRecord {
            media: format!("{n}.png"),
            question: format!("question {n}"),
            answers: BTreeMap::from([
                ("a".to_string(), format!("{n}a")),
                ("b".to_string(), format!("{n}b")),
                ("c".to_string(), format!("{n}c")),
            ]),
            answer: "b".to_string(),
        }
    }

    fn set_of(n: usize) -> QuestionSet {
        QuestionSet((0..n).map(|i| (format!("q{i}"), record(i))).collect())
    }

    fn session_of(n: usize, seed: u64) -> QuizSession<StdRng> {
        QuizSession::create(set_of(n), StdRng::seed_from_u64(seed)).unwrap()
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        for n in [0, 1, 2, 10, 57] {
            let mut shuffled = shuffle_by_tag(0..n, &mut rng);
            assert_eq!(shuffled.len(), n);
            shuffled.sort_unstable();
            assert_eq!(shuffled, (0..n).collect::<Vec<_>>());
        }
    }

    #[test]
    fn same_seed_same_order() {
        let first = session_of(20, 42);
        let second = session_of(20, 42);
        assert_eq!(first.questions(), second.questions());
        assert_eq!(
            first.current().unwrap().options,
            second.current().unwrap().options
        );
    }

    #[test]
    fn session_questions_are_a_permutation_of_the_set() {
        let session = session_of(12, 3);
        let mut seen: Vec<String> = session.questions().iter().map(|q| q.question.clone()).collect();
        seen.sort();
        let mut expected: Vec<String> = set_of(12).into_records().into_iter().map(|q| q.question).collect();
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[test]
    fn empty_set_is_rejected() {
        let result = QuizSession::create(QuestionSet::default(), StdRng::seed_from_u64(0));
        assert!(matches!(result, Err(SessionError::Empty)));
    }

    #[test]
    fn starts_unanswered_with_control_disabled() {
        let session = session_of(2, 1);
        let current = session.current().unwrap();
        assert_eq!(current.position, 0);
        assert_eq!(current.total, 2);
        assert_eq!(current.options.len(), 3);
        assert!(current.options.iter().all(|o| o.mark.is_none() && !o.locked));
        assert!(!session.is_answered());
        assert_eq!(session.control(), AdvanceControl::Disabled);
    }

    #[test]
    fn wrong_answer_marks_both_options() {
        let set = QuestionSet::parse(
            r#"{"q1":{"media":"img.png","question":"2+2?","answers":{"a":"3","b":"4"},"answer":"b"}}"#,
        )
        .unwrap();
        let mut session = QuizSession::create(set, StdRng::seed_from_u64(5)).unwrap();

        let verdict = session.submit_answer("a").unwrap();
        assert!(!verdict.is_correct);
        assert_eq!(verdict.correct, "b");

        let options = session.current().unwrap().options;
        let mark_of = |id: &str| options.iter().find(|o| o.id == id).unwrap().mark;
        assert_eq!(mark_of("a"), Some(Mark::Wrong));
        assert_eq!(mark_of("b"), Some(Mark::Correct));
        assert!(options.iter().all(|o| o.locked));
        assert_eq!(session.control(), AdvanceControl::Enabled);
    }

    #[test]
    fn right_answer_marks_only_itself() {
        let mut session = session_of(1, 9);
        assert!(session.submit_answer("b").unwrap().is_correct);

        let options = session.current().unwrap().options;
        for option in options {
            let expected = if option.id == "b" { Some(Mark::Correct) } else { None };
            assert_eq!(option.mark, expected);
        }
        assert_eq!(
            session.score(),
            Score {
                correct: 1,
                answered: 1,
                total: 1
            }
        );
    }

    #[test]
    fn second_answer_is_rejected() {
        let mut session = session_of(2, 11);
        session.submit_answer("a").unwrap();
        assert_eq!(
            session.submit_answer("b"),
            Err(SessionError::AlreadyAnswered)
        );
        assert_eq!(session.score().correct, 0);
        let options = session.current().unwrap().options;
        assert_eq!(
            options.iter().find(|o| o.id == "a").unwrap().mark,
            Some(Mark::Wrong)
        );
    }

    #[test]
    fn unknown_answer_is_rejected_without_locking() {
        let mut session = session_of(1, 2);
        assert_eq!(
            session.submit_answer("z"),
            Err(SessionError::UnknownAnswer("z".to_string()))
        );
        assert!(!session.is_answered());
        assert!(session.submit_answer("b").is_ok());
    }

    #[test]
    fn advance_requires_an_answer() {
        let mut session = session_of(2, 4);
        assert_eq!(session.advance(), Err(SessionError::NotAnswered));
        assert_eq!(session.position(), 0);

        session.submit_answer("c").unwrap();
        assert_eq!(session.advance(), Ok(Advance::Next(1)));
        assert!(!session.is_answered());
        assert_eq!(session.control(), AdvanceControl::Disabled);
        assert!(session.current().unwrap().options.iter().all(|o| o.mark.is_none()));
    }

    #[test]
    fn finishes_after_last_answer_and_advance() {
        let mut session = session_of(3, 8);
        for round in 0..3 {
            let current = session.current().unwrap();
            assert_eq!(current.position, round);
            assert_ne!(session.control(), AdvanceControl::Hidden);
            session.submit_answer(if round == 1 { "a" } else { "b" }).unwrap();
            let step = session.advance().unwrap();
            if round < 2 {
                assert_eq!(step, Advance::Next(round + 1));
            } else {
                assert_eq!(
                    step,
                    Advance::Finished(Score {
                        correct: 2,
                        answered: 3,
                        total: 3
                    })
                );
            }
        }

        assert!(session.current().is_none());
        assert!(session.is_finished());
        assert_eq!(session.control(), AdvanceControl::Hidden);
        assert_eq!(session.advance(), Err(SessionError::Finished));
        assert_eq!(session.submit_answer("b"), Err(SessionError::Finished));
        assert_eq!(session.results(), &[Some(true), Some(false), Some(true)]);
    }

    #[test]
    fn answers_are_reshuffled_per_question() {
        let mut session = session_of(30, 13);
        let mut orders = Vec::new();
        while let Some(current) = session.current() {
            let ids: Vec<String> = current.options.iter().map(|o| o.id.clone()).collect();
            let mut sorted = ids.clone();
            sorted.sort();
            assert_eq!(sorted, vec!["a", "b", "c"]);
            orders.push(ids);
            session.submit_answer("a").unwrap();
            session.advance().unwrap();
        }
        assert_eq!(orders.len(), 30);
        assert!(orders.iter().any(|order| order != &orders[0]));
    }
}
