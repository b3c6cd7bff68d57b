// Pure quiz scoring: validates a submission against the quiz definition and
// grades it. No partial scoring — any malformed submission is rejected whole.

use thiserror::Error;

use crate::error::EngineError;
use crate::models::{QuestionFeedback, QuizDef, SubmittedAnswer};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScoreError {
    #[error("quiz {0} has no questions")]
    EmptyQuiz(String),
    #[error("expected {expected} answers, got {got}")]
    AnswerCountMismatch { expected: usize, got: usize },
    #[error("unknown question: {0}")]
    UnknownQuestion(String),
    #[error("missing answer for question: {0}")]
    MissingAnswer(String),
    #[error("duplicate answer for question: {0}")]
    DuplicateAnswer(String),
    #[error("answer index {index} out of range for question {question_id} ({options} options)")]
    AnswerOutOfRange {
        question_id: String,
        index: usize,
        options: usize,
    },
}

impl From<ScoreError> for EngineError {
    fn from(e: ScoreError) -> Self {
        EngineError::Validation(e.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct QuizScore {
    pub score: u8,
    pub correct_count: usize,
    pub total_questions: usize,
    pub passed: bool,
    pub per_question: Vec<QuestionFeedback>,
}

pub fn score_quiz(quiz: &QuizDef, answers: &[SubmittedAnswer]) -> Result<QuizScore, ScoreError> {
    let total_questions = quiz.questions.len();
    if total_questions == 0 {
        return Err(ScoreError::EmptyQuiz(quiz.id.clone()));
    }
    if answers.len() != total_questions {
        return Err(ScoreError::AnswerCountMismatch {
            expected: total_questions,
            got: answers.len(),
        });
    }
    for a in answers {
        if quiz.questions.iter().all(|q| q.id != a.question_id) {
            return Err(ScoreError::UnknownQuestion(a.question_id.clone()));
        }
    }

    let mut correct_count = 0usize;
    let mut per_question = Vec::with_capacity(total_questions);
    for q in &quiz.questions {
        let mut submitted: Option<usize> = None;
        for a in answers.iter().filter(|a| a.question_id == q.id) {
            if submitted.is_some() {
                return Err(ScoreError::DuplicateAnswer(q.id.clone()));
            }
            submitted = Some(a.answer_index);
        }
        let index = submitted.ok_or_else(|| ScoreError::MissingAnswer(q.id.clone()))?;
        if index >= q.options.len() {
            return Err(ScoreError::AnswerOutOfRange {
                question_id: q.id.clone(),
                index,
                options: q.options.len(),
            });
        }
        let is_correct = index == q.correct_option_index;
        if is_correct {
            correct_count += 1;
        }
        per_question.push(QuestionFeedback {
            question_id: q.id.clone(),
            is_correct,
            correct_option_index: q.correct_option_index,
        });
    }

    // half-up rounding: 1 of 8 correct is 12.5 -> 13
    let score = ((100.0 * correct_count as f64) / total_questions as f64).round() as u8;
    Ok(QuizScore {
        score,
        correct_count,
        total_questions,
        passed: score >= quiz.passing_score,
        per_question,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Question;

    fn question(id: &str, correct: usize) -> Question {
        Question {
            id: id.to_string(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_option_index: correct,
        }
    }

    fn quiz(questions: Vec<Question>, passing_score: u8) -> QuizDef {
        QuizDef {
            id: "quiz-1".into(),
            questions,
            passing_score,
            is_final: true,
        }
    }

    fn answer(question_id: &str, answer_index: usize) -> SubmittedAnswer {
        SubmittedAnswer {
            question_id: question_id.to_string(),
            answer_index,
        }
    }

    #[test]
    fn three_of_four_scores_75() {
        let quiz = quiz(
            vec![
                question("q1", 0),
                question("q2", 1),
                question("q3", 2),
                question("q4", 3),
            ],
            80,
        );
        let answers = vec![
            answer("q1", 0),
            answer("q2", 1),
            answer("q3", 2),
            answer("q4", 0),
        ];
        let out = score_quiz(&quiz, &answers).unwrap();
        assert_eq!(out.score, 75);
        assert_eq!(out.correct_count, 3);
        assert_eq!(out.total_questions, 4);
        assert!(!out.passed);
        assert!(out.per_question.iter().take(3).all(|f| f.is_correct));
        assert!(!out.per_question[3].is_correct);
        assert_eq!(out.per_question[3].correct_option_index, 3);
    }

    #[test]
    fn all_correct_passes_at_threshold() {
        let quiz = quiz(vec![question("q1", 1), question("q2", 2)], 100);
        let out = score_quiz(&quiz, &[answer("q1", 1), answer("q2", 2)]).unwrap();
        assert_eq!(out.score, 100);
        assert!(out.passed);
    }

    #[test]
    fn half_rounds_up() {
        let questions = (0..8).map(|i| question(&format!("q{i}"), 0)).collect();
        let quiz = quiz(questions, 50);
        let mut answers: Vec<_> = (0..8).map(|i| answer(&format!("q{i}"), 1)).collect();
        answers[0].answer_index = 0;
        let out = score_quiz(&quiz, &answers).unwrap();
        assert_eq!(out.correct_count, 1);
        assert_eq!(out.score, 13); // 12.5 rounds up
    }

    #[test]
    fn missing_answer_is_rejected() {
        let quiz = quiz(vec![question("q1", 0), question("q2", 0)], 50);
        let err = score_quiz(&quiz, &[answer("q1", 0)]).unwrap_err();
        assert_eq!(
            err,
            ScoreError::AnswerCountMismatch {
                expected: 2,
                got: 1
            }
        );
    }

    #[test]
    fn duplicate_answer_is_rejected() {
        let quiz = quiz(vec![question("q1", 0), question("q2", 0)], 50);
        let err = score_quiz(&quiz, &[answer("q1", 0), answer("q1", 1)]).unwrap_err();
        assert_eq!(err, ScoreError::DuplicateAnswer("q1".into()));
    }

    #[test]
    fn unknown_question_is_rejected() {
        let quiz = quiz(vec![question("q1", 0)], 50);
        let err = score_quiz(&quiz, &[answer("nope", 0)]).unwrap_err();
        assert_eq!(err, ScoreError::UnknownQuestion("nope".into()));
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let quiz = quiz(vec![question("q1", 0)], 50);
        let err = score_quiz(&quiz, &[answer("q1", 4)]).unwrap_err();
        assert_eq!(
            err,
            ScoreError::AnswerOutOfRange {
                question_id: "q1".into(),
                index: 4,
                options: 4,
            }
        );
    }

    #[test]
    fn empty_quiz_cannot_be_submitted() {
        let quiz = quiz(vec![], 50);
        let err = score_quiz(&quiz, &[]).unwrap_err();
        assert_eq!(err, ScoreError::EmptyQuiz("quiz-1".into()));
    }
}
