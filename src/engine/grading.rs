// src/engine/grading.rs

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::models::{
    attempt::{GradedDetail, GradedQuestion, StoredAnswer},
    question::{Question, QuestionBody, QuestionType},
    submission::{AnswerSubmission, SubmittedAnswer},
};

/// Failures of the grading engine. All of them abort the whole submission.
#[derive(Debug, Clone, PartialEq)]
pub enum GradingError {
    /// The quiz has a question the submission does not answer.
    MissingAnswer(i64),
    /// The answer's variant does not match the question's variant.
    KindMismatch {
        question_id: i64,
        expected: QuestionType,
        found: QuestionType,
    },
    /// A selected choice id is not one of the question's choices.
    UnknownChoice { question_id: i64, choice_id: i64 },
}

impl fmt::Display for GradingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradingError::MissingAnswer(id) => write!(f, "Answer missing for question {}", id),
            GradingError::KindMismatch {
                question_id,
                expected,
                found,
            } => write!(
                f,
                "Question {} expects a {} answer, got {}",
                question_id, expected, found
            ),
            GradingError::UnknownChoice {
                question_id,
                choice_id,
            } => write!(
                f,
                "Choice {} not found in question {}",
                choice_id, question_id
            ),
        }
    }
}

impl std::error::Error for GradingError {}

/// Result of grading every question of a quiz.
#[derive(Debug, Clone, PartialEq)]
pub struct GradedQuiz {
    pub graded_questions: Vec<GradedQuestion>,
    pub correct_count: usize,
    pub total_questions: usize,
    pub score: f64,
}

impl GradedQuiz {
    /// Answers to persist, one per graded question, in quiz order.
    pub fn stored_answers(&self, index: &HashMap<i64, &AnswerSubmission>) -> Vec<StoredAnswer> {
        self.graded_questions
            .iter()
            .filter_map(|g| {
                index.get(&g.question_id).map(|s| StoredAnswer {
                    question_id: g.question_id,
                    correct: g.correct,
                    answer: s.answer.clone(),
                })
            })
            .collect()
    }
}

/// Percentage of correct answers. A quiz without questions scores 0.
pub fn score_percentage(correct: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    correct as f64 / total as f64 * 100.0
}

/// Grades one question against its paired answer.
///
/// Multiple-choice and matching questions are all-or-nothing: the submitted
/// set (or mapping) must equal the answer key exactly.
pub fn grade(question: &Question, answer: &SubmittedAnswer) -> Result<GradedQuestion, GradingError> {
    let (correct, detail) = match (&question.body, answer) {
        (
            QuestionBody::TrueFalse { correct_answer },
            SubmittedAnswer::TrueFalse { submitted_answer },
        ) => (
            correct_answer == submitted_answer,
            GradedDetail::TrueFalse {
                submitted_answer: *submitted_answer,
                correct_answer: *correct_answer,
            },
        ),
        (
            QuestionBody::MultipleChoice { choices },
            SubmittedAnswer::MultipleChoice {
                selected_choice_ids,
            },
        ) => {
            let texts: HashMap<i64, &str> =
                choices.iter().map(|c| (c.id, c.text.as_str())).collect();

            let mut submitted_choices = BTreeSet::new();
            for choice_id in selected_choice_ids {
                let text = texts.get(choice_id).ok_or(GradingError::UnknownChoice {
                    question_id: question.id,
                    choice_id: *choice_id,
                })?;
                submitted_choices.insert(text.to_string());
            }

            let correct_ids: BTreeSet<i64> =
                choices.iter().filter(|c| c.correct).map(|c| c.id).collect();
            let correct_choices = choices
                .iter()
                .filter(|c| c.correct)
                .map(|c| c.text.clone())
                .collect();

            (
                &correct_ids == selected_choice_ids,
                GradedDetail::MultipleChoice {
                    submitted_choices,
                    correct_choices,
                },
            )
        }
        (QuestionBody::Matching { pairs }, SubmittedAnswer::Matching { submitted_pairs }) => {
            let correct_pairs: BTreeMap<String, String> = pairs
                .iter()
                .map(|p| (p.source_item.clone(), p.target_item.clone()))
                .collect();

            (
                &correct_pairs == submitted_pairs,
                GradedDetail::Matching {
                    submitted_pairs: submitted_pairs.clone(),
                    correct_pairs,
                },
            )
        }
        (body, answer) => {
            return Err(GradingError::KindMismatch {
                question_id: question.id,
                expected: body.question_type(),
                found: answer.question_type(),
            });
        }
    };

    Ok(GradedQuestion {
        question_id: question.id,
        text: question.text.clone(),
        correct,
        detail,
    })
}

/// Grades every question of a quiz, in quiz order, using answers indexed by
/// question id. Fails on the first question without an answer.
pub fn grade_quiz(
    questions: &[Question],
    answers: &HashMap<i64, &AnswerSubmission>,
) -> Result<GradedQuiz, GradingError> {
    let mut graded_questions = Vec::with_capacity(questions.len());

    for question in questions {
        let submission = answers
            .get(&question.id)
            .ok_or(GradingError::MissingAnswer(question.id))?;
        graded_questions.push(grade(question, &submission.answer)?);
    }

    let correct_count = graded_questions.iter().filter(|g| g.correct).count();
    let total_questions = questions.len();

    Ok(GradedQuiz {
        score: score_percentage(correct_count, total_questions),
        graded_questions,
        correct_count,
        total_questions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{Choice, MatchPair};

    fn true_false(id: i64, correct_answer: bool) -> Question {
        Question {
            id,
            quiz_id: 1,
            text: "Is it true?".into(),
            body: QuestionBody::TrueFalse { correct_answer },
        }
    }

    fn multiple_choice(id: i64) -> Question {
        Question {
            id,
            quiz_id: 1,
            text: "Pick A and B".into(),
            body: QuestionBody::MultipleChoice {
                choices: vec![
                    Choice { id: 10, text: "A".into(), correct: true },
                    Choice { id: 11, text: "B".into(), correct: true },
                    Choice { id: 12, text: "C".into(), correct: false },
                ],
            },
        }
    }

    fn capitals(id: i64) -> Question {
        Question {
            id,
            quiz_id: 1,
            text: "Match countries to capitals".into(),
            body: QuestionBody::Matching {
                pairs: vec![
                    MatchPair {
                        id: 20,
                        source_item: "Poland".into(),
                        target_item: "Warsaw".into(),
                    },
                    MatchPair {
                        id: 21,
                        source_item: "Germany".into(),
                        target_item: "Berlin".into(),
                    },
                ],
            },
        }
    }

    fn tf(answer: bool) -> SubmittedAnswer {
        SubmittedAnswer::TrueFalse {
            submitted_answer: answer,
        }
    }

    fn mc(ids: &[i64]) -> SubmittedAnswer {
        SubmittedAnswer::MultipleChoice {
            selected_choice_ids: ids.iter().copied().collect(),
        }
    }

    fn pairs(entries: &[(&str, &str)]) -> SubmittedAnswer {
        SubmittedAnswer::Matching {
            submitted_pairs: entries
                .iter()
                .map(|(s, t)| (s.to_string(), t.to_string()))
                .collect(),
        }
    }

    #[test]
    fn true_false_is_boolean_equality() {
        for key in [true, false] {
            for submitted in [true, false] {
                let graded = grade(&true_false(1, key), &tf(submitted)).unwrap();
                assert_eq!(graded.correct, key == submitted);
            }
        }
    }

    #[test]
    fn multiple_choice_requires_exact_set() {
        let question = multiple_choice(2);

        assert!(grade(&question, &mc(&[10, 11])).unwrap().correct);
        assert!(!grade(&question, &mc(&[10])).unwrap().correct, "missing a correct choice");
        assert!(!grade(&question, &mc(&[10, 11, 12])).unwrap().correct, "extra wrong choice");
        assert!(!grade(&question, &mc(&[])).unwrap().correct);
    }

    #[test]
    fn multiple_choice_without_correct_choices_only_accepts_empty_selection() {
        let question = Question {
            id: 5,
            quiz_id: 1,
            text: "None of these".into(),
            body: QuestionBody::MultipleChoice {
                choices: vec![
                    Choice { id: 1, text: "X".into(), correct: false },
                    Choice { id: 2, text: "Y".into(), correct: false },
                ],
            },
        };

        assert!(grade(&question, &mc(&[])).unwrap().correct);
        assert!(!grade(&question, &mc(&[1])).unwrap().correct);
    }

    #[test]
    fn multiple_choice_reports_choice_texts() {
        let graded = grade(&multiple_choice(2), &mc(&[10, 12])).unwrap();
        match graded.detail {
            GradedDetail::MultipleChoice {
                submitted_choices,
                correct_choices,
            } => {
                assert_eq!(submitted_choices, BTreeSet::from(["A".into(), "C".into()]));
                assert_eq!(correct_choices, BTreeSet::from(["A".into(), "B".into()]));
            }
            other => panic!("unexpected detail {:?}", other),
        }
    }

    #[test]
    fn multiple_choice_rejects_foreign_choice_id() {
        let err = grade(&multiple_choice(2), &mc(&[10, 99])).unwrap_err();
        assert_eq!(
            err,
            GradingError::UnknownChoice {
                question_id: 2,
                choice_id: 99
            }
        );
    }

    #[test]
    fn matching_requires_exact_mapping() {
        let question = capitals(3);

        let exact = pairs(&[("Poland", "Warsaw"), ("Germany", "Berlin")]);
        assert!(grade(&question, &exact).unwrap().correct);

        let swapped = pairs(&[("Poland", "Berlin"), ("Germany", "Warsaw")]);
        assert!(!grade(&question, &swapped).unwrap().correct);

        let missing_key = pairs(&[("Poland", "Warsaw")]);
        assert!(!grade(&question, &missing_key).unwrap().correct);

        let extra_key = pairs(&[
            ("Poland", "Warsaw"),
            ("Germany", "Berlin"),
            ("France", "Paris"),
        ]);
        assert!(!grade(&question, &extra_key).unwrap().correct);
    }

    #[test]
    fn variant_mismatch_is_an_error() {
        let err = grade(&true_false(1, true), &mc(&[10])).unwrap_err();
        assert_eq!(
            err,
            GradingError::KindMismatch {
                question_id: 1,
                expected: QuestionType::TrueFalse,
                found: QuestionType::MultipleChoice,
            }
        );
    }

    fn index(submissions: &[AnswerSubmission]) -> HashMap<i64, &AnswerSubmission> {
        submissions.iter().map(|s| (s.question_id, s)).collect()
    }

    fn sample_quiz() -> Vec<Question> {
        vec![true_false(1, true), multiple_choice(2), capitals(3)]
    }

    #[test]
    fn all_correct_scores_hundred() {
        let submissions = vec![
            AnswerSubmission { question_id: 1, answer: tf(true) },
            AnswerSubmission { question_id: 2, answer: mc(&[10, 11]) },
            AnswerSubmission {
                question_id: 3,
                answer: pairs(&[("Poland", "Warsaw"), ("Germany", "Berlin")]),
            },
        ];

        let graded = grade_quiz(&sample_quiz(), &index(&submissions)).unwrap();
        assert_eq!(graded.correct_count, 3);
        assert_eq!(graded.total_questions, 3);
        assert_eq!(graded.score, 100.0);
    }

    #[test]
    fn one_of_three_scores_a_third() {
        let submissions = vec![
            AnswerSubmission {
                question_id: 3,
                answer: pairs(&[("Poland", "Berlin"), ("Germany", "Warsaw")]),
            },
            AnswerSubmission { question_id: 2, answer: mc(&[10]) },
            AnswerSubmission { question_id: 1, answer: tf(true) },
        ];

        let graded = grade_quiz(&sample_quiz(), &index(&submissions)).unwrap();
        let flags: Vec<bool> = graded.graded_questions.iter().map(|g| g.correct).collect();
        assert_eq!(flags, vec![true, false, false]);
        assert_eq!(graded.correct_count, 1);
        assert!((graded.score - 33.333).abs() < 0.01);

        let stored = graded.stored_answers(&index(&submissions));
        let order: Vec<i64> = stored.iter().map(|a| a.question_id).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert!(stored[0].correct);
    }

    #[test]
    fn missing_answer_fails_fast() {
        let submissions = vec![AnswerSubmission { question_id: 1, answer: tf(true) }];
        let err = grade_quiz(&sample_quiz(), &index(&submissions)).unwrap_err();
        assert_eq!(err, GradingError::MissingAnswer(2));
    }

    #[test]
    fn empty_quiz_scores_zero() {
        let graded = grade_quiz(&[], &HashMap::new()).unwrap();
        assert_eq!(graded.score, 0.0);
        assert_eq!(graded.total_questions, 0);
    }

    #[test]
    fn score_is_fraction_of_hundred() {
        assert_eq!(score_percentage(0, 0), 0.0);
        assert_eq!(score_percentage(1, 4), 25.0);
        assert_eq!(score_percentage(4, 4), 100.0);
    }

    #[test]
    fn graded_question_wire_shape() {
        let graded = grade(&true_false(1, true), &tf(false)).unwrap();
        let value = serde_json::to_value(&graded).unwrap();
        assert_eq!(value["questionId"], 1);
        assert_eq!(value["questionType"], "TRUE_FALSE");
        assert_eq!(value["correct"], false);
        assert_eq!(value["submittedAnswer"], false);
        assert_eq!(value["correctAnswer"], true);
    }
}
