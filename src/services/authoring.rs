// src/services/authoring.rs
//
// Quiz and question CRUD. Callers run the ownership checks in
// `services::access` first; quiz-scoped question operations re-verify that
// the question belongs to the quiz in the path.

use validator::Validate;

use crate::{
    error::AppError,
    models::{
        question::{Question, QuestionRequest},
        quiz::{QuizRequest, QuizResponse},
        user::Principal,
    },
    store::QuizRepository,
    utils::html::clean_optional,
};

fn quiz_not_found(quiz_id: i64) -> AppError {
    AppError::NotFound(format!("Quiz not found with id: {}", quiz_id))
}

fn question_not_found(question_id: i64) -> AppError {
    AppError::NotFound(format!("Question not found with id: {}", question_id))
}

pub async fn create_quiz<S>(
    store: &S,
    principal: &Principal,
    request: QuizRequest,
) -> Result<QuizResponse, AppError>
where
    S: QuizRepository + ?Sized,
{
    let request = QuizRequest {
        title: request.title.trim().to_string(),
        ..request
    };
    request.validate()?;
    let description = clean_optional(request.description.as_deref());

    let quiz = store
        .insert_quiz(principal.user_id, &request.title, description.as_deref())
        .await?;

    tracing::info!("User {} created quiz {}", principal.user_id, quiz.id);
    Ok(QuizResponse::from(&quiz))
}

pub async fn get_quiz<S>(store: &S, quiz_id: i64) -> Result<QuizResponse, AppError>
where
    S: QuizRepository + ?Sized,
{
    let quiz = store
        .find_quiz(quiz_id)
        .await?
        .ok_or_else(|| quiz_not_found(quiz_id))?;
    Ok(QuizResponse::from(&quiz))
}

pub async fn list_my_quizzes<S>(
    store: &S,
    principal: &Principal,
) -> Result<Vec<QuizResponse>, AppError>
where
    S: QuizRepository + ?Sized,
{
    let quizzes = store.list_quizzes_by_owner(principal.user_id).await?;
    Ok(quizzes.iter().map(QuizResponse::from).collect())
}

pub async fn update_quiz<S>(
    store: &S,
    quiz_id: i64,
    request: QuizRequest,
) -> Result<QuizResponse, AppError>
where
    S: QuizRepository + ?Sized,
{
    let request = QuizRequest {
        title: request.title.trim().to_string(),
        ..request
    };
    request.validate()?;
    let description = clean_optional(request.description.as_deref());

    let quiz = store
        .update_quiz(quiz_id, &request.title, description.as_deref())
        .await?
        .ok_or_else(|| quiz_not_found(quiz_id))?;

    tracing::info!("Updated quiz {}", quiz_id);
    Ok(QuizResponse::from(&quiz))
}

/// Deletes the quiz and, by cascade, its questions.
pub async fn delete_quiz<S>(store: &S, quiz_id: i64) -> Result<(), AppError>
where
    S: QuizRepository + ?Sized,
{
    if !store.delete_quiz(quiz_id).await? {
        return Err(quiz_not_found(quiz_id));
    }
    tracing::info!("Deleted quiz {}", quiz_id);
    Ok(())
}

pub async fn add_question<S>(
    store: &S,
    quiz_id: i64,
    request: QuestionRequest,
) -> Result<Question, AppError>
where
    S: QuizRepository + ?Sized,
{
    request.validate()?;

    let question = store.insert_question(quiz_id, &request).await?;
    tracing::info!(
        "Added {} question {} to quiz {}",
        question.question_type(),
        question.id,
        quiz_id
    );
    Ok(question)
}

pub async fn list_questions<S>(store: &S, quiz_id: i64) -> Result<Vec<Question>, AppError>
where
    S: QuizRepository + ?Sized,
{
    let quiz = store
        .find_quiz(quiz_id)
        .await?
        .ok_or_else(|| quiz_not_found(quiz_id))?;
    Ok(quiz.questions)
}

/// Loads a question, treating one that lives in another quiz as missing.
pub async fn get_question<S>(store: &S, quiz_id: i64, question_id: i64) -> Result<Question, AppError>
where
    S: QuizRepository + ?Sized,
{
    store
        .find_question(question_id)
        .await?
        .filter(|q| q.quiz_id == quiz_id)
        .ok_or_else(|| question_not_found(question_id))
}

/// Replaces text and answer key. The question type is fixed at creation.
pub async fn update_question<S>(
    store: &S,
    quiz_id: i64,
    question_id: i64,
    request: QuestionRequest,
) -> Result<Question, AppError>
where
    S: QuizRepository + ?Sized,
{
    let existing = get_question(store, quiz_id, question_id).await?;

    let requested = request.kind.question_type();
    if existing.question_type() != requested {
        return Err(AppError::Conflict(format!(
            "Cannot change the type of question {} from {} to {}",
            question_id,
            existing.question_type(),
            requested
        )));
    }

    request.validate()?;

    let question = store
        .replace_question(question_id, &request)
        .await?
        .ok_or_else(|| question_not_found(question_id))?;

    tracing::info!("Updated question {} in quiz {}", question_id, quiz_id);
    Ok(question)
}

pub async fn delete_question<S>(store: &S, quiz_id: i64, question_id: i64) -> Result<(), AppError>
where
    S: QuizRepository + ?Sized,
{
    get_question(store, quiz_id, question_id).await?;

    if !store.delete_question(question_id).await? {
        return Err(question_not_found(question_id));
    }
    tracing::info!("Deleted question {} from quiz {}", question_id, quiz_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{
            question::{ChoiceRequest, QuestionBody, QuestionRequestKind, QuestionType},
            user::NewUser,
        },
        store::{MemoryStore, UserRepository},
    };

    async fn author(store: &MemoryStore) -> Principal {
        let user = store
            .create_user(NewUser {
                username: "author".into(),
                email: "author@example.com".into(),
                password_hash: "hash".into(),
                role: "user".into(),
            })
            .await
            .unwrap();
        Principal {
            user_id: user.id,
            username: user.username,
            role: user.role,
        }
    }

    fn quiz_request(title: &str, description: Option<&str>) -> QuizRequest {
        QuizRequest {
            title: title.to_string(),
            description: description.map(str::to_string),
        }
    }

    fn true_false(text: &str, answer: bool) -> QuestionRequest {
        QuestionRequest {
            text: text.to_string(),
            kind: QuestionRequestKind::TrueFalse {
                correct_answer: answer,
            },
        }
    }

    fn multiple_choice(texts: &[(&str, bool)]) -> QuestionRequest {
        QuestionRequest {
            text: "Pick".to_string(),
            kind: QuestionRequestKind::MultipleChoice {
                choices: texts
                    .iter()
                    .map(|(t, c)| ChoiceRequest {
                        text: t.to_string(),
                        correct: *c,
                    })
                    .collect(),
            },
        }
    }

    #[tokio::test]
    async fn create_quiz_sanitizes_description() {
        let store = MemoryStore::new();
        let principal = author(&store).await;

        let quiz = create_quiz(
            &store,
            &principal,
            quiz_request("Capitals", Some("<i>Europe</i><script>x()</script>")),
        )
        .await
        .unwrap();

        assert_eq!(quiz.description.as_deref(), Some("<i>Europe</i>"));
        assert_eq!(quiz.author_username, "author");
        assert_eq!(quiz.question_count, 0);
    }

    #[tokio::test]
    async fn short_title_is_rejected() {
        let store = MemoryStore::new();
        let principal = author(&store).await;
        let result = create_quiz(&store, &principal, quiz_request("ab", None)).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn blank_title_is_rejected_on_create_and_update() {
        let store = MemoryStore::new();
        let principal = author(&store).await;

        let created = create_quiz(&store, &principal, quiz_request("     ", None)).await;
        assert!(matches!(created, Err(AppError::BadRequest(_))));

        let quiz = create_quiz(&store, &principal, quiz_request("  Capitals  ", None))
            .await
            .unwrap();
        assert_eq!(quiz.title, "Capitals");

        let updated = update_quiz(&store, quiz.id, quiz_request(" \t  ", None)).await;
        assert!(matches!(updated, Err(AppError::BadRequest(_))));

        let stored = get_quiz(&store, quiz.id).await.unwrap();
        assert_eq!(stored.title, "Capitals");
    }

    #[tokio::test]
    async fn question_type_cannot_change_on_update() {
        let store = MemoryStore::new();
        let principal = author(&store).await;
        let quiz = create_quiz(&store, &principal, quiz_request("Quiz", None)).await.unwrap();
        let question = add_question(&store, quiz.id, true_false("Sky is blue", true))
            .await
            .unwrap();

        let result = update_question(
            &store,
            quiz.id,
            question.id,
            multiple_choice(&[("a", true), ("b", false)]),
        )
        .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        let unchanged = get_question(&store, quiz.id, question.id).await.unwrap();
        assert_eq!(unchanged.question_type(), QuestionType::TrueFalse);
    }

    #[tokio::test]
    async fn update_replaces_choices_wholesale() {
        let store = MemoryStore::new();
        let principal = author(&store).await;
        let quiz = create_quiz(&store, &principal, quiz_request("Quiz", None)).await.unwrap();
        let question = add_question(&store, quiz.id, multiple_choice(&[("a", true), ("b", false)]))
            .await
            .unwrap();

        let updated = update_question(
            &store,
            quiz.id,
            question.id,
            multiple_choice(&[("x", false), ("y", true), ("z", true)]),
        )
        .await
        .unwrap();

        match updated.body {
            QuestionBody::MultipleChoice { choices } => {
                let texts: Vec<&str> = choices.iter().map(|c| c.text.as_str()).collect();
                assert_eq!(texts, vec!["x", "y", "z"]);
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[tokio::test]
    async fn question_from_other_quiz_is_not_found() {
        let store = MemoryStore::new();
        let principal = author(&store).await;
        let first = create_quiz(&store, &principal, quiz_request("First", None)).await.unwrap();
        let second = create_quiz(&store, &principal, quiz_request("Second", None)).await.unwrap();
        let question = add_question(&store, first.id, true_false("Q", true)).await.unwrap();

        assert!(matches!(
            get_question(&store, second.id, question.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            delete_question(&store, second.id, question.id).await,
            Err(AppError::NotFound(_))
        ));
        delete_question(&store, first.id, question.id).await.unwrap();
        assert!(list_questions(&store, first.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_question_payload_is_rejected() {
        let store = MemoryStore::new();
        let principal = author(&store).await;
        let quiz = create_quiz(&store, &principal, quiz_request("Quiz", None)).await.unwrap();

        let result = add_question(&store, quiz.id, multiple_choice(&[("only", true)])).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn add_question_to_missing_quiz_is_not_found() {
        let store = MemoryStore::new();
        let result = add_question(&store, 404, true_false("Q", true)).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_quiz_cascades_to_questions() {
        let store = MemoryStore::new();
        let principal = author(&store).await;
        let quiz = create_quiz(&store, &principal, quiz_request("Quiz", None)).await.unwrap();
        let question = add_question(&store, quiz.id, true_false("Q", true)).await.unwrap();

        delete_quiz(&store, quiz.id).await.unwrap();
        assert!(store.find_question(question.id).await.unwrap().is_none());
        assert!(matches!(
            delete_quiz(&store, quiz.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
