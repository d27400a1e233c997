// src/engine/playable.rs

use rand::{Rng, seq::SliceRandom};

use crate::models::{
    attempt::{PlayableChoice, PlayableKind, PlayableQuestion},
    question::{Question, QuestionBody},
};

/// Builds the view of a question a test-taker sees before answering.
///
/// Matching targets are reshuffled on every call.
pub fn to_playable(question: &Question) -> PlayableQuestion {
    to_playable_with(question, &mut rand::thread_rng())
}

/// Same as [`to_playable`] with a caller-supplied random source.
pub fn to_playable_with<R: Rng + ?Sized>(question: &Question, rng: &mut R) -> PlayableQuestion {
    let kind = match &question.body {
        QuestionBody::TrueFalse { .. } => PlayableKind::TrueFalse,
        QuestionBody::MultipleChoice { choices } => PlayableKind::MultipleChoice {
            choices: choices
                .iter()
                .map(|c| PlayableChoice {
                    id: c.id,
                    text: c.text.clone(),
                })
                .collect(),
        },
        QuestionBody::Matching { pairs } => {
            let source_items = pairs.iter().map(|p| p.source_item.clone()).collect();
            let mut target_items: Vec<String> =
                pairs.iter().map(|p| p.target_item.clone()).collect();
            target_items.shuffle(rng);
            PlayableKind::Matching {
                source_items,
                target_items,
            }
        }
    };

    PlayableQuestion {
        id: question.id,
        text: question.text.clone(),
        kind,
    }
}
