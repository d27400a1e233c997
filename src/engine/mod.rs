// src/engine/mod.rs
//
// Pure question logic: answer-redacted projection and grading.

pub mod grading;
pub mod playable;
