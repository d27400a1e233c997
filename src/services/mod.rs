// src/services/mod.rs

pub mod access;
pub mod attempts;
pub mod auth;
pub mod authoring;
