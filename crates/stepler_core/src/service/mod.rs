//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate timeline rules and repository calls into use-case APIs.
//! - Keep UI/CLI hosts decoupled from storage details.

pub mod timeline_service;
