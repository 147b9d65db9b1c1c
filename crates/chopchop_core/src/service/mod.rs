//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store and gateway calls into use-case level APIs.
//! - Keep CLI/host layers decoupled from storage details.

pub mod priority_service;
pub mod reminder_service;
pub mod transfer;
pub mod trigger;
