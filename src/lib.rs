//! Intake gateway for a legal practice.
//!
//! Receives form submissions over HTTP, enriches each with a lead score,
//! pricing, tags, and an AI strategic analysis, and fans the enriched
//! record out to mail, marketing-list, task-management, and CRM
//! collaborators. No persistence: every request is processed end to end
//! and forgotten.

pub mod clients;
pub mod config;
pub mod emails;
pub mod error;
pub mod intake;
pub mod llm;
pub mod pipeline;
pub mod server;
