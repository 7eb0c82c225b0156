//! Agent runtime for the career twin.
//!
//! This crate turns a chat turn into a stream of growing response strings:
//! - `conversation` normalizes chat-surface history into [`twin_core::Turn`]s
//! - `agent` runs the tool-augmented model loop and reports [`agent::StreamEvent`]s
//! - `runtime` folds those events into the text the visitor sees
//! - `contact` validates, summarizes and mails contact requests
//! - `factory` builds the shared [`agent::Agent`] once at startup
//!
//! # Error absorption
//!
//! Only startup (`factory`) can fail. During a turn, model failures end in an
//! apology string and contact failures in a fallback message with a direct
//! address; no raw error reaches the visitor.

pub mod agent;
pub mod contact;
pub mod conversation;
pub mod factory;
pub mod gemini;
pub mod llm;
pub mod runtime;
pub mod tools;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use agent::{Agent, AgentSignal, StreamEvent};
pub use factory::{AgentFactory, FactoryError};
pub use runtime::{accumulate_responses, TurnOrchestrator, EMPTY_RESPONSE_APOLOGY};
