// Cover letter + resume bullet generation.
// Implements: input sanitization, prompt building, request orchestration, HTTP handler.
// All provider calls go through llm_client; nothing here talks to Gemini directly.

pub mod handlers;
pub mod orchestrator;
pub mod prompts;
pub mod sanitizer;
