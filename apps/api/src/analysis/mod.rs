// Resume analysis: prompt building, the single LLM call, and normalization of the reply.
// All LLM calls go through llm_client; nothing here talks to Gemini directly.

pub mod handlers;
pub mod models;
pub mod normalizer;
pub mod pipeline;
pub mod prompts;
