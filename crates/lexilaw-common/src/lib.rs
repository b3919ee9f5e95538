pub mod comparison;
pub mod config;
pub mod dictionary;
pub mod error;
pub mod gemini;
pub mod model;
pub mod prompts;
pub mod session;
