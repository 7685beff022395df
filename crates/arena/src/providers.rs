pub mod anthropic;
pub mod base;
pub mod factory;
pub mod fallback;
pub mod hints;
pub mod openai;
pub mod openrouter;
pub mod stream;
