//! # LabBot Engine
//!
//! The answer pipeline. A question runs through an ordered list of
//! [`AnswerStage`]s — vector RAG, keyword search against the source API,
//! static keyword knowledge — and the first stage that produces an answer
//! wins. A stage error is logged and treated as "no answer"; when every
//! stage comes up empty a fixed apology is returned. `handle_question`
//! never surfaces an error to the chat adapter.

pub mod engine;
pub mod keyword_search;
pub mod knowledge;
pub mod prompt;
pub mod rag;
pub mod stage;

pub use engine::{clean_message, format_reply, Engine, EngineStats};
pub use keyword_search::KeywordSearchStage;
pub use knowledge::{KnowledgeEntry, StaticKnowledgeStage};
pub use rag::RagStage;
pub use stage::{run_stages, AnswerStage, StageAnswer};
