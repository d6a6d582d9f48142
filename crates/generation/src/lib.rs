//! LLM-backed generation: flashcards, practice exams, and tutor chat,
//! built on the retrieval primitives in `gurt-kb-retrieval` (spec §4.F).

pub mod chat;
pub mod flashcards;
pub mod json_extract;
pub mod model;
pub mod practice_exam;
pub mod safety;

pub use chat::{chat_answer, ChatAnswer};
pub use flashcards::{generate_flashcards, generate_flashcards_from_materials};
pub use model::{ContentBlock, LanguageModel, RetrieveAndGenerateResult, RetrievedReference};
pub use practice_exam::{generate_practice_exam, PracticeExam, PracticeExamQuestion};
pub use safety::GUARDRAIL_CHAT_ANSWER;
