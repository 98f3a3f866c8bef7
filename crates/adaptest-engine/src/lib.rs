//! Adaptest Engine
//!
//! Adaptive question selection, timed section sessions, scoring and full
//! mock exam orchestration.

pub mod config;
pub mod driver;
pub mod error;
pub mod mock;
pub mod pool;
pub mod question;
pub mod scoring;
pub mod selector;
pub mod session;
pub mod sink;
pub mod timer;

pub use config::{EngineConfig, SectionRule, SectionRules, CONFIG_FILE_NAME};
pub use driver::{LiveSection, LiveSectionHandle};
pub use error::{EngineError, Result};
pub use mock::{MockOrchestrator, MockProgress, MockSession};
pub use pool::{InMemoryPool, PoolSummary, QuestionPool, SectionCounts};
pub use question::{AnsweredRecord, Difficulty, QuestionDescriptor, Section};
pub use scoring::{
    quick_scaled_score, scaled_score_from_accuracy, total_scaled_score, weighted_totals, Graded,
    GradedAnswer, ScoreResult, SectionScore, WeightedTotals,
};
pub use selector::{select_next, Selection};
pub use session::{
    AnswerOutcome, CompletionReason, SectionResult, SectionSession, SessionSnapshot, SessionStatus,
    TickOutcome,
};
pub use sink::{MemorySink, NoopSink, ResultPayload, ResultSink, MOCK_TEST_TYPE};
pub use timer::SectionTimer;
