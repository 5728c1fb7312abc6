//! Typed records for every value that crosses a component boundary.
//!
//! Dynamic config objects become explicit typed records rather than open
//! maps (NewsAgent §9): this catches a missing prompt or a malformed
//! envelope at load/parse time instead of at the stage that needed the
//! missing field.

mod article;
mod job;
mod prompt;
mod source;
mod workflow_state;

pub use article::{Article, EmbeddedLink, Seo, SummaryAttempt, ValidationResult};
pub use job::{JobEnvelope, JobStatus, JobStatusRecord};
pub use prompt::{AgentPrompts, Category, EmailRecipient, Prompt, PromptStatus};
pub use source::{DiscoveredArticle, DiscoveredArticleStatus, Source};
pub use workflow_state::WorkflowState;
