//! Core domain types shared by every pipeline stage.

pub mod capture;
pub mod session;
pub mod task;
pub mod transcript;

pub use capture::{AudioCapture, MediaType};
pub use session::{Session, TaskSelection};
pub use task::{Category, ExtractedTask, PartialTask, Priority, TaskKind};
pub use transcript::Transcript;
