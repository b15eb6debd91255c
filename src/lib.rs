pub mod config;
pub mod context;
pub mod engine;
pub mod storage;

pub use context::{CursorPosition, GazeContext, SharedContext};
pub use engine::corrector::{CorrectionEngine, EngineEvent};
pub use engine::sample::{Sample, Shift};
