//! Core application primitives (engine, scheduler, HTTP surface)

pub mod engine;
pub mod http;
pub mod scheduler;

pub use engine::{CycleEngine, CycleEngineBuilder, EngineConfig, EngineState};
pub use http::{create_router, start_server, AppState};
pub use scheduler::CycleScheduler;
