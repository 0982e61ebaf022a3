//! The `Engine`/`Session` adapter traits, the block-tree download
//! coordinator, its configuration, and upcall surface.

mod config;
mod coordinator;
mod engine;
mod error;
mod state;
mod upcall;

pub use config::CoordinatorConfig;
pub use coordinator::{spawn, CoordinatorHandle};
pub use engine::{Engine, LoopbackEngine, LoopbackSession, RawBlock, Session};
pub use error::CoordinatorError;
pub use upcall::{Command, ResourceUpdateKind, ResourceUpdated};
