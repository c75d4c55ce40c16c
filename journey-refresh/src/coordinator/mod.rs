//! Live refresh of a trip's journey list.
//!
//! [`RefreshCoordinator`] is the entry point. Everything else in this module
//! supports it: the single-writer [`Session`], the observer-counted
//! [`LoopSupervisor`], and the state types observers see.

mod config;
mod error;
mod refresh;
mod session;
mod state;
mod supervisor;


pub use config::RefreshConfig;
pub use error::CoordinatorError;
pub use refresh::{JourneyListSubscription, LoopKind, RefreshCoordinator};
pub use session::{CommitOutcome, Session};
pub use state::{ExplicitTrigger, JourneyListState, SessionPhase};
pub use supervisor::{LoopGuard, LoopSupervisor};
