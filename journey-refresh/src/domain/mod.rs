//! Domain types for the live journey refresher.
//!
//! This module contains the core domain model types that represent
//! validated trip-planning data. All types enforce their invariants at
//! construction time, so code that receives these types can trust their
//! validity.

mod context;
mod error;
mod journey;
mod mode;
mod stop;

pub use context::{DateTimeSelection, JourneyDirection, TripContext};
pub use error::DomainError;
pub use journey::{Journey, JourneyKey, Leg, LegStop, ServiceAlert, TransportLeg, WalkLeg};
pub use mode::TransportMode;
pub use stop::{InvalidStopId, StopId};
