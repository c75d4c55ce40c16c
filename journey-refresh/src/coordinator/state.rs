//! Observable session state.

use std::collections::BTreeSet;

use crate::domain::{DateTimeSelection, Journey, TransportMode};

/// Where a session is in its fetch lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// No trip loaded yet.
    #[default]
    Idle,
    /// A fetch for the current context is pending or running.
    Loading,
    /// The last fetch succeeded.
    Ready,
    /// The last fetch failed; the previous journeys are still cached.
    Failed { reason: String },
}

/// What the UI layer observes.
#[derive(Debug, Clone, PartialEq)]
pub enum JourneyListState {
    /// No trip loaded yet.
    Idle,
    /// Loading with nothing to show yet.
    Loading,
    /// Journeys sorted by departure, with fresh display texts.
    Ready(Vec<Journey>),
    /// The last fetch succeeded but there is nothing to show.
    NoJourneys,
    /// The last fetch failed. `journeys` is the last known good list.
    Failed {
        reason: String,
        journeys: Vec<Journey>,
    },
}

impl JourneyListState {
    /// Journeys currently on screen, whatever the state.
    pub fn journeys(&self) -> &[Journey] {
        match self {
            JourneyListState::Ready(journeys) => journeys,
            JourneyListState::Failed { journeys, .. } => journeys,
            _ => &[],
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, JourneyListState::Ready(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, JourneyListState::Failed { .. })
    }
}

/// A user action that forces a refetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExplicitTrigger {
    /// Swap origin and destination. Replaces the context.
    Reverse,
    /// Pick a date/time, or clear it to depart now. Replaces the context.
    DateTimeChanged(Option<DateTimeSelection>),
    /// Change excluded modes. Keeps the cache so journeys underway stay
    /// eligible for retention.
    ModeFilterChanged(BTreeSet<TransportMode>),
}
