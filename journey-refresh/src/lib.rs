//! Live refresh of a transit trip's journey list.
//!
//! Answers: "which services can take me from here to there, and when do
//! they leave?", and keeps the answer current while someone is looking.
//! A rider already on board keeps seeing their journey after the backend
//! stops reporting it.

pub mod clock;
pub mod coordinator;
pub mod domain;
pub mod fetcher;
pub mod projector;
pub mod rate_limit;
pub mod reconcile;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;
