//! # Components
//!
//! The two pieces of state a training loop keeps around between steps.
//!
//! ## Replay Memory
//!
//! The [`ReplayMemory`] struct stores [`Transition`]s in a fixed-size ring.
//! Training steps either draw uniform random samples from it (typically in
//! off-policy algorithms) or [`ReplayMemory::pull`] everything collected so
//! far, which empties it.
//!
//! ## Normalizer
//!
//! The [`Normalizer`] struct keeps running per-element statistics of the
//! observation stream (Welford's algorithm) and uses them to clip and
//! standardize observations before they reach a network.

mod normalizer;
mod replay_memory;

pub use normalizer::Normalizer;
pub use replay_memory::{
    Batch,
    ReplayMemory,
    Transition,
};
