//! Deterministic round simulation
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed per-frame constants only
//! - Injected RNG only
//! - Stable iteration order (pipe spawn order)
//! - No rendering, sound or platform dependencies

pub mod collision;
pub mod milestone;
pub mod state;
pub mod tick;

pub use collision::{bird_cleared_pipe, bird_hits_pipe, bird_out_of_bounds, spans_overlap};
pub use milestone::MilestoneTracker;
pub use state::{Bird, EndCause, FrameSnapshot, GameEvent, GamePhase, GameState, Pipe};
pub use tick::{TickInput, begin, flap, restart, sample_gap_top, tick};
