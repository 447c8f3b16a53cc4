//! Round state and core simulation types
//!
//! Everything a round owns lives here and is discarded on restart.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::milestone::MilestoneTracker;
use crate::settings::PhysicsConfig;

/// Top-level mode of a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Idle: bird centered, no pipes, waiting for the start command
    Start,
    /// Physics active, flap input accepted
    Playing,
    /// Physics frozen, final score latched
    Ended,
}

/// Why a round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndCause {
    /// Hit the pipe with this id
    Pipe(u32),
    /// Crossed the top of the playable band
    Ceiling,
    /// Crossed the bottom of the playable band
    Ground,
}

/// Events emitted by a round step, consumed by collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Start -> Playing
    RoundStarted,
    /// Ended -> Start
    RoundReset,
    /// Jump impulse applied
    Flapped,
    /// New pipe entered at the right edge
    PipeSpawned { id: u32, top_height: i32 },
    /// Score incremented (reported on every increment)
    Scored { score: u32 },
    /// Score crossed a configured threshold (fires once per round)
    Milestone { threshold: u32 },
    /// Playing -> Ended
    RoundEnded { final_score: u32, cause: EndCause },
}

/// The playable entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bird {
    /// Center; `x` is fixed for the whole round
    pub pos: Vec2,
    /// Vertical velocity (positive is downward)
    pub vel: f32,
    pub radius: f32,
}

impl Bird {
    /// Bird at the vertical midpoint of the playable band, at rest
    pub fn centered(physics: &PhysicsConfig) -> Self {
        Self {
            pos: Vec2::new(physics.bird_x(), physics.play_height() / 2.0),
            vel: 0.0,
            radius: physics.bird_radius,
        }
    }

    pub fn left(&self) -> f32 {
        self.pos.x - self.radius
    }

    pub fn right(&self) -> f32 {
        self.pos.x + self.radius
    }

    pub fn top(&self) -> f32 {
        self.pos.y - self.radius
    }

    pub fn bottom(&self) -> f32 {
        self.pos.y + self.radius
    }

    /// Semi-implicit Euler: velocity first, then position
    pub fn integrate(&mut self, gravity: f32) {
        self.vel += gravity;
        self.pos.y += self.vel;
    }
}

/// A gated obstacle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pipe {
    pub id: u32,
    /// Leading (left) edge
    pub x: f32,
    pub width: f32,
    /// Bottom of the upper pipe
    pub top_height: i32,
    pub gap: i32,
    /// Set once the bird has cleared this pipe
    pub scored: bool,
}

impl Pipe {
    pub fn left(&self) -> f32 {
        self.x
    }

    /// Trailing edge
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Top of the lower pipe
    pub fn gap_bottom(&self) -> i32 {
        self.top_height + self.gap
    }
}

/// Owned per-frame view for presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub phase: GamePhase,
    pub bird_pos: Vec2,
    pub bird_vel: f32,
    pub pipes: Vec<Pipe>,
    pub score: u32,
    pub frame: u64,
}

/// Complete round state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Current phase
    pub phase: GamePhase,
    /// The playable entity
    pub bird: Bird,
    /// Active pipes in spawn order (= left to right)
    pub pipes: Vec<Pipe>,
    /// Score for this round
    pub score: u32,
    /// Latched when the round ends
    pub final_score: Option<u32>,
    /// Frames stepped while playing
    pub frame_count: u64,
    /// Milestone thresholds and which have fired this round
    pub milestones: MilestoneTracker,
    /// Tuning this round runs with
    pub physics: PhysicsConfig,
    /// Next pipe ID
    next_id: u32,
}

impl GameState {
    /// Fresh state in `Start` with the given milestone thresholds
    pub fn new(physics: PhysicsConfig, thresholds: Vec<u32>) -> Self {
        Self {
            phase: GamePhase::Start,
            bird: Bird::centered(&physics),
            pipes: Vec::new(),
            score: 0,
            final_score: None,
            frame_count: 0,
            milestones: MilestoneTracker::new(thresholds),
            physics,
            next_id: 1,
        }
    }

    /// Discard everything round-scoped
    pub fn reset_round(&mut self) {
        self.bird = Bird::centered(&self.physics);
        self.pipes.clear();
        self.score = 0;
        self.final_score = None;
        self.frame_count = 0;
        self.milestones.reset();
    }

    /// Allocate a new pipe ID
    pub fn next_pipe_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Push a pipe at `x` with the given gap top
    pub fn push_pipe(&mut self, x: f32, top_height: i32) -> u32 {
        let id = self.next_pipe_id();
        self.pipes.push(Pipe {
            id,
            x,
            width: self.physics.pipe_width,
            top_height,
            gap: self.physics.pipe_gap,
            scored: false,
        });
        id
    }

    pub fn is_playing(&self) -> bool {
        self.phase == GamePhase::Playing
    }

    /// Presentation snapshot of the current frame
    pub fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot {
            phase: self.phase,
            bird_pos: self.bird.pos,
            bird_vel: self.bird.vel,
            pipes: self.pipes.clone(),
            score: self.score,
            frame: self.frame_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_idle_and_centered() {
        let physics = PhysicsConfig::default();
        let state = GameState::new(physics.clone(), vec![10]);
        assert_eq!(state.phase, GamePhase::Start);
        assert_eq!(state.bird.pos.y, physics.play_height() / 2.0);
        assert_eq!(state.bird.pos.x, physics.bird_x());
        assert_eq!(state.bird.vel, 0.0);
        assert!(state.pipes.is_empty());
    }

    #[test]
    fn test_bird_integrate_semi_implicit() {
        let mut bird = Bird::centered(&PhysicsConfig::default());
        let y0 = bird.pos.y;
        bird.integrate(0.5);
        assert_eq!(bird.vel, 0.5);
        assert_eq!(bird.pos.y, y0 + 0.5);
        bird.integrate(0.5);
        assert_eq!(bird.vel, 1.0);
        assert_eq!(bird.pos.y, y0 + 1.5);
    }

    #[test]
    fn test_pipe_ids_increase() {
        let mut state = GameState::new(PhysicsConfig::default(), Vec::new());
        let a = state.push_pipe(100.0, 80);
        let b = state.push_pipe(200.0, 90);
        assert!(b > a);
        assert_eq!(state.pipes[1].gap_bottom(), 90 + state.physics.pipe_gap);
    }

    #[test]
    fn test_reset_round_discards_pipes() {
        let mut state = GameState::new(PhysicsConfig::default(), Vec::new());
        state.push_pipe(100.0, 80);
        state.score = 7;
        state.frame_count = 123;
        state.final_score = Some(7);
        state.reset_round();
        assert!(state.pipes.is_empty());
        assert_eq!(state.score, 0);
        assert_eq!(state.frame_count, 0);
        assert_eq!(state.final_score, None);
    }
}
