//! Per-frame round step and phase commands
//!
//! Core game loop that advances a round one frame at a time. Nothing here
//! blocks or performs I/O; every step returns the events it produced.

use rand::Rng;

use super::collision::{bird_cleared_pipe, bird_hits_pipe, bird_out_of_bounds};
use super::state::{EndCause, GameEvent, GamePhase, GameState};
use crate::settings::PhysicsConfig;

/// Input commands for a single frame
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Jump impulse (key, click or tap since the last frame)
    pub flap: bool,
}

/// Start -> Playing. Ignored in any other phase.
pub fn begin(state: &mut GameState) -> Vec<GameEvent> {
    if state.phase != GamePhase::Start {
        return Vec::new();
    }
    state.reset_round();
    state.phase = GamePhase::Playing;
    log::debug!("Round started");
    vec![GameEvent::RoundStarted]
}

/// Ended -> Start. Ignored in any other phase.
pub fn restart(state: &mut GameState) -> Vec<GameEvent> {
    if state.phase != GamePhase::Ended {
        return Vec::new();
    }
    state.reset_round();
    state.phase = GamePhase::Start;
    vec![GameEvent::RoundReset]
}

/// Apply the jump impulse. Ignored unless playing.
pub fn flap(state: &mut GameState) -> Vec<GameEvent> {
    if !state.is_playing() {
        return Vec::new();
    }
    state.bird.vel = state.physics.jump_velocity;
    vec![GameEvent::Flapped]
}

/// Sample a gap top so the whole gap sits inside the playable band with at
/// least `min_pipe_height` of pipe on either side.
///
/// Degenerate tuning (gap too large for the band) centers the gap instead.
pub fn sample_gap_top<R: Rng + ?Sized>(physics: &PhysicsConfig, rng: &mut R) -> i32 {
    let play_height = physics.play_height() as i32;
    let lo = physics.min_pipe_height;
    let hi = play_height - physics.pipe_gap - physics.min_pipe_height;
    if hi < lo {
        return ((play_height - physics.pipe_gap) / 2).max(0);
    }
    rng.random_range(lo..=hi)
}

/// Advance the round by one frame
pub fn tick<R: Rng + ?Sized>(state: &mut GameState, input: &TickInput, rng: &mut R) -> Vec<GameEvent> {
    let mut events = Vec::new();

    if !state.is_playing() {
        return events;
    }

    if input.flap {
        events.extend(flap(state));
    }

    // Integrate
    let gravity = state.physics.gravity;
    state.bird.integrate(gravity);

    // Spawn on cadence
    state.frame_count += 1;
    let cadence = state.physics.pipe_spawn_frames.max(1);
    if state.frame_count % cadence == 0 {
        let top_height = sample_gap_top(&state.physics, rng);
        let x = state.physics.view_width;
        let id = state.push_pipe(x, top_height);
        events.push(GameEvent::PipeSpawned { id, top_height });
    }

    // Scroll
    let speed = state.physics.pipe_speed;
    for pipe in &mut state.pipes {
        pipe.x -= speed;
    }

    // Pipe collisions, first hit in spawn order wins
    let hit = state
        .pipes
        .iter()
        .find(|p| bird_hits_pipe(&state.bird, p))
        .map(|p| p.id);
    if let Some(id) = hit {
        events.push(end_round(state, EndCause::Pipe(id)));
        return events;
    }

    // Scoring
    for pipe in &mut state.pipes {
        if !pipe.scored && bird_cleared_pipe(&state.bird, pipe) {
            pipe.scored = true;
            state.score += 1;
            events.push(GameEvent::Scored { score: state.score });
        }
    }
    for threshold in state.milestones.check(state.score) {
        log::debug!("Milestone {threshold} reached");
        events.push(GameEvent::Milestone { threshold });
    }

    // Band bounds
    if let Some(cause) = bird_out_of_bounds(&state.bird, state.physics.play_height()) {
        events.push(end_round(state, cause));
        return events;
    }

    // Purge pipes that scrolled past the margin
    let cutoff = -state.physics.purge_margin;
    state.pipes.retain(|p| p.right() > cutoff);

    events
}

fn end_round(state: &mut GameState, cause: EndCause) -> GameEvent {
    state.phase = GamePhase::Ended;
    state.final_score = Some(state.score);
    log::info!("Round ended with score {} ({:?})", state.score, cause);
    GameEvent::RoundEnded {
        final_score: state.score,
        cause,
    }
}
