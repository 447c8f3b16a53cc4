//! Collision tests between the bird and the world
//!
//! The bird is treated as its bounding square; pipes are two rectangles
//! separated by a vertical gap.

use super::state::{Bird, EndCause, Pipe};

/// Open-interval overlap of two spans on one axis
#[inline]
pub fn spans_overlap(a_min: f32, a_max: f32, b_min: f32, b_max: f32) -> bool {
    a_max > b_min && a_min < b_max
}

/// True when the bird is horizontally inside the pipe and vertically outside its gap
pub fn bird_hits_pipe(bird: &Bird, pipe: &Pipe) -> bool {
    if !spans_overlap(bird.left(), bird.right(), pipe.left(), pipe.right()) {
        return false;
    }
    bird.top() < pipe.top_height as f32 || bird.bottom() > pipe.gap_bottom() as f32
}

/// True once the pipe's trailing edge is behind the bird's leading edge
#[inline]
pub fn bird_cleared_pipe(bird: &Bird, pipe: &Pipe) -> bool {
    bird.left() > pipe.right()
}

/// Check the bird against the top and bottom of the playable band
pub fn bird_out_of_bounds(bird: &Bird, play_height: f32) -> Option<EndCause> {
    if bird.top() <= 0.0 {
        Some(EndCause::Ceiling)
    } else if bird.bottom() >= play_height {
        Some(EndCause::Ground)
    } else {
        None
    }
}
