//! "Yes" celebration
//!
//! A burst of hearts from the accept button followed by a short message.
//! Unrelated to the evasion sequence and never awaited by it.

use glam::Vec2;
use rand::Rng;

use crate::config;
use crate::motion::random_in_range;
use crate::platform::{Actor, Effects, Stage};

/// Outline and filled heart, picked evenly
pub const GLYPHS: [char; 2] = ['♡', '❤'];

/// One heart; CSS animates it from `origin` by `drift`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub glyph: char,
    pub origin: Vec2,
    pub drift: Vec2,
    /// Removed from the page after this long at the latest
    pub lifetime_ms: u32,
}

/// Hearts flung in random directions with an extra upward lift
pub fn burst<R: Rng>(origin: Vec2, count: usize, lifetime_ms: u32, rng: &mut R) -> Vec<Particle> {
    (0..count)
        .map(|_| {
            let glyph = if rng.random_bool(0.5) { GLYPHS[0] } else { GLYPHS[1] };
            let angle = random_in_range(rng, 0.0, std::f32::consts::TAU);
            let distance = random_in_range(rng, 40.0, 120.0);
            let lift = random_in_range(rng, 40.0, 90.0);
            Particle {
                glyph,
                origin,
                drift: Vec2::new(angle.cos() * distance, angle.sin() * distance - lift),
                lifetime_ms,
            }
        })
        .collect()
}

/// Handle a "Yes": hearts from the accept button, then the message.
/// Returns how many particles were released.
pub fn accept<S, R>(stage: &S, celebration: &config::Celebration, rng: &mut R) -> usize
where
    S: Stage + Effects,
    R: Rng,
{
    let released = match stage.rect_of(Actor::Accept) {
        Some(rect) => {
            let particles = burst(
                rect.center(),
                celebration.particles,
                celebration.particle_lifetime_ms,
                rng,
            );
            stage.release_particles(&particles);
            particles.len()
        }
        None => {
            log::warn!("No accept control on the page, skipping the heart burst");
            0
        }
    };
    stage.announce(&celebration.message, celebration.message_delay_ms);
    log::info!("Accepted! {} hearts released", released);
    released
}
