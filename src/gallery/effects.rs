use std::fmt;

use rand::Rng;
use rand::seq::IndexedRandom;

/// Named entrance/highlight effects a card can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Animation {
    Entering,
    Popup,
    Spin,
    Zoom,
    Swing,
    Float,
    Bounce,
    Flip,
    Rotate,
}

impl Animation {
    pub const ALL: [Self; 9] = [
        Self::Entering,
        Self::Popup,
        Self::Spin,
        Self::Zoom,
        Self::Swing,
        Self::Float,
        Self::Bounce,
        Self::Flip,
        Self::Rotate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entering => "entering",
            Self::Popup => "popup",
            Self::Spin => "spin",
            Self::Zoom => "zoom",
            Self::Swing => "swing",
            Self::Float => "float",
            Self::Bounce => "bounce",
            Self::Flip => "flip",
            Self::Rotate => "rotate",
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        *Self::ALL.choose(rng).unwrap_or(&Self::Entering)
    }
}

impl fmt::Display for Animation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which transient animation map an entry lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationSlot {
    /// Played once when a photo is first seen.
    Arrival,
    /// Played on a random card every so often.
    Highlight,
}

/// Decorative image drifting across the wall, independent of the carousel.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatingOverlay {
    pub id: String,
    pub url: String,
    /// Horizontal position in viewport percent, 0–100.
    pub left: f32,
    /// Seconds before the drift starts.
    pub delay: f32,
    /// Seconds one drift takes.
    pub duration: f32,
}

impl FloatingOverlay {
    pub fn new<R: Rng + ?Sized>(id: String, url: String, rng: &mut R) -> Self {
        Self {
            id,
            url,
            left: rng.random_range(0.0..100.0),
            delay: rng.random_range(0.0..20.0),
            duration: rng.random_range(20.0..40.0),
        }
    }
}

/// Ambient gold particle; generated once per session.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub id: usize,
    pub left: f32,
    pub delay: f32,
}

pub fn particles<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<Particle> {
    (0..count)
        .map(|id| Particle {
            id,
            left: rng.random_range(0.0..100.0),
            delay: rng.random_range(0.0..15.0),
        })
        .collect()
}
