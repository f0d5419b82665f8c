pub mod effects;
pub mod source;
pub mod state;
pub mod view;

pub use effects::{Animation, AnimationSlot, FloatingOverlay, Particle};
pub use source::{HttpSource, PhotoSource, ProxySource};
pub use state::{Arrivals, GalleryLimits, GalleryState};
pub use view::{Frame, RenderedFrame, Slot};
