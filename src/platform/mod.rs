pub mod fullscreen;

pub use fullscreen::{FullscreenController, NoopFullscreen, PageFullscreen};
