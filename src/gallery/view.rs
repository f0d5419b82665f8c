//! Presentation: a pure projection of [`GalleryState`] into what the page shows.

use std::fmt::Write as _;

use serde::Serialize;

use super::effects::{Animation, AnimationSlot, FloatingOverlay, Particle};
use super::state::GalleryState;

/// Visual slot of a carousel card relative to the current photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Center,
    Right(u8),
    Left(u8),
    Hidden,
}

impl Slot {
    pub fn css_class(&self) -> &'static str {
        match self {
            Self::Center => "center",
            Self::Right(1) => "right-1",
            Self::Right(2) => "right-2",
            Self::Right(_) => "right-3",
            Self::Left(1) => "left-1",
            Self::Left(2) => "left-2",
            Self::Left(_) => "left-3",
            Self::Hidden => "hidden",
        }
    }
}

/// Slot for `index` given the centered `current` index in a list of `len`.
///
/// Offsets 0..=3 to the right win over offsets to the left, so on short lists
/// a card that is both three right and three left shows on the right.
pub fn position(index: usize, current: usize, len: usize) -> Slot {
    if len == 0 {
        return Slot::Hidden;
    }
    let rel = (index % len + len - current % len) % len;
    match rel {
        0 => Slot::Center,
        1..=3 => Slot::Right(rel as u8),
        _ if rel == len - 1 => Slot::Left(1),
        _ if rel == len - 2 => Slot::Left(2),
        _ if rel == len - 3 => Slot::Left(3),
        _ => Slot::Hidden,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardView {
    pub id: String,
    pub name: String,
    pub url: String,
    pub slot: Slot,
    pub arrival: Option<Animation>,
    pub highlight: Option<Animation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThumbView {
    pub index: usize,
    pub id: String,
    pub name: String,
    pub url: String,
    pub active: bool,
}

/// Everything needed to draw the wall at one instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub photo_count: usize,
    pub current_index: usize,
    pub cards: Vec<CardView>,
    pub overlays: Vec<FloatingOverlay>,
    pub particles: Vec<Particle>,
    pub thumbnails: Vec<ThumbView>,
    pub loading: bool,
    pub error: Option<String>,
    pub fullscreen: bool,
}

/// HTML fragments pushed to the page, one per region.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedFrame {
    pub error: Option<String>,
    pub loading: bool,
    pub fullscreen: bool,
    pub counter: String,
    pub carousel: String,
    pub overlays: String,
    pub particles: String,
    pub thumbnails: String,
}

impl Frame {
    pub fn from_state(state: &GalleryState, thumbnail_count: usize, fullscreen: bool) -> Self {
        let photos = state.photos();
        let current = state.current_index();
        let cards = photos
            .iter()
            .enumerate()
            .map(|(index, photo)| CardView {
                id: photo.id.clone(),
                name: photo.name.clone(),
                url: photo.url.clone(),
                slot: position(index, current, photos.len()),
                arrival: state.animation(AnimationSlot::Arrival, &photo.id),
                highlight: state.animation(AnimationSlot::Highlight, &photo.id),
            })
            .collect();
        let thumbnails = photos
            .iter()
            .take(thumbnail_count)
            .enumerate()
            .map(|(index, photo)| ThumbView {
                index,
                id: photo.id.clone(),
                name: photo.name.clone(),
                url: photo.url.clone(),
                active: index == current,
            })
            .collect();
        Self {
            photo_count: photos.len(),
            current_index: current,
            cards,
            overlays: state.overlays().cloned().collect(),
            particles: state.particles().to_vec(),
            thumbnails,
            loading: state.is_loading(),
            error: state.error().map(str::to_string),
            fullscreen,
        }
    }

    /// `Photos: N | Current: i/N`, with `0/0` on an empty wall.
    pub fn counter(&self) -> String {
        let shown = if self.photo_count > 0 {
            self.current_index + 1
        } else {
            0
        };
        format!(
            "Photos: {} | Current: {}/{}",
            self.photo_count, shown, self.photo_count
        )
    }

    pub fn render(&self) -> RenderedFrame {
        RenderedFrame {
            error: self.error.clone(),
            loading: self.loading,
            fullscreen: self.fullscreen,
            counter: escape_html(&self.counter()),
            carousel: self.render_carousel(),
            overlays: self.render_overlays(),
            particles: self.render_particles(),
            thumbnails: self.render_thumbnails(),
        }
    }

    fn render_carousel(&self) -> String {
        let mut out = String::new();
        for card in &self.cards {
            let mut class = format!("glass-card {}", card.slot.css_class());
            for anim in [card.arrival, card.highlight].into_iter().flatten() {
                class.push(' ');
                class.push_str(anim.as_str());
            }
            write!(
                out,
                "<div class=\"{}\" data-key=\"{}\"><div class=\"photo-container\"><img src=\"{}\" alt=\"{}\" loading=\"lazy\"></div></div>",
                class,
                escape_html(&card.id),
                escape_html(&card.url),
                escape_html(&card.name)
            )
            .ok();
        }
        out
    }

    fn render_overlays(&self) -> String {
        let mut out = String::new();
        for overlay in &self.overlays {
            write!(
                out,
                "<div class=\"floating-photo\" data-key=\"{}\" style=\"left: {:.2}vw; animation-delay: {:.2}s; animation-duration: {:.2}s;\"><img src=\"{}\" alt=\"\" loading=\"lazy\"></div>",
                escape_html(&overlay.id),
                overlay.left,
                overlay.delay,
                overlay.duration,
                escape_html(&overlay.url)
            )
            .ok();
        }
        out
    }

    fn render_particles(&self) -> String {
        let mut out = String::new();
        for particle in &self.particles {
            write!(
                out,
                "<div class=\"gold-particle\" data-key=\"p{}\" style=\"left: {:.2}vw; animation-delay: {:.2}s;\"></div>",
                particle.id, particle.left, particle.delay
            )
            .ok();
        }
        out
    }

    fn render_thumbnails(&self) -> String {
        let mut out = String::new();
        for thumb in &self.thumbnails {
            let class = if thumb.active {
                "preview-thumb active"
            } else {
                "preview-thumb"
            };
            write!(
                out,
                "<div class=\"{}\" data-key=\"{}\" data-select=\"{}\"><img src=\"{}\" alt=\"{}\" loading=\"lazy\"></div>",
                class,
                escape_html(&thumb.id),
                thumb.index,
                escape_html(&thumb.url),
                escape_html(&thumb.name)
            )
            .ok();
        }
        out
    }
}

pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::state::GalleryLimits;
    use crate::proxy::{PhotoDescriptor, image_url};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn listing(ids: &[&str]) -> Vec<PhotoDescriptor> {
        ids.iter()
            .map(|id| PhotoDescriptor {
                id: id.to_string(),
                name: format!("{id} <raw>.jpg"),
                mime_type: "image/jpeg".to_string(),
                modified_time: "2025-12-20T18:30:00Z".parse().expect("timestamp"),
                url: image_url(id),
            })
            .collect()
    }

    #[test]
    fn seven_card_window_around_index_two() {
        let classes: Vec<_> = (0..7).map(|i| position(i, 2, 7).css_class()).collect();
        assert_eq!(
            classes,
            vec![
                "left-2", "left-1", "center", "right-1", "right-2", "right-3", "left-3"
            ]
        );
    }

    #[test]
    fn cards_beyond_three_either_side_are_hidden() {
        assert_eq!(position(4, 0, 10), Slot::Hidden);
        assert_eq!(position(6, 0, 10), Slot::Hidden);
        assert_eq!(position(7, 0, 10), Slot::Left(3));
        assert_eq!(position(9, 0, 10), Slot::Left(1));
        assert_eq!(position(0, 0, 0), Slot::Hidden);
    }

    #[test]
    fn short_lists_prefer_right_slots() {
        assert_eq!(position(1, 0, 2), Slot::Right(1));
        assert_eq!(position(2, 0, 3), Slot::Right(2));
        assert_eq!(position(0, 0, 1), Slot::Center);
    }

    #[test]
    fn frame_tracks_state_and_escapes_names() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut state = GalleryState::new(GalleryLimits::default(), Vec::new());
        let empty = Frame::from_state(&state, 15, false);
        assert!(empty.loading);
        assert_eq!(empty.counter(), "Photos: 0 | Current: 0/0");

        state.apply_listing(listing(&["a", "b", "c"]), &mut rng);
        state.advance();
        let frame = Frame::from_state(&state, 2, true);
        assert_eq!(frame.counter(), "Photos: 3 | Current: 2/3");
        assert_eq!(frame.thumbnails.len(), 2);
        assert!(frame.thumbnails[1].active);
        assert!(frame.cards[0].arrival.is_some());

        let rendered = frame.render();
        assert!(rendered.fullscreen);
        assert!(rendered.carousel.contains("glass-card center"));
        assert!(rendered.carousel.contains("a &lt;raw&gt;.jpg"));
        assert!(rendered.thumbnails.contains("data-select=\"1\""));
        assert!(!rendered.carousel.contains("<raw>"));
    }
}
