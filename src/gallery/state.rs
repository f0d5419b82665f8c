use std::collections::{HashMap, HashSet, VecDeque};

use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::info;

use super::effects::{Animation, AnimationSlot, FloatingOverlay, Particle, particles};
use crate::config::GalleryConfig;
use crate::proxy::PhotoDescriptor;

#[derive(Debug, Clone, Copy)]
pub struct GalleryLimits {
    pub max_overlays: usize,
    pub seed_overlays: usize,
}

impl From<&GalleryConfig> for GalleryLimits {
    fn from(cfg: &GalleryConfig) -> Self {
        Self {
            max_overlays: cfg.max_overlays,
            seed_overlays: cfg.seed_overlays,
        }
    }
}

impl Default for GalleryLimits {
    fn default() -> Self {
        Self::from(&GalleryConfig::default())
    }
}

/// Photos first seen by one listing. Their arrival tags are live and need a
/// scheduled expiry.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Arrivals {
    pub ids: Vec<String>,
}

impl Arrivals {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// All state of one wall session.
///
/// Every timer tick, fetch completion, and user command is a method here; the
/// session task owns the only instance, so each transition starts from the
/// latest state.
#[derive(Debug)]
pub struct GalleryState {
    limits: GalleryLimits,
    photos: Vec<PhotoDescriptor>,
    known_ids: HashSet<String>,
    current_index: usize,
    overlays: VecDeque<FloatingOverlay>,
    particles: Vec<Particle>,
    arrival_animations: HashMap<String, Animation>,
    highlight_animations: HashMap<String, Animation>,
    loading: bool,
    error: Option<String>,
    next_overlay: u64,
}

impl GalleryState {
    pub fn new(limits: GalleryLimits, particles: Vec<Particle>) -> Self {
        Self {
            limits,
            photos: Vec::new(),
            known_ids: HashSet::new(),
            current_index: 0,
            overlays: VecDeque::new(),
            particles,
            arrival_animations: HashMap::new(),
            highlight_animations: HashMap::new(),
            loading: true,
            error: None,
            next_overlay: 0,
        }
    }

    pub fn from_config<R: Rng + ?Sized>(cfg: &GalleryConfig, rng: &mut R) -> Self {
        Self::new(cfg.into(), particles(cfg.particle_count, rng))
    }

    pub fn photos(&self) -> &[PhotoDescriptor] {
        &self.photos
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn overlays(&self) -> impl ExactSizeIterator<Item = &FloatingOverlay> {
        self.overlays.iter()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn animation(&self, slot: AnimationSlot, id: &str) -> Option<Animation> {
        self.animations(slot).get(id).copied()
    }

    pub fn animations(&self, slot: AnimationSlot) -> &HashMap<String, Animation> {
        match slot {
            AnimationSlot::Arrival => &self.arrival_animations,
            AnimationSlot::Highlight => &self.highlight_animations,
        }
    }

    pub fn is_known(&self, id: &str) -> bool {
        self.known_ids.contains(id)
    }

    pub fn known_count(&self) -> usize {
        self.known_ids.len()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Successful listing. Ids never seen before in this session get an
    /// arrival tag and an overlay; the photo list is replaced wholesale.
    pub fn apply_listing<R: Rng + ?Sized>(
        &mut self,
        photos: Vec<PhotoDescriptor>,
        rng: &mut R,
    ) -> Arrivals {
        let was_empty = self.photos.is_empty();
        let mut arrivals = Arrivals::default();
        for photo in &photos {
            if !self.known_ids.insert(photo.id.clone()) {
                continue;
            }
            self.arrival_animations
                .insert(photo.id.clone(), Animation::random(rng));
            self.add_overlay(photo.url.clone(), rng);
            arrivals.ids.push(photo.id.clone());
        }

        if !arrivals.is_empty() {
            info!(count = arrivals.ids.len(), "{} new photos added", arrivals.ids.len());
            self.current_index = 0;
        }

        self.photos = photos;
        if self.current_index >= self.photos.len() {
            self.current_index = 0;
        }
        if was_empty && !self.photos.is_empty() && self.overlays.len() < self.limits.seed_overlays
        {
            self.seed_overlays(rng);
        }
        self.loading = false;
        self.error = None;
        arrivals
    }

    pub fn record_failure(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.loading = false;
    }

    /// Appends an overlay, evicting from the front past the cap.
    pub fn add_overlay<R: Rng + ?Sized>(&mut self, url: String, rng: &mut R) {
        self.next_overlay += 1;
        let id = format!("float-{}", self.next_overlay);
        self.overlays.push_back(FloatingOverlay::new(id, url, rng));
        while self.overlays.len() > self.limits.max_overlays {
            self.overlays.pop_front();
        }
    }

    fn seed_overlays<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let seeded: VecDeque<FloatingOverlay> = self
            .photos
            .iter()
            .take(self.limits.seed_overlays)
            .enumerate()
            .map(|(i, photo)| FloatingOverlay::new(format!("init-{i}"), photo.url.clone(), rng))
            .collect();
        self.overlays = seeded;
        while self.overlays.len() > self.limits.max_overlays {
            self.overlays.pop_front();
        }
    }

    /// Float tick: with probability `chance`, one overlay for a random photo.
    pub fn maybe_float<R: Rng + ?Sized>(&mut self, chance: f64, rng: &mut R) -> bool {
        if self.photos.is_empty() || !rng.random_bool(chance) {
            return false;
        }
        let Some(url) = self.photos.choose(rng).map(|photo| photo.url.clone()) else {
            return false;
        };
        self.add_overlay(url, rng);
        true
    }

    /// Highlight tick: with probability `chance`, a random tag on a random
    /// photo. Returns the id whose highlight needs an expiry.
    pub fn maybe_highlight<R: Rng + ?Sized>(&mut self, chance: f64, rng: &mut R) -> Option<String> {
        if self.photos.is_empty() || !rng.random_bool(chance) {
            return None;
        }
        let id = self.photos.choose(rng)?.id.clone();
        self.highlight_animations
            .insert(id.clone(), Animation::random(rng));
        Some(id)
    }

    pub fn expire(&mut self, slot: AnimationSlot, id: &str) -> bool {
        let map = match slot {
            AnimationSlot::Arrival => &mut self.arrival_animations,
            AnimationSlot::Highlight => &mut self.highlight_animations,
        };
        map.remove(id).is_some()
    }

    /// Rotation tick. No-op on an empty wall.
    pub fn advance(&mut self) {
        if !self.photos.is_empty() {
            self.current_index = (self.current_index + 1) % self.photos.len();
        }
    }

    /// Thumbnail click. Out-of-range indices are ignored.
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.photos.len() {
            self.current_index = index;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn photo(id: &str) -> PhotoDescriptor {
        PhotoDescriptor {
            id: id.to_string(),
            name: format!("{id}.jpg"),
            mime_type: "image/jpeg".to_string(),
            modified_time: "2025-12-20T18:30:00Z".parse().expect("timestamp"),
            url: crate::proxy::image_url(id),
        }
    }

    fn listing(ids: &[&str]) -> Vec<PhotoDescriptor> {
        ids.iter().map(|id| photo(id)).collect()
    }

    fn state() -> GalleryState {
        GalleryState::new(GalleryLimits::default(), Vec::new())
    }

    #[test]
    fn first_listing_marks_everything_new_and_seeds_overlays() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut gallery = state();
        assert!(gallery.is_loading());

        let arrivals = gallery.apply_listing(listing(&["a", "b"]), &mut rng);
        assert_eq!(arrivals.ids, vec!["a", "b"]);
        assert_eq!(gallery.photos().len(), 2);
        assert_eq!(gallery.current_index(), 0);
        assert!(!gallery.is_loading());
        let ids: Vec<_> = gallery.overlays().map(|o| o.id.clone()).collect();
        assert_eq!(ids, vec!["init-0", "init-1"]);
    }

    #[test]
    fn novelty_is_measured_against_every_id_ever_seen() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut gallery = state();
        gallery.apply_listing(listing(&["a", "b"]), &mut rng);
        // "a" disappears for one poll, then comes back.
        assert!(gallery.apply_listing(listing(&["b"]), &mut rng).is_empty());
        assert!(gallery.is_known("a"));
        assert!(!gallery.is_known("c"));
        let arrivals = gallery.apply_listing(listing(&["c", "a", "b"]), &mut rng);
        assert_eq!(arrivals.ids, vec!["c"]);
        assert_eq!(gallery.known_count(), 3);
        assert!(gallery.is_known("c"));
    }

    #[test]
    fn growth_keeps_arrival_overlay_instead_of_reseeding() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut gallery = state();
        gallery.apply_listing(listing(&["a", "b"]), &mut rng);
        gallery.apply_listing(listing(&["c", "a", "b"]), &mut rng);
        let ids: Vec<_> = gallery.overlays().map(|o| o.id.clone()).collect();
        assert_eq!(ids, vec!["init-0", "init-1", "float-3"]);

        // Emptied then refilled: seeds again from the new list.
        gallery.apply_listing(Vec::new(), &mut rng);
        gallery.apply_listing(listing(&["d"]), &mut rng);
        let ids: Vec<_> = gallery.overlays().map(|o| o.id.clone()).collect();
        assert_eq!(ids, vec!["init-0"]);
    }

    #[test]
    fn known_ids_never_shrink() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut gallery = state();
        let mut previous = 0;
        let polls: [&[&str]; 5] = [&["a"], &["a", "b"], &[], &["c"], &["a"]];
        for ids in polls {
            gallery.apply_listing(listing(ids), &mut rng);
            assert!(gallery.known_count() >= previous);
            previous = gallery.known_count();
        }
        assert_eq!(previous, 3);
    }

    #[test]
    fn new_arrival_resets_index_and_gets_overlay_and_tag() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut gallery = state();
        gallery.apply_listing(listing(&["a", "b"]), &mut rng);
        gallery.advance();
        assert_eq!(gallery.current_index(), 1);

        let before = gallery.overlays().len();
        let arrivals = gallery.apply_listing(listing(&["c", "a", "b"]), &mut rng);
        assert_eq!(arrivals.ids, vec!["c"]);
        assert_eq!(gallery.current_index(), 0);
        assert_eq!(gallery.overlays().len(), before + 1);
        assert_eq!(
            gallery.overlays().last().map(|o| o.url.as_str()),
            Some("/api/image/c")
        );
        assert!(gallery.animation(AnimationSlot::Arrival, "c").is_some());
        assert!(gallery.expire(AnimationSlot::Arrival, "c"));
        assert!(!gallery.animations(AnimationSlot::Arrival).contains_key("c"));
    }

    #[test]
    fn unchanged_listing_keeps_index() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut gallery = state();
        gallery.apply_listing(listing(&["a", "b", "c"]), &mut rng);
        gallery.advance();
        gallery.advance();
        gallery.apply_listing(listing(&["a", "b", "c"]), &mut rng);
        assert_eq!(gallery.current_index(), 2);
    }

    #[test]
    fn overlay_cap_evicts_oldest() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut gallery = state();
        for n in 0..45 {
            gallery.add_overlay(format!("/api/image/{n}"), &mut rng);
            assert!(gallery.overlays().len() <= 30);
        }
        let first = gallery.overlays().next().map(|o| o.url.clone());
        assert_eq!(first.as_deref(), Some("/api/image/15"));
        assert_eq!(
            gallery.overlays().last().map(|o| o.url.as_str()),
            Some("/api/image/44")
        );
    }

    #[test]
    fn rotation_wraps_and_is_disabled_when_empty() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut gallery = state();
        gallery.advance();
        assert_eq!(gallery.current_index(), 0);

        gallery.apply_listing(listing(&["a", "b", "c"]), &mut rng);
        for expected in [1, 2, 0, 1] {
            gallery.advance();
            assert_eq!(gallery.current_index(), expected);
        }
        assert!(gallery.select(2));
        assert!(!gallery.select(3));
        assert_eq!(gallery.current_index(), 2);
    }

    #[test]
    fn shrinking_list_clamps_index() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut gallery = state();
        gallery.apply_listing(listing(&["a", "b", "c"]), &mut rng);
        gallery.select(2);
        gallery.apply_listing(listing(&["a"]), &mut rng);
        assert_eq!(gallery.current_index(), 0);
    }

    #[test]
    fn random_effects_respect_chance_and_emptiness() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut gallery = state();
        assert!(!gallery.maybe_float(1.0, &mut rng));
        assert!(gallery.maybe_highlight(1.0, &mut rng).is_none());

        gallery.apply_listing(listing(&["a", "b"]), &mut rng);
        let overlays = gallery.overlays().len();
        assert!(!gallery.maybe_float(0.0, &mut rng));
        assert!(gallery.maybe_float(1.0, &mut rng));
        assert_eq!(gallery.overlays().len(), overlays + 1);

        assert!(gallery.maybe_highlight(0.0, &mut rng).is_none());
        let id = gallery.maybe_highlight(1.0, &mut rng).expect("highlight");
        assert!(gallery.animation(AnimationSlot::Highlight, &id).is_some());
        assert!(gallery.expire(AnimationSlot::Highlight, &id));
        assert!(!gallery.expire(AnimationSlot::Highlight, &id));
    }

    #[test]
    fn failure_is_cleared_by_next_success() {
        let mut rng = StdRng::seed_from_u64(10);
        let mut gallery = state();
        gallery.record_failure("drive folder id is not configured");
        assert_eq!(gallery.error(), Some("drive folder id is not configured"));
        assert!(!gallery.is_loading());

        gallery.apply_listing(listing(&["a"]), &mut rng);
        assert!(gallery.error().is_none());
    }
}
