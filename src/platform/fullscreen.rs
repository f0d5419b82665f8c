/// Whole-document fullscreen, supplied by whatever hosts the wall.
pub trait FullscreenController: Send + 'static {
    fn enter(&mut self);
    fn exit(&mut self);
    fn is_active(&self) -> bool;
}

/// Keys that toggle fullscreen on the wall page.
pub fn is_toggle_key(key: &str) -> bool {
    matches!(key, "f" | "F11")
}

/// Flips the controller and reports the resulting state.
pub fn toggle<C: FullscreenController + ?Sized>(controller: &mut C) -> bool {
    if controller.is_active() {
        controller.exit();
    } else {
        controller.enter();
    }
    controller.is_active()
}

/// Controller for the browser page: the requested state travels with each
/// frame and the page script applies it to `document`.
#[derive(Debug, Default)]
pub struct PageFullscreen {
    active: bool,
}

impl FullscreenController for PageFullscreen {
    fn enter(&mut self) {
        self.active = true;
    }

    fn exit(&mut self) {
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// Hosts without a fullscreen notion.
#[derive(Debug, Default)]
pub struct NoopFullscreen;

impl FullscreenController for NoopFullscreen {
    fn enter(&mut self) {}

    fn exit(&mut self) {}

    fn is_active(&self) -> bool {
        false
    }
}
