use tokio::sync::oneshot;

/// User input forwarded from the page to the wall session.
#[derive(Debug)]
pub enum WallCommand {
    /// Thumbnail click.
    Select(usize),
    /// Manual advance to the next photo.
    Advance,
    /// Key press; replies with the fullscreen state after handling it.
    Key {
        key: String,
        reply: oneshot::Sender<bool>,
    },
}
