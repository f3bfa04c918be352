use arboard::Clipboard;
use tracing::{info, warn};

/// Best-effort copy of the share link. Headless machines have no
/// clipboard; that must never fail the upload.
pub fn copy(text: &str) {
    match Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text.to_string())) {
        Ok(()) => info!("link copied to clipboard"),
        Err(e) => warn!("clipboard copy failed: {e}"),
    }
}
