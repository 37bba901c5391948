use std::sync::Arc;

use crate::studio::Studio;
use crate::ui;

pub struct AppState {
    pub studio: Arc<Studio>,
    page: String,
}

impl AppState {
    pub fn new(studio: Arc<Studio>) -> Self {
        let page = ui::render(studio.config().profile);
        Self { studio, page }
    }

    /// Rendered UI page for the configured profile
    pub fn page(&self) -> &str {
        &self.page
    }

    pub fn show_errors(&self) -> bool {
        self.studio.config().show_errors
    }
}
