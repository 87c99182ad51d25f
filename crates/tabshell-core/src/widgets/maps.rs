//! Map viewer of the maps tab.

use std::cell::Cell;
use std::rc::Rc;

use futures_util::FutureExt;
use futures_util::future::LocalBoxFuture;

use crate::document::Document;
use crate::widget::{Widget, WidgetError};

/// Element the map renders into.
pub const MAP_CONTAINER_ID: &str = "map";

/// Tile source used when none is configured.
pub const DEFAULT_TILES_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Points the map container at a tile source.
pub struct MapWidget {
    document: Rc<dyn Document>,
    tiles_url: String,
    live: Cell<bool>,
}

impl MapWidget {
    #[must_use]
    pub fn new(document: Rc<dyn Document>, tiles_url: Option<String>) -> Self {
        Self {
            document,
            tiles_url: tiles_url.unwrap_or_else(|| DEFAULT_TILES_URL.to_owned()),
            live: Cell::new(false),
        }
    }

    #[must_use]
    pub fn tiles_url(&self) -> &str {
        &self.tiles_url
    }
}

impl Widget for MapWidget {
    fn initialize(&self) -> LocalBoxFuture<'_, Result<(), WidgetError>> {
        let result = if self.live.get() {
            Ok(())
        } else if self.document.set_text(MAP_CONTAINER_ID, &self.tiles_url) {
            self.live.set(true);
            Ok(())
        } else {
            Err(WidgetError::init(format!(
                "Map container #{MAP_CONTAINER_ID} not found"
            )))
        };
        async move { result }.boxed_local()
    }

    fn teardown(&self) {
        self.live.set(false);
    }
}
