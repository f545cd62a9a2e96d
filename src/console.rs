//! Terminal stand-ins for the card list and the map.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use meteopin_core::MapInitError;
use meteopin_widgets::{
    Coordinate, MapAdapter, MarkerContent, MarkerId, Notice, PresentationAdapter, WidgetCard,
    WidgetId,
};
use parking_lot::Mutex;

/// Keeps the latest render and reports notices on stderr.
#[derive(Default)]
pub struct ConsolePresenter {
    cards: Mutex<Vec<WidgetCard>>,
    highlighted: Mutex<Option<WidgetId>>,
}

impl ConsolePresenter {
    /// Print the last rendered list to stdout.
    pub fn print(&self) {
        let cards = self.cards.lock();
        if cards.is_empty() {
            println!("No widgets yet. Add one with `meteopin add <LAT> <LON>`.");
            return;
        }

        let highlighted = *self.highlighted.lock();
        for card in cards.iter() {
            let marker = if Some(card.id) == highlighted { ">" } else { " " };
            println!("{} {}", marker, card);
            println!();
        }
    }
}

impl PresentationAdapter for ConsolePresenter {
    fn render(&self, cards: &[WidgetCard]) {
        *self.cards.lock() = cards.to_vec();
    }

    fn highlight(&self, id: WidgetId) {
        *self.highlighted.lock() = Some(id);
    }

    fn show_notice(&self, notice: &Notice) {
        match notice.widget {
            Some(id) => eprintln!("[widget {}] {}", id, notice.message),
            None => eprintln!("{}", notice.message),
        }
    }
}

/// Map that logs what a real map would draw.
#[derive(Default)]
pub struct ConsoleMap {
    next_marker: AtomicU64,
}

#[async_trait]
impl MapAdapter for ConsoleMap {
    async fn init(&self, center: Coordinate, zoom: u8) -> Result<(), MapInitError> {
        tracing::debug!(
            "Map ready at {:.4}, {:.4} (zoom {})",
            center.latitude,
            center.longitude,
            zoom
        );
        Ok(())
    }

    fn add_marker(&self, coordinate: Coordinate, content: &MarkerContent) -> MarkerId {
        let id = MarkerId(self.next_marker.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(
            "Marker {:?} at {:.4}, {:.4} [{}] {}",
            id,
            coordinate.latitude,
            coordinate.longitude,
            content.color,
            content.hint
        );
        id
    }

    fn remove_marker(&self, marker: MarkerId) {
        tracing::trace!("Marker {:?} removed", marker);
    }

    fn set_center(&self, center: Coordinate, zoom: u8) {
        tracing::info!(
            "Map centred on {:.4}, {:.4} at zoom {}",
            center.latitude,
            center.longitude,
            zoom
        );
    }

    fn open_marker_detail(&self, marker: MarkerId) {
        tracing::info!("Opened details for marker {:?}", marker);
    }
}
