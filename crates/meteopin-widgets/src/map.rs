//! Map markers kept index-aligned with the widget list.
//!
//! The map itself is an external collaborator behind [`MapAdapter`].
//! [`MarkerLayer`] owns the marker handles and rebuilds all of them on
//! every list change. If the map never becomes ready the layer stays
//! unavailable and every map call is skipped.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use meteopin_core::{MapConfig, MapInitError};
use meteopin_weather::IconCategory;
use parking_lot::Mutex;

use crate::observer::{ViewEvent, WidgetObserver};
use crate::widget::{Coordinate, Widget};

/// Centre used when there are no widgets
pub const DEFAULT_CENTER: Coordinate = Coordinate {
    latitude: 56.8389,
    longitude: 60.6057,
};

const MARKER_PALETTE: [&str; 8] = [
    "#9b87f5", "#6d5fd3", "#ff6b6b", "#4ecdc4", "#45b7d1", "#ffa726", "#7e57c2", "#26a69a",
];

/// Handle returned by the map for one placed marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerId(pub u64);

/// Pan/zoom/marker primitives of the external map widget.
#[async_trait]
pub trait MapAdapter: Send + Sync {
    /// Create the map. Resolves once it is ready to take markers.
    async fn init(&self, center: Coordinate, zoom: u8) -> Result<(), MapInitError>;

    fn add_marker(&self, coordinate: Coordinate, content: &MarkerContent) -> MarkerId;

    fn remove_marker(&self, marker: MarkerId);

    fn set_center(&self, center: Coordinate, zoom: u8);

    fn open_marker_detail(&self, marker: MarkerId);
}

/// Marker colour for the widget at `index` in the list
pub fn marker_color(index: usize) -> &'static str {
    MARKER_PALETTE[index % MARKER_PALETTE.len()]
}

/// Mean of all widget coordinates, or [`DEFAULT_CENTER`] for none.
pub fn map_center(widgets: &[Widget]) -> Coordinate {
    if widgets.is_empty() {
        return DEFAULT_CENTER;
    }
    let n = widgets.len() as f64;
    let (lat, lon) = widgets.iter().fold((0.0, 0.0), |(lat, lon), w| {
        (lat + w.latitude(), lon + w.longitude())
    });
    Coordinate {
        latitude: lat / n,
        longitude: lon / n,
    }
}

/// What a marker shows: its colour, hover hint and detail readings.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerContent {
    pub color: &'static str,
    pub hint: String,
    pub temperature: Option<i32>,
    pub description: Option<String>,
    pub humidity: Option<i32>,
    pub wind_speed: Option<f64>,
    pub icon: Option<IconCategory>,
}

impl MarkerContent {
    pub fn for_widget(widget: &Widget, index: usize) -> Self {
        let weather = widget.weather();
        let hint = match weather {
            Some(w) => format!("Weather: {}°C", w.temperature),
            None => "Weather: ...".to_string(),
        };
        Self {
            color: marker_color(index),
            hint,
            temperature: weather.map(|w| w.temperature),
            description: weather.map(|w| w.description.clone()),
            humidity: weather.map(|w| w.humidity),
            wind_speed: weather.map(|w| w.wind_speed),
            icon: weather.map(|w| w.icon),
        }
    }
}

#[derive(Debug, Default)]
struct LayerState {
    available: bool,
    markers: Vec<MarkerId>,
}

/// Marker projection of the widget list.
pub struct MarkerLayer {
    adapter: Arc<dyn MapAdapter>,
    init_timeout: Duration,
    default_zoom: u8,
    focus_zoom: u8,
    state: Mutex<LayerState>,
}

impl MarkerLayer {
    pub fn new(adapter: Arc<dyn MapAdapter>, config: &MapConfig) -> Self {
        Self {
            adapter,
            init_timeout: config.init_timeout(),
            default_zoom: config.default_zoom,
            focus_zoom: config.focus_zoom,
            state: Mutex::new(LayerState::default()),
        }
    }

    /// Bring the map up and place markers for `widgets`.
    ///
    /// Waits at most the configured init timeout. On failure the layer is
    /// left unavailable and the dashboard keeps working without it.
    pub async fn init(&self, widgets: &[Widget]) -> Result<(), MapInitError> {
        let center = map_center(widgets);
        let result = tokio::time::timeout(
            self.init_timeout,
            self.adapter.init(center, self.default_zoom),
        )
        .await
        .unwrap_or(Err(MapInitError::Timeout(self.init_timeout)));

        match result {
            Ok(()) => {
                self.state.lock().available = true;
                tracing::info!("Map initialized at {}, {}", center.latitude, center.longitude);
                self.rebuild(widgets);
                Ok(())
            }
            Err(e) => {
                self.state.lock().available = false;
                tracing::error!("Map initialization failed: {}", e);
                Err(e)
            }
        }
    }

    /// User-triggered second attempt after a failed [`init`](Self::init).
    pub async fn retry_init(&self, widgets: &[Widget]) -> Result<(), MapInitError> {
        if self.is_available() {
            tracing::debug!("Map already available, rebuilding markers");
            self.rebuild(widgets);
            return Ok(());
        }
        tracing::info!("Retrying map initialization");
        self.init(widgets).await
    }

    pub fn is_available(&self) -> bool {
        self.state.lock().available
    }

    /// Current marker handles, in widget order
    pub fn markers(&self) -> Vec<MarkerId> {
        self.state.lock().markers.clone()
    }

    /// Remove every marker and place one per widget.
    pub fn rebuild(&self, widgets: &[Widget]) {
        let mut state = self.state.lock();
        if !state.available {
            return;
        }

        for marker in state.markers.drain(..) {
            self.adapter.remove_marker(marker);
        }
        state.markers = widgets
            .iter()
            .enumerate()
            .map(|(index, w)| {
                self.adapter
                    .add_marker(w.coordinate(), &MarkerContent::for_widget(w, index))
            })
            .collect();

        if !widgets.is_empty() {
            self.adapter.set_center(map_center(widgets), self.default_zoom);
        }
        tracing::debug!("Rebuilt {} markers", state.markers.len());
    }

    /// Centre on one widget; optionally open its marker detail.
    pub fn focus(&self, widget: &Widget, index: usize, open_detail: bool) {
        let state = self.state.lock();
        if !state.available {
            return;
        }

        self.adapter.set_center(widget.coordinate(), self.focus_zoom);
        if open_detail {
            match state.markers.get(index) {
                Some(&marker) => self.adapter.open_marker_detail(marker),
                None => tracing::warn!("No marker at index {} for widget {}", index, widget.id()),
            }
        }
    }
}

impl WidgetObserver for MarkerLayer {
    fn on_event(&self, event: &ViewEvent<'_>) {
        match *event {
            ViewEvent::WidgetsChanged(widgets) => self.rebuild(widgets),
            ViewEvent::Focus {
                widget,
                index,
                open_detail,
            } => self.focus(widget, index, open_detail),
            ViewEvent::Notice(_) => {}
        }
    }
}
