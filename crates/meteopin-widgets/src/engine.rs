//! Widget lifecycle: create, refresh, delete, clear and startup refresh.
//!
//! Every operation that mutates the store persists it and then notifies
//! observers with a snapshot of the full ordered list, so the card list and
//! the map markers are always rebuilt from the same data.

use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use futures::future::join_all;
use meteopin_core::{NetworkError, SingleFlight, ValidationError};
use meteopin_weather::{WeatherSnapshot, WeatherSource};
use parking_lot::{Mutex, RwLock};

use crate::observer::{Notice, ViewEvent, WidgetObserver};
use crate::policy::RefreshPolicy;
use crate::store::WidgetStore;
use crate::widget::{Coordinate, Reading, Widget, WidgetId};

/// Outcome of [`WidgetLifecycleEngine::bootstrap_refresh`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootstrapSummary {
    /// Stale widgets that got fresh data
    pub refreshed: usize,
    /// Stale widgets whose fetch failed
    pub failed: usize,
    /// Widgets whose cached reading was still fresh
    pub cached: usize,
}

pub struct WidgetLifecycleEngine {
    store: Mutex<WidgetStore>,
    source: Arc<dyn WeatherSource>,
    policy: RefreshPolicy,
    observers: RwLock<Vec<Arc<dyn WidgetObserver>>>,
    creating: SingleFlight,
}

impl WidgetLifecycleEngine {
    pub fn new(store: WidgetStore, source: Arc<dyn WeatherSource>, policy: RefreshPolicy) -> Self {
        Self {
            store: Mutex::new(store),
            source,
            policy,
            observers: RwLock::new(Vec::new()),
            creating: SingleFlight::new(),
        }
    }

    /// Register a view. It receives every subsequent event.
    pub fn subscribe(&self, observer: Arc<dyn WidgetObserver>) {
        self.observers.write().push(observer);
    }

    /// Snapshot of the ordered widget list
    pub fn widgets(&self) -> Vec<Widget> {
        self.store.lock().widgets().to_vec()
    }

    pub fn widget(&self, id: WidgetId) -> Option<Widget> {
        self.store.lock().get(id).cloned()
    }

    /// True while a `create_widget` call is waiting on the network
    pub fn is_creating(&self) -> bool {
        self.creating.is_busy()
    }

    /// Create a widget from raw form input.
    ///
    /// # Errors
    /// `InvalidCoordinates` if either value does not parse or is out of
    /// range, `DuplicateWidget` if an existing pin is too close.
    pub async fn create_widget_from_input(
        &self,
        latitude: &str,
        longitude: &str,
    ) -> Result<Option<Widget>, ValidationError> {
        if self.creating.is_busy() {
            tracing::debug!("Widget creation already in progress, ignoring input");
            return Ok(None);
        }
        let coordinate = Coordinate::parse(latitude, longitude)?;
        self.create_widget(coordinate.latitude, coordinate.longitude)
            .await
    }

    /// Create a widget and fetch its first reading.
    ///
    /// Returns `Ok(None)` without touching anything if another creation is
    /// still in flight. A failed fetch does not undo the creation; the
    /// widget stays in the list without data and a notice is published.
    ///
    /// # Errors
    /// `InvalidCoordinates` or `DuplicateWidget`; the store is unchanged.
    pub async fn create_widget(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<Widget>, ValidationError> {
        let Some(_guard) = self.creating.try_begin() else {
            tracing::debug!("Widget creation already in progress, ignoring request");
            return Ok(None);
        };

        if !WidgetStore::validate_coordinates(latitude, longitude) {
            return Err(ValidationError::invalid(latitude, longitude));
        }
        let coordinate = Coordinate {
            latitude,
            longitude,
        };

        let widget = {
            let mut store = self.store.lock();
            if store.is_duplicate(latitude, longitude) {
                return Err(ValidationError::DuplicateWidget {
                    latitude,
                    longitude,
                });
            }
            let widget = Widget::new(store.next_id(Utc::now()), coordinate);
            store.add(widget.clone());
            widget
        };
        tracing::info!(
            "Created widget {} at {}, {}",
            widget.id(),
            latitude,
            longitude
        );
        self.notify_changed();

        let result = self.source.fetch(latitude, longitude).await;
        let notice = self.apply_fetch(widget.id(), result);
        self.persist_and_notify();
        if let Some(notice) = notice {
            self.publish(&ViewEvent::Notice(&notice));
        }

        Ok(Some(self.widget(widget.id()).unwrap_or(widget)))
    }

    /// Drop the widget's reading and fetch a fresh one.
    ///
    /// Returns the widget as it ends up, or `None` for an unknown id. A
    /// failed fetch leaves the widget without data.
    pub async fn refresh_widget(&self, id: WidgetId) -> Option<Widget> {
        let coordinate = {
            let mut store = self.store.lock();
            let coordinate = store.get(id)?.coordinate();
            store.set_reading(id, None);
            coordinate
        };
        tracing::info!("Refreshing widget {}", id);
        self.notify_changed();

        let result = self
            .source
            .fetch(coordinate.latitude, coordinate.longitude)
            .await;
        let notice = self.apply_fetch(id, result);
        self.persist_and_notify();
        if let Some(notice) = notice {
            self.publish(&ViewEvent::Notice(&notice));
        }

        self.widget(id)
    }

    /// Remove a widget. Deleting an id that is already gone changes nothing.
    pub fn delete_widget(&self, id: WidgetId) -> bool {
        let removed = self.store.lock().remove(id).is_some();
        if removed {
            tracing::info!("Deleted widget {}", id);
        }
        self.notify_changed();
        removed
    }

    /// Remove every widget once `confirm` approves.
    ///
    /// `confirm` is the user prompt; nothing happens if it returns false.
    pub fn clear_all(&self, confirm: impl FnOnce() -> bool) -> bool {
        if !confirm() {
            tracing::debug!("Clear all cancelled");
            return false;
        }
        let count = {
            let mut store = self.store.lock();
            let count = store.len();
            store.clear();
            count
        };
        tracing::info!("Cleared {} widgets", count);
        self.notify_changed();
        true
    }

    /// Refresh every stale widget concurrently, then persist and notify once.
    ///
    /// A failed fetch keeps that widget's previous data and does not affect
    /// the others.
    pub async fn bootstrap_refresh(&self) -> BootstrapSummary {
        let now = Utc::now();
        let (stale, cached) = {
            let store = self.store.lock();
            let stale: Vec<(WidgetId, Coordinate)> = store
                .widgets()
                .iter()
                .filter(|w| {
                    let due = self.policy.needs_refresh(w, now);
                    if !due {
                        tracing::debug!("Widget {} uses cached data", w.id());
                    }
                    due
                })
                .map(|w| (w.id(), w.coordinate()))
                .collect();
            let cached = store.len() - stale.len();
            (stale, cached)
        };
        tracing::info!(
            "Startup refresh: {} stale, {} cached",
            stale.len(),
            cached
        );

        let fetches = stale.iter().map(|&(id, coordinate)| async move {
            let result = self
                .source
                .fetch(coordinate.latitude, coordinate.longitude)
                .await;
            (id, result)
        });
        let results = join_all(fetches).await;

        let mut summary = BootstrapSummary {
            cached,
            ..BootstrapSummary::default()
        };
        let mut notices = Vec::new();
        for (id, result) in results {
            match result {
                Ok(snapshot) => {
                    summary.refreshed += 1;
                    self.store_reading(id, snapshot);
                }
                // Previous reading stays in place
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!("Startup refresh failed for widget {}: {}", id, e);
                    notices.push(Notice::for_widget(id, e.user_message()));
                }
            }
        }

        self.persist_and_notify();
        for notice in &notices {
            self.publish(&ViewEvent::Notice(notice));
        }

        summary
    }

    /// Center the map on a widget and highlight its card.
    pub fn fly_to(&self, id: WidgetId) -> bool {
        self.focus(id, false)
    }

    /// Like [`fly_to`](Self::fly_to), and also open the marker's detail view.
    pub fn show_on_map(&self, id: WidgetId) -> bool {
        self.focus(id, true)
    }

    fn focus(&self, id: WidgetId, open_detail: bool) -> bool {
        let target = {
            let store = self.store.lock();
            store
                .position(id)
                .and_then(|index| store.get(id).map(|w| (index, w.clone())))
        };
        let Some((index, widget)) = target else {
            return false;
        };
        self.publish(&ViewEvent::Focus {
            widget: &widget,
            index,
            open_detail,
        });
        true
    }

    /// Write back a fetch result. Returns a notice for failures.
    fn apply_fetch(
        &self,
        id: WidgetId,
        result: Result<WeatherSnapshot, NetworkError>,
    ) -> Option<Notice> {
        match result {
            Ok(snapshot) => {
                self.store_reading(id, snapshot);
                None
            }
            Err(e) => {
                tracing::warn!("Weather fetch failed for widget {}: {}", id, e);
                Some(Notice::for_widget(id, e.user_message()))
            }
        }
    }

    fn store_reading(&self, id: WidgetId, snapshot: WeatherSnapshot) {
        // Millisecond precision, same as the persisted form
        let reading = Reading::new(snapshot, Utc::now().trunc_subsecs(3));
        if self.store.lock().set_reading(id, Some(reading)) {
            tracing::info!("Weather updated for widget {}", id);
        } else {
            tracing::debug!("Widget {} was removed before its fetch finished", id);
        }
    }

    fn persist_and_notify(&self) {
        self.store.lock().save();
        self.notify_changed();
    }

    fn notify_changed(&self) {
        let widgets = self.widgets();
        self.publish(&ViewEvent::WidgetsChanged(&widgets));
    }

    fn publish(&self, event: &ViewEvent<'_>) {
        // Observers run without any engine lock held
        let observers = self.observers.read().clone();
        for observer in observers {
            observer.on_event(event);
        }
    }
}
