//! Ordered widget collection and its persisted form.
//!
//! The whole list is serialized as one JSON array under [`STORAGE_KEY`] and
//! rewritten on every persist; entries are never merged.

use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};
use meteopin_core::PersistenceError;
use meteopin_weather::WeatherSnapshot;
use serde::{Deserialize, Serialize};

use crate::storage::KeyValueStore;
use crate::widget::{Coordinate, Reading, Widget, WidgetId};

/// Key the widget list is stored under
pub const STORAGE_KEY: &str = "weatherWidgets";

/// Default duplicate tolerance in degrees
pub const DEFAULT_DUPLICATE_TOLERANCE: f64 = 0.001;

/// Largest stored id accepted on load (2^53 - 1, exact in an f64)
const MAX_STORED_ID: f64 = 9_007_199_254_740_991.0;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PersistedWidget<'a> {
    id: WidgetId,
    latitude: f64,
    longitude: f64,
    weather_data: Option<&'a WeatherSnapshot>,
    last_updated: Option<i64>,
}

impl<'a> From<&'a Widget> for PersistedWidget<'a> {
    fn from(widget: &'a Widget) -> Self {
        Self {
            id: widget.id(),
            latitude: widget.latitude(),
            longitude: widget.longitude(),
            weather_data: widget.weather(),
            last_updated: widget.last_updated().map(|t| t.timestamp_millis()),
        }
    }
}

/// Numbers written by older versions sometimes arrive as strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LooseNumber {
    Number(f64),
    Text(String),
}

impl LooseNumber {
    fn as_f64(&self) -> Option<f64> {
        match self {
            LooseNumber::Number(n) => Some(*n),
            LooseNumber::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Lenient view of one stored entry
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredWidget {
    id: LooseNumber,
    latitude: LooseNumber,
    longitude: LooseNumber,
    #[serde(default)]
    weather_data: Option<serde_json::Value>,
    #[serde(default)]
    last_updated: Option<LooseNumber>,
}

impl StoredWidget {
    fn into_widget(self) -> Option<Widget> {
        let id = self
            .id
            .as_f64()
            .filter(|n| n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_STORED_ID)
            .map(|n| WidgetId::new(n as i64))?;

        let latitude = self.latitude.as_f64()?;
        let longitude = self.longitude.as_f64()?;
        let coordinate = Coordinate::new(latitude, longitude).ok()?;

        // Missing or zero timestamp means "never fetched"
        let updated_at = self
            .last_updated
            .and_then(|ms| ms.as_f64())
            .filter(|ms| ms.is_finite() && *ms > 0.0)
            .and_then(|ms| Utc.timestamp_millis_opt(ms as i64).single());

        let snapshot = self
            .weather_data
            .filter(|v| !v.is_null())
            .and_then(|v| serde_json::from_value::<WeatherSnapshot>(v).ok());

        // Data without a timestamp (or the reverse) is treated as unresolved
        let reading = match (snapshot, updated_at) {
            (Some(snapshot), Some(updated_at)) => Some(Reading::new(snapshot, updated_at)),
            _ => None,
        };

        Some(Widget::new(id, coordinate).with_reading(reading))
    }
}

/// Decode a persisted blob.
///
/// A blob that is not a JSON array is an error; individual entries that
/// cannot be coerced are skipped.
pub(crate) fn decode_widgets(blob: &str) -> Result<Vec<Widget>, PersistenceError> {
    let entries: Vec<serde_json::Value> =
        serde_json::from_str(blob).map_err(|e| PersistenceError::Deserialize(e.to_string()))?;

    let mut seen = HashSet::new();
    let mut widgets = Vec::with_capacity(entries.len());

    for entry in entries {
        let widget = serde_json::from_value::<StoredWidget>(entry.clone())
            .ok()
            .and_then(StoredWidget::into_widget);

        match widget {
            Some(widget) if seen.insert(widget.id()) => widgets.push(widget),
            Some(widget) => {
                tracing::warn!("Skipping stored widget with duplicate id {}", widget.id());
            }
            None => tracing::warn!("Skipping unreadable stored widget: {}", entry),
        }
    }

    Ok(widgets)
}

pub(crate) fn encode_widgets(widgets: &[Widget]) -> Result<String, PersistenceError> {
    let persisted: Vec<PersistedWidget<'_>> = widgets.iter().map(PersistedWidget::from).collect();
    serde_json::to_string(&persisted).map_err(|e| PersistenceError::Serialize(e.to_string()))
}

/// Ordered in-memory widget list with write-through persistence.
pub struct WidgetStore {
    widgets: Vec<Widget>,
    storage: Box<dyn KeyValueStore>,
    duplicate_tolerance: f64,
}

impl WidgetStore {
    /// Open a store over `storage` and load whatever it holds.
    pub fn open(storage: Box<dyn KeyValueStore>, duplicate_tolerance: f64) -> Self {
        let mut store = Self {
            widgets: Vec::new(),
            storage,
            duplicate_tolerance,
        };
        store.load();
        store
    }

    /// Reload from storage, replacing the in-memory list.
    ///
    /// Unreadable data is logged and yields an empty list.
    pub fn load(&mut self) -> &[Widget] {
        self.widgets = match self.storage.get(STORAGE_KEY) {
            Ok(Some(blob)) => match decode_widgets(&blob) {
                Ok(widgets) => widgets,
                Err(e) => {
                    tracing::error!("Failed to load widgets, starting empty: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::error!("Failed to read widget storage, starting empty: {}", e);
                Vec::new()
            }
        };

        tracing::info!("Loaded {} widgets from storage", self.widgets.len());
        &self.widgets
    }

    /// Persist the full list, reporting failure.
    pub fn try_save(&self) -> Result<(), PersistenceError> {
        let blob = encode_widgets(&self.widgets)?;
        self.storage.set(STORAGE_KEY, &blob)
    }

    /// Persist the full list. Failures are logged; memory stays authoritative.
    pub fn save(&self) {
        if let Err(e) = self.try_save() {
            tracing::error!("Failed to save widgets: {}", e);
        }
    }

    /// Append a widget and persist.
    pub fn add(&mut self, widget: Widget) {
        self.widgets.push(widget);
        self.save();
    }

    /// Remove by id and persist. Returns the removed widget, if any.
    pub fn remove(&mut self, id: WidgetId) -> Option<Widget> {
        let removed = self
            .position(id)
            .map(|index| self.widgets.remove(index));
        self.save();
        removed
    }

    /// Remove everything and persist.
    pub fn clear(&mut self) {
        self.widgets.clear();
        self.save();
    }

    /// Replace one widget's reading. Does not persist; call [`save`](Self::save).
    ///
    /// Returns false when no widget has `id`.
    pub fn set_reading(&mut self, id: WidgetId, reading: Option<Reading>) -> bool {
        match self.widgets.iter_mut().find(|w| w.id() == id) {
            Some(widget) => {
                widget.set_reading(reading);
                true
            }
            None => false,
        }
    }

    /// True iff an existing widget is within tolerance on both axes.
    pub fn is_duplicate(&self, latitude: f64, longitude: f64) -> bool {
        self.widgets.iter().any(|w| {
            w.coordinate()
                .is_near(latitude, longitude, self.duplicate_tolerance)
        })
    }

    /// Both values finite and within their ranges.
    pub fn validate_coordinates(latitude: f64, longitude: f64) -> bool {
        Coordinate::is_valid(latitude, longitude)
    }

    /// Next id: creation-time based and strictly above every existing id.
    pub fn next_id(&self, now: DateTime<Utc>) -> WidgetId {
        let candidate = now.timestamp_millis();
        let floor = self
            .widgets
            .iter()
            .map(|w| w.id().as_i64().saturating_add(1))
            .max()
            .unwrap_or(i64::MIN);
        WidgetId::new(candidate.max(floor))
    }

    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    pub fn get(&self, id: WidgetId) -> Option<&Widget> {
        self.widgets.iter().find(|w| w.id() == id)
    }

    pub fn position(&self, id: WidgetId) -> Option<usize> {
        self.widgets.iter().position(|w| w.id() == id)
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }
}

impl std::fmt::Debug for WidgetStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetStore")
            .field("widgets", &self.widgets)
            .field("duplicate_tolerance", &self.duplicate_tolerance)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKeyValueStore;

    fn snapshot(temperature: i32) -> WeatherSnapshot {
        WeatherSnapshot::from_readings(f64::from(temperature), 50, 2.5, 3)
    }

    fn widget(id: i64, lat: f64, lon: f64) -> Widget {
        Widget::new(WidgetId::new(id), Coordinate::new(lat, lon).unwrap())
    }

    fn open(kv: &MemoryKeyValueStore) -> WidgetStore {
        WidgetStore::open(Box::new(kv.clone()), DEFAULT_DUPLICATE_TOLERANCE)
    }

    #[test]
    fn test_open_empty_storage() {
        let kv = MemoryKeyValueStore::new();
        let store = open(&kv);
        assert!(store.is_empty());
        assert_eq!(kv.write_count(), 0);
    }

    #[test]
    fn test_round_trip_preserves_order_and_readings() {
        let kv = MemoryKeyValueStore::new();
        let mut store = open(&kv);
        let updated = Utc.timestamp_millis_opt(1_760_000_000_000).unwrap();

        store.add(widget(3, 10.0, 10.0));
        store.add(widget(1, -33.8688, 151.2093));
        store.add(widget(2, 51.5072, -0.1276));
        store.set_reading(WidgetId::new(1), Some(Reading::new(snapshot(18), updated)));
        store.save();

        let reloaded = open(&kv);
        assert_eq!(reloaded.widgets(), store.widgets());
        let ids: Vec<i64> = reloaded.widgets().iter().map(|w| w.id().as_i64()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_persisted_shape() {
        let kv = MemoryKeyValueStore::new();
        let mut store = open(&kv);
        let updated = Utc.timestamp_millis_opt(1_760_000_000_000).unwrap();
        store.add(widget(7, 1.5, 2.5));
        store.set_reading(WidgetId::new(7), Some(Reading::new(snapshot(4), updated)));
        store.save();

        let json: serde_json::Value =
            serde_json::from_str(&kv.value(STORAGE_KEY).unwrap()).unwrap();
        let entry = &json[0];
        assert_eq!(entry["id"], 7);
        assert_eq!(entry["latitude"], 1.5);
        assert_eq!(entry["lastUpdated"], 1_760_000_000_000i64);
        assert_eq!(entry["weatherData"]["temperature"], 4);
        assert_eq!(entry["weatherData"]["icon"], "cloudy");
    }

    #[test]
    fn test_unresolved_widget_persists_nulls() {
        let kv = MemoryKeyValueStore::new();
        let mut store = open(&kv);
        store.add(widget(1, 0.0, 0.0));

        let json: serde_json::Value =
            serde_json::from_str(&kv.value(STORAGE_KEY).unwrap()).unwrap();
        assert!(json[0]["weatherData"].is_null());
        assert!(json[0]["lastUpdated"].is_null());
    }

    #[test]
    fn test_malformed_blob_resets_to_empty() {
        let kv = MemoryKeyValueStore::new().with_entry(STORAGE_KEY, "{not json");
        let store = open(&kv);
        assert!(store.is_empty());
    }

    #[test]
    fn test_non_array_blob_resets_to_empty() {
        let kv = MemoryKeyValueStore::new().with_entry(STORAGE_KEY, r#"{"id": 1}"#);
        assert!(open(&kv).is_empty());
    }

    #[test]
    fn test_legacy_entries_are_coerced() {
        let blob = r#"[
            {"id": 1700000000000, "latitude": "56.8389", "longitude": "60.6057", "weatherData": null},
            {"id": 1700000000001, "latitude": 55.75, "longitude": 37.61,
             "weatherData": {"temperature": 3, "description": "Overcast", "humidity": 80, "windSpeed": 4.2, "icon": "cloudy"},
             "lastUpdated": 1700000500000}
        ]"#;
        let kv = MemoryKeyValueStore::new().with_entry(STORAGE_KEY, blob);
        let store = open(&kv);

        assert_eq!(store.len(), 2);
        let first = &store.widgets()[0];
        assert_eq!(first.latitude(), 56.8389);
        assert_eq!(first.longitude(), 60.6057);
        assert!(first.is_loading());

        let second = &store.widgets()[1];
        assert_eq!(second.weather().unwrap().description, "Overcast");
        assert_eq!(
            second.last_updated().unwrap().timestamp_millis(),
            1_700_000_500_000
        );
    }

    #[test]
    fn test_data_without_timestamp_loads_unresolved() {
        let blob = r#"[
            {"id": 1, "latitude": 1, "longitude": 1,
             "weatherData": {"temperature": 3, "description": "Overcast", "humidity": 80, "windSpeed": 4.2, "icon": "cloudy"}},
            {"id": 2, "latitude": 2, "longitude": 2, "weatherData": null, "lastUpdated": 1700000500000},
            {"id": 3, "latitude": 3, "longitude": 3,
             "weatherData": {"temperature": 3, "description": "Overcast", "humidity": 80, "windSpeed": 4.2, "icon": "cloudy"},
             "lastUpdated": 0}
        ]"#;
        let kv = MemoryKeyValueStore::new().with_entry(STORAGE_KEY, blob);
        let store = open(&kv);

        assert_eq!(store.len(), 3);
        for w in store.widgets() {
            assert_eq!(w.weather().is_none(), w.last_updated().is_none());
            assert!(w.is_loading());
        }
    }

    #[test]
    fn test_unreadable_entries_are_skipped() {
        let blob = r#"[
            {"id": 1, "latitude": "abc", "longitude": 1},
            {"id": 2, "latitude": 91, "longitude": 1},
            {"latitude": 1, "longitude": 1},
            {"id": 4, "latitude": 4, "longitude": 4},
            {"id": 4, "latitude": 5, "longitude": 5}
        ]"#;
        let kv = MemoryKeyValueStore::new().with_entry(STORAGE_KEY, blob);
        let store = open(&kv);

        assert_eq!(store.len(), 1);
        assert_eq!(store.widgets()[0].id(), WidgetId::new(4));
        assert_eq!(store.widgets()[0].latitude(), 4.0);
    }

    #[test]
    fn test_mutations_persist() {
        let kv = MemoryKeyValueStore::new();
        let mut store = open(&kv);

        store.add(widget(1, 1.0, 1.0));
        store.add(widget(2, 2.0, 2.0));
        assert_eq!(kv.write_count(), 2);

        assert!(store.remove(WidgetId::new(1)).is_some());
        assert_eq!(kv.write_count(), 3);
        assert_eq!(open(&kv).len(), 1);

        store.clear();
        assert_eq!(kv.write_count(), 4);
        assert!(open(&kv).is_empty());
    }

    #[test]
    fn test_remove_unknown_is_harmless() {
        let kv = MemoryKeyValueStore::new();
        let mut store = open(&kv);
        store.add(widget(1, 1.0, 1.0));

        assert!(store.remove(WidgetId::new(99)).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_write_failure_keeps_memory_state() {
        let kv = MemoryKeyValueStore::new();
        let mut store = open(&kv);
        kv.set_fail_writes(true);

        store.add(widget(1, 1.0, 1.0));

        assert_eq!(store.len(), 1);
        assert!(store.try_save().is_err());
        assert!(kv.value(STORAGE_KEY).is_none());
    }

    #[test]
    fn test_is_duplicate_within_tolerance() {
        let kv = MemoryKeyValueStore::new();
        let mut store = open(&kv);
        store.add(widget(1, 56.8389, 60.6057));

        assert!(store.is_duplicate(56.8390, 60.6058));
        assert!(store.is_duplicate(56.8389, 60.6057));
        assert!(!store.is_duplicate(56.8400, 60.6057));
        assert!(!store.is_duplicate(56.8389, 60.6047));
    }

    #[test]
    fn test_validate_coordinates() {
        assert!(WidgetStore::validate_coordinates(0.0, 0.0));
        assert!(WidgetStore::validate_coordinates(-90.0, 180.0));
        assert!(!WidgetStore::validate_coordinates(90.1, 0.0));
        assert!(!WidgetStore::validate_coordinates(f64::NAN, 0.0));
    }

    #[test]
    fn test_out_of_range_ids_are_skipped() {
        let blob = r#"[
            {"id": 1e300, "latitude": 1, "longitude": 1},
            {"id": -1e300, "latitude": 2, "longitude": 2},
            {"id": 9007199254740991, "latitude": 3, "longitude": 3}
        ]"#;
        let kv = MemoryKeyValueStore::new().with_entry(STORAGE_KEY, blob);
        let store = open(&kv);

        assert_eq!(store.len(), 1);
        assert_eq!(store.widgets()[0].id(), WidgetId::new(9_007_199_254_740_991));
        let now = Utc.timestamp_millis_opt(1_000).unwrap();
        assert_eq!(store.next_id(now), WidgetId::new(9_007_199_254_740_992));
    }

    #[test]
    fn test_next_id_saturates_at_max() {
        let kv = MemoryKeyValueStore::new();
        let mut store = open(&kv);
        store.add(widget(i64::MAX, 1.0, 1.0));

        let now = Utc.timestamp_millis_opt(1_000).unwrap();
        assert_eq!(store.next_id(now), WidgetId::new(i64::MAX));
    }

    #[test]
    fn test_string_timestamp_is_coerced() {
        let blob = r#"[
            {"id": 1, "latitude": 1, "longitude": 1,
             "weatherData": {"temperature": 3, "description": "Overcast", "humidity": 80, "windSpeed": 4.2, "icon": "cloudy"},
             "lastUpdated": "1700000500000"},
            {"id": 2, "latitude": 2, "longitude": 2,
             "weatherData": {"temperature": 3, "description": "Overcast", "humidity": 80, "windSpeed": 4.2, "icon": "cloudy"},
             "lastUpdated": "yesterday"}
        ]"#;
        let kv = MemoryKeyValueStore::new().with_entry(STORAGE_KEY, blob);
        let store = open(&kv);

        assert_eq!(store.len(), 2);
        assert_eq!(
            store.widgets()[0].last_updated().unwrap().timestamp_millis(),
            1_700_000_500_000
        );
        assert!(store.widgets()[1].is_loading());
    }

    #[test]
    fn test_next_id_is_time_based_and_increasing() {
        let kv = MemoryKeyValueStore::new();
        let mut store = open(&kv);
        let now = Utc.timestamp_millis_opt(1_000).unwrap();

        assert_eq!(store.next_id(now), WidgetId::new(1_000));

        store.add(widget(1_000, 1.0, 1.0));
        assert_eq!(store.next_id(now), WidgetId::new(1_001));

        // Clock went backwards: still above everything stored
        let earlier = Utc.timestamp_millis_opt(500).unwrap();
        assert_eq!(store.next_id(earlier), WidgetId::new(1_001));
    }
}
