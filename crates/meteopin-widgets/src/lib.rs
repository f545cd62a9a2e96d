//! Widget lifecycle and cache consistency for Meteopin
//!
//! The ordered widget list in [`WidgetStore`] is the single source of truth.
//! [`WidgetLifecycleEngine`] mutates it, persists it, and notifies
//! observers; the card list and the map markers are projections of it.

pub mod engine;
pub mod map;
pub mod observer;
pub mod policy;
pub mod presentation;
pub mod storage;
pub mod store;
pub mod widget;

pub use engine::{BootstrapSummary, WidgetLifecycleEngine};
pub use map::{
    map_center, marker_color, MapAdapter, DEFAULT_CENTER, MarkerContent, MarkerId, MarkerLayer,
};
pub use observer::{Notice, ViewEvent, WidgetObserver};
pub use policy::{needs_refresh, RefreshPolicy, DEFAULT_CACHE_DURATION};
pub use presentation::{format_last_update, CardList, PresentationAdapter, WidgetCard};
pub use storage::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use store::{WidgetStore, DEFAULT_DUPLICATE_TOLERANCE, STORAGE_KEY};
pub use widget::{Coordinate, Reading, Widget, WidgetId};
