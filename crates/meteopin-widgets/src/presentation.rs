//! Card projection of the widget list.

use std::fmt;

use chrono::{DateTime, Local, TimeZone, Utc};
use meteopin_weather::IconCategory;
use parking_lot::Mutex;

use crate::observer::{Notice, ViewEvent, WidgetObserver};
use crate::widget::{Widget, WidgetId};

/// Format a fetch time as `Updated: HH:MM, DD.MM` in `tz`.
pub fn format_last_update<Tz: TimeZone>(updated_at: Option<DateTime<Utc>>, tz: &Tz) -> String
where
    Tz::Offset: fmt::Display,
{
    match updated_at {
        Some(ts) => format!("Updated: {}", ts.with_timezone(tz).format("%H:%M, %d.%m")),
        None => "Never updated".to_string(),
    }
}

/// Display strings for one widget card
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetCard {
    pub id: WidgetId,
    pub title: String,
    pub coordinates: String,
    pub temperature: String,
    pub description: String,
    pub humidity: String,
    pub wind: String,
    pub icon: Option<IconCategory>,
    pub last_update: String,
    pub loading: bool,
}

impl WidgetCard {
    /// Card with the last-update line in local time
    pub fn from_widget(widget: &Widget) -> Self {
        Self::from_widget_in(widget, &Local)
    }

    pub fn from_widget_in<Tz: TimeZone>(widget: &Widget, tz: &Tz) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        let weather = widget.weather();
        Self {
            id: widget.id(),
            title: format!("Weather #{}", widget.id()),
            coordinates: format!(
                "Lat: {:.4} | Lon: {:.4}",
                widget.latitude(),
                widget.longitude()
            ),
            temperature: weather
                .map(|w| format!("{}°C", w.temperature))
                .unwrap_or_else(|| "--°".to_string()),
            description: weather
                .map(|w| w.description.clone())
                .unwrap_or_else(|| "Loading...".to_string()),
            humidity: weather
                .map(|w| format!("{}%", w.humidity))
                .unwrap_or_else(|| "--%".to_string()),
            wind: weather
                .map(|w| format!("{} m/s", w.wind_speed))
                .unwrap_or_else(|| "-- m/s".to_string()),
            icon: weather.map(|w| w.icon),
            last_update: format_last_update(widget.last_updated(), tz),
            loading: widget.is_loading(),
        }
    }

    /// Asset file for the weather icon, if the widget has data
    pub fn icon_file(&self) -> Option<&'static str> {
        self.icon.map(|icon| icon.file_name())
    }
}

impl fmt::Display for WidgetCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}  ({})", self.title, self.coordinates)?;
        writeln!(f, "  {}  {}", self.temperature, self.description)?;
        writeln!(f, "  Humidity: {}  Wind: {}", self.humidity, self.wind)?;
        write!(f, "  {}", self.last_update)
    }
}

/// Host-side rendering surface for cards and notices.
pub trait PresentationAdapter: Send + Sync {
    /// Replace the rendered card list
    fn render(&self, cards: &[WidgetCard]);

    fn highlight(&self, id: WidgetId);

    fn show_notice(&self, notice: &Notice);
}

/// Observer that turns engine events into card renders.
pub struct CardList<P> {
    adapter: P,
    cards: Mutex<Vec<WidgetCard>>,
}

impl<P: PresentationAdapter> CardList<P> {
    pub fn new(adapter: P) -> Self {
        Self {
            adapter,
            cards: Mutex::new(Vec::new()),
        }
    }

    pub fn adapter(&self) -> &P {
        &self.adapter
    }

    /// Cards from the last render
    pub fn cards(&self) -> Vec<WidgetCard> {
        self.cards.lock().clone()
    }
}

impl<P: PresentationAdapter> WidgetObserver for CardList<P> {
    fn on_event(&self, event: &ViewEvent<'_>) {
        match *event {
            ViewEvent::WidgetsChanged(widgets) => {
                let cards: Vec<WidgetCard> = widgets.iter().map(WidgetCard::from_widget).collect();
                self.adapter.render(&cards);
                *self.cards.lock() = cards;
            }
            ViewEvent::Focus { widget, .. } => self.adapter.highlight(widget.id()),
            ViewEvent::Notice(notice) => self.adapter.show_notice(notice),
        }
    }
}
