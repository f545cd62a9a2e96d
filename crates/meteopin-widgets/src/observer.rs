//! Events the engine publishes to its views.

use crate::widget::{Widget, WidgetId};

/// One-shot user-visible message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Widget the notice is about, if any
    pub widget: Option<WidgetId>,
    pub message: String,
}

impl Notice {
    pub fn for_widget(id: WidgetId, message: impl Into<String>) -> Self {
        Self {
            widget: Some(id),
            message: message.into(),
        }
    }

    pub fn general(message: impl Into<String>) -> Self {
        Self {
            widget: None,
            message: message.into(),
        }
    }
}

/// What changed. Views project from the data carried here and keep no
/// state of their own about widgets.
#[derive(Debug, Clone, Copy)]
pub enum ViewEvent<'a> {
    /// The ordered widget list after a mutation
    WidgetsChanged(&'a [Widget]),
    /// Bring one widget into view; `index` is its position in the list
    Focus {
        widget: &'a Widget,
        index: usize,
        open_detail: bool,
    },
    Notice(&'a Notice),
}

/// Subscriber to engine events (card list, map markers).
pub trait WidgetObserver: Send + Sync {
    fn on_event(&self, event: &ViewEvent<'_>);
}
