use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::ElementIds;

/// Toggleable document regions driven by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Panel {
    /// Shown while a request is in flight.
    Loading,
    /// Rendered analysis output.
    Results,
    /// User-facing failure text.
    Error,
}

impl Panel {
    /// Every panel in document order.
    pub const ALL: [Self; 3] = [Self::Loading, Self::Results, Self::Error];

    /// Element id of this panel under the given configuration.
    #[must_use]
    pub fn element_id(self, ids: &ElementIds) -> &str {
        match self {
            Self::Loading => &ids.loading,
            Self::Results => &ids.results,
            Self::Error => &ids.error,
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Loading => 0,
            Self::Results => 1,
            Self::Error => 2,
        }
    }
}

/// Content assigned to a panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PanelContent {
    /// Nothing assigned yet.
    #[default]
    Empty,
    /// Plain text, escaped when serialized into markup.
    Text(String),
    /// Markup assigned verbatim.
    Html(String),
}

/// The document operations the form controller depends on.
///
/// Implementations wrap whatever actually displays the panels: a browser
/// document, a terminal, or the in-memory surface used by the CLI and tests.
pub trait DocumentSurface: Send + Sync {
    /// Current text of the train percentage input.
    fn percentage_value(&self) -> String;
    /// Adds the hidden class to a panel.
    fn hide(&self, panel: Panel);
    /// Removes the hidden class from a panel.
    fn show(&self, panel: Panel);
    /// Replaces a panel's content with plain text.
    fn set_text(&self, panel: Panel, text: &str);
    /// Replaces a panel's content with markup.
    fn set_html(&self, panel: Panel, html: &str);
}

/// Visibility and content of one panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelState {
    /// Whether the hidden class is applied.
    pub hidden: bool,
    /// Assigned content.
    pub content: PanelContent,
}

impl Default for PanelState {
    fn default() -> Self {
        Self {
            hidden: true,
            content: PanelContent::Empty,
        }
    }
}

/// Point-in-time copy of a surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceSnapshot {
    /// Percentage input text.
    pub percentage: String,
    /// Loading panel.
    pub loading: PanelState,
    /// Results panel.
    pub results: PanelState,
    /// Error panel.
    pub error: PanelState,
}

impl SurfaceSnapshot {
    /// State of the given panel.
    #[must_use]
    pub const fn panel(&self, panel: Panel) -> &PanelState {
        match panel {
            Panel::Loading => &self.loading,
            Panel::Results => &self.results,
            Panel::Error => &self.error,
        }
    }

    /// Whether the panel is currently shown.
    #[must_use]
    pub const fn is_visible(&self, panel: Panel) -> bool {
        !self.panel(panel).hidden
    }

    /// Panels currently shown, in document order.
    #[must_use]
    pub fn visible_panels(&self) -> Vec<Panel> {
        Panel::ALL
            .into_iter()
            .filter(|panel| self.is_visible(*panel))
            .collect()
    }
}

#[derive(Debug, Default)]
struct SurfaceState {
    percentage: String,
    panels: [PanelState; 3],
    history: Vec<Vec<Panel>>,
}

impl SurfaceState {
    fn snapshot(&self) -> SurfaceSnapshot {
        SurfaceSnapshot {
            percentage: self.percentage.clone(),
            loading: self.panels[Panel::Loading.index()].clone(),
            results: self.panels[Panel::Results.index()].clone(),
            error: self.panels[Panel::Error.index()].clone(),
        }
    }

    fn set_hidden(&mut self, panel: Panel, hidden: bool) {
        self.panels[panel.index()].hidden = hidden;
        let visible = Panel::ALL
            .into_iter()
            .filter(|p| !self.panels[p.index()].hidden)
            .collect();
        self.history.push(visible);
    }
}

/// In-memory document surface. Every panel starts hidden.
#[derive(Debug, Default)]
pub struct MemorySurface {
    state: Mutex<SurfaceState>,
}

impl MemorySurface {
    /// Creates a surface with the percentage input pre-filled.
    #[must_use]
    pub fn with_percentage(value: impl Into<String>) -> Self {
        let surface = Self::default();
        surface.set_percentage(value);
        surface
    }

    /// Simulates the user editing the percentage input.
    pub fn set_percentage(&self, value: impl Into<String>) {
        self.state.lock().percentage = value.into();
    }

    /// Copies the current state.
    #[must_use]
    pub fn snapshot(&self) -> SurfaceSnapshot {
        self.state.lock().snapshot()
    }

    /// Visible panels recorded after every visibility change, oldest first.
    #[must_use]
    pub fn visibility_history(&self) -> Vec<Vec<Panel>> {
        self.state.lock().history.clone()
    }
}

impl DocumentSurface for MemorySurface {
    fn percentage_value(&self) -> String {
        self.state.lock().percentage.clone()
    }

    fn hide(&self, panel: Panel) {
        self.state.lock().set_hidden(panel, true);
    }

    fn show(&self, panel: Panel) {
        self.state.lock().set_hidden(panel, false);
    }

    fn set_text(&self, panel: Panel, text: &str) {
        self.state.lock().panels[panel.index()].content = PanelContent::Text(text.to_string());
    }

    fn set_html(&self, panel: Panel, html: &str) {
        self.state.lock().panels[panel.index()].content = PanelContent::Html(html.to_string());
    }
}
