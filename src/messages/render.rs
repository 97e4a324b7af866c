//! Render state - data structure sent from App layer to UI for rendering

use crate::app::state::{Notice, Overlay, Stats};
use crate::messages::ui_events::{Focus, InputMode};
use crate::models::ResourceKind;
use crate::prefs::Theme;
use crate::view::TableRow;

/// Complete state needed by the UI to render
#[derive(Debug, Clone, Default)]
pub struct RenderState {
    // Tab
    pub active_kind: ResourceKind,

    // Table
    pub headers: &'static [&'static str],
    pub rows: Vec<TableRow>,
    /// Cached record count before filtering
    pub total_rows: usize,
    pub selected_row: Option<usize>,

    // Filter bar
    pub filter_label: String,
    pub search: String,
    pub input_mode: InputMode,

    // Popups
    pub focus: Focus,
    pub overlay: Overlay,
    pub notice: Option<Notice>,

    pub theme: Theme,
    pub stats: Stats,
    pub status: String,
    pub is_loading: bool,
}
