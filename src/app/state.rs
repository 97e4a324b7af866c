//! App state - pure data structure with no I/O logic

use std::collections::{HashMap, HashSet};

use crate::app::form::{FormPurpose, FormState, TextInput};
use crate::cache::LocalCache;
use crate::messages::ui_events::{Focus, InputMode};
use crate::messages::RenderState;
use crate::models::{RecordId, ResourceKind};
use crate::prefs::Theme;
use crate::view::{self, FilterState};

/// Popup currently shown over the table
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Overlay {
    #[default]
    None,
    Help,
    Form(FormState),
    ConfirmDelete {
        kind: ResourceKind,
        id: RecordId,
        label: String,
    },
    ExportMenu {
        index: usize,
    },
    ImportPrompt(TextInput),
}

/// Blocking message; dismissed by any key
#[derive(Clone, Debug, PartialEq)]
pub struct Notice {
    pub title: String,
    pub message: String,
    pub is_error: bool,
}

impl Notice {
    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Notice { title: title.into(), message: message.into(), is_error: true }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Notice { title: title.into(), message: message.into(), is_error: false }
    }
}

/// Cached record counts for the stats line
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub groups: usize,
    pub teachers: usize,
    pub rooms: usize,
    pub lessons: usize,
}

/// An in-flight create/update/delete
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingMutation {
    pub id: u64,
    pub kind: ResourceKind,
    pub verb: &'static str,
    /// Form that submitted it; `None` for deletes
    pub purpose: Option<FormPurpose>,
}

/// Main application state - pure data, no I/O
pub struct AppState {
    // Tab/session
    pub active_kind: ResourceKind,

    // Data
    pub cache: LocalCache,

    // View state (reset on tab switch)
    pub filter: FilterState,
    pub selected: Option<RecordId>,
    pub input_mode: InputMode,

    // Popups
    pub overlay: Overlay,
    pub notice: Option<Notice>,

    pub theme: Theme,
    pub status: String,

    // Requests
    pub next_request_id: u64,
    /// Sequence number of the most recently issued load per kind
    pub latest_loads: HashMap<ResourceKind, u64>,
    /// Kinds whose latest load has not answered yet
    pub loading: HashSet<ResourceKind>,
    pub pending_mutation: Option<PendingMutation>,
    pub pending_transfer: Option<u64>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        AppState {
            active_kind: ResourceKind::default(),
            cache: LocalCache::new(),
            filter: FilterState::default(),
            selected: None,
            input_mode: InputMode::Normal,
            overlay: Overlay::None,
            notice: None,
            theme: Theme::default(),
            status: String::new(),
            next_request_id: 1,
            latest_loads: HashMap::new(),
            loading: HashSet::new(),
            pending_mutation: None,
            pending_transfer: None,
        }
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Generate a unique request ID
    pub fn next_id(&mut self) -> u64 {
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }

    /// Which component receives the next key
    pub fn focus(&self) -> Focus {
        if self.notice.is_some() {
            return Focus::Notice;
        }
        match self.overlay {
            Overlay::None => Focus::Table,
            Overlay::Help => Focus::Help,
            Overlay::Form(_) => Focus::Form,
            Overlay::ConfirmDelete { .. } => Focus::ConfirmDelete,
            Overlay::ExportMenu { .. } => Focus::ExportMenu,
            Overlay::ImportPrompt(_) => Focus::ImportPrompt,
        }
    }

    pub fn visible_rows(&self) -> Vec<view::TableRow> {
        view::build_view(self.active_kind, &self.cache, &self.filter)
    }

    pub fn stats(&self) -> Stats {
        Stats {
            groups: self.cache.len(ResourceKind::Group),
            teachers: self.cache.len(ResourceKind::Teacher),
            rooms: self.cache.len(ResourceKind::Room),
            lessons: self.cache.len(ResourceKind::Schedule),
        }
    }

    /// Convert state to RenderState for UI
    pub fn to_render_state(&self) -> RenderState {
        let rows = self.visible_rows();
        let selected_row = self
            .selected
            .and_then(|id| rows.iter().position(|r| r.id == id));
        let filter_label = self
            .filter
            .choice
            .as_ref()
            .map(|c| view::choice_label(c, &self.cache))
            .unwrap_or_else(|| "All".to_string());
        RenderState {
            active_kind: self.active_kind,
            headers: view::headers(self.active_kind),
            total_rows: self.cache.len(self.active_kind),
            rows,
            selected_row,
            filter_label,
            search: self.filter.search.clone(),
            input_mode: self.input_mode,
            focus: self.focus(),
            overlay: self.overlay.clone(),
            notice: self.notice.clone(),
            theme: self.theme,
            stats: self.stats(),
            status: self.status.clone(),
            is_loading: self.loading.contains(&self.active_kind)
                || self.pending_mutation.is_some()
                || self.pending_transfer.is_some(),
        }
    }
}
