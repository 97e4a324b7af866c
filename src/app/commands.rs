//! Command handlers - business logic for processing UI events

use std::path::PathBuf;

use crate::app::form::{FormPurpose, FormState, TextInput};
use crate::app::state::{AppState, Notice, Overlay, PendingMutation};
use crate::error::ConsoleError;
use crate::messages::network::Mutation;
use crate::messages::ui_events::InputMode;
use crate::messages::{NetworkCommand, NetworkResponse};
use crate::models::{DocumentKind, ExportFilter, ListQuery, RecordId, ResourceKind};
use crate::view;

impl AppState {
    // ========================
    // Loading
    // ========================

    /// Issue a load for `kind`; any older load of the same kind becomes stale
    pub fn load(&mut self, kind: ResourceKind, query: Option<ListQuery>) -> NetworkCommand {
        let seq = self.next_id();
        self.latest_loads.insert(kind, seq);
        self.loading.insert(kind);
        if kind == self.active_kind {
            self.status = format!("Loading {}...", kind);
        }
        NetworkCommand::Load { seq, kind, query }
    }

    /// Whether `seq` is still the newest load issued for `kind`
    fn is_latest_load(&self, kind: ResourceKind, seq: u64) -> bool {
        self.latest_loads.get(&kind) == Some(&seq)
    }

    pub fn reload(&mut self) -> NetworkCommand {
        self.load(self.active_kind, None)
    }

    // ========================
    // Tabs
    // ========================

    /// Activate `kind`, dropping transient view state, and reload it
    pub fn switch_kind(&mut self, kind: ResourceKind) -> NetworkCommand {
        self.active_kind = kind;
        self.filter = Default::default();
        self.selected = None;
        self.input_mode = InputMode::Normal;
        self.reload()
    }

    pub fn next_kind(&mut self) -> NetworkCommand {
        self.switch_kind(self.active_kind.next())
    }

    pub fn prev_kind(&mut self) -> NetworkCommand {
        self.switch_kind(self.active_kind.prev())
    }

    // ========================
    // Selection
    // ========================

    pub fn select_next(&mut self) {
        self.selected = view::next_selection(&self.visible_rows(), self.selected);
    }

    pub fn select_prev(&mut self) {
        self.selected = view::prev_selection(&self.visible_rows(), self.selected);
    }

    /// Drop the selection once its row is no longer visible
    fn retain_selection(&mut self) {
        if let Some(id) = self.selected {
            if !self.visible_rows().iter().any(|r| r.id == id) {
                self.selected = None;
            }
        }
    }

    // ========================
    // Filter, sort, search
    // ========================

    pub fn next_filter(&mut self) {
        self.step_filter(true);
    }

    pub fn prev_filter(&mut self) {
        self.step_filter(false);
    }

    /// Cycle the dropdown through "All" followed by the kind's options
    fn step_filter(&mut self, forward: bool) {
        let options = view::filter_options(self.active_kind, &self.cache);
        if options.is_empty() {
            self.filter.choice = None;
            return;
        }
        // Slot 0 is "All", slot i + 1 is options[i]
        let slots = options.len() + 1;
        let current = self
            .filter
            .choice
            .and_then(|c| options.iter().position(|o| *o == c))
            .map(|i| i + 1)
            .unwrap_or(0);
        let next = if forward {
            (current + 1) % slots
        } else {
            current.checked_sub(1).unwrap_or(slots - 1)
        };
        self.filter.choice = next.checked_sub(1).and_then(|i| options.get(i).copied());
        self.retain_selection();
    }

    pub fn clear_filter(&mut self) {
        self.filter = Default::default();
        self.input_mode = InputMode::Normal;
    }

    pub fn start_search(&mut self) {
        self.input_mode = InputMode::Search;
    }

    pub fn stop_search(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    pub fn clear_search(&mut self) {
        self.filter.search.clear();
        self.input_mode = InputMode::Normal;
    }

    fn search_char(&mut self, c: char) {
        self.filter.search.push(c);
        self.retain_selection();
    }

    fn search_backspace(&mut self) {
        self.filter.search.pop();
        self.retain_selection();
    }

    /// Re-request the schedule narrowed by the current filter and search
    pub fn server_filter(&mut self) -> Option<NetworkCommand> {
        if self.active_kind != ResourceKind::Schedule {
            self.status = "Server-side filtering is only available for the schedule".to_string();
            return None;
        }
        let query = ListQuery::schedule(self.filter.reference(), &self.filter.search);
        Some(self.load(ResourceKind::Schedule, Some(query)))
    }

    // ========================
    // Text input routing
    // ========================

    fn searching(&self) -> bool {
        self.input_mode == InputMode::Search && self.overlay == Overlay::None
    }

    pub fn enter_char(&mut self, c: char) {
        if self.searching() {
            return self.search_char(c);
        }
        match &mut self.overlay {
            Overlay::Form(form) => form.enter_char(c),
            Overlay::ImportPrompt(input) => input.insert(c),
            _ => {}
        }
    }

    pub fn delete_char(&mut self) {
        if self.searching() {
            return self.search_backspace();
        }
        match &mut self.overlay {
            Overlay::Form(form) => form.backspace(),
            Overlay::ImportPrompt(input) => input.backspace(),
            _ => {}
        }
    }

    pub fn move_cursor_left(&mut self) {
        match &mut self.overlay {
            Overlay::Form(form) => form.left(),
            Overlay::ImportPrompt(input) => input.left(),
            _ => {}
        }
    }

    pub fn move_cursor_right(&mut self) {
        match &mut self.overlay {
            Overlay::Form(form) => form.right(),
            Overlay::ImportPrompt(input) => input.right(),
            _ => {}
        }
    }

    pub fn next_field(&mut self) {
        match &mut self.overlay {
            Overlay::Form(form) => form.next_field(),
            Overlay::ExportMenu { index } => *index = (*index + 1) % DocumentKind::MENU.len(),
            _ => {}
        }
    }

    pub fn prev_field(&mut self) {
        match &mut self.overlay {
            Overlay::Form(form) => form.prev_field(),
            Overlay::ExportMenu { index } => {
                *index = index.checked_sub(1).unwrap_or(DocumentKind::MENU.len() - 1)
            }
            _ => {}
        }
    }

    // ========================
    // Mutations
    // ========================

    pub fn open_create(&mut self) {
        self.overlay = Overlay::Form(FormState::create(self.active_kind, &self.cache));
    }

    pub fn open_edit(&mut self) {
        match self.selected_record_id("edit") {
            Ok(id) => match self.cache.find(self.active_kind, id) {
                Some(record) => {
                    self.overlay = Overlay::Form(FormState::edit(record, &self.cache));
                }
                None => self.fail("Edit", ConsoleError::StaleReference { kind: self.active_kind, id }),
            },
            Err(e) => self.fail("Edit", e),
        }
    }

    pub fn request_delete(&mut self) {
        let kind = self.active_kind;
        match self.selected_record_id("delete") {
            Ok(id) => match self.cache.find(kind, id) {
                Some(record) => {
                    let label = match record.display_field() {
                        "" => format!("#{}", id),
                        name => format!("#{} {}", id, view::sanitize_cell(name)),
                    };
                    self.overlay = Overlay::ConfirmDelete { kind, id, label };
                }
                None => self.fail("Delete", ConsoleError::StaleReference { kind, id }),
            },
            Err(e) => self.fail("Delete", e),
        }
    }

    fn selected_record_id(&self, action: &str) -> Result<RecordId, ConsoleError> {
        self.selected
            .ok_or_else(|| ConsoleError::validation(format!("Select a row to {} first", action)))
    }

    pub fn confirm_delete(&mut self) -> Option<NetworkCommand> {
        let Overlay::ConfirmDelete { kind, id, .. } = self.overlay else {
            return None;
        };
        self.overlay = Overlay::None;
        self.mutate(kind, Mutation::Delete(id), None)
    }

    pub fn cancel(&mut self) {
        if let Overlay::Form(_) = std::mem::take(&mut self.overlay) {
            // The reply to an in-flight save must not close a form opened later
            if let Some(pending) = self.pending_mutation.as_mut() {
                pending.purpose = None;
            }
        }
    }

    /// Enter in a form, menu or prompt
    pub fn submit(&mut self) -> Option<NetworkCommand> {
        match std::mem::take(&mut self.overlay) {
            Overlay::Form(form) => self.submit_form(form),
            Overlay::ExportMenu { index } => {
                let document = DocumentKind::MENU.get(index).copied()?;
                if document == DocumentKind::Word {
                    self.overlay = Overlay::Form(FormState::word_export(&self.cache));
                    return None;
                }
                Some(self.export(document, ExportFilter::default()))
            }
            Overlay::ImportPrompt(input) => {
                let path = expand_home(input.value.trim());
                if path.as_os_str().is_empty() {
                    self.overlay = Overlay::ImportPrompt(input);
                    self.fail("Import", ConsoleError::validation("Enter the path of a file to import"));
                    return None;
                }
                let id = self.next_id();
                self.pending_transfer = Some(id);
                self.status = format!("Importing {}...", path.display());
                Some(NetworkCommand::Import { id, path })
            }
            other => {
                self.overlay = other;
                None
            }
        }
    }

    fn submit_form(&mut self, form: FormState) -> Option<NetworkCommand> {
        match form.purpose {
            FormPurpose::WordExport => match form.to_export_filter() {
                Ok(filter) => Some(self.export(DocumentKind::Word, filter)),
                Err(e) => {
                    self.overlay = Overlay::Form(form);
                    self.fail("Export", e);
                    None
                }
            },
            FormPurpose::Create(kind) | FormPurpose::Edit(kind, _) => {
                if self.pending_mutation.is_some() {
                    self.overlay = Overlay::Form(form);
                    self.status = "A save is already in progress".to_string();
                    return None;
                }
                let draft = match form.to_draft() {
                    Ok(draft) => draft,
                    Err(e) => {
                        self.overlay = Overlay::Form(form);
                        self.fail("Save", e);
                        return None;
                    }
                };
                let mutation = match form.purpose {
                    FormPurpose::Edit(_, id) => {
                        if self.cache.find(kind, id).is_none() {
                            self.overlay = Overlay::Form(form);
                            self.fail("Save", ConsoleError::StaleReference { kind, id });
                            return None;
                        }
                        Mutation::Update(id, draft)
                    }
                    _ => Mutation::Create(draft),
                };
                // The form stays open until the server answers
                let purpose = form.purpose;
                self.overlay = Overlay::Form(form);
                self.mutate(kind, mutation, Some(purpose))
            }
        }
    }

    fn mutate(
        &mut self,
        kind: ResourceKind,
        mutation: Mutation,
        purpose: Option<FormPurpose>,
    ) -> Option<NetworkCommand> {
        let id = self.next_id();
        let verb = mutation.verb();
        tracing::info!(id, kind = %kind, verb, "Submitting mutation");
        self.pending_mutation = Some(PendingMutation { id, kind, verb, purpose });
        self.status = format!("Saving {}...", kind);
        Some(NetworkCommand::Mutate { id, kind, mutation })
    }

    // ========================
    // Export / import
    // ========================

    pub fn open_export_menu(&mut self) {
        self.overlay = Overlay::ExportMenu { index: 0 };
    }

    fn export(&mut self, document: DocumentKind, filter: ExportFilter) -> NetworkCommand {
        let id = self.next_id();
        self.pending_transfer = Some(id);
        self.status = format!("Exporting {}...", document.label());
        NetworkCommand::Export { id, document, filter }
    }

    pub fn open_import(&mut self) {
        self.overlay = Overlay::ImportPrompt(TextInput::default());
    }

    /// Complete the import path like a shell does
    pub fn autocomplete_path(&mut self) {
        if let Overlay::ImportPrompt(input) = &mut self.overlay {
            if let Some(completed) = complete_path(&input.value) {
                input.set(completed);
            }
        }
    }

    // ========================
    // Popups
    // ========================

    pub fn toggle_help(&mut self) {
        self.overlay = match self.overlay {
            Overlay::Help => Overlay::None,
            _ => Overlay::Help,
        };
    }

    pub fn close_help(&mut self) {
        self.overlay = Overlay::None;
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggle();
    }

    /// Log a failed action and show it in a blocking notice
    fn fail(&mut self, action: &str, error: ConsoleError) {
        tracing::error!(action, error = %error, "Action failed");
        self.status = format!("{} failed", action);
        self.notice = Some(Notice::error(format!("{} failed", action), error.to_string()));
    }

    // ========================
    // Network responses
    // ========================

    /// Apply a network response; returns follow-up commands (reloads)
    pub fn handle_response(&mut self, response: NetworkResponse) -> Vec<NetworkCommand> {
        match response {
            NetworkResponse::Loaded { seq, kind, collections } => {
                if !self.is_latest_load(kind, seq) {
                    tracing::warn!(seq, latest = ?self.latest_loads.get(&kind), kind = %kind, "Discarding stale load");
                    return Vec::new();
                }
                self.loading.remove(&kind);
                for (loaded_kind, records) in collections {
                    // A dependency loaded later on its own is fresher than this copy
                    if self.latest_loads.get(&loaded_kind).is_some_and(|&latest| latest > seq) {
                        continue;
                    }
                    self.cache.replace(loaded_kind, records);
                }
                if kind == self.active_kind {
                    self.status = format!("{}: {} records", kind, self.cache.len(kind));
                }
                self.retain_selection();
                Vec::new()
            }
            NetworkResponse::LoadFailed { seq, kind, error } => {
                if !self.is_latest_load(kind, seq) {
                    tracing::warn!(seq, latest = ?self.latest_loads.get(&kind), kind = %kind, "Discarding stale load failure");
                    return Vec::new();
                }
                self.loading.remove(&kind);
                self.fail(&format!("Loading {}", kind), error);
                Vec::new()
            }
            NetworkResponse::Mutated { id, kind } => {
                let Some(pending) = self.pending_mutation.filter(|p| p.id == id) else {
                    return Vec::new();
                };
                self.pending_mutation = None;
                tracing::info!(id, kind = %kind, verb = pending.verb, "Mutation applied");
                // Only the form that submitted closes; a newer one keeps its input
                if let Overlay::Form(form) = &self.overlay {
                    if Some(form.purpose) == pending.purpose {
                        self.overlay = Overlay::None;
                    }
                }
                vec![self.reload()]
            }
            NetworkResponse::MutationFailed { id, kind, error } => {
                let Some(pending) = self.pending_mutation.filter(|p| p.id == id) else {
                    return Vec::new();
                };
                self.pending_mutation = None;
                self.fail(&format!("{} {}", pending.verb, kind.noun()), error);
                Vec::new()
            }
            NetworkResponse::Exported { id, path } => {
                if self.finish_transfer(id) {
                    tracing::info!(id, path = %path.display(), "Export saved");
                    self.status = format!("Saved {}", path.display());
                    self.notice = Some(Notice::info("Export", format!("Saved to {}", path.display())));
                }
                Vec::new()
            }
            NetworkResponse::Imported { id, count } => {
                if !self.finish_transfer(id) {
                    return Vec::new();
                }
                tracing::info!(id, count, "Import finished");
                self.notice = Some(Notice::info("Import", format!("Imported: {}", count)));
                vec![self.load(ResourceKind::Schedule, None)]
            }
            NetworkResponse::ExportFailed { id, error } => {
                if self.finish_transfer(id) {
                    self.fail("Export", error);
                }
                Vec::new()
            }
            NetworkResponse::ImportFailed { id, error } => {
                if self.finish_transfer(id) {
                    self.fail("Import", error);
                }
                Vec::new()
            }
        }
    }

    fn finish_transfer(&mut self, id: u64) -> bool {
        if self.pending_transfer == Some(id) {
            self.pending_transfer = None;
            true
        } else {
            false
        }
    }
}

/// Expand a leading `~` to the home directory
fn expand_home(input: &str) -> PathBuf {
    if let Some(rest) = input.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest.trim_start_matches('/'));
        }
    }
    PathBuf::from(input)
}

/// Complete a partial path: a unique match is completed in full, several
/// matches are completed to their common prefix. Hidden entries are skipped.
fn complete_path(input: &str) -> Option<String> {
    use std::fs;

    let expanded = expand_home(input).to_string_lossy().to_string();
    let path = PathBuf::from(&expanded);

    if path.is_dir() && !expanded.ends_with('/') {
        return Some(format!("{}/", expanded));
    }

    let (parent, prefix) = if expanded.ends_with('/') {
        (PathBuf::from(&expanded), String::new())
    } else {
        let prefix = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        (parent, prefix)
    };

    let mut matches: Vec<(String, bool)> = fs::read_dir(&parent)
        .ok()?
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let is_dir = e.path().is_dir();
            e.file_name().into_string().ok().map(|name| (name, is_dir))
        })
        .filter(|(name, _)| name.starts_with(&prefix) && !name.starts_with('.'))
        .collect();
    matches.sort();

    match matches.as_slice() {
        [] => None,
        [(name, is_dir)] => {
            let completed = parent.join(name).to_string_lossy().to_string();
            Some(if *is_dir { format!("{}/", completed) } else { completed })
        }
        _ => {
            let names: Vec<String> = matches.iter().map(|(n, _)| n.clone()).collect();
            let common = common_prefix(&names)?;
            (common.len() > prefix.len()).then(|| parent.join(common).to_string_lossy().to_string())
        }
    }
}

fn common_prefix(strings: &[String]) -> Option<String> {
    let first = strings.first()?;
    let mut end = first.len();
    for s in &strings[1..] {
        end = first
            .char_indices()
            .zip(s.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map(|((i, c), _)| i + c.len_utf8())
            .unwrap_or(0)
            .min(end);
    }
    Some(first[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::form::FieldInput;
    use crate::app::state::Overlay;
    use crate::messages::ui_events::Focus;
    use crate::models::{Group, Record, Room, ScheduleEntry, Subject, Teacher};
    use crate::view::{FilterChoice, SortOrder};
    use std::collections::HashMap;

    fn group(id: RecordId, name: &str) -> Record {
        Record::Group(Group { id, name: name.to_string() })
    }

    fn loaded(seq: u64, kind: ResourceKind, records: Vec<Record>) -> NetworkResponse {
        NetworkResponse::Loaded { seq, kind, collections: HashMap::from([(kind, records)]) }
    }

    fn load_seq(cmd: &NetworkCommand) -> u64 {
        match cmd {
            NetworkCommand::Load { seq, .. } => *seq,
            other => panic!("expected load, got {:?}", other),
        }
    }

    /// State on the Groups tab with [1 A, 2 B, 3 C] loaded
    fn groups_state() -> AppState {
        let mut state = AppState::new();
        let cmd = state.switch_kind(ResourceKind::Group);
        let seq = load_seq(&cmd);
        state.handle_response(loaded(
            seq,
            ResourceKind::Group,
            vec![group(1, "A"), group(2, "B"), group(3, "C")],
        ));
        state
    }

    #[test]
    fn test_switch_kind_resets_view_and_loads() {
        let mut state = groups_state();
        state.filter.search = "B".into();
        state.select_next();
        state.input_mode = InputMode::Search;

        let cmd = state.switch_kind(ResourceKind::Room);
        assert!(matches!(cmd, NetworkCommand::Load { kind: ResourceKind::Room, query: None, .. }));
        assert_eq!(state.filter, Default::default());
        assert_eq!(state.selected, None);
        assert_eq!(state.input_mode, InputMode::Normal);
        assert_eq!(state.active_kind, ResourceKind::Room);
    }

    #[test]
    fn test_loaded_replaces_cache() {
        let mut state = groups_state();
        let seq = load_seq(&state.reload());
        state.handle_response(loaded(seq, ResourceKind::Group, vec![group(9, "Z")]));
        assert_eq!(state.cache.get(ResourceKind::Group), &[group(9, "Z")]);
        assert!(!state.loading.contains(&ResourceKind::Group));
    }

    #[test]
    fn test_stale_load_is_discarded() {
        let mut state = groups_state();
        let first = load_seq(&state.reload());
        let second = load_seq(&state.reload());

        state.handle_response(loaded(second, ResourceKind::Group, vec![group(2, "new")]));
        state.handle_response(loaded(first, ResourceKind::Group, vec![group(1, "old")]));
        assert_eq!(state.cache.get(ResourceKind::Group), &[group(2, "new")]);
        assert!(!state.to_render_state().is_loading);
    }

    #[test]
    fn test_load_of_left_tab_does_not_block_active_tab() {
        let mut state = AppState::new();
        let groups = load_seq(&state.switch_kind(ResourceKind::Group));
        let rooms = load_seq(&state.switch_kind(ResourceKind::Room));

        let room = Record::Room(Room { id: 4, number: "101".into() });
        state.handle_response(loaded(rooms, ResourceKind::Room, vec![room.clone()]));
        state.handle_response(loaded(groups, ResourceKind::Group, vec![group(1, "A")]));

        assert_eq!(state.cache.get(ResourceKind::Room), &[room]);
        assert_eq!(state.cache.get(ResourceKind::Group), &[group(1, "A")]);
        assert_eq!(state.status, "Rooms: 1 records");
        assert!(!state.to_render_state().is_loading);
    }

    #[test]
    fn test_import_reload_keeps_tab_switch_load() {
        let mut state = groups_state();
        state.open_import();
        for c in "/tmp/lessons.xlsx".chars() {
            state.enter_char(c);
        }
        let import_id = match state.submit() {
            Some(NetworkCommand::Import { id, .. }) => id,
            other => panic!("unexpected {:?}", other),
        };
        let teachers = load_seq(&state.switch_kind(ResourceKind::Teacher));

        let follow = state.handle_response(NetworkResponse::Imported { id: import_id, count: 3 });
        let schedule = match follow.as_slice() {
            [NetworkCommand::Load { seq, kind: ResourceKind::Schedule, .. }] => *seq,
            other => panic!("unexpected {:?}", other),
        };

        let teacher = Record::Teacher(Teacher { id: 7, fio: "Ivanova".into() });
        state.handle_response(loaded(teachers, ResourceKind::Teacher, vec![teacher.clone()]));
        assert_eq!(state.active_kind, ResourceKind::Teacher);
        assert_eq!(state.visible_rows().len(), 1);
        assert!(!state.to_render_state().is_loading);

        let entry = Record::Schedule(ScheduleEntry { id: 1, ..Default::default() });
        let collections = HashMap::from([
            (ResourceKind::Schedule, vec![entry.clone()]),
            (ResourceKind::Teacher, vec![teacher.clone()]),
            (ResourceKind::Group, vec![group(1, "A")]),
        ]);
        state.handle_response(NetworkResponse::Loaded { seq: schedule, kind: ResourceKind::Schedule, collections });
        assert_eq!(state.cache.get(ResourceKind::Schedule), &[entry]);
        assert_eq!(state.cache.get(ResourceKind::Teacher), &[teacher]);
        assert_eq!(state.status, "Teachers: 1 records");
    }

    #[test]
    fn test_dependency_copy_older_than_own_load_is_skipped() {
        let mut state = AppState::new();
        let schedule = load_seq(&state.reload());
        let groups = load_seq(&state.load(ResourceKind::Group, None));

        state.handle_response(loaded(groups, ResourceKind::Group, vec![group(1, "fresh")]));
        let collections = HashMap::from([
            (ResourceKind::Schedule, Vec::new()),
            (ResourceKind::Group, vec![group(1, "old")]),
        ]);
        state.handle_response(NetworkResponse::Loaded { seq: schedule, kind: ResourceKind::Schedule, collections });
        assert_eq!(state.cache.get(ResourceKind::Group), &[group(1, "fresh")]);
    }

    #[test]
    fn test_load_failure_keeps_cache_and_notifies() {
        let mut state = groups_state();
        let seq = load_seq(&state.reload());
        state.handle_response(NetworkResponse::LoadFailed {
            seq,
            kind: ResourceKind::Group,
            error: ConsoleError::Status { status: 500, message: "boom".into() },
        });
        assert_eq!(state.cache.len(ResourceKind::Group), 3);
        let notice = state.notice.as_ref().unwrap();
        assert!(notice.is_error);
        assert_eq!(notice.message, "HTTP 500: boom");
        assert_eq!(state.focus(), Focus::Notice);
    }

    #[test]
    fn test_edit_and_delete_without_selection_issue_nothing() {
        let mut state = groups_state();
        state.open_edit();
        assert_eq!(state.overlay, Overlay::None);
        assert_eq!(
            state.notice.as_ref().map(|n| n.message.as_str()),
            Some("Select a row to edit first")
        );

        state.dismiss_notice();
        state.request_delete();
        assert_eq!(state.overlay, Overlay::None);
        assert!(state.notice.is_some());
        assert_eq!(state.confirm_delete().map(|_| ()), None);
        assert!(state.pending_mutation.is_none());
    }

    #[test]
    fn test_stale_selection_is_reported() {
        let mut state = groups_state();
        state.selected = Some(42);
        state.open_edit();
        assert_eq!(state.overlay, Overlay::None);
        let notice = state.notice.as_ref().unwrap();
        assert!(notice.message.contains("no longer loaded"));
    }

    #[test]
    fn test_delete_flow_requires_confirmation_then_reloads() {
        let mut state = groups_state();
        state.select_next();
        assert_eq!(state.selected, Some(1));

        state.request_delete();
        assert!(matches!(state.overlay, Overlay::ConfirmDelete { id: 1, .. }));

        let cmd = state.confirm_delete().unwrap();
        let mutation_id = match cmd {
            NetworkCommand::Mutate { id, kind: ResourceKind::Group, mutation: Mutation::Delete(1) } => id,
            other => panic!("unexpected {:?}", other),
        };

        let follow = state.handle_response(NetworkResponse::Mutated { id: mutation_id, kind: ResourceKind::Group });
        assert_eq!(follow.len(), 1);
        let seq = load_seq(&follow[0]);
        state.handle_response(loaded(seq, ResourceKind::Group, vec![group(2, "B"), group(3, "C")]));
        assert_eq!(state.selected, None);
        let ids: Vec<RecordId> = state.cache.get(ResourceKind::Group).iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(state.visible_rows().len(), 2);
    }

    #[test]
    fn test_confirm_no_closes_without_request() {
        let mut state = groups_state();
        state.select_next();
        state.request_delete();
        state.cancel();
        assert_eq!(state.overlay, Overlay::None);
        assert!(state.pending_mutation.is_none());
    }

    #[test]
    fn test_create_validation_keeps_form_open() {
        let mut state = groups_state();
        state.open_create();
        assert_eq!(state.submit().map(|_| ()), None);
        assert!(matches!(state.overlay, Overlay::Form(_)));
        assert_eq!(
            state.notice.as_ref().map(|n| n.message.as_str()),
            Some("Group name is required")
        );
    }

    #[test]
    fn test_create_success_closes_form_and_reloads() {
        let mut state = groups_state();
        state.open_create();
        for c in "CS-201".chars() {
            state.enter_char(c);
        }
        let cmd = state.submit().unwrap();
        let id = match cmd {
            NetworkCommand::Mutate { id, mutation: Mutation::Create(draft), .. } => {
                assert_eq!(draft.form_fields(), vec![("name", "CS-201".to_string())]);
                id
            }
            other => panic!("unexpected {:?}", other),
        };
        assert!(matches!(state.overlay, Overlay::Form(_)));

        let follow = state.handle_response(NetworkResponse::Mutated { id, kind: ResourceKind::Group });
        assert_eq!(state.overlay, Overlay::None);
        assert!(matches!(follow.as_slice(), [NetworkCommand::Load { kind: ResourceKind::Group, .. }]));
    }

    #[test]
    fn test_create_then_reload_adds_exactly_one_record() {
        let mut state = groups_state();
        let before = state.cache.get(ResourceKind::Group).to_vec();

        state.open_create();
        for c in "CS-201".chars() {
            state.enter_char(c);
        }
        let id = match state.submit() {
            Some(NetworkCommand::Mutate { id, .. }) => id,
            other => panic!("unexpected {:?}", other),
        };
        let follow = state.handle_response(NetworkResponse::Mutated { id, kind: ResourceKind::Group });
        let seq = load_seq(&follow[0]);

        let mut after = before.clone();
        after.push(group(4, "CS-201"));
        state.handle_response(loaded(seq, ResourceKind::Group, after));

        let cached = state.cache.get(ResourceKind::Group);
        assert_eq!(cached.len(), before.len() + 1);
        assert!(before.iter().all(|r| cached.contains(r)));
        let added: Vec<&Record> = cached.iter().filter(|r| !before.contains(r)).collect();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].display_field(), "CS-201");
        assert_eq!(state.visible_rows().len(), 4);
    }

    #[test]
    fn test_late_save_reply_keeps_newer_form() {
        let mut state = groups_state();
        state.open_create();
        state.enter_char('X');
        let id = match state.submit() {
            Some(NetworkCommand::Mutate { id, .. }) => id,
            other => panic!("unexpected {:?}", other),
        };
        state.cancel();
        state.open_create();
        for c in "Draft".chars() {
            state.enter_char(c);
        }

        let follow = state.handle_response(NetworkResponse::Mutated { id, kind: ResourceKind::Group });
        assert_eq!(follow.len(), 1);
        let Overlay::Form(form) = &state.overlay else {
            panic!("newer form was closed");
        };
        assert_eq!(form.fields[0].display_value(), "Draft");
    }

    #[test]
    fn test_save_reply_leaves_other_form_open() {
        let mut state = groups_state();
        state.open_create();
        state.enter_char('X');
        let id = match state.submit() {
            Some(NetworkCommand::Mutate { id, .. }) => id,
            other => panic!("unexpected {:?}", other),
        };
        // Swap in an unrelated form without going through cancel
        state.overlay = Overlay::Form(FormState::word_export(&state.cache));

        state.handle_response(NetworkResponse::Mutated { id, kind: ResourceKind::Group });
        assert!(matches!(&state.overlay, Overlay::Form(f) if f.purpose == FormPurpose::WordExport));
    }

    #[test]
    fn test_mutation_failure_keeps_cache_and_form() {
        let mut state = groups_state();
        state.open_create();
        state.enter_char('X');
        let id = match state.submit() {
            Some(NetworkCommand::Mutate { id, .. }) => id,
            other => panic!("unexpected {:?}", other),
        };
        let follow = state.handle_response(NetworkResponse::MutationFailed {
            id,
            kind: ResourceKind::Group,
            error: ConsoleError::Status { status: 422, message: "duplicate".into() },
        });
        assert!(follow.is_empty());
        assert_eq!(state.cache.len(ResourceKind::Group), 3);
        assert!(matches!(state.overlay, Overlay::Form(_)));
        let notice = state.notice.as_ref().unwrap();
        assert_eq!(notice.title, "Create group failed");
        assert_eq!(notice.message, "HTTP 422: duplicate");
    }

    #[test]
    fn test_edit_prefills_and_submits_update() {
        let mut state = groups_state();
        state.select_next();
        state.select_next();
        state.open_edit();
        let Overlay::Form(form) = &state.overlay else {
            panic!("form not open");
        };
        assert_eq!(form.fields[0].display_value(), "B");
        state.enter_char('2');
        match state.submit() {
            Some(NetworkCommand::Mutate { mutation: Mutation::Update(2, draft), .. }) => {
                assert_eq!(draft.form_fields(), vec![("name", "B2".to_string())]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_sort_cycles_through_options() {
        let mut state = groups_state();
        state.next_filter();
        assert_eq!(state.filter.choice, Some(FilterChoice::Sort(SortOrder::OPTIONS[0])));
        state.next_filter();
        assert_eq!(state.filter.choice, Some(FilterChoice::Sort(SortOrder::OPTIONS[1])));
        let ids: Vec<RecordId> = state.visible_rows().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        state.prev_filter();
        state.prev_filter();
        assert_eq!(state.filter.choice, None);
        state.prev_filter();
        assert_eq!(state.filter.choice, Some(FilterChoice::Sort(SortOrder::OPTIONS[3])));
    }

    #[test]
    fn test_search_hides_selected_row() {
        let mut state = groups_state();
        state.select_next();
        state.start_search();
        state.enter_char('c');
        assert_eq!(state.visible_rows().len(), 1);
        assert_eq!(state.selected, None);
        state.clear_search();
        assert_eq!(state.visible_rows().len(), 3);
    }

    #[test]
    fn test_search_backspace_drops_hidden_selection() {
        let mut state = groups_state();
        state.start_search();
        state.enter_char('c');
        state.enter_char('x');
        state.selected = Some(1);
        state.delete_char();
        assert_eq!(state.filter.search, "c");
        assert_eq!(state.selected, None);

        state.selected = Some(3);
        state.delete_char();
        assert_eq!(state.selected, Some(3));
    }

    #[test]
    fn test_server_filter_only_for_schedule() {
        let mut state = groups_state();
        assert!(state.server_filter().is_none());

        let mut state = AppState::new();
        state.filter.search = "lab".into();
        match state.server_filter() {
            Some(NetworkCommand::Load { kind: ResourceKind::Schedule, query: Some(q), .. }) => {
                assert_eq!(q.pairs(), &[("q", "lab".to_string())]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_schedule_filter_and_resolved_search() {
        let mut state = AppState::new();
        let seq = load_seq(&state.reload());
        let entry = |id, group_id, subject_id| {
            Record::Schedule(ScheduleEntry {
                id,
                group_id: Some(group_id),
                subject_id: Some(subject_id),
                ..Default::default()
            })
        };
        let collections = HashMap::from([
            (ResourceKind::Schedule, vec![entry(1, 3, 9), entry(2, 4, 8)]),
            (ResourceKind::Group, vec![group(3, "G3"), group(4, "G4")]),
            (
                ResourceKind::Subject,
                vec![
                    Record::Subject(Subject { id: 9, name: "CS-101".into() }),
                    Record::Subject(Subject { id: 8, name: "Math".into() }),
                ],
            ),
            (ResourceKind::Teacher, vec![Record::Teacher(Teacher { id: 5, fio: "T".into() })]),
            (ResourceKind::Room, Vec::new()),
        ]);
        state.handle_response(NetworkResponse::Loaded { seq, kind: ResourceKind::Schedule, collections });
        assert_eq!(state.stats().lessons, 2);
        assert_eq!(state.stats().teachers, 1);

        state.start_search();
        for c in "101".chars() {
            state.enter_char(c);
        }
        let ids: Vec<RecordId> = state.visible_rows().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1]);

        state.clear_search();
        state.next_filter();
        state.next_filter();
        let render = state.to_render_state();
        assert_eq!(render.filter_label, "G: G4");
        assert_eq!(render.rows.len(), 1);
        assert_eq!(render.rows[0].id, 2);
    }

    #[test]
    fn test_export_menu_word_opens_form() {
        let mut state = groups_state();
        state.open_export_menu();
        assert_eq!(state.submit().map(|_| ()), None);
        let Overlay::Form(form) = &state.overlay else {
            panic!("word export form not open");
        };
        assert_eq!(form.purpose, FormPurpose::WordExport);

        state.cancel();
        state.open_export_menu();
        state.next_field();
        match state.submit() {
            Some(NetworkCommand::Export { document: DocumentKind::Pdf, .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(state.overlay, Overlay::None);
    }

    #[test]
    fn test_import_success_reloads_schedule() {
        let mut state = groups_state();
        state.open_import();
        assert_eq!(state.submit().map(|_| ()), None);
        assert!(matches!(state.overlay, Overlay::ImportPrompt(_)));
        state.dismiss_notice();

        for c in "/tmp/lessons.xlsx".chars() {
            state.enter_char(c);
        }
        let id = match state.submit() {
            Some(NetworkCommand::Import { id, path }) => {
                assert_eq!(path, PathBuf::from("/tmp/lessons.xlsx"));
                id
            }
            other => panic!("unexpected {:?}", other),
        };
        let follow = state.handle_response(NetworkResponse::Imported { id, count: 12 });
        assert_eq!(state.notice.as_ref().map(|n| n.message.as_str()), Some("Imported: 12"));
        assert!(matches!(follow.as_slice(), [NetworkCommand::Load { kind: ResourceKind::Schedule, .. }]));
    }

    #[test]
    fn test_form_typing_goes_to_focused_field() {
        let mut state = AppState::new();
        state.open_create();
        state.enter_char('2');
        state.next_field();
        state.next_field();
        state.move_cursor_right();
        let Overlay::Form(form) = &state.overlay else {
            panic!("form not open");
        };
        assert_eq!(form.fields[0].display_value(), "2");
        assert!(matches!(form.fields[2].input, FieldInput::Select(_)));
        assert_eq!(form.focus, 2);
    }

    #[test]
    fn test_complete_path_unique_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lessons.xlsx"), b"x").unwrap();
        std::fs::write(dir.path().join("other.csv"), b"x").unwrap();
        let partial = format!("{}/les", dir.path().display());
        let completed = complete_path(&partial).unwrap();
        assert!(completed.ends_with("lessons.xlsx"));
    }

    #[test]
    fn test_common_prefix() {
        let names = vec!["itog_2024.xlsx".to_string(), "itog_2025.xlsx".to_string()];
        assert_eq!(common_prefix(&names).as_deref(), Some("itog_202"));
    }
}
