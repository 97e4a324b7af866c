//! UI events - messages from UI layer to App layer

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::models::ResourceKind;

/// Events generated from user input in the UI layer
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    // Tab navigation
    SwitchKind(ResourceKind),
    NextKind,
    PrevKind,
    Reload,

    // Row selection
    SelectNext,
    SelectPrev,

    // Filter, sort, search
    NextFilter,
    PrevFilter,
    ClearFilter,
    StartSearch,
    StopSearch,
    ClearSearch,
    ServerFilter,

    // Text input (search box, forms, path prompt)
    CharInput(char),
    Backspace,
    CursorLeft,
    CursorRight,

    // Mutations
    OpenCreate,
    OpenEdit,
    RequestDelete,
    ConfirmYes,
    ConfirmNo,

    // Forms and menus
    NextField,
    PrevField,
    Submit,
    Cancel,
    Autocomplete,

    // Export / import
    OpenExportMenu,
    OpenImport,

    // Popups
    ToggleHelp,
    CloseHelp,
    DismissNotice,

    ToggleTheme,

    // System
    Quit,
}

/// Input mode of the main table view
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum InputMode {
    #[default]
    Normal,
    /// Typing into the search box
    Search,
}

/// Which popup currently owns the keyboard
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Focus {
    #[default]
    Table,
    Help,
    Notice,
    Form,
    ConfirmDelete,
    ExportMenu,
    ImportPrompt,
}

/// Convert a key event to a UiEvent based on current UI context
pub fn key_to_ui_event(key: KeyEvent, focus: Focus, input_mode: InputMode) -> Option<UiEvent> {
    use crossterm::event::KeyEventKind;

    if key.kind != KeyEventKind::Press {
        return None;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(UiEvent::Quit);
    }

    // Popups first
    match focus {
        Focus::Notice => return Some(UiEvent::DismissNotice),
        Focus::Help => return Some(UiEvent::CloseHelp),
        Focus::ConfirmDelete => {
            return match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => Some(UiEvent::ConfirmYes),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Some(UiEvent::ConfirmNo),
                _ => None,
            };
        }
        Focus::ExportMenu => {
            return match key.code {
                KeyCode::Up | KeyCode::BackTab => Some(UiEvent::PrevField),
                KeyCode::Down | KeyCode::Tab => Some(UiEvent::NextField),
                KeyCode::Enter => Some(UiEvent::Submit),
                KeyCode::Esc | KeyCode::Char('q') => Some(UiEvent::Cancel),
                _ => None,
            };
        }
        Focus::Form => return form_keys(key),
        Focus::ImportPrompt => {
            return match key.code {
                KeyCode::Esc => Some(UiEvent::Cancel),
                KeyCode::Enter => Some(UiEvent::Submit),
                KeyCode::Tab => Some(UiEvent::Autocomplete),
                KeyCode::Left => Some(UiEvent::CursorLeft),
                KeyCode::Right => Some(UiEvent::CursorRight),
                KeyCode::Backspace => Some(UiEvent::Backspace),
                KeyCode::Char(c) => Some(UiEvent::CharInput(c)),
                _ => None,
            };
        }
        Focus::Table => {}
    }

    match input_mode {
        InputMode::Search => match key.code {
            KeyCode::Enter => Some(UiEvent::StopSearch),
            KeyCode::Esc => Some(UiEvent::ClearSearch),
            KeyCode::Backspace => Some(UiEvent::Backspace),
            KeyCode::Char(c) => Some(UiEvent::CharInput(c)),
            _ => None,
        },
        InputMode::Normal => table_keys(key),
    }
}

/// Keys inside a create/edit/export form
fn form_keys(key: KeyEvent) -> Option<UiEvent> {
    match key.code {
        KeyCode::Esc => Some(UiEvent::Cancel),
        KeyCode::Enter => Some(UiEvent::Submit),
        KeyCode::Tab | KeyCode::Down => Some(UiEvent::NextField),
        KeyCode::BackTab | KeyCode::Up => Some(UiEvent::PrevField),
        KeyCode::Left => Some(UiEvent::CursorLeft),
        KeyCode::Right => Some(UiEvent::CursorRight),
        KeyCode::Backspace => Some(UiEvent::Backspace),
        KeyCode::Char(c) => Some(UiEvent::CharInput(c)),
        _ => None,
    }
}

/// Keys of the main table view
fn table_keys(key: KeyEvent) -> Option<UiEvent> {
    match key.code {
        KeyCode::Char('q') => Some(UiEvent::Quit),
        KeyCode::Char('?') => Some(UiEvent::ToggleHelp),
        KeyCode::Char(c @ '1'..='5') => {
            let index = c as usize - '1' as usize;
            ResourceKind::ALL.get(index).map(|k| UiEvent::SwitchKind(*k))
        }
        KeyCode::Tab => Some(UiEvent::NextKind),
        KeyCode::BackTab => Some(UiEvent::PrevKind),
        KeyCode::Up | KeyCode::Char('k') => Some(UiEvent::SelectPrev),
        KeyCode::Down | KeyCode::Char('j') => Some(UiEvent::SelectNext),
        KeyCode::Char('r') => Some(UiEvent::Reload),
        KeyCode::Char('f') => Some(UiEvent::NextFilter),
        KeyCode::Char('F') => Some(UiEvent::PrevFilter),
        KeyCode::Char('/') => Some(UiEvent::StartSearch),
        KeyCode::Char('S') => Some(UiEvent::ServerFilter),
        KeyCode::Esc | KeyCode::Char('c') => Some(UiEvent::ClearFilter),
        KeyCode::Char('a') => Some(UiEvent::OpenCreate),
        KeyCode::Char('e') | KeyCode::Enter => Some(UiEvent::OpenEdit),
        KeyCode::Char('d') | KeyCode::Delete => Some(UiEvent::RequestDelete),
        KeyCode::Char('x') => Some(UiEvent::OpenExportMenu),
        KeyCode::Char('i') => Some(UiEvent::OpenImport),
        KeyCode::Char('t') => Some(UiEvent::ToggleTheme),
        _ => None,
    }
}
