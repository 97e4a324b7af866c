//! App actor - message loop processing UI events and network responses

use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::app::state::AppState;
use crate::messages::{NetworkCommand, NetworkResponse, RenderState, UiEvent};
use crate::prefs::Prefs;

/// App actor that processes UI events and network responses
pub struct AppActor {
    state: AppState,
    prefs_path: Option<PathBuf>,
    network_tx: mpsc::UnboundedSender<NetworkCommand>,
    render_tx: mpsc::UnboundedSender<RenderState>,
}

impl AppActor {
    /// `prefs_path` is where theme changes are saved; `None` keeps them in memory
    pub fn new(
        prefs: Prefs,
        prefs_path: Option<PathBuf>,
        network_tx: mpsc::UnboundedSender<NetworkCommand>,
        render_tx: mpsc::UnboundedSender<RenderState>,
    ) -> Self {
        AppActor {
            state: AppState::new().with_theme(prefs.theme),
            prefs_path,
            network_tx,
            render_tx,
        }
    }

    fn send(&self, cmd: NetworkCommand) {
        let _ = self.network_tx.send(cmd);
    }

    /// Run the actor message loop
    pub async fn run(
        mut self,
        mut ui_rx: mpsc::UnboundedReceiver<UiEvent>,
        mut net_rx: mpsc::UnboundedReceiver<NetworkResponse>,
    ) {
        // Initial load of the active tab
        let cmd = self.state.reload();
        self.send(cmd);
        let _ = self.render_tx.send(self.state.to_render_state());

        loop {
            tokio::select! {
                Some(event) = ui_rx.recv() => {
                    if self.handle_ui_event(event) {
                        // Quit signal received
                        self.send(NetworkCommand::Shutdown);
                        break;
                    }
                    let _ = self.render_tx.send(self.state.to_render_state());
                }
                Some(response) = net_rx.recv() => {
                    for cmd in self.state.handle_response(response) {
                        self.send(cmd);
                    }
                    let _ = self.render_tx.send(self.state.to_render_state());
                }
                else => break,
            }
        }
    }

    /// Handle a UI event, returns true if quit was requested
    fn handle_ui_event(&mut self, event: UiEvent) -> bool {
        let cmd = match event {
            // Tabs
            UiEvent::SwitchKind(kind) => Some(self.state.switch_kind(kind)),
            UiEvent::NextKind => Some(self.state.next_kind()),
            UiEvent::PrevKind => Some(self.state.prev_kind()),
            UiEvent::Reload => Some(self.state.reload()),

            // Selection
            UiEvent::SelectNext => {
                self.state.select_next();
                None
            }
            UiEvent::SelectPrev => {
                self.state.select_prev();
                None
            }

            // Filter, sort, search
            UiEvent::NextFilter => {
                self.state.next_filter();
                None
            }
            UiEvent::PrevFilter => {
                self.state.prev_filter();
                None
            }
            UiEvent::ClearFilter => {
                self.state.clear_filter();
                None
            }
            UiEvent::StartSearch => {
                self.state.start_search();
                None
            }
            UiEvent::StopSearch => {
                self.state.stop_search();
                None
            }
            UiEvent::ClearSearch => {
                self.state.clear_search();
                None
            }
            UiEvent::ServerFilter => self.state.server_filter(),

            // Text input
            UiEvent::CharInput(c) => {
                self.state.enter_char(c);
                None
            }
            UiEvent::Backspace => {
                self.state.delete_char();
                None
            }
            UiEvent::CursorLeft => {
                self.state.move_cursor_left();
                None
            }
            UiEvent::CursorRight => {
                self.state.move_cursor_right();
                None
            }

            // Mutations
            UiEvent::OpenCreate => {
                self.state.open_create();
                None
            }
            UiEvent::OpenEdit => {
                self.state.open_edit();
                None
            }
            UiEvent::RequestDelete => {
                self.state.request_delete();
                None
            }
            UiEvent::ConfirmYes => self.state.confirm_delete(),
            UiEvent::ConfirmNo | UiEvent::Cancel => {
                self.state.cancel();
                None
            }

            // Forms and menus
            UiEvent::NextField => {
                self.state.next_field();
                None
            }
            UiEvent::PrevField => {
                self.state.prev_field();
                None
            }
            UiEvent::Submit => self.state.submit(),
            UiEvent::Autocomplete => {
                self.state.autocomplete_path();
                None
            }

            // Export / import
            UiEvent::OpenExportMenu => {
                self.state.open_export_menu();
                None
            }
            UiEvent::OpenImport => {
                self.state.open_import();
                None
            }

            // Popups
            UiEvent::ToggleHelp => {
                self.state.toggle_help();
                None
            }
            UiEvent::CloseHelp => {
                self.state.close_help();
                None
            }
            UiEvent::DismissNotice => {
                self.state.dismiss_notice();
                None
            }

            UiEvent::ToggleTheme => {
                self.state.toggle_theme();
                self.save_prefs();
                None
            }

            // System
            UiEvent::Quit => return true,
        };

        if let Some(cmd) = cmd {
            self.send(cmd);
        }
        false
    }

    fn save_prefs(&self) {
        let Some(path) = &self.prefs_path else {
            return;
        };
        let prefs = Prefs { theme: self.state.theme };
        if let Err(e) = prefs.save(path) {
            tracing::error!(path = %path.display(), error = %e, "Failed to save preferences");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResourceKind;
    use crate::prefs::Theme;

    fn actor(prefs_path: Option<PathBuf>) -> (
        AppActor,
        mpsc::UnboundedReceiver<NetworkCommand>,
        mpsc::UnboundedReceiver<RenderState>,
    ) {
        let (net_tx, net_rx) = mpsc::unbounded_channel();
        let (render_tx, render_rx) = mpsc::unbounded_channel();
        (AppActor::new(Prefs::default(), prefs_path, net_tx, render_tx), net_rx, render_rx)
    }

    #[test]
    fn test_switch_kind_sends_load() {
        let (mut actor, mut net_rx, _render_rx) = actor(None);
        assert!(!actor.handle_ui_event(UiEvent::SwitchKind(ResourceKind::Subject)));
        match net_rx.try_recv() {
            Ok(NetworkCommand::Load { kind: ResourceKind::Subject, .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_edit_without_selection_sends_nothing() {
        let (mut actor, mut net_rx, _render_rx) = actor(None);
        actor.handle_ui_event(UiEvent::OpenEdit);
        actor.handle_ui_event(UiEvent::RequestDelete);
        actor.handle_ui_event(UiEvent::ConfirmYes);
        assert!(net_rx.try_recv().is_err());
        assert!(actor.state.notice.is_some());
    }

    #[test]
    fn test_toggle_theme_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.yaml");
        let (mut actor, _net_rx, _render_rx) = actor(Some(path.clone()));
        actor.handle_ui_event(UiEvent::ToggleTheme);
        assert_eq!(actor.state.theme, Theme::Dark);
        assert_eq!(Prefs::load(&path).theme, Theme::Dark);
    }

    #[test]
    fn test_quit() {
        let (mut actor, _net_rx, _render_rx) = actor(None);
        assert!(actor.handle_ui_event(UiEvent::Quit));
    }
}
