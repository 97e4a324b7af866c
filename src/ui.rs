//! Terminal drawing - a pure function of [`RenderState`]

use ratatui::{prelude::*, widgets::*};

use crate::app::form::{FieldInput, FormState};
use crate::app::state::{Notice, Overlay};
use crate::constants::APP_NAME;
use crate::messages::ui_events::{Focus, InputMode};
use crate::messages::RenderState;
use crate::models::{DocumentKind, ResourceKind};
use crate::prefs::Theme;

/// Colours for one theme
#[derive(Clone, Copy, Debug)]
pub struct Palette {
    pub fg: Color,
    pub bg: Color,
    pub accent: Color,
    pub muted: Color,
    pub highlight_fg: Color,
    pub highlight_bg: Color,
    pub error: Color,
    pub ok: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Palette {
        match theme {
            Theme::Light => Palette {
                fg: Color::Black,
                bg: Color::White,
                accent: Color::Blue,
                muted: Color::DarkGray,
                highlight_fg: Color::White,
                highlight_bg: Color::Blue,
                error: Color::Red,
                ok: Color::Green,
            },
            Theme::Dark => Palette {
                fg: Color::Gray,
                bg: Color::Black,
                accent: Color::Cyan,
                muted: Color::DarkGray,
                highlight_fg: Color::Black,
                highlight_bg: Color::Cyan,
                error: Color::LightRed,
                ok: Color::LightGreen,
            },
        }
    }

    fn base(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    fn popup_block<'a>(&self, title: impl Into<Line<'a>>) -> Block<'a> {
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.accent))
            .title(title)
            .style(self.base())
    }
}

/// Renders tabs
pub fn render_tabs<'a>(titles: Vec<String>, selected: usize, palette: &Palette) -> Tabs<'a> {
    Tabs::new(titles)
        .select(selected)
        .style(Style::default().fg(palette.muted))
        .highlight_style(Style::default().fg(palette.highlight_fg).bg(palette.highlight_bg).bold())
        .divider("|")
}

/// Column widths for `kind`'s table
fn column_widths(kind: ResourceKind) -> Vec<Constraint> {
    match kind {
        ResourceKind::Schedule => vec![
            Constraint::Length(10),
            Constraint::Length(5),
            Constraint::Fill(2),
            Constraint::Fill(1),
            Constraint::Fill(2),
            Constraint::Length(8),
            Constraint::Fill(1),
        ],
        _ => vec![Constraint::Length(8), Constraint::Fill(1)],
    }
}

pub fn draw(f: &mut Frame, state: &RenderState) {
    let palette = Palette::for_theme(state.theme);
    let area = f.area();
    f.render_widget(Block::default().style(palette.base()), area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Tab bar
            Constraint::Length(3), // Filter bar
            Constraint::Min(0),    // Table
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    draw_tab_bar(f, state, &palette, chunks[0]);
    draw_filter_bar(f, state, &palette, chunks[1]);
    draw_table(f, state, &palette, chunks[2]);
    draw_status_bar(f, state, &palette, chunks[3]);

    match &state.overlay {
        Overlay::None => {}
        Overlay::Help => draw_help_popup(f, &palette, area),
        Overlay::Form(form) => draw_form_popup(f, form, &palette, area),
        Overlay::ConfirmDelete { kind, label, .. } => {
            draw_confirm_popup(f, *kind, label, &palette, area)
        }
        Overlay::ExportMenu { index } => draw_export_menu(f, *index, &palette, area),
        Overlay::ImportPrompt(input) => {
            let popup = centered_rect(70, 20, area);
            let block = palette.popup_block(" Import file (Tab completes, Enter uploads, Esc cancels) ");
            let inner = block.inner(popup);
            f.render_widget(Clear, popup);
            f.render_widget(Paragraph::new(input.value.as_str()).block(block), popup);
            if state.notice.is_none() {
                f.set_cursor_position((inner.x + input.cursor_column() as u16, inner.y));
            }
        }
    }

    // Notices sit above everything, including an open form
    if let Some(notice) = &state.notice {
        draw_notice_popup(f, notice, &palette, area);
    }
}

fn draw_tab_bar(f: &mut Frame, state: &RenderState, palette: &Palette, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(APP_NAME.len() as u16 + 2)])
        .split(area);

    let titles = ResourceKind::ALL
        .iter()
        .enumerate()
        .map(|(i, kind)| format!(" {}:{} ", i + 1, kind.title()))
        .collect();
    f.render_widget(render_tabs(titles, state.active_kind.index(), palette), chunks[0]);
    f.render_widget(
        Paragraph::new(APP_NAME)
            .style(Style::default().fg(palette.accent).bold())
            .right_aligned(),
        chunks[1],
    );
}

fn draw_filter_bar(f: &mut Frame, state: &RenderState, palette: &Palette, area: Rect) {
    let searching = state.input_mode == InputMode::Search;
    let label = if state.active_kind == ResourceKind::Schedule { "Filter" } else { "Sort" };
    let search_style = if searching {
        Style::default().fg(palette.accent).bold()
    } else {
        Style::default().fg(palette.fg)
    };

    let line = Line::from(vec![
        Span::styled(format!(" {}: ", label), Style::default().fg(palette.muted)),
        Span::styled(state.filter_label.clone(), Style::default().fg(palette.fg).bold()),
        Span::styled("   Search: ", Style::default().fg(palette.muted)),
        Span::styled(state.search.clone(), search_style),
    ]);

    let stats = format!(
        " Groups: {}  Teachers: {}  Rooms: {}  Lessons: {} ",
        state.stats.groups, state.stats.teachers, state.stats.rooms, state.stats.lessons
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if searching { palette.accent } else { palette.muted }))
        .title_bottom(Line::from(stats).right_aligned());
    let inner = block.inner(area);
    f.render_widget(Paragraph::new(line).block(block), area);

    if searching && state.focus == Focus::Table {
        let offset = format!(" {}: {}   Search: {}", label, state.filter_label, state.search)
            .chars()
            .count() as u16;
        f.set_cursor_position((inner.x + offset.min(inner.width.saturating_sub(1)), inner.y));
    }
}

fn draw_table(f: &mut Frame, state: &RenderState, palette: &Palette, area: Rect) {
    let header = Row::new(state.headers.iter().map(|h| Cell::from(*h)))
        .style(Style::default().fg(palette.accent).bold())
        .bottom_margin(0);

    let rows = state
        .rows
        .iter()
        .map(|row| Row::new(row.cells.iter().map(|c| Cell::from(c.as_str()))));

    let title = if state.rows.len() == state.total_rows {
        format!(" {} ({}) ", state.active_kind.title(), state.total_rows)
    } else {
        format!(" {} ({} of {}) ", state.active_kind.title(), state.rows.len(), state.total_rows)
    };

    let table = Table::new(rows, column_widths(state.active_kind))
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.muted))
                .title(title),
        )
        .row_highlight_style(
            Style::default().fg(palette.highlight_fg).bg(palette.highlight_bg),
        )
        .highlight_symbol("> ");

    let mut table_state = TableState::default().with_selected(state.selected_row);
    f.render_stateful_widget(table, area, &mut table_state);

    if state.rows.is_empty() {
        let message = if state.is_loading {
            "Loading..."
        } else if state.total_rows > 0 {
            "No rows match the current filter"
        } else {
            "No records"
        };
        let inner = Rect {
            x: area.x + 2,
            y: area.y + 2,
            width: area.width.saturating_sub(4),
            height: 1,
        };
        if area.height > 3 {
            f.render_widget(
                Paragraph::new(message).style(Style::default().fg(palette.muted)),
                inner,
            );
        }
    }
}

fn draw_status_bar(f: &mut Frame, state: &RenderState, palette: &Palette, area: Rect) {
    let hints = if state.input_mode == InputMode::Search {
        " Enter:done | Esc:clear search "
    } else {
        " 1-5:tab | ↑↓:select | a:add e:edit d:delete | f:filter /:search | x:export i:import | ?:help q:quit "
    };
    let status = if state.is_loading {
        Span::styled(format!(" {} ", state.status), Style::default().fg(palette.accent))
    } else {
        Span::styled(format!(" {} ", state.status), Style::default().fg(palette.ok))
    };
    let bar = Paragraph::new(Line::from(vec![
        status,
        Span::styled(hints, Style::default().fg(palette.muted)),
    ]));
    f.render_widget(bar, area);
}

fn draw_help_popup(f: &mut Frame, palette: &Palette, area: Rect) {
    let popup_area = centered_rect(60, 80, area);

    let help_text = r#"
 TIMETABLE CONSOLE - Keyboard Shortcuts

 TABS
   1-5 / Tab          Schedule, Groups, Teachers, Rooms, Subjects
   r                  Reload the current tab

 TABLE
   ↑ / ↓  (k / j)     Select row
   f / F              Next / previous filter or sort option
   /                  Search (Enter done, Esc clear)
   Esc / c            Clear filter and search
   S                  Ask the server to filter the schedule

 RECORDS
   a                  Add a record
   e / Enter          Edit the selected record
   d / Del            Delete the selected record

 FORMS
   Tab / ↑ ↓          Move between fields
   ← / →              Move cursor, or change a selector
   Enter / Esc        Save / cancel

 DOCUMENTS
   x                  Export (Word, PDF, Excel)
   i                  Import a file

 GENERAL
   t                  Toggle light / dark theme
   ?                  Toggle this help
   q / Ctrl+C         Quit

 Press any key to close...
"#;

    let help = Paragraph::new(help_text)
        .block(palette.popup_block(" Help "))
        .wrap(Wrap { trim: false });

    f.render_widget(Clear, popup_area);
    f.render_widget(help, popup_area);
}

fn draw_form_popup(f: &mut Frame, form: &FormState, palette: &Palette, area: Rect) {
    let height = form.fields.len() as u16 + 4;
    let popup_area = fixed_height_rect(70, height, area);
    let block = palette.popup_block(format!(" {} (Enter saves, Esc cancels) ", form.purpose.title()));
    let inner = block.inner(popup_area);

    let label_width = form.fields.iter().map(|field| field.label.chars().count()).max().unwrap_or(0) + 2;
    let lines: Vec<Line> = form
        .fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let focused = i == form.focus;
            let marker = if focused { "> " } else { "  " };
            let label = format!("{}{:<width$}", marker, field.label, width = label_width);
            let value = match &field.input {
                FieldInput::Text(t) => t.value.clone(),
                FieldInput::Select(_) => format!("◀ {} ▶", field.display_value()),
            };
            let style = if focused {
                Style::default().fg(palette.accent).bold()
            } else {
                Style::default().fg(palette.fg)
            };
            Line::from(vec![
                Span::styled(label, Style::default().fg(palette.muted)),
                Span::styled(value, style),
            ])
        })
        .collect();

    f.render_widget(Clear, popup_area);
    f.render_widget(Paragraph::new(lines).block(block), popup_area);

    if let Some(FieldInput::Text(t)) = form.focused().map(|field| &field.input) {
        let x = inner.x + 2 + label_width as u16 + t.cursor_column() as u16;
        let y = inner.y + form.focus as u16;
        f.set_cursor_position((x.min(inner.right().saturating_sub(1)), y));
    }
}

fn draw_confirm_popup(f: &mut Frame, kind: ResourceKind, label: &str, palette: &Palette, area: Rect) {
    let popup_area = fixed_height_rect(50, 5, area);
    let text = vec![
        Line::from(format!(" Delete {} {}?", kind.noun(), label)),
        Line::from(""),
        Line::styled(" y: delete   n / Esc: keep", Style::default().fg(palette.muted)),
    ];
    let block = palette
        .popup_block(" Confirm delete ")
        .border_style(Style::default().fg(palette.error));
    f.render_widget(Clear, popup_area);
    f.render_widget(Paragraph::new(text).block(block), popup_area);
}

fn draw_export_menu(f: &mut Frame, index: usize, palette: &Palette, area: Rect) {
    let popup_area = fixed_height_rect(40, DocumentKind::MENU.len() as u16 + 2, area);
    let items: Vec<ListItem> = DocumentKind::MENU
        .iter()
        .map(|doc| ListItem::new(format!(" {}", doc.label())))
        .collect();
    let list = List::new(items)
        .block(palette.popup_block(" Export "))
        .highlight_style(Style::default().fg(palette.highlight_fg).bg(palette.highlight_bg))
        .highlight_symbol(">");
    let mut list_state = ListState::default().with_selected(Some(index));
    f.render_widget(Clear, popup_area);
    f.render_stateful_widget(list, popup_area, &mut list_state);
}

fn draw_notice_popup(f: &mut Frame, notice: &Notice, palette: &Palette, area: Rect) {
    let popup_area = centered_rect(60, 30, area);
    let color = if notice.is_error { palette.error } else { palette.ok };
    let block = palette
        .popup_block(format!(" {} ", notice.title))
        .border_style(Style::default().fg(color));
    let text = vec![
        Line::from(notice.message.clone()),
        Line::from(""),
        Line::styled("Press any key to continue", Style::default().fg(palette.muted)),
    ];
    f.render_widget(Clear, popup_area);
    f.render_widget(Paragraph::new(text).block(block).wrap(Wrap { trim: false }), popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Horizontally centred popup of a fixed number of rows
fn fixed_height_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Fill(1), Constraint::Length(height), Constraint::Fill(1)])
        .split(r);
    centered_rect(percent_x, 100, vertical[1])
}
