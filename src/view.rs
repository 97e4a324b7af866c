//! Table view model
//!
//! The table is a pure function of (cached collection, filter state). Rows
//! are rebuilt from the cache on every change; nothing about visibility is
//! kept in the widget.

use std::cmp::Ordering;

use crate::cache::LocalCache;
use crate::collate;
use crate::models::{Record, RecordId, ReferenceFilter, ResourceKind};

/// Sort key for reference kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortKey {
    Id,
    Display,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortOrder {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortOrder {
    pub const OPTIONS: [SortOrder; 4] = [
        SortOrder { key: SortKey::Id, direction: SortDirection::Asc },
        SortOrder { key: SortKey::Id, direction: SortDirection::Desc },
        SortOrder { key: SortKey::Display, direction: SortDirection::Asc },
        SortOrder { key: SortKey::Display, direction: SortDirection::Desc },
    ];

    pub fn label(&self) -> &'static str {
        match (self.key, self.direction) {
            (SortKey::Id, SortDirection::Asc) => "ID ↑",
            (SortKey::Id, SortDirection::Desc) => "ID ↓",
            (SortKey::Display, SortDirection::Asc) => "A–Z",
            (SortKey::Display, SortDirection::Desc) => "Z–A",
        }
    }

    fn compare(&self, a: &TableRow, b: &TableRow) -> Ordering {
        let ord = match self.key {
            SortKey::Id => a.id.cmp(&b.id),
            SortKey::Display => collate::compare(a.display(), b.display()),
        };
        match self.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }
}

/// Dropdown choice: reference filter on the schedule tab, sort elsewhere
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterChoice {
    Reference(ReferenceFilter),
    Sort(SortOrder),
}

/// Transient per-tab view state; reset on tab switch
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterState {
    pub choice: Option<FilterChoice>,
    pub search: String,
}

impl FilterState {
    pub fn reference(&self) -> Option<ReferenceFilter> {
        match self.choice {
            Some(FilterChoice::Reference(r)) => Some(r),
            _ => None,
        }
    }
}

/// One rendered table row
#[derive(Clone, Debug, PartialEq)]
pub struct TableRow {
    pub id: RecordId,
    pub cells: Vec<String>,
    /// Group, teacher and room ids of a schedule row
    pub references: Option<RowReferences>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RowReferences {
    pub group_id: Option<RecordId>,
    pub teacher_id: Option<RecordId>,
    pub room_id: Option<RecordId>,
}

impl RowReferences {
    pub fn get(&self, kind: ResourceKind) -> Option<RecordId> {
        match kind {
            ResourceKind::Group => self.group_id,
            ResourceKind::Teacher => self.teacher_id,
            ResourceKind::Room => self.room_id,
            _ => None,
        }
    }
}

impl TableRow {
    /// Display-field cell of a reference row
    fn display(&self) -> &str {
        self.cells.get(1).map(String::as_str).unwrap_or("")
    }

    fn contains(&self, needle_lower: &str) -> bool {
        self.cells
            .iter()
            .any(|c| c.to_lowercase().contains(needle_lower))
    }
}

/// Column titles for `kind`
pub fn headers(kind: ResourceKind) -> &'static [&'static str] {
    kind.columns()
}

/// Rows for every cached record of `kind`, in cache order
pub fn render_rows(kind: ResourceKind, cache: &LocalCache) -> Vec<TableRow> {
    cache
        .get(kind)
        .iter()
        .map(|record| render_row(record, cache))
        .collect()
}

fn render_row(record: &Record, cache: &LocalCache) -> TableRow {
    match record {
        Record::Schedule(entry) => {
            let name = |kind| sanitize_cell(&cache.reference_name(entry, kind));
            TableRow {
                id: entry.id,
                cells: vec![
                    sanitize_cell(entry.date.as_deref().unwrap_or("")),
                    sanitize_cell(entry.time.as_deref().unwrap_or("")),
                    name(ResourceKind::Subject),
                    name(ResourceKind::Group),
                    name(ResourceKind::Teacher),
                    name(ResourceKind::Room),
                    sanitize_cell(entry.lesson_type.as_deref().unwrap_or("")),
                ],
                references: Some(RowReferences {
                    group_id: entry.group_id,
                    teacher_id: entry.teacher_id,
                    room_id: entry.room_id,
                }),
            }
        }
        other => TableRow {
            id: other.id(),
            cells: vec![other.id().to_string(), sanitize_cell(other.display_field())],
            references: None,
        },
    }
}

/// Apply the dropdown choice and the search box to rendered rows
pub fn apply_filter(rows: Vec<TableRow>, filter: &FilterState) -> Vec<TableRow> {
    let mut rows = match filter.choice {
        Some(FilterChoice::Reference(r)) => rows
            .into_iter()
            .filter(|row| {
                row.references
                    .map(|refs| refs.get(r.kind) == Some(r.id))
                    .unwrap_or(false)
            })
            .collect(),
        _ => rows,
    };

    let needle = filter.search.trim().to_lowercase();
    if !needle.is_empty() {
        rows.retain(|row| row.contains(&needle));
    }

    if let Some(FilterChoice::Sort(order)) = filter.choice {
        // stable: ties keep cache order
        rows.sort_by(|a, b| order.compare(a, b));
    }
    rows
}

/// Rows currently visible for `kind`
pub fn build_view(kind: ResourceKind, cache: &LocalCache, filter: &FilterState) -> Vec<TableRow> {
    apply_filter(render_rows(kind, cache), filter)
}

/// Dropdown options for the active kind
pub fn filter_options(kind: ResourceKind, cache: &LocalCache) -> Vec<FilterChoice> {
    if kind != ResourceKind::Schedule {
        return SortOrder::OPTIONS.iter().copied().map(FilterChoice::Sort).collect();
    }
    [ResourceKind::Group, ResourceKind::Teacher, ResourceKind::Room]
        .iter()
        .flat_map(move |&ref_kind| {
            cache.get(ref_kind).iter().map(move |r| {
                FilterChoice::Reference(ReferenceFilter { kind: ref_kind, id: r.id() })
            })
        })
        .collect()
}

pub fn choice_label(choice: &FilterChoice, cache: &LocalCache) -> String {
    match choice {
        FilterChoice::Sort(order) => order.label().to_string(),
        FilterChoice::Reference(r) => {
            let prefix = match r.kind {
                ResourceKind::Group => "G",
                ResourceKind::Teacher => "T",
                ResourceKind::Room => "R",
                _ => "?",
            };
            format!("{}: {}", prefix, sanitize_cell(&cache.resolve_display_name(r.kind, r.id)))
        }
    }
}

/// Replace control characters so server text cannot drive the terminal
pub fn sanitize_cell(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

/// Escape `& < > " '` for HTML output
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// HTML table of the given rows
pub fn render_html(kind: ResourceKind, rows: &[TableRow]) -> String {
    let mut html = String::from("<table>\n  <thead>\n    <tr>");
    for h in headers(kind) {
        html.push_str(&format!("<th>{}</th>", escape_markup(h)));
    }
    html.push_str("</tr>\n  </thead>\n  <tbody>\n");
    for row in rows {
        html.push_str(&format!("    <tr data-id=\"{}\"", row.id));
        if let Some(refs) = row.references {
            let attr = |v: Option<RecordId>| v.map(|id| id.to_string()).unwrap_or_default();
            html.push_str(&format!(
                " data-group-id=\"{}\" data-prep-id=\"{}\" data-aud-id=\"{}\"",
                attr(refs.group_id),
                attr(refs.teacher_id),
                attr(refs.room_id)
            ));
        }
        html.push('>');
        for cell in &row.cells {
            html.push_str(&format!("<td>{}</td>", escape_markup(cell)));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("  </tbody>\n</table>\n");
    html
}

/// Column-aligned plain text table
pub fn render_plain(kind: ResourceKind, rows: &[TableRow]) -> String {
    let cols = headers(kind);
    let mut widths: Vec<usize> = cols.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.cells.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let mut out = pad_line(cols.iter().copied(), &widths);
    out.push('\n');
    for row in rows {
        out.push_str(&pad_line(row.cells.iter().map(String::as_str), &widths));
        out.push('\n');
    }
    out
}

fn pad_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths.iter())
        .map(|(c, w)| format!("{}{}", c, " ".repeat(w.saturating_sub(c.chars().count()))))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

/// Selection after moving one row down (wraps to the top)
pub fn next_selection(rows: &[TableRow], current: Option<RecordId>) -> Option<RecordId> {
    let pos = current.and_then(|id| rows.iter().position(|r| r.id == id));
    match pos {
        Some(i) => rows.get((i + 1) % rows.len()).map(|r| r.id),
        None => rows.first().map(|r| r.id),
    }
}

/// Selection after moving one row up (wraps to the bottom)
pub fn prev_selection(rows: &[TableRow], current: Option<RecordId>) -> Option<RecordId> {
    let pos = current.and_then(|id| rows.iter().position(|r| r.id == id));
    match pos {
        Some(0) | None => rows.last().map(|r| r.id),
        Some(i) => rows.get(i - 1).map(|r| r.id),
    }
}
