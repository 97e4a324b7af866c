//! Popup form state - text inputs, reference selectors, draft validation

use chrono::NaiveTime;

use crate::cache::LocalCache;
use crate::constants::NONE_OPTION_LABEL;
use crate::error::ConsoleError;
use crate::models::{
    parse_date, ExportFilter, Record, RecordDraft, RecordId, ResourceKind, ScheduleDraft,
};

/// Single-line text input with a byte cursor on a char boundary
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextInput {
    pub value: String,
    pub cursor: usize,
}

impl TextInput {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.len();
        TextInput { value, cursor }
    }

    pub fn insert(&mut self, c: char) {
        if self.cursor <= self.value.len() {
            self.value.insert(self.cursor, c);
            self.cursor += c.len_utf8();
        }
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            let prev = self.value[..self.cursor]
                .char_indices()
                .last()
                .map(|(i, _)| i)
                .unwrap_or(0);
            self.value.remove(prev);
            self.cursor = prev;
        }
    }

    pub fn left(&mut self) {
        if self.cursor > 0 {
            self.cursor = self.value[..self.cursor]
                .char_indices()
                .last()
                .map(|(i, _)| i)
                .unwrap_or(0);
        }
    }

    pub fn right(&mut self) {
        if self.cursor < self.value.len() {
            self.cursor = self.value[self.cursor..]
                .char_indices()
                .nth(1)
                .map(|(i, _)| self.cursor + i)
                .unwrap_or(self.value.len());
        }
    }

    pub fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.cursor = self.value.len();
    }

    /// Cursor position in chars, for placing the terminal cursor
    pub fn cursor_column(&self) -> usize {
        self.value[..self.cursor].chars().count()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SelectOption {
    pub id: Option<RecordId>,
    pub label: String,
}

/// Reference selector: an empty option followed by the cached records
#[derive(Clone, Debug, PartialEq)]
pub struct Selector {
    pub options: Vec<SelectOption>,
    pub index: usize,
}

impl Selector {
    pub fn from_cache(kind: ResourceKind, cache: &LocalCache, current: Option<RecordId>) -> Self {
        let options: Vec<SelectOption> = std::iter::once(SelectOption {
            id: None,
            label: NONE_OPTION_LABEL.to_string(),
        })
        .chain(cache.get(kind).iter().map(|r| SelectOption {
            id: Some(r.id()),
            label: r.display_field().to_string(),
        }))
        .collect();
        let index = current
            .and_then(|id| options.iter().position(|o| o.id == Some(id)))
            .unwrap_or(0);
        Selector { options, index }
    }

    pub fn next(&mut self) {
        if !self.options.is_empty() {
            self.index = (self.index + 1) % self.options.len();
        }
    }

    pub fn prev(&mut self) {
        if !self.options.is_empty() {
            self.index = self.index.checked_sub(1).unwrap_or(self.options.len() - 1);
        }
    }

    pub fn selected(&self) -> Option<&SelectOption> {
        self.options.get(self.index)
    }

    pub fn selected_id(&self) -> Option<RecordId> {
        self.selected().and_then(|o| o.id)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FieldInput {
    Text(TextInput),
    Select(Selector),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FormField {
    pub label: &'static str,
    pub input: FieldInput,
}

impl FormField {
    fn text(label: &'static str, value: impl Into<String>) -> Self {
        FormField { label, input: FieldInput::Text(TextInput::new(value)) }
    }

    fn select(label: &'static str, selector: Selector) -> Self {
        FormField { label, input: FieldInput::Select(selector) }
    }

    /// Text shown in the form
    pub fn display_value(&self) -> String {
        match &self.input {
            FieldInput::Text(t) => t.value.clone(),
            FieldInput::Select(s) => s.selected().map(|o| o.label.clone()).unwrap_or_default(),
        }
    }

    /// Submitted value: the text, or the selected id ("" for none)
    fn submit_value(&self) -> String {
        match &self.input {
            FieldInput::Text(t) => t.value.clone(),
            FieldInput::Select(s) => s.selected_id().map(|id| id.to_string()).unwrap_or_default(),
        }
    }
}

/// What submitting the form does
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormPurpose {
    Create(ResourceKind),
    Edit(ResourceKind, RecordId),
    WordExport,
}

impl FormPurpose {
    pub fn title(&self) -> String {
        match self {
            FormPurpose::Create(kind) => format!("New {}", kind.noun()),
            FormPurpose::Edit(kind, id) => format!("Edit {} #{}", kind.noun(), id),
            FormPurpose::WordExport => "Export schedule to Word".to_string(),
        }
    }
}

/// Trim a server time like `10:30:00` to the `HH:MM` the form accepts
fn short_time(value: &str) -> String {
    NaiveTime::parse_from_str(value.trim(), "%H:%M:%S")
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|_| value.trim().to_string())
}

#[derive(Clone, Debug, PartialEq)]
pub struct FormState {
    pub purpose: FormPurpose,
    pub fields: Vec<FormField>,
    pub focus: usize,
}

impl FormState {
    pub fn create(kind: ResourceKind, cache: &LocalCache) -> Self {
        let fields = match kind {
            ResourceKind::Schedule => schedule_fields(cache, None),
            other => vec![FormField::text(other.field_label(), "")],
        };
        FormState { purpose: FormPurpose::Create(kind), fields, focus: 0 }
    }

    /// Form pre-filled with the record's current values
    pub fn edit(record: &Record, cache: &LocalCache) -> Self {
        let kind = record.kind();
        let fields = match record {
            Record::Schedule(entry) => schedule_fields(cache, Some(entry)),
            other => vec![FormField::text(kind.field_label(), other.display_field())],
        };
        FormState { purpose: FormPurpose::Edit(kind, record.id()), fields, focus: 0 }
    }

    pub fn word_export(cache: &LocalCache) -> Self {
        FormState {
            purpose: FormPurpose::WordExport,
            fields: vec![
                FormField::select("Group", Selector::from_cache(ResourceKind::Group, cache, None)),
                FormField::text("Start date", ""),
                FormField::text("End date", ""),
            ],
            focus: 0,
        }
    }

    pub fn next_field(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
        }
    }

    pub fn prev_field(&mut self) {
        if !self.fields.is_empty() {
            self.focus = self.focus.checked_sub(1).unwrap_or(self.fields.len() - 1);
        }
    }

    pub fn focused(&self) -> Option<&FormField> {
        self.fields.get(self.focus)
    }

    fn focused_input(&mut self) -> Option<&mut FieldInput> {
        self.fields.get_mut(self.focus).map(|f| &mut f.input)
    }

    pub fn enter_char(&mut self, c: char) {
        match self.focused_input() {
            Some(FieldInput::Text(t)) => t.insert(c),
            Some(FieldInput::Select(s)) if c == ' ' => s.next(),
            _ => {}
        }
    }

    pub fn backspace(&mut self) {
        if let Some(FieldInput::Text(t)) = self.focused_input() {
            t.backspace();
        }
    }

    /// Left moves the cursor, or picks the previous option in a selector
    pub fn left(&mut self) {
        match self.focused_input() {
            Some(FieldInput::Text(t)) => t.left(),
            Some(FieldInput::Select(s)) => s.prev(),
            None => {}
        }
    }

    pub fn right(&mut self) {
        match self.focused_input() {
            Some(FieldInput::Text(t)) => t.right(),
            Some(FieldInput::Select(s)) => s.next(),
            None => {}
        }
    }

    fn value(&self, index: usize) -> String {
        self.fields
            .get(index)
            .map(FormField::submit_value)
            .unwrap_or_default()
    }

    /// Validate the form into a create/update payload
    pub fn to_draft(&self) -> Result<RecordDraft, ConsoleError> {
        let kind = match self.purpose {
            FormPurpose::Create(kind) | FormPurpose::Edit(kind, _) => kind,
            FormPurpose::WordExport => {
                return Err(ConsoleError::validation("export form has no record payload"))
            }
        };
        match kind {
            ResourceKind::Schedule => ScheduleDraft::parse(
                &self.value(0),
                &self.value(1),
                &self.value(2),
                &self.value(3),
                &self.value(4),
                &self.value(5),
                &self.value(6),
            )
            .map(RecordDraft::Schedule),
            other => RecordDraft::named(other, &self.value(0)),
        }
    }

    /// Validate the Word export form; the group is sent by name
    pub fn to_export_filter(&self) -> Result<ExportFilter, ConsoleError> {
        let group = match self.fields.first().map(|f| &f.input) {
            Some(FieldInput::Select(s)) => s.selected().filter(|o| o.id.is_some()).map(|o| o.label.clone()),
            _ => None,
        };
        let date_start = parse_date(&self.value(1), "Start date")?;
        let date_end = parse_date(&self.value(2), "End date")?;
        if let (Some(start), Some(end)) = (date_start, date_end) {
            if start > end {
                return Err(ConsoleError::validation("Start date is after end date"));
            }
        }
        Ok(ExportFilter { group, date_start, date_end })
    }
}

/// Seven schedule fields in wire order
fn schedule_fields(cache: &LocalCache, entry: Option<&crate::models::ScheduleEntry>) -> Vec<FormField> {
    let reference = |kind| entry.and_then(|e| e.reference(kind));
    let selector = |kind| Selector::from_cache(kind, cache, reference(kind));
    vec![
        FormField::text("Date (YYYY-MM-DD)", entry.and_then(|e| e.date.clone()).unwrap_or_default()),
        FormField::text(
            "Time (HH:MM)",
            entry.and_then(|e| e.time.as_deref()).map(short_time).unwrap_or_default(),
        ),
        FormField::select("Subject", selector(ResourceKind::Subject)),
        FormField::select("Group", selector(ResourceKind::Group)),
        FormField::select("Teacher", selector(ResourceKind::Teacher)),
        FormField::select("Room", selector(ResourceKind::Room)),
        FormField::text(
            "Lesson type",
            entry.and_then(|e| e.lesson_type.clone()).unwrap_or_default(),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Group, Room, ScheduleEntry, Subject, Teacher};
    use chrono::NaiveDate;

    fn loaded_cache() -> LocalCache {
        let mut cache = LocalCache::new();
        cache.replace(
            ResourceKind::Group,
            vec![
                Record::Group(Group { id: 3, name: "CS-101".into() }),
                Record::Group(Group { id: 4, name: "CS-102".into() }),
            ],
        );
        cache.replace(ResourceKind::Teacher, vec![Record::Teacher(Teacher { id: 5, fio: "Ivanov I.I.".into() })]);
        cache.replace(ResourceKind::Room, vec![Record::Room(Room { id: 7, number: "101".into() })]);
        cache.replace(ResourceKind::Subject, vec![Record::Subject(Subject { id: 9, name: "Algebra".into() })]);
        cache
    }

    #[test]
    fn test_text_input_editing_multibyte() {
        let mut input = TextInput::new("Ёж");
        input.left();
        input.insert('и');
        assert_eq!(input.value, "Ёиж");
        assert_eq!(input.cursor_column(), 2);
        input.backspace();
        input.backspace();
        assert_eq!(input.value, "ж");
        input.backspace();
        assert_eq!(input.value, "ж");
    }

    #[test]
    fn test_selector_starts_with_none_and_wraps() {
        let cache = loaded_cache();
        let mut sel = Selector::from_cache(ResourceKind::Group, &cache, None);
        assert_eq!(sel.selected_id(), None);
        assert_eq!(sel.selected().unwrap().label, NONE_OPTION_LABEL);
        sel.prev();
        assert_eq!(sel.selected_id(), Some(4));
        sel.next();
        sel.next();
        assert_eq!(sel.selected_id(), Some(3));
    }

    #[test]
    fn test_schedule_create_form_has_seven_fields() {
        let form = FormState::create(ResourceKind::Schedule, &loaded_cache());
        assert_eq!(form.fields.len(), 7);
        assert_eq!(form.fields[3].label, "Group");
    }

    #[test]
    fn test_named_form_label_is_contextual() {
        let form = FormState::create(ResourceKind::Teacher, &LocalCache::new());
        assert_eq!(form.fields.len(), 1);
        assert_eq!(form.fields[0].label, "Full name");
    }

    #[test]
    fn test_edit_preselects_references() {
        let cache = loaded_cache();
        let entry = ScheduleEntry {
            id: 1,
            date: Some("2025-09-01".into()),
            time: Some("10:30:00".into()),
            subject_id: Some(9),
            group_id: Some(4),
            teacher_id: Some(5),
            room_id: Some(7),
            lesson_type: Some("Lecture".into()),
            ..Default::default()
        };
        let form = FormState::edit(&Record::Schedule(entry), &cache);
        assert_eq!(form.purpose, FormPurpose::Edit(ResourceKind::Schedule, 1));
        assert_eq!(form.fields[1].display_value(), "10:30");
        assert_eq!(form.fields[3].display_value(), "CS-102");
        assert_eq!(form.fields[4].display_value(), "Ivanov I.I.");

        match form.to_draft().unwrap() {
            RecordDraft::Schedule(d) => {
                assert_eq!(d.date, NaiveDate::from_ymd_opt(2025, 9, 1).unwrap());
                assert_eq!(d.group_id, 4);
                assert_eq!(d.room_id, 7);
                assert_eq!(d.lesson_type, "Lecture");
            }
            other => panic!("unexpected draft {:?}", other),
        }
    }

    #[test]
    fn test_schedule_form_requires_references() {
        let mut form = FormState::create(ResourceKind::Schedule, &loaded_cache());
        for c in "2025-09-01".chars() {
            form.enter_char(c);
        }
        let err = form.to_draft().unwrap_err();
        assert_eq!(err, ConsoleError::Validation("Subject is required".into()));
    }

    #[test]
    fn test_named_form_rejects_blank() {
        let mut form = FormState::create(ResourceKind::Room, &LocalCache::new());
        form.enter_char(' ');
        assert!(matches!(form.to_draft(), Err(ConsoleError::Validation(_))));
        form.enter_char('5');
        assert_eq!(
            form.to_draft().unwrap(),
            RecordDraft::Named { kind: ResourceKind::Room, value: "5".into() }
        );
    }

    #[test]
    fn test_word_export_filter_uses_group_name() {
        let mut form = FormState::word_export(&loaded_cache());
        form.right();
        form.next_field();
        for c in "2025-09-01".chars() {
            form.enter_char(c);
        }
        let filter = form.to_export_filter().unwrap();
        assert_eq!(filter.group.as_deref(), Some("CS-101"));
        assert_eq!(filter.date_start, NaiveDate::from_ymd_opt(2025, 9, 1));
        assert_eq!(filter.date_end, None);
    }

    #[test]
    fn test_word_export_rejects_reversed_range() {
        let mut form = FormState::word_export(&LocalCache::new());
        if let FieldInput::Text(t) = &mut form.fields[1].input {
            t.set("2025-12-31");
        }
        if let FieldInput::Text(t) = &mut form.fields[2].input {
            t.set("2025-09-01");
        }
        assert!(form.to_export_filter().is_err());
    }
}
