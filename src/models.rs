use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{de, Deserialize, Deserializer};

use crate::error::ConsoleError;

/// Record identifier as used by the API
pub type RecordId = i64;

/// The five manageable collections
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    #[default]
    Schedule,
    Group,
    Teacher,
    Room,
    Subject,
}

impl ResourceKind {
    /// Tab order
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Schedule,
        ResourceKind::Group,
        ResourceKind::Teacher,
        ResourceKind::Room,
        ResourceKind::Subject,
    ];

    /// Path segment under the API base
    pub fn api_path(&self) -> &'static str {
        match self {
            ResourceKind::Schedule => "itog",
            ResourceKind::Group => "groups",
            ResourceKind::Teacher => "preps",
            ResourceKind::Room => "auditorii",
            ResourceKind::Subject => "objects",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ResourceKind::Schedule => "Schedule",
            ResourceKind::Group => "Groups",
            ResourceKind::Teacher => "Teachers",
            ResourceKind::Room => "Rooms",
            ResourceKind::Subject => "Subjects",
        }
    }

    /// Wire name of the display field; schedule entries have none
    pub fn display_key(&self) -> Option<&'static str> {
        match self {
            ResourceKind::Schedule => None,
            ResourceKind::Group | ResourceKind::Subject => Some("name"),
            ResourceKind::Teacher => Some("fio"),
            ResourceKind::Room => Some("number"),
        }
    }

    /// Singular noun used in titles and messages
    pub fn noun(&self) -> &'static str {
        match self {
            ResourceKind::Schedule => "lesson",
            ResourceKind::Group => "group",
            ResourceKind::Teacher => "teacher",
            ResourceKind::Room => "room",
            ResourceKind::Subject => "subject",
        }
    }

    /// Form label of the display field
    pub fn field_label(&self) -> &'static str {
        match self {
            ResourceKind::Schedule => "Lesson",
            ResourceKind::Group => "Group name",
            ResourceKind::Teacher => "Full name",
            ResourceKind::Room => "Number",
            ResourceKind::Subject => "Title",
        }
    }

    /// Fixed table columns
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            ResourceKind::Schedule => &[
                "Day", "Time", "Subject", "Group", "Teacher", "Room", "Type",
            ],
            ResourceKind::Group => &["ID", "Name"],
            ResourceKind::Teacher => &["ID", "Full name"],
            ResourceKind::Room => &["ID", "Number"],
            ResourceKind::Subject => &["ID", "Title"],
        }
    }

    /// Collections that must be loaded before this one can be displayed
    pub fn dependencies(&self) -> &'static [ResourceKind] {
        match self {
            ResourceKind::Schedule => &[
                ResourceKind::Group,
                ResourceKind::Teacher,
                ResourceKind::Room,
                ResourceKind::Subject,
            ],
            _ => &[],
        }
    }

    pub fn index(&self) -> usize {
        ResourceKind::ALL
            .iter()
            .position(|k| k == self)
            .unwrap_or(0)
    }

    pub fn next(&self) -> ResourceKind {
        ResourceKind::ALL[(self.index() + 1) % ResourceKind::ALL.len()]
    }

    pub fn prev(&self) -> ResourceKind {
        let len = ResourceKind::ALL.len();
        ResourceKind::ALL[(self.index() + len - 1) % len]
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "schedule" | "itog" => Ok(ResourceKind::Schedule),
            "groups" | "group" => Ok(ResourceKind::Group),
            "teachers" | "teacher" | "preps" => Ok(ResourceKind::Teacher),
            "rooms" | "room" | "auditorii" => Ok(ResourceKind::Room),
            "subjects" | "subject" | "objects" => Ok(ResourceKind::Subject),
            other => Err(format!(
                "unknown resource '{}' (expected schedule, groups, teachers, rooms or subjects)",
                other
            )),
        }
    }
}

// ============================================================================
// Wire scalars
// ============================================================================

/// Scalar as the API may send it: ids arrive as numbers or numeric strings
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl Scalar {
    fn into_text(self) -> String {
        match self {
            Scalar::Int(n) => n.to_string(),
            Scalar::Float(x) => x.to_string(),
            Scalar::Text(s) => s,
            Scalar::Bool(b) => b.to_string(),
        }
    }

    fn into_id(self) -> Result<Option<RecordId>, String> {
        match self {
            Scalar::Int(n) => Ok(Some(n)),
            Scalar::Float(x) if x.fract() == 0.0 => Ok(Some(x as RecordId)),
            Scalar::Text(s) if s.trim().is_empty() => Ok(None),
            Scalar::Text(s) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| format!("invalid id '{}'", s)),
            _ => Err("invalid id".to_string()),
        }
    }
}

fn de_id<'de, D: Deserializer<'de>>(d: D) -> Result<RecordId, D::Error> {
    Scalar::deserialize(d)?
        .into_id()
        .map_err(de::Error::custom)?
        .ok_or_else(|| de::Error::custom("empty id"))
}

fn de_opt_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<RecordId>, D::Error> {
    match Option::<Scalar>::deserialize(d)? {
        Some(s) => s.into_id().map_err(de::Error::custom),
        None => Ok(None),
    }
}

fn de_text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<Scalar>::deserialize(d)?
        .map(Scalar::into_text)
        .unwrap_or_default())
}

fn de_opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Scalar>::deserialize(d)?
        .map(Scalar::into_text)
        .filter(|s| !s.is_empty()))
}

// ============================================================================
// Records
// ============================================================================

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Group {
    #[serde(deserialize_with = "de_id")]
    pub id: RecordId,
    #[serde(default, deserialize_with = "de_text")]
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Teacher {
    #[serde(deserialize_with = "de_id")]
    pub id: RecordId,
    #[serde(default, deserialize_with = "de_text")]
    pub fio: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Room {
    #[serde(deserialize_with = "de_id")]
    pub id: RecordId,
    #[serde(default, deserialize_with = "de_text")]
    pub number: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Subject {
    #[serde(deserialize_with = "de_id")]
    pub id: RecordId,
    #[serde(default, deserialize_with = "de_text")]
    pub name: String,
}

/// One timetabled lesson ("itog")
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ScheduleEntry {
    #[serde(deserialize_with = "de_id")]
    pub id: RecordId,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub time: Option<String>,
    #[serde(default, rename = "object_id", deserialize_with = "de_opt_id")]
    pub subject_id: Option<RecordId>,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub group_id: Option<RecordId>,
    #[serde(default, rename = "prep_id", deserialize_with = "de_opt_id")]
    pub teacher_id: Option<RecordId>,
    #[serde(default, rename = "aud_id", deserialize_with = "de_opt_id")]
    pub room_id: Option<RecordId>,
    #[serde(default, rename = "type", deserialize_with = "de_opt_text")]
    pub lesson_type: Option<String>,

    // Denormalized names some server versions embed
    #[serde(default, rename = "object_name", deserialize_with = "de_opt_text")]
    pub subject_name: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub group_name: Option<String>,
    #[serde(default, rename = "prep_fio", deserialize_with = "de_opt_text")]
    pub teacher_name: Option<String>,
    #[serde(default, rename = "aud_number", deserialize_with = "de_opt_text")]
    pub room_number: Option<String>,

    // Raw fallbacks
    #[serde(default, rename = "object", deserialize_with = "de_opt_text")]
    pub subject_raw: Option<String>,
    #[serde(default, rename = "group", deserialize_with = "de_opt_text")]
    pub group_raw: Option<String>,
    #[serde(default, rename = "prep", deserialize_with = "de_opt_text")]
    pub teacher_raw: Option<String>,
    #[serde(default, rename = "aud", deserialize_with = "de_opt_text")]
    pub room_raw: Option<String>,
}

impl ScheduleEntry {
    /// Foreign key pointing into `kind`'s collection
    pub fn reference(&self, kind: ResourceKind) -> Option<RecordId> {
        match kind {
            ResourceKind::Group => self.group_id,
            ResourceKind::Teacher => self.teacher_id,
            ResourceKind::Room => self.room_id,
            ResourceKind::Subject => self.subject_id,
            ResourceKind::Schedule => None,
        }
    }

    pub fn denormalized(&self, kind: ResourceKind) -> Option<&str> {
        match kind {
            ResourceKind::Group => self.group_name.as_deref(),
            ResourceKind::Teacher => self.teacher_name.as_deref(),
            ResourceKind::Room => self.room_number.as_deref(),
            ResourceKind::Subject => self.subject_name.as_deref(),
            ResourceKind::Schedule => None,
        }
    }

    pub fn raw(&self, kind: ResourceKind) -> Option<&str> {
        match kind {
            ResourceKind::Group => self.group_raw.as_deref(),
            ResourceKind::Teacher => self.teacher_raw.as_deref(),
            ResourceKind::Room => self.room_raw.as_deref(),
            ResourceKind::Subject => self.subject_raw.as_deref(),
            ResourceKind::Schedule => None,
        }
    }
}

/// A record of any resource kind
#[derive(Clone, Debug, PartialEq)]
pub enum Record {
    Schedule(ScheduleEntry),
    Group(Group),
    Teacher(Teacher),
    Room(Room),
    Subject(Subject),
}

impl Record {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Record::Schedule(_) => ResourceKind::Schedule,
            Record::Group(_) => ResourceKind::Group,
            Record::Teacher(_) => ResourceKind::Teacher,
            Record::Room(_) => ResourceKind::Room,
            Record::Subject(_) => ResourceKind::Subject,
        }
    }

    pub fn id(&self) -> RecordId {
        match self {
            Record::Schedule(r) => r.id,
            Record::Group(r) => r.id,
            Record::Teacher(r) => r.id,
            Record::Room(r) => r.id,
            Record::Subject(r) => r.id,
        }
    }

    /// Name/fio/number for reference kinds, the lesson type for schedule entries
    pub fn display_field(&self) -> &str {
        match self {
            Record::Schedule(r) => r.lesson_type.as_deref().unwrap_or(""),
            Record::Group(r) => &r.name,
            Record::Teacher(r) => &r.fio,
            Record::Room(r) => &r.number,
            Record::Subject(r) => &r.name,
        }
    }

    pub fn as_schedule(&self) -> Option<&ScheduleEntry> {
        match self {
            Record::Schedule(entry) => Some(entry),
            _ => None,
        }
    }

    /// Decode a list response for `kind`; `null` counts as an empty list
    pub fn parse_list(
        kind: ResourceKind,
        value: serde_json::Value,
    ) -> Result<Vec<Record>, serde_json::Error> {
        if value.is_null() {
            return Ok(Vec::new());
        }
        let records = match kind {
            ResourceKind::Schedule => Vec::<ScheduleEntry>::deserialize(value)?
                .into_iter()
                .map(Record::Schedule)
                .collect(),
            ResourceKind::Group => Vec::<Group>::deserialize(value)?
                .into_iter()
                .map(Record::Group)
                .collect(),
            ResourceKind::Teacher => Vec::<Teacher>::deserialize(value)?
                .into_iter()
                .map(Record::Teacher)
                .collect(),
            ResourceKind::Room => Vec::<Room>::deserialize(value)?
                .into_iter()
                .map(Record::Room)
                .collect(),
            ResourceKind::Subject => Vec::<Subject>::deserialize(value)?
                .into_iter()
                .map(Record::Subject)
                .collect(),
        };
        Ok(records)
    }

    /// Decode a single-record response (create/update)
    pub fn parse_one(
        kind: ResourceKind,
        value: serde_json::Value,
    ) -> Result<Record, serde_json::Error> {
        let mut list = Record::parse_list(kind, serde_json::Value::Array(vec![value]))?;
        list.pop()
            .ok_or_else(|| de::Error::custom("empty record"))
    }
}

// ============================================================================
// Drafts (validated mutation payloads)
// ============================================================================

/// Validated fields of a schedule entry
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduleDraft {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub subject_id: RecordId,
    pub group_id: RecordId,
    pub teacher_id: RecordId,
    pub room_id: RecordId,
    pub lesson_type: String,
}

/// Payload for create/update
#[derive(Clone, Debug, PartialEq)]
pub enum RecordDraft {
    Schedule(ScheduleDraft),
    Named { kind: ResourceKind, value: String },
}

impl RecordDraft {
    /// Draft for a reference kind; the value must not be blank
    pub fn named(kind: ResourceKind, value: &str) -> Result<Self, ConsoleError> {
        if kind == ResourceKind::Schedule {
            return Err(ConsoleError::validation("schedule entries need the full form"));
        }
        let value = value.trim();
        if value.is_empty() {
            return Err(ConsoleError::validation(format!(
                "{} is required",
                kind.field_label()
            )));
        }
        Ok(RecordDraft::Named {
            kind,
            value: value.to_string(),
        })
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            RecordDraft::Schedule(_) => ResourceKind::Schedule,
            RecordDraft::Named { kind, .. } => *kind,
        }
    }

    /// Multipart form fields in wire order
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        match self {
            RecordDraft::Schedule(d) => vec![
                ("data", d.date.format("%Y-%m-%d").to_string()),
                (
                    "time",
                    d.time.map(|t| t.format("%H:%M").to_string()).unwrap_or_default(),
                ),
                ("id_obj_fk", d.subject_id.to_string()),
                ("id_group_fk", d.group_id.to_string()),
                ("id_prep_fk", d.teacher_id.to_string()),
                ("id_au_fk", d.room_id.to_string()),
                ("type", d.lesson_type.clone()),
            ],
            RecordDraft::Named { kind, value } => {
                vec![(kind.display_key().unwrap_or("name"), value.clone())]
            }
        }
    }

    /// JSON body for servers that take JSON instead of multipart
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            RecordDraft::Schedule(d) => serde_json::json!({
                "data": d.date.format("%Y-%m-%d").to_string(),
                "time": d.time.map(|t| t.format("%H:%M").to_string()),
                "id_obj_fk": d.subject_id,
                "id_group_fk": d.group_id,
                "id_prep_fk": d.teacher_id,
                "id_au_fk": d.room_id,
                "type": d.lesson_type,
            }),
            RecordDraft::Named { .. } => {
                let map: serde_json::Map<String, serde_json::Value> = self
                    .form_fields()
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), serde_json::Value::String(v)))
                    .collect();
                serde_json::Value::Object(map)
            }
        }
    }
}

impl ScheduleDraft {
    /// Validate raw form input. Date and all four references are required,
    /// time is optional but must be HH:MM when present.
    pub fn parse(
        date: &str,
        time: &str,
        subject: &str,
        group: &str,
        teacher: &str,
        room: &str,
        lesson_type: &str,
    ) -> Result<Self, ConsoleError> {
        let date = parse_date(date, "Date")?
            .ok_or_else(|| ConsoleError::validation("Date is required"))?;
        let time = match time.trim() {
            "" => None,
            t => Some(NaiveTime::parse_from_str(t, "%H:%M").map_err(|_| {
                ConsoleError::validation(format!("Time '{}' must be HH:MM", t))
            })?),
        };
        Ok(ScheduleDraft {
            date,
            time,
            subject_id: required_ref(subject, "Subject")?,
            group_id: required_ref(group, "Group")?,
            teacher_id: required_ref(teacher, "Teacher")?,
            room_id: required_ref(room, "Room")?,
            lesson_type: lesson_type.trim().to_string(),
        })
    }
}

fn required_ref(value: &str, label: &str) -> Result<RecordId, ConsoleError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ConsoleError::validation(format!("{} is required", label)));
    }
    value
        .parse()
        .map_err(|_| ConsoleError::validation(format!("{} has an invalid id", label)))
}

/// Parse an optional `YYYY-MM-DD` date
pub fn parse_date(value: &str, label: &str) -> Result<Option<NaiveDate>, ConsoleError> {
    match value.trim() {
        "" => Ok(None),
        v => NaiveDate::parse_from_str(v, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ConsoleError::validation(format!("{} '{}' must be YYYY-MM-DD", label, v))),
    }
}

// ============================================================================
// Queries
// ============================================================================

/// Filter on one referenced entity of a schedule entry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReferenceFilter {
    pub kind: ResourceKind,
    pub id: RecordId,
}

impl ReferenceFilter {
    /// Query parameter understood by `/itog`
    pub fn query_key(&self) -> &'static str {
        match self.kind {
            ResourceKind::Group => "group_id",
            ResourceKind::Teacher => "prep_id",
            ResourceKind::Room => "aud_id",
            ResourceKind::Subject => "object_id",
            ResourceKind::Schedule => "id",
        }
    }
}

/// Ordered query parameters for a list call
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListQuery {
    pairs: Vec<(&'static str, String)>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter; blank values are skipped
    pub fn with(mut self, key: &'static str, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.trim().is_empty() {
            self.pairs.push((key, value.trim().to_string()));
        }
        self
    }

    /// Server-side schedule narrowing from the console's filter state
    pub fn schedule(reference: Option<ReferenceFilter>, text: &str) -> Self {
        let mut query = ListQuery::new();
        if let Some(r) = reference {
            query = query.with(r.query_key(), r.id.to_string());
        }
        query.with("q", text)
    }

    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

// ============================================================================
// Documents
// ============================================================================

/// Server-generated document downloads
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentKind {
    Word,
    Pdf,
    Excel,
    LegacyExcel,
}

impl DocumentKind {
    /// Kinds offered in the export menu
    pub const MENU: [DocumentKind; 3] = [DocumentKind::Word, DocumentKind::Pdf, DocumentKind::Excel];

    pub fn api_path(&self) -> &'static str {
        match self {
            DocumentKind::Word => "export_word",
            DocumentKind::Pdf => "export_pdf",
            DocumentKind::Excel => "export_excel",
            DocumentKind::LegacyExcel => "export",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::Word => "Word (schedule by group)",
            DocumentKind::Pdf => "PDF (approval order)",
            DocumentKind::Excel => "Excel (teaching load)",
            DocumentKind::LegacyExcel => "Excel (raw export)",
        }
    }

    /// Whether the server honours [`ExportFilter`] for this kind
    pub fn accepts_filter(&self) -> bool {
        matches!(self, DocumentKind::Word)
    }

    pub fn file_name(&self, filter: &ExportFilter, today: NaiveDate) -> String {
        match self {
            DocumentKind::Word => format!(
                "Schedule_{}.docx",
                filter.group.as_deref().unwrap_or("all").replace(['/', '\\'], "_")
            ),
            DocumentKind::Pdf => format!("Schedule_order_{}.pdf", today.format("%d.%m.%Y")),
            DocumentKind::Excel => "Teaching_load.xlsx".to_string(),
            DocumentKind::LegacyExcel => "itog_export.xlsx".to_string(),
        }
    }
}

impl FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "word" | "docx" => Ok(DocumentKind::Word),
            "pdf" => Ok(DocumentKind::Pdf),
            "excel" | "xlsx" => Ok(DocumentKind::Excel),
            "legacy" => Ok(DocumentKind::LegacyExcel),
            other => Err(format!(
                "unknown document '{}' (expected word, pdf, excel or legacy)",
                other
            )),
        }
    }
}

/// Optional narrowing for the Word export
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExportFilter {
    /// Group *name*, not id
    pub group: Option<String>,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
}

impl ExportFilter {
    pub fn query(&self) -> ListQuery {
        let day = |d: Option<NaiveDate>| {
            d.map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        };
        ListQuery::new()
            .with("group", self.group.clone().unwrap_or_default())
            .with("date_start", day(self.date_start))
            .with("date_end", day(self.date_end))
    }
}
