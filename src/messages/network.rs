//! Network messages - communication between App and Network layers

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::ConsoleError;
use crate::models::{DocumentKind, ExportFilter, ListQuery, Record, RecordDraft, RecordId, ResourceKind};

/// What a mutation does to the server
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Create(RecordDraft),
    Update(RecordId, RecordDraft),
    Delete(RecordId),
}

impl Mutation {
    pub fn verb(&self) -> &'static str {
        match self {
            Mutation::Create(_) => "Create",
            Mutation::Update(..) => "Update",
            Mutation::Delete(_) => "Delete",
        }
    }
}

/// Commands sent from App layer to Network layer
#[derive(Debug, Clone)]
pub enum NetworkCommand {
    /// Load `kind` and its dependencies; `query` narrows the `kind` list only
    Load {
        seq: u64,
        kind: ResourceKind,
        query: Option<ListQuery>,
    },
    Mutate {
        id: u64,
        kind: ResourceKind,
        mutation: Mutation,
    },
    /// Download a document into the export directory
    Export {
        id: u64,
        document: DocumentKind,
        filter: ExportFilter,
    },
    Import {
        id: u64,
        path: PathBuf,
    },
    /// Shutdown the network actor
    Shutdown,
}

/// Responses sent from Network layer to App layer
#[derive(Debug, Clone)]
pub enum NetworkResponse {
    /// Every collection the load fetched, dependencies included
    Loaded {
        seq: u64,
        kind: ResourceKind,
        collections: HashMap<ResourceKind, Vec<Record>>,
    },
    LoadFailed {
        seq: u64,
        kind: ResourceKind,
        error: ConsoleError,
    },
    Mutated {
        id: u64,
        kind: ResourceKind,
    },
    MutationFailed {
        id: u64,
        kind: ResourceKind,
        error: ConsoleError,
    },
    Exported {
        id: u64,
        path: PathBuf,
    },
    ExportFailed {
        id: u64,
        error: ConsoleError,
    },
    Imported {
        id: u64,
        count: u64,
    },
    ImportFailed {
        id: u64,
        error: ConsoleError,
    },
}

impl NetworkResponse {
    /// Request id, or load sequence number for load responses
    pub fn id(&self) -> u64 {
        match self {
            NetworkResponse::Loaded { seq, .. } => *seq,
            NetworkResponse::LoadFailed { seq, .. } => *seq,
            NetworkResponse::Mutated { id, .. } => *id,
            NetworkResponse::MutationFailed { id, .. } => *id,
            NetworkResponse::Exported { id, .. } => *id,
            NetworkResponse::ExportFailed { id, .. } => *id,
            NetworkResponse::Imported { id, .. } => *id,
            NetworkResponse::ImportFailed { id, .. } => *id,
        }
    }

    pub fn error(&self) -> Option<&ConsoleError> {
        match self {
            NetworkResponse::LoadFailed { error, .. }
            | NetworkResponse::MutationFailed { error, .. }
            | NetworkResponse::ExportFailed { error, .. }
            | NetworkResponse::ImportFailed { error, .. } => Some(error),
            _ => None,
        }
    }
}
