use crate::model::VerbEntry;

/// Why a projection holds what it holds; lets the table tell "no search
/// results" apart from "nothing in the list yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionStatus {
    Matches,
    NoMatches,
    EmptyCollection,
}

/// The filtered slice of the collection currently rendered. Derived, never
/// persisted.
#[derive(Debug, Clone)]
pub struct Projection {
    entries: Vec<VerbEntry>,
    status: ProjectionStatus,
}

impl Projection {
    pub fn entries(&self) -> &[VerbEntry] {
        &self.entries
    }

    pub fn status(&self) -> ProjectionStatus {
        self.status
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Case-insensitive substring match on base form or translation. An empty
/// term matches everything. Display order follows the collection's existing
/// sort; the input is never mutated or re-sorted.
pub fn project(entries: &[VerbEntry], search_term: &str) -> Projection {
    if entries.is_empty() {
        return Projection {
            entries: Vec::new(),
            status: ProjectionStatus::EmptyCollection,
        };
    }

    let needle = search_term.to_lowercase();
    let matched: Vec<VerbEntry> = entries
        .iter()
        .filter(|entry| {
            entry.base_form.to_lowercase().contains(&needle)
                || entry.translation.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect();

    let status = if matched.is_empty() {
        ProjectionStatus::NoMatches
    } else {
        ProjectionStatus::Matches
    };

    Projection {
        entries: matched,
        status,
    }
}
