use thiserror::Error;
use tracing::debug;

use crate::model::{VerbCategory, VerbEntry, VerbRecord};
use crate::session::VerbSession;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("an entry translated as \"{translation}\" already exists")]
    DuplicateTranslation { translation: String },
}

/// Whether submitting will create a new entry or update the one being edited.
/// Drives the submit button label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    Create,
    Update,
}

/// The in-progress entry, before submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorDraft {
    pub base_form: String,
    pub translation: String,
    pub past_simple: String,
    pub past_participle: String,
    pub category: VerbCategory,
}

impl EditorDraft {
    fn record(&self) -> VerbRecord {
        VerbRecord {
            base_form: self.base_form.clone(),
            translation: self.translation.clone(),
            past_simple: self.past_simple.clone(),
            past_participle: self.past_participle.clone(),
            category: self.category,
        }
    }

    fn from_entry(entry: &VerbEntry) -> Self {
        Self {
            base_form: entry.base_form.clone(),
            translation: entry.translation.clone(),
            past_simple: entry.past_simple.clone(),
            past_participle: entry.past_participle.clone(),
            category: entry.category,
        }
    }
}

/// Base form and translation are always required; the past forms only when
/// the category has them.
pub fn validate(draft: &EditorDraft) -> Result<(), EditorError> {
    if draft.base_form.is_empty() {
        return Err(EditorError::MissingField { field: "base form" });
    }
    if draft.translation.is_empty() {
        return Err(EditorError::MissingField {
            field: "translation",
        });
    }

    if draft.category.requires_past_forms() {
        if draft.past_simple.is_empty() {
            return Err(EditorError::MissingField {
                field: "past simple",
            });
        }
        if draft.past_participle.is_empty() {
            return Err(EditorError::MissingField {
                field: "past participle",
            });
        }
    }

    Ok(())
}

/// Rejects the draft when another entry already uses its translation,
/// comparing trimmed and case-folded. The entry being edited, if any, is
/// excluded so saving an edit does not collide with itself.
pub fn check_duplicate(
    draft: &EditorDraft,
    entries: &[VerbEntry],
    editing_target_id: Option<&str>,
) -> Result<(), EditorError> {
    let needle = normalize_translation(&draft.translation);

    let colliding = entries.iter().any(|entry| {
        editing_target_id != Some(entry.id.as_str())
            && normalize_translation(&entry.translation) == needle
    });

    if colliding {
        return Err(EditorError::DuplicateTranslation {
            translation: draft.translation.clone(),
        });
    }
    Ok(())
}

fn normalize_translation(translation: &str) -> String {
    translation.trim().to_lowercase()
}

/// The create/edit form. Holds the draft, the target of an in-progress edit,
/// and the single error banner.
#[derive(Debug, Default)]
pub struct EntryEditor {
    draft: EditorDraft,
    editing_target_id: Option<String>,
    error: Option<EditorError>,
    focus_requested: bool,
}

impl EntryEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &EditorDraft {
        &self.draft
    }

    pub fn error(&self) -> Option<&EditorError> {
        self.error.as_ref()
    }

    pub fn mode(&self) -> SubmitMode {
        if self.editing_target_id.is_some() {
            SubmitMode::Update
        } else {
            SubmitMode::Create
        }
    }

    pub fn set_base_form(&mut self, value: impl Into<String>) {
        self.draft.base_form = value.into();
    }

    /// Editing the translation clears the error banner; the other fields
    /// leave it in place.
    pub fn set_translation(&mut self, value: impl Into<String>) {
        self.draft.translation = value.into();
        self.error = None;
    }

    pub fn set_past_simple(&mut self, value: impl Into<String>) {
        self.draft.past_simple = value.into();
    }

    pub fn set_past_participle(&mut self, value: impl Into<String>) {
        self.draft.past_participle = value.into();
    }

    pub fn set_category(&mut self, category: VerbCategory) {
        self.draft.category = category;
    }

    /// Validates, checks for duplicates, then applies the draft: an update in
    /// place when an edit is in progress, a brand new entry otherwise. On
    /// success the draft resets to defaults and the banner clears; on failure
    /// the error replaces any previous banner and nothing is written.
    pub async fn submit(&mut self, session: &VerbSession) -> Result<(), EditorError> {
        let entries = session.snapshot();

        let checked = validate(&self.draft)
            .and_then(|_| check_duplicate(&self.draft, &entries, self.editing_target_id.as_deref()));

        if let Err(err) = checked {
            self.error = Some(err.clone());
            return Err(err);
        }

        match self.editing_target_id.take() {
            Some(id) => {
                debug!(id = %id, "updating verb entry");
                session.update(VerbEntry::with_id(id, self.draft.record())).await;
            }
            None => {
                let entry = VerbEntry::new(self.draft.record());
                debug!(id = %entry.id, "creating verb entry");
                session.insert(entry).await;
            }
        }

        self.draft = EditorDraft::default();
        self.error = None;
        Ok(())
    }

    /// Loads an entry into the form for editing and asks the view layer to
    /// bring the form into view.
    pub fn begin_edit(&mut self, entry: &VerbEntry) {
        self.draft = EditorDraft::from_entry(entry);
        self.editing_target_id = Some(entry.id.clone());
        self.error = None;
        self.focus_requested = true;
    }

    /// True once after each `begin_edit`; the view scrolls the form into
    /// view when it observes it.
    pub fn take_focus_request(&mut self) -> bool {
        std::mem::take(&mut self.focus_requested)
    }

    /// Removes the entry and persists. No confirmation step, no undo.
    pub async fn delete(&mut self, session: &VerbSession, id: &str) {
        session.remove(id).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::identity::UserSession;
    use crate::store::memory::MemoryVerbStore;

    fn draft(base: &str, translation: &str, past: &str, participle: &str) -> EditorDraft {
        EditorDraft {
            base_form: base.to_string(),
            translation: translation.to_string(),
            past_simple: past.to_string(),
            past_participle: participle.to_string(),
            category: VerbCategory::Irregular,
        }
    }

    fn entry(base: &str, translation: &str) -> VerbEntry {
        VerbEntry::new(VerbRecord {
            base_form: base.to_string(),
            translation: translation.to_string(),
            past_simple: "x".to_string(),
            past_participle: "x".to_string(),
            category: VerbCategory::Irregular,
        })
    }

    async fn open_session() -> VerbSession {
        let store = Arc::new(MemoryVerbStore::new());
        let user = UserSession::new("ana", "2b").unwrap();
        VerbSession::open(store, &user).await.unwrap()
    }

    #[test]
    fn test_validate_requires_past_forms_for_non_phrasal() {
        let mut incomplete = draft("ir", "to go", "", "gone");
        assert_eq!(
            validate(&incomplete),
            Err(EditorError::MissingField {
                field: "past simple"
            })
        );

        incomplete.past_simple = "went".to_string();
        incomplete.past_participle = String::new();
        assert_eq!(
            validate(&incomplete),
            Err(EditorError::MissingField {
                field: "past participle"
            })
        );
    }

    #[test]
    fn test_validate_exempts_phrasal_verbs() {
        let mut phrasal = draft("give up", "rendirse", "", "");
        phrasal.category = VerbCategory::Phrasal;
        assert_eq!(validate(&phrasal), Ok(()));
    }

    #[test]
    fn test_check_duplicate_folds_case_and_whitespace() {
        let entries = vec![entry("ir", "to go")];
        let colliding = draft("andar", "  To Go ", "went", "gone");

        assert_eq!(
            check_duplicate(&colliding, &entries, None),
            Err(EditorError::DuplicateTranslation {
                translation: "  To Go ".to_string()
            })
        );
    }

    #[test]
    fn test_check_duplicate_excludes_edit_target() {
        let entries = vec![entry("ir", "to go")];
        let keeping_translation = draft("caminar", "to go", "went", "gone");

        assert_eq!(
            check_duplicate(&keeping_translation, &entries, Some(entries[0].id.as_str())),
            Ok(())
        );
        assert!(check_duplicate(&keeping_translation, &entries, None).is_err());
    }

    #[tokio::test]
    async fn test_submit_rejects_duplicate_translation() {
        let session = open_session().await;
        let mut editor = EntryEditor::new();

        editor.set_base_form("ir");
        editor.set_translation("to go");
        editor.set_past_simple("went");
        editor.set_past_participle("gone");
        editor.submit(&session).await.unwrap();

        editor.set_base_form("andar");
        editor.set_translation("to go");
        editor.set_past_simple("walked");
        editor.set_past_participle("walked");

        let err = editor.submit(&session).await.unwrap_err();
        assert!(matches!(err, EditorError::DuplicateTranslation { .. }));
        assert_eq!(editor.error(), Some(&err));
        assert_eq!(session.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_error_banner_clears_on_translation_edit_only() {
        let session = open_session().await;
        let mut editor = EntryEditor::new();

        editor.set_base_form("ir");
        editor.set_translation("to go");
        assert!(editor.submit(&session).await.is_err());
        assert!(editor.error().is_some());

        editor.set_past_simple("went");
        assert!(editor.error().is_some(), "other fields keep the banner");

        editor.set_translation("to go somewhere");
        assert!(editor.error().is_none());
    }

    #[tokio::test]
    async fn test_submit_resets_draft_and_mode() {
        let session = open_session().await;
        let mut editor = EntryEditor::new();

        editor.set_base_form("give up");
        editor.set_translation("rendirse");
        editor.set_category(VerbCategory::Phrasal);
        editor.submit(&session).await.unwrap();

        assert_eq!(editor.draft(), &EditorDraft::default());
        assert_eq!(editor.mode(), SubmitMode::Create);
        assert_eq!(editor.draft().category, VerbCategory::Regular);
    }

    #[tokio::test]
    async fn test_begin_edit_then_submit_updates_in_place() {
        let session = open_session().await;
        let mut editor = EntryEditor::new();

        editor.set_base_form("ir");
        editor.set_translation("to go");
        editor.set_past_simple("went");
        editor.set_past_participle("gone");
        editor.submit(&session).await.unwrap();

        let target = session.snapshot()[0].clone();
        editor.begin_edit(&target);
        assert_eq!(editor.mode(), SubmitMode::Update);
        assert!(editor.take_focus_request());
        assert!(!editor.take_focus_request(), "request is one-shot");

        editor.set_base_form("caminar");
        editor.submit(&session).await.unwrap();

        let entries = session.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, target.id);
        assert_eq!(entries[0].base_form, "caminar");
        assert_eq!(entries[0].translation, "to go");
    }
}
