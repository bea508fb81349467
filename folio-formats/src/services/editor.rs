//! Draft lifecycle on top of the registry
//!
//! A draft is an in-memory edit session over a node's exportable fields. Drafts are keyed by a
//! random id, never by node id, so the same node can be open in several sessions.
//!
//! Dirty tracking:
//!
//! - [`EditorService::create_draft`] (existing node) starts clean
//! - [`EditorService::create_new_draft`] (new content) starts dirty
//! - every [`EditorService::update_draft`] marks dirty
//! - a successful [`EditorService::save_content`] marks clean

use super::storage::ContentStore;
use crate::common::slug::slugify;
use crate::error::ServiceError;
use crate::format::{ExportOutput, SourceFile, SourceInput};
use crate::node::{ContentNode, ExportInput, ExportPatch};
use crate::registry::FormatRegistry;
use crate::validation::ValidationResult;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Ids of step content a learning path synthesizes at view time (`<path>-step-<n>`)
pub const DEFAULT_GENERATED_ID_PATTERN: &str = r"-step-\d+$";

/// Who may edit what
#[derive(Debug, Clone)]
pub struct EditorPolicy {
    pub allow_editing: bool,
    /// Node ids matching this are generated content and never editable
    pub generated_ids: Option<Regex>,
    /// Exports carry the draft's last update time
    pub stamp_updated_at: bool,
}

impl EditorPolicy {
    pub fn new(allow_editing: bool, generated_id_pattern: Option<&str>) -> Result<Self, regex::Error> {
        let generated_ids = generated_id_pattern
            .filter(|pattern| !pattern.is_empty())
            .map(Regex::new)
            .transpose()?;
        Ok(EditorPolicy {
            allow_editing,
            generated_ids,
            stamp_updated_at: true,
        })
    }

    pub fn read_only() -> Self {
        EditorPolicy {
            allow_editing: false,
            ..Self::default()
        }
    }
}

impl Default for EditorPolicy {
    fn default() -> Self {
        EditorPolicy {
            allow_editing: true,
            generated_ids: Regex::new(DEFAULT_GENERATED_ID_PATTERN).ok(),
            stamp_updated_at: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDraft {
    pub id: String,
    /// Node the draft was opened over; `None` for new content. Never changed by saving.
    pub original_node_id: Option<String>,
    /// Id the draft was last stored under
    pub saved_node_id: Option<String>,
    pub format_id: String,
    pub content: ExportInput,
    pub is_dirty: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResult {
    pub success: bool,
    pub node_id: String,
    pub saved_at: DateTime<Utc>,
}

pub struct EditorService<'r, S> {
    registry: &'r FormatRegistry,
    store: S,
    policy: EditorPolicy,
    drafts: HashMap<String, ContentDraft>,
}

impl<'r, S: ContentStore> EditorService<'r, S> {
    pub fn new(registry: &'r FormatRegistry, store: S) -> Self {
        Self::with_policy(registry, store, EditorPolicy::default())
    }

    pub fn with_policy(registry: &'r FormatRegistry, store: S, policy: EditorPolicy) -> Self {
        EditorService {
            registry,
            store,
            policy,
            drafts: HashMap::new(),
        }
    }

    pub fn policy(&self) -> &EditorPolicy {
        &self.policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether `node` may be opened for editing.
    ///
    /// A missing format plugin does not block editing; the UI falls back to the registry's
    /// default editor.
    pub fn can_edit(&self, node: Option<&ContentNode>) -> bool {
        let Some(node) = node else {
            return false;
        };
        if !self.policy.allow_editing {
            return false;
        }
        !self
            .policy
            .generated_ids
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(&node.id))
    }

    fn insert(&mut self, draft: ContentDraft) -> &ContentDraft {
        let id = draft.id.clone();
        debug!(draft = %id, format = %draft.format_id, dirty = draft.is_dirty, "draft opened");
        self.drafts.entry(id).or_insert(draft)
    }

    /// Open a clean draft over an existing node.
    pub fn create_draft(&mut self, node: &ContentNode) -> &ContentDraft {
        let now = Utc::now();
        let format_id = self.registry.resolve_format(&node.content_format).to_string();
        self.insert(ContentDraft {
            id: Uuid::new_v4().to_string(),
            original_node_id: Some(node.id.clone()),
            saved_node_id: None,
            format_id,
            content: ExportInput::from(node),
            is_dirty: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Open a dirty draft for content that does not exist yet.
    pub fn create_new_draft(&mut self, format_id: &str, initial: Option<ExportInput>) -> &ContentDraft {
        let now = Utc::now();
        let format_id = self.registry.resolve_format(format_id).to_string();
        let mut content = initial.unwrap_or_default();
        content.content_format = format_id.clone();
        self.insert(ContentDraft {
            id: Uuid::new_v4().to_string(),
            original_node_id: None,
            saved_node_id: None,
            format_id,
            content,
            is_dirty: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// Shallow-merge `patch` into the draft; `None` for an unknown draft.
    pub fn update_draft(&mut self, draft_id: &str, patch: ExportPatch) -> Option<&ContentDraft> {
        let draft = self.drafts.get_mut(draft_id)?;
        draft.content.apply(patch);
        draft.is_dirty = true;
        draft.updated_at = Utc::now();
        Some(&*draft)
    }

    pub fn get_draft(&self, draft_id: &str) -> Option<&ContentDraft> {
        self.drafts.get(draft_id)
    }

    pub fn delete_draft(&mut self, draft_id: &str) -> Option<ContentDraft> {
        let removed = self.drafts.remove(draft_id);
        if removed.is_some() {
            debug!(draft = %draft_id, "draft discarded");
        }
        removed
    }

    /// Open drafts, oldest first
    pub fn drafts(&self) -> Vec<&ContentDraft> {
        let mut drafts: Vec<_> = self.drafts.values().collect();
        drafts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        drafts
    }

    fn draft(&self, draft_id: &str) -> Result<&ContentDraft, ServiceError> {
        self.drafts
            .get(draft_id)
            .ok_or_else(|| ServiceError::DraftNotFound(draft_id.to_string()))
    }

    /// Serialize the draft through its format plugin.
    pub fn export_draft(&self, draft_id: &str) -> Result<ExportOutput, ServiceError> {
        let draft = self.draft(draft_id)?;
        let plugin = self
            .registry
            .get(&draft.format_id)
            .ok_or_else(|| ServiceError::FormatNotFound {
                format_id: draft.format_id.clone(),
            })?;
        let mut input = draft.content.clone();
        if self.policy.stamp_updated_at {
            input.updated_at = Some(draft.updated_at);
        }
        Ok(plugin.export(&input)?)
    }

    /// Export the draft and validate what came out.
    pub fn validate_draft(&self, draft_id: &str) -> Result<ValidationResult, ServiceError> {
        let output = self.export_draft(draft_id)?;
        let draft = self.draft(draft_id)?;
        let plugin = self
            .registry
            .get(&draft.format_id)
            .ok_or_else(|| ServiceError::FormatNotFound {
                format_id: draft.format_id.clone(),
            })?;
        let result = match output {
            ExportOutput::Text(text) => plugin.validate(SourceInput::text(&text)),
            ExportOutput::Binary(bytes) => {
                let file = SourceFile::new(draft.content.title.clone(), bytes);
                plugin.validate(SourceInput::File(&file))
            }
        };
        Ok(result)
    }

    /// Persist the draft and mark it clean.
    ///
    /// New content gets an id slugified from its title. The only failure the editor itself
    /// raises is an unknown draft; storage errors pass through.
    pub async fn save_content(&mut self, draft_id: &str) -> Result<SaveResult, ServiceError> {
        let draft = self.draft(draft_id)?;
        let node_id = draft
            .original_node_id
            .clone()
            .or_else(|| draft.saved_node_id.clone())
            .or_else(|| draft.content.id.clone().filter(|id| !id.is_empty()))
            .or_else(|| Some(slugify(&draft.content.title)).filter(|id| !id.is_empty()))
            .unwrap_or_else(|| format!("untitled-{}", &draft.id[..8.min(draft.id.len())]));
        let mut content = draft.content.clone();
        content.id = Some(node_id.clone());

        let stored_id = self.store.save(&node_id, &content).await?;

        let saved_at = Utc::now();
        if let Some(draft) = self.drafts.get_mut(draft_id) {
            draft.saved_node_id = Some(stored_id.clone());
            draft.content.id = Some(stored_id.clone());
            draft.is_dirty = false;
        }
        info!(draft = %draft_id, node = %stored_id, "content saved");
        Ok(SaveResult {
            success: true,
            node_id: stored_id,
            saved_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeContent;
    use crate::services::storage::MemoryStore;

    fn node(id: &str) -> ContentNode {
        let mut node = ContentNode::new(id, "concept");
        node.title = "Intro".into();
        node.content_format = "markdown".into();
        node.content = NodeContent::Text("# Intro\n\nBody.".into());
        node
    }

    #[test]
    fn test_can_edit_rules() {
        let registry = FormatRegistry::with_defaults();
        let editor = EditorService::new(&registry, MemoryStore::new());
        assert!(!editor.can_edit(None));
        assert!(editor.can_edit(Some(&node("intro"))));
        assert!(!editor.can_edit(Some(&node("governance-path-step-3"))));

        let mut unknown_format = node("intro");
        unknown_format.content_format = "nope".into();
        assert!(editor.can_edit(Some(&unknown_format)));

        let locked = EditorService::with_policy(&registry, MemoryStore::new(), EditorPolicy::read_only());
        assert!(!locked.can_edit(Some(&node("intro"))));
    }

    #[test]
    fn test_custom_generated_pattern() {
        let registry = FormatRegistry::with_defaults();
        let policy = EditorPolicy::new(true, Some("^generated-")).unwrap();
        let editor = EditorService::with_policy(&registry, MemoryStore::new(), policy);
        assert!(!editor.can_edit(Some(&node("generated-1"))));
        assert!(editor.can_edit(Some(&node("path-step-1"))));
        assert!(EditorPolicy::new(true, Some("(")).is_err());
    }

    #[test]
    fn test_dirty_flags() {
        let registry = FormatRegistry::with_defaults();
        let mut editor = EditorService::new(&registry, MemoryStore::new());

        let existing = editor.create_draft(&node("intro")).id.clone();
        assert!(!editor.get_draft(&existing).unwrap().is_dirty);

        let fresh = editor.create_new_draft("markdown", None).id.clone();
        assert!(editor.get_draft(&fresh).unwrap().is_dirty);
        assert_ne!(existing, fresh);

        assert!(editor.update_draft(&existing, ExportPatch::title("A")).unwrap().is_dirty);
        assert!(editor.update_draft(&existing, ExportPatch::title("B")).unwrap().is_dirty);
        assert!(editor.update_draft("missing", ExportPatch::title("C")).is_none());
        assert_eq!(editor.drafts().len(), 2);
    }

    #[test]
    fn test_new_draft_resolves_alias() {
        let registry = FormatRegistry::with_defaults();
        let mut editor = EditorService::new(&registry, MemoryStore::new());
        let draft = editor.create_new_draft("quiz-json", None);
        assert_eq!(draft.format_id, "perseus");
        assert_eq!(draft.content.content_format, "perseus");
    }

    #[test]
    fn test_export_unknown_format_is_named_error() {
        let registry = FormatRegistry::with_defaults();
        let mut editor = EditorService::new(&registry, MemoryStore::new());
        let id = editor.create_new_draft("latex", None).id.clone();
        match editor.export_draft(&id) {
            Err(ServiceError::FormatNotFound { format_id }) => assert_eq!(format_id, "latex"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_save_keeps_original_node_id() {
        let registry = FormatRegistry::with_defaults();
        let mut editor = EditorService::new(&registry, MemoryStore::new());
        let id = editor.create_draft(&node("intro")).id.clone();
        editor.save_content(&id).await.unwrap();

        let draft = editor.get_draft(&id).unwrap();
        assert_eq!(draft.original_node_id.as_deref(), Some("intro"));
        assert_eq!(draft.saved_node_id.as_deref(), Some("intro"));

        let json = serde_json::to_value(draft).unwrap();
        assert_eq!(json["originalNodeId"], "intro");
        assert!(json.get("nodeId").is_none());
    }

    #[tokio::test]
    async fn test_save_new_content_slugifies_title() {
        let registry = FormatRegistry::with_defaults();
        let store = MemoryStore::new();
        let mut editor = EditorService::new(&registry, store.clone());
        let initial = ExportInput {
            title: "Value Flows & You".into(),
            ..Default::default()
        };
        let id = editor.create_new_draft("markdown", Some(initial)).id.clone();

        let saved = editor.save_content(&id).await.unwrap();
        assert!(saved.success);
        assert_eq!(saved.node_id, "value-flows-you");
        let draft = editor.get_draft(&id).unwrap();
        assert!(!draft.is_dirty);
        assert_eq!(draft.original_node_id, None);
        assert_eq!(draft.saved_node_id.as_deref(), Some("value-flows-you"));
        assert_eq!(store.len(), 1);

        editor.update_draft(&id, ExportPatch::title("Renamed"));
        assert_eq!(editor.save_content(&id).await.unwrap().node_id, "value-flows-you");
        assert_eq!(store.len(), 1);

        assert!(matches!(
            editor.save_content("missing").await,
            Err(ServiceError::DraftNotFound(_))
        ));
    }
}
