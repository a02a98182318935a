//! Typed per-session drafting state and the in-memory store that holds it.
//!
//! Text and list fragments are kept apart; a list fragment only ever holds
//! `Points` from a validated parse or a user edit. Every write replaces the
//! previous value of that fragment.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::generation::drafter::DraftOutput;
use crate::generation::fragments::{ContextSource, FragmentId, FragmentSpec};
use crate::generation::heuristics::{export_basename, parse_figure_listing, sanitize_filename, FigureIndex};
use crate::generation::structured::Points;
use crate::generation::text::Reduction;
use crate::ingest::{DocumentContent, DocumentMetrics};

/// The slide template has room for this many points per list.
pub const SLIDE_LIST_LIMIT: usize = 3;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Fragments the slide export cannot do without.
pub const SLIDE_REQUIRED: [FragmentId; 4] = [
    FragmentId::Title,
    FragmentId::Objective,
    FragmentId::ImpactPoints,
    FragmentId::Approach,
];

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(Uuid),

    #[error("No document has been uploaded to this session")]
    NoDocument,

    #[error("The document changed while '{0}' was being drafted; generate it again")]
    DocumentChanged(FragmentId),

    #[error("'{0}' was edited while it was being drafted; the edit was kept")]
    EditedDuringDraft(FragmentId),

    #[error("'{fragment}' holds {expected}")]
    WrongKind {
        fragment: FragmentId,
        expected: &'static str,
    },

    #[error("Edit for '{0}' is empty; delete the fragment instead")]
    EmptyEdit(FragmentId),

    #[error("No figure list has been generated for this document")]
    NoFigureIndex,

    #[error("Figure '{0}' is not in the figure list")]
    UnknownFigure(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentOrigin {
    Generated,
    /// Generated, then shortened by the word-count pass.
    Reduced,
    UserEdited,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextFragment {
    pub text: String,
    pub origin: FragmentOrigin,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredFragment {
    pub points: Points,
    pub origin: FragmentOrigin,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FragmentValue {
    Text(TextFragment),
    Points(StructuredFragment),
    Figures { figures: FigureIndex },
}

/// Flat slot value handed to the document templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SlotValue {
    Text(String),
    List(Vec<String>),
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateSlots {
    pub slots: BTreeMap<&'static str, SlotValue>,
    pub export_basename: String,
    pub slide_missing: Vec<FragmentId>,
    pub slide_ready: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub file_name: Option<String>,
    pub document: Option<DocumentMetrics>,
    pub fragments: BTreeMap<FragmentId, FragmentValue>,
    pub selected_figure: Option<String>,
    pub slide_missing: Vec<FragmentId>,
}

/// What a draft call needs, copied out so no lock is held during the call.
#[derive(Debug, Clone)]
pub struct DraftInputs {
    pub document: Arc<DocumentContent>,
    pub context: Option<String>,
    /// Manual-change counter of the fragment when the draft started.
    revision: u64,
}

#[derive(Debug, Clone)]
pub struct HighlightSession {
    id: Uuid,
    created_at: DateTime<Utc>,
    last_active: DateTime<Utc>,
    document: Option<Arc<DocumentContent>>,
    file_name: Option<String>,
    texts: BTreeMap<FragmentId, TextFragment>,
    points: BTreeMap<FragmentId, StructuredFragment>,
    figures: Option<FigureIndex>,
    selected_figure: Option<String>,
    /// Bumped on every user edit, clear or selection affecting a fragment.
    revisions: BTreeMap<FragmentId, u64>,
}

impl HighlightSession {
    pub fn new(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            last_active: now,
            document: None,
            file_name: None,
            texts: BTreeMap::new(),
            points: BTreeMap::new(),
            figures: None,
            selected_figure: None,
            revisions: BTreeMap::new(),
        }
    }

    fn revision(&self, id: FragmentId) -> u64 {
        self.revisions.get(&id).copied().unwrap_or(0)
    }

    fn bump(&mut self, id: FragmentId) {
        *self.revisions.entry(id).or_default() += 1;
    }

    pub fn document(&self) -> Option<&Arc<DocumentContent>> {
        self.document.as_ref()
    }

    /// Replaces the document. Everything drafted from the previous one is
    /// dropped; manual-only slots are kept.
    pub fn set_document(&mut self, document: DocumentContent, file_name: Option<String>) {
        self.document = Some(Arc::new(document));
        self.file_name = file_name;
        self.texts.retain(|id, _| id.is_manual());
        self.points.clear();
        self.figures = None;
        self.selected_figure = None;
    }

    pub fn text(&self, id: FragmentId) -> Option<&str> {
        self.texts.get(&id).map(|f| f.text.as_str())
    }

    pub fn figures(&self) -> Option<&FigureIndex> {
        self.figures.as_ref()
    }

    pub fn selected_figure(&self) -> Option<&str> {
        self.selected_figure.as_deref()
    }

    pub fn draft_inputs(&self, spec: &FragmentSpec) -> Result<DraftInputs, SessionError> {
        let document = self.document.clone().ok_or(SessionError::NoDocument)?;
        let context = match spec.context {
            ContextSource::None => None,
            ContextSource::Fragment(id) => self.text(id).map(str::to_string),
            ContextSource::SelectedFigure => self.selected_figure.clone(),
        };
        Ok(DraftInputs {
            document,
            context,
            revision: self.revision(spec.id),
        })
    }

    /// Stores a finished draft, unless the document it was drafted from has
    /// since been replaced or the user changed the fragment in the meantime.
    pub fn store_draft(
        &mut self,
        id: FragmentId,
        inputs: &DraftInputs,
        output: DraftOutput,
    ) -> Result<FragmentValue, SessionError> {
        let current = self.document.as_ref().ok_or(SessionError::NoDocument)?;
        if !Arc::ptr_eq(current, &inputs.document) {
            return Err(SessionError::DocumentChanged(id));
        }
        if self.revision(id) != inputs.revision {
            return Err(SessionError::EditedDuringDraft(id));
        }

        let value = match output {
            DraftOutput::Text(generated) => {
                let origin = match generated.reduction {
                    Reduction::Applied => FragmentOrigin::Reduced,
                    Reduction::NotNeeded | Reduction::Failed => FragmentOrigin::Generated,
                };
                let fragment = TextFragment {
                    text: generated.text,
                    origin,
                };
                self.texts.insert(id, fragment.clone());
                FragmentValue::Text(fragment)
            }
            DraftOutput::Points { points } => {
                let fragment = StructuredFragment {
                    points,
                    origin: FragmentOrigin::Generated,
                };
                self.points.insert(id, fragment.clone());
                FragmentValue::Points(fragment)
            }
            DraftOutput::Figures { figures } => {
                self.set_figures(figures.clone());
                FragmentValue::Figures { figures }
            }
        };
        info!("Session {}: stored fragment '{}'", self.id, id);
        Ok(value)
    }

    /// Manual text edit. For the figure list the text is parsed as a listing.
    pub fn edit_text(&mut self, id: FragmentId, text: &str) -> Result<FragmentValue, SessionError> {
        if id.is_points() {
            return Err(SessionError::WrongKind {
                fragment: id,
                expected: "a list of points",
            });
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyEdit(id));
        }

        self.bump(id);
        if id == FragmentId::FigureList {
            let figures = parse_figure_listing(text);
            self.set_figures(figures.clone());
            return Ok(FragmentValue::Figures { figures });
        }

        let fragment = TextFragment {
            text: text.to_string(),
            origin: FragmentOrigin::UserEdited,
        };
        self.texts.insert(id, fragment.clone());
        Ok(FragmentValue::Text(fragment))
    }

    pub fn edit_points(
        &mut self,
        id: FragmentId,
        items: &[String],
    ) -> Result<FragmentValue, SessionError> {
        if !id.is_points() {
            return Err(SessionError::WrongKind {
                fragment: id,
                expected: "text",
            });
        }
        let points = Points::from_user_edit(items).ok_or(SessionError::EmptyEdit(id))?;
        self.bump(id);
        let fragment = StructuredFragment {
            points,
            origin: FragmentOrigin::UserEdited,
        };
        self.points.insert(id, fragment.clone());
        Ok(FragmentValue::Points(fragment))
    }

    /// Returns whether anything was removed.
    pub fn clear(&mut self, id: FragmentId) -> bool {
        self.bump(id);
        if id == FragmentId::FigureList {
            let had = self.figures.is_some();
            self.figures = None;
            self.selected_figure = None;
            self.texts.remove(&FragmentId::FigureCaption);
            self.bump(FragmentId::FigureCaption);
            return had;
        }
        self.texts.remove(&id).is_some() || self.points.remove(&id).is_some()
    }

    pub fn select_figure(&mut self, figure_id: &str) -> Result<(), SessionError> {
        let figures = self.figures.as_ref().ok_or(SessionError::NoFigureIndex)?;
        if !figures.contains(figure_id) {
            return Err(SessionError::UnknownFigure(figure_id.to_string()));
        }
        self.selected_figure = Some(figure_id.to_string());
        self.texts.remove(&FragmentId::FigureCaption);
        // A caption drafted for the previous selection must not land.
        self.bump(FragmentId::FigureCaption);
        Ok(())
    }

    fn set_figures(&mut self, figures: FigureIndex) {
        self.figures = Some(figures);
        self.selected_figure = None;
        self.texts.remove(&FragmentId::FigureCaption);
        self.bump(FragmentId::FigureCaption);
    }

    pub fn value(&self, id: FragmentId) -> Option<FragmentValue> {
        if id == FragmentId::FigureList {
            return self.figures.clone().map(|figures| FragmentValue::Figures { figures });
        }
        self.texts
            .get(&id)
            .cloned()
            .map(FragmentValue::Text)
            .or_else(|| self.points.get(&id).cloned().map(FragmentValue::Points))
    }

    pub fn slide_missing(&self) -> Vec<FragmentId> {
        SLIDE_REQUIRED
            .into_iter()
            .filter(|id| self.value(*id).is_none())
            .collect()
    }

    /// Flat slot mapping for the document and slide templates.
    pub fn slots(&self, today: NaiveDate) -> TemplateSlots {
        let mut slots = BTreeMap::new();
        for (id, fragment) in &self.texts {
            slots.insert(id.as_str(), SlotValue::Text(fragment.text.clone()));
        }
        for (id, fragment) in &self.points {
            let capped = fragment
                .points
                .as_slice()
                .iter()
                .take(SLIDE_LIST_LIMIT)
                .cloned()
                .collect();
            slots.insert(id.as_str(), SlotValue::List(capped));
        }
        if let Some(figures) = &self.figures {
            let lines = figures
                .iter()
                .map(|(id, description)| format!("{id} :: {description}"))
                .collect();
            slots.insert(FragmentId::FigureList.as_str(), SlotValue::List(lines));
        }
        if let Some(selected) = &self.selected_figure {
            slots.insert("selected_figure", SlotValue::Text(selected.clone()));
        }

        let slide_missing = self.slide_missing();
        TemplateSlots {
            slots,
            export_basename: sanitize_filename(&export_basename(
                self.text(FragmentId::Citation),
                today,
            )),
            slide_ready: slide_missing.is_empty(),
            slide_missing,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let fragments = FragmentId::ALL
            .into_iter()
            .filter_map(|id| self.value(id).map(|v| (id, v)))
            .collect();
        SessionSnapshot {
            id: self.id,
            created_at: self.created_at,
            file_name: self.file_name.clone(),
            document: self.document.as_ref().map(|d| d.metrics()),
            fragments,
            selected_figure: self.selected_figure.clone(),
            slide_missing: self.slide_missing(),
        }
    }
}

/// All live sessions. Access goes through closures so the lock is released
/// before any backend call is made.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, HighlightSession>>>,
}

impl SessionStore {
    pub async fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions
            .write()
            .await
            .insert(id, HighlightSession::new(id));
        info!("Created session {id}");
        id
    }

    pub async fn read<R>(
        &self,
        id: Uuid,
        f: impl FnOnce(&HighlightSession) -> R,
    ) -> Result<R, SessionError> {
        let sessions = self.sessions.read().await;
        sessions.get(&id).map(f).ok_or(SessionError::NotFound(id))
    }

    pub async fn update<R>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut HighlightSession) -> R,
    ) -> Result<R, SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        session.last_active = Utc::now();
        Ok(f(session))
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), SessionError> {
        if self.sessions.write().await.remove(&id).is_none() {
            return Err(SessionError::NotFound(id));
        }
        info!("Removed session {id}");
        Ok(())
    }

    /// Drops every session not written to since `cutoff`. Returns how many went.
    pub async fn evict_idle_since(&self, cutoff: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.last_active >= cutoff);
        before - sessions.len()
    }

    /// Background sweep: every minute (or every `max_idle`, if shorter), drop
    /// sessions idle for longer than `max_idle`. Runs until the runtime stops.
    pub async fn expire_idle(self, max_idle: Duration) {
        let Ok(max_idle_delta) = chrono::Duration::from_std(max_idle) else {
            warn!("Session TTL {:?} is out of range; idle sessions will not expire", max_idle);
            return;
        };
        let period = SWEEP_INTERVAL.min(max_idle).max(Duration::from_secs(1));
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let removed = self.evict_idle_since(Utc::now() - max_idle_delta).await;
            if removed > 0 {
                info!("Expired {removed} idle session(s)");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::text::GeneratedText;
    use crate::ingest::collect_until_marker;
    use crate::tokenizer::TokenCounter;

    fn document(text: &str) -> DocumentContent {
        collect_until_marker([text.to_string()], "References\n", &TokenCounter::for_model("gpt-4o"))
    }

    fn session_with_document() -> HighlightSession {
        let mut session = HighlightSession::new(Uuid::new_v4());
        session.set_document(document("Body of the paper."), Some("paper.pdf".to_string()));
        session
    }

    fn generated(text: &str, reduction: Reduction) -> DraftOutput {
        DraftOutput::Text(GeneratedText {
            text: text.to_string(),
            reduction,
            initial_word_count: text.split_whitespace().count(),
        })
    }

    fn figures(listing: &str) -> DraftOutput {
        DraftOutput::Figures {
            figures: parse_figure_listing(listing),
        }
    }

    fn store(session: &mut HighlightSession, id: FragmentId, output: DraftOutput) {
        let inputs = inputs_for(session, id);
        session.store_draft(id, &inputs, output).unwrap();
    }

    fn inputs_for(session: &HighlightSession, id: FragmentId) -> DraftInputs {
        DraftInputs {
            document: session.document().unwrap().clone(),
            context: None,
            revision: session.revision(id),
        }
    }

    #[test]
    fn test_draft_requires_document() {
        let session = HighlightSession::new(Uuid::new_v4());
        let spec = FragmentId::Title.draft_spec().unwrap();
        assert!(matches!(session.draft_inputs(&spec), Err(SessionError::NoDocument)));
    }

    #[test]
    fn test_subtitle_context_is_current_title() {
        let mut session = session_with_document();
        let spec = FragmentId::Subtitle.draft_spec().unwrap();
        assert_eq!(session.draft_inputs(&spec).unwrap().context, None);

        store(&mut session, FragmentId::Title, generated("Aquifers Under Pressure", Reduction::NotNeeded));
        assert_eq!(
            session.draft_inputs(&spec).unwrap().context.as_deref(),
            Some("Aquifers Under Pressure")
        );

        session.edit_text(FragmentId::Title, "Edited Title").unwrap();
        assert_eq!(
            session.draft_inputs(&spec).unwrap().context.as_deref(),
            Some("Edited Title")
        );
    }

    #[test]
    fn test_reduced_and_edited_origins() {
        let mut session = session_with_document();
        store(&mut session, FragmentId::Science, generated("short text", Reduction::Applied));
        assert!(matches!(
            session.value(FragmentId::Science),
            Some(FragmentValue::Text(TextFragment { origin: FragmentOrigin::Reduced, .. }))
        ));

        session.edit_text(FragmentId::Science, "  my own words ").unwrap();
        assert_eq!(session.text(FragmentId::Science), Some("my own words"));
        assert!(matches!(
            session.value(FragmentId::Science),
            Some(FragmentValue::Text(TextFragment { origin: FragmentOrigin::UserEdited, .. }))
        ));
    }

    #[test]
    fn test_points_and_text_are_distinct_kinds() {
        let mut session = session_with_document();
        assert!(matches!(
            session.edit_text(FragmentId::Approach, "- one\n- two"),
            Err(SessionError::WrongKind { .. })
        ));
        assert!(matches!(
            session.edit_points(FragmentId::Title, &["A".to_string()]),
            Err(SessionError::WrongKind { .. })
        ));
        assert!(matches!(
            session.edit_points(FragmentId::Approach, &["".to_string()]),
            Err(SessionError::EmptyEdit(_))
        ));
        let value = session
            .edit_points(FragmentId::Approach, &["- Couples models".to_string(), "Runs scenarios".to_string()])
            .unwrap();
        let FragmentValue::Points(fragment) = value else {
            panic!("approach holds points");
        };
        assert_eq!(fragment.points.as_slice(), ["Couples models", "Runs scenarios"]);
    }

    #[test]
    fn test_new_figure_index_clears_selection_and_caption() {
        let mut session = session_with_document();
        store(&mut session, FragmentId::FigureList, figures("Figure 1 :: Map\nFigure 2 :: Series"));
        session.select_figure("Figure 2").unwrap();
        store(&mut session, FragmentId::FigureCaption, generated("Caption for two.", Reduction::NotNeeded));
        assert!(session.text(FragmentId::FigureCaption).is_some());

        store(&mut session, FragmentId::FigureList, figures("Figure 1 :: Map"));
        assert_eq!(session.selected_figure(), None);
        assert_eq!(session.text(FragmentId::FigureCaption), None);
    }

    #[test]
    fn test_figure_selection_must_exist_and_resets_caption() {
        let mut session = session_with_document();
        assert!(matches!(session.select_figure("Figure 1"), Err(SessionError::NoFigureIndex)));

        store(&mut session, FragmentId::FigureList, figures("Figure 1 :: Map\nFigure 2 :: Series"));
        assert!(matches!(
            session.select_figure("Table 1"),
            Err(SessionError::UnknownFigure(ref id)) if id == "Table 1"
        ));

        session.select_figure("Figure 1").unwrap();
        store(&mut session, FragmentId::FigureCaption, generated("Caption one.", Reduction::NotNeeded));
        session.select_figure("Figure 2").unwrap();
        assert_eq!(session.text(FragmentId::FigureCaption), None);

        let spec = FragmentId::FigureCaption.draft_spec().unwrap();
        assert_eq!(session.draft_inputs(&spec).unwrap().context.as_deref(), Some("Figure 2"));
    }

    #[test]
    fn test_new_document_clears_generated_but_keeps_manual() {
        let mut session = session_with_document();
        store(&mut session, FragmentId::Title, generated("Old title", Reduction::NotNeeded));
        store(&mut session, FragmentId::FigureList, figures("Figure 1 :: Map"));
        session.edit_points(FragmentId::ImpactPoints, &["A".to_string()]).unwrap();
        session.edit_text(FragmentId::PointOfContact, "Dr. Jane Doe").unwrap();

        session.set_document(document("A different paper."), None);
        assert_eq!(session.text(FragmentId::Title), None);
        assert!(session.value(FragmentId::ImpactPoints).is_none());
        assert!(session.figures().is_none());
        assert_eq!(session.text(FragmentId::PointOfContact), Some("Dr. Jane Doe"));
    }

    #[test]
    fn test_stale_draft_is_rejected() {
        let mut session = session_with_document();
        let started = inputs_for(&session, FragmentId::Title);
        session.set_document(document("Replacement."), None);

        let err = session
            .store_draft(FragmentId::Title, &started, generated("Stale", Reduction::NotNeeded))
            .unwrap_err();
        assert!(matches!(err, SessionError::DocumentChanged(FragmentId::Title)));
        assert_eq!(session.text(FragmentId::Title), None);
    }

    #[test]
    fn test_draft_does_not_overwrite_edit_made_meanwhile() {
        let mut session = session_with_document();
        let spec = FragmentId::Title.draft_spec().unwrap();
        let started = session.draft_inputs(&spec).unwrap();
        session.edit_text(FragmentId::Title, "My Own Title").unwrap();

        let err = session
            .store_draft(FragmentId::Title, &started, generated("Drafted Title", Reduction::NotNeeded))
            .unwrap_err();
        assert!(matches!(err, SessionError::EditedDuringDraft(FragmentId::Title)));
        assert_eq!(session.text(FragmentId::Title), Some("My Own Title"));

        // Other fragments are unaffected by the title edit.
        let science = session.draft_inputs(&FragmentId::Science.draft_spec().unwrap()).unwrap();
        session.edit_text(FragmentId::Subtitle, "Unrelated").unwrap();
        session
            .store_draft(FragmentId::Science, &science, generated("Body.", Reduction::NotNeeded))
            .unwrap();
    }

    #[test]
    fn test_caption_for_previous_selection_is_rejected() {
        let mut session = session_with_document();
        store(&mut session, FragmentId::FigureList, figures("Figure 1 :: Map\nFigure 2 :: Series"));
        session.select_figure("Figure 1").unwrap();
        let spec = FragmentId::FigureCaption.draft_spec().unwrap();
        let started = session.draft_inputs(&spec).unwrap();
        session.select_figure("Figure 2").unwrap();

        let err = session
            .store_draft(FragmentId::FigureCaption, &started, generated("Map caption.", Reduction::NotNeeded))
            .unwrap_err();
        assert!(matches!(err, SessionError::EditedDuringDraft(FragmentId::FigureCaption)));
    }

    #[test]
    fn test_clear_fragment() {
        let mut session = session_with_document();
        store(&mut session, FragmentId::Title, generated("T", Reduction::NotNeeded));
        assert!(session.clear(FragmentId::Title));
        assert!(!session.clear(FragmentId::Title));
    }

    #[test]
    fn test_slide_readiness_and_slots() {
        let mut session = session_with_document();
        assert_eq!(session.slide_missing(), SLIDE_REQUIRED.to_vec());

        store(&mut session, FragmentId::Title, generated("Aquifers Under Pressure", Reduction::NotNeeded));
        store(&mut session, FragmentId::Objective, generated("Quantify depletion.", Reduction::NotNeeded));
        session
            .edit_points(
                FragmentId::Approach,
                &["One".to_string(), "Two".to_string(), "Three".to_string(), "Four".to_string()],
            )
            .unwrap();
        assert_eq!(session.slide_missing(), vec![FragmentId::ImpactPoints]);

        session
            .edit_points(FragmentId::ImpactPoints, &["A".to_string(), "B".to_string(), "C".to_string()])
            .unwrap();
        session
            .edit_text(
                FragmentId::Citation,
                "Smith, J. 2023. \"Basin Study\". Water Research 12(3): 1-9.",
            )
            .unwrap();

        let today = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let slots = session.slots(today);
        assert!(slots.slide_ready);
        assert_eq!(
            slots.slots.get("approach"),
            Some(&SlotValue::List(vec!["One".to_string(), "Two".to_string(), "Three".to_string()]))
        );
        assert_eq!(
            slots.slots.get("title"),
            Some(&SlotValue::Text("Aquifers Under Pressure".to_string()))
        );
        assert_eq!(slots.export_basename, "smith_etal_2023_waterresearch_ber-highlight_05mar2024");
    }

    #[test]
    fn test_snapshot_lists_fragments_without_document_text() {
        let mut session = session_with_document();
        store(&mut session, FragmentId::Title, generated("T", Reduction::NotNeeded));
        let value = serde_json::to_value(session.snapshot()).unwrap();
        assert_eq!(value["fragments"]["title"]["kind"], "text");
        assert_eq!(value["fragments"]["title"]["text"], "T");
        assert_eq!(value["document"]["word_count"], 4);
        assert!(value["document"].get("text").is_none());
    }

    #[tokio::test]
    async fn test_store_create_read_update() {
        let store = SessionStore::default();
        let id = store.create().await;

        store
            .update(id, |s| s.set_document(document("Hello world."), None))
            .await
            .unwrap();
        let has_doc = store.read(id, |s| s.document().is_some()).await.unwrap();
        assert!(has_doc);

        let missing = Uuid::new_v4();
        assert!(matches!(
            store.read(missing, |_| ()).await,
            Err(SessionError::NotFound(id)) if id == missing
        ));
    }

    #[tokio::test]
    async fn test_store_remove() {
        let store = SessionStore::default();
        let id = store.create().await;
        store.remove(id).await.unwrap();
        assert!(matches!(store.read(id, |_| ()).await, Err(SessionError::NotFound(_))));
        assert!(matches!(store.remove(id).await, Err(SessionError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_idle_sessions_are_evicted() {
        let store = SessionStore::default();
        let a = store.create().await;
        let b = store.create().await;

        assert_eq!(store.evict_idle_since(Utc::now() - chrono::Duration::hours(1)).await, 0);

        let cutoff = Utc::now() + chrono::Duration::seconds(1);
        assert_eq!(store.evict_idle_since(cutoff).await, 2);
        assert!(store.read(a, |_| ()).await.is_err());
        assert!(store.read(b, |_| ()).await.is_err());
    }

    #[tokio::test]
    async fn test_update_keeps_session_alive() {
        let store = SessionStore::default();
        let id = store.create().await;
        let created = store.read(id, |s| s.last_active).await.unwrap();
        store.update(id, |_| ()).await.unwrap();
        let touched = store.read(id, |s| s.last_active).await.unwrap();
        assert!(touched >= created);
        assert_eq!(store.evict_idle_since(touched).await, 0);
    }
}
