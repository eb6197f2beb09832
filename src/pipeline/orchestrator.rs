use std::collections::HashMap;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use super::assemble::assemble_events;
use super::classify::classify_sentences;
use super::decisions::enrich_decisions;
use super::hash::compute_scenario_hash;
use super::ontology::{map_ontology, summarize_ontology};
use super::ordering::order_events;
use super::participants::annotate_participants;
use super::refine::{apply_refinements, DecisionRefiner};
use super::segment::segment_sections;
use super::validate::check_structure;
use crate::db::{CaseStore, DatabaseError};
use crate::models::{Event, ScenarioStats, ScenarioVersion, SectionMap};
use crate::pipeline_config::PipelineConfig;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Case not found: {0}")]
    CaseNotFound(Uuid),
}

/// Result of a committed run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// The version now stored as `latest_scenario`, with its assigned number.
    pub version: ScenarioVersion,
    /// False when the hash matched the last stored version and nothing was appended.
    pub appended: bool,
}

/// Orchestrates the case-to-timeline pipeline:
/// segment → classify → assemble → participants → decisions → refine →
/// ontology → order → hash → commit
pub struct ScenarioPipeline<S: CaseStore> {
    store: S,
    refiner: Option<Box<dyn DecisionRefiner>>,
    config: PipelineConfig,
}

impl<S: CaseStore> ScenarioPipeline<S> {
    pub fn new(store: S, config: PipelineConfig) -> Self {
        Self {
            store,
            refiner: None,
            config,
        }
    }

    pub fn with_refiner(mut self, refiner: Box<dyn DecisionRefiner>) -> Self {
        self.refiner = Some(refiner);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load, build and commit a scenario version for one case.
    ///
    /// A new version is appended when its hash differs from the last stored
    /// one or `overwrite` is set. `latest_scenario` is replaced either way.
    pub fn run(&self, case_id: &Uuid, overwrite: bool) -> Result<PipelineOutcome, PipelineError> {
        let _span = tracing::info_span!("scenario_pipeline", case_id = %case_id).entered();

        let sections = self
            .store
            .load_sections(case_id)?
            .ok_or(PipelineError::CaseNotFound(*case_id))?;

        let mut version = self.build_scenario(case_id, &sections);
        let mut appended = false;

        self.store.update_metadata(case_id, &mut |meta| {
            let last = meta.last_version();
            let changed = last.map_or(true, |v| v.hash != version.hash);

            if changed || overwrite {
                version.version_number = last.map_or(1, |v| v.version_number + 1);
                meta.scenario_versions.push(version.clone());
                appended = true;
            } else if let Some(last) = last {
                version.version_number = last.version_number;
            }
            meta.latest_scenario = Some(version.clone());
        })?;

        if appended {
            tracing::info!(
                version = version.version_number,
                events = version.stats.event_count,
                decisions = version.stats.decision_count,
                "scenario version appended"
            );
        } else {
            tracing::info!(
                version = version.version_number,
                "scenario unchanged, reusing version"
            );
        }

        Ok(PipelineOutcome { version, appended })
    }

    /// Run every stage over the given sections. Pure apart from the refiner call.
    /// The returned version is unnumbered (`version_number == 0`).
    pub fn build_scenario(&self, case_id: &Uuid, sections: &SectionMap) -> ScenarioVersion {
        let narrative = segment_sections(sections);
        let classifications = classify_sentences(&narrative.sentences);

        let mut events = assemble_events(&narrative, &classifications);
        let participants = annotate_participants(&mut events);
        let events = enrich_decisions(events, self.config.max_initial_decisions);
        let events = self.refine(events);
        let events = map_ontology(events);

        let ontology_summary = summarize_ontology(&events, &participants);
        let ordering = order_events(&events);

        let sentence_sections: HashMap<String, _> = narrative
            .sentences
            .iter()
            .map(|s| (s.id.clone(), s.section))
            .collect();
        for violation in check_structure(&events, &ordering, &sentence_sections) {
            tracing::warn!(%violation, "structural violation in scenario");
        }

        let stats = ScenarioStats {
            event_count: events.len(),
            decision_count: events.iter().filter(|e| e.is_decision()).count(),
            sentence_count: narrative.sentence_count(),
        };
        let hash = compute_scenario_hash(&stats);

        ScenarioVersion {
            pipeline_version: self.config.pipeline_version.clone(),
            generated_at: Utc::now(),
            case_id: *case_id,
            events,
            ordering,
            stats,
            participants,
            ontology_summary,
            hash,
            version_number: 0,
        }
    }

    fn refine(&self, events: Vec<Event>) -> Vec<Event> {
        let Some(refiner) = &self.refiner else {
            return events;
        };

        match refiner.refine(&events) {
            Ok(refinements) if refinements.is_empty() => {
                tracing::debug!("refiner proposed no decisions, keeping lexical set");
                events
            }
            Ok(refinements) => apply_refinements(events, refinements),
            Err(e) => {
                tracing::warn!(error = %e, "decision refinement failed, keeping lexical set");
                events
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{get_case_metadata, import_case, SqliteCaseStore};
    use crate::db::sqlite::open_memory_database;
    use crate::models::{Case, CaseMetadata, EventKind, Section};
    use crate::pipeline::refine::{
        DecisionRefinement, FailingLlmClient, LlmDecisionRefiner, MockLlmClient, NoopRefiner,
        RefinementError,
    };

    const FACTS: &str =
        "Engineer A designed a bridge in March 2024. The design was reviewed by Client W.";
    const QUESTION: &str = "Should Engineer A have disclosed the conflict of interest?";
    const CONCLUSION: &str = "Therefore the board found the conduct unethical.";

    fn case_sections(facts: &str) -> SectionMap {
        [
            ("facts".to_string(), facts.to_string()),
            ("question".to_string(), QUESTION.to_string()),
            ("conclusion".to_string(), CONCLUSION.to_string()),
        ]
        .into_iter()
        .collect()
    }

    fn setup(sections: &SectionMap) -> (SqliteCaseStore, Uuid) {
        let conn = open_memory_database().unwrap();
        let case = Case {
            id: Uuid::new_v4(),
            title: "Bridge disclosure".into(),
            created_at: chrono::Local::now().naive_local(),
        };
        import_case(&conn, &case, sections).unwrap();
        (SqliteCaseStore::new(conn), case.id)
    }

    fn metadata<S: CaseStore>(pipeline: &ScenarioPipeline<S>, id: &Uuid) -> CaseMetadata
    where
        S: AsConnection,
    {
        get_case_metadata(pipeline.store().conn(), id).unwrap()
    }

    trait AsConnection {
        fn conn(&self) -> &rusqlite::Connection;
    }

    impl AsConnection for SqliteCaseStore {
        fn conn(&self) -> &rusqlite::Connection {
            self.connection()
        }
    }

    impl AsConnection for FailingCommitStore {
        fn conn(&self) -> &rusqlite::Connection {
            self.inner.connection()
        }
    }

    #[test]
    fn end_to_end_scenario() {
        let (store, id) = setup(&case_sections(FACTS));
        let pipeline = ScenarioPipeline::new(store, PipelineConfig::default());

        let outcome = pipeline.run(&id, false).unwrap();
        let v = &outcome.version;

        assert!(outcome.appended);
        assert_eq!(v.version_number, 1);
        assert_eq!(v.case_id, id);
        assert_eq!(v.stats.sentence_count, 4);
        assert_eq!(v.stats.event_count, v.events.len());
        assert_eq!(
            v.stats.decision_count,
            v.events.iter().filter(|e| e.is_decision()).count()
        );

        let decision = v
            .events
            .iter()
            .find(|e| e.kind == EventKind::Decision)
            .expect("question sentence becomes a decision");
        assert_eq!(decision.section, Section::Question);
        assert_eq!(decision.text, QUESTION);
        assert_eq!(decision.options.as_ref().map(Vec::len), Some(3));

        let outcome_event = v
            .events
            .iter()
            .find(|e| e.kind == EventKind::Outcome)
            .expect("conclusion sentence becomes an outcome");
        assert_eq!(outcome_event.text, CONCLUSION);

        assert!(v.participants.contains("Engineer A"));
        assert!(v.participants.contains("Client W"));
        assert!(!v.participants.contains("Engineer"));
        assert_eq!(v.ontology_summary.roles.len(), v.participants.len());

        let first = &v.events[0];
        assert_eq!(first.kind, EventKind::Action);
        assert_eq!(first.temporal.raw.as_deref(), Some("March 2024"));
        assert_eq!(v.ordering, vec!["e1", "e2", "e3"]);
    }

    #[test]
    fn built_scenario_is_structurally_sound() {
        let sections = case_sections(
            "Engineer A designed a bridge. Engineer A should report the crack. \
             The river is wide.\n\nClient W refused to pay. Therefore the work stopped.",
        );
        let (store, id) = setup(&sections);
        let pipeline = ScenarioPipeline::new(store, PipelineConfig::default());
        let v = pipeline.build_scenario(&id, &sections);

        let narrative = crate::pipeline::segment::segment_sections(&sections);
        let map: HashMap<String, Section> = narrative
            .sentences
            .iter()
            .map(|s| (s.id.clone(), s.section))
            .collect();
        assert!(check_structure(&v.events, &v.ordering, &map).is_empty());

        // every sentence covered exactly once, in document order
        let covered: Vec<&String> = v.events.iter().flat_map(|e| &e.sentence_ids).collect();
        let expected: Vec<&String> = narrative.sentences.iter().map(|s| &s.id).collect();
        assert_eq!(covered, expected);
        assert_eq!(v.version_number, 0);
    }

    #[test]
    fn rerun_reuses_version() {
        let (store, id) = setup(&case_sections(FACTS));
        let pipeline = ScenarioPipeline::new(store, PipelineConfig::default());

        let first = pipeline.run(&id, false).unwrap();
        let second = pipeline.run(&id, false).unwrap();

        assert!(!second.appended);
        assert_eq!(second.version.version_number, first.version.version_number);
        assert_eq!(second.version.hash, first.version.hash);

        let meta = metadata(&pipeline, &id);
        assert_eq!(meta.scenario_versions.len(), 1);
        let latest = meta.latest_scenario.unwrap();
        assert_eq!(latest.version_number, 1);
        assert_eq!(latest.generated_at, second.version.generated_at);
    }

    #[test]
    fn overwrite_appends_even_when_unchanged() {
        let (store, id) = setup(&case_sections(FACTS));
        let pipeline = ScenarioPipeline::new(store, PipelineConfig::default());

        pipeline.run(&id, false).unwrap();
        let forced = pipeline.run(&id, true).unwrap();

        assert!(forced.appended);
        assert_eq!(forced.version.version_number, 2);
        let meta = metadata(&pipeline, &id);
        let numbers: Vec<u32> = meta.scenario_versions.iter().map(|v| v.version_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(meta.latest_scenario.unwrap().version_number, 2);
    }

    #[test]
    fn changed_counts_append_new_version() {
        let (store, id) = setup(&case_sections(FACTS));
        let pipeline = ScenarioPipeline::new(store, PipelineConfig::default());
        pipeline.run(&id, false).unwrap();

        crate::db::repository::upsert_section(
            pipeline.store().connection(),
            &id,
            "discussion",
            "Engineer A must weigh public safety.",
        )
        .unwrap();
        let next = pipeline.run(&id, false).unwrap();

        assert!(next.appended);
        assert_eq!(next.version.version_number, 2);
        assert_eq!(next.version.stats.sentence_count, 5);
    }

    #[test]
    fn unrelated_metadata_preserved() {
        let (store, id) = setup(&case_sections(FACTS));
        store
            .update_metadata(&id, &mut |meta| {
                meta.extra.insert("reviewer".into(), serde_json::json!("board"));
            })
            .unwrap();
        let pipeline = ScenarioPipeline::new(store, PipelineConfig::default());
        pipeline.run(&id, false).unwrap();

        let meta = metadata(&pipeline, &id);
        assert_eq!(meta.extra["reviewer"], "board");
        assert_eq!(meta.scenario_versions.len(), 1);
    }

    #[test]
    fn unknown_case_is_error() {
        let (store, _) = setup(&case_sections(FACTS));
        let pipeline = ScenarioPipeline::new(store, PipelineConfig::default());
        let missing = Uuid::new_v4();
        assert!(matches!(
            pipeline.run(&missing, false),
            Err(PipelineError::CaseNotFound(id)) if id == missing
        ));
    }

    #[test]
    fn empty_case_produces_empty_version() {
        let (store, id) = setup(&SectionMap::new());
        let pipeline = ScenarioPipeline::new(store, PipelineConfig::default());
        let outcome = pipeline.run(&id, false).unwrap();
        assert!(outcome.version.events.is_empty());
        assert_eq!(outcome.version.stats.sentence_count, 0);
        assert_eq!(outcome.version.version_number, 1);
    }

    #[test]
    fn noop_refiner_matches_no_refiner() {
        let sections = case_sections(FACTS);
        let (store, id) = setup(&sections);
        let plain = ScenarioPipeline::new(store, PipelineConfig::default());
        let a = plain.build_scenario(&id, &sections);

        let (store, _) = setup(&sections);
        let noop = ScenarioPipeline::new(store, PipelineConfig::default())
            .with_refiner(Box::new(NoopRefiner));
        let b = noop.build_scenario(&id, &sections);

        assert_eq!(a.events, b.events);
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn refiner_failure_keeps_lexical_decisions() {
        let sections = case_sections(FACTS);
        let (store, id) = setup(&sections);
        let refiner = LlmDecisionRefiner::new(Box::new(FailingLlmClient), "llama3");
        let pipeline = ScenarioPipeline::new(store, PipelineConfig::default())
            .with_refiner(Box::new(refiner));

        let outcome = pipeline.run(&id, false).unwrap();
        assert_eq!(outcome.version.stats.decision_count, 1);
        assert!(outcome.version.events.iter().all(|e| e.refined.is_none()));
    }

    #[test]
    fn refiner_replaces_decision_set() {
        // e1 is the merged facts run (two sentences), e2 the question, e3 the conclusion
        let reply = r#"```json
{"decisions": [
  {"event_index": 2, "title": "Board finding", "question": "Was the finding fair?",
   "options": [{"label": "Yes", "description": "Accept it."},
               {"label": "No", "description": "Appeal it."}]},
  {"event_index": 0, "title": "Merged", "question": "Ignored?"}
]}
```"#;
        let sections = case_sections(FACTS);
        let (store, id) = setup(&sections);
        let refiner = LlmDecisionRefiner::new(Box::new(MockLlmClient::new(reply)), "llama3");
        let pipeline = ScenarioPipeline::new(store, PipelineConfig::default())
            .with_refiner(Box::new(refiner));

        let v = pipeline.run(&id, false).unwrap().version;
        let decisions: Vec<&Event> = v.events.iter().filter(|e| e.is_decision()).collect();
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].text, CONCLUSION);
        assert_eq!(decisions[0].refined, Some(true));
        assert_eq!(decisions[0].title.as_deref(), Some("Board finding"));

        // the lexical question decision was reset and re-tagged as a process
        let question = &v.events[1];
        assert_eq!(question.kind, EventKind::Action);
        assert!(question.options.is_none());
        assert_eq!(
            question.ontology.rdf_types,
            vec![crate::models::OntologyTag::Process]
        );
    }

    struct ScriptedRefiner(Vec<DecisionRefinement>);

    impl DecisionRefiner for ScriptedRefiner {
        fn refine(&self, _events: &[Event]) -> Result<Vec<DecisionRefinement>, RefinementError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn out_of_range_refinement_leaves_no_decisions() {
        let sections = case_sections(FACTS);
        let (store, id) = setup(&sections);
        let refiner = ScriptedRefiner(vec![DecisionRefinement {
            event_index: 99,
            title: "T".into(),
            question: "Q?".into(),
            options: vec![],
        }]);
        let pipeline = ScenarioPipeline::new(store, PipelineConfig::default())
            .with_refiner(Box::new(refiner));
        let v = pipeline.build_scenario(&id, &sections);
        assert_eq!(v.stats.decision_count, 0);
    }

    #[test]
    fn decision_cap_from_config() {
        let facts = "Engineer A should stop. Engineer A must report. Engineer A ought to resign.";
        let sections = case_sections(facts);
        let (store, id) = setup(&sections);
        let config = PipelineConfig {
            max_initial_decisions: 2,
            ..PipelineConfig::default()
        };
        let pipeline = ScenarioPipeline::new(store, config);
        let v = pipeline.build_scenario(&id, &sections);

        assert_eq!(v.stats.decision_count, 2);
        // the question sentence outranks every facts decision
        assert!(v
            .events
            .iter()
            .any(|e| e.is_decision() && e.section == Section::Question));
    }

    /// Store whose commit always fails after the read succeeds.
    struct FailingCommitStore {
        inner: SqliteCaseStore,
    }

    impl CaseStore for FailingCommitStore {
        fn load_sections(&self, case_id: &Uuid) -> Result<Option<SectionMap>, DatabaseError> {
            self.inner.load_sections(case_id)
        }

        fn update_metadata(
            &self,
            _case_id: &Uuid,
            _apply: &mut dyn FnMut(&mut CaseMetadata),
        ) -> Result<CaseMetadata, DatabaseError> {
            Err(DatabaseError::Sqlite(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
                Some("database is locked".into()),
            )))
        }
    }

    #[test]
    fn commit_failure_propagates_and_keeps_prior_state() {
        let (store, id) = setup(&case_sections(FACTS));
        let first = ScenarioPipeline::new(store, PipelineConfig::default());
        first.run(&id, false).unwrap();
        let before = metadata(&first, &id);

        let failing = ScenarioPipeline::new(
            FailingCommitStore {
                inner: first.store,
            },
            PipelineConfig::default(),
        );
        let result = failing.run(&id, true);
        assert!(matches!(result, Err(PipelineError::Database(_))));

        let after = metadata(&failing, &id);
        assert_eq!(after, before);
    }
}
