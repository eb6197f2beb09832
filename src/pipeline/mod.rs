//! Case narrative → scenario timeline pipeline.
//!
//! Stages run in a fixed order and pass the event list by value:
//! segment, classify, assemble (with temporal extraction), participants,
//! decisions, optional refinement, ontology, ordering. The orchestrator hashes
//! and commits the result.

pub mod assemble;
pub mod classify;
pub mod decisions;
pub mod hash;
pub mod ontology;
pub mod orchestrator;
pub mod ordering;
pub mod participants;
pub mod refine;
pub mod segment;
pub mod temporal;
pub mod validate;

pub use orchestrator::{PipelineError, PipelineOutcome, ScenarioPipeline};
