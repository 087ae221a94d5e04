//! Schema version graph and document transforms.
//!
//! The engine is pure: it resolves a [`MigrationPath`] between two schema
//! versions and applies it to documents in memory. Reading and committing
//! documents is the job of [`crate::MigrationRunner`].

use std::{collections::HashSet, fmt, sync::Arc};

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// A stored document: a JSON object carrying a stable `_id`.
pub type Document = Map<String, Value>;

/// Transform applied to one document by a [`MigrationStep`].
pub type Transform = Arc<dyn Fn(Document) -> Result<Document> + Send + Sync>;

/// Field holding a document's stable identity.
pub const ID_FIELD: &str = "_id";

/// Known schema versions, oldest first.
pub const VERSIONS: &[&str] = &["0.5", "0.6", "0.7"];

/// Readable form of a document's identity for error messages.
pub(crate) fn document_id(doc: &Document) -> String {
    match doc.get(ID_FIELD) {
        Some(Value::String(id)) => id.clone(),
        Some(other) => other.to_string(),
        None => "<missing>".to_string(),
    }
}

/// One registered hop between two schema versions.
#[derive(Clone)]
pub struct MigrationStep {
    pub from: String,
    pub to: String,
    pub source_collection: String,
    pub target_collection: String,
    /// When false, the engine restores each document's `_id` after the
    /// transform runs.
    pub remaps_identity: bool,
    transform: Transform,
}

impl MigrationStep {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        source_collection: impl Into<String>,
        target_collection: impl Into<String>,
        transform: impl Fn(Document) -> Result<Document> + Send + Sync + 'static,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            source_collection: source_collection.into(),
            target_collection: target_collection.into(),
            remaps_identity: false,
            transform: Arc::new(transform),
        }
    }

    /// Let the transform assign new `_id` values.
    #[must_use]
    pub fn remapping_identity(mut self) -> Self {
        self.remaps_identity = true;
        self
    }

    pub fn label(&self) -> String {
        format!("{} -> {}", self.from, self.to)
    }

    /// Transform a single document.
    pub fn apply(&self, doc: Document) -> Result<Document> {
        let id = doc.get(ID_FIELD).cloned();
        let doc_id = document_id(&doc);
        let mut out = (self.transform)(doc).map_err(|e| match e {
            Error::TransformFailure { .. } => e,
            other => Error::transform_failure(self.label(), doc_id, other),
        })?;
        if !self.remaps_identity
            && let Some(id) = id
        {
            out.insert(ID_FIELD.to_string(), id);
        }
        Ok(out)
    }
}

impl fmt::Debug for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationStep")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("source_collection", &self.source_collection)
            .field("target_collection", &self.target_collection)
            .field("remaps_identity", &self.remaps_identity)
            .finish_non_exhaustive()
    }
}

/// Ordered steps where each step starts at the version the previous one ends at.
#[derive(Debug, Clone, Default)]
pub struct MigrationPath {
    steps: Vec<MigrationStep>,
}

impl MigrationPath {
    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Collection the first step reads from.
    pub fn source_collection(&self) -> Option<&str> {
        self.steps.first().map(|s| s.source_collection.as_str())
    }

    /// Collection the last step writes to.
    pub fn target_collection(&self) -> Option<&str> {
        self.steps.last().map(|s| s.target_collection.as_str())
    }
}

/// Resolves and applies schema migrations over a fixed version list.
#[derive(Debug, Clone)]
pub struct MigrationEngine {
    versions: Vec<String>,
    steps: Vec<MigrationStep>,
}

impl Default for MigrationEngine {
    fn default() -> Self {
        Self::with_builtin_steps()
    }
}

impl MigrationEngine {
    /// An engine with no steps over the given versions (oldest first).
    pub fn new<I, S>(versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            versions: versions.into_iter().map(Into::into).collect(),
            steps: Vec::new(),
        }
    }

    /// [`VERSIONS`] with the built-in bridge schema steps registered.
    pub fn with_builtin_steps() -> Self {
        let mut engine = Self::new(VERSIONS.iter().copied());
        engine.steps = crate::builtin::steps();
        engine
    }

    pub fn versions(&self) -> &[String] {
        &self.versions
    }

    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    fn position(&self, version: &str) -> Result<usize> {
        self.versions
            .iter()
            .position(|v| v == version)
            .ok_or_else(|| Error::invalid_version(version))
    }

    /// Add a step. Both endpoints must be known and distinct, and at most one
    /// step may exist per `(from, to)` pair.
    pub fn register(&mut self, step: MigrationStep) -> Result<()> {
        let from = self.position(&step.from)?;
        let to = self.position(&step.to)?;
        if from == to {
            return Err(Error::invalid_step(&step.from, &step.to, "step must change version"));
        }
        if self
            .steps
            .iter()
            .any(|s| s.from == step.from && s.to == step.to)
        {
            return Err(Error::invalid_step(&step.from, &step.to, "already registered"));
        }
        self.steps.push(step);
        Ok(())
    }

    /// Resolve the chain of steps leading from `from` to `to`.
    ///
    /// Steps only ever move towards `to` and never past it. Out of each
    /// version the shortest step is tried first; a step that leads into a
    /// dead end is abandoned for the next longer one.
    pub fn get_migrations(&self, from: &str, to: &str) -> Result<MigrationPath> {
        let start = self.position(from)?;
        let target = self.position(to)?;
        let mut dead_ends = HashSet::new();
        let steps = self
            .chain(start, target, &mut dead_ends)
            .ok_or_else(|| Error::no_migration_path(from, to))?;
        Ok(MigrationPath {
            steps: steps.into_iter().cloned().collect(),
        })
    }

    /// Depth-first search from `current`, remembering versions that cannot
    /// reach `target`.
    fn chain(
        &self,
        current: usize,
        target: usize,
        dead_ends: &mut HashSet<usize>,
    ) -> Option<Vec<&MigrationStep>> {
        if current == target {
            return Some(Vec::new());
        }
        if dead_ends.contains(&current) {
            return None;
        }

        let mut candidates: Vec<(usize, &MigrationStep)> = self
            .steps
            .iter()
            .filter_map(|step| {
                let start = self.versions.iter().position(|v| *v == step.from)?;
                let end = self.versions.iter().position(|v| *v == step.to)?;
                let towards = if target > current {
                    end > current && end <= target
                } else {
                    end < current && end >= target
                };
                (start == current && towards).then_some((end, step))
            })
            .collect();
        candidates.sort_by_key(|(end, _)| end.abs_diff(current));

        for (end, step) in candidates {
            if let Some(mut rest) = self.chain(end, target, dead_ends) {
                rest.insert(0, step);
                return Some(rest);
            }
        }
        dead_ends.insert(current);
        None
    }

    /// Run every step of `path` over `documents`, in order.
    ///
    /// Any transform error aborts the whole batch; no partial result is
    /// returned.
    pub fn apply_migrations(
        &self,
        path: &MigrationPath,
        documents: Vec<Document>,
    ) -> Result<Vec<Document>> {
        path.steps().iter().try_fold(documents, |docs, step| {
            docs.into_iter()
                .map(|doc| step.apply(doc))
                .collect::<Result<Vec<_>>>()
        })
    }
}

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn tagging_step(from: &str, to: &str) -> MigrationStep {
        let tag = format!("{from}->{to}");
        MigrationStep::new(from, to, "c", "c", move |mut d| {
            let hops = d
                .entry("hops")
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(hops) = hops {
                hops.push(Value::String(tag.clone()));
            }
            Ok(d)
        })
    }

    fn engine(steps: &[(&str, &str)]) -> MigrationEngine {
        let mut engine = MigrationEngine::new(["1", "2", "3", "4"]);
        for (from, to) in steps {
            engine.register(tagging_step(from, to)).unwrap();
        }
        engine
    }

    fn labels(path: &MigrationPath) -> Vec<String> {
        path.steps().iter().map(MigrationStep::label).collect()
    }

    #[test]
    fn unknown_versions_are_rejected() {
        let engine = engine(&[("1", "2")]);
        assert!(matches!(
            engine.get_migrations("0.1", "2"),
            Err(Error::InvalidVersion { .. })
        ));
        assert!(matches!(
            engine.get_migrations("1", "9"),
            Err(Error::InvalidVersion { .. })
        ));
    }

    #[test]
    fn same_version_is_empty_path() {
        let engine = engine(&[("1", "2")]);
        let path = engine.get_migrations("2", "2").unwrap();
        assert!(path.is_empty());
        assert!(path.source_collection().is_none());
    }

    #[test]
    fn forward_chain() {
        let engine = engine(&[("2", "3"), ("1", "2"), ("3", "4")]);
        let path = engine.get_migrations("1", "4").unwrap();
        assert_eq!(labels(&path), ["1 -> 2", "2 -> 3", "3 -> 4"]);
    }

    #[test]
    fn backward_chain_uses_backward_steps_only() {
        let engine = engine(&[("1", "2"), ("2", "3"), ("3", "2"), ("2", "1")]);
        let path = engine.get_migrations("3", "1").unwrap();
        assert_eq!(labels(&path), ["3 -> 2", "2 -> 1"]);
    }

    #[test]
    fn shortest_hop_is_preferred_and_no_overshoot() {
        let engine = engine(&[("1", "3"), ("1", "2"), ("2", "4"), ("2", "3")]);
        let path = engine.get_migrations("1", "3").unwrap();
        assert_eq!(labels(&path), ["1 -> 2", "2 -> 3"]);
    }

    #[test]
    fn dead_end_hop_falls_back_to_longer_step() {
        let engine = engine(&[("1", "2"), ("1", "3"), ("3", "4")]);
        let path = engine.get_migrations("1", "4").unwrap();
        assert_eq!(labels(&path), ["1 -> 3", "3 -> 4"]);
    }

    #[test]
    fn backward_dead_end_falls_back_too() {
        let engine = engine(&[("4", "3"), ("4", "2"), ("2", "1")]);
        let path = engine.get_migrations("4", "1").unwrap();
        assert_eq!(labels(&path), ["4 -> 2", "2 -> 1"]);
    }

    #[test]
    fn broken_chain_is_no_path() {
        let engine = engine(&[("1", "2"), ("3", "4")]);
        assert!(matches!(
            engine.get_migrations("1", "4"),
            Err(Error::NoMigrationPath { .. })
        ));
        assert!(matches!(
            engine.get_migrations("2", "1"),
            Err(Error::NoMigrationPath { .. })
        ));
    }

    #[test]
    fn register_rejects_bad_steps() {
        let mut engine = engine(&[("1", "2")]);
        assert!(matches!(
            engine.register(tagging_step("1", "2")),
            Err(Error::InvalidStep { .. })
        ));
        assert!(matches!(
            engine.register(tagging_step("2", "2")),
            Err(Error::InvalidStep { .. })
        ));
        assert!(matches!(
            engine.register(tagging_step("2", "7")),
            Err(Error::InvalidVersion { .. })
        ));
    }

    #[test]
    fn apply_runs_steps_in_order_and_keeps_identity() {
        let engine = engine(&[("1", "2"), ("2", "3")]);
        let path = engine.get_migrations("1", "3").unwrap();
        let out = engine
            .apply_migrations(&path, vec![doc(json!({"_id": "a"}))])
            .unwrap();
        assert_eq!(out[0]["hops"], json!(["1->2", "2->3"]));
        assert_eq!(out[0]["_id"], "a");
    }

    #[test]
    fn identity_restored_unless_remapped() {
        let clobber = |mut d: Document| {
            d.insert(ID_FIELD.into(), json!("new"));
            Ok(d)
        };
        let kept = MigrationStep::new("1", "2", "c", "c", clobber);
        let remapped = MigrationStep::new("1", "2", "c", "c", clobber).remapping_identity();

        let input = doc(json!({"_id": 7}));
        assert_eq!(kept.apply(input.clone()).unwrap()["_id"], 7);
        assert_eq!(remapped.apply(input).unwrap()["_id"], "new");
    }

    #[test]
    fn transform_error_aborts_whole_batch() {
        let mut engine = MigrationEngine::new(["1", "2"]);
        engine
            .register(MigrationStep::new("1", "2", "c", "c", |d| {
                if d.contains_key("bad") {
                    Err(Error::Message("bad document".into()))
                } else {
                    Ok(d)
                }
            }))
            .unwrap();
        let path = engine.get_migrations("1", "2").unwrap();
        let docs = vec![
            doc(json!({"_id": "ok"})),
            doc(json!({"_id": "broken", "bad": true})),
        ];
        let err = engine.apply_migrations(&path, docs).unwrap_err();
        match err {
            Error::TransformFailure { step, id, .. } => {
                assert_eq!(step, "1 -> 2");
                assert_eq!(id, "broken");
            },
            other => panic!("unexpected error: {other}"),
        }
    }
}
