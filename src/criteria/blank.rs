//! Blank node counts.

use std::collections::HashSet;

use crate::error::CriterionResult;
use crate::graph::{Row, Term, Triple};

use super::{Criterion, CriterionKind, ResultMap, apply_scalar, scalar_from_rows};

fn blank_label(term: &Term) -> Option<&str> {
    match term {
        Term::Blank(label) => Some(label),
        _ => None,
    }
}

/// Number of distinct blank nodes in subject position.
#[derive(Debug, Default)]
pub struct DistinctSubjectsBlank {
    blank_subjects: HashSet<String>,
    num_blank_subjects: i64,
}

impl DistinctSubjectsBlank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> i64 {
        self.num_blank_subjects
    }
}

impl Criterion for DistinctSubjectsBlank {
    fn kind(&self) -> CriterionKind {
        CriterionKind::DistinctSubjectsBlank
    }

    fn init(&mut self) {
        *self = Self::default();
    }

    fn consider_triple(&mut self, triple: &Triple) {
        if let Some(label) = blank_label(&triple.subject) {
            self.blank_subjects.insert(label.to_string());
            self.num_blank_subjects = self.blank_subjects.len() as i64;
        }
    }

    fn aggregate_query(&self) -> String {
        "SELECT (COUNT(DISTINCT ?s) AS ?numBlankSubjects) WHERE { ?s ?p ?o FILTER(isBlank(?s)) }"
            .to_string()
    }

    fn consume_aggregate_rows(&mut self, rows: &[Row]) -> CriterionResult<()> {
        let value = scalar_from_rows(self.kind(), rows, "numBlankSubjects");
        apply_scalar(&mut self.num_blank_subjects, value)
    }

    fn result_map(&mut self) -> ResultMap {
        ResultMap::from([("DistinctSubjectsBlank".to_string(), self.num_blank_subjects.into())])
    }

    fn report(&mut self) -> Vec<String> {
        vec![format!(
            "Result: number of distinct blank subjects = {}",
            self.num_blank_subjects
        )]
    }
}

/// Number of distinct blank nodes that occur as subject but never as object.
///
/// Objects may stream in after the subject use, so the count is only final
/// once the whole dataset was seen.
#[derive(Debug, Default)]
pub struct DistinctSubjectOnlyBlanks {
    subject_blanks: HashSet<String>,
    object_blanks: HashSet<String>,
    num_subject_only: Option<i64>,
}

impl DistinctSubjectOnlyBlanks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> i64 {
        self.num_subject_only.unwrap_or_else(|| {
            self.subject_blanks
                .iter()
                .filter(|b| !self.object_blanks.contains(*b))
                .count() as i64
        })
    }
}

impl Criterion for DistinctSubjectOnlyBlanks {
    fn kind(&self) -> CriterionKind {
        CriterionKind::DistinctSubjectOnlyBlanks
    }

    fn init(&mut self) {
        *self = Self::default();
    }

    fn consider_triple(&mut self, triple: &Triple) {
        if let Some(label) = blank_label(&triple.subject) {
            self.subject_blanks.insert(label.to_string());
        }
        if let Some(label) = blank_label(&triple.object) {
            self.object_blanks.insert(label.to_string());
        }
    }

    fn aggregate_query(&self) -> String {
        "SELECT (COUNT(DISTINCT ?s) AS ?numSubjectOnlyBlanks) WHERE { \
           ?s ?p ?o FILTER(isBlank(?s)) FILTER NOT EXISTS { ?x ?y ?s } \
         }"
        .to_string()
    }

    fn consume_aggregate_rows(&mut self, rows: &[Row]) -> CriterionResult<()> {
        let mut count = 0;
        let result = apply_scalar(
            &mut count,
            scalar_from_rows(self.kind(), rows, "numSubjectOnlyBlanks"),
        );
        self.num_subject_only = Some(count);
        result
    }

    fn result_map(&mut self) -> ResultMap {
        ResultMap::from([("DistinctSubjectOnlyBlanks".to_string(), self.count().into())])
    }

    fn report(&mut self) -> Vec<String> {
        vec![format!(
            "Result: number of distinct subject only blank nodes = {}",
            self.count()
        )]
    }
}
