//! Metadata filter predicates accepted by the index adapter (spec §4.1: "equality or
//! set-containment predicates on metadata fields").

use serde::{Deserialize, Serialize};

/// A single predicate against a named metadata field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Predicate {
    /// Field equals the given value exactly.
    Eq(String),
    /// Field's list-valued contents include the given value.
    Contains(String),
}

/// A conjunction of field predicates. An empty filter matches everything. Recognized
/// fields are adapter-defined metadata facets (`kind`, `language`, `geographic_scope`,
/// `currency`, `category`, `product_entity`) plus `doc_id`, used by the retriever to scope
/// a query to a single document's chunks (spec §4.2 step 2, metadata-BM25 expansion).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Filter {
    pub predicates: Vec<(String, Predicate)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.predicates.push((field.into(), Predicate::Eq(value.into())));
        self
    }

    pub fn contains(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.predicates
            .push((field.into(), Predicate::Contains(value.into())));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}
