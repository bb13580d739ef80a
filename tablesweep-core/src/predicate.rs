/*!
Structured filter predicates.

A predicate is a disjunction of attribute equality terms, held as data and
rendered to the store's native filter syntax only at the adapter boundary.
Building it from the caller's parallel name/type/value lists validates
every request invariant before any store call is made.
*/

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SweepError};
use crate::value::AttrValue;

/// One `attribute = value` equality term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EqualityTerm {
    pub attribute: String,
    pub value: AttrValue,
}

/// A disjunction (logical OR) of equality terms over row attributes.
///
/// Always holds at least one term: a zero-term predicate is rejected as a
/// malformed request rather than treated as matching nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPredicate {
    terms: Vec<EqualityTerm>,
}

impl FilterPredicate {
    /// Build a predicate from parallel sequences of attribute names, type
    /// tags, and literal values.
    ///
    /// Each term becomes one bind variable named after its attribute.
    ///
    /// # Errors
    /// `MalformedRequest` if the three lists differ in length, are empty,
    /// name the same attribute twice (a bind collision), or carry an
    /// unknown type tag.
    pub fn from_parallel(names: &[String], types: &[String], values: &[String]) -> Result<Self> {
        if names.len() != types.len() || names.len() != values.len() {
            return Err(SweepError::malformed(format!(
                "attribute lists differ in length: {} names, {} types, {} values",
                names.len(),
                types.len(),
                values.len()
            )));
        }

        let mut terms = Vec::with_capacity(names.len());
        for ((name, tag), literal) in names.iter().zip(types).zip(values) {
            if name.is_empty() {
                return Err(SweepError::malformed("empty attribute name"));
            }
            if terms.iter().any(|t: &EqualityTerm| t.attribute == *name) {
                return Err(SweepError::malformed(format!(
                    "duplicate attribute '{name}' collides on its bind variable"
                )));
            }
            terms.push(EqualityTerm {
                attribute: name.clone(),
                value: AttrValue::from_tagged(tag, literal)?,
            });
        }

        Self::from_terms(terms)
    }

    /// Build a predicate from already-typed equality terms.
    pub fn from_terms(terms: Vec<EqualityTerm>) -> Result<Self> {
        if terms.is_empty() {
            return Err(SweepError::malformed(
                "a purge predicate requires at least one attribute term",
            ));
        }
        Ok(Self { terms })
    }

    pub fn terms(&self) -> &[EqualityTerm] {
        &self.terms
    }

    /// Render the filter expression in the store's native syntax:
    /// `name1 = :name1 OR name2 = :name2 OR ...`
    pub fn expression(&self) -> String {
        let clauses: Vec<String> = self
            .terms
            .iter()
            .map(|t| format!("{} = :{}", t.attribute, t.attribute))
            .collect();
        clauses.join(" OR ")
    }

    /// The bind-variable name → typed value map accompanying the expression.
    pub fn bind_values(&self) -> HashMap<String, AttrValue> {
        self.terms
            .iter()
            .map(|t| (format!(":{}", t.attribute), t.value.clone()))
            .collect()
    }

    /// Whether a row satisfies the predicate (any term matches).
    ///
    /// Used by in-process store implementations; the real store evaluates
    /// the rendered expression server-side.
    pub fn matches(&self, row: &crate::value::Row) -> bool {
        self.terms
            .iter()
            .any(|t| row.get(&t.attribute) == Some(&t.value))
    }
}
