//! The Language collaborator contract and its default implementation.

use pdp_primitives::{AttributeMap, Context, Target};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EvaluationError, LanguageResult};
use crate::expression::Expression;

/// One attribute-derived query used to retrieve candidate policies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextQuery {
    /// Fully qualified attribute path (`subject.role`).
    pub path: String,
    /// Scalar value found at that path.
    pub value: Value,
}

impl ContextQuery {
    /// Creates a query.
    #[must_use]
    pub fn new(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            value,
        }
    }
}

/// Compiles targets and conditions and derives retrieval queries.
///
/// Implementations must be pure: compiling the same input twice yields
/// equivalent results, which is what makes the engine's compiled-gate cache
/// safe to populate concurrently.
pub trait Language: Send + Sync {
    /// Returns the attributes every expression of `target` needs, indexed by
    /// category and relative to it.
    ///
    /// # Errors
    ///
    /// Returns the first compile error met in the target.
    fn target_to_attribute_map(&self, target: &Target) -> LanguageResult<AttributeMap>;

    /// Derives the queries used to retrieve policies for `context`.
    fn context_to_queries(&self, context: &Context) -> Vec<ContextQuery>;

    /// Compiles one expression string.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::LanguageError`] when the source is not a valid
    /// expression.
    fn compile_expression(&self, source: &str) -> LanguageResult<Expression>;

    /// Evaluates a compiled expression against resolved context values.
    ///
    /// # Errors
    ///
    /// Returns an [`EvaluationError`] when the expression cannot produce a
    /// boolean.
    fn evaluate_expression(
        &self,
        expression: &Expression,
        context: &Context,
    ) -> Result<bool, EvaluationError> {
        expression.evaluate(context)
    }
}

/// Default [`Language`]: CEL over the context categories.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionLanguage;

impl ExpressionLanguage {
    /// Creates the language.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Language for ExpressionLanguage {
    fn target_to_attribute_map(&self, target: &Target) -> LanguageResult<AttributeMap> {
        let mut map = AttributeMap::new();
        for source in target.expressions() {
            let expression = self.compile_expression(source)?;
            for path in expression.attribute_paths() {
                map.insert(path.category(), path.relative());
            }
        }
        Ok(map)
    }

    fn context_to_queries(&self, context: &Context) -> Vec<ContextQuery> {
        let mut queries = Vec::new();
        for (category, value) in context.attributes() {
            flatten(category, value, &mut queries);
        }
        queries
    }

    fn compile_expression(&self, source: &str) -> LanguageResult<Expression> {
        Expression::compile(source)
    }
}

fn flatten(path: &str, value: &Value, queries: &mut Vec<ContextQuery>) {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (key, nested) in map {
                flatten(&format!("{path}.{key}"), nested, queries);
            }
        }
        // Each scalar member is queried under the array's own path.
        Value::Array(items) => {
            for item in items.iter().filter(|item| !item.is_array()) {
                flatten(path, item, queries);
            }
        }
        scalar => queries.push(ContextQuery::new(path, scalar.clone())),
    }
}
