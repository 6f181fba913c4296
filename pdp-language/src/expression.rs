//! Compiled expressions and the attribute paths they reference.

use std::fmt;
use std::sync::Arc;

use cel_interpreter::{Context as Scope, Program};
use cel_parser::{Expression as Ast, Member};
use pdp_primitives::Context;

use crate::convert::{cel_to_json, json_to_cel};
use crate::error::{EvaluationError, LanguageError, LanguageResult};
use crate::value::coerce_to_bool;

/// Macros whose first argument names a variable bound in the rest.
const COMPREHENSIONS: [&str; 5] = ["all", "exists", "exists_one", "map", "filter"];

/// A reference to a context attribute, split into category and attribute
/// segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributePath {
    category: String,
    segments: Vec<String>,
}

impl AttributePath {
    /// Returns the context category (`subject`, `resource`, ...).
    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Returns the dotted path below the category (`role.name`).
    #[must_use]
    pub fn relative(&self) -> String {
        self.segments.join(".")
    }

    /// Returns the fully qualified dotted path (`subject.role.name`).
    #[must_use]
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.category, self.relative())
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified())
    }
}

/// A compiled expression, ready to be evaluated against any number of
/// contexts.
#[derive(Clone)]
pub struct Expression {
    source: String,
    program: Arc<Program>,
    paths: Vec<AttributePath>,
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("source", &self.source)
            .field("paths", &self.paths)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Expression {
    /// Parses `source`, collects the attribute paths it reads and compiles
    /// it into a program.
    ///
    /// # Errors
    ///
    /// Returns [`LanguageError::Parse`] for invalid CEL and
    /// [`LanguageError::InvalidPath`] when a category is used on its own
    /// instead of through one of its attributes.
    pub fn compile(source: &str) -> LanguageResult<Self> {
        let ast = cel_parser::parse(source).map_err(|error| LanguageError::parse(format!("{error:?}")))?;
        let mut paths = Vec::new();
        collect_paths(&ast, &mut Vec::new(), &mut paths)?;
        let program = Program::compile(source).map_err(|error| LanguageError::parse(format!("{error:?}")))?;
        Ok(Self {
            source: source.to_owned(),
            program: Arc::new(program),
            paths,
        })
    }

    /// Returns the source text the expression was compiled from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns every attribute path read, in order of appearance. Paths
    /// rooted at a comprehension variable or only tested with `has()` are
    /// not reported.
    #[must_use]
    pub fn attribute_paths(&self) -> &[AttributePath] {
        &self.paths
    }

    /// Evaluates the expression against already-resolved context values.
    ///
    /// `&&` and `||` follow CEL: a fault on one side is absorbed when the
    /// other side alone decides the result.
    ///
    /// # Errors
    ///
    /// Returns an [`EvaluationError`] when a referenced attribute is absent,
    /// the interpreter rejects an operation, or the result cannot be
    /// coerced to a boolean.
    pub fn evaluate(&self, context: &Context) -> Result<bool, EvaluationError> {
        let mut scope = Scope::default();
        for (category, value) in context.attributes() {
            // Adding an already-built value can not fail.
            let _ = scope.add_variable(category.clone(), json_to_cel(value));
        }

        let result = self
            .program
            .execute(&scope)
            .map_err(|error| self.fault(context, error.to_string()))?;
        let value = cel_to_json(&result);
        coerce_to_bool(&value).ok_or(EvaluationError::NonBoolean { value })
    }

    /// Names the first referenced attribute the context lacks, falling back
    /// to the interpreter's message.
    fn fault(&self, context: &Context, reason: String) -> EvaluationError {
        self.paths
            .iter()
            .map(AttributePath::qualified)
            .find(|path| context.attribute(path).is_none())
            .map_or(EvaluationError::Execution { reason }, |path| {
                EvaluationError::MissingAttribute { path }
            })
    }
}

fn collect_paths(node: &Ast, bound: &mut Vec<String>, paths: &mut Vec<AttributePath>) -> LanguageResult<()> {
    match node {
        Ast::Atom(_) => {}
        Ast::Ident(name) => {
            if !is_bound(bound, name) {
                return Err(LanguageError::InvalidPath {
                    path: name.to_string(),
                    reason: "a category must be followed by an attribute".into(),
                });
            }
        }
        Ast::Member(inner, member) => {
            if let Some((category, segments)) = member_chain(node) {
                if !is_bound(bound, category) {
                    paths.push(AttributePath {
                        category: category.to_owned(),
                        segments,
                    });
                }
                return Ok(());
            }
            collect_paths(inner, bound, paths)?;
            match member.as_ref() {
                Member::Attribute(_) => {}
                Member::Index(index) => collect_paths(index, bound, paths)?,
                Member::Fields(fields) => {
                    for (_, value) in fields {
                        collect_paths(value, bound, paths)?;
                    }
                }
            }
        }
        Ast::FunctionCall(function, target, args) => {
            let name = match function.as_ref() {
                Ast::Ident(name) => Some(name.as_str()),
                other => {
                    collect_paths(other, bound, paths)?;
                    None
                }
            };
            // `has()` tests presence, so its argument is not a requirement.
            if name == Some("has") {
                return Ok(());
            }
            if let Some(target) = target {
                collect_paths(target, bound, paths)?;
            }
            match args.split_first() {
                Some((Ast::Ident(variable), body)) if name.is_some_and(|name| COMPREHENSIONS.contains(&name)) => {
                    bound.push(variable.to_string());
                    let result = body.iter().try_for_each(|arg| collect_paths(arg, bound, paths));
                    bound.pop();
                    result?;
                }
                _ => {
                    for arg in args {
                        collect_paths(arg, bound, paths)?;
                    }
                }
            }
        }
        Ast::Unary(_, inner) => collect_paths(inner, bound, paths)?,
        Ast::Arithmetic(left, _, right)
        | Ast::Relation(left, _, right)
        | Ast::And(left, right)
        | Ast::Or(left, right) => {
            collect_paths(left, bound, paths)?;
            collect_paths(right, bound, paths)?;
        }
        Ast::Ternary(condition, then, otherwise) => {
            collect_paths(condition, bound, paths)?;
            collect_paths(then, bound, paths)?;
            collect_paths(otherwise, bound, paths)?;
        }
        Ast::List(items) => {
            for item in items {
                collect_paths(item, bound, paths)?;
            }
        }
        Ast::Map(entries) => {
            for (key, value) in entries {
                collect_paths(key, bound, paths)?;
                collect_paths(value, bound, paths)?;
            }
        }
    }
    Ok(())
}

/// Splits `a.b.c` into `("a", ["b", "c"])`. Returns `None` when the chain
/// contains anything but attribute access.
fn member_chain(node: &Ast) -> Option<(&str, Vec<String>)> {
    let mut segments = Vec::new();
    let mut current = node;
    loop {
        match current {
            Ast::Member(inner, member) => match member.as_ref() {
                Member::Attribute(name) => {
                    segments.push(name.to_string());
                    current = inner;
                }
                Member::Index(_) | Member::Fields(_) => return None,
            },
            Ast::Ident(root) => {
                segments.reverse();
                return Some((root.as_str(), segments));
            }
            _ => return None,
        }
    }
}

fn is_bound(bound: &[String], name: &str) -> bool {
    bound.iter().any(|variable| variable == name)
}
