//! Three-level Target/Condition walker.

use pdp_language::Language;
use pdp_primitives::Context;
use tracing::debug;

use crate::cache::CompiledGate;

/// Result of walking a Target or Condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Every expression held.
    Match,
    /// An expression evaluated to false.
    NoMatch,
    /// The gate could not be decided: compile error, evaluation fault or a
    /// non-boolean result.
    Indeterminate,
}

/// Walks the gate left to right. Every level, `AnyOf` included, is a
/// conjunction that stops at the first child that does not match and
/// propagates that child's outcome. An empty level matches.
pub(crate) fn walk(
    language: &dyn Language,
    gate: &CompiledGate,
    context: &Context,
    verbose: bool,
) -> GateOutcome {
    let program = match gate.program() {
        Ok(program) => program,
        Err(error) => {
            if verbose {
                debug!(%error, "gate failed to compile");
            }
            return GateOutcome::Indeterminate;
        }
    };

    conjoin(program, |any_of| {
        conjoin(any_of, |all_of| {
            conjoin(all_of, |expression| {
                match language.evaluate_expression(expression, context) {
                    Ok(true) => GateOutcome::Match,
                    Ok(false) => GateOutcome::NoMatch,
                    Err(error) => {
                        if verbose {
                            debug!(%error, expression = %expression, "expression fault");
                        }
                        GateOutcome::Indeterminate
                    }
                }
            })
        })
    })
}

fn conjoin<T>(children: &[T], mut evaluate: impl FnMut(&T) -> GateOutcome) -> GateOutcome {
    for child in children {
        let outcome = evaluate(child);
        if outcome != GateOutcome::Match {
            return outcome;
        }
    }
    GateOutcome::Match
}
