//! Variable-dependency graph for resolution ordering.
//!
//! Resolving a variable commits to an instantiation from the bounds known
//! at that moment, so order matters: a variable must wait for everything
//! its bounds hinge on. The rules:
//!
//! - a capture variable on the left of a capture bound must be resolved
//!   before every other variable mentioned anywhere in that bound;
//! - otherwise, a variable depends on every non-capture variable its own
//!   bounds mention;
//! - every variable depends on itself;
//! - the relation is closed transitively.
//!
//! The graph is built fresh from the current bound set and never mutated
//! afterwards.

use crate::bound_set::BoundSet;
use crate::context::{FxIndexSet, InferenceContext};
use jinfer_types::InferVar;
use rustc_hash::FxHashMap;

/// The closed must-resolve-before relation.
pub struct Dependencies {
    map: FxHashMap<InferVar, FxIndexSet<InferVar>>,
}

impl Dependencies {
    /// Builds the dependency graph for the variables tracked by
    /// `bound_set`.
    pub fn build(ctx: &InferenceContext, bound_set: &BoundSet) -> Self {
        let vars = bound_set.variables();
        let mut map: FxHashMap<InferVar, FxIndexSet<InferVar>> = FxHashMap::default();
        for &v in vars {
            map.entry(v).or_default().insert(v);
        }

        // Capture rule: everything mentioned in a capture bound waits for
        // the bound's left-hand variables.
        for capture in bound_set.captures() {
            let lefts = capture.capture_vars();
            for beta in capture.mentioned_vars(ctx.types) {
                for &alpha in &lefts {
                    if beta != alpha {
                        map.entry(beta).or_default().insert(alpha);
                    }
                }
            }
        }

        // Bounds rule: a non-capture-left variable depends on the
        // non-capture variables its bounds mention.
        for &alpha in vars {
            if bound_set
                .captures()
                .iter()
                .any(|c| c.capture_vars().contains(&alpha))
            {
                continue;
            }
            for beta in ctx.var(alpha).bounds.vars_mentioned_in_bounds(ctx.types) {
                if !ctx.is_capture(beta) {
                    map.entry(alpha).or_default().insert(beta);
                }
            }
        }

        // Transitive closure.
        loop {
            let mut changed = false;
            let keys: Vec<InferVar> = map.keys().copied().collect();
            for &a in &keys {
                let deps: Vec<InferVar> = map[&a].iter().copied().collect();
                for b in deps {
                    if b == a {
                        continue;
                    }
                    let transitive: Vec<InferVar> = match map.get(&b) {
                        Some(set) => set.iter().copied().collect(),
                        None => continue,
                    };
                    let entry = map.entry(a).or_default();
                    for t in transitive {
                        changed |= entry.insert(t);
                    }
                }
            }
            if !changed {
                break;
            }
        }

        Self { map }
    }

    /// The variables `var` depends on (always includes `var` itself).
    pub fn get(&self, var: InferVar) -> FxIndexSet<InferVar> {
        self.map.get(&var).cloned().unwrap_or_else(|| {
            let mut set = FxIndexSet::default();
            set.insert(var);
            set
        })
    }
}

#[cfg(test)]
#[path = "../tests/dependencies_tests.rs"]
mod dependencies_tests;
