//! Backend-neutral predicates.
//!
//! A `Predicate` is the combinable representation of "keep records where
//! ..." produced by filter transmutation. Execution against a storage
//! backend belongs to an external collaborator; this crate only builds and
//! combines the trees.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Predicate {
    /// A single field comparison. `op` is a canonical lookup name
    /// (chain segments joined with `__`).
    Compare {
        field: String,
        op: String,
        value: Value,
    },
    And {
        children: Vec<Predicate>,
    },
    Or {
        children: Vec<Predicate>,
    },
    Not {
        child: Box<Predicate>,
    },
}

impl Predicate {
    pub fn compare(field: impl Into<String>, op: impl Into<String>, value: Value) -> Self {
        Predicate::Compare {
            field: field.into(),
            op: op.into(),
            value,
        }
    }

    pub fn negate(self) -> Self {
        Predicate::Not {
            child: Box::new(self),
        }
    }

    /// Conjunction of `children`: `None` when empty, the sole child when
    /// singular, `And` otherwise.
    pub fn all(children: Vec<Predicate>) -> Option<Predicate> {
        Self::combine(children, |children| Predicate::And { children })
    }

    /// Disjunction of `children`, with the same empty/singular collapsing
    /// as `all`.
    pub fn any(children: Vec<Predicate>) -> Option<Predicate> {
        Self::combine(children, |children| Predicate::Or { children })
    }

    fn combine(
        mut children: Vec<Predicate>,
        wrap: impl FnOnce(Vec<Predicate>) -> Predicate,
    ) -> Option<Predicate> {
        match children.len() {
            0 => None,
            1 => children.pop(),
            _ => Some(wrap(children)),
        }
    }
}
