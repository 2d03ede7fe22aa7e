use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single parsed clause from the textual constraint syntax, before
/// clauses for the same (scope, service, resource) are reduced into one
/// [`Constraint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    AtLeast(u64),
    AtMost(u64),
    Exactly(u64),
    /// The deprecated `Expected` clause. Kept only so it can be rendered
    /// back in diagnostics; never enforced (see design notes).
    Expected(u64),
}

/// A compiled (minimum, maximum) bound on a resource's quota within a
/// scope, already expressed in the resource's native unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub minimum: Option<u64>,
    pub maximum: Option<u64>,
    /// Observational only; see design notes open question 1.
    pub expected: Option<u64>,
}

impl Constraint {
    /// Reduces a list of parsed clauses into one constraint. Multiple
    /// `at least` clauses combine by maximum, multiple `at most` by
    /// minimum; `exactly` contributes to both sides.
    pub fn reduce(clauses: &[Bound]) -> Result<Constraint> {
        let mut minimum: Option<u64> = None;
        let mut maximum: Option<u64> = None;
        let mut expected: Option<u64> = None;

        for clause in clauses {
            match *clause {
                Bound::AtLeast(v) => minimum = Some(minimum.map_or(v, |m| m.max(v))),
                Bound::AtMost(v) => maximum = Some(maximum.map_or(v, |m| m.min(v))),
                Bound::Exactly(v) => {
                    minimum = Some(minimum.map_or(v, |m| m.max(v)));
                    maximum = Some(maximum.map_or(v, |m| m.min(v)));
                }
                Bound::Expected(v) => expected = Some(v),
            }
        }

        if let (Some(min), Some(max)) = (minimum, maximum) {
            if max < min {
                return Err(Error::ConstraintClauseInconsistent { min, max });
            }
        }

        Ok(Constraint { minimum, maximum, expected })
    }

    /// `min_or_zero`, used by the cross-scope sum check (§4.C).
    pub fn min_or_zero(&self) -> u64 {
        self.minimum.unwrap_or(0)
    }

    /// Clamps `v` into `[minimum, maximum]`, with unset bounds meaning
    /// unbounded on that side.
    pub fn apply(&self, v: u64) -> u64 {
        let v = match self.minimum {
            Some(min) if v < min => min,
            _ => v,
        };
        match self.maximum {
            Some(max) if v > max => max,
            _ => v,
        }
    }

    /// `true` iff `v` already lies within the bound.
    pub fn allows(&self, v: u64) -> bool {
        self.minimum.map_or(true, |min| v >= min) && self.maximum.map_or(true, |max| v <= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduce_combines_at_least_by_max_and_at_most_by_min() {
        let c = Constraint::reduce(&[
            Bound::AtLeast(10),
            Bound::AtLeast(5),
            Bound::AtMost(30),
            Bound::AtMost(20),
        ])
        .unwrap();
        assert_eq!(c.minimum, Some(10));
        assert_eq!(c.maximum, Some(20));
    }

    #[test]
    fn reduce_exactly_pins_both_bounds() {
        let c = Constraint::reduce(&[Bound::Exactly(7)]).unwrap();
        assert_eq!(c.minimum, Some(7));
        assert_eq!(c.maximum, Some(7));
    }

    #[test]
    fn reduce_rejects_inverted_bounds() {
        let err = Constraint::reduce(&[Bound::AtLeast(4), Bound::AtMost(2)]).unwrap_err();
        assert!(matches!(err, Error::ConstraintClauseInconsistent { min: 4, max: 2 }));
    }

    #[test]
    fn apply_is_idempotent() {
        let c = Constraint { minimum: Some(10), maximum: Some(20), expected: None };
        for v in [0, 5, 10, 15, 20, 25] {
            let once = c.apply(v);
            assert_eq!(c.apply(once), once);
        }
    }

    #[test]
    fn apply_is_monotonic() {
        let c = Constraint { minimum: Some(10), maximum: Some(20), expected: None };
        let values = [0u64, 5, 10, 15, 20, 25, 30];
        for w in values.windows(2) {
            assert!(c.apply(w[0]) <= c.apply(w[1]));
        }
    }

    #[test]
    fn allows_respects_unbounded_sides() {
        let c = Constraint { minimum: Some(10), maximum: None, expected: None };
        assert!(!c.allows(5));
        assert!(c.allows(10));
        assert!(c.allows(1_000_000));
    }
}
