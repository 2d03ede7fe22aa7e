use crate::domain::value_objects::{Bound, Constraint, Unit};
use crate::error::Error;

/// Result of compiling one scope's textual constraint: a best-effort
/// partial tree plus every error encountered, so validation of the
/// well-formed parts can still proceed (§4.C, step 3).
#[derive(Debug, Clone, Default)]
pub struct CompileOutcome {
    pub constraint: Constraint,
    pub errors: Vec<Error>,
}

impl CompileOutcome {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Stateless parser/validator for the declarative constraint syntax.
/// One clause per comma-separated part; case-sensitive keywords.
pub struct ConstraintCompiler;

impl ConstraintCompiler {
    /// Parses and compiles the textual form of a single scope's
    /// constraint, converting every numeric value into `unit` via the
    /// unit algebra. Errors are collected, never returned on first
    /// failure.
    pub fn compile(unit: Unit, text: &str) -> CompileOutcome {
        let mut clauses = Vec::new();
        let mut errors = Vec::new();

        for raw_clause in text.split(',') {
            let raw_clause = raw_clause.trim();
            if raw_clause.is_empty() {
                continue;
            }
            match Self::parse_clause(unit, raw_clause) {
                Ok(bound) => clauses.push(bound),
                Err(e) => errors.push(e),
            }
        }

        match Constraint::reduce(&clauses) {
            Ok(constraint) => CompileOutcome { constraint, errors },
            Err(e) => {
                errors.push(e);
                // Best-effort partial tree: keep whichever bound survives
                // independently so a later validation pass can still use it.
                let minimum = clauses.iter().filter_map(|c| match c {
                    Bound::AtLeast(v) | Bound::Exactly(v) => Some(*v),
                    _ => None,
                }).max();
                let maximum = clauses.iter().filter_map(|c| match c {
                    Bound::AtMost(v) | Bound::Exactly(v) => Some(*v),
                    _ => None,
                }).min();
                CompileOutcome {
                    constraint: Constraint { minimum, maximum, expected: None },
                    errors,
                }
            }
        }
    }

    fn parse_clause(unit: Unit, clause: &str) -> Result<Bound, Error> {
        const PREFIXES: [(&str, fn(u64) -> Bound); 4] = [
            ("at least ", Bound::AtLeast as fn(u64) -> Bound),
            ("at most ", Bound::AtMost as fn(u64) -> Bound),
            ("exactly ", Bound::Exactly as fn(u64) -> Bound),
            ("should be ", Bound::Expected as fn(u64) -> Bound),
        ];

        for (prefix, ctor) in PREFIXES {
            if let Some(rest) = clause.strip_prefix(prefix) {
                let value = unit.parse(rest)?;
                return Ok(ctor(value));
            }
        }

        Err(Error::ConstraintSyntax(format!(
            "unrecognized clause: {clause:?}"
        )))
    }

    /// Cross-scope consistency check (§4.C): the sum of project minimums
    /// must not exceed the domain minimum. Maximum bounds are
    /// intentionally not cross-checked.
    pub fn check_domain_consistency(
        domain_constraint: &Constraint,
        project_constraints: &[Constraint],
    ) -> Result<(), Error> {
        let sum: u64 = project_constraints.iter().map(Constraint::min_or_zero).sum();
        let domain_min = domain_constraint.min_or_zero();
        if sum > domain_min {
            return Err(Error::ConstraintDomainOvercommitted { sum, domain_min });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_mixed_measured_constraint() {
        let outcome = ConstraintCompiler::compile(Unit::MiB, "at least 10 MiB, at most 1 GiB");
        assert!(outcome.is_ok());
        assert_eq!(outcome.constraint.minimum, Some(10));
        assert_eq!(outcome.constraint.maximum, Some(1024));
    }

    #[test]
    fn compiles_inverted_bound_to_clause_inconsistent() {
        let outcome = ConstraintCompiler::compile(Unit::None, "at least 4, at most 2");
        assert!(!outcome.is_ok());
        assert!(outcome
            .errors
            .iter()
            .any(|e| matches!(e, Error::ConstraintClauseInconsistent { min: 4, max: 2 })));
    }

    #[test]
    fn collects_all_clause_errors_not_just_the_first() {
        let outcome = ConstraintCompiler::compile(Unit::None, "banana, at least two");
        assert_eq!(outcome.errors.len(), 2);
    }

    #[test]
    fn expected_clause_is_observational_only() {
        let outcome = ConstraintCompiler::compile(Unit::None, "should be 5, at least 1");
        assert!(outcome.is_ok());
        assert_eq!(outcome.constraint.expected, Some(5));
        assert_eq!(outcome.constraint.minimum, Some(1));
    }

    #[test]
    fn domain_overcommit_detection() {
        // germany/berlin min=10, germany/dresden min=5, domain min=20 -> consistent
        let berlin = Constraint { minimum: Some(10), maximum: None, expected: None };
        let dresden = Constraint { minimum: Some(5), maximum: None, expected: None };
        let domain_ok = Constraint { minimum: Some(20), maximum: None, expected: None };
        assert!(ConstraintCompiler::check_domain_consistency(&domain_ok, &[berlin, dresden])
            .is_ok());

        let domain_overcommitted = Constraint { minimum: Some(10), maximum: None, expected: None };
        let err = ConstraintCompiler::check_domain_consistency(
            &domain_overcommitted,
            &[berlin, dresden],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::ConstraintDomainOvercommitted { sum: 15, domain_min: 10 }
        ));
    }
}
