use crate::error::{Error, Result};
use crate::schema::{to_external_name, Arguments};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// At most one member of the group may be present.
    MutuallyExclusive,
    /// Exactly one member must be present, unless the surrounding context
    /// supplies an implicit default member.
    ExactlyOneOf,
    /// Either all members are present or none of them are.
    RequiresTogether,
}

/// Declarative rule over a group of argument names. Members are internal
/// snake_case names and may be dotted paths into nested argument objects,
/// so a nested filter can be declared exclusive with a top-level argument.
#[derive(Debug, Clone)]
pub struct ArgumentConstraint {
    pub kind: ConstraintKind,
    pub members: &'static [&'static str],
    pub implicit_default: Option<&'static str>,
}

impl ArgumentConstraint {
    pub fn mutually_exclusive(members: &'static [&'static str]) -> Self {
        Self {
            kind: ConstraintKind::MutuallyExclusive,
            members,
            implicit_default: None,
        }
    }

    pub fn exactly_one_of(members: &'static [&'static str]) -> Self {
        Self {
            kind: ConstraintKind::ExactlyOneOf,
            members,
            implicit_default: None,
        }
    }

    /// Marks one member as supplied implicitly by the context (for example
    /// a parent-scoped default), so its absence does not fail the
    /// exactly-one rule.
    pub fn with_implicit_default(mut self, member: &'static str) -> Self {
        self.implicit_default = Some(member);
        self
    }

    pub fn requires_together(members: &'static [&'static str]) -> Self {
        Self {
            kind: ConstraintKind::RequiresTogether,
            members,
            implicit_default: None,
        }
    }
}

fn external_list(members: &[&str]) -> String {
    let names: Vec<String> = members.iter().map(|m| to_external_name(m)).collect();
    names.join(", ")
}

/// Evaluate every declared constraint against the coerced arguments.
/// Violations name the full declared group with external spellings, in one
/// error per rule rather than one per offending pair.
pub fn validate_constraints(constraints: &[ArgumentConstraint], args: &Arguments) -> Result<()> {
    for constraint in constraints {
        let present: Vec<&&str> = constraint
            .members
            .iter()
            .filter(|m| args.is_present(m))
            .collect();
        match constraint.kind {
            ConstraintKind::MutuallyExclusive => {
                if present.len() >= 2 {
                    return Err(only_one_of(constraint.members));
                }
            }
            ConstraintKind::ExactlyOneOf => {
                if present.len() > 1 {
                    return Err(only_one_of(constraint.members));
                }
                if present.is_empty() && constraint.implicit_default.is_none() {
                    return Err(Error::argument(format!(
                        "One and only one of [{}] arguments is required.",
                        external_list(constraint.members)
                    )));
                }
            }
            ConstraintKind::RequiresTogether => {
                if !present.is_empty() && present.len() != constraint.members.len() {
                    return Err(Error::argument(format!(
                        "[{}] arguments must be provided together.",
                        external_list(constraint.members)
                    )));
                }
            }
        }
    }
    Ok(())
}

fn only_one_of(members: &[&str]) -> Error {
    Error::argument(format!(
        "Only one of [{}] arguments is allowed at the same time.",
        external_list(members)
    ))
}

/// Range check for numeric arguments, reporting the external name.
pub fn check_int_range(args: &Arguments, name: &str, min: i64, max: i64) -> Result<()> {
    if let Some(value) = args.get_as::<i64>(name)? {
        if value < min || value > max {
            return Err(Error::argument(format!(
                "Argument '{}' must be between {} and {}",
                to_external_name(name),
                min,
                max
            )));
        }
    }
    Ok(())
}
