use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Error, Result};
use crate::schema::Arguments;

pub const DEFAULT_COMPLEXITY: usize = 1;

/// Fixed extra cost charged when a given argument is present, e.g. a
/// free-text search forcing an expensive scan.
#[derive(Debug, Clone)]
pub struct Surcharge {
    pub argument: &'static str,
    pub cost: usize,
}

/// Static cost descriptor for one field, evaluated before execution.
///
/// The score is deterministic and monotonically non-decreasing in
/// `max_page_size` for fixed arguments: the size factor only ever grows
/// with the page bound.
#[derive(Debug, Clone)]
pub struct FieldComplexity {
    pub base: usize,
    pub connection: bool,
    pub surcharges: Vec<Surcharge>,
    /// Arguments that bound the result to a single row (id/iid style).
    /// When present, the connection size multiplier does not apply.
    pub unique_filters: Vec<&'static str>,
}

impl Default for FieldComplexity {
    fn default() -> Self {
        Self {
            base: DEFAULT_COMPLEXITY,
            connection: false,
            surcharges: Vec::new(),
            unique_filters: Vec::new(),
        }
    }
}

impl FieldComplexity {
    pub fn new(base: usize) -> Self {
        Self {
            base,
            ..Self::default()
        }
    }

    pub fn connection(mut self) -> Self {
        self.connection = true;
        self
    }

    pub fn surcharge(mut self, argument: &'static str, cost: usize) -> Self {
        self.surcharges.push(Surcharge { argument, cost });
        self
    }

    pub fn unique_filter(mut self, argument: &'static str) -> Self {
        self.unique_filters.push(argument);
        self
    }

    pub fn calculate(
        &self,
        args: &Arguments,
        child_complexity: usize,
        max_page_size: u32,
    ) -> usize {
        let mut cost = self.base;
        for surcharge in &self.surcharges {
            if args.is_present(surcharge.argument) {
                cost += surcharge.cost;
            }
        }
        let factor = if !self.connection {
            1
        } else if self.unique_filters.iter().any(|f| args.is_present(f)) {
            1
        } else {
            page_size_factor(args, max_page_size)
        };
        cost + child_complexity * factor
    }
}

/// Expected number of items: the smaller of the requested page size and the
/// field bound, never below one.
fn page_size_factor(args: &Arguments, max_page_size: u32) -> usize {
    let requested = args
        .get_as::<i64>("first")
        .ok()
        .flatten()
        .or_else(|| args.get_as::<i64>("last").ok().flatten())
        .filter(|n| *n >= 0)
        .map(|n| n as u32);
    let size = match requested {
        Some(n) => n.min(max_page_size),
        None => max_page_size,
    };
    size.max(1) as usize
}

/// Request-scoped running total with an optional admission budget.
#[derive(Debug)]
pub struct ComplexityAccumulator {
    total: AtomicUsize,
    budget: Option<usize>,
}

impl ComplexityAccumulator {
    pub fn unbounded() -> Self {
        Self {
            total: AtomicUsize::new(0),
            budget: None,
        }
    }

    pub fn with_budget(budget: usize) -> Self {
        Self {
            total: AtomicUsize::new(0),
            budget: Some(budget),
        }
    }

    /// Record one field's score. Exceeding the budget rejects the request
    /// outright before execution; nothing is metered at runtime.
    pub fn add(&self, score: usize) -> Result<()> {
        let total = self.total.fetch_add(score, Ordering::SeqCst) + score;
        match self.budget {
            Some(limit) if total > limit => Err(Error::TooComplex { cost: total, limit }),
            _ => Ok(()),
        }
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql_value::ConstValue;

    fn args(pairs: &[(&str, ConstValue)]) -> Arguments {
        let mut out = Arguments::default();
        for (name, value) in pairs {
            out.insert(name, value.clone());
        }
        out
    }

    fn issues_complexity() -> FieldComplexity {
        FieldComplexity::new(4)
            .connection()
            .surcharge("search", 4)
            .unique_filter("iid")
    }

    #[test]
    fn test_base_cost_without_arguments() {
        assert_eq!(issues_complexity().calculate(&args(&[]), 0, 100), 4);
    }

    #[test]
    fn test_search_adds_a_fixed_surcharge() {
        let with_search = args(&[("search", ConstValue::String("foo".into()))]);
        assert_eq!(issues_complexity().calculate(&with_search, 0, 100), 8);
    }

    #[test]
    fn test_child_complexity_scales_with_page_size() {
        let spec = issues_complexity();
        let empty = args(&[]);
        assert_eq!(spec.calculate(&empty, 1, 100), 104);
        assert_eq!(spec.calculate(&empty, 1, 1), 5);
        assert!(spec.calculate(&empty, 1, 100) >= spec.calculate(&empty, 1, 1));
    }

    #[test]
    fn test_first_bounds_the_size_factor() {
        let spec = issues_complexity();
        let first_ten = args(&[("first", ConstValue::Number(10.into()))]);
        assert_eq!(spec.calculate(&first_ten, 2, 100), 4 + 2 * 10);
        // A first larger than the page bound cannot raise the factor.
        let first_big = args(&[("first", ConstValue::Number(1000.into()))]);
        assert_eq!(spec.calculate(&first_big, 2, 100), 4 + 2 * 100);
    }

    #[test]
    fn test_unique_filter_removes_the_multiplier() {
        let spec = issues_complexity();
        let by_iid = args(&[("iid", ConstValue::String("7".into()))]);
        let unfiltered = args(&[]);
        let filtered_cost = spec.calculate(&by_iid, 1, 100);
        assert_eq!(filtered_cost, 5);
        assert!(filtered_cost < spec.calculate(&unfiltered, 1, 100));
    }

    #[test]
    fn test_non_connection_fields_ignore_page_size() {
        let spec = FieldComplexity::new(2);
        assert_eq!(spec.calculate(&args(&[]), 3, 100), 5);
        assert_eq!(spec.calculate(&args(&[]), 3, 1), 5);
    }

    #[test]
    fn test_accumulator_budget_rejects_before_execution() {
        let acc = ComplexityAccumulator::with_budget(10);
        acc.add(6).unwrap();
        let err = acc.add(6).unwrap_err();
        match err {
            Error::TooComplex { cost, limit } => {
                assert_eq!(cost, 12);
                assert_eq!(limit, 10);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unbounded_accumulator_only_counts() {
        let acc = ComplexityAccumulator::unbounded();
        acc.add(1000).unwrap();
        acc.add(1000).unwrap();
        assert_eq!(acc.total(), 2000);
    }
}
