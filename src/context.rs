use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_graphql_value::ConstValue;
use tokio::time::Instant;

use crate::batch::BatchCoordinator;
use crate::complexity::ComplexityAccumulator;
use crate::error::{Error, Result};
use crate::schema::{Arguments, FieldDef};

/// The authenticated (or anonymous) caller. Read-only for the lifetime of
/// the request.
#[derive(Debug, Clone, Default)]
pub struct Principal {
    pub id: Option<String>,
    pub admin: bool,
}

impl Principal {
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            admin: false,
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

/// Authorization collaborator. Policy internals live elsewhere; resolvers
/// only ever ask "may this principal perform this action on this subject".
pub trait AuthorizationGate: Send + Sync {
    fn can_access(&self, principal: &Principal, action: &str, subject: &ConstValue) -> bool;
}

/// Default gate that permits everything.
pub struct AllowAll;

impl AuthorizationGate for AllowAll {
    fn can_access(&self, _principal: &Principal, _action: &str, _subject: &ConstValue) -> bool {
        true
    }
}

/// Mutable state scoped to exactly one request: the batch coordinator, the
/// complexity accumulator, the deadline, and the enabled feature toggles.
/// Never shared across concurrent requests.
pub struct RequestContext {
    principal: Principal,
    gate: Arc<dyn AuthorizationGate>,
    batch: BatchCoordinator,
    complexity: ComplexityAccumulator,
    deadline: Option<Instant>,
    features: HashSet<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            principal: Principal::anonymous(),
            gate: Arc::new(AllowAll),
            batch: BatchCoordinator::new(),
            complexity: ComplexityAccumulator::unbounded(),
            deadline: None,
            features: HashSet::new(),
        }
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = principal;
        self
    }

    pub fn with_gate(mut self, gate: Arc<dyn AuthorizationGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_complexity_budget(mut self, budget: usize) -> Self {
        self.complexity = ComplexityAccumulator::with_budget(budget);
        self
    }

    pub fn with_deadline(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.features.insert(feature.into());
        self
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn batch(&self) -> &BatchCoordinator {
        &self.batch
    }

    pub fn complexity(&self) -> &ComplexityAccumulator {
        &self.complexity
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn features(&self) -> &HashSet<String> {
        &self.features
    }

    pub fn feature_enabled(&self, feature: &str) -> bool {
        self.features.contains(feature)
    }

    pub fn can_access(&self, action: &str, subject: &ConstValue) -> bool {
        self.gate.can_access(&self.principal, action, subject)
    }

    /// Singular lookup helper: yields the subject when it exists and is
    /// visible, and the same `ResourceNotAvailable` error otherwise, so a
    /// missing record and a forbidden one are observably identical.
    pub fn authorized_or_not_found(
        &self,
        action: &str,
        subject: Option<&ConstValue>,
    ) -> Result<ConstValue> {
        match subject {
            Some(s) if self.can_access(action, s) => Ok(s.clone()),
            _ => Err(Error::ResourceNotAvailable),
        }
    }

    /// Collection helper: invisible items are dropped, never errored.
    pub fn filter_authorized(&self, action: &str, items: Vec<ConstValue>) -> Vec<ConstValue> {
        items
            .into_iter()
            .filter(|item| self.can_access(action, item))
            .collect()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// One field invocation: the parent object, coerced arguments, the request
/// context, and the field's static metadata. Discarded once the field
/// resolves.
pub struct FieldResolution<'a> {
    pub parent: Option<&'a ConstValue>,
    pub args: Arguments,
    pub ctx: &'a RequestContext,
    pub field: &'a FieldDef,
}

impl<'a> FieldResolution<'a> {
    pub fn parent_field(&self, name: &str) -> Option<&ConstValue> {
        match self.parent? {
            ConstValue::Object(obj) => obj.get(name),
            _ => None,
        }
    }
}

/// Typed view over a client-supplied value; consumed by
/// `Arguments::get_as`. The error string is folded into an
/// `ArgumentError` naming the external argument.
pub trait FromConstValue: Sized {
    fn from_const_value(value: &ConstValue) -> std::result::Result<Self, String>;
}

impl FromConstValue for i32 {
    fn from_const_value(value: &ConstValue) -> std::result::Result<Self, String> {
        match value {
            ConstValue::Number(n) => n
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .ok_or_else(|| "Expected i32".to_string()),
            _ => Err("Expected number".to_string()),
        }
    }
}

impl FromConstValue for i64 {
    fn from_const_value(value: &ConstValue) -> std::result::Result<Self, String> {
        match value {
            ConstValue::Number(n) => n.as_i64().ok_or_else(|| "Expected i64".to_string()),
            _ => Err("Expected number".to_string()),
        }
    }
}

impl FromConstValue for f64 {
    fn from_const_value(value: &ConstValue) -> std::result::Result<Self, String> {
        match value {
            ConstValue::Number(n) => n.as_f64().ok_or_else(|| "Expected f64".to_string()),
            _ => Err("Expected number".to_string()),
        }
    }
}

impl FromConstValue for bool {
    fn from_const_value(value: &ConstValue) -> std::result::Result<Self, String> {
        match value {
            ConstValue::Boolean(b) => Ok(*b),
            _ => Err("Expected boolean".to_string()),
        }
    }
}

impl FromConstValue for String {
    fn from_const_value(value: &ConstValue) -> std::result::Result<Self, String> {
        match value {
            ConstValue::String(s) => Ok(s.clone()),
            ConstValue::Enum(name) => Ok(name.to_string()),
            _ => Err("Expected string".to_string()),
        }
    }
}

impl<T: FromConstValue> FromConstValue for Option<T> {
    fn from_const_value(value: &ConstValue) -> std::result::Result<Self, String> {
        match value {
            ConstValue::Null => Ok(None),
            v => T::from_const_value(v).map(Some),
        }
    }
}

impl<T: FromConstValue> FromConstValue for Vec<T> {
    fn from_const_value(value: &ConstValue) -> std::result::Result<Self, String> {
        match value {
            ConstValue::List(items) => items.iter().map(T::from_const_value).collect(),
            _ => Err("Expected list".to_string()),
        }
    }
}
