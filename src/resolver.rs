use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use async_graphql_value::ConstValue;
use async_trait::async_trait;

use crate::complexity::FieldComplexity;
use crate::connection::Connection;
use crate::context::FieldResolution;
use crate::error::Result;
use crate::lazy::LazyValue;
use crate::schema::Arguments;
use crate::validate::{validate_constraints, ArgumentConstraint};

/// What a resolver hands back: a concrete value, a deferred value from the
/// batch coordinator, or a paginated wrapper.
#[derive(Debug)]
pub enum Resolved {
    Value(ConstValue),
    Lazy(LazyValue),
    Connection(Connection<ConstValue>),
}

impl Resolved {
    /// Collapse to a plain value, suspending on a lazy result until its
    /// wave flushes and rendering connections into their object shape.
    pub async fn into_value(self) -> Result<ConstValue> {
        match self {
            Resolved::Value(value) => Ok(value),
            Resolved::Lazy(lazy) => lazy.wait().await,
            Resolved::Connection(conn) => Ok(conn.into_value()),
        }
    }
}

/// How to produce one field's value.
///
/// `validate` runs before any data access; the default evaluates the
/// declared constraints. `complexity` is consulted during admission, before
/// `resolve` is ever called.
#[async_trait]
pub trait Resolver: Send + Sync {
    fn constraints(&self) -> &[ArgumentConstraint] {
        &[]
    }

    fn validate(&self, args: &Arguments) -> Result<()> {
        validate_constraints(self.constraints(), args)
    }

    fn complexity_spec(&self) -> FieldComplexity {
        FieldComplexity::default()
    }

    fn complexity(&self, args: &Arguments, child_complexity: usize, max_page_size: u32) -> usize {
        self.complexity_spec()
            .calculate(args, child_complexity, max_page_size)
    }

    async fn resolve(&self, resolution: &FieldResolution<'_>) -> Result<Resolved>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterKind {
    Single,
    Last,
}

/// Derived resolver returning only the first or last element of the base
/// resolver's collection, with an effective page size of one.
struct ItemAdapter {
    base: Arc<dyn Resolver>,
    kind: AdapterKind,
}

impl ItemAdapter {
    fn pick(&self, items: Vec<ConstValue>) -> ConstValue {
        let picked = match self.kind {
            AdapterKind::Single => items.into_iter().next(),
            AdapterKind::Last => items.into_iter().next_back(),
        };
        picked.unwrap_or(ConstValue::Null)
    }
}

#[async_trait]
impl Resolver for ItemAdapter {
    fn constraints(&self) -> &[ArgumentConstraint] {
        self.base.constraints()
    }

    fn validate(&self, args: &Arguments) -> Result<()> {
        self.base.validate(args)
    }

    fn complexity(&self, args: &Arguments, child_complexity: usize, _max_page_size: u32) -> usize {
        // The result is at most one item; the base's page bound is moot.
        self.base.complexity(args, child_complexity, 1)
    }

    async fn resolve(&self, resolution: &FieldResolution<'_>) -> Result<Resolved> {
        let value = match self.base.resolve(resolution).await? {
            Resolved::Connection(conn) => {
                self.pick(conn.edges.into_iter().map(|e| e.node).collect())
            }
            Resolved::Value(ConstValue::List(items)) => self.pick(items),
            Resolved::Value(value) => value,
            Resolved::Lazy(lazy) => match lazy.wait().await? {
                ConstValue::List(items) => self.pick(items),
                value => value,
            },
        };
        Ok(Resolved::Value(value))
    }
}

type AdapterMap = HashMap<(usize, AdapterKind), Arc<dyn Resolver>>;

static ADAPTERS: OnceLock<Mutex<AdapterMap>> = OnceLock::new();

/// Derived resolver returning the first element of `base`'s collection.
/// Memoized: repeated requests for the same base yield the identical
/// instance, not a fresh wrapper.
pub fn single(base: &Arc<dyn Resolver>) -> Arc<dyn Resolver> {
    adapter(base, AdapterKind::Single)
}

/// Derived resolver returning the last element of `base`'s collection.
pub fn last(base: &Arc<dyn Resolver>) -> Arc<dyn Resolver> {
    adapter(base, AdapterKind::Last)
}

fn adapter(base: &Arc<dyn Resolver>, kind: AdapterKind) -> Arc<dyn Resolver> {
    let key = (Arc::as_ptr(base) as *const () as usize, kind);
    let adapters = ADAPTERS.get_or_init(|| Mutex::new(HashMap::new()));
    let mut adapters = adapters.lock().unwrap();
    adapters
        .entry(key)
        .or_insert_with(|| {
            Arc::new(ItemAdapter {
                base: base.clone(),
                kind,
            })
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;
    use crate::schema::FieldDef;

    struct Numbers;

    #[async_trait]
    impl Resolver for Numbers {
        fn complexity_spec(&self) -> FieldComplexity {
            FieldComplexity::new(2).connection()
        }

        async fn resolve(&self, _resolution: &FieldResolution<'_>) -> Result<Resolved> {
            Ok(Resolved::Value(ConstValue::List(vec![
                ConstValue::Number(1.into()),
                ConstValue::Number(2.into()),
                ConstValue::Number(3.into()),
            ])))
        }
    }

    fn resolution<'a>(ctx: &'a RequestContext, field: &'a FieldDef) -> FieldResolution<'a> {
        FieldResolution {
            parent: None,
            args: Arguments::default(),
            ctx,
            field,
        }
    }

    #[tokio::test]
    async fn test_single_takes_the_first_element() {
        let base: Arc<dyn Resolver> = Arc::new(Numbers);
        let ctx = RequestContext::new();
        let field = FieldDef::new("numbers");
        let value = single(&base)
            .resolve(&resolution(&ctx, &field))
            .await
            .unwrap()
            .into_value()
            .await
            .unwrap();
        assert_eq!(value, ConstValue::Number(1.into()));
    }

    #[tokio::test]
    async fn test_last_takes_the_last_element() {
        let base: Arc<dyn Resolver> = Arc::new(Numbers);
        let ctx = RequestContext::new();
        let field = FieldDef::new("numbers");
        let value = last(&base)
            .resolve(&resolution(&ctx, &field))
            .await
            .unwrap()
            .into_value()
            .await
            .unwrap();
        assert_eq!(value, ConstValue::Number(3.into()));
    }

    #[test]
    fn test_adapters_are_memoized_per_base_and_kind() {
        let base: Arc<dyn Resolver> = Arc::new(Numbers);
        let first_a = single(&base);
        let first_b = single(&base);
        let last_one = last(&base);
        assert!(Arc::ptr_eq(&first_a, &first_b));
        assert!(!Arc::ptr_eq(&first_a, &last_one));

        let other: Arc<dyn Resolver> = Arc::new(Numbers);
        assert!(!Arc::ptr_eq(&single(&other), &first_a));
    }

    #[test]
    fn test_adapter_complexity_is_bounded_to_one_item() {
        let base: Arc<dyn Resolver> = Arc::new(Numbers);
        let args = Arguments::default();
        // base: 2 + child * factor; adapter pins the factor to one item.
        assert_eq!(base.complexity(&args, 3, 100), 2 + 3 * 100);
        assert_eq!(single(&base).complexity(&args, 3, 100), 2 + 3);
    }
}
