pub mod cursor;
pub mod external;
pub mod keyset;
pub mod offset;

use async_graphql_value::{ConstValue, Name};
use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::schema::{Arguments, FieldDef, PageSizePolicy};

pub use external::{ExternalPage, ExternalPageRequest, TraversalDirection};
pub use keyset::{KeysetOrder, OrderDirection, SortColumn};

/// Metadata about the current page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

/// One item of a page. Externally paginated sources issue page-level tokens
/// only, so the per-item cursor is optional.
#[derive(Debug, Clone)]
pub struct Edge<T> {
    pub node: T,
    pub cursor: Option<String>,
}

/// A windowed, cursor-bearing view over an ordered collection. Immutable
/// once constructed; never holds more than the effective page limit.
#[derive(Debug, Clone)]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
    pub page_info: PageInfo,
}

impl<T> Connection<T> {
    pub fn empty() -> Self {
        Self {
            edges: Vec::new(),
            page_info: PageInfo::default(),
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.edges.iter().map(|e| &e.node)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

impl Connection<ConstValue> {
    /// Render the connection as a plain value object:
    /// `{nodes, pageInfo{hasNextPage, hasPreviousPage, startCursor, endCursor}}`.
    pub fn into_value(self) -> ConstValue {
        let nodes: Vec<ConstValue> = self.edges.into_iter().map(|e| e.node).collect();
        let mut page_info = IndexMap::new();
        page_info.insert(
            Name::new("hasNextPage"),
            ConstValue::Boolean(self.page_info.has_next_page),
        );
        page_info.insert(
            Name::new("hasPreviousPage"),
            ConstValue::Boolean(self.page_info.has_previous_page),
        );
        page_info.insert(
            Name::new("startCursor"),
            match self.page_info.start_cursor {
                Some(c) => ConstValue::String(c),
                None => ConstValue::Null,
            },
        );
        page_info.insert(
            Name::new("endCursor"),
            match self.page_info.end_cursor {
                Some(c) => ConstValue::String(c),
                None => ConstValue::Null,
            },
        );
        let mut out = IndexMap::new();
        out.insert(Name::new("nodes"), ConstValue::List(nodes));
        out.insert(Name::new("pageInfo"), ConstValue::Object(page_info));
        ConstValue::Object(out)
    }
}

/// Parsed pagination arguments. `first`/`after` drive forward traversal,
/// `last`/`before` the mirrored backward traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationArgs {
    pub first: Option<u32>,
    pub after: Option<String>,
    pub last: Option<u32>,
    pub before: Option<String>,
}

impl PaginationArgs {
    pub fn forward(first: u32) -> Self {
        Self {
            first: Some(first),
            ..Self::default()
        }
    }

    pub fn forward_after(first: u32, after: impl Into<String>) -> Self {
        Self {
            first: Some(first),
            after: Some(after.into()),
            ..Self::default()
        }
    }

    pub fn backward(last: u32) -> Self {
        Self {
            last: Some(last),
            ..Self::default()
        }
    }

    pub fn backward_before(last: u32, before: impl Into<String>) -> Self {
        Self {
            last: Some(last),
            before: Some(before.into()),
            ..Self::default()
        }
    }

    pub fn from_arguments(args: &Arguments) -> Result<Self> {
        let first = read_page_size(args, "first")?;
        let last = read_page_size(args, "last")?;
        if first.is_some() && last.is_some() {
            return Err(Error::argument(
                "Passing both `first` and `last` to paginate is not supported",
            ));
        }
        Ok(Self {
            first,
            after: args.get_as::<String>("after")?,
            last,
            before: args.get_as::<String>("before")?,
        })
    }

    pub fn is_backward(&self) -> bool {
        self.last.is_some() || (self.first.is_none() && self.before.is_some())
    }

    /// The effective page size for this request, honoring the field's
    /// `max_page_size` and its clamp-or-reject policy.
    pub fn limit(&self, field: &FieldDef) -> Result<u32> {
        match self.first.or(self.last) {
            Some(n) if n > field.max_page_size => match field.page_size_policy {
                PageSizePolicy::Clamp => Ok(field.max_page_size),
                PageSizePolicy::Reject => Err(Error::argument(format!(
                    "Requested page size {} exceeds the maximum of {}",
                    n, field.max_page_size
                ))),
            },
            Some(n) => Ok(n),
            None => Ok(field.max_page_size),
        }
    }
}

fn read_page_size(args: &Arguments, name: &str) -> Result<Option<u32>> {
    match args.get_as::<i64>(name)? {
        // A zero-size page would carry no cursor to continue from.
        Some(n) if n <= 0 => Err(Error::argument(format!(
            "Argument '{name}' must be greater than zero"
        ))),
        Some(n) => Ok(Some(n.min(u32::MAX as i64) as u32)),
        None => Ok(None),
    }
}

/// One of a resolver's sort options. Orders that reduce to a monotonic,
/// tie-broken key tuple paginate by keyset; computed rankings (popularity,
/// priority, ...) fall back to offset pagination.
#[derive(Debug, Clone)]
pub struct SortOption {
    pub name: &'static str,
    order: Option<KeysetOrder>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationStrategy {
    Keyset,
    Offset,
}

impl SortOption {
    pub fn keyset(name: &'static str, order: KeysetOrder) -> Self {
        Self {
            name,
            order: Some(order),
        }
    }

    pub fn offset(name: &'static str) -> Self {
        Self { name, order: None }
    }

    pub fn strategy(&self) -> PaginationStrategy {
        if self.order.is_some() {
            PaginationStrategy::Keyset
        } else {
            PaginationStrategy::Offset
        }
    }
}

/// Paginate a raw collection under the given sort option, selecting keyset
/// or offset automatically. Offset input is expected to arrive already
/// ordered by the finder; keyset input is (re)sorted by the declared order.
pub fn paginate_sorted(
    items: Vec<ConstValue>,
    sort: &SortOption,
    args: &PaginationArgs,
    field: &FieldDef,
) -> Result<Connection<ConstValue>> {
    match &sort.order {
        Some(order) => keyset::paginate(items, order, args, field),
        None => offset::paginate(items, args, field),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDef;

    #[test]
    fn test_limit_defaults_to_max_page_size() {
        let field = FieldDef::new("issues").connection(100);
        assert_eq!(PaginationArgs::default().limit(&field).unwrap(), 100);
    }

    #[test]
    fn test_limit_clamps_by_default() {
        let field = FieldDef::new("issues").connection(50);
        assert_eq!(PaginationArgs::forward(500).limit(&field).unwrap(), 50);
    }

    #[test]
    fn test_limit_reject_policy() {
        let field = FieldDef::new("issues")
            .connection(50)
            .page_size_policy(PageSizePolicy::Reject);
        let err = PaginationArgs::forward(51).limit(&field).unwrap_err();
        assert_eq!(err.error_class(), "ArgumentError");
        assert_eq!(PaginationArgs::forward(50).limit(&field).unwrap(), 50);
    }

    #[test]
    fn test_from_arguments_rejects_first_and_last_together() {
        let mut args = Arguments::default();
        args.insert("first", ConstValue::Number(5.into()));
        args.insert("last", ConstValue::Number(5.into()));
        let err = PaginationArgs::from_arguments(&args).unwrap_err();
        assert!(err.to_string().contains("first"), "{err}");
    }

    #[test]
    fn test_from_arguments_rejects_non_positive_sizes() {
        for bad in [-1i64, 0] {
            let mut args = Arguments::default();
            args.insert("first", ConstValue::Number(bad.into()));
            let err = PaginationArgs::from_arguments(&args).unwrap_err();
            assert_eq!(err.error_class(), "ArgumentError", "first = {bad}");
        }
    }

    #[test]
    fn test_strategy_selection_per_sort() {
        let keyset = SortOption::keyset(
            "created_asc",
            KeysetOrder::by(SortColumn::asc("created_at"), "id"),
        );
        let offset = SortOption::offset("popularity");
        assert_eq!(keyset.strategy(), PaginationStrategy::Keyset);
        assert_eq!(offset.strategy(), PaginationStrategy::Offset);
    }

    #[test]
    fn test_connection_into_value_shape() {
        let conn = Connection {
            edges: vec![Edge {
                node: ConstValue::Number(1.into()),
                cursor: Some("abc".into()),
            }],
            page_info: PageInfo {
                has_next_page: true,
                has_previous_page: false,
                start_cursor: Some("abc".into()),
                end_cursor: Some("abc".into()),
            },
        };
        let value = conn.into_value();
        let ConstValue::Object(obj) = value else {
            panic!("expected object");
        };
        assert!(matches!(obj.get("nodes"), Some(ConstValue::List(items)) if items.len() == 1));
        let ConstValue::Object(info) = obj.get("pageInfo").unwrap() else {
            panic!("expected pageInfo object");
        };
        assert_eq!(info.get("hasNextPage"), Some(&ConstValue::Boolean(true)));
        assert_eq!(info.get("endCursor"), Some(&ConstValue::String("abc".into())));
    }
}
