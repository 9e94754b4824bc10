use std::cmp::Ordering;

use async_graphql_value::ConstValue;

use super::{cursor, Connection, Edge, PageInfo, PaginationArgs};
use crate::error::{Error, Result};
use crate::schema::FieldDef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortColumn {
    pub name: &'static str,
    pub direction: OrderDirection,
}

impl SortColumn {
    pub fn asc(name: &'static str) -> Self {
        Self {
            name,
            direction: OrderDirection::Asc,
        }
    }

    pub fn desc(name: &'static str) -> Self {
        Self {
            name,
            direction: OrderDirection::Desc,
        }
    }
}

/// A total order over a collection: the declared sort columns followed by a
/// unique tie-break column (appended automatically when not already
/// listed), so every item has a distinct boundary tuple.
#[derive(Debug, Clone)]
pub struct KeysetOrder {
    columns: Vec<SortColumn>,
}

impl KeysetOrder {
    pub fn new(mut columns: Vec<SortColumn>, tie_break: &'static str) -> Self {
        if !columns.iter().any(|c| c.name == tie_break) {
            columns.push(SortColumn::asc(tie_break));
        }
        Self { columns }
    }

    pub fn by(column: SortColumn, tie_break: &'static str) -> Self {
        Self::new(vec![column], tie_break)
    }

    pub fn columns(&self) -> &[SortColumn] {
        &self.columns
    }

    fn compare_items(&self, a: &ConstValue, b: &ConstValue) -> Ordering {
        for column in &self.columns {
            let ord = compare_values(
                field_value(a, column.name).unwrap_or(&ConstValue::Null),
                field_value(b, column.name).unwrap_or(&ConstValue::Null),
            );
            let ord = match column.direction {
                OrderDirection::Asc => ord,
                OrderDirection::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Position of `item` relative to a boundary tuple, in traversal order.
    fn compare_to_boundary(&self, item: &ConstValue, boundary: &[ConstValue]) -> Ordering {
        for (column, bound) in self.columns.iter().zip(boundary) {
            let ord = compare_values(
                field_value(item, column.name).unwrap_or(&ConstValue::Null),
                bound,
            );
            let ord = match column.direction {
                OrderDirection::Asc => ord,
                OrderDirection::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Boundary tuple for an item, encoded as an opaque cursor.
    fn cursor_for(&self, item: &ConstValue) -> String {
        let mut fields = serde_json::Map::new();
        for column in &self.columns {
            let value = field_value(item, column.name)
                .cloned()
                .unwrap_or(ConstValue::Null)
                .into_json()
                .unwrap_or(serde_json::Value::Null);
            fields.insert(column.name.to_string(), value);
        }
        cursor::encode(&fields)
    }

    /// Decode a cursor into a boundary tuple. A cursor whose fields do not
    /// exactly match this order's columns was minted for a different sort
    /// and is rejected the same way as a tampered one.
    fn boundary_from_cursor(&self, encoded: &str) -> Result<Vec<ConstValue>> {
        let fields = cursor::decode(encoded)?;
        if fields.len() != self.columns.len() {
            return Err(Error::invalid_cursor());
        }
        let mut boundary = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let value = fields.get(column.name).ok_or_else(Error::invalid_cursor)?;
            boundary
                .push(ConstValue::from_json(value.clone()).map_err(|_| Error::invalid_cursor())?);
        }
        Ok(boundary)
    }
}

fn field_value<'a>(item: &'a ConstValue, name: &str) -> Option<&'a ConstValue> {
    match item {
        ConstValue::Object(obj) => obj.get(name),
        _ => None,
    }
}

/// Scalar ordering with nulls sorted last.
fn compare_values(a: &ConstValue, b: &ConstValue) -> Ordering {
    match (a, b) {
        (ConstValue::Null, ConstValue::Null) => Ordering::Equal,
        (ConstValue::Null, _) => Ordering::Greater,
        (_, ConstValue::Null) => Ordering::Less,
        (ConstValue::Number(x), ConstValue::Number(y)) => x
            .as_f64()
            .unwrap_or(0.0)
            .total_cmp(&y.as_f64().unwrap_or(0.0)),
        (ConstValue::String(x), ConstValue::String(y)) => x.cmp(y),
        (ConstValue::Boolean(x), ConstValue::Boolean(y)) => x.cmp(y),
        (ConstValue::Enum(x), ConstValue::Enum(y)) => x.as_str().cmp(y.as_str()),
        _ => Ordering::Equal,
    }
}

/// Window an orderable collection by boundary cursor.
///
/// Forward traversal keeps items strictly after the `after` boundary;
/// backward traversal mirrors it around `before`. Repeated forward
/// traversal from the start visits every item exactly once, in order,
/// for any page size.
pub fn paginate(
    mut items: Vec<ConstValue>,
    order: &KeysetOrder,
    args: &PaginationArgs,
    field: &FieldDef,
) -> Result<Connection<ConstValue>> {
    let limit = args.limit(field)? as usize;
    items.sort_by(|a, b| order.compare_items(a, b));

    let page_info;
    if args.is_backward() {
        if let Some(before) = &args.before {
            let boundary = order.boundary_from_cursor(before)?;
            items.retain(|item| order.compare_to_boundary(item, &boundary) == Ordering::Less);
        }
        let has_previous_page = items.len() > limit;
        if has_previous_page {
            items.drain(..items.len() - limit);
        }
        page_info = PageInfo {
            has_next_page: args.before.is_some(),
            has_previous_page,
            start_cursor: None,
            end_cursor: None,
        };
    } else {
        if let Some(after) = &args.after {
            let boundary = order.boundary_from_cursor(after)?;
            items.retain(|item| order.compare_to_boundary(item, &boundary) == Ordering::Greater);
        }
        let has_next_page = items.len() > limit;
        items.truncate(limit);
        page_info = PageInfo {
            has_next_page,
            has_previous_page: args.after.is_some(),
            start_cursor: None,
            end_cursor: None,
        };
    }

    let edges: Vec<Edge<ConstValue>> = items
        .into_iter()
        .map(|item| Edge {
            cursor: Some(order.cursor_for(&item)),
            node: item,
        })
        .collect();
    let mut page_info = page_info;
    page_info.start_cursor = edges.first().and_then(|e| e.cursor.clone());
    page_info.end_cursor = edges.last().and_then(|e| e.cursor.clone());

    Ok(Connection { edges, page_info })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::INVALID_CURSOR_MESSAGE;
    use async_graphql_value::Name;
    use indexmap::IndexMap;

    fn item(id: i64, weight: i64) -> ConstValue {
        let mut obj = IndexMap::new();
        obj.insert(Name::new("id"), ConstValue::Number(id.into()));
        obj.insert(Name::new("weight"), ConstValue::Number(weight.into()));
        ConstValue::Object(obj)
    }

    fn id_of(value: &ConstValue) -> i64 {
        match value {
            ConstValue::Object(obj) => match obj.get("id") {
                Some(ConstValue::Number(n)) => n.as_i64().unwrap(),
                _ => panic!("missing id"),
            },
            _ => panic!("not an object"),
        }
    }

    fn weight_order() -> KeysetOrder {
        KeysetOrder::by(SortColumn::asc("weight"), "id")
    }

    fn field() -> FieldDef {
        FieldDef::new("items").connection(100)
    }

    #[test]
    fn test_ties_break_by_id_across_pages() {
        // Sort keys [10, 12, 10] on ids [1, 2, 3]: ascending with id
        // tie-break yields visit order [1, 3, 2].
        let items = vec![item(1, 10), item(2, 12), item(3, 10)];
        let order = weight_order();

        let page1 = paginate(items.clone(), &order, &PaginationArgs::forward(2), &field()).unwrap();
        let ids1: Vec<i64> = page1.nodes().map(id_of).collect();
        assert_eq!(ids1, vec![1, 3]);
        assert!(page1.page_info.has_next_page);
        assert!(!page1.page_info.has_previous_page);

        let after = page1.page_info.end_cursor.clone().unwrap();
        let page2 = paginate(
            items,
            &order,
            &PaginationArgs::forward_after(2, after),
            &field(),
        )
        .unwrap();
        let ids2: Vec<i64> = page2.nodes().map(id_of).collect();
        assert_eq!(ids2, vec![2]);
        assert!(!page2.page_info.has_next_page);
        assert!(page2.page_info.has_previous_page);
    }

    #[test]
    fn test_forward_traversal_is_exhaustive_for_every_page_size() {
        let items: Vec<ConstValue> = vec![
            item(1, 10),
            item(2, 12),
            item(3, 10),
            item(4, 7),
            item(5, 12),
            item(6, 7),
            item(7, 9),
        ];
        let order = weight_order();
        let expected: Vec<i64> = {
            let all = paginate(items.clone(), &order, &PaginationArgs::forward(100), &field())
                .unwrap();
            all.nodes().map(id_of).collect()
        };

        for k in 1..=items.len() as u32 {
            let mut visited = Vec::new();
            let mut args = PaginationArgs::forward(k);
            loop {
                let page = paginate(items.clone(), &order, &args, &field()).unwrap();
                visited.extend(page.nodes().map(id_of));
                if !page.page_info.has_next_page {
                    break;
                }
                args = PaginationArgs::forward_after(
                    k,
                    page.page_info.end_cursor.clone().unwrap(),
                );
            }
            assert_eq!(visited, expected, "page size {k}");
        }
    }

    #[test]
    fn test_backward_traversal_mirrors_forward() {
        let items = vec![item(1, 10), item(2, 12), item(3, 10)];
        let order = weight_order();

        let tail = paginate(items.clone(), &order, &PaginationArgs::backward(2), &field()).unwrap();
        let ids: Vec<i64> = tail.nodes().map(id_of).collect();
        assert_eq!(ids, vec![3, 2]);
        assert!(tail.page_info.has_previous_page);
        assert!(!tail.page_info.has_next_page);

        let before = tail.page_info.start_cursor.clone().unwrap();
        let head = paginate(
            items,
            &order,
            &PaginationArgs::backward_before(2, before),
            &field(),
        )
        .unwrap();
        let ids: Vec<i64> = head.nodes().map(id_of).collect();
        assert_eq!(ids, vec![1]);
        assert!(!head.page_info.has_previous_page);
        assert!(head.page_info.has_next_page);
    }

    #[test]
    fn test_descending_order() {
        let items = vec![item(1, 10), item(2, 12), item(3, 10)];
        let order = KeysetOrder::by(SortColumn::desc("weight"), "id");
        let page = paginate(items, &order, &PaginationArgs::forward(3), &field()).unwrap();
        let ids: Vec<i64> = page.nodes().map(id_of).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn test_tampered_cursor_is_rejected_with_the_fixed_message() {
        let items = vec![item(1, 10)];
        let err = paginate(
            items,
            &weight_order(),
            &PaginationArgs::forward_after(1, "ABCDEFGH"),
            &field(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), INVALID_CURSOR_MESSAGE);
    }

    #[test]
    fn test_cursor_for_a_different_sort_is_rejected() {
        let mut foreign = serde_json::Map::new();
        foreign.insert("updated_at".into(), serde_json::json!("2024-01-01"));
        foreign.insert("id".into(), serde_json::json!(1));
        let encoded = cursor::encode(&foreign);

        let err = paginate(
            vec![item(1, 10)],
            &weight_order(),
            &PaginationArgs::forward_after(1, encoded),
            &field(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), INVALID_CURSOR_MESSAGE);
    }

    #[test]
    fn test_page_limit_is_clamped() {
        let items: Vec<ConstValue> = (1..=10).map(|i| item(i, i)).collect();
        let small = FieldDef::new("items").connection(3);
        let page = paginate(items, &weight_order(), &PaginationArgs::forward(100), &small).unwrap();
        assert_eq!(page.len(), 3);
        assert!(page.page_info.has_next_page);
    }

    #[test]
    fn test_tie_break_column_is_not_duplicated() {
        let order = KeysetOrder::new(vec![SortColumn::asc("id")], "id");
        assert_eq!(order.columns().len(), 1);
    }
}
