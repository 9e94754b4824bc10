use async_graphql_value::ConstValue;

use super::{cursor, Connection, Edge, PageInfo, PaginationArgs};
use crate::error::{Error, Result};
use crate::schema::FieldDef;

const OFFSET_FIELD: &str = "offset";

/// Position-offset pagination for sort orders with no monotonic, tie-broken
/// key (computed rankings such as popularity or priority).
///
/// The input is expected to arrive already ordered by the finder. Cursors
/// encode positions, so pages are best-effort under concurrent mutation:
/// items may repeat or go missing between requests. That is an accepted,
/// documented property of this strategy, not a defect to compensate for.
pub fn paginate(
    items: Vec<ConstValue>,
    args: &PaginationArgs,
    field: &FieldDef,
) -> Result<Connection<ConstValue>> {
    let limit = args.limit(field)? as usize;
    let total = items.len();

    let (start, end) = if args.is_backward() {
        let end = match &args.before {
            Some(before) => decode_offset(before)?.min(total),
            None => total,
        };
        (end.saturating_sub(limit), end)
    } else {
        let start = match &args.after {
            Some(after) => decode_offset(after)?
                .checked_add(1)
                .ok_or_else(Error::invalid_cursor)?
                .min(total),
            None => 0,
        };
        (start, (start + limit).min(total))
    };

    let edges: Vec<Edge<ConstValue>> = items
        .into_iter()
        .enumerate()
        .skip(start)
        .take(end - start)
        .map(|(position, node)| Edge {
            cursor: Some(encode_offset(position)),
            node,
        })
        .collect();

    let page_info = PageInfo {
        has_next_page: end < total,
        has_previous_page: start > 0,
        start_cursor: edges.first().and_then(|e| e.cursor.clone()),
        end_cursor: edges.last().and_then(|e| e.cursor.clone()),
    };

    Ok(Connection { edges, page_info })
}

fn encode_offset(position: usize) -> String {
    let mut fields = serde_json::Map::new();
    fields.insert(OFFSET_FIELD.into(), serde_json::Value::from(position));
    cursor::encode(&fields)
}

fn decode_offset(encoded: &str) -> Result<usize> {
    let fields = cursor::decode(encoded)?;
    if fields.len() != 1 {
        return Err(Error::invalid_cursor());
    }
    fields
        .get(OFFSET_FIELD)
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .ok_or_else(Error::invalid_cursor)
}
