use super::{Connection, Edge, PageInfo, PaginationArgs};
use crate::error::Result;
use crate::schema::FieldDef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalDirection {
    Forward,
    Backward,
}

/// Page-size and token parameters to pass to a remote system that does its
/// own pagination. Sorting or filtering the window locally is not possible;
/// such operations must be expressed as parameters of the remote request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalPageRequest {
    pub page_size: u32,
    pub token: Option<String>,
    pub direction: TraversalDirection,
}

impl ExternalPageRequest {
    /// Translate `first`/`last`/`after`/`before` into the remote call's
    /// paging parameters. The requested size is bounded by the field's
    /// `max_page_size` policy; tokens are forwarded untouched.
    pub fn from_args(args: &PaginationArgs, field: &FieldDef) -> Result<Self> {
        let page_size = args.limit(field)?;
        if args.is_backward() {
            Ok(Self {
                page_size,
                token: args.before.clone(),
                direction: TraversalDirection::Backward,
            })
        } else {
            Ok(Self {
                page_size,
                token: args.after.clone(),
                direction: TraversalDirection::Forward,
            })
        }
    }
}

/// One page as returned by the remote system, with its own opaque
/// previous/next tokens.
#[derive(Debug, Clone)]
pub struct ExternalPage<T> {
    pub items: Vec<T>,
    pub previous_token: Option<String>,
    pub next_token: Option<String>,
}

/// Wrap a remote page as a connection. The remote tokens are forwarded
/// verbatim as the start and end cursors; items carry no per-item cursors
/// because the remote system does not issue any.
pub fn connect<T>(page: ExternalPage<T>) -> Connection<T> {
    let page_info = PageInfo {
        has_next_page: page.next_token.is_some(),
        has_previous_page: page.previous_token.is_some(),
        start_cursor: page.previous_token,
        end_cursor: page.next_token,
    };
    Connection {
        edges: page
            .items
            .into_iter()
            .map(|node| Edge { node, cursor: None })
            .collect(),
        page_info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql_value::ConstValue;

    fn field() -> FieldDef {
        FieldDef::new("remote_jobs").connection(20)
    }

    #[test]
    fn test_first_translates_to_remote_page_size() {
        let request =
            ExternalPageRequest::from_args(&PaginationArgs::forward(5), &field()).unwrap();
        assert_eq!(
            request,
            ExternalPageRequest {
                page_size: 5,
                token: None,
                direction: TraversalDirection::Forward,
            }
        );
    }

    #[test]
    fn test_tokens_are_forwarded_untouched() {
        let request = ExternalPageRequest::from_args(
            &PaginationArgs::forward_after(5, "remote-token-xyz"),
            &field(),
        )
        .unwrap();
        assert_eq!(request.token.as_deref(), Some("remote-token-xyz"));

        let request = ExternalPageRequest::from_args(
            &PaginationArgs::backward_before(5, "prev-token"),
            &field(),
        )
        .unwrap();
        assert_eq!(request.token.as_deref(), Some("prev-token"));
        assert_eq!(request.direction, TraversalDirection::Backward);
    }

    #[test]
    fn test_remote_page_size_is_bounded() {
        let request =
            ExternalPageRequest::from_args(&PaginationArgs::forward(500), &field()).unwrap();
        assert_eq!(request.page_size, 20);
    }

    #[test]
    fn test_connect_exposes_remote_tokens_as_cursors() {
        let conn = connect(ExternalPage {
            items: vec![ConstValue::Number(1.into()), ConstValue::Number(2.into())],
            previous_token: Some("prev".into()),
            next_token: Some("next".into()),
        });
        assert_eq!(conn.len(), 2);
        assert!(conn.page_info.has_next_page);
        assert!(conn.page_info.has_previous_page);
        assert_eq!(conn.page_info.start_cursor.as_deref(), Some("prev"));
        assert_eq!(conn.page_info.end_cursor.as_deref(), Some("next"));
        assert!(conn.edges.iter().all(|e| e.cursor.is_none()));
    }

    #[test]
    fn test_last_remote_page_has_no_next() {
        let conn = connect(ExternalPage::<ConstValue> {
            items: vec![],
            previous_token: Some("prev".into()),
            next_token: None,
        });
        assert!(!conn.page_info.has_next_page);
        assert!(conn.page_info.end_cursor.is_none());
    }
}
