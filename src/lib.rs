pub mod batch;
pub mod complexity;
pub mod connection;
pub mod context;
pub mod error;
pub mod executor;
pub mod lazy;
pub mod resolver;
pub mod schema;
pub mod validate;

pub use async_graphql_value::ConstValue;
pub use batch::{BatchCoordinator, BoxFuture, BulkFetchFn};
pub use complexity::{ComplexityAccumulator, FieldComplexity, Surcharge, DEFAULT_COMPLEXITY};
pub use connection::{
    Connection, Edge, ExternalPage, ExternalPageRequest, KeysetOrder, OrderDirection, PageInfo,
    PaginationArgs, PaginationStrategy, SortColumn, SortOption, TraversalDirection,
};
pub use context::{
    AllowAll, AuthorizationGate, FieldResolution, FromConstValue, Principal, RequestContext,
};
pub use error::{Error, ErrorPayload, Result, SchemaError};
pub use executor::{Executor, FieldInvocation, FieldOutcome, FieldPlan};
pub use lazy::LazyValue;
pub use resolver::{last, single, AdapterKind, Resolved, Resolver};
pub use schema::{ArgumentDef, Arguments, FieldDef, PageSizePolicy, DEFAULT_MAX_PAGE_SIZE};
pub use validate::{validate_constraints, ArgumentConstraint, ConstraintKind};
