pub mod conditions;
pub mod operators;
pub mod pagination;
pub mod query_parser;
pub mod sort;

pub use conditions::{CompiledQuery, FilterPredicate, Projection, compile};
pub use operators::ComparisonOperator;
pub use pagination::{PageLinks, PageRef, PaginationWindow};
pub use query_parser::{FieldKind, FilterValue, ParsedQuery, QueryRequest, parse_query};
pub use sort::{SortDirection, SortKey, parse_sorting};
