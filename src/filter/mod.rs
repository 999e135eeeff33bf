pub mod types;
pub mod filter;
pub mod filter_where;
pub mod filter_order;
pub mod query;
pub mod error;

pub use types::*;
pub use filter::Filter;
pub use filter_order::FilterOrder;
pub use filter_where::FilterWhere;
pub use query::{PageRef, Pagination, QueryPlan, QueryTranslator, MAX_SKIP, RESERVED_KEYS};
pub use error::FilterError;
