pub mod types;
pub mod params;
pub mod operators;
pub mod filter;
pub mod filter_where;
pub mod filter_select;
pub mod filter_order;
pub mod pagination;
pub mod error;

pub use types::*;
pub use filter::Filter;
pub use error::FilterError;
pub use pagination::{PageRef, Pagination, PaginationMeta};
