//! Generic list query engine: parse, filter, search, sort, paginate, format.

mod csv;
mod executor;
mod filter;
mod params;

pub use csv::{csv_cell, to_csv};
pub use executor::{apply_search, apply_sorting, execute, paginate, select, QueryOutput};
pub use filter::{apply_filters, loose_eq, FilterClause, FilterOperator, FilterValue};
pub use params::{OrderKey, OutputFormat, QueryParams, DEFAULT_PAGE, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
