//! PgTableAccessor: generic CRUD using the safe SQL builder; write-body validation.

mod crud;
mod validation;
pub use crud::PgTableAccessor;
pub use validation::RequestValidator;
