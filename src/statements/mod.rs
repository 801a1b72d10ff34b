//! SQL statement definitions for the warehouse ETL.
//!
//! Four ordered statement lists drive a pipeline cycle: drop, create, copy,
//! insert. An external runner executes them verbatim, strictly in list order,
//! with each list completing before the next begins.

pub mod copy;
pub mod schema;
pub mod transform;

pub use copy::copy_statements;
pub use schema::{create_table_statements, drop_table_statements};
pub use transform::insert_table_statements;

/// Target SQL dialect.
///
/// `Redshift` is the production warehouse the original statements were written
/// for (identity columns, `COPY ... IAM_ROLE ... JSON`, `EXTRACT`). `Sqlite`
/// is the locally-executable translation used by the runner and the tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Redshift,
    Sqlite,
}

/// A named SQL statement. The name is only used for logging and error context.
#[derive(Debug, Clone)]
pub struct Statement {
    pub name: String,
    pub sql: String,
}
