//! Warehouse table definitions and DDL rendering.
//!
//! The seven tables are declared as consts and rendered to `CREATE TABLE` /
//! `DROP TABLE IF EXISTS` text per dialect. Two staging tables hold raw JSON
//! rows as-loaded (no keys, everything nullable); the star schema on top of
//! them is `songplays` plus the `users`, `songs`, `artists` and `time`
//! dimensions.

use super::{Dialect, Statement};

#[macro_export]
macro_rules! sql_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            // Allow unused_mut because the variable is only mutated when optional
            // field assignments are passed to the macro (e.g., `non_null = true`)
            #[allow(unused_mut)]
            let mut column = $crate::statements::schema::Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                non_null: false,
                identity: false,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Varchar(Option<u16>),
    Integer,
    BigInt,
    Decimal,
    Numeric,
    Timestamp,
}

impl SqlType {
    fn render(&self, dialect: Dialect) -> String {
        match dialect {
            Dialect::Redshift => match self {
                SqlType::Varchar(None) => "VARCHAR".to_string(),
                SqlType::Varchar(Some(len)) => format!("VARCHAR({})", len),
                SqlType::Integer => "INTEGER".to_string(),
                SqlType::BigInt => "BIGINT".to_string(),
                SqlType::Decimal => "DECIMAL".to_string(),
                SqlType::Numeric => "NUMERIC".to_string(),
                SqlType::Timestamp => "TIMESTAMP".to_string(),
            },
            // SQLite has no length-bounded varchar, decimal or timestamp
            // storage classes; timestamps are stored as datetime() text.
            Dialect::Sqlite => match self {
                SqlType::Varchar(_) | SqlType::Timestamp => "TEXT".to_string(),
                SqlType::Integer | SqlType::BigInt => "INTEGER".to_string(),
                SqlType::Decimal | SqlType::Numeric => "REAL".to_string(),
            },
        }
    }
}

pub struct Column {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
    /// Auto-incrementing surrogate key: `IDENTITY(0,1)` on Redshift,
    /// `PRIMARY KEY AUTOINCREMENT` on SQLite.
    pub identity: bool,
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
}

impl Table {
    /// `DROP TABLE IF EXISTS` so that dropping a non-existent table never
    /// fails the run. Identical text in both dialects.
    pub fn drop_statement(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", self.name)
    }

    pub fn create_statement(&self, dialect: Dialect) -> String {
        let mut sql = format!("CREATE TABLE {} (", self.name);
        for (column_index, column) in self.columns.iter().enumerate() {
            if column_index > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&format!(
                "{} {}",
                column.name,
                column.sql_type.render(dialect)
            ));
            if column.identity {
                match dialect {
                    Dialect::Redshift => sql.push_str(" IDENTITY(0,1) NOT NULL PRIMARY KEY"),
                    Dialect::Sqlite => sql.push_str(" NOT NULL PRIMARY KEY AUTOINCREMENT"),
                }
                continue;
            }
            if column.non_null {
                sql.push_str(" NOT NULL");
            }
            if column.is_primary_key {
                sql.push_str(" PRIMARY KEY");
            }
        }
        sql.push(')');
        sql
    }

    /// Number of columns, used by the staging loader to validate the
    /// positional JSONPaths mapping.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }
}

// =============================================================================
// Staging Tables
// =============================================================================

/// Raw event-log rows. Column order matters: the events JSONPaths mapping is
/// positional against this exact order.
pub const STAGING_EVENTS_TABLE: Table = Table {
    name: "staging_events",
    columns: &[
        sql_column!("artist", SqlType::Varchar(None)),
        sql_column!("auth", SqlType::Varchar(None)),
        sql_column!("first_name", SqlType::Varchar(None)),
        sql_column!("gender", SqlType::Varchar(Some(1))),
        sql_column!("item_in_session", SqlType::Integer),
        sql_column!("last_name", SqlType::Varchar(None)),
        sql_column!("length", SqlType::Decimal),
        sql_column!("level", SqlType::Varchar(None)),
        sql_column!("location", SqlType::Varchar(None)),
        sql_column!("method", SqlType::Varchar(None)),
        sql_column!("page", SqlType::Varchar(None)),
        sql_column!("registration", SqlType::Varchar(Some(50))),
        sql_column!("session_id", SqlType::Integer),
        sql_column!("song", SqlType::Varchar(None)),
        sql_column!("status", SqlType::Integer),
        sql_column!("ts", SqlType::BigInt), // epoch milliseconds
        sql_column!("user_agent", SqlType::Varchar(None)),
        sql_column!("user_id", SqlType::Integer),
    ],
};

/// Raw song-catalog rows, auto-mapped from JSON by field name.
pub const STAGING_SONGS_TABLE: Table = Table {
    name: "staging_songs",
    columns: &[
        sql_column!("num_songs", SqlType::Integer),
        sql_column!("artist_id", SqlType::Varchar(None)),
        sql_column!("artist_latitude", SqlType::Numeric),
        sql_column!("artist_longitude", SqlType::Numeric),
        sql_column!("artist_location", SqlType::Varchar(None)),
        sql_column!("artist_name", SqlType::Varchar(None)),
        sql_column!("song_id", SqlType::Varchar(None)),
        sql_column!("title", SqlType::Varchar(None)),
        sql_column!("duration", SqlType::Decimal),
        sql_column!("year", SqlType::Integer),
    ],
};

// =============================================================================
// Star Schema - Fact and Dimensions
// =============================================================================

/// Fact table - one row per song play, surrogate identity key.
pub const SONGPLAYS_TABLE: Table = Table {
    name: "songplays",
    columns: &[
        sql_column!("songplay_id", SqlType::Integer, identity = true),
        sql_column!("start_time", SqlType::Timestamp, non_null = true),
        sql_column!("user_id", SqlType::Integer, non_null = true),
        sql_column!("level", SqlType::Varchar(None)),
        sql_column!("song_id", SqlType::Varchar(None), non_null = true),
        sql_column!("artist_id", SqlType::Varchar(None), non_null = true),
        sql_column!("session_id", SqlType::Integer, non_null = true),
        sql_column!("location", SqlType::Varchar(None)),
        sql_column!("user_agent", SqlType::Varchar(None)),
    ],
};

pub const USERS_TABLE: Table = Table {
    name: "users",
    columns: &[
        sql_column!("user_id", SqlType::Integer, non_null = true, is_primary_key = true),
        sql_column!("first_name", SqlType::Varchar(None)),
        sql_column!("last_name", SqlType::Varchar(None)),
        sql_column!("gender", SqlType::Varchar(Some(1))),
        sql_column!("level", SqlType::Varchar(None)), // current subscription tier
    ],
};

pub const SONGS_TABLE: Table = Table {
    name: "songs",
    columns: &[
        sql_column!("song_id", SqlType::Varchar(None), non_null = true, is_primary_key = true),
        sql_column!("title", SqlType::Varchar(None)),
        sql_column!("artist_id", SqlType::Varchar(None), non_null = true),
        sql_column!("year", SqlType::Integer),
        sql_column!("duration", SqlType::Decimal),
    ],
};

pub const ARTISTS_TABLE: Table = Table {
    name: "artists",
    columns: &[
        sql_column!("artist_id", SqlType::Varchar(None), non_null = true, is_primary_key = true),
        sql_column!("name", SqlType::Varchar(None)),
        sql_column!("location", SqlType::Varchar(None)),
        sql_column!("latitude", SqlType::Numeric),
        sql_column!("longitude", SqlType::Numeric),
    ],
};

/// Calendar components of every distinct song-play timestamp.
pub const TIME_TABLE: Table = Table {
    name: "time",
    columns: &[
        sql_column!("start_time", SqlType::Timestamp, non_null = true, is_primary_key = true),
        sql_column!("hour", SqlType::Integer, non_null = true),
        sql_column!("day", SqlType::Integer, non_null = true),
        sql_column!("week", SqlType::Integer, non_null = true),
        sql_column!("month", SqlType::Integer, non_null = true),
        sql_column!("year", SqlType::Integer, non_null = true),
        sql_column!("weekday", SqlType::Integer, non_null = true),
    ],
};

/// All tables in the fixed drop/create order.
pub const ALL_TABLES: &[&Table] = &[
    &STAGING_EVENTS_TABLE,
    &STAGING_SONGS_TABLE,
    &SONGPLAYS_TABLE,
    &USERS_TABLE,
    &SONGS_TABLE,
    &ARTISTS_TABLE,
    &TIME_TABLE,
];

pub fn drop_table_statements() -> Vec<Statement> {
    ALL_TABLES
        .iter()
        .map(|table| Statement {
            name: format!("drop {}", table.name),
            sql: table.drop_statement(),
        })
        .collect()
}

pub fn create_table_statements(dialect: Dialect) -> Vec<Statement> {
    ALL_TABLES
        .iter()
        .map(|table| Statement {
            name: format!("create {}", table.name),
            sql: table.create_statement(dialect),
        })
        .collect()
}
