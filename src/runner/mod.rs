//! Pipeline runner: executes the four statement lists strictly in order.
//!
//! One cycle is drop -> create -> copy -> insert on a single connection, one
//! blocking statement at a time. Any failure aborts the run and propagates to
//! the caller; there is no retry or partial-success tracking (recovery policy
//! belongs to whoever invokes the runner).

use crate::config::Config;
use crate::loader::StagingLoader;
use crate::statements::{
    copy_statements, create_table_statements, drop_table_statements, insert_table_statements,
    Dialect, Statement,
};
use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use tracing::info;

pub struct Pipeline<'a> {
    conn: &'a mut Connection,
    config: &'a Config,
}

fn execute_all(conn: &Connection, statements: &[Statement]) -> Result<()> {
    for statement in statements {
        info!("Executing: {}", statement.name);
        conn.execute(&statement.sql, [])
            .with_context(|| format!("Statement failed: {}", statement.name))?;
    }
    Ok(())
}

impl<'a> Pipeline<'a> {
    pub fn new(conn: &'a mut Connection, config: &'a Config) -> Self {
        Pipeline { conn, config }
    }

    pub fn drop_tables(&self) -> Result<()> {
        execute_all(self.conn, &drop_table_statements())
    }

    pub fn create_tables(&self) -> Result<()> {
        execute_all(self.conn, &create_table_statements(Dialect::Sqlite))
    }

    /// The copy stage. Under SQLite this runs the staging loader against the
    /// configured locations instead of COPY SQL.
    pub fn load_staging(&mut self) -> Result<()> {
        let mut loader = StagingLoader::new(self.conn);
        loader
            .load_events(
                Path::new(&self.config.s3.log_data),
                Path::new(&self.config.s3.log_jsonpath),
            )
            .context("Statement failed: copy staging_events")?;
        loader
            .load_songs(Path::new(&self.config.s3.song_data))
            .context("Statement failed: copy staging_songs")?;
        Ok(())
    }

    pub fn transform(&self) -> Result<()> {
        execute_all(self.conn, &insert_table_statements(Dialect::Sqlite))
    }

    /// A full pipeline cycle. Each stage completes before the next begins.
    pub fn run(&mut self) -> Result<()> {
        self.drop_tables()?;
        self.create_tables()?;
        self.load_staging()?;
        self.transform()?;
        info!("Pipeline cycle completed");
        Ok(())
    }
}

/// The full ordered statement script in the Redshift dialect, for execution
/// against the production warehouse.
pub fn render_script(config: &Config) -> String {
    let mut script = String::new();
    for list in [
        drop_table_statements(),
        create_table_statements(Dialect::Redshift),
        copy_statements(config),
        insert_table_statements(Dialect::Redshift),
    ] {
        for statement in list {
            script.push_str(&statement.sql);
            script.push_str(";\n\n");
        }
    }
    script
}
