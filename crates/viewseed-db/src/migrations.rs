//! Schema auto-migration and view management.
//!
//! Tables are brought up to their declared [`TableSchema`]: missing tables are
//! created and missing columns are added. Nothing is ever dropped or altered in
//! place. Columns whose live type disagrees with the declaration are reported
//! and left alone, because SQLite cannot change a column type without
//! rebuilding the table.

use std::fmt;

use rusqlite::{Connection, params};
use tracing::{debug, info, warn};
use viewseed_common::{Error, Result};

use crate::query::SelectQuery;
use crate::schema::{TableSchema, validate_identifier};

/// A schema change applied by [`Migrator::auto_migrate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationStep {
    CreateTable { table: &'static str },
    AddColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationStep::CreateTable { table } => write!(f, "create table {table}"),
            MigrationStep::AddColumn { table, column } => {
                write!(f, "add column {table}.{column}")
            }
        }
    }
}

/// How [`Migrator::create_view`] treats an existing view of the same name.
#[derive(Debug, Clone)]
pub struct ViewOption {
    pub replace: bool,
    pub query: SelectQuery,
}

pub struct Migrator<'a> {
    conn: &'a Connection,
}

impl<'a> Migrator<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create or extend every table so it has the declared columns.
    /// All changes run in one transaction.
    pub fn auto_migrate(&self, tables: &[&TableSchema]) -> Result<Vec<MigrationStep>> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| Error::Migration(format!("failed to begin transaction: {e}")))?;

        let mut steps = Vec::new();
        for table in tables {
            validate_identifier(table.name)?;
            if self.has_table(table.name)? {
                steps.extend(self.add_missing_columns(table)?);
            } else {
                tx.execute_batch(&table.create_sql()).map_err(|e| {
                    Error::Migration(format!("failed to create table {}: {e}", table.name))
                })?;
                info!("created table {}", table.name);
                steps.push(MigrationStep::CreateTable { table: table.name });
            }
        }

        tx.commit()
            .map_err(|e| Error::Migration(format!("failed to commit migration: {e}")))?;

        if steps.is_empty() {
            debug!("schema already up to date");
        }
        Ok(steps)
    }

    fn add_missing_columns(&self, table: &TableSchema) -> Result<Vec<MigrationStep>> {
        let live = self.live_columns(table.name)?;
        let mut steps = Vec::new();

        for column in table.columns {
            match live.iter().find(|(name, _)| name == column.name) {
                Some((_, declared)) => {
                    if !column.ty.matches_declared(declared) {
                        warn!(
                            "column {}.{} is {declared}, expected {}; leaving it unchanged",
                            table.name,
                            column.name,
                            column.ty.sql()
                        );
                    }
                }
                None if column.primary_key => {
                    return Err(Error::Migration(format!(
                        "table {} exists without primary key column {}",
                        table.name, column.name
                    )));
                }
                None => {
                    let sql = format!(
                        "ALTER TABLE {} ADD COLUMN {}",
                        table.name,
                        column.definition()
                    );
                    self.conn.execute_batch(&sql).map_err(|e| {
                        Error::Migration(format!(
                            "failed to add column {}.{}: {e}",
                            table.name, column.name
                        ))
                    })?;
                    info!("added column {}.{}", table.name, column.name);
                    steps.push(MigrationStep::AddColumn {
                        table: table.name,
                        column: column.name,
                    });
                }
            }
        }

        Ok(steps)
    }

    /// `(name, declared type)` for each column of a live table.
    fn live_columns(&self, table: &str) -> Result<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, type FROM pragma_table_info(?1)")
            .map_err(|e| Error::Migration(format!("failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map(params![table], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| Error::Migration(format!("failed to read columns of {table}: {e}")))?;

        let mut columns = Vec::new();
        for row in rows {
            columns.push(
                row.map_err(|e| Error::Migration(format!("failed to read column row: {e}")))?,
            );
        }
        Ok(columns)
    }

    pub fn has_table(&self, name: &str) -> Result<bool> {
        self.has_object("table", name)
    }

    pub fn has_view(&self, name: &str) -> Result<bool> {
        self.has_object("view", name)
    }

    pub fn has_column(&self, table: &str, column: &str) -> Result<bool> {
        Ok(self
            .live_columns(table)?
            .iter()
            .any(|(name, _)| name == column))
    }

    fn has_object(&self, kind: &str, name: &str) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = ?1 AND name = ?2",
                params![kind, name],
                |row| row.get(0),
            )
            .map_err(|e| Error::Database(format!("failed to look up {kind} {name}: {e}")))?;
        Ok(count > 0)
    }

    /// Create a view from `option.query`.
    ///
    /// With `replace` set, an existing view is dropped and recreated in the same
    /// transaction. Without it, an existing view is an error.
    pub fn create_view(&self, name: &str, option: &ViewOption) -> Result<()> {
        validate_identifier(name)?;
        let body = option.query.to_sql();

        if !option.replace && self.has_view(name)? {
            return Err(Error::View(format!("view {name} already exists")));
        }

        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| Error::View(format!("failed to begin transaction: {e}")))?;

        if option.replace {
            tx.execute_batch(&format!("DROP VIEW IF EXISTS {name}"))
                .map_err(|e| Error::View(format!("failed to drop view {name}: {e}")))?;
        }
        tx.execute_batch(&format!("CREATE VIEW {name} AS {body}"))
            .map_err(|e| Error::View(format!("failed to create view {name}: {e}")))?;

        // SQLite only resolves the body when the view is read
        tx.prepare(&format!("SELECT * FROM {name} LIMIT 0"))
            .map_err(|e| Error::View(format!("invalid view {name}: {e}")))?;

        tx.commit()
            .map_err(|e| Error::View(format!("failed to commit view {name}: {e}")))?;

        info!("created view {name}");
        debug!("view {name}: {body}");
        Ok(())
    }

    pub fn drop_view(&self, name: &str) -> Result<()> {
        validate_identifier(name)?;
        self.conn
            .execute_batch(&format!("DROP VIEW IF EXISTS {name}"))
            .map_err(|e| Error::View(format!("failed to drop view {name}: {e}")))?;
        info!("dropped view {name}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Column;

    const NOTES_V1: TableSchema = TableSchema {
        name: "notes",
        columns: &[Column::primary_key("id"), Column::varchar("body", 64)],
    };

    const NOTES_V2: TableSchema = TableSchema {
        name: "notes",
        columns: &[
            Column::primary_key("id"),
            Column::varchar("body", 64),
            Column::integer("stars"),
        ],
    };

    fn conn() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    #[test]
    fn creates_missing_tables_once() {
        let conn = conn();
        let migrator = Migrator::new(&conn);

        let steps = migrator.auto_migrate(&[&NOTES_V1]).unwrap();
        assert_eq!(steps, vec![MigrationStep::CreateTable { table: "notes" }]);
        assert!(migrator.has_table("notes").unwrap());

        let steps = migrator.auto_migrate(&[&NOTES_V1]).unwrap();
        assert!(steps.is_empty());
    }

    #[test]
    fn adds_new_columns_and_keeps_rows() {
        let conn = conn();
        let migrator = Migrator::new(&conn);
        migrator.auto_migrate(&[&NOTES_V1]).unwrap();
        conn.execute("INSERT INTO notes (body) VALUES ('hi')", [])
            .unwrap();

        let steps = migrator.auto_migrate(&[&NOTES_V2]).unwrap();
        assert_eq!(
            steps,
            vec![MigrationStep::AddColumn {
                table: "notes",
                column: "stars"
            }]
        );
        assert!(migrator.has_column("notes", "stars").unwrap());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn type_mismatch_is_left_alone() {
        let conn = conn();
        conn.execute_batch("CREATE TABLE notes (id integer PRIMARY KEY AUTOINCREMENT, body text)")
            .unwrap();

        let steps = Migrator::new(&conn).auto_migrate(&[&NOTES_V1]).unwrap();
        assert!(steps.is_empty());
    }

    #[test]
    fn missing_primary_key_is_an_error() {
        let conn = conn();
        conn.execute_batch("CREATE TABLE notes (body text)").unwrap();

        let err = Migrator::new(&conn).auto_migrate(&[&NOTES_V1]).unwrap_err();
        assert!(matches!(err, Error::Migration(_)));
    }

    #[test]
    fn create_view_respects_replace_flag() {
        let conn = conn();
        let migrator = Migrator::new(&conn);
        migrator.auto_migrate(&[&NOTES_V1]).unwrap();

        let option = ViewOption {
            replace: false,
            query: SelectQuery::from_table("notes").select(["body"]),
        };
        migrator.create_view("note_bodies", &option).unwrap();
        assert!(migrator.has_view("note_bodies").unwrap());

        let err = migrator.create_view("note_bodies", &option).unwrap_err();
        assert!(matches!(err, Error::View(_)));

        let replace = ViewOption {
            replace: true,
            query: SelectQuery::from_table("notes").select(["id", "body"]),
        };
        migrator.create_view("note_bodies", &replace).unwrap();
        assert!(migrator.has_column("note_bodies", "id").unwrap());

        migrator.drop_view("note_bodies").unwrap();
        assert!(!migrator.has_view("note_bodies").unwrap());
    }

    #[test]
    fn failed_replace_keeps_previous_view() {
        let conn = conn();
        let migrator = Migrator::new(&conn);
        migrator.auto_migrate(&[&NOTES_V1]).unwrap();

        let good = ViewOption {
            replace: false,
            query: SelectQuery::from_table("notes").select(["body"]),
        };
        migrator.create_view("note_bodies", &good).unwrap();

        let broken = ViewOption {
            replace: true,
            query: SelectQuery::from_table("nosuch"),
        };
        let err = migrator.create_view("note_bodies", &broken).unwrap_err();
        assert!(matches!(err, Error::View(_)));

        assert!(migrator.has_view("note_bodies").unwrap());
        assert!(migrator.has_column("note_bodies", "body").unwrap());
    }

    #[test]
    fn broken_view_is_not_created() {
        let conn = conn();
        let migrator = Migrator::new(&conn);
        migrator.auto_migrate(&[&NOTES_V1]).unwrap();

        let option = ViewOption {
            replace: false,
            query: SelectQuery::from_table("notes").select(["missing_col"]),
        };
        let err = migrator.create_view("note_bodies", &option).unwrap_err();
        assert!(matches!(err, Error::View(_)));
        assert!(!migrator.has_view("note_bodies").unwrap());
    }

    #[test]
    fn view_names_must_be_identifiers() {
        let conn = conn();
        let option = ViewOption {
            replace: true,
            query: SelectQuery::from_table("notes"),
        };
        let err = Migrator::new(&conn)
            .create_view("bad name", &option)
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn step_display_is_readable() {
        assert_eq!(
            MigrationStep::CreateTable { table: "users" }.to_string(),
            "create table users"
        );
        assert_eq!(
            MigrationStep::AddColumn {
                table: "users",
                column: "age"
            }
            .to_string(),
            "add column users.age"
        );
    }
}
