//! Static table declarations.
//!
//! Every persisted record declares its table through [`Entity::SCHEMA`]. The
//! migrator reads these declarations to create tables and add missing columns.

use viewseed_common::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    /// Text column. `max_len` is enforced on insert, since SQLite ignores the declared size.
    Text { max_len: Option<u32> },
}

impl ColumnType {
    /// Declared SQL type, as written into `CREATE TABLE`.
    pub fn sql(&self) -> String {
        match self {
            ColumnType::Integer => "integer".to_string(),
            ColumnType::Real => "real".to_string(),
            ColumnType::Text { max_len: Some(n) } => format!("varchar({n})"),
            ColumnType::Text { max_len: None } => "text".to_string(),
        }
    }

    /// Whether a live column's declared type matches this one.
    pub fn matches_declared(&self, declared: &str) -> bool {
        declared.trim().eq_ignore_ascii_case(&self.sql())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
    pub primary_key: bool,
}

impl Column {
    /// Auto-incrementing integer primary key.
    pub const fn primary_key(name: &'static str) -> Self {
        Self {
            name,
            ty: ColumnType::Integer,
            primary_key: true,
        }
    }

    pub const fn integer(name: &'static str) -> Self {
        Self {
            name,
            ty: ColumnType::Integer,
            primary_key: false,
        }
    }

    pub const fn real(name: &'static str) -> Self {
        Self {
            name,
            ty: ColumnType::Real,
            primary_key: false,
        }
    }

    pub const fn varchar(name: &'static str, max_len: u32) -> Self {
        Self {
            name,
            ty: ColumnType::Text {
                max_len: Some(max_len),
            },
            primary_key: false,
        }
    }

    /// Column clause for `CREATE TABLE` / `ALTER TABLE ... ADD COLUMN`.
    pub fn definition(&self) -> String {
        if self.primary_key {
            format!("{} {} PRIMARY KEY AUTOINCREMENT", self.name, self.ty.sql())
        } else {
            format!("{} {}", self.name, self.ty.sql())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [Column],
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn create_sql(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(Column::definition).collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.name,
            columns.join(", ")
        )
    }

    /// `table.column`, for select lists and join conditions.
    pub fn qualified(&self, column: &str) -> String {
        format!("{}.{}", self.name, column)
    }

    /// Reject text values longer than the column's declared bound.
    pub fn check_text(&self, column: &str, value: &str) -> Result<()> {
        let Some(col) = self.column(column) else {
            return Err(Error::Validation(format!(
                "{} has no column {column}",
                self.name
            )));
        };
        if let ColumnType::Text {
            max_len: Some(max_len),
        } = col.ty
        {
            let len = value.chars().count();
            if len > max_len as usize {
                return Err(Error::Validation(format!(
                    "{}.{column} is limited to {max_len} characters, got {len}",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// A record type backed by a table.
pub trait Entity {
    const SCHEMA: &'static TableSchema;
}

/// Accepts plain SQL identifiers (`[A-Za-z_][A-Za-z0-9_]*`).
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::Validation(format!("invalid identifier: {name:?}")));
    }
    Ok(())
}
