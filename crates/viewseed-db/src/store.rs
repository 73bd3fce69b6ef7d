use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};
use viewseed_common::{Error, Result};

use crate::migrations::{MigrationStep, Migrator, ViewOption};
use crate::models::{
    NewProduct, NewUser, Product, USER_PRODUCT_VIEW, USER_PRODUCT_VIEW_COLUMNS, User,
    UserProductView,
};
use crate::query::{Order, SelectQuery};
use crate::schema::{Entity, TableSchema};

/// Handle to the demo database: schema, view, inserts and reads.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open a SQLite file. The parent directory must already exist.
    pub fn open(db_path: &Path, busy_timeout: Duration) -> Result<Self> {
        info!("opening database at {}", db_path.display());
        let conn = Connection::open(db_path)
            .map_err(|e| Error::Database(format!("failed to open database: {e}")))?;

        conn.busy_timeout(busy_timeout)
            .map_err(|e| Error::Database(format!("failed to set busy timeout: {e}")))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| Error::Database(format!("failed to set pragmas: {e}")))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self> {
        debug!("opening in-memory database");
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Database(format!("failed to open in-memory database: {e}")))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Database("database lock poisoned".into()))
    }

    /// Bring the given tables up to their declared schema.
    pub fn auto_migrate(&self, tables: &[&TableSchema]) -> Result<Vec<MigrationStep>> {
        let conn = self.connection()?;
        Migrator::new(&conn).auto_migrate(tables)
    }

    pub fn create_view(&self, name: &str, option: &ViewOption) -> Result<()> {
        let conn = self.connection()?;
        Migrator::new(&conn).create_view(name, option)
    }

    pub fn drop_view(&self, name: &str) -> Result<()> {
        let conn = self.connection()?;
        Migrator::new(&conn).drop_view(name)
    }

    pub fn has_table(&self, name: &str) -> Result<bool> {
        let conn = self.connection()?;
        Migrator::new(&conn).has_table(name)
    }

    pub fn has_view(&self, name: &str) -> Result<bool> {
        let conn = self.connection()?;
        Migrator::new(&conn).has_view(name)
    }

    /// Run `f` inside one transaction. It commits only if `f` returns `Ok`.
    pub fn with_transaction<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let mut conn = self.connection()?;
        let tx = conn
            .transaction()
            .map_err(|e| Error::Database(format!("failed to begin transaction: {e}")))?;
        let value = f(&*tx)?;
        tx.commit()
            .map_err(|e| Error::Database(format!("failed to commit transaction: {e}")))?;
        Ok(value)
    }

    pub fn insert_user(&self, user: &NewUser) -> Result<User> {
        let conn = self.connection()?;
        insert_user(&conn, user)
    }

    pub fn insert_product(&self, product: &NewProduct) -> Result<Product> {
        let conn = self.connection()?;
        insert_product(&conn, product)
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.connection()?;
        conn.query_row(
            "SELECT id, name, age FROM users WHERE id = ?1",
            params![id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    age: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(|e| Error::Database(format!("failed to query user: {e}")))
    }

    pub fn products_for_user(&self, user_id: i64) -> Result<Vec<Product>> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, name, price, user_id
                 FROM products
                 WHERE user_id = ?1
                 ORDER BY id ASC",
            )
            .map_err(|e| Error::Database(format!("failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok(Product {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    price: row.get(2)?,
                    user_id: row.get(3)?,
                })
            })
            .map_err(|e| Error::Database(format!("failed to query products: {e}")))?;

        let mut products = Vec::new();
        for row in rows {
            products.push(
                row.map_err(|e| Error::Database(format!("failed to read product row: {e}")))?,
            );
        }
        Ok(products)
    }

    pub fn count_users(&self) -> Result<u64> {
        self.count(User::SCHEMA.name)
    }

    pub fn count_products(&self) -> Result<u64> {
        self.count(Product::SCHEMA.name)
    }

    pub fn count_view_rows(&self) -> Result<u64> {
        self.count(USER_PRODUCT_VIEW)
    }

    /// Products whose `user_id` has no matching user.
    pub fn orphan_product_count(&self) -> Result<u64> {
        let conn = self.connection()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM products p
                 LEFT JOIN users u ON u.id = p.user_id
                 WHERE u.id IS NULL",
                [],
                |row| row.get(0),
            )
            .map_err(|e| Error::Database(format!("failed to count orphan products: {e}")))?;
        Ok(count as u64)
    }

    fn count(&self, relation: &str) -> Result<u64> {
        let conn = self.connection()?;
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {relation}"), [], |row| {
                row.get(0)
            })
            .map_err(|e| Error::Database(format!("failed to count {relation}: {e}")))?;
        Ok(count as u64)
    }

    /// First view row, ordered by the view's first column.
    /// An empty view is `Error::NotFound`.
    pub fn first_view_row(&self) -> Result<UserProductView> {
        let sql = view_query().limit(1).to_sql();
        let conn = self.connection()?;
        conn.query_row(&sql, [], view_row)
            .optional()
            .map_err(|e| Error::Database(format!("failed to fetch view row: {e}")))?
            .ok_or_else(Error::record_not_found)
    }

    pub fn view_rows(&self, limit: u64) -> Result<Vec<UserProductView>> {
        let sql = view_query().limit(limit).to_sql();
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| Error::Database(format!("failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map([], view_row)
            .map_err(|e| Error::Database(format!("failed to query view: {e}")))?;

        let mut result = Vec::new();
        for row in rows {
            result.push(
                row.map_err(|e| Error::Database(format!("failed to read view row: {e}")))?,
            );
        }
        Ok(result)
    }
}

fn view_query() -> SelectQuery {
    SelectQuery::from_table(USER_PRODUCT_VIEW)
        .select(USER_PRODUCT_VIEW_COLUMNS.iter().copied())
        .order_by(USER_PRODUCT_VIEW_COLUMNS[0], Order::Asc)
}

fn view_row(row: &Row<'_>) -> rusqlite::Result<UserProductView> {
    Ok(UserProductView {
        user_name: row.get(0)?,
        product_id: row.get(1)?,
        product_name: row.get(2)?,
        price: row.get(3)?,
    })
}

pub(crate) fn insert_user(conn: &Connection, user: &NewUser) -> Result<User> {
    User::SCHEMA.check_text("name", &user.name)?;
    conn.execute(
        "INSERT INTO users (name, age) VALUES (?1, ?2)",
        params![user.name, user.age],
    )
    .map_err(|e| Error::Database(format!("failed to insert user: {e}")))?;

    Ok(User {
        id: conn.last_insert_rowid(),
        name: user.name.clone(),
        age: user.age,
    })
}

pub(crate) fn insert_product(conn: &Connection, product: &NewProduct) -> Result<Product> {
    Product::SCHEMA.check_text("name", &product.name)?;
    conn.execute(
        "INSERT INTO products (name, price, user_id) VALUES (?1, ?2, ?3)",
        params![product.name, product.price, product.user_id],
    )
    .map_err(|e| Error::Database(format!("failed to insert product: {e}")))?;

    Ok(Product {
        id: conn.last_insert_rowid(),
        name: product.name.clone(),
        price: product.price,
        user_id: product.user_id,
    })
}
