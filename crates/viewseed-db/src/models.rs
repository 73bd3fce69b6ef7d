use serde::{Deserialize, Serialize};

use crate::query::SelectQuery;
use crate::schema::{Column, Entity, TableSchema};

/// Bound on `users.name` and `products.name`.
pub const NAME_MAX_LEN: u32 = 255;

pub const USERS_TABLE: TableSchema = TableSchema {
    name: "users",
    columns: &[
        Column::primary_key("id"),
        Column::varchar("name", NAME_MAX_LEN),
        Column::integer("age"),
    ],
};

/// `user_id` points at `users.id`. No foreign key constraint is declared.
pub const PRODUCTS_TABLE: TableSchema = TableSchema {
    name: "products",
    columns: &[
        Column::primary_key("id"),
        Column::varchar("name", NAME_MAX_LEN),
        Column::real("price"),
        Column::integer("user_id"),
    ],
};

pub const USER_PRODUCT_VIEW: &str = "user_product_views";

/// Column order of [`USER_PRODUCT_VIEW`]. The first column is the fetch-first ordering key.
pub const USER_PRODUCT_VIEW_COLUMNS: &[&str] =
    &["user_name", "product_id", "product_name", "price"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub age: i64,
}

impl Entity for User {
    const SCHEMA: &'static TableSchema = &USERS_TABLE;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub age: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub user_id: i64,
}

impl Entity for Product {
    const SCHEMA: &'static TableSchema = &PRODUCTS_TABLE;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: f64,
    pub user_id: i64,
}

/// One row of the read-only `user_product_views` view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProductView {
    pub user_name: String,
    pub product_id: i64,
    pub product_name: String,
    pub price: f64,
}

/// Every product joined to its owner's name.
pub fn user_product_query() -> SelectQuery {
    let users = User::SCHEMA;
    let products = Product::SCHEMA;
    SelectQuery::for_entity::<User>()
        .select([
            format!("{} AS user_name", users.qualified("name")),
            format!("{} AS product_id", products.qualified("id")),
            format!("{} AS product_name", products.qualified("name")),
            products.qualified("price"),
        ])
        .join(
            products.name,
            format!(
                "{} = {}",
                users.qualified("id"),
                products.qualified("user_id")
            ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_query_joins_products_to_owners() {
        assert_eq!(
            user_product_query().to_sql(),
            "SELECT users.name AS user_name, products.id AS product_id, \
             products.name AS product_name, products.price \
             FROM users JOIN products ON users.id = products.user_id"
        );
    }

    #[test]
    fn entities_expose_their_tables() {
        assert_eq!(User::SCHEMA.name, "users");
        assert_eq!(Product::SCHEMA.name, "products");
        assert!(Product::SCHEMA.column("user_id").is_some());
        assert!(User::SCHEMA.column("id").is_some_and(|c| c.primary_key));
    }
}
