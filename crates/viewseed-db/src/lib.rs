pub mod migrations;
pub mod models;
pub mod query;
pub mod schema;
pub mod seed;
pub mod store;

pub use migrations::{MigrationStep, Migrator, ViewOption};
pub use models::{
    NewProduct, NewUser, PRODUCTS_TABLE, Product, USER_PRODUCT_VIEW, USERS_TABLE, User,
    UserProductView, user_product_query,
};
pub use query::{Order, SelectQuery};
pub use schema::{Column, ColumnType, Entity, TableSchema};
pub use seed::{SeedPlan, SeedReport, Seeder};
pub use store::Database;
