use std::path::Path;
use std::time::Duration;

use viewseed_db::{
    Database, Entity, MigrationStep, Product, SeedPlan, Seeder, USER_PRODUCT_VIEW, User,
    ViewOption, user_product_query,
};

fn open(path: &Path) -> Database {
    Database::open(path, Duration::from_secs(5)).expect("open database")
}

/// Migrate, replace the view and seed the default plan.
fn run_once(db: &Database, seed: u64) -> Vec<MigrationStep> {
    let steps = db
        .auto_migrate(&[User::SCHEMA, Product::SCHEMA])
        .expect("migrate");
    db.create_view(
        USER_PRODUCT_VIEW,
        &ViewOption {
            replace: true,
            query: user_product_query(),
        },
    )
    .expect("create view");
    Seeder::new(SeedPlan {
        rng_seed: Some(seed),
        ..Default::default()
    })
    .run(db)
    .expect("seed");
    steps
}

#[test]
fn seeding_creates_ten_users_with_ten_products_each() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir.path().join("demo.db"));
    let steps = run_once(&db, 1);

    assert_eq!(
        steps,
        vec![
            MigrationStep::CreateTable { table: "users" },
            MigrationStep::CreateTable { table: "products" },
        ]
    );
    assert_eq!(db.count_users().unwrap(), 10);
    assert_eq!(db.count_products().unwrap(), 100);
}

#[test]
fn every_product_belongs_to_an_existing_user() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir.path().join("demo.db"));
    run_once(&db, 2);

    assert_eq!(db.orphan_product_count().unwrap(), 0);
    let first = db.get_user(1).unwrap().expect("user 1");
    assert_eq!(first.name, "User1");
    let owned = db.products_for_user(first.id).unwrap();
    assert_eq!(owned.len(), 10);
    assert_eq!(owned[0].name, "Product1-1");
    assert_eq!(owned[9].name, "Product1-10");
}

#[test]
fn view_rows_match_product_rows() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir.path().join("demo.db"));
    run_once(&db, 3);

    assert_eq!(db.count_view_rows().unwrap(), db.count_products().unwrap());

    let row = db.first_view_row().unwrap();
    // "User1" sorts before "User10" and "User2"
    assert_eq!(row.user_name, "User1");
    assert!(row.product_name.starts_with("Product1-"));
}

#[test]
fn second_run_replaces_view_and_appends_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("demo.db");

    {
        let db = open(&path);
        run_once(&db, 4);
    }

    let db = open(&path);
    let steps = run_once(&db, 5);
    assert!(steps.is_empty());
    assert_eq!(db.count_users().unwrap(), 20);
    assert_eq!(db.count_products().unwrap(), 200);
    assert_eq!(db.count_view_rows().unwrap(), 200);
    assert_eq!(db.orphan_product_count().unwrap(), 0);
}

#[test]
fn unreachable_database_fails_before_seeding() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("nested").join("demo.db");

    let result = Database::open(&path, Duration::from_secs(1));
    assert!(result.is_err());
    assert!(!path.exists());
}
