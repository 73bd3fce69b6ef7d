use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};
use viewseed_config::{DatabaseConfig, SeedConfig};
use viewseed_db::{
    Database, Entity, MigrationStep, Product, SeedPlan, Seeder, USER_PRODUCT_VIEW, User,
    ViewOption, user_product_query,
};

use crate::report;

/// Open the configured database.
///
/// An unset path lives under the directory returned by `data_dir`, which is
/// only called in that case and is created if missing.
pub fn connect(
    config: &DatabaseConfig,
    data_dir: impl FnOnce() -> Result<PathBuf>,
) -> Result<Database> {
    if config.is_in_memory() {
        return Database::in_memory().context("failed to connect to database");
    }

    let path = match &config.path {
        Some(path) => PathBuf::from(path),
        None => {
            let dir = data_dir()?;
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create data directory {}", dir.display()))?;
            config.resolve_path(&dir)
        }
    };

    Database::open(&path, Duration::from_millis(config.busy_timeout_ms))
        .context("failed to connect to database")
}

/// Create or extend both tables, then replace the user/product view.
pub fn prepare(db: &Database) -> Result<Vec<MigrationStep>> {
    let steps = db
        .auto_migrate(&[User::SCHEMA, Product::SCHEMA])
        .context("failed to migrate tables")?;

    let query = user_product_query();
    db.create_view(
        USER_PRODUCT_VIEW,
        &ViewOption {
            replace: true,
            query,
        },
    )
    .context("failed to create view")?;

    Ok(steps)
}

pub fn seed_plan(config: &SeedConfig) -> SeedPlan {
    SeedPlan {
        users: config.users,
        products_per_user: config.products_per_user,
        age_range: config.min_age..=config.max_age,
        max_price: config.max_price,
        rng_seed: config.rng_seed,
    }
}

/// The full demo: prepare, seed, then fetch the first view row.
///
/// A failed fetch is printed and is not an error.
pub fn run_demo(db: &Database, seed: &SeedConfig, out: &mut impl Write) -> Result<()> {
    prepare(db)?;

    let seeded = Seeder::new(seed_plan(seed))
        .run(db)
        .context("failed to seed data")?;
    info!("seeded user ids {:?}", seeded.user_ids);

    writeln!(
        out,
        "Database setup complete! {} users and {} products per user inserted.",
        seed.users, seed.products_per_user
    )?;

    match db.first_view_row() {
        Ok(row) => writeln!(out, "Fetched Row: {}", row.product_name)?,
        Err(e) => {
            warn!("fetching from {USER_PRODUCT_VIEW} failed: {e}");
            writeln!(out, "Failed to fetch view!")?;
            writeln!(out, "{e}")?;
        }
    }
    Ok(())
}

pub fn migrate(db: &Database, out: &mut impl Write) -> Result<()> {
    let steps = prepare(db)?;
    if steps.is_empty() {
        writeln!(out, "Schema already up to date.")?;
    } else {
        for step in &steps {
            writeln!(out, "{step}")?;
        }
    }
    writeln!(out, "View {USER_PRODUCT_VIEW} replaced.")?;
    Ok(())
}

pub fn rows(db: &Database, limit: u64, json: bool, out: &mut impl Write) -> Result<()> {
    let rows = db
        .view_rows(limit)
        .with_context(|| format!("failed to read {USER_PRODUCT_VIEW}"))?;

    if json {
        serde_json::to_writer_pretty(&mut *out, &rows).context("failed to encode rows")?;
        writeln!(out)?;
    } else {
        out.write_all(report::render_rows(&rows).as_bytes())?;
    }
    Ok(())
}

pub fn stats(db: &Database, out: &mut impl Write) -> Result<()> {
    let stats = report::Stats {
        users: db.count_users().context("failed to count users")?,
        products: db.count_products().context("failed to count products")?,
        view_rows: db
            .count_view_rows()
            .with_context(|| format!("failed to count {USER_PRODUCT_VIEW}"))?,
        orphans: db
            .orphan_product_count()
            .context("failed to count orphan products")?,
    };
    out.write_all(report::render_stats(&stats).as_bytes())?;
    Ok(())
}
