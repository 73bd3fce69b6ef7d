use std::ops::RangeInclusive;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};
use viewseed_common::{Error, Result};

use crate::models::{NewProduct, NewUser};
use crate::store::{Database, insert_product, insert_user};

/// Shape of the generated data.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedPlan {
    pub users: u32,
    pub products_per_user: u32,
    pub age_range: RangeInclusive<i64>,
    /// Prices are drawn from `[0, max_price)`.
    pub max_price: f64,
    pub rng_seed: Option<u64>,
}

impl Default for SeedPlan {
    fn default() -> Self {
        Self {
            users: 10,
            products_per_user: 10,
            age_range: 18..=67,
            max_price: 100.0,
            rng_seed: None,
        }
    }
}

impl SeedPlan {
    pub fn validate(&self) -> Result<()> {
        if self.age_range.is_empty() {
            return Err(Error::Validation(format!(
                "empty age range {}..={}",
                self.age_range.start(),
                self.age_range.end()
            )));
        }
        if !self.max_price.is_finite() || self.max_price <= 0.0 {
            return Err(Error::Validation(format!(
                "max_price must be positive, got {}",
                self.max_price
            )));
        }
        Ok(())
    }
}

/// What a seeding run inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub user_ids: Vec<i64>,
    pub products: u64,
}

/// Inserts `users` users, each owning `products_per_user` products.
///
/// Users are named `User{i}` and products `Product{i}-{j}`, both 1-based.
/// Ages and prices are random.
pub struct Seeder<R> {
    plan: SeedPlan,
    rng: R,
}

impl Seeder<StdRng> {
    /// Seeded from `plan.rng_seed` when set, from the OS otherwise.
    pub fn new(plan: SeedPlan) -> Self {
        let rng = match plan.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::with_rng(plan, rng)
    }
}

impl<R: Rng> Seeder<R> {
    pub fn with_rng(plan: SeedPlan, rng: R) -> Self {
        Self { plan, rng }
    }

    pub fn user(&mut self, i: u32) -> NewUser {
        NewUser {
            name: format!("User{i}"),
            age: self.rng.random_range(self.plan.age_range.clone()),
        }
    }

    pub fn product(&mut self, i: u32, j: u32, user_id: i64) -> NewProduct {
        NewProduct {
            name: format!("Product{i}-{j}"),
            price: self.rng.random::<f64>() * self.plan.max_price,
            user_id,
        }
    }

    /// Insert the whole plan in one transaction. On error nothing is kept.
    pub fn run(&mut self, db: &Database) -> Result<SeedReport> {
        self.plan.validate()?;

        let report = db.with_transaction(|conn| {
            let mut report = SeedReport::default();
            for i in 1..=self.plan.users {
                let user = insert_user(conn, &self.user(i))?;
                debug!("inserted {} (id {})", user.name, user.id);

                for j in 1..=self.plan.products_per_user {
                    insert_product(conn, &self.product(i, j, user.id))?;
                    report.products += 1;
                }
                report.user_ids.push(user.id);
            }
            Ok(report)
        })?;

        info!(
            "seeded {} users and {} products",
            report.user_ids.len(),
            report.products
        );
        Ok(report)
    }
}
