use std::fmt;

use crate::schema::Entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: String,
    pub on: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

/// Composable `SELECT` builder.
///
/// Column lists, join conditions and filters are SQL fragments written by the
/// caller and rendered verbatim. Nothing here binds parameters, which keeps the
/// rendered SQL usable as a view body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    table: String,
    columns: Vec<String>,
    joins: Vec<Join>,
    filters: Vec<String>,
    order_by: Vec<(String, Order)>,
    limit: Option<u64>,
}

impl SelectQuery {
    pub fn from_table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            joins: Vec::new(),
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    /// Query rooted at an entity's table.
    pub fn for_entity<E: Entity>() -> Self {
        Self::from_table(E::SCHEMA.name)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Append to the select list. An empty list renders as `table.*`.
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn join(mut self, table: impl Into<String>, on: impl Into<String>) -> Self {
        self.joins.push(Join {
            kind: JoinKind::Inner,
            table: table.into(),
            on: on.into(),
        });
        self
    }

    pub fn left_join(mut self, table: impl Into<String>, on: impl Into<String>) -> Self {
        self.joins.push(Join {
            kind: JoinKind::Left,
            table: table.into(),
            on: on.into(),
        });
        self
    }

    /// Add a `WHERE` condition. Multiple conditions are combined with `AND`.
    pub fn filter(mut self, condition: impl Into<String>) -> Self {
        self.filters.push(condition.into());
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, order: Order) -> Self {
        self.order_by.push((column.into(), order));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn to_sql(&self) -> String {
        let mut sql = String::from("SELECT ");
        if self.columns.is_empty() {
            sql.push_str(&format!("{}.*", self.table));
        } else {
            sql.push_str(&self.columns.join(", "));
        }
        sql.push_str(" FROM ");
        sql.push_str(&self.table);

        for join in &self.joins {
            let keyword = match join.kind {
                JoinKind::Inner => "JOIN",
                JoinKind::Left => "LEFT JOIN",
            };
            sql.push_str(&format!(" {keyword} {} ON {}", join.table, join.on));
        }

        if !self.filters.is_empty() {
            let conditions: Vec<String> = self.filters.iter().map(|f| format!("({f})")).collect();
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        if !self.order_by.is_empty() {
            let terms: Vec<String> = self
                .order_by
                .iter()
                .map(|(column, order)| match order {
                    Order::Asc => format!("{column} ASC"),
                    Order::Desc => format!("{column} DESC"),
                })
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        sql
    }
}

impl fmt::Display for SelectQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_query_selects_all_columns_of_table() {
        let q = SelectQuery::from_table("users");
        assert_eq!(q.to_sql(), "SELECT users.* FROM users");
    }

    #[test]
    fn renders_joins_filters_order_and_limit() {
        let q = SelectQuery::from_table("users")
            .select(["users.name", "products.price"])
            .join("products", "users.id = products.user_id")
            .left_join("tags", "tags.product_id = products.id")
            .filter("products.price > 10")
            .filter("users.age < 30")
            .order_by("users.name", Order::Asc)
            .order_by("products.price", Order::Desc)
            .limit(5);

        assert_eq!(
            q.to_sql(),
            "SELECT users.name, products.price FROM users \
             JOIN products ON users.id = products.user_id \
             LEFT JOIN tags ON tags.product_id = products.id \
             WHERE (products.price > 10) AND (users.age < 30) \
             ORDER BY users.name ASC, products.price DESC LIMIT 5"
        );
    }

    #[test]
    fn select_appends_across_calls() {
        let q = SelectQuery::from_table("t").select(["a"]).select(vec![String::from("b")]);
        assert_eq!(q.to_sql(), "SELECT a, b FROM t");
        assert_eq!(q.to_string(), q.to_sql());
        assert_eq!(q.table(), "t");
    }
}
