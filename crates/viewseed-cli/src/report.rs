use viewseed_db::UserProductView;

pub struct Stats {
    pub users: u64,
    pub products: u64,
    pub view_rows: u64,
    pub orphans: u64,
}

const LABEL_W: usize = 13;

pub fn render_stats(stats: &Stats) -> String {
    let row = |label: &str, value: u64| format!("{label:<width$}{value}\n", width = LABEL_W);
    [
        row("users", stats.users),
        row("products", stats.products),
        row("view rows", stats.view_rows),
        row("orphans", stats.orphans),
    ]
    .concat()
}

/// Render view rows as a left-aligned text table sized to its contents.
pub fn render_rows(rows: &[UserProductView]) -> String {
    if rows.is_empty() {
        return "(no rows)\n".to_string();
    }

    let header = ["user_name", "product_id", "product_name", "price"];
    let cells: Vec<[String; 4]> = rows
        .iter()
        .map(|r| {
            [
                r.user_name.clone(),
                r.product_id.to_string(),
                r.product_name.clone(),
                format!("{:.2}", r.price),
            ]
        })
        .collect();

    let mut widths = header.map(str::len);
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |values: [&str; 4]| {
        let padded: Vec<String> = values
            .iter()
            .zip(widths)
            .map(|(v, w)| format!("{v:<w$}"))
            .collect();
        format!("{}\n", padded.join("  ").trim_end())
    };

    let mut out = line(header);
    out.push_str(&line(widths.map(|w| "─".repeat(w)).each_ref().map(String::as_str)));
    for row in &cells {
        out.push_str(&line(row.each_ref().map(String::as_str)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_are_aligned() {
        let text = render_stats(&Stats {
            users: 10,
            products: 100,
            view_rows: 100,
            orphans: 0,
        });
        assert_eq!(
            text,
            "users        10\nproducts     100\nview rows    100\norphans      0\n"
        );
    }

    #[test]
    fn rows_table_pads_columns() {
        let rows = vec![
            UserProductView {
                user_name: "User1".into(),
                product_id: 7,
                product_name: "Product1-7".into(),
                price: 2.5,
            },
            UserProductView {
                user_name: "User10".into(),
                product_id: 91,
                product_name: "Product10-1".into(),
                price: 99.5,
            },
        ];
        let text = render_rows(&rows);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "user_name  product_id  product_name  price");
        assert_eq!(lines[2], "User1      7           Product1-7    2.50");
        assert_eq!(lines[3], "User10     91          Product10-1   99.50");
    }

    #[test]
    fn empty_rows_render_placeholder() {
        assert_eq!(render_rows(&[]), "(no rows)\n");
    }
}
