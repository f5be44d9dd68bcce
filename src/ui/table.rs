use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Level")]
    pub level: String,
    #[tabled(rename = "Count")]
    pub count: String,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, level: &str, count: usize) {
        self.rows.push(TableRow {
            level: level.to_string(),
            count: count.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

/// Per-level counts followed by a total row
pub fn stats_table(stats: &crate::storage::LogStats) -> String {
    let mut builder = TableBuilder::new();
    for (level, count) in &stats.by_level {
        builder.add_row(level, *count);
    }
    builder.add_row("total", stats.total);
    builder.build()
}
