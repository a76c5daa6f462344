use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};

use crate::report::EntityRow;
use crate::tracking::Classification;

pub fn render_entities_table(rows: &[EntityRow]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Subreddit",
        "Subscribers",
        "Checked (UTC)",
        "Class",
        "Stale",
    ]);

    for row in rows {
        let class_cell = match row.classification {
            Classification::Above => Cell::new("ABOVE").fg(Color::Green),
            Classification::Below => Cell::new("BELOW").fg(Color::Red),
        };
        let subscribers = if row.subscribers < 0 {
            "?".to_string()
        } else {
            row.subscribers.to_string()
        };
        table.add_row(Row::from(vec![
            Cell::new(format!("/r/{}", row.name)),
            Cell::new(subscribers),
            Cell::new(row.checked_at.format("%Y-%m-%d %H:%M").to_string()),
            class_cell,
            Cell::new(
                row.stale
                    .map(|reason| format!("{reason:?}").to_lowercase())
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]));
    }
    table.to_string()
}
