pub const BASE_MIGRATION: &str = r#"
CREATE TABLE IF NOT EXISTS subreddits (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name VARCHAR(80) NOT NULL,
    checked_date TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    subscribers INTEGER NOT NULL DEFAULT -1,
    UNIQUE (name)
);
"#;
