use anyhow::Result;

use crate::report::EntityRow;

pub fn entities_to_csv(rows: &[EntityRow]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["name", "subscribers", "checked_at", "classification", "stale"])?;
    for row in rows {
        writer.write_record([
            row.name.clone(),
            row.subscribers.to_string(),
            row.checked_at.to_rfc3339(),
            row.classification.as_str().to_string(),
            row.stale
                .map(|reason| format!("{reason:?}").to_lowercase())
                .unwrap_or_default(),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}
