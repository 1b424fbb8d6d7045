use crate::domain::model::EnrichedSubject;
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

/// Writes the merged records as paired CSV and JSON exports under
/// `output_dir`. Unknown fields export as empty/null, not zero.
pub fn write_outputs(records: &[EnrichedSubject], output_dir: &str) -> Result<(PathBuf, PathBuf)> {
    let dir = Path::new(output_dir);
    std::fs::create_dir_all(dir)?;

    let csv_path = dir.join("enriched.csv");
    let mut writer = csv::Writer::from_path(&csv_path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    let json_path = dir.join("enriched.json");
    std::fs::write(&json_path, serde_json::to_string_pretty(records)?)?;

    tracing::info!("Exported {} records to {}", records.len(), dir.display());
    Ok((csv_path, json_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: u64, favorites: Option<u64>) -> EnrichedSubject {
        EnrichedSubject {
            id,
            up_votes: Some(10),
            down_votes: Some(2),
            favorites,
            favorites_degraded: false,
            is_paid_access: None,
            price: None,
        }
    }

    #[test]
    fn test_write_outputs_round_trip() {
        let temp = TempDir::new().unwrap();
        let records = vec![record(10, Some(5)), record(30, None)];

        let (csv_path, json_path) =
            write_outputs(&records, temp.path().to_str().unwrap()).unwrap();

        let csv_content = std::fs::read_to_string(&csv_path).unwrap();
        let mut lines = csv_content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,up_votes,down_votes,favorites,favorites_degraded,is_paid_access,price"
        );
        assert_eq!(lines.next().unwrap(), "10,10,2,5,false,,");
        assert_eq!(lines.next().unwrap(), "30,10,2,,false,,");

        let parsed: Vec<EnrichedSubject> =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(parsed, records);
    }
}
