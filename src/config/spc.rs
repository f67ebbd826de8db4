use crate::spc::SpcPoint;
use std::fs;
use std::path::Path;

/// Read a control-chart history: `[{"label": "...", "value": 1.5}, ...]`.
pub fn load_history(path: &Path) -> Result<Vec<SpcPoint>, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read history {}: {e}", path.display()))?;
    serde_json::from_str(&data)
        .map_err(|e| format!("Failed to parse history {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_values_default_to_zero() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"label": "2024-05-01", "value": 3.5}}, {{"label": "2024-05-02"}}]"#)
            .unwrap();
        let points = load_history(file.path()).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].value, 3.5);
        assert_eq!(points[1].value, 0.0);
    }

    #[test]
    fn malformed_history_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(load_history(file.path())
            .unwrap_err()
            .starts_with("Failed to parse history"));
    }
}
