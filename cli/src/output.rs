//! Output utilities for CLI tools.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// YAML format (default).
    #[default]
    Yaml,
    /// JSON format.
    Json,
}

impl OutputFormat {
    /// Picks JSON when `json` is set, YAML otherwise.
    pub fn from_json_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Yaml }
    }
}

/// Where and how structured results are printed.
pub struct Output {
    pub format: OutputFormat,
    pub file: Option<String>,
}

impl Output {
    /// Creates a new output configuration.
    pub fn new(format: OutputFormat, file: Option<String>) -> Self {
        Self { format, file }
    }

    /// Renders `value` in the configured format.
    pub fn render<T: Serialize>(&self, value: &T) -> anyhow::Result<String> {
        Ok(match self.format {
            OutputFormat::Yaml => serde_yaml::to_string(value)?,
            OutputFormat::Json => serde_json::to_string_pretty(value)?,
        })
    }

    /// Writes `value` to the output file, or stdout if none is set.
    pub fn write<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        let output = self.render(value)?;
        match &self.file {
            Some(path) => write_file(path, output.as_bytes()),
            None => {
                println!("{}", output.trim_end());
                Ok(())
            }
        }
    }
}

/// Writes binary data to a file, replacing it.
pub fn write_file(path: impl AsRef<Path>, data: &[u8]) -> anyhow::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_render_formats() {
        let value: BTreeMap<&str, &str> = [("current_context", "prod")].into_iter().collect();

        let yaml = Output::new(OutputFormat::from_json_flag(false), None);
        assert_eq!(yaml.render(&value).unwrap(), "current_context: prod\n");

        let json = Output::new(OutputFormat::from_json_flag(true), None);
        assert_eq!(
            json.render(&value).unwrap(),
            "{\n  \"current_context\": \"prod\"\n}"
        );
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        let output = Output::new(OutputFormat::Json, Some(path.to_string_lossy().into_owned()));
        output.write(&vec![1, 2]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[\n  1,\n  2\n]");
    }
}
