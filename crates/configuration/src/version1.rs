//! Version 1 of the configuration directory format.
//!
//! A configuration directory holds `configuration.json` with the compiler
//! options, `schema.json` with the entities, and optionally `links.json` with
//! the declared relationship links.

use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::fs;

use query_engine_metadata::metadata::{Links, Schema};
use query_engine_sql::sql::dialect::Dialect;

use crate::error::{ParseConfigurationError, WriteParsedConfigurationError};

pub const CONFIGURATION_FILENAME: &str = "configuration.json";
pub const SCHEMA_FILENAME: &str = "schema.json";
pub const LINKS_FILENAME: &str = "links.json";
const CONFIGURATION_JSONSCHEMA_FILENAME: &str = "configuration.schema.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, JsonSchema)]
pub enum Version {
    #[default]
    #[serde(rename = "1")]
    This,
}

/// Everything a configuration directory declares.
///
/// Only the options live in `configuration.json`; the schema and the links
/// are read from their own files.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParsedConfiguration {
    /// Which version of the configuration format are we using
    pub version: Version,
    /// Reject queries whose sources cannot all be joined, instead of cross joining them.
    #[serde(default)]
    pub strict: bool,
    /// The SQL dialect to generate.
    #[serde(default)]
    pub dialect: Dialect,
    #[serde(skip)]
    pub schema: Schema,
    #[serde(skip)]
    pub links: Links,
}

impl ParsedConfiguration {
    pub fn initial() -> Self {
        ParsedConfiguration::default()
    }
}

/// Read a configuration directory. A missing `links.json` means no links.
pub async fn parse_configuration(
    configuration_dir: impl AsRef<Path>,
) -> Result<ParsedConfiguration, ParseConfigurationError> {
    let configuration_dir = configuration_dir.as_ref();

    let mut parsed_config: ParsedConfiguration =
        read_json(&configuration_dir.join(CONFIGURATION_FILENAME)).await?;
    parsed_config.schema = read_json(&configuration_dir.join(SCHEMA_FILENAME)).await?;

    let links_file = configuration_dir.join(LINKS_FILENAME);
    if fs::try_exists(&links_file).await.unwrap_or(false) {
        parsed_config.links = read_json(&links_file).await?;
    }

    tracing::debug!(
        dir = %configuration_dir.display(),
        entities = parsed_config.schema.entities.len(),
        "parsed configuration"
    );
    Ok(parsed_config)
}

async fn read_json<T: serde::de::DeserializeOwned>(
    file_path: &Path,
) -> Result<T, ParseConfigurationError> {
    let contents =
        fs::read_to_string(file_path)
            .await
            .map_err(|err| ParseConfigurationError::IoError {
                file_path: file_path.to_path_buf(),
                message: err.to_string(),
            })?;
    serde_json::from_str(&contents).map_err(|error| ParseConfigurationError::ParseError {
        file_path: file_path.to_path_buf(),
        line: error.line(),
        column: error.column(),
        message: error.to_string(),
    })
}

/// Write a configuration directory, along with the JSON schema of `configuration.json`.
pub async fn write_parsed_configuration(
    parsed_config: ParsedConfiguration,
    out_dir: impl AsRef<Path>,
) -> Result<(), WriteParsedConfigurationError> {
    let out_dir = out_dir.as_ref();
    fs::create_dir_all(out_dir).await?;

    write_json(&parsed_config, &out_dir.join(CONFIGURATION_FILENAME)).await?;
    write_json(&parsed_config.schema, &out_dir.join(SCHEMA_FILENAME)).await?;
    write_json(&parsed_config.links, &out_dir.join(LINKS_FILENAME)).await?;

    let output = schemars::schema_for!(ParsedConfiguration);
    write_json(&output, &out_dir.join(CONFIGURATION_JSONSCHEMA_FILENAME)).await?;

    Ok(())
}

async fn write_json<T: Serialize>(
    value: &T,
    file_path: &Path,
) -> Result<(), WriteParsedConfigurationError> {
    let contents = serde_json::to_string_pretty(value).map_err(|err| {
        WriteParsedConfigurationError::Serialization {
            file: file_path.display().to_string(),
            message: err.to_string(),
        }
    })? + "\n";
    fs::write(file_path, contents).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"{
        "entities": {
            "regions": {
                "table_name": "region",
                "fields": {
                    "region_id": { "type": "integer", "primary_key": true },
                    "region_description": { "type": "text" }
                }
            }
        }
    }"#;

    #[tokio::test]
    async fn options_default_when_omitted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIGURATION_FILENAME), r#"{ "version": "1" }"#)
            .await
            .unwrap();
        fs::write(dir.path().join(SCHEMA_FILENAME), SCHEMA)
            .await
            .unwrap();

        let parsed = parse_configuration(dir.path()).await.unwrap();
        assert!(!parsed.strict);
        assert_eq!(parsed.dialect, Dialect::Postgres);
        assert!(parsed.links.0.is_empty());
        assert!(parsed.schema.entities.contains_key("regions"));
    }

    #[tokio::test]
    async fn unknown_versions_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIGURATION_FILENAME), r#"{ "version": "2" }"#)
            .await
            .unwrap();
        fs::write(dir.path().join(SCHEMA_FILENAME), SCHEMA)
            .await
            .unwrap();

        let error = parse_configuration(dir.path()).await.unwrap_err();
        assert!(matches!(error, ParseConfigurationError::ParseError { .. }));
    }

    #[tokio::test]
    async fn a_missing_schema_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIGURATION_FILENAME), r#"{ "version": "1" }"#)
            .await
            .unwrap();

        let error = parse_configuration(dir.path()).await.unwrap_err();
        assert!(matches!(error, ParseConfigurationError::IoError { .. }));
    }

    #[tokio::test]
    async fn written_configurations_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut parsed = ParsedConfiguration::initial();
        parsed.strict = true;
        parsed.dialect = Dialect::Sqlite;
        parsed.schema = serde_json::from_str(SCHEMA).unwrap();

        write_parsed_configuration(parsed.clone(), dir.path())
            .await
            .unwrap();
        assert!(dir.path().join(CONFIGURATION_JSONSCHEMA_FILENAME).exists());

        let read_back = parse_configuration(dir.path()).await.unwrap();
        similar_asserts::assert_eq!(read_back, parsed);
    }
}
