//! Worker profiles (all eight fields) and function pages (one field's rows)
//! stored as YAML.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ProfileError;
use crate::fields::{FieldGroup, FieldSet, Row};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionPage {
    /// Field the rows were taken from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<FieldGroup>,
    #[serde(default)]
    pub rows: Vec<Row>,
}

fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<(), ProfileError> {
    let text = serde_yaml::to_string(value).map_err(|err| ProfileError::Yaml {
        path: path.to_path_buf(),
        err,
    })?;
    fs::write(path, text).map_err(|err| ProfileError::Io {
        path: path.to_path_buf(),
        err,
    })
}

fn read_yaml<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ProfileError> {
    let text = fs::read_to_string(path).map_err(|err| ProfileError::Io {
        path: path.to_path_buf(),
        err,
    })?;
    serde_yaml::from_str(&text).map_err(|err| ProfileError::Yaml {
        path: path.to_path_buf(),
        err,
    })
}

pub fn save_profile(path: impl AsRef<Path>, fields: &FieldSet) -> Result<(), ProfileError> {
    let doc: BTreeMap<FieldGroup, &[Row]> = fields.iter().collect();
    write_yaml(path.as_ref(), &doc)?;
    log::info!("saved profile to {}", path.as_ref().display());
    Ok(())
}

/// Fields missing from the file come back empty.
pub fn load_profile(path: impl AsRef<Path>) -> Result<FieldSet, ProfileError> {
    let doc: BTreeMap<FieldGroup, Vec<Row>> = read_yaml(path.as_ref())?;
    let mut fields = FieldSet::new();
    for (field, rows) in doc {
        fields.set_rows(field, rows);
    }
    Ok(fields)
}

pub fn save_page(path: impl AsRef<Path>, field: FieldGroup, rows: &[Row]) -> Result<(), ProfileError> {
    let page = FunctionPage {
        field: Some(field),
        rows: rows.to_vec(),
    };
    write_yaml(path.as_ref(), &page)
}

pub fn load_page(path: impl AsRef<Path>) -> Result<FunctionPage, ProfileError> {
    read_yaml(path.as_ref())
}
