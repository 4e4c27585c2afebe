use crate::utils::format::format_float;
use crate::{Result, SteamboatError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::debug;

/// Parse a YAML file into `T`
pub fn read_yaml<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    debug!("Reading YAML from {}", path.display());
    let reader = BufReader::new(File::open(path)?);
    serde_yaml::from_reader(reader)
        .map_err(|e| SteamboatError::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Write `value` to a YAML file
pub fn write_yaml<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    debug!("Writing YAML to {}", path.display());
    let writer = BufWriter::new(File::create(path)?);
    serde_yaml::to_writer(writer, value)?;
    Ok(())
}

/// A YAML scalar kept as the text it renders to in an output table
///
/// Submission constants are often written unquoted (`capacity_mgd: 0.0`,
/// `population_served: 12000`), so numbers and booleans are accepted and
/// rendered back to text. Null renders as an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Scalar(pub String);

impl Scalar {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar(s.to_string())
    }
}

impl From<Scalar> for String {
    fn from(s: Scalar) -> Self {
        s.0
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        use serde::de::Error;
        use serde_yaml::Value;

        let text = match Value::deserialize(deserializer)? {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::String(s) => s,
            Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
                (Some(i), _, _) => i.to_string(),
                (_, Some(u), _) => u.to_string(),
                (_, _, Some(f)) => format_float(f),
                _ => n.to_string(),
            },
            Value::Tagged(tagged) => {
                return Err(D::Error::custom(format!(
                    "expected a scalar, found tagged value {}",
                    tagged.tag
                )))
            }
            Value::Sequence(_) | Value::Mapping(_) => {
                return Err(D::Error::custom("expected a scalar, found a collection"))
            }
        };
        Ok(Scalar(text))
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
