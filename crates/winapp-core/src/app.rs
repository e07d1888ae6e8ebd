use std::collections::HashSet;
use std::fmt;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use crate::attribute::{parse_decimal_u32, AttributeList, AttributeType};

/// Identifier of an unpackaged application or software component.
///
/// The identifier is used verbatim as the name of the application's registry
/// key. It is never escaped or normalized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct AppId(String);

impl AppId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks that the identifier can name a single registry key.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.0.is_empty() {
            return Err("application id must not be empty");
        }
        if self.0.contains('\\') {
            return Err("application id must not contain '\\'");
        }
        if self.0.contains('\0') {
            return Err("application id must not contain NUL characters");
        }
        Ok(())
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AppId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for AppId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for AppId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An unpackaged application or software component recorded in the
/// registry's list of installed programs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub id: AppId,
    #[serde(default)]
    pub attributes: AttributeList,
}

impl App {
    pub fn new(id: impl Into<AppId>, attributes: impl Into<AttributeList>) -> Self {
        Self {
            id: id.into(),
            attributes: attributes.into(),
        }
    }

    /// Parses an application manifest written in TOML.
    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        let app: Self = toml::from_str(input).context("failed to parse application manifest")?;
        app.id
            .validate()
            .map_err(|reason| anyhow!("invalid application id '{}': {reason}", app.id))?;

        let mut seen = HashSet::new();
        for attr in &app.attributes {
            if attr.name.trim().is_empty() {
                return Err(anyhow!(
                    "attribute name must not be empty for application '{}'",
                    app.id
                ));
            }
            if !seen.insert(attr.name.to_ascii_lowercase()) {
                return Err(anyhow!(
                    "duplicate attribute '{}' for application '{}'",
                    attr.name,
                    app.id
                ));
            }
            match attr.kind {
                AttributeType::String | AttributeType::Expand => {}
                AttributeType::Uint32 => {
                    if parse_decimal_u32(&attr.data).is_none() {
                        return Err(anyhow!(
                            "attribute '{}' for application '{}' is not a 32-bit unsigned decimal integer: {:?}",
                            attr.name,
                            app.id,
                            attr.data
                        ));
                    }
                }
                AttributeType::None => {
                    return Err(anyhow!(
                        "attribute '{}' for application '{}' must declare a type",
                        attr.name,
                        app.id
                    ));
                }
            }
        }
        Ok(app)
    }
}
