use std::fmt;

use serde::{Deserialize, Serialize};

/// Processor architecture targeted by application code.
///
/// Each architecture selects the registry view (32-bit or 64-bit) that
/// unpackaged applications built for it are recorded in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    X64,
    X86,
}

impl Architecture {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X64 => "x64",
            Self::X86 => "x86",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "x64" => Some(Self::X64),
            "x86" => Some(Self::X86),
            _ => None,
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
