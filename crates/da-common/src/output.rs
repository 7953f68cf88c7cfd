//! Payload formats for command output on stdout.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// How a command payload is written to stdout. Errors follow the same choice on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed JSON of the response record (default)
    #[default]
    Json,

    /// Short human-readable digest
    Summary,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Summary => "summary",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
