use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use pw_dispatch_runtime::Schema;

use crate::cli::Cli;
use crate::schema::protocol_schema;

pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// Resolved server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Upper bound on graceful shutdown after the transport closes
    pub grace_period: Duration,
    /// Built-in schemes plus any loaded from `--schema`
    pub schema: Schema,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            grace_period: DEFAULT_GRACE_PERIOD,
            schema: protocol_schema(),
        }
    }
}

impl ServerConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut schema = protocol_schema();
        if let Some(path) = &cli.schema {
            let extra = load_schema_file(path)?;
            tracing::info!(path = %path.display(), schemes = extra.len(), "loaded extra schemes");
            schema.extend(extra);
        }
        Ok(Self {
            grace_period: Duration::from_secs(cli.grace_period),
            schema,
        })
    }
}

/// Reads a JSON object of scheme name → scheme description.
pub fn load_schema_file(path: &Path) -> Result<Schema> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read schema file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("invalid schema file {}", path.display()))
}
