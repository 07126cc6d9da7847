//! Get-values command - print the values of a release

use clap::ValueEnum;
use console::style;
use reledit_core::{Values, render_document};
use reledit_kube::{StorageDriver, ValueScope, ValuesQuery, resolve_values};

use crate::error::{CliError, Result};

/// Output format of the values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

/// Run the get-values command
pub async fn run<S: StorageDriver>(
    name: &str,
    namespace: &str,
    storage: S,
    all_values: bool,
    revision: u32,
    output: OutputFormat,
) -> Result<()> {
    let scope = ValueScope::from_all_flag(all_values);
    let values = resolve_values(&storage, namespace, name, &ValuesQuery::new(scope, revision)).await?;

    if output == OutputFormat::Yaml {
        let header = match scope {
            ValueScope::UserSupplied => "USER-SUPPLIED VALUES:",
            ValueScope::Computed => "COMPUTED VALUES:",
        };
        println!("{}", style(header).bold());
    }
    print!("{}", format_values(&values, output)?);

    Ok(())
}

/// Serialize values in the requested format, newline-terminated
pub fn format_values(values: &Values, output: OutputFormat) -> Result<String> {
    match output {
        OutputFormat::Yaml => Ok(render_document(values)?),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(values.inner()).map_err(|e| CliError::Codec {
                message: e.to_string(),
                help: None,
            })?;
            Ok(format!("{}\n", json))
        }
    }
}
