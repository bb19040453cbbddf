use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use dict::{
    config::load_settings_from, Dict, DictCache, DictOptions, DictService, HttpDictRequest,
    LoadDictOpts,
};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = dict::config::SETTINGS_FILE)]
    config: PathBuf,
    /// Overrides `request_base_url` from the settings.
    #[arg(long)]
    base_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Loads a dictionary and prints its items.
    Dict {
        url: String,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Resolves values to labels through a dictionary.
    Labels {
        url: String,
        values: Vec<String>,
        #[command(flatten)]
        fields: FieldArgs,
    },
}

#[derive(clap::Args, Debug)]
struct FieldArgs {
    #[arg(long, default_value = "value")]
    value_field: String,
    #[arg(long, default_value = "label")]
    label_field: String,
    #[arg(long, default_value = "children")]
    children_field: String,
    #[arg(long)]
    tree: bool,
}

impl FieldArgs {
    fn options(self, url: String) -> DictOptions {
        DictOptions {
            value: self.value_field,
            label: self.label_field,
            children: self.children_field,
            is_tree: self.tree,
            ..DictOptions::with_url(url)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings_from(&cli.config, |key| std::env::var(key).ok());
    if let Some(base_url) = cli.base_url {
        settings.request_base_url = Some(base_url);
    }
    let request = HttpDictRequest::from_settings(&settings)?
        .ok_or_else(|| anyhow!("no dictionary base url; pass --base-url or set request_base_url"))?;
    info!(base_url = %request.base_url(), "using dictionary backend");
    let service = DictService::with_cache(
        Arc::new(request),
        Arc::new(DictCache::from_settings(&settings)),
    );

    match cli.command {
        Command::Dict { url, fields } => {
            let dict = Dict::new(fields.options(url.clone()), service);
            let data = dict
                .load_dict(LoadDictOpts::default())
                .await
                .with_context(|| format!("loading dictionary {url}"))?
                .unwrap_or_default();
            println!("{}", serde_json::to_string_pretty(data.as_slice())?);
            info!(items = data.len(), indexed = dict.data_map().len(), "dictionary loaded");
        }
        Command::Labels {
            url,
            values,
            fields,
        } => {
            let dict = Dict::new(fields.options(url.clone()), service);
            dict.load_dict(LoadDictOpts::default())
                .await
                .with_context(|| format!("loading dictionary {url}"))?;
            let values: Vec<Value> = values
                .iter()
                .map(|raw| serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone())))
                .collect();
            for node in dict.get_nodes_from_data_map(&Value::Array(values)) {
                let value = dict.get_value(&node).cloned().unwrap_or(Value::Null);
                let label = dict.get_label(&node).cloned().unwrap_or(Value::Null);
                println!("{value}\t{label}");
            }
        }
    }

    Ok(())
}
