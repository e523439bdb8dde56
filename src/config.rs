//! Optional YAML configuration and the merge of CLI flags over it.
//!
//! ```yaml
//! source: data/best_selling_video_games.csv
//! delimiter: ","
//! encoding: utf-8
//! top: 10
//! completeness: all-columns
//! ```
//!
//! Precedence: command-line flag, then config file, then built-in default.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use log::debug;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    aggregate::DEFAULT_TOP_N,
    cli::{SourceArgs, parse_delimiter},
    io_utils,
    pipeline::PrepareOptions,
    validate::Completeness,
};

pub const DEFAULT_SOURCE: &str = "best_selling_video_games.csv";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LensConfig {
    pub source: Option<PathBuf>,
    pub delimiter: Option<String>,
    pub encoding: Option<String>,
    pub top: Option<usize>,
    pub completeness: Option<Completeness>,
}

impl LensConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = load_yaml(path)?;
        // a relative source is relative to the config file, not the cwd
        Ok(match (&config.source, path.parent()) {
            (Some(source), Some(dir)) if source.is_relative() && !io_utils::is_dash(source) => {
                Self {
                    source: Some(dir.join(source)),
                    ..config
                }
            }
            _ => config,
        })
    }
}

pub fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("Opening YAML file {path:?}"))?;
    serde_yaml::from_str(&raw).with_context(|| format!("Parsing YAML file {path:?}"))
}

/// Effective settings for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub source: PathBuf,
    pub options: PrepareOptions,
    pub top: usize,
}

pub fn resolve_settings(args: &SourceArgs, top: Option<usize>) -> Result<Settings> {
    let config = match &args.config {
        Some(path) => {
            LensConfig::load(path).with_context(|| format!("Loading config from {path:?}"))?
        }
        None => LensConfig::default(),
    };
    debug!("Config: {config:?}");

    let source = args
        .input
        .clone()
        .or(config.source)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE));
    let configured_delimiter = config
        .delimiter
        .as_deref()
        .map(|value| parse_delimiter(value).map_err(|err| anyhow!("Config delimiter: {err}")))
        .transpose()?;
    let delimiter =
        io_utils::resolve_input_delimiter(&source, args.delimiter.or(configured_delimiter));
    let encoding = io_utils::resolve_encoding(
        args.input_encoding
            .as_deref()
            .or(config.encoding.as_deref()),
    )?;
    let completeness = args
        .completeness
        .or(config.completeness)
        .unwrap_or_default();

    Ok(Settings {
        source,
        options: PrepareOptions {
            delimiter,
            encoding,
            completeness,
        },
        top: top.or(config.top).unwrap_or(DEFAULT_TOP_N),
    })
}
