use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Random,
    File,
}

impl SourceKind {
    pub fn parse(input: &str) -> Result<Self> {
        match input {
            "random" => Ok(Self::Random),
            "file" => Ok(Self::File),
            _ => anyhow::bail!("invalid source: {input} (expected random|file)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub sock_path: Option<String>,
    pub source: SourceKind,
    pub file: Option<PathBuf>,
    pub nodes: usize,
    pub edges: usize,
    pub max_position: f64,
    pub drift_interval: Duration,
    pub drift: f64,
    pub seed: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            sock_path: None,
            source: SourceKind::Random,
            file: None,
            nodes: 10,
            edges: 20,
            max_position: 1024.0,
            drift_interval: Duration::from_millis(3000),
            drift: 64.0,
            seed: None,
        }
    }
}

pub fn parse_args() -> Result<AgentConfig> {
    parse_args_from(std::env::args_os().skip(1))
}

fn parse_args_from<I>(args: I) -> Result<AgentConfig>
where
    I: IntoIterator<Item = OsString>,
{
    let mut config = AgentConfig::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let Some(flag) = arg.to_str() else {
            anyhow::bail!("unknown argument: {:?}", arg);
        };
        match flag {
            "--socket" => config.sock_path = Some(value_of(&mut args, flag)?),
            "--source" => config.source = SourceKind::parse(&value_of(&mut args, flag)?)?,
            "--file" => config.file = Some(PathBuf::from(value_of(&mut args, flag)?)),
            "--nodes" => config.nodes = parsed(&mut args, flag)?,
            "--edges" => config.edges = parsed(&mut args, flag)?,
            "--max-position" => config.max_position = parsed(&mut args, flag)?,
            "--drift-ms" => config.drift_interval = Duration::from_millis(parsed(&mut args, flag)?),
            "--drift" => config.drift = parsed(&mut args, flag)?,
            "--seed" => config.seed = Some(parsed(&mut args, flag)?),
            _ => anyhow::bail!("unknown argument: {:?}", arg),
        }
    }

    if config.source == SourceKind::File && config.file.is_none() {
        anyhow::bail!("--source file expects --file <path>");
    }
    if !(config.max_position.is_finite() && config.max_position > 0.0) {
        anyhow::bail!("--max-position must be a positive number");
    }
    if !(config.drift.is_finite() && config.drift >= 0.0) {
        anyhow::bail!("--drift must be zero or a positive number");
    }
    if config.drift > 0.0 && config.drift_interval.is_zero() {
        anyhow::bail!("--drift-ms must be non-zero while drift is enabled");
    }

    Ok(config)
}

fn value_of<I>(args: &mut I, flag: &str) -> Result<String>
where
    I: Iterator<Item = OsString>,
{
    let Some(value) = args.next() else {
        anyhow::bail!("{flag} expects a value");
    };
    Ok(value.to_string_lossy().into_owned())
}

fn parsed<I, T>(args: &mut I, flag: &str) -> Result<T>
where
    I: Iterator<Item = OsString>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = value_of(args, flag)?;
    raw.parse::<T>()
        .with_context(|| format!("{flag}: invalid value {raw:?}"))
}
