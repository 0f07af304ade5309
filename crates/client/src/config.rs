//! Run configuration read from the process environment.

use std::path::PathBuf;
use std::str::FromStr;

use sim_content::Archetype;

/// Report format written to stdout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format '{other}'")),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunConfig {
    pub archetype: Archetype,
    pub data_dir: Option<PathBuf>,
    pub seed: Option<u64>,
    pub duration_ms: Option<u64>,
    /// Runs with consecutive seeds; the report averages them.
    pub iterations: u32,
    pub output: OutputFormat,
    pub session_id: Option<String>,
    pub log_dir: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            archetype: Archetype::Feral,
            data_dir: None,
            seed: None,
            duration_ms: None,
            iterations: 1,
            output: OutputFormat::Text,
            session_id: None,
            log_dir: None,
        }
    }
}

impl RunConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `SIM_ARCHETYPE` - `feral` or `caster` (default: feral)
    /// - `SIM_DATA_DIR` - Directory shadowing the embedded content
    /// - `SIM_SEED` - Outcome seed (default: from content)
    /// - `SIM_DURATION_MS` - Run length (default: from content)
    /// - `SIM_ITERATIONS` - Number of seeded runs (default: 1)
    /// - `SIM_OUTPUT` - `text` or `json` (default: text)
    /// - `SIM_SESSION_ID` - Log session name (default: timestamp)
    /// - `SIM_LOG_DIR` - Log root (default: platform cache directory)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(archetype) = read(&lookup, "SIM_ARCHETYPE") {
            config.archetype = archetype;
        }
        config.data_dir = lookup("SIM_DATA_DIR").map(PathBuf::from);
        config.seed = read(&lookup, "SIM_SEED");
        config.duration_ms = read(&lookup, "SIM_DURATION_MS");
        if let Some(iterations) = read::<u32>(&lookup, "SIM_ITERATIONS") {
            config.iterations = iterations.max(1);
        }
        if let Some(output) = read(&lookup, "SIM_OUTPUT") {
            config.output = output;
        }
        config.session_id = lookup("SIM_SESSION_ID");
        config.log_dir = lookup("SIM_LOG_DIR").map(PathBuf::from);

        config
    }
}

fn read<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: FromStr,
{
    lookup(key)?.trim().parse().ok()
}
