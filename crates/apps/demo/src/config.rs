use std::env;
use std::time::Duration;

use catalog::MapConfig;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about = "Interactive dataset session on an embedded map")]
pub struct Args {
    /// Map provider API key (default: $MAP_API_KEY, else "demo-key")
    #[arg(long)]
    pub api_key: Option<String>,

    /// Container the map mounts into (default: $MAP_CONTAINER, else "map")
    #[arg(long)]
    pub container: Option<String>,

    /// URL serving the sample pair as JSON (default: $SAMPLE_DATA_URL, else built-in samples)
    #[arg(long)]
    pub sample_url: Option<String>,

    /// Comma-separated commands to run after startup instead of reading stdin
    #[arg(long, value_delimiter = ',')]
    pub script: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub map: MapConfig,
    pub sample_url: Option<String>,
    pub fetch_timeout: Duration,
    pub map_init_delay: Duration,
    pub sample_delay: Duration,
    pub script: Option<Vec<String>>,
}

impl DemoConfig {
    pub fn from_env(args: Args) -> Self {
        Self::resolve(args, |key| env::var(key).ok())
    }

    /// Flags win over variables looked up through `var`.
    pub fn resolve(args: Args, var: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());
        let millis = |key: &str, default: u64| {
            Duration::from_millis(var_u64(&var, key, default))
        };

        let script: Vec<String> = args
            .script
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        Self {
            map: MapConfig {
                api_key: args
                    .api_key
                    .or_else(|| non_empty("MAP_API_KEY"))
                    .unwrap_or_else(|| "demo-key".to_string()),
                container: args
                    .container
                    .or_else(|| non_empty("MAP_CONTAINER"))
                    .unwrap_or_else(|| "map".to_string()),
            },
            sample_url: args.sample_url.or_else(|| non_empty("SAMPLE_DATA_URL")),
            fetch_timeout: Duration::from_secs(var_u64(&var, "SAMPLE_FETCH_TIMEOUT_SECS", 30)),
            map_init_delay: millis("MAP_INIT_DELAY_MS", 400),
            sample_delay: millis("SAMPLE_DELAY_MS", 150),
            script: (!script.is_empty()).then_some(script),
        }
    }
}

fn var_u64(var: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> u64 {
    var(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
