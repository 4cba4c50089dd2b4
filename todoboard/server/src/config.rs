use serde::Deserialize;
use std::collections::HashMap;

/// Server configuration, read once from the process environment at start-up.
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string (`DATABASE_URL`). Required.
    pub database_url: String,
    /// The single web origin allowed to call the API (`WEB_URL`).
    #[serde(default = "default_web_url")]
    pub web_url: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Config {
    /// Loads configuration from environment variables, falling back to a `.env`
    /// file for anything the process environment does not set.
    pub fn from_env() -> anyhow::Result<Self> {
        let dotenv_vars = collect_dotenv(dotenvy::dotenv_iter())?;
        Self::from_sources(dotenv_vars, config::Environment::default())
    }

    #[cfg(test)]
    fn from_environment(environment: config::Environment) -> anyhow::Result<Self> {
        Self::from_sources(HashMap::new(), environment)
    }

    fn from_sources(
        dotenv_vars: HashMap<String, String>,
        environment: config::Environment,
    ) -> anyhow::Result<Self> {
        // Later sources win, so real environment variables override the file.
        let settings = config::Config::builder()
            .add_source(config::Environment::default().source(Some(dotenv_vars.into_iter().collect())))
            .add_source(environment)
            .build()?;

        let config: Config = settings.try_deserialize()?;
        Ok(config)
    }
}

/// Reads the entries of a `.env` file. A missing file yields no entries.
fn collect_dotenv(
    found: dotenvy::Result<dotenvy::Iter<std::fs::File>>,
) -> anyhow::Result<HashMap<String, String>> {
    match found {
        Ok(entries) => Ok(entries.collect::<Result<_, _>>()?),
        Err(err) if err.not_found() => Ok(HashMap::new()),
        Err(err) => Err(err.into()),
    }
}

fn default_web_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_port() -> u16 {
    8000
}
