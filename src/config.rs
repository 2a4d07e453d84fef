use anyhow::Context;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Runtime settings read from the environment (and `.env`, when present).
///
/// | Env Var                    | Default |
/// |----------------------------|---------|
/// | `DATABASE_URL`             | required |
/// | `DATABASE_MAX_CONNECTIONS` | `5`     |
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .context("DATABASE_URL must be set to a Postgres instance")?;

        let max_connections = match std::env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(value) => parse_max_connections(&value)?,
            Err(_) => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            database_url,
            max_connections,
        })
    }
}

fn parse_max_connections(value: &str) -> anyhow::Result<u32> {
    let parsed: u32 = value
        .trim()
        .parse()
        .with_context(|| format!("DATABASE_MAX_CONNECTIONS must be a number, got {value:?}"))?;
    anyhow::ensure!(parsed > 0, "DATABASE_MAX_CONNECTIONS must be at least 1");
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_connections_must_be_positive_number() {
        assert_eq!(parse_max_connections("12").unwrap(), 12);
        assert_eq!(parse_max_connections(" 3 ").unwrap(), 3);
        assert!(parse_max_connections("0").is_err());
        assert!(parse_max_connections("many").is_err());
    }
}
