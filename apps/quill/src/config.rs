//! Application configuration loaded from environment variables.

use std::env;
use std::fmt;
use std::str::FromStr;

use anyhow::Context;
use uuid::Uuid;

/// Where posts are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Process-local store, lost on exit.
    Memory,
    Postgres,
    /// PostgREST endpoint (Supabase).
    Rest,
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "rest" | "supabase" => Ok(Self::Rest),
            other => anyhow::bail!("unknown backend '{other}' (expected memory, postgres or rest)"),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Memory => "memory",
            Self::Postgres => "postgres",
            Self::Rest => "rest",
        })
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: Backend,
    /// Bearer token of the signed-in user.
    pub access_token: Option<String>,
    /// Signs in as this user without a token.
    pub user_id: Option<Uuid>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let backend = match non_empty("QUILL_BACKEND") {
            Some(value) => value.parse()?,
            None => Self::infer_backend(),
        };

        let user_id = non_empty("QUILL_USER_ID")
            .map(|s| Uuid::parse_str(&s))
            .transpose()
            .context("QUILL_USER_ID must be a UUID")?;

        Ok(Self {
            backend,
            access_token: non_empty("QUILL_ACCESS_TOKEN"),
            user_id,
        })
    }

    /// A configured database wins over a configured REST endpoint.
    fn infer_backend() -> Backend {
        if non_empty("DATABASE_URL").is_some() {
            Backend::Postgres
        } else if non_empty("SUPABASE_URL").is_some() {
            Backend::Rest
        } else {
            Backend::Memory
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend() {
        assert_eq!("memory".parse::<Backend>().unwrap(), Backend::Memory);
        assert_eq!(" Postgres ".parse::<Backend>().unwrap(), Backend::Postgres);
        assert_eq!("supabase".parse::<Backend>().unwrap(), Backend::Rest);
        assert!("sqlite".parse::<Backend>().is_err());
    }

    #[test]
    fn test_backend_display_parses_back() {
        for backend in [Backend::Memory, Backend::Postgres, Backend::Rest] {
            assert_eq!(backend.to_string().parse::<Backend>().unwrap(), backend);
        }
    }
}
