use std::env;
use std::sync::LazyLock;

/// The environment the API is deployed in, read from `SRL_API_ENVIRONMENT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Local,
    Staging,
    Production,
}

impl Environment {
    pub fn is_local(&self) -> bool {
        matches!(self, Environment::Local)
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "local" => Some(Environment::Local),
            "staging" => Some(Environment::Staging),
            "production" => Some(Environment::Production),
            _ => None,
        }
    }
}

pub fn current() -> Environment {
    static ENV: LazyLock<Environment> = LazyLock::new(|| match env::var("SRL_API_ENVIRONMENT") {
        Ok(value) => Environment::parse(&value).unwrap_or_else(|| {
            warn!(value, "invalid `SRL_API_ENVIRONMENT`, using 'local'");
            Environment::Local
        }),
        Err(env::VarError::NotPresent) => Environment::Local,
        Err(env::VarError::NotUnicode(raw)) => {
            warn!(?raw, "`SRL_API_ENVIRONMENT` is not a UTF-8 string, using 'local'");
            Environment::Local
        },
    });

    *ENV
}
