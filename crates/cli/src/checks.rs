//! Credential presence and validity probes

use product_scout_domain::KeyStatus;
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::config::AppConfig;
use crate::wiring::{brave_search, optional_api_key};

/// External services that need a credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    OpenAi,
    Gemini,
    Claude,
    Brave,
    Firecrawl,
}

impl Service {
    pub const ALL: [Service; 5] = [
        Service::OpenAi,
        Service::Gemini,
        Service::Claude,
        Service::Brave,
        Service::Firecrawl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Service::OpenAi => "openai",
            Service::Gemini => "gemini",
            Service::Claude => "claude",
            Service::Brave => "brave",
            Service::Firecrawl => "firecrawl",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Service::OpenAi => "OpenAI",
            Service::Gemini => "Gemini",
            Service::Claude => "Claude",
            Service::Brave => "Brave Search",
            Service::Firecrawl => "Firecrawl",
        }
    }

    pub fn api_key_env<'a>(&self, config: &'a AppConfig) -> &'a str {
        match self {
            Service::OpenAi => &config.llm.openai.api_key_env,
            Service::Gemini => &config.llm.gemini.api_key_env,
            Service::Claude => &config.llm.claude.api_key_env,
            Service::Brave => &config.search.brave.api_key_env,
            Service::Firecrawl => &config.search.firecrawl.api_key_env,
        }
    }
}

/// Probe one credential. Only Brave is checked against the live API.
pub async fn check_key(config: &AppConfig, service: Service) -> KeyStatus {
    let env_var = service.api_key_env(config);
    let Some(key) = optional_api_key(env_var, service.as_str()) else {
        return KeyStatus::missing(format!(
            "{} API key is not configured ({})",
            service.label(),
            env_var
        ));
    };

    match service {
        Service::OpenAi if !key.expose_secret().starts_with("sk-") => KeyStatus::missing(
            "OpenAI API key has incorrect format. It should start with 'sk-'",
        ),
        Service::Brave => match brave_search(config) {
            Some(brave) => brave.probe().await,
            None => KeyStatus::missing("Brave Search API key is not configured"),
        },
        _ => KeyStatus::configured(format!("{} API key is configured", service.label())),
    }
}

/// Presence of every credential, without probing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvCheck {
    pub openai: bool,
    pub gemini: bool,
    pub claude: bool,
    pub brave: bool,
    pub firecrawl: bool,
}

impl EnvCheck {
    pub fn is_set(&self, service: Service) -> bool {
        match service {
            Service::OpenAi => self.openai,
            Service::Gemini => self.gemini,
            Service::Claude => self.claude,
            Service::Brave => self.brave,
            Service::Firecrawl => self.firecrawl,
        }
    }
}

pub fn env_check(config: &AppConfig) -> EnvCheck {
    let present = |service: Service| {
        optional_api_key(service.api_key_env(config), service.as_str()).is_some()
    };

    EnvCheck {
        openai: present(Service::OpenAi),
        gemini: present(Service::Gemini),
        claude: present(Service::Claude),
        brave: present(Service::Brave),
        firecrawl: present(Service::Firecrawl),
    }
}
