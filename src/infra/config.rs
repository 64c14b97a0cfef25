// src/infra/config.rs - Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::infra::paths;
use crate::provider::HarmBlockThreshold;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub sessions: SessionsConfig,

    #[serde(default)]
    pub topic: TopicConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served at `/` (index.html, script.js, ...).
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// Allowed browser origins. Empty means no CORS layer.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            static_dir: PathBuf::from("public"),
            max_upload_bytes: 10 * 1024 * 1024,
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub name: String,
    /// Gemini REST root; point at a proxy to route upstream traffic.
    pub base_url: String,
    /// Environment variable holding the Gemini API key.
    pub api_key_env: String,
    pub safety_threshold: HarmBlockThreshold,
    pub system_instruction: String,
    /// Prepended to the first text part of each request, never stored in history.
    pub context_prefix: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "gemini-1.5-flash".into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            api_key_env: "GEMINI_API_KEY".into(),
            safety_threshold: HarmBlockThreshold::BlockMediumAndAbove,
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.into(),
            context_prefix: DEFAULT_CONTEXT_PREFIX.into(),
        }
    }
}

const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are 'PakScholarship Assist', a specialized AI expert for Pakistani students seeking Master's scholarships abroad (UK, US, Germany, France, Italy, Finland, Japan, South Korea, China, Malaysia, Thailand, Indonesia, etc.). ONLY answer questions related to scholarships, eligibility, application processes, deadlines, and funding. If the user asks about unrelated topics, politely redirect them to ask about scholarships. Provide ACCURATE, FACTUAL, concise info. NEVER invent information. If details aren't known, state that clearly and suggest official sources.";

const DEFAULT_CONTEXT_PREFIX: &str =
    "This is a query about Master’s scholarships abroad for Pakistani students: ";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    /// Seconds a submitted prompt may wait for its stream to be opened.
    pub pending_timeout_secs: u64,
    pub upload_dir: PathBuf,
    /// Upper bound on role-tagged turns kept in conversation history.
    pub max_history_turns: usize,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            pending_timeout_secs: 60,
            upload_dir: PathBuf::from("uploads"),
            max_history_turns: 10,
        }
    }
}

impl SessionsConfig {
    pub fn pending_timeout(&self) -> Duration {
        Duration::from_secs(self.pending_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    /// Lower-cased question -> canned answer.
    pub faqs: BTreeMap<String, String>,
    pub keywords: Vec<String>,
    pub redirect_message: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        let faqs = DEFAULT_FAQS
            .iter()
            .map(|(q, a)| (q.to_string(), a.to_string()))
            .collect();
        Self {
            faqs,
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            redirect_message: DEFAULT_REDIRECT.into(),
        }
    }
}

const DEFAULT_FAQS: &[(&str, &str)] = &[
    ("what scholarships are available?", "I can help with scholarships for Pakistani students! Some options include Chevening (UK), DAAD (Germany), Fulbright (USA), Erasmus Mundus (Europe), and Australia Awards (Australia). Ask about a specific scholarship or country!"),
    ("hello", "Hello! I’m PakScholarship Assist, here to help Pakistani students find Master’s scholarships abroad. Ask me about scholarships like Chevening or DAAD!"),
    ("hi", "Hi there! I can help with Master’s scholarships for Pakistani students studying abroad. What would you like to know?"),
    ("thanks", "You’re welcome! Let me know if you have more questions about scholarships."),
    ("thank you", "You’re welcome! Feel free to ask more about scholarships for studying abroad."),
    ("help", "I can provide information about Master’s scholarships abroad for Pakistani students. Ask me about eligibility, application processes, deadlines, or specific countries like the UK, USA, Germany, etc."),
    ("what can you do?", "I’m PakScholarship Assist, specializing in Master’s scholarships for Pakistani students aiming to study overseas. I can help with eligibility, funding, deadlines, and more. Ask about scholarships like Chevening, DAAD, or Fulbright!"),
    ("how to apply for a scholarship?", "The application process depends on the scholarship. For example, Chevening requires an online application, essays, and references, while DAAD often needs a research proposal. Which scholarship are you interested in?"),
    ("what is the deadline for chevening?", "The deadline for the Chevening Scholarship is usually in November each year, likely November 2025 for the next cycle. Check their official website for exact dates: https://www.chevening.org."),
    ("what scholarships are available in germany?", "For Pakistani students, the DAAD Scholarship is a great option in Germany. It offers a monthly stipend, travel allowance, and insurance. Deadlines vary by program, so check https://www.daad.de for details."),
];

const DEFAULT_KEYWORDS: &[&str] = &[
    "scholarship",
    "master",
    "abroad",
    "funding",
    "study",
    "pakistani",
    "chevening",
    "daad",
    "fulbright",
    "erasmus",
    "australia awards",
    "uk",
    "usa",
    "germany",
    "europe",
    "australia",
    "japan",
    "korea",
    "malaysia",
];

const DEFAULT_REDIRECT: &str = "I’m PakScholarship Assist, here to help with Master’s scholarships abroad for Pakistani students! Please ask about scholarships, like Chevening, DAAD, or Fulbright.";

impl Config {
    /// Load config from file, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// `PORT` overrides the configured port, as most PaaS hosts expect.
    pub fn apply_env(&mut self) {
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
    }

    /// Read the Gemini key from the configured environment variable.
    pub fn api_key(&self) -> Result<String, crate::infra::errors::ChatError> {
        std::env::var(&self.model.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| crate::infra::errors::ChatError::MissingApiKey {
                var: self.model.api_key_env.clone(),
            })
    }
}
