//! Configuration file support

use chatline_session::{
    DEFAULT_APOLOGY, DEFAULT_GREETING, DEFAULT_MAX_FILE_SIZE, Features, SessionConfig,
    SuggestionCard, Theme, default_cards,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Endpoint used when neither the config file nor `--endpoint` names one
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/stream";

/// Configuration for chatline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub features: FeatureFlags,
    pub ui: UiConfig,
    pub chat: ChatConfig,
    pub suggestion_cards: Vec<SuggestionCard>,
}

/// Feature switches; everything is on unless turned off
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub file_upload: bool,
    pub chat_history: bool,
    pub message_editing: bool,
    pub theme_switching: bool,
    pub show_context: bool,
    pub show_suggestion_cards: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub initial_theme: Theme,
    pub company_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_signature: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Greeting shown in a fresh conversation
    pub initial_message: String,
    /// Per-file attachment limit in bytes
    pub max_file_size: u64,
    pub api_endpoint: String,
    /// Overall request timeout; unset means wait as long as the stream runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    /// Bot turn shown when a request fails
    pub error_message: String,
    pub assistant: AssistantConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub name: String,
    /// Shown at startup when history is not being saved
    pub warning_message: String,
    pub placeholder_text: String,
    pub edit_placeholder_text: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            features: FeatureFlags::default(),
            ui: UiConfig::default(),
            chat: ChatConfig::default(),
            suggestion_cards: default_cards(),
        }
    }
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            file_upload: true,
            chat_history: true,
            message_editing: true,
            theme_switching: true,
            show_context: true,
            show_suggestion_cards: true,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            initial_theme: Theme::Light,
            company_name: "Chatline".to_string(),
            author_signature: None,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            initial_message: DEFAULT_GREETING.to_string(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            api_endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_secs: None,
            error_message: DEFAULT_APOLOGY.to_string(),
            assistant: AssistantConfig::default(),
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            name: "Chat Assistant".to_string(),
            warning_message: "Chat history is not saved".to_string(),
            placeholder_text: "Type your message...".to_string(),
            edit_placeholder_text: "Edit message...".to_string(),
        }
    }
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chatline")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        // Check for CHATLINE_CONFIG_PATH env var first
        if let Ok(path) = std::env::var("CHATLINE_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from file
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Save config to file
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::config_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        Config::default().save()?;
        Ok(path)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.chat.request_timeout_secs.map(Duration::from_secs)
    }

    /// Session settings derived from this config
    pub fn session_config(&self) -> SessionConfig {
        let flags = &self.features;
        SessionConfig {
            greeting: self.chat.initial_message.clone(),
            apology: self.chat.error_message.clone(),
            features: Features {
                file_upload: flags.file_upload,
                chat_history: flags.chat_history,
                message_editing: flags.message_editing,
                theme_switching: flags.theme_switching,
                show_context: flags.show_context,
                show_suggestion_cards: flags.show_suggestion_cards,
            },
            suggestions: self.suggestion_cards.clone(),
            max_file_size: self.chat.max_file_size,
            theme: self.ui.initial_theme,
        }
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# chatline configuration file
# Place at ~/.config/chatline/config.toml (Linux), or point CHATLINE_CONFIG_PATH at it

[features]
file_upload = true
# Save the conversation between runs
chat_history = true
message_editing = true
theme_switching = true
show_context = true
show_suggestion_cards = true

[ui]
# "light" or "dark"
initial_theme = "light"
company_name = "Chatline"
# author_signature = "..."

[chat]
initial_message = "Hello! How can I help you today?"
# Bytes; 5 MiB by default
max_file_size = 5242880
api_endpoint = "http://localhost:8000/stream"
# request_timeout_secs = 120
error_message = "Sorry, there was an error processing your request."

[chat.assistant]
name = "Chat Assistant"
warning_message = "Chat history is not saved"
placeholder_text = "Type your message..."
edit_placeholder_text = "Edit message..."

[[suggestion_cards]]
icon = "lightbulb"
title = "Code Analysis"
question = "Can you review my code for potential improvements?"

[[suggestion_cards]]
icon = "code"
title = "Debug Help"
question = "I'm getting an error in my code. Can you help me fix it?"
"#
}
