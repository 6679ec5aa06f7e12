//! Configuração do leadflow carregada a partir de `leadflow.toml`.
//!
//! A struct [`LeadflowConfig`] contém todos os parâmetros configuráveis,
//! agrupados em seções `[logging]`, `[store]` e `[notifications]`.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! Variáveis de ambiente `LEADFLOW_*` têm precedência sobre o arquivo.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::LeadflowError;

/// Nome do arquivo procurado no diretório atual quando `--config` não é informado.
pub const DEFAULT_CONFIG_FILE: &str = "leadflow.toml";

/// Configuração de nível superior carregada de `leadflow.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LeadflowConfig {
    pub logging: LoggingConfig,
    pub store: StoreConfig,
    pub notifications: NotificationsConfig,
}

/// Formato de saída dos logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Diretiva de filtro no formato do `EnvFilter` (ex.: "info", "leadflow=debug").
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Arquivo JSON onde leads, vendas e métricas são persistidos.
    pub data_file: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("leadflow-data.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Quando falso, notificações vão apenas para o log.
    pub enabled: bool,
    /// URL do webhook de chat. Sem URL, notificações vão apenas para o log.
    pub webhook_url: Option<String>,
    pub team_channel: String,
    pub wins_channel: String,
    pub loss_review_channel: String,
    /// Timeout de cada requisição ao webhook, em segundos.
    pub timeout_secs: u64,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            webhook_url: None,
            team_channel: "sales-team".to_string(),
            wins_channel: "sales-wins".to_string(),
            loss_review_channel: "loss-review".to_string(),
            timeout_secs: 10,
        }
    }
}

impl NotificationsConfig {
    /// URL do webhook a usar, se as notificações estiverem habilitadas.
    pub fn active_webhook(&self) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        self.webhook_url.as_deref().filter(|url| !url.is_empty())
    }
}

impl LeadflowConfig {
    /// Carrega a configuração do caminho indicado, ou de `leadflow.toml` no
    /// diretório atual. Usa valores padrão se o arquivo não existir.
    pub fn load(path: Option<&Path>) -> Result<Self, LeadflowError> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<LeadflowConfig>(&contents)?
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Aplica as variáveis de ambiente por cima dos valores do arquivo.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("LEADFLOW_WEBHOOK_URL")
            && !url.is_empty()
        {
            self.notifications.webhook_url = Some(url);
        }
        if let Some(level) = lookup("LEADFLOW_LOG_LEVEL")
            && !level.is_empty()
        {
            self.logging.level = level;
        }
        if let Some(file) = lookup("LEADFLOW_DATA_FILE")
            && !file.is_empty()
        {
            self.store.data_file = PathBuf::from(file);
        }
    }

    fn validate(&self) -> Result<(), LeadflowError> {
        if self.notifications.timeout_secs == 0 {
            return Err(LeadflowError::Config(
                "notifications.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.store.data_file.as_os_str().is_empty() {
            return Err(LeadflowError::Config(
                "store.data_file must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
