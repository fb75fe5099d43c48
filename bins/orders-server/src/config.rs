use std::path::Path;

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

use orders_engine::WarmStartPolicy;
use orders_storage_postgres::PgStoreConfig;
use orders_transport_jetstream::JetStreamConfig;

use crate::error::ServerError;

/// Конфиг, который читается если `--config` не указан.
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Parser)]
#[command(name = "orders-server", about = "Зеркало заказов: NATS JetStream → Postgres → кеш → HTTP")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Запустить сервер
    Serve(ServeArgs),
}

#[derive(Args, Clone, Debug, Default)]
pub struct ServeArgs {
    /// Путь к TOML конфиг файлу
    #[arg(long, env = "CONFIG_PATH")]
    pub config: Option<String>,

    /// Адрес NATS (перекрывает channel.url)
    #[arg(long, env = "NATS_URL")]
    pub nats_url: Option<String>,

    /// Subject заказов (перекрывает channel.subject)
    #[arg(long, env = "NATS_SUBJECT")]
    pub nats_subject: Option<String>,

    /// DSN Postgres (перекрывает storage.url)
    #[arg(long, env = "PG_DSN")]
    pub pg_dsn: Option<String>,

    /// Порт HTTP API
    #[arg(long, env = "API_PORT")]
    pub api_port: Option<u16>,
}

// ---- TOML Config ----

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    /// Верхняя граница `GET /api/orders?limit=`.
    #[serde(default = "default_list_limit")]
    pub list_limit: usize,
    #[serde(default)]
    pub warm_start: WarmStartPolicy,
    /// Сколько последних заказов поднимать в кеш при старте.
    #[serde(default = "default_warm_start_limit")]
    pub warm_start_limit: usize,
    /// Сколько ждать in-flight доставки при остановке.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
    #[serde(default)]
    pub channel: JetStreamConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_api_port() -> u16 {
    8080
}
fn default_list_limit() -> usize {
    500
}
fn default_warm_start_limit() -> usize {
    500
}
fn default_shutdown_grace_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageConfig {
    Postgres(PgStoreConfig),
    /// Без персистентности, данные теряются при рестарте.
    Memory,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Postgres(PgStoreConfig::default())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            list_limit: default_list_limit(),
            warm_start: WarmStartPolicy::default(),
            warm_start_limit: default_warm_start_limit(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            channel: JetStreamConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &str) -> Result<Self, ServerError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config { context: "read", detail: format!("'{path}': {e}") })?;
        toml::from_str(&content)
            .map_err(|e| ServerError::Config { context: "parse", detail: format!("'{path}': {e}") })
    }

    /// Файл конфига (явный или `config.toml`, если он есть) + CLI/env поверх.
    pub fn resolve(args: &ServeArgs) -> Result<Self, ServerError> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::load(DEFAULT_CONFIG_PATH)?,
            None => Self::default(),
        };
        config.apply_overrides(args)?;
        Ok(config)
    }

    fn apply_overrides(&mut self, args: &ServeArgs) -> Result<(), ServerError> {
        if let Some(url) = &args.nats_url {
            self.channel.url = url.clone();
        }
        if let Some(subject) = &args.nats_subject {
            self.channel.subject = subject.clone();
        }
        if let Some(port) = args.api_port {
            self.api_port = port;
        }
        if let Some(dsn) = &args.pg_dsn {
            match &mut self.storage {
                StorageConfig::Postgres(pg) => pg.url = dsn.clone(),
                StorageConfig::Memory => {
                    return Err(ServerError::Config {
                        context: "storage",
                        detail: "--pg-dsn given but storage.kind = \"memory\"".into(),
                    });
                }
            }
        }
        Ok(())
    }
}
