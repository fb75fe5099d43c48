use std::time::Duration;

/// Настройки подключения к NATS JetStream.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct JetStreamConfig {
    pub url: String,
    /// Stream создаётся при подключении, если его ещё нет.
    pub stream: String,
    pub subject: String,
    /// Durable consumer: позиция чтения переживает рестарт процесса.
    pub durable: String,
    /// Через сколько неподтверждённое сообщение будет доставлено повторно.
    pub ack_wait_secs: u64,
    pub max_inflight: usize,
}

impl Default for JetStreamConfig {
    fn default() -> Self {
        Self {
            url: "nats://127.0.0.1:4222".into(),
            stream: "ORDERS".into(),
            subject: "orders".into(),
            durable: "orders-mirror".into(),
            ack_wait_secs: 30,
            max_inflight: 64,
        }
    }
}

impl JetStreamConfig {
    pub fn ack_wait(&self) -> Duration {
        Duration::from_secs(self.ack_wait_secs.max(1))
    }
}
