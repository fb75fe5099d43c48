use clap::Args;

use orders_transport_jetstream::JetStreamConfig;

// ═══════════════════════════════════════════════════════════════
//  CLI args
// ═══════════════════════════════════════════════════════════════

#[derive(Args, Clone, Debug)]
pub struct PublishArgs {
    /// JSON документ заказа
    #[arg(long, default_value = "model.json", env = "ORDER_FILE")]
    pub file: String,

    #[arg(long, default_value = "nats://127.0.0.1:4222", env = "NATS_URL")]
    pub nats_url: String,

    #[arg(long, default_value = "orders", env = "NATS_SUBJECT")]
    pub subject: String,

    /// Stream создаётся, если его ещё нет
    #[arg(long, default_value = "ORDERS", env = "NATS_STREAM")]
    pub stream: String,
}

impl PublishArgs {
    pub fn channel(&self) -> JetStreamConfig {
        JetStreamConfig {
            url: self.nats_url.clone(),
            stream: self.stream.clone(),
            subject: self.subject.clone(),
            ..JetStreamConfig::default()
        }
    }
}
