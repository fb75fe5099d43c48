use orders_api::{ChannelError, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("config ({context}): {detail}")]
    Config { context: &'static str, detail: String },

    #[error("storage: {0}")]
    Store(#[from] StoreError),

    #[error("channel: {0}")]
    Channel(#[from] ChannelError),

    #[error("{0}")]
    Engine(#[from] orders_engine::EngineError),

    #[error("{0}")]
    Api(#[from] orders_api_server::ApiError),

    #[error("signal: {0}")]
    Signal(#[from] std::io::Error),
}
