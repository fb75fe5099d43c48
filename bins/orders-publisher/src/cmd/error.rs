use orders_api::ChannelError;
use orders_engine::NormalizeError;

#[derive(Debug, thiserror::Error)]
pub enum PublisherError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a valid order: {source}")]
    Invalid {
        path: String,
        #[source]
        source: NormalizeError,
    },

    #[error("{0}")]
    Channel(#[from] ChannelError),
}
