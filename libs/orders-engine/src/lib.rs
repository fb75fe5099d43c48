pub mod bootstrap;
pub mod cache;
pub mod error;
pub mod ingest;
pub mod normalize;
pub mod reader;
mod subscriber;

pub use bootstrap::{warm_start, WarmStartPolicy};
pub use cache::MirrorCache;
pub use error::{EngineError, NormalizeError};
pub use ingest::{IngestSnapshot, Ingestor, Outcome};
pub use normalize::{normalize, NormalizedOrder};
pub use reader::{LookupError, OrderReader};
pub use subscriber::{spawn_subscriber, SubscriberConfig};
