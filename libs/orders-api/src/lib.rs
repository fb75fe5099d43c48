pub mod channel;
pub mod error;
pub mod record;
pub mod store;

pub use channel::{Delivery, DeliveryStream};
pub use error::{ChannelError, StoreError};
pub use record::{OrderRecord, IDENTIFIER_FIELD};
pub use store::{OrderStore, RecordStream};
