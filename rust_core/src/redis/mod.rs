pub mod bus;
pub mod pubsub_reconnect;
pub mod transport;

pub use bus::RedisBus;
pub use pubsub_reconnect::{spawn_subscriber, ReconnectConfig, SubscriptionCommand};
pub use transport::RedisTransport;
