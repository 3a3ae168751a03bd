//! Broker abstraction used by publishing workers.

use std::future::Future;

use crate::error::Result;
use crate::session::BrokerSession;

/// The operations a publishing worker needs from a broker connection.
///
/// [`BrokerSession`] is the production implementation; workers are generic
/// over this trait so they can be driven against an in-memory broker.
pub trait Broker: Send + Sync {
    /// Whether a live connection is currently held.
    fn is_connected(&self) -> bool;

    /// Ensure a live connection, connecting if needed.
    fn connect(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Close the connection gracefully. No-op when disconnected.
    fn disconnect(&mut self) -> impl Future<Output = ()> + Send;

    /// Publish a payload to a topic.
    fn publish(&self, topic: &str, payload: String) -> impl Future<Output = Result<()>> + Send;
}

impl Broker for BrokerSession {
    fn is_connected(&self) -> bool {
        BrokerSession::is_connected(self)
    }

    async fn connect(&mut self) -> Result<()> {
        BrokerSession::connect(self).await
    }

    async fn disconnect(&mut self) {
        BrokerSession::disconnect(self).await
    }

    async fn publish(&self, topic: &str, payload: String) -> Result<()> {
        BrokerSession::publish(self, topic, payload).await
    }
}
