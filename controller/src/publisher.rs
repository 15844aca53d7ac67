use async_trait::async_trait;
use telemetry::Event;
use tokio::sync::mpsc;

/// A live-update channel the controller delivers events through. The
/// transport behind it (socket push, channel, stdout) is the implementor's
/// concern; events arrive one at a time, in order.
#[async_trait]
pub trait Publisher: Send + Sync + 'static {
    async fn publish(&self, event: Event);
}

/// Channel-backed publisher, the natural fit for in-process consumers and
/// tests.
#[async_trait]
impl Publisher for mpsc::UnboundedSender<Event> {
    async fn publish(&self, event: Event) {
        // A dropped receiver just means nobody is watching anymore.
        let _ = self.send(event);
    }
}
