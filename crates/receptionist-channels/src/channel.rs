use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChannelStatus, InboundMessage, OutboundMessage};

/// Common interface implemented by every channel adapter (voice, SMS,
/// website, test console).
///
/// The core itself never speaks a wire protocol:
/// an adapter's only job is turning a platform payload into an
/// [`InboundMessage`] the orchestrator can process, and delivering an
/// [`OutboundMessage`] back out once `process_turn` returns.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Stable lowercase identifier, e.g. `"voice"`, `"sms"`, `"test"`.
    fn name(&self) -> &str;

    /// Deliver the agent's reply to the caller.
    async fn send(&self, msg: &OutboundMessage) -> Result<()>;

    /// Current runtime status, without blocking.
    fn status(&self) -> ChannelStatus;
}

/// In-memory adapter used by the admin test console and integration tests
/// (spec.md §6.1 channel `"test"`): replies are captured rather than sent
/// anywhere, so a caller of `process_turn` can assert on what would have
/// been said.
pub struct TestConsoleAdapter {
    sent: tokio::sync::Mutex<Vec<OutboundMessage>>,
}

impl TestConsoleAdapter {
    pub fn new() -> Self {
        Self {
            sent: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    /// Drain every reply delivered since the adapter was created or last drained.
    pub async fn drain(&self) -> Vec<OutboundMessage> {
        let mut guard = self.sent.lock().await;
        std::mem::take(&mut *guard)
    }
}

impl Default for TestConsoleAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelAdapter for TestConsoleAdapter {
    fn name(&self) -> &str {
        "test"
    }

    async fn send(&self, msg: &OutboundMessage) -> Result<()> {
        self.sent.lock().await.push(msg.clone());
        Ok(())
    }

    fn status(&self) -> ChannelStatus {
        ChannelStatus::Connected
    }
}

pub fn inbound(channel: &str, identifier: &str, text: &str) -> InboundMessage {
    InboundMessage {
        channel: channel.to_string(),
        identifier: identifier.to_string(),
        text: text.to_string(),
        caller_id: None,
        call_sid: None,
        received_at: chrono::Utc::now().to_rfc3339(),
        pre_extracted_slots: std::collections::HashMap::new(),
        force_new_session: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_console_adapter_captures_sent_replies() {
        let adapter = TestConsoleAdapter::new();
        adapter
            .send(&OutboundMessage {
                channel: "test".to_string(),
                identifier: "tok-1".to_string(),
                text: "hello".to_string(),
                requires_transfer: false,
            })
            .await
            .unwrap();

        let drained = adapter.drain().await;
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].text, "hello");
        // A second drain with nothing new sent returns empty, not stale data.
        assert!(adapter.drain().await.is_empty());
    }
}
