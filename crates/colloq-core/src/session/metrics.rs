//! Per-session activity metrics derived from message metadata.

use super::message::Message;
use serde::{Deserialize, Serialize};

/// Derived statistics for one session, recomputed whenever it gains a message.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub total_messages: usize,
    /// Mean of the server-reported processing times; 0 when none were reported.
    pub average_processing_time_ms: f64,
    /// Timestamp of the most recent message.
    pub last_activity: Option<String>,
}

impl SessionMetrics {
    pub fn from_messages(messages: &[Message]) -> Self {
        let timings: Vec<f64> = messages
            .iter()
            .filter_map(Message::processing_time_ms)
            .collect();

        let average_processing_time_ms = if timings.is_empty() {
            0.0
        } else {
            timings.iter().sum::<f64>() / timings.len() as f64
        };

        Self {
            total_messages: messages.len(),
            average_processing_time_ms,
            last_activity: messages.last().map(|m| m.timestamp.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MessageMetadata;

    #[test]
    fn test_empty_session_metrics() {
        let metrics = SessionMetrics::from_messages(&[]);
        assert_eq!(metrics, SessionMetrics::default());
    }

    #[test]
    fn test_average_ignores_messages_without_timing() {
        let timed = |ms: f64| {
            Message::assistant("reply").with_metadata(MessageMetadata {
                processing_time_ms: Some(ms),
                ..Default::default()
            })
        };
        let messages = vec![Message::user("q1"), timed(100.0), Message::user("q2"), timed(300.0)];

        let metrics = SessionMetrics::from_messages(&messages);
        assert_eq!(metrics.total_messages, 4);
        assert_eq!(metrics.average_processing_time_ms, 200.0);
        assert_eq!(
            metrics.last_activity.as_deref(),
            Some(messages[3].timestamp.as_str())
        );
    }
}
