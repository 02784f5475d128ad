//! Bridge from the synchronous broadcast channel to async consumers
//!
//! This module subscribes to the broadcast channel and forwards every
//! completed metric onto a tokio channel, so a UI task can `recv().await`
//! metrics instead of registering a callback.

use crate::broadcast::{BroadcastChannel, Subscription};
use colloq_core::telemetry::Metric;
use tokio::sync::mpsc;

/// Forwards metrics to an existing sender.
pub fn forward_to_sender(
    channel: &BroadcastChannel,
    sender: mpsc::UnboundedSender<Metric>,
) -> Subscription {
    channel.subscribe(move |metric| {
        // Non-blocking send - if the receiver is dropped, we just skip
        let _ = sender.send(metric.clone());
    })
}

/// Creates a fresh unbounded channel and forwards metrics into it.
pub fn forward_to_channel(
    channel: &BroadcastChannel,
) -> (Subscription, mpsc::UnboundedReceiver<Metric>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (forward_to_sender(channel, sender), receiver)
}
