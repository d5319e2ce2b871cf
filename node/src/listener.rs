//! # Event Listener
//!
//! Turns committed blocks into [`NodeEvent`]s. Chaincode events are decoded
//! into typed [`ContractEvent`]s before they leave the gateway; events that
//! fail to decode are logged and dropped. Subscribers (the logging task and
//! WebSocket clients) read from one broadcast channel.

use serde::Serialize;
use tokio::sync::broadcast;

use datamarket_contracts::ContractEvent;
use datamarket_protocol::storage::CommitReceipt;

use crate::metrics::SharedMetrics;

/// Events pushed to subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum NodeEvent {
    /// A transaction was committed as a new block.
    #[serde(rename = "block_committed")]
    BlockCommitted {
        height: u64,
        tx_id: String,
        chaincode: String,
        timestamp: String,
    },
    /// A chaincode event carried by a committed transaction.
    #[serde(rename = "contract_event")]
    Contract {
        block_number: u64,
        tx_id: String,
        chaincode: String,
        #[serde(flatten)]
        event: ContractEvent,
    },
}

#[derive(Clone)]
pub struct EventListener {
    tx: broadcast::Sender<NodeEvent>,
    metrics: SharedMetrics,
}

impl EventListener {
    pub fn new(tx: broadcast::Sender<NodeEvent>, metrics: SharedMetrics) -> Self {
        Self { tx, metrics }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NodeEvent> {
        self.tx.subscribe()
    }

    /// Publishes a committed transaction and its decoded events. Returns the
    /// number of contract events published.
    pub fn publish(&self, chaincode: &str, receipt: &CommitReceipt) -> usize {
        // No subscribers is not an error.
        let _ = self.tx.send(NodeEvent::BlockCommitted {
            height: receipt.block_number,
            tx_id: receipt.tx_id.clone(),
            chaincode: chaincode.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        });

        let events = decode_events(receipt);
        let count = events.len();
        for event in events {
            let _ = self.tx.send(event);
        }
        self.metrics.events_published_total.inc_by(count as u64);
        count
    }
}

/// Decodes every chaincode event in a receipt, skipping undecodable ones.
pub fn decode_events(receipt: &CommitReceipt) -> Vec<NodeEvent> {
    receipt
        .events
        .iter()
        .filter_map(|raw| match ContractEvent::decode(&raw.name, &raw.payload) {
            Ok(event) => Some(NodeEvent::Contract {
                block_number: receipt.block_number,
                tx_id: raw.tx_id.clone(),
                chaincode: raw.chaincode.clone(),
                event,
            }),
            Err(e) => {
                tracing::warn!(
                    tx_id = %raw.tx_id,
                    chaincode = %raw.chaincode,
                    event = %raw.name,
                    error = %e,
                    "dropping undecodable event"
                );
                None
            }
        })
        .collect()
}

/// Logs events until the channel closes.
pub async fn run(mut rx: broadcast::Receiver<NodeEvent>) {
    loop {
        match rx.recv().await {
            Ok(NodeEvent::BlockCommitted {
                height,
                tx_id,
                chaincode,
                ..
            }) => {
                tracing::debug!(height, %tx_id, %chaincode, "block committed");
            }
            Ok(NodeEvent::Contract {
                block_number,
                tx_id,
                event,
                ..
            }) => log_event(block_number, &tx_id, &event),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!("event listener lagged by {} events", n);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    tracing::info!("event listener stopped");
}

fn log_event(block_number: u64, tx_id: &str, event: &ContractEvent) {
    match event {
        ContractEvent::Upload(e) => tracing::info!(
            block_number,
            tx_id,
            id = %e.id,
            owner = %e.owner,
            upload_time = e.upload_time,
            "uploadEvent"
        ),
        ContractEvent::Share(e) => tracing::info!(
            block_number,
            tx_id,
            id = %e.id,
            from = %e.from,
            to = %e.to,
            "shareEvent"
        ),
        ContractEvent::Transfer(e) => tracing::info!(
            block_number,
            tx_id,
            sender = %e.sender,
            recipient = %e.recipient,
            amount = e.amount,
            "transferEvent"
        ),
    }
}
