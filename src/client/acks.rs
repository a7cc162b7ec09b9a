//! Correlates subscribe/unsubscribe requests with the broker's acks.
//!
//! `rumqttc` assigns packet ids inside its event loop, so a request only
//! learns its id when the loop reports the packet as sent. Requests leave the
//! client's channel in the order they were queued; holding `order` across
//! enqueue + send keeps the local queue in that same order, and each
//! `Outgoing` event pops the oldest entry and files it under its packet id.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use rumqttc::ClientError;
use tokio::sync::oneshot;

use crate::utils::error::BrokerError;

type Outcome = Result<(), BrokerError>;

struct Waiter {
    topic: String,
    // None once the caller has been told the request failed
    reply: Option<oneshot::Sender<Outcome>>,
}

pub(crate) struct AckTracker {
    op: &'static str,
    order: tokio::sync::Mutex<()>,
    queued: Mutex<VecDeque<Waiter>>,
    inflight: Mutex<HashMap<u16, Waiter>>,
}

impl AckTracker {
    pub(crate) fn new(op: &'static str) -> Self {
        Self {
            op,
            order: tokio::sync::Mutex::new(()),
            queued: Mutex::new(VecDeque::new()),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Hands the request to `send` and waits up to `timeout` for the ack.
    pub(crate) async fn request<F, Fut>(
        &self,
        topic: &str,
        timeout: Duration,
        send: F,
    ) -> Outcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), ClientError>>,
    {
        let (tx, rx) = oneshot::channel();
        {
            let _order = self.order.lock().await;
            self.queued.lock().unwrap().push_back(Waiter {
                topic: topic.to_string(),
                reply: Some(tx),
            });
            if let Err(e) = send().await {
                // nothing was queued on the client, so the entry is still last
                self.queued.lock().unwrap().pop_back();
                return Err(e.into());
            }
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(BrokerError::ConnectionLost {
                op: self.op,
                topic: topic.to_string(),
            }),
            Err(_) => Err(BrokerError::Timeout {
                op: self.op,
                topic: topic.to_string(),
            }),
        }
    }

    /// The event loop wrote the oldest queued request as packet `pkid`.
    pub(crate) fn sent(&self, pkid: u16) {
        let waiter = self.queued.lock().unwrap().pop_front();
        if let Some(waiter) = waiter {
            self.inflight.lock().unwrap().insert(pkid, waiter);
        }
    }

    /// The broker answered packet `pkid`; `outcome` maps its topic to a result.
    pub(crate) fn settle(&self, pkid: u16, outcome: impl FnOnce(&str) -> Outcome) {
        let waiter = self.inflight.lock().unwrap().remove(&pkid);
        if let Some(Waiter {
            topic,
            reply: Some(reply),
        }) = waiter
        {
            let _ = reply.send(outcome(&topic));
        }
    }

    /// Fails every caller still waiting. Queued entries stay in place as
    /// placeholders: their requests are still in the client's channel and
    /// will produce `Outgoing` events once the connection comes back.
    pub(crate) fn fail_all(&self) {
        let op = self.op;
        let fail = |waiter: &mut Waiter| {
            if let Some(reply) = waiter.reply.take() {
                let _ = reply.send(Err(BrokerError::ConnectionLost {
                    op,
                    topic: waiter.topic.clone(),
                }));
            }
        };

        self.queued.lock().unwrap().iter_mut().for_each(&fail);
        let mut inflight = self.inflight.lock().unwrap();
        inflight.values_mut().for_each(&fail);
        inflight.clear();
    }

    #[cfg(test)]
    pub(crate) fn pending(&self) -> (usize, usize) {
        (
            self.queued.lock().unwrap().len(),
            self.inflight.lock().unwrap().len(),
        )
    }
}
