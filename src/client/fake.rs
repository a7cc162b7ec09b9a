use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use super::session::BrokerSession;
use crate::utils::error::BrokerError;

/// In-process stand-in for a broker connection.
#[derive(Debug, Default)]
pub(crate) struct FakeSession {
    pub connected: AtomicBool,
    pub fail_with: Mutex<Option<String>>,
    pub published: Mutex<Vec<(String, String)>>,
    pub subscribed: Mutex<Vec<String>>,
    pub unsubscribed: Mutex<Vec<String>>,
}

impl FakeSession {
    pub fn connected() -> Self {
        let session = Self::default();
        session.connected.store(true, Ordering::SeqCst);
        session
    }

    /// Every later call fails as if the broker rejected it on `topic`.
    pub fn reject(&self, topic: &str) {
        *self.fail_with.lock().unwrap() = Some(topic.to_string());
    }

    fn check(&self) -> Result<(), BrokerError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(BrokerError::NotConnected);
        }
        match self.fail_with.lock().unwrap().as_ref() {
            Some(topic) => Err(BrokerError::Rejected(topic.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BrokerSession for FakeSession {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn publish(&self, topic: &str, body: &str) -> Result<(), BrokerError> {
        self.check()?;
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), body.to_string()));
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<(), BrokerError> {
        self.check()?;
        self.subscribed.lock().unwrap().push(topic.to_string());
        Ok(())
    }

    async fn unsubscribe(&self, topic: &str) -> Result<(), BrokerError> {
        self.check()?;
        self.unsubscribed.lock().unwrap().push(topic.to_string());
        Ok(())
    }
}

/// Minimal MQTT 3.1.1 broker on a local socket, enough for one client at a
/// time: it answers CONNECT, SUBSCRIBE, UNSUBSCRIBE and PINGREQ, records
/// inbound publishes, and can push frames or drop the connection on demand.
#[derive(Debug, Default)]
pub(crate) struct FakeBroker {
    pub connections: AtomicUsize,
    /// CONNECTs after this is set get a "not authorized" CONNACK.
    pub refuse: AtomicBool,
    /// Subscribes stay unanswered while this is set.
    pub hold_acks: AtomicBool,
    pub rejected: Mutex<HashSet<String>>,
    pub subscribes: Mutex<Vec<String>>,
    pub publishes: Mutex<Vec<(String, usize)>>,
    current: Mutex<Option<mpsc::UnboundedSender<Frame>>>,
}

#[derive(Debug)]
enum Frame {
    Bytes(Vec<u8>),
    Close,
}

impl FakeBroker {
    /// Binds an ephemeral port and accepts connections in the background.
    pub async fn start() -> (Arc<Self>, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let broker = Arc::new(Self::default());

        let accepting = broker.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                accepting.connections.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(accepting.clone().serve(stream));
            }
        });
        (broker, port)
    }

    pub fn reject(&self, topic: &str) {
        self.rejected.lock().unwrap().insert(topic.to_string());
    }

    /// Sends a QoS 0 PUBLISH to the connected client.
    pub fn deliver(&self, topic: &str, payload: &[u8]) {
        let mut body = Vec::with_capacity(2 + topic.len() + payload.len());
        body.extend_from_slice(&(topic.len() as u16).to_be_bytes());
        body.extend_from_slice(topic.as_bytes());
        body.extend_from_slice(payload);
        self.send(Frame::Bytes(frame(0x30, &body)));
    }

    /// Closes the current connection without a DISCONNECT.
    pub fn drop_connection(&self) {
        self.send(Frame::Close);
    }

    fn send(&self, frame: Frame) {
        if let Some(tx) = self.current.lock().unwrap().as_ref() {
            let _ = tx.send(frame);
        }
    }

    async fn serve(self: Arc<Self>, stream: TcpStream) {
        let (mut reader, mut writer) = stream.into_split();
        let (tx, mut rx) = mpsc::unbounded_channel();
        *self.current.lock().unwrap() = Some(tx.clone());

        let broker = self.clone();
        let reading = tokio::spawn(async move {
            while let Ok((header, body)) = read_packet(&mut reader).await {
                broker.handle(header, &body, &tx);
            }
            let _ = tx.send(Frame::Close);
        });

        while let Some(frame) = rx.recv().await {
            match frame {
                Frame::Bytes(bytes) => {
                    if writer.write_all(&bytes).await.is_err() {
                        break;
                    }
                }
                Frame::Close => break,
            }
        }
        reading.abort();
    }

    fn handle(&self, header: u8, body: &[u8], tx: &mpsc::UnboundedSender<Frame>) {
        let reply = |bytes: Vec<u8>| {
            let _ = tx.send(Frame::Bytes(bytes));
        };

        match header >> 4 {
            // CONNECT
            1 => {
                if self.refuse.load(Ordering::SeqCst) {
                    reply(vec![0x20, 0x02, 0x00, 0x05]);
                    let _ = tx.send(Frame::Close);
                } else {
                    reply(vec![0x20, 0x02, 0x00, 0x00]);
                }
            }
            // PUBLISH, QoS 0 only
            3 => {
                let len = u16::from_be_bytes([body[0], body[1]]) as usize;
                let topic = String::from_utf8_lossy(&body[2..2 + len]).to_string();
                let payload = body.len() - 2 - len;
                self.publishes.lock().unwrap().push((topic, payload));
            }
            // SUBSCRIBE
            8 => {
                let len = u16::from_be_bytes([body[2], body[3]]) as usize;
                let topic = String::from_utf8_lossy(&body[4..4 + len]).to_string();
                let code = if self.rejected.lock().unwrap().contains(&topic) {
                    0x80
                } else {
                    0x01
                };
                self.subscribes.lock().unwrap().push(topic);
                if !self.hold_acks.load(Ordering::SeqCst) {
                    reply(vec![0x90, 0x03, body[0], body[1], code]);
                }
            }
            // UNSUBSCRIBE
            10 => reply(vec![0xB0, 0x02, body[0], body[1]]),
            // PINGREQ
            12 => reply(vec![0xD0, 0x00]),
            // DISCONNECT
            14 => {
                let _ = tx.send(Frame::Close);
            }
            _ => {}
        }
    }
}

fn frame(header: u8, body: &[u8]) -> Vec<u8> {
    let mut out = vec![header];
    let mut len = body.len();
    loop {
        let mut byte = (len % 128) as u8;
        len /= 128;
        if len > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if len == 0 {
            break;
        }
    }
    out.extend_from_slice(body);
    out
}

async fn read_packet(reader: &mut OwnedReadHalf) -> std::io::Result<(u8, Vec<u8>)> {
    let header = reader.read_u8().await?;
    let mut len = 0usize;
    let mut shift = 0;
    loop {
        let byte = reader.read_u8().await?;
        len |= ((byte & 0x7f) as usize) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    let mut body = vec![0; len];
    reader.read_exact(&mut body).await?;
    Ok((header, body))
}
