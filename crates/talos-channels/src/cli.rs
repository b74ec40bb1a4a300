use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, Notify, mpsc};
use tracing::{debug, info};

use crate::adapter::*;

type Reader = Box<dyn AsyncBufRead + Send + Unpin>;
type Writer = Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>;

const PROMPT: &str = "Me: ";

/// Interactive terminal channel.
///
/// Prints `Me: `, reads one line, hands it to the bot and waits for the
/// reply (`Bot: ...`) before prompting again. EOF, `exit` or `quit` ends
/// the session.
pub struct CliChannel {
    id: String,
    reader: Mutex<Option<Reader>>,
    writer: Writer,
    turn: Arc<Notify>,
    connected: Arc<AtomicBool>,
    shutdown_tx: Option<tokio::sync::watch::Sender<bool>>,
}

impl CliChannel {
    /// A channel on the process's stdin and stdout.
    pub fn new() -> Self {
        Self::with_io(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }

    /// A channel on arbitrary streams.
    pub fn with_io(
        reader: impl AsyncBufRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        Self {
            id: "cli".into(),
            reader: Mutex::new(Some(Box::new(reader))),
            writer: Arc::new(Mutex::new(Box::new(writer))),
            turn: Arc::new(Notify::new()),
            connected: Arc::new(AtomicBool::new(false)),
            shutdown_tx: None,
        }
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

async fn write_out(writer: &Writer, text: &str) -> std::io::Result<()> {
    let mut w = writer.lock().await;
    w.write_all(text.as_bytes()).await?;
    w.flush().await
}

fn io_error(e: std::io::Error) -> talos_core::TalosError {
    talos_core::TalosError::Channel {
        channel: "cli".into(),
        reason: e.to_string(),
    }
}

#[async_trait]
impl Channel for CliChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn channel_type(&self) -> &str {
        "cli"
    }

    async fn start(&mut self) -> talos_core::Result<mpsc::Receiver<ChannelEvent>> {
        let mut reader = self.reader.get_mut().take().ok_or_else(|| talos_core::TalosError::Channel {
            channel: "cli".into(),
            reason: "already started".into(),
        })?;
        let (event_tx, event_rx) = mpsc::channel(16);
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
        self.shutdown_tx = Some(shutdown_tx);

        let writer = Arc::clone(&self.writer);
        let turn = Arc::clone(&self.turn);
        let connected = Arc::clone(&self.connected);
        let channel_id = self.id.clone();
        connected.store(true, Ordering::SeqCst);
        let _ = event_tx.send(ChannelEvent::Connected).await;

        tokio::spawn(async move {
            let mut counter: u64 = 0;
            let mut line = String::new();
            let reason = loop {
                if write_out(&writer, PROMPT).await.is_err() {
                    break Some("stdout closed".to_string());
                }

                line.clear();
                let read = tokio::select! {
                    _ = shutdown_rx.changed() => break None,
                    read = reader.read_line(&mut line) => read,
                };
                match read {
                    Ok(0) => break Some("end of input".to_string()),
                    Ok(_) => {}
                    Err(e) => break Some(e.to_string()),
                }

                let text = line.trim();
                if text.is_empty() {
                    continue;
                }
                if text.eq_ignore_ascii_case("exit") || text.eq_ignore_ascii_case("quit") {
                    break None;
                }

                counter += 1;
                let incoming = IncomingMessage {
                    id: counter.to_string(),
                    channel: channel_id.clone(),
                    sender: "user".into(),
                    sender_name: None,
                    target: "stdout".into(),
                    text: text.to_string(),
                    metadata: serde_json::Value::Null,
                };
                debug!(text = %incoming.text, "CLI message received");
                if event_tx.send(ChannelEvent::Message(incoming)).await.is_err() {
                    break None;
                }

                // Wait for the reply before prompting again.
                tokio::select! {
                    _ = shutdown_rx.changed() => break None,
                    _ = turn.notified() => {}
                }
            };

            connected.store(false, Ordering::SeqCst);
            let _ = event_tx.send(ChannelEvent::Disconnected(reason)).await;
            info!("CLI channel closed");
        });

        Ok(event_rx)
    }

    async fn send(&self, message: OutgoingMessage) -> talos_core::Result<()> {
        let result = write_out(&self.writer, &format!("Bot: {}\n", message.text)).await;
        self.turn.notify_one();
        result.map_err(io_error)
    }

    async fn stop(&mut self) -> talos_core::Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
