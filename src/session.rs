//! Active TN3270 session
//!
//! A [`Session`] owns one connection. A background task reads the socket,
//! answers telnet negotiation, frames records and decodes each one into the
//! shared [`Display3270`] while holding its lock, so callers never observe a
//! half-applied datastream. The methods on `Session` are the scripting
//! surface: stage text, press attention keys, query and wait on the screen.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, info, trace, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::SessionConfig;
use crate::error::{FieldError, NetworkError, TerminalError, Tn3270Result};
use crate::lib3270::display::addressing;
use crate::lib3270::encoder::{self, PendingWrites};
use crate::lib3270::{aid_for_key_name, Display3270, Field, PendingRead, ProtocolProcessor3270, RecordFramer};
use crate::network;
use crate::telnet_negotiation::TelnetNegotiator;

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;
type SharedWriter = Arc<tokio::sync::Mutex<BoxedWriter>>;

/// State shared between the session handle and its receive task
struct SharedState {
    display: Mutex<Display3270>,
    pending: Mutex<PendingWrites>,
    negotiator: Mutex<TelnetNegotiator>,
    /// Signalled after every decode pass and on disconnect
    changed: Notify,
    connected: AtomicBool,
}

impl SharedState {
    fn new(terminal_type: &str) -> Self {
        Self {
            display: Mutex::new(Display3270::new()),
            pending: Mutex::new(PendingWrites::new()),
            negotiator: Mutex::new(TelnetNegotiator::with_terminal_type(terminal_type)),
            changed: Notify::new(),
            connected: AtomicBool::new(true),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// The receive task never panics while holding a lock, but a caller's
/// predicate might; the screen is still consistent in that case.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Represents an active terminal session
pub struct Session {
    /// Unique session identifier
    id: String,
    config: SessionConfig,
    shared: Arc<SharedState>,
    writer: SharedWriter,
    reader: Option<JoinHandle<()>>,
}

impl Session {
    /// Connect to the host named in `config`, over TLS when it asks for it
    pub async fn connect(config: SessionConfig) -> Tn3270Result<Self> {
        config.validate()?;
        if config.tls_enabled() {
            let stream = network::connect_tls(&config).await?;
            return Self::from_stream(stream, config);
        }
        let stream =
            network::connect_with_timeout(&config.host, config.port, config.connect_timeout()).await?;
        Self::from_stream(stream, config)
    }

    /// Run a session over an already open byte stream.
    ///
    /// Must be called from within a tokio runtime.
    pub fn from_stream<S>(stream: S, config: SessionConfig) -> Tn3270Result<Self>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        config.validate()?;
        let (read_half, write_half) = tokio::io::split(stream);
        let writer: SharedWriter = Arc::new(tokio::sync::Mutex::new(Box::new(write_half)));
        let shared = Arc::new(SharedState::new(&config.terminal_type));

        let reader = tokio::spawn(receive_loop(
            read_half,
            Arc::clone(&shared),
            Arc::clone(&writer),
            config.read_buffer_size,
        ));

        let id = uuid::Uuid::new_v4().to_string();
        info!("Session {id} started for {}:{}", config.host, config.port);

        Ok(Self {
            id,
            config,
            shared,
            writer,
            reader: Some(reader),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.shared.is_connected()
    }

    /// BINARY and END-OF-RECORD have both been agreed
    pub fn is_3270_mode(&self) -> bool {
        lock(&self.shared.negotiator).is_3270_mode()
    }

    /// Press an attention key with the cursor at 1-based (row, col).
    ///
    /// Waits for the keyboard to unlock, then sends the AID, the cursor
    /// address and everything staged with [`Session::set_text`].
    pub async fn send_key(&self, key: &str, row: usize, col: usize) -> Tn3270Result<()> {
        let aid = aid_for_key_name(key).ok_or_else(|| TerminalError::UnknownAttentionKey {
            key: key.to_string(),
        })?;
        let position = addressing::coordinates_to_position(row, col)?;
        self.submit(aid, key, Some(position)).await
    }

    /// Press an attention key with the cursor wherever the host left it
    pub async fn send_key_at_cursor(&self, key: &str) -> Tn3270Result<()> {
        let aid = aid_for_key_name(key).ok_or_else(|| TerminalError::UnknownAttentionKey {
            key: key.to_string(),
        })?;
        self.submit(aid, key, None).await
    }

    async fn submit(&self, aid: u8, key: &str, position: Option<usize>) -> Tn3270Result<()> {
        self.wait_until_unlocked().await?;

        let record = {
            let mut display = lock(&self.shared.display);
            let position = position.unwrap_or_else(|| display.cursor_address());
            display.lock_keyboard();
            let staged = lock(&self.shared.pending).take();
            encoder::encode_attention(aid, position, &staged)?
        };

        debug!("Sending {key} ({} bytes)", record.len());
        trace!("Outbound: {record:02X?}");
        if let Err(e) = write_record(&self.writer, &record).await {
            self.mark_disconnected();
            return Err(e.into());
        }
        Ok(())
    }

    /// Stage `text` for the unprotected field covering 1-based (row, col).
    ///
    /// Nothing is sent until the next attention key.
    pub fn set_text(&self, row: usize, col: usize, text: &str) -> Tn3270Result<()> {
        let position = addressing::coordinates_to_position(row, col)?;
        let display = lock(&self.shared.display);
        if display.input_field_at(position).is_none() {
            return Err(FieldError::NotInputField { row, col }.into());
        }
        lock(&self.shared.pending).stage(position, text)?;
        Ok(())
    }

    /// True while staged text is waiting for an attention key
    pub fn has_pending_writes(&self) -> bool {
        !lock(&self.shared.pending).is_empty()
    }

    /// Up to `length` characters from 1-based (row, col)
    pub fn get_text(&self, row: usize, col: usize, length: usize) -> Tn3270Result<String> {
        Ok(lock(&self.shared.display).text_at(row, col, length)?)
    }

    /// First 1-based row containing `text`, if any
    pub fn row_containing_text(&self, text: &str, ignore_case: bool) -> Option<usize> {
        lock(&self.shared.display).row_containing(text, ignore_case)
    }

    pub fn has_text(&self, text: &str, ignore_case: bool) -> bool {
        lock(&self.shared.display).contains_text(text, ignore_case)
    }

    /// Field covering 1-based (row, col)
    pub fn field_at(&self, row: usize, col: usize) -> Tn3270Result<Option<Field>> {
        let position = addressing::coordinates_to_position(row, col)?;
        Ok(lock(&self.shared.display).field_at(position).cloned())
    }

    pub fn cursor_coordinates(&self) -> (usize, usize) {
        lock(&self.shared.display).cursor_coordinates()
    }

    pub fn is_keyboard_locked(&self) -> bool {
        lock(&self.shared.display).is_keyboard_locked()
    }

    /// Copy of the current screen model
    pub fn snapshot(&self) -> Display3270 {
        lock(&self.shared.display).clone()
    }

    /// Wait until `text` appears on screen
    pub async fn wait_for_text(&self, text: &str, ignore_case: bool, timeout: Duration) -> Tn3270Result<()> {
        if self.wait_for(timeout, |d| d.contains_text(text, ignore_case)).await {
            Ok(())
        } else {
            Err(wait_timeout(text, timeout))
        }
    }

    /// Wait until `text` is no longer on screen
    pub async fn wait_for_not_text(&self, text: &str, ignore_case: bool, timeout: Duration) -> Tn3270Result<()> {
        if self.wait_for(timeout, |d| !d.contains_text(text, ignore_case)).await {
            Ok(())
        } else {
            Err(wait_timeout(text, timeout))
        }
    }

    /// Re-evaluate `predicate` after every decode pass and on every poll
    /// tick. Returns false once the deadline passes; a timeout too large to
    /// add to the current instant waits indefinitely.
    async fn wait_for<F>(&self, timeout: Duration, mut predicate: F) -> bool
    where
        F: FnMut(&Display3270) -> bool,
    {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            // Registered before the check so a decode pass in between still wakes us
            let notified = self.shared.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let satisfied = {
                let display = lock(&self.shared.display);
                predicate(&display)
            };
            if satisfied {
                return true;
            }

            let mut tick = self.config.poll_interval();
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    return false;
                }
                tick = tick.min(deadline - now);
            }
            tokio::select! {
                _ = &mut notified => {}
                _ = tokio::time::sleep(tick) => {}
            }
        }
    }

    /// Block until the host restores the keyboard
    async fn wait_until_unlocked(&self) -> Tn3270Result<()> {
        loop {
            let notified = self.shared.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if !self.is_keyboard_locked() {
                return Ok(());
            }
            if !self.shared.is_connected() {
                return Err(NetworkError::NotConnected.into());
            }
            tokio::select! {
                _ = &mut notified => {}
                _ = tokio::time::sleep(self.config.poll_interval()) => {}
            }
        }
    }

    /// Screen as 24 lines of text, once the keyboard is unlocked
    pub async fn render_text(&self, bordered: bool) -> Tn3270Result<String> {
        self.wait_until_unlocked().await?;
        Ok(lock(&self.shared.display).render_text(bordered))
    }

    /// Screen as markup with input elements, once the keyboard is unlocked
    pub async fn render_html(&self) -> Tn3270Result<String> {
        self.wait_until_unlocked().await?;
        Ok(lock(&self.shared.display).render_html())
    }

    /// Close the transport and reinitialise the screen model
    pub async fn disconnect(&mut self) -> Tn3270Result<()> {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        let result = {
            let mut writer = self.writer.lock().await;
            writer.shutdown().await
        };

        *lock(&self.shared.display) = Display3270::new();
        lock(&self.shared.pending).take();
        *lock(&self.shared.negotiator) = TelnetNegotiator::with_terminal_type(&self.config.terminal_type);
        self.mark_disconnected();
        info!("Session {} disconnected", self.id);

        result.map_err(Into::into)
    }

    fn mark_disconnected(&self) {
        self.shared.connected.store(false, Ordering::SeqCst);
        self.shared.changed.notify_waiters();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("connected", &self.is_connected())
            .finish()
    }
}

fn wait_timeout(text: &str, timeout: Duration) -> crate::error::Tn3270Error {
    TerminalError::WaitTimeout {
        text: text.to_string(),
        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
    }
    .into()
}

async fn write_record(writer: &SharedWriter, bytes: &[u8]) -> std::io::Result<()> {
    let mut writer = writer.lock().await;
    writer.write_all(bytes).await?;
    writer.flush().await
}

/// Read the host until it closes: negotiate, frame, decode, answer reads
async fn receive_loop<R>(mut reader: R, shared: Arc<SharedState>, writer: SharedWriter, chunk_size: usize)
where
    R: AsyncRead + Unpin,
{
    let mut framer = RecordFramer::new();
    let mut processor = ProtocolProcessor3270::new();
    let mut chunk = vec![0u8; chunk_size];

    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) => {
                info!("Host closed the connection");
                break;
            }
            Ok(n) => n,
            Err(e) => {
                warn!("Read failed: {e}");
                break;
            }
        };
        let data = &chunk[..n];
        trace!("Received {n} bytes: {data:02X?}");

        let mut remaining = data;
        if framer.is_empty() && TelnetNegotiator::is_negotiation(data) {
            let outcome = lock(&shared.negotiator).negotiate(data);
            if let Some(reply) = outcome.reply {
                debug!("Negotiation reply: {reply:02X?}");
                if let Err(e) = write_record(&writer, &reply).await {
                    warn!("Negotiation write failed: {e}");
                    break;
                }
            }
            remaining = &data[outcome.consumed..];
        }
        if remaining.is_empty() {
            continue;
        }

        let Some(record) = framer.push(remaining) else {
            continue;
        };

        let reply = {
            let mut display = lock(&shared.display);
            processor.process_datastream(&record, &mut display);
            match processor.take_pending_read() {
                Some(PendingRead::ReadBuffer) => Some(encoder::encode_read_buffer(&display)),
                Some(PendingRead::ReadModified) | Some(PendingRead::ReadModifiedAll) => {
                    Some(encoder::encode_read_modified(display.cursor_address()))
                }
                None => None,
            }
        };
        shared.changed.notify_waiters();

        match reply {
            Some(Ok(bytes)) => {
                debug!("Answering host read ({} bytes)", bytes.len());
                if let Err(e) = write_record(&writer, &bytes).await {
                    warn!("Read reply failed: {e}");
                    break;
                }
            }
            Some(Err(e)) => warn!("Could not encode read reply: {e}"),
            None => {}
        }
    }

    shared.connected.store(false, Ordering::SeqCst);
    shared.changed.notify_waiters();
}
