//! Snapshot capture over cross-context messages
//!
//! The live frame cannot be rasterized from the outside, so a capture asks
//! the frame to take its own screenshot and waits for the answer:
//!
//! 1. register a listener on the [`MessageWindow`]
//! 2. arm the timer
//! 3. find the frame registered for the shape (fail fast if there is none)
//! 4. post `{"action": "take-screenshot", "shapeid": <id>}`
//! 5. resolve with the first reply carrying the same `shapeid` and a
//!    `screenshot`, or fail when the timer fires first
//!
//! The listener is registered before the request is posted, so a fast reply
//! can never be missed. Each listener has its own unbounded queue, so a burst
//! of unrelated messages cannot push the reply out. Dropping the [`Listener`]
//! unregisters it on every exit path.

use crate::shape::{Dimensions, PreviewShape};
use crate::{Error, Result};
use base64::Engine as Base64Engine;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

const TAKE_SCREENSHOT: &str = "take-screenshot";

/// Request posted to the frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureRequest {
    pub action: String,
    pub shapeid: String,
}

impl CaptureRequest {
    pub fn take_screenshot(shape: &PreviewShape) -> Self {
        Self {
            action: TAKE_SCREENSHOT.to_string(),
            shapeid: shape.id.to_string(),
        }
    }
}

/// Reply sent back by the frame. Both fields are optional on the wire since
/// the window also carries unrelated messages.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CaptureReply {
    #[serde(default)]
    pub screenshot: Option<String>,
    #[serde(default)]
    pub shapeid: Option<String>,
}

impl CaptureReply {
    /// The screenshot reference if this reply answers a capture of `shape_id`.
    fn screenshot_for(self, shape_id: &str) -> Option<String> {
        match (self.screenshot, self.shapeid) {
            (Some(shot), Some(id)) if !shot.is_empty() && id == shape_id => Some(shot),
            _ => None,
        }
    }
}

/// A live embedded frame that can receive messages
pub trait FrameHandle: Send + Sync {
    fn post_message(&self, message: Value, target_origin: &str) -> Result<()>;
}

/// Captured still image of a preview
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Image reference as sent by the frame, usually a `data:` URL
    pub href: String,
    /// Size of the shape at capture time
    pub dimensions: Dimensions,
}

impl Snapshot {
    /// Decode a base64 `data:` URL into its mime type and raw bytes.
    pub fn decode(&self) -> Result<(String, Vec<u8>)> {
        let rest = self
            .href
            .strip_prefix("data:")
            .ok_or_else(|| Error::Other("snapshot is not a data URL".into()))?;
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| Error::Other("data URL has no payload".into()))?;
        let mime = meta
            .strip_suffix(";base64")
            .ok_or_else(|| Error::Other("data URL is not base64 encoded".into()))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| Error::Other(format!("bad base64 payload: {}", e)))?;
        Ok((mime.to_string(), bytes))
    }
}

type ListenerSlots = Vec<(u64, mpsc::UnboundedSender<Value>)>;

/// A registered inbound-message listener. Unregisters itself on drop.
pub struct Listener<'a> {
    id: u64,
    rx: mpsc::UnboundedReceiver<Value>,
    window: &'a MessageWindow,
}

impl Listener<'_> {
    /// Next inbound message, `None` once the listener was unregistered.
    pub async fn recv(&mut self) -> Option<Value> {
        self.rx.recv().await
    }
}

impl Drop for Listener<'_> {
    fn drop(&mut self) {
        self.window.listeners().retain(|(id, _)| *id != self.id);
    }
}

/// The host window: inbound message listeners plus the frames attached to it
pub struct MessageWindow {
    listeners: Mutex<ListenerSlots>,
    next_listener: AtomicU64,
    frames: Mutex<HashMap<String, Arc<dyn FrameHandle>>>,
}

impl Default for MessageWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageWindow {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(0),
            frames: Mutex::new(HashMap::new()),
        }
    }

    fn frames(&self) -> MutexGuard<'_, HashMap<String, Arc<dyn FrameHandle>>> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listeners(&self) -> MutexGuard<'_, ListenerSlots> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a frame under its element id.
    pub fn attach_frame(&self, element_id: impl Into<String>, frame: Arc<dyn FrameHandle>) {
        self.frames().insert(element_id.into(), frame);
    }

    pub fn detach_frame(&self, element_id: &str) -> Option<Arc<dyn FrameHandle>> {
        self.frames().remove(element_id)
    }

    pub fn frame(&self, element_id: &str) -> Option<Arc<dyn FrameHandle>> {
        self.frames().get(element_id).cloned()
    }

    /// Deliver an inbound message. Returns how many listeners received it.
    pub fn dispatch(&self, message: Value) -> usize {
        let mut listeners = self.listeners();
        listeners.retain(|(_, tx)| !tx.is_closed());
        listeners
            .iter()
            .filter(|(_, tx)| tx.send(message.clone()).is_ok())
            .count()
    }

    /// Register a listener; it is removed when the returned guard is dropped.
    pub fn listen(&self) -> Listener<'_> {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners().push((id, tx));
        Listener {
            id,
            rx,
            window: self,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners().len()
    }

    /// Ask the shape's frame for a screenshot and wait at most `timeout`.
    ///
    /// Single attempt: a timeout, a missing frame or a failed post all end the
    /// capture with an error and the listener removed.
    pub async fn capture_snapshot(
        &self,
        shape: &PreviewShape,
        timeout: Duration,
        target_origin: &str,
    ) -> Result<Snapshot> {
        let mut listener = self.listen();
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        let element_id = shape.id.frame_element_id();
        let frame = match self.frame(&element_id) {
            Some(frame) => frame,
            None => {
                warn!("capture target {} not found", element_id);
                return Err(Error::CaptureTargetMissing(element_id));
            }
        };

        let request = serde_json::to_value(CaptureRequest::take_screenshot(shape))?;
        frame.post_message(request, target_origin)?;
        debug!("requested screenshot from {}", element_id);

        let shape_id = shape.id.as_str();
        loop {
            tokio::select! {
                _ = &mut deadline => {
                    debug!("screenshot for {} timed out", shape_id);
                    return Err(Error::CaptureTimeout(timeout.as_millis() as u64));
                }
                received = listener.recv() => {
                    let Some(message) = received else {
                        return Err(Error::CaptureChannelClosed);
                    };
                    let Ok(reply) = serde_json::from_value::<CaptureReply>(message) else {
                        continue;
                    };
                    if let Some(href) = reply.screenshot_for(shape_id) {
                        return Ok(Snapshot {
                            href,
                            dimensions: shape.props.dimensions,
                        });
                    }
                }
            }
        }
    }
}
