//! Screenshot request/reply handshake with embedded frames

use livepreview::export::{export_all, export_image};
use livepreview::{
    Error, ExportImage, FrameHandle, MessageWindow, PreviewConfig, PreviewShape, Result,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::time::Instant;

const TIMEOUT: Duration = Duration::from_millis(2000);

/// Frame that answers every request with `replies` after `delay`
struct ReplyingFrame {
    window: Weak<MessageWindow>,
    delay: Duration,
    replies: Vec<Value>,
    posted: Mutex<Vec<(Value, String)>>,
}

impl ReplyingFrame {
    fn attach(
        window: &Arc<MessageWindow>,
        shape: &PreviewShape,
        delay: Duration,
        replies: Vec<Value>,
    ) -> Arc<Self> {
        let frame = Arc::new(Self {
            window: Arc::downgrade(window),
            delay,
            replies,
            posted: Mutex::new(Vec::new()),
        });
        window.attach_frame(shape.id.frame_element_id(), frame.clone());
        frame
    }
}

impl FrameHandle for ReplyingFrame {
    fn post_message(&self, message: Value, target_origin: &str) -> Result<()> {
        self.posted
            .lock()
            .unwrap()
            .push((message, target_origin.to_string()));
        let window = self.window.clone();
        let replies = self.replies.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(window) = window.upgrade() {
                for reply in replies {
                    window.dispatch(reply);
                }
            }
        });
        Ok(())
    }
}

/// Frame that answers inside `post_message`, before the request call returns
struct InlineReplyFrame {
    window: Weak<MessageWindow>,
    reply: Value,
}

impl FrameHandle for InlineReplyFrame {
    fn post_message(&self, _message: Value, _target_origin: &str) -> Result<()> {
        if let Some(window) = self.window.upgrade() {
            window.dispatch(self.reply.clone());
        }
        Ok(())
    }
}

struct BrokenFrame;

impl FrameHandle for BrokenFrame {
    fn post_message(&self, _message: Value, _target_origin: &str) -> Result<()> {
        Err(Error::Other("frame detached".into()))
    }
}

fn shape() -> PreviewShape {
    PreviewShape::new("shape:abc").with_markup("<h1>hi</h1>")
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn resolves_with_first_matching_reply() {
    let window = Arc::new(MessageWindow::new());
    let shape = shape();
    let frame = ReplyingFrame::attach(
        &window,
        &shape,
        Duration::from_millis(500),
        vec![
            json!({"screenshot": "data:image/png;base64,WRONG", "shapeid": "shape:other"}),
            json!({"shapeid": "shape:abc"}),
            json!({"screenshot": "data:image/png;base64,AAAA", "shapeid": "shape:abc"}),
            json!({"screenshot": "data:image/png;base64,LATE", "shapeid": "shape:abc"}),
        ],
    );

    let start = Instant::now();
    let snapshot = window.capture_snapshot(&shape, TIMEOUT, "*").await.unwrap();
    assert_eq!(start.elapsed(), Duration::from_millis(500));
    assert_eq!(snapshot.href, "data:image/png;base64,AAAA");
    assert_eq!(snapshot.dimensions, shape.props.dimensions);

    // listener gone: later replies reach nobody
    assert_eq!(window.listener_count(), 0);
    assert_eq!(
        window.dispatch(json!({"screenshot": "data:again", "shapeid": "shape:abc"})),
        0
    );

    let posted = frame.posted.lock().unwrap();
    assert_eq!(posted.len(), 1);
    assert_eq!(
        posted[0].0,
        json!({"action": "take-screenshot", "shapeid": "shape:abc"})
    );
    assert_eq!(posted[0].1, "*");
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn immediate_reply_is_not_missed() {
    let window = Arc::new(MessageWindow::new());
    let shape = shape();
    let frame = InlineReplyFrame {
        window: Arc::downgrade(&window),
        reply: json!({"screenshot": "data:image/png;base64,AAAA", "shapeid": "shape:abc"}),
    };
    window.attach_frame(shape.id.frame_element_id(), Arc::new(frame));

    // The reply is dispatched while the request is still being posted
    let start = Instant::now();
    let snapshot = window.capture_snapshot(&shape, TIMEOUT, "*").await.unwrap();
    assert_eq!(snapshot.href, "data:image/png;base64,AAAA");
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(window.listener_count(), 0);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn reply_survives_burst_of_unrelated_messages() {
    let window = Arc::new(MessageWindow::new());
    let shape = shape();
    let reply = json!({"screenshot": "data:image/png;base64,AAAA", "shapeid": "shape:abc"});
    let mut burst = vec![reply];
    burst.extend((0..200).map(|n| json!({"type": "noise", "n": n})));
    ReplyingFrame::attach(&window, &shape, Duration::from_millis(10), burst);

    let snapshot = window.capture_snapshot(&shape, TIMEOUT, "*").await.unwrap();
    assert_eq!(snapshot.href, "data:image/png;base64,AAAA");
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn times_out_without_reply() {
    let window = Arc::new(MessageWindow::new());
    let shape = shape();
    ReplyingFrame::attach(&window, &shape, Duration::ZERO, Vec::new());

    let start = Instant::now();
    let err = window.capture_snapshot(&shape, TIMEOUT, "*").await.unwrap_err();
    assert!(matches!(err, Error::CaptureTimeout(2000)));
    assert_eq!(start.elapsed(), TIMEOUT);
    assert_eq!(window.listener_count(), 0);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn mismatched_replies_only_time_out() {
    let window = Arc::new(MessageWindow::new());
    let shape = shape();
    ReplyingFrame::attach(
        &window,
        &shape,
        Duration::from_millis(100),
        vec![
            json!({"screenshot": "data:x", "shapeid": "shape:def"}),
            json!("not an object"),
        ],
    );

    let err = window.capture_snapshot(&shape, TIMEOUT, "*").await.unwrap_err();
    assert!(matches!(err, Error::CaptureTimeout(_)));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn missing_frame_fails_immediately() {
    let window = MessageWindow::new();
    let start = Instant::now();
    let err = window
        .capture_snapshot(&shape(), TIMEOUT, "*")
        .await
        .unwrap_err();
    match err {
        Error::CaptureTargetMissing(element_id) => assert_eq!(element_id, "iframe-1-shape:abc"),
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(window.listener_count(), 0);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn detached_frame_is_missing() {
    let window = Arc::new(MessageWindow::new());
    let shape = shape();
    ReplyingFrame::attach(&window, &shape, Duration::ZERO, Vec::new());
    assert!(window.detach_frame(&shape.id.frame_element_id()).is_some());

    let err = window.capture_snapshot(&shape, TIMEOUT, "*").await.unwrap_err();
    assert!(matches!(err, Error::CaptureTargetMissing(_)));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn post_failure_ends_capture() {
    let window = MessageWindow::new();
    let shape = shape();
    window.attach_frame(shape.id.frame_element_id(), Arc::new(BrokenFrame));

    let err = window.capture_snapshot(&shape, TIMEOUT, "*").await.unwrap_err();
    assert!(matches!(err, Error::Other(_)));
    assert_eq!(window.listener_count(), 0);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn export_substitutes_placeholder_on_timeout() {
    let window = Arc::new(MessageWindow::new());
    let config = PreviewConfig::default();
    let answering = shape();
    let silent = PreviewShape::new("shape:silent");
    ReplyingFrame::attach(
        &window,
        &answering,
        Duration::from_millis(50),
        vec![json!({"screenshot": "data:image/png;base64,AAAA", "shapeid": "shape:abc"})],
    );
    ReplyingFrame::attach(&window, &silent, Duration::ZERO, Vec::new());

    let single = export_image(&window, &silent, &config).await;
    assert_eq!(
        single,
        ExportImage::Placeholder {
            dimensions: silent.props.dimensions
        }
    );

    let start = Instant::now();
    let shapes = vec![answering.clone(), silent.clone(), PreviewShape::new("shape:gone")];
    let exported = export_all(&window, &shapes, &config).await;
    // captures run concurrently, bounded by one timeout
    assert_eq!(start.elapsed(), config.capture_timeout());

    assert_eq!(exported.len(), 3);
    assert_eq!(exported[0].0, answering.id);
    assert!(matches!(exported[0].1, ExportImage::Captured(_)));
    assert!(exported[1].1.is_placeholder());
    assert!(exported[2].1.is_placeholder());
    assert!(exported[0].1.to_svg().starts_with("<image href=\"data:image/png;base64,AAAA\""));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn concurrent_export_of_many_shapes_captures_all() {
    let window = Arc::new(MessageWindow::new());
    let config = PreviewConfig::default();
    let shapes: Vec<PreviewShape> = (0..100)
        .map(|n| PreviewShape::new(format!("shape:s{}", n)))
        .collect();
    for shape in &shapes {
        let reply = json!({
            "screenshot": format!("data:{}", shape.id),
            "shapeid": shape.id.as_str(),
        });
        ReplyingFrame::attach(&window, shape, Duration::from_millis(10), vec![reply]);
    }

    let exported = export_all(&window, &shapes, &config).await;
    assert_eq!(exported.len(), 100);
    for (id, image) in &exported {
        match image {
            ExportImage::Captured(snapshot) => assert_eq!(snapshot.href, format!("data:{}", id)),
            other => panic!("{} was not captured: {:?}", id, other),
        }
    }
    assert_eq!(window.listener_count(), 0);
}
