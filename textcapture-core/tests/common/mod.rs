#![allow(dead_code)]

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

use textcapture_core::engine::same_instance;
use textcapture_core::error::Result;
use textcapture_core::{
    BridgeConfig, BroadcastEmitter, DataCaptureContext, DataCaptureView, DelegateSlot, Emitter,
    FrameCache, FrameData, FrameworksTextCaptureListener, HostEvent, LifecycleDispatcher,
    TextCaptureDeserializer, TextCaptureDeserializerDelegate, TextCaptureError, TextCaptureEvent,
    TextCaptureListener, TextCaptureMode, TextCaptureModule, TextCaptureOverlay,
    TextCaptureSession, TextCaptureSettings, ViewThread,
};

pub const MODE_JSON: &str = r#"{"type":"textCapture"}"#;
pub const OVERLAY_JSON: &str = r#"{"type":"textCapture","brush":{}}"#;
pub const OTHER_JSON: &str = r#"{"type":"barcodeCapture"}"#;

// ── Engine fakes ─────────────────────────────────────────────────────────

pub struct FakeMode {
    enabled: AtomicBool,
    pub set_enabled_calls: AtomicUsize,
    listeners: Mutex<Vec<Arc<dyn TextCaptureListener>>>,
    pub applied_settings: Mutex<Vec<TextCaptureSettings>>,
}

impl FakeMode {
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
            set_enabled_calls: AtomicUsize::new(0),
            listeners: Mutex::new(Vec::new()),
            applied_settings: Mutex::new(Vec::new()),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Engine-side delivery: invoke every registered listener on this thread.
    pub fn deliver(&self, session: &dyn TextCaptureSession, frame: Arc<dyn FrameData>) {
        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener.on_capture(self, session, Arc::clone(&frame));
        }
    }
}

impl TextCaptureMode for FakeMode {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn set_enabled(&self, enabled: bool) {
        self.set_enabled_calls.fetch_add(1, Ordering::SeqCst);
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn add_listener(&self, listener: Arc<dyn TextCaptureListener>) {
        let mut listeners = self.listeners.lock();
        if !listeners.iter().any(|l| same_instance(l, &listener)) {
            listeners.push(listener);
        }
    }

    fn remove_listener(&self, listener: &Arc<dyn TextCaptureListener>) {
        self.listeners.lock().retain(|l| !same_instance(l, listener));
    }

    fn apply_settings(&self, settings: &TextCaptureSettings) {
        self.applied_settings.lock().push(settings.clone());
    }
}

pub struct FakeSession(pub String);

impl TextCaptureSession for FakeSession {
    fn to_json(&self) -> String {
        self.0.clone()
    }
}

pub struct FakeFrame(pub u64);

impl FrameData for FakeFrame {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn frame(id: u64) -> Arc<dyn FrameData> {
    Arc::new(FakeFrame(id))
}

pub fn frame_id(frame: &Arc<dyn FrameData>) -> Option<u64> {
    frame.as_any().downcast_ref::<FakeFrame>().map(|f| f.0)
}

pub struct FakeOverlay;

impl TextCaptureOverlay for FakeOverlay {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Default)]
pub struct FakeContext {
    pub modes: Mutex<Vec<Arc<dyn TextCaptureMode>>>,
    pub removed: AtomicUsize,
}

impl DataCaptureContext for FakeContext {
    fn add_mode(&self, mode: Arc<dyn TextCaptureMode>) {
        self.modes.lock().push(mode);
    }

    fn remove_mode(&self, mode: &Arc<dyn TextCaptureMode>) {
        self.removed.fetch_add(1, Ordering::SeqCst);
        self.modes.lock().retain(|m| !same_instance(m, mode));
    }
}

#[derive(Default)]
pub struct FakeView {
    pub overlays: Mutex<Vec<Arc<dyn TextCaptureOverlay>>>,
    pub add_calls: AtomicUsize,
    pub remove_calls: AtomicUsize,
    pub mutated_on: Mutex<Vec<ThreadId>>,
}

impl FakeView {
    pub fn overlay_count(&self) -> usize {
        self.overlays.lock().len()
    }
}

impl DataCaptureView for FakeView {
    fn add_overlay(&self, overlay: Arc<dyn TextCaptureOverlay>) {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        self.mutated_on.lock().push(thread::current().id());
        self.overlays.lock().push(overlay);
    }

    fn remove_overlay(&self, overlay: &Arc<dyn TextCaptureOverlay>) {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        self.mutated_on.lock().push(thread::current().id());
        self.overlays.lock().retain(|o| !same_instance(o, overlay));
    }
}

// ── Deserializer fake ────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeDeserializer {
    delegate: DelegateSlot,
    pub modes: Mutex<Vec<Arc<FakeMode>>>,
    pub mode_builds: AtomicUsize,
    pub mode_updates: AtomicUsize,
    pub overlay_builds: Mutex<Vec<ThreadId>>,
    pub overlay_updates: AtomicUsize,
    pub fail: AtomicBool,
}

impl FakeDeserializer {
    pub fn has_delegate(&self) -> bool {
        self.delegate.get().is_some()
    }

    pub fn last_mode(&self) -> Arc<FakeMode> {
        Arc::clone(self.modes.lock().last().expect("a mode was built"))
    }

    fn check(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(TextCaptureError::Deserialization("unsupported description".into()));
        }
        Ok(())
    }
}

fn parse(json: &str) -> Result<serde_json::Value> {
    serde_json::from_str(json).map_err(|e| TextCaptureError::Deserialization(e.to_string()))
}

impl TextCaptureDeserializer for FakeDeserializer {
    fn set_delegate(&self, delegate: Option<Weak<dyn TextCaptureDeserializerDelegate>>) {
        self.delegate.set(delegate);
    }

    fn mode_from_json(
        &self,
        mode_json: &str,
        _context: &Arc<dyn DataCaptureContext>,
    ) -> Result<Arc<dyn TextCaptureMode>> {
        self.mode_builds.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let json = parse(mode_json)?;
        let concrete = Arc::new(FakeMode::new());
        let mode: Arc<dyn TextCaptureMode> = Arc::clone(&concrete) as _;
        if let Some(delegate) = self.delegate.get() {
            delegate.did_start_deserializing_mode(&mode, &json);
            delegate.did_finish_deserializing_mode(&mode, &json);
        }
        self.modes.lock().push(concrete);
        Ok(mode)
    }

    fn update_mode_from_json(
        &self,
        _mode: &Arc<dyn TextCaptureMode>,
        mode_json: &str,
    ) -> Result<()> {
        self.mode_updates.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        parse(mode_json).map(|_| ())
    }

    fn settings_from_json(&self, settings_json: &str) -> Result<TextCaptureSettings> {
        self.check()?;
        serde_json::from_str(settings_json)
            .map_err(|e| TextCaptureError::Deserialization(e.to_string()))
    }

    fn overlay_from_json(
        &self,
        overlay_json: &str,
        _mode: &Arc<dyn TextCaptureMode>,
    ) -> Result<Arc<dyn TextCaptureOverlay>> {
        self.overlay_builds.lock().push(thread::current().id());
        self.check()?;
        parse(overlay_json)?;
        Ok(Arc::new(FakeOverlay))
    }

    fn update_overlay_from_json(
        &self,
        _overlay: &Arc<dyn TextCaptureOverlay>,
        overlay_json: &str,
    ) -> Result<()> {
        self.overlay_updates.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        parse(overlay_json).map(|_| ())
    }
}

// ── Harness ──────────────────────────────────────────────────────────────

pub struct Harness {
    pub emitter: Arc<BroadcastEmitter>,
    pub lifecycle: Arc<LifecycleDispatcher>,
    pub deserializer: Arc<FakeDeserializer>,
    pub listener: Arc<FrameworksTextCaptureListener>,
    pub view_thread: Arc<ViewThread>,
    pub module: Arc<TextCaptureModule>,
}

impl Harness {
    pub fn new(result_timeout_ms: u64) -> Self {
        let config = BridgeConfig {
            result_timeout_ms,
            ..BridgeConfig::default()
        };
        let emitter = Arc::new(BroadcastEmitter::new());
        let lifecycle = Arc::new(LifecycleDispatcher::new());
        let deserializer = Arc::new(FakeDeserializer::default());
        let listener = Arc::new(FrameworksTextCaptureListener::with_frame_cache(
            Arc::clone(&emitter) as Arc<dyn Emitter>,
            &config,
            Arc::new(FrameCache::new()),
        ));
        let view_thread = Arc::new(ViewThread::spawn("test-view").expect("spawn view thread"));
        let module = Arc::new(TextCaptureModule::new(
            Arc::clone(&listener),
            Arc::clone(&deserializer) as _,
            Arc::clone(&lifecycle) as _,
            Arc::clone(&view_thread) as _,
            &config,
        ));
        module.did_start();
        Self {
            emitter,
            lifecycle,
            deserializer,
            listener,
            view_thread,
            module,
        }
    }

    pub fn bind_context(&self) -> Arc<FakeContext> {
        let context = Arc::new(FakeContext::default());
        let handle: Arc<dyn DataCaptureContext> = Arc::clone(&context) as _;
        self.lifecycle.dispatch_context_deserialized(Some(&handle));
        context
    }

    pub fn bind_view(&self, view: &Arc<FakeView>) {
        let handle: Arc<dyn DataCaptureView> = Arc::clone(view) as _;
        self.lifecycle.dispatch_view_deserialized(Some(&handle));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.emitter.subscribe(TextCaptureEvent::DidCaptureText.name())
    }
}

pub fn recv_event_with_timeout(
    rx: &mut broadcast::Receiver<HostEvent>,
    timeout: Duration,
) -> HostEvent {
    let start = Instant::now();
    loop {
        match rx.try_recv() {
            Ok(ev) => return ev,
            Err(TryRecvError::Empty) => {
                if start.elapsed() >= timeout {
                    panic!("timed out waiting for host event");
                }
                thread::sleep(Duration::from_millis(2));
            }
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Closed) => panic!("event channel closed unexpectedly"),
        }
    }
}

pub fn assert_no_event(rx: &mut broadcast::Receiver<HostEvent>) {
    match rx.try_recv() {
        Ok(ev) => panic!("expected no event, got {}", ev.name),
        Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => {}
        Err(TryRecvError::Lagged(n)) => panic!("expected no event, lagged by {n}"),
    }
}
