//! End-to-end simulation: an engine thread delivering capture callbacks and
//! a host thread answering them through a started `TextCaptureModule`.
//!
//! ```text
//! cargo run -p textcapture-core --bin roundtrip -- --frames 20 --disable-every 5
//! ```

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

use textcapture_core::engine::same_instance;
use textcapture_core::error::Result;
use textcapture_core::{
    BridgeConfig, BroadcastEmitter, DataCaptureContext, DelegateSlot, Emitter, FrameData,
    FrameworksTextCaptureListener, LifecycleDispatcher, TextCaptureDeserializer,
    TextCaptureDeserializerDelegate, TextCaptureError, TextCaptureEvent, TextCaptureListener,
    TextCaptureMode, TextCaptureModule, TextCaptureOverlay, TextCaptureSession,
    TextCaptureSettings, ViewThread,
};

#[derive(Debug)]
struct Args {
    frames: usize,
    disable_every: usize,
    silent_every: usize,
    config: BridgeConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Summary {
    frames: usize,
    events_answered: usize,
    events_unanswered: usize,
    frames_enabled_after: usize,
    avg_roundtrip_ms: f64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("textcapture_core=info,roundtrip=info")),
        )
        .init();

    if let Err(e) = run() {
        eprintln!("roundtrip failed: {e}");
        std::process::exit(1);
    }
}

fn parse_args() -> std::result::Result<Args, String> {
    let mut frames = 10usize;
    let mut disable_every = 0usize;
    let mut silent_every = 0usize;
    let mut config_json: Option<String> = None;

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        let mut value = |flag: &str| it.next().ok_or_else(|| format!("missing value for {flag}"));
        match arg.as_str() {
            "--frames" => {
                frames = value("--frames")?
                    .parse()
                    .map_err(|_| "invalid value for --frames".to_string())?;
            }
            "--disable-every" => {
                disable_every = value("--disable-every")?
                    .parse()
                    .map_err(|_| "invalid value for --disable-every".to_string())?;
            }
            "--silent-every" => {
                silent_every = value("--silent-every")?
                    .parse()
                    .map_err(|_| "invalid value for --silent-every".to_string())?;
            }
            "--config" => config_json = Some(value("--config")?),
            "--help" | "-h" => {
                println!(
                    "Usage: roundtrip [--frames <n>] [--disable-every <k>] \
                     [--silent-every <k>] [--config <json>]"
                );
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
    }

    let config = match config_json {
        Some(json) => BridgeConfig::from_json_str(&json).map_err(|e| e.to_string())?,
        None => BridgeConfig {
            result_timeout_ms: 200,
            ..BridgeConfig::default()
        },
    };

    Ok(Args {
        frames,
        disable_every,
        silent_every,
        config,
    })
}

fn run() -> std::result::Result<(), String> {
    let args = parse_args()?;
    info!(?args, "starting roundtrip simulation");

    let emitter = Arc::new(BroadcastEmitter::new());
    let lifecycle = Arc::new(LifecycleDispatcher::new());
    let deserializer = Arc::new(SimDeserializer::default());
    let view_thread = Arc::new(ViewThread::spawn("sim-view").map_err(|e| e.to_string())?);
    let listener = Arc::new(FrameworksTextCaptureListener::new(
        Arc::clone(&emitter) as Arc<dyn Emitter>,
        &args.config,
    ));
    let module = Arc::new(TextCaptureModule::new(
        listener,
        Arc::clone(&deserializer) as _,
        Arc::clone(&lifecycle) as _,
        view_thread as _,
        &args.config,
    ));
    module.did_start();

    let context: Arc<dyn DataCaptureContext> = Arc::new(SimContext);
    lifecycle.dispatch_context_deserialized(Some(&context));
    let mode_json = format!(r#"{{"type":"{}"}}"#, args.config.domain_tag);
    lifecycle
        .dispatch_add_mode(&mode_json)
        .map_err(|e| e.to_string())?;
    let mode = deserializer
        .mode
        .lock()
        .clone()
        .ok_or("deserializer built no mode")?;
    module.add_listener();

    // ── Host thread ──────────────────────────────────────────────────────
    let mut rx = emitter.subscribe(TextCaptureEvent::DidCaptureText.name());
    let answered = Arc::new(AtomicUsize::new(0));
    let host = {
        let module = Arc::clone(&module);
        let answered = Arc::clone(&answered);
        let (frames, disable_every, silent_every) =
            (args.frames, args.disable_every, args.silent_every);
        thread::spawn(move || {
            // One event per delivered frame while a consumer is subscribed.
            for n in 1..=frames {
                let Ok(event) = rx.blocking_recv() else {
                    break;
                };
                if silent_every > 0 && n % silent_every == 0 {
                    continue;
                }
                let keep = !(disable_every > 0 && n % disable_every == 0);
                tracing::debug!(n, keep, payload = %event.payload, "host answering");
                module.finish_did_capture_text(keep);
                answered.fetch_add(1, Ordering::Relaxed);
            }
        })
    };

    // ── Engine thread ────────────────────────────────────────────────────
    let engine = {
        let mode = Arc::clone(&mode);
        let frames = args.frames;
        thread::spawn(move || {
            let mut enabled_after = 0usize;
            let start = Instant::now();
            for i in 0..frames {
                let session = SimSession(i);
                mode.deliver(&session, Arc::new(SimFrame));
                if mode.is_enabled() {
                    enabled_after += 1;
                }
                // Re-enable so every frame gets a fresh decision.
                mode.set_enabled(true);
            }
            (enabled_after, start.elapsed())
        })
    };

    let (enabled_after, elapsed) = engine.join().map_err(|_| "engine thread panicked")?;
    host.join().map_err(|_| "host thread panicked")?;

    lifecycle.dispatch_all_modes_removed();
    lifecycle.dispatch_context_disposed();
    module.remove_listener();
    module.did_stop();

    let answered = answered.load(Ordering::Relaxed);
    let summary = Summary {
        frames: args.frames,
        events_answered: answered,
        events_unanswered: args.frames.saturating_sub(answered),
        frames_enabled_after: enabled_after,
        avg_roundtrip_ms: if args.frames == 0 {
            0.0
        } else {
            elapsed.as_secs_f64() * 1_000.0 / args.frames as f64
        },
    };
    let json = serde_json::to_string_pretty(&summary).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

// ── Simulated engine ─────────────────────────────────────────────────────
//
// Just enough of an engine to drive capture callbacks. Overlays and JSON
// updates are not simulated.

struct SimMode {
    enabled: AtomicBool,
    listeners: Mutex<Vec<Arc<dyn TextCaptureListener>>>,
}

impl SimMode {
    fn deliver(&self, session: &dyn TextCaptureSession, frame: Arc<dyn FrameData>) {
        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener.on_capture(self, session, Arc::clone(&frame));
        }
    }
}

impl TextCaptureMode for SimMode {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn add_listener(&self, listener: Arc<dyn TextCaptureListener>) {
        self.listeners.lock().push(listener);
    }

    fn remove_listener(&self, listener: &Arc<dyn TextCaptureListener>) {
        self.listeners.lock().retain(|l| !same_instance(l, listener));
    }

    fn apply_settings(&self, _settings: &TextCaptureSettings) {}
}

struct SimSession(usize);

impl TextCaptureSession for SimSession {
    fn to_json(&self) -> String {
        format!(r#"{{"frameSequenceId":{},"capturedTexts":[]}}"#, self.0)
    }
}

struct SimFrame;

impl FrameData for SimFrame {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct SimContext;

impl DataCaptureContext for SimContext {
    fn add_mode(&self, _mode: Arc<dyn TextCaptureMode>) {}

    fn remove_mode(&self, _mode: &Arc<dyn TextCaptureMode>) {}
}

#[derive(Default)]
struct SimDeserializer {
    delegate: DelegateSlot,
    mode: Mutex<Option<Arc<SimMode>>>,
}

fn unsupported() -> TextCaptureError {
    TextCaptureError::Deserialization("not simulated".into())
}

impl TextCaptureDeserializer for SimDeserializer {
    fn set_delegate(&self, delegate: Option<Weak<dyn TextCaptureDeserializerDelegate>>) {
        self.delegate.set(delegate);
    }

    fn mode_from_json(
        &self,
        mode_json: &str,
        _context: &Arc<dyn DataCaptureContext>,
    ) -> Result<Arc<dyn TextCaptureMode>> {
        let json: serde_json::Value = serde_json::from_str(mode_json)?;
        let concrete = Arc::new(SimMode {
            enabled: AtomicBool::new(true),
            listeners: Mutex::new(Vec::new()),
        });
        let mode: Arc<dyn TextCaptureMode> = Arc::clone(&concrete) as _;
        if let Some(delegate) = self.delegate.get() {
            delegate.did_finish_deserializing_mode(&mode, &json);
        }
        *self.mode.lock() = Some(concrete);
        Ok(mode)
    }

    fn update_mode_from_json(&self, _mode: &Arc<dyn TextCaptureMode>, _json: &str) -> Result<()> {
        Err(unsupported())
    }

    fn settings_from_json(&self, settings_json: &str) -> Result<TextCaptureSettings> {
        Ok(serde_json::from_str(settings_json)?)
    }

    fn overlay_from_json(
        &self,
        _overlay_json: &str,
        _mode: &Arc<dyn TextCaptureMode>,
    ) -> Result<Arc<dyn TextCaptureOverlay>> {
        Err(unsupported())
    }

    fn update_overlay_from_json(
        &self,
        _overlay: &Arc<dyn TextCaptureOverlay>,
        _json: &str,
    ) -> Result<()> {
        Err(unsupported())
    }
}
