pub mod camera;
pub mod client;
pub mod config;
pub mod decoder;
pub mod document;
pub mod download;
pub mod encoded_mesh;
pub mod error;
pub mod geometry;
pub mod protocol;
pub mod renderer;
pub mod session;

use eframe::egui;
use futures_channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use std::{
    future::Future,
    sync::{Arc, Mutex},
};

pub use config::ViewerConfig;
pub use decoder::ResultDecoder;
pub use document::GeometryDocument;
pub use session::Session;

use error::SolveError;
use protocol::SolveResponse;

/// Result of one `/solve` round trip, tagged with its request sequence number.
struct SolveOutcome {
    seq: u64,
    result: Result<SolveResponse, SolveError>,
}

pub struct ViewerApp {
    config: ViewerConfig,
    session: Session,
    results_tx: UnboundedSender<SolveOutcome>,
    results_rx: UnboundedReceiver<SolveOutcome>,
    gpu: Option<Arc<Mutex<renderer::GpuScene>>>,
    gpu_failed: bool,
    /// Width / height of the viewport in the last frame.
    aspect: f32,
}

impl ViewerApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: ViewerConfig) -> Self {
        let (results_tx, results_rx) = unbounded();
        let mut app = Self {
            config,
            session: Session::new(),
            results_tx,
            results_rx,
            gpu: None,
            gpu_failed: false,
            aspect: 1.0,
        };
        app.recompute(&cc.egui_ctx);
        app
    }

    /// Post the current slider values; the answer arrives through `results_rx`.
    fn recompute(&mut self, ctx: &egui::Context) {
        let (seq, request) = self.session.begin_request(&self.config);
        let endpoint = self.config.endpoint.clone();
        let tx = self.results_tx.clone();
        let ctx = ctx.clone();
        execute(async move {
            let result = client::solve(&endpoint, &request).await;
            if tx.unbounded_send(SolveOutcome { seq, result }).is_err() {
                log::debug!("viewer closed before response #{seq} arrived");
            }
            ctx.request_repaint();
        });
    }

    fn drain_results(&mut self) {
        while let Ok(Some(outcome)) = self.results_rx.try_next() {
            match outcome.result {
                Ok(response) => {
                    self.session.apply_response(outcome.seq, &response, self.aspect);
                }
                Err(e) => {
                    log::error!("solve #{} failed: {e}", outcome.seq);
                    self.session.fail_request(outcome.seq);
                }
            }
        }
    }

    fn download(&self) {
        let Some(doc) = self.session.document() else {
            log::warn!("nothing to download yet");
            return;
        };
        if let Err(e) = download::offer_document(doc, &self.config.definition) {
            log::error!("download failed: {e:#}");
        }
    }

    fn side_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("inputs")
            .resizable(false)
            .min_width(220.0)
            .show(ctx, |ui| {
                ui.heading(self.config.definition.as_str());
                ui.separator();

                let mut changed = false;
                for input in &mut self.config.inputs {
                    let label = input.display_label().to_owned();
                    let response = ui.add(
                        egui::Slider::new(&mut input.value, input.min..=input.max)
                            .step_by(input.step)
                            .text(label),
                    );
                    // recompute on release, like a mouseup/touchend handler
                    if response.drag_stopped() || (response.changed() && !response.dragged()) {
                        changed = true;
                    }
                }
                if changed {
                    self.recompute(ctx);
                }

                ui.separator();
                if self.session.in_flight() {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("solving…");
                    });
                }
                let count = self.session.document().map_or(0, GeometryDocument::len);
                ui.label(format!("{count} objects"));

                let can_download = self.session.can_download();
                if ui
                    .add_enabled(can_download, egui::Button::new("Download .3dm"))
                    .clicked()
                {
                    self.download();
                }
            });
    }

    fn viewport(&mut self, ctx: &egui::Context, frame: &eframe::Frame) {
        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(egui::Color32::WHITE))
            .show(ctx, |ui| {
                let (rect, response) =
                    ui.allocate_exact_size(ui.available_size(), egui::Sense::drag());
                if rect.height() > 0.0 && rect.width() > 0.0 {
                    self.aspect = rect.width() / rect.height();
                }

                let camera = &mut self.session.camera;
                let delta = response.drag_delta();
                if response.dragged_by(egui::PointerButton::Primary) {
                    camera.orbit(-delta.x * 0.01, -delta.y * 0.01);
                } else if response.dragged_by(egui::PointerButton::Secondary) {
                    camera.pan(delta.x / rect.height(), delta.y / rect.height());
                }
                if response.hovered() {
                    let scroll = ui.input(|i| i.raw_scroll_delta.y);
                    if scroll.abs() > 0.0 {
                        camera.dolly((1.0 - scroll * 0.001).clamp(0.5, 2.0));
                    }
                }

                let Some(gl) = frame.gl() else {
                    return;
                };
                if self.gpu.is_none() && !self.gpu_failed {
                    match unsafe { renderer::GpuScene::new(gl) } {
                        Ok(scene) => self.gpu = Some(Arc::new(Mutex::new(scene))),
                        Err(e) => {
                            log::error!("could not set up the GL scene: {e}");
                            self.gpu_failed = true;
                        }
                    }
                }
                let Some(gpu) = &self.gpu else {
                    return;
                };
                if let Ok(mut scene) = gpu.lock() {
                    unsafe { scene.sync(gl, self.session.revision(), self.session.document()) };
                }

                let mvp = self.session.camera.view_projection(self.aspect);
                let gpu = Arc::clone(gpu);
                let callback = egui_glow::CallbackFn::new(move |_info, painter| {
                    if let Ok(scene) = gpu.lock() {
                        unsafe { scene.paint(painter.gl(), mvp) };
                    }
                });
                ui.painter().add(egui::PaintCallback { rect, callback: Arc::new(callback) });
            });
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        self.drain_results();
        self.side_panel(ctx);
        self.viewport(ctx, frame);
        if self.session.in_flight() {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }
}

// ── Web entry‑point ──
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    use wasm_bindgen::JsCast;

    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Debug)
        .map_err(|e| JsValue::from_str(&format!("failed to init logger: {e}")))?;

    let canvas = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))?
        .get_element_by_id("viewer_canvas")
        .ok_or_else(|| JsValue::from_str("canvas #viewer_canvas not found"))?
        .dyn_into::<web_sys::HtmlCanvasElement>()
        .map_err(|_| JsValue::from_str("#viewer_canvas is not a canvas"))?;

    let web_options = eframe::WebOptions { depth_buffer: 24, ..Default::default() };
    eframe::WebRunner::new()
        .start(
            canvas,
            web_options,
            Box::new(|cc| Ok(Box::new(ViewerApp::new(cc, ViewerConfig::default())))),
        )
        .await?;

    Ok(())
}

// ── Native entry‑point ──
#[cfg(not(target_arch = "wasm32"))]
pub fn run_native(config: ViewerConfig) -> eframe::Result<()> {
    let options = eframe::NativeOptions { depth_buffer: 24, ..Default::default() };
    let title = format!("compute viewer: {}", config.definition);
    eframe::run_native(
        &title,
        options,
        Box::new(|cc| Ok(Box::new(ViewerApp::new(cc, config)))),
    )
}

// Executes an async future without blocking the egui thread
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn execute<F: Future<Output = ()> + Send + 'static>(f: F) {
    std::thread::spawn(move || futures::executor::block_on(f));
}
#[cfg(target_arch = "wasm32")]
pub(crate) fn execute<F: Future<Output = ()> + 'static>(f: F) {
    wasm_bindgen_futures::spawn_local(f);
}
