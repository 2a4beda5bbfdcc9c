// main.rs - 全景热点查看器：菜单、状态栏、热点叠加层与拾取

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod renderer;

use panorama_hotspots::config::{self, CliArgs, Settings};
use panorama_hotspots::hotspot::{HotspotScene, OverlayAnchor};
use panorama_hotspots::i18n::{self, tr, tr_with};
use panorama_hotspots::{
    angle_between, HotspotKind, MeshId, PanoramaCamera, PickDispatcher, SpriteId,
};
use renderer::Renderer;

use winit::{
    dpi::{LogicalSize, PhysicalPosition},
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Fullscreen, Window, WindowBuilder},
};

use image::io::Reader as ImageReader;
use image::GenericImageView;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// What the pick callbacks ask the UI to do.
#[derive(Debug, Clone, Copy)]
enum PickEvent {
    Focus(MeshId),
    OpenCard(SpriteId),
    CloseCard,
}

/// 主循环已退出时接收端会被丢弃，事件只记日志
fn post_pick_event(tx: &Sender<PickEvent>, event: PickEvent) -> bool {
    match tx.send(event) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("pick event {:?} dropped: receiver closed", e.0);
            false
        }
    }
}

#[derive(Debug, Default)]
struct UiState {
    show_fps: bool,
    fps: f32,
    is_loading: bool,
    is_fullscreen: bool,
    lang: String,
    /// 当前信息卡片对应的热点下标
    card: Option<usize>,
    /// 最近一次对准的热点
    focused: Option<usize>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = CliArgs::parse(std::env::args());
    let mut ui = UiState {
        lang: cli.resolve_lang(),
        ..Default::default()
    };
    i18n::init(ui.lang.clone());

    let settings = match Settings::load(cli.settings.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };
    let hotspots = match config::load_hotspots(cli.hotspots.as_deref()) {
        Ok(h) => h,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    let event_loop = EventLoop::new();
    let window = match WindowBuilder::new()
        .with_title(tr("app.title"))
        .with_inner_size(LogicalSize::new(1280, 720))
        .build(&event_loop)
    {
        Ok(w) => Arc::new(w),
        Err(e) => {
            log::error!("failed to create window: {e}");
            std::process::exit(1);
        }
    };

    let mut renderer = match pollster::block_on(Renderer::new(window.clone())) {
        Ok(r) => r,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    let radius = settings.sphere_radius();
    let far_plane = radius * 4.0;
    let mut camera = PanoramaCamera::new(settings.fov_deg, settings.sensitivity, settings.inertia);

    // 拾取回调只投递事件，由主循环统一处理
    let (pick_tx, pick_rx): (Sender<PickEvent>, Receiver<PickEvent>) = channel();
    let (mesh_tx, sprite_tx, outside_tx) = (pick_tx.clone(), pick_tx.clone(), pick_tx);
    let scene = HotspotScene::new(radius, settings.marker_size(), hotspots);
    let mut dispatcher = PickDispatcher::new(scene)
        .on_mesh(move |id| {
            post_pick_event(&mesh_tx, PickEvent::Focus(id));
        })
        .on_sprite(move |id| {
            post_pick_event(&sprite_tx, PickEvent::OpenCard(id));
        })
        .on_outside(move || {
            post_pick_event(&outside_tx, PickEvent::CloseCard);
        });

    let mut mouse_pressed = false;
    let mut cursor_pos = PhysicalPosition::new(0.0f64, 0.0f64);
    let mut last_drag_pos: Option<PhysicalPosition<f64>> = None;

    let mut last_frame_time = Instant::now();
    let mut frame_count = 0;

    let (tx, rx): (Sender<image::RgbaImage>, Receiver<image::RgbaImage>) = channel();
    if let Some(path) = settings.panorama.clone() {
        ui.is_loading = true;
        start_load_image(path, tx.clone());
    }

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        if let Ok(rgba) = rx.try_recv() {
            renderer.load_panorama(rgba);
            ui.is_loading = false;
        }

        match event {
            Event::WindowEvent { event, .. } => {
                let response = renderer.egui_state.on_event(&renderer.egui_ctx, &event);
                if response.consumed {
                    return;
                }

                match event {
                    WindowEvent::CloseRequested => *control_flow = ControlFlow::Exit,

                    WindowEvent::Resized(new_size) => renderer.resize(new_size),

                    WindowEvent::KeyboardInput { input, .. } => {
                        if input.state == ElementState::Pressed {
                            match input.virtual_keycode {
                                Some(VirtualKeyCode::O) => {
                                    if let Some(path) = pick_image_file() {
                                        ui.is_loading = true;
                                        start_load_image(path, tx.clone());
                                    }
                                }
                                Some(VirtualKeyCode::F11) => toggle_fullscreen(&window, &mut ui),
                                _ => {}
                            }
                        }
                    }

                    WindowEvent::MouseInput { state, button, .. } => {
                        if button == MouseButton::Left {
                            mouse_pressed = state == ElementState::Pressed;
                            if mouse_pressed {
                                last_drag_pos = Some(cursor_pos);
                                if let Err(e) = dispatcher.pointer_down(cursor_pos.x, cursor_pos.y) {
                                    log::warn!("pick failed: {e}");
                                }
                                apply_pick_events(&pick_rx, &dispatcher, &mut camera, &mut ui);
                            } else {
                                last_drag_pos = None;
                                camera.release();
                            }
                        }
                    }

                    WindowEvent::CursorMoved { position, .. } => {
                        cursor_pos = position;
                        if mouse_pressed {
                            if let Some(last) = last_drag_pos {
                                camera.drag(
                                    position.x - last.x,
                                    position.y - last.y,
                                    renderer.size.width as f64,
                                    renderer.size.height as f64,
                                );
                            }
                            last_drag_pos = Some(position);
                        }
                    }

                    WindowEvent::MouseWheel { delta, .. } => {
                        let scroll = match delta {
                            MouseScrollDelta::LineDelta(_, y) => y as f64,
                            MouseScrollDelta::PixelDelta(pos) => pos.y / 20.0,
                        };
                        camera.zoom(scroll);
                    }

                    WindowEvent::DroppedFile(path) => {
                        ui.is_loading = true;
                        start_load_image(path, tx.clone());
                    }

                    _ => {}
                }
            }

            Event::RedrawRequested(_) => {
                frame_count += 1;
                let now = Instant::now();
                let elapsed = now.duration_since(last_frame_time).as_secs_f32();
                if elapsed >= 1.0 {
                    ui.fps = frame_count as f32 / elapsed;
                    frame_count = 0;
                    last_frame_time = now;
                }

                camera.update(mouse_pressed);
                let ctx = camera.context(
                    renderer.size.width as f64,
                    renderer.size.height as f64,
                    far_plane,
                );
                dispatcher.scene_mut().set_context(ctx);
                renderer.update_camera(ctx.view_projection, settings.brightness);

                let scene = dispatcher.scene();
                let anchors = scene.overlay_anchors(camera.forward());
                let mut next_image = None;
                let mut reset_view = false;

                let render_result = renderer.render_with_ui(&window, |egui_ctx| {
                    draw_hotspots(egui_ctx, scene, &anchors, window.scale_factor());
                    draw_ui(
                        egui_ctx,
                        &mut ui,
                        &mut camera,
                        scene,
                        &mut next_image,
                        &mut reset_view,
                        &window,
                    );
                });

                if reset_view {
                    camera.reset(settings.fov_deg);
                }
                if let Some(path) = next_image {
                    ui.is_loading = true;
                    start_load_image(path, tx.clone());
                }

                match render_result {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => renderer.resize(renderer.size),
                    Err(wgpu::SurfaceError::OutOfMemory) => *control_flow = ControlFlow::Exit,
                    Err(e) => log::error!("render error: {e:?}"),
                }
            }

            Event::MainEventsCleared => window.request_redraw(),

            _ => {}
        }
    });
}

fn apply_pick_events(
    rx: &Receiver<PickEvent>,
    dispatcher: &PickDispatcher<HotspotScene>,
    camera: &mut PanoramaCamera,
    ui: &mut UiState,
) {
    let scene = dispatcher.scene();

    for event in rx.try_iter() {
        match event {
            PickEvent::Focus(id) => {
                if let Some(i) = scene.index_of(HotspotKind::Mesh, id.0) {
                    camera.focus_on(scene.hotspots()[i].anchor);
                    ui.focused = Some(i);
                }
            }
            PickEvent::OpenCard(id) => ui.card = scene.index_of(HotspotKind::Sprite, id.0),
            PickEvent::CloseCard => ui.card = None,
        }
    }
}

fn pick_image_file() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter(&tr("file.filter.images"), &IMAGE_EXTENSIONS)
        .pick_file()
}

fn toggle_fullscreen(window: &Window, ui: &mut UiState) {
    ui.is_fullscreen = !ui.is_fullscreen;
    if ui.is_fullscreen {
        window.set_fullscreen(Some(Fullscreen::Borderless(None)));
    } else {
        window.set_fullscreen(None);
    }
}

fn start_load_image(path: PathBuf, tx: Sender<image::RgbaImage>) {
    thread::spawn(move || {
        log::info!(
            "{}",
            tr_with("log.loading_image_bg", &[("path", path.display().to_string())])
        );

        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) => {
                log::error!("{}", tr_with("error.open_file", &[("err", e.to_string())]));
                return;
            }
        };

        let img_result = ImageReader::new(BufReader::new(file))
            .with_guessed_format()
            .map_err(image::ImageError::IoError)
            .and_then(|mut r| {
                r.no_limits();
                r.decode()
            });

        match img_result {
            Ok(img) => {
                let (w, h) = img.dimensions();
                log::info!(
                    "{}",
                    tr_with("log.image_loaded_size", &[("w", w.to_string()), ("h", h.to_string())])
                );
                if tx.send(img.to_rgba8()).is_err() {
                    log::error!("{}", tr("error.send_to_main_failed"));
                }
            }
            Err(e) => log::error!("{}", tr_with("error.decode_image", &[("err", e.to_string())])),
        }
    });
}

/// 把热点锚点（物理像素）换算成 egui 的逻辑坐标后绘制标记与名称
fn draw_hotspots(ctx: &egui::Context, scene: &HotspotScene, anchors: &[OverlayAnchor], scale: f64) {
    let painter = ctx.layer_painter(egui::LayerId::background());
    let font = egui::FontId::proportional(14.0);

    for anchor in anchors.iter().filter(|a| a.visible) {
        let placed = &scene.hotspots()[anchor.index];
        let center = egui::pos2((anchor.screen.x / scale) as f32, (anchor.screen.y / scale) as f32);
        let radius = ((anchor.radius_px / scale) as f32).max(4.0);

        match placed.hotspot.kind {
            HotspotKind::Mesh => painter.circle(
                center,
                radius,
                egui::Color32::from_rgba_unmultiplied(255, 140, 0, 200),
                egui::Stroke::new(2.0, egui::Color32::WHITE),
            ),
            HotspotKind::Sprite => painter.circle(
                center,
                radius,
                egui::Color32::from_rgba_unmultiplied(30, 144, 255, 160),
                egui::Stroke::new(1.5, egui::Color32::LIGHT_BLUE),
            ),
        }

        painter.text(
            center - egui::vec2(0.0, radius + 4.0),
            egui::Align2::CENTER_BOTTOM,
            &placed.hotspot.name,
            font.clone(),
            egui::Color32::WHITE,
        );
    }
}

fn draw_ui(
    ctx: &egui::Context,
    ui_state: &mut UiState,
    camera: &mut PanoramaCamera,
    scene: &HotspotScene,
    next_image: &mut Option<PathBuf>,
    reset_view: &mut bool,
    window: &Window,
) {
    egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
        egui::menu::bar(ui, |ui| {
            ui.menu_button(tr("menu.file"), |ui| {
                if ui.button(tr("menu.open_image")).clicked() {
                    ui.close_menu();
                    *next_image = pick_image_file();
                }
                if ui.button(tr("menu.exit")).clicked() {
                    std::process::exit(0);
                }
            });

            ui.menu_button(tr("menu.view"), |ui| {
                if ui.button(tr("view.reset")).clicked() {
                    *reset_view = true;
                    ui.close_menu();
                }

                let fullscreen_label = if ui_state.is_fullscreen {
                    tr("view.fullscreen.exit")
                } else {
                    tr("view.fullscreen.enter")
                };
                if ui.button(fullscreen_label).clicked() {
                    toggle_fullscreen(window, ui_state);
                    ui.close_menu();
                }

                ui.separator();
                ui.menu_button(tr("view.input_sensitivity"), |ui| {
                    ui.add(
                        egui::Slider::new(&mut camera.sensitivity_scale, 0.1..=5.0)
                            .text(tr("view.multiplier")),
                    );
                    ui.add(egui::Slider::new(&mut camera.inertia, 0.0..=0.99).text(tr("view.inertia")));
                });

                ui.separator();
                if ui.checkbox(&mut ui_state.show_fps, tr("view.show_fps")).clicked() {
                    ui.close_menu();
                }
            });

            ui.menu_button(tr("menu.language"), |ui| {
                for (code, name) in i18n::LANGUAGES {
                    if ui.radio_value(&mut ui_state.lang, code.to_string(), name).clicked() {
                        i18n::init(ui_state.lang.clone());
                        window.set_title(&tr("app.title"));
                        ui.close_menu();
                    }
                }
            });
        });
    });

    egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            if ui_state.is_loading {
                ui.label(egui::RichText::new(tr("status.loading_image")).color(egui::Color32::YELLOW));
                ui.label("|");
            }

            ui.label(format!("FOV: {:.1}°", camera.fov));
            ui.label("|");
            ui.label(format!("Yaw: {:.1}°", camera.yaw));
            ui.label("|");
            ui.label(format!("Pitch: {:.1}°", camera.pitch));

            if let Some(placed) = ui_state.focused.and_then(|i| scene.hotspots().get(i)) {
                if let Ok(angle) = angle_between(camera.forward(), placed.anchor) {
                    ui.label("|");
                    ui.label(tr_with(
                        "status.off_axis",
                        &[
                            ("name", placed.hotspot.name.clone()),
                            ("angle", format!("{angle:.1}")),
                        ],
                    ));
                }
            }

            if ui_state.show_fps {
                ui.label("|");
                ui.label(
                    egui::RichText::new(format!("FPS: {:.1}", ui_state.fps)).color(egui::Color32::GREEN),
                );
            }
        });
    });

    if let Some(placed) = ui_state.card.and_then(|i| scene.hotspots().get(i)) {
        let mut open = true;
        egui::Window::new(placed.hotspot.name.as_str())
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                let text = placed
                    .hotspot
                    .description
                    .clone()
                    .unwrap_or_else(|| tr("card.no_description"));
                ui.label(text);
            });
        if !open {
            ui_state.card = None;
        }
    }
}
