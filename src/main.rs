//! Jingle Rocket entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, HtmlCanvasElement, HtmlElement, HtmlInputElement, KeyboardEvent, MouseEvent};

    use jingle_rocket::audio::{AudioManager, MusicTrack, effects_for_event, music_for_event};
    use jingle_rocket::consts::*;
    use jingle_rocket::highscores::{HighScores, format_score};
    use jingle_rocket::loader::Loader;
    use jingle_rocket::platform::{CanvasRect, KeyState, KeyValueStore, default_store, screen_to_world};
    use jingle_rocket::renderer::SdfRenderState;
    use jingle_rocket::settings::Settings;
    use jingle_rocket::sim::{GameEvent, GamePhase, GameState, TickInput, tick};
    use jingle_rocket::ui::{
        FLASH_GAIN_CLASS, FLASH_LOSS_CLASS, FlashKind, OverlayVisibility, ScoreFlash, high_score_lines,
        score_text,
    };
    use jingle_rocket::{RenderError, Viewport};

    /// Share of the window the canvas covers
    const CANVAS_FILL: f64 = 0.95;

    /// Game instance holding all state
    struct Game {
        state: GameState,
        render_state: Option<SdfRenderState>,
        settings: Settings,
        store: Box<dyn KeyValueStore>,
        high_scores: HighScores,
        loader: Loader,
        audio: AudioManager,
        keys: KeyState,
        input: TickInput,
        accumulator: f32,
        last_time: f64,
        score_flash: ScoreFlash,
        // Overlays are only touched when the phase changes
        shown_phase: Option<GamePhase>,
    }

    impl Game {
        fn new(seed: u64, viewport: Viewport) -> Self {
            let store = default_store();
            let settings = Settings::load(store.as_ref());
            let high_scores = HighScores::load(store.as_ref(), js_sys::Date::now());

            let mut state = GameState::new(seed, viewport);
            state.max_particles = settings.max_particles();

            let mut audio = AudioManager::new();
            audio.set_sfx_volume(settings.sfx_volume);

            Self {
                state,
                render_state: None,
                loader: Loader::new(settings.skip_loader),
                settings,
                store,
                high_scores,
                audio,
                keys: KeyState::new(),
                input: TickInput::default(),
                accumulator: 0.0,
                last_time: 0.0,
                score_flash: ScoreFlash::default(),
                shown_phase: None,
            }
        }

        fn music_volume(&self, track: MusicTrack) -> f32 {
            match track {
                MusicTrack::Menu => self.settings.menu_music_volume,
                MusicTrack::Game => self.settings.game_music_volume,
            }
        }

        /// First user gesture: the browser lets us start audio now
        fn unlock_audio(&mut self) {
            if self.audio.is_enabled() {
                return;
            }
            self.audio.enable();
            if self.state.phase == GamePhase::Menu && self.audio.current_track().is_none() {
                self.audio
                    .play_music(MusicTrack::Menu, self.music_volume(MusicTrack::Menu));
            }
        }

        fn start_run(&mut self) {
            let seed = js_sys::Date::now() as u64;
            self.accumulator = 0.0;
            self.input = TickInput {
                aim: Some(self.state.cursor),
                ..TickInput::default()
            };
            self.state.max_particles = self.settings.max_particles();
            self.state.start_run(seed);
        }

        fn submit_initials(&mut self, document: &Document) {
            let Some(input) = initials_input(document) else {
                return;
            };
            let Some((initials, score)) = self.state.submit_initials(&input.value()) else {
                return;
            };
            input.set_value("");
            let _ = input.blur();

            let now = js_sys::Date::now();
            match HighScores::record(self.store.as_mut(), &initials, score, now) {
                Ok(scores) => self.high_scores = scores,
                Err(e) => {
                    log::error!("Error saving high score: {}", e);
                    self.high_scores.add_score(&initials, score, now);
                }
            }
            self.refresh_high_scores(document);
        }

        /// Advance loader, simulation and audio
        fn update(&mut self, dt: f32, now: f64) {
            if self.state.phase == GamePhase::Loading {
                self.loader.advance(dt as f64 * 1000.0);
                if self.loader.is_done() {
                    self.state.finish_loading();
                    self.audio
                        .play_music(MusicTrack::Menu, self.music_volume(MusicTrack::Menu));
                }
            }

            let dt = dt.min(0.1);
            self.accumulator += dt;

            let mut substeps = 0;
            while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                self.input.move_up = self.keys.up_held();
                self.input.move_down = self.keys.down_held();
                let input = self.input.clone();
                tick(&mut self.state, &input);
                self.accumulator -= SIM_DT;
                substeps += 1;

                // Clear one-shot inputs after processing
                self.input.fire = false;
                self.input.quit = false;
            }

            self.handle_events(now);
            self.audio.update();
        }

        /// Route simulation events to audio and the HUD
        fn handle_events(&mut self, now: f64) {
            for event in self.state.drain_events() {
                for effect in effects_for_event(&event) {
                    self.audio.play(effect);
                }
                if let Some(track) = music_for_event(&event) {
                    self.audio.play_music(track, self.music_volume(track));
                }
                match event {
                    GameEvent::ScoreChanged { delta, .. } => {
                        self.score_flash
                            .trigger(delta, now, self.settings.score_flash());
                    }
                    GameEvent::RunEnded { by_collision, score } => {
                        log::info!("Run over: {} (collision: {})", score, by_collision);
                    }
                    _ => {}
                }
            }
        }

        /// Render the current frame
        fn render(&mut self, time: f64) {
            if let Some(ref mut render_state) = self.render_state {
                match render_state.render(&self.state, &self.settings, time) {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        render_state.resize(render_state.size.0, render_state.size.1);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of memory!");
                    }
                    Err(e) => log::warn!("Render error: {:?}", e),
                }
            }
        }

        /// Mirror loader, overlays and score into the DOM
        fn update_hud(&mut self, document: &Document, now: f64) {
            let phase = self.state.phase;

            if phase == GamePhase::Loading {
                let view = self.loader.view();
                set_hidden(document, "press-play", !view.press_play);
                set_hidden(document, "commodore-pattern", !view.retro);
                set_text(document, "loading-message", view.message);
                if let Some(bar) = html_element(document, "loading-bar") {
                    let _ = bar
                        .style()
                        .set_property("width", &format!("{:.0}%", view.progress));
                }
            }

            if self.shown_phase != Some(phase) {
                let overlays = OverlayVisibility::for_phase(phase);
                set_hidden(document, "loader-screen", !overlays.loader);
                set_hidden(document, "menu-overlay", !overlays.menu);
                set_hidden(document, "initials-overlay", !overlays.initials);
                set_hidden(document, "score-display", !overlays.score);

                if phase == GamePhase::EnterInitials {
                    set_text(document, "final-score", &format_score(self.state.score));
                    if let Some(input) = initials_input(document) {
                        let _ = input.focus();
                    }
                }
                if phase == GamePhase::Menu {
                    self.refresh_high_scores(document);
                }
                self.shown_phase = Some(phase);
            }

            if phase == GamePhase::Playing {
                set_text(document, "score-display", &score_text(self.state.score));
            }

            if let Some(el) = document.get_element_by_id("score-display") {
                let flash = self.score_flash.current(now);
                let classes = el.class_list();
                let _ = classes.toggle_with_force(FLASH_GAIN_CLASS, flash == Some(FlashKind::Gain));
                let _ = classes.toggle_with_force(FLASH_LOSS_CLASS, flash == Some(FlashKind::Loss));
            }
        }

        fn refresh_high_scores(&self, document: &Document) {
            let Some(list) = document.get_element_by_id("high-scores-list") else {
                return;
            };
            list.set_inner_html("");
            for line in high_score_lines(&self.high_scores) {
                if let Ok(item) = document.create_element("li") {
                    item.set_text_content(Some(&line));
                    let _ = list.append_child(&item);
                }
            }
        }

        /// Canvas resized to `css` logical pixels and `backing` device pixels
        fn resize(&mut self, css: (f32, f32), backing: (u32, u32)) {
            self.state.set_viewport(Viewport::new(css.0, css.1));
            if let Some(ref mut render_state) = self.render_state {
                render_state.resize(backing.0, backing.1);
            }
        }
    }

    fn html_element(document: &Document, id: &str) -> Option<HtmlElement> {
        document.get_element_by_id(id)?.dyn_into().ok()
    }

    fn initials_input(document: &Document) -> Option<HtmlInputElement> {
        document.get_element_by_id("initials-input")?.dyn_into().ok()
    }

    fn set_hidden(document: &Document, id: &str, hidden: bool) {
        if let Some(el) = document.get_element_by_id(id) {
            let _ = el.class_list().toggle_with_force("hidden", hidden);
        }
    }

    fn set_text(document: &Document, id: &str, text: &str) {
        if let Some(el) = document.get_element_by_id(id) {
            if el.text_content().as_deref() != Some(text) {
                el.set_text_content(Some(text));
            }
        }
    }

    /// Size the canvas to 95% of the window; returns (css, backing) sizes
    fn fit_canvas(window: &web_sys::Window, canvas: &HtmlCanvasElement) -> ((f32, f32), (u32, u32)) {
        let inner_w = window.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(1280.0);
        let inner_h = window.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(720.0);
        let css_w = (inner_w * CANVAS_FILL).floor().max(1.0);
        let css_h = (inner_h * CANVAS_FILL).floor().max(1.0);

        let style = canvas.style();
        let _ = style.set_property("width", &format!("{}px", css_w));
        let _ = style.set_property("height", &format!("{}px", css_h));

        let dpr = window.device_pixel_ratio();
        let width = (css_w * dpr) as u32;
        let height = (css_h * dpr) as u32;
        canvas.set_width(width);
        canvas.set_height(height);

        ((css_w as f32, css_h as f32), (width, height))
    }

    async fn init_renderer(
        canvas: &HtmlCanvasElement,
        width: u32,
        height: u32,
        settings: &Settings,
    ) -> Result<SdfRenderState, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::BROWSER_WEBGPU | wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance.create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        log::info!("Using adapter: {:?}", adapter.get_info().name);

        SdfRenderState::new(surface, &adapter, width, height, settings).await
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::error_1(&format!("Failed to init logger: {}", e).into());
        }

        log::info!("Jingle Rocket starting...");

        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(document) = window.document() else {
            log::error!("No document");
            return;
        };
        let Some(canvas) = document
            .get_element_by_id("canvas")
            .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
        else {
            log::error!("No canvas element");
            return;
        };

        let (css, backing) = fit_canvas(&window, &canvas);
        let _ = canvas.style().set_property("cursor", "none");

        // Initialize game
        let seed = js_sys::Date::now() as u64;
        let game = Rc::new(RefCell::new(Game::new(seed, Viewport::new(css.0, css.1))));
        log::info!("Game initialized with seed: {}", seed);

        let settings = game.borrow().settings.clone();
        match init_renderer(&canvas, backing.0, backing.1, &settings).await {
            Ok(mut render_state) => {
                render_state.set_start_time(window.performance().map(|p| p.now()).unwrap_or(0.0));
                game.borrow_mut().render_state = Some(render_state);
            }
            Err(e) => log::error!("Renderer unavailable: {}", e),
        }

        game.borrow().refresh_high_scores(&document);

        setup_input_handlers(&window, &canvas, game.clone());
        setup_resize_handler(&window, &canvas, game.clone());

        // Start game loop
        request_animation_frame(game);

        log::info!("Jingle Rocket running!");
    }

    fn setup_input_handlers(window: &web_sys::Window, canvas: &HtmlCanvasElement, game: Rc<RefCell<Game>>) {
        // Keyboard down
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let Some(document) = web_sys::window().and_then(|w| w.document()) else {
                    return;
                };
                let mut g = game.borrow_mut();
                g.unlock_audio();

                let key = event.key();
                g.keys.press(&key);
                match g.state.phase {
                    GamePhase::Loading => g.loader.key_pressed(),
                    GamePhase::Menu => {
                        if key == "Enter" {
                            g.start_run();
                        }
                    }
                    GamePhase::Playing => match key.as_str() {
                        " " => {
                            event.prevent_default();
                            g.input.fire = true;
                        }
                        "Escape" => g.input.quit = true,
                        _ => {}
                    },
                    GamePhase::EnterInitials => {
                        if key == "Enter" {
                            event.prevent_default();
                            g.submit_initials(&document);
                        }
                    }
                }
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Keyboard up
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                game.borrow_mut().keys.release(&event.key());
            });
            let _ = window
                .add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Window blur swallows keyup events
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                game.borrow_mut().keys.clear();
            });
            let _ = window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Mouse move - aim the cursor sight
        {
            let game = game.clone();
            let canvas_clone = canvas.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let r = canvas_clone.get_bounding_client_rect();
                let rect = CanvasRect {
                    left: r.left() as f32,
                    top: r.top() as f32,
                    width: r.width() as f32,
                    height: r.height() as f32,
                };
                let mut g = game.borrow_mut();
                let viewport = g.state.viewport;
                g.input.aim = Some(screen_to_world(
                    event.client_x() as f32,
                    event.client_y() as f32,
                    rect,
                    viewport,
                ));
            });
            let _ = canvas
                .add_event_listener_with_callback("mousemove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Click - audio may only start after a user gesture
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                game.borrow_mut().unlock_audio();
            });
            let _ = window
                .add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_resize_handler(window: &web_sys::Window, canvas: &HtmlCanvasElement, game: Rc<RefCell<Game>>) {
        let canvas = canvas.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let Some(window) = web_sys::window() else {
                return;
            };
            let (css, backing) = fit_canvas(&window, &canvas);
            game.borrow_mut().resize(css, backing);
        });
        let _ = window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        {
            let mut g = game.borrow_mut();

            // Calculate delta time
            let dt = if g.last_time > 0.0 {
                ((time - g.last_time) / 1000.0) as f32
            } else {
                SIM_DT
            };
            g.last_time = time;

            g.update(dt, time);
            g.render(time);
            if let Some(document) = web_sys::window().and_then(|w| w.document()) {
                g.update_hud(&document, time);
            }
        }

        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Jingle Rocket (native) starting...");
    log::info!("Native mode has no window - run with `trunk serve` for the web version");

    headless_demo();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Play one scripted run without a window and print what happened
#[cfg(not(target_arch = "wasm32"))]
fn headless_demo() {
    use glam::Vec2;
    use jingle_rocket::consts::TICKS_PER_SECOND;
    use jingle_rocket::highscores::{HighScores, format_score};
    use jingle_rocket::platform::default_store;
    use jingle_rocket::sim::{GamePhase, GameState, TickInput, tick};
    use jingle_rocket::{Settings, Viewport};

    let mut store = default_store();
    let settings = Settings::load(store.as_ref());

    let mut state = GameState::new(7, Viewport::default());
    state.max_particles = settings.max_particles();
    state.finish_loading();
    state.start_run(7);

    // Sweep up and down while firing straight ahead for up to two minutes
    let mut input = TickInput {
        aim: Some(Vec2::new(state.viewport.half_width(), 0.0)),
        ..TickInput::default()
    };
    for t in 0..(120 * TICKS_PER_SECOND) {
        if state.phase != GamePhase::Playing {
            break;
        }
        let going_up = (t / 90) % 2 == 0;
        input.move_up = going_up;
        input.move_down = !going_up;
        input.fire = t % 5 == 0;
        input.aim = Some(state.ship.pos + Vec2::new(400.0, 0.0));
        tick(&mut state, &input);
    }

    let events = state.drain_events();
    log::info!("{} events recorded", events.len());
    println!(
        "Run finished after {:.1}s with score {} (health {})",
        state.run_ticks as f32 / TICKS_PER_SECOND as f32,
        format_score(state.score),
        state.ship.health
    );

    if state.phase == GamePhase::Playing {
        state.end_run(true);
    }
    if let Some((initials, score)) = state.submit_initials("cpu") {
        match HighScores::record(store.as_mut(), &initials, score, 0.0) {
            Ok(scores) => println!("High scores: {:?}", scores.display_rows()),
            Err(e) => log::error!("Error saving high score: {}", e),
        }
    }
}
