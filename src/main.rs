//! Tumble Tower entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{HtmlElement, MouseEvent};

    use tumble_tower::Settings;
    use tumble_tower::client_to_ndc;
    use tumble_tower::sim::{
        BlockId, Camera, GameEvent, GameState, InputEvent, StackWorld, pick, tick,
    };

    // Hands block transforms to whatever renderer the page provides
    #[wasm_bindgen(inline_js = "
        export function publish_blocks(data) {
            if (window.renderTowerBlocks) {
                window.renderTowerBlocks(data);
            }
        }
    ")]
    extern "C" {
        fn publish_blocks(data: &[f32]);
    }

    thread_local! {
        static GAME: RefCell<Option<Rc<RefCell<Game>>>> = const { RefCell::new(None) };
    }

    /// Pointer listeners, kept so they can be detached on game over
    struct PointerListeners {
        on_move: Closure<dyn FnMut(MouseEvent)>,
        on_click: Closure<dyn FnMut(MouseEvent)>,
    }

    /// Game instance holding all state
    struct Game {
        state: GameState,
        world: StackWorld,
        camera: Camera,
        /// Pointer input since the last frame
        inputs: Vec<InputEvent>,
        listeners: Option<PointerListeners>,
        /// Wall-clock start of the match (ms since epoch)
        started_at: Option<f64>,
    }

    impl Game {
        fn new(settings: Settings) -> Self {
            let camera = Camera {
                fov_y: settings.fov_degrees.to_radians(),
                ..Default::default()
            };
            Self {
                state: GameState::new(settings),
                world: StackWorld::default(),
                camera,
                inputs: Vec::new(),
                listeners: None,
                started_at: None,
            }
        }

        /// Run one frame of the simulation
        fn update(&mut self, time: f64) {
            let inputs = std::mem::take(&mut self.inputs);
            tick(&mut self.state, &mut self.world, &self.camera, &inputs, time);
        }

        /// Push block transforms to the page: [x, y, z, yaw, visible] per block
        fn publish(&self) {
            let mut data = Vec::with_capacity(self.state.visuals.len() * 5);
            for v in &self.state.visuals {
                data.extend_from_slice(&[
                    v.position.x,
                    v.position.y,
                    v.position.z,
                    v.yaw,
                    if v.visible { 1.0 } else { 0.0 },
                ]);
            }
            publish_blocks(&data);
        }

        /// Update HUD elements in DOM from drained events
        fn update_hud(&mut self) {
            for event in self.state.drain_events() {
                match event {
                    GameEvent::Stabilizing | GameEvent::TurnChanged { .. } => {
                        set_text("player-turn", &self.state.turn_display());
                    }
                    GameEvent::BlockRemoved { block, by } => {
                        log::debug!("Block {} taken by player {}", block.0, by.number());
                    }
                    GameEvent::GameOver { message, .. } => {
                        self.detach_pointer();
                        if let Some(start) = self.started_at {
                            let secs = (js_sys::Date::now() - start) / 1000.0;
                            log::info!("{} after {:.1} s", message, secs);
                        }
                        set_display("game-over", "block");
                        set_text("game-over-h1", &message);
                        set_display("overlay", "none");
                        set_display("ui", "none");
                    }
                }
            }
        }

        fn detach_pointer(&mut self) {
            let Some(listeners) = self.listeners.take() else {
                return;
            };
            if let Some(window) = web_sys::window() {
                let _ = window.remove_event_listener_with_callback(
                    "mousemove",
                    listeners.on_move.as_ref().unchecked_ref(),
                );
                let _ = window.remove_event_listener_with_callback(
                    "click",
                    listeners.on_click.as_ref().unchecked_ref(),
                );
            }
            log::info!("Pointer input detached");
        }

        /// Keep the camera's aspect ratio in step with the window
        fn resize(&mut self, width: f32, height: f32) {
            if height > 0.0 {
                self.camera.aspect = width / height;
            }
        }
    }

    fn set_text(id: &str, text: &str) {
        let document = web_sys::window().and_then(|w| w.document());
        if let Some(el) = document.and_then(|d| d.get_element_by_id(id)) {
            el.set_text_content(Some(text));
        }
    }

    fn set_display(id: &str, value: &str) {
        let document = web_sys::window().and_then(|w| w.document());
        if let Some(el) = document
            .and_then(|d| d.get_element_by_id(id))
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
        {
            let _ = el.style().set_property("display", value);
        }
    }

    fn window_size() -> (f32, f32) {
        let Some(window) = web_sys::window() else {
            return (1.0, 1.0);
        };
        let w = window.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(1.0);
        let h = window.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(1.0);
        (w as f32, h as f32)
    }

    /// Report a block whose model failed to load
    #[wasm_bindgen]
    pub fn block_load_failed(index: u32) {
        GAME.with(|slot| {
            if let Some(game) = slot.borrow().as_ref() {
                if let Err(e) = game.borrow_mut().state.mark_load_failed(BlockId(index)) {
                    log::warn!("{}", e);
                }
            }
        });
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::error_1(&format!("Logger init failed: {}", e).into());
        }

        log::info!("Tumble Tower starting...");

        let settings = Settings::load();
        let game = Rc::new(RefCell::new(Game::new(settings)));
        let (w, h) = window_size();
        game.borrow_mut().resize(w, h);
        GAME.with(|slot| *slot.borrow_mut() = Some(game.clone()));

        set_text("player-turn", &game.borrow().state.turn_display());

        setup_start_button(game.clone());
        setup_restart_button();
        setup_resize(game.clone());

        // Start game loop
        request_animation_frame(game);

        log::info!("Tumble Tower running!");
    }

    /// Build the pointer listeners and attach them to the window
    fn attach_pointer(game: &Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };

        // Mouse move - queue absolute position; the core works out the delta
        let on_move = {
            let game = game.clone();
            Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let pos = glam::Vec2::new(event.client_x() as f32, event.client_y() as f32);
                game.borrow_mut().inputs.push(InputEvent::PointerMove { pos });
            })
        };

        // Click - pick under the pointer and queue it
        let on_click = {
            let game = game.clone();
            Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let (w, h) = window_size();
                let x = event.client_x() as f32;
                let y = event.client_y() as f32;
                let mut g = game.borrow_mut();
                let ray = g.camera.ray(client_to_ndc(x, y, w, h));
                let target = pick(&ray, &g.state.visuals);
                g.inputs.push(InputEvent::PointerDown {
                    pos: glam::Vec2::new(x, y),
                    target,
                });
            })
        };

        let _ = window
            .add_event_listener_with_callback("mousemove", on_move.as_ref().unchecked_ref());
        let _ = window
            .add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref());

        game.borrow_mut().listeners = Some(PointerListeners { on_move, on_click });
    }

    fn setup_start_button(game: Rc<RefCell<Game>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };

        if let Some(btn) = document.get_element_by_id("start-button") {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                if game.borrow().started_at.is_some() || game.borrow().state.is_over() {
                    return;
                }
                set_display("ui", "block");
                set_display("overlay", "none");
                game.borrow_mut().started_at = Some(js_sys::Date::now());
                // The click that pressed start is still bubbling to the
                // window; attach after it so it is not read as a pick
                defer(ATTACH_DELAY_MS, {
                    let game = game.clone();
                    move || attach_pointer(&game)
                });
                log::info!("Game started");
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    /// Delay before pointer listeners go live after the start click
    const ATTACH_DELAY_MS: i32 = 1;

    /// Run `f` once after `delay_ms`, outside the current event dispatch
    fn defer(delay_ms: i32, f: impl FnOnce() + 'static) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(f);
        if let Err(e) = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            delay_ms,
        ) {
            log::error!("Failed to schedule callback: {:?}", e);
        }
        closure.forget();
    }

    fn setup_restart_button() {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };

        if let Some(btn) = document.get_element_by_id("restart-button") {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                // A reload rebuilds the tower from scratch
                if let Some(window) = web_sys::window() {
                    let _ = window.location().reload();
                }
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_resize(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let (w, h) = window_size();
            game.borrow_mut().resize(w, h);
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
            g.update(time);
            g.update_hud();
            g.publish();
        }

        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Tumble Tower (native) starting...");
    log::info!("Native mode runs a scripted match - serve the wasm build for the playable version");

    demo_match();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Play a short scripted match headlessly and print how it went
#[cfg(not(target_arch = "wasm32"))]
fn demo_match() {
    use glam::Vec2;
    use tumble_tower::Settings;
    use tumble_tower::sim::{Camera, GameEvent, GameState, InputEvent, StackWorld, VisualId, tick};

    let mut state = GameState::new(Settings::load());
    let mut world = StackWorld::default();
    let camera = Camera::default();
    let mut now = 0.0;

    println!("{}", state.turn_display());

    // Take a few blocks out cleanly from the top down
    for id in (24..30).rev() {
        let inputs = [
            InputEvent::PointerDown {
                pos: Vec2::new(400.0, 300.0),
                target: Some(VisualId(id)),
            },
            InputEvent::PointerMove {
                pos: Vec2::new(800.0, 300.0),
            },
            InputEvent::PointerDown {
                pos: Vec2::new(800.0, 300.0),
                target: None,
            },
        ];
        now += 16.0;
        tick(&mut state, &mut world, &camera, &inputs, now);

        while state.pending_switch.is_some() && !state.is_over() {
            now += 16.0;
            tick(&mut state, &mut world, &camera, &[], now);
        }
        println!("block {} out -> {}", id, state.turn_display());
    }

    // Then shove a neighbour out of the bottom layer by accident
    let grab = [InputEvent::PointerDown {
        pos: Vec2::new(400.0, 300.0),
        target: Some(VisualId(1)),
    }];
    now += 16.0;
    tick(&mut state, &mut world, &camera, &grab, now);

    let mut x = 400.0;
    while !state.is_over() && x < 1000.0 {
        x += 10.0;
        now += 16.0;
        let nudge = [InputEvent::PointerMove {
            pos: Vec2::new(x, 300.0),
        }];
        tick(&mut state, &mut world, &camera, &nudge, now);
    }

    for event in state.drain_events() {
        if let GameEvent::GameOver { message, .. } = event {
            println!("Game over: {}", message);
        }
    }
}
