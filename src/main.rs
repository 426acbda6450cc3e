//! Runaway No entry point
//!
//! On the web this wires the page's buttons to the evasion controller and the
//! celebration. Natively it plays one sequence against the headless stage.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_app {
    use std::rc::Rc;

    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::spawn_local;
    use web_sys::{AddEventListenerOptions, Event, PointerEvent, TouchEvent};

    use runaway_no::celebrate;
    use runaway_no::platform::Actor;
    use runaway_no::platform::dom::DomStage;
    use runaway_no::{Config, EvasionController};

    type Controller = Rc<EvasionController<DomStage>>;

    /// Start a sequence; the controller drops it if one is already running
    fn trigger(controller: &Controller, source: &'static str) {
        let controller = controller.clone();
        spawn_local(async move {
            let outcome = controller.evade().await;
            log::debug!("{} -> {:?}", source, outcome);
        });
    }

    pub fn run() {
        console_error_panic_hook::set_once();

        let loaded = Config::load();
        let level = loaded.as_ref().map(Config::level).unwrap_or(log::Level::Info);
        let _ = console_log::init_with_level(level);

        let config = Rc::new(match loaded {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring page configuration: {}", e);
                Config::default()
            }
        });

        log::info!("Runaway No starting...");

        let stage = match DomStage::new(&config) {
            Ok(stage) => stage,
            Err(e) => {
                log::error!("Cannot start: {}", e);
                return;
            }
        };

        let seed = config.seed.unwrap_or_else(|| js_sys::Date::now() as u64);
        let controller: Controller = Rc::new(EvasionController::new(stage, config.clone(), seed));
        log::debug!("Seeded with {}", seed);

        if let Some(start) = config.pursuer_start {
            if let Err(e) = controller.place_pursuer(start) {
                log::warn!("Puppy not placed: {}", e);
            }
        }

        match controller.stage().element(Actor::Control) {
            Some(control) => {
                // Click
                {
                    let controller = controller.clone();
                    let closure = Closure::<dyn FnMut(_)>::new(move |event: Event| {
                        event.prevent_default();
                        trigger(&controller, "click");
                    });
                    let _ = control
                        .add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
                    closure.forget();
                }

                // Touch, non-passive so the synthetic click can be suppressed
                {
                    let controller = controller.clone();
                    let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                        event.prevent_default();
                        trigger(&controller, "touchstart");
                    });
                    let options = AddEventListenerOptions::new();
                    options.set_passive(false);
                    let _ = control.add_event_listener_with_callback_and_add_event_listener_options(
                        "touchstart",
                        closure.as_ref().unchecked_ref(),
                        &options,
                    );
                    closure.forget();
                }

                // Hover, real mice only
                if config.triggers.hover {
                    let controller = controller.clone();
                    let closure = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
                        if controller.config().triggers.hover_from(&event.pointer_type()) {
                            trigger(&controller, "pointerenter");
                        }
                    });
                    let _ = control.add_event_listener_with_callback(
                        "pointerenter",
                        closure.as_ref().unchecked_ref(),
                    );
                    closure.forget();
                }

                // Keyboard focus
                if config.triggers.focus {
                    let controller = controller.clone();
                    let closure = Closure::<dyn FnMut(_)>::new(move |_event: Event| {
                        trigger(&controller, "focus");
                    });
                    let _ = control
                        .add_event_listener_with_callback("focus", closure.as_ref().unchecked_ref());
                    closure.forget();
                }
            }
            None => log::warn!("No \"{}\" element, nothing to evade with", config.ids.control),
        }

        // Yes
        if let Some(accept) = controller.stage().element(Actor::Accept) {
            let controller = controller.clone();
            let mut rng = Pcg32::seed_from_u64(seed.rotate_left(32));
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: Event| {
                celebrate::accept(
                    controller.stage(),
                    &controller.config().celebration,
                    &mut rng,
                );
            });
            let _ = accept.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        } else {
            log::warn!("No \"{}\" element, nobody can say yes", config.ids.accept);
        }

        // Keep the resting puppy on screen
        if let Some(window) = web_sys::window() {
            let controller = controller.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: Event| {
                if let Some(origin) = controller.on_resize() {
                    log::debug!("Puppy re-clamped to {:?}", origin);
                }
            });
            let _ = window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_app::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Runaway No (native) starting...");
    log::info!("The page itself needs a browser - run with `trunk serve` for the web version");

    println!("\nPlaying one evasion on the headless stage...");
    headless_demo();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn headless_demo() {
    use std::rc::Rc;

    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use runaway_no::motion::{Rect, Viewport};
    use runaway_no::platform::{Actor, HeadlessStage};
    use runaway_no::{Config, EvasionController, celebrate};

    let config = Rc::new(Config::load().unwrap_or_default());
    let stage = HeadlessStage::new(Viewport::new(1000.0, 800.0));
    stage.place(Actor::Control, Rect::from_ltwh(20.0, 20.0, 120.0, 48.0));
    stage.place(Actor::Accept, Rect::from_ltwh(440.0, 380.0, 120.0, 48.0));
    stage.place(Actor::Pursuer, Rect::from_ltwh(18.0, 18.0, 90.0, 70.0));

    let seed = config.seed.unwrap_or(0xB0BA);
    let controller = EvasionController::new(stage.clone(), config.clone(), seed);

    let outcome = futures::executor::block_on(controller.evade());
    println!(
        "  {:?} after {} frames, puppy back to {}",
        outcome,
        stage.frames().len(),
        controller.state().as_str()
    );

    let mut rng = Pcg32::seed_from_u64(seed.rotate_left(32));
    let hearts = celebrate::accept(&stage, &config.celebration, &mut rng);
    println!("  Yes! {} hearts, then {:?}", hearts, config.celebration.message);
}
