//! Browser stage backed by the live document
//!
//! Elements are looked up by id on every call, so a node removed mid-sequence
//! shows up as `StageError::Missing` instead of a stale handle. Motion uses
//! the Web Animations API on `transform`; the grip flourish uses the
//! individual `scale`/`rotate` properties so the two never overwrite each other.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;

use glam::Vec2;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Document, HtmlButtonElement, HtmlElement, Window};

use super::{Actor, Effects, Stage, StageError};
use crate::celebrate::Particle;
use crate::config::{Config, ElementIds, Grip};
use crate::motion::{Easing, EvasionState, Rect, Viewport, parse_px};

/// Puppy pose classes, one set per state
const POSE_CLASSES: [&str; 4] = ["running", "grab", "dropping", "returning"];

fn host_error(action: &'static str, err: JsValue) -> StageError {
    StageError::Host {
        action,
        message: err.as_string().unwrap_or_else(|| format!("{:?}", err)),
    }
}

#[inline]
fn px(value: f32) -> String {
    format!("{}px", value)
}

fn set_style(el: &HtmlElement, name: &str, value: &str) -> Result<(), StageError> {
    el.style()
        .set_property(name, value)
        .map_err(|e| host_error("style", e))
}

fn set_field(target: &JsValue, key: &str, value: &JsValue) -> Result<(), StageError> {
    js_sys::Reflect::set(target, &JsValue::from_str(key), value)
        .map(|_| ())
        .map_err(|e| host_error("animate", e))
}

fn rect_from(el: &web_sys::Element) -> Rect {
    let r = el.get_bounding_client_rect();
    Rect::from_ltwh(r.left() as f32, r.top() as f32, r.width() as f32, r.height() as f32)
}

/// Committed `left`/`top`, unaffected by transforms or the grip flourish
fn layout_origin(el: &HtmlElement) -> Option<Vec2> {
    let style = el.style();
    let read = |name: &str| parse_px(&style.get_property_value(name).ok()?);
    Some(Vec2::new(read("left")?, read("top")?))
}

/// The page the controller runs against
pub struct DomStage {
    window: Window,
    document: Document,
    ids: ElementIds,
}

impl DomStage {
    pub fn new(config: &Config) -> Result<Self, StageError> {
        let window = web_sys::window().ok_or(StageError::Host {
            action: "startup",
            message: "no window".to_string(),
        })?;
        let document = window.document().ok_or(StageError::Host {
            action: "startup",
            message: "no document".to_string(),
        })?;
        Ok(Self {
            window,
            document,
            ids: config.ids.clone(),
        })
    }

    fn id(&self, actor: Actor) -> &str {
        match actor {
            Actor::Control => &self.ids.control,
            Actor::Accept => &self.ids.accept,
            Actor::Pursuer => &self.ids.pursuer,
        }
    }

    /// Live element for an actor
    pub fn element(&self, actor: Actor) -> Option<HtmlElement> {
        self.document
            .get_element_by_id(self.id(actor))?
            .dyn_into::<HtmlElement>()
            .ok()
    }

    fn require(&self, actor: Actor) -> Result<HtmlElement, StageError> {
        self.element(actor).ok_or(StageError::Missing(actor))
    }

    fn spawn_particle(&self, body: &HtmlElement, particle: &Particle) -> Result<(), StageError> {
        let el: HtmlElement = self
            .document
            .create_element("div")
            .map_err(|e| host_error("particle", e))?
            .dyn_into()
            .map_err(|e: web_sys::Element| host_error("particle", e.into()))?;
        el.set_class_name("heart-pop");
        el.set_text_content(Some(&particle.glyph.to_string()));
        set_style(&el, "left", &px(particle.origin.x))?;
        set_style(&el, "top", &px(particle.origin.y))?;
        set_style(&el, "--dx", &format!("{:.1}px", particle.drift.x))?;
        set_style(&el, "--dy", &format!("{:.1}px", particle.drift.y))?;
        body.append_child(&el).map_err(|e| host_error("particle", e))?;

        // Removed when its CSS animation ends, or by the lifetime backstop
        let remove = {
            let el = el.clone();
            Closure::<dyn FnMut()>::new(move || el.remove())
        };
        el.add_event_listener_with_callback("animationend", remove.as_ref().unchecked_ref())
            .map_err(|e| host_error("particle", e))?;
        self.window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                remove.as_ref().unchecked_ref(),
                particle.lifetime_ms as i32,
            )
            .map_err(|e| host_error("particle", e))?;
        remove.forget();
        Ok(())
    }
}

impl Stage for DomStage {
    type Tracking = DomTracking;

    fn viewport(&self) -> Viewport {
        // documentElement ignores the mobile toolbar jitter innerHeight has
        if let Some(root) = self.document.document_element() {
            let (w, h) = (root.client_width(), root.client_height());
            if w > 0 && h > 0 {
                return Viewport::new(w as f32, h as f32);
            }
        }
        let dimension = |v: Result<JsValue, JsValue>| v.ok().and_then(|v| v.as_f64()).unwrap_or(0.0) as f32;
        Viewport::new(
            dimension(self.window.inner_width()),
            dimension(self.window.inner_height()),
        )
    }

    fn rect_of(&self, actor: Actor) -> Option<Rect> {
        self.element(actor).map(|el| rect_from(&el))
    }

    fn anchor_rect(&self) -> Option<Rect> {
        self.document
            .get_element_by_id(&self.ids.mouth)
            .map(|el| rect_from(&el))
    }

    fn lock(&self, actor: Actor, origin: Vec2) -> Result<(), StageError> {
        let el = self.require(actor)?;
        set_style(&el, "position", "fixed")?;
        set_style(&el, "margin", "0")?;
        set_style(&el, "left", &px(origin.x))?;
        set_style(&el, "top", &px(origin.y))?;
        set_style(&el, "transform", "none")
    }

    fn commit(&self, actor: Actor, origin: Vec2) -> Result<(), StageError> {
        let el = self.require(actor)?;
        set_style(&el, "left", &px(origin.x))?;
        set_style(&el, "top", &px(origin.y))?;
        set_style(&el, "transform", "none")
    }

    fn set_interactive(&self, actor: Actor, interactive: bool) {
        let Some(el) = self.element(actor) else {
            return;
        };
        if let Some(button) = el.dyn_ref::<HtmlButtonElement>() {
            button.set_disabled(!interactive);
        }
        let classes = el.class_list();
        let style = el.style();
        if interactive {
            let _ = classes.remove_1("targeted");
            let _ = style.remove_property("pointer-events");
            let _ = el.remove_attribute("aria-disabled");
        } else {
            let _ = classes.add_1("targeted");
            let _ = style.set_property("pointer-events", "none");
            let _ = el.set_attribute("aria-disabled", "true");
        }
    }

    fn set_pose(&self, state: EvasionState) {
        let Some(el) = self.element(Actor::Pursuer) else {
            return;
        };
        let classes = el.class_list();
        for class in POSE_CLASSES {
            let _ = classes.remove_1(class);
        }
        let pose: &[&str] = match state {
            EvasionState::Idle => &[],
            EvasionState::Running => &["running"],
            EvasionState::Grabbing => &["grab"],
            EvasionState::Carrying => &["running", "grab"],
            EvasionState::Dropping => &["dropping"],
            EvasionState::Returning => &["returning"],
        };
        for class in pose {
            let _ = classes.add_1(class);
        }
    }

    fn set_grip(&self, grip: Option<Grip>, transition_ms: u32) {
        let Some(el) = self.element(Actor::Control) else {
            return;
        };
        let style = el.style();
        let _ = style.set_property(
            "transition",
            &format!("scale {ms}ms ease, rotate {ms}ms ease", ms = transition_ms),
        );
        match grip {
            Some(grip) => {
                let _ = el.class_list().add_1("grabbed");
                let _ = style.set_property("scale", &grip.scale.to_string());
                let _ = style.set_property("rotate", &format!("{}deg", grip.rotate_deg));
            }
            None => {
                let _ = el.class_list().remove_1("grabbed");
                let _ = style.remove_property("scale");
                let _ = style.remove_property("rotate");
            }
        }
    }

    fn animate(
        &self,
        actor: Actor,
        to: Vec2,
        duration_ms: u32,
        easing: Easing,
    ) -> impl Future<Output = Result<(), StageError>> {
        translate(self.element(actor), actor, to, duration_ms, easing)
    }

    fn track(&self, follower: Actor, leader: Actor, offset: Vec2) -> DomTracking {
        let tracking = DomTracking {
            window: self.window.clone(),
            active: Rc::new(Cell::new(true)),
            frame_id: Rc::new(Cell::new(None)),
            callback: Rc::new(RefCell::new(None)),
        };
        let (Some(follower_el), Some(leader_el)) = (self.element(follower), self.element(leader))
        else {
            log::warn!("Cannot track {} to {}", follower.as_str(), leader.as_str());
            return tracking;
        };

        let window = self.window.clone();
        let active = tracking.active.clone();
        let frame_id = tracking.frame_id.clone();
        let callback = tracking.callback.clone();
        *tracking.callback.borrow_mut() = Some(Closure::new(move |_time: f64| {
            if !active.get() {
                return;
            }
            let leader = rect_from(&leader_el);
            let style = follower_el.style();
            let _ = style.set_property("left", &px(leader.left() + offset.x));
            let _ = style.set_property("top", &px(leader.top() + offset.y));

            if let Some(cb) = callback.borrow().as_ref() {
                frame_id.set(window.request_animation_frame(cb.as_ref().unchecked_ref()).ok());
            }
        }));

        if let Some(cb) = tracking.callback.borrow().as_ref() {
            tracking
                .frame_id
                .set(self.window.request_animation_frame(cb.as_ref().unchecked_ref()).ok());
        }
        tracking
    }
}

impl Effects for DomStage {
    fn release_particles(&self, particles: &[Particle]) {
        let Some(body) = self.document.body() else {
            log::warn!("No document body for particles");
            return;
        };
        for particle in particles {
            if let Err(e) = self.spawn_particle(&body, particle) {
                log::warn!("Dropped a particle: {}", e);
            }
        }
    }

    fn announce(&self, message: &str, delay_ms: u32) {
        let window = self.window.clone();
        let message = message.to_string();
        let show = Closure::once_into_js(move || {
            let _ = window.alert_with_message(&message);
        });
        if let Err(e) = self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(show.unchecked_ref(), delay_ms as i32)
        {
            log::warn!("Could not schedule the confirmation: {:?}", e);
        }
    }
}

/// Animate the rendered offset, then cancel the animation handle.
/// Without Web Animations this resolves at once and the caller jump-cuts.
async fn translate(
    element: Option<HtmlElement>,
    actor: Actor,
    to: Vec2,
    duration_ms: u32,
    easing: Easing,
) -> Result<(), StageError> {
    let element = element.ok_or(StageError::Missing(actor))?;

    // Older engines and some embedded webviews lack `Element.animate`
    let Ok(animate) = js_sys::Reflect::get(&element, &JsValue::from_str("animate"))
        .map_err(|e| host_error("animate", e))?
        .dyn_into::<js_sys::Function>()
    else {
        log::debug!("Web Animations unavailable, jump-cutting {}", actor.as_str());
        return Ok(());
    };

    let from = layout_origin(&element).unwrap_or_else(|| rect_from(&element).origin);
    let delta = to - from;

    let keyframes = js_sys::Array::new();
    for offset in [Vec2::ZERO, delta] {
        let frame = js_sys::Object::new();
        set_field(
            &frame,
            "transform",
            &JsValue::from_str(&format!("translate({}px, {}px)", offset.x, offset.y)),
        )?;
        keyframes.push(&frame);
    }

    let options = js_sys::Object::new();
    set_field(&options, "duration", &JsValue::from_f64(duration_ms as f64))?;
    set_field(&options, "easing", &JsValue::from_str(&easing.css()))?;
    set_field(&options, "fill", &JsValue::from_str("forwards"))?;

    let animation: web_sys::Animation = animate
        .call2(&element, &keyframes, &options)
        .map_err(|e| host_error("animate", e))?
        .unchecked_into();
    let finished = animation.finished().map_err(|e| host_error("animate", e))?;
    JsFuture::from(finished)
        .await
        .map_err(|e| host_error("animate", e))?;
    animation.cancel();
    Ok(())
}

/// Per-frame follow loop; cancels its pending frame on drop
pub struct DomTracking {
    window: Window,
    active: Rc<Cell<bool>>,
    frame_id: Rc<Cell<Option<i32>>>,
    callback: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>,
}

impl Drop for DomTracking {
    fn drop(&mut self) {
        self.active.set(false);
        if let Some(id) = self.frame_id.take() {
            let _ = self.window.cancel_animation_frame(id);
        }
        // Breaks the closure's reference cycle through `callback`
        self.callback.borrow_mut().take();
    }
}
