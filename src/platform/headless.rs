//! In-memory stage
//!
//! Models each actor as a layout origin plus a transient translation, the
//! same split the browser has between `left/top` and `transform`. Animations
//! advance one fixed frame per poll and yield in between, so a sequence can
//! be stepped, interleaved and inspected deterministically.

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use glam::Vec2;

use super::{Actor, Effects, Stage, StageError};
use crate::celebrate::Particle;
use crate::config::Grip;
use crate::motion::{Easing, EvasionState, Rect, Transition, Viewport};

/// Simulated frame length (60 Hz, rounded)
pub const FRAME_MS: f64 = 16.0;

/// Snapshot taken after every animation frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub pose: EvasionState,
    /// Rendered control origin
    pub control: Option<Vec2>,
    /// Rendered puppy origin
    pub pursuer: Option<Vec2>,
}

#[derive(Debug, Clone, Copy)]
struct Body {
    layout: Vec2,
    size: Vec2,
    transform: Vec2,
    interactive: bool,
    locked: bool,
}

impl Body {
    fn rendered(&self) -> Vec2 {
        self.layout + self.transform
    }
}

#[derive(Debug, Clone, Copy)]
struct Follow {
    id: u64,
    follower: Actor,
    leader: Actor,
    offset: Vec2,
}

#[derive(Debug)]
struct Scene {
    viewport: Viewport,
    bodies: HashMap<Actor, Body>,
    /// Mouth anchor relative to the puppy origin
    mouth: Option<Rect>,
    pose: EvasionState,
    grip: Option<Grip>,
    follows: Vec<Follow>,
    next_follow_id: u64,
    frames: Vec<Frame>,
    frame_count: u32,
    animations: bool,
    animation_failure: bool,
    scheduled_removal: Option<(Actor, u32)>,
    /// Milliseconds of simulated time
    clock_ms: f64,
    /// Live particles with their removal time
    particles: Vec<(Particle, f64)>,
    announcements: Vec<(String, u32)>,
}

impl Scene {
    fn rendered(&self, actor: Actor) -> Option<Vec2> {
        self.bodies.get(&actor).map(Body::rendered)
    }

    fn advance(&mut self, ms: f64) {
        self.clock_ms += ms;
        let now = self.clock_ms;
        self.particles.retain(|&(_, expires)| expires > now);
    }

    /// Advance one frame with `actor` rendered at `origin`
    fn step(&mut self, actor: Actor, origin: Vec2) -> Result<(), StageError> {
        self.frame_count += 1;
        self.advance(FRAME_MS);
        if let Some((victim, at)) = self.scheduled_removal {
            if self.frame_count >= at {
                self.bodies.remove(&victim);
                self.scheduled_removal = None;
            }
        }

        let body = self
            .bodies
            .get_mut(&actor)
            .ok_or(StageError::Missing(actor))?;
        body.transform = origin - body.layout;

        for follow in self.follows.clone() {
            let Some(leader) = self.rendered(follow.leader) else {
                continue;
            };
            if let Some(follower) = self.bodies.get_mut(&follow.follower) {
                follower.layout = leader + follow.offset;
            }
        }

        self.frames.push(Frame {
            pose: self.pose,
            control: self.rendered(Actor::Control),
            pursuer: self.rendered(Actor::Pursuer),
        });
        Ok(())
    }
}

/// Shared handle to an in-memory scene
#[derive(Debug, Clone)]
pub struct HeadlessStage {
    scene: Rc<RefCell<Scene>>,
}

impl HeadlessStage {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            scene: Rc::new(RefCell::new(Scene {
                viewport,
                bodies: HashMap::new(),
                mouth: None,
                pose: EvasionState::Idle,
                grip: None,
                follows: Vec::new(),
                next_follow_id: 0,
                frames: Vec::new(),
                frame_count: 0,
                animations: true,
                animation_failure: false,
                scheduled_removal: None,
                clock_ms: 0.0,
                particles: Vec::new(),
                announcements: Vec::new(),
            })),
        }
    }

    /// Put an actor on the page (or move it) with no transform
    pub fn place(&self, actor: Actor, rect: Rect) {
        self.scene.borrow_mut().bodies.insert(
            actor,
            Body {
                layout: rect.origin,
                size: rect.size,
                transform: Vec2::ZERO,
                interactive: true,
                locked: false,
            },
        );
    }

    /// Give the puppy a mouth anchor, relative to its origin
    pub fn attach_mouth(&self, relative: Rect) {
        self.scene.borrow_mut().mouth = Some(relative);
    }

    pub fn remove(&self, actor: Actor) {
        self.scene.borrow_mut().bodies.remove(&actor);
    }

    /// Take `actor` off the page when the animation frame counter reaches `frame`
    pub fn remove_after_frames(&self, actor: Actor, frame: u32) {
        self.scene.borrow_mut().scheduled_removal = Some((actor, frame));
    }

    /// Behave like a host without the Web Animations API
    pub fn disable_animations(&self) {
        self.scene.borrow_mut().animations = false;
    }

    /// Reject every animation request
    pub fn fail_animations(&self) {
        self.scene.borrow_mut().animation_failure = true;
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        self.scene.borrow_mut().viewport = viewport;
    }

    pub fn layout_origin(&self, actor: Actor) -> Option<Vec2> {
        self.scene.borrow().bodies.get(&actor).map(|b| b.layout)
    }

    pub fn transform(&self, actor: Actor) -> Option<Vec2> {
        self.scene.borrow().bodies.get(&actor).map(|b| b.transform)
    }

    pub fn is_interactive(&self, actor: Actor) -> Option<bool> {
        self.scene.borrow().bodies.get(&actor).map(|b| b.interactive)
    }

    pub fn is_locked(&self, actor: Actor) -> bool {
        self.scene
            .borrow()
            .bodies
            .get(&actor)
            .is_some_and(|b| b.locked)
    }

    pub fn pose(&self) -> EvasionState {
        self.scene.borrow().pose
    }

    pub fn grip(&self) -> Option<Grip> {
        self.scene.borrow().grip
    }

    /// Follow subscriptions still alive
    pub fn active_trackers(&self) -> usize {
        self.scene.borrow().follows.len()
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.scene.borrow().frames.clone()
    }

    /// Let `ms` of simulated time pass; expired particles leave the page
    pub fn advance(&self, ms: f64) {
        self.scene.borrow_mut().advance(ms);
    }

    /// Particles still on screen
    pub fn particles(&self) -> Vec<Particle> {
        self.scene.borrow().particles.iter().map(|&(p, _)| p).collect()
    }

    /// Messages shown so far with their delays
    pub fn announcements(&self) -> Vec<(String, u32)> {
        self.scene.borrow().announcements.clone()
    }

    fn with_body(&self, actor: Actor, f: impl FnOnce(&mut Body)) -> Result<(), StageError> {
        let mut scene = self.scene.borrow_mut();
        let body = scene
            .bodies
            .get_mut(&actor)
            .ok_or(StageError::Missing(actor))?;
        f(body);
        Ok(())
    }
}

impl Stage for HeadlessStage {
    type Tracking = HeadlessTracking;

    fn viewport(&self) -> Viewport {
        self.scene.borrow().viewport
    }

    fn rect_of(&self, actor: Actor) -> Option<Rect> {
        self.scene
            .borrow()
            .bodies
            .get(&actor)
            .map(|b| Rect::new(b.rendered(), b.size))
    }

    fn anchor_rect(&self) -> Option<Rect> {
        let scene = self.scene.borrow();
        let mouth = scene.mouth?;
        let pursuer = scene.rendered(Actor::Pursuer)?;
        Some(Rect::new(pursuer + mouth.origin, mouth.size))
    }

    fn lock(&self, actor: Actor, origin: Vec2) -> Result<(), StageError> {
        self.with_body(actor, |body| {
            body.layout = origin;
            body.transform = Vec2::ZERO;
            body.locked = true;
        })
    }

    fn commit(&self, actor: Actor, origin: Vec2) -> Result<(), StageError> {
        self.with_body(actor, |body| {
            body.layout = origin;
            body.transform = Vec2::ZERO;
        })
    }

    fn set_interactive(&self, actor: Actor, interactive: bool) {
        let _ = self.with_body(actor, |body| body.interactive = interactive);
    }

    fn set_pose(&self, state: EvasionState) {
        self.scene.borrow_mut().pose = state;
    }

    fn set_grip(&self, grip: Option<Grip>, _transition_ms: u32) {
        self.scene.borrow_mut().grip = grip;
    }

    fn animate(
        &self,
        actor: Actor,
        to: Vec2,
        duration_ms: u32,
        easing: Easing,
    ) -> impl Future<Output = Result<(), StageError>> {
        play(Rc::clone(&self.scene), actor, to, duration_ms, easing)
    }

    fn track(&self, follower: Actor, leader: Actor, offset: Vec2) -> HeadlessTracking {
        let mut scene = self.scene.borrow_mut();
        let id = scene.next_follow_id;
        scene.next_follow_id += 1;
        scene.follows.push(Follow {
            id,
            follower,
            leader,
            offset,
        });
        HeadlessTracking {
            scene: Rc::clone(&self.scene),
            id,
        }
    }
}

impl Effects for HeadlessStage {
    fn release_particles(&self, particles: &[Particle]) {
        let mut scene = self.scene.borrow_mut();
        let now = scene.clock_ms;
        scene
            .particles
            .extend(particles.iter().map(|&p| (p, now + p.lifetime_ms as f64)));
    }

    fn announce(&self, message: &str, delay_ms: u32) {
        self.scene
            .borrow_mut()
            .announcements
            .push((message.to_string(), delay_ms));
    }
}

/// Step an animation one frame per poll
async fn play(
    scene: Rc<RefCell<Scene>>,
    actor: Actor,
    to: Vec2,
    duration_ms: u32,
    easing: Easing,
) -> Result<(), StageError> {
    let from = {
        let state = scene.borrow();
        if state.animation_failure {
            return Err(StageError::Host {
                action: "animate",
                message: "animation rejected".to_string(),
            });
        }
        let from = state.rendered(actor).ok_or(StageError::Missing(actor))?;
        if !state.animations {
            return Ok(());
        }
        from
    };

    let transition = Transition::new(from, to, duration_ms as f64, easing);
    let mut elapsed = 0.0;
    loop {
        elapsed = (elapsed + FRAME_MS).min(transition.duration_ms);
        scene.borrow_mut().step(actor, transition.sample(elapsed))?;
        if transition.is_complete(elapsed) {
            return Ok(());
        }
        NextFrame::default().await;
    }
}

/// Follow subscription; unsubscribes on drop
#[derive(Debug)]
pub struct HeadlessTracking {
    scene: Rc<RefCell<Scene>>,
    id: u64,
}

impl Drop for HeadlessTracking {
    fn drop(&mut self) {
        let id = self.id;
        self.scene.borrow_mut().follows.retain(|f| f.id != id);
    }
}

/// Pending exactly once, like waiting for the next animation frame
#[derive(Debug, Default)]
struct NextFrame {
    yielded: bool,
}

impl Future for NextFrame {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn test_rect_includes_transform() {
        let stage = HeadlessStage::new(Viewport::new(800.0, 600.0));
        stage.place(Actor::Pursuer, Rect::from_ltwh(10.0, 10.0, 50.0, 40.0));
        stage
            .scene
            .borrow_mut()
            .step(Actor::Pursuer, Vec2::new(30.0, 50.0))
            .unwrap();

        assert_eq!(stage.layout_origin(Actor::Pursuer), Some(Vec2::new(10.0, 10.0)));
        assert_eq!(stage.rect_of(Actor::Pursuer), Some(Rect::from_ltwh(30.0, 50.0, 50.0, 40.0)));
    }

    #[test]
    fn test_tracking_follows_until_dropped() {
        let stage = HeadlessStage::new(Viewport::new(800.0, 600.0));
        stage.place(Actor::Pursuer, Rect::from_ltwh(100.0, 100.0, 50.0, 40.0));
        stage.place(Actor::Control, Rect::from_ltwh(0.0, 0.0, 20.0, 10.0));

        let tracking = stage.track(Actor::Control, Actor::Pursuer, Vec2::new(5.0, 7.0));
        block_on(stage.animate(Actor::Pursuer, Vec2::new(300.0, 200.0), 100, Easing::Linear)).unwrap();
        assert_eq!(stage.active_trackers(), 1);
        assert_eq!(stage.layout_origin(Actor::Control), Some(Vec2::new(305.0, 207.0)));

        drop(tracking);
        assert_eq!(stage.active_trackers(), 0);
        block_on(stage.animate(Actor::Pursuer, Vec2::new(10.0, 10.0), 100, Easing::Linear)).unwrap();
        assert_eq!(stage.layout_origin(Actor::Control), Some(Vec2::new(305.0, 207.0)));
    }

    #[test]
    fn test_animation_frames_are_fixed_steps() {
        let stage = HeadlessStage::new(Viewport::new(800.0, 600.0));
        stage.place(Actor::Pursuer, Rect::from_ltwh(0.0, 0.0, 50.0, 40.0));
        block_on(stage.animate(Actor::Pursuer, Vec2::new(100.0, 0.0), 40, Easing::Linear)).unwrap();

        let xs: Vec<f32> = stage.frames().iter().map(|f| f.pursuer.unwrap().x).collect();
        assert_eq!(xs, vec![40.0, 80.0, 100.0]);
    }

    #[test]
    fn test_anchor_moves_with_pursuer() {
        let stage = HeadlessStage::new(Viewport::new(800.0, 600.0));
        assert_eq!(stage.anchor_rect(), None);
        stage.place(Actor::Pursuer, Rect::from_ltwh(100.0, 100.0, 50.0, 40.0));
        assert_eq!(stage.anchor_rect(), None);
        stage.attach_mouth(Rect::from_ltwh(30.0, 20.0, 4.0, 4.0));
        assert_eq!(stage.anchor_rect(), Some(Rect::from_ltwh(130.0, 120.0, 4.0, 4.0)));
    }
}
