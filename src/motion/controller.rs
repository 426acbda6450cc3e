//! Evasion controller
//!
//! Drives one "puppy carries the No button away" sequence:
//!
//! Idle -> Running -> Grabbing -> Carrying -> Dropping [-> Returning] -> Idle
//!
//! Phases run strictly in order, each awaiting the previous animation. A busy
//! flag rejects triggers while a sequence is in flight, and a drop guard
//! restores interactivity and the idle pose however the sequence ends.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::dock;
use super::geometry::{Rect, Viewport, clamp_origin};
use super::placement::{Placement, select_position};
use super::transition;
use crate::config::Config;
use crate::platform::{Actor, Stage, StageError};

/// Phase of the evasion sequence, mirrored onto the puppy's pose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvasionState {
    #[default]
    Idle,
    /// Sprinting to the button
    Running,
    /// Button snapping into the mouth
    Grabbing,
    /// Button travelling with the puppy
    Carrying,
    /// Button being set down
    Dropping,
    /// Trotting back home (only with `pursuer_home`)
    Returning,
}

impl EvasionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvasionState::Idle => "idle",
            EvasionState::Running => "running",
            EvasionState::Grabbing => "grabbing",
            EvasionState::Carrying => "carrying",
            EvasionState::Dropping => "dropping",
            EvasionState::Returning => "returning",
        }
    }
}

/// How a trigger was handled
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    /// Busy, or there is no control to move
    Ignored,
    /// No puppy on the page: the button jumped straight to its new spot
    Relocated(Vec2),
    /// Full sequence completed
    Carried(Vec2),
    /// Sequence interrupted, the button was jump-cut to its destination
    Degraded(Vec2),
    /// The button itself vanished mid-sequence
    Abandoned,
}

impl Outcome {
    /// Where the control ended up, if it moved
    pub fn destination(&self) -> Option<Vec2> {
        match *self {
            Outcome::Relocated(p) | Outcome::Carried(p) | Outcome::Degraded(p) => Some(p),
            Outcome::Ignored | Outcome::Abandoned => None,
        }
    }
}

/// Owns the busy flag and the sequence state for one page
pub struct EvasionController<S: Stage> {
    stage: S,
    config: Rc<Config>,
    busy: Cell<bool>,
    state: Cell<EvasionState>,
    rng: RefCell<Pcg32>,
}

impl<S: Stage> EvasionController<S> {
    pub fn new(stage: S, config: Rc<Config>, seed: u64) -> Self {
        Self {
            stage,
            config,
            busy: Cell::new(false),
            state: Cell::new(EvasionState::Idle),
            rng: RefCell::new(Pcg32::seed_from_u64(seed)),
        }
    }

    pub fn stage(&self) -> &S {
        &self.stage
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }

    pub fn state(&self) -> EvasionState {
        self.state.get()
    }

    /// Pin the puppy at `origin`, clamped into the viewport
    pub fn place_pursuer(&self, origin: Vec2) -> Result<Vec2, StageError> {
        let pursuer = self.require(Actor::Pursuer)?;
        let origin = clamp_origin(
            origin,
            pursuer.size,
            self.stage.viewport(),
            self.config.layout.safety_margin,
        );
        self.stage.lock(Actor::Pursuer, origin)?;
        Ok(origin)
    }

    /// Entry point for every trigger (click, tap, hover, focus)
    pub async fn evade(&self) -> Outcome {
        if self.busy.get() {
            log::debug!("Evasion already in flight, ignoring trigger");
            return Outcome::Ignored;
        }
        let Some(control) = self.stage.rect_of(Actor::Control) else {
            log::warn!("No control on the page, nothing to evade");
            return Outcome::Ignored;
        };
        if self.stage.rect_of(Actor::Pursuer).is_none() {
            return self.relocate(control);
        }

        let _busy = Busy::engage(self);
        let mut destination = None;
        match self.carry(control, &mut destination).await {
            Ok(position) => {
                log::info!("Control carried to ({:.0}, {:.0})", position.x, position.y);
                Outcome::Carried(position)
            }
            Err(e) => {
                log::warn!("Evasion sequence interrupted: {}", e);
                self.settle_after_failure(destination)
            }
        }
    }

    /// Keep the resting puppy on screen after the viewport changed
    pub fn on_resize(&self) -> Option<Vec2> {
        if self.busy.get() {
            return None;
        }
        let pursuer = self.stage.rect_of(Actor::Pursuer)?;
        let clamped = clamp_origin(
            pursuer.origin,
            pursuer.size,
            self.stage.viewport(),
            self.config.layout.safety_margin,
        );
        if clamped == pursuer.origin {
            return None;
        }
        match self.stage.commit(Actor::Pursuer, clamped) {
            Ok(()) => {
                log::debug!("Re-clamped resting puppy to ({:.0}, {:.0})", clamped.x, clamped.y);
                Some(clamped)
            }
            Err(e) => {
                log::warn!("Could not re-clamp puppy: {}", e);
                None
            }
        }
    }

    /// The whole choreography. Any `Err` leaves cleanup to the caller's guard.
    async fn carry(&self, control: Rect, destination: &mut Option<Vec2>) -> Result<Vec2, StageError> {
        let stage = &self.stage;
        let config = &*self.config;
        let timings = &config.timings;
        let margin = config.layout.safety_margin;

        // Lock in place
        stage.lock(Actor::Control, control.origin)?;
        stage.set_interactive(Actor::Control, false);

        // Sprint to the button
        self.enter(EvasionState::Running);
        let pursuer = self.require(Actor::Pursuer)?;
        let approach = dock::stand_off(&control, pursuer.size, &config.dock, stage.viewport(), margin);
        transition::run(stage, Actor::Pursuer, approach, timings.run_to_ms, config.easing).await?;

        // Grab
        self.enter(EvasionState::Grabbing);
        let pursuer = self.require(Actor::Pursuer)?;
        let mouth = dock::mouth_point(&pursuer, stage.anchor_rect(), &config.dock);
        let docked = dock::docked_origin(mouth, control.size, &config.dock);
        stage.set_grip(Some(config.dock.grip), config.dock.grip_ms);
        transition::run(stage, Actor::Control, docked, timings.grab_ms, config.easing).await?;

        // Layout size, the grip flourish only scales the rendering
        let viewport = stage.viewport();
        let placement = self.pick(control.size, viewport);
        *destination = Some(placement.position);

        // Carry, the button follows the mouth every frame
        self.enter(EvasionState::Carrying);
        let pursuer = self.require(Actor::Pursuer)?;
        let held = docked - pursuer.origin;
        let landing = control.moved_to(placement.position);
        let departure = dock::stand_off(&landing, pursuer.size, &config.dock, viewport, margin);
        {
            let _follow = stage.track(Actor::Control, Actor::Pursuer, held);
            transition::run(stage, Actor::Pursuer, departure, timings.carry_ms, config.easing).await?;
        }
        stage.commit(Actor::Control, departure + held)?;

        // Set it down
        self.enter(EvasionState::Dropping);
        stage.set_grip(None, config.dock.grip_ms);
        transition::run(
            stage,
            Actor::Control,
            placement.position,
            timings.drop_ms,
            config.settle_easing,
        )
        .await?;

        if let Some(home) = config.pursuer_home {
            self.enter(EvasionState::Returning);
            let pursuer = self.require(Actor::Pursuer)?;
            let home = clamp_origin(home, pursuer.size, stage.viewport(), margin);
            transition::run(stage, Actor::Pursuer, home, timings.return_ms, config.settle_easing).await?;
        }

        Ok(placement.position)
    }

    /// Without a puppy the button just jumps
    fn relocate(&self, control: Rect) -> Outcome {
        let placement = self.pick(control.size, self.stage.viewport());
        if let Err(e) = self.stage.lock(Actor::Control, placement.position) {
            log::warn!("Could not relocate control: {}", e);
            return Outcome::Abandoned;
        }
        log::info!(
            "No puppy on the page, control jumped to ({:.0}, {:.0})",
            placement.position.x,
            placement.position.y
        );
        Outcome::Relocated(placement.position)
    }

    /// Jump-cut the button to wherever it was headed
    fn settle_after_failure(&self, destination: Option<Vec2>) -> Outcome {
        let Some(control) = self.stage.rect_of(Actor::Control) else {
            return Outcome::Abandoned;
        };
        let position = destination
            .unwrap_or_else(|| self.pick(control.size, self.stage.viewport()).position);
        match self.stage.commit(Actor::Control, position) {
            Ok(()) => Outcome::Degraded(position),
            Err(e) => {
                log::warn!("Could not settle control: {}", e);
                Outcome::Abandoned
            }
        }
    }

    fn pick(&self, size: Vec2, viewport: Viewport) -> Placement {
        let placement = select_position(size, viewport, &self.config.layout, &mut *self.rng.borrow_mut());
        if !placement.clear_of_center {
            log::debug!(
                "No spot outside the center zone after {} attempts, using the last one",
                placement.attempts
            );
        }
        placement
    }

    fn require(&self, actor: Actor) -> Result<Rect, StageError> {
        self.stage.rect_of(actor).ok_or(StageError::Missing(actor))
    }

    fn enter(&self, state: EvasionState) {
        log::debug!("Evasion: {} -> {}", self.state.get().as_str(), state.as_str());
        self.state.set(state);
        self.stage.set_pose(state);
    }
}

/// Holds the busy flag for one sequence and undoes the lock-phase side
/// effects when dropped
struct Busy<'a, S: Stage> {
    controller: &'a EvasionController<S>,
}

impl<'a, S: Stage> Busy<'a, S> {
    fn engage(controller: &'a EvasionController<S>) -> Self {
        controller.busy.set(true);
        Self { controller }
    }
}

impl<S: Stage> Drop for Busy<'_, S> {
    fn drop(&mut self) {
        let controller = self.controller;
        let stage = &controller.stage;
        stage.set_grip(None, 0);
        stage.set_interactive(Actor::Control, true);
        controller.enter(EvasionState::Idle);
        controller.busy.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Layout;
    use crate::platform::HeadlessStage;
    use futures::FutureExt;
    use futures::executor::block_on;
    use std::future::Future;
    use std::pin::pin;
    use std::task::{Context, Poll};

    const SEED: u64 = 0xB0BA;

    fn config() -> Config {
        Config {
            layout: Layout {
                edge_padding: 16.0,
                avoid_fraction: 0.2,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn stage() -> HeadlessStage {
        let stage = HeadlessStage::new(Viewport::new(1000.0, 800.0));
        stage.place(Actor::Control, Rect::from_ltwh(20.0, 20.0, 120.0, 48.0));
        stage.place(Actor::Pursuer, Rect::from_ltwh(18.0, 18.0, 90.0, 70.0));
        stage
    }

    fn controller(stage: HeadlessStage, config: Config) -> EvasionController<HeadlessStage> {
        EvasionController::new(stage, Rc::new(config), SEED)
    }

    fn assert_released(ctl: &EvasionController<HeadlessStage>) {
        let stage = ctl.stage();
        assert!(!ctl.is_busy());
        assert_eq!(ctl.state(), EvasionState::Idle);
        assert_eq!(stage.pose(), EvasionState::Idle);
        assert_eq!(stage.is_interactive(Actor::Control), Some(true));
        assert_eq!(stage.grip(), None);
        assert_eq!(stage.active_trackers(), 0);
    }

    #[test]
    fn test_reference_scenario() {
        let ctl = controller(stage(), config());
        let outcome = block_on(ctl.evade());

        let Outcome::Carried(pos) = outcome else {
            panic!("expected a full carry, got {:?}", outcome);
        };
        assert!((16.0..=864.0).contains(&pos.x), "x = {}", pos.x);
        assert!((16.0..=736.0).contains(&pos.y), "y = {}", pos.y);
        assert_released(&ctl);
    }

    #[test]
    fn test_commits_the_selected_position() {
        let config = config();
        let ctl = controller(stage(), config.clone());
        let outcome = block_on(ctl.evade());

        // Same seed, same single draw
        let mut rng = Pcg32::seed_from_u64(SEED);
        let expected = select_position(
            Vec2::new(120.0, 48.0),
            Viewport::new(1000.0, 800.0),
            &config.layout,
            &mut rng,
        );
        assert_eq!(outcome, Outcome::Carried(expected.position));
        assert_eq!(ctl.stage().layout_origin(Actor::Control), Some(expected.position));
        assert_eq!(ctl.stage().transform(Actor::Control), Some(Vec2::ZERO));
        assert!(ctl.stage().is_locked(Actor::Control));
    }

    #[test]
    fn test_trigger_while_busy_is_ignored() {
        let ctl = controller(stage(), config());
        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);

        let mut first = pin!(ctl.evade());
        assert!(first.as_mut().poll(&mut cx).is_pending());
        assert!(ctl.is_busy());
        assert_eq!(ctl.state(), EvasionState::Running);

        let before = ctl.stage().rect_of(Actor::Control);
        assert_eq!(ctl.evade().now_or_never(), Some(Outcome::Ignored));
        assert!(ctl.is_busy());
        assert_eq!(ctl.stage().rect_of(Actor::Control), before);
        assert_eq!(ctl.stage().is_interactive(Actor::Control), Some(false));

        let outcome = loop {
            if let Poll::Ready(outcome) = first.as_mut().poll(&mut cx) {
                break outcome;
            }
        };
        assert!(matches!(outcome, Outcome::Carried(_)));
        assert_released(&ctl);

        // A fresh trigger after the sequence runs again
        assert!(matches!(block_on(ctl.evade()), Outcome::Carried(_)));
    }

    #[test]
    fn test_control_stays_in_mouth_while_carried() {
        let ctl = controller(stage(), config());
        block_on(ctl.evade());

        let carried: Vec<_> = ctl
            .stage()
            .frames()
            .into_iter()
            .filter(|f| f.pose == EvasionState::Carrying)
            .collect();
        assert!(carried.len() > 10);

        // Bite fraction of a 90x70 puppy minus the hold point of a 120x48 button
        let expected = Vec2::new(90.0 * 0.62 - 60.0, 70.0 * 0.58 - 12.0);
        for frame in &carried {
            let held = frame.control.unwrap() - frame.pursuer.unwrap();
            assert!((held - expected).length() < 1e-3, "detached by {:?}", held - expected);
        }
        let travelled = carried.last().unwrap().pursuer.unwrap() - carried[0].pursuer.unwrap();
        assert!(travelled.length() > 1.0);
    }

    #[test]
    fn test_docks_on_mouth_anchor() {
        let stage = stage();
        stage.attach_mouth(Rect::from_ltwh(60.0, 40.0, 10.0, 10.0));
        let ctl = controller(stage, config());
        block_on(ctl.evade());

        let expected = Vec2::new(65.0 - 60.0, 45.0 - 12.0);
        let frames = ctl.stage().frames();
        let carried = frames.iter().filter(|f| f.pose == EvasionState::Carrying);
        for frame in carried {
            let held = frame.control.unwrap() - frame.pursuer.unwrap();
            assert!((held - expected).length() < 1e-3);
        }
    }

    #[test]
    fn test_missing_pursuer_relocates_directly() {
        let stage = HeadlessStage::new(Viewport::new(1000.0, 800.0));
        stage.place(Actor::Control, Rect::from_ltwh(20.0, 20.0, 120.0, 48.0));
        let ctl = controller(stage, config());

        let outcome = block_on(ctl.evade());
        let Outcome::Relocated(pos) = outcome else {
            panic!("expected a direct relocation, got {:?}", outcome);
        };
        let rect = ctl.stage().rect_of(Actor::Control).unwrap();
        assert_eq!(rect.origin, pos);
        assert!(rect.within(Viewport::new(1000.0, 800.0), 16.0));
        assert!(ctl.stage().frames().is_empty());
        assert!(!ctl.is_busy());
    }

    #[test]
    fn test_puppy_leaving_between_triggers_falls_back_to_relocation() {
        let ctl = controller(stage(), config());
        let first = block_on(ctl.evade());
        assert!(matches!(first, Outcome::Carried(_)));

        ctl.stage().remove(Actor::Pursuer);
        let frames_before = ctl.stage().frames().len();
        let second = block_on(ctl.evade());
        assert!(matches!(second, Outcome::Relocated(_)));

        let landed = second.destination().unwrap();
        assert_ne!(Some(landed), first.destination());
        assert_eq!(ctl.stage().layout_origin(Actor::Control), Some(landed));
        assert_eq!(ctl.stage().frames().len(), frames_before);
        assert_released(&ctl);
    }

    #[test]
    fn test_missing_control_is_ignored() {
        let stage = HeadlessStage::new(Viewport::new(1000.0, 800.0));
        stage.place(Actor::Pursuer, Rect::from_ltwh(18.0, 18.0, 90.0, 70.0));
        let ctl = controller(stage, config());
        let outcome = block_on(ctl.evade());
        assert_eq!(outcome, Outcome::Ignored);
        assert_eq!(outcome.destination(), None);
        assert!(!ctl.is_busy());
    }

    #[test]
    fn test_animation_failure_degrades_and_cleans_up() {
        let stage = stage();
        stage.fail_animations();
        let ctl = controller(stage, config());

        let outcome = block_on(ctl.evade());
        let Outcome::Degraded(pos) = outcome else {
            panic!("expected a degraded outcome, got {:?}", outcome);
        };
        assert_eq!(ctl.stage().layout_origin(Actor::Control), Some(pos));
        assert!(ctl.stage().rect_of(Actor::Control).unwrap().within(Viewport::new(1000.0, 800.0), 16.0));
        assert_released(&ctl);
    }

    #[test]
    fn test_pursuer_vanishing_mid_carry_cleans_up() {
        let stage = stage();
        // Sprint and grab take ~35 frames, so this lands inside the carry
        stage.remove_after_frames(Actor::Pursuer, 45);
        let ctl = controller(stage, config());

        let outcome = block_on(ctl.evade());
        let Outcome::Degraded(pos) = outcome else {
            panic!("expected a degraded outcome, got {:?}", outcome);
        };
        assert!(ctl.stage().rect_of(Actor::Pursuer).is_none());
        assert_eq!(ctl.stage().layout_origin(Actor::Control), Some(pos));
        assert_released(&ctl);

        // Later triggers fall back to direct relocation
        assert!(matches!(block_on(ctl.evade()), Outcome::Relocated(_)));
    }

    #[test]
    fn test_without_web_animations_jump_cuts() {
        let stage = stage();
        stage.disable_animations();
        let ctl = controller(stage, config());

        let Outcome::Carried(pos) = block_on(ctl.evade()) else {
            panic!("expected a full carry");
        };
        assert!(ctl.stage().frames().is_empty());
        assert_eq!(ctl.stage().layout_origin(Actor::Control), Some(pos));
        assert_released(&ctl);
    }

    #[test]
    fn test_returns_home_when_configured() {
        let config = Config {
            pursuer_home: Some(Vec2::new(18.0, 18.0)),
            ..config()
        };
        let ctl = controller(stage(), config);
        block_on(ctl.evade());

        assert_eq!(ctl.stage().layout_origin(Actor::Pursuer), Some(Vec2::new(18.0, 18.0)));
        assert!(ctl.stage().frames().iter().any(|f| f.pose == EvasionState::Returning));
        assert_released(&ctl);
    }

    #[test]
    fn test_resize_reclamps_resting_pursuer() {
        let stage = stage();
        stage.place(Actor::Pursuer, Rect::from_ltwh(900.0, 700.0, 90.0, 70.0));
        let ctl = controller(stage, config());

        // Still fits
        assert_eq!(ctl.on_resize(), None);

        ctl.stage().set_viewport(Viewport::new(500.0, 400.0));
        assert_eq!(ctl.on_resize(), Some(Vec2::new(402.0, 322.0)));
        assert_eq!(ctl.stage().layout_origin(Actor::Pursuer), Some(Vec2::new(402.0, 322.0)));
    }

    #[test]
    fn test_resize_ignored_mid_sequence() {
        let ctl = controller(stage(), config());
        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);

        let mut sequence = pin!(ctl.evade());
        assert!(sequence.as_mut().poll(&mut cx).is_pending());
        ctl.stage().set_viewport(Viewport::new(50.0, 50.0));
        assert_eq!(ctl.on_resize(), None);
    }

    #[test]
    fn test_place_pursuer_clamps_start() {
        let ctl = controller(stage(), config());
        assert_eq!(ctl.place_pursuer(Vec2::new(18.0, 18.0)), Ok(Vec2::new(18.0, 18.0)));
        assert_eq!(ctl.place_pursuer(Vec2::new(-40.0, 2000.0)), Ok(Vec2::new(8.0, 722.0)));
    }
}
