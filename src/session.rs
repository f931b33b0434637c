//! # Session Module
//!
//! The flight session: startup handshake, the command tick, the render
//! pass, and teardown.
//!
//! All control state lives here and is mutated only between awaits on the
//! session task. Input events arrive on one ordered channel fed by the
//! reader threads; the tick drains it, lets the keyboard translator and the
//! gamepad mapper update the shared [`ControlState`], then transmits the
//! four-axis velocity command if the state is armed. While a gamepad is
//! present its mapping runs after the drain and overwrites all four axes,
//! so the gamepad dominates whenever both sources are active.
//!
//! The render pass runs on its own cadence: it polls the frame source and
//! presents the latest frame. A stopped feed ends the session the same way
//! Escape does.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::control::keys::KeyboardTranslator;
use crate::control::mapper::{GamepadBindings, GamepadMapper};
use crate::control::state::ControlState;
use crate::control::Command;
use crate::error::{Result, TeleopError};
use crate::input::gamepad::PadSnapshot;
use crate::input::{InputEvent, Key};
use crate::link::{FrameSource, VehicleLink};
use crate::telemetry::{FlightEvent, FlightLog};
use crate::video::Display;

/// A flight session over one vehicle link.
pub struct Session<L: VehicleLink> {
    link: L,
    config: Config,
    events: mpsc::UnboundedReceiver<InputEvent>,
    keyboard: KeyboardTranslator,
    mapper: GamepadMapper,
    /// Whether a gamepad reader is feeding the channel. Fixed at startup;
    /// gates the per-tick snapshot mapping.
    gamepad_present: bool,
    snapshot: PadSnapshot,
    state: ControlState,
    frame_source: Option<Box<dyn FrameSource + Send>>,
    display: Box<dyn Display + Send>,
    flight_log: Option<FlightLog>,
    quit: bool,
}

impl<L: VehicleLink> Session<L> {
    /// Creates a session. No vehicle traffic happens until [`Session::run`].
    pub fn new(
        link: L,
        config: Config,
        events: mpsc::UnboundedReceiver<InputEvent>,
        gamepad_present: bool,
        display: Box<dyn Display + Send>,
        flight_log: Option<FlightLog>,
    ) -> Self {
        let keyboard = KeyboardTranslator::new(config.control.keyboard_speed);
        let mapper = GamepadMapper::new(GamepadBindings::from_config(&config.gamepad));

        Self {
            link,
            config,
            events,
            keyboard,
            mapper,
            gamepad_present,
            snapshot: PadSnapshot::default(),
            state: ControlState::new(),
            frame_source: None,
            display,
            flight_log,
            quit: false,
        }
    }

    /// Runs the session to completion: startup, the loop, teardown.
    ///
    /// Teardown runs exactly once on every exit path, including startup
    /// failure.
    ///
    /// # Errors
    ///
    /// Returns `Setup` error if the vehicle refuses any startup call.
    pub async fn run(mut self) -> Result<()> {
        if let Err(e) = self.startup().await {
            self.teardown().await;
            return Err(e);
        }

        let tick_period = Duration::from_millis(u64::from(1000 / self.config.timing.tick_hz));
        let render_period = Duration::from_millis(u64::from(1000 / self.config.timing.render_hz));
        let mut tick = tokio::time::interval(tick_period);
        let mut render = tokio::time::interval(render_period);

        info!(
            "Session running: tick {}Hz, render {}Hz",
            self.config.timing.tick_hz, self.config.timing.render_hz
        );

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    self.tick().await;
                }
                _ = render.tick() => {
                    self.render();
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupt received, ending session");
                    self.quit = true;
                }
            }

            if self.quit {
                break;
            }
        }

        self.teardown().await;
        Ok(())
    }

    /// Performs the startup handshake.
    ///
    /// Every call must be acknowledged; the first refusal aborts with a
    /// `Setup` error and no further calls are made.
    async fn startup(&mut self) -> Result<()> {
        if !self.link.connect().await {
            return Err(TeleopError::Setup("vehicle refused connection".to_string()));
        }

        let speed = self.config.control.initial_speed;
        if !self.link.set_speed(speed).await {
            return Err(TeleopError::Setup(format!(
                "vehicle refused speed {}",
                speed
            )));
        }

        // Clear any stream a previous unclean exit left running
        if !self.link.stream_off().await {
            return Err(TeleopError::Setup("vehicle refused streamoff".to_string()));
        }

        if !self.link.stream_on().await {
            return Err(TeleopError::Setup("vehicle refused streamon".to_string()));
        }

        self.frame_source = Some(self.link.frame_source().await?);
        info!("Session startup complete");
        Ok(())
    }

    /// One command tick: drain input, remap, transmit.
    async fn tick(&mut self) {
        let commands = self.drain_events();

        // Gamepad dominance: the snapshot mapping overwrites all four axes
        // after keyboard edges have been applied
        if self.gamepad_present {
            self.mapper.apply(&self.snapshot, &mut self.state);
        }

        for command in commands {
            self.dispatch(command).await;
        }

        if self.state.is_armed() {
            self.transmit_velocity().await;
        }
    }

    /// Drains the input channel, applying every edge to the control state.
    /// Returns the one-shot commands to dispatch, in arrival order.
    fn drain_events(&mut self) -> Vec<Command> {
        let mut commands = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            if let Some(command) = self.handle_event(event) {
                commands.push(command);
            }
        }
        commands
    }

    /// Applies a single input event. Returns the command it triggered, if
    /// any.
    fn handle_event(&mut self, event: InputEvent) -> Option<Command> {
        match event {
            InputEvent::Key { key, pressed } => {
                if key == Key::Escape && pressed {
                    self.quit = true;
                    return None;
                }
                if pressed {
                    self.keyboard.key_down(key, &mut self.state)
                } else {
                    self.keyboard.key_up(key, &mut self.state)
                }
            }
            InputEvent::PadAxis { .. } => {
                self.snapshot.apply(&event);
                None
            }
            InputEvent::PadButton { button, pressed } => {
                self.snapshot.apply(&event);
                if pressed {
                    self.mapper.button_down(button, &mut self.state)
                } else {
                    self.mapper.button_up(button, &mut self.state)
                }
            }
            InputEvent::PadHat { pad, x, y } => {
                self.snapshot.apply(&event);
                self.mapper.pad_motion(pad, x, y)
            }
            InputEvent::Quit => {
                self.quit = true;
                None
            }
        }
    }

    /// Dispatches one command to the vehicle. Failures are logged, never
    /// escalated: the session keeps flying.
    async fn dispatch(&mut self, command: Command) {
        debug!("Dispatching {:?}", command);
        let result = match command {
            Command::Takeoff => self.link.takeoff().await,
            Command::Land => self.link.land().await,
            Command::EmergencyStop => self.link.emergency_stop().await,
            Command::Flip(direction) => self.link.flip(direction).await,
        };

        match result {
            Ok(()) => self.log_event(FlightEvent::command(&command)),
            Err(e) => warn!("Command {:?} failed: {}", command, e),
        }
    }

    /// Sends the current velocity command. A failed send is superseded by
    /// the next tick.
    async fn transmit_velocity(&mut self) {
        let (lateral, longitudinal, vertical, yaw) = self.state.velocity();
        match self
            .link
            .send_velocity(lateral, longitudinal, vertical, yaw)
            .await
        {
            Ok(()) => self.log_event(FlightEvent::Velocity {
                lateral,
                longitudinal,
                vertical,
                yaw,
            }),
            Err(e) => debug!("Velocity send failed: {}", e),
        }
    }

    /// One render pass: present the latest frame, or end the session if the
    /// feed stopped.
    fn render(&mut self) {
        let Some(source) = self.frame_source.as_mut() else {
            return;
        };

        if source.stopped() {
            info!("Video feed stopped, ending session");
            self.quit = true;
            return;
        }

        if let Some(frame) = source.frame() {
            self.display.present(&frame);
        }
    }

    fn log_event(&mut self, event: FlightEvent) {
        if let Some(log) = self.flight_log.as_mut() {
            if let Err(e) = log.record(&event) {
                warn!("Flight log write failed: {}", e);
            }
        }
    }

    /// Releases the vehicle: lands if still armed, then closes the link.
    async fn teardown(&mut self) {
        if self.state.is_armed() {
            info!("Session ending while armed, landing");
            if let Err(e) = self.link.land().await {
                warn!("Landing during teardown failed: {}", e);
            }
            self.state.disarm();
        }

        self.frame_source = None;
        if let Err(e) = self.link.shutdown().await {
            warn!("Link shutdown failed: {}", e);
        }
        info!("Session ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::mocks::{LinkCall, MockLink};
    use crate::video::StatsDisplay;
    use std::sync::atomic::Ordering;

    fn new_session(
        link: MockLink,
        gamepad_present: bool,
    ) -> (Session<MockLink>, mpsc::UnboundedSender<InputEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Session::new(
            link,
            Config::default(),
            rx,
            gamepad_present,
            Box::new(StatsDisplay::new()),
            None,
        );
        (session, tx)
    }

    fn key(key: Key, pressed: bool) -> InputEvent {
        InputEvent::Key { key, pressed }
    }

    // ==================== Startup Tests ====================

    #[tokio::test]
    async fn test_startup_call_order() {
        let link = MockLink::new();
        let (mut session, _tx) = new_session(link.clone(), false);

        session.startup().await.unwrap();

        assert_eq!(
            link.calls(),
            vec![
                LinkCall::Connect,
                LinkCall::SetSpeed(10),
                LinkCall::StreamOff,
                LinkCall::StreamOn,
            ]
        );
        assert!(session.frame_source.is_some());
    }

    #[tokio::test]
    async fn test_startup_aborts_on_first_refusal() {
        let link = MockLink::new();
        link.refuse_setup.store(true, Ordering::SeqCst);
        let (mut session, _tx) = new_session(link.clone(), false);

        let result = session.startup().await;
        assert!(matches!(result, Err(TeleopError::Setup(_))));
        assert_eq!(link.calls(), vec![LinkCall::Connect]);
        assert!(session.frame_source.is_none());
    }

    #[tokio::test]
    async fn test_failed_run_still_tears_down_once() {
        let link = MockLink::new();
        link.refuse_setup.store(true, Ordering::SeqCst);
        let (session, _tx) = new_session(link.clone(), false);

        assert!(session.run().await.is_err());
        assert_eq!(link.count(LinkCall::Shutdown), 1);
    }

    // ==================== Tick Tests ====================

    #[tokio::test]
    async fn test_unarmed_tick_transmits_nothing() {
        let link = MockLink::new();
        let (mut session, tx) = new_session(link.clone(), false);

        tx.send(key(Key::W, true)).unwrap();
        session.tick().await;

        assert_eq!(session.state.vertical(), 60);
        assert!(link.velocity_sends().is_empty());
    }

    #[tokio::test]
    async fn test_armed_tick_transmits_velocity() {
        let link = MockLink::new();
        let (mut session, tx) = new_session(link.clone(), false);

        tx.send(key(Key::T, true)).unwrap();
        tx.send(key(Key::ArrowRight, true)).unwrap();
        session.tick().await;

        assert_eq!(link.count(LinkCall::Takeoff), 1);
        assert_eq!(link.velocity_sends(), vec![(60, 0, 0, 0)]);
    }

    #[tokio::test]
    async fn test_takeoff_dispatched_exactly_once() {
        let link = MockLink::new();
        let (mut session, tx) = new_session(link.clone(), false);

        tx.send(key(Key::T, true)).unwrap();
        session.tick().await;
        session.tick().await;
        session.tick().await;

        assert_eq!(link.count(LinkCall::Takeoff), 1);
        assert!(session.state.is_armed());
    }

    #[tokio::test]
    async fn test_land_on_release_disarms_and_dispatches_once() {
        let link = MockLink::new();
        let (mut session, tx) = new_session(link.clone(), false);

        tx.send(key(Key::T, true)).unwrap();
        session.tick().await;

        tx.send(key(Key::L, true)).unwrap();
        tx.send(key(Key::L, false)).unwrap();
        session.tick().await;
        session.tick().await;

        assert_eq!(link.count(LinkCall::Land), 1);
        assert!(!session.state.is_armed());
    }

    #[tokio::test]
    async fn test_emergency_halts_transmission_but_keeps_velocities() {
        let link = MockLink::new();
        let (mut session, tx) = new_session(link.clone(), false);

        tx.send(key(Key::T, true)).unwrap();
        tx.send(key(Key::ArrowUp, true)).unwrap();
        session.tick().await;
        assert_eq!(link.velocity_sends(), vec![(0, 60, 0, 0)]);

        // Stock emergency button
        tx.send(InputEvent::PadButton {
            button: 3,
            pressed: true,
        })
        .unwrap();
        session.tick().await;
        session.tick().await;

        assert_eq!(link.count(LinkCall::EmergencyStop), 1);
        // No further transmission, but the stored velocity survives
        assert_eq!(link.velocity_sends().len(), 1);
        assert_eq!(session.state.longitudinal(), 60);
    }

    #[tokio::test]
    async fn test_send_failure_keeps_state_and_session() {
        let link = MockLink::new();
        link.fail_sends.store(true, Ordering::SeqCst);
        let (mut session, tx) = new_session(link.clone(), false);

        tx.send(key(Key::T, true)).unwrap();
        tx.send(key(Key::D, true)).unwrap();
        session.tick().await;

        assert!(session.state.is_armed());
        assert_eq!(session.state.yaw(), 60);
        assert!(!session.quit);
    }

    // ==================== Source Interplay Tests ====================

    #[tokio::test]
    async fn test_keyboard_alone_drives_velocity_without_gamepad() {
        let link = MockLink::new();
        let (mut session, tx) = new_session(link.clone(), false);

        tx.send(key(Key::T, true)).unwrap();
        tx.send(key(Key::A, true)).unwrap();
        session.tick().await;
        session.tick().await;

        // No snapshot overwrite: the keyboard value persists across ticks
        assert_eq!(link.velocity_sends(), vec![(0, 0, 0, -60), (0, 0, 0, -60)]);
    }

    #[tokio::test]
    async fn test_gamepad_overwrites_keyboard_axes() {
        let link = MockLink::new();
        let (mut session, tx) = new_session(link.clone(), true);

        tx.send(key(Key::T, true)).unwrap();
        tx.send(key(Key::W, true)).unwrap(); // vertical 60, then overwritten
        session.tick().await;

        // Centered sticks map every axis back to zero
        assert_eq!(link.velocity_sends(), vec![(0, 0, 0, 0)]);
    }

    #[tokio::test]
    async fn test_gamepad_axis_motion_maps_through_snapshot() {
        let link = MockLink::new();
        let (mut session, tx) = new_session(link.clone(), true);

        tx.send(key(Key::T, true)).unwrap();
        // Centered speed axis: scale 50. Half deflection: velocity 25.
        tx.send(InputEvent::PadAxis {
            axis: 0,
            value: 0.5,
        })
        .unwrap();
        session.tick().await;

        assert_eq!(link.velocity_sends(), vec![(25, 0, 0, 0)]);
    }

    #[tokio::test]
    async fn test_pad_motion_dispatches_flip() {
        let link = MockLink::new();
        let (mut session, tx) = new_session(link.clone(), true);

        tx.send(InputEvent::PadHat { pad: 0, x: 0, y: 1 }).unwrap();
        session.tick().await;

        assert_eq!(
            link.count(LinkCall::Flip(crate::control::FlipDirection::Forward)),
            1
        );
    }

    // ==================== Quit Tests ====================

    #[tokio::test]
    async fn test_escape_press_quits() {
        let link = MockLink::new();
        let (mut session, tx) = new_session(link, false);

        tx.send(key(Key::Escape, true)).unwrap();
        session.tick().await;
        assert!(session.quit);
    }

    #[tokio::test]
    async fn test_escape_release_does_not_quit() {
        let link = MockLink::new();
        let (mut session, tx) = new_session(link, false);

        tx.send(key(Key::Escape, false)).unwrap();
        session.tick().await;
        assert!(!session.quit);
    }

    #[tokio::test]
    async fn test_quit_event_quits() {
        let link = MockLink::new();
        let (mut session, tx) = new_session(link, false);

        tx.send(InputEvent::Quit).unwrap();
        session.tick().await;
        assert!(session.quit);
    }

    // ==================== Full Run Tests ====================

    #[tokio::test]
    async fn test_run_ends_on_escape_with_single_shutdown() {
        let link = MockLink::new();
        let (session, tx) = new_session(link.clone(), false);

        tx.send(key(Key::Escape, true)).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(2), session.run()).await;

        assert!(result.is_ok(), "session did not end on Escape");
        assert!(result.unwrap().is_ok());
        assert_eq!(link.count(LinkCall::Shutdown), 1);
        assert_eq!(link.count(LinkCall::Land), 0);
    }

    #[tokio::test]
    async fn test_run_lands_when_ending_armed() {
        let link = MockLink::new();
        let (session, tx) = new_session(link.clone(), false);

        tx.send(key(Key::T, true)).unwrap();
        tx.send(key(Key::Escape, true)).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(2), session.run()).await;

        assert!(result.is_ok());
        assert_eq!(link.count(LinkCall::Takeoff), 1);
        assert_eq!(link.count(LinkCall::Land), 1);
        assert_eq!(link.count(LinkCall::Shutdown), 1);
    }

    // ==================== Flight Log Tests ====================

    #[tokio::test]
    async fn test_armed_ticks_are_logged() {
        let dir = tempfile::TempDir::new().unwrap();
        let telemetry = crate::config::TelemetryConfig {
            enabled: true,
            log_dir: dir.path().to_string_lossy().to_string(),
            max_records_per_file: 100,
            max_files_to_keep: 2,
        };
        let flight_log = FlightLog::open(&telemetry).unwrap();

        let link = MockLink::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let mut session = Session::new(
            link,
            Config::default(),
            rx,
            false,
            Box::new(StatsDisplay::new()),
            Some(flight_log),
        );

        tx.send(key(Key::T, true)).unwrap();
        session.tick().await;

        let mut content = String::new();
        for entry in std::fs::read_dir(dir.path()).unwrap() {
            content.push_str(&std::fs::read_to_string(entry.unwrap().path()).unwrap());
        }
        assert!(content.contains("\"event\":\"command\""));
        assert!(content.contains("\"event\":\"velocity\""));
    }
}
