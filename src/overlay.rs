/*
 * The overlay: a transparent window pinned over a foreign target window,
 * driven by two independent updaters. The logic updater keeps the overlay's
 * geometry glued to the target and runs the control tree's `update`, the draw
 * updater renders a frame. Both hop onto the UI thread through the
 * `Dispatcher` before touching the window or the device; `pump` is where
 * their messages are executed.
 *
 * Root controls and event subscribers are set up by the host before
 * `attach`. Structural changes to the control list while a frame is being
 * drawn are the caller's responsibility.
 */
use crate::config::OverlayConfig;
use crate::controls::{ContainerFrame, Control, UpdateFrame};
use crate::dispatcher::{DispatchOutcome, DispatchSender, Dispatcher, UiMessage, UiWaker};
use crate::error::{PlatformError, Result as PlatformResult};
use crate::input::{InputSnapshot, InputTracker, VirtualKey};
use crate::platform::WindowPlatform;
use crate::renderer::{GraphicsBackend, RenderSurface, Renderer};
use crate::types::{Size, Vector2, WindowGeometry, WindowHandle};
use crate::updater::{StopToken, TickFlow, Updater};

use std::sync::Arc;

/// Upper bound of messages run by one `pump` call before yielding to the message loop.
const MAX_PUMP_BATCH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickEvent {
    pub seconds_elapsed: f64,
}

type TickHandler = Box<dyn FnMut(&TickEvent)>;
type DrawHandler = Box<dyn FnMut(&mut dyn RenderSurface) -> PlatformResult<()>>;

pub struct Overlay<P: WindowPlatform, B: GraphicsBackend> {
    platform: P,
    renderer: Renderer<B>,
    /// The overlay's own window. Owned by the host, never destroyed here.
    handle: WindowHandle,
    target: Option<WindowHandle>,
    geometry: WindowGeometry,
    config: OverlayConfig,
    controls: Vec<Box<dyn Control>>,
    input: InputTracker,
    dispatcher: Dispatcher,
    logic_updater: Updater,
    draw_updater: Updater,
    tick_handlers: Vec<TickHandler>,
    before_drawing: Vec<DrawHandler>,
    after_drawing: Vec<DrawHandler>,
    attached: bool,
    killed: bool,
    /// Bumped on every attach; ticks queued under an older value are dropped.
    session: u64,
}

impl<P: WindowPlatform, B: GraphicsBackend> Overlay<P, B> {
    pub fn new(
        platform: P,
        backend: B,
        handle: WindowHandle,
        config: OverlayConfig,
        waker: Arc<dyn UiWaker>,
    ) -> Self {
        let logic_updater = Updater::new("logic", config.logic_rate_hz);
        let draw_updater = Updater::new("draw", config.draw_rate_hz);
        Self {
            platform,
            renderer: Renderer::new(backend),
            handle,
            target: None,
            geometry: WindowGeometry::default(),
            config,
            controls: Vec::new(),
            input: InputTracker::new(),
            dispatcher: Dispatcher::new(waker),
            logic_updater,
            draw_updater,
            tick_handlers: Vec::new(),
            before_drawing: Vec::new(),
            after_drawing: Vec::new(),
            attached: false,
            killed: false,
            session: 0,
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn renderer(&self) -> &Renderer<B> {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer<B> {
        &mut self.renderer
    }

    pub fn handle(&self) -> WindowHandle {
        self.handle
    }

    pub fn target(&self) -> Option<WindowHandle> {
        self.target
    }

    pub fn geometry(&self) -> WindowGeometry {
        self.geometry
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Policy flags apply from the next tick, rates from the next `attach`.
    pub fn config_mut(&mut self) -> &mut OverlayConfig {
        &mut self.config
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn is_killed(&self) -> bool {
        self.killed
    }

    pub fn logic_updater(&self) -> &Updater {
        &self.logic_updater
    }

    pub fn draw_updater(&self) -> &Updater {
        &self.draw_updater
    }

    /// Sender for posting ticks from other threads, the same way the updaters do.
    /// Only valid for the current attachment; its ticks are dropped after the next `attach`.
    pub fn dispatch_sender(&self) -> DispatchSender {
        self.dispatcher.sender_for(self.session)
    }

    pub fn controls(&self) -> &[Box<dyn Control>] {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut Vec<Box<dyn Control>> {
        &mut self.controls
    }

    pub fn add_control(&mut self, control: Box<dyn Control>) {
        self.controls.push(control);
    }

    pub fn on_tick_event(&mut self, handler: impl FnMut(&TickEvent) + 'static) {
        self.tick_handlers.push(Box::new(handler));
    }

    pub fn on_before_drawing(
        &mut self,
        handler: impl FnMut(&mut dyn RenderSurface) -> PlatformResult<()> + 'static,
    ) {
        self.before_drawing.push(Box::new(handler));
    }

    pub fn on_after_drawing(
        &mut self,
        handler: impl FnMut(&mut dyn RenderSurface) -> PlatformResult<()> + 'static,
    ) {
        self.after_drawing.push(Box::new(handler));
    }

    /// Makes the overlay window click-through and topmost.
    pub fn prepare_window(&mut self) -> PlatformResult<()> {
        self.platform.make_click_through(self.handle)?;
        self.platform.set_topmost(self.handle, true)
    }

    /*
     * Starts tracking `target`: the overlay is placed over the target's
     * client area, the device is created at that size and both updaters are
     * started. Attaching while attached detaches first.
     */
    pub fn attach(&mut self, target: WindowHandle) -> PlatformResult<()> {
        if self.killed {
            return Err(PlatformError::AlreadyTerminated);
        }
        if self.attached {
            log::debug!("Overlay: already attached to {:?}; detaching first", self.target);
            self.detach();
        }

        let info = self.platform.window_info(target)?;
        let geometry = WindowGeometry {
            position: info.client.position(),
            size: info.client.size(),
        };
        self.platform.move_window(self.handle, geometry.position)?;
        self.platform.resize_window(self.handle, geometry.size)?;
        self.renderer.initialize_device(self.handle, geometry.size)?;

        self.geometry = geometry;
        self.target = Some(target);
        self.attached = true;
        self.session += 1;

        if let Err(e) = self.start_updaters() {
            log::error!("Overlay: could not start updaters: {e}");
            self.detach();
            return Err(e);
        }
        log::info!(
            "Overlay: attached to {target:?} at ({}, {}) {}x{}",
            geometry.position.x,
            geometry.position.y,
            geometry.size.width,
            geometry.size.height
        );
        Ok(())
    }

    fn start_updaters(&mut self) -> PlatformResult<()> {
        self.logic_updater.set_rate_hz(self.config.logic_rate_hz);
        self.draw_updater.set_rate_hz(self.config.draw_rate_hz);
        let sender = self.dispatcher.sender_for(self.session);
        self.logic_updater
            .start(forward_ticks(sender.clone(), |elapsed| UiMessage::LogicTick {
                elapsed,
            }))?;
        self.draw_updater
            .start(forward_ticks(sender, |elapsed| UiMessage::DrawTick { elapsed }))
    }

    /// Stops both updaters, then destroys the device. Safe to call repeatedly.
    pub fn detach(&mut self) {
        self.logic_updater.stop();
        self.draw_updater.stop();
        self.renderer.destroy_device();
        if self.attached {
            log::info!("Overlay: detached from {:?}", self.target);
        }
        self.attached = false;
    }

    /// Swaps the tracked window without touching the device or the updaters.
    pub fn change_target(&mut self, target: WindowHandle) {
        log::debug!("Overlay: tracking {target:?} instead of {:?}", self.target);
        self.target = Some(target);
    }

    /*
     * Terminal shutdown: stops the updaters, releases the device for good and
     * asks the host to exit its message loop. The overlay cannot be attached
     * again afterwards.
     */
    pub fn kill(&mut self) {
        if self.killed {
            return;
        }
        self.logic_updater.stop();
        self.draw_updater.stop();
        self.renderer.dispose();
        self.attached = false;
        self.killed = true;
        log::info!("Overlay: killed; requesting application exit");
        self.platform.request_exit();
    }

    pub fn show_inactive_topmost(&mut self) -> PlatformResult<()> {
        self.platform.show_no_activate(self.handle)?;
        self.platform.set_topmost(self.handle, true)
    }

    pub fn reset_topmost(&mut self) -> PlatformResult<()> {
        self.platform.bring_to_top(self.handle)
    }

    /*
     * Runs queued updater ticks on the calling (UI) thread in submission
     * order. Ticks left over from an earlier attachment are completed without
     * running. Failures are logged; they never stop the loops. Returns the
     * number of messages handled, dropped ones included.
     */
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while handled < MAX_PUMP_BATCH {
            let Some(pending) = self.dispatcher.try_next() else {
                return handled;
            };
            let message = pending.message();
            if pending.epoch() != self.session {
                log::trace!(
                    "Overlay: dropping {message:?} from session {} (now {})",
                    pending.epoch(),
                    self.session
                );
                pending.complete();
                handled += 1;
                continue;
            }
            let result = match message {
                UiMessage::LogicTick { elapsed } => self.on_tick(elapsed),
                UiMessage::DrawTick { elapsed } => self.on_draw(elapsed),
            };
            pending.complete();
            if let Err(e) = result {
                log::error!("Overlay: {message:?} failed: {e}");
            }
            handled += 1;
        }
        if self.dispatcher.has_pending() {
            // Come back after the host's other messages.
            self.dispatcher.wake();
        }
        handled
    }

    fn active_target(&self) -> Option<WindowHandle> {
        if self.attached { self.target } else { None }
    }

    /*
     * Logic tick: follow the target window, optionally update the controls,
     * then notify tick subscribers. Subscribers are notified even when
     * tracking or input sampling failed; the first such error is returned
     * afterwards. A no-op when not attached.
     */
    pub fn on_tick(&mut self, seconds: f64) -> PlatformResult<()> {
        let Some(target) = self.active_target() else {
            log::trace!("Overlay: logic tick while detached ignored");
            return Ok(());
        };

        let mut first_error = None;
        if self.config.track_target_window {
            if let Err(e) = self.track_target(target) {
                keep_first(&mut first_error, "tracking", e);
            }
        }
        if self.config.update_controls_on_tick {
            match self.sample_input() {
                Ok(snapshot) => self.update_controls(seconds, &snapshot),
                Err(e) => keep_first(&mut first_error, "input sampling", e),
            }
        }

        let event = TickEvent {
            seconds_elapsed: seconds,
        };
        for handler in self.tick_handlers.iter_mut() {
            handler(&event);
        }
        first_error.map_or(Ok(()), Err)
    }

    /*
     * Geometry is only committed once the matching native call succeeded, so
     * a failed move or resize is retried on the next tick.
     */
    fn track_target(&mut self, target: WindowHandle) -> PlatformResult<()> {
        let info = match self.platform.window_info(target) {
            Ok(info) => info,
            Err(e) => {
                log::warn!("Overlay: tracking skipped this tick: {e}");
                return Ok(());
            }
        };

        let mut first_error = None;
        let position = info.client.position();
        if position != self.geometry.position {
            match self.platform.move_window(self.handle, position) {
                Ok(()) => self.geometry.position = position,
                Err(e) => keep_first(&mut first_error, "moving the overlay", e),
            }
        }
        let size = info.client.size();
        if size != self.geometry.size {
            if let Err(e) = self.follow_size(size) {
                keep_first(&mut first_error, "resizing the overlay", e);
            }
        }
        if let Err(e) = self.platform.place_above(target, self.handle, info.window) {
            keep_first(&mut first_error, "placing the overlay", e);
        }
        first_error.map_or(Ok(()), Err)
    }

    fn follow_size(&mut self, size: Size) -> PlatformResult<()> {
        self.platform.resize_window(self.handle, size)?;
        self.renderer.resize(size)?;
        self.geometry.size = size;
        Ok(())
    }

    /// Resizes the device to the overlay's current size.
    pub fn on_resize(&mut self) -> PlatformResult<()> {
        self.renderer.resize(self.geometry.size)
    }

    /// Samples every key and the cursor in overlay client coordinates.
    pub fn sample_input(&mut self) -> PlatformResult<InputSnapshot> {
        let cursor = self.platform.cursor_position(self.handle)?;
        let platform = &self.platform;
        Ok(self
            .input
            .sample(VirtualKey::all(), |key| platform.is_key_down(key), cursor))
    }

    /// Updates every root control, visible or not, with pointer checks enabled.
    pub fn update_controls(&mut self, seconds: f64, input: &InputSnapshot) {
        let frame = UpdateFrame {
            seconds_elapsed: seconds,
            input,
            cursor: input.cursor,
            check_mouse: true,
            parent: ContainerFrame::root(
                self.geometry.size.width as f32,
                self.geometry.size.height as f32,
            ),
        };
        for control in self.controls.iter_mut() {
            control.update(&frame);
        }
    }

    /*
     * Draw tick. Skipped while the target is not the foreground window if the
     * policy asks for it. Once `begin_draw` succeeded `end_draw` always runs,
     * and the first error of the frame is returned.
     */
    pub fn on_draw(&mut self, seconds: f64) -> PlatformResult<()> {
        let Some(target) = self.active_target() else {
            log::trace!("Overlay: draw tick while detached ignored");
            return Ok(());
        };
        if self.config.draw_only_when_foreground && self.platform.foreground_window() != target {
            return Ok(());
        }
        log::trace!("Overlay: drawing {seconds:.4}s after the previous frame");

        self.platform.extend_frame_into_client_area(self.handle)?;
        self.renderer.begin_draw()?;
        let drawn = self.draw_frame();
        let ended = self.renderer.end_draw();
        drawn.and(ended)
    }

    fn draw_frame(&mut self) -> PlatformResult<()> {
        let back_color = RenderSurface::back_color(&self.renderer);
        self.renderer.clear(back_color)?;

        let surface: &mut dyn RenderSurface = &mut self.renderer;
        for handler in self.before_drawing.iter_mut() {
            handler(&mut *surface)?;
        }
        for control in self.controls.iter_mut() {
            if control.base().visible {
                control.draw(&mut *surface, Vector2::ZERO)?;
            }
        }
        for handler in self.after_drawing.iter_mut() {
            handler(&mut *surface)?;
        }
        Ok(())
    }
}

impl<P: WindowPlatform, B: GraphicsBackend> Drop for Overlay<P, B> {
    fn drop(&mut self) {
        self.logic_updater.stop();
        self.draw_updater.stop();
    }
}

fn keep_first(first: &mut Option<PlatformError>, what: &str, error: PlatformError) {
    log::warn!("Overlay: {what} failed: {error}");
    first.get_or_insert(error);
}

fn forward_ticks(
    sender: DispatchSender,
    message: fn(f64) -> UiMessage,
) -> impl FnMut(f64, &StopToken) -> TickFlow + Send + 'static {
    move |elapsed: f64, stop: &StopToken| match sender.dispatch(message(elapsed), stop) {
        DispatchOutcome::Disconnected => TickFlow::Stop,
        DispatchOutcome::Completed | DispatchOutcome::Abandoned => TickFlow::Continue,
    }
}
