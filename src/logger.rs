use tracing::{debug, trace};

use crate::event::{InputEvent, InputKind};
use crate::eventbus::InputListener;

/// Logs every event through `tracing`: motion at `trace`, everything else at `debug`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingListener;

impl TracingListener {
    pub fn new() -> Self {
        TracingListener
    }
}

impl InputListener for TracingListener {
    fn on_input(&mut self, event: &InputEvent) {
        let device = event.device;
        match &event.kind {
            InputKind::Motion { motion } => trace!(%device, at = event.at_ms, ?motion, "motion"),
            InputKind::AxisChanged { slot, value } => {
                debug!(%device, at = event.at_ms, %slot, value, "axis")
            }
            InputKind::StateUpdated { axes, buttons } => debug!(
                %device,
                at = event.at_ms,
                axes = ?axes.as_slice(),
                buttons = buttons.bits(),
                "state"
            ),
            InputKind::HatChanged { hat } => debug!(%device, at = event.at_ms, ?hat, "hat"),
            InputKind::KeyDown { key } => debug!(%device, at = event.at_ms, key, "key down"),
            InputKind::KeyUp { key } => debug!(%device, at = event.at_ms, key, "key up"),
        }
    }
}
