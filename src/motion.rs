//! 6-DoF space mouse state machine.
//!
//! Space mice send three kinds of reports, told apart by their first byte:
//!
//! | Tag | Payload | Meaning |
//! |-----|---------|---------|
//! | `1` | 3 × `i16` LE (+ 3 × `i16` when the report is ≥ 13 bytes) | translation (+ rotation) |
//! | `2` | 3 × `i16` LE | rotation |
//! | `3` | `u32` LE | key bitmask, bit 0 = key 1 |
//!
//! Samples are normalized into a [`MotionFrame`] that carries a time-to-live.
//! Every frame tick decrements it; when it runs out the frame is zeroed, so a
//! device that goes silent decays to rest instead of freezing.
//!
//! A tick runs right after a packet that completes a frame (event-driven
//! mode) or on each timer period (polling mode). It filters, scales by
//! [`ANGULAR_VELOCITY`] × speed and by the elapsed milliseconds, and emits
//! [`InputKind::Motion`]. Once the frame is all zero the polling timer stops
//! and the next tick assumes a nominal elapsed time.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::caps::DescriptorSet;
use crate::config::DeviceConfig;
use crate::decoder::{AxisState, ButtonState};
use crate::error::ReportError;
use crate::event::InputKind;
use crate::normalize::normalize_range;
use crate::timer::{TimerHandle, TimerService};
use crate::transport::DeviceId;
use crate::usage::AxisSlot;
use crate::virtual_keys::VirtualKeyTable;

/// Ticks a frame survives without fresh samples.
pub const MAX_TIME_TO_LIVE: u8 = 5;
/// Shared base sensitivity for translation and rotation.
pub const ANGULAR_VELOCITY: f32 = 8.0e-6;
/// Elapsed time assumed for the first tick and after clock anomalies.
pub const NOMINAL_ELAPSED_MS: u32 = 10;
/// Longer gaps are treated as anomalies.
pub const MAX_ELAPSED_MS: u32 = 500;
/// Translation reports at least this long also carry rotation.
pub const COMBINED_PACKET_LEN: usize = 13;

const TAG_TRANSLATION: u8 = 0x01;
const TAG_ROTATION: u8 = 0x02;
const TAG_KEYSTATE: u8 = 0x03;

/// Whether the host application currently has input focus.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Focus {
    #[default]
    Foreground,
    Background,
}

/// Per-report information supplied alongside the bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReportContext {
    pub timestamp_ms: u32,
    pub focus: Focus,
}

/// One decoded space mouse report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Packet {
    Translation {
        translation: [i16; 3],
        rotation: Option<[i16; 3]>,
    },
    Rotation([i16; 3]),
    Keystate(u32),
}

fn triple(report: &[u8], offset: usize) -> Result<[i16; 3], ReportError> {
    let bytes = report
        .get(offset..offset + 6)
        .ok_or(ReportError::TooShort { needed: offset + 6, actual: report.len() })?;
    Ok([
        i16::from_le_bytes([bytes[0], bytes[1]]),
        i16::from_le_bytes([bytes[2], bytes[3]]),
        i16::from_le_bytes([bytes[4], bytes[5]]),
    ])
}

impl Packet {
    /// Parse a full report, tag byte included. Trailing bytes are ignored.
    pub fn parse(report: &[u8]) -> Result<Self, ReportError> {
        let tag = *report.first().ok_or(ReportError::Empty)?;
        match tag {
            TAG_TRANSLATION => {
                let translation = triple(report, 1)?;
                let rotation = if report.len() >= COMBINED_PACKET_LEN {
                    Some(triple(report, 7)?)
                } else {
                    None
                };
                Ok(Packet::Translation { translation, rotation })
            }
            TAG_ROTATION => Ok(Packet::Rotation(triple(report, 1)?)),
            TAG_KEYSTATE => {
                let bytes = report
                    .get(1..5)
                    .ok_or(ReportError::TooShort { needed: 5, actual: report.len() })?;
                Ok(Packet::Keystate(u32::from_le_bytes([
                    bytes[0], bytes[1], bytes[2], bytes[3],
                ])))
            }
            other => Err(ReportError::UnknownTag(other)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionPhase {
    /// No live samples; all axes are zero.
    Idle,
    Tracking,
}

/// Normalized 6-axis sample `[x, y, z, rx, ry, rz]` with its staleness counter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionFrame {
    pub axes: [f32; 6],
    pub time_to_live: u8,
    /// Fresh samples arrived since the last emission.
    pub is_dirty: bool,
}

impl MotionFrame {
    pub fn clear(&mut self) {
        self.axes = [0.0; 6];
    }

    pub fn is_zero(&self) -> bool {
        self.axes.iter().all(|v| *v == 0.0)
    }

    pub fn phase(&self) -> MotionPhase {
        if self.time_to_live == 0 {
            MotionPhase::Idle
        } else {
            MotionPhase::Tracking
        }
    }

    /// Count one tick down. Returns `true` on the tick that expires the frame.
    pub fn decay(&mut self) -> bool {
        if self.time_to_live == 0 {
            self.clear();
            return false;
        }
        self.time_to_live -= 1;
        if self.time_to_live == 0 {
            self.clear();
            return true;
        }
        false
    }
}

/// Elapsed milliseconds for a tick at `now_ms`.
pub fn elapsed_since(last_ms: Option<u32>, now_ms: u32) -> u32 {
    let Some(last) = last_ms else {
        return NOMINAL_ELAPSED_MS;
    };
    if now_ms < last {
        return NOMINAL_ELAPSED_MS;
    }
    match now_ms - last {
        0 => 1,
        d if d > MAX_ELAPSED_MS => NOMINAL_ELAPSED_MS,
        d => d,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Bounds {
    min: i32,
    center: i32,
    max: i32,
}

/// Reassembles space mouse packets into per-frame motion.
#[derive(Debug)]
pub struct MotionAggregator {
    device: DeviceId,
    product_id: u16,
    config: DeviceConfig,
    keys: &'static VirtualKeyTable,
    bounds: [Option<Bounds>; 6],
    frame: MotionFrame,
    keystate: u32,
    buttons: ButtonState,
    last_tick_ms: Option<u32>,
    timer: Option<TimerHandle>,
}

impl MotionAggregator {
    pub fn new(
        device: DeviceId,
        product_id: u16,
        descriptors: &DescriptorSet,
        config: DeviceConfig,
    ) -> Self {
        let mut bounds = [None; 6];
        for (i, b) in bounds.iter_mut().enumerate() {
            *b = AxisSlot::from_index(i)
                .and_then(|slot| descriptors.axis(slot))
                .map(|a| Bounds {
                    min: a.calibrated_min,
                    center: a.calibrated_center,
                    max: a.calibrated_max,
                });
        }
        Self {
            device,
            product_id,
            config,
            keys: VirtualKeyTable::legacy(),
            bounds,
            frame: MotionFrame::default(),
            keystate: 0,
            buttons: ButtonState::with_capacity(descriptors.buttons.len()),
            last_tick_ms: None,
            timer: None,
        }
    }

    #[must_use]
    pub fn with_key_table(mut self, keys: &'static VirtualKeyTable) -> Self {
        self.keys = keys;
        self
    }

    pub fn frame(&self) -> &MotionFrame {
        &self.frame
    }

    pub fn buttons(&self) -> ButtonState {
        self.buttons
    }

    pub fn keystate(&self) -> u32 {
        self.keystate
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn timer(&self) -> Option<TimerHandle> {
        self.timer
    }

    pub fn axis_state(&self) -> AxisState {
        let mut state = AxisState::new(6);
        for (slot, v) in AxisSlot::ALL.iter().zip(self.frame.axes) {
            state.set(*slot, v);
        }
        state
    }

    fn is_foreground(&self, focus: Focus) -> bool {
        focus == Focus::Foreground || !self.config.only_foreground
    }

    fn normalize(&self, first_slot: usize, raw: [i16; 3]) -> [f32; 3] {
        let mut out = [0.0; 3];
        for (i, v) in out.iter_mut().enumerate() {
            if let Some(b) = self.bounds[first_slot + i] {
                *v = normalize_range(i32::from(raw[i]), b.min, b.center, b.max);
            }
        }
        out
    }

    fn set_translation(&mut self, raw: [i16; 3]) {
        let v = self.normalize(0, raw);
        self.frame.axes[..3].copy_from_slice(&v);
    }

    fn set_rotation(&mut self, raw: [i16; 3]) {
        let v = self.normalize(3, raw);
        self.frame.axes[3..].copy_from_slice(&v);
    }

    fn push_state(&self, out: &mut Vec<InputKind>) {
        out.push(InputKind::StateUpdated {
            axes: self.axis_state(),
            buttons: self.buttons,
        });
    }

    /// Apply one packet. Returns `true` when the frame has new motion to process.
    pub fn apply(&mut self, packet: Packet, focus: Focus, out: &mut Vec<InputKind>) -> bool {
        let foreground = self.is_foreground(focus);
        match packet {
            Packet::Translation { translation, rotation } => {
                self.frame.time_to_live = MAX_TIME_TO_LIVE;
                if !foreground {
                    self.frame.clear();
                    self.push_state(out);
                    return false;
                }
                self.set_translation(translation);
                let complete = match rotation {
                    Some(r) => {
                        self.set_rotation(r);
                        self.frame.is_dirty = true;
                        true
                    }
                    None => false,
                };
                self.push_state(out);
                complete
            }
            Packet::Rotation(rotation) => {
                // Backgrounded rotation was already cleared with its translation.
                if !foreground {
                    return false;
                }
                self.frame.time_to_live = MAX_TIME_TO_LIVE;
                self.set_rotation(rotation);
                self.frame.is_dirty = true;
                self.push_state(out);
                true
            }
            Packet::Keystate(mask) => {
                self.buttons.set_bits(mask);
                let old = self.keystate;
                self.keystate = mask;
                if foreground {
                    let change = mask ^ old;
                    for key in 1..=32u16 {
                        let bit = 1u32 << (key - 1);
                        if change & bit == 0 {
                            continue;
                        }
                        let vk = self.keys.remap(self.product_id, key);
                        if vk == 0 {
                            continue;
                        }
                        if mask & bit != 0 {
                            out.push(InputKind::KeyDown { key: vk });
                        } else {
                            out.push(InputKind::KeyUp { key: vk });
                        }
                    }
                }
                self.push_state(out);
                false
            }
        }
    }

    /// Handle one raw report: parse, apply, then tick or arm the timer.
    pub fn process_report(
        &mut self,
        report: &[u8],
        ctx: ReportContext,
        timers: &mut dyn TimerService,
        out: &mut Vec<InputKind>,
    ) -> Result<(), ReportError> {
        let packet = Packet::parse(report)?;
        trace!(device = %self.device, ?packet, "packet");
        if self.apply(packet, ctx.focus, out) {
            if self.config.polling_enabled {
                self.start_timer(timers);
            } else {
                self.frame_tick(ctx.timestamp_ms, ctx.focus, timers, out);
            }
        }
        Ok(())
    }

    fn start_timer(&mut self, timers: &mut dyn TimerService) {
        if self.timer.is_none() {
            self.timer = Some(timers.start_periodic(self.device, self.config.polling_period_ms));
        }
    }

    fn stop_timer(&mut self, timers: &mut dyn TimerService) {
        if let Some(handle) = self.timer.take() {
            timers.stop(handle);
        }
    }

    /// Timer callback. Ignored unless polling and `handle` is ours.
    pub fn on_timer(
        &mut self,
        handle: TimerHandle,
        now_ms: u32,
        focus: Focus,
        timers: &mut dyn TimerService,
        out: &mut Vec<InputKind>,
    ) {
        if self.config.polling_enabled && self.timer == Some(handle) {
            self.frame_tick(now_ms, focus, timers, out);
        }
    }

    /// Run one output cycle.
    pub fn frame_tick(
        &mut self,
        now_ms: u32,
        focus: Focus,
        timers: &mut dyn TimerService,
        out: &mut Vec<InputKind>,
    ) {
        if !self.is_foreground(focus) {
            self.frame.clear();
            self.frame.is_dirty = true;
        }

        let elapsed = elapsed_since(self.last_tick_ms, now_ms);
        let expired = self.frame.decay();

        if expired || self.config.polling_enabled || self.frame.is_dirty {
            self.frame.is_dirty = false;

            let mut motion = self.frame.axes;
            if !self.config.pan_zoom_enabled {
                motion[..3].fill(0.0);
            }
            if !self.config.rotate_enabled {
                motion[3..].fill(0.0);
            }
            let scale = ANGULAR_VELOCITY * self.config.speed.factor();
            for v in motion.iter_mut() {
                *v *= scale;
                *v *= elapsed as f32;
            }
            trace!(device = %self.device, elapsed, ttl = self.frame.time_to_live, "motion");
            out.push(InputKind::Motion { motion });
        }

        if self.frame.is_zero() {
            self.last_tick_ms = None;
            self.stop_timer(timers);
        } else {
            self.last_tick_ms = Some(now_ms);
        }
    }

    /// Host application gained or lost focus.
    pub fn set_active(&mut self, active: bool) {
        if !self.config.polling_enabled && !active {
            self.last_tick_ms = None;
        }
        self.frame.clear();
    }

    /// Release the polling timer before the device goes away.
    pub fn shutdown(&mut self, timers: &mut dyn TimerService) {
        self.stop_timer(timers);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caps::{resolve, ButtonCap, CapabilitySet, UsageSpec, ValueCap};
    use crate::config::Speed;
    use crate::device::DeviceClass;
    use crate::timer::TimerQueue;
    use crate::usage::{generic, page};
    use crate::virtual_keys::{product, VirtualKey};

    const FG: ReportContext = ReportContext { timestamp_ms: 1000, focus: Focus::Foreground };

    fn descriptors() -> DescriptorSet {
        let caps = CapabilitySet {
            buttons: vec![ButtonCap {
                report_id: 3,
                usage_page: page::BUTTON,
                link_collection: 0,
                usages: UsageSpec::Range {
                    usage_min: 1,
                    usage_max: 2,
                    data_index_min: 6,
                    data_index_max: 7,
                },
            }],
            values: vec![ValueCap {
                report_id: 1,
                usage_page: page::GENERIC_DESKTOP,
                link_collection: 0,
                usages: UsageSpec::Range {
                    usage_min: generic::X,
                    usage_max: generic::RZ,
                    data_index_min: 0,
                    data_index_max: 5,
                },
                logical_min: -500,
                logical_max: 500,
                physical_min: -500,
                physical_max: 500,
                bit_size: 16,
            }],
        };
        resolve(&caps, DeviceClass::SpaceMotionController)
    }

    fn aggregator(config: DeviceConfig) -> MotionAggregator {
        MotionAggregator::new(DeviceId(1), product::SPACE_NAVIGATOR, &descriptors(), config)
    }

    fn translation(x: i16, y: i16, z: i16) -> Vec<u8> {
        let mut r = vec![TAG_TRANSLATION];
        for v in [x, y, z] {
            r.extend_from_slice(&v.to_le_bytes());
        }
        r
    }

    fn combined(t: [i16; 3], rot: [i16; 3]) -> Vec<u8> {
        let mut r = translation(t[0], t[1], t[2]);
        for v in rot {
            r.extend_from_slice(&v.to_le_bytes());
        }
        r
    }

    fn rotation(rx: i16, ry: i16, rz: i16) -> Vec<u8> {
        let mut r = translation(rx, ry, rz);
        r[0] = TAG_ROTATION;
        r
    }

    fn keystate(mask: u32) -> Vec<u8> {
        let mut r = vec![TAG_KEYSTATE];
        r.extend_from_slice(&mask.to_le_bytes());
        r
    }

    fn motions(out: &[InputKind]) -> Vec<[f32; 6]> {
        out.iter()
            .filter_map(|k| match k {
                InputKind::Motion { motion } => Some(*motion),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn parses_all_packet_shapes() {
        assert_eq!(
            Packet::parse(&translation(100, -100, 0)),
            Ok(Packet::Translation { translation: [100, -100, 0], rotation: None })
        );
        assert_eq!(
            Packet::parse(&combined([1, 2, 3], [4, 5, 6])),
            Ok(Packet::Translation { translation: [1, 2, 3], rotation: Some([4, 5, 6]) })
        );
        assert_eq!(Packet::parse(&rotation(-7, 8, 9)), Ok(Packet::Rotation([-7, 8, 9])));
        assert_eq!(Packet::parse(&keystate(0x8000_0001)), Ok(Packet::Keystate(0x8000_0001)));
        assert_eq!(Packet::parse(&[]), Err(ReportError::Empty));
        assert_eq!(Packet::parse(&[9, 0, 0]), Err(ReportError::UnknownTag(9)));
        assert_eq!(
            Packet::parse(&[1, 0, 0, 0]),
            Err(ReportError::TooShort { needed: 7, actual: 4 })
        );
        // Between the split and combined lengths the extra bytes are ignored.
        let mut odd = translation(5, 6, 7);
        odd.extend_from_slice(&[1, 2, 3]);
        assert_eq!(
            Packet::parse(&odd),
            Ok(Packet::Translation { translation: [5, 6, 7], rotation: None })
        );
    }

    #[test]
    fn translation_normalizes_against_calibration() {
        let mut agg = aggregator(DeviceConfig::default());
        let mut out = Vec::new();
        assert!(!agg.apply(
            Packet::parse(&translation(100, -100, 0)).unwrap(),
            Focus::Foreground,
            &mut out
        ));
        assert_eq!(&agg.frame().axes[..3], &[0.2, -0.2, 0.0]);
        assert_eq!(agg.frame().time_to_live, MAX_TIME_TO_LIVE);
        assert!(!agg.frame().is_dirty);
        assert!(matches!(out[0], InputKind::StateUpdated { .. }));
    }

    #[test]
    fn event_driven_ticks_on_complete_frames() {
        let mut agg = aggregator(DeviceConfig::default());
        let mut timers = TimerQueue::new();
        let mut out = Vec::new();

        agg.process_report(&translation(500, 0, 0), FG, &mut timers, &mut out).unwrap();
        assert!(motions(&out).is_empty());

        agg.process_report(&rotation(0, 0, -500), FG, &mut timers, &mut out).unwrap();
        let m = motions(&out);
        assert_eq!(m.len(), 1);
        // First tick assumes 10 ms.
        let expected = ANGULAR_VELOCITY * 10.0;
        assert_eq!(m[0], [expected, 0.0, 0.0, 0.0, 0.0, -expected]);
        assert_eq!(agg.frame().time_to_live, MAX_TIME_TO_LIVE - 1);
        assert!(timers.is_empty());
    }

    #[test]
    fn idle_ticks_skip_emission_without_new_data() {
        let mut agg = aggregator(DeviceConfig::default());
        let mut timers = TimerQueue::new();
        let mut out = Vec::new();
        agg.process_report(&combined([10, 0, 0], [0; 3]), FG, &mut timers, &mut out).unwrap();
        out.clear();
        agg.frame_tick(1020, Focus::Foreground, &mut timers, &mut out);
        assert!(motions(&out).is_empty());
    }

    #[test]
    fn time_to_live_decays_to_zero_in_five_ticks() {
        let config = DeviceConfig { polling_enabled: true, ..DeviceConfig::default() };
        let mut agg = aggregator(config);
        let mut timers = TimerQueue::new();
        timers.observe(1000);
        let mut out = Vec::new();

        agg.process_report(&combined([250, 250, 250], [250; 3]), FG, &mut timers, &mut out)
            .unwrap();
        let handle = agg.timer().expect("polling timer armed");
        assert!(motions(&out).is_empty());

        for tick in 1..=5u32 {
            out.clear();
            let now = 1000 + 20 * tick;
            for (h, _) in timers.due(now) {
                agg.on_timer(h, now, Focus::Foreground, &mut timers, &mut out);
            }
            let m = motions(&out);
            assert_eq!(m.len(), 1, "tick {tick}");
            if tick < 5 {
                assert!(m[0].iter().all(|v| *v > 0.0));
                assert_eq!(agg.frame().phase(), MotionPhase::Tracking);
            } else {
                assert_eq!(m[0], [0.0; 6]);
                assert_eq!(agg.frame().axes, [0.0; 6]);
                assert_eq!(agg.frame().phase(), MotionPhase::Idle);
            }
        }
        // Zero frame stopped the timer.
        assert!(!timers.is_running(handle));
        assert_eq!(agg.timer(), None);

        out.clear();
        agg.frame_tick(2000, Focus::Foreground, &mut timers, &mut out);
        assert_eq!(agg.frame().axes, [0.0; 6]);
        assert_eq!(agg.frame().time_to_live, 0);
    }

    #[test]
    fn polling_uses_measured_elapsed_time() {
        let config = DeviceConfig { polling_enabled: true, ..DeviceConfig::default() };
        let mut agg = aggregator(config);
        let mut timers = TimerQueue::new();
        let mut out = Vec::new();
        agg.process_report(&combined([500, 0, 0], [0; 3]), FG, &mut timers, &mut out).unwrap();

        agg.frame_tick(1000, Focus::Foreground, &mut timers, &mut out);
        agg.frame_tick(1020, Focus::Foreground, &mut timers, &mut out);
        let m = motions(&out);
        assert_eq!(m[0][0], ANGULAR_VELOCITY * 10.0);
        assert_eq!(m[1][0], ANGULAR_VELOCITY * 20.0);
    }

    #[test]
    fn keystate_diff_emits_one_key_down() {
        let mut agg = aggregator(DeviceConfig::default());
        let mut out = Vec::new();
        agg.apply(Packet::Keystate(0b0001), Focus::Foreground, &mut out);
        out.clear();
        agg.apply(Packet::Keystate(0b0011), Focus::Foreground, &mut out);
        let keys: Vec<_> = out
            .iter()
            .filter(|k| matches!(k, InputKind::KeyDown { .. } | InputKind::KeyUp { .. }))
            .cloned()
            .collect();
        assert_eq!(keys, vec![InputKind::KeyDown { key: 2 }]);
        assert!(agg.buttons().is_pressed(0) && agg.buttons().is_pressed(1));

        out.clear();
        agg.apply(Packet::Keystate(0), Focus::Foreground, &mut out);
        assert_eq!(
            out.iter().filter(|k| matches!(k, InputKind::KeyUp { .. })).count(),
            2
        );
    }

    #[test]
    fn legacy_keys_are_remapped_and_invalid_suppressed() {
        let mut agg = MotionAggregator::new(
            DeviceId(2),
            product::SPACE_EXPLORER,
            &descriptors(),
            DeviceConfig::default(),
        );
        let mut out = Vec::new();
        // Key 3 is Top; key 16 is past the table.
        agg.apply(Packet::Keystate((1 << 2) | (1 << 15)), Focus::Foreground, &mut out);
        let downs: Vec<_> = out
            .iter()
            .filter_map(|k| match k {
                InputKind::KeyDown { key } => Some(*key),
                _ => None,
            })
            .collect();
        assert_eq!(downs, vec![VirtualKey::Top.code()]);
    }

    #[test]
    fn background_keystate_is_stored_but_not_dispatched() {
        let config = DeviceConfig { only_foreground: true, ..DeviceConfig::default() };
        let mut agg = aggregator(config);
        let mut out = Vec::new();
        agg.apply(Packet::Keystate(0b1), Focus::Background, &mut out);
        assert_eq!(agg.keystate(), 0b1);
        assert!(!out.iter().any(|k| matches!(k, InputKind::KeyDown { .. })));
    }

    #[test]
    fn background_translation_zeroes_the_frame() {
        let config = DeviceConfig {
            only_foreground: true,
            polling_enabled: true,
            ..DeviceConfig::default()
        };
        let mut agg = aggregator(config);
        let mut timers = TimerQueue::new();
        let mut out = Vec::new();

        agg.process_report(&combined([0; 3], [300, 300, 300]), FG, &mut timers, &mut out)
            .unwrap();
        assert!(!agg.frame().is_zero());

        let bg = ReportContext { timestamp_ms: 1010, focus: Focus::Background };
        agg.process_report(&combined([400, -400, 400], [400; 3]), bg, &mut timers, &mut out)
            .unwrap();
        assert!(agg.frame().is_zero());
        assert_eq!(agg.frame().time_to_live, MAX_TIME_TO_LIVE);

        out.clear();
        agg.frame_tick(1020, Focus::Background, &mut timers, &mut out);
        assert_eq!(motions(&out), vec![[0.0; 6]]);
        assert!(agg.timer().is_none());
    }

    #[test]
    fn background_is_ignored_unless_configured() {
        let mut agg = aggregator(DeviceConfig::default());
        let mut out = Vec::new();
        agg.apply(
            Packet::parse(&translation(100, 0, 0)).unwrap(),
            Focus::Background,
            &mut out,
        );
        assert_eq!(agg.frame().axes[0], 0.2);
    }

    #[test]
    fn filters_and_speed() {
        let config = DeviceConfig {
            pan_zoom_enabled: false,
            speed: Speed::High,
            ..DeviceConfig::default()
        };
        let mut agg = aggregator(config);
        let mut timers = TimerQueue::new();
        let mut out = Vec::new();
        agg.process_report(&combined([500; 3], [500; 3]), FG, &mut timers, &mut out).unwrap();
        let m = motions(&out)[0];
        assert_eq!(&m[..3], &[0.0; 3]);
        let expected = ANGULAR_VELOCITY * 4.0 * 10.0;
        assert_eq!(&m[3..], &[expected; 3]);

        let config = DeviceConfig { rotate_enabled: false, ..DeviceConfig::default() };
        let mut agg = aggregator(config);
        out.clear();
        agg.process_report(&combined([500; 3], [500; 3]), FG, &mut timers, &mut out).unwrap();
        let m = motions(&out)[0];
        assert_eq!(&m[3..], &[0.0; 3]);
        assert!(m[0] > 0.0);
    }

    #[test]
    fn elapsed_time_is_clamped() {
        assert_eq!(elapsed_since(None, 5), NOMINAL_ELAPSED_MS);
        assert_eq!(elapsed_since(Some(100), 100), 1);
        assert_eq!(elapsed_since(Some(100), 116), 16);
        assert_eq!(elapsed_since(Some(100), 600), 500);
        assert_eq!(elapsed_since(Some(100), 601), NOMINAL_ELAPSED_MS);
        assert_eq!(elapsed_since(Some(100), 90), NOMINAL_ELAPSED_MS);
    }

    #[test]
    fn deactivation_zeroes_and_resets_clock() {
        let mut agg = aggregator(DeviceConfig::default());
        let mut timers = TimerQueue::new();
        let mut out = Vec::new();
        agg.process_report(&combined([500; 3], [0; 3]), FG, &mut timers, &mut out).unwrap();
        assert_eq!(agg.last_tick_ms, Some(1000));
        agg.set_active(false);
        assert!(agg.frame().is_zero());
        assert_eq!(agg.last_tick_ms, None);
    }

    #[test]
    fn missing_descriptors_report_no_motion() {
        let mut agg = MotionAggregator::new(
            DeviceId(3),
            product::SPACE_NAVIGATOR,
            &DescriptorSet::default(),
            DeviceConfig::default(),
        );
        let mut out = Vec::new();
        agg.apply(Packet::parse(&translation(100, 100, 100)).unwrap(), Focus::Foreground, &mut out);
        assert!(agg.frame().is_zero());
        assert_eq!(agg.buttons().capacity(), 0);
    }
}
