//! Per-frame scheduling and the spectrum → bands → uniforms task.
//!
//! Tasks run once per displayed frame, strictly one after another; nothing
//! suspends mid-tick. Removing a task from the scheduler is the only way to
//! cancel it.

use std::panic::{self, AssertUnwindSafe};
use tracing::{error, trace};

use crate::audio::{SpectrumFrame, SpectrumSource};
use crate::bands::{self, BandVector};
use crate::params::BandLayout;
use crate::uniforms::{UniformBridge, UniformSet, TIME_SLOT};

/// Per-tick inputs handed to every task
pub struct FrameContext<'a> {
    /// Uniforms of the mounted plane, `None` until the render target exists
    pub uniforms: Option<&'a mut UniformSet>,
    pub frame_index: u64,
    /// Seconds since the shell started
    pub elapsed_s: f32,
}

/// Work scheduled once per frame
pub trait FrameTask {
    fn name(&self) -> &str;
    fn tick(&mut self, ctx: &mut FrameContext<'_>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

/// Ordered set of frame tasks driven by the display refresh
#[derive(Default)]
pub struct FrameScheduler {
    next_id: u64,
    tasks: Vec<(TaskId, Box<dyn FrameTask>)>,
    frame_index: u64,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, task: Box<dyn FrameTask>) -> TaskId {
        self.next_id += 1;
        let id = TaskId(self.next_id);
        self.tasks.push((id, task));
        id
    }

    /// Remove a task; returns whether it was registered
    pub fn deregister(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|(task_id, _)| *task_id != id);
        self.tasks.len() != before
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Tick every task in registration order
    ///
    /// A task that panics is logged and skipped for this frame only; it
    /// stays registered and the remaining tasks still run.
    pub fn run_frame(&mut self, mut uniforms: Option<&mut UniformSet>, elapsed_s: f32) {
        let frame_index = self.frame_index;
        self.frame_index += 1;

        for (_, task) in &mut self.tasks {
            let mut ctx = FrameContext {
                uniforms: uniforms.as_deref_mut(),
                frame_index,
                elapsed_s,
            };
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| task.tick(&mut ctx)));
            if outcome.is_err() {
                error!("Frame task '{}' panicked on frame {}", task.name(), frame_index);
            }
        }
    }
}

/// Samples the spectrum, reduces it to bands and publishes them as uniforms
///
/// Also advances `u_time`, which the shaders animate with whether or not
/// audio is playing.
pub struct RenderLoop {
    source: SpectrumSource,
    band_count: usize,
    bridge: UniformBridge,
    frame: SpectrumFrame,
    bands: BandVector,
}

impl RenderLoop {
    pub fn new(source: SpectrumSource, layout: BandLayout) -> Self {
        Self {
            source,
            band_count: layout.band_count(),
            bridge: UniformBridge::new(layout),
            frame: SpectrumFrame::default(),
            bands: BandVector::default(),
        }
    }

    /// Bands published on the most recent tick that had a tap
    pub fn last_bands(&self) -> &BandVector {
        &self.bands
    }
}

impl FrameTask for RenderLoop {
    fn name(&self) -> &str {
        "spectrum"
    }

    fn tick(&mut self, ctx: &mut FrameContext<'_>) {
        if let Some(uniforms) = ctx.uniforms.as_deref_mut() {
            uniforms.set(TIME_SLOT, ctx.elapsed_s);
        }

        // No tap yet: leave previously published bands in place
        if !self.source.sample_into(&mut self.frame) {
            return;
        }

        bands::reduce_into(self.frame.as_slice(), self.band_count, &mut self.bands);
        trace!("Frame {} bands: {:?}", ctx.frame_index, self.bands.as_slice());
        self.bridge
            .publish(&self.bands, ctx.uniforms.as_deref_mut());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{SpectrumTap, TapSlot};
    use crate::params::AnalyserConfig;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::Arc;

    struct Counter {
        hits: Rc<Cell<u32>>,
    }

    impl FrameTask for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        fn tick(&mut self, _ctx: &mut FrameContext<'_>) {
            self.hits.set(self.hits.get() + 1);
        }
    }

    struct Panicker;

    impl FrameTask for Panicker {
        fn name(&self) -> &str {
            "panicker"
        }

        fn tick(&mut self, _ctx: &mut FrameContext<'_>) {
            panic!("boom");
        }
    }

    #[test]
    fn test_register_and_deregister() {
        let hits = Rc::new(Cell::new(0));
        let mut scheduler = FrameScheduler::new();
        let id = scheduler.register(Box::new(Counter { hits: hits.clone() }));

        scheduler.run_frame(None, 0.0);
        scheduler.run_frame(None, 0.016);
        assert_eq!(hits.get(), 2);

        assert!(scheduler.deregister(id));
        assert!(!scheduler.deregister(id));
        scheduler.run_frame(None, 0.033);
        assert_eq!(hits.get(), 2);
        assert_eq!(scheduler.frame_index(), 3);
    }

    #[test]
    fn test_panicking_task_does_not_stop_the_loop() {
        let hits = Rc::new(Cell::new(0));
        let mut scheduler = FrameScheduler::new();
        scheduler.register(Box::new(Panicker));
        scheduler.register(Box::new(Counter { hits: hits.clone() }));

        scheduler.run_frame(None, 0.0);
        scheduler.run_frame(None, 0.016);

        assert_eq!(hits.get(), 2);
        assert_eq!(scheduler.len(), 2);
    }

    #[test]
    fn test_tick_without_tap_keeps_uniforms() {
        let mut task = RenderLoop::new(SpectrumSource::new(TapSlot::new()), BandLayout::Five);
        let mut uniforms = UniformSet::new(BandLayout::Five, 0.001);
        uniforms.set("u_freq2", 77.0);

        let mut ctx = FrameContext {
            uniforms: Some(&mut uniforms),
            frame_index: 0,
            elapsed_s: 0.0,
        };
        task.tick(&mut ctx);

        assert_eq!(uniforms.get("u_freq2"), Some(77.0));
    }

    #[test]
    fn test_tick_advances_time_slot() {
        let mut scheduler = FrameScheduler::new();
        scheduler.register(Box::new(RenderLoop::new(
            SpectrumSource::new(TapSlot::new()),
            BandLayout::Five,
        )));
        let mut uniforms = UniformSet::new(BandLayout::Five, 0.001);

        scheduler.run_frame(Some(&mut uniforms), 1.5);
        assert_eq!(uniforms.get(TIME_SLOT), Some(1.5));

        scheduler.run_frame(Some(&mut uniforms), 1.75);
        assert_eq!(uniforms.get(TIME_SLOT), Some(1.75));
    }

    #[test]
    fn test_tick_with_tap_publishes_bands() {
        let slot = TapSlot::new();
        slot.publish(Arc::new(SpectrumTap::new(AnalyserConfig::default()).unwrap()));
        let mut task = RenderLoop::new(SpectrumSource::new(slot), BandLayout::Five);

        let mut uniforms = UniformSet::new(BandLayout::Five, 0.001);
        uniforms.set("u_freq0", 99.0);

        let mut ctx = FrameContext {
            uniforms: Some(&mut uniforms),
            frame_index: 0,
            elapsed_s: 0.0,
        };
        task.tick(&mut ctx);

        // Silent tap publishes zeros over the stale value
        assert_eq!(uniforms.get("u_freq0"), Some(0.0));
        assert_eq!(task.last_bands().len(), 5);
    }

    #[test]
    fn test_tick_with_unmounted_target() {
        let slot = TapSlot::new();
        slot.publish(Arc::new(SpectrumTap::new(AnalyserConfig::default()).unwrap()));
        let mut scheduler = FrameScheduler::new();
        scheduler.register(Box::new(RenderLoop::new(
            SpectrumSource::new(slot),
            BandLayout::Single,
        )));

        scheduler.run_frame(None, 0.0);
        assert_eq!(scheduler.frame_index(), 1);
    }
}
