//! Spectrum source: the render thread's read-only view of the current tap.

use arc_swap::ArcSwapOption;
use std::sync::Arc;

use super::analyser::{SpectrumFrame, SpectrumTap};

/// Shared cell holding the live tap, if any
///
/// The playback controller is the only writer; it stores a tap only after
/// the tap is wired into a running graph. Readers never block the writer.
#[derive(Clone, Default)]
pub struct TapSlot {
    inner: Arc<ArcSwapOption<SpectrumTap>>,
}

impl TapSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn publish(&self, tap: Arc<SpectrumTap>) {
        self.inner.store(Some(tap));
    }

    pub(crate) fn clear(&self) {
        self.inner.store(None);
    }

    pub fn current(&self) -> Option<Arc<SpectrumTap>> {
        self.inner.load_full()
    }

    pub fn is_attached(&self) -> bool {
        self.inner.load().is_some()
    }
}

/// Produces spectrum frames on demand from whatever tap is attached
#[derive(Clone)]
pub struct SpectrumSource {
    slot: TapSlot,
}

impl SpectrumSource {
    pub fn new(slot: TapSlot) -> Self {
        Self { slot }
    }

    pub fn has_tap(&self) -> bool {
        self.slot.is_attached()
    }

    /// Read the current spectrum, or `None` when no tap exists yet
    pub fn sample(&self) -> Option<SpectrumFrame> {
        let mut frame = SpectrumFrame::default();
        self.sample_into(&mut frame).then_some(frame)
    }

    /// Read the current spectrum into a reusable frame buffer
    ///
    /// Returns `false` and leaves `frame` untouched when no tap exists.
    pub fn sample_into(&self, frame: &mut SpectrumFrame) -> bool {
        let guard = self.slot.inner.load();
        match &*guard {
            Some(tap) => {
                tap.byte_frequency_data(frame);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::AnalyserConfig;

    #[test]
    fn test_sample_without_tap_is_noop() {
        let source = SpectrumSource::new(TapSlot::new());
        let mut frame = SpectrumFrame::from(vec![9u8; 4]);

        assert!(source.sample().is_none());
        assert!(!source.sample_into(&mut frame));
        assert_eq!(frame.as_slice(), &[9, 9, 9, 9]);
    }

    #[test]
    fn test_frame_length_is_stable_per_tap() {
        let slot = TapSlot::new();
        let source = SpectrumSource::new(slot.clone());
        slot.publish(Arc::new(SpectrumTap::new(AnalyserConfig::default()).unwrap()));

        let first = source.sample().unwrap();
        let second = source.sample().unwrap();
        assert_eq!(first.len(), 128);
        assert_eq!(first.len(), second.len());
    }

    #[test]
    fn test_clear_detaches_tap() {
        let slot = TapSlot::new();
        let source = SpectrumSource::new(slot.clone());
        slot.publish(Arc::new(SpectrumTap::new(AnalyserConfig::default()).unwrap()));
        assert!(source.has_tap());

        slot.clear();
        assert!(!source.has_tap());
        assert!(source.sample().is_none());
    }
}
