//! Mid-stream resolution change detection.
//!
//! A VP8 encoder may code pictures smaller than the display size and signal
//! the ratio in each keyframe header. The decoder then hands out pictures at
//! the coded size, and the receiver must scale them back to the display size.
//! [`RescaleDetector`] watches keyframes for a change in the implied coded
//! size and rebuilds its scaler when it happens.

use crate::codec::{Scaler, ScalerFactory};
use crate::error::{Result, Vp8Error};
use crate::media::bitstream::{KeyframeHeader, parse_keyframe_header};
use crate::picture::{Dimensions, YuvPicture};

/// Coded size implied by a keyframe header for the given display size.
pub fn implied_source_size(header: &KeyframeHeader, display: Dimensions) -> Dimensions {
    Dimensions::new(
        header.horizontal_scale.scale(display.width),
        header.vertical_scale.scale(display.height),
    )
}

/// Owns the output scaler and rebuilds it when keyframes announce a new
/// coded size.
///
/// Non-keyframes carry no scaling information and reuse whatever scaler
/// exists. Until a keyframe has established one, pictures cannot be scaled
/// and must be dropped.
pub struct RescaleDetector {
    factory: Box<dyn ScalerFactory>,
    source: Option<Dimensions>,
    scaler: Option<Box<dyn Scaler>>,
}

impl RescaleDetector {
    pub fn new(factory: Box<dyn ScalerFactory>) -> Self {
        Self {
            factory,
            source: None,
            scaler: None,
        }
    }

    /// Make sure a scaler matching `frame` exists.
    ///
    /// Returns `Ok(true)` when [`scale`](Self::scale) can bring the picture
    /// decoded from `frame` to the `output` size, `Ok(false)` when the picture
    /// has to be dropped. A keyframe with an unreadable header or a failed scaler build
    /// is an error; after a failed build the next keyframe retries.
    pub fn prepare(
        &mut self,
        frame: &[u8],
        output: Dimensions,
        is_keyframe: bool,
    ) -> Result<bool> {
        if !is_keyframe {
            return Ok(self.scaler.is_some());
        }

        let header = parse_keyframe_header(frame)?;
        let source = implied_source_size(&header, output);
        if self.source == Some(source) {
            return Ok(true);
        }

        if self.scaler.take().is_some() {
            tracing::debug!(
                from = ?self.source,
                to = %source,
                "coded size changed, scaler released"
            );
        }
        self.source = None;

        let scaler = self.factory.build(source, output)?;
        tracing::info!(src = %source, dst = %output, "scaler built");
        self.scaler = Some(scaler);
        self.source = Some(source);
        Ok(true)
    }

    /// Scale a decoded picture with the current scaler.
    pub fn scale(&mut self, src: &YuvPicture, dst: &mut YuvPicture) -> Result<()> {
        let scaler = self
            .scaler
            .as_mut()
            .ok_or_else(|| Vp8Error::Scale("no scaler configured".into()))?;
        scaler.scale(src, dst)
    }

    /// Coded size the current scaler was built for.
    pub fn source_size(&self) -> Option<Dimensions> {
        self.source
    }

    pub fn has_scaler(&self) -> bool {
        self.scaler.is_some()
    }
}

impl std::fmt::Debug for RescaleDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RescaleDetector")
            .field("source", &self.source)
            .field("has_scaler", &self.scaler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::media::bitstream::{ScalingMode, keyframe_bytes};

    #[derive(Default)]
    struct Log {
        built: Vec<(Dimensions, Dimensions)>,
        dropped: usize,
        fail_next: bool,
    }

    struct FakeScaler {
        log: Arc<Mutex<Log>>,
    }

    impl Scaler for FakeScaler {
        fn scale(&mut self, _src: &YuvPicture, dst: &mut YuvPicture) -> Result<()> {
            dst.data.fill(1);
            Ok(())
        }
    }

    impl Drop for FakeScaler {
        fn drop(&mut self) {
            self.log.lock().dropped += 1;
        }
    }

    struct FakeFactory(Arc<Mutex<Log>>);

    impl ScalerFactory for FakeFactory {
        fn build(&self, src: Dimensions, dst: Dimensions) -> Result<Box<dyn Scaler>> {
            let mut log = self.0.lock();
            if std::mem::take(&mut log.fail_next) {
                return Err(Vp8Error::ScalerBuild {
                    src,
                    dst,
                    reason: "unsupported".into(),
                });
            }
            log.built.push((src, dst));
            Ok(Box::new(FakeScaler {
                log: self.0.clone(),
            }))
        }
    }

    fn detector() -> (RescaleDetector, Arc<Mutex<Log>>) {
        let log = Arc::new(Mutex::new(Log::default()));
        (RescaleDetector::new(Box::new(FakeFactory(log.clone()))), log)
    }

    const DISPLAY: Dimensions = Dimensions::new(1000, 600);

    #[test]
    fn non_keyframe_without_scaler_drops() {
        let (mut d, log) = detector();
        assert!(!d.prepare(&[0x01, 0, 0], DISPLAY, false).unwrap());
        assert!(log.lock().built.is_empty());
    }

    #[test]
    fn keyframe_builds_scaler_from_implied_size() {
        let (mut d, log) = detector();
        let kf = keyframe_bytes(500, 300, ScalingMode::OneTwo, ScalingMode::ThreeFive);
        assert!(d.prepare(&kf, DISPLAY, true).unwrap());
        assert_eq!(d.source_size(), Some(Dimensions::new(500, 360)));
        assert_eq!(log.lock().built, vec![(Dimensions::new(500, 360), DISPLAY)]);
    }

    #[test]
    fn same_size_keyframe_reuses_scaler() {
        let (mut d, log) = detector();
        let kf = keyframe_bytes(1000, 600, ScalingMode::Normal, ScalingMode::Normal);
        d.prepare(&kf, DISPLAY, true).unwrap();
        d.prepare(&kf, DISPLAY, true).unwrap();
        assert_eq!(log.lock().built.len(), 1);
        assert_eq!(log.lock().dropped, 0);
    }

    #[test]
    fn changed_size_rebuilds_and_releases_old_scaler() {
        let (mut d, log) = detector();
        let normal = keyframe_bytes(1000, 600, ScalingMode::Normal, ScalingMode::Normal);
        let small = keyframe_bytes(800, 480, ScalingMode::FourFive, ScalingMode::FourFive);
        d.prepare(&normal, DISPLAY, true).unwrap();
        d.prepare(&small, DISPLAY, true).unwrap();
        let log = log.lock();
        assert_eq!(log.built.len(), 2);
        assert_eq!(log.built[1].0, Dimensions::new(800, 480));
        assert_eq!(log.dropped, 1);
    }

    #[test]
    fn non_keyframe_reuses_existing_scaler() {
        let (mut d, _log) = detector();
        let kf = keyframe_bytes(1000, 600, ScalingMode::Normal, ScalingMode::Normal);
        d.prepare(&kf, DISPLAY, true).unwrap();
        // Inter frames are never parsed, even if they look like garbage.
        assert!(d.prepare(&[0xff], Dimensions::new(1, 1), false).unwrap());
    }

    #[test]
    fn build_failure_drops_until_next_keyframe() {
        let (mut d, log) = detector();
        log.lock().fail_next = true;
        let kf = keyframe_bytes(1000, 600, ScalingMode::Normal, ScalingMode::Normal);
        assert!(d.prepare(&kf, DISPLAY, true).is_err());
        assert!(!d.has_scaler());
        assert!(!d.prepare(&[0x01], DISPLAY, false).unwrap());
        assert!(d.prepare(&kf, DISPLAY, true).unwrap());
        assert!(d.has_scaler());
    }

    #[test]
    fn truncated_keyframe_is_an_error() {
        let (mut d, _log) = detector();
        assert!(d.prepare(&[0x10, 0x02], DISPLAY, true).is_err());
    }

    #[test]
    fn scale_without_scaler_is_an_error() {
        let (mut d, _log) = detector();
        let src = YuvPicture::alloc(Dimensions::new(2, 2));
        let mut dst = YuvPicture::alloc(Dimensions::new(2, 2));
        assert!(d.scale(&src, &mut dst).is_err());
    }

    #[test]
    fn drop_releases_scaler() {
        let (mut d, log) = detector();
        let kf = keyframe_bytes(1000, 600, ScalingMode::Normal, ScalingMode::Normal);
        d.prepare(&kf, DISPLAY, true).unwrap();
        drop(d);
        assert_eq!(log.lock().dropped, 1);
    }
}
