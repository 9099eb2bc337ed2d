//! Decode direction: fragments in, display-sized pictures out.

use crate::codec::{CodecEngine, ScalerFactory, Vp8Decoder};
use crate::config::DecoderConfig;
use crate::error::{Result, Vp8Error};
use crate::media::{AssembledFrame, Packet, Reassembler, ReassemblyStats};
use crate::picture::YuvPicture;
use crate::rescale::RescaleDetector;

/// Events a decode stream reports to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderEvent {
    /// The decoder is failing on incoming frames. Rate limited.
    DecodingErrors,
}

/// Receiver for [`DecoderEvent`]s.
pub trait EventSink: Send {
    fn notify(&mut self, event: DecoderEvent);
}

impl<F> EventSink for F
where
    F: FnMut(DecoderEvent) + Send,
{
    fn notify(&mut self, event: DecoderEvent) {
        self(event)
    }
}

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn notify(&mut self, _event: DecoderEvent) {}
}

/// Allows one report per interval of processing-clock time.
#[derive(Debug, Clone)]
struct ErrorThrottle {
    interval_ms: u64,
    last_reported: Option<u64>,
}

impl ErrorThrottle {
    fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_reported: None,
        }
    }

    fn should_report(&mut self, now_ms: u64) -> bool {
        let due = match self.last_reported {
            None => true,
            Some(last) => now_ms.saturating_sub(last) > self.interval_ms,
        };
        if due {
            self.last_reported = Some(now_ms);
        }
        due
    }
}

/// One decode stream.
///
/// Owns the reassembler, the decoder, the rescale detector and the event
/// sink. Dropping the stream discards any partial frame and releases the
/// scaler.
pub struct DecodeStream {
    decoder: Box<dyn Vp8Decoder>,
    reassembler: Reassembler,
    rescale: RescaleDetector,
    sink: Box<dyn EventSink>,
    throttle: ErrorThrottle,
}

impl DecodeStream {
    /// Build a decoder from `engine`. Fails if the engine cannot initialize.
    pub fn new(
        engine: &dyn CodecEngine,
        scalers: Box<dyn ScalerFactory>,
        sink: Box<dyn EventSink>,
        config: DecoderConfig,
    ) -> Result<Self> {
        let decoder = engine.new_decoder()?;
        Ok(Self::with_decoder(decoder, scalers, sink, config))
    }

    /// Wrap an already-built decoder instance.
    pub fn with_decoder(
        decoder: Box<dyn Vp8Decoder>,
        scalers: Box<dyn ScalerFactory>,
        sink: Box<dyn EventSink>,
        config: DecoderConfig,
    ) -> Self {
        tracing::info!(
            error_report_interval_ms = config.error_report_interval_ms,
            "decode stream created"
        );
        Self {
            decoder,
            reassembler: Reassembler::new(),
            rescale: RescaleDetector::new(scalers),
            sink,
            throttle: ErrorThrottle::new(config.error_report_interval_ms),
        }
    }

    /// Run one tick over the fragments that arrived since the last one.
    pub fn process<I>(&mut self, now_ms: u64, packets: I) -> Vec<YuvPicture>
    where
        I: IntoIterator<Item = Packet>,
    {
        let mut pictures = Vec::new();
        for packet in packets {
            if let Some(frame) = self.reassembler.push(packet) {
                self.decode_frame(now_ms, &frame, &mut pictures);
            }
        }
        pictures
    }

    pub fn reassembly_stats(&self) -> ReassemblyStats {
        self.reassembler.stats()
    }

    pub fn rescale(&self) -> &RescaleDetector {
        &self.rescale
    }

    fn decode_frame(&mut self, now_ms: u64, frame: &AssembledFrame, out: &mut Vec<YuvPicture>) {
        let images = match self.decoder.decode(&frame.data) {
            Ok(images) => images,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    ts = frame.timestamp,
                    bytes = frame.data.len(),
                    "decode failed"
                );
                self.report_error(now_ms);
                return;
            }
        };

        for image in images {
            match self.rescale.prepare(&frame.data, image.display, frame.is_keyframe) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(ts = frame.timestamp, "no scaler yet, waiting for keyframe");
                    continue;
                }
                Err(e @ Vp8Error::Parse { .. }) => {
                    tracing::warn!(
                        error = %e,
                        ts = frame.timestamp,
                        "keyframe header unreadable, picture dropped"
                    );
                    self.report_error(now_ms);
                    continue;
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        ts = frame.timestamp,
                        "scaler setup failed, picture dropped"
                    );
                    continue;
                }
            }

            let mut picture = YuvPicture::alloc(image.display);
            match self.rescale.scale(&image.picture, &mut picture) {
                Ok(()) => out.push(picture),
                Err(e) => tracing::warn!(
                    error = %e,
                    ts = frame.timestamp,
                    "scaling failed, picture dropped"
                ),
            }
        }
    }

    fn report_error(&mut self, now_ms: u64) {
        if self.throttle.should_report(now_ms) {
            self.sink.notify(DecoderEvent::DecodingErrors);
        }
    }
}

impl Drop for DecodeStream {
    fn drop(&mut self) {
        if let Some(ts) = self.reassembler.pending_timestamp() {
            tracing::debug!(ts, "decode stream closed with a partial frame pending");
        }
    }
}

impl std::fmt::Debug for DecodeStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeStream")
            .field("reassembler", &self.reassembler)
            .field("rescale", &self.rescale)
            .field("throttle", &self.throttle)
            .finish()
    }
}
