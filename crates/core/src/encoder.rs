//! Encode direction: raw pictures in, descriptor-tagged fragments out.

use crate::codec::{CodecEngine, Vp8Encoder};
use crate::config::{EncoderConfig, FragmentationMode};
use crate::error::Result;
use crate::keyframe::KeyframeScheduler;
use crate::media::{Fragmenter, Packet, PartitionInfo, rtp_timestamp};
use crate::picture::{Dimensions, YuvPicture};

/// One encode stream.
///
/// Driven by an external tick through [`process`](Self::process); all state
/// is owned here and nothing is shared with other streams.
pub struct EncodeStream {
    encoder: Box<dyn Vp8Encoder>,
    config: EncoderConfig,
    fragmenter: Fragmenter,
    scheduler: KeyframeScheduler,
    keyframe_requested: bool,
    frame_count: u64,
}

impl EncodeStream {
    /// Build an encoder from `engine`. Fails if the configuration is invalid
    /// or the engine cannot initialize.
    pub fn new(engine: &dyn CodecEngine, config: EncoderConfig) -> Result<Self> {
        config.validate()?;
        let encoder = engine.new_encoder(&config)?;
        Self::with_encoder(encoder, config)
    }

    /// Wrap an already-built encoder instance.
    pub fn with_encoder(encoder: Box<dyn Vp8Encoder>, config: EncoderConfig) -> Result<Self> {
        config.validate()?;
        let fragmenter = Fragmenter::new(config.fragment_size)?;
        tracing::info!(
            size = %config.picture_size,
            fps = config.fps,
            kbps = config.target_bitrate_kbps(),
            fragment_size = config.fragment_size,
            mode = ?config.fragmentation,
            "encode stream created"
        );
        Ok(Self {
            encoder,
            config,
            fragmenter,
            scheduler: KeyframeScheduler::new(),
            keyframe_requested: false,
            frame_count: 0,
        })
    }

    /// Run one tick: encode every queued picture and fragment the output.
    ///
    /// Encode failures drop the picture and processing continues with the
    /// next one.
    pub fn process(&mut self, now_ms: u64, frames: &[YuvPicture]) -> Vec<Packet> {
        let timestamp = rtp_timestamp(now_ms);
        let mut packets = Vec::new();

        for raw in frames {
            if self.scheduler.poll(now_ms) {
                self.keyframe_requested = true;
            }
            let force_keyframe = std::mem::take(&mut self.keyframe_requested);

            let partitions = match self.encoder.encode(raw, force_keyframe) {
                Ok(partitions) => partitions,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        frame = self.frame_count,
                        "encode failed, frame dropped"
                    );
                    continue;
                }
            };

            self.frame_count += 1;
            if self.frame_count == 1 {
                self.scheduler.first_frame(now_ms);
            }

            let partitions: Vec<_> = partitions
                .into_iter()
                .filter(|p| !p.data.is_empty())
                .collect();
            let count = partitions.len();
            for (i, partition) in partitions.into_iter().enumerate() {
                let last_partition = match self.config.fragmentation {
                    FragmentationMode::PerFrame => true,
                    FragmentationMode::PerPartition => i + 1 == count,
                };
                let info = PartitionInfo {
                    is_keyframe: partition.is_keyframe,
                    partition_id: partition.partition_id,
                    timestamp,
                    last_partition,
                };
                packets.extend(self.fragmenter.fragment(partition.data, &info));
            }
        }

        if !packets.is_empty() {
            tracing::trace!(
                now_ms,
                ts = timestamp,
                packets = packets.len(),
                frames = self.frame_count,
                "encode tick"
            );
        }
        packets
    }

    /// Force a keyframe on the next encode. Repeated requests before that
    /// encode collapse into one.
    pub fn request_keyframe(&mut self) {
        self.keyframe_requested = true;
    }

    pub fn set_picture_size(&mut self, size: Dimensions) -> Result<()> {
        self.reconfigure(EncoderConfig {
            picture_size: size,
            ..self.config.clone()
        })
    }

    pub fn picture_size(&self) -> Dimensions {
        self.config.picture_size
    }

    pub fn set_frame_rate(&mut self, fps: f32) -> Result<()> {
        self.reconfigure(EncoderConfig {
            fps,
            ..self.config.clone()
        })
    }

    pub fn frame_rate(&self) -> f32 {
        self.config.fps
    }

    /// Target bitrate in bits per second.
    pub fn set_bitrate(&mut self, bitrate: u32) -> Result<()> {
        self.reconfigure(EncoderConfig {
            bitrate,
            ..self.config.clone()
        })
    }

    pub fn target_bitrate_kbps(&self) -> u32 {
        self.config.target_bitrate_kbps()
    }

    /// Maximum fragment payload; applies from the next fragmented frame.
    pub fn set_fragment_size(&mut self, size: usize) -> Result<()> {
        self.fragmenter.set_mtu(size)?;
        self.config.fragment_size = size;
        Ok(())
    }

    pub fn fragment_size(&self) -> usize {
        self.fragmenter.mtu()
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Frames successfully encoded so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn reconfigure(&mut self, config: EncoderConfig) -> Result<()> {
        config.validate()?;
        self.encoder.configure(&config)?;
        tracing::debug!(
            size = %config.picture_size,
            fps = config.fps,
            kbps = config.target_bitrate_kbps(),
            "encoder reconfigured"
        );
        self.config = config;
        Ok(())
    }
}

impl std::fmt::Debug for EncodeStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodeStream")
            .field("config", &self.config)
            .field("scheduler", &self.scheduler)
            .field("keyframe_requested", &self.keyframe_requested)
            .field("frame_count", &self.frame_count)
            .finish()
    }
}
