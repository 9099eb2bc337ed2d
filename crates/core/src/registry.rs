use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::codec::{CodecEngine, ScalerFactory};
use crate::config::{DecoderConfig, EncoderConfig};
use crate::decoder::{DecodeStream, EventSink};
use crate::encoder::EncodeStream;
use crate::error::{Result, Vp8Error};

/// Encoding name advertised for this payload format.
pub const VP8_ENCODING: &str = "VP8-DRAFT-0-3-2";

/// Which direction a registered filter handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Encoder,
    Decoder,
}

/// Static description of a filter, for listings and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterDescriptor {
    pub name: &'static str,
    pub text: &'static str,
    pub kind: FilterKind,
    pub encoding: &'static str,
}

pub const VP8_ENCODER: FilterDescriptor = FilterDescriptor {
    name: "MSVp8Enc",
    text: "A VP8 video encoder",
    kind: FilterKind::Encoder,
    encoding: VP8_ENCODING,
};

pub const VP8_DECODER: FilterDescriptor = FilterDescriptor {
    name: "MSVp8Dec",
    text: "A VP8 video decoder",
    kind: FilterKind::Decoder,
    encoding: VP8_ENCODING,
};

/// Codec engines keyed by encoding name.
///
/// The registry is an ordinary value: the caller builds it, registers the
/// engines it has, and hands it (or clones of it) to whatever creates
/// streams. Clones share the same table.
#[derive(Clone)]
pub struct CodecRegistry {
    engines: Arc<RwLock<HashMap<String, Arc<dyn CodecEngine>>>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self {
            engines: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register an engine. Replaces any engine under the same encoding.
    pub fn register(&self, encoding: &str, engine: Arc<dyn CodecEngine>) {
        tracing::info!(encoding, engine = engine.name(), "codec registered");
        self.engines.write().insert(encoding.to_string(), engine);
    }

    /// Look up an engine by encoding name (case-insensitive, as in SDP).
    pub fn get(&self, encoding: &str) -> Option<Arc<dyn CodecEngine>> {
        let engines = self.engines.read();
        engines.get(encoding).cloned().or_else(|| {
            engines
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(encoding))
                .map(|(_, engine)| engine.clone())
        })
    }

    /// Registered encoding names, sorted.
    pub fn encodings(&self) -> Vec<String> {
        let mut names: Vec<String> = self.engines.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Filters available for a registered encoding.
    pub fn filters(&self, encoding: &str) -> Vec<FilterDescriptor> {
        if self.get(encoding).is_none() {
            return Vec::new();
        }
        [VP8_ENCODER, VP8_DECODER]
            .into_iter()
            .filter(|f| f.encoding.eq_ignore_ascii_case(encoding))
            .collect()
    }

    pub fn create_encoder(&self, encoding: &str, config: EncoderConfig) -> Result<EncodeStream> {
        let engine = self.require(encoding)?;
        EncodeStream::new(engine.as_ref(), config)
    }

    pub fn create_decoder(
        &self,
        encoding: &str,
        scalers: Box<dyn ScalerFactory>,
        sink: Box<dyn EventSink>,
        config: DecoderConfig,
    ) -> Result<DecodeStream> {
        let engine = self.require(encoding)?;
        DecodeStream::new(engine.as_ref(), scalers, sink, config)
    }

    fn require(&self, encoding: &str) -> Result<Arc<dyn CodecEngine>> {
        self.get(encoding)
            .ok_or_else(|| Vp8Error::UnknownEncoding(encoding.to_string()))
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("encodings", &self.encodings())
            .finish()
    }
}
