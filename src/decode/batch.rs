//! Bounded-window batch decoding.
//!
//! Stills are processed in fixed-size concurrency windows: within a
//! window all decodes run concurrently, and the window drains before the
//! next begins. Each decode races a per-frame deadline; a timeout marks
//! that frame failed and never aborts the batch. There is no whole-batch
//! cancellation primitive; a caller aborts by not submitting further
//! windows.

use super::{DecodedChunk, DecodedFrame, FrameDecodeError, FrameDecoder};
use crate::extract::StillSource;
use crate::image::ImageData;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Decode seam used by the batch decoder.
///
/// [`FrameDecoder`] is the production implementation; tests substitute
/// slow or failing fakes to exercise timeout and error paths.
pub trait FrameDecode: Send + Sync + 'static {
    /// Decodes one still into a validated chunk.
    fn decode(&self, image: &ImageData) -> Result<DecodedChunk, FrameDecodeError>;
}

impl FrameDecode for FrameDecoder {
    fn decode(&self, image: &ImageData) -> Result<DecodedChunk, FrameDecodeError> {
        self.decode_frame(image)
    }
}

/// Options for a batch decode run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Concurrency window size.
    pub max_concurrency: usize,
    /// Per-frame decode deadline in milliseconds.
    pub timeout_ms: u64,
    /// Drop failed frames from the output (`true`) or retain them as
    /// invalid placeholders (`false`).
    pub skip_invalid: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            timeout_ms: 5000,
            skip_invalid: true,
        }
    }
}

/// Per-frame progress callback: `(processed_so_far, total, frame)`.
///
/// Fires once per frame in completion order within a window. Side effect
/// only; it cannot alter control flow.
pub type ProgressFn = dyn Fn(usize, usize, &DecodedFrame) + Send + Sync;

/// Decodes batches of stills with bounded parallelism.
pub struct BatchDecoder<D: FrameDecode = FrameDecoder> {
    decoder: Arc<D>,
    options: BatchOptions,
}

impl BatchDecoder<FrameDecoder> {
    /// Creates a batch decoder with default options.
    pub fn new(options: BatchOptions) -> Self {
        Self::with_decoder(FrameDecoder::new(), options)
    }
}

impl Default for BatchDecoder<FrameDecoder> {
    fn default() -> Self {
        Self::new(BatchOptions::default())
    }
}

impl<D: FrameDecode> BatchDecoder<D> {
    /// Creates a batch decoder around a specific decode implementation.
    pub fn with_decoder(decoder: D, options: BatchOptions) -> Self {
        Self {
            decoder: Arc::new(decoder),
            options,
        }
    }

    /// Decodes `images` in bounded concurrency windows.
    ///
    /// Output preserves input order regardless of completion order inside
    /// a window; the sequence reconstructor re-establishes canonical chunk
    /// order anyway, so neither ordering carries meaning for callers.
    pub async fn decode_batch(
        &self,
        images: Vec<ImageData>,
        progress: Option<&ProgressFn>,
    ) -> Vec<DecodedFrame> {
        let total = images.len();
        let window = self.options.max_concurrency.max(1);
        let deadline = Duration::from_millis(self.options.timeout_ms);

        let mut slots: Vec<Option<DecodedFrame>> = (0..total).map(|_| None).collect();
        let mut processed = 0usize;

        let mut iter = images.into_iter().enumerate().peekable();
        while iter.peek().is_some() {
            let mut tasks: JoinSet<(usize, Result<DecodedChunk, FrameDecodeError>)> =
                JoinSet::new();
            let mut window_indices = Vec::with_capacity(window);
            for (index, image) in iter.by_ref().take(window) {
                window_indices.push(index);
                let decoder = Arc::clone(&self.decoder);
                tasks.spawn(async move {
                    let blocking =
                        tokio::task::spawn_blocking(move || decoder.decode(&image));
                    let outcome = match tokio::time::timeout(deadline, blocking).await {
                        Ok(Ok(result)) => result,
                        Ok(Err(join_err)) => {
                            warn!("decode task failed: {join_err}");
                            Err(FrameDecodeError::NoCodeFound)
                        }
                        Err(_) => Err(FrameDecodeError::Timeout),
                    };
                    (index, outcome)
                });
            }

            // Drain the whole window before starting the next one.
            while let Some(joined) = tasks.join_next().await {
                let (index, outcome) = match joined {
                    Ok(pair) => pair,
                    Err(join_err) => {
                        warn!("decode task panicked: {join_err}");
                        continue;
                    }
                };
                let frame = match outcome {
                    Ok(chunk) => DecodedFrame::valid(index, chunk),
                    Err(e) => DecodedFrame::invalid(index, e.to_string()),
                };

                processed += 1;
                if let Some(callback) = progress {
                    callback(processed, total, &frame);
                }
                slots[index] = Some(frame);
            }

            // A panicked task never reported its index; backfill the slot
            // so invalid placeholders and progress counts stay complete.
            for index in window_indices {
                if slots[index].is_none() {
                    let frame =
                        DecodedFrame::invalid(index, "decode task panicked".into());
                    processed += 1;
                    if let Some(callback) = progress {
                        callback(processed, total, &frame);
                    }
                    slots[index] = Some(frame);
                }
            }
        }

        let mut frames: Vec<DecodedFrame> = slots.into_iter().flatten().collect();
        if self.options.skip_invalid {
            frames.retain(|f| f.is_valid);
        }
        debug!(
            total,
            valid = frames.iter().filter(|f| f.is_valid).count(),
            "batch decode complete"
        );
        frames
    }

    /// Pulls stills at `indices` from a [`StillSource`] and batch-decodes
    /// them.
    ///
    /// A failed extraction becomes an invalid frame for that index (or is
    /// dropped under `skip_invalid`), mirroring the per-index failure
    /// contract of the extraction boundary. Output `frame_index` values
    /// are the *source* frame indices, and the list is ordered by them.
    pub async fn decode_from_source<S: StillSource>(
        &self,
        source: &mut S,
        indices: &[u32],
        fps_hint: f64,
        progress: Option<&ProgressFn>,
    ) -> Vec<DecodedFrame> {
        let mut extraction_failures = Vec::new();
        let mut source_indices = Vec::new();
        let mut images = Vec::new();

        for (requested, result) in indices.iter().zip(source.stills(indices, fps_hint)) {
            match result {
                Ok(still) => {
                    source_indices.push(still.index as usize);
                    images.push(still.image);
                }
                Err(e) => {
                    warn!(index = requested, "still extraction failed: {e}");
                    extraction_failures
                        .push(DecodedFrame::invalid(*requested as usize, e.to_string()));
                }
            }
        }

        let mut frames = self.decode_batch(images, progress).await;
        for frame in &mut frames {
            frame.frame_index = source_indices[frame.frame_index];
        }
        if !self.options.skip_invalid {
            frames.extend(extraction_failures);
        }
        frames.sort_by_key(|f| f.frame_index);
        frames
    }
}
