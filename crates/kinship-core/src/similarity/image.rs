//! Perceptual image hashing (difference hash)
//!
//! An image is decoded, converted to grayscale and downsampled to a 9x8 grid.
//! Each of the 64 bits records whether a pixel is darker than its right-hand
//! neighbour, so near-identical images land a few bits apart regardless of
//! resolution or encoding.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use dashmap::DashMap;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::ImageConfig;
use crate::error::{KinshipError, Result};
use crate::logging::ResourceMetrics;
use crate::store::ImageResolver;

const GRID_WIDTH: u32 = 9;
const GRID_HEIGHT: u32 = 8;

/// 64-bit difference hash of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PerceptualFingerprint(u64);

impl PerceptualFingerprint {
    pub const BIT_LENGTH: u32 = 64;

    pub fn from_bits(bits: u64) -> Self {
        PerceptualFingerprint(bits)
    }

    pub fn bits(&self) -> u64 {
        self.0
    }

    pub fn hamming_distance(&self, other: &PerceptualFingerprint) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    /// `1 - hamming / 64`
    pub fn compare(&self, other: &PerceptualFingerprint) -> f64 {
        1.0 - self.hamming_distance(other) as f64 / Self::BIT_LENGTH as f64
    }

    /// The four 16-bit bands used for LSH bucketing
    pub fn bands(&self) -> [u16; 4] {
        [
            (self.0 >> 48) as u16,
            (self.0 >> 32) as u16,
            (self.0 >> 16) as u16,
            self.0 as u16,
        ]
    }
}

impl fmt::Display for PerceptualFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Compare two fingerprints in [0, 1]
pub fn compare(a: &PerceptualFingerprint, b: &PerceptualFingerprint) -> f64 {
    a.compare(b)
}

/// Decode image bytes and compute their difference hash
pub fn fingerprint_bytes(bytes: &[u8]) -> std::result::Result<PerceptualFingerprint, String> {
    let decoded = image::load_from_memory(bytes).map_err(|e| e.to_string())?;
    let grid = decoded
        .grayscale()
        .resize_exact(GRID_WIDTH, GRID_HEIGHT, FilterType::Triangle)
        .to_luma8();

    let mut bits = 0u64;
    for y in 0..GRID_HEIGHT {
        for x in 0..GRID_WIDTH - 1 {
            let left = grid.get_pixel(x, y)[0];
            let right = grid.get_pixel(x + 1, y)[0];
            bits <<= 1;
            if left < right {
                bits |= 1;
            }
        }
    }

    Ok(PerceptualFingerprint(bits))
}

/// SHA-256 of the image bytes, hex encoded; the fingerprint cache key
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Cached outcome of fingerprinting one image
#[derive(Debug, Clone, PartialEq)]
pub enum CachedFingerprint {
    Ready(PerceptualFingerprint),
    /// Decoding failed; kept so a corrupt image is only decoded once
    Failed(String),
}

/// Append-only fingerprint cache keyed by image content hash.
///
/// A changed image produces a different key, so stale entries are never
/// served. Concurrent first writers for the same key compute the same value.
#[derive(Debug, Default)]
pub struct FingerprintCache {
    entries: DashMap<String, CachedFingerprint>,
}

impl FingerprintCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<CachedFingerprint> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Insert unless present; returns whichever value ends up cached
    pub fn insert(&self, key: String, value: CachedFingerprint) -> CachedFingerprint {
        self.entries.entry(key).or_insert(value).value().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

type DecodeFn = fn(&[u8]) -> std::result::Result<PerceptualFingerprint, String>;

/// Resolves, decodes and fingerprints note images.
///
/// Decoder threads, including ones abandoned after a timeout, are capped at
/// twice `max_concurrent_decodes`. When every slot is held by a stalled
/// decoder, further images fail fast instead of spawning more threads.
pub struct ImageHasher {
    resolver: Arc<dyn ImageResolver>,
    timeout: Duration,
    max_bytes: u64,
    cache: FingerprintCache,
    decoders: Arc<DecoderSlots>,
    decode: DecodeFn,
}

impl ImageHasher {
    pub fn new(config: &ImageConfig, resolver: Arc<dyn ImageResolver>) -> Self {
        ImageHasher {
            resolver,
            timeout: config.timeout(),
            max_bytes: config.max_bytes,
            cache: FingerprintCache::new(),
            decoders: Arc::new(DecoderSlots::new(config.max_concurrent_decodes.max(1) * 2)),
            decode: fingerprint_bytes,
        }
    }

    #[cfg(test)]
    fn with_decoder(mut self, decode: DecodeFn) -> Self {
        self.decode = decode;
        self
    }

    pub fn cache(&self) -> &FingerprintCache {
        &self.cache
    }

    /// Fingerprint the image behind `image_ref`.
    ///
    /// Any failure (unresolvable reference, oversized or corrupt data, decode
    /// timeout) is reported as [`KinshipError::ImageDecode`].
    pub fn hash(&self, image_ref: &str) -> Result<PerceptualFingerprint> {
        self.hash_with_metrics(image_ref, None)
    }

    pub(crate) fn hash_with_metrics(
        &self,
        image_ref: &str,
        metrics: Option<&ResourceMetrics>,
    ) -> Result<PerceptualFingerprint> {
        let bytes = self
            .resolver
            .resolve(image_ref)
            .map_err(|e| KinshipError::image_decode(image_ref, e))?;

        if bytes.len() as u64 > self.max_bytes {
            return Err(KinshipError::image_decode(
                image_ref,
                format!("{} bytes exceeds limit of {}", bytes.len(), self.max_bytes),
            ));
        }

        let key = content_hash(&bytes);
        let cached = match self.cache.get(&key) {
            Some(hit) => {
                if let Some(m) = metrics {
                    m.record_fingerprint_hit();
                }
                hit
            }
            None => {
                if let Some(m) = metrics {
                    m.record_fingerprint_miss();
                }
                let slot = DecoderSlot::acquire(&self.decoders).ok_or_else(|| {
                    KinshipError::image_decode(
                        image_ref,
                        format!("all {} decoder slots are busy", self.decoders.limit),
                    )
                })?;
                let computed = match decode_with_timeout(bytes, self.timeout, self.decode, slot)
                {
                    Ok(fp) => CachedFingerprint::Ready(fp),
                    Err(reason) => CachedFingerprint::Failed(reason),
                };
                self.cache.insert(key, computed)
            }
        };

        match cached {
            CachedFingerprint::Ready(fp) => Ok(fp),
            CachedFingerprint::Failed(reason) => Err(KinshipError::image_decode(image_ref, reason)),
        }
    }
}

impl fmt::Debug for ImageHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageHasher")
            .field("timeout", &self.timeout)
            .field("max_bytes", &self.max_bytes)
            .field("cached", &self.cache.len())
            .field("decoders_running", &self.decoders.running())
            .finish()
    }
}

/// Counts live decoder threads against a fixed limit
#[derive(Debug)]
struct DecoderSlots {
    running: AtomicUsize,
    limit: usize,
}

impl DecoderSlots {
    fn new(limit: usize) -> Self {
        DecoderSlots {
            running: AtomicUsize::new(0),
            limit,
        }
    }

    fn running(&self) -> usize {
        self.running.load(Ordering::Acquire)
    }
}

/// One occupied decoder slot, released when the decoder thread finishes
struct DecoderSlot(Arc<DecoderSlots>);

impl DecoderSlot {
    fn acquire(slots: &Arc<DecoderSlots>) -> Option<Self> {
        slots
            .running
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < slots.limit).then_some(n + 1)
            })
            .ok()
            .map(|_| DecoderSlot(Arc::clone(slots)))
    }
}

impl Drop for DecoderSlot {
    fn drop(&mut self) {
        self.0.running.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Run the decoder on its own thread so a pathological image cannot stall the batch.
///
/// On timeout the decoder thread is abandoned; its result is dropped and its
/// slot stays taken until it actually exits.
fn decode_with_timeout(
    bytes: Vec<u8>,
    timeout: Duration,
    decode: DecodeFn,
    slot: DecoderSlot,
) -> std::result::Result<PerceptualFingerprint, String> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("kinship-image-decode".to_string())
        .spawn(move || {
            let _slot = slot;
            let _ = tx.send(decode(&bytes));
        })
        .map_err(|e| format!("failed to spawn decoder: {}", e))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(format!("decode timed out after {:?}", timeout)),
        Err(RecvTimeoutError::Disconnected) => Err("decoder exited without a result".to_string()),
    }
}

#[cfg(test)]
pub(crate) mod test_images {
    use image::{DynamicImage, GrayImage, ImageFormat, Luma};
    use std::io::Cursor;

    fn encode(img: GrayImage) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    /// Brightness rising left to right
    pub fn rising_gradient(size: u32) -> Vec<u8> {
        encode(GrayImage::from_fn(size, size, |x, _| {
            Luma([(x * 255 / (size - 1)) as u8])
        }))
    }

    /// Brightness falling left to right
    pub fn falling_gradient(size: u32) -> Vec<u8> {
        encode(GrayImage::from_fn(size, size, |x, _| {
            Luma([255 - (x * 255 / (size - 1)) as u8])
        }))
    }

    /// Left half rising, right half falling
    pub fn tent(size: u32) -> Vec<u8> {
        let half = size / 2;
        encode(GrayImage::from_fn(size, size, |x, _| {
            let v = if x < half { x } else { size - 1 - x };
            Luma([(v * 255 / half.max(1)).min(255) as u8])
        }))
    }
}
