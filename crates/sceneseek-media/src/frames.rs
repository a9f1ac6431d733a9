//! Frame sampling and tensor preprocessing.
//!
//! A shot is represented to the caption model by a fixed number of frames
//! sampled from the center of evenly sized buckets across the interval
//! (edge sampling would land on the boundary frames of neighboring shots).
//! Selected frames are decoded individually, resized square with bicubic
//! interpolation, and normalized with ImageNet statistics.

use std::path::Path;

use image::{imageops::FilterType, DynamicImage};
use ndarray::{s, Array3, Array4};
use tracing::{debug, warn};

use sceneseek_models::{format_frame_timestamp, Shot};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::VideoInfo;

/// ImageNet channel means.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet channel standard deviations.
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Configuration for frame sampling and preprocessing.
#[derive(Debug, Clone)]
pub struct FramePrepConfig {
    /// Frames sampled per shot
    pub num_segments: usize,
    /// Square model input size in pixels
    pub input_size: u32,
}

impl Default for FramePrepConfig {
    fn default() -> Self {
        Self {
            num_segments: 8,
            input_size: 448,
        }
    }
}

/// A preprocessed, model-ready group of frames for one shot.
#[derive(Debug, Clone)]
pub struct FrameSet {
    /// The shot these frames represent
    pub shot: Shot,
    /// Pixel tensor of shape `[n, 3, size, size]`
    pub pixels: Array4<f32>,
    /// Per-frame `MM:SS.ss` tags, index-aligned with `pixels`
    pub timestamps: Vec<String>,
}

impl FrameSet {
    /// Number of frames in the set.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether the set holds no frames.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Pick `num_segments` frame indices from `[start_frame, end_frame]` using
/// center-of-bucket sampling, clipped into `[0, total_frames - 1]`.
pub fn sample_frame_indices(
    start_frame: i64,
    end_frame: i64,
    num_segments: usize,
    total_frames: u64,
) -> Vec<u64> {
    if num_segments == 0 || total_frames == 0 {
        return Vec::new();
    }

    let max_index = (total_frames - 1) as i64;
    let seg_size = (end_frame - start_frame) as f64 / num_segments as f64;

    (0..num_segments)
        .map(|i| {
            let idx = start_frame as f64 + seg_size / 2.0 + (seg_size * i as f64).round();
            (idx as i64).clamp(0, max_index) as u64
        })
        .collect()
}

/// Preprocess a decoded frame: bicubic square resize, `[0,1]` scaling,
/// ImageNet normalization. Output shape `[3, size, size]`.
pub fn preprocess_frame(img: &DynamicImage, input_size: u32) -> Array3<f32> {
    let resized = img
        .resize_exact(input_size, input_size, FilterType::CatmullRom)
        .to_rgb8();

    let size = input_size as usize;
    let mut tensor = Array3::<f32>::zeros((3, size, size));

    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            let v = pixel[c] as f32 / 255.0;
            tensor[[c, y as usize, x as usize]] = (v - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }

    tensor
}

/// Decode the frame nearest to `time_ms` as an image.
pub async fn decode_frame_at_ms(video: impl AsRef<Path>, time_ms: u64) -> MediaResult<DynamicImage> {
    let video = video.as_ref();

    let dir = tempfile::tempdir()?;
    let frame_path = dir.path().join("frame.png");

    let cmd = FfmpegCommand::new(video, &frame_path)
        .seek(time_ms as f64 / 1000.0)
        .single_frame()
        .log_level("error");

    FfmpegRunner::new().run(&cmd).await?;

    if !frame_path.exists() {
        return Err(MediaError::frame_decode(video, time_ms));
    }

    Ok(image::open(&frame_path)?)
}

/// Sample, decode, and preprocess the frames of one shot.
///
/// Frames that fail to decode are dropped; `Ok(None)` means no frame in the
/// shot could be decoded at all, which callers treat as a skipped shot.
pub async fn extract_frame_set(
    video: impl AsRef<Path>,
    info: &VideoInfo,
    shot: &Shot,
    config: &FramePrepConfig,
) -> MediaResult<Option<FrameSet>> {
    let video = video.as_ref();

    let start_frame = (shot.start_secs() * info.fps).round() as i64;
    let end_frame = (shot.end_secs() * info.fps).round() as i64;
    let indices = sample_frame_indices(start_frame, end_frame, config.num_segments, info.total_frames);

    let mut frames = Vec::with_capacity(indices.len());
    let mut timestamps = Vec::with_capacity(indices.len());

    for idx in indices {
        let seconds = idx as f64 / info.fps;
        let time_ms = (seconds * 1000.0).round() as u64;

        match decode_frame_at_ms(video, time_ms).await {
            Ok(img) => {
                frames.push(preprocess_frame(&img, config.input_size));
                timestamps.push(format_frame_timestamp(seconds));
            }
            Err(e) => {
                debug!(
                    video = %video.display(),
                    frame = idx,
                    error = %e,
                    "Dropping undecodable frame"
                );
            }
        }
    }

    if frames.is_empty() {
        warn!(
            video = %video.display(),
            shot = %shot.display_range(),
            "No decodable frames in shot"
        );
        return Ok(None);
    }

    let size = config.input_size as usize;
    let mut pixels = Array4::<f32>::zeros((frames.len(), 3, size, size));
    for (i, frame) in frames.iter().enumerate() {
        pixels.slice_mut(s![i, .., .., ..]).assign(frame);
    }

    Ok(Some(FrameSet {
        shot: *shot,
        pixels,
        timestamps,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_indices_spec_case() {
        // Interval [0, 10s) at 10 fps with 5 segments: exactly 5 indices,
        // monotonically increasing, all within [0, 99].
        let indices = sample_frame_indices(0, 100, 5, 100);
        assert_eq!(indices.len(), 5);
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
        assert!(indices.iter().all(|&i| i < 100));
        assert_eq!(indices, vec![10, 30, 50, 70, 90]);
    }

    #[test]
    fn test_sample_indices_clipped_to_stream() {
        let indices = sample_frame_indices(90, 200, 4, 100);
        assert!(indices.iter().all(|&i| i <= 99));
    }

    #[test]
    fn test_sample_indices_degenerate_interval() {
        // Zero-length interval collapses onto one frame
        let indices = sample_frame_indices(50, 50, 3, 100);
        assert_eq!(indices, vec![50, 50, 50]);
    }

    #[test]
    fn test_sample_indices_empty_inputs() {
        assert!(sample_frame_indices(0, 10, 0, 100).is_empty());
        assert!(sample_frame_indices(0, 10, 4, 0).is_empty());
    }

    #[test]
    fn test_preprocess_shape_and_normalization() {
        let img = DynamicImage::new_rgb8(64, 32);
        let tensor = preprocess_frame(&img, 16);
        assert_eq!(tensor.shape(), &[3, 16, 16]);

        // A black image normalizes each channel to -mean/std.
        for c in 0..3 {
            let expected = -IMAGENET_MEAN[c] / IMAGENET_STD[c];
            assert!((tensor[[c, 0, 0]] - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn test_frame_set_len() {
        let set = FrameSet {
            shot: Shot::new(0, 1000),
            pixels: Array4::zeros((2, 3, 4, 4)),
            timestamps: vec!["00:00.00".into(), "00:00.50".into()],
        };
        assert_eq!(set.len(), 2);
        assert!(!set.is_empty());
    }
}
