//! Audio extraction for transcription.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Sample rate expected by the transcription capability.
const TRANSCRIBE_SAMPLE_RATE: u32 = 16_000;

/// Extract the audio track of a video as mono 16 kHz PCM WAV.
///
/// Writes `<stem>.wav` into `out_dir` and returns its path.
pub async fn extract_audio_wav(
    video: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
) -> MediaResult<PathBuf> {
    let video = video.as_ref();
    let out_dir = out_dir.as_ref();

    tokio::fs::create_dir_all(out_dir).await?;

    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "audio".to_string());
    let wav_path = out_dir.join(format!("{stem}.wav"));

    let cmd = FfmpegCommand::new(video, &wav_path)
        .no_video()
        .output_arg("-ac")
        .output_arg("1")
        .output_arg("-ar")
        .output_arg(TRANSCRIBE_SAMPLE_RATE.to_string())
        .output_arg("-acodec")
        .output_arg("pcm_s16le")
        .log_level("error");

    FfmpegRunner::new().run(&cmd).await?;

    debug!(
        video = %video.display(),
        wav = %wav_path.display(),
        "Extracted audio track"
    );

    Ok(wav_path)
}
