use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::foundation::error::{ReelError, ReelResult};

/// Internal audio mixing sample rate used across decode/mix/encode pipeline.
pub const MIX_SAMPLE_RATE: u32 = 48_000;

#[derive(Clone, Debug)]
/// Basic metadata about a source video file.
pub struct VideoSourceInfo {
    pub source_path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Nominal frame rate as reported by ffprobe; `0/1` when unknown.
    pub fps_num: u32,
    pub fps_den: u32,
    /// Container duration in seconds, 0 when ffprobe does not report one.
    pub duration_sec: f64,
}

impl VideoSourceInfo {
    /// Source frames per second, 0 when unknown.
    pub fn source_fps(&self) -> f64 {
        if self.fps_num == 0 || self.fps_den == 0 {
            0.0
        } else {
            f64::from(self.fps_num) / f64::from(self.fps_den)
        }
    }
}

/// Probe source video metadata through `ffprobe`.
pub fn probe_video(source_path: &Path) -> ReelResult<VideoSourceInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        duration: Option<String>,
        r_frame_rate: Option<String>,
        avg_frame_rate: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| ReelError::asset_load(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(ReelError::asset_load(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| ReelError::asset_load(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| ReelError::asset_load("no video stream found"))?;
    let width = video_stream
        .width
        .ok_or_else(|| ReelError::asset_load("missing video width from ffprobe"))?;
    let height = video_stream
        .height
        .ok_or_else(|| ReelError::asset_load("missing video height from ffprobe"))?;
    let duration_sec = video_stream
        .duration
        .as_deref()
        .or(parsed.format.as_ref().and_then(|f| f.duration.as_deref()))
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(0.0);
    let (fps_num, fps_den) = [&video_stream.avg_frame_rate, &video_stream.r_frame_rate]
        .into_iter()
        .filter_map(|r| r.as_deref().and_then(parse_ff_ratio))
        .next()
        .unwrap_or((0, 1));

    Ok(VideoSourceInfo {
        source_path: source_path.to_path_buf(),
        width,
        height,
        fps_num,
        fps_den,
        duration_sec,
    })
}

/// Parse an ffprobe `num/den` rate. Zero rates (`0/0`) are rejected.
pub(crate) fn parse_ff_ratio(raw: &str) -> Option<(u32, u32)> {
    let (num, den) = raw.trim().split_once('/')?;
    let num = num.parse::<u32>().ok()?;
    let den = den.parse::<u32>().ok()?;
    (num > 0 && den > 0).then_some((num, den))
}

/// Decode up to `frame_count` consecutive straight-alpha RGBA frames starting at
/// `start_time_sec`, in one ffmpeg run.
///
/// Fewer frames (possibly none) come back when the seek lands near the end of the stream.
pub fn decode_video_frames_rgba8(
    source: &VideoSourceInfo,
    start_time_sec: f64,
    frame_count: u32,
) -> ReelResult<Vec<Vec<u8>>> {
    if frame_count == 0 {
        return Ok(Vec::new());
    }
    let expected_len = source.width as usize * source.height as usize * 4;
    if expected_len == 0 {
        return Err(ReelError::asset_load(
            "decoded video frame size is zero (invalid source dimensions)",
        ));
    }

    let out = Command::new("ffmpeg")
        .args(["-v", "error", "-ss", &format!("{:.6}", start_time_sec.max(0.0))])
        .arg("-i")
        .arg(&source.source_path)
        .args([
            "-an",
            "-frames:v",
            &frame_count.to_string(),
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "pipe:1",
        ])
        .output()
        .map_err(|e| {
            ReelError::asset_load(format!("failed to run ffmpeg for video decode: {e}"))
        })?;

    if !out.status.success() {
        return Err(ReelError::asset_load(format!(
            "ffmpeg video decode failed for '{}': {}",
            source.source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    if !out.stdout.len().is_multiple_of(expected_len) {
        return Err(ReelError::asset_load(format!(
            "ffmpeg returned {} bytes for '{}', not a multiple of the {expected_len}-byte frame",
            out.stdout.len(),
            source.source_path.display()
        )));
    }

    Ok(out
        .stdout
        .chunks_exact(expected_len)
        .take(frame_count as usize)
        .map(<[u8]>::to_vec)
        .collect())
}

#[derive(Clone, Debug)]
/// Decoded interleaved floating-point PCM.
pub struct AudioPcm {
    pub sample_rate: u32,
    pub channels: u16,
    pub interleaved_f32: Vec<f32>,
}

/// Decode an audio file to stereo interleaved `f32` PCM.
pub fn decode_audio_f32_stereo(path: &Path, sample_rate: u32) -> ReelResult<AudioPcm> {
    let out = Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args(pcm_output_args(sample_rate).iter())
        .output()
        .map_err(|e| ReelError::asset_load(format!("failed to run ffmpeg for audio decode: {e}")))?;
    if !out.status.success() {
        return Err(ReelError::asset_load(format!(
            "ffmpeg audio decode failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    pcm_from_f32le(&out.stdout, sample_rate)
}

/// Decode encoded audio held in memory (e.g. a downloaded track) to stereo `f32` PCM.
pub fn decode_audio_bytes_f32_stereo(bytes: &[u8], sample_rate: u32) -> ReelResult<AudioPcm> {
    let mut child = Command::new("ffmpeg")
        .args(["-v", "error", "-i", "pipe:0"])
        .args(pcm_output_args(sample_rate).iter())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ReelError::asset_load(format!("failed to run ffmpeg for audio decode: {e}")))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| ReelError::asset_load("failed to open ffmpeg stdin"))?;
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| ReelError::asset_load("failed to open ffmpeg stdout"))?;

    // stdout must drain while stdin is written, or ffmpeg blocks on a full pipe.
    let drain = std::thread::spawn(move || {
        let mut buf = Vec::new();
        stdout.read_to_end(&mut buf).map(|_| buf)
    });
    let write_res = stdin.write_all(bytes);
    drop(stdin);

    let pcm_bytes = drain
        .join()
        .map_err(|_| ReelError::asset_load("ffmpeg stdout drain thread panicked"))?
        .map_err(|e| ReelError::asset_load(format!("ffmpeg stdout read failed: {e}")))?;
    let out = child
        .wait_with_output()
        .map_err(|e| ReelError::asset_load(format!("failed to wait for ffmpeg: {e}")))?;
    if !out.status.success() {
        return Err(ReelError::asset_load(format!(
            "ffmpeg audio decode failed: {}",
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    // A broken pipe is expected when ffmpeg stops reading early; only trust the exit status.
    if let Err(e) = write_res {
        tracing::debug!("ffmpeg stdin closed early: {e}");
    }
    pcm_from_f32le(&pcm_bytes, sample_rate)
}

fn pcm_output_args(sample_rate: u32) -> [String; 10] {
    [
        "-vn".into(),
        "-f".into(),
        "f32le".into(),
        "-acodec".into(),
        "pcm_f32le".into(),
        "-ac".into(),
        "2".into(),
        "-ar".into(),
        sample_rate.to_string(),
        "pipe:1".into(),
    ]
}

fn pcm_from_f32le(bytes: &[u8], sample_rate: u32) -> ReelResult<AudioPcm> {
    if !bytes.len().is_multiple_of(4) {
        return Err(ReelError::asset_load(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    let mut pcm = Vec::<f32>::with_capacity(bytes.len() / 4);
    for chunk in bytes.chunks_exact(4) {
        pcm.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }
    Ok(AudioPcm {
        sample_rate,
        channels: 2,
        interleaved_f32: pcm,
    })
}

/// Return `true` when both `ffmpeg` and `ffprobe` can be invoked from `PATH`.
pub fn ffmpeg_tools_available() -> bool {
    ["ffmpeg", "ffprobe"].iter().all(|tool| {
        Command::new(tool)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    })
}

#[cfg(test)]
#[path = "../../tests/unit/assets/media.rs"]
mod tests;
