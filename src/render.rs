//! Video assembly from still images and a voiceover track.
//!
//! Rendering shells out to ffmpeg through the concat demuxer: each image
//! is shown for its segment duration, the voiceover is muxed underneath,
//! and the result is encoded as a vertical H.264 MP4. The trait is
//! synchronous; callers run it on a blocking thread.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::RenderError;

/// Inputs for a single video render.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    /// Image files in presentation order.
    pub image_paths: Vec<PathBuf>,
    /// Seconds each image stays on screen; must match `image_paths`.
    pub durations: Vec<f64>,
    /// Voiceover audio file.
    pub audio_path: PathBuf,
    /// Where the finished video is written.
    pub output_path: PathBuf,
}

/// Renders a video from images and audio.
pub trait Renderer: Send + Sync {
    fn render(&self, request: &RenderRequest) -> Result<PathBuf, RenderError>;
}

/// [`Renderer`] backed by the system ffmpeg binary.
pub struct FfmpegRenderer {
    /// ffmpeg binary to invoke.
    binary: String,
    /// Output width in pixels.
    width: u32,
    /// Output height in pixels.
    height: u32,
    /// Output frame rate.
    fps: u32,
    /// Audio bitrate passed to the encoder.
    audio_bitrate: String,
}

impl Default for FfmpegRenderer {
    fn default() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
            width: 1080,
            height: 1920,
            fps: 30,
            audio_bitrate: "192k".to_string(),
        }
    }
}

impl FfmpegRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the output resolution.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Overrides the ffmpeg binary path.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Returns true if the configured ffmpeg binary runs.
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("-version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    fn validate(&self, request: &RenderRequest) -> Result<(), RenderError> {
        if request.image_paths.is_empty() {
            return Err(RenderError::NoImages);
        }
        if request.durations.len() != request.image_paths.len() {
            return Err(RenderError::DurationMismatch {
                images: request.image_paths.len(),
                durations: request.durations.len(),
            });
        }
        if !request.audio_path.exists() {
            return Err(RenderError::MissingInput(
                request.audio_path.display().to_string(),
            ));
        }
        for path in &request.image_paths {
            if !path.exists() {
                return Err(RenderError::MissingInput(path.display().to_string()));
            }
        }
        Ok(())
    }

    /// Builds the concat demuxer script listing each image with its
    /// display duration. The demuxer requires the final file entry to be
    /// repeated without a duration.
    fn concat_script(request: &RenderRequest) -> Result<String, RenderError> {
        let mut script = String::from("ffconcat version 1.0\n");
        for (path, duration) in request.image_paths.iter().zip(&request.durations) {
            let absolute = fs::canonicalize(path)?;
            script.push_str(&format!(
                "file '{}'\nduration {:.3}\n",
                absolute.display(),
                duration.max(0.1)
            ));
        }
        if let Some(last) = request.image_paths.last() {
            let absolute = fs::canonicalize(last)?;
            script.push_str(&format!("file '{}'\n", absolute.display()));
        }
        Ok(script)
    }

    fn run_ffmpeg(&self, list_path: &Path, request: &RenderRequest) -> Result<(), RenderError> {
        let scale_filter = format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,format=yuv420p",
            w = self.width,
            h = self.height,
        );

        let output = Command::new(&self.binary)
            .arg("-y")
            .args(["-f", "concat", "-safe", "0"])
            .arg("-i")
            .arg(list_path)
            .arg("-i")
            .arg(&request.audio_path)
            .args(["-vf", &scale_filter])
            .args(["-r", &self.fps.to_string()])
            .args(["-c:v", "libx264"])
            .args(["-c:a", "aac"])
            .args(["-b:a", &self.audio_bitrate])
            .arg("-shortest")
            .arg(&request.output_path)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: String = stderr
                .lines()
                .rev()
                .take(10)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect::<Vec<_>>()
                .join("\n");
            return Err(RenderError::FfmpegFailed {
                code: output.status.code().unwrap_or(-1),
                stderr: tail,
            });
        }

        Ok(())
    }
}

impl Renderer for FfmpegRenderer {
    fn render(&self, request: &RenderRequest) -> Result<PathBuf, RenderError> {
        self.validate(request)?;

        if let Some(parent) = request.output_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let list_path = request.output_path.with_extension("concat.txt");
        fs::write(&list_path, Self::concat_script(request)?)?;

        let result = self.run_ffmpeg(&list_path, request);
        let _ = fs::remove_file(&list_path);
        result?;

        if !request.output_path.exists() {
            return Err(RenderError::OutputMissing(
                request.output_path.display().to_string(),
            ));
        }

        Ok(request.output_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request_with_files(dir: &Path, images: usize) -> RenderRequest {
        let mut image_paths = Vec::new();
        for i in 0..images {
            let path = dir.join(format!("image_{:02}.png", i));
            fs::write(&path, b"png").expect("write image");
            image_paths.push(path);
        }
        let audio_path = dir.join("voiceover.mp3");
        fs::write(&audio_path, b"mp3").expect("write audio");

        RenderRequest {
            durations: vec![2.0; images],
            image_paths,
            audio_path,
            output_path: dir.join("final_video.mp4"),
        }
    }

    #[test]
    fn test_no_images_rejected() {
        let temp = TempDir::new().expect("temp dir");
        let mut request = request_with_files(temp.path(), 0);
        request.durations.clear();

        let renderer = FfmpegRenderer::new();
        let result = renderer.render(&request);
        assert!(matches!(result, Err(RenderError::NoImages)));
    }

    #[test]
    fn test_duration_mismatch_rejected() {
        let temp = TempDir::new().expect("temp dir");
        let mut request = request_with_files(temp.path(), 3);
        request.durations.pop();

        let renderer = FfmpegRenderer::new();
        let result = renderer.render(&request);
        assert!(matches!(
            result,
            Err(RenderError::DurationMismatch {
                images: 3,
                durations: 2
            })
        ));
    }

    #[test]
    fn test_missing_audio_rejected() {
        let temp = TempDir::new().expect("temp dir");
        let mut request = request_with_files(temp.path(), 2);
        request.audio_path = temp.path().join("missing.mp3");

        let renderer = FfmpegRenderer::new();
        let result = renderer.render(&request);
        assert!(matches!(result, Err(RenderError::MissingInput(_))));
    }

    #[test]
    fn test_missing_image_rejected() {
        let temp = TempDir::new().expect("temp dir");
        let mut request = request_with_files(temp.path(), 2);
        fs::remove_file(&request.image_paths[1]).expect("remove image");

        let renderer = FfmpegRenderer::new();
        let result = renderer.render(&request);
        assert!(matches!(result, Err(RenderError::MissingInput(_))));
    }

    #[test]
    fn test_concat_script_shape() {
        let temp = TempDir::new().expect("temp dir");
        let request = request_with_files(temp.path(), 2);

        let script = FfmpegRenderer::concat_script(&request).expect("script should build");
        assert!(script.starts_with("ffconcat version 1.0"));
        // Two timed entries plus the trailing repeat of the last image.
        assert_eq!(script.matches("file '").count(), 3);
        assert_eq!(script.matches("duration 2.000").count(), 2);
    }

    #[test]
    fn test_clamps_tiny_durations() {
        let temp = TempDir::new().expect("temp dir");
        let mut request = request_with_files(temp.path(), 1);
        request.durations = vec![0.0];

        let script = FfmpegRenderer::concat_script(&request).expect("script should build");
        assert!(script.contains("duration 0.100"));
    }
}
