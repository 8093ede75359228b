//! Subtitle track derivation.
//!
//! Builds an SRT track from scene narration/caption and cumulative
//! timing. Scenes with empty narration fall back to their caption;
//! scenes with neither produce no cue.

use std::path::Path;

use narvid_models::Scene;

use crate::error::MediaResult;

/// One subtitle cue.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleCue {
    /// 1-based cue index
    pub index: u32,
    /// Cue start, seconds from video start
    pub start_sec: f64,
    /// Cue end, seconds from video start
    pub end_sec: f64,
    /// Cue text
    pub text: String,
}

/// Derive cues from scene text and timing.
///
/// Timing is cumulative over scene durations, so cue positions match
/// the composed video regardless of which scenes are silent.
pub fn build_cues(scenes: &[Scene]) -> Vec<SubtitleCue> {
    let mut cues = Vec::new();
    let mut offset = 0.0;
    let mut index = 1;

    for scene in scenes {
        let text = if scene.has_narration() {
            scene.narration.trim()
        } else {
            scene.caption.trim()
        };

        if !text.is_empty() {
            cues.push(SubtitleCue {
                index,
                start_sec: offset,
                end_sec: offset + scene.duration_sec,
                text: text.to_string(),
            });
            index += 1;
        }

        offset += scene.duration_sec;
    }

    cues
}

/// Render cues as an SRT document.
pub fn render_srt(cues: &[SubtitleCue]) -> String {
    let mut out = String::new();
    for cue in cues {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            cue.index,
            format_srt_timestamp(cue.start_sec),
            format_srt_timestamp(cue.end_sec),
            cue.text
        ));
    }
    out
}

/// Derive and write the subtitle file for a scene list.
pub async fn write_srt(scenes: &[Scene], path: &Path) -> MediaResult<usize> {
    let cues = build_cues(scenes);
    let srt = render_srt(&cues);
    tokio::fs::write(path, srt.as_bytes()).await?;
    Ok(cues.len())
}

/// Format seconds as an SRT timestamp (`HH:MM:SS,mmm`).
fn format_srt_timestamp(seconds: f64) -> String {
    let total_millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let secs = (total_millis % 60_000) / 1000;
    let millis = total_millis % 1000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(id: &str, order: u32, narration: &str, caption: &str, duration: f64) -> Scene {
        Scene {
            scene_id: id.to_string(),
            scene_order: order,
            chapter_title: String::new(),
            purpose: String::new(),
            narration: narration.to_string(),
            caption: caption.to_string(),
            duration_sec: duration,
            visual_spec: None,
        }
    }

    #[test]
    fn test_format_srt_timestamp() {
        assert_eq!(format_srt_timestamp(0.0), "00:00:00,000");
        assert_eq!(format_srt_timestamp(61.5), "00:01:01,500");
        assert_eq!(format_srt_timestamp(3661.042), "01:01:01,042");
    }

    #[test]
    fn test_cumulative_timing() {
        let scenes = vec![
            scene("a", 1, "first line", "", 10.0),
            scene("b", 2, "second line", "", 7.5),
        ];
        let cues = build_cues(&scenes);

        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].start_sec, 0.0);
        assert_eq!(cues[0].end_sec, 10.0);
        assert_eq!(cues[1].start_sec, 10.0);
        assert_eq!(cues[1].end_sec, 17.5);
    }

    #[test]
    fn test_caption_fallback_for_silent_scene() {
        let scenes = vec![
            scene("a", 1, "narrated", "", 5.0),
            scene("b", 2, "", "caption only", 5.0),
        ];
        let cues = build_cues(&scenes);

        assert_eq!(cues[1].text, "caption only");
    }

    #[test]
    fn test_scene_without_text_still_advances_clock() {
        let scenes = vec![
            scene("a", 1, "", "", 4.0),
            scene("b", 2, "after the gap", "", 6.0),
        ];
        let cues = build_cues(&scenes);

        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].index, 1);
        assert_eq!(cues[0].start_sec, 4.0);
    }

    #[test]
    fn test_render_srt_shape() {
        let cues = vec![SubtitleCue {
            index: 1,
            start_sec: 0.0,
            end_sec: 2.0,
            text: "hello".to_string(),
        }];
        let srt = render_srt(&cues);
        assert_eq!(srt, "1\n00:00:00,000 --> 00:00:02,000\nhello\n\n");
    }

    #[tokio::test]
    async fn test_write_srt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subtitle.srt");
        let scenes = vec![scene("a", 1, "line", "", 3.0)];

        let count = write_srt(&scenes, &path).await.unwrap();
        assert_eq!(count, 1);
        assert!(path.exists());
    }
}
