//! Voiceover audio assembly: probe the MP3 container returned by the
//! synthesis provider and turn committed bytes into a [`Voiceover`]
//! descriptor.

use std::io::Cursor;

use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::error::VoiceoverServiceError;
use super::model::Voiceover;

/// Playback duration of an MP3 payload, in seconds.
///
/// Walks the container packets and sums their durations; the frames are
/// never decoded to PCM, only the framing is read.
pub fn mp3_duration_secs(audio: &[u8]) -> Result<f64, VoiceoverServiceError> {
    let cursor = Cursor::new(audio.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let mut hint = Hint::new();
    hint.with_extension("mp3");
    hint.mime_type("audio/mpeg");

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| {
            VoiceoverServiceError::Synthesis(format!("Failed to probe synthesized audio: {}", e))
        })?;

    let mut format = probed.format;

    let track = format.default_track().ok_or_else(|| {
        VoiceoverServiceError::Synthesis("Synthesized audio has no audio track".to_string())
    })?;
    let track_id = track.id;
    let time_base = track.codec_params.time_base;
    let sample_rate = track.codec_params.sample_rate;

    let mut total_frames: u64 = 0;
    loop {
        match format.next_packet() {
            Ok(packet) => {
                if packet.track_id() == track_id {
                    total_frames += packet.dur();
                }
            }
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                return Err(VoiceoverServiceError::Synthesis(format!(
                    "Failed to read synthesized audio packet: {}",
                    e
                )));
            }
        }
    }

    if let Some(tb) = time_base {
        let time = tb.calc_time(total_frames);
        return Ok(time.seconds as f64 + time.frac);
    }
    if let Some(rate) = sample_rate {
        if rate > 0 {
            return Ok(total_frames as f64 / rate as f64);
        }
    }
    Err(VoiceoverServiceError::Synthesis(
        "Synthesized audio reports no time base".to_string(),
    ))
}

/// Build the descriptor for freshly committed voiceover bytes. Fresh
/// audio is by definition current, so `needs_update` is false.
pub fn build_voiceover(filename: &str, audio: &[u8]) -> Result<Voiceover, VoiceoverServiceError> {
    let duration_secs = mp3_duration_secs(audio)?;

    Ok(Voiceover {
        filename: filename.to_string(),
        file_size_bytes: audio.len() as i64,
        duration_secs,
        needs_update: false,
    })
}


#[cfg(test)]
mod tests {
    use super::test_audio::silent_mp3;
    use super::*;

    #[test]
    fn test_duration_of_synthetic_mp3() {
        // 40 frames x 1152 samples at 44.1 kHz is roughly 1.045 seconds.
        let audio = silent_mp3(40);
        let duration = mp3_duration_secs(&audio).unwrap();
        assert!(
            (duration - 1.045).abs() < 0.05,
            "unexpected duration {duration}"
        );
    }

    #[test]
    fn test_duration_is_positive_for_nonempty_audio() {
        let audio = silent_mp3(1);
        assert!(mp3_duration_secs(&audio).unwrap() > 0.0);
    }

    #[test]
    fn test_empty_payload_is_rejected() {
        assert!(mp3_duration_secs(&[]).is_err());
    }

    #[test]
    fn test_garbage_payload_is_rejected() {
        assert!(mp3_duration_secs(&[0x00, 0x01, 0x02, 0x03]).is_err());
    }

    #[test]
    fn test_build_voiceover_descriptor() {
        let audio = silent_mp3(40);
        let voiceover = build_voiceover("content-en-US-abc123.mp3", &audio).unwrap();

        assert_eq!(voiceover.filename, "content-en-US-abc123.mp3");
        assert_eq!(voiceover.file_size_bytes, audio.len() as i64);
        assert!(voiceover.duration_secs > 0.0);
        assert!(!voiceover.needs_update);
    }
}
