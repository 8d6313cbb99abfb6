//! MP4/QuickTime demux probing and sample-exact remuxing.

use crate::error::{CoreError, Result};
use crate::formats::stream_len;
use mp4::{
    AacConfig, AvcConfig, HevcConfig, MediaConfig, MediaType, Mp4Config, Mp4Reader, Mp4Track,
    Mp4Writer, TrackConfig, TtxtConfig, Vp9Config,
};
use std::io::{Read, Seek, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoSummary {
    pub tracks: usize,
    pub first_sample_len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RemuxStats {
    pub tracks: usize,
    pub samples: u64,
}

/// Opens a demuxer and reads the first sample of the first track.
pub fn probe_mp4<R: Read + Seek>(mut reader: R) -> Result<VideoSummary> {
    let size = stream_len(&mut reader)?;
    let mut demuxer = Mp4Reader::read_header(reader, size)?;

    let track_ids = sorted_track_ids(&demuxer);
    let first = *track_ids
        .first()
        .ok_or_else(|| CoreError::invalid("container has no tracks"))?;
    let sample = demuxer
        .read_sample(first, 1)?
        .ok_or_else(|| CoreError::invalid(format!("track {first} has no readable sample")))?;

    Ok(VideoSummary {
        tracks: track_ids.len(),
        first_sample_len: sample.bytes.len(),
    })
}

/// Copies every sample of every readable track into a fresh MP4 container
/// without touching payload bytes.
///
/// Any demux or mux error aborts the whole operation; the caller owns
/// discarding whatever was written to `writer`.
pub fn remux_mp4<R: Read + Seek, W: Write + Seek>(mut reader: R, writer: W) -> Result<RemuxStats> {
    let size = stream_len(&mut reader)?;
    let mut demuxer = Mp4Reader::read_header(reader, size)?;

    let mut muxer = Mp4Writer::write_start(
        writer,
        &Mp4Config {
            major_brand: str::parse("isom")?,
            minor_version: 512,
            compatible_brands: vec![
                str::parse("isom")?,
                str::parse("iso2")?,
                str::parse("avc1")?,
                str::parse("mp41")?,
            ],
            timescale: demuxer.timescale(),
        },
    )?;

    let mut mapping = Vec::new();
    for track_id in sorted_track_ids(&demuxer) {
        let Some(track) = demuxer.tracks().get(&track_id) else {
            continue;
        };
        match track_config(track) {
            Ok(config) => {
                muxer.add_track(&config)?;
                mapping.push((track_id, mapping.len() as u32 + 1));
            }
            Err(e) => {
                tracing::debug!(track_id, error = %e, "skipping unreadable track");
            }
        }
    }
    if mapping.is_empty() {
        return Err(CoreError::invalid("no readable track to remux"));
    }

    let mut stats = RemuxStats {
        tracks: mapping.len(),
        samples: 0,
    };
    for (input_id, output_id) in mapping {
        let count = demuxer.sample_count(input_id)?;
        for sample_id in 1..=count {
            let sample = demuxer.read_sample(input_id, sample_id)?.ok_or_else(|| {
                CoreError::invalid(format!("track {input_id} sample {sample_id} missing"))
            })?;
            muxer.write_sample(output_id, &sample)?;
            stats.samples += 1;
        }
    }
    muxer.write_end()?;

    Ok(stats)
}

fn sorted_track_ids<R: Read + Seek>(demuxer: &Mp4Reader<R>) -> Vec<u32> {
    let mut ids: Vec<u32> = demuxer.tracks().keys().copied().collect();
    ids.sort_unstable();
    ids
}

fn track_config(track: &Mp4Track) -> Result<TrackConfig> {
    let media_conf = match track.media_type()? {
        MediaType::H264 => MediaConfig::AvcConfig(AvcConfig {
            width: track.width(),
            height: track.height(),
            seq_param_set: track.sequence_parameter_set()?.to_vec(),
            pic_param_set: track.picture_parameter_set()?.to_vec(),
        }),
        MediaType::H265 => MediaConfig::HevcConfig(HevcConfig {
            width: track.width(),
            height: track.height(),
        }),
        MediaType::VP9 => MediaConfig::Vp9Config(Vp9Config {
            width: track.width(),
            height: track.height(),
        }),
        MediaType::AAC => MediaConfig::AacConfig(AacConfig {
            bitrate: track.bitrate(),
            profile: track.audio_profile()?,
            freq_index: track.sample_freq_index()?,
            chan_conf: track.channel_config()?,
        }),
        MediaType::TTXT => MediaConfig::TtxtConfig(TtxtConfig {}),
    };

    Ok(TrackConfig {
        track_type: track.track_type()?,
        timescale: track.timescale(),
        language: track.language().to_string(),
        media_conf,
    })
}
