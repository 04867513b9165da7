//! MP4 muxer with the H.264 and AAC encoders
//!
//! Encoded packets are rescaled to the stream time base and pass through the
//! per-stream [`StreamTimestamps`] before being interleaved into the file.

use std::path::Path;

use ffmpeg_next::format::sample::Type as SampleType;
use ffmpeg_next::format::Sample;
use ffmpeg_next::{codec, encoder, format, frame, picture, ChannelLayout, Dictionary, Packet, Rational};
use tracing::debug;

use super::convert::AUDIO_RATE;
use super::{drain_step, ENCODER_PIXEL_FORMAT};
use crate::domain::timestamps::StreamTimestamps;
use crate::error::{BffResult, FfmpegResultExt};

/// Options passed to the H.264 encoder
pub const H264_OPTIONS: [(&str, &str); 4] = [
    ("profile", "main"),
    ("level", "4.1"),
    ("preset", "slow"),
    ("crf", "18"),
];

/// Video stream parameters taken from the decoder and input stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoEncoderSettings {
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: Rational,
    pub time_base: Rational,
    pub frame_rate: Rational,
}

/// Packet bookkeeping of one output stream
struct StreamSink {
    label: &'static str,
    index: usize,
    encoder_time_base: Rational,
    stream_time_base: Rational,
    timestamps: StreamTimestamps,
    packets: u64,
}

impl StreamSink {
    fn new(label: &'static str, index: usize, time_base: Rational) -> Self {
        Self {
            label,
            index,
            encoder_time_base: time_base,
            stream_time_base: time_base,
            timestamps: StreamTimestamps::new(),
            packets: 0,
        }
    }

    /// Receive every packet the encoder has ready and write it
    fn drain(&mut self, encoder: &mut encoder::Encoder, context: &mut format::context::Output) -> BffResult<()> {
        let mut packet = Packet::empty();
        while drain_step(encoder.receive_packet(&mut packet), "avcodec_receive_packet", self.label)? {
            packet.set_stream(self.index);
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            let (pts, dts) = self.timestamps.normalize(packet.pts(), packet.dts());
            packet.set_pts(Some(pts));
            packet.set_dts(Some(dts));
            packet
                .write_interleaved(context)
                .during("av_interleaved_write_frame", self.label)?;
            self.packets += 1;
        }
        Ok(())
    }
}

/// Opened output container with its encoders; the header is written on creation
pub struct MediaOutput {
    path: String,
    context: format::context::Output,
    video_encoder: encoder::Video,
    video: StreamSink,
    audio: Option<(encoder::Audio, StreamSink)>,
}

impl MediaOutput {
    /// Create the MP4 file at `path` with an H.264 stream and, if requested, an AAC stream
    pub fn create(path: &Path, video: VideoEncoderSettings, with_audio: bool) -> BffResult<Self> {
        let display = path.display().to_string();
        let mut context = format::output_as(&path, "mp4").during("avformat_alloc_output_context2", display.as_str())?;
        let global_header = context.format().flags().contains(format::Flags::GLOBAL_HEADER);

        let (video_encoder, video_sink) = add_video_stream(&mut context, video, global_header)?;
        let audio = if with_audio {
            Some(add_audio_stream(&mut context, global_header)?)
        } else {
            None
        };

        context.write_header().during("avformat_write_header", display.as_str())?;

        let mut output = Self {
            path: display,
            context,
            video_encoder,
            video: video_sink,
            audio,
        };
        output.refresh_stream_time_bases();
        Ok(output)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Fixed number of samples per frame the audio encoder accepts
    pub fn audio_frame_size(&self) -> Option<usize> {
        self.audio
            .as_ref()
            .map(|(encoder, _)| encoder.frame_size() as usize)
    }

    /// Encode one video frame and write whatever packets it completes
    pub fn send_video_frame(&mut self, frame: &mut frame::Video) -> BffResult<()> {
        frame.set_kind(picture::Type::None);
        self.video_encoder
            .send_frame(frame)
            .during("avcodec_send_frame", "video")?;
        self.video.drain(&mut self.video_encoder, &mut self.context)
    }

    /// Encode one audio frame; ignored when the output has no audio stream
    pub fn send_audio_frame(&mut self, frame: &frame::Audio) -> BffResult<()> {
        let Some((encoder, sink)) = &mut self.audio else {
            return Ok(());
        };
        encoder.send_frame(frame).during("avcodec_send_frame", "audio")?;
        sink.drain(encoder, &mut self.context)
    }

    /// Drain both encoders and finish the container
    pub fn finish(&mut self) -> BffResult<()> {
        self.video_encoder.send_eof().during("avcodec_send_frame", "video flush")?;
        self.video.drain(&mut self.video_encoder, &mut self.context)?;

        if let Some((encoder, sink)) = &mut self.audio {
            encoder.send_eof().during("avcodec_send_frame", "audio flush")?;
            sink.drain(encoder, &mut self.context)?;
        }

        self.context
            .write_trailer()
            .during("av_write_trailer", self.path.as_str())
    }

    pub fn video_packets(&self) -> u64 {
        self.video.packets
    }

    pub fn audio_packets(&self) -> u64 {
        self.audio.as_ref().map_or(0, |(_, sink)| sink.packets)
    }

    /// Individual pts/dts values rewritten to keep timestamps increasing, all streams
    pub fn adjusted_timestamps(&self) -> u64 {
        self.video.timestamps.adjusted() + self.audio.as_ref().map_or(0, |(_, sink)| sink.timestamps.adjusted())
    }

    /// The muxer may pick its own time base while writing the header
    fn refresh_stream_time_bases(&mut self) {
        let sinks = std::iter::once(&mut self.video).chain(self.audio.as_mut().map(|(_, sink)| sink));
        for sink in sinks {
            if let Some(stream) = self.context.stream(sink.index) {
                sink.stream_time_base = stream.time_base();
                debug!(
                    "Output {} stream #{}: encoder time base {}, stream time base {}",
                    sink.label, sink.index, sink.encoder_time_base, sink.stream_time_base
                );
            }
        }
    }
}

fn add_video_stream(
    context: &mut format::context::Output,
    settings: VideoEncoderSettings,
    global_header: bool,
) -> BffResult<(encoder::Video, StreamSink)> {
    let h264 = encoder::find(codec::Id::H264)
        .ok_or(ffmpeg_next::Error::EncoderNotFound)
        .during("avcodec_find_encoder", "h264")?;
    let mut stream = context.add_stream(h264).during("avformat_new_stream", "video")?;

    let mut video = codec::context::Context::new_with_codec(h264)
        .encoder()
        .video()
        .during("avcodec_alloc_context3", "h264")?;
    video.set_width(settings.width);
    video.set_height(settings.height);
    video.set_format(ENCODER_PIXEL_FORMAT);
    video.set_aspect_ratio(settings.aspect_ratio);
    video.set_time_base(settings.time_base);
    if settings.frame_rate.numerator() > 0 {
        video.set_frame_rate(Some(settings.frame_rate));
    }
    if global_header {
        video.set_flags(codec::Flags::GLOBAL_HEADER);
    }

    let mut options = Dictionary::new();
    for (key, value) in H264_OPTIONS {
        options.set(key, value);
    }
    let encoder = video.open_as_with(h264, options).during("avcodec_open2", "h264")?;
    stream.set_parameters(&encoder);
    stream.set_time_base(settings.time_base);

    debug!(
        "H.264 encoder: {}x{}, time base {}, frame rate {}",
        settings.width, settings.height, settings.time_base, settings.frame_rate
    );
    let sink = StreamSink::new("video", stream.index(), settings.time_base);
    Ok((encoder, sink))
}

fn add_audio_stream(
    context: &mut format::context::Output,
    global_header: bool,
) -> BffResult<(encoder::Audio, StreamSink)> {
    let time_base = Rational::new(1, AUDIO_RATE as i32);
    let aac = encoder::find(codec::Id::AAC)
        .ok_or(ffmpeg_next::Error::EncoderNotFound)
        .during("avcodec_find_encoder", "aac")?;
    let mut stream = context.add_stream(aac).during("avformat_new_stream", "audio")?;

    let mut audio = codec::context::Context::new_with_codec(aac)
        .encoder()
        .audio()
        .during("avcodec_alloc_context3", "aac")?;
    audio.set_rate(AUDIO_RATE as i32);
    audio.set_channel_layout(ChannelLayout::STEREO);
    audio.set_format(Sample::F32(SampleType::Planar));
    audio.set_time_base(time_base);
    if global_header {
        audio.set_flags(codec::Flags::GLOBAL_HEADER);
    }

    let encoder = audio.open_as_with(aac, Dictionary::new()).during("avcodec_open2", "aac")?;
    stream.set_parameters(&encoder);
    stream.set_time_base(time_base);

    debug!("AAC encoder: {} Hz stereo, frame size {}", AUDIO_RATE, encoder.frame_size());
    let sink = StreamSink::new("audio", stream.index(), time_base);
    Ok((encoder, sink))
}
