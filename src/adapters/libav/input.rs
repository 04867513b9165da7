//! Source file: demuxer plus video and optional audio decoder

use std::path::Path;

use ffmpeg_next::{codec, decoder, format, frame, media, Packet, Rational};
use tracing::debug;

use super::drain_step;
use crate::error::{BffResult, FfmpegResultExt};

/// Decoder and stream metadata for one selected input stream
struct DecodedStream<D> {
    index: usize,
    time_base: Rational,
    decoder: D,
}

/// Opened input container
pub struct MediaInput {
    path: String,
    context: format::context::Input,
    video: DecodedStream<decoder::Video>,
    frame_rate: Rational,
    audio: Option<DecodedStream<decoder::Audio>>,
}

impl MediaInput {
    /// Open `path` and set up decoders for the best video and audio streams.
    ///
    /// A missing video stream is an error; audio is optional.
    pub fn open(path: &Path) -> BffResult<Self> {
        let display = path.display().to_string();
        let context = format::input(&path).during("avformat_open_input", display.as_str())?;

        let (video, frame_rate) = {
            let stream = context
                .streams()
                .best(media::Type::Video)
                .ok_or(ffmpeg_next::Error::StreamNotFound)
                .during("av_find_best_stream", "video")?;
            let decoder = codec::context::Context::from_parameters(stream.parameters())
                .during("avcodec_parameters_to_context", "video")?
                .decoder()
                .video()
                .during("avcodec_open2", "video")?;
            let frame_rate = match stream.avg_frame_rate() {
                rate if rate.numerator() > 0 && rate.denominator() > 0 => rate,
                _ => stream.rate(),
            };
            debug!(
                "Video stream #{}: {}x{} {:?}, time base {}, frame rate {}",
                stream.index(),
                decoder.width(),
                decoder.height(),
                decoder.format(),
                stream.time_base(),
                frame_rate
            );
            let video = DecodedStream {
                index: stream.index(),
                time_base: stream.time_base(),
                decoder,
            };
            (video, frame_rate)
        };

        let audio = match context.streams().best(media::Type::Audio) {
            Some(stream) => {
                let decoder = codec::context::Context::from_parameters(stream.parameters())
                    .during("avcodec_parameters_to_context", "audio")?
                    .decoder()
                    .audio()
                    .during("avcodec_open2", "audio")?;
                debug!(
                    "Audio stream #{}: {} Hz, {} channel(s), {:?}",
                    stream.index(),
                    decoder.rate(),
                    decoder.channels(),
                    decoder.format()
                );
                Some(DecodedStream {
                    index: stream.index(),
                    time_base: stream.time_base(),
                    decoder,
                })
            }
            None => {
                debug!("No audio stream in {}", path.display());
                None
            }
        };

        Ok(Self {
            path: display,
            context,
            video,
            frame_rate,
            audio,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn video_stream_index(&self) -> usize {
        self.video.index
    }

    pub fn audio_stream_index(&self) -> Option<usize> {
        self.audio.as_ref().map(|audio| audio.index)
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    pub fn video_decoder(&self) -> &decoder::Video {
        &self.video.decoder
    }

    pub fn audio_decoder(&self) -> Option<&decoder::Audio> {
        self.audio.as_ref().map(|audio| &audio.decoder)
    }

    /// Time base of the video stream, also used by the video encoder
    pub fn video_time_base(&self) -> Rational {
        self.video.time_base
    }

    pub fn audio_time_base(&self) -> Option<Rational> {
        self.audio.as_ref().map(|audio| audio.time_base)
    }

    /// Average frame rate of the video stream, falling back to the real base rate
    pub fn frame_rate(&self) -> Rational {
        self.frame_rate
    }

    /// Next packet from the container, `None` at end of file
    pub fn read_packet(&mut self) -> BffResult<Option<Packet>> {
        let mut packet = Packet::empty();
        match packet.read(&mut self.context) {
            Ok(()) => Ok(Some(packet)),
            Err(ffmpeg_next::Error::Eof) => Ok(None),
            Err(e) => Err(e).during("av_read_frame", self.path.as_str()),
        }
    }

    pub fn send_video_packet(&mut self, packet: &Packet) -> BffResult<()> {
        self.video
            .decoder
            .send_packet(packet)
            .during("avcodec_send_packet", "input video")
    }

    /// Next decoded video frame with its pts set to the best-effort timestamp
    pub fn receive_video_frame(&mut self, frame: &mut frame::Video) -> BffResult<bool> {
        let received = drain_step(
            self.video.decoder.receive_frame(frame),
            "avcodec_receive_frame",
            "input video",
        )?;
        if received {
            let timestamp = frame.timestamp();
            frame.set_pts(timestamp);
        }
        Ok(received)
    }

    pub fn send_audio_packet(&mut self, packet: &Packet) -> BffResult<()> {
        match &mut self.audio {
            Some(audio) => audio
                .decoder
                .send_packet(packet)
                .during("avcodec_send_packet", "input audio"),
            None => Ok(()),
        }
    }

    pub fn receive_audio_frame(&mut self, frame: &mut frame::Audio) -> BffResult<bool> {
        match &mut self.audio {
            Some(audio) => drain_step(
                audio.decoder.receive_frame(frame),
                "avcodec_receive_frame",
                "input audio",
            ),
            None => Ok(false),
        }
    }

    /// Signal end of input to both decoders so buffered frames can be drained
    pub fn send_eof(&mut self) -> BffResult<()> {
        self.video
            .decoder
            .send_eof()
            .during("avcodec_send_packet", "input video flush")?;
        if let Some(audio) = &mut self.audio {
            audio
                .decoder
                .send_eof()
                .during("avcodec_send_packet", "input audio flush")?;
        }
        Ok(())
    }
}
