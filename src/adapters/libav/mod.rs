//! libav adapter
//!
//! Thin wrappers over `ffmpeg-next` for the fixed transcode pipeline: the
//! demuxer and decoders, format conversion, the deinterlacing filter graph and
//! the MP4 muxer with its encoders. Every failing libav call is reported as a
//! [`BffError::Ffmpeg`](crate::error::BffError::Ffmpeg) naming the call.

use ffmpeg_next::error::EAGAIN;
use ffmpeg_next::ffi;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::frame;

use crate::domain::model::{FrameGeometry, PlaneGeometry};
use crate::error::{BffResult, FfmpegResultExt};
use crate::ports::{PlanarImage, PlanarImageMut};

pub mod convert;
pub mod filter;
pub mod input;
pub mod output;

pub use convert::{AudioConverter, VideoConverter};
pub use filter::{Deinterlacer, FilterInput};
pub use input::MediaInput;
pub use output::{MediaOutput, VideoEncoderSettings};

/// Pixel format consumed by the H.264 encoder
pub const ENCODER_PIXEL_FORMAT: Pixel = Pixel::YUV420P;

/// Turn the result of a send/receive style call into "produced something"
/// (`true`) or "needs more input / fully drained" (`false`).
pub(crate) fn drain_step(
    result: Result<(), ffmpeg_next::Error>,
    operation: &'static str,
    argument: &str,
) -> BffResult<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(ffmpeg_next::Error::Other { errno }) if errno == EAGAIN => Ok(false),
        Err(ffmpeg_next::Error::Eof) => Ok(false),
        Err(e) => Err(e).during(operation, argument),
    }
}

/// Ensure `frame` owns its buffers before its pixels are overwritten.
///
/// Filter and decoder output may share reference-counted buffers with frames
/// still held elsewhere; this copies them when needed.
pub fn make_writable(frame: &mut frame::Video) -> BffResult<()> {
    let ret = unsafe { ffi::av_frame_make_writable(frame.as_mut_ptr()) };
    if ret < 0 {
        return Err(ffmpeg_next::Error::from(ret)).during("av_frame_make_writable", "video");
    }
    Ok(())
}

fn row_bytes(format: Pixel, width: u32, plane: usize) -> usize {
    let linesize = unsafe {
        ffi::av_image_get_linesize(ffi::AVPixelFormat::from(format), width as i32, plane as i32)
    };
    usize::try_from(linesize).unwrap_or(0)
}

impl PlanarImage for frame::Video {
    fn geometry(&self) -> FrameGeometry {
        let (format, width) = (self.format(), self.width());
        let planes = (0..self.planes())
            .map(|index| PlaneGeometry {
                row_bytes: row_bytes(format, width, index),
                rows: self.plane_height(index) as usize,
            })
            .collect();
        FrameGeometry {
            width,
            height: self.height(),
            planes,
        }
    }

    fn plane_data(&self, index: usize) -> &[u8] {
        self.data(index)
    }

    fn plane_stride(&self, index: usize) -> usize {
        self.stride(index)
    }

    fn pts(&self) -> Option<i64> {
        frame::Frame::pts(self)
    }
}

impl PlanarImageMut for frame::Video {
    fn plane_data_mut(&mut self, index: usize) -> &mut [u8] {
        self.data_mut(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::classifier::{ClassifierKind, ClassifierThresholds};
    use crate::domain::model::Frame;
    use crate::domain::substitution::{SubstitutionPolicy, Verdict};

    fn yuv_frame(width: u32, height: u32, luma: u8) -> frame::Video {
        let mut video = frame::Video::new(Pixel::YUV420P, width, height);
        let source = Frame::solid_yuv420p(width, height, luma);
        crate::domain::model::copy_pixels(&source, &mut video);
        video
    }

    #[test]
    fn test_libav_frame_geometry_matches_owned_layout() {
        let video = frame::Video::new(Pixel::YUV420P, 20, 10);
        assert_eq!(PlanarImage::geometry(&video), FrameGeometry::yuv420p(20, 10));
    }

    #[test]
    fn test_substitution_on_libav_frames() {
        let mut policy = SubstitutionPolicy::new(ClassifierKind::Proportional.build(ClassifierThresholds::DEFAULT));
        let mut good = yuv_frame(16, 8, 128);
        good.set_pts(Some(1));
        let mut black = yuv_frame(16, 8, 0);
        black.set_pts(Some(2));

        assert_eq!(policy.process(&mut good), Verdict::Good);
        make_writable(&mut black).unwrap();
        assert_eq!(policy.process(&mut black), Verdict::Substituted);
        assert!(Frame::copy_of(&good).same_pixels(&black));
        assert_eq!(PlanarImage::pts(&black), Some(2));
    }

    #[test]
    fn test_drain_step() {
        assert!(drain_step(Ok(()), "avcodec_receive_frame", "video").unwrap());
        assert!(!drain_step(Err(ffmpeg_next::Error::Eof), "avcodec_receive_frame", "video").unwrap());
        assert!(!drain_step(
            Err(ffmpeg_next::Error::Other { errno: EAGAIN }),
            "avcodec_receive_frame",
            "video"
        )
        .unwrap());
        assert!(drain_step(Err(ffmpeg_next::Error::InvalidData), "avcodec_receive_frame", "video").is_err());
    }
}
