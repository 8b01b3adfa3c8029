//! Live webcam capture through Video4Linux2.
//!
//! `CameraSource` needs Linux and the `camera` feature. The pixel-format
//! decoding is plain code and always available.

use crate::domain::Frame;
use image::{ImageFormat, RgbImage};

/// Wire formats a webcam is asked to deliver, in order of preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Motion-JPEG: every buffer is a complete JPEG image.
    Mjpeg,
    /// Packed YUV 4:2:2, two pixels per four bytes (`Y0 U Y1 V`).
    Yuyv,
}

impl PixelFormat {
    pub fn from_fourcc(code: [u8; 4]) -> Option<Self> {
        match &code {
            b"MJPG" => Some(PixelFormat::Mjpeg),
            b"YUYV" => Some(PixelFormat::Yuyv),
            _ => None,
        }
    }

    pub fn fourcc(self) -> [u8; 4] {
        match self {
            PixelFormat::Mjpeg => *b"MJPG",
            PixelFormat::Yuyv => *b"YUYV",
        }
    }
}

/// Decode one captured buffer into an RGB frame.
///
/// `width`/`height` are the negotiated format; MJPEG buffers carry their own
/// size and ignore them.
pub fn decode_buffer(
    format: PixelFormat,
    width: u32,
    height: u32,
    data: &[u8],
) -> Result<Frame, String> {
    match format {
        PixelFormat::Mjpeg => image::load_from_memory_with_format(data, ImageFormat::Jpeg)
            .map(|img| Frame::new(img.to_rgb8()))
            .map_err(|e| e.to_string()),
        PixelFormat::Yuyv => yuyv_to_rgb(width, height, data).map(Frame::new),
    }
}

/// BT.601 limited-range YUYV to RGB.
pub fn yuyv_to_rgb(width: u32, height: u32, data: &[u8]) -> Result<RgbImage, String> {
    if width % 2 != 0 {
        return Err(format!("YUYV width must be even, got {width}"));
    }
    let needed = width as usize * height as usize * 2;
    if data.len() < needed {
        return Err(format!(
            "short YUYV buffer: {} bytes for {width}x{height}, need {needed}",
            data.len()
        ));
    }

    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
    for quad in data[..needed].chunks_exact(4) {
        let (u, v) = (quad[1], quad[3]);
        rgb.extend_from_slice(&yuv_pixel(quad[0], u, v));
        rgb.extend_from_slice(&yuv_pixel(quad[2], u, v));
    }
    RgbImage::from_raw(width, height, rgb).ok_or_else(|| "YUYV size mismatch".to_string())
}

fn yuv_pixel(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = 298 * (i32::from(y) - 16);
    let d = i32::from(u) - 128;
    let e = i32::from(v) - 128;
    let clamp = |x: i32| ((x + 128) >> 8).clamp(0, 255) as u8;
    [
        clamp(c + 409 * e),
        clamp(c - 100 * d - 208 * e),
        clamp(c + 516 * d),
    ]
}

#[cfg(all(feature = "camera", target_os = "linux"))]
pub use device::CameraSource;

#[cfg(all(feature = "camera", target_os = "linux"))]
mod device {
    use super::{decode_buffer, PixelFormat};
    use crate::data::frames::{CaptureError, FrameSource};
    use crate::domain::Frame;
    use std::path::PathBuf;
    use tracing::{info, warn};
    use v4l::buffer::Type;
    use v4l::io::mmap::Stream;
    use v4l::io::traits::CaptureStream;
    use v4l::video::Capture;
    use v4l::{Device, FourCC};

    const BUFFER_COUNT: u32 = 4;

    /// A V4L2 webcam streaming through memory-mapped buffers.
    pub struct CameraSource {
        index: usize,
        format: PixelFormat,
        width: u32,
        height: u32,
        stream: Stream<'static>,
    }

    impl CameraSource {
        /// Open `/dev/video{index}` and negotiate MJPEG, falling back to YUYV.
        pub fn open(index: usize, width: u32, height: u32) -> Result<Self, CaptureError> {
            let unavailable = |what: &str, e: std::io::Error| {
                CaptureError::DeviceUnavailable(format!("/dev/video{index}: {what}: {e}"))
            };

            let dev = Device::new(index).map_err(|e| unavailable("open failed", e))?;

            let mut negotiated = None;
            for wanted in [PixelFormat::Mjpeg, PixelFormat::Yuyv] {
                let mut fmt = dev.format().map_err(|e| unavailable("query format", e))?;
                fmt.width = width;
                fmt.height = height;
                fmt.fourcc = FourCC::new(&wanted.fourcc());
                let got = dev.set_format(&fmt).map_err(|e| unavailable("set format", e))?;
                if let Some(format) = PixelFormat::from_fourcc(got.fourcc.repr) {
                    negotiated = Some((format, got.width, got.height));
                    break;
                }
                warn!(device = index, wanted = ?wanted, got = %got.fourcc, "pixel format refused");
            }
            let (format, width, height) = negotiated.ok_or_else(|| {
                CaptureError::DeviceUnavailable(format!(
                    "/dev/video{index}: neither MJPEG nor YUYV is supported"
                ))
            })?;

            let stream = Stream::with_buffers(&dev, Type::VideoCapture, BUFFER_COUNT)
                .map_err(|e| unavailable("start stream", e))?;

            info!(device = index, ?format, width, height, "camera opened");
            Ok(Self {
                index,
                format,
                width,
                height,
                stream,
            })
        }
    }

    impl FrameSource for CameraSource {
        fn describe(&self) -> String {
            format!(
                "camera /dev/video{} ({:?} {}x{})",
                self.index, self.format, self.width, self.height
            )
        }

        fn capture(&mut self) -> Result<Frame, CaptureError> {
            let (format, index) = (self.format, self.index);
            let (width, height) = (self.width, self.height);
            let (buf, meta) = self.stream.next().map_err(|e| {
                CaptureError::DeviceUnavailable(format!("/dev/video{index}: dequeue failed: {e}"))
            })?;
            let used = (meta.bytesused as usize).min(buf.len());
            decode_buffer(format, width, height, &buf[..used]).map_err(|message| {
                CaptureError::Decode {
                    path: PathBuf::from(format!("/dev/video{index}")),
                    message,
                }
            })
        }
    }
}
