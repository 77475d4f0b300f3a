use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{ImageFormat, Rgb, RgbImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("frame encoding failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("capture device error: {0}")]
    Device(String),
}

/// Seam for the live-capture source. The session loop pulls one frame per
/// tick; implementations return it encoded the way the backend expects, a
/// base64 JPEG data URL.
pub trait FrameSource {
    fn capture(&mut self) -> Result<String, CaptureError>;
}

/// Generates moving-pattern frames so the live path is exercisable without
/// camera hardware. A real webcam backend implements [`FrameSource`] the same
/// way.
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    tick: u64,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tick: 0,
        }
    }
}

impl FrameSource for SyntheticCamera {
    fn capture(&mut self) -> Result<String, CaptureError> {
        let bar = (self.tick * 8) % u64::from(self.width.max(1));
        let image = RgbImage::from_fn(self.width, self.height, |x, y| {
            if u64::from(x) >= bar && u64::from(x) < bar + 24 {
                Rgb([230, 230, 230])
            } else {
                Rgb([(x % 256) as u8, (y % 256) as u8, 40])
            }
        });
        self.tick += 1;

        let mut jpeg = Vec::new();
        image.write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)?;
        Ok(format!("data:image/jpeg;base64,{}", BASE64.encode(&jpeg)))
    }
}
