use ndarray::ArrayView3;

use crate::shared::face_box::FaceBox;

/// BT.601 luma weights, the same conversion OpenCV applies for RGB→GRAY.
const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

/// A single captured image: contiguous bytes in row-major order.
///
/// Holds either RGB (3 channels) or grayscale (1 channel) pixels. Format
/// conversion happens at I/O boundaries and in [`Frame::to_grayscale`]; the
/// domain layer otherwise treats pixel data as opaque.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn is_grayscale(&self) -> bool {
        self.channels == 1
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Single-channel copy of this frame. Grayscale frames are cloned as-is.
    pub fn to_grayscale(&self) -> Frame {
        if self.is_grayscale() {
            return self.clone();
        }
        let stride = self.channels as usize;
        let luma = self
            .data
            .chunks_exact(stride)
            .map(|px| {
                let y = LUMA_R * px[0] as f32 + LUMA_G * px[1] as f32 + LUMA_B * px[2] as f32;
                y.round().clamp(0.0, 255.0) as u8
            })
            .collect();
        Frame::new(luma, self.width, self.height, 1)
    }

    /// Copies the pixels under `face`, clipped to the frame bounds.
    ///
    /// Returns `None` when the box lies entirely outside the frame.
    pub fn crop(&self, face: &FaceBox) -> Option<Frame> {
        let clipped = face.clamp_to(self.width, self.height)?;
        let (x, y) = (clipped.x as usize, clipped.y as usize);
        let (w, h) = (clipped.width as usize, clipped.height as usize);
        let c = self.channels as usize;
        let row_len = self.width as usize * c;

        let mut data = Vec::with_capacity(w * h * c);
        for row in y..y + h {
            let start = row * row_len + x * c;
            data.extend_from_slice(&self.data[start..start + w * c]);
        }
        Some(Frame::new(data, w as u32, h as u32, self.channels))
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
