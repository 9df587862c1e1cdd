/// Axis-aligned face bounding box in image-pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl FaceBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Width divided by height; 0.0 for a degenerate box.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height <= 0 {
            return 0.0;
        }
        self.width as f64 / self.height as f64
    }

    /// Whether `other` lies entirely inside this box (edges may touch).
    pub fn contains(&self, other: &FaceBox) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.x + other.width <= self.x + self.width
            && other.y + other.height <= self.y + self.height
    }

    /// Intersection with the `frame_w × frame_h` image, or `None` if empty.
    pub fn clamp_to(&self, frame_w: u32, frame_h: u32) -> Option<FaceBox> {
        let x1 = self.x.max(0);
        let y1 = self.y.max(0);
        let x2 = (self.x + self.width).min(frame_w as i32);
        let y2 = (self.y + self.height).min(frame_h as i32);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(FaceBox::new(x1, y1, x2 - x1, y2 - y1))
    }
}

impl std::fmt::Display for FaceBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}) {}x{}",
            self.x, self.y, self.width, self.height
        )
    }
}
