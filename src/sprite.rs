use clap::ValueEnum;

/// Builtin glyph shapes; rasterized at runtime so any cell size works.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum Shape {
    Spark,
    Plus,
    Diamond,
    Ring,
}

/// A square alpha bitmap the renderer stamps into cells. The host installs
/// one after startup; until then the engine simply draws nothing.
pub(crate) struct GlyphSprite {
    size: u32,
    alpha: Vec<u8>,
}

impl GlyphSprite {
    pub(crate) fn builtin(shape: Shape, size: u32) -> Self {
        let size = size.max(1);
        let mut alpha = vec![0u8; (size * size) as usize];
        let half = (size as f32 - 1.0) * 0.5;
        let scale = if half > 0.0 { 1.0 / half } else { 1.0 };

        for y in 0..size {
            for x in 0..size {
                // normalized coordinates in [-1, 1], center at 0
                let nx = (x as f32 - half) * scale;
                let ny = (y as f32 - half) * scale;
                let d = match shape {
                    Shape::Spark => nx.abs().sqrt() + ny.abs().sqrt() - 1.15,
                    Shape::Plus => nx.abs().min(ny.abs()) - 0.30,
                    Shape::Diamond => nx.abs() + ny.abs() - 0.95,
                    Shape::Ring => ((nx * nx + ny * ny).sqrt() - 0.68).abs() - 0.24,
                };
                alpha[(y * size + x) as usize] = coverage(d);
            }
        }

        Self { size, alpha }
    }

    pub(crate) fn size(&self) -> u32 {
        self.size
    }

    /// Nearest-sample lookup; anything off the bitmap is transparent.
    pub(crate) fn sample(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x as u32 >= self.size || y as u32 >= self.size {
            return 0;
        }
        self.alpha[(y as u32 * self.size + x as u32) as usize]
    }
}

/// Signed distance (negative inside) to 8-bit coverage with a soft rim.
fn coverage(d: f32) -> u8 {
    ((0.5 - d * 3.0).clamp(0.0, 1.0) * 255.0) as u8
}
