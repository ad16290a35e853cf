use std::f32::consts::{FRAC_PI_2, SQRT_2};
use std::io::{self, Write};

use clap::ValueEnum;
use crossterm::{
    cursor,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};

use crate::engine::Engine;
use crate::sprite::GlyphSprite;

/// Glyphs never draw at more than this fraction of their cell's opacity.
pub(crate) const DRAW_ALPHA: f32 = 0.8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum Theme {
    Green,
    Purple,
    Amber,
    Ice,
}

impl Theme {
    pub(crate) fn next(self) -> Theme {
        match self {
            Theme::Green => Theme::Purple,
            Theme::Purple => Theme::Amber,
            Theme::Amber => Theme::Ice,
            Theme::Ice => Theme::Green,
        }
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Theme::Green => "green",
            Theme::Purple => "purple",
            Theme::Amber => "amber",
            Theme::Ice => "ice",
        }
    }

    /// Tint ramp: brighter while fresh, dimming along the fade.
    fn tint(self, alpha: f32) -> (u8, u8, u8) {
        let level = (215.0 * alpha.clamp(0.0, 1.0) + 40.0) as u8;
        match self {
            Theme::Green => (level / 6, level, level / 6),
            Theme::Purple => ((level as f32 * 0.65) as u8, level / 8, level),
            Theme::Amber => (level, (level as f32 * 0.70) as u8, level / 10),
            Theme::Ice => (level / 8, (level as f32 * 0.85) as u8, level),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Pixel {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

/// RGBA surface at braille resolution: 2 pixels per terminal column, 4 per
/// row. This is the "drawing surface" the engine's grid is laid over.
pub(crate) struct PixelCanvas {
    pub(crate) w: u32,
    pub(crate) h: u32,
    px: Vec<Pixel>,
}

impl PixelCanvas {
    pub(crate) fn new(w: u32, h: u32) -> Self {
        Self {
            w,
            h,
            px: vec![Pixel::default(); (w as usize) * (h as usize)],
        }
    }

    pub(crate) fn clear(&mut self) {
        self.px.fill(Pixel::default());
    }

    fn at(&self, x: u32, y: u32) -> Pixel {
        self.px[(y as usize) * (self.w as usize) + (x as usize)]
    }

    /// Straight-alpha "over" blend in integer math.
    fn blend(&mut self, x: i32, y: i32, r: u8, g: u8, b: u8, a: u8) {
        if a == 0 || x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        if x >= self.w || y >= self.h {
            return;
        }
        let i = (y as usize) * (self.w as usize) + (x as usize);
        let dst = self.px[i];

        let sa = a as u32;
        let da = dst.a as u32 * (255 - sa) / 255;
        let out_a = sa + da;
        if out_a == 0 {
            return;
        }
        let mix = |s: u8, d: u8| ((s as u32 * sa + d as u32 * da) / out_a) as u8;
        self.px[i] = Pixel {
            r: mix(r, dst.r),
            g: mix(g, dst.g),
            b: mix(b, dst.b),
            a: out_a.min(255) as u8,
        };
    }
}

/// Draw every glowing cell onto the canvas: glyph centered in its cell,
/// twisting up to a quarter turn as it fades. Skips everything (including
/// the clear) while the glyph bitmap hasn't arrived.
pub(crate) fn draw_cells(
    canvas: &mut PixelCanvas,
    engine: &Engine,
    sprite: Option<&GlyphSprite>,
    theme: Theme,
) {
    let sprite = match sprite {
        Some(s) => s,
        None => return,
    };
    canvas.clear();

    let grid = engine.grid();
    let half_cell = grid.cell_size as f32 * 0.5;

    for (index, cell) in engine.cells().iter() {
        let (ox, oy) = grid.origin_of(index);
        let cx = ox as f32 + half_cell;
        let cy = oy as f32 + half_cell;
        let angle = (1.0 - cell.alpha) * FRAC_PI_2 * cell.spin;
        let opacity = cell.alpha * DRAW_ALPHA;
        let (r, g, b) = theme.tint(cell.alpha);
        draw_glyph(canvas, sprite, cx, cy, angle, opacity, (r, g, b));
    }
}

/// Stamp the sprite rotated by `angle` around (cx, cy). Destination pixels
/// are inverse-rotated into sprite space and nearest-sampled, so each stamp
/// is self-contained and leaves no shared state behind.
fn draw_glyph(
    canvas: &mut PixelCanvas,
    sprite: &GlyphSprite,
    cx: f32,
    cy: f32,
    angle: f32,
    opacity: f32,
    rgb: (u8, u8, u8),
) {
    let (sin_a, cos_a) = angle.sin_cos();
    let half = sprite.size() as f32 * 0.5;
    // a rotated square pokes out of its own bounding box, scan the diagonal
    let reach = (half * SQRT_2).ceil() as i32;
    let ix = cx.floor() as i32;
    let iy = cy.floor() as i32;

    for py in (iy - reach)..=(iy + reach) {
        for px in (ix - reach)..=(ix + reach) {
            let dx = px as f32 + 0.5 - cx;
            let dy = py as f32 + 0.5 - cy;
            let sx = cos_a * dx + sin_a * dy + half;
            let sy = cos_a * dy - sin_a * dx + half;
            if sx < 0.0 || sy < 0.0 {
                continue;
            }
            let a = sprite.sample(sx as i32, sy as i32);
            if a == 0 {
                continue;
            }
            let a = (a as f32 * opacity.clamp(0.0, 1.0)) as u8;
            canvas.blend(px, py, rgb.0, rgb.1, rgb.2, a);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::Reset,
        }
    }
}

pub(crate) struct CellBuffer {
    w: u16,
    h: u16,
    cells: Vec<Cell>,
}

impl CellBuffer {
    fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }

    fn set(&mut self, x: u16, y: u16, cell: Cell) {
        if x < self.w && y < self.h {
            self.cells[(y as usize) * (self.w as usize) + (x as usize)] = cell;
        }
    }
}

// braille dot bits by (dy, dx) within the 2x4 block
const DOTS: [[u8; 2]; 4] = [[0x01, 0x08], [0x02, 0x10], [0x04, 0x20], [0x40, 0x80]];
const INK_THRESHOLD: u8 = 32;

/// Collapse the pixel canvas into braille cells, averaging the color of the
/// inked subpixels per cell.
pub(crate) fn canvas_to_cells(canvas: &PixelCanvas, out: &mut CellBuffer) {
    for cy in 0..out.h {
        for cx in 0..out.w {
            let px0 = cx as u32 * 2;
            let py0 = cy as u32 * 4;

            let mut mask = 0u8;
            let mut sum = (0u32, 0u32, 0u32);
            let mut inked = 0u32;

            for dy in 0..4u32 {
                for dx in 0..2u32 {
                    let (x, y) = (px0 + dx, py0 + dy);
                    if x >= canvas.w || y >= canvas.h {
                        continue;
                    }
                    let p = canvas.at(x, y);
                    if p.a >= INK_THRESHOLD {
                        mask |= DOTS[dy as usize][dx as usize];
                        sum = (sum.0 + p.r as u32, sum.1 + p.g as u32, sum.2 + p.b as u32);
                        inked += 1;
                    }
                }
            }

            let cell = if mask == 0 {
                Cell::default()
            } else {
                Cell {
                    ch: char::from_u32(0x2800 + mask as u32).unwrap_or(' '),
                    fg: Color::Rgb {
                        r: (sum.0 / inked) as u8,
                        g: (sum.1 / inked) as u8,
                        b: (sum.2 / inked) as u8,
                    },
                }
            };
            out.set(cx, cy, cell);
        }
    }
}

/// Raw-mode terminal with a diffed cell front/back buffer. Restores the
/// shell state on drop, even on panic.
pub(crate) struct Terminal {
    out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    prev: CellBuffer,
    cur: CellBuffer,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(
            out,
            EnterAlternateScreen,
            DisableLineWrap,
            EnableMouseCapture,
            cursor::Hide,
            Clear(ClearType::All)
        )?;
        let (cols, rows) = terminal::size()?;
        Ok(Self {
            out,
            cols,
            rows,
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
        })
    }

    pub(crate) fn resize(&mut self, cols: u16, rows: u16) -> anyhow::Result<()> {
        self.cols = cols;
        self.rows = rows;
        self.prev = CellBuffer::new(cols, rows);
        self.cur = CellBuffer::new(cols, rows);
        execute!(self.out, Clear(ClearType::All))?;
        Ok(())
    }

    pub(crate) fn compose(&mut self, canvas: &PixelCanvas) {
        canvas_to_cells(canvas, &mut self.cur);
    }

    /// Overlay a line of text onto the current frame.
    pub(crate) fn text(&mut self, x: u16, y: u16, s: &str, fg: Color) {
        let mut col = x;
        for ch in s.chars() {
            if col >= self.cols {
                break;
            }
            self.cur.set(col, y, Cell { ch, fg });
            col += 1;
        }
    }

    /// Flush only the cells that changed since the last frame.
    pub(crate) fn present(&mut self) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;
        let mut last_fg = None;
        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = (y as usize) * (self.cols as usize) + (x as usize);
                let cell = self.cur.cells[i];
                if cell == self.prev.cells[i] {
                    continue;
                }
                queue!(self.out, cursor::MoveTo(x, y))?;
                if last_fg != Some(cell.fg) {
                    queue!(self.out, SetForegroundColor(cell.fg))?;
                    last_fg = Some(cell.fg);
                }
                queue!(self.out, Print(cell.ch))?;
            }
        }
        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        let _ = execute!(
            self.out,
            ResetColor,
            DisableMouseCapture,
            cursor::Show,
            EnableLineWrap,
            LeaveAlternateScreen
        );
        let _ = terminal::disable_raw_mode();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sprite::Shape;

    #[test]
    fn blend_clips_to_the_canvas() {
        let mut canvas = PixelCanvas::new(4, 4);
        canvas.blend(-1, 0, 255, 255, 255, 200);
        canvas.blend(0, -9, 255, 255, 255, 200);
        canvas.blend(4, 0, 255, 255, 255, 200);
        canvas.blend(0, 4, 255, 255, 255, 200);
        assert!(canvas.px.iter().all(|p| p.a == 0));
    }

    #[test]
    fn blend_over_transparent_takes_source() {
        let mut canvas = PixelCanvas::new(2, 2);
        canvas.blend(1, 1, 10, 200, 30, 255);
        let p = canvas.at(1, 1);
        assert_eq!((p.r, p.g, p.b, p.a), (10, 200, 30, 255));
    }

    #[test]
    fn unrotated_glyph_lands_centered() {
        let mut canvas = PixelCanvas::new(32, 32);
        let sprite = GlyphSprite::builtin(Shape::Diamond, 8);
        draw_glyph(&mut canvas, &sprite, 16.0, 16.0, 0.0, 1.0, (255, 255, 255));

        assert!(canvas.at(16, 16).a > 0);
        // diamond tips reach ~4px from center; corners of the cell stay clear
        assert_eq!(canvas.at(12, 12).a, 0);
        assert_eq!(canvas.at(19, 19).a, 0);
    }

    #[test]
    fn rotation_keeps_ink_near_the_center() {
        let sprite = GlyphSprite::builtin(Shape::Plus, 8);
        for angle in [0.3f32, -0.7, FRAC_PI_2] {
            let mut canvas = PixelCanvas::new(32, 32);
            draw_glyph(&mut canvas, &sprite, 16.0, 16.0, angle, 1.0, (255, 0, 0));
            assert!(canvas.at(16, 16).a > 0, "angle {angle} lost the center");
        }
    }

    #[test]
    fn zero_opacity_draws_nothing() {
        let mut canvas = PixelCanvas::new(16, 16);
        let sprite = GlyphSprite::builtin(Shape::Plus, 8);
        draw_glyph(&mut canvas, &sprite, 8.0, 8.0, 0.0, 0.0, (255, 255, 255));
        assert!(canvas.px.iter().all(|p| p.a == 0));
    }

    #[test]
    fn missing_sprite_skips_the_frame() {
        let mut canvas = PixelCanvas::new(16, 16);
        canvas.blend(3, 3, 9, 9, 9, 200);
        let engine = Engine::new(16, 16, 8, 1);
        draw_cells(&mut canvas, &engine, None, Theme::Green);
        // untouched, not even cleared
        assert_eq!(canvas.at(3, 3).a, 200);
    }

    #[test]
    fn braille_conversion_sets_the_right_dot() {
        let mut canvas = PixelCanvas::new(4, 8);
        // subpixel (1, 2) of the top-left cell: dot bit 0x20
        canvas.blend(1, 2, 255, 255, 255, 255);
        let mut buf = CellBuffer::new(2, 2);
        canvas_to_cells(&canvas, &mut buf);
        assert_eq!(buf.cells[0].ch, char::from_u32(0x2800 + 0x20).unwrap());
        assert_eq!(buf.cells[1].ch, ' ');
    }

    #[test]
    fn faint_pixels_leave_no_ink() {
        let mut canvas = PixelCanvas::new(2, 4);
        canvas.blend(0, 0, 255, 255, 255, INK_THRESHOLD - 1);
        let mut buf = CellBuffer::new(1, 1);
        canvas_to_cells(&canvas, &mut buf);
        assert_eq!(buf.cells[0], Cell::default());
    }

    #[test]
    fn theme_ramp_dims_with_alpha() {
        for theme in [Theme::Green, Theme::Purple, Theme::Amber, Theme::Ice] {
            let bright = theme.tint(1.0);
            let dim = theme.tint(0.1);
            let sum = |c: (u8, u8, u8)| c.0 as u32 + c.1 as u32 + c.2 as u32;
            assert!(sum(bright) > sum(dim), "{theme:?} ramp not monotonic");
        }
    }
}
