use std::f32::consts::PI;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, MouseEvent, MouseEventKind};
use crossterm::style::Color;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::engine::Engine;
use crate::render::{self, PixelCanvas, Terminal, Theme};
use crate::sprite::{GlyphSprite, Shape};
use crate::Args;

pub(crate) fn run(args: &Args) -> Result<()> {
    App::init(args)?.run()
}

struct App {
    term: Terminal,
    canvas: PixelCanvas,
    engine: Engine,
    sprite: Option<GlyphSprite>,
    shape: Shape,
    cell_size: u32,
    theme: Theme,
    hud: bool,
    paused: bool,
    demo: bool,
    wander: Wander,
    frames: u32,
    fps: f32,
    fps_timer: Instant,
}

impl App {
    fn init(args: &Args) -> Result<Self> {
        let term = Terminal::begin()?;
        let (w, h) = (term.cols as u32 * 2, term.rows as u32 * 4);

        let wander_rng = if args.seed == 0 {
            StdRng::from_entropy()
        } else {
            StdRng::seed_from_u64(args.seed.wrapping_add(1))
        };

        Ok(Self {
            term,
            canvas: PixelCanvas::new(w, h),
            engine: Engine::new(w, h, args.cell, args.seed),
            sprite: None,
            shape: args.glyph,
            cell_size: args.cell,
            theme: args.theme,
            hud: !args.no_hud,
            paused: false,
            demo: args.demo,
            wander: Wander::new(w, h, wander_rng),
            frames: 0,
            fps: 0.0,
            fps_timer: Instant::now(),
        })
    }

    fn run(&mut self) -> Result<()> {
        // The engine is live before its glyph exists; frames until this
        // install simply render nothing.
        self.sprite = Some(GlyphSprite::builtin(self.shape, self.cell_size));

        loop {
            while event::poll(Duration::ZERO)? {
                match event::read()? {
                    Event::Key(k) if k.kind == KeyEventKind::Press => {
                        if self.handle_key(k.code) {
                            return Ok(());
                        }
                    }
                    Event::Mouse(m) => self.handle_mouse(m),
                    Event::Resize(cols, rows) => self.resize(cols, rows)?,
                    _ => {}
                }
            }

            if self.demo && !self.paused {
                let (x, y) = self
                    .wander
                    .step(self.canvas.w as f32, self.canvas.h as f32);
                self.engine.pointer_moved(x, y);
            }

            if !self.paused && self.engine.advance(Instant::now()) {
                self.draw_frame()?;
                self.frames += 1;
            }

            if self.fps_timer.elapsed() >= Duration::from_millis(500) {
                self.fps = self.frames as f32 / self.fps_timer.elapsed().as_secs_f32();
                self.frames = 0;
                self.fps_timer = Instant::now();
            }

            // keep the poll loop tight enough for 30ms growth timers while
            // staying polite to the CPU
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => return true,
            KeyCode::Char(' ') => self.paused = !self.paused,
            KeyCode::Char('t') | KeyCode::Char('T') => self.theme = self.theme.next(),
            KeyCode::Char('h') | KeyCode::Char('H') => self.hud = !self.hud,
            KeyCode::Char('d') | KeyCode::Char('D') => {
                self.demo = !self.demo;
                if !self.demo {
                    self.engine.pointer_cleared();
                }
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                self.engine.configure(self.canvas.w, self.canvas.h);
            }
            _ => {}
        }
        false
    }

    fn handle_mouse(&mut self, m: MouseEvent) {
        if self.demo {
            return;
        }
        match m.kind {
            MouseEventKind::Moved | MouseEventKind::Drag(_) | MouseEventKind::Down(_) => {
                // center of the hovered terminal cell, in canvas pixels
                let x = m.column as f32 * 2.0 + 1.0;
                let y = m.row as f32 * 4.0 + 2.0;
                self.engine.pointer_moved(x, y);
            }
            MouseEventKind::Up(_) => self.engine.pointer_cleared(),
            _ => {}
        }
    }

    fn resize(&mut self, cols: u16, rows: u16) -> Result<()> {
        self.term.resize(cols, rows)?;
        let (w, h) = (cols as u32 * 2, rows as u32 * 4);
        self.canvas = PixelCanvas::new(w, h);
        self.engine.configure(w, h);
        self.wander.recenter(w, h);
        Ok(())
    }

    fn draw_frame(&mut self) -> Result<()> {
        render::draw_cells(
            &mut self.canvas,
            &self.engine,
            self.sprite.as_ref(),
            self.theme,
        );
        self.term.compose(&self.canvas);

        if self.hud {
            let grid = self.engine.grid();
            let line = format!(
                "glyphtrail  {}x{}  lit:{:>3}  trails:{:>2}  {}  fps:{:>5.1}{}{}   q quit  space pause  t theme  d demo  r reset  h hud",
                grid.cols,
                grid.rows,
                self.engine.cells().len(),
                self.engine.trace_count(),
                self.theme.name(),
                self.fps,
                if self.paused { "  [paused]" } else { "" },
                if self.demo { "  [demo]" } else { "" },
            );
            self.term.text(0, 0, &line, Color::White);
        }

        self.term.present()
    }
}

/// Demo pointer: a seeded drunkard's drift across the surface so the toy
/// animates without a mouse. Feeds the exact same pointer path as real input.
struct Wander {
    x: f32,
    y: f32,
    heading: f32,
    rng: StdRng,
}

impl Wander {
    fn new(w: u32, h: u32, rng: StdRng) -> Self {
        Self {
            x: w as f32 * 0.5,
            y: h as f32 * 0.5,
            heading: 0.7,
            rng,
        }
    }

    fn recenter(&mut self, w: u32, h: u32) {
        self.x = w as f32 * 0.5;
        self.y = h as f32 * 0.5;
    }

    fn step(&mut self, w: f32, h: f32) -> (f32, f32) {
        self.heading += self.rng.gen_range(-0.3..0.3);
        self.x += self.heading.cos() * 0.5;
        self.y += self.heading.sin() * 0.5;

        if self.x < 0.0 || self.x >= w {
            self.heading = PI - self.heading;
            self.x = self.x.clamp(0.0, (w - 1.0).max(0.0));
        }
        if self.y < 0.0 || self.y >= h {
            self.heading = -self.heading;
            self.y = self.y.clamp(0.0, (h - 1.0).max(0.0));
        }
        (self.x, self.y)
    }
}
