mod app;
mod cells;
mod engine;
mod grid;
mod render;
mod sprite;
mod trace;

use anyhow::Result;
use clap::Parser;

/// glyphtrail — move the mouse across the terminal and watch random-walk
/// trails of glyphs shimmer and twist away.
#[derive(Parser, Debug)]
#[command(version, about)]
pub(crate) struct Args {
    /// Cell edge in braille pixels (2 per column, 4 per row)
    #[arg(long, default_value_t = 8)]
    pub(crate) cell: u32,

    /// Random seed (0 picks one from entropy)
    #[arg(long, default_value_t = 0)]
    pub(crate) seed: u64,

    /// Color theme
    #[arg(long, value_enum, default_value = "green")]
    pub(crate) theme: render::Theme,

    /// Glyph shape
    #[arg(long, value_enum, default_value = "spark")]
    pub(crate) glyph: sprite::Shape,

    /// Wander the pointer automatically (no mouse needed)
    #[arg(long)]
    pub(crate) demo: bool,

    /// Hide the status line
    #[arg(long)]
    pub(crate) no_hud: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    app::run(&args)
}
