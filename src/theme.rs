//! Chart Theme
//!
//! Pivot charts are always drawn with the same dark theme: black plot and
//! panel background, dark-green bars, white text. Nothing here is
//! user-configurable; the renderer reads concrete values only.

use plotters::prelude::*;

/// Fully resolved text style ready for rendering
#[derive(Debug, Clone)]
pub struct ResolvedText {
    pub family: &'static str,
    pub color: RGBColor,
    pub size: f64,
}

impl ResolvedText {
    pub fn style(&self) -> TextStyle<'static> {
        (self.family, self.size).into_font().color(&self.color)
    }
}

/// Complete chart theme
#[derive(Debug, Clone)]
pub struct ChartTheme {
    pub background: RGBColor,
    pub bar_fill: RGBColor,
    pub grid: RGBColor,
    pub axis_line: RGBColor,
    pub title: ResolvedText,
    pub axis_text: ResolvedText,
    pub bar_label: ResolvedText,
    /// Bar width as a fraction of one category slot
    pub bar_width: f64,
}

pub const BLACK_BG: RGBColor = RGBColor(0, 0, 0);
pub const DARK_GREEN: RGBColor = RGBColor(0, 100, 0);
pub const TEXT_WHITE: RGBColor = RGBColor(255, 255, 255);
const GRID_GRAY: RGBColor = RGBColor(64, 64, 64);

impl ChartTheme {
    pub fn dark() -> Self {
        let text = |size| ResolvedText {
            family: "sans-serif",
            color: TEXT_WHITE,
            size,
        };

        ChartTheme {
            background: BLACK_BG,
            bar_fill: DARK_GREEN,
            grid: GRID_GRAY,
            axis_line: TEXT_WHITE,
            title: text(20.0),
            axis_text: text(13.0),
            bar_label: text(12.0),
            bar_width: 0.8,
        }
    }
}
