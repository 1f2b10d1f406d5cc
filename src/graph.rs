use crate::theme::ChartTheme;
use crate::OutputFormat;
use anyhow::{Context, Result};
use image::ImageEncoder;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::ops::Range;

/// Largest accepted chart width or height, in pixels
pub const MAX_DIMENSION: u32 = 10_000;

/// Canvas for a single-series categorical bar chart
pub struct Canvas {
    width: u32,
    height: u32,
    title: String,
    x_desc: String,
    y_desc: String,
    theme: ChartTheme,
}

impl Canvas {
    pub fn new(width: u32, height: u32, title: String, x_desc: String, y_desc: String) -> Self {
        Canvas {
            width,
            height,
            title,
            x_desc,
            y_desc,
            theme: ChartTheme::dark(),
        }
    }

    /// Draw one bar per category and encode the chart in the requested format
    pub fn render_bars(
        &self,
        categories: &[String],
        y_data: &[f64],
        format: &OutputFormat,
    ) -> Result<Vec<u8>> {
        if categories.len() != y_data.len() {
            anyhow::bail!(
                "Categories and Y data must have the same length (categories: {}, y: {})",
                categories.len(),
                y_data.len()
            );
        }

        if categories.is_empty() {
            anyhow::bail!("Cannot create bar chart with no data");
        }

        let valid_side = |side: u32| (1..=MAX_DIMENSION).contains(&side);
        if !valid_side(self.width) || !valid_side(self.height) {
            anyhow::bail!(
                "Invalid chart dimensions {}x{} (each side must be 1 to {})",
                self.width,
                self.height,
                MAX_DIMENSION
            );
        }

        if let Some(bad) = y_data.iter().find(|y| !y.is_finite()) {
            anyhow::bail!("Cannot draw a bar for non-finite value {}", bad);
        }

        match format {
            OutputFormat::Png => self.render_png(categories, y_data),
            OutputFormat::Svg => self.render_svg(categories, y_data),
        }
    }

    fn render_png(&self, categories: &[String], y_data: &[f64]) -> Result<Vec<u8>> {
        let buffer_len = (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|pixels| pixels.checked_mul(3))
            .context("Chart dimensions overflow the pixel buffer")?;
        let mut buffer = vec![0u8; buffer_len];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (self.width, self.height))
                .into_drawing_area();
            self.draw(&root, categories, y_data)?;
            root.present().context("Failed to present drawing")?;
        }

        let mut png_bytes = Vec::new();
        {
            let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
            encoder
                .write_image(&buffer, self.width, self.height, image::ColorType::Rgb8)
                .context("Failed to encode PNG")?;
        }

        Ok(png_bytes)
    }

    fn render_svg(&self, categories: &[String], y_data: &[f64]) -> Result<Vec<u8>> {
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (self.width, self.height))
                .into_drawing_area();
            self.draw(&root, categories, y_data)?;
            root.present().context("Failed to present drawing")?;
        }
        Ok(svg.into_bytes())
    }

    fn draw<DB>(&self, root: &DrawingArea<DB, Shift>, categories: &[String], y_data: &[f64]) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        let theme = &self.theme;
        root.fill(&theme.background)
            .context("Failed to fill background")?;

        // Category i is centered on x = i, so integer ticks land under the bars
        let num_categories = categories.len();
        let x_range = -0.5..(num_categories as f64 - 0.5);
        let y_range = value_range(y_data);

        let mut chart = ChartBuilder::on(root)
            .margin(10)
            .caption(&self.title, theme.title.style())
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_range, y_range)
            .context("Failed to build chart")?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .bold_line_style(theme.grid.stroke_width(1))
            .light_line_style(theme.background.stroke_width(1))
            .axis_style(theme.axis_line.stroke_width(1))
            .label_style(theme.axis_text.style())
            .axis_desc_style(theme.axis_text.style())
            .x_desc(self.x_desc.as_str())
            .y_desc(self.y_desc.as_str())
            .x_labels(num_categories)
            .x_label_formatter(&|x| category_label(categories, *x))
            .y_label_formatter(&|y| format_label(*y))
            .draw()
            .context("Failed to draw mesh")?;

        // Bars
        let half_width = theme.bar_width / 2.0;
        let bar_style = theme.bar_fill.filled();
        chart
            .draw_series(y_data.iter().enumerate().map(|(idx, &y_val)| {
                let x_center = idx as f64;
                Rectangle::new(
                    [(x_center - half_width, 0.0), (x_center + half_width, y_val)],
                    bar_style,
                )
            }))
            .context("Failed to draw bars")?;

        // Value labels just outside each bar's end
        let above = theme.bar_label.style().pos(Pos::new(HPos::Center, VPos::Bottom));
        let below = theme.bar_label.style().pos(Pos::new(HPos::Center, VPos::Top));
        chart
            .draw_series(y_data.iter().enumerate().map(|(idx, &y_val)| {
                let style = if y_val < 0.0 { below.clone() } else { above.clone() };
                Text::new(format_label(y_val), (idx as f64, y_val), style)
            }))
            .context("Failed to draw value labels")?;

        Ok(())
    }
}

/// Label for an x tick: the category whose center sits on it, if any
fn category_label(categories: &[String], x: f64) -> String {
    let rounded = x.round();
    if (x - rounded).abs() > 1e-6 || rounded < 0.0 {
        return String::new();
    }
    categories
        .get(rounded as usize)
        .cloned()
        .unwrap_or_default()
}

/// Y range covering zero and every value, padded at the open ends for labels
fn value_range(y_data: &[f64]) -> Range<f64> {
    let y_min = y_data.iter().cloned().fold(0.0, f64::min);
    let y_max = y_data.iter().cloned().fold(0.0, f64::max);

    if y_min == y_max {
        return 0.0..1.0;
    }

    let padding = (y_max - y_min) * 0.1;
    let low = if y_min < 0.0 { y_min - padding } else { 0.0 };
    let high = if y_max > 0.0 { y_max + padding } else { 0.0 };
    low..high
}

/// Format a number for display: integers without decimals, others to two places
pub fn format_label(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let fixed = format!("{:.2}", value);
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_valid_png(bytes: &[u8]) -> bool {
        bytes.len() > 8 && bytes[0..8] == [137, 80, 78, 71, 13, 10, 26, 10]
    }

    fn make_canvas() -> Canvas {
        Canvas::new(
            640,
            480,
            "Pivot Table Chart - Sum".to_string(),
            "city".to_string(),
            "sales".to_string(),
        )
    }

    #[test]
    fn test_format_label() {
        assert_eq!(format_label(30.0), "30");
        assert_eq!(format_label(-5.0), "-5");
        assert_eq!(format_label(15.5), "15.5");
        assert_eq!(format_label(3.333333), "3.33");
        assert_eq!(format_label(0.0), "0");
    }

    #[test]
    fn test_value_range_includes_zero() {
        let range = value_range(&[10.0, 30.0]);
        assert_eq!(range.start, 0.0);
        assert!(range.end > 30.0);

        let range = value_range(&[-4.0, 8.0]);
        assert!(range.start < -4.0);
        assert!(range.end > 8.0);

        let range = value_range(&[-4.0, -2.0]);
        assert!(range.start < -4.0);
        assert_eq!(range.end, 0.0);
    }

    #[test]
    fn test_value_range_all_zero() {
        assert_eq!(value_range(&[0.0, 0.0]), 0.0..1.0);
    }

    #[test]
    fn test_category_label() {
        let categories = vec!["A".to_string(), "B".to_string()];
        assert_eq!(category_label(&categories, 0.0), "A");
        assert_eq!(category_label(&categories, 1.0), "B");
        assert_eq!(category_label(&categories, 0.5), "");
        assert_eq!(category_label(&categories, 2.0), "");
        assert_eq!(category_label(&categories, -1.0), "");
    }

    #[test]
    fn test_render_bars_length_mismatch() {
        let result = make_canvas().render_bars(&["A".to_string()], &[1.0, 2.0], &OutputFormat::Png);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("same length"));
    }

    #[test]
    fn test_render_bars_empty() {
        let result = make_canvas().render_bars(&[], &[], &OutputFormat::Png);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("no data"));
    }

    #[test]
    fn test_render_bars_png() {
        let categories = vec!["A".to_string(), "B".to_string()];
        let png = make_canvas()
            .render_bars(&categories, &[30.0, 5.0], &OutputFormat::Png)
            .unwrap();
        assert!(is_valid_png(&png));
    }

    #[test]
    fn test_render_bars_svg() {
        let categories = vec!["A".to_string(), "B".to_string()];
        let svg = make_canvas()
            .render_bars(&categories, &[30.0, -5.0], &OutputFormat::Svg)
            .unwrap();
        let text = String::from_utf8(svg).unwrap();
        assert!(text.contains("<svg"));
    }

    #[test]
    fn test_render_bars_rejects_oversized_canvas() {
        let canvas = Canvas::new(40000, 40000, "t".to_string(), "x".to_string(), "y".to_string());
        let result = canvas.render_bars(&["A".to_string()], &[1.0], &OutputFormat::Png);
        assert!(result.unwrap_err().to_string().contains("Invalid chart dimensions"));

        let canvas = Canvas::new(0, 480, "t".to_string(), "x".to_string(), "y".to_string());
        let result = canvas.render_bars(&["A".to_string()], &[1.0], &OutputFormat::Svg);
        assert!(result.is_err());
    }

    #[test]
    fn test_render_bars_rejects_non_finite_values() {
        let categories = vec!["A".to_string(), "B".to_string()];
        for bad in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let result = make_canvas().render_bars(&categories, &[bad, 5.0], &OutputFormat::Png);
            assert!(result.unwrap_err().to_string().contains("non-finite"));
        }
    }
}
