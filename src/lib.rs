// Library exports for pivotchart

pub mod data;
pub mod error;
pub mod graph;
pub mod loader;
pub mod pivot;
pub mod runtime;
pub mod session;
pub mod table;
pub mod theme;

pub use error::{PivotError, Result};
pub use pivot::{Aggregation, PivotResult, PivotSpec};
pub use runtime::ChartSpec;
pub use session::Session;

use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[serde(rename = "png")]
    #[default]
    Png,
    #[serde(rename = "svg")]
    Svg,
}

impl OutputFormat {
    /// Pick the format from an output path's extension, PNG unless it ends in .svg
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("svg") => OutputFormat::Svg,
            _ => OutputFormat::Png,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderOptions {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default, rename = "type")]
    pub format: OutputFormat,
}

fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            format: OutputFormat::Png,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_path() {
        assert_eq!(OutputFormat::from_path(Path::new("chart.svg")), OutputFormat::Svg);
        assert_eq!(OutputFormat::from_path(Path::new("chart.SVG")), OutputFormat::Svg);
        assert_eq!(OutputFormat::from_path(Path::new("chart.png")), OutputFormat::Png);
        assert_eq!(OutputFormat::from_path(Path::new("chart")), OutputFormat::Png);
    }

    #[test]
    fn test_render_options_from_json() {
        let options: RenderOptions =
            serde_json::from_str(r#"{"width": 1024, "type": "svg"}"#).unwrap();
        assert_eq!(options.width, 1024);
        assert_eq!(options.height, 600);
        assert_eq!(options.format, OutputFormat::Svg);
    }
}
