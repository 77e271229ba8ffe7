//! HTML report assembly
//!
//! Sections are rendered from any serializable result as `key : value` lines.
//! Every value, key and path is HTML-escaped.

use crate::errors::{AdvisorError, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const STYLE: &str = "\
body { font-family: Arial, sans-serif; background-color: #f4f4f4; color: #1e1e2e; margin: 0; padding: 0; }
h1, h2 { color: #0b3d91; }
h1 { text-align: center; padding: 20px; background-color: #e0e0e0; margin: 0; }
section { padding: 20px; margin: 10px 20px; background-color: #ffffff; border-radius: 8px; box-shadow: 0px 0px 5px #aaa; }
img { max-width: 100%; margin: 10px 0; border: 1px solid #ccc; border-radius: 5px; }
pre { background-color: #2d2d44; color: #cdd6f4; padding: 10px; border-radius: 5px; overflow-x: auto; }";

/// Escape the five HTML-significant characters
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

/// Top-level fields of `value` as display pairs; scalars become one `value` line
fn flatten<T: Serialize + ?Sized>(value: &T) -> Result<Vec<(String, String)>> {
    let json = serde_json::to_value(value)
        .map_err(|e| AdvisorError::InvalidInput(format!("cannot render section: {e}")))?;
    Ok(match json {
        serde_json::Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), display_value(v))).collect(),
        other => vec![("value".to_string(), display_value(&other))],
    })
}

#[derive(Debug, Clone, PartialEq)]
struct Section {
    title: &'static str,
    lines: Vec<(String, String)>,
}

/// Collects optional result sections and renders one HTML document
#[derive(Debug, Clone, Default)]
pub struct ReportBuilder {
    satellite: Option<Section>,
    irrigation: Option<Section>,
    disease: Option<Section>,
    export: Option<Section>,
    heatmaps: Vec<PathBuf>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn section<T: Serialize + ?Sized>(title: &'static str, value: &T) -> Result<Option<Section>> {
        Ok(Some(Section {
            title,
            lines: flatten(value)?,
        }))
    }

    pub fn satellite<T: Serialize + ?Sized>(mut self, analysis: &T) -> Result<Self> {
        self.satellite = Self::section("Satellite analysis", analysis)?;
        Ok(self)
    }

    pub fn irrigation<T: Serialize + ?Sized>(mut self, advice: &T) -> Result<Self> {
        self.irrigation = Self::section("Irrigation prediction", advice)?;
        Ok(self)
    }

    pub fn disease<T: Serialize + ?Sized>(mut self, diagnosis: &T) -> Result<Self> {
        self.disease = Self::section("Disease diagnosis", diagnosis)?;
        Ok(self)
    }

    pub fn export<T: Serialize + ?Sized>(mut self, recommendation: &T) -> Result<Self> {
        self.export = Self::section("Export recommendation", recommendation)?;
        Ok(self)
    }

    pub fn heatmap(mut self, path: impl Into<PathBuf>) -> Self {
        self.heatmaps.push(path.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.satellite.is_none()
            && self.irrigation.is_none()
            && self.disease.is_none()
            && self.export.is_none()
            && self.heatmaps.is_empty()
    }

    fn render_section(html: &mut String, section: &Section) {
        html.push_str(&format!("<section><h2>{}</h2><pre>", section.title));
        for (key, value) in &section.lines {
            html.push_str(&format!("{} : {}\n", escape_html(key), escape_html(value)));
        }
        html.push_str("</pre></section>\n");
    }

    pub fn render(&self) -> String {
        let mut html = format!(
            "<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Feralyx complete report</title>\n<style>\n{STYLE}\n</style>\n</head>\n<body>\n<h1>Feralyx - Complete report</h1>\n"
        );

        if let Some(section) = &self.satellite {
            Self::render_section(&mut html, section);
        }
        if !self.heatmaps.is_empty() {
            html.push_str("<section><h2>Heatmaps</h2>");
            for path in &self.heatmaps {
                let shown = escape_html(&path.display().to_string());
                if path.exists() {
                    html.push_str(&format!("<img src=\"{shown}\" alt=\"Heatmap\">"));
                } else {
                    html.push_str(&format!("<p>Heatmap not found: {shown}</p>"));
                }
            }
            html.push_str("</section>\n");
        }
        for section in [&self.irrigation, &self.disease, &self.export].into_iter().flatten() {
            Self::render_section(&mut html, section);
        }

        html.push_str("</body></html>\n");
        html
    }

    /// Write `report_complete_<timestamp>.html` under `dir`
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        self.write_at(dir, Local::now())
    }

    pub fn write_at(&self, dir: &Path, at: DateTime<Local>) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("report_complete_{}.html", at.format("%Y%m%d_%H%M%S")));
        fs::write(&path, self.render())?;
        info!(path = %path.display(), "wrote report");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use feralyx_core::IrrigationAdvice;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    #[test]
    fn escaping_covers_markup() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn sections_render_in_order_with_escaped_values() {
        let mut disease = BTreeMap::new();
        disease.insert("disease", "<script>alert(1)</script>");
        let html = ReportBuilder::new()
            .disease(&disease)
            .unwrap()
            .irrigation(&IrrigationAdvice {
                irrigate: true,
                flow_rate: 2.5,
                duration_minutes: 40.0,
                confidence: 91.2,
            })
            .unwrap()
            .heatmap("/nowhere/heatmap.png")
            .render();

        assert!(html.contains("flow_rate : 2.5\n"));
        assert!(html.contains("irrigate : true\n"));
        assert!(html.contains("disease : &lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("<p>Heatmap not found: /nowhere/heatmap.png</p>"));
        assert!(!html.contains("Satellite analysis"));

        let heatmaps = html.find("Heatmaps").unwrap();
        let irrigation = html.find("Irrigation prediction").unwrap();
        let diagnosis = html.find("Disease diagnosis").unwrap();
        assert!(heatmaps < irrigation && irrigation < diagnosis);
    }

    #[test]
    fn report_file_is_named_by_timestamp() {
        let dir = tempdir().unwrap();
        let existing = dir.path().join("map.png");
        fs::write(&existing, b"png").unwrap();

        let builder = ReportBuilder::new().export(&serde_json::json!({"crop": "ble"})).unwrap().heatmap(&existing);
        assert!(!builder.is_empty());
        let at = Local.with_ymd_and_hms(2024, 5, 1, 14, 30, 5).unwrap();
        let path = builder.write_at(&dir.path().join("reports"), at).unwrap();

        assert_eq!(path.file_name().unwrap(), "report_complete_20240501_143005.html");
        let html = fs::read_to_string(path).unwrap();
        assert!(html.contains("crop : ble"));
        assert!(html.contains("<img src="));
    }
}
