//! Processor configuration.
//!
//! [`RawConfig`] mirrors the configuration surface as it arrives from TOML (or any serde source).
//! [`RawConfig::validate`] is the single place where fields are checked and defaults applied,
//! producing the immutable [`TransformConfig`] the processor keeps for its lifetime.

use crate::error::{QrError, Result};
use crate::qrcode::QrCodeEcc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_SCALE: u32 = 10;
pub const DEFAULT_BORDER: u32 = 4;
pub const DEFAULT_LIGHT: &str = "#FFFFFF";
pub const DEFAULT_DARK: &str = "#000000";

/// Side in modules of the largest symbol (version 40).
const MAX_SYMBOL_SIDE: u64 = 177;

/// The image format a symbol is rendered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Png,
    Svg,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Svg => "image/svg+xml",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = QrError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "png" => Ok(Self::Png),
            "svg" => Ok(Self::Svg),
            other => Err(QrError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SVG output styling. Ignored for PNG, which is always black on white.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvgStyle {
    pub light: String,
    pub dark: String,
    pub xml_header: bool,
    pub optimal: bool,
}

impl Default for SvgStyle {
    fn default() -> Self {
        Self {
            light: DEFAULT_LIGHT.to_string(),
            dark: DEFAULT_DARK.to_string(),
            xml_header: false,
            optimal: false,
        }
    }
}

/// Validated, immutable transformation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformConfig {
    ecl: QrCodeEcc,
    format: OutputFormat,
    scale: u32,
    border: u32,
    svg: SvgStyle,
    boost_ecl: bool,
}

impl TransformConfig {
    /// Starts a programmatic configuration with every optional field at its default.
    pub fn builder(format: OutputFormat) -> TransformConfigBuilder {
        TransformConfigBuilder {
            draft: Self {
                ecl: QrCodeEcc::Medium,
                format,
                scale: DEFAULT_SCALE,
                border: DEFAULT_BORDER,
                svg: SvgStyle::default(),
                boost_ecl: true,
            },
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        RawConfig::from_toml_str(content)?.validate()
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        RawConfig::from_file(path)?.validate()
    }

    pub fn ecl(&self) -> QrCodeEcc {
        self.ecl
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Pixels (or SVG user units) per module.
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Quiet zone width in modules.
    pub fn border(&self) -> u32 {
        self.border
    }

    pub fn svg(&self) -> &SvgStyle {
        &self.svg
    }

    pub fn boost_ecl(&self) -> bool {
        self.boost_ecl
    }

    fn check(self) -> Result<Self> {
        validate_min("scale", i64::from(self.scale), 1)?;
        // A version 40 symbol plus its quiet zone must stay addressable in u32 pixels
        let side = MAX_SYMBOL_SIDE + 2 * u64::from(self.border);
        if side > u64::from(u32::MAX) {
            return Err(QrError::config("border", format!("value {} is too large", self.border)));
        }
        if side.checked_mul(u64::from(self.scale)).map_or(true, |px| px > u64::from(u32::MAX)) {
            return Err(QrError::config(
                "scale",
                format!("value {} makes a {side}-module image overflow", self.scale),
            ));
        }
        validate_color("svg.light", &self.svg.light)?;
        validate_color("svg.dark", &self.svg.dark)?;
        Ok(self)
    }
}

#[derive(Debug, Clone)]
pub struct TransformConfigBuilder {
    draft: TransformConfig,
}

impl TransformConfigBuilder {
    pub fn ecl(mut self, ecl: QrCodeEcc) -> Self {
        self.draft.ecl = ecl;
        self
    }

    pub fn scale(mut self, scale: u32) -> Self {
        self.draft.scale = scale;
        self
    }

    pub fn border(mut self, border: u32) -> Self {
        self.draft.border = border;
        self
    }

    pub fn light(mut self, color: impl Into<String>) -> Self {
        self.draft.svg.light = color.into();
        self
    }

    pub fn dark(mut self, color: impl Into<String>) -> Self {
        self.draft.svg.dark = color.into();
        self
    }

    pub fn xml_header(mut self, enabled: bool) -> Self {
        self.draft.svg.xml_header = enabled;
        self
    }

    pub fn optimal(mut self, enabled: bool) -> Self {
        self.draft.svg.optimal = enabled;
        self
    }

    pub fn boost_ecl(mut self, enabled: bool) -> Self {
        self.draft.boost_ecl = enabled;
        self
    }

    pub fn build(self) -> Result<TransformConfig> {
        self.draft.check()
    }
}

/// Configuration as written by the user, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ecl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub svg: Option<RawSvgConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boost_ecl: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawSvgConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dark: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xml_header: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimal: Option<bool>,
}

impl RawConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| QrError::config("toml", e.to_string()))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// Reads a processor's section out of a larger TOML document.
    pub fn from_toml_value(value: &toml::Value) -> Result<Self> {
        value
            .clone()
            .try_into()
            .map_err(|e: toml::de::Error| QrError::config("toml", e.to_string()))
    }

    pub fn to_toml_value(&self) -> Result<toml::Value> {
        toml::Value::try_from(self).map_err(|e| QrError::config("toml", e.to_string()))
    }

    /// Applies defaults and checks every field, format included.
    pub fn validate(self) -> Result<TransformConfig> {
        let format: OutputFormat = self
            .format
            .as_deref()
            .ok_or_else(|| QrError::config("format", "missing required field"))?
            .parse()?;

        let ecl = match self.ecl.as_deref() {
            None => QrCodeEcc::Medium,
            Some(name) => parse_ecl(name).ok_or_else(|| {
                QrError::config(
                    "ecl",
                    format!("unknown level `{name}`, expected one of: low, medium, quartile, high"),
                )
            })?,
        };

        let scale = validate_min("scale", self.scale.unwrap_or(i64::from(DEFAULT_SCALE)), 1)?;
        let border = validate_min("border", self.border.unwrap_or(i64::from(DEFAULT_BORDER)), 0)?;

        let svg = self.svg.unwrap_or_default();
        let style = SvgStyle {
            light: svg.light.unwrap_or_else(|| DEFAULT_LIGHT.to_string()),
            dark: svg.dark.unwrap_or_else(|| DEFAULT_DARK.to_string()),
            xml_header: svg.xml_header.unwrap_or(false),
            optimal: svg.optimal.unwrap_or(false),
        };

        TransformConfig {
            ecl,
            format,
            scale,
            border,
            svg: style,
            boost_ecl: self.boost_ecl.unwrap_or(true),
        }
        .check()
    }
}

pub fn parse_ecl(name: &str) -> Option<QrCodeEcc> {
    match name {
        "low" => Some(QrCodeEcc::Low),
        "medium" => Some(QrCodeEcc::Medium),
        "quartile" => Some(QrCodeEcc::Quartile),
        "high" => Some(QrCodeEcc::High),
        _ => None,
    }
}

fn validate_min(field_name: &str, value: i64, min_value: i64) -> Result<u32> {
    if value < min_value {
        return Err(QrError::config(
            field_name,
            format!("value must be at least {min_value}, got {value}"),
        ));
    }
    u32::try_from(value).map_err(|_| QrError::config(field_name, format!("value {value} is too large")))
}

/// Colors are written verbatim into an SVG attribute, so anything that could end it is refused.
fn validate_color(field_name: &str, color: &str) -> Result<()> {
    if color.trim().is_empty() {
        return Err(QrError::config(field_name, "color cannot be empty"));
    }
    if let Some(c) = color.chars().find(|c| matches!(c, '"' | '<' | '>' | '&')) {
        return Err(QrError::config(
            field_name,
            format!("color contains forbidden character `{c}`"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn field_of(err: QrError) -> String {
        match err {
            QrError::Config { field, .. } => field,
            other => panic!("expected a config error, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_applied() {
        let config = TransformConfig::from_toml_str(r#"format = "png""#).unwrap();
        assert_eq!(config.format(), OutputFormat::Png);
        assert_eq!(config.ecl(), QrCodeEcc::Medium);
        assert_eq!(config.scale(), 10);
        assert_eq!(config.border(), 4);
        assert_eq!(config.svg(), &SvgStyle::default());
        assert!(config.boost_ecl());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r##"
format = "svg"
ecl = "high"
scale = 3
border = 0
boostEcl = false

[svg]
light = "#F8FAFC"
dark = "#0F172A"
xmlHeader = true
optimal = true
"##;
        let config = TransformConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.format(), OutputFormat::Svg);
        assert_eq!(config.ecl(), QrCodeEcc::High);
        assert_eq!(config.scale(), 3);
        assert_eq!(config.border(), 0);
        assert!(!config.boost_ecl());
        assert_eq!(config.svg().light, "#F8FAFC");
        assert_eq!(config.svg().dark, "#0F172A");
        assert!(config.svg().xml_header);
        assert!(config.svg().optimal);
    }

    #[test]
    fn test_missing_format_is_config_error() {
        let err = TransformConfig::from_toml_str("scale = 2").unwrap_err();
        assert_eq!(field_of(err), "format");
    }

    #[test]
    fn test_unknown_format_rejected_at_config_time() {
        let err = TransformConfig::from_toml_str(r#"format = "gif""#).unwrap_err();
        assert!(matches!(err, QrError::UnsupportedFormat(ref f) if f == "gif"));
    }

    #[test]
    fn test_invalid_fields_are_named() {
        let cases = [
            (r#"format = "png"
ecl = "extreme""#, "ecl"),
            (r#"format = "png"
scale = 0"#, "scale"),
            (r#"format = "png"
border = -1"#, "border"),
            (r#"format = "png"
scale = 99999999999"#, "scale"),
            (r#"format = "svg"
svg = { light = "" }"#, "svg.light"),
            (r#"format = "svg"
svg = { dark = "red\" onload=\"x" }"#, "svg.dark"),
            (r#"format = "png"
colour = "red""#, "toml"),
            (r#"format = "png"
scale = "ten""#, "toml"),
        ];
        for (toml_content, field) in cases {
            let err = TransformConfig::from_toml_str(toml_content).unwrap_err();
            assert_eq!(field_of(err), field, "{toml_content}");
        }
    }

    #[test]
    fn test_oversized_image_rejected() {
        for format in ["png", "svg"] {
            let cases = [
                ("scale = 4294967295\nborder = 4294967295", "border"),
                ("scale = 4294967295\nborder = 4", "scale"),
                ("scale = 23216040\nborder = 4", "scale"),
            ];
            for (fields, field) in cases {
                let toml_content = format!("format = \"{format}\"\n{fields}");
                let err = TransformConfig::from_toml_str(&toml_content).unwrap_err();
                assert_eq!(field_of(err), field, "{toml_content}");
            }
            // (177 + 8) * 23216039 is the last fit in u32
            let toml_content = format!("format = \"{format}\"\nscale = 23216039\nborder = 4");
            assert!(TransformConfig::from_toml_str(&toml_content).is_ok());
        }
    }

    #[test]
    fn test_mime_types() {
        assert_eq!(OutputFormat::Png.mime_type(), "image/png");
        assert_eq!(OutputFormat::Svg.mime_type(), "image/svg+xml");
        assert_eq!("svg".parse::<OutputFormat>().unwrap().to_string(), "svg");
    }

    #[test]
    fn test_builder_validates() {
        let config = TransformConfig::builder(OutputFormat::Svg)
            .ecl(QrCodeEcc::Low)
            .scale(2)
            .border(1)
            .dark("navy")
            .build()
            .unwrap();
        assert_eq!(config.svg().dark, "navy");
        assert_eq!(config.scale(), 2);

        let err = TransformConfig::builder(OutputFormat::Png).scale(0).build().unwrap_err();
        assert_eq!(field_of(err), "scale");
    }

    #[test]
    fn test_raw_config_round_trips_through_toml_value() {
        let raw = RawConfig {
            format: Some("svg".to_string()),
            scale: Some(4),
            svg: Some(RawSvgConfig {
                optimal: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };
        let value = raw.to_toml_value().unwrap();
        assert_eq!(RawConfig::from_toml_value(&value).unwrap(), raw);
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"format = \"svg\"\necl = \"quartile\"\n")
            .unwrap();

        let config = TransformConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.format(), OutputFormat::Svg);
        assert_eq!(config.ecl(), QrCodeEcc::Quartile);
    }

    #[test]
    fn test_config_from_missing_file() {
        let err = TransformConfig::from_file("/nonexistent/qrcode.toml").unwrap_err();
        assert!(matches!(err, QrError::Io(_)));
    }
}
