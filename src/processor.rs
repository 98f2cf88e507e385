//! The QR code message processor.

use crate::config::{OutputFormat, RawConfig, TransformConfig};
use crate::error::Result;
use crate::message::{Message, MessageBatch};
use crate::pipeline::Processor;
use crate::qrcode::QrCode;
use crate::render;

/// Replaces each message's content with a QR code image of that content.
///
/// Holds only its read-only configuration, so one instance can serve many threads at once.
#[derive(Debug, Clone)]
pub struct QrCodeProcessor {
    config: TransformConfig,
}

impl QrCodeProcessor {
    pub fn new(config: TransformConfig) -> Self {
        tracing::info!(
            format = %config.format(),
            ecl = config.ecl().name(),
            scale = config.scale(),
            border = config.border(),
            "QR code processor ready"
        );
        Self { config }
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Encodes `payload` and renders it in the configured format.
    pub fn render(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let qr = QrCode::encode_payload(payload, self.config.ecl(), self.config.boost_ecl())?;
        let output = match self.config.format() {
            OutputFormat::Png => render::to_png(&qr, self.config.scale(), self.config.border())?,
            OutputFormat::Svg => render::to_svg_string(
                &qr,
                self.config.scale(),
                self.config.border(),
                self.config.svg(),
            )
            .into_bytes(),
        };
        tracing::debug!(
            payload_len = payload.len(),
            version = qr.version().value(),
            ecl = qr.error_correction_level().name(),
            content_type = self.config.format().mime_type(),
            output_len = output.len(),
            "Rendered QR code"
        );
        Ok(output)
    }
}

impl Processor for QrCodeProcessor {
    fn process(&self, mut message: Message) -> Result<MessageBatch> {
        let image = self.render(&message.as_bytes()?)?;
        message.set_bytes(image);
        Ok(vec![message])
    }
}

/// Builds a [`QrCodeProcessor`] from a TOML configuration section.
///
/// Matches the [`ProcessorFactory`](crate::pipeline::ProcessorFactory) signature, so it can be
/// handed straight to [`PipelineBuilder::with_stage`](crate::pipeline::PipelineBuilder::with_stage).
pub fn build(config: &toml::Value) -> Result<Box<dyn Processor>> {
    let config = RawConfig::from_toml_value(config)?.validate()?;
    Ok(Box::new(QrCodeProcessor::new(config)))
}
