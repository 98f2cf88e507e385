//! # qrcode-processor
//!
//! A stream-pipeline processor that replaces each message's content with a QR code image of that
//! content.
//!
//! The crate encodes payloads as QR Code Model 2 symbols (versions 1 to 40, four error correction
//! levels) and renders them as PNG or SVG. It carries its own encoder: segment modes, Reed–Solomon
//! error correction, module placement and mask selection.
//!
//! ## Features
//!
//! - Encode payloads in numeric, alphanumeric or byte mode, picked automatically.
//! - Four error correction levels, raised automatically when it costs no extra version.
//! - PNG output as an 8-bit grayscale raster with a configurable scale and quiet zone.
//! - SVG output with custom colors, an optional XML header, and an optional merged-outline path.
//! - A small pipeline host that builds processors from injected factories.
//! - Safe Rust implementation with no unsafe code.
//!
//! ## Example
//!
//! ```rust
//! use qrcode_processor::{Message, OutputFormat, Processor, QrCodeProcessor, TransformConfig};
//!
//! let config = TransformConfig::builder(OutputFormat::Svg).build().unwrap();
//! let processor = QrCodeProcessor::new(config);
//!
//! let batch = processor.process(Message::new("hello world")).unwrap();
//! let svg = batch[0].as_bytes().unwrap();
//! assert!(svg.starts_with(b"<svg"));
//! ```
//!
//! Processors are usually built from TOML by a [`Pipeline`]:
//!
//! ```rust
//! use qrcode_processor::{processor, Message, Pipeline};
//!
//! let section: toml::Table = toml::from_str("format = \"png\"\necl = \"high\"").unwrap();
//! let pipeline = Pipeline::builder()
//!     .with_stage("qrcode", processor::build, toml::Value::Table(section))
//!     .build()
//!     .unwrap();
//!
//! let batch = pipeline.process(Message::new("https://example.com")).unwrap();
//! assert!(batch[0].as_bytes().unwrap().starts_with(b"\x89PNG"));
//! pipeline.shutdown().unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration parsing and validation.
//! - [`processor`]: The message processor.
//! - [`pipeline`]: Processor trait, factories and the in-process host.
//! - [`qrcode`]: Core QR code encoding functionality.
//! - [`segment`]: Data segments and bit buffers.
//! - [`render`]: PNG and SVG output.
//! - `cli`: The command-line front end (feature `cli`).

pub mod config;
pub mod error;
pub mod message;
pub mod pipeline;
pub mod processor;
pub mod qrcode;
pub mod render;
pub mod segment;

#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "cli")]
pub mod logger;

#[cfg(test)]
mod reader;

pub use config::{OutputFormat, SvgStyle, TransformConfig};
pub use error::{QrError, Result};
pub use message::{Message, MessageBatch, Payload};
pub use pipeline::{Pipeline, Processor, ProcessorFactory};
pub use processor::QrCodeProcessor;
pub use qrcode::{QrCode, QrCodeEcc};
