//! A minimal in-process host for processors.
//!
//! Processors are not registered globally. Each stage is built from a [`ProcessorFactory`] that
//! the caller hands to [`PipelineBuilder::with_stage`] together with the stage's configuration.

use crate::error::Result;
use crate::message::{Message, MessageBatch};
use std::fmt;

/// A per-message transformation.
pub trait Processor: Send + Sync {
    /// Transforms one message into zero or more messages.
    fn process(&self, message: Message) -> Result<MessageBatch>;

    /// Releases resources at shutdown.
    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Builds a processor from its configuration section.
pub trait ProcessorFactory: Send + Sync {
    fn build(&self, config: &toml::Value) -> Result<Box<dyn Processor>>;
}

impl<F> ProcessorFactory for F
where
    F: Fn(&toml::Value) -> Result<Box<dyn Processor>> + Send + Sync,
{
    fn build(&self, config: &toml::Value) -> Result<Box<dyn Processor>> {
        self(config)
    }
}

struct Stage {
    name: String,
    processor: Box<dyn Processor>,
}

pub struct Pipeline {
    stages: Vec<Stage>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names().collect::<Vec<_>>())
            .finish()
    }
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn stage_names(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(|s| s.name.as_str())
    }

    /// Runs one message through every stage in order. The first failing stage aborts the
    /// message and its error is returned unchanged.
    pub fn process(&self, message: Message) -> Result<MessageBatch> {
        let mut batch = vec![message];
        for stage in &self.stages {
            let mut next = Vec::with_capacity(batch.len());
            for msg in batch {
                let out = stage.processor.process(msg).inspect_err(|e| {
                    tracing::debug!(stage = %stage.name, error = %e, "Stage failed");
                })?;
                next.extend(out);
            }
            batch = next;
        }
        Ok(batch)
    }

    /// Closes every stage, even after a failure, and returns the first error.
    pub fn shutdown(self) -> Result<()> {
        let mut first_error = None;
        for stage in &self.stages {
            if let Err(e) = stage.processor.close() {
                tracing::warn!(stage = %stage.name, error = %e, "Failed to close stage");
                first_error.get_or_insert(e);
            }
        }
        tracing::info!(stages = self.stages.len(), "Pipeline shut down");
        first_error.map_or(Ok(()), Err)
    }
}

#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<(String, Box<dyn ProcessorFactory>, toml::Value)>,
}

impl fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field(
                "stages",
                &self.stages.iter().map(|(name, _, _)| name.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl PipelineBuilder {
    pub fn with_stage(
        mut self,
        name: impl Into<String>,
        factory: impl ProcessorFactory + 'static,
        config: toml::Value,
    ) -> Self {
        self.stages.push((name.into(), Box::new(factory), config));
        self
    }

    /// Builds every stage. A configuration error in any stage fails the whole pipeline.
    pub fn build(self) -> Result<Pipeline> {
        let mut stages = Vec::with_capacity(self.stages.len());
        for (name, factory, config) in self.stages {
            let processor = factory.build(&config).inspect_err(|e| {
                tracing::error!(stage = %name, error = %e, "Failed to build stage");
            })?;
            stages.push(Stage { name, processor });
        }
        Ok(Pipeline { stages })
    }
}
