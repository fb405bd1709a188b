//! Drives a parsed recipe sequentially against a staging rootfs, emitting a
//! layer per instruction and, on success, a new catalog entry.

use std::path::Path;

use hold_recipe::{Instruction, Keyword, Recipe};
use hold_store::{Catalog, Image, LayerStore, RuntimeConfig};
use log::{debug, info};

use crate::config::{parse_command, parse_key_value};
use crate::copy::copy_into_staging;
use crate::error::{Error, Result};
use crate::run::run_in_staging;

/// Drives recipe execution against the layer store and image catalog.
pub struct BuildExecutor<'a> {
    layers: &'a LayerStore,
    catalog: &'a Catalog,
}

impl<'a> BuildExecutor<'a> {
    /// Creates an executor bound to the given stores.
    pub fn new(layers: &'a LayerStore, catalog: &'a Catalog) -> Self {
        Self { layers, catalog }
    }

    /// Executes `recipe` against a fresh `staging` directory (must exist
    /// and be empty), resolving `COPY`/`ADD` sources relative to
    /// `context_dir`. On success, publishes the resulting image as
    /// `name[:tag]` and returns it. On failure, layers already created
    /// remain in the store but no image is published.
    pub fn execute(
        &self,
        recipe: &Recipe,
        context_dir: &Path,
        staging: &Path,
        name: &str,
        tag: Option<&str>,
    ) -> Result<Image> {
        let mut parent: Option<String> = None;
        let mut layer_chain: Vec<String> = Vec::new();
        let mut config = RuntimeConfig::default();

        for instruction in &recipe.instructions {
            debug!(
                "build: {} {} (line {})",
                instruction.keyword, instruction.argument, instruction.line
            );

            if instruction.keyword == Keyword::From {
                let (base_layers, base_config) = self.apply_from(instruction, staging)?;
                layer_chain = base_layers;
                parent = layer_chain.last().cloned();
                config = base_config;
                continue;
            }

            let mutated = self.apply_instruction(instruction, context_dir, staging, &mut config)?;

            let source = mutated.then_some(staging);
            let layer_id = self
                .layers
                .create(parent.as_deref(), &instruction_text(instruction), source)?;
            parent = Some(layer_id.clone());
            layer_chain.push(layer_id);
        }

        info!("build: publishing {name}:{} ({} layers)", tag.unwrap_or("latest"), layer_chain.len());
        Ok(self.catalog.create(name, tag, layer_chain, config)?)
    }

    /// Handles `FROM`: seeds staging from the base image (or leaves it
    /// empty for `scratch`), then records a single layer for the `FROM`
    /// step itself so the chain always has at least one entry.
    fn apply_from(&self, instruction: &Instruction, staging: &Path) -> Result<(Vec<String>, RuntimeConfig)> {
        let base = instruction.argument.trim();
        if base.is_empty() || base == "scratch" {
            let id = self.layers.create(None, &instruction_text(instruction), None)?;
            return Ok((vec![id], RuntimeConfig::default()));
        }

        let image = self
            .catalog
            .lookup_any(base)
            .map_err(|_| Error::NotFound(format!("base image not found: {base}")))?;

        for layer_id in &image.layers {
            self.layers.extract(layer_id, staging)?;
        }

        let id = self.layers.create(
            image.layers.last().map(String::as_str),
            &instruction_text(instruction),
            None,
        )?;
        let mut layers = image.layers.clone();
        layers.push(id);
        Ok((layers, image.config.clone()))
    }

    /// Applies a non-`FROM` instruction's effect on staging and/or config.
    /// Returns whether staging's contents changed (and so a full layer
    /// snapshot, rather than an empty layer, should be recorded).
    fn apply_instruction(
        &self,
        instruction: &Instruction,
        context_dir: &Path,
        staging: &Path,
        config: &mut RuntimeConfig,
    ) -> Result<bool> {
        let argument = instruction.argument.as_str();
        match instruction.keyword {
            Keyword::Run => {
                run_in_staging(staging, argument, instruction.line)?;
                Ok(true)
            }
            Keyword::Copy | Keyword::Add => {
                let spec = instruction
                    .copy
                    .as_ref()
                    .ok_or_else(|| Error::InvalidArgument(format!(
                        "{} at line {} requires a source and destination",
                        instruction.keyword, instruction.line
                    )))?;
                copy_into_staging(context_dir, staging, spec)?;
                Ok(true)
            }
            Keyword::Workdir => {
                std::fs::create_dir_all(staging.join(argument.trim_start_matches('/')))?;
                config.working_dir = Some(argument.to_owned());
                Ok(true)
            }
            Keyword::Volume => {
                std::fs::create_dir_all(staging.join(argument.trim_start_matches('/')))?;
                config.volumes.push(argument.to_owned());
                Ok(true)
            }
            Keyword::Env => {
                if let Some((k, v)) = parse_key_value(argument) {
                    config.env.push(format!("{k}={v}"));
                }
                Ok(false)
            }
            Keyword::Expose => {
                config.exposed_ports.push(argument.to_owned());
                Ok(false)
            }
            Keyword::User => {
                config.user = Some(argument.to_owned());
                Ok(false)
            }
            Keyword::Entrypoint => {
                config.entrypoint = parse_command(argument);
                Ok(false)
            }
            Keyword::Cmd => {
                config.cmd = parse_command(argument);
                Ok(false)
            }
            Keyword::Label => {
                if let Some((k, v)) = parse_key_value(argument) {
                    config.labels.insert(k, v);
                }
                Ok(false)
            }
            Keyword::Arg | Keyword::Onbuild | Keyword::Stopsignal | Keyword::Healthcheck | Keyword::Shell => {
                Ok(false)
            }
            Keyword::From => unreachable!("handled by apply_from"),
        }
    }
}

/// The text recorded on a layer's sidecar for a given instruction.
fn instruction_text(instruction: &Instruction) -> String {
    format!("{} {}", instruction.keyword, instruction.argument)
}
