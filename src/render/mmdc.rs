use std::path::PathBuf;
use std::process::Command;

use super::{DiagramEngine, RenderError};
use crate::diagram::RendererConfig;

/// Renders through the Mermaid command line tool (`mmdc`).
///
/// Each render runs in its own scratch directory, removed when the render
/// returns.
#[derive(Debug, Clone)]
pub struct MermaidCli {
    program: PathBuf,
    config: RendererConfig,
}

impl MermaidCli {
    pub fn new(program: impl Into<PathBuf>, config: RendererConfig) -> Self {
        Self {
            program: program.into(),
            config,
        }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }
}

impl Default for MermaidCli {
    fn default() -> Self {
        Self::new("mmdc", RendererConfig::default())
    }
}

impl DiagramEngine for MermaidCli {
    fn render(&self, source: &str) -> Result<String, RenderError> {
        let _scope = crate::perf::scope("render.mmdc");
        let scratch = tempfile::tempdir()?;
        let input = scratch.path().join("diagram.mmd");
        let output = scratch.path().join("diagram.svg");
        let config = scratch.path().join("config.json");
        std::fs::write(&input, source)?;
        std::fs::write(&config, self.config.engine_config_json())?;

        let result = Command::new(&self.program)
            .arg("--quiet")
            .arg("--input")
            .arg(&input)
            .arg("--output")
            .arg(&output)
            .arg("--configFile")
            .arg(&config)
            .arg("--backgroundColor")
            .arg("white")
            .output()
            .map_err(|source| RenderError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        crate::perf::log_event(
            "render.mmdc.exit",
            format!(
                "status={} source_bytes={}",
                result.status,
                source.len()
            ),
        );
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let message = stderr
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .unwrap_or("no output")
                .to_string();
            return Err(RenderError::Engine(format!("{}: {message}", result.status)));
        }

        Ok(std::fs::read_to_string(&output)?)
    }
}
