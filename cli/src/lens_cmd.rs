use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use trace_lens::TraceLensConfig;
use trace_lens::document_language;
use trace_lens::document_lenses;

use crate::absolutize;

#[derive(Debug, Parser)]
pub struct LensCommand {
    /// Test file to scan
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Print the lenses as JSON
    #[arg(long)]
    pub json: bool,
}

impl LensCommand {
    pub fn run(self, config: &TraceLensConfig) -> Result<()> {
        let path = absolutize(&self.file)?;
        document_language(&path)?;
        let source = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", self.file.display()))?;
        let lenses = document_lenses(&path, &source, config);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&lenses)?);
            return Ok(());
        }

        if lenses.is_empty() {
            println!("no test declarations found in {}", self.file.display());
        }
        for lens in &lenses {
            println!("{:>5}: {}", lens.line + 1, lens.title_path);
        }
        Ok(())
    }
}
