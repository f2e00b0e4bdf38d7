use std::num::NonZeroUsize;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use owo_colors::OwoColorize;
use owo_colors::Stream;
use trace_lens::NodeSelector;
use trace_lens::RenderEntry;
use trace_lens::RenderPayload;
use trace_lens::ShowTracesRequest;
use trace_lens::TraceLensConfig;
use trace_lens::TraceResult;
use trace_lens::handle_show_traces_request;

use crate::absolutize;

const BAR_WIDTH: usize = 24;

#[derive(Debug, Parser)]
pub struct ShowCommand {
    /// Test file containing the declaration
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Line of the test declaration (1-based, as printed by `tests`)
    #[arg(long, value_name = "LINE", conflicts_with = "test", required_unless_present = "test")]
    pub line: Option<NonZeroUsize>,

    /// Title path of the test, outermost group first
    #[arg(long, num_args = 1.., value_name = "TITLE")]
    pub test: Vec<String>,

    /// Print the render payload as JSON
    #[arg(long)]
    pub json: bool,

    /// Include the full text of every trace
    #[arg(short, long)]
    pub verbose: bool,
}

impl ShowCommand {
    pub fn run(self, workspace_root: &Path, config: &TraceLensConfig) -> Result<()> {
        let selector = match self.line {
            Some(line) => NodeSelector::Line(line.get() - 1),
            None => NodeSelector::TitlePath(self.test.clone()),
        };
        let request = ShowTracesRequest {
            workspace_root: workspace_root.to_path_buf(),
            document: absolutize(&self.file)?,
            source: None,
            selector,
        };
        let payload = handle_show_traces_request(&request, config)
            .with_context(|| format!("failed to show traces for {}", self.file.display()))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&payload)?);
        } else {
            print_payload(&payload, self.verbose);
        }
        Ok(())
    }
}

fn print_payload(payload: &RenderPayload, verbose: bool) {
    let Some(test) = &payload.test else {
        println!("no test declaration in {} matches the selection", payload.document);
        return;
    };

    println!(
        "{} ({}:{})",
        test.label.if_supports_color(Stream::Stdout, |t| t.bold()),
        payload.document,
        test.line + 1
    );

    if payload.entries.is_empty() {
        println!("no traces recorded for this test");
        return;
    }

    println!(
        "{} traces over {}ms",
        payload.entries.len(),
        payload.window.duration_ms
    );
    for entry in &payload.entries {
        print_entry(entry, verbose);
    }
}

fn print_entry(entry: &RenderEntry, verbose: bool) {
    let bar = timeline_bar(entry.start_percent, entry.end_percent, BAR_WIDTH);
    let marker = match entry.record.result {
        TraceResult::Success => " ",
        TraceResult::Error => "!",
    };
    println!(
        "{} {marker} {} {}ms [{:.0}%..{:.0}%]",
        bar.if_supports_color(Stream::Stdout, |t| t.yellow()),
        entry.summary,
        entry.record.elapsed_ms,
        entry.start_percent,
        entry.end_percent
    );
    if verbose {
        for line in entry.plain_text.lines() {
            println!("    {line}");
        }
        println!();
    }
}

/// Fixed-width bar with the cells between the two percentages filled.
fn timeline_bar(start_percent: f64, end_percent: f64, width: usize) -> String {
    let cells: String = (0..width)
        .map(|cell| {
            let midpoint = (cell as f64 + 0.5) / width as f64 * 100.0;
            if midpoint >= start_percent && midpoint < end_percent {
                '#'
            } else {
                '.'
            }
        })
        .collect();
    format!("|{cells}|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn bar_fills_the_span() {
        assert_eq!(timeline_bar(0.0, 50.0, 8), "|####....|");
        assert_eq!(timeline_bar(25.0, 75.0, 8), "|..####..|");
        assert_eq!(timeline_bar(0.0, 0.0, 4), "|....|");
        assert_eq!(timeline_bar(-10.0, 200.0, 4), "|####|");
    }
}
