//! `tdiff`: compare two files with the textdiff engine.

use std::path::{Path, PathBuf};
use std::process;

use anyhow::Result;
use bstr::ByteSlice;
use clap::Parser;

use textdiff_lines::{compute_diff, DiffOptions, LinesDiff};

#[derive(Parser)]
#[command(name = "tdiff", about = "Line-and-character diff with move detection")]
struct Cli {
    /// Original file
    original: PathBuf,

    /// Modified file
    modified: PathBuf,

    /// Detect moved blocks
    #[arg(long)]
    moves: bool,

    /// Treat lines differing only in leading/trailing whitespace as equal
    #[arg(long)]
    ignore_trim_whitespace: bool,

    /// Give up on refinement after this many milliseconds (0 = no limit)
    #[arg(long, default_value_t = 0)]
    max_time: u64,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("cannot read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("binary file: {0}")]
    Binary(PathBuf),
}

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("fatal: {e}");
            process::exit(128);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let original = read_lines(&cli.original)?;
    let modified = read_lines(&cli.modified)?;
    let original_refs: Vec<&[u8]> = original.iter().map(|l| l.as_slice()).collect();
    let modified_refs: Vec<&[u8]> = modified.iter().map(|l| l.as_slice()).collect();

    let options = DiffOptions {
        ignore_trim_whitespace: cli.ignore_trim_whitespace,
        compute_moves: cli.moves,
        max_computation_time_ms: cli.max_time,
    };
    let diff = compute_diff(&original_refs, &modified_refs, &options);
    print!("{}", format_diff(&diff));
    if diff.hit_timeout {
        eprintln!("warning: time budget exceeded, result may be partial");
    }

    Ok(if diff.is_empty() { 0 } else { 1 })
}

/// Read a file as a line array. An empty file is one empty line; a file
/// with a trailing newline ends with its last non-empty line.
fn read_lines(path: &Path) -> Result<Vec<Vec<u8>>, CliError> {
    let content = std::fs::read(path)
        .map_err(|source| CliError::Read { path: path.to_path_buf(), source })?;
    if content.contains(&0) {
        return Err(CliError::Binary(path.to_path_buf()));
    }
    let lines: Vec<Vec<u8>> = content.lines().map(|l| l.to_vec()).collect();
    if lines.is_empty() {
        return Ok(vec![Vec::new()]);
    }
    Ok(lines)
}

fn format_diff(diff: &LinesDiff) -> String {
    let mut out = String::new();
    for c in &diff.changes {
        out.push_str(&format!("changed {} -> {}\n", c.original, c.modified));
        for ic in &c.inner_changes {
            out.push_str(&format!("    {ic}\n"));
        }
    }
    for m in &diff.moves {
        out.push_str(&format!(
            "moved {} -> {}\n",
            m.line_range_mapping.original, m.line_range_mapping.modified
        ));
        for c in &m.changes {
            out.push_str(&format!("    changed {} -> {}\n", c.original, c.modified));
        }
    }
    out
}
