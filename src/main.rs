// src/main.rs
//
// canonhtml: normalize editor-produced HTML into canonical, indented markup
//
// - Reads INPUT (a file, or '-' for stdin) and writes the result to OUTPUT. With no OUTPUT the
//   input file is overwritten; stdin input, or --stdout, writes to standard output.
// - Options come from the `[normalize]` table of --config FILE, then command-line flags on top.
// - --prepare runs the load direction instead: markup inside code blocks is escaped for an
//   editing surface.
// - Logging goes to stderr; RUST_LOG overrides the default `canonhtml=info`.
//
// CLI flags:
//   --config FILE         : TOML config file
//   --div-fixup           : rename div to p, wrap leading orphan text
//   --compact             : single-line output
//   --line-ending MODE    : preserve | crlf | lf, for restored code blocks
//   --strip-attr NAME     : strip this attribute too (repeatable)
//   --prepare             : escape code blocks for editing instead of normalizing
//   --stdout              : write to stdout instead of overwriting the input

use anyhow::{bail, Context};
use canonhtml::logging::setup_logging;
use canonhtml::{Config, LineEnding, NormalizeOptions, Normalizer};
use clap::{ArgAction, Parser};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// CLI flags
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// TOML config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Rename div to p and wrap leading orphan text in a paragraph
    #[arg(long = "div-fixup", action = ArgAction::SetTrue)]
    div_fixup: bool,

    /// Remove the indentation layout, producing single-line markup
    #[arg(long, action = ArgAction::SetTrue)]
    compact: bool,

    /// Line endings written into restored code blocks
    #[arg(long = "line-ending", value_enum, value_name = "MODE")]
    line_ending: Option<LineEnding>,

    /// Additional attribute to strip from every tag (repeatable)
    #[arg(long = "strip-attr", value_name = "NAME")]
    strip_attr: Vec<String>,

    /// Escape markup inside code blocks for an editing surface instead of normalizing
    #[arg(long, action = ArgAction::SetTrue)]
    prepare: bool,

    /// Write to stdout instead of overwriting the input
    #[arg(long, action = ArgAction::SetTrue)]
    stdout: bool,

    /// Input file ('-' for stdin)
    input: PathBuf,

    /// Output file (default: overwrite input)
    output: Option<PathBuf>,
}

impl Cli {
    fn reads_stdin(&self) -> bool {
        self.input == Path::new("-")
    }

    fn options(&self) -> anyhow::Result<NormalizeOptions> {
        let mut options = match &self.config {
            Some(path) => match Config::load_from_path(path)? {
                Some(config) => config.normalize,
                None => bail!("config file {} does not exist", path.display()),
            },
            None => NormalizeOptions::default(),
        };

        // Precedence: flags override the config file.
        if self.div_fixup {
            options.apply_div_to_paragraph_fixup = true;
        }
        if self.compact {
            options.compact = true;
        }
        if let Some(ending) = self.line_ending {
            options.code_line_ending = ending;
        }
        options
            .strip_attributes
            .extend(self.strip_attr.iter().map(|name| name.to_ascii_lowercase()));
        Ok(options)
    }
}

fn read_input(cli: &Cli) -> anyhow::Result<String> {
    if cli.reads_stdin() {
        let mut src = String::new();
        io::stdin()
            .read_to_string(&mut src)
            .context("failed to read markup from stdin")?;
        return Ok(src);
    }
    fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))
}

fn write_output(cli: &Cli, out: &str) -> anyhow::Result<()> {
    let target = match &cli.output {
        Some(path) => Some(path),
        None if cli.stdout || cli.reads_stdin() => None,
        None => Some(&cli.input),
    };
    match target {
        Some(path) => {
            fs::write(path, out).with_context(|| format!("failed to write {}", path.display()))
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(out.as_bytes())
                .and_then(|()| stdout.write_all(b"\n"))
                .context("failed to write to stdout")
        }
    }
}

fn main() -> anyhow::Result<()> {
    setup_logging("canonhtml=info");
    let cli = Cli::parse();

    let normalizer = Normalizer::new(cli.options()?);
    let src = read_input(&cli)?;

    let out = if cli.prepare {
        normalizer.prepare_for_editing(&src)
    } else {
        let mut log_block = |index: usize, content: &str| {
            debug!(index, bytes = content.len(), "restored code block");
        };
        let normalized = normalizer.normalize_with_sink(&src, &mut log_block);
        info!(
            input_bytes = src.len(),
            output_bytes = normalized.markup.len(),
            code_blocks = normalized.code_blocks.len(),
            "normalized"
        );
        normalized.markup
    };

    write_output(&cli, &out)
}
