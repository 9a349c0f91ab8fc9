//! CLI tool for extracting TLF titles and footnotes from a PDF into CSV

use clap::{Parser, ValueEnum};
use std::process;
use tlf_extract::{
    extract_to_csv, ExtractConfig, ExtractError, FootnotePolicy, IdAssignment, TitleShape,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// Scan every separator-bounded block on the page
    BlockScan,
    /// Everything below the N-th separator rule (see --separator-index)
    FixedCount,
    /// Keyword scan over the bottom fraction of the page (see --footer-fraction)
    FooterThreshold,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TitleShapeArg {
    /// Identifier and name on a single line
    Single,
    /// Fixed 3-line block: identifier, name, population
    Block,
}

/// Extract per-page titles and footnotes from a clinical TLF report PDF.
#[derive(Debug, Parser)]
#[command(name = "tlf2csv", version)]
struct Args {
    /// Input PDF file
    input: String,

    /// Output CSV file
    #[arg(short, long, default_value = "tlf_summary.csv")]
    output: String,

    /// Footnote extraction policy
    #[arg(long, value_enum, default_value = "block-scan")]
    policy: PolicyArg,

    /// Which separator rule bounds the footnote region (fixed-count policy,
    /// 1-indexed top to bottom)
    #[arg(long, default_value_t = 3)]
    separator_index: usize,

    /// Fraction of the page height cropped from the bottom (footer-threshold
    /// policy)
    #[arg(long, default_value_t = 0.4)]
    footer_fraction: f32,

    /// Assign footnote ids from leading "(N)" markers instead of sequentially
    /// (block-scan policy)
    #[arg(long)]
    explicit_ids: bool,

    /// Title layout of the document family
    #[arg(long, value_enum, default_value = "single")]
    title_shape: TitleShapeArg,

    /// Only accept titles with a colon after the identifier
    #[arg(long)]
    require_colon: bool,
}

impl Args {
    fn config(&self) -> ExtractConfig {
        let policy = match self.policy {
            PolicyArg::BlockScan => FootnotePolicy::BlockScan {
                ids: if self.explicit_ids {
                    IdAssignment::Explicit
                } else {
                    IdAssignment::Sequential
                },
            },
            PolicyArg::FixedCount => FootnotePolicy::FixedCount {
                separator_index: self.separator_index,
            },
            PolicyArg::FooterThreshold => FootnotePolicy::FooterThreshold {
                fraction: self.footer_fraction,
            },
        };
        ExtractConfig {
            title_shape: match self.title_shape {
                TitleShapeArg::Single => TitleShape::SingleLine,
                TitleShapeArg::Block => TitleShape::ThreeLineBlock,
            },
            require_colon: self.require_colon,
            policy,
        }
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    match extract_to_csv(&args.input, &args.output, &args.config()) {
        Ok(rows) => {
            println!("Extraction complete.");
            println!("Wrote {} row(s) to '{}'", rows, args.output);
        }
        Err(ExtractError::SourceNotFound(path)) => {
            eprintln!("Error: the file '{}' was not found.", path.display());
            process::exit(1);
        }
        Err(ExtractError::NoData) => {
            eprintln!("No data was extracted; output file not written.");
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
