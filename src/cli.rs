//! Command line arguments and parameters management/parsing.
use std::path::PathBuf;

use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "cxprep",
    about = "Prepare MediaWiki HTML for sentence-aligned machine translation."
)]
/// Holds every command that is callable by the `cxprep` command.
pub enum Cxprep {
    #[structopt(about = "Run the preparation pipeline on a Parsoid HTML document")]
    Prep(Prep),
    #[structopt(about = "Parse and re-serialize a document deterministically")]
    Normalize(Normalize),
}

#[derive(Debug, StructOpt)]
/// Prep command and parameters.
pub struct Prep {
    #[structopt(parse(from_os_str), help = "input HTML file. Reads stdin if absent.")]
    pub input: Option<PathBuf>,
    #[structopt(
        short = "c",
        long = "config",
        parse(from_os_str),
        help = "removable-section rules (YAML)"
    )]
    pub config: Option<PathBuf>,
    #[structopt(
        short = "l",
        long = "language",
        default_value = "en",
        help = "source language code"
    )]
    pub language: String,
}

#[derive(Debug, StructOpt)]
/// Normalize command and parameters.
pub struct Normalize {
    #[structopt(parse(from_os_str), help = "input HTML file. Reads stdin if absent.")]
    pub input: Option<PathBuf>,
}
