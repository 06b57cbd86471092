use std::io::Read;
use std::path::Path;

use structopt::StructOpt;

#[macro_use]
extern crate log;

mod cli;

use cxprep::config::PrepConfig;
use cxprep::error::Error;
use cxprep::processor::{self, Processor};

fn main() -> Result<(), Error> {
    env_logger::init();

    let opt = cli::Cxprep::from_args();
    debug!("cli args\n{:#?}", opt);

    match opt {
        cli::Cxprep::Prep(prep) => {
            let config = match &prep.config {
                Some(path) => PrepConfig::from_path(path)?,
                None => PrepConfig::default(),
            };
            let html = read_input(prep.input.as_deref())?;
            let processor = Processor::new(&config)?;
            let result = processor.process(&html, &prep.language)?;
            println!("{}", result);
        }
        cli::Cxprep::Normalize(normalize) => {
            let html = read_input(normalize.input.as_deref())?;
            println!("{}", processor::normalize(&html)?);
        }
    }
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String, Error> {
    match path {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut html = String::new();
            std::io::stdin().read_to_string(&mut html)?;
            Ok(html)
        }
    }
}
