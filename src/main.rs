// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::{Context, Result};
use clap::Parser as CliParser;
use log::{info, LevelFilter};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;

use mysqldump_scrambler::cursor::DEFAULT_CAPACITY;
use mysqldump_scrambler::scrambler::DEFAULT_MAX_ATTEMPTS;
use mysqldump_scrambler::{ObfuscatingHandler, Parser, Policy, Scrambler};

/// Pseudonymize the text values of a mysqldump file.
#[derive(CliParser, Debug)]
#[command(name = "mysqldump-scrambler", version)]
struct Args {
    /// Dump to read; standard input when omitted
    input: Option<PathBuf>,

    /// Where to write the scrambled dump; standard output when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON exemption policy replacing the built-in one
    #[arg(long)]
    policy: Option<PathBuf>,

    /// Size in bytes of the input window
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    buffer_size: usize,

    /// Candidates tried for a short value before giving up
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: usize,

    /// More logging on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let policy = match &args.policy {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("opening policy {}", path.display()))?;
            Policy::from_reader(BufReader::new(file))
                .with_context(|| format!("reading policy {}", path.display()))?
        }
        None => Policy::default(),
    };

    let input: Box<dyn Read> = match &args.input {
        Some(path) => Box::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        ),
        None => Box::new(io::stdin()),
    };

    let output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(io::stdout()),
    };

    let scrambler = Scrambler::new().with_max_attempts(args.max_attempts);
    let handler = ObfuscatingHandler::new(BufWriter::new(output), scrambler, policy);

    let mut parser = Parser::with_capacity(input, args.buffer_size, handler);
    let outcome = parser.parse();

    // Whatever was converted before a failure stays written.
    let handler = parser.into_handler();
    let stats = handler.stats();
    handler
        .into_inner()
        .flush()
        .context("flushing output")?;

    outcome.context("scrambling dump")?;

    info!(
        "{} table(s), {} row(s): {} value(s) scrambled, {} replaced, {} note(s)",
        stats.tables, stats.rows, stats.scrambled, stats.replaced, stats.notes
    );
    Ok(())
}
