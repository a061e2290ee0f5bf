//! CLI argument parsing for blockprof

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "blockprof")]
#[command(version)]
#[command(about = "Run a command as a profiling block and export the result", long_about = None)]
pub struct Cli {
    /// Profiler configuration file (TOML); defaults to a single log target
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Category recorded for the command block
    #[arg(long = "category", value_name = "NAME", default_value = "process")]
    pub category: String,

    /// Token recorded for the command block (defaults to the program name)
    #[arg(short = 't', long = "token", value_name = "NAME")]
    pub token: Option<String>,

    /// Enable debug output on stderr
    #[arg(long = "debug")]
    pub debug: bool,

    /// Command to profile (everything after --)
    #[arg(last = true)]
    pub command: Option<Vec<String>>,
}

impl Cli {
    /// Token for the block: explicit `--token` or the program name
    pub fn block_token(&self) -> Option<String> {
        self.token.clone().or_else(|| {
            self.command
                .as_ref()
                .and_then(|command| command.first().cloned())
        })
    }
}
