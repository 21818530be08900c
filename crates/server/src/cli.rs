use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "pw-dispatch-server")]
#[command(about = "Object-dispatch protocol server speaking length-prefixed JSON over stdio")]
#[command(version)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Seconds to spend closing contexts after the client disconnects
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub grace_period: u64,

    /// JSON file of extra param schemes merged over the built-in ones
    #[arg(long, value_name = "FILE")]
    pub schema: Option<PathBuf>,
}
