use anyhow::Result;
use clap::Parser;

mod alias;
mod attribution;
mod blame;
mod commit;
mod diff;
mod driver;
mod topic;

/// Attribute staged changes to the topic-branch commits they fix up, and
/// create one `fixup!` commit per target.
#[derive(Parser)]
#[command(name = "git-fixup", version)]
struct Cli {
    /// Upstream revision to diff the topic branch against
    #[arg(default_value = "@{upstream}")]
    revision: String,

    /// Print per-hunk assignment decisions (repeat for a blame-diff table)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,

    /// Number of context lines to request when diffing and blaming
    #[arg(short = 'c', long = "context", default_value_t = 3)]
    context: usize,

    /// Strictness level: 0 = context, 1 = adjacent, 2 = surrounded
    #[arg(short = 's', long = "strict", default_value_t = 0)]
    strict: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = driver::RunConfig {
        revision: cli.revision,
        context: cli.context,
        // "repeatable, up to twice": verbosity beyond 2 has no further effect
        verbosity: cli.verbose.min(2),
        strictness: cli.strict,
    };

    driver::run(&config)
}
