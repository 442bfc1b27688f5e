use std::path::PathBuf;
use std::sync::LazyLock;

use clap::Parser;
use regex::Regex;

/// `-<N>f`, e.g. `-1000f` to follow the last 1000 lines
static TAIL_SHORTHAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-(\d+)f$").expect("tail shorthand pattern is valid"));

/// ktail - tail logs from many Kubernetes pods at once
///
/// Streams every selected pod into one console stream and keeps watching the
/// namespace, so pods created later are picked up once their container is
/// ready. `-<N>f` (for example `-1000f`) is shorthand for `--tail <N>`.
#[derive(Parser, Debug, Default)]
#[command(name = "ktail")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Kubernetes namespace (defaults to the current context's namespace)
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Pod to tail; repeat for several pods (defaults to every pod in the namespace)
    ///
    /// Other pods in the namespace are still picked up by the namespace
    /// watch once ready; add --no-watch to stream only these pods.
    #[arg(short, long = "pod", value_name = "POD")]
    pub pods: Vec<String>,

    /// Container name (defaults to each pod's first container)
    #[arg(short, long)]
    pub container: Option<String>,

    /// Number of lines to show from the end of each log
    #[arg(short, long, value_name = "LINES", value_parser = clap::value_parser!(i64).range(1..))]
    pub tail: Option<i64>,

    /// Kubernetes context name (defaults to in-cluster config, then the current context)
    #[arg(long, value_name = "CONTEXT")]
    pub context: Option<String>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Only stream the pods selected at startup
    #[arg(long)]
    pub no_watch: bool,

    /// Config file (defaults to ~/.config/ktail/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only print warnings and errors on stderr
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Parse the process arguments, honoring the `-<N>f` shorthand
    pub fn from_env() -> Self {
        Self::parse_with_shorthand(std::env::args().collect())
    }

    /// Parse `argv` (program name first)
    ///
    /// An explicit `--tail` wins over the shorthand.
    pub fn parse_with_shorthand(argv: Vec<String>) -> Self {
        let (argv, shorthand) = extract_tail_shorthand(argv);
        let mut args = Self::parse_from(argv);
        args.tail = args.tail.or(shorthand);
        args
    }
}

/// Remove the first `-<N>f` argument with a positive `N`
///
/// Returns the remaining arguments and the parsed tail length. Arguments
/// that do not match, or whose value is zero or out of range, are left in
/// place for clap to report.
pub fn extract_tail_shorthand(mut argv: Vec<String>) -> (Vec<String>, Option<i64>) {
    let found = argv.iter().enumerate().skip(1).find_map(|(idx, arg)| {
        let digits = TAIL_SHORTHAND.captures(arg)?.get(1)?.as_str();
        let lines = digits.parse::<i64>().ok().filter(|n| *n > 0)?;
        Some((idx, lines))
    });

    match found {
        Some((idx, lines)) => {
            argv.remove(idx);
            (argv, Some(lines))
        }
        None => (argv, None),
    }
}
