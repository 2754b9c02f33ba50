use clap::Parser;
use std::sync::LazyLock;

pub static EXPLAIN_ARGS: LazyLock<ExplainArgs> = LazyLock::new(ExplainArgs::parse);

#[derive(Parser)]
#[command(
    about = "explain tells you why a system call failed, in plain English.",
    long_about = "explain tells you why a system call failed, in plain English.\n\n\
                  Describe the call and its arguments after the errno it failed with, e.g.\n  \
                  explain -e ENOENT open /etc/nothing O_RDONLY",
    version
)]
pub struct ExplainArgs {
    /// the errno the call failed with, by name (ENOENT) or number
    #[arg(short = 'e', long = "errno", value_name = "ERRNO")]
    pub errno: Option<String>,

    /// list the supported calls and their arguments
    #[arg(long, conflicts_with = "errno")]
    pub list: bool,

    /// explanation options, overriding EXPLAIN_OPTIONS (e.g. "no-numeric-errno,debug")
    #[arg(short = 'o', long = "options", value_name = "OPTIONS")]
    pub options: Option<String>,

    /// wrap the explanation to this many columns
    #[arg(short = 'w', long)]
    pub width: Option<usize>,

    /// never colour the output
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// the call name followed by its arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "CALL")]
    pub call: Vec<String>,
}
