use anyhow::{bail, Context, Result};
use colored::Colorize;
use explain::{
    calls::{self, table},
    colors::GENERAL_TEXT_COLOR,
    errno_info,
    string_buffer::StringBuffer,
    writer, Call,
};
use std::io::{self, BufWriter, IsTerminal, Write};
use tracing_subscriber::EnvFilter;

mod cli;
use cli::EXPLAIN_ARGS;

fn main() -> Result<()> {
    let args = &*EXPLAIN_ARGS;
    if let Some(options) = &args.options {
        // read once, on first use, so this must come before any explaining
        std::env::set_var("EXPLAIN_OPTIONS", options);
    }
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("EXPLAIN_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    if args.list {
        print_table();
        return Ok(());
    }
    let Some(errno_text) = args.errno.as_deref() else {
        bail!("say which errno the call failed with, using -e (see --help)");
    };
    let errnum = table::parse_errno(errno_text)?;

    let mut echo = None;
    let text = match args.call.split_first() {
        None => {
            let mut sb = StringBuffer::default();
            errno_info::write_strerror(&mut sb, errnum);
            sb.into_string()
        }
        Some((name, words)) => {
            let call = table::parse(name, words).with_context(|| format!("cannot explain {name}"))?;
            echo = command_line(&call);
            calls::explain_errno(&call, errnum)
        }
    };

    let colored = !args.no_color && io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none();
    colored::control::set_override(colored);
    let width = args.width.unwrap_or_else(writer::terminal_width);
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    if let Some(echo) = echo {
        writeln!(out, "{}", echo.custom_color(*GENERAL_TEXT_COLOR))?;
    }
    if colored {
        writer::print_colored(&mut out, &text, width)?;
    } else {
        writer::print_plain(&mut out, &text, width)?;
    }
    out.flush()?;
    Ok(())
}

/// `$ ls -l 'my file'` for the exec family, as a shell would take it.
fn command_line(call: &Call) -> Option<String> {
    let argv = match call {
        Call::Execve { argv, .. } | Call::Execvp { argv, .. } => *argv,
        _ => return None,
    };
    let mut sb = StringBuffer::default();
    sb.puts("$");
    for arg in argv {
        sb.putc(' ');
        sb.puts_shell_quoted(arg);
    }
    Some(sb.into_string())
}

fn print_table() {
    use tabled::{builder::Builder, settings::Style};
    let mut builder = Builder::new();

    builder.push_record(["call", "family", "arguments"]);
    builder.push_record([""]);
    for spec in table::CALLS {
        let arguments = spec
            .args
            .iter()
            .map(|(name, kind)| format!("{name} ({})", kind.describe()))
            .collect::<Vec<_>>()
            .join(", ");
        builder.push_record([spec.name.to_owned(), spec.family.to_string(), arguments]);
    }
    let table = builder.build().with(Style::ascii_rounded()).to_string();

    println!("{}", table);
}
