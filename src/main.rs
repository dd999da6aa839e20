use anyhow::{Context, Result};
use clap::{CommandFactory, FromArgMatches, Parser};
use clap_extra::plugins::{AnsiStyle, render_session};
use clap_extra::{ExtraContext, echo, extra_group};
use log::{debug, info};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

/// clap-extra-demo - Showcase of the clap extensions
///
/// Every option can also be set in a configuration file, under a
/// [clap-extra-demo] table with one sub-table per subcommand.
///
/// Examples:
///   clap-extra-demo greet --name Alice
///   clap-extra-demo render session.log > session.html
#[derive(Parser, Debug)]
#[command(name = "clap-extra-demo", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print a greeting
    Greet(GreetArgs),

    /// Render an ANSI-colored terminal session to HTML
    Render(RenderArgs),

    /// Print the CSS rules used by rendered sessions
    Css(CssArgs),
}

#[derive(clap::Args, Debug)]
pub struct GreetArgs {
    /// Who to greet
    #[arg(long, value_name = "NAME", default_value = "World")]
    pub name: String,

    /// Greet loudly
    #[arg(long)]
    pub shout: bool,
}

#[derive(clap::Args, Debug)]
pub struct RenderArgs {
    /// Session transcript, standard input if omitted
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Either ansi-shell-session, ansi-console, ansi-pwsh-session or ansi-pycon
    #[arg(long, value_name = "LEXER", default_value = "ansi-shell-session")]
    pub lexer: String,
}

#[derive(clap::Args, Debug)]
pub struct CssArgs {
    /// Class of the HTML block the rules are scoped to
    #[arg(long, value_name = "CLASS", default_value = "highlight")]
    pub prefix: String,
}

fn greet(ctx: &ExtraContext, out: &mut dyn Write, args: GreetArgs) -> Result<()> {
    debug!("Greeting {}", args.name);
    let mut greeting = format!("Hello, {}!", args.name);
    if args.shout {
        greeting = greeting.to_uppercase();
    }
    echo(out, &ctx.theme.success.apply(&greeting), ctx.color)?;
    Ok(())
}

fn render(out: &mut dyn Write, args: RenderArgs) -> Result<()> {
    let transcript = match &args.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read standard input")?;
            text
        }
    };
    info!("Rendering {} bytes with {}", transcript.len(), args.lexer);
    write!(out, "{}", render_session(&args.lexer, &transcript)?)?;
    Ok(())
}

fn handle(ctx: &mut ExtraContext, out: &mut dyn Write) -> Result<()> {
    let cli = Cli::from_arg_matches(&ctx.matches)?;
    match cli.command {
        Commands::Greet(args) => greet(ctx, out, args),
        Commands::Render(args) => render(out, args),
        Commands::Css(args) => {
            write!(out, "{}", AnsiStyle.css(&args.prefix))?;
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    match extra_group(Cli::command()) {
        Ok(cli) => cli.main(handle),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_greet_parsing() {
        let cli = Cli::try_parse_from(["clap-extra-demo", "greet", "--name", "Alice", "--shout"])
            .unwrap();
        match cli.command {
            Commands::Greet(args) => {
                assert_eq!(args.name, "Alice");
                assert!(args.shout);
            }
            _ => panic!("Expected Greet command"),
        }
    }

    #[test]
    fn test_cli_render_parsing() {
        let cli = Cli::try_parse_from(["clap-extra-demo", "render", "session.log"]).unwrap();
        match cli.command {
            Commands::Render(args) => {
                assert_eq!(args.file, Some(PathBuf::from("session.log")));
                assert_eq!(args.lexer, "ansi-shell-session");
            }
            _ => panic!("Expected Render command"),
        }
    }

    #[test]
    fn test_extra_group_accepts_derived_command() {
        let cli = extra_group(Cli::command()).unwrap();
        let ids: Vec<&str> = cli
            .command()
            .get_arguments()
            .map(|arg| arg.get_id().as_str())
            .collect();
        assert!(ids.contains(&"verbosity"));
        assert!(ids.contains(&"version"));
    }
}
