use clap::Parser;
use std::process::ExitCode;
use stored::cli::{Cli, commands};
use stored::config::{self, AppConfig};
use stored::format::OutputContext;
use stored::logging::{LogSettings, init_logging};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded =
        config::load_config(&cli.overrides()).and_then(|layer| AppConfig::from_layer(&layer));
    let config = match loaded {
        Ok(config) => config,
        Err(err) => {
            let ctx = OutputContext::from_flags(cli.json, cli.quiet);
            report(&ctx, &ctx.render_error(&err));
            return exit_code(err.code().exit_code());
        }
    };
    let ctx = OutputContext::from_flags(config.json, cli.quiet);

    let settings = LogSettings {
        verbosity: cli.verbose,
        quiet: cli.quiet,
        level: config.log_level.clone(),
        file: cli.log_file.clone(),
        json: config.log_json,
    };
    if let Err(err) = init_logging(&settings) {
        eprintln!("Error: {err:#}");
        return ExitCode::FAILURE;
    }

    match commands::dispatch(&cli.command, &config, &ctx) {
        Ok(code) => code,
        Err(err) => {
            tracing::debug!(error = ?err, "Command failed");
            report(&ctx, &ctx.render_error(&err));
            exit_code(err.code().exit_code())
        }
    }
}

/// JSON errors go to stdout alongside normal output; text errors to stderr.
fn report(ctx: &OutputContext, rendered: &str) {
    if ctx.is_json() {
        println!("{rendered}");
    } else {
        eprintln!("{rendered}");
    }
}

fn exit_code(code: i32) -> ExitCode {
    u8::try_from(code).map_or(ExitCode::FAILURE, ExitCode::from)
}
