//! packet-console binary entry point.

use std::process::ExitCode;
use std::rc::Rc;

use packet_console::cli::{self, Args};
use packet_console::{logging, Conf, ConsoleOptions, ConsoleSession, ExtensionRegistry, LineRepl};
use tracing::{error, info};

fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            cli::print_usage();
            return ExitCode::FAILURE;
        }
    };
    if args.help {
        cli::print_usage();
        return ExitCode::SUCCESS;
    }

    let conf = match Conf::load(&args) {
        Ok(conf) => conf,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    logging::try_init(conf.log_filter()).ok();
    info!(target: "packet_console::loading", "packet-console v{}", env!("CARGO_PKG_VERSION"));

    match run(conf, &args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(conf: Conf, args: &Args) -> packet_console::Result<()> {
    let mut console = ConsoleSession::new(
        conf.into_ref(),
        Rc::new(ExtensionRegistry::with_builtins()),
        ConsoleOptions::from_args(args),
    );
    console.bootstrap();
    console.run(LineRepl::new())
}
