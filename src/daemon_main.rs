use std::env::args;

use anyhow::Result;
use clap::Parser;
use sidekick::{
    daemon::{args::DaemonArgs, start_daemon},
    utils::{
        dir::AppPaths,
        logging::{enable_logging, DAEMON_PREFIX},
        runtime::single_thread_runtime,
    },
};

fn main() {
    run_service(args().collect::<Vec<_>>()).unwrap();
}

fn run_service(command_args: Vec<String>) -> Result<()> {
    let args = DaemonArgs::parse_from(&command_args);

    if !args.force {
        #[cfg(unix)]
        {
            use daemonize::Daemonize;
            use tracing::error;

            let daemonize = Daemonize::new()
                .stdout(daemonize::Stdio::devnull())
                .stderr(daemonize::Stdio::devnull())
                .execute();
            match daemonize {
                daemonize::Outcome::Parent(parent) => {
                    parent
                        .inspect_err(|e| error!("Failed to create daemon on parent side {e:?}"))?;
                    println!("Created daemon");
                    return Ok(());
                }
                daemonize::Outcome::Child(_) => (),
            }
        }
    }

    run(args)
}

fn run(args: DaemonArgs) -> Result<()> {
    let paths = AppPaths::resolve(args.dir)?;
    enable_logging(DAEMON_PREFIX, &paths.logs(), args.log, args.log_console)?;
    single_thread_runtime()?.block_on(async move { start_daemon(paths).await })?;
    Ok(())
}
