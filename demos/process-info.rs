//! Prints the command line, working directory and environment size of
//! every process that can be inspected.
//!
//! Pass `--recorded` to read the command line recorded at process creation
//! instead of the live one.

#[cfg(windows)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use procpeek::{ProcError, ProcessAccess};

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let use_live_block = !std::env::args().any(|arg| arg == "--recorded");
    let processes = procpeek::processes();

    let pids = procpeek::list_pids()?;
    tracing::info!(count = pids.len(), use_live_block, "listing processes");

    for pid in pids {
        let name = match processes.process_info(pid) {
            Ok(entry) => entry.image_name,
            Err(ProcError::NotFound(_)) => continue,
            Err(err) => {
                tracing::warn!(%pid, %err, "snapshot lookup failed");
                String::new()
            }
        };

        // Probe once up front so that inaccessible processes produce a single
        // line of output.
        if let Err(err) = procpeek::open_handle(pid, ProcessAccess::QUERY_AND_READ) {
            println!("{:>6} {name}: {err}", pid.0);
            continue;
        }

        println!("{:>6} {name}", pid.0);

        match procpeek::command_line(pid, use_live_block) {
            Ok(arguments) => println!("       argv: {arguments:?}"),
            Err(err) => println!("       argv: {err}"),
        }

        match procpeek::current_directory(pid) {
            Ok(directory) => println!("       cwd:  {directory}"),
            Err(err) => println!("       cwd:  {err}"),
        }

        match procpeek::environment(pid) {
            Ok(environment) => println!(
                "       env:  {} variables",
                environment.split_terminator('\0').count()
            ),
            Err(err) => println!("       env:  {err}"),
        }
    }

    Ok(())
}

#[cfg(not(windows))]
fn main() {
    eprintln!("process-info only runs on Windows");
}
