use std::path::PathBuf;

use hn_browse::RunOptions;

fn main() {
    let options = match handle_cli_flags() {
        Some(options) => options,
        None => return,
    };

    if let Err(err) = hn_browse::run(options) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

/// Parses the command line. Returns `None` when a flag was handled and the
/// program should exit without browsing.
fn handle_cli_flags() -> Option<RunOptions> {
    let mut options = RunOptions::default();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("HN-Browse {}", hn_browse::VERSION);
                return None;
            }
            "--help" | "-h" => {
                println!(
                    "HN-Browse — Walk Hacker News stories and comment threads from the terminal.\n\n  --config <path>      Read configuration from <path>\n  --version, -V        Show version and exit\n  --help,    -h        Show this help message\n\nKeys: s/w move, d drill in, a back out, o open in browser, q quit."
                );
                return None;
            }
            "--config" | "-c" => match args.next() {
                Some(path) => options.config_file = Some(PathBuf::from(path)),
                None => {
                    eprintln!("error: --config needs a path");
                    std::process::exit(2);
                }
            },
            other => {
                eprintln!("error: unknown argument {other:?} (see --help)");
                std::process::exit(2);
            }
        }
    }
    Some(options)
}
