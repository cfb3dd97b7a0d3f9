use std::{io::Write as _, path::PathBuf};

use clap::Command;

fn main() {
    let command = Command::new("glyphs2font")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Generate an icon web font from individual SVG glyph files")
        .arg(
            clap::Arg::new("config")
                .help("Path to the YAML configuration file")
                .required(true)
                .index(1),
        )
        .arg(
            clap::Arg::new("verbosity")
                .short('v')
                .long("verbosity")
                .help("Set the level of verbosity")
                .action(clap::ArgAction::Count),
        );

    let args = match command.try_get_matches() {
        Ok(args) => args,
        Err(err) => {
            if let Err(print_err) = err.print() {
                eprintln!("glyphs2font: ERROR: {}", print_err);
                std::process::exit(1);
            }
            std::process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };
    env_logger::Builder::new()
        .filter_level(match args.get_count("verbosity") {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        })
        .format(|buf, record| {
            writeln!(
                buf,
                "glyphs2font: {}: {}",
                record.level().as_str().to_uppercase(),
                record.args()
            )
        })
        .init();

    let Some(config_file) = args.get_one::<String>("config").map(PathBuf::from) else {
        log::error!("missing configuration file argument");
        std::process::exit(1);
    };
    log::info!("Loading {}", config_file.display());
    let before = std::time::Instant::now();
    match glyphs2font::convert(&config_file) {
        Ok(written) => log::info!(
            "Wrote {} files in {:.2?}",
            written.len(),
            std::time::Instant::now() - before
        ),
        Err(err) => {
            log::error!("{}", err);
            std::process::exit(1);
        }
    }
}
