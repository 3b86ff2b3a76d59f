use std::path::{Path, PathBuf};

use clap::Parser;

use press::{builtins, Document};
use press_typeset::{FixedMetrics, Pager};

mod device;

/// Press: render a document to paginated text
#[derive(Parser)]
#[command(name = "press")]
struct Opts {
    /// Path to the document to render
    file_path: Option<PathBuf>,
}

fn main() {
    let opts: Opts = Opts::parse();
    let Some(file_path) = opts.file_path else {
        eprintln!("Usage: press <file>");
        eprintln!("  Missing required argument <file>");
        std::process::exit(1);
    };
    match run(&file_path) {
        Ok(output_path) => {
            println!("wrote {}", output_path.display());
        }
        Err(err) => {
            eprint!("{err}");
            std::process::exit(1);
        }
    }
}

fn run(file_path: &Path) -> Result<PathBuf, anyhow::Error> {
    let file_name = file_path.display().to_string();
    let source = std::fs::read_to_string(file_path)
        .map_err(|err| anyhow::anyhow!("could not read `{file_name}`: {err}"))?;

    let mut doc = match Document::parse(&file_name, &source, builtins::built_ins()) {
        Ok(doc) => doc,
        Err(err) => {
            let cache = (file_name.clone(), ariadne::Source::from(source.clone()));
            err.ariadne_report(&file_name).eprint(cache)?;
            std::process::exit(1);
        }
    };

    let output_path = file_path.with_extension("txt");
    let mut surface = device::TextDevice::new(&output_path);
    let metrics = FixedMetrics::default();
    let mut pager = Pager::new(&mut surface, &metrics);

    match doc.run() {
        Ok(fragments) => {
            pager.render(&fragments);
            pager.finish()?;
            Ok(output_path)
        }
        Err(err) => {
            // Report the failure, but still persist whatever was
            // committed before it.
            eprint!("{}", err.report(&doc.ast));
            pager.finish()?;
            std::process::exit(1);
        }
    }
}
