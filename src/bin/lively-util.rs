//! LIVELY command-line tool.

use anyhow::{anyhow, Result};
use lively::{analyze_module, Module};
use log::debug;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "lively-util", about = "LIVELY utility.")]
struct Options {
    #[structopt(short, long)]
    debug: bool,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    #[structopt(name = "print-ir", about = "Parse textual IR and print it back")]
    PrintIR {
        #[structopt(help = "IR file to parse")]
        file: PathBuf,
    },
    #[structopt(name = "liveness", about = "Print IR annotated with live values")]
    Liveness {
        #[structopt(help = "IR file to analyze")]
        file: PathBuf,
        #[structopt(short, long, help = "Also print live-out and phi-edge sets")]
        verbose: bool,
        #[structopt(short, long, help = "Only analyze the named function")]
        func: Option<String>,
    },
}

fn parse(file: &PathBuf) -> Result<Module> {
    let text = std::fs::read_to_string(file)?;
    debug!("Loaded {} bytes of IR", text.len());
    Ok(Module::from_text(&text)?)
}

fn main() -> Result<()> {
    let opts = Options::from_args();

    let mut logger = env_logger::Builder::from_default_env();
    if opts.debug {
        logger.filter_level(log::LevelFilter::Debug);
    }
    let _ = logger.try_init();

    match opts.command {
        Command::PrintIR { file } => {
            let module = parse(&file)?;
            print!("{}", module.display());
        }
        Command::Liveness {
            file,
            verbose,
            func,
        } => {
            let mut module = parse(&file)?;
            if let Some(name) = func {
                let func = module
                    .func_by_name(&name)
                    .ok_or_else(|| anyhow!("no function named @{}", name))?;
                let body = module.funcs[func].clone();
                module = Module::empty();
                module.add_func(body);
            }

            let results = analyze_module(&module);
            let mut failures = 0;
            for (i, (func, body)) in module.funcs().enumerate() {
                if i > 0 {
                    println!();
                }
                match &results[func] {
                    Ok(liveness) if verbose => print!("{}", liveness.display_verbose(body, "")),
                    Ok(liveness) => print!("{}", liveness.display(body, "")),
                    Err(e) => {
                        eprintln!("@{}: analysis could not be completed: {}", body.name, e);
                        failures += 1;
                    }
                }
            }
            if failures > 0 {
                return Err(anyhow!("{} function(s) failed to analyze", failures));
            }
        }
    }

    Ok(())
}
