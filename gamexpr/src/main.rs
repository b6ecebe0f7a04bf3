use std::io::BufRead;
use std::process::ExitCode;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use gamexpr::cli::{self, ConfigFile, Mode};
use gamexpr::config::Config;
use gamexpr::script::{Expander, Expression};

const USAGE: &str =
    "Usage: gamexpr [-f[<file>]] [-D<name>=<value>]... [-p<digits>] [-r<seed>] [-stmd] [<text>...]";

fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("gamexpr: {e}");
            eprintln!("{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(args.debug);

    // ── Settings: file, then command-line overrides ───────────────────────────
    let mut config = load_config(&args.config);
    for (name, value) in &args.defines {
        config.vars.set_parsed(name.as_str(), value);
    }
    if let Some(p) = args.precision {
        config.expr.math.precision = p;
    }
    if args.strict {
        config.expr.strict = true;
    }

    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut runner = Runner {
        mode: args.mode,
        expander: config.expander_with(rng),
        config,
    };

    // ── Inputs ────────────────────────────────────────────────────────────────
    let ok = match args.input {
        Some(text) => runner.run(&text),
        None => {
            let mut ok = true;
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) if line.trim().is_empty() => {}
                    Ok(line) => ok &= runner.run(&line),
                    Err(e) => {
                        eprintln!("gamexpr: stdin: {e}");
                        ok = false;
                        break;
                    }
                }
            }
            ok
        }
    };

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn load_config(spec: &ConfigFile) -> Config {
    let path = match spec {
        ConfigFile::Skip => return Config::new(),
        ConfigFile::Explicit(path) => Some(path.clone()),
        ConfigFile::Search => cli::find_user_config(),
    };
    let Some(path) = path else {
        return Config::new();
    };

    match Config::load_file(&path) {
        Ok((config, errors)) => {
            debug!(file = %path.display(), vars = config.vars.len(), "loaded settings");
            for e in errors {
                warn!(file = %path.display(), "{e}");
            }
            config
        }
        Err(e) => {
            eprintln!("gamexpr: warning: {}: {e}", path.display());
            Config::new()
        }
    }
}

struct Runner {
    mode: Mode,
    config: Config,
    expander: Expander<StdRng>,
}

impl Runner {
    /// Process one input and print the result. Returns `false` on failure.
    fn run(&mut self, text: &str) -> bool {
        match self.mode {
            Mode::Expression => {
                match Expression::with_config(text, self.config.expr.clone()).eval(&self.config.vars) {
                    Ok(v) => {
                        println!("{v}");
                        true
                    }
                    Err(e) => {
                        eprintln!("gamexpr: {e}");
                        false
                    }
                }
            }
            Mode::Template => {
                println!("{}", self.expander.expand(text, &self.config.vars));
                true
            }
            Mode::Format => {
                println!("{}", self.expander.format(text, &self.config.vars));
                true
            }
        }
    }
}
