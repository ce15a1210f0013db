use std::path::PathBuf;

use assetplan::{load_layer_from_file, Environment, Generator, OptionLayer, Template};
use clap::Parser;
use eyre::Result;

#[derive(Parser, Debug)]
#[clap(name = "assetplan", about, version)]
struct Args {
    /// Increase output logging verbosity.
    #[clap(short, long)]
    verbose: bool,

    /// Which template to generate the configuration with.
    #[clap(default_value = "default")]
    template: String,

    /// A JSON, YAML or TOML file containing options.
    #[clap(short, long)]
    options: Option<PathBuf>,

    /// The project directory. Defaults to the current directory.
    #[clap(short, long)]
    root: Option<PathBuf>,

    /// Fail on unknown templates instead of using the default template.
    #[clap(long)]
    strict: bool,

    /// Generate a production build configuration regardless of NODE_ENV.
    #[clap(long)]
    production: bool,

    /// Generate for bundle analysis regardless of WP_BUNDLE_ANALYZER.
    #[clap(long)]
    analyze: bool,

    /// Pretty-print the generated configuration.
    #[clap(long)]
    pretty: bool,

    /// Only print the fingerprint of each generated configuration unit.
    #[clap(long)]
    fingerprint: bool,
}

fn main() {
    let args = Args::parse();
    simple_logger::init_with_level(if args.verbose {
        log::Level::Debug
    } else {
        log::Level::Info
    })
    .unwrap();

    match generate(&args) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            log::error!("Failed: {:?}", e);
            std::process::exit(1);
        }
    }
}

fn generate(args: &Args) -> Result<String> {
    let mut env = Environment::from_env();
    env.production |= args.production;
    env.analyzing |= args.analyze;

    let generator = match &args.root {
        Some(root) => Generator::new(root),
        None => Generator::from_current_dir()?,
    }
    .with_environment(env);

    let template = if args.strict {
        args.template.parse::<Template>()?
    } else {
        Template::resolve(&args.template)
    };
    let caller = match &args.options {
        Some(path) => load_layer_from_file(path)?,
        None => OptionLayer::default(),
    };

    let generated = generator.generate_layered(template, caller)?;
    if args.fingerprint {
        let fingerprints = generated
            .units()
            .iter()
            .map(|unit| unit.fingerprint())
            .collect::<Result<Vec<String>, _>>()?;
        return Ok(fingerprints.join("\n"));
    }
    Ok(if args.pretty {
        serde_json::to_string_pretty(&generated)?
    } else {
        serde_json::to_string(&generated)?
    })
}
