use clinitcheck::analysis::{ClassCatalog, ClassResolver, Settings, Solver};
use clinitcheck::jvm;

use clap::{Arg, ArgAction, Command};
use std::fs;
use std::io;
use std::path::PathBuf;

/// Resolves class identifiers against an ordered list of class path roots
///
/// `foo/bar/Baz` is looked up as `<root>/foo/bar/Baz.class`, first root wins.
struct ClassPathResolver {
    roots: Vec<PathBuf>,
}

impl ClassResolver for ClassPathResolver {
    fn resolve(&self, name: &str) -> io::Result<Vec<u8>> {
        let relative = format!("{}.class", name);
        for root in &self.roots {
            let candidate = root.join(&relative);
            if candidate.is_file() {
                return fs::read(candidate);
            }
        }
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no class path root contains {}", relative),
        ))
    }
}

fn main() -> Result<(), jvm::Error> {
    let matches = Command::new("Static initializer safety classifier")
        .version("0.1.0")
        .about("Classify JVM class files by whether their <clinit> is safe to replay")
        .arg(
            Arg::new("classpath")
                .short('p')
                .long("classpath")
                .value_name("DIR")
                .action(ArgAction::Append)
                .help("Class path root to resolve classes against (repeatable, defaults to `.`)"),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .action(ArgAction::SetTrue)
                .help("Forbid all cross-class static reads, even of final primitives"),
        )
        .arg(
            Arg::new("trusted-defaults")
                .long("trusted-defaults")
                .action(ArgAction::SetTrue)
                .help("Pre-mark the built-in trusted platform classes as safe"),
        )
        .arg(
            Arg::new("safe-list")
                .long("safe-list")
                .value_name("FILE")
                .help("File of newline-delimited class names to pre-mark as safe"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Log the cause behind every unsafe verdict"),
        )
        .arg(
            Arg::new("INPUT")
                .help("File of newline-delimited class names to classify")
                .required(true)
                .index(1),
        )
        .get_matches();

    let mut logger = env_logger::Builder::from_default_env();
    if matches.get_flag("verbose") {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    let mut settings = if matches.get_flag("strict") {
        Settings::strict()
    } else {
        Settings::new()
    };
    if matches.get_flag("trusted-defaults") {
        settings = settings.with_trusted_platform_classes();
    }
    if let Some(safe_list) = matches.get_one::<String>("safe-list") {
        let listed = fs::read_to_string(safe_list).map_err(jvm::Error::IoError)?;
        settings.seed_safe_names.extend(
            listed
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_owned),
        );
    }

    let roots: Vec<PathBuf> = match matches.get_many::<String>("classpath") {
        Some(paths) => paths.map(PathBuf::from).collect(),
        None => vec![PathBuf::from(".")],
    };
    let catalog = ClassCatalog::new(ClassPathResolver { roots });

    let input = matches
        .get_one::<String>("INPUT")
        .map(String::as_str)
        .unwrap_or_default();
    log::info!("Reading class list '{}'", input);
    let targets = catalog.load_batch_path(input).map_err(jvm::Error::IoError)?;

    let classification = Solver::new(&catalog, &settings).classify(&targets);

    // One line per class in input order: `<name> 1` for safe, `<name> 0` for unsafe
    for name in &targets {
        match classification.verdicts.get(name) {
            Some(&safe) => println!("{} {}", name, if safe { 1 } else { 0 }),
            None => log::error!("[error] class never classified: {}", name),
        }
    }

    log::info!("run summary:\n{}", classification.report);

    Ok(())
}
