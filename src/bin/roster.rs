use std::env;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::bail;
use clap::{Parser, Subcommand, ValueEnum};
use roster_store::engine::aggregate::group_by;
use roster_store::engine::query::{filter, sort_by_field, Predicate};
use roster_store::engine::{Diagnostic, FileStore, Persistence};
use roster_store::record::student::sample_students;
use roster_store::shell::{self, Console};
use roster_store::{Error, HeightEntry, Record, RecordReader, RecordWriter, Student};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Data file (default: $ROSTER_DATA_FILE, then students.json or heights.json)
    #[arg(short, long)]
    file: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = Kind::Students)]
    kind: Kind,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Kind {
    Students,
    Heights,
}

impl Kind {
    fn default_file(self) -> &'static str {
        match self {
            Kind::Students => "students.json",
            Kind::Heights => "heights.json",
        }
    }
}

#[derive(Subcommand, Clone)]
enum Commands {
    /// Interactive menu (default)
    Shell,
    List {
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        desc: bool,
    },
    Show { key: String },
    Remove { key: String },
    Find {
        #[arg(long)]
        field: String,
        #[arg(long)]
        equals: Option<String>,
        #[arg(long)]
        contains: Option<String>,
        #[arg(long)]
        number: Option<f64>,
        #[arg(long)]
        min: Option<f64>,
        #[arg(long)]
        max: Option<f64>,
    },
    Groups {
        #[arg(long)]
        by: String,
        #[arg(long)]
        mean: Option<String>,
    },
    /// Adds the sample student roster
    Seed,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let path = cli
        .file
        .or_else(|| env::var("ROSTER_DATA_FILE").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(cli.kind.default_file()));
    let command = cli.command.unwrap_or(Commands::Shell);

    match cli.kind {
        Kind::Students => run::<Student, _, _>(
            &path,
            command,
            |store| {
                let mut console = Console::new(io::stdin().lock(), io::stdout());
                shell::students::run(&mut console, store)
            },
            || Ok(sample_students()),
        ),
        Kind::Heights => {
            let report = path.with_file_name(shell::heights::REPORT_FILE);
            run::<HeightEntry, _, _>(
                &path,
                command,
                |store| {
                    let mut console = Console::new(io::stdin().lock(), io::stdout());
                    shell::heights::run(&mut console, store, report)
                },
                || Err(anyhow::anyhow!("there is no sample data for heights")),
            )
        }
    }
}

fn run<R, S, D>(path: &Path, command: Commands, interactive: S, sample: D) -> anyhow::Result<()>
where
    R: Record,
    S: FnOnce(&mut FileStore<R>) -> io::Result<()>,
    D: FnOnce() -> anyhow::Result<Vec<R>>,
{
    let (mut store, diagnostics) = FileStore::<R>::open(Persistence::for_records::<R, _>(path));
    for d in diagnostics {
        if !matches!(d, Diagnostic::Missing(_)) {
            eprintln!("warning: {}", d);
        }
    }

    match command {
        Commands::Shell => interactive(&mut store)?,
        Commands::List { sort, desc } => {
            let records = match &sort {
                Some(field) => sort_by_field(store.store(), field, desc),
                None => store.store().list().collect(),
            };
            for r in records {
                println!("{}", r);
            }
        }
        Commands::Show { key } => {
            println!("{}", serde_json::to_string_pretty(store.get(&key)?)?);
        }
        Commands::Remove { key } => {
            store.remove(&key)?;
            println!("OK");
        }
        Commands::Find { field, equals, contains, number, min, max } => {
            let predicate = match (equals, contains, number, min, max) {
                (Some(v), None, None, None, None) => Predicate::equals(&field, &v),
                (None, Some(v), None, None, None) => Predicate::contains(&field, &v),
                (None, None, Some(n), None, None) => Predicate::number_equals(&field, n),
                (None, None, None, Some(lo), Some(hi)) => Predicate::range(&field, lo, hi),
                _ => bail!("use exactly one of --equals, --contains, --number, or --min with --max"),
            };
            for r in filter(store.store(), &predicate) {
                println!("{}", r);
            }
        }
        Commands::Groups { by, mean } => {
            for group in group_by(store.store(), &by) {
                match &mean {
                    Some(field) => println!(
                        "{}: {} records, mean {} {}",
                        group.label,
                        group.len(),
                        field,
                        group.mean(field)?
                    ),
                    None => println!("{}: {} records", group.label, group.len()),
                }
            }
        }
        Commands::Seed => {
            for record in sample()? {
                let key = record.key().to_string();
                match store.add(record) {
                    Ok(_) => println!("Added: {}", key),
                    Err(Error::DuplicateKey(_)) => println!("Skipped: {} already exists", key),
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }

    Ok(())
}
