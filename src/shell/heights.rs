//! Menu for a store of [`HeightEntry`] records.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use crate::engine::persistence::{encode, write_json, Encoding};
use crate::engine::query::{filter, filter_by, insertion_point, nearest, Predicate};
use crate::engine::{validate, FileStore};
use crate::record::{Gender, HeightComparison, HeightEntry};
use crate::shell::{read_number, run_menu, Console, Flow, MenuEntry};
use crate::{Error, RecordReader, RecordWriter, Result};

pub const TITLE: &str = "STUDENT HEIGHTS";

/// File name of the comparison report, written next to the data file.
pub const REPORT_FILE: &str = "height_comparison_result.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Display,
    Add,
    Remove,
    Search,
    Compare,
    Totals,
    Exit,
}

pub const MENU: &[MenuEntry<Command>] = &[
    MenuEntry { choice: "1", command: Command::Display, label: "Display data" },
    MenuEntry { choice: "2", command: Command::Add, label: "Add student" },
    MenuEntry { choice: "3", command: Command::Remove, label: "Remove student" },
    MenuEntry { choice: "4", command: Command::Search, label: "Search" },
    MenuEntry { choice: "5", command: Command::Compare, label: "Compare a new height" },
    MenuEntry { choice: "6", command: Command::Totals, label: "Girls vs boys total height" },
    MenuEntry { choice: "7", command: Command::Exit, label: "Exit" },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchBy {
    Name,
    Gender,
    ExactHeight,
    HeightRange,
}

const SEARCH_MENU: &[MenuEntry<SearchBy>] = &[
    MenuEntry { choice: "1", command: SearchBy::Name, label: "Name" },
    MenuEntry { choice: "2", command: SearchBy::Gender, label: "Gender" },
    MenuEntry { choice: "3", command: SearchBy::ExactHeight, label: "Height (exact)" },
    MenuEntry { choice: "4", command: SearchBy::HeightRange, label: "Height (range)" },
];

pub fn run<I: BufRead, O: Write>(
    console: &mut Console<I, O>,
    store: &mut FileStore<HeightEntry>,
    report_path: PathBuf,
) -> io::Result<()> {
    run_menu(console, TITLE, MENU, |console, command| {
        dispatch(console, store, &report_path, command)
    })
}

pub fn dispatch<I: BufRead, O: Write>(
    console: &mut Console<I, O>,
    store: &mut FileStore<HeightEntry>,
    report_path: &Path,
    command: Command,
) -> Result<Flow> {
    match command {
        Command::Display => display(console, store)?,
        Command::Add => add(console, store)?,
        Command::Remove => remove(console, store)?,
        Command::Search => search(console, store)?,
        Command::Compare => compare(console, store)?,
        Command::Totals => totals(console, store, report_path)?,
        Command::Exit => return Ok(Flow::Exit),
    }
    Ok(Flow::Continue)
}

fn display<I: BufRead, O: Write>(console: &mut Console<I, O>, store: &FileStore<HeightEntry>) -> Result<()> {
    let doc = encode(store.store(), Encoding::Array)?;
    console.say(serde_json::to_string_pretty(&doc)?)?;
    Ok(())
}

fn add<I: BufRead, O: Write>(console: &mut Console<I, O>, store: &mut FileStore<HeightEntry>) -> Result<()> {
    let name = console.prompt("Enter student name: ")?;
    validate::validate_key(&name, store.store().keys())?;
    let gender: Gender = console.prompt("Enter gender (male/female): ")?.parse()?;
    let Some(height) = read_number::<f64, _, _>(console, "Enter height (cm): ")? else {
        return Ok(());
    };

    match store.add(HeightEntry::new(&name, gender, height)) {
        Ok(e) => {
            let msg = format!("Added: {}", e);
            console.say(msg)?;
        }
        Err(e @ Error::Persistence { .. }) => console.say(format!("Added: {}, but saving failed: {}", name, e))?,
        Err(e) => return Err(e),
    }
    Ok(())
}

fn remove<I: BufRead, O: Write>(console: &mut Console<I, O>, store: &mut FileStore<HeightEntry>) -> Result<()> {
    if store.store().is_empty() {
        console.say("No students.")?;
        return Ok(());
    }
    for (i, e) in store.store().list().enumerate() {
        console.say(format!("{}. {}", i + 1, e))?;
    }
    let Some(number) = read_number::<usize, _, _>(console, "Enter student number to remove: ")? else {
        return Ok(());
    };
    let Some(key) = number
        .checked_sub(1)
        .and_then(|i| store.store().records().get(i))
        .map(|e| e.name.clone())
    else {
        console.say("Error: No student with that number.")?;
        return Ok(());
    };

    match store.remove(&key) {
        Ok(e) => console.say(format!("Removed: {}", e.name))?,
        Err(e @ Error::Persistence { .. }) => console.say(format!("Removed: {}, but saving failed: {}", key, e))?,
        Err(e) => return Err(e),
    }
    Ok(())
}

fn search<I: BufRead, O: Write>(console: &mut Console<I, O>, store: &FileStore<HeightEntry>) -> Result<()> {
    let options: Vec<String> = SEARCH_MENU.iter().map(|e| format!("{}. {}", e.choice, e.label)).collect();
    console.say(options.join(" "))?;
    let choice = console.prompt("Enter choice: ")?;
    let Some(by) = crate::shell::lookup(SEARCH_MENU, &choice) else {
        console.say("Invalid choice.")?;
        return Ok(());
    };

    let predicate = match by {
        SearchBy::Name => Predicate::contains("name", &console.prompt("Enter name: ")?),
        SearchBy::Gender => {
            let gender: Gender = console.prompt("Enter gender (male/female): ")?.parse()?;
            Predicate::equals("gender", gender.as_str())
        }
        SearchBy::ExactHeight => {
            let Some(h) = read_number::<f64, _, _>(console, "Enter height: ")? else {
                return Ok(());
            };
            Predicate::number_equals("height", h)
        }
        SearchBy::HeightRange => {
            let Some(min) = read_number::<f64, _, _>(console, "Min height: ")? else {
                return Ok(());
            };
            let Some(max) = read_number::<f64, _, _>(console, "Max height: ")? else {
                return Ok(());
            };
            Predicate::range("height", min, max)
        }
    };

    let found = filter(store.store(), &predicate);
    if found.is_empty() {
        console.say("No matching students.")?;
    }
    for e in found {
        console.say(e)?;
    }
    Ok(())
}

/// Where a newcomer of a given height would stand relative to everyone stored.
fn compare<I: BufRead, O: Write>(console: &mut Console<I, O>, store: &FileStore<HeightEntry>) -> Result<()> {
    if store.store().is_empty() {
        console.say("No students.")?;
        return Ok(());
    }
    let Some(height) = read_number::<f64, _, _>(console, "Enter new student's height (cm): ")? else {
        return Ok(());
    };
    validate::validate_new_height(height, store.store().list().map(|e| e.height))?;

    let shorter = filter_by(store.store(), |e: &HeightEntry| e.height < height);
    let names: Vec<&str> = shorter.iter().map(|e| e.name.as_str()).collect();
    console.say(format!(
        "Shorter students: {}",
        if names.is_empty() { "None".to_string() } else { names.join(", ") }
    ))?;

    if let Some(after) = insertion_point(store.store(), "height", height) {
        console.say(format!("Insert after: {}", after.name))?;
    }

    if let Some(closest) = nearest(store.store(), "height", height) {
        console.say(format!(
            "Closest height: {} ({:.2} cm diff)",
            closest.name,
            (closest.height - height).abs()
        ))?;
    }
    Ok(())
}

fn totals<I: BufRead, O: Write>(
    console: &mut Console<I, O>,
    store: &FileStore<HeightEntry>,
    report_path: &Path,
) -> Result<()> {
    let result = HeightComparison::compute(store.store());
    console.say(format!("Girls: {:.2} cm ({})", result.total_girls_height, result.girls_count))?;
    console.say(format!("Boys: {:.2} cm ({})", result.total_boys_height, result.boys_count))?;
    console.say(format!(
        "Girls exceed: {}",
        if result.girls_exceed_boys { "Yes" } else { "No" }
    ))?;

    if let Err(e) = write_json(report_path, &[&result]) {
        console.say(format!("Error: {}", e))?;
    }
    Ok(())
}
