//! Menu for a store of [`Student`] records.

use std::io::{self, BufRead, Write};

use crate::engine::aggregate::{group_by, mean_of};
use crate::engine::query::{filter, sort_by_field, sort_by_key, Predicate};
use crate::engine::{validate, FileStore};
use crate::record::{FullName, Grades, Student};
use crate::shell::{read_number, run_menu, Console, Flow, MenuEntry};
use crate::{Error, RecordWriter, Result};

pub const TITLE: &str = "STUDENT ACADEMIC PERFORMANCE MANAGEMENT SYSTEM";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Add,
    DisplayAll,
    SortedBySurname,
    SortedByAverage,
    FindByGroup,
    GroupAverage,
    Remove,
    SearchByName,
    GroupSummary,
    Exit,
}

pub const MENU: &[MenuEntry<Command>] = &[
    MenuEntry { choice: "1", command: Command::Add, label: "Add new student" },
    MenuEntry { choice: "2", command: Command::DisplayAll, label: "Display all students" },
    MenuEntry { choice: "3", command: Command::SortedBySurname, label: "Display students sorted by surname" },
    MenuEntry { choice: "4", command: Command::SortedByAverage, label: "Display students sorted by average grade" },
    MenuEntry { choice: "5", command: Command::FindByGroup, label: "Find students by group" },
    MenuEntry { choice: "6", command: Command::GroupAverage, label: "Calculate group average grade" },
    MenuEntry { choice: "7", command: Command::Remove, label: "Remove student" },
    MenuEntry { choice: "8", command: Command::SearchByName, label: "Search students by name" },
    MenuEntry { choice: "9", command: Command::GroupSummary, label: "Summary of all groups" },
    MenuEntry { choice: "10", command: Command::Exit, label: "Exit" },
];

pub fn run<I: BufRead, O: Write>(console: &mut Console<I, O>, store: &mut FileStore<Student>) -> io::Result<()> {
    run_menu(console, TITLE, MENU, |console, command| dispatch(console, store, command))
}

pub fn dispatch<I: BufRead, O: Write>(
    console: &mut Console<I, O>,
    store: &mut FileStore<Student>,
    command: Command,
) -> Result<Flow> {
    match command {
        Command::Add => add(console, store)?,
        Command::DisplayAll => display_all(console, store)?,
        Command::SortedBySurname => sorted_by_surname(console, store)?,
        Command::SortedByAverage => sorted_by_average(console, store)?,
        Command::FindByGroup => find_by_group(console, store)?,
        Command::GroupAverage => group_average(console, store)?,
        Command::Remove => remove(console, store)?,
        Command::SearchByName => search_by_name(console, store)?,
        Command::GroupSummary => group_summary(console, store)?,
        Command::Exit => return Ok(Flow::Exit),
    }
    Ok(Flow::Continue)
}

/// `Surname Given Names: 93.75 (group IP-21, course 2)`
pub fn average_line(s: &Student) -> String {
    format!(
        "{} {}: {} (group {}, course {})",
        s.key,
        s.full_name.given_names(),
        s.average,
        s.group,
        s.course
    )
}

fn add<I: BufRead, O: Write>(console: &mut Console<I, O>, store: &mut FileStore<Student>) -> Result<()> {
    let key = console.prompt("Enter student surname: ")?;
    validate::validate_key(&key, store.store().keys())?;

    let group = console.prompt("Enter group number: ")?;
    validate::require_text("group", &group)?;
    let first_name = console.prompt("Enter first name: ")?;
    validate::require_text("first name", &first_name)?;
    let patronymic = console.prompt("Enter patronymic: ")?;

    let Some(course) = read_number::<i64, _, _>(console, "Enter course: ")? else {
        return Ok(());
    };
    let course = validate::validate_course(course)?;

    let subjects = read_subjects(console)?;
    let student = Student::new(&key, &group, FullName::new(&key, &first_name, &patronymic), course, subjects);

    match store.add(student) {
        Ok(s) => {
            let msg = format!("Added: {} (average {})", s.key, s.average);
            console.say(msg)?;
        }
        Err(e @ Error::Persistence { .. }) => console.say(format!("Added: {}, but saving failed: {}", key, e))?,
        Err(e) => return Err(e),
    }
    Ok(())
}

/// Reads `subject` / `grade` pairs until `end`. Bad grades are reported and skipped.
fn read_subjects<I: BufRead, O: Write>(console: &mut Console<I, O>) -> Result<Grades> {
    let mut subjects = Grades::new();
    console.say("Enter subjects and grades (type 'end' to finish):")?;
    loop {
        let subject = console.prompt("Subject name: ")?;
        if subject.eq_ignore_ascii_case("end") {
            break;
        }
        if subject.is_empty() {
            continue;
        }
        let Some(grade) = read_number::<f64, _, _>(console, &format!("Grade for '{}': ", subject))? else {
            continue;
        };
        match validate::validate_grade(&subject, grade) {
            Ok(()) => {
                subjects.insert(subject, grade);
            }
            Err(e) => console.say(format!("Error: {}", e))?,
        }
    }
    Ok(subjects)
}

fn display_all<I: BufRead, O: Write>(console: &mut Console<I, O>, store: &FileStore<Student>) -> Result<()> {
    if store.store().is_empty() {
        console.say("No students.")?;
        return Ok(());
    }
    for s in store.store().list() {
        console.say(s)?;
    }
    Ok(())
}

fn sorted_by_surname<I: BufRead, O: Write>(console: &mut Console<I, O>, store: &FileStore<Student>) -> Result<()> {
    if store.store().is_empty() {
        console.say("No students.")?;
        return Ok(());
    }
    for s in sort_by_key(store.store(), |s: &Student| s.key.clone(), false) {
        console.say(format!(
            "{} {} - Group: {}, Course: {}, Average: {}",
            s.key,
            s.full_name.given_names(),
            s.group,
            s.course,
            s.average
        ))?;
    }
    Ok(())
}

fn sorted_by_average<I: BufRead, O: Write>(console: &mut Console<I, O>, store: &FileStore<Student>) -> Result<()> {
    if store.store().is_empty() {
        console.say("No students.")?;
        return Ok(());
    }
    for s in sort_by_field(store.store(), "average", true) {
        console.say(average_line(s))?;
    }
    Ok(())
}

fn prompt_group<I: BufRead, O: Write>(console: &mut Console<I, O>, label: &str) -> Result<String> {
    let group = console.prompt(label)?;
    validate::require_text("group", &group)?;
    Ok(group)
}

fn find_by_group<I: BufRead, O: Write>(console: &mut Console<I, O>, store: &FileStore<Student>) -> Result<()> {
    if store.store().is_empty() {
        console.say("No students.")?;
        return Ok(());
    }
    let group = prompt_group(console, "Enter group number to search: ")?;
    let found = filter(store.store(), &Predicate::equals("group", &group));
    if found.is_empty() {
        console.say(format!("Group '{}' not found.", group))?;
        return Ok(());
    }
    console.say(format!("Group '{}':", group))?;
    for s in found {
        console.say(format!(
            "  {} {} - course {}, avg: {}",
            s.key,
            s.full_name.given_names(),
            s.course,
            s.average
        ))?;
    }
    Ok(())
}

fn group_average<I: BufRead, O: Write>(console: &mut Console<I, O>, store: &FileStore<Student>) -> Result<()> {
    if store.store().is_empty() {
        console.say("No students.")?;
        return Ok(());
    }
    let group = prompt_group(console, "Enter group number: ")?;
    let members = filter(store.store(), &Predicate::equals("group", &group));
    if members.is_empty() {
        console.say(format!("Group '{}' not found.", group))?;
        return Ok(());
    }
    let mean = mean_of(&members, "average")?;
    console.say(format!("Group '{}' average: {} ({} students)", group, mean, members.len()))?;
    Ok(())
}

fn remove<I: BufRead, O: Write>(console: &mut Console<I, O>, store: &mut FileStore<Student>) -> Result<()> {
    if store.store().is_empty() {
        console.say("No students.")?;
        return Ok(());
    }
    let key = console.prompt("Enter student surname to remove: ")?;
    match store.remove(&key) {
        Ok(s) => console.say(format!("Removed: {}", s.key))?,
        Err(Error::NotFound(_)) => console.say("Error: Student not found.")?,
        Err(e @ Error::Persistence { .. }) => console.say(format!("Removed: {}, but saving failed: {}", key, e))?,
        Err(e) => return Err(e),
    }
    Ok(())
}

fn search_by_name<I: BufRead, O: Write>(console: &mut Console<I, O>, store: &FileStore<Student>) -> Result<()> {
    let needle = console.prompt("Enter part of a name: ")?;
    let found = filter(store.store(), &Predicate::contains("full_name", &needle));
    if found.is_empty() {
        console.say("No matching students.")?;
    }
    for s in found {
        console.say(s)?;
    }
    Ok(())
}

fn group_summary<I: BufRead, O: Write>(console: &mut Console<I, O>, store: &FileStore<Student>) -> Result<()> {
    let groups = group_by(store.store(), "group");
    if groups.is_empty() {
        console.say("No students.")?;
        return Ok(());
    }
    for group in &groups {
        console.say(format!(
            "{}: {} students, average {}",
            group.label,
            group.len(),
            group.mean("average")?
        ))?;
    }
    Ok(())
}
