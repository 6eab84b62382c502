//! Parser for the free-text weekly plan returned by the generator.
//!
//! A plan is a sequence of day blocks separated by `---` lines. Each block is scanned
//! line by line against a table of case-insensitive labels (`DAY:`, `TYPE:`, ...).
//! Nothing here fails: bad fields fall back to defaults and bad blocks are dropped.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{DailyWorkout, Exercise, DEFAULT_REST_SECONDS, DEFAULT_SETS};

const DAY_DELIMITER: &str = "---";
const DAY_LABEL: &str = "DAY:";
const REST_TYPE: &str = "Rest";

lazy_static! {
    static ref EXERCISE_HEADING: Regex = Regex::new(r"^[0-9]+\.\s+").unwrap();
}

type Setter<S> = fn(&mut S, &str);

struct Label<S> {
    prefix: &'static str,
    apply: Setter<S>,
}

const DAY_LABELS: &[Label<DayScan>] = &[
    Label {
        prefix: DAY_LABEL,
        apply: |scan, value| {
            scan.day_of_week = value.to_string();
            scan.in_exercises = false;
        },
    },
    Label {
        prefix: "TYPE:",
        apply: |scan, value| scan.workout_type = value.to_string(),
    },
    Label {
        prefix: "DURATION:",
        apply: |scan, value| scan.duration_minutes = parse_count(value, 0),
    },
    Label {
        prefix: "DIFFICULTY:",
        apply: |scan, value| scan.difficulty = value.to_string(),
    },
    Label {
        prefix: "TARGET:",
        apply: |scan, value| {
            scan.target_muscles = value
                .split(',')
                .map(str::trim)
                .filter(|muscle| !muscle.is_empty())
                .map(str::to_string)
                .collect();
        },
    },
    Label {
        prefix: "EXERCISES:",
        apply: |scan, _| scan.in_exercises = true,
    },
];

const EXERCISE_LABELS: &[Label<Exercise>] = &[
    Label {
        prefix: "Sets:",
        apply: |exercise, value| exercise.sets = parse_count(value, DEFAULT_SETS),
    },
    Label {
        prefix: "Reps:",
        apply: |exercise, value| exercise.reps = value.to_string(),
    },
    Label {
        prefix: "Rest:",
        apply: |exercise, value| exercise.rest_seconds = parse_count(value, DEFAULT_REST_SECONDS),
    },
    Label {
        prefix: "Notes:",
        apply: |exercise, value| exercise.notes = value.to_string(),
    },
];

/// Why a non-blank day block produced no workout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("block has no DAY: line")]
    MissingDay,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedBlock {
    /// Zero-based position among the non-blank blocks of the input.
    pub index: usize,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default)]
pub struct PlanReport {
    pub workouts: Vec<DailyWorkout>,
    pub skipped: Vec<SkippedBlock>,
}

/// Parse a plan into its days, in input order. Unrecoverable blocks are left out.
pub fn parse_workout_plan(text: &str) -> Vec<DailyWorkout> {
    parse_workout_plan_report(text).workouts
}

/// Same as [`parse_workout_plan`], also listing the blocks that were dropped.
pub fn parse_workout_plan_report(text: &str) -> PlanReport {
    let mut report = PlanReport::default();

    for (index, block) in split_day_blocks(text).iter().enumerate() {
        match parse_day_block(block) {
            Ok(workout) => report.workouts.push(workout),
            Err(reason) => {
                debug!("Skipping day block {}: {}", index, reason);
                report.skipped.push(SkippedBlock { index, reason });
            }
        }
    }

    if report.workouts.is_empty() && !text.trim().is_empty() {
        warn!(
            "No workout days recovered from plan text ({} blocks skipped)",
            report.skipped.len()
        );
    }

    report
}

/// Trimmed, non-empty lines grouped by delimiter. Blocks with no content are not emitted.
fn split_day_blocks(text: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();

    for line in text.lines().map(str::trim) {
        if line == DAY_DELIMITER {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else if !line.is_empty() {
            current.push(line);
        }
    }

    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

#[derive(Default)]
struct DayScan {
    day_of_week: String,
    workout_type: String,
    duration_minutes: u32,
    difficulty: String,
    target_muscles: Vec<String>,
    exercises: Vec<Exercise>,
    in_exercises: bool,
}

impl DayScan {
    fn into_workout(self) -> Result<DailyWorkout, SkipReason> {
        if self.day_of_week.is_empty() {
            return Err(SkipReason::MissingDay);
        }

        let muscle_group = self.target_muscles.first().cloned().unwrap_or_default();
        let exercises = self
            .exercises
            .into_iter()
            .map(|exercise| Exercise {
                muscle_group: muscle_group.clone(),
                ..exercise
            })
            .collect();

        Ok(DailyWorkout {
            is_rest_day: self.workout_type.eq_ignore_ascii_case(REST_TYPE),
            day_of_week: self.day_of_week,
            workout_type: self.workout_type,
            duration_minutes: self.duration_minutes,
            difficulty: self.difficulty,
            target_muscles: self.target_muscles,
            exercises,
        })
    }
}

fn parse_day_block(lines: &[&str]) -> Result<DailyWorkout, SkipReason> {
    let mut scan = DayScan::default();
    let mut cursor = lines.iter().copied().peekable();

    while let Some(line) = cursor.next() {
        // Inside EXERCISES: only numbered headings and a new DAY: header mean anything.
        if scan.in_exercises && strip_label(line, DAY_LABEL).is_none() {
            if EXERCISE_HEADING.is_match(line) {
                let mut exercise = exercise_name(line).map(Exercise::named);
                while let Some(detail) = cursor.next_if(|next| next.starts_with('-')) {
                    if let Some(exercise) = exercise.as_mut() {
                        apply_detail(exercise, detail);
                    }
                }
                match exercise {
                    Some(exercise) => scan.exercises.push(exercise),
                    None => debug!("Skipping exercise heading without a name: {}", line),
                }
            }
            continue;
        }

        if let Some((label, value)) = match_label(DAY_LABELS, line) {
            (label.apply)(&mut scan, value);
        }
    }

    scan.into_workout()
}

fn apply_detail(exercise: &mut Exercise, line: &str) {
    let detail = line.strip_prefix('-').unwrap_or(line).trim();
    if let Some((label, value)) = match_label(EXERCISE_LABELS, detail) {
        (label.apply)(exercise, value);
    }
}

/// Name after the first `". "` of a numbered heading, if any.
fn exercise_name(line: &str) -> Option<&str> {
    line.split_once(". ")
        .map(|(_, name)| name.trim())
        .filter(|name| !name.is_empty())
}

fn match_label<'t, 'l, S>(
    labels: &'t [Label<S>],
    line: &'l str,
) -> Option<(&'t Label<S>, &'l str)> {
    labels
        .iter()
        .find_map(|label| strip_label(line, label.prefix).map(|value| (label, value)))
}

/// Case-insensitive prefix match; returns the trimmed remainder.
fn strip_label<'l>(line: &'l str, prefix: &str) -> Option<&'l str> {
    let head = line.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(line[prefix.len()..].trim())
    } else {
        None
    }
}

fn parse_count(value: &str, default: u32) -> u32 {
    value.parse().unwrap_or(default)
}
