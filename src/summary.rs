use std::fmt::Write;

use crate::models::{DailyWorkout, WeeklyWorkoutPlan};

/// Numbered exercise list for one day. Rest days have nothing to show.
pub fn format_day_details(day: &DailyWorkout) -> String {
    let mut details = String::new();
    if day.is_rest_day {
        return details;
    }

    for (index, exercise) in day.exercises.iter().enumerate() {
        let _ = writeln!(details, "{}. {}", index + 1, exercise.name);
        let _ = writeln!(details, "   • Sets: {}", exercise.sets);
        let _ = writeln!(details, "   • Reps: {}", exercise.reps);
        let _ = writeln!(details, "   • Rest: {}s between sets", exercise.rest_seconds);
        if !exercise.notes.is_empty() {
            let _ = writeln!(details, "   • Tip: {}", exercise.notes);
        }
        details.push('\n');
    }
    details
}

pub fn format_day_line(day: &DailyWorkout) -> String {
    if day.is_rest_day {
        return format!("{}: Rest day", day.day_of_week);
    }

    let mut parts = vec![day.workout_type.clone()];
    if day.duration_minutes > 0 {
        parts.push(format!("{} min", day.duration_minutes));
    }
    if !day.difficulty.is_empty() {
        parts.push(day.difficulty.clone());
    }
    if !day.target_muscles.is_empty() {
        parts.push(day.target_muscles.join(", "));
    }
    parts.retain(|p| !p.is_empty());

    format!("{}: {}", day.day_of_week, parts.join(" · "))
}

pub fn format_week_overview(plan: &WeeklyWorkoutPlan) -> String {
    let mut overview = format!("{}\n", plan.week_title);
    for day in &plan.workouts {
        overview.push_str(&format_day_line(day));
        overview.push('\n');
    }
    overview
}
