//! Weekly workout planning: turns generated plan text into structured daily workouts.

pub mod ai_client;
pub mod api;
pub mod config;
pub mod models;
pub mod plan_cache;
pub mod plan_parser;
pub mod planner;
pub mod summary;
pub mod week;

pub use models::{DailyWorkout, Exercise};
pub use plan_parser::parse_workout_plan;
