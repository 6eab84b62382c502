use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::ai_client::{GenerationError, PlanGenerator};
use crate::models::{UserProfile, WeeklyWorkoutPlan};
use crate::plan_cache::PlanCache;
use crate::plan_parser::parse_workout_plan_report;
use crate::week::{date_label, week_identifier, week_title};

#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("Plan cache failure: {0}")]
    Cache(#[from] rusqlite::Error),
    #[error("Could not parse the workout plan. Please try regenerating.")]
    Unparsable,
}

/// Serves this week's plan from the cache, generating and storing a new one when needed.
pub struct WeeklyPlanner<G> {
    generator: G,
    cache: Arc<Mutex<PlanCache>>,
}

impl<G: PlanGenerator> WeeklyPlanner<G> {
    pub fn new(generator: G, cache: Arc<Mutex<PlanCache>>) -> Self {
        Self { generator, cache }
    }

    pub async fn load_week(
        &self,
        profile: &UserProfile,
        today: NaiveDate,
    ) -> Result<WeeklyWorkoutPlan, PlanError> {
        let week = week_identifier(today);

        let cached = self.cache.lock().await.get(&week)?;
        let text = match cached {
            Some(text) => {
                info!("Using cached workout plan for {}", week);
                text
            }
            None => {
                info!("No cached plan for {}, generating a new one", week);
                let text = self.generator.generate_weekly_plan(profile).await?;
                self.cache.lock().await.put(&week, &text)?;
                text
            }
        };

        self.parse_plan(&text, profile, today)
    }

    /// Drop the cached plan and build a fresh one.
    pub async fn regenerate(
        &self,
        profile: &UserProfile,
        today: NaiveDate,
    ) -> Result<WeeklyWorkoutPlan, PlanError> {
        self.cache.lock().await.clear()?;
        self.load_week(profile, today).await
    }

    pub fn parse_plan(
        &self,
        text: &str,
        profile: &UserProfile,
        today: NaiveDate,
    ) -> Result<WeeklyWorkoutPlan, PlanError> {
        let report = parse_workout_plan_report(text);
        if report.workouts.is_empty() {
            warn!(
                "Workout plan for {} could not be parsed ({} blocks skipped)",
                week_identifier(today),
                report.skipped.len()
            );
            return Err(PlanError::Unparsable);
        }

        Ok(WeeklyWorkoutPlan {
            week_title: week_title(today),
            generated_date: date_label(today),
            fitness_goal: profile.primary_goal().to_string(),
            workouts: report.workouts,
        })
    }
}
