use serde::{Deserialize, Serialize};

pub const DEFAULT_SETS: u32 = 3;
pub const DEFAULT_REPS: &str = "10-12";
pub const DEFAULT_REST_SECONDS: u32 = 60;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DailyWorkout {
    pub day_of_week: String,
    pub workout_type: String,
    pub duration_minutes: u32,
    pub difficulty: String,
    pub target_muscles: Vec<String>,
    pub exercises: Vec<Exercise>,
    pub is_rest_day: bool,
}

impl DailyWorkout {
    pub fn exercise_count(&self) -> usize {
        self.exercises.len()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Exercise {
    pub name: String,
    pub sets: u32,
    pub reps: String, // e.g. "8-12" or "30 seconds"
    pub rest_seconds: u32,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub muscle_group: String,
}

impl Exercise {
    /// An exercise carrying the default prescription.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sets: DEFAULT_SETS,
            reps: DEFAULT_REPS.to_string(),
            rest_seconds: DEFAULT_REST_SECONDS,
            notes: String::new(),
            muscle_group: String::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WeeklyWorkoutPlan {
    pub week_title: String,
    pub generated_date: String,
    pub fitness_goal: String,
    pub workouts: Vec<DailyWorkout>,
}

// --- Onboarding profile, as answered in the setup questionnaire ---

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserProfile {
    #[serde(default)]
    pub fitness_goals: Vec<String>,
    #[serde(default = "default_experience")]
    pub workout_experience: String,
    #[serde(default)]
    pub available_equipment: Vec<String>,
    #[serde(default)]
    pub preferred_workouts: Vec<String>,
    #[serde(default = "default_days_per_week")]
    pub workout_days_per_week: u32,
    #[serde(default = "default_duration_minutes")]
    pub workout_duration_minutes: u32,
    #[serde(default)]
    pub health_conditions: Vec<String>,
}

fn default_experience() -> String {
    "beginner".to_string()
}

fn default_days_per_week() -> u32 {
    3
}

fn default_duration_minutes() -> u32 {
    45
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            fitness_goals: Vec::new(),
            workout_experience: default_experience(),
            available_equipment: Vec::new(),
            preferred_workouts: Vec::new(),
            workout_days_per_week: default_days_per_week(),
            workout_duration_minutes: default_duration_minutes(),
            health_conditions: Vec::new(),
        }
    }
}

impl UserProfile {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        use anyhow::Context;

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile at {}", path))?;
        let profile: UserProfile =
            serde_json::from_str(&data).context("Failed to parse profile JSON")?;
        Ok(profile)
    }

    pub fn primary_goal(&self) -> &str {
        self.fitness_goals
            .first()
            .map(String::as_str)
            .unwrap_or("general_health")
    }
}
