use std::future::Future;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::models::UserProfile;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Why the generator could not produce plan text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("API quota exceeded. Please wait a few minutes or check your Gemini API quota.")]
    QuotaExceeded,
    #[error("Rate limit exceeded. Please wait a moment before trying again.")]
    RateLimited,
    #[error("Invalid API key. Please check your Gemini API key configuration.")]
    InvalidCredential,
    #[error("Unexpected API response. Please try again or check your API quota.")]
    MalformedResponse,
    #[error("Content blocked by safety filters. Please try adjusting your profile settings.")]
    ContentFiltered,
    #[error("Error generating workout plan: {0}")]
    Unknown(String),
}

impl GenerationError {
    /// Map an API failure onto the taxonomy, by message first and HTTP status second.
    pub fn classify(status: Option<u16>, message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("quota") {
            GenerationError::QuotaExceeded
        } else if lower.contains("rate limit") {
            GenerationError::RateLimited
        } else if lower.contains("api key") {
            GenerationError::InvalidCredential
        } else if lower.contains("unexpectedresponse") {
            GenerationError::MalformedResponse
        } else if lower.contains("blocked") {
            GenerationError::ContentFiltered
        } else {
            match status {
                Some(429) => GenerationError::RateLimited,
                Some(401) | Some(403) => GenerationError::InvalidCredential,
                _ if message.is_empty() => GenerationError::Unknown("Unknown error".to_string()),
                _ => GenerationError::Unknown(message.to_string()),
            }
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        // The request URL carries the API key; never let it into the message.
        let e = e.without_url();
        GenerationError::classify(e.status().map(|s| s.as_u16()), &e.to_string())
    }
}

/// Anything that can turn a profile into raw weekly plan text.
pub trait PlanGenerator {
    fn generate_weekly_plan(
        &self,
        profile: &UserProfile,
    ) -> impl Future<Output = Result<String, GenerationError>> + Send;
}

#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash-lite".to_string(),
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 8192,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<GeminiError>,
}

#[derive(Deserialize)]
struct GeminiError {
    code: Option<u16>,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ContentResponse>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

pub struct AiClient {
    client: Client,
    api_key: String,
    settings: GenerationSettings,
}

impl AiClient {
    pub fn new(api_key: String) -> Self {
        Self::with_settings(api_key, GenerationSettings::default())
    }

    pub fn with_settings(api_key: String, settings: GenerationSettings) -> Self {
        AiClient {
            client: Client::new(),
            api_key: api_key.trim().to_string(),
            settings,
        }
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn request_plan(&self, prompt: &str) -> Result<String, GenerationError> {
        if !self.has_api_key() {
            return Err(GenerationError::InvalidCredential);
        }

        let request_body = GeminiRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.settings.temperature,
                top_k: self.settings.top_k,
                top_p: self.settings.top_p,
                max_output_tokens: self.settings.max_output_tokens,
            },
        };

        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_BASE_URL, self.settings.model, self.api_key
        );

        info!("Requesting weekly workout plan from {}", self.settings.model);
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("Gemini API error: {} - {}", status, body);
            let message = serde_json::from_str::<GeminiResponse>(&body)
                .ok()
                .and_then(|r| r.error)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(GenerationError::classify(Some(status.as_u16()), &message));
        }

        let gemini_response: GeminiResponse = serde_json::from_str(&body).map_err(|e| {
            warn!("Failed to parse Gemini JSON: {}", e);
            GenerationError::MalformedResponse
        })?;

        plan_text(gemini_response)
    }
}

impl PlanGenerator for AiClient {
    async fn generate_weekly_plan(&self, profile: &UserProfile) -> Result<String, GenerationError> {
        let prompt = build_workout_prompt(profile);
        self.request_plan(&prompt).await
    }
}

fn plan_text(response: GeminiResponse) -> Result<String, GenerationError> {
    if let Some(error) = response.error {
        return Err(GenerationError::classify(error.code, &error.message));
    }

    if response
        .prompt_feedback
        .and_then(|f| f.block_reason)
        .is_some()
    {
        return Err(GenerationError::ContentFiltered);
    }

    let candidate = response
        .candidates
        .and_then(|c| c.into_iter().next())
        .ok_or(GenerationError::MalformedResponse)?;

    if matches!(
        candidate.finish_reason.as_deref(),
        Some("SAFETY") | Some("PROHIBITED_CONTENT") | Some("BLOCKLIST")
    ) {
        return Err(GenerationError::ContentFiltered);
    }

    let text: String = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|p| p.text)
        .collect();

    if text.trim().is_empty() {
        return Err(GenerationError::MalformedResponse);
    }
    Ok(text)
}

pub fn build_workout_prompt(profile: &UserProfile) -> String {
    let goals = join_labels(&profile.fitness_goals, format_goal);
    let equipment = join_labels(&profile.available_equipment, format_equipment);
    let preferred = join_labels(&profile.preferred_workouts, format_workout);
    let health = join_labels(&profile.health_conditions, format_health_condition);
    let days = profile.workout_days_per_week.min(7);

    format!(
        r#"Create a personalized weekly workout plan for a user with the following profile:

USER PROFILE:
- Fitness Goals: {goals}
- Workout Experience: {experience}
- Available Equipment: {equipment}
- Preferred Workout Types: {preferred}
- Workout Days Per Week: {days}
- Workout Duration: {duration} minutes per session
- Health Considerations: {health}

Create a {days}-day workout plan (the remaining days will be rest days).

For EACH DAY, provide the following in this EXACT format:

DAY: [Day name - Monday, Tuesday, etc.]
TYPE: [Workout type - Strength, Cardio, HIIT, Yoga, or Rest]
DURATION: [Number only - duration in minutes]
DIFFICULTY: [Easy, Medium, or Hard]
TARGET: [Muscle groups - e.g., "Chest, Triceps, Shoulders"]

EXERCISES:
1. [Exercise Name]
   - Sets: [number]
   - Reps: [number or time]
   - Rest: [seconds]
   - Notes: [Brief form tips or modifications]

2. [Exercise Name]
   - Sets: [number]
   - Reps: [number or time]
   - Rest: [seconds]
   - Notes: [Brief form tips or modifications]

[Continue for all exercises in that day]

---

IMPORTANT FORMATTING RULES:
1. Always use the exact field names: DAY, TYPE, DURATION, DIFFICULTY, TARGET, EXERCISES
2. Use "---" to separate each day
3. For rest days, use TYPE: Rest and skip the exercises section
4. Keep exercise count to 5-8 exercises per workout day
5. Adjust difficulty based on experience level
6. Consider health conditions when selecting exercises
7. Match workout types to user preferences when possible
8. Ensure equipment matches what's available
9. Balance muscle groups throughout the week
10. Include warm-up and cool-down in the exercise count

Generate all 7 days ({days} workout days + {rest_days} rest days)."#,
        goals = or_fallback(goals, "General fitness"),
        experience = format_experience(&profile.workout_experience),
        equipment = or_fallback(equipment, "No equipment (bodyweight only)"),
        preferred = or_fallback(preferred, "Any type"),
        days = days,
        duration = profile.workout_duration_minutes,
        health = or_fallback(health, "None"),
        rest_days = 7 - days,
    )
}

fn join_labels(codes: &[String], label: fn(&str) -> &str) -> String {
    codes
        .iter()
        .map(|code| label(code))
        .collect::<Vec<_>>()
        .join(", ")
}

fn or_fallback(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

fn format_goal(goal: &str) -> &str {
    match goal {
        "lose_fat" => "Lose Fat",
        "build_muscle" => "Build Muscle",
        "maintain_weight" => "Maintain Weight",
        "improve_endurance" => "Improve Endurance",
        "increase_flexibility" => "Increase Flexibility",
        "general_health" => "General Health",
        other => other,
    }
}

fn format_experience(experience: &str) -> &'static str {
    match experience {
        "intermediate" => "Intermediate",
        "advanced" => "Advanced",
        _ => "Beginner",
    }
}

fn format_workout(workout: &str) -> &str {
    match workout {
        "strength" => "Strength Training",
        "cardio" => "Cardio",
        "hiit" => "HIIT",
        "yoga" => "Yoga",
        "swimming" => "Swimming",
        "running" => "Running",
        "cycling" => "Cycling",
        "sports" => "Sports",
        "home" => "Home Workouts",
        "gym" => "Gym Workouts",
        other => other,
    }
}

fn format_equipment(equipment: &str) -> &str {
    match equipment {
        "none" => "No Equipment",
        "dumbbells" => "Dumbbells",
        "barbell" => "Barbell",
        "resistance_bands" => "Resistance Bands",
        "pullup_bar" => "Pull-up Bar",
        "kettlebells" => "Kettlebells",
        "full_gym" => "Full Gym Access",
        "cardio_machines" => "Cardio Machines",
        other => other,
    }
}

fn format_health_condition(condition: &str) -> &str {
    match condition {
        "none" => "None",
        "back_problems" => "Back Problems",
        "knee_issues" => "Knee Issues",
        "shoulder_problems" => "Shoulder Problems",
        "heart_condition" => "Heart Condition",
        "diabetes" => "Diabetes",
        "high_blood_pressure" => "High Blood Pressure",
        "other" => "Other",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> GeminiResponse {
        serde_json::from_str(json).expect("response json should parse")
    }

    #[test]
    fn classify_matches_messages_case_insensitively() {
        assert_eq!(
            GenerationError::classify(None, "Resource has been exhausted (e.g. check QUOTA)."),
            GenerationError::QuotaExceeded
        );
        assert_eq!(
            GenerationError::classify(None, "Rate limit reached"),
            GenerationError::RateLimited
        );
        assert_eq!(
            GenerationError::classify(Some(400), "API key not valid. Please pass a valid API key."),
            GenerationError::InvalidCredential
        );
        assert_eq!(
            GenerationError::classify(None, "UnexpectedResponse from server"),
            GenerationError::MalformedResponse
        );
        assert_eq!(
            GenerationError::classify(None, "Prompt was blocked"),
            GenerationError::ContentFiltered
        );
    }

    #[test]
    fn classify_falls_back_to_status() {
        assert_eq!(
            GenerationError::classify(Some(429), "Too many requests"),
            GenerationError::RateLimited
        );
        assert_eq!(
            GenerationError::classify(Some(403), "Permission denied"),
            GenerationError::InvalidCredential
        );
        assert_eq!(
            GenerationError::classify(Some(500), "Internal error"),
            GenerationError::Unknown("Internal error".to_string())
        );
    }

    #[test]
    fn plan_text_joins_candidate_parts() {
        let r = response(
            r#"{"candidates":[{"content":{"parts":[{"text":"DAY: Monday\n"},{"text":"TYPE: Yoga"}]},"finishReason":"STOP"}]}"#,
        );
        assert_eq!(plan_text(r).expect("text"), "DAY: Monday\nTYPE: Yoga");
    }

    #[test]
    fn plan_text_reports_blocked_prompt() {
        let r = response(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#);
        assert_eq!(plan_text(r), Err(GenerationError::ContentFiltered));

        let r = response(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#);
        assert_eq!(plan_text(r), Err(GenerationError::ContentFiltered));
    }

    #[test]
    fn plan_text_without_content_is_malformed() {
        assert_eq!(plan_text(response("{}")), Err(GenerationError::MalformedResponse));
        let r = response(r#"{"candidates":[{"content":{"parts":[]}}]}"#);
        assert_eq!(plan_text(r), Err(GenerationError::MalformedResponse));
    }

    #[test]
    fn plan_text_surfaces_api_error() {
        let r = response(r#"{"error":{"code":429,"message":"Quota exceeded for metric"}}"#);
        assert_eq!(plan_text(r), Err(GenerationError::QuotaExceeded));
    }

    #[test]
    fn prompt_uses_readable_profile_labels() {
        let profile = UserProfile {
            fitness_goals: vec!["build_muscle".to_string(), "custom_goal".to_string()],
            workout_experience: "advanced".to_string(),
            available_equipment: vec!["dumbbells".to_string(), "pullup_bar".to_string()],
            preferred_workouts: vec![],
            workout_days_per_week: 4,
            workout_duration_minutes: 60,
            health_conditions: vec!["knee_issues".to_string()],
        };
        let prompt = build_workout_prompt(&profile);
        assert!(prompt.contains("- Fitness Goals: Build Muscle, custom_goal"));
        assert!(prompt.contains("- Workout Experience: Advanced"));
        assert!(prompt.contains("- Available Equipment: Dumbbells, Pull-up Bar"));
        assert!(prompt.contains("- Preferred Workout Types: Any type"));
        assert!(prompt.contains("- Health Considerations: Knee Issues"));
        assert!(prompt.contains("Generate all 7 days (4 workout days + 3 rest days)."));
    }

    #[test]
    fn prompt_falls_back_for_empty_profile() {
        let prompt = build_workout_prompt(&UserProfile {
            workout_experience: "unknown".to_string(),
            ..UserProfile::default()
        });
        assert!(prompt.contains("- Fitness Goals: General fitness"));
        assert!(prompt.contains("- Workout Experience: Beginner"));
        assert!(prompt.contains("- Available Equipment: No equipment (bodyweight only)"));
        assert!(prompt.contains("- Health Considerations: None"));
    }

    #[tokio::test]
    async fn transport_error_message_omits_api_key() {
        let err = Client::new()
            .post("http://127.0.0.1:1/v1beta/models/m:generateContent?key=SECRET-KEY-123")
            .send()
            .await
            .expect_err("nothing listens on port 1");

        let generation: GenerationError = err.into();
        assert!(matches!(generation, GenerationError::Unknown(_)));
        assert!(!generation.to_string().contains("SECRET-KEY-123"));
        assert!(!format!("{:?}", generation).contains("SECRET-KEY-123"));
    }

    #[tokio::test]
    async fn missing_api_key_fails_before_any_request() {
        let client = AiClient::new("   ".to_string());
        assert!(!client.has_api_key());
        let result = client.generate_weekly_plan(&UserProfile::default()).await;
        assert_eq!(result, Err(GenerationError::InvalidCredential));
    }
}
