use figment::{
    providers::{Env, Format, Json, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::ai_client::GenerationSettings;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub profile_path: String,

    // API Settings
    pub cors_allowed_origins: String,
    pub api_bind_addr: String,

    // AI/Gemini Settings
    #[serde(default)]
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_temperature: f32,
    pub gemini_top_k: u32,
    pub gemini_top_p: f32,
    pub gemini_max_output_tokens: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        let generation = GenerationSettings::default();
        Self {
            database_url: "workout_planner.db".to_string(),
            profile_path: "profile.json".to_string(),
            cors_allowed_origins: "http://localhost:3000".to_string(),
            api_bind_addr: "127.0.0.1:3001".to_string(),
            gemini_api_key: "".to_string(),
            gemini_model: generation.model,
            gemini_temperature: generation.temperature,
            gemini_top_k: generation.top_k,
            gemini_top_p: generation.top_p,
            gemini_max_output_tokens: generation.max_output_tokens,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    fn figment() -> Figment {
        Figment::from(figment::providers::Serialized::defaults(
            AppConfig::default(),
        ))
        .merge(Toml::file("Planner.toml"))
        .merge(Json::file("Planner.json"))
        .merge(Env::raw().only(&[
            "DATABASE_URL",
            "PROFILE_PATH",
            "CORS_ALLOWED_ORIGINS",
            "API_BIND_ADDR",
            "GEMINI_API_KEY",
            "GEMINI_MODEL",
            "GEMINI_TEMPERATURE",
            "GEMINI_TOP_K",
            "GEMINI_TOP_P",
            "GEMINI_MAX_OUTPUT_TOKENS",
        ]))
    }

    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            model: self.gemini_model.clone(),
            temperature: self.gemini_temperature,
            top_k: self.gemini_top_k,
            top_p: self.gemini_top_p,
            max_output_tokens: self.gemini_max_output_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AppConfig;
    use figment::Jail;

    #[test]
    fn defaults_apply_without_sources() {
        Jail::expect_with(|_jail| {
            let config = AppConfig::load()?;
            assert_eq!(config.profile_path, "profile.json");
            assert_eq!(config.gemini_model, "gemini-2.5-flash-lite");
            assert_eq!(config.gemini_max_output_tokens, 8192);
            Ok(())
        });
    }

    #[test]
    fn cors_defaults_to_local_frontend() {
        assert_eq!(
            AppConfig::default().cors_allowed_origins,
            "http://localhost:3000"
        );
    }

    #[test]
    fn env_overrides_toml_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "Planner.toml",
                r#"
                database_url = "from_toml.db"
                gemini_model = "gemini-from-toml"
                "#,
            )?;
            jail.set_env("GEMINI_MODEL", "gemini-from-env");
            jail.set_env("GEMINI_API_KEY", "secret");

            let config = AppConfig::load()?;
            assert_eq!(config.database_url, "from_toml.db");
            assert_eq!(config.gemini_model, "gemini-from-env");
            assert_eq!(config.generation_settings().model, "gemini-from-env");
            assert_eq!(config.gemini_api_key, "secret");
            Ok(())
        });
    }
}
