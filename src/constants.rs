pub const RES_TX_ERR: &str = "Failed to send grading update to res_tx";

pub const DEFAULT_AI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MAX_AI_SCORE: f64 = 30.0;
pub const DEFAULT_FALLBACK_SCORE_RATIO: f64 = 0.8;

// Sub-score ceilings of the quality rubric. The total is capped by
// `ScoringConfiguration::max_ai_score` instead.
pub const MAX_LOGIC_SCORE: f64 = 10.0;
pub const MAX_REDUNDANCY_SCORE: f64 = 10.0;
pub const MAX_STRUCTURE_SCORE: f64 = 5.0;
pub const MAX_EFFICIENCY_SCORE: f64 = 5.0;

pub const SCORING_TEMPERATURE: f32 = 0.1;

pub const DEFAULT_SCORER_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_COMPILE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 16 * 1024 * 1024;

/// Locale forced on every executed program so all three streams are UTF-8.
pub const CHILD_LOCALE: &str = "C.UTF-8";
