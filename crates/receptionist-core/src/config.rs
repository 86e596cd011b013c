//! Tenant ("Company") configuration and process-level [`AppConfig`].
//!
//! A `figment`-based loader: a TOML file merged with `RECEPTIONIST_*`
//! environment overrides, falling back to a typed [`Default`] when no file
//! is present so the process still boots.

use std::collections::HashMap;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Default confidence threshold for the Tier-1.5 scenario short-circuit
/// (spec.md §4.5). Read from `globalProductionIntelligence.thresholds.tier1`.
pub const DEFAULT_TIER1_THRESHOLD: f32 = 0.65;

/// Default per-slot loop-prevention ceiling (spec.md §4.6.5).
pub const DEFAULT_MAX_SAME_QUESTION: u32 = 2;

/// Default voice-channel turn deadline (spec.md §5).
pub const DEFAULT_VOICE_DEADLINE_MS: u64 = 3_500;

/// Default soft timeout for the LLM fallback call (spec.md §5).
pub const DEFAULT_LLM_TIMEOUT_MS: u64 = 2_000;

/// Process-level configuration: gateway bind address, database paths, and
/// the global thresholds that are not tenant-specific.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub global: GlobalConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            database: DatabaseConfig::default(),
            global: GlobalConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load `receptionist.toml` (explicit path, else `RECEPTIONIST_CONFIG`
    /// env var, else `./receptionist.toml`), merged with `RECEPTIONIST_*`
    /// environment overrides. Falls back to [`Default`] on any load error —
    /// config errors must never be loud enough to stop the process booting
    /// (spec.md §7).
    pub fn load(explicit_path: Option<&str>) -> Result<Self> {
        let path = explicit_path
            .map(String::from)
            .or_else(|| std::env::var("RECEPTIONIST_CONFIG").ok())
            .unwrap_or_else(|| "receptionist.toml".to_string());

        Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("RECEPTIONIST_").split("__"))
            .join(figment::providers::Serialized::defaults(AppConfig::default()))
            .extract()
            .map_err(|e| CoreError::Config(e.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Shared secret used to verify inbound telephony/SMS webhook signatures.
    #[serde(default)]
    pub webhook_signing_secret: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            webhook_signing_secret: None,
        }
    }
}

fn default_port() -> u16 {
    8080
}
fn default_bind() -> String {
    "127.0.0.1".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "./receptionist.sqlite3".to_string()
}

/// Thresholds and knobs that apply across all tenants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub thresholds: GlobalThresholds,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            thresholds: GlobalThresholds::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalThresholds {
    #[serde(default = "default_tier1_threshold")]
    pub tier1: f32,
}

impl Default for GlobalThresholds {
    fn default() -> Self {
        Self {
            tier1: default_tier1_threshold(),
        }
    }
}

fn default_tier1_threshold() -> f32 {
    DEFAULT_TIER1_THRESHOLD
}

// ---------------------------------------------------------------------------
// Tenant config ("Company", spec.md §3)
// ---------------------------------------------------------------------------

/// A tenant's full, read-only-per-turn configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub company_id: String,
    pub name: String,
    pub trade: String,
    #[serde(default)]
    pub service_areas: Vec<String>,
    pub front_desk_behavior: FrontDeskBehavior,
    #[serde(default)]
    pub calendar_config: CalendarConfig,
    #[serde(default)]
    pub sms_config: SmsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CalendarConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub calendar_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SmsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub quiet_hours_start_hour: Option<u8>,
    #[serde(default)]
    pub quiet_hours_end_hour: Option<u8>,
    #[serde(default)]
    pub reminder_lead_hours: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontDeskBehavior {
    #[serde(default)]
    pub booking_slots: Vec<BookingSlotDef>,
    #[serde(default)]
    pub conversation_stages: ConversationStages,
    #[serde(default)]
    pub detection_triggers: DetectionTriggers,
    #[serde(default)]
    pub discovery_consent: DiscoveryConsent,
    #[serde(default)]
    pub name_spelling_variants: NameSpellingVariants,
    #[serde(default)]
    pub fast_path_booking: FastPathBooking,
    #[serde(default)]
    pub booking_outcome: BookingOutcome,
    #[serde(default)]
    pub escalation: Escalation,
    #[serde(default)]
    pub loop_prevention: LoopPrevention,
    #[serde(default)]
    pub access_flow: AccessFlow,
    #[serde(default)]
    pub caller_vocabulary: CallerVocabulary,
    #[serde(default)]
    pub filler_words: FillerWords,
    #[serde(default)]
    pub name_stop_words: Vec<String>,
    #[serde(default)]
    pub common_first_names: Vec<String>,
    #[serde(default)]
    pub stt_protected_words: Vec<String>,
    /// Booking abort phrases (spec.md §4.6.9): "never mind", "cancel", …
    #[serde(default)]
    pub booking_abort_phrases: Vec<String>,
    /// Rotating silence-prompt list (spec.md §4.4 #1). Cycled by
    /// `session.metrics.silence_count`.
    #[serde(default = "default_silence_prompts")]
    pub silence_prompts: Vec<String>,
    /// Consecutive silences before the silence intercept offers a transfer.
    #[serde(default = "default_silence_transfer_after")]
    pub silence_transfer_after: u32,
}

/// Tagged slot type. Adding a new variant plus a handler is the only change
/// needed to support a new slot kind (spec.md §9, "polymorphism over slot
/// type").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlotType {
    Name,
    Phone,
    Address,
    Time,
    Email,
    Custom { kind: String },
}

impl SlotType {
    pub fn as_label(&self) -> &str {
        match self {
            SlotType::Name => "name",
            SlotType::Phone => "phone",
            SlotType::Address => "address",
            SlotType::Time => "time",
            SlotType::Email => "email",
            SlotType::Custom { kind } => kind.as_str(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AddressConfirmLevel {
    #[default]
    Full,
    StreetOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnitNumberMode {
    #[default]
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MidCallRule {
    pub trigger: String,
    pub response_template: String,
    #[serde(default)]
    pub cooldown_turns: u32,
    #[serde(default)]
    pub max_per_call: u32,
    #[serde(default)]
    pub action: MidCallAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MidCallAction {
    #[default]
    Continue,
    Escalate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingSlotDef {
    pub slot_id: String,
    #[serde(flatten)]
    pub slot_type: SlotType,
    pub question: String,
    #[serde(default)]
    pub confirm_prompt: Option<String>,
    #[serde(default)]
    pub reprompt_variants: Vec<String>,
    #[serde(default = "bool_true")]
    pub required: bool,
    #[serde(default)]
    pub confirm_back: bool,
    #[serde(default)]
    pub ask_full_name: bool,
    #[serde(default)]
    pub ask_missing_name_part: bool,
    #[serde(default)]
    pub offer_caller_id: bool,
    #[serde(default)]
    pub caller_id_prompt: Option<String>,
    #[serde(default)]
    pub accept_text_me: bool,
    #[serde(default)]
    pub break_down_if_unclear: bool,
    #[serde(default)]
    pub area_code_prompt: Option<String>,
    #[serde(default)]
    pub rest_of_number_prompt: Option<String>,
    #[serde(default)]
    pub city_prompt: Option<String>,
    #[serde(default)]
    pub zip_prompt: Option<String>,
    #[serde(default)]
    pub partial_address_prompt: Option<String>,
    #[serde(default)]
    pub address_confirm_level: AddressConfirmLevel,
    #[serde(default)]
    pub accept_partial_address: bool,
    #[serde(default)]
    pub use_google_maps_validation: bool,
    #[serde(default)]
    pub unit_number_mode: UnitNumberMode,
    #[serde(default)]
    pub unit_prompt_variants: Vec<String>,
    #[serde(default)]
    pub offer_asap: bool,
    #[serde(default)]
    pub asap_phrase: Option<String>,
    #[serde(default)]
    pub spell_out_email: bool,
    #[serde(default)]
    pub offer_to_send_text: bool,
    #[serde(default)]
    pub confirm_spelling: bool,
    #[serde(default)]
    pub last_name_question: Option<String>,
    #[serde(default)]
    pub first_name_question: Option<String>,
    #[serde(default)]
    pub mid_call_rules: Vec<MidCallRule>,
    #[serde(default)]
    pub offer_morning_afternoon: bool,
}

fn bool_true() -> bool {
    true
}

fn default_silence_prompts() -> Vec<String> {
    vec![
        "Sorry, I didn't catch that — could you say that again?".to_string(),
        "I'm still here — go ahead whenever you're ready.".to_string(),
        "Are you still there?".to_string(),
    ]
}

fn default_silence_transfer_after() -> u32 {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConversationStages {
    #[serde(default)]
    pub greeting_rules: Vec<GreetingRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreetingRule {
    pub trigger: String,
    pub response: String,
    #[serde(default)]
    pub fuzzy: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DetectionTriggers {
    #[serde(default)]
    pub wants_booking: Vec<String>,
    #[serde(default)]
    pub describing_problem: Vec<String>,
    #[serde(default)]
    pub trust_concern: Vec<String>,
    #[serde(default)]
    pub refused_slot: Vec<String>,
    #[serde(default)]
    pub caller_feels_ignored: Vec<String>,
    #[serde(default)]
    pub implicit_consent_phrases: Vec<String>,
    #[serde(default)]
    pub direct_intent_patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConsent {
    #[serde(default = "bool_true")]
    pub booking_requires_explicit_consent: bool,
    #[serde(default)]
    pub force_llm_discovery: bool,
    #[serde(default)]
    pub disable_scenario_auto_responses: bool,
    #[serde(default)]
    pub auto_reply_allowed_scenario_types: Vec<String>,
    #[serde(default)]
    pub consent_phrases: Vec<String>,
    #[serde(default = "default_consent_yes_words")]
    pub consent_yes_words: Vec<String>,
    #[serde(default)]
    pub consent_requires_yes_after_prompt: bool,
    #[serde(default)]
    pub min_discovery_fields_before_consent: Vec<String>,
    #[serde(default)]
    pub auto_inject_consent_in_scenarios: bool,
    #[serde(default)]
    pub consent_question_template: Option<String>,
    #[serde(default)]
    pub clarifying_questions: ClarifyingQuestions,
    #[serde(default = "default_issue_capture_min_confidence")]
    pub issue_capture_min_confidence: f32,
    #[serde(default)]
    pub tech_name_exclude_words: Vec<String>,
    /// V110 owner-priority deployment mode is active iff this is non-empty
    /// (spec.md §4.9). Each entry names a discovery field collected before
    /// booking may begin.
    #[serde(default)]
    pub discovery_flow_steps: Vec<String>,
}

impl Default for DiscoveryConsent {
    fn default() -> Self {
        Self {
            booking_requires_explicit_consent: true,
            force_llm_discovery: false,
            disable_scenario_auto_responses: false,
            auto_reply_allowed_scenario_types: Vec::new(),
            consent_phrases: Vec::new(),
            consent_yes_words: default_consent_yes_words(),
            consent_requires_yes_after_prompt: false,
            min_discovery_fields_before_consent: Vec::new(),
            auto_inject_consent_in_scenarios: false,
            consent_question_template: None,
            clarifying_questions: ClarifyingQuestions::default(),
            issue_capture_min_confidence: default_issue_capture_min_confidence(),
            tech_name_exclude_words: Vec::new(),
            discovery_flow_steps: Vec::new(),
        }
    }
}

impl DiscoveryConsent {
    /// spec.md §4.9: V110 owner-priority mode is active whenever the tenant
    /// has configured discovery-flow steps.
    pub fn is_v110(&self) -> bool {
        !self.discovery_flow_steps.is_empty()
    }
}

fn default_consent_yes_words() -> Vec<String> {
    vec![
        "yes", "yeah", "yep", "sure", "absolutely", "ok", "okay", "please",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_issue_capture_min_confidence() -> f32 {
    0.5
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClarifyingQuestions {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub vague_patterns: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpellingVariantMode {
    #[default]
    OneCharOnly,
    AnyVariant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VariantSource {
    #[default]
    CuratedList,
    AutoScan,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NameSpellingVariants {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub mode: SpellingVariantMode,
    #[serde(default)]
    pub source: VariantSource,
    #[serde(default)]
    pub variant_groups: HashMap<String, Vec<String>>,
    /// Precomputed admin-side — looked up O(1) at runtime, never scanned
    /// (spec.md §4.6.1).
    #[serde(default)]
    pub precomputed_variant_map: HashMap<String, Vec<String>>,
    #[serde(default = "default_max_variant_asks")]
    pub max_asks_per_call: u32,
    #[serde(default)]
    pub script: Option<String>,
}

fn default_max_variant_asks() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FastPathBooking {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub trigger_keywords: Vec<String>,
    #[serde(default)]
    pub offer_script: Option<String>,
    #[serde(default)]
    pub one_question_script: Option<String>,
    #[serde(default)]
    pub max_discovery_questions: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingOutcomeMode {
    ConfirmedOnCall,
    PendingDispatch,
    CallbackRequired,
    TransferToScheduler,
    AfterHoursHold,
}

impl Default for BookingOutcomeMode {
    fn default() -> Self {
        BookingOutcomeMode::PendingDispatch
    }
}

impl BookingOutcomeMode {
    pub fn as_key(&self) -> &'static str {
        match self {
            BookingOutcomeMode::ConfirmedOnCall => "confirmed_on_call",
            BookingOutcomeMode::PendingDispatch => "pending_dispatch",
            BookingOutcomeMode::CallbackRequired => "callback_required",
            BookingOutcomeMode::TransferToScheduler => "transfer_to_scheduler",
            BookingOutcomeMode::AfterHoursHold => "after_hours_hold",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BookingOutcome {
    #[serde(default)]
    pub mode: BookingOutcomeMode,
    #[serde(default)]
    pub final_scripts: HashMap<String, String>,
    #[serde(default)]
    pub asap_variant_script: Option<String>,
    #[serde(default)]
    pub use_asap_variant: bool,
    #[serde(default)]
    pub custom_final_script: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Escalation {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub trigger_phrases: Vec<String>,
    #[serde(default = "default_transfer_message")]
    pub transfer_message: String,
    #[serde(default = "default_offer_message")]
    pub offer_message: String,
}

impl Default for Escalation {
    fn default() -> Self {
        Self {
            enabled: false,
            trigger_phrases: Vec::new(),
            transfer_message: default_transfer_message(),
            offer_message: default_offer_message(),
        }
    }
}

fn default_transfer_message() -> String {
    "Let me connect you with someone who can help right away.".to_string()
}

fn default_offer_message() -> String {
    "Would you like me to transfer you to a team member?".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OnLoopAction {
    #[default]
    Rephrase,
    Escalate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopPrevention {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "default_max_same_question")]
    pub max_same_question: u32,
    #[serde(default = "default_rephrase_intro")]
    pub rephrase_intro: String,
    #[serde(default)]
    pub on_loop: OnLoopAction,
}

impl Default for LoopPrevention {
    fn default() -> Self {
        Self {
            enabled: true,
            max_same_question: default_max_same_question(),
            rephrase_intro: default_rephrase_intro(),
            on_loop: OnLoopAction::default(),
        }
    }
}

fn default_max_same_question() -> u32 {
    DEFAULT_MAX_SAME_QUESTION
}

fn default_rephrase_intro() -> String {
    "Let me ask that a different way —".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AccessFlow {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub trade_applicability: Vec<String>,
    #[serde(default)]
    pub property_type_enabled: bool,
    #[serde(default)]
    pub property_type_question: Option<String>,
    #[serde(default)]
    pub unit_question: Option<String>,
    #[serde(default)]
    pub gated_question: Option<String>,
    #[serde(default)]
    pub gate_access_type_question: Option<String>,
    #[serde(default)]
    pub gate_code_question: Option<String>,
    #[serde(default)]
    pub gate_guard_notify_prompt: Option<String>,
    #[serde(default = "default_max_follow_ups")]
    pub max_follow_ups: u32,
}

fn default_max_follow_ups() -> u32 {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CallerVocabulary {
    #[serde(default)]
    pub synonym_map: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FillerWords {
    #[serde(default)]
    pub custom: Vec<String>,
}
