//! Turn Orchestrator (spec.md §4.8): the top-level `process_turn` pipeline
//! that every channel adapter calls through. Routes by mode, runs the
//! deterministic intercepts, the scenario cascade, and the booking
//! controller, and is responsible for the one non-negotiable synchronous
//! side effect in the whole system — the audit write (spec.md §5).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use receptionist_audit::{
    AuditRecord, AuditStore, ComplianceResult, DiscoverySnapshot, MatchingPipeline, ResponseAttribution,
};
use receptionist_booking::{BookingTurnOutcome, CalendarClient, SmsClient};
use receptionist_core::config::Company;
use receptionist_core::{AgentIntent, Channel, Mode, Tier};
use receptionist_llm::{CallContext, ConversationRole, ConversationTurn, LlmClient, LlmRequest};
use receptionist_scenarios::ScenarioRetriever;
use receptionist_sessions::{Session, SessionKey, SessionLockRegistry, SessionStore, Turn, TurnRole};
use receptionist_slots::{detect_consent, extract_address, extract_phone, extract_time, preprocess};
use tracing::{error, instrument, warn};
use uuid::Uuid;

use crate::cascade::try_short_circuit;
use crate::discovery;
use crate::intercepts;

/// Everything a channel adapter supplies for one inbound turn
/// (spec.md §6.1 `processTurn` signature).
pub struct TurnRequest<'a> {
    pub company: &'a Company,
    pub channel: &'a str,
    pub identifier: &'a str,
    pub user_text: &'a str,
    pub caller_id: Option<&'a str>,
    pub call_sid: Option<&'a str>,
    pub force_new_session: bool,
}

/// The structured response every turn produces (spec.md §4.8 step 17).
#[derive(Debug, Clone, serde::Serialize)]
pub struct TurnResponse {
    pub success: bool,
    pub reply: String,
    pub session_id: String,
    pub phase: String,
    pub mode: Mode,
    pub slots_collected: HashMap<String, String>,
    pub wants_booking: bool,
    pub match_source: String,
    pub tier: String,
    pub latency_ms: u64,
    pub tokens_used: u64,
    pub requires_transfer: bool,
    pub signals: Vec<String>,
}

pub struct TurnOrchestrator {
    pub session_store: Arc<dyn SessionStore>,
    pub scenario_retriever: Arc<dyn ScenarioRetriever>,
    pub llm_client: Arc<dyn LlmClient>,
    pub booking_store: Arc<dyn receptionist_booking::BookingStore>,
    pub calendar_client: Arc<dyn CalendarClient>,
    pub sms_client: Arc<dyn SmsClient>,
    pub audit_store: Arc<dyn AuditStore>,
    pub tier1_threshold: f32,
    /// Per-session turn lock (spec.md §5): acquired before the session is
    /// loaded and held until it is saved, so retries and racing channel
    /// deliveries for the same session serialize instead of interleaving.
    pub locks: SessionLockRegistry,
}

impl TurnOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session_store: Arc<dyn SessionStore>,
        scenario_retriever: Arc<dyn ScenarioRetriever>,
        llm_client: Arc<dyn LlmClient>,
        booking_store: Arc<dyn receptionist_booking::BookingStore>,
        calendar_client: Arc<dyn CalendarClient>,
        sms_client: Arc<dyn SmsClient>,
        audit_store: Arc<dyn AuditStore>,
        tier1_threshold: f32,
    ) -> Self {
        Self {
            session_store,
            scenario_retriever,
            llm_client,
            booking_store,
            calendar_client,
            sms_client,
            audit_store,
            tier1_threshold,
            locks: SessionLockRegistry::new(),
        }
    }

    /// Run the full pipeline for one turn. Error containment (spec.md §4.8
    /// "Error containment"): any failure downstream of session load is
    /// caught and converted to a smart fallback reply rather than
    /// propagated to the channel adapter.
    #[instrument(skip(self, req), fields(company_id = %req.company.company_id, channel = %req.channel))]
    pub async fn process_turn(&self, req: TurnRequest<'_>) -> TurnResponse {
        let start = Instant::now();
        let turn_trace_id = Uuid::now_v7().to_string();
        let call_id = req.call_sid.map(str::to_string).unwrap_or_else(|| format!("call-{}", Uuid::now_v7()));

        // Step 1: normalize channel.
        let Some(channel) = Channel::parse(req.channel) else {
            return fallback_response("Sorry, I'm having trouble with this line — let me get someone on it.", start);
        };

        // Step 3: load or create session. The turn lock is held across the
        // full load→mutate→save cycle so a retried or racing delivery for
        // this same session blocks instead of interleaving (spec.md §5).
        let key = SessionKey::new(req.company.company_id.clone().into(), channel, req.identifier);
        let _turn_guard = self.locks.acquire(&key).await;
        let mut session = match self.session_store.get_or_create(&key, req.force_new_session).await {
            Ok(s) => s,
            Err(e) => {
                error!("session load failed: {e}");
                return fallback_response("Let me get that for you — one moment.", start);
            }
        };

        let previous_mode = session.mode;

        // Step 4: filler/vocabulary preprocessing.
        let behavior = &req.company.front_desk_behavior;
        let cleaned = preprocess(req.user_text, &behavior.filler_words, &behavior.caller_vocabulary);

        // The silence intercept's transfer-after-N and rotating-prompt
        // behavior (spec.md §4.4 #1) both key off *consecutive* silent
        // turns, so this must happen on every turn, not just inside
        // `add_turn` (which nothing on this path calls).
        if receptionist_slots::is_effectively_silent(&cleaned) {
            session.metrics.silence_count += 1;
        } else {
            session.metrics.silence_count = 0;
        }

        session.push_turn(TurnRole::User, req.user_text, 0, Some("inbound".to_string()));

        // Step 5: deterministic intercepts.
        if let Some(hit) = intercepts::run(&cleaned, &mut session, req.company) {
            return self
                .finish(
                    req.company,
                    &mut session,
                    previous_mode,
                    hit.reply,
                    hit.match_source.to_string(),
                    Tier::Tier1,
                    0,
                    hit.requires_transfer,
                    vec![],
                    start,
                    &call_id,
                    &turn_trace_id,
                    None,
                )
                .await;
        }

        // Step 7: detection-trigger flags.
        set_detection_flags(&mut session, &cleaned, &behavior.detection_triggers);

        // Step 8: booking intent / consent evaluation.
        let consent = &behavior.discovery_consent;
        let has_v110 = consent.is_v110();
        let consent_pending = session.flags.get("consent_pending").copied().unwrap_or(false);
        let last_agent_offered_scheduling = session
            .turns
            .iter()
            .rev()
            .find(|t| matches!(t.role, TurnRole::Assistant))
            .map(|t| implies_scheduling_offer(&t.text))
            .unwrap_or(false);

        let consent_result = detect_consent(
            &cleaned,
            &behavior.detection_triggers,
            consent.booking_requires_explicit_consent,
            consent_pending,
            last_agent_offered_scheduling,
            has_v110,
        );

        let mut signals = Vec::new();
        if consent_result.has_consent {
            session.booking.consent_given = true;
            session.booking.consent_phrase = consent_result.matched_phrase.clone();
            session.booking.consent_turn = Some(session.metrics.total_turns);
            session.flags.remove("consent_pending");
            receptionist_sessions::SessionLocks::set_once(&mut session.locks.booking_started);

            if !has_v110 {
                session.try_set_mode(Mode::Booking, false);
            } else {
                session.flags.insert("scheduling_accepted".to_string(), true);
                signals.push("scheduling_accepted".to_string());
            }
        }

        // Step 10: discovery extraction.
        discovery::extract(&cleaned, &mut session.discovery, consent.issue_capture_min_confidence);

        // Step 11/12: opportunistic slot extraction, gated by booking activity.
        extract_and_gate_slots(&mut session, &cleaned, behavior);

        let wants_booking = session.mode == Mode::Booking || session.booking.consent_given;

        // Step 13: mode routing.
        let (reply, match_source, tier, tokens_used, requires_transfer, matching) = match session.mode {
            Mode::Complete => self.route_complete(&cleaned, req.company, &mut session).await,
            Mode::Booking => {
                self.route_booking(&cleaned, req.company, &mut session, req.caller_id).await
            }
            Mode::Discovery | Mode::Error => {
                self.route_discovery(&cleaned, req.company, &mut session).await
            }
        };

        self.finish(
            req.company,
            &mut session,
            previous_mode,
            reply,
            match_source,
            tier,
            tokens_used,
            requires_transfer,
            {
                if wants_booking {
                    signals.push("wants_booking".to_string());
                }
                signals
            },
            start,
            &call_id,
            &turn_trace_id,
            matching,
        )
        .await
    }

    async fn route_complete(&self, text: &str, company: &Company, session: &mut Session) -> RouteOutcome {
        let lower = text.to_lowercase();
        if lower.contains("new booking") || lower.contains("book another appointment") {
            session.try_set_mode(Mode::Discovery, true);
            return (
                "Sure — let's get a new appointment started. What's going on?".to_string(),
                "new_booking_reset".to_string(),
                Tier::Tier1,
                0,
                false,
                None,
            );
        }
        self.call_llm(text, company, session, Mode::Complete).await
    }

    async fn route_booking(
        &self,
        text: &str,
        company: &Company,
        session: &mut Session,
        caller_id: Option<&str>,
    ) -> RouteOutcome {
        let outcome = receptionist_booking::run_turn(
            session,
            company,
            text,
            caller_id,
            &self.booking_store,
            &self.calendar_client,
            &self.sms_client,
        )
        .await;

        match outcome {
            BookingTurnOutcome::Reply(r) => (r, "booking_controller".to_string(), Tier::Tier1, 0, false, None),
            BookingTurnOutcome::Interruption { resume_hint } => {
                let (llm_reply, _, _, tokens, _, _) = self.call_llm(text, company, session, Mode::Booking).await;
                (format!("{llm_reply} {resume_hint}"), "booking_interruption".to_string(), Tier::Tier3, tokens, false, None)
            }
            BookingTurnOutcome::Escalate(r) => (r, "booking_escalate".to_string(), Tier::Tier1, 0, true, None),
            BookingTurnOutcome::Aborted(r) => {
                session.try_set_mode(Mode::Complete, false);
                (r, "booking_aborted".to_string(), Tier::Tier1, 0, false, None)
            }
            BookingTurnOutcome::Finalized(r) => (r, "booking_finalized".to_string(), Tier::Tier1, 0, false, None),
        }
    }

    async fn route_discovery(&self, text: &str, company: &Company, session: &mut Session) -> RouteOutcome {
        let retrieval = match self
            .scenario_retriever
            .retrieve_relevant_scenarios(&company.company_id, &company.trade, text, None, None)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!("scenario retrieval failed: {e}");
                return self.call_llm(text, company, session, Mode::Discovery).await;
            }
        };

        let matching = MatchingPipeline {
            fast_lookup_used: true,
            candidate_count: retrieval.scenarios.len() as u32,
            total_pool_size: retrieval.total_available as u32,
            match_method: Some("keyword_trigger".to_string()),
            scenario_id_matched: retrieval.top_match.as_ref().map(|s| s.scenario_id.clone()),
            match_confidence: Some(retrieval.top_match_confidence as f64),
            timing_ms: 0,
        };

        if let Some(hit) = try_short_circuit(text, &retrieval, company, self.tier1_threshold, session, session.metrics.total_turns) {
            return (hit.reply, "SCENARIO_MATCHED".to_string(), Tier::Tier1_5, 0, false, Some(matching));
        }

        let (reply, _, tier, tokens, transfer, _) = self.call_llm(text, company, session, Mode::Discovery).await;
        (reply, "llm_fallback".to_string(), tier, tokens, transfer, Some(matching))
    }

    async fn call_llm(&self, text: &str, company: &Company, session: &mut Session, mode: Mode) -> RouteOutcome {
        let history: Vec<ConversationTurn> = session
            .turns
            .iter()
            .rev()
            .take(10)
            .rev()
            .map(|t| ConversationTurn {
                role: match t.role {
                    TurnRole::User => ConversationRole::User,
                    TurnRole::Assistant => ConversationRole::Assistant,
                },
                text: t.text.clone(),
            })
            .collect();

        let request = LlmRequest {
            company_name: company.name.clone(),
            trade: company.trade.clone(),
            call_context: CallContext {
                company_id: company.company_id.clone(),
                channel: session.key.channel.as_str().to_string(),
                call_sid: None,
            },
            current_mode: mode,
            known_slots: session.collected_slots.clone(),
            conversation_history: history,
            user_input: text.to_string(),
            behavior_config: HashMap::new(),
        };

        match self.llm_client.process_conversation(&request).await {
            Ok(resp) => {
                if let Some(intent) = resp.intent {
                    session.last_agent_intent = Some(intent);
                    if intent == AgentIntent::Transfer {
                        return (resp.reply, "llm".to_string(), Tier::Tier3, resp.tokens_used, true, None);
                    }
                }
                (resp.reply, "llm".to_string(), Tier::Tier3, resp.tokens_used, resp.signals.requires_transfer, None)
            }
            Err(e) => {
                error!("llm call failed: {e}");
                ("I understand you're having an issue — would you like me to schedule a service appointment?".to_string(), "llm_error_fallback".to_string(), Tier::Tier3, 0, false, None)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn finish(
        &self,
        company: &Company,
        session: &mut Session,
        previous_mode: Mode,
        reply: String,
        match_source: String,
        tier: Tier,
        tokens_used: u64,
        requires_transfer: bool,
        signals: Vec<String>,
        start: Instant,
        call_id: &str,
        turn_trace_id: &str,
        matching: Option<MatchingPipeline>,
    ) -> TurnResponse {
        session.push_turn(TurnRole::Assistant, reply.clone(), tokens_used, Some(match_source.clone()));

        // Step 15: persist session. Never throw on save failure.
        if let Err(e) = self.session_store.save(session).await {
            error!("session save failed: {e}");
        }

        let latency_ms = start.elapsed().as_millis() as u64;
        let banned_phrases: Vec<String> = Vec::new();
        let compliance = receptionist_audit::compliance::check(&reply, session.mode, &banned_phrases);

        let mut execution_flags = vec!["reply_generated".to_string()];
        execution_flags.push(if compliance.passed { "compliance_passed".to_string() } else { "compliance_failed".to_string() });
        if compliance.violations.iter().any(|v| v == "name_placeholder_leaked") {
            execution_flags.push("name_placeholder_leaked".to_string());
        }
        if compliance.violations.iter().any(|v| v == "verbosity_exceeded") {
            execution_flags.push("verbosity_exceeded".to_string());
        }

        // Step 16: write audit record — the one non-negotiable synchronous
        // side effect (spec.md §5). Failure is logged, never propagated.
        let record = AuditRecord {
            call_id: call_id.to_string(),
            company_id: company.company_id.clone(),
            channel: session.key.channel.as_str().to_string(),
            session_id: session.id.as_str().to_string(),
            turn_number: session.metrics.total_turns,
            turn_trace_id: turn_trace_id.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            mode: session.mode,
            previous_mode,
            mode_transition: previous_mode != session.mode,
            phase: format!("{:?}", session.phase).to_lowercase(),
            consent_detected: session.booking.consent_given,
            consent_phrase: session.booking.consent_phrase.clone(),
            consent_given: session.booking.consent_given,
            booking_started: session.locks.booking_started,
            consent_pending_turn: session.flags.get("consent_pending").copied().unwrap_or(false),
            response: ResponseAttribution {
                response_source: Some(match_source.clone()),
                tier: Some(tier.as_str().to_string()),
                match_source: Some(match_source.clone()),
                tokens_used: tokens_used as u32,
                latency_ms,
                total_turn_latency_ms: latency_ms,
            },
            matching,
            execution_flags,
            compliance: compliance.clone(),
            discovery: DiscoverySnapshot {
                issue: session.discovery.issue.clone(),
                urgency: session.discovery.urgency,
                tech_mentioned: session.discovery.tech_mentioned,
                emotion: None,
            },
        };

        if let Err(e) = self.audit_store.log_event(record).await {
            error!("audit write failed: {e}");
        }

        TurnResponse {
            success: true,
            reply,
            session_id: session.id.as_str().to_string(),
            phase: format!("{:?}", session.phase).to_lowercase(),
            mode: session.mode,
            slots_collected: session.collected_slots.clone(),
            wants_booking: session.mode == Mode::Booking || session.booking.consent_given,
            match_source,
            tier: tier.as_str().to_string(),
            latency_ms,
            tokens_used,
            requires_transfer,
            signals,
        }
    }
}

type RouteOutcome = (String, String, Tier, u64, bool, Option<MatchingPipeline>);

fn fallback_response(reply: &str, start: Instant) -> TurnResponse {
    TurnResponse {
        success: false,
        reply: reply.to_string(),
        session_id: String::new(),
        phase: "error".to_string(),
        mode: Mode::Error,
        slots_collected: HashMap::new(),
        wants_booking: false,
        match_source: "error_containment".to_string(),
        tier: Tier::Tier1.as_str().to_string(),
        latency_ms: start.elapsed().as_millis() as u64,
        tokens_used: 0,
        requires_transfer: false,
        signals: vec![],
    }
}

const SCHEDULING_OFFER_MARKERS: &[&str] = &["schedule", "appointment", "technician", "send", "come out", "back out"];

fn implies_scheduling_offer(text: &str) -> bool {
    let lower = text.to_lowercase();
    SCHEDULING_OFFER_MARKERS.iter().any(|m| lower.contains(m))
}

fn set_detection_flags(session: &mut Session, text: &str, triggers: &receptionist_core::config::DetectionTriggers) {
    let lower = text.to_lowercase();
    let checks: &[(&str, &[String])] = &[
        ("wants_booking", &triggers.wants_booking),
        ("describing_problem", &triggers.describing_problem),
        ("trust_concern", &triggers.trust_concern),
        ("refused_slot", &triggers.refused_slot),
        ("caller_feels_ignored", &triggers.caller_feels_ignored),
    ];
    for (flag, phrases) in checks {
        if phrases.iter().any(|p| lower.contains(&p.to_lowercase())) {
            session.flags.insert(flag.to_string(), true);
        }
    }
}

/// Opportunistically extract phone/address/time values from the current
/// utterance. New values are only written into `collected_slots` when
/// booking is active or the agent explicitly asked for that slot this call
/// (spec.md §4.8 step 11 "slot persistence gate") — otherwise they're
/// transient and simply dropped rather than persisted as unconfirmed state.
///
/// Name is deliberately excluded: `name_flow` owns the name slot's entire
/// lifecycle (spelling variants, duplicate-first-name guard, full-name
/// breakdown) and keys its own extraction off `meta`, not `collected_slots`.
/// Pre-filling `collected_slots["name"]` here would make `value.is_some()`
/// true before the sub-flow ever runs on the same turn's text, short-
/// circuiting the branch that's supposed to do the extracting.
fn extract_and_gate_slots(session: &mut Session, text: &str, behavior: &receptionist_core::config::FrontDeskBehavior) {
    let booking_active = session.mode == Mode::Booking;

    if let Some(p) = extract_phone(text) {
        if booking_active || session.locks.was_asked("phone") {
            session.collected_slots.insert("phone".to_string(), p.digits);
        }
    }
    if let Some(a) = extract_address(text) {
        if booking_active || session.locks.was_asked("address") {
            let joined = [a.street.as_deref(), a.city.as_deref(), a.state.as_deref(), a.zip.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(", ");
            session.collected_slots.insert("address".to_string(), joined);
        }
    }
    if let Some(t) = extract_time(text) {
        if booking_active || session.locks.was_asked("time") {
            let value = if t.is_asap {
                "asap".to_string()
            } else {
                t.specific.or(t.window).or(t.day_preference).unwrap_or_default()
            };
            if !value.is_empty() {
                session.collected_slots.insert("time".to_string(), value);
            }
        }
    }
}
