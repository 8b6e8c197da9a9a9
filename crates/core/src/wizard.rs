//! Offer wizard: step definitions, per-step validation and the state machine
//! shared by the `/post-offer` and `/post-your-first-offer` flows.
//!
//! The wizard holds raw user input as strings. Nothing is normalized until
//! [`OfferWizard::prepare_submission`], which re-validates every step and hands
//! the draft to [`normalize_draft`].

use serde::{Deserialize, Serialize};

use crate::catalog::{is_known_category, is_known_city};
use crate::error::CoreError;
use crate::magic_link::sign_in_path;
use crate::normalize::{
    event_schedule, guest_count, images_for_payload, offer_cents_from_dollars, optional_text,
    prepend_image,
};
use crate::offer::NormalizedOffer;
use crate::types::EntityId;

/// Where a couple lands after posting an offer.
pub const POSTED_REDIRECT: &str = "/dashboard/couple?posted=1";

/// Refusal shown when a gated flow is advanced without a session.
pub const SIGN_IN_REQUIRED_MESSAGE: &str = "Please sign in or create your WedFlex account first.";

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// The three wizard steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    EventBasics,
    DetailsAndOffer,
    ReviewAndSubmit,
}

/// Minimum step number (1-based).
pub const MIN_STEP: u8 = 1;

/// Maximum step number (1-based).
pub const MAX_STEP: u8 = 3;

impl WizardStep {
    /// All steps in order.
    pub const ALL: [WizardStep; 3] = [
        Self::EventBasics,
        Self::DetailsAndOffer,
        Self::ReviewAndSubmit,
    ];

    /// Convert a 1-based step number to a `WizardStep`.
    pub fn from_number(n: u8) -> Result<Self, CoreError> {
        match n {
            1 => Ok(Self::EventBasics),
            2 => Ok(Self::DetailsAndOffer),
            3 => Ok(Self::ReviewAndSubmit),
            _ => Err(CoreError::Validation(format!(
                "Invalid step number {n}. Must be between {MIN_STEP} and {MAX_STEP}"
            ))),
        }
    }

    /// Convert to a 1-based step number.
    pub fn to_number(self) -> u8 {
        match self {
            Self::EventBasics => 1,
            Self::DetailsAndOffer => 2,
            Self::ReviewAndSubmit => 3,
        }
    }

    /// Human-readable label for the step.
    pub fn label(self) -> &'static str {
        match self {
            Self::EventBasics => "Event basics",
            Self::DetailsAndOffer => "Details & offer",
            Self::ReviewAndSubmit => "Review & submit",
        }
    }

    /// The following step, capped at the last one.
    pub fn next(self) -> Self {
        Self::from_number(self.to_number() + 1).unwrap_or(self)
    }

    /// The preceding step, capped at the first one.
    pub fn prev(self) -> Self {
        Self::from_number(self.to_number().saturating_sub(1)).unwrap_or(self)
    }
}

// ---------------------------------------------------------------------------
// Flow variants
// ---------------------------------------------------------------------------

/// When the wizard insists on an authenticated couple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthGate {
    /// Any step may be filled in anonymously; submit redirects to sign-in.
    AtSubmit,
    /// Advancing past any step requires a session.
    BeforeAdvance,
}

/// Per-flow wizard behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WizardOptions {
    pub gate: AuthGate,
    /// Continuation path handed to the sign-in page.
    pub return_to: &'static str,
}

/// The two entry points into the offer wizard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowVariant {
    #[default]
    PostOffer,
    FirstOffer,
}

impl FlowVariant {
    pub fn options(self) -> WizardOptions {
        match self {
            Self::PostOffer => WizardOptions {
                gate: AuthGate::AtSubmit,
                return_to: "/post-offer",
            },
            Self::FirstOffer => WizardOptions {
                gate: AuthGate::BeforeAdvance,
                return_to: "/post-your-first-offer",
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Draft fields
// ---------------------------------------------------------------------------

/// Raw wizard input, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfferDraft {
    pub title: String,
    pub category: String,
    pub city: String,
    /// `yyyy-mm-dd`.
    pub event_date: String,
    /// `hh:mm`.
    pub event_time: String,
    pub guest_count: String,
    pub details: String,
    pub inspiration_link: String,
    /// Newest first.
    pub inspiration_images: Vec<String>,
    /// Dollars, free-form (`"$1,250"`).
    pub offer_amount: String,
    pub accepted_terms: bool,
}

/// A partial update to an [`OfferDraft`]. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DraftPatch {
    pub title: Option<String>,
    pub category: Option<String>,
    pub city: Option<String>,
    pub event_date: Option<String>,
    pub event_time: Option<String>,
    pub guest_count: Option<String>,
    pub details: Option<String>,
    pub inspiration_link: Option<String>,
    pub offer_amount: Option<String>,
    pub accepted_terms: Option<bool>,
}

impl DraftPatch {
    pub fn apply(self, draft: &mut OfferDraft) {
        let fields = [
            (self.title, &mut draft.title),
            (self.category, &mut draft.category),
            (self.city, &mut draft.city),
            (self.event_date, &mut draft.event_date),
            (self.event_time, &mut draft.event_time),
            (self.guest_count, &mut draft.guest_count),
            (self.details, &mut draft.details),
            (self.inspiration_link, &mut draft.inspiration_link),
            (self.offer_amount, &mut draft.offer_amount),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = value;
            }
        }
        if let Some(accepted) = self.accepted_terms {
            draft.accepted_terms = accepted;
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn require(ok: bool, message: &str) -> Result<(), CoreError> {
    if ok {
        Ok(())
    } else {
        Err(CoreError::Validation(message.to_string()))
    }
}

fn present(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Check the fields that belong to `step`. The first failing check wins.
pub fn validate_step(step: WizardStep, draft: &OfferDraft) -> Result<(), CoreError> {
    match step {
        WizardStep::EventBasics => {
            require(present(&draft.title), "Please add a title for your offer.")?;
            require(
                is_known_category(&draft.category),
                "Please select a service category.",
            )?;
            require(is_known_city(&draft.city), "Please select a city / location.")?;
            require(
                present(&draft.event_date),
                "Please choose the date you need this service.",
            )?;
            require(
                present(&draft.event_time),
                "Please enter the start time for the service.",
            )?;
            require(
                guest_count(&draft.guest_count).is_some_and(|n| n > 0),
                "Please enter your approximate guest count.",
            )
        }
        WizardStep::DetailsAndOffer => {
            require(
                present(&draft.details),
                "Please describe what you need help with.",
            )?;
            require(
                present(&draft.offer_amount),
                "Please enter your offer amount in USD.",
            )
        }
        WizardStep::ReviewAndSubmit => require(
            draft.accepted_terms,
            "Please agree to the terms before posting your offer.",
        ),
    }
}

/// Convert a fully validated draft into the persisted offer shape.
pub fn normalize_draft(
    draft: &OfferDraft,
    client_request_id: Option<EntityId>,
) -> Result<NormalizedOffer, CoreError> {
    let schedule = event_schedule(&draft.event_date, &draft.event_time)?;
    Ok(NormalizedOffer {
        title: draft.title.trim().to_string(),
        category: draft.category.trim().to_string(),
        location: draft.city.trim().to_string(),
        service_date: schedule.service_date,
        event_at: schedule.event_at,
        guest_count: guest_count(&draft.guest_count),
        details: optional_text(&draft.details),
        inspiration_link: optional_text(&draft.inspiration_link),
        inspiration_images: images_for_payload(&draft.inspiration_images),
        offer_cents: offer_cents_from_dollars(&draft.offer_amount),
        accepted_terms: draft.accepted_terms,
        client_request_id,
    })
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Outcome of asking the wizard to submit.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitReadiness {
    /// Everything validated; insert this offer.
    Ready(NormalizedOffer),
    /// No session; send the couple here and come back afterwards.
    SignInRequired { redirect_to: String },
}

/// One in-progress offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferWizard {
    pub variant: FlowVariant,
    pub step: WizardStep,
    pub draft: OfferDraft,
    /// Idempotency key used for every submit attempt of this wizard.
    pub request_id: EntityId,
}

impl OfferWizard {
    pub fn new(variant: FlowVariant) -> Self {
        Self {
            variant,
            step: WizardStep::EventBasics,
            draft: OfferDraft::default(),
            request_id: EntityId::new_v4(),
        }
    }

    pub fn options(&self) -> WizardOptions {
        self.variant.options()
    }

    /// Validate the current step and move forward (capped at the last step).
    pub fn advance(&mut self, signed_in: bool) -> Result<WizardStep, CoreError> {
        if self.options().gate == AuthGate::BeforeAdvance && !signed_in {
            return Err(CoreError::Unauthorized(SIGN_IN_REQUIRED_MESSAGE.to_string()));
        }
        validate_step(self.step, &self.draft)?;
        self.step = self.step.next();
        Ok(self.step)
    }

    /// Move back one step. Never validates.
    pub fn back(&mut self) -> WizardStep {
        self.step = self.step.prev();
        self.step
    }

    pub fn update(&mut self, patch: DraftPatch) {
        patch.apply(&mut self.draft);
    }

    pub fn add_inspiration_image(&mut self, url: String) {
        prepend_image(&mut self.draft.inspiration_images, url);
    }

    /// Re-validate every step and normalize. Only allowed on the last step.
    pub fn prepare_submission(&self) -> Result<NormalizedOffer, CoreError> {
        if self.step != WizardStep::ReviewAndSubmit {
            return Err(CoreError::Validation(format!(
                "Offers can only be posted from step {MAX_STEP} (currently on step {})",
                self.step.to_number()
            )));
        }
        for step in WizardStep::ALL {
            validate_step(step, &self.draft)?;
        }
        normalize_draft(&self.draft, Some(self.request_id))
    }

    /// Validate, then decide between inserting and sending the couple to sign in.
    pub fn submission(&self, signed_in: bool) -> Result<SubmitReadiness, CoreError> {
        let offer = self.prepare_submission()?;
        if signed_in {
            Ok(SubmitReadiness::Ready(offer))
        } else {
            Ok(SubmitReadiness::SignInRequired {
                redirect_to: self.sign_in_redirect(),
            })
        }
    }

    /// Sign-in path that returns to this flow.
    pub fn sign_in_redirect(&self) -> String {
        sign_in_path(Some(self.options().return_to), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn filled() -> OfferDraft {
        OfferDraft {
            title: "Need setup crew".into(),
            category: "Setup & Breakdown".into(),
            city: "Austin, TX".into(),
            event_date: "2025-06-01".into(),
            event_time: "14:30".into(),
            guest_count: "120 guests".into(),
            details: "Chairs and arch".into(),
            inspiration_link: String::new(),
            inspiration_images: Vec::new(),
            offer_amount: "$1,250.50abc".into(),
            accepted_terms: true,
        }
    }

    fn message(result: Result<(), CoreError>) -> String {
        match result {
            Err(CoreError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    // -- steps --

    #[test]
    fn step_numbers_round_trip() {
        for n in MIN_STEP..=MAX_STEP {
            assert_eq!(WizardStep::from_number(n).unwrap().to_number(), n);
        }
        assert!(WizardStep::from_number(0).is_err());
        assert!(WizardStep::from_number(4).is_err());
    }

    #[test]
    fn next_and_prev_are_capped() {
        assert_eq!(WizardStep::ReviewAndSubmit.next(), WizardStep::ReviewAndSubmit);
        assert_eq!(WizardStep::EventBasics.prev(), WizardStep::EventBasics);
        assert_eq!(WizardStep::EventBasics.next(), WizardStep::DetailsAndOffer);
    }

    // -- validation --

    #[test]
    fn step_one_reports_first_missing_field() {
        let mut draft = filled();
        draft.title = "   ".into();
        draft.city.clear();
        assert_eq!(
            message(validate_step(WizardStep::EventBasics, &draft)),
            "Please add a title for your offer."
        );
    }

    #[test]
    fn step_one_rejects_unknown_catalog_values() {
        let mut draft = filled();
        draft.category = "Fireworks".into();
        assert_eq!(
            message(validate_step(WizardStep::EventBasics, &draft)),
            "Please select a service category."
        );
        let mut draft = filled();
        draft.city = "Springfield".into();
        assert_eq!(
            message(validate_step(WizardStep::EventBasics, &draft)),
            "Please select a city / location."
        );
    }

    #[test]
    fn step_one_requires_positive_guest_count() {
        let mut draft = filled();
        draft.guest_count = "0".into();
        assert_eq!(
            message(validate_step(WizardStep::EventBasics, &draft)),
            "Please enter your approximate guest count."
        );
    }

    #[test]
    fn step_one_rejects_negative_guest_count() {
        let mut draft = filled();
        draft.guest_count = "-5".into();
        assert_eq!(
            message(validate_step(WizardStep::EventBasics, &draft)),
            "Please enter your approximate guest count."
        );
    }

    #[test]
    fn step_two_requires_details_then_amount() {
        let mut draft = filled();
        draft.details.clear();
        draft.offer_amount.clear();
        assert_eq!(
            message(validate_step(WizardStep::DetailsAndOffer, &draft)),
            "Please describe what you need help with."
        );
        draft.details = "Help".into();
        assert_eq!(
            message(validate_step(WizardStep::DetailsAndOffer, &draft)),
            "Please enter your offer amount in USD."
        );
    }

    // -- state machine --

    #[test]
    fn advance_stays_put_on_validation_failure() {
        let mut wizard = OfferWizard::new(FlowVariant::PostOffer);
        assert_matches!(wizard.advance(false), Err(CoreError::Validation(_)));
        assert_eq!(wizard.step, WizardStep::EventBasics);
    }

    #[test]
    fn back_preserves_entered_values() {
        let mut wizard = OfferWizard::new(FlowVariant::PostOffer);
        wizard.draft = filled();
        wizard.advance(false).unwrap();
        wizard.update(DraftPatch {
            details: Some("Updated".into()),
            ..Default::default()
        });
        assert_eq!(wizard.back(), WizardStep::EventBasics);
        assert_eq!(wizard.draft.details, "Updated");
        assert_eq!(wizard.draft.title, "Need setup crew");
    }

    #[test]
    fn gated_flow_refuses_to_advance_anonymously() {
        let mut wizard = OfferWizard::new(FlowVariant::FirstOffer);
        wizard.draft = filled();
        let err = wizard.advance(false).unwrap_err();
        assert_matches!(err, CoreError::Unauthorized(ref msg) if msg == SIGN_IN_REQUIRED_MESSAGE);
        assert_eq!(wizard.advance(true).unwrap(), WizardStep::DetailsAndOffer);
    }

    #[test]
    fn never_submits_without_accepted_terms() {
        let mut wizard = OfferWizard::new(FlowVariant::PostOffer);
        wizard.draft = filled();
        wizard.draft.accepted_terms = false;
        wizard.advance(true).unwrap();
        wizard.advance(true).unwrap();
        assert_eq!(wizard.step, WizardStep::ReviewAndSubmit);
        assert_matches!(wizard.advance(true), Err(CoreError::Validation(_)));
        assert_matches!(wizard.submission(true), Err(CoreError::Validation(_)));
    }

    #[test]
    fn cannot_submit_before_last_step() {
        let mut wizard = OfferWizard::new(FlowVariant::PostOffer);
        wizard.draft = filled();
        assert_matches!(wizard.prepare_submission(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn anonymous_submit_redirects_to_sign_in_with_return_path() {
        let mut wizard = OfferWizard::new(FlowVariant::PostOffer);
        wizard.draft = filled();
        wizard.step = WizardStep::ReviewAndSubmit;
        let readiness = wizard.submission(false).unwrap();
        assert_matches!(
            readiness,
            SubmitReadiness::SignInRequired { ref redirect_to }
                if redirect_to == "/auth/signin?role=couple&next=%2Fpost-offer"
        );
    }

    #[test]
    fn submission_normalizes_the_draft() {
        let mut wizard = OfferWizard::new(FlowVariant::PostOffer);
        wizard.draft = filled();
        wizard.add_inspiration_image("https://cdn.example/a.png".into());
        wizard.step = WizardStep::ReviewAndSubmit;
        let offer = match wizard.submission(true).unwrap() {
            SubmitReadiness::Ready(offer) => offer,
            other => panic!("expected ready, got {other:?}"),
        };
        assert_eq!(offer.offer_cents, Some(125_050));
        assert_eq!(offer.guest_count, Some(120));
        assert_eq!(offer.location, "Austin, TX");
        assert_eq!(
            offer.event_at.unwrap().format("%Y-%m-%dT%H:%M:%S").to_string(),
            "2025-06-01T14:30:00"
        );
        assert_eq!(offer.details.as_deref(), Some("Chairs and arch"));
        assert_eq!(offer.inspiration_link, None);
        assert_eq!(
            offer.inspiration_images,
            Some(vec!["https://cdn.example/a.png".to_string()])
        );
        assert_eq!(offer.client_request_id, Some(wizard.request_id));
    }
}
