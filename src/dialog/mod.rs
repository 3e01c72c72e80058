//! Conversation flow: a linear three-step machine over one-line text turns.
//!
//! Intro emits the capability prompt and waits for a request; Act classifies
//! the request and runs the catalog sub-flow; Final asks whether to continue
//! and either ends the session or loops back to Intro. Recognizer errors end
//! the current turn with a plain-language message, never the session.

use crate::catalog::CatalogService;
use crate::error::Error;
use crate::models::{FilterCriteria, Shoe};
use crate::nlu::{Intent, IntentRecognizer};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

/// Below this confidence the top intent is not trusted.
const MIN_CONFIDENCE: f64 = 0.5;

/// Replies that decline the continuation offer and end the session.
const NEGATIVE_REPLIES: [&str; 4] = ["no", "non ora", "stop", "fine"];

pub const MSG_INTRO: &str = "Ciao! Sono il tuo assistente per la ricerca di scarpe. Posso aiutarti a:\n\
    - Vedere tutte le scarpe disponibili\n\
    - Cercare scarpe di un brand specifico (es. 'Mostrami le Nike')\n\
    - Cercare scarpe in un range di prezzo (es. 'Scarpe sotto i 200€' o 'Scarpe tra 100€ e 300€')\n\
    Come posso aiutarti?";
pub const MSG_NOT_CONFIGURED: &str = "Errore: il riconoscitore non è configurato correttamente. \
    Non posso procedere con la richiesta.";
pub const MSG_NOT_UNDERSTOOD: &str = "Non ho capito la tua richiesta. Puoi riprovare?";
pub const MSG_BRAND_MISSING: &str = "Non ho trovato il brand specificato. Puoi riprovare?";
pub const MSG_PRICE_MISSING: &str = "Non ho trovato il prezzo specificato. Puoi riprovare?";
pub const MSG_TURN_ERROR: &str = "Si è verificato un errore durante l'elaborazione della richiesta. \
    Riprova più tardi.";
pub const MSG_NO_RESULTS: &str =
    "Non ho trovato scarpe che corrispondono ai criteri di ricerca specificati.";
pub const MSG_CATALOG_ERROR: &str = "Mi dispiace, si è verificato un errore durante il recupero \
    delle scarpe. Riprova più tardi.";
pub const MSG_CONTINUE: &str = "Posso aiutarti a cercare altre scarpe?";
pub const MSG_GOODBYE: &str = "Va bene! Se hai bisogno di aiuto, sono qui.";

// ── Presentation seam ─────────────────────────────────────────────────────────

/// Outbound side of the conversation. The flow hands over plain text and
/// ordered record sets; rendering is the caller's business.
pub trait Presenter {
    fn say(&mut self, text: &str);
    fn show_shoes(&mut self, shoes: &[Shoe]);
}

// ── Flow state ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Intro prompt sent, waiting for a request.
    AwaitingRequest,
    /// Continuation prompt sent, waiting for yes/no.
    AwaitingContinue,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Continue,
    Ended,
}

pub struct MainDialog<R: IntentRecognizer> {
    recognizer: R,
    catalog: Arc<CatalogService>,
    step: Step,
}

impl<R: IntentRecognizer> MainDialog<R> {
    pub fn new(recognizer: R, catalog: Arc<CatalogService>) -> Self {
        Self {
            recognizer,
            catalog,
            step: Step::Ended,
        }
    }

    /// Open the session: emit the intro prompt (or a caller-supplied
    /// override) and start waiting for a request. An unconfigured recognizer
    /// ends the flow immediately.
    pub fn start(&mut self, presenter: &mut dyn Presenter, prompt: Option<&str>) -> TurnOutcome {
        if !self.recognizer.is_configured() {
            presenter.say(MSG_NOT_CONFIGURED);
            self.step = Step::Ended;
            return TurnOutcome::Ended;
        }

        presenter.say(prompt.unwrap_or(MSG_INTRO));
        self.step = Step::AwaitingRequest;
        TurnOutcome::Continue
    }

    pub fn is_ended(&self) -> bool {
        self.step == Step::Ended
    }

    /// Feed one line of user input into the flow.
    pub async fn handle(
        &mut self,
        text: &str,
        presenter: &mut dyn Presenter,
        cancel: &CancellationToken,
    ) -> TurnOutcome {
        match self.step {
            Step::AwaitingRequest => self.act(text, presenter, cancel).await,
            Step::AwaitingContinue => self.final_step(text, presenter),
            Step::Ended => TurnOutcome::Ended,
        }
    }

    // ── Act ───────────────────────────────────────────────────────────────────

    async fn act(
        &mut self,
        text: &str,
        presenter: &mut dyn Presenter,
        cancel: &CancellationToken,
    ) -> TurnOutcome {
        let recognized = match self.recognizer.recognize(text, cancel).await {
            Ok(r) => r,
            Err(e) => {
                error!("Intent recognition failed: {}", e);
                presenter.say(MSG_TURN_ERROR);
                // fall through to the continuation offer; the session survives
                presenter.say(MSG_CONTINUE);
                self.step = Step::AwaitingContinue;
                return TurnOutcome::Continue;
            }
        };

        if recognized.confidence < MIN_CONFIDENCE {
            warn!(
                "Top intent {:?} below confidence threshold ({:.2})",
                recognized.intent, recognized.confidence
            );
            return self.restart_intro(presenter, MSG_NOT_UNDERSTOOD);
        }

        match recognized.intent {
            Intent::ShowAll => {
                self.show_catalog(FilterCriteria::default(), presenter, cancel)
                    .await;
                self.offer_continuation(presenter)
            }
            Intent::FilterByBrand => match recognized.brand() {
                Some(brand) => {
                    self.show_catalog(FilterCriteria::by_brand(brand), presenter, cancel)
                        .await;
                    self.offer_continuation(presenter)
                }
                None => self.restart_intro(presenter, MSG_BRAND_MISSING),
            },
            Intent::FilterByPrice => {
                let (min_price, max_price) = recognized.price_range();
                if min_price.is_none() && max_price.is_none() {
                    return self.restart_intro(presenter, MSG_PRICE_MISSING);
                }
                self.show_catalog(FilterCriteria::by_price(min_price, max_price), presenter, cancel)
                    .await;
                self.offer_continuation(presenter)
            }
            Intent::ContinueOrExit | Intent::Unrecognized => {
                self.restart_intro(presenter, MSG_NOT_UNDERSTOOD)
            }
        }
    }

    /// Catalog sub-flow: run the query and present the outcome. Errors stay
    /// inside the turn as a natural-language message.
    async fn show_catalog(
        &self,
        criteria: FilterCriteria,
        presenter: &mut dyn Presenter,
        cancel: &CancellationToken,
    ) {
        match self.catalog.filtered(&criteria, cancel).await {
            Ok(shoes) if shoes.is_empty() => presenter.say(MSG_NO_RESULTS),
            Ok(shoes) => presenter.show_shoes(&shoes),
            Err(Error::Cancelled) => {
                warn!("Catalog query cancelled");
                presenter.say(MSG_CATALOG_ERROR);
            }
            Err(e) => {
                error!("Catalog query failed: {}", e);
                presenter.say(MSG_CATALOG_ERROR);
            }
        }
    }

    // ── Final ─────────────────────────────────────────────────────────────────

    fn final_step(&mut self, text: &str, presenter: &mut dyn Presenter) -> TurnOutcome {
        let reply = text.trim().to_lowercase();
        if NEGATIVE_REPLIES.contains(&reply.as_str()) {
            presenter.say(MSG_GOODBYE);
            self.step = Step::Ended;
            return TurnOutcome::Ended;
        }

        presenter.say(MSG_INTRO);
        self.step = Step::AwaitingRequest;
        TurnOutcome::Continue
    }

    fn offer_continuation(&mut self, presenter: &mut dyn Presenter) -> TurnOutcome {
        presenter.say(MSG_CONTINUE);
        self.step = Step::AwaitingContinue;
        TurnOutcome::Continue
    }

    fn restart_intro(&mut self, presenter: &mut dyn Presenter, reason: &str) -> TurnOutcome {
        presenter.say(reason);
        presenter.say(MSG_INTRO);
        self.step = Step::AwaitingRequest;
        TurnOutcome::Continue
    }
}
