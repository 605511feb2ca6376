use std::{collections::HashSet, sync::Arc};

use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{sleep, sleep_until, Instant},
};
use tracing::{debug, info, warn};

use crate::{
    client::{
        api::SignupApi,
        debounce::{Debounce, Phase},
    },
    config::ClientConfig,
    validation::{Field, FieldErrors, SignupForm},
};

pub const TRANSPORT_FAILURE_MESSAGE: &str = "Unable to reach the server, please try again.";
const REJECTED_FALLBACK_MESSAGE: &str = "Signup failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    SignIn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
    Changed(Field, String),
    Submit,
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Success { message: String },
    Rejected { status: u16, message: String },
    TransportFailure { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowExit {
    /// An access token was already stored; the form was never shown.
    AlreadyAuthenticated,
    /// The server accepted the signup and the view moved on to sign-in.
    SignedUp,
    /// The event stream ended or the form was closed. A request already sent is left to
    /// finish on its own; its outcome is not reported.
    Closed,
}

/// The rendering side of the signup form.
pub trait SignupView: Send {
    /// Errors of the fields edited so far, or of every field once a submit was attempted.
    fn show_field_errors(&mut self, errors: &FieldErrors);
    fn set_submit_enabled(&mut self, enabled: bool);
    fn notify_success(&mut self, message: &str);
    fn notify_error(&mut self, message: &str);
    fn navigate(&mut self, route: Route);
}

/// Locally persisted credentials. Only read, to skip signup for signed-in users.
pub trait CredentialStore: Send {
    fn access_token(&self) -> Option<String>;
}

/// Drives one signup form: validation on every change, debounced submission with at most
/// one request outstanding, and the reaction to the server's answer.
pub struct SignupFlow<A, V, S> {
    api: Arc<A>,
    view: V,
    store: S,
    config: ClientConfig,
    form: SignupForm,
    touched: HashSet<Field>,
    debounce: Debounce,
    in_flight: Option<JoinHandle<SubmitOutcome>>,
}

impl<A, V, S> SignupFlow<A, V, S>
where
    A: SignupApi,
    V: SignupView,
    S: CredentialStore,
{
    pub fn new(api: Arc<A>, view: V, store: S, config: ClientConfig) -> Self {
        Self {
            debounce: Debounce::new(config.debounce_window),
            api,
            view,
            store,
            config,
            form: SignupForm::default(),
            touched: HashSet::new(),
            in_flight: None,
        }
    }

    pub fn form(&self) -> &SignupForm {
        &self.form
    }

    pub fn phase(&self) -> Phase {
        self.debounce.phase()
    }

    pub fn into_view(self) -> V {
        self.view
    }

    pub async fn run(&mut self, mut events: mpsc::Receiver<FormEvent>) -> FlowExit {
        if self.store.access_token().is_some() {
            info!("access token already stored, skipping signup");
            self.view.navigate(Route::Home);
            return FlowExit::AlreadyAuthenticated;
        }

        self.refresh_submit();

        loop {
            let deadline = self.debounce.deadline();

            tokio::select! {
                event = events.recv() => match event {
                    Some(FormEvent::Changed(field, value)) => self.change(field, value),
                    Some(FormEvent::Submit) => self.submit(),
                    Some(FormEvent::Close) | None => {
                        // detach; the request still runs to completion
                        self.in_flight = None;
                        return FlowExit::Closed;
                    }
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.fire();
                }
                outcome = join_in_flight(&mut self.in_flight), if self.in_flight.is_some() => {
                    self.in_flight = None;
                    if let Some(exit) = self.finish(outcome).await {
                        return exit;
                    }
                }
            }
        }
    }

    fn change(&mut self, field: Field, value: String) {
        self.form.set(field, value);
        self.touched.insert(field);

        self.show_errors();
        self.refresh_submit();
    }

    fn submit(&mut self) {
        self.touched.extend(Field::ALL);

        if self.form.validate().is_err() {
            self.show_errors();
            self.refresh_submit();
            return;
        }

        if self.debounce.trigger(Instant::now()) {
            debug!("signup submission scheduled");
        }
        self.refresh_submit();
    }

    // The values sent are the ones on the form when the window elapses.
    fn fire(&mut self) {
        if !self.debounce.fire(Instant::now()) {
            return;
        }

        if self.form.validate().is_err() {
            self.debounce.complete();
            self.show_errors();
            self.refresh_submit();
            return;
        }

        let api = Arc::clone(&self.api);
        let form = self.form.clone();
        self.in_flight = Some(tokio::spawn(async move { send(api.as_ref(), &form).await }));
        debug!("signup request sent");
    }

    async fn finish(&mut self, outcome: SubmitOutcome) -> Option<FlowExit> {
        match outcome {
            SubmitOutcome::Success { message } => {
                info!("signup accepted");
                self.view.notify_success(&message);
                sleep(self.config.redirect_delay).await;
                self.view.navigate(Route::SignIn);
                return Some(FlowExit::SignedUp);
            }
            SubmitOutcome::Rejected { status, message } => {
                info!(status, %message, "signup rejected");
                self.view.notify_error(&message);
            }
            SubmitOutcome::TransportFailure { reason } => {
                warn!(%reason, "signup request failed");
                self.view.notify_error(TRANSPORT_FAILURE_MESSAGE);
            }
        }

        self.debounce.complete();
        self.refresh_submit();
        None
    }

    fn show_errors(&mut self) {
        let errors = self
            .form
            .validate()
            .err()
            .unwrap_or_default()
            .retain(|field| self.touched.contains(&field));
        self.view.show_field_errors(&errors);
    }

    fn refresh_submit(&mut self) {
        let enabled = self.debounce.is_idle() && self.form.validate().is_ok();
        self.view.set_submit_enabled(enabled);
    }
}

async fn send<A: SignupApi + ?Sized>(api: &A, form: &SignupForm) -> SubmitOutcome {
    match api.signup(form).await {
        Ok(response) if response.status == 200 => SubmitOutcome::Success {
            message: response.message.unwrap_or_default(),
        },
        Ok(response) => SubmitOutcome::Rejected {
            status: response.status,
            message: response
                .message
                .unwrap_or_else(|| REJECTED_FALLBACK_MESSAGE.to_string()),
        },
        Err(err) => SubmitOutcome::TransportFailure {
            reason: match std::error::Error::source(&err) {
                Some(source) => format!("{err}: {source}"),
                None => err.to_string(),
            },
        },
    }
}

async fn join_in_flight(handle: &mut Option<JoinHandle<SubmitOutcome>>) -> SubmitOutcome {
    match handle {
        Some(handle) => handle
            .await
            .unwrap_or_else(|e| SubmitOutcome::TransportFailure {
                reason: e.to_string(),
            }),
        None => std::future::pending().await,
    }
}
