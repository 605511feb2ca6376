use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use storefront_auth::{
    ApiResponse, ClientConfig, ClientError, CredentialStore, Field, FieldErrors, FlowExit,
    FormEvent, Route, SignupApi, SignupFlow, SignupForm, SignupView, EMAIL_REQUIRED,
    PASSWORD_REQUIRED, PASSWORD_WEAK, TRANSPORT_FAILURE_MESSAGE, USERNAME_TOO_SHORT,
};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{sleep, Instant},
};

struct FakeApi {
    calls: Mutex<Vec<SignupForm>>,
    completed: AtomicUsize,
    response: Result<ApiResponse, &'static str>,
    delay: Duration,
}

impl FakeApi {
    fn answering(status: u16, message: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            completed: AtomicUsize::new(0),
            response: Ok(ApiResponse {
                status,
                message: Some(message.to_string()),
            }),
            delay: Duration::ZERO,
        }
    }

    fn unreachable() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            completed: AtomicUsize::new(0),
            response: Err("connection refused"),
            delay: Duration::ZERO,
        }
    }

    fn calls(&self) -> Vec<SignupForm> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SignupApi for FakeApi {
    async fn signup(&self, form: &SignupForm) -> Result<ApiResponse, ClientError> {
        self.calls.lock().unwrap().push(form.clone());
        sleep(self.delay).await;
        self.completed.fetch_add(1, Ordering::SeqCst);

        match &self.response {
            Ok(response) => Ok(response.clone()),
            Err(reason) => Err(ClientError::Transport {
                source: (*reason).into(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ViewEvent {
    Errors(FieldErrors),
    SubmitEnabled(bool),
    Success(String, Instant),
    Error(String),
    Navigate(Route, Instant),
}

#[derive(Clone, Default)]
struct RecordingView(Arc<Mutex<Vec<ViewEvent>>>);

impl RecordingView {
    fn events(&self) -> Vec<ViewEvent> {
        self.0.lock().unwrap().clone()
    }

    fn submit_enabled(&self) -> Option<bool> {
        self.events().into_iter().rev().find_map(|event| match event {
            ViewEvent::SubmitEnabled(enabled) => Some(enabled),
            _ => None,
        })
    }

    fn last_errors(&self) -> Option<FieldErrors> {
        self.events().into_iter().rev().find_map(|event| match event {
            ViewEvent::Errors(errors) => Some(errors),
            _ => None,
        })
    }

    fn navigations(&self) -> Vec<Route> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ViewEvent::Navigate(route, _) => Some(route),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ViewEvent) {
        self.0.lock().unwrap().push(event);
    }
}

impl SignupView for RecordingView {
    fn show_field_errors(&mut self, errors: &FieldErrors) {
        self.push(ViewEvent::Errors(errors.clone()));
    }

    fn set_submit_enabled(&mut self, enabled: bool) {
        self.push(ViewEvent::SubmitEnabled(enabled));
    }

    fn notify_success(&mut self, message: &str) {
        self.push(ViewEvent::Success(message.to_string(), Instant::now()));
    }

    fn notify_error(&mut self, message: &str) {
        self.push(ViewEvent::Error(message.to_string()));
    }

    fn navigate(&mut self, route: Route) {
        self.push(ViewEvent::Navigate(route, Instant::now()));
    }
}

struct Store(Option<&'static str>);

impl CredentialStore for Store {
    fn access_token(&self) -> Option<String> {
        self.0.map(str::to_string)
    }
}

struct Harness {
    events: mpsc::Sender<FormEvent>,
    view: RecordingView,
    api: Arc<FakeApi>,
    task: JoinHandle<FlowExit>,
}

impl Harness {
    fn start(api: FakeApi) -> Self {
        Self::start_with_store(api, Store(None))
    }

    fn start_with_store(api: FakeApi, store: Store) -> Self {
        let api = Arc::new(api);
        let view = RecordingView::default();
        let (events, rx) = mpsc::channel(16);

        let mut flow = SignupFlow::new(api.clone(), view.clone(), store, ClientConfig::default());
        let task = tokio::spawn(async move { flow.run(rx).await });

        Self {
            events,
            view,
            api,
            task,
        }
    }

    async fn send(&self, event: FormEvent) {
        self.events.send(event).await.unwrap();
    }

    async fn fill(&self, username: &str, email: &str, password: &str) {
        self.send(FormEvent::Changed(Field::Username, username.into()))
            .await;
        self.send(FormEvent::Changed(Field::Email, email.into())).await;
        self.send(FormEvent::Changed(Field::Password, password.into()))
            .await;
        settle().await;
    }

    async fn close(self) -> FlowExit {
        self.send(FormEvent::Close).await;
        self.task.await.unwrap()
    }
}

// Let the flow task drain the queued events before asserting on the view.
async fn settle() {
    sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn weak_passwords_never_reach_the_server() {
    for password in ["abc", "alllowercase1!", "ALLUPPER1!"] {
        let harness = Harness::start(FakeApi::answering(200, "ok"));

        harness.fill("bob123", "bob@x.com", password).await;
        harness.send(FormEvent::Submit).await;
        sleep(Duration::from_secs(10)).await;

        assert!(harness.api.calls().is_empty(), "{password}");
        assert_eq!(
            harness.view.last_errors().and_then(|e| e.password),
            Some(PASSWORD_WEAK)
        );
        assert_eq!(harness.view.submit_enabled(), Some(false));
        assert_eq!(harness.close().await, FlowExit::Closed);
    }
}

#[tokio::test(start_paused = true)]
async fn rapid_submits_collapse_into_one_request() {
    let harness = Harness::start(FakeApi::answering(400, "email taken"));

    harness.fill("bob123", "bob@x.com", "Abcdef1!").await;
    assert_eq!(harness.view.submit_enabled(), Some(true));

    harness.send(FormEvent::Submit).await;
    sleep(Duration::from_secs(1)).await;
    assert_eq!(harness.view.submit_enabled(), Some(false));

    harness
        .send(FormEvent::Changed(Field::Username, "bobby".into()))
        .await;
    harness.send(FormEvent::Submit).await;
    sleep(Duration::from_secs(1)).await;
    harness
        .send(FormEvent::Changed(Field::Email, "bobby@x.com".into()))
        .await;
    sleep(Duration::from_secs(10)).await;

    assert_eq!(
        harness.api.calls(),
        vec![SignupForm {
            username: "bobby".into(),
            email: "bobby@x.com".into(),
            password: "Abcdef1!".into(),
        }]
    );
    assert_eq!(harness.close().await, FlowExit::Closed);
}

#[tokio::test(start_paused = true)]
async fn request_waits_for_the_full_window() {
    let harness = Harness::start(FakeApi::answering(400, "email taken"));

    harness.fill("bob123", "bob@x.com", "Abcdef1!").await;
    harness.send(FormEvent::Submit).await;

    sleep(Duration::from_millis(2900)).await;
    assert!(harness.api.calls().is_empty());

    sleep(Duration::from_millis(200)).await;
    assert_eq!(harness.api.calls().len(), 1);
    assert_eq!(harness.close().await, FlowExit::Closed);
}

#[tokio::test(start_paused = true)]
async fn success_redirects_to_sign_in_after_delay() {
    let harness = Harness::start(FakeApi::answering(200, "ok"));

    harness.fill("bob123", "bob@x.com", "Abcdef1!").await;
    harness.send(FormEvent::Submit).await;

    let Harness { view, api, task, .. } = harness;
    assert_eq!(task.await.unwrap(), FlowExit::SignedUp);

    let events = view.events();
    let shown = events.iter().find_map(|event| match event {
        ViewEvent::Success(message, at) => Some((message.clone(), *at)),
        _ => None,
    });
    let navigated = events.iter().find_map(|event| match event {
        ViewEvent::Navigate(route, at) => Some((*route, *at)),
        _ => None,
    });

    let (message, shown_at) = shown.unwrap();
    let (route, navigated_at) = navigated.unwrap();
    assert_eq!(message, "ok");
    assert_eq!(route, Route::SignIn);
    assert_eq!(navigated_at - shown_at, Duration::from_secs(3));
    assert_eq!(api.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn rejection_is_shown_and_submit_reenabled() {
    let harness = Harness::start(FakeApi::answering(400, "email taken"));

    harness.fill("bob123", "bob@x.com", "Abcdef1!").await;
    harness.send(FormEvent::Submit).await;
    sleep(Duration::from_secs(10)).await;

    assert!(harness
        .view
        .events()
        .contains(&ViewEvent::Error("email taken".into())));
    assert_eq!(harness.view.submit_enabled(), Some(true));
    assert!(harness.view.navigations().is_empty());
    assert_eq!(harness.close().await, FlowExit::Closed);
}

#[tokio::test(start_paused = true)]
async fn transport_failure_allows_retry() {
    let harness = Harness::start(FakeApi::unreachable());

    harness.fill("bob123", "bob@x.com", "Abcdef1!").await;
    harness.send(FormEvent::Submit).await;
    sleep(Duration::from_secs(10)).await;

    assert!(harness
        .view
        .events()
        .contains(&ViewEvent::Error(TRANSPORT_FAILURE_MESSAGE.into())));
    assert_eq!(harness.view.submit_enabled(), Some(true));

    harness.send(FormEvent::Submit).await;
    sleep(Duration::from_secs(10)).await;

    assert_eq!(harness.api.calls().len(), 2);
    assert!(harness.view.navigations().is_empty());
    assert_eq!(harness.close().await, FlowExit::Closed);
}

#[tokio::test(start_paused = true)]
async fn submits_during_request_are_ignored() {
    let mut api = FakeApi::answering(400, "email taken");
    api.delay = Duration::from_secs(10);
    let harness = Harness::start(api);

    harness.fill("bob123", "bob@x.com", "Abcdef1!").await;
    harness.send(FormEvent::Submit).await;
    sleep(Duration::from_secs(4)).await;
    assert_eq!(harness.api.calls().len(), 1);

    harness.send(FormEvent::Submit).await;
    sleep(Duration::from_secs(30)).await;

    assert_eq!(harness.api.calls().len(), 1);
    assert_eq!(harness.view.submit_enabled(), Some(true));
    assert_eq!(harness.close().await, FlowExit::Closed);
}

#[tokio::test(start_paused = true)]
async fn form_invalidated_while_pending_is_not_sent() {
    let harness = Harness::start(FakeApi::answering(200, "ok"));

    harness.fill("bob123", "bob@x.com", "Abcdef1!").await;
    harness.send(FormEvent::Submit).await;
    harness
        .send(FormEvent::Changed(Field::Email, "bob".into()))
        .await;
    sleep(Duration::from_secs(10)).await;

    assert!(harness.api.calls().is_empty());
    assert_eq!(harness.view.submit_enabled(), Some(false));
    assert_eq!(harness.close().await, FlowExit::Closed);
}

#[tokio::test(start_paused = true)]
async fn stored_token_skips_signup() {
    let harness = Harness::start_with_store(FakeApi::answering(200, "ok"), Store(Some("token")));

    let Harness { view, api, task, .. } = harness;
    assert_eq!(task.await.unwrap(), FlowExit::AlreadyAuthenticated);

    assert_eq!(view.navigations(), vec![Route::Home]);
    assert_eq!(view.events().len(), 1, "nothing rendered before redirect");
    assert!(api.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn closing_leaves_the_request_running() {
    let mut api = FakeApi::answering(200, "ok");
    api.delay = Duration::from_secs(5);
    let harness = Harness::start(api);

    harness.fill("bob123", "bob@x.com", "Abcdef1!").await;
    harness.send(FormEvent::Submit).await;
    sleep(Duration::from_secs(4)).await;
    assert_eq!(harness.api.calls().len(), 1);

    let api = harness.api.clone();
    let view = harness.view.clone();
    assert_eq!(harness.close().await, FlowExit::Closed);

    sleep(Duration::from_secs(10)).await;
    assert_eq!(api.completed.load(Ordering::SeqCst), 1);
    assert!(view.navigations().is_empty());
}

#[tokio::test(start_paused = true)]
async fn errors_are_shown_for_edited_fields_until_submit() {
    let harness = Harness::start(FakeApi::answering(200, "ok"));

    harness
        .send(FormEvent::Changed(Field::Username, "bo".into()))
        .await;
    settle().await;

    assert_eq!(
        harness.view.last_errors(),
        Some(FieldErrors {
            username: Some(USERNAME_TOO_SHORT),
            email: None,
            password: None,
        })
    );

    harness.send(FormEvent::Submit).await;
    settle().await;

    assert_eq!(
        harness.view.last_errors(),
        Some(FieldErrors {
            username: Some(USERNAME_TOO_SHORT),
            email: Some(EMAIL_REQUIRED),
            password: Some(PASSWORD_REQUIRED),
        })
    );
    assert!(harness.api.calls().is_empty());
    assert_eq!(harness.close().await, FlowExit::Closed);
}
