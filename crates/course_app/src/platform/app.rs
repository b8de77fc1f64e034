use std::io::{self, IsTerminal, Write};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context};
use course_core::{
    update, AppState, Clock, CourseId, Effect, FormField, GenerationSettings, GenerationStatus,
    GenerationStore, Msg, Notice, ProgressEstimator, ReceiverView, Route, StatusBroadcastReceiver,
    Surface, SystemClock,
};
use course_engine::{
    mount_receiver, ChannelReceiverSink, CourseApi, Credentials, EngineHandle, ReqwestCourseApi,
    TimerHandle,
};
use course_logging::{course_debug, course_info};

use super::config::AppConfig;
use super::effects::EffectRunner;
use super::render;
use super::session::{self, CredentialStore};
use crate::{Args, Command};

const IDLE_WAIT: Duration = Duration::from_millis(20);
const MOUNT_TIMEOUT: Duration = Duration::from_secs(5);

pub fn run(args: Args) -> anyhow::Result<()> {
    let state_dir = session::resolve_state_dir(args.state_dir);
    let config = AppConfig::load(&state_dir);
    let store = session::open_store(&state_dir, args.session.as_deref())?;
    let credentials = CredentialStore::new(&store);
    course_info!(
        "coursegen starting state_dir={:?} user={:?}",
        state_dir,
        credentials.username()
    );

    let api = ReqwestCourseApi::new(&config.api_settings(), credentials.token())
        .context("invalid backend address")?;
    let engine = EngineHandle::new(Arc::new(api)).context("cannot start the async runtime")?;
    let mut app = App::new(
        store,
        engine,
        config.generation_settings(),
        Arc::new(SystemClock),
    );

    match args.command {
        Command::Register { username, password } => {
            let credentials_in = Credentials { username, password };
            let api = app.api();
            let auth = app
                .runner
                .engine()
                .block_on(async move { api.register(&credentials_in).await })?;
            credentials.save(&auth.token, &auth.username)?;
            println!("Registered and logged in as {}.", auth.username);
        }
        Command::Login { username, password } => {
            let credentials_in = Credentials { username, password };
            let api = app.api();
            let auth = app
                .runner
                .engine()
                .block_on(async move { api.login(&credentials_in).await })?;
            credentials.save(&auth.token, &auth.username)?;
            println!("Logged in as {}.", auth.username);
        }
        Command::Logout => {
            credentials.clear()?;
            println!("Logged out.");
        }
        Command::Courses => app.list_courses()?,
        Command::Show { id } => app.show_course(id)?,
        Command::Generate {
            subject,
            topic,
            standard,
        } => app.generate(subject, topic, standard)?,
        Command::Watch => app.watch()?,
        Command::Status => app.status(),
        Command::Open => app.open()?,
        Command::Reset => {
            app.dispatch(Msg::CreateAnotherClicked);
            println!("Ready to create another course.");
        }
        Command::Delete { ids } => app.delete(ids)?,
    }
    Ok(())
}

/// One command's worth of dashboard state plus the drivers feeding it.
struct App {
    state: AppState,
    store: GenerationStore,
    settings: GenerationSettings,
    clock: Arc<dyn Clock>,
    runner: EffectRunner,
    msg_rx: mpsc::Receiver<Msg>,
    toast: Toast,
}

impl App {
    fn new(
        store: GenerationStore,
        engine: EngineHandle,
        settings: GenerationSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let estimator = ProgressEstimator::new(settings);
        let (msg_tx, msg_rx) = mpsc::channel();
        let runner = EffectRunner::new(engine, store.clone(), estimator, clock.clone(), msg_tx);
        Self {
            state: AppState::new(estimator),
            store,
            settings: *estimator.settings(),
            clock,
            runner,
            msg_rx,
            toast: Toast::new(),
        }
    }

    fn api(&self) -> Arc<dyn CourseApi> {
        self.runner.engine().api()
    }

    fn dispatch(&mut self, msg: Msg) {
        course_debug!("dispatch {:?}", msg);
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg, &self.store, self.clock.now());
        state.consume_dirty();
        self.state = state;
        for effect in self.runner.enqueue(effects) {
            self.show(effect);
        }
    }

    /// Feeds every queued engine result and estimator tick through `update`.
    fn pump(&mut self) -> bool {
        let mut handled = false;
        while let Some(msg) = self.runner.next_event(Duration::ZERO) {
            self.dispatch(msg);
            handled = true;
        }
        while let Ok(msg) = self.msg_rx.try_recv() {
            self.dispatch(msg);
            handled = true;
        }
        handled
    }

    /// Blocks until every outstanding backend request has answered.
    fn settle(&mut self) {
        while self.runner.pending() > 0 {
            match self.runner.next_event(MOUNT_TIMEOUT) {
                Some(msg) => self.dispatch(msg),
                None => course_debug!("still waiting for {} requests", self.runner.pending()),
            }
        }
    }

    fn show(&mut self, effect: Effect) {
        match effect {
            Effect::ShowNotice(notice) => {
                self.toast.clear();
                eprintln!("{}", render::notice(notice));
            }
            Effect::Navigate(Route::Course(course_id)) => {
                println!("Course {course_id} is ready: coursegen show {course_id}");
            }
            Effect::Navigate(Route::Generate) => {
                let view = self.receiver_view();
                if let Some(line) = render::toast_line(&view) {
                    println!("{line}");
                }
                println!("Follow it with: coursegen watch");
            }
            Effect::ScrollToTop => {}
            Effect::Redraw(view) => self.toast.draw(&view),
            Effect::Dismiss => self.toast.clear(),
            other => course_debug!("effect {:?} has no display", other),
        }
    }

    fn receiver_view(&self) -> ReceiverView {
        ReceiverView::from_job(&self.store.read(), self.clock.now(), &self.settings)
    }

    fn mount(&self, surface: Surface) -> (TimerHandle, mpsc::Receiver<(Surface, Effect)>) {
        let (tx, rx) = mpsc::channel();
        let timer = mount_receiver(
            &self.runner.engine().runtime(),
            surface,
            self.store.clone(),
            self.settings,
            self.clock.clone(),
            Arc::new(ChannelReceiverSink::new(tx)),
        );
        (timer, rx)
    }

    /// Waits for the mount check and returns the first view it drew.
    fn await_mount(
        &mut self,
        receiver_rx: &mpsc::Receiver<(Surface, Effect)>,
    ) -> anyhow::Result<ReceiverView> {
        loop {
            let (_, effect) = receiver_rx
                .recv_timeout(MOUNT_TIMEOUT)
                .map_err(|_| anyhow!("progress indicator did not start"))?;
            if let Effect::Redraw(view) = &effect {
                let view = view.clone();
                self.show(effect);
                return Ok(view);
            }
            self.show(effect);
        }
    }

    /// Renders the toast until it dismisses itself or the job goes away.
    fn follow(
        &mut self,
        receiver_rx: &mpsc::Receiver<(Surface, Effect)>,
    ) -> anyhow::Result<Option<CourseId>> {
        let mut last = ReceiverView::default();
        loop {
            let mut handled = self.pump();
            while let Ok((_, effect)) = receiver_rx.try_recv() {
                handled = true;
                match effect {
                    Effect::Dismiss => {
                        self.toast.clear();
                        return Ok(last.course_id);
                    }
                    Effect::Redraw(view) => {
                        if view.status == GenerationStatus::Idle && last.status.is_in_flight() {
                            self.toast.clear();
                            if self.state.notice() == Some(Notice::SubmissionFailed) {
                                bail!("course generation failed");
                            }
                            bail!("course generation was cancelled");
                        }
                        self.toast.draw(&view);
                        last = view;
                    }
                    other => self.show(other),
                }
            }
            if !handled {
                thread::sleep(IDLE_WAIT);
            }
        }
    }

    fn generate(&mut self, subject: String, topic: String, standard: String) -> anyhow::Result<()> {
        let (_toast_timer, receiver_rx) = self.mount(Surface::GlobalToast);
        self.await_mount(&receiver_rx)?;

        self.dispatch(Msg::FormChanged {
            field: FormField::Subject,
            value: subject,
        });
        self.dispatch(Msg::FormChanged {
            field: FormField::Topic,
            value: topic,
        });
        self.dispatch(Msg::FormChanged {
            field: FormField::Standard,
            value: standard,
        });
        self.dispatch(Msg::GenerateClicked);

        if !self.state.estimator_running() {
            if self.state.notice() == Some(Notice::MissingFields) {
                bail!("subject, topic and standard are all required");
            }
            bail!("a course is already being generated; follow it with `coursegen watch`");
        }

        let course_id = self.follow(&receiver_rx)?;
        self.settle();
        match course_id {
            Some(course_id) => println!("Course {course_id} is ready: coursegen show {course_id}"),
            None => eprintln!("{}", render::notice(Notice::MissingResult)),
        }
        Ok(())
    }

    fn watch(&mut self) -> anyhow::Result<()> {
        let (_toast_timer, receiver_rx) = self.mount(Surface::GlobalToast);
        let first = self.await_mount(&receiver_rx)?;
        if first.status == GenerationStatus::Idle {
            println!("No course is being generated.");
            return Ok(());
        }
        if let Some(course_id) = self.follow(&receiver_rx)? {
            println!("Course {course_id} is ready: coursegen show {course_id}");
        }
        Ok(())
    }

    fn status(&self) {
        let job = self.store.read();
        let view = ReceiverView::from_job(&job, self.clock.now(), &self.settings);
        println!("{}", render::status(&job, &view));
    }

    fn open(&mut self) -> anyhow::Result<()> {
        let (receiver, effects) = StatusBroadcastReceiver::mount(
            Surface::GlobalToast,
            &self.store,
            self.settings,
            self.clock.now(),
        );
        for effect in effects {
            if !matches!(effect, Effect::Redraw(_)) {
                self.show(effect);
            }
        }
        let action = receiver.activate();
        receiver.unmount();
        match action {
            Some(Effect::Navigate(Route::Course(course_id))) => self.show_course(course_id),
            Some(effect) => {
                self.show(effect);
                Ok(())
            }
            None => {
                println!("Nothing to open.");
                Ok(())
            }
        }
    }

    fn list_courses(&mut self) -> anyhow::Result<()> {
        let result = self.store.read().result_course_id;
        for effect in self.runner.enqueue(vec![Effect::LoadCourses]) {
            self.show(effect);
        }
        self.settle();
        if self.state.notice() == Some(Notice::LoadFailed) {
            bail!("could not load courses");
        }

        let mut view = self.state.view();
        for row in &mut view.courses {
            row.is_new |= result == Some(row.course.id);
        }
        println!("{}", render::course_list(&view));
        Ok(())
    }

    fn show_course(&self, course_id: CourseId) -> anyhow::Result<()> {
        let api = self.api();
        let course = self
            .runner
            .engine()
            .block_on(async move { api.fetch_course(course_id).await })
            .with_context(|| format!("could not load course {course_id}"))?;
        println!("{}", render::course(&course));
        Ok(())
    }

    fn delete(&mut self, ids: Vec<CourseId>) -> anyhow::Result<()> {
        let count = ids.len();
        self.dispatch(Msg::DeleteRequested(ids));
        self.settle();
        if self.state.notice() == Some(Notice::DeleteFailed) {
            bail!("not every course could be deleted");
        }
        println!("Deleted {count} course(s).");
        Ok(())
    }
}

/// Single status line, redrawn in place on a terminal.
struct Toast {
    inline: bool,
    open: bool,
    started: Instant,
}

impl Toast {
    fn new() -> Self {
        Self {
            inline: io::stdout().is_terminal(),
            open: false,
            started: Instant::now(),
        }
    }

    fn draw(&mut self, view: &ReceiverView) {
        let Some(line) = render::toast_line(view) else {
            self.clear();
            return;
        };
        let mut stdout = io::stdout().lock();
        if self.inline {
            let _ = write!(stdout, "\r\x1b[2K{line}");
            self.open = true;
        } else {
            let _ = writeln!(stdout, "[{:>4}s] {line}", self.started.elapsed().as_secs());
        }
        let _ = stdout.flush();
    }

    fn clear(&mut self) {
        if self.open {
            println!();
            self.open = false;
        }
    }
}
