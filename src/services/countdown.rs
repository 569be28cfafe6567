use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

pub const DEFAULT_RESEND_MINUTES: u32 = 5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CountdownState {
    pub remaining_seconds: u32,
    pub is_active: bool,
}

impl CountdownState {
    pub fn can_resend(&self) -> bool {
        !self.is_active
    }

    /// `M:SS`, seconds zero-padded.
    pub fn display(&self) -> String {
        format!(
            "{}:{:02}",
            self.remaining_seconds / 60,
            self.remaining_seconds % 60
        )
    }
}

/// Resend cooldown for the verification code, advanced one second per
/// [`tick`](Self::tick).
#[derive(Clone, Debug, Default)]
pub struct VerificationCountdown {
    state: CountdownState,
    default_minutes: u32,
}

impl VerificationCountdown {
    pub fn new(default_minutes: u32) -> Self {
        Self {
            state: CountdownState::default(),
            default_minutes,
        }
    }

    pub fn state(&self) -> CountdownState {
        self.state
    }

    pub fn can_resend(&self) -> bool {
        self.state.can_resend()
    }

    pub fn start(&mut self, minutes: u32) -> CountdownState {
        let remaining_seconds = minutes.saturating_mul(60);
        self.state = CountdownState {
            remaining_seconds,
            is_active: remaining_seconds > 0,
        };
        self.state
    }

    pub fn tick(&mut self) -> CountdownState {
        if self.state.is_active {
            self.state.remaining_seconds = self.state.remaining_seconds.saturating_sub(1);
            self.state.is_active = self.state.remaining_seconds > 0;
        }
        self.state
    }

    pub fn on_resend_success(&mut self) -> CountdownState {
        self.start(self.default_minutes)
    }

    /// The server refused because the current code is still valid; match
    /// its expiry instead of the default.
    pub fn on_resend_rejected(&mut self, retry_after_minutes: u32) -> CountdownState {
        self.start(retry_after_minutes)
    }
}

/// Drives a [`VerificationCountdown`] once per second on the runtime and
/// publishes every state through a watch channel. The ticking task is
/// aborted on restart, [`cancel`](Self::cancel) and drop.
pub struct CountdownTimer {
    countdown: VerificationCountdown,
    state_tx: watch::Sender<CountdownState>,
    task: Option<JoinHandle<()>>,
}

impl CountdownTimer {
    pub fn new(default_minutes: u32) -> Self {
        let (state_tx, _) = watch::channel(CountdownState::default());

        Self {
            countdown: VerificationCountdown::new(default_minutes),
            state_tx,
            task: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CountdownState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> CountdownState {
        *self.state_tx.borrow()
    }

    pub fn start(&mut self, minutes: u32) -> CountdownState {
        self.countdown.start(minutes);
        self.run()
    }

    pub fn on_resend_success(&mut self) -> CountdownState {
        self.countdown.on_resend_success();
        self.run()
    }

    pub fn on_resend_rejected(&mut self, retry_after_minutes: u32) -> CountdownState {
        self.countdown.on_resend_rejected(retry_after_minutes);
        self.run()
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.countdown = VerificationCountdown::new(self.countdown.default_minutes);
        self.state_tx.send_replace(CountdownState::default());
    }

    fn run(&mut self) -> CountdownState {
        if let Some(task) = self.task.take() {
            task.abort();
        }

        let initial = self.countdown.state();
        self.state_tx.send_replace(initial);
        if !initial.is_active {
            return initial;
        }

        let mut countdown = self.countdown.clone();
        let state_tx = self.state_tx.clone();
        self.task = Some(tokio::spawn(async move {
            let period = Duration::from_secs(1);
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

            loop {
                ticker.tick().await;
                let state = countdown.tick();
                state_tx.send_replace(state);
                if !state.is_active {
                    log::debug!("Verification resend re-enabled");
                    break;
                }
            }
        }));

        initial
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
