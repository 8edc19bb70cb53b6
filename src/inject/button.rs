use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::copy::CopyError;
use crate::pr::PullRequestLocation;

/// Stable identifier of the injected button.
pub const BUTTON_ID: &str = "pr-copy-button";

/// How long the success/error label stays up before the button re-enables.
pub const RESET_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonState {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Click,
    Succeeded,
    Failed,
    ResetElapsed,
}

impl ButtonState {
    pub fn label(self) -> &'static str {
        match self {
            ButtonState::Idle => "Copy PR",
            ButtonState::Loading => "Copying…",
            ButtonState::Success => "Copied!",
            ButtonState::Error => "Error",
        }
    }

    /// Only an idle button accepts clicks.
    pub fn is_enabled(self) -> bool {
        matches!(self, ButtonState::Idle)
    }

    /// Events that make no sense in the current state leave it unchanged.
    pub fn next(self, event: ButtonEvent) -> ButtonState {
        match (self, event) {
            (ButtonState::Idle, ButtonEvent::Click) => ButtonState::Loading,
            (ButtonState::Loading, ButtonEvent::Succeeded) => ButtonState::Success,
            (ButtonState::Loading, ButtonEvent::Failed) => ButtonState::Error,
            (ButtonState::Success | ButtonState::Error, ButtonEvent::ResetElapsed) => ButtonState::Idle,
            (state, _) => state,
        }
    }
}

/// The injected button, bound to the PR of the current page.
#[derive(Debug)]
pub struct CopyButton {
    target: PullRequestLocation,
    state: ButtonState,
    reset_delay: Duration,
}

impl CopyButton {
    pub fn new(target: PullRequestLocation) -> Self {
        Self {
            target,
            state: ButtonState::Idle,
            reset_delay: RESET_DELAY,
        }
    }

    #[cfg(test)]
    pub fn with_reset_delay(mut self, reset_delay: Duration) -> Self {
        self.reset_delay = reset_delay;
        self
    }

    pub fn id(&self) -> &'static str {
        BUTTON_ID
    }

    /// Point the existing button at another PR instead of recreating it.
    pub fn retarget(&mut self, target: PullRequestLocation) {
        self.target = target;
    }

    pub fn target(&self) -> &PullRequestLocation {
        &self.target
    }

    pub fn state(&self) -> ButtonState {
        self.state
    }

    fn apply(&mut self, event: ButtonEvent, render: &mut impl FnMut(ButtonState)) {
        let next = self.state.next(event);
        if next != self.state {
            self.state = next;
            render(next);
        }
    }

    /// Run one click: disable and show loading, run `action` for the current
    /// target, show the outcome, wait out the reset delay, then return to idle.
    ///
    /// Holding `&mut self` for the whole sequence keeps a single copy in
    /// flight per button. The outcome is handed back so the caller can log
    /// it, but the button always ends idle and usable.
    pub async fn press<T, F, Fut>(
        &mut self,
        action: F,
        mut render: impl FnMut(ButtonState),
    ) -> Result<T, CopyError>
    where
        F: FnOnce(PullRequestLocation) -> Fut,
        Fut: Future<Output = Result<T, CopyError>>,
    {
        self.apply(ButtonEvent::Click, &mut render);
        debug!(button = BUTTON_ID, pr = %self.target.slug(), number = self.target.number, "copy started");

        let result = action(self.target.clone()).await;
        match &result {
            Ok(_) => self.apply(ButtonEvent::Succeeded, &mut render),
            Err(err) => {
                warn!(button = BUTTON_ID, error = %err, "copy failed");
                self.apply(ButtonEvent::Failed, &mut render);
            }
        }

        if !self.reset_delay.is_zero() {
            tokio::time::sleep(self.reset_delay).await;
        }
        self.apply(ButtonEvent::ResetElapsed, &mut render);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(number: u64) -> PullRequestLocation {
        PullRequestLocation {
            owner: "acme".to_string(),
            repo: "widgets".to_string(),
            number,
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(ButtonState::Idle.label(), "Copy PR");
        assert_eq!(ButtonState::Loading.label(), "Copying…");
        assert_eq!(ButtonState::Success.label(), "Copied!");
        assert_eq!(ButtonState::Error.label(), "Error");
    }

    #[test]
    fn test_transitions() {
        use ButtonEvent::*;
        use ButtonState::*;

        assert_eq!(Idle.next(Click), Loading);
        assert_eq!(Loading.next(Succeeded), Success);
        assert_eq!(Loading.next(Failed), Error);
        assert_eq!(Success.next(ResetElapsed), Idle);
        assert_eq!(Error.next(ResetElapsed), Idle);

        // Clicks are ignored while disabled.
        assert_eq!(Loading.next(Click), Loading);
        assert_eq!(Success.next(Click), Success);
        assert_eq!(Error.next(Click), Error);
        assert_eq!(Idle.next(Succeeded), Idle);
    }

    #[test]
    fn test_only_idle_is_enabled() {
        assert!(ButtonState::Idle.is_enabled());
        assert!(!ButtonState::Loading.is_enabled());
        assert!(!ButtonState::Success.is_enabled());
        assert!(!ButtonState::Error.is_enabled());
    }

    #[tokio::test]
    async fn test_successful_press_cycles_states() {
        let mut button = CopyButton::new(location(1)).with_reset_delay(Duration::ZERO);
        let mut rendered = Vec::new();

        let result = button
            .press(|target| async move { Ok(target.number) }, |state| rendered.push(state))
            .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(
            rendered,
            vec![ButtonState::Loading, ButtonState::Success, ButtonState::Idle]
        );
        assert_eq!(button.state(), ButtonState::Idle);
    }

    #[tokio::test]
    async fn test_failed_press_shows_error_then_recovers() {
        let mut button = CopyButton::new(location(1)).with_reset_delay(Duration::ZERO);
        let mut rendered = Vec::new();

        let result: Result<(), CopyError> = button
            .press(
                |_| async { Err(CopyError::Configuration("no token".to_string())) },
                |state| rendered.push(state.label()),
            )
            .await;

        assert!(result.is_err());
        assert_eq!(rendered, vec!["Copying…", "Error", "Copy PR"]);

        // Still usable afterwards.
        let again = button.press(|_| async { Ok(()) }, |_| {}).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn test_press_uses_current_target() {
        let mut button = CopyButton::new(location(1)).with_reset_delay(Duration::ZERO);
        button.retarget(location(9));
        let number = button
            .press(|target| async move { Ok(target.number) }, |_| {})
            .await
            .unwrap();
        assert_eq!(number, 9);
        assert_eq!(button.id(), "pr-copy-button");
    }

    #[tokio::test]
    async fn test_reset_waits_for_delay() {
        let mut button = CopyButton::new(location(1)).with_reset_delay(Duration::from_millis(20));
        let started = std::time::Instant::now();
        button.press(|_| async { Ok(()) }, |_| {}).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(20));
        assert_eq!(button.state(), ButtonState::Idle);
    }
}
