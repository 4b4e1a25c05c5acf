//! Capture and replay of the platform's install offer.

use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallChoice {
    Accepted,
    Dismissed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    /// The platform has not signalled installability.
    Unavailable,
    /// An offer is captured and waiting for the install trigger.
    Offered,
    /// The last offer was declined; the trigger stays visible but does nothing
    /// until the platform offers again.
    Dismissed,
    Installed,
}

/// Single-use install offer captured from the platform.
#[async_trait]
pub trait InstallOffer: Send {
    /// Shows the platform install dialog and reports the user's choice.
    async fn prompt(self: Box<Self>) -> anyhow::Result<InstallChoice>;
}

pub struct InstallPrompt {
    state: InstallState,
    pending: Option<Box<dyn InstallOffer>>,
}

impl Default for InstallPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl InstallPrompt {
    pub fn new() -> Self {
        Self {
            state: InstallState::Unavailable,
            pending: None,
        }
    }

    pub fn state(&self) -> InstallState {
        self.state
    }

    pub fn is_trigger_visible(&self) -> bool {
        matches!(self.state, InstallState::Offered | InstallState::Dismissed)
    }

    pub fn has_offer(&self) -> bool {
        self.pending.is_some()
    }

    /// Platform signalled installability. Ignored once installed.
    pub fn offer_available(&mut self, offer: Box<dyn InstallOffer>) {
        if self.state == InstallState::Installed {
            tracing::debug!("install offer ignored, already installed");
            return;
        }
        self.pending = Some(offer);
        self.state = InstallState::Offered;
    }

    /// Platform reported the application as installed, whatever the current state.
    pub fn app_installed(&mut self) {
        tracing::info!("application installed");
        self.pending = None;
        self.state = InstallState::Installed;
    }

    /// Replays the captured offer. Returns `None` when there is nothing to replay.
    pub async fn trigger(&mut self) -> Option<InstallChoice> {
        let offer = self.pending.take()?;
        let choice = match offer.prompt().await {
            Ok(choice) => choice,
            Err(err) => {
                tracing::warn!(error = %err, "install prompt failed");
                InstallChoice::Dismissed
            }
        };
        self.resolve(choice);
        Some(choice)
    }

    /// Drops the captured offer as declined without prompting.
    pub fn dismiss(&mut self) -> bool {
        if self.pending.take().is_none() {
            return false;
        }
        self.resolve(InstallChoice::Dismissed);
        true
    }

    fn resolve(&mut self, choice: InstallChoice) {
        match choice {
            InstallChoice::Accepted => {
                tracing::info!("user accepted the install prompt");
                self.state = InstallState::Installed;
            }
            InstallChoice::Dismissed => {
                tracing::info!("user dismissed the install prompt");
                if self.state != InstallState::Installed {
                    self.state = InstallState::Dismissed;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct ScriptedOffer {
        answer: anyhow::Result<InstallChoice>,
        prompts: Arc<AtomicUsize>,
    }

    impl ScriptedOffer {
        fn boxed(answer: InstallChoice, prompts: &Arc<AtomicUsize>) -> Box<dyn InstallOffer> {
            Box::new(Self {
                answer: Ok(answer),
                prompts: prompts.clone(),
            })
        }
    }

    #[async_trait]
    impl InstallOffer for ScriptedOffer {
        async fn prompt(self: Box<Self>) -> anyhow::Result<InstallChoice> {
            self.prompts.fetch_add(1, Ordering::SeqCst);
            self.answer
        }
    }

    #[tokio::test]
    async fn trigger_without_offer_is_noop() {
        let mut prompt = InstallPrompt::new();
        assert!(!prompt.is_trigger_visible());
        assert_eq!(prompt.trigger().await, None);
        assert_eq!(prompt.state(), InstallState::Unavailable);
    }

    #[tokio::test]
    async fn accepted_offer_installs_and_hides_trigger() {
        let prompts = Arc::new(AtomicUsize::new(0));
        let mut prompt = InstallPrompt::new();
        prompt.offer_available(ScriptedOffer::boxed(InstallChoice::Accepted, &prompts));
        assert!(prompt.is_trigger_visible());

        assert_eq!(prompt.trigger().await, Some(InstallChoice::Accepted));
        assert_eq!(prompt.state(), InstallState::Installed);
        assert!(!prompt.is_trigger_visible());
        assert_eq!(prompts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn declined_offer_is_single_use() {
        let prompts = Arc::new(AtomicUsize::new(0));
        let mut prompt = InstallPrompt::new();
        prompt.offer_available(ScriptedOffer::boxed(InstallChoice::Dismissed, &prompts));

        assert_eq!(prompt.trigger().await, Some(InstallChoice::Dismissed));
        assert_eq!(prompt.state(), InstallState::Dismissed);
        assert!(prompt.is_trigger_visible());
        assert!(!prompt.has_offer());

        assert_eq!(prompt.trigger().await, None);
        assert_eq!(prompts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fresh_offer_rearms_after_decline() {
        let prompts = Arc::new(AtomicUsize::new(0));
        let mut prompt = InstallPrompt::new();
        prompt.offer_available(ScriptedOffer::boxed(InstallChoice::Dismissed, &prompts));
        prompt.trigger().await;

        prompt.offer_available(ScriptedOffer::boxed(InstallChoice::Accepted, &prompts));
        assert_eq!(prompt.state(), InstallState::Offered);
        assert_eq!(prompt.trigger().await, Some(InstallChoice::Accepted));
        assert_eq!(prompts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_prompt_counts_as_dismissed() {
        let prompts = Arc::new(AtomicUsize::new(0));
        let mut prompt = InstallPrompt::new();
        prompt.offer_available(Box::new(ScriptedOffer {
            answer: Err(anyhow::anyhow!("dialog closed")),
            prompts: prompts.clone(),
        }));

        assert_eq!(prompt.trigger().await, Some(InstallChoice::Dismissed));
        assert!(!prompt.has_offer());
    }

    #[test]
    fn installed_signal_wins_from_any_state() {
        let prompts = Arc::new(AtomicUsize::new(0));
        let mut prompt = InstallPrompt::new();
        prompt.offer_available(ScriptedOffer::boxed(InstallChoice::Accepted, &prompts));

        prompt.app_installed();
        assert_eq!(prompt.state(), InstallState::Installed);
        assert!(!prompt.has_offer());

        prompt.offer_available(ScriptedOffer::boxed(InstallChoice::Accepted, &prompts));
        assert_eq!(prompt.state(), InstallState::Installed);
        assert!(!prompt.has_offer());
    }

    #[test]
    fn dismiss_consumes_offer_without_prompting() {
        let prompts = Arc::new(AtomicUsize::new(0));
        let mut prompt = InstallPrompt::new();
        assert!(!prompt.dismiss());

        prompt.offer_available(ScriptedOffer::boxed(InstallChoice::Accepted, &prompts));
        assert!(prompt.dismiss());
        assert_eq!(prompt.state(), InstallState::Dismissed);
        assert_eq!(prompts.load(Ordering::SeqCst), 0);
    }
}
