//! In-process fakes for the host traits.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tabrefresh_protocol::{DaemonMessage, TabCommand, TabId, TabInfo};

use crate::host::{HostError, Notifier, Prompter, TabHost};

#[derive(Default)]
struct HostState {
    gone: HashSet<TabId>,
    unavailable: bool,
    /// `None` entry: the selector matches nothing.
    contents: HashMap<TabId, Option<String>>,
    content_error: Option<String>,
    reloads: Vec<TabId>,
    messages: Vec<(TabId, TabCommand)>,
}

/// A browser where every tab exists until closed.
#[derive(Default)]
pub struct FakeHost {
    state: Mutex<HostState>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn close_tab(&self, tab_id: TabId) {
        self.state.lock().unwrap().gone.insert(tab_id);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap().unavailable = unavailable;
    }

    pub fn set_content(&self, tab_id: TabId, content: Option<&str>) {
        self.state
            .lock()
            .unwrap()
            .contents
            .insert(tab_id, content.map(str::to_string));
    }

    pub fn fail_content(&self, message: Option<&str>) {
        self.state.lock().unwrap().content_error = message.map(str::to_string);
    }

    pub fn reload_count(&self, tab_id: TabId) -> usize {
        self.state
            .lock()
            .unwrap()
            .reloads
            .iter()
            .filter(|t| **t == tab_id)
            .count()
    }

    pub fn messages(&self) -> Vec<(TabId, TabCommand)> {
        self.state.lock().unwrap().messages.clone()
    }

    fn check(&self, tab_id: TabId) -> Result<(), HostError> {
        let state = self.state.lock().unwrap();
        if state.unavailable {
            return Err(HostError::Unavailable {
                message: "no host registered".to_string(),
            });
        }
        if state.gone.contains(&tab_id) {
            return Err(HostError::TabGone { tab_id });
        }
        Ok(())
    }
}

#[async_trait]
impl TabHost for FakeHost {
    async fn get_tab(&self, tab_id: TabId) -> Result<TabInfo, HostError> {
        self.check(tab_id)?;
        Ok(TabInfo {
            id: tab_id,
            url: Some(format!("https://example.test/{}", tab_id)),
            title: Some(format!("Tab {}", tab_id)),
            status: Some("complete".to_string()),
        })
    }

    async fn reload(&self, tab_id: TabId) -> Result<(), HostError> {
        self.check(tab_id)?;
        self.state.lock().unwrap().reloads.push(tab_id);
        Ok(())
    }

    async fn read_content(
        &self,
        tab_id: TabId,
        _selector: Option<&str>,
    ) -> Result<Option<String>, HostError> {
        self.check(tab_id)?;
        let state = self.state.lock().unwrap();
        if let Some(ref message) = state.content_error {
            return Err(HostError::Failed {
                message: message.clone(),
            });
        }
        Ok(state
            .contents
            .get(&tab_id)
            .cloned()
            .unwrap_or_else(|| Some(String::new())))
    }

    async fn send_tab_message(
        &self,
        tab_id: TabId,
        command: TabCommand,
    ) -> Result<(), HostError> {
        self.check(tab_id)?;
        self.state.lock().unwrap().messages.push((tab_id, command));
        Ok(())
    }
}

/// Answers every prompt the same way. `None` never answers.
pub struct FakePrompter {
    answer: Mutex<Option<bool>>,
    fail: bool,
    asked: Mutex<Vec<TabId>>,
    dismissed: Mutex<Vec<TabId>>,
}

impl FakePrompter {
    pub fn answering(answer: Option<bool>) -> Self {
        Self {
            answer: Mutex::new(answer),
            fail: false,
            asked: Mutex::new(Vec::new()),
            dismissed: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::answering(None)
        }
    }

    pub fn set_answer(&self, answer: Option<bool>) {
        *self.answer.lock().unwrap() = answer;
    }

    pub fn asked(&self) -> Vec<TabId> {
        self.asked.lock().unwrap().clone()
    }

    pub fn dismissed(&self) -> Vec<TabId> {
        self.dismissed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prompter for FakePrompter {
    async fn ask(&self, tab_id: TabId) -> Result<bool, HostError> {
        self.asked.lock().unwrap().push(tab_id);
        if self.fail {
            return Err(HostError::Failed {
                message: "notification closed".to_string(),
            });
        }
        let answer = *self.answer.lock().unwrap();
        match answer {
            Some(answer) => Ok(answer),
            None => std::future::pending().await,
        }
    }

    async fn dismiss(&self, tab_id: TabId) -> Result<(), HostError> {
        self.dismissed.lock().unwrap().push(tab_id);
        Ok(())
    }
}

/// Records every push. Starts listening.
pub struct RecordingNotifier {
    messages: Mutex<Vec<DaemonMessage>>,
    listening: AtomicBool,
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            listening: AtomicBool::new(true),
        }
    }
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_listening(&self, listening: bool) {
        self.listening.store(listening, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<DaemonMessage> {
        self.messages.lock().unwrap().clone()
    }

    /// Counts from every refresh-count push for `tab_id`.
    pub fn counts(&self, tab_id: TabId) -> Vec<u64> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                DaemonMessage::UpdateRefreshCount {
                    tab_id: t, count, ..
                } if t == tab_id => Some(count),
                _ => None,
            })
            .collect()
    }

    pub fn stopped(&self, tab_id: TabId) -> bool {
        self.messages()
            .iter()
            .any(|m| matches!(m, DaemonMessage::AutoRefreshStopped { tab_id: t } if *t == tab_id))
    }

    /// Reasons of every conditional or smart check pushed for `tab_id`.
    pub fn check_reasons(&self, tab_id: TabId) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                DaemonMessage::ConditionalCheckResult {
                    tab_id: t, reason, ..
                }
                | DaemonMessage::SmartScheduleStatus {
                    tab_id: t, reason, ..
                } if t == tab_id => Some(reason),
                _ => None,
            })
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn publish(&self, message: DaemonMessage) -> Result<(), HostError> {
        if !self.listening.load(Ordering::SeqCst) {
            return Err(HostError::MessagingUnavailable);
        }
        self.messages.lock().unwrap().push(message);
        Ok(())
    }
}
