//! Integration tests for the tabrefresh daemon over its Unix socket.
//!
//! Each test starts a real server in a temp directory, connects a scripted
//! browser host plus UI clients, and drives the JSONL protocol end to end.

use std::path::Path;
use std::time::Duration;

use tabrefresh_config::TabRefreshConfig;
use tabrefresh_daemon::DaemonConfig;
use tabrefresh_daemon::protocol::{read_message, write_message};
use tabrefresh_protocol::{
    ClientMessage, DaemonMessage, ErrorCode, HostCall, HostReply, RefreshMode, RefreshSettings,
    RefreshStateChange, TabId, TabInfo, TimeUnit,
};
use tokio::io::BufReader;
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::task::JoinHandle;

const TAB: TabId = TabId::new(11);

fn test_config(dir: &Path) -> DaemonConfig {
    DaemonConfig {
        socket_path: dir.join("daemon.sock"),
        pid_path: dir.join("daemon.pid"),
        state_path: dir.join("state.json"),
        shutdown_timeout_secs: 2,
    }
}

fn spawn_server(config: DaemonConfig) -> JoinHandle<Result<(), tabrefresh_daemon::DaemonError>> {
    tokio::spawn(tabrefresh_daemon::run_server(
        config,
        TabRefreshConfig::default(),
    ))
}

struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    next_id: u64,
}

impl Client {
    async fn connect(socket: &Path) -> Self {
        for _ in 0..50 {
            if let Ok(stream) = UnixStream::connect(socket).await {
                let (r, w) = stream.into_split();
                return Self {
                    reader: BufReader::new(r),
                    writer: w,
                    next_id: 0,
                };
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("daemon socket never came up at {}", socket.display());
    }

    fn id(&mut self) -> String {
        self.next_id += 1;
        format!("req-{}", self.next_id)
    }

    async fn send(&mut self, msg: &ClientMessage) {
        write_message(&mut self.writer, msg).await.unwrap();
    }

    async fn recv(&mut self) -> DaemonMessage {
        tokio::time::timeout(Duration::from_secs(5), read_message(&mut self.reader))
            .await
            .expect("timed out waiting for the daemon")
            .unwrap()
            .expect("daemon closed the connection")
    }

    /// Send and return the first non-push reply.
    async fn request(&mut self, msg: ClientMessage) -> DaemonMessage {
        self.send(&msg).await;
        loop {
            let reply = self.recv().await;
            if !reply.is_push() {
                return reply;
            }
        }
    }

    async fn subscribe(&mut self) {
        let id = self.id();
        let reply = self.request(ClientMessage::Subscribe { id }).await;
        assert!(matches!(reply, DaemonMessage::Ack { .. }));
    }

    async fn start(&mut self, tab_id: TabId, settings: RefreshSettings) -> DaemonMessage {
        let id = self.id();
        self.request(ClientMessage::StartAutoRefresh {
            id,
            tab_id,
            mode: RefreshMode::Time,
            settings,
        })
        .await
    }

    async fn stop_daemon(&mut self, save_state: bool) {
        let id = self.id();
        let reply = self
            .request(ClientMessage::DaemonStop { id, save_state })
            .await;
        assert!(matches!(reply, DaemonMessage::Ack { .. }), "got {:?}", reply);
    }
}

/// A browser where every tab exists and every call succeeds.
async fn spawn_browser(socket: &Path) -> JoinHandle<()> {
    let mut host = Client::connect(socket).await;
    let id = host.id();
    host.send(&ClientMessage::RegisterHost { id }).await;

    tokio::spawn(async move {
        loop {
            let Ok(Some(msg)) = read_message::<_, DaemonMessage>(&mut host.reader).await else {
                return;
            };
            let DaemonMessage::HostCall { call_id, call } = msg else {
                continue;
            };
            let reply = match call {
                HostCall::GetTab { tab_id } => HostReply::Tab {
                    tab: TabInfo {
                        id: tab_id,
                        url: Some("https://example.test/".to_string()),
                        title: None,
                        status: Some("complete".to_string()),
                    },
                },
                HostCall::ReadContent { .. } => HostReply::Content {
                    text: Some(String::new()),
                },
                HostCall::PromptContinue { .. } => HostReply::Answer { proceed: true },
                _ => HostReply::Ok,
            };
            let reply = ClientMessage::HostReply { call_id, reply };
            if write_message(&mut host.writer, &reply).await.is_err() {
                return;
            }
        }
    })
}

fn fast_settings() -> RefreshSettings {
    RefreshSettings {
        interval: 200,
        unit: TimeUnit::Milliseconds,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_ping_and_stop() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let server = spawn_server(config.clone());

    let mut client = Client::connect(&config.socket_path).await;
    let id = client.id();
    let reply = client.request(ClientMessage::Ping { id: id.clone() }).await;
    assert!(matches!(reply, DaemonMessage::Ack { id: ref got } if *got == id));
    assert!(config.pid_path.exists());

    client.stop_daemon(false).await;

    let result = tokio::time::timeout(Duration::from_secs(5), server).await;
    assert!(result.unwrap().unwrap().is_ok());
    assert!(!config.pid_path.exists());
    assert!(!config.socket_path.exists());
}

#[tokio::test]
async fn test_second_daemon_refuses_to_start() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let server = spawn_server(config.clone());
    let mut client = Client::connect(&config.socket_path).await;

    let second = tabrefresh_daemon::run_server(config.clone(), TabRefreshConfig::default()).await;
    assert_eq!(second.unwrap_err().error_code(), "daemon_already_running");

    client.stop_daemon(false).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), server).await;
}

#[tokio::test]
async fn test_refresh_cycle_pushes_counts() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let server = spawn_server(config.clone());

    let mut ui = Client::connect(&config.socket_path).await;
    ui.subscribe().await;
    let browser = spawn_browser(&config.socket_path).await;

    let reply = ui.start(TAB, fast_settings()).await;
    assert!(matches!(reply, DaemonMessage::Ack { .. }), "got {:?}", reply);

    let mut counts = Vec::new();
    let mut saw_timer_reset = false;
    while counts.len() < 2 {
        match ui.recv().await {
            DaemonMessage::UpdateRefreshCount { tab_id, count, .. } => {
                assert_eq!(tab_id, TAB);
                counts.push(count);
            }
            DaemonMessage::TimerReset { tab_id, timer_info, .. } => {
                assert_eq!(tab_id, TAB);
                assert_eq!(timer_info.unit, TimeUnit::Milliseconds);
                saw_timer_reset = true;
            }
            _ => {}
        }
    }
    assert_eq!(counts, vec![1, 2]);
    assert!(saw_timer_reset);

    let id = ui.id();
    match ui
        .request(ClientMessage::GetRefreshState { id, tab_id: TAB })
        .await
    {
        DaemonMessage::RefreshState { state, .. } => {
            assert!(state.active);
            assert_eq!(state.mode, Some(RefreshMode::Time));
            assert!(state.count >= 2);
        }
        other => panic!("unexpected reply: {:?}", other),
    }

    let id = ui.id();
    let reply = ui
        .request(ClientMessage::StopAutoRefresh { id, tab_id: TAB })
        .await;
    assert!(matches!(reply, DaemonMessage::Ack { .. }));

    let id = ui.id();
    match ui
        .request(ClientMessage::GetCountdownInfo { id, tab_id: TAB })
        .await
    {
        DaemonMessage::CountdownInfo { timer_info, .. } => {
            assert_eq!(timer_info.remaining, 0);
            assert_eq!(timer_info.total, 0);
        }
        other => panic!("unexpected reply: {:?}", other),
    }

    ui.stop_daemon(false).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), server).await;
    browser.abort();
}

#[tokio::test]
async fn test_errors_carry_codes() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let server = spawn_server(config.clone());
    let mut ui = Client::connect(&config.socket_path).await;

    let reply = ui
        .start(
            TAB,
            RefreshSettings {
                interval: 0,
                ..Default::default()
            },
        )
        .await;
    match reply {
        DaemonMessage::Error { code, .. } => assert_eq!(code, ErrorCode::InvalidSettings),
        other => panic!("unexpected reply: {:?}", other),
    }

    let id = ui.id();
    match ui
        .request(ClientMessage::UpdateIterationSetting {
            id: id.clone(),
            tab_id: TAB,
            continue_iteration: true,
        })
        .await
    {
        DaemonMessage::Error {
            id: got,
            code,
            message,
        } => {
            assert_eq!(got, id);
            assert_eq!(code, ErrorCode::NoActiveSession);
            assert_eq!(message, "No active refresh");
        }
        other => panic!("unexpected reply: {:?}", other),
    }

    // No host registered yet.
    let id = ui.id();
    match ui
        .request(ClientMessage::GetTabInfo { id, tab_id: TAB })
        .await
    {
        DaemonMessage::Error { code, .. } => assert_eq!(code, ErrorCode::HostUnavailable),
        other => panic!("unexpected reply: {:?}", other),
    }

    // Garbage keeps the connection open.
    ui.writer
        .try_write(b"{not json}\n")
        .expect("socket write");
    match ui.recv().await {
        DaemonMessage::Error { code, .. } => assert_eq!(code, ErrorCode::ProtocolError),
        other => panic!("unexpected reply: {:?}", other),
    }

    ui.stop_daemon(false).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), server).await;
}

#[tokio::test]
async fn test_saved_sessions_resume_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let server = spawn_server(config.clone());
    let mut ui = Client::connect(&config.socket_path).await;
    let settings = RefreshSettings {
        interval: 45,
        ..Default::default()
    };
    assert!(matches!(
        ui.start(TAB, settings).await,
        DaemonMessage::Ack { .. }
    ));
    ui.stop_daemon(true).await;
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    let server = spawn_server(config.clone());
    let browser = spawn_browser(&config.socket_path).await;
    let mut ui = Client::connect(&config.socket_path).await;

    let mut resumed = None;
    for _ in 0..50 {
        let id = ui.id();
        if let DaemonMessage::RefreshState { state, .. } = ui
            .request(ClientMessage::GetRefreshState { id, tab_id: TAB })
            .await
            && state.active
        {
            resumed = Some(state);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let state = resumed.expect("session was not restored");
    assert_eq!(state.settings.map(|s| s.interval), Some(45));
    assert_eq!(state.timer_info.total, 45);

    ui.stop_daemon(false).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), server).await;
    browser.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_host_requests_apply_in_read_order() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let server = spawn_server(config.clone());

    let mut host = Client::connect(&config.socket_path).await;
    let id = host.id();
    let reply = host.request(ClientMessage::RegisterHost { id }).await;
    assert!(matches!(reply, DaemonMessage::Ack { .. }), "got {:?}", reply);

    let tabs: Vec<TabId> = (1..=200).map(TabId::new).collect();
    let settings = RefreshSettings {
        interval: 60,
        ..Default::default()
    };
    for &tab_id in &tabs {
        let id = host.id();
        host.send(&ClientMessage::StartAutoRefresh {
            id,
            tab_id,
            mode: RefreshMode::Time,
            settings: settings.clone(),
        })
        .await;
        let id = host.id();
        host.send(&ClientMessage::TabRemoved { id, tab_id }).await;
    }

    let mut acks = 0;
    while acks < tabs.len() * 2 {
        match host.recv().await {
            DaemonMessage::Ack { .. } => acks += 1,
            DaemonMessage::HostCall { call_id, .. } => {
                let reply = ClientMessage::HostReply {
                    call_id,
                    reply: HostReply::Ok,
                };
                host.send(&reply).await;
            }
            DaemonMessage::Error { message, .. } => panic!("request failed: {}", message),
            _ => {}
        }
    }

    let mut ui = Client::connect(&config.socket_path).await;
    let mut still_active = Vec::new();
    for &tab_id in &tabs {
        let id = ui.id();
        if let DaemonMessage::RefreshState { state, .. } = ui
            .request(ClientMessage::GetRefreshState { id, tab_id })
            .await
            && state.active
        {
            still_active.push(tab_id);
        }
    }
    assert!(still_active.is_empty(), "closed tabs still active: {:?}", still_active);

    ui.stop_daemon(false).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), server).await;
}

#[tokio::test]
async fn test_set_refresh_state_starts_and_stops() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let server = spawn_server(config.clone());
    let mut ui = Client::connect(&config.socket_path).await;

    let id = ui.id();
    let reply = ui
        .request(ClientMessage::SetRefreshState {
            id,
            tab_id: TAB,
            state: RefreshStateChange {
                active: true,
                mode: Some(RefreshMode::Time),
                settings: Some(RefreshSettings {
                    interval: 45,
                    ..Default::default()
                }),
            },
        })
        .await;
    assert!(matches!(reply, DaemonMessage::Ack { .. }), "got {:?}", reply);

    let id = ui.id();
    match ui
        .request(ClientMessage::GetRefreshState { id, tab_id: TAB })
        .await
    {
        DaemonMessage::RefreshState { state, .. } => {
            assert!(state.active);
            assert_eq!(state.timer_info.total, 45);
        }
        other => panic!("unexpected reply: {:?}", other),
    }

    let id = ui.id();
    let reply = ui
        .request(ClientMessage::SetRefreshState {
            id,
            tab_id: TAB,
            state: RefreshStateChange::default(),
        })
        .await;
    assert!(matches!(reply, DaemonMessage::Ack { .. }), "got {:?}", reply);

    let id = ui.id();
    match ui
        .request(ClientMessage::GetRefreshState { id, tab_id: TAB })
        .await
    {
        DaemonMessage::RefreshState { state, .. } => assert!(!state.active),
        other => panic!("unexpected reply: {:?}", other),
    }

    ui.stop_daemon(false).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), server).await;
}
