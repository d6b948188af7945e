use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tokio::sync::{mpsc, oneshot};

use super::debouncer::{DEFAULT_DEBOUNCE_MS, DebounceState, Debouncer, is_temp_file};
use super::types::{ChangeEvent, ChangeKind, Coalesced};
use super::{FsActor, WatchError, drive};
use crate::config::DevConfig;
use crate::reload::{FanOut, Notify, ReloadServer};

const WINDOW: Duration = Duration::from_millis(DEFAULT_DEBOUNCE_MS);

#[derive(Default)]
struct CountingNotifier(AtomicUsize);

impl CountingNotifier {
    fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl Notify for CountingNotifier {
    fn notify(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

fn event(kind: ChangeKind, paths: &[&str]) -> ChangeEvent {
    ChangeEvent::new(kind, paths.iter().map(PathBuf::from).collect())
}

fn raw_event(kind: notify::EventKind, paths: &[&str]) -> notify::Event {
    notify::Event {
        kind,
        paths: paths.iter().map(PathBuf::from).collect(),
        attrs: Default::default(),
    }
}

fn modify_kind() -> notify::EventKind {
    notify::EventKind::Modify(notify::event::ModifyKind::Data(
        notify::event::DataChange::Any,
    ))
}

fn access_kind() -> notify::EventKind {
    notify::EventKind::Access(notify::event::AccessKind::Read)
}

// ----------------------------------------------------------------------------
// Event mapping
// ----------------------------------------------------------------------------

#[test]
fn test_kind_mapping() {
    use notify::EventKind;
    use notify::event::{CreateKind, MetadataKind, ModifyKind, RemoveKind};

    assert_eq!(ChangeKind::from(EventKind::Create(CreateKind::File)), ChangeKind::Create);
    assert_eq!(ChangeKind::from(EventKind::Remove(RemoveKind::Any)), ChangeKind::Remove);
    assert_eq!(ChangeKind::from(modify_kind()), ChangeKind::Modify);
    assert_eq!(ChangeKind::from(access_kind()), ChangeKind::Access);
    assert_eq!(
        ChangeKind::from(EventKind::Modify(ModifyKind::Metadata(MetadataKind::AccessTime))),
        ChangeKind::Access
    );
    assert_eq!(
        ChangeKind::from(EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions))),
        ChangeKind::Modify
    );
    assert_eq!(ChangeKind::from(EventKind::Any), ChangeKind::Modify);
}

#[test]
fn test_change_event_from_notify() {
    let ev = ChangeEvent::from(raw_event(modify_kind(), &["/site/index.html"]));
    assert_eq!(ev.kind, ChangeKind::Modify);
    assert_eq!(ev.paths, vec![PathBuf::from("/site/index.html")]);
}

// ----------------------------------------------------------------------------
// Debouncer state machine
// ----------------------------------------------------------------------------

#[test]
fn test_debouncer_starts_idle() {
    let debouncer = Debouncer::new(WINDOW, true);
    assert!(!debouncer.is_pending());
    assert!(debouncer.sleep_duration(Instant::now()) >= Duration::from_secs(3600));
}

#[test]
fn test_access_is_noop() {
    let mut debouncer = Debouncer::new(WINDOW, true);
    let now = Instant::now();

    assert!(!debouncer.on_event(&event(ChangeKind::Access, &["/site/a.html"]), now));
    assert!(!debouncer.is_pending());
    assert_eq!(debouncer.fire_if_ready(now + WINDOW * 10), None);
}

#[test]
fn test_event_enters_pending() {
    let mut debouncer = Debouncer::new(WINDOW, true);
    let now = Instant::now();

    assert!(debouncer.on_event(&event(ChangeKind::Modify, &["/site/a.html"]), now));
    assert!(debouncer.is_pending());
    assert_eq!(debouncer.sleep_duration(now), WINDOW);
}

#[test]
fn test_not_fired_before_deadline() {
    let mut debouncer = Debouncer::new(WINDOW, true);
    let now = Instant::now();

    debouncer.on_event(&event(ChangeKind::Create, &["/site/a.html"]), now);
    assert_eq!(debouncer.fire_if_ready(now + WINDOW / 2), None);
    assert!(debouncer.is_pending());
}

#[test]
fn test_burst_fires_once() {
    let mut debouncer = Debouncer::new(WINDOW, true);
    let start = Instant::now();

    // 20 events, 10ms apart: each one restarts the window
    for i in 0..20u32 {
        let at = start + Duration::from_millis(10) * i;
        debouncer.on_event(&event(ChangeKind::Modify, &["/site/index.html"]), at);
        assert_eq!(debouncer.fire_if_ready(at), None);
    }

    let last = start + Duration::from_millis(190);
    assert_eq!(debouncer.fire_if_ready(last + WINDOW / 2), None);

    let fired = debouncer.fire_if_ready(last + WINDOW).expect("should fire");
    assert_eq!(fired.events, 20);
    assert_eq!(fired.paths, vec![PathBuf::from("/site/index.html")]);

    // Back to idle: nothing more to fire
    assert!(matches!(debouncer.state, DebounceState::Idle));
    assert_eq!(debouncer.fire_if_ready(last + WINDOW * 10), None);
}

#[test]
fn test_restart_moves_deadline() {
    let mut debouncer = Debouncer::new(WINDOW, true);
    let start = Instant::now();

    debouncer.on_event(&event(ChangeKind::Modify, &["/site/a.css"]), start);
    let later = start + Duration::from_millis(40);
    debouncer.on_event(&event(ChangeKind::Modify, &["/site/b.css"]), later);

    // Original deadline has passed, restarted one has not
    assert_eq!(debouncer.fire_if_ready(start + WINDOW), None);
    assert_eq!(debouncer.sleep_duration(start + WINDOW), Duration::from_millis(40));

    let fired = debouncer.fire_if_ready(later + WINDOW).expect("should fire");
    assert_eq!(
        fired,
        Coalesced {
            events: 2,
            paths: vec![PathBuf::from("/site/a.css"), PathBuf::from("/site/b.css")],
        }
    );
}

#[test]
fn test_temp_files_ignored() {
    let mut debouncer = Debouncer::new(WINDOW, true);
    let now = Instant::now();

    assert!(!debouncer.on_event(&event(ChangeKind::Modify, &["/site/.index.html.swp"]), now));
    assert!(!debouncer.on_event(&event(ChangeKind::Create, &["/site/index.html~"]), now));
    assert!(!debouncer.is_pending());

    // Mixed event: the real path still counts
    assert!(debouncer.on_event(
        &event(ChangeKind::Modify, &["/site/page.tmp", "/site/page.html"]),
        now
    ));
    let fired = debouncer.fire_if_ready(now + WINDOW).expect("should fire");
    assert_eq!(fired.paths, vec![PathBuf::from("/site/page.html")]);
}

#[test]
fn test_temp_files_kept_when_disabled() {
    let mut debouncer = Debouncer::new(WINDOW, false);
    assert!(debouncer.on_event(&event(ChangeKind::Modify, &["/site/a.swp"]), Instant::now()));
}

#[test]
fn test_pathless_event_counts() {
    let mut debouncer = Debouncer::new(WINDOW, true);
    assert!(debouncer.on_event(&event(ChangeKind::Modify, &[]), Instant::now()));
    assert!(debouncer.is_pending());
}

#[test]
fn test_is_temp_file() {
    assert!(is_temp_file(&PathBuf::from("/a/b.swp")));
    assert!(is_temp_file(&PathBuf::from("/a/b.bak")));
    assert!(is_temp_file(&PathBuf::from("/a/.hidden")));
    assert!(is_temp_file(&PathBuf::from("/a/b.html~")));
    assert!(!is_temp_file(&PathBuf::from("/a/index.html")));
    assert!(!is_temp_file(&PathBuf::from("/a/logo.png")));
}

// ----------------------------------------------------------------------------
// Driving loop (paused tokio clock)
// ----------------------------------------------------------------------------

struct Harness {
    tx: mpsc::Sender<notify::Result<notify::Event>>,
    notifier: Arc<CountingNotifier>,
    stop: oneshot::Sender<()>,
    handle: tokio::task::JoinHandle<Result<(), WatchError>>,
    _root: TempDir,
}

fn spawn_loop() -> Harness {
    let root = TempDir::new().unwrap();
    let (tx, rx) = mpsc::channel(64);
    let notifier = Arc::new(CountingNotifier::default());
    let (stop, stop_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(drive(
        rx,
        Debouncer::new(WINDOW, true),
        notifier.clone(),
        root.path().to_path_buf(),
        async move {
            let _ = stop_rx.await;
        },
    ));

    Harness {
        tx,
        notifier,
        stop,
        handle,
        _root: root,
    }
}

#[tokio::test(start_paused = true)]
async fn test_loop_burst_single_notification() {
    let h = spawn_loop();

    for _ in 0..5 {
        h.tx.send(Ok(raw_event(modify_kind(), &["/site/index.html"]))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(h.notifier.count(), 0);

    tokio::time::sleep(WINDOW * 4).await;
    assert_eq!(h.notifier.count(), 1);

    h.stop.send(()).unwrap();
    assert!(h.handle.await.unwrap().is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_loop_access_only_never_notifies() {
    let h = spawn_loop();

    for _ in 0..10 {
        h.tx.send(Ok(raw_event(access_kind(), &["/site/index.html"]))).await.unwrap();
    }
    tokio::time::sleep(WINDOW * 10).await;
    assert_eq!(h.notifier.count(), 0);

    h.stop.send(()).unwrap();
    assert!(h.handle.await.unwrap().is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_loop_separate_bursts() {
    let h = spawn_loop();

    h.tx.send(Ok(raw_event(modify_kind(), &["/site/a.html"]))).await.unwrap();
    tokio::time::sleep(WINDOW * 3).await;
    h.tx.send(Ok(raw_event(modify_kind(), &["/site/b.html"]))).await.unwrap();
    tokio::time::sleep(WINDOW * 3).await;

    assert_eq!(h.notifier.count(), 2);

    h.stop.send(()).unwrap();
    assert!(h.handle.await.unwrap().is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_loop_backend_error_is_fatal() {
    let h = spawn_loop();

    h.tx.send(Err(notify::Error::generic("inotify overflow"))).await.unwrap();
    let result = h.handle.await.unwrap();
    assert!(matches!(result, Err(WatchError::Backend(_))));
}

#[tokio::test(start_paused = true)]
async fn test_loop_root_removed_is_fatal() {
    let h = spawn_loop();
    let root = h._root.path().to_path_buf();
    std::fs::remove_dir_all(&root).unwrap();

    let removed = root.to_string_lossy().into_owned();
    h.tx.send(Ok(raw_event(
        notify::EventKind::Remove(notify::event::RemoveKind::Folder),
        &[removed.as_str()],
    )))
    .await
    .unwrap();

    let result = h.handle.await.unwrap();
    assert!(matches!(result, Err(WatchError::RootRemoved(_))));
}

#[tokio::test(start_paused = true)]
async fn test_loop_channel_closed() {
    let h = spawn_loop();
    drop(h.tx);
    let result = h.handle.await.unwrap();
    assert!(matches!(result, Err(WatchError::Disconnected)));
}

#[tokio::test(start_paused = true)]
async fn test_loop_root_renamed_is_fatal() {
    let h = spawn_loop();
    let root = h._root.path().to_path_buf();
    let moved = root.with_extension("moved");
    std::fs::rename(&root, &moved).unwrap();

    let from = root.to_string_lossy().into_owned();
    h.tx.send(Ok(raw_event(
        notify::EventKind::Modify(notify::event::ModifyKind::Name(
            notify::event::RenameMode::From,
        )),
        &[from.as_str()],
    )))
    .await
    .unwrap();

    let result = h.handle.await.unwrap();
    assert!(matches!(result, Err(WatchError::RootRemoved(_))));
    std::fs::remove_dir_all(&moved).unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_loop_access_does_not_check_root() {
    let h = spawn_loop();
    let root = h._root.path().to_path_buf();
    std::fs::remove_dir_all(&root).unwrap();

    // Access events are dropped before anything looks at the root
    h.tx.send(Ok(raw_event(access_kind(), &["/site/index.html"]))).await.unwrap();
    tokio::time::sleep(WINDOW * 2).await;
    assert!(!h.handle.is_finished());

    h.stop.send(()).unwrap();
    assert!(h.handle.await.unwrap().is_ok());
}

// ----------------------------------------------------------------------------
// Real watcher (notify backend, wall clock)
// ----------------------------------------------------------------------------

fn watched(dir: &TempDir) -> DevConfig {
    DevConfig {
        root: dir.path().canonicalize().unwrap(),
        ..Default::default()
    }
}

fn run_actor(
    actor: FsActor,
) -> (oneshot::Sender<()>, tokio::task::JoinHandle<Result<(), WatchError>>) {
    let (stop, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(actor.run(async move {
        let _ = stop_rx.await;
    }));
    (stop, handle)
}

/// Time for the backend to deliver events and the window to close
const SETTLE: Duration = Duration::from_millis(DEFAULT_DEBOUNCE_MS * 10);

#[tokio::test]
async fn test_watcher_single_write_notifies_once() {
    let dir = TempDir::new().unwrap();
    let index = dir.path().join("index.html");
    std::fs::write(&index, "<h1>v1</h1>").unwrap();

    let notifier = Arc::new(CountingNotifier::default());
    let actor = FsActor::new(&watched(&dir), notifier.clone()).unwrap();
    let (stop, handle) = run_actor(actor);

    tokio::time::sleep(SETTLE).await;
    assert_eq!(notifier.count(), 0);

    // Truncate, write and close-after-write all land in one window
    std::fs::write(&index, "<h1>v2</h1>").unwrap();
    tokio::time::sleep(SETTLE).await;
    assert_eq!(notifier.count(), 1);

    stop.send(()).unwrap();
    assert!(handle.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_watcher_read_does_not_notify() {
    let dir = TempDir::new().unwrap();
    let index = dir.path().join("index.html");
    std::fs::write(&index, "<h1>v1</h1>").unwrap();

    let notifier = Arc::new(CountingNotifier::default());
    let actor = FsActor::new(&watched(&dir), notifier.clone()).unwrap();
    let (stop, handle) = run_actor(actor);

    tokio::time::sleep(SETTLE).await;
    let _ = std::fs::read(&index).unwrap();
    tokio::time::sleep(SETTLE).await;
    assert_eq!(notifier.count(), 0);

    stop.send(()).unwrap();
    assert!(handle.await.unwrap().is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_watcher_write_reaches_every_client() {
    use std::net::Ipv4Addr;
    use tungstenite::Message;

    let dir = TempDir::new().unwrap();
    let index = dir.path().join("index.html");
    std::fs::write(&index, "<h1>v1</h1>").unwrap();

    let server = ReloadServer::bind(Ipv4Addr::LOCALHOST.into(), 0).unwrap();
    let port = server.port();
    let fanout = FanOut::new();
    server.spawn(fanout.clone(), Arc::from("refresh")).unwrap();

    let url = format!("ws://127.0.0.1:{port}");
    let (mut a, _) = tungstenite::connect(&url).unwrap();
    let (mut b, _) = tungstenite::connect(&url).unwrap();
    let deadline = Instant::now() + Duration::from_secs(5);
    while fanout.len() < 2 {
        assert!(Instant::now() < deadline, "clients never subscribed");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let actor = FsActor::new(&watched(&dir), Arc::new(fanout.clone())).unwrap();
    let (stop, handle) = run_actor(actor);
    tokio::time::sleep(SETTLE).await;

    std::fs::write(&index, "<h1>v2</h1>").unwrap();

    for client in [&a, &b] {
        if let tungstenite::stream::MaybeTlsStream::Plain(stream) = client.get_ref() {
            stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        }
    }

    let mut received = Vec::new();
    for client in [&mut a, &mut b] {
        let received_one = tokio::task::block_in_place(|| client.read().unwrap());
        received.push(received_one);
    }
    assert!(received.iter().all(|m| *m == Message::text("refresh")));

    // Exactly one: nothing else queued after the window closes
    tokio::time::sleep(SETTLE).await;
    for client in [&mut a, &mut b] {
        if let tungstenite::stream::MaybeTlsStream::Plain(stream) = client.get_ref() {
            stream.set_read_timeout(Some(Duration::from_millis(200))).unwrap();
        }
        assert!(tokio::task::block_in_place(|| client.read()).is_err());
    }

    stop.send(()).unwrap();
    assert!(handle.await.unwrap().is_ok());
}
