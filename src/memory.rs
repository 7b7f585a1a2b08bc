//! An in-memory page and a manual clock.
//!
//! Used by the tests and by the native simulator so that the controller can be driven without a
//! browser. Timers only fire when the clock is advanced.

use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
    time::Duration,
};

use anyhow::anyhow;

use crate::{
    keys::FocusedElement,
    notification::{NotificationView, Overlay, Scheduler},
    page::{Document, Video},
};

#[derive(Debug)]
struct VideoState {
    paused: Cell<bool>,
    rate: Cell<f64>,
    reject_play: Cell<bool>,
}

#[derive(Debug, Clone)]
pub struct MemoryVideo(Rc<VideoState>);

impl MemoryVideo {
    fn new(paused: bool) -> Self {
        Self(Rc::new(VideoState {
            paused: Cell::new(paused),
            rate: Cell::new(1.0),
            reject_play: Cell::new(false),
        }))
    }

    pub fn playing() -> Self {
        Self::new(false)
    }

    pub fn paused() -> Self {
        Self::new(true)
    }

    /// Makes subsequent `play` requests fail, like a browser refusing autoplay.
    pub fn reject_play(&self) {
        self.0.reject_play.set(true);
    }

    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Video for MemoryVideo {
    fn is_paused(&self) -> bool {
        self.0.paused.get()
    }

    fn play(&self) -> anyhow::Result<()> {
        if self.0.reject_play.get() {
            return Err(anyhow!("play() request was rejected"));
        }
        self.0.paused.set(false);
        Ok(())
    }

    fn pause(&self) -> anyhow::Result<()> {
        self.0.paused.set(true);
        Ok(())
    }

    fn playback_rate(&self) -> f64 {
        self.0.rate.get()
    }

    fn set_playback_rate(&self, rate: f64) {
        self.0.rate.set(rate);
    }
}

#[derive(Debug)]
struct ShadowRootState {
    videos: RefCell<Vec<MemoryVideo>>,
    denied: bool,
}

#[derive(Debug, Clone)]
pub struct MemoryShadowRoot(Rc<ShadowRootState>);

impl MemoryShadowRoot {
    pub fn push(&self, video: MemoryVideo) {
        self.0.videos.borrow_mut().push(video);
    }
}

#[derive(Debug)]
struct NodeState {
    key: u64,
    id: String,
    view: NotificationView,
    opacity: Cell<f32>,
}

#[derive(Debug, Clone)]
pub struct MemoryNode(Rc<NodeState>);

impl MemoryNode {
    pub fn id(&self) -> &str {
        &self.0.id
    }

    pub fn view(&self) -> &NotificationView {
        &self.0.view
    }

    pub fn opacity(&self) -> f32 {
        self.0.opacity.get()
    }
}

#[derive(Debug, Default)]
pub struct MemoryPage {
    videos: RefCell<Vec<MemoryVideo>>,
    shadow_roots: RefCell<Vec<MemoryShadowRoot>>,
    focused: RefCell<Option<FocusedElement>>,
    nodes: RefCell<Vec<MemoryNode>>,
    next_node_key: Cell<u64>,
}

impl MemoryPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_videos(videos: impl IntoIterator<Item = MemoryVideo>) -> Self {
        let page = Self::new();
        for video in videos {
            page.append_video(video);
        }
        page
    }

    pub fn append_video(&self, video: MemoryVideo) {
        self.videos.borrow_mut().push(video);
    }

    /// Attaches a shadow root to a new host element.
    pub fn attach_shadow_root(&self) -> MemoryShadowRoot {
        self.attach(false)
    }

    /// Attaches a shadow root whose contents cannot be queried.
    pub fn attach_denied_shadow_root(&self) -> MemoryShadowRoot {
        self.attach(true)
    }

    fn attach(&self, denied: bool) -> MemoryShadowRoot {
        let root = MemoryShadowRoot(Rc::new(ShadowRootState {
            videos: RefCell::new(vec![]),
            denied,
        }));
        self.shadow_roots.borrow_mut().push(root.clone());
        root
    }

    pub fn focus(&self, element: Option<FocusedElement>) {
        *self.focused.borrow_mut() = element;
    }

    pub fn notification_count(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn notification(&self) -> Option<MemoryNode> {
        self.nodes.borrow().first().cloned()
    }
}

impl Document for MemoryPage {
    type Video = MemoryVideo;
    type ShadowRoot = MemoryShadowRoot;

    fn videos(&self) -> anyhow::Result<Vec<MemoryVideo>> {
        Ok(self.videos.borrow().clone())
    }

    fn shadow_roots(&self) -> anyhow::Result<Vec<MemoryShadowRoot>> {
        Ok(self.shadow_roots.borrow().clone())
    }

    fn shadow_videos(&self, root: &MemoryShadowRoot) -> anyhow::Result<Vec<MemoryVideo>> {
        if root.0.denied {
            return Err(anyhow!("Access to shadow root denied"));
        }
        Ok(root.0.videos.borrow().clone())
    }

    fn focused_element(&self) -> Option<FocusedElement> {
        self.focused.borrow().clone()
    }
}

impl Overlay for MemoryPage {
    type Node = MemoryNode;

    fn remove_by_id(&self, id: &str) -> bool {
        let mut nodes = self.nodes.borrow_mut();
        let before = nodes.len();
        nodes.retain(|node| node.id() != id);
        nodes.len() != before
    }

    fn insert(&self, id: &str, view: &NotificationView) -> anyhow::Result<MemoryNode> {
        let key = self.next_node_key.get();
        self.next_node_key.set(key + 1);
        let node = MemoryNode(Rc::new(NodeState {
            key,
            id: id.to_string(),
            view: view.clone(),
            opacity: Cell::new(1.0),
        }));
        self.nodes.borrow_mut().push(node.clone());
        Ok(node)
    }

    fn set_opacity(&self, node: &MemoryNode, opacity: f32) {
        node.0.opacity.set(opacity);
    }

    fn detach(&self, node: &MemoryNode) {
        self.nodes
            .borrow_mut()
            .retain(|attached| attached.0.key != node.0.key);
    }
}

struct Timer {
    due: Duration,
    seq: u64,
    task: Box<dyn FnOnce()>,
}

/// Virtual time source; scheduled tasks run in due order during [`ManualClock::advance`].
#[derive(Default)]
pub struct ManualClock {
    now: Cell<Duration>,
    next_seq: Cell<u64>,
    timers: RefCell<Vec<Timer>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now.get()
    }

    pub fn pending(&self) -> usize {
        self.timers.borrow().len()
    }

    pub fn advance(&self, by: Duration) {
        let target = self.now.get() + by;
        while let Some(timer) = self.take_next_due(target) {
            self.now.set(timer.due);
            (timer.task)();
        }
        self.now.set(target);
    }

    fn take_next_due(&self, target: Duration) -> Option<Timer> {
        let mut timers = self.timers.borrow_mut();
        let index = timers
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due <= target)
            .min_by_key(|(_, timer)| (timer.due, timer.seq))
            .map(|(index, _)| index)?;
        Some(timers.remove(index))
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualClock")
            .field("now", &self.now.get())
            .field("pending", &self.pending())
            .finish()
    }
}

impl Scheduler for ManualClock {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        self.timers.borrow_mut().push(Timer {
            due: self.now.get() + delay,
            seq,
            task,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_run_timers_in_due_order() {
        // given
        let clock = Rc::new(ManualClock::new());
        let log = Rc::new(RefCell::new(vec![]));
        for (delay, name) in [(30, "c"), (10, "a"), (20, "b"), (10, "a2")] {
            let log = Rc::clone(&log);
            clock.schedule(
                Duration::from_millis(delay),
                Box::new(move || log.borrow_mut().push(name)),
            );
        }

        // when
        clock.advance(Duration::from_millis(25));

        // then
        assert_eq!(*log.borrow(), vec!["a", "a2", "b"]);
        assert_eq!(clock.pending(), 1);
        assert_eq!(clock.now(), Duration::from_millis(25));
    }

    #[test]
    fn should_run_timers_scheduled_by_timers() {
        // given
        let clock = Rc::new(ManualClock::new());
        let fired = Rc::new(Cell::new(false));
        {
            let inner_clock = Rc::clone(&clock);
            let fired = Rc::clone(&fired);
            clock.schedule(
                Duration::from_millis(10),
                Box::new(move || {
                    inner_clock.schedule(
                        Duration::from_millis(10),
                        Box::new(move || fired.set(true)),
                    );
                }),
            );
        }

        // when
        clock.advance(Duration::from_millis(20));

        // then
        assert!(fired.get());
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn should_refuse_denied_shadow_root() {
        // given
        let page = MemoryPage::new();
        let root = page.attach_denied_shadow_root();
        root.push(MemoryVideo::playing());

        // then
        assert!(page.shadow_videos(&root).is_err());
    }
}
