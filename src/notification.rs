use std::{cell::Cell, rc::Rc, time::Duration};

use serde::Serialize;

use crate::{
    config::NotificationConfig,
    playback::{PauseReport, SpeedMode, SpeedReport},
};

const FAST_ACCENT: &str = "#ff6b35";
const NORMAL_ACCENT: &str = "#4CAF50";
const PAUSED_ACCENT: &str = "#9c27b0";

const BASE_STYLE: &[(&str, &str)] = &[
    ("position", "fixed"),
    ("top", "20px"),
    ("right", "20px"),
    ("color", "white"),
    ("padding", "12px 20px"),
    ("border-radius", "8px"),
    ("z-index", "2147483647"),
    ("font-family", "Arial, sans-serif"),
    ("font-size", "14px"),
    ("box-shadow", "0 4px 12px rgba(0,0,0,0.3)"),
    ("transition", "opacity 0.3s ease"),
    ("opacity", "1"),
];

/// Where notification nodes get rendered.
pub trait Overlay {
    type Node;

    /// Removes every element carrying `id`. Returns whether anything was removed.
    fn remove_by_id(&self, id: &str) -> bool;

    fn insert(&self, id: &str, view: &NotificationView) -> anyhow::Result<Self::Node>;

    fn set_opacity(&self, node: &Self::Node, opacity: f32);

    /// Removing a node that is already detached must be a no-op.
    fn detach(&self, node: &Self::Node);
}

/// Runs callbacks after a delay on the same thread. Scheduled tasks cannot be cancelled.
pub trait Scheduler {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationView {
    pub icon: &'static str,
    pub headline: String,
    pub detail: String,
    pub accent: &'static str,
}

impl NotificationView {
    pub fn speed(report: &SpeedReport) -> Self {
        let fast = report.mode == SpeedMode::Fast;
        Self {
            icon: if fast { "⏩" } else { "▶️" },
            headline: format!("{}x Speed", report.rate),
            detail: video_count(report.count),
            accent: if fast { FAST_ACCENT } else { NORMAL_ACCENT },
        }
    }

    pub fn pause(report: &PauseReport) -> Self {
        let paused = report.state.is_paused();
        Self {
            icon: if paused { "⏸️" } else { "▶️" },
            headline: report.state.to_string(),
            detail: video_count(report.count()),
            accent: if paused { PAUSED_ACCENT } else { NORMAL_ACCENT },
        }
    }

    pub fn to_html(&self) -> String {
        format!(
            concat!(
                r#"<div style="display: flex; align-items: center; gap: 8px;">"#,
                r#"<span style="font-size: 24px;">{}</span>"#,
                r#"<div><div style="font-weight: bold;">{}</div>"#,
                r#"<div style="font-size: 12px; opacity: 0.8;">{}</div></div>"#,
                "</div>"
            ),
            self.icon, self.headline, self.detail
        )
    }

    /// Inline CSS properties for the outer element.
    pub fn style(&self) -> Vec<(&'static str, &'static str)> {
        let mut style = BASE_STYLE.to_vec();
        style.push(("background-color", self.accent));
        style
    }
}

fn video_count(count: usize) -> String {
    format!("{count} video(s)")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPhase {
    Visible,
    FadingOut,
    Removed,
}

struct Notification<N> {
    node: N,
    phase: Cell<NotificationPhase>,
}

impl<N> Notification<N> {
    fn new(node: N) -> Self {
        Self {
            node,
            phase: Cell::new(NotificationPhase::Visible),
        }
    }

    fn begin_fade<O: Overlay<Node = N>>(&self, overlay: &O) -> bool {
        if self.phase.get() != NotificationPhase::Visible {
            return false;
        }
        self.phase.set(NotificationPhase::FadingOut);
        overlay.set_opacity(&self.node, 0.0);
        true
    }

    fn finish<O: Overlay<Node = N>>(&self, overlay: &O) {
        if self.phase.get() != NotificationPhase::FadingOut {
            return;
        }
        self.phase.set(NotificationPhase::Removed);
        overlay.detach(&self.node);
    }

    fn supersede<O: Overlay<Node = N>>(&self, overlay: &O) {
        if self.phase.replace(NotificationPhase::Removed) != NotificationPhase::Removed {
            overlay.detach(&self.node);
        }
    }
}

/// Shows one notification at a time and retires it through
/// `Visible -> FadingOut -> Removed`.
pub struct Presenter<O: Overlay, S> {
    config: NotificationConfig,
    overlay: Rc<O>,
    scheduler: Rc<S>,
    current: Option<Rc<Notification<O::Node>>>,
}

impl<O, S> Presenter<O, S>
where
    O: Overlay + 'static,
    S: Scheduler + 'static,
{
    pub fn new(config: NotificationConfig, overlay: Rc<O>, scheduler: Rc<S>) -> Self {
        Self {
            config,
            overlay,
            scheduler,
            current: None,
        }
    }

    pub fn show_speed(&mut self, report: &SpeedReport) -> anyhow::Result<()> {
        self.show(NotificationView::speed(report))
    }

    pub fn show_pause(&mut self, report: &PauseReport) -> anyhow::Result<()> {
        self.show(NotificationView::pause(report))
    }

    /// Phase of the most recently shown notification.
    pub fn current_phase(&self) -> Option<NotificationPhase> {
        self.current.as_ref().map(|current| current.phase.get())
    }

    pub fn show(&mut self, view: NotificationView) -> anyhow::Result<()> {
        self.dismiss();

        let node = self.overlay.insert(&self.config.element_id, &view)?;
        let notification = Rc::new(Notification::new(node));
        self.current = Some(Rc::clone(&notification));

        let overlay = Rc::clone(&self.overlay);
        let scheduler = Rc::clone(&self.scheduler);
        let fade_for = self.config.fade_for();
        self.scheduler.schedule(
            self.config.visible_for(),
            Box::new(move || {
                if !notification.begin_fade(overlay.as_ref()) {
                    return;
                }
                scheduler.schedule(
                    fade_for,
                    Box::new(move || notification.finish(overlay.as_ref())),
                );
            }),
        );
        Ok(())
    }

    /// Removes the current notification, and anything else using the notification id, right away.
    pub fn dismiss(&mut self) {
        if let Some(previous) = self.current.take() {
            previous.supersede(self.overlay.as_ref());
        }
        if self.overlay.remove_by_id(&self.config.element_id) {
            log::debug!("Removed stray notification element");
        }
    }
}
