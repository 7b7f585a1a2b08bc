use std::rc::Rc;

use serde::Serialize;

use crate::{
    config::Config,
    keys::{KeyPress, Shortcut},
    notification::{Overlay, Presenter, Scheduler},
    page::{Document, Video},
    playback::{PauseReport, PauseTally, SpeedMode, SpeedReport},
};

/// What a key-down did. When `suppress` is set the caller must prevent the default action and
/// stop propagation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeyOutcome {
    pub suppress: bool,
    pub speed: Option<SpeedReport>,
    pub pause: Option<PauseReport>,
}

/// Owns the speed mode for a page and applies it to every video the page exposes.
pub struct PlaybackController<P, S>
where
    P: Document + Overlay,
{
    config: Config,
    mode: SpeedMode,
    page: Rc<P>,
    presenter: Presenter<P, S>,
}

impl<P, S> PlaybackController<P, S>
where
    P: Document + Overlay + 'static,
    S: Scheduler + 'static,
{
    pub fn new(config: Config, page: Rc<P>, scheduler: Rc<S>) -> Self {
        let presenter = Presenter::new(config.notification.clone(), Rc::clone(&page), scheduler);
        Self {
            config,
            mode: SpeedMode::default(),
            page,
            presenter,
        }
    }

    pub fn mode(&self) -> SpeedMode {
        self.mode
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn presenter(&self) -> &Presenter<P, S> {
        &self.presenter
    }

    /// Document-tree videos first, then the contents of each shadow root in document order.
    pub fn discover_videos(&self) -> Vec<P::Video> {
        let mut videos = self.page.videos().unwrap_or_else(|err| {
            log::warn!("Failed to query videos: {err:?}");
            vec![]
        });

        let roots = self.page.shadow_roots().unwrap_or_else(|err| {
            log::warn!("Failed to enumerate shadow roots: {err:?}");
            vec![]
        });
        for root in &roots {
            match self.page.shadow_videos(root) {
                Ok(found) => videos.extend(found),
                Err(err) => log::debug!("Skipping shadow root: {err:?}"),
            }
        }

        videos
    }

    pub fn apply_rate(&self, rate: f64) -> usize {
        let videos = self.discover_videos();
        for video in &videos {
            video.set_playback_rate(rate);
        }
        videos.len()
    }

    pub fn toggle_speed(&mut self) -> SpeedReport {
        self.mode = self.mode.toggled();
        let rate = self.mode.rate(&self.config.speed);
        let count = self.apply_rate(rate);
        let report = SpeedReport {
            mode: self.mode,
            rate,
            count,
        };

        if let Err(err) = self.presenter.show_speed(&report) {
            log::warn!("Failed to show speed notification: {err:?}");
        }
        log::info!("Speed set to {rate}x ({count} video(s) affected)");
        report
    }

    /// Flips every video based on its own state; the reported label is only a summary.
    pub fn toggle_pause(&mut self) -> PauseReport {
        let mut tally = PauseTally::default();
        for video in self.discover_videos() {
            if video.is_paused() {
                if let Err(err) = video.play() {
                    log::warn!("Failed to resume video: {err:?}");
                }
                tally.played += 1;
            } else {
                if let Err(err) = video.pause() {
                    log::warn!("Failed to pause video: {err:?}");
                }
                tally.paused += 1;
            }
        }

        let report = PauseReport {
            state: tally.classify(),
            tally,
        };
        if let Err(err) = self.presenter.show_pause(&report) {
            log::warn!("Failed to show pause notification: {err:?}");
        }
        log::info!(
            "{} ({} video(s) affected)",
            report.state,
            report.count()
        );
        report
    }

    pub fn on_key_down(&mut self, press: &KeyPress) -> KeyOutcome {
        let mut outcome = KeyOutcome::default();
        if let Some(focused) = self.page.focused_element() {
            if focused.accepts_text() {
                return outcome;
            }
        }

        for shortcut in Shortcut::matching(press, &self.config.keys) {
            outcome.suppress = true;
            match shortcut {
                Shortcut::ToggleSpeed => outcome.speed = Some(self.toggle_speed()),
                Shortcut::TogglePause => outcome.pause = Some(self.toggle_pause()),
            }
        }
        outcome
    }

    /// Re-applies the fast rate to every video after nodes were added to the document. Returns
    /// the number of videos corrected, or `None` in normal mode.
    pub fn on_mutations(&self) -> Option<usize> {
        if !self.mode.is_fast() {
            return None;
        }
        let count = self.apply_rate(self.config.speed.fast);
        log::trace!("Re-applied fast rate to {count} video(s) after DOM change");
        Some(count)
    }

    /// Forces a video that just started playing to the fast rate. Returns whether it was changed.
    pub fn on_play(&self, video: &P::Video) -> bool {
        if !self.mode.is_fast() {
            return false;
        }
        video.set_playback_rate(self.config.speed.fast);
        true
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::{
        keys::FocusedElement,
        memory::{ManualClock, MemoryPage, MemoryVideo},
        notification::NotificationPhase,
        playback::PauseState,
    };

    use super::*;

    type TestController = PlaybackController<MemoryPage, ManualClock>;

    fn controller(page: MemoryPage) -> (Rc<MemoryPage>, Rc<ManualClock>, TestController) {
        let page = Rc::new(page);
        let clock = Rc::new(ManualClock::new());
        let controller =
            PlaybackController::new(Config::default(), Rc::clone(&page), Rc::clone(&clock));
        (page, clock, controller)
    }

    fn playing(count: usize) -> Vec<MemoryVideo> {
        (0..count).map(|_| MemoryVideo::playing()).collect()
    }

    #[test]
    fn should_discover_plain_videos() {
        // given
        let (_page, _clock, controller) = controller(MemoryPage::with_videos(playing(4)));

        // when
        let videos = controller.discover_videos();

        // then
        assert_eq!(videos.len(), 4);
    }

    #[test]
    fn should_discover_shadow_videos_after_document_videos() {
        // given
        let top = MemoryVideo::playing();
        let nested = MemoryVideo::playing();
        let page = MemoryPage::with_videos([top.clone()]);
        page.attach_shadow_root();
        page.attach_shadow_root().push(nested.clone());

        let (_page, _clock, controller) = controller(page);

        // when
        let videos = controller.discover_videos();

        // then
        assert_eq!(videos.len(), 2);
        assert!(videos[0].same_as(&top));
        assert!(videos[1].same_as(&nested));
    }

    #[test]
    fn should_skip_denied_shadow_roots() {
        // given
        let page = MemoryPage::with_videos(playing(1));
        page.attach_denied_shadow_root().push(MemoryVideo::playing());
        page.attach_shadow_root().push(MemoryVideo::playing());

        let (_page, _clock, controller) = controller(page);

        // when
        let videos = controller.discover_videos();

        // then
        assert_eq!(videos.len(), 2);
    }

    #[test]
    fn should_apply_rate_idempotently() {
        // given
        let videos = playing(3);
        let (_page, _clock, controller) = controller(MemoryPage::with_videos(videos.clone()));

        // when
        let first = controller.apply_rate(1.75);
        let second = controller.apply_rate(1.75);

        // then
        assert_eq!(first, 3);
        assert_eq!(second, 3);
        assert!(videos.iter().all(|video| video.playback_rate() == 1.75));
    }

    #[test]
    fn should_apply_rate_to_empty_page() {
        // given
        let (page, _clock, mut controller) = controller(MemoryPage::new());

        // when
        let count = controller.apply_rate(2.0);
        let report = controller.toggle_speed();

        // then
        assert_eq!(count, 0);
        assert_eq!(report.count, 0);
        assert_eq!(page.notification().unwrap().view().detail, "0 video(s)");
    }

    #[test]
    fn should_alternate_rates_on_toggle() {
        // given
        let videos = playing(2);
        let (_page, _clock, mut controller) = controller(MemoryPage::with_videos(videos.clone()));

        for round in 1..=5 {
            // when
            let report = controller.toggle_speed();

            // then
            let expected = if round % 2 == 1 { 2.0 } else { 1.0 };
            assert_eq!(report.rate, expected);
            assert_eq!(report.count, 2);
            assert_eq!(controller.mode().is_fast(), round % 2 == 1);
            assert!(videos.iter().all(|video| video.playback_rate() == expected));
        }
    }

    #[test]
    fn should_show_speed_notification() {
        // given
        let (page, _clock, mut controller) = controller(MemoryPage::with_videos(playing(3)));

        // when
        controller.toggle_speed();

        // then
        let node = page.notification().unwrap();
        assert_eq!(node.id(), "speed-toggle-notification");
        assert_eq!(node.view().headline, "2x Speed");
        assert_eq!(node.view().detail, "3 video(s)");
    }

    #[test]
    fn should_flip_each_video_and_classify_majority() {
        // given
        let videos = vec![
            MemoryVideo::playing(),
            MemoryVideo::paused(),
            MemoryVideo::playing(),
        ];
        let (page, _clock, mut controller) = controller(MemoryPage::with_videos(videos.clone()));

        // when
        let report = controller.toggle_pause();

        // then
        assert!(videos[0].is_paused());
        assert!(!videos[1].is_paused());
        assert!(videos[2].is_paused());
        assert_eq!(report.state, PauseState::Paused);
        assert_eq!(report.tally, PauseTally { paused: 2, played: 1 });
        assert_eq!(page.notification().unwrap().view().headline, "Paused");
    }

    #[test]
    fn should_report_playing_on_tie() {
        // given
        let (_page, _clock, mut controller) = controller(MemoryPage::with_videos([
            MemoryVideo::playing(),
            MemoryVideo::paused(),
        ]));

        // when
        let report = controller.toggle_pause();

        // then
        assert_eq!(report.state, PauseState::Playing);
        assert_eq!(report.count(), 2);
    }

    #[test]
    fn should_continue_when_play_is_rejected() {
        // given
        let stubborn = MemoryVideo::paused();
        stubborn.reject_play();
        let other = MemoryVideo::paused();
        let (_page, _clock, mut controller) =
            controller(MemoryPage::with_videos([stubborn.clone(), other.clone()]));

        // when
        let report = controller.toggle_pause();

        // then
        assert!(stubborn.is_paused());
        assert!(!other.is_paused());
        assert_eq!(report.tally, PauseTally { paused: 0, played: 2 });
    }

    #[test]
    fn should_toggle_speed_on_shortcut() {
        // given
        let videos = playing(1);
        let (_page, _clock, mut controller) = controller(MemoryPage::with_videos(videos.clone()));

        // when
        let outcome = controller.on_key_down(&KeyPress::plain("X"));

        // then
        assert!(outcome.suppress);
        assert_eq!(outcome.speed.map(|report| report.rate), Some(2.0));
        assert!(outcome.pause.is_none());
        assert_eq!(videos[0].playback_rate(), 2.0);
    }

    #[test]
    fn should_toggle_pause_on_shortcut() {
        // given
        let videos = playing(1);
        let (_page, _clock, mut controller) = controller(MemoryPage::with_videos(videos.clone()));

        // when
        let outcome = controller.on_key_down(&KeyPress::plain("z"));

        // then
        assert!(outcome.suppress);
        assert!(outcome.speed.is_none());
        assert!(videos[0].is_paused());
    }

    #[test]
    fn should_ignore_shortcuts_while_typing() {
        // given
        let videos = playing(1);
        let (page, _clock, mut controller) = controller(MemoryPage::with_videos(videos.clone()));
        page.focus(Some(FocusedElement::tag("INPUT")));

        // when
        let outcome = controller.on_key_down(&KeyPress::plain("x"));

        // then
        assert_eq!(outcome, KeyOutcome::default());
        assert_eq!(controller.mode(), SpeedMode::Normal);
        assert_eq!(videos[0].playback_rate(), 1.0);
        assert_eq!(page.notification_count(), 0);
    }

    #[test]
    fn should_ignore_shortcuts_with_modifiers() {
        // given
        let (page, _clock, mut controller) = controller(MemoryPage::with_videos(playing(1)));
        page.focus(Some(FocusedElement::tag("BODY")));

        // when
        let outcome = controller.on_key_down(&KeyPress {
            ctrl: true,
            ..KeyPress::plain("x")
        });

        // then
        assert!(!outcome.suppress);
        assert_eq!(controller.mode(), SpeedMode::Normal);
    }

    #[test]
    fn should_converge_inserted_videos_in_fast_mode() {
        // given
        let (page, _clock, mut controller) = controller(MemoryPage::with_videos(playing(1)));
        controller.toggle_speed();
        let late = MemoryVideo::playing();
        let nested = MemoryVideo::playing();

        // when
        page.append_video(late.clone());
        page.attach_shadow_root().push(nested.clone());
        let corrected = controller.on_mutations();

        // then
        assert_eq!(corrected, Some(3));
        assert_eq!(late.playback_rate(), 2.0);
        assert_eq!(nested.playback_rate(), 2.0);
    }

    #[test]
    fn should_leave_inserted_videos_alone_in_normal_mode() {
        // given
        let (page, _clock, controller) = controller(MemoryPage::new());
        let late = MemoryVideo::playing();
        late.set_playback_rate(1.25);

        // when
        page.append_video(late.clone());
        let corrected = controller.on_mutations();

        // then
        assert_eq!(corrected, None);
        assert_eq!(late.playback_rate(), 1.25);
    }

    #[test]
    fn should_force_fast_rate_on_play() {
        // given
        let (_page, _clock, mut controller) = controller(MemoryPage::new());
        let stray = MemoryVideo::playing();

        // then
        assert!(!controller.on_play(&stray));
        assert_eq!(stray.playback_rate(), 1.0);

        controller.toggle_speed();
        assert!(controller.on_play(&stray));
        assert_eq!(stray.playback_rate(), 2.0);
    }

    #[test]
    fn should_keep_one_notification_across_toggles() {
        // given
        let (page, clock, mut controller) = controller(MemoryPage::with_videos(playing(2)));

        // when
        controller.toggle_speed();
        clock.advance(Duration::from_millis(700));
        controller.toggle_pause();

        // then
        assert_eq!(page.notification_count(), 1);
        assert_eq!(page.notification().unwrap().view().headline, "Paused");
        assert_eq!(
            controller.presenter().current_phase(),
            Some(NotificationPhase::Visible)
        );

        clock.advance(Duration::from_millis(1800));
        assert_eq!(page.notification_count(), 0);
    }
}
