//! Browser bindings: the real DOM behind [`Document`] and [`Overlay`], `setTimeout` behind
//! [`Scheduler`], the three event listeners, and a console logger.

use std::{cell::RefCell, rc::Rc, time::Duration};

use anyhow::{anyhow, Context};
use log::{Level, LevelFilter, Log, Metadata, Record};
use wasm_bindgen::{prelude::*, JsCast};
use web_sys::{
    console, Element, HtmlElement, HtmlVideoElement, KeyboardEvent, MutationObserver,
    MutationObserverInit, MutationRecord, NodeList, ShadowRoot,
};

use crate::{
    config::Config,
    controller::PlaybackController,
    keys::{FocusedElement, KeyPress},
    notification::{NotificationView, Overlay, Scheduler},
    page::{Document, Video},
};

const LOG_PREFIX: &str = "[2x Toggle]";

type WebController = PlaybackController<WebPage, TimeoutScheduler>;

fn js_error(err: JsValue) -> anyhow::Error {
    anyhow!("{err:?}")
}

fn collect<T: JsCast>(list: &NodeList) -> Vec<T> {
    (0..list.length())
        .filter_map(|index| list.get(index))
        .filter_map(|node| node.dyn_into::<T>().ok())
        .collect()
}

struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = JsValue::from_str(&format!("{LOG_PREFIX} {}", record.args()));
        match record.level() {
            Level::Error => console::error_1(&line),
            Level::Warn => console::warn_1(&line),
            Level::Info => console::log_1(&line),
            Level::Debug | Level::Trace => console::debug_1(&line),
        }
    }

    fn flush(&self) {}
}

fn init_logging() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }
}

#[derive(Debug, Clone)]
pub struct WebVideo(HtmlVideoElement);

impl Video for WebVideo {
    fn is_paused(&self) -> bool {
        self.0.paused()
    }

    fn play(&self) -> anyhow::Result<()> {
        // The returned promise only reports autoplay refusals, which need no handling.
        self.0.play().map_err(js_error)?;
        Ok(())
    }

    fn pause(&self) -> anyhow::Result<()> {
        self.0.pause().map_err(js_error)
    }

    fn playback_rate(&self) -> f64 {
        self.0.playback_rate()
    }

    fn set_playback_rate(&self, rate: f64) {
        self.0.set_playback_rate(rate);
    }
}

#[derive(Debug, Clone)]
pub struct WebPage {
    document: web_sys::Document,
}

impl WebPage {
    pub fn current() -> anyhow::Result<Self> {
        let document = web_sys::window()
            .context("No window available")?
            .document()
            .context("Window has no document")?;
        Ok(Self { document })
    }
}

impl Document for WebPage {
    type Video = WebVideo;
    type ShadowRoot = ShadowRoot;

    fn videos(&self) -> anyhow::Result<Vec<WebVideo>> {
        let list = self
            .document
            .query_selector_all("video")
            .map_err(js_error)?;
        Ok(collect::<HtmlVideoElement>(&list)
            .into_iter()
            .map(WebVideo)
            .collect())
    }

    fn shadow_roots(&self) -> anyhow::Result<Vec<ShadowRoot>> {
        let list = self.document.query_selector_all("*").map_err(js_error)?;
        Ok(collect::<Element>(&list)
            .iter()
            .filter_map(Element::shadow_root)
            .collect())
    }

    fn shadow_videos(&self, root: &ShadowRoot) -> anyhow::Result<Vec<WebVideo>> {
        let list = root.query_selector_all("video").map_err(js_error)?;
        Ok(collect::<HtmlVideoElement>(&list)
            .into_iter()
            .map(WebVideo)
            .collect())
    }

    fn focused_element(&self) -> Option<FocusedElement> {
        let element = self.document.active_element()?;
        Some(FocusedElement {
            tag_name: element.tag_name(),
            content_editable: element
                .dyn_ref::<HtmlElement>()
                .is_some_and(HtmlElement::is_content_editable),
            contenteditable_attr: element.get_attribute("contenteditable"),
        })
    }
}

impl Overlay for WebPage {
    type Node = HtmlElement;

    fn remove_by_id(&self, id: &str) -> bool {
        let mut removed = false;
        while let Some(existing) = self.document.get_element_by_id(id) {
            existing.remove();
            removed = true;
        }
        removed
    }

    fn insert(&self, id: &str, view: &NotificationView) -> anyhow::Result<HtmlElement> {
        let element = self
            .document
            .create_element("div")
            .map_err(js_error)?
            .dyn_into::<HtmlElement>()
            .map_err(|_| anyhow!("Created element is not an HTML element"))?;
        element.set_id(id);
        element.set_inner_html(&view.to_html());

        let style = element.style();
        for (property, value) in view.style() {
            style
                .set_property(property, value)
                .map_err(js_error)
                .with_context(|| format!("Failed to set style property {property}"))?;
        }

        let body = self.document.body().context("Document has no body")?;
        body.append_child(&element).map_err(js_error)?;
        Ok(element)
    }

    fn set_opacity(&self, node: &HtmlElement, opacity: f32) {
        if let Err(err) = node.style().set_property("opacity", &opacity.to_string()) {
            log::debug!("Failed to fade notification: {err:?}");
        }
    }

    fn detach(&self, node: &HtmlElement) {
        node.remove();
    }
}

#[derive(Debug, Clone)]
pub struct TimeoutScheduler {
    window: web_sys::Window,
}

impl TimeoutScheduler {
    pub fn current() -> anyhow::Result<Self> {
        let window = web_sys::window().context("No window available")?;
        Ok(Self { window })
    }
}

impl Scheduler for TimeoutScheduler {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) {
        let callback = Closure::once_into_js(move || task());
        let timeout = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
        if let Err(err) = self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                callback.unchecked_ref(),
                timeout,
            )
        {
            log::warn!("Failed to schedule timer: {err:?}");
        }
    }
}

fn listen_for_keys(
    document: &web_sys::Document,
    controller: &Rc<RefCell<WebController>>,
) -> anyhow::Result<()> {
    let controller = Rc::clone(controller);
    let on_key_down = Closure::<dyn FnMut(KeyboardEvent)>::new(move |event: KeyboardEvent| {
        let press = KeyPress {
            key: event.key(),
            ctrl: event.ctrl_key(),
            alt: event.alt_key(),
            meta: event.meta_key(),
        };
        let Ok(mut controller) = controller.try_borrow_mut() else {
            log::debug!("Controller busy; dropping key event");
            return;
        };
        if controller.on_key_down(&press).suppress {
            event.prevent_default();
            event.stop_propagation();
        }
    });
    document
        .add_event_listener_with_callback_and_bool(
            "keydown",
            on_key_down.as_ref().unchecked_ref(),
            true,
        )
        .map_err(js_error)
        .context("Failed to register keydown listener")?;
    on_key_down.forget();
    Ok(())
}

fn listen_for_play(
    document: &web_sys::Document,
    controller: &Rc<RefCell<WebController>>,
) -> anyhow::Result<()> {
    let controller = Rc::clone(controller);
    let on_play = Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
        let Some(video) = event
            .target()
            .and_then(|target| target.dyn_into::<HtmlVideoElement>().ok())
        else {
            return;
        };
        let Ok(controller) = controller.try_borrow() else {
            log::debug!("Controller busy; dropping play event");
            return;
        };
        controller.on_play(&WebVideo(video));
    });
    document
        .add_event_listener_with_callback_and_bool("play", on_play.as_ref().unchecked_ref(), true)
        .map_err(js_error)
        .context("Failed to register play listener")?;
    on_play.forget();
    Ok(())
}

fn observe_mutations(
    document: &web_sys::Document,
    controller: &Rc<RefCell<WebController>>,
) -> anyhow::Result<()> {
    let controller = Rc::clone(controller);
    let on_mutations = Closure::<dyn FnMut(js_sys::Array, MutationObserver)>::new(
        move |records: js_sys::Array, _observer: MutationObserver| {
            let added_nodes = records.iter().any(|record| {
                record
                    .dyn_into::<MutationRecord>()
                    .is_ok_and(|record| record.added_nodes().length() > 0)
            });
            if !added_nodes {
                return;
            }
            let Ok(controller) = controller.try_borrow() else {
                log::debug!("Controller busy; dropping mutation batch");
                return;
            };
            controller.on_mutations();
        },
    );

    let observer =
        MutationObserver::new(on_mutations.as_ref().unchecked_ref()).map_err(js_error)?;
    let options = MutationObserverInit::new();
    options.set_child_list(true);
    options.set_subtree(true);
    let body = document.body().context("Document has no body to observe")?;
    observer
        .observe_with_options(&body, &options)
        .map_err(js_error)
        .context("Failed to observe document body")?;
    on_mutations.forget();
    Ok(())
}

fn install(config: Config) -> anyhow::Result<()> {
    let page = Rc::new(WebPage::current()?);
    let scheduler = Rc::new(TimeoutScheduler::current()?);
    let document = page.document.clone();

    let toggle_key = config.keys.toggle.to_uppercase();
    let pause_key = config.keys.pause.to_uppercase();
    let controller = Rc::new(RefCell::new(PlaybackController::new(
        config, page, scheduler,
    )));

    listen_for_keys(&document, &controller)?;
    listen_for_play(&document, &controller)?;
    observe_mutations(&document, &controller)?;

    log::info!(
        "Extension loaded. Press \"{toggle_key}\" to toggle video speed, \"{pause_key}\" to pause/play."
    );
    Ok(())
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    init_logging();
    install(Config::default()).map_err(|err| {
        log::error!("{err:?}");
        JsValue::from_str(&format!("{err:#}"))
    })
}
