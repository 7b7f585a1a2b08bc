use std::{path::PathBuf, rc::Rc};

use clap::Parser;
use log::LevelFilter;
use serde::Serialize;

use crate::{
    config::Config,
    controller::{KeyOutcome, PlaybackController},
    keys::{FocusedElement, KeyPress},
    memory::{ManualClock, MemoryPage, MemoryVideo},
    page::Video,
    playback::SpeedMode,
};

#[derive(Debug, Parser)]
#[command(version, about = "Replays shortcut presses against a simulated page")]
pub struct Cli {
    #[arg(
        short,
        long,
        help = "The path to the config file. The default is `speed-toggle.toml` if it exists."
    )]
    pub config: Option<PathBuf>,

    #[arg(long, default_value_t = 1, help = "Videos in the document tree")]
    pub videos: usize,

    #[arg(long, default_value_t = 0, help = "How many of the document videos start paused")]
    pub paused: usize,

    #[arg(long, default_value_t = 0, help = "Videos inside an open shadow root")]
    pub shadow_videos: usize,

    #[arg(
        long,
        default_value_t = 0,
        help = "Videos inside a shadow root that refuses queries"
    )]
    pub denied_shadow_videos: usize,

    #[arg(
        long,
        default_value_t = 0,
        help = "Videos injected after the key presses, followed by a mutation batch"
    )]
    pub inject: usize,

    #[arg(short, long, default_value = "x", help = "Keys to press, one per character")]
    pub keys: String,

    #[arg(long, help = "Press the keys while a text input has focus")]
    pub typing: bool,

    #[arg(long, help = "Print the summary as JSON")]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct VideoSummary {
    rate: f64,
    paused: bool,
}

#[derive(Debug, Serialize)]
struct Summary {
    mode: SpeedMode,
    outcomes: Vec<KeyOutcome>,
    videos: Vec<VideoSummary>,
    notifications_left: usize,
}

fn build_page(cli: &Cli) -> MemoryPage {
    let page = MemoryPage::new();
    for index in 0..cli.videos {
        page.append_video(if index < cli.paused {
            MemoryVideo::paused()
        } else {
            MemoryVideo::playing()
        });
    }
    if cli.shadow_videos > 0 {
        let root = page.attach_shadow_root();
        for _ in 0..cli.shadow_videos {
            root.push(MemoryVideo::playing());
        }
    }
    if cli.denied_shadow_videos > 0 {
        let root = page.attach_denied_shadow_root();
        for _ in 0..cli.denied_shadow_videos {
            root.push(MemoryVideo::playing());
        }
    }
    if cli.typing {
        page.focus(Some(FocusedElement::tag("INPUT")));
    }
    page
}

fn print_summary(summary: &Summary, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }
    println!("mode: {:?}", summary.mode);
    for (index, video) in summary.videos.iter().enumerate() {
        let state = if video.paused { "paused" } else { "playing" };
        println!("video {index}: {}x, {state}", video.rate);
    }
    println!("notifications left: {}", summary.notifications_left);
    Ok(())
}

pub fn start() -> anyhow::Result<()> {
    pretty_env_logger::formatted_builder()
        .filter_level(LevelFilter::Info)
        .parse_env("SPEED_TOGGLE_LOG")
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let lifetime = config.notification.lifetime();

    let page = Rc::new(build_page(&cli));
    let clock = Rc::new(ManualClock::new());
    let mut controller = PlaybackController::new(config, Rc::clone(&page), Rc::clone(&clock));

    let outcomes: Vec<KeyOutcome> = cli
        .keys
        .chars()
        .map(|key| controller.on_key_down(&KeyPress::plain(key)))
        .collect();

    if cli.inject > 0 {
        for _ in 0..cli.inject {
            page.append_video(MemoryVideo::playing());
        }
        match controller.on_mutations() {
            Some(count) => log::info!("Corrected {count} video(s) after injection"),
            None => log::info!("Normal mode; injected videos left at their own rate"),
        }
    }

    clock.advance(lifetime);

    let summary = Summary {
        mode: controller.mode(),
        outcomes,
        videos: controller
            .discover_videos()
            .iter()
            .map(|video| VideoSummary {
                rate: video.playback_rate(),
                paused: video.is_paused(),
            })
            .collect(),
        notifications_left: page.notification_count(),
    };
    print_summary(&summary, cli.json)
}
