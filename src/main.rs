mod analysis_manager;
mod artwork_resolver;
mod config;
mod crosslink;
mod history;
mod protocol;
mod similarity_expander;
mod sources;
mod video_url;

use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex};
use std::thread;

use log::{error, info, warn};
use tokio::sync::broadcast;

use analysis_manager::AnalysisManager;
use config::Config;
use history::{FileHistoryStore, SearchHistory};
use protocol::{AnalysisMessage, HistoryMessage, Message, ResolvedSong};
use sources::{lastfm::LastfmClient, youtube::YoutubeClient};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut clog = colog::default_builder();
    clog.filter(None, log::LevelFilter::Info);
    clog.init();

    std::panic::set_hook(Box::new(|panic_info| {
        let current_thread = std::thread::current();
        let thread_name = current_thread.name().unwrap_or("unnamed");
        log::error!("panic in thread '{}': {}", thread_name, panic_info);
    }));

    let config_file = config::default_config_file()
        .ok_or("Could not determine the user config directory")?;
    let config = config::load_or_create(&config_file);
    if config.youtube.api_key.is_empty() || config.lastfm.api_key.is_empty() {
        warn!(
            "API keys are not configured; edit {} and set youtube.api_key and lastfm.api_key",
            config_file.display()
        );
    }

    let history_path = FileHistoryStore::default_path()
        .ok_or("Could not determine the user data directory")?;
    let history = SearchHistory::load(Box::new(FileHistoryStore::new(history_path)));

    // Bus for communication between components
    let (bus_sender, _) = broadcast::channel(256);

    let mut manager = AnalysisManager::new(
        bus_sender.subscribe(),
        bus_sender.clone(),
        Arc::new(YoutubeClient::new(config.youtube.api_key.clone())),
        Arc::new(LastfmClient::new(config.lastfm.api_key.clone())),
        history,
        &config.analysis,
    );
    thread::Builder::new()
        .name("analysis-manager".to_string())
        .spawn(move || manager.run())?;

    let latest_recommendations: Arc<Mutex<Vec<ResolvedSong>>> = Arc::new(Mutex::new(Vec::new()));
    spawn_bus_printer(bus_sender.subscribe(), Arc::clone(&latest_recommendations));

    run_shell(&bus_sender, &latest_recommendations, &config);

    info!("Application exiting");
    Ok(())
}

/// Renders bus traffic for the terminal and keeps the latest committed
/// recommendation list around for the `open` command.
fn spawn_bus_printer(
    mut bus_consumer: broadcast::Receiver<Message>,
    latest_recommendations: Arc<Mutex<Vec<ResolvedSong>>>,
) {
    thread::spawn(move || loop {
        match bus_consumer.blocking_recv() {
            Ok(Message::Analysis(message)) => match message {
                AnalysisMessage::AnalysisStarted { request_id, .. } => {
                    println!("[request {request_id}] analyzing...");
                }
                AnalysisMessage::StageChanged { request_id, stage } => {
                    println!("[request {request_id}] {}", stage.label());
                }
                AnalysisMessage::AnalysisCompleted {
                    request_id,
                    outcome,
                } => {
                    {
                        let mut latest = latest_recommendations
                            .lock()
                            .expect("recommendations lock poisoned");
                        *latest = outcome.recommendations.clone();
                    }
                    println!(
                        "[request {request_id}] {} — {}",
                        outcome.current.title, outcome.current.artist
                    );
                    println!(
                        "[request {request_id}] found {} similar songs",
                        outcome.recommendations.len()
                    );
                    for (index, song) in outcome.recommendations.iter().enumerate() {
                        println!(
                            "  {:>2}. {} — {}\n      cover:   {}\n      youtube: {}\n      spotify: {}",
                            index + 1,
                            song.title,
                            song.artist,
                            song.cover_art_url,
                            song.youtube_url,
                            song.spotify_url
                        );
                    }
                }
                AnalysisMessage::AnalysisFailed { request_id, error } => {
                    println!("[request {request_id}] error: {error}");
                }
                _ => {}
            },
            Ok(Message::History(HistoryMessage::HistoryChanged(entries))) => {
                if entries.is_empty() {
                    println!("(history is empty)");
                } else {
                    println!("history:");
                    for entry in &entries {
                        println!("  {} — {}  [{}]", entry.title, entry.artist, entry.url);
                    }
                }
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Printer lagged on control bus, skipped {} message(s)", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    });
}

/// Interactive command loop; the presentation layer of the pipeline.
fn run_shell(
    bus_sender: &broadcast::Sender<Message>,
    latest_recommendations: &Arc<Mutex<Vec<ResolvedSong>>>,
    config: &Config,
) {
    println!("tunescout — paste a YouTube URL to find similar songs");
    println!("commands: history, clear, open <n>, quit");
    if config.youtube.api_key.is_empty() || config.lastfm.api_key.is_empty() {
        println!("note: API keys are missing, lookups will fail until they are configured");
    }

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                error!("Failed to read input: {}", err);
                break;
            }
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        match input {
            "quit" | "exit" => break,
            "history" => {
                let _ = bus_sender.send(Message::History(HistoryMessage::RequestHistory));
            }
            "clear" => {
                let _ = bus_sender.send(Message::History(HistoryMessage::ClearHistory));
                println!("history cleared");
            }
            _ => {
                if let Some(index_text) = input.strip_prefix("open ") {
                    open_recommendation(index_text.trim(), latest_recommendations);
                } else {
                    let _ = bus_sender.send(Message::Analysis(AnalysisMessage::StartAnalysis {
                        url: input.to_string(),
                    }));
                }
            }
        }
    }
}

fn open_recommendation(index_text: &str, latest_recommendations: &Arc<Mutex<Vec<ResolvedSong>>>) {
    let Ok(index) = index_text.parse::<usize>() else {
        println!("usage: open <n>");
        return;
    };
    let url = {
        let latest = latest_recommendations
            .lock()
            .expect("recommendations lock poisoned");
        if index == 0 || index > latest.len() {
            println!("no recommendation #{index}");
            return;
        }
        latest[index - 1].youtube_url.clone()
    };
    if let Err(err) = webbrowser::open(&url) {
        warn!("Failed to open browser for {}: {}", url, err);
    }
}
