use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use questing_tasks::quest::start_file_watcher;
use questing_tasks::task::{ReadSummary, RewardLine};
use questing_tasks::{
    Catalog, Database, DirtyQuests, PlayerId, QuestBook, QuestCache, ServerConfig, TaskEvent, TaskEventResult,
    TaskView,
};

// ============================================================================
// App State
// ============================================================================

/// Quest book plus the quests changed since the last save
struct Tracker {
    book: QuestBook,
    dirty: DirtyQuests,
}

#[derive(Clone)]
struct AppState {
    tracker: Arc<RwLock<Tracker>>,
    catalog: Arc<Catalog>,
    db: Arc<Database>,
}

// ============================================================================
// Input / Output
// ============================================================================

/// One line of newline-delimited JSON input
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum InputLine {
    Event {
        event: TaskEvent,
    },
    Reset {
        #[serde(default)]
        quest_id: Option<String>,
        #[serde(default)]
        player_id: Option<PlayerId>,
    },
    Export {
        #[serde(default)]
        players: Option<Vec<PlayerId>>,
    },
    Import {
        document: Value,
        #[serde(default)]
        merge: bool,
    },
    View {
        quest_id: String,
        player_id: PlayerId,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum OutputLine {
    Updates {
        results: Vec<TaskEventResult>,
    },
    Reset {
        tasks: usize,
    },
    Export {
        document: Value,
    },
    Import {
        completed: usize,
        progress: usize,
        skipped: usize,
    },
    View {
        quest_id: String,
        player_id: PlayerId,
        name: String,
        complete: bool,
        tasks: Vec<TaskView>,
        rewards: Vec<RewardLine>,
    },
}

impl From<ReadSummary> for OutputLine {
    fn from(summary: ReadSummary) -> Self {
        OutputLine::Import {
            completed: summary.completed,
            progress: summary.progress,
            skipped: summary.skipped,
        }
    }
}

/// Apply one input line. Malformed lines are logged and produce no output.
fn handle_line(tracker: &mut Tracker, catalog: &Catalog, line: &str) -> Option<OutputLine> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let input: InputLine = match serde_json::from_str(line) {
        Ok(input) => input,
        Err(e) => {
            warn!("Skipping malformed input line: {}", e);
            return None;
        }
    };

    let Tracker { book, dirty } = tracker;
    match input {
        InputLine::Event { event } => {
            debug!("Processing {} for {}", event.event_type(), event.player_id());
            let results = book.process_event(&event, catalog, dirty);
            (!results.is_empty()).then_some(OutputLine::Updates { results })
        }
        InputLine::Reset { quest_id, player_id } => {
            let tasks = book.reset(quest_id.as_deref(), player_id, dirty);
            info!("Reset {} task(s)", tasks);
            Some(OutputLine::Reset { tasks })
        }
        InputLine::Export { players } => Some(OutputLine::Export {
            document: book.export_progress(players.as_deref()),
        }),
        InputLine::Import { document, merge } => {
            let summary = book.import_progress(&document, merge, dirty);
            info!(
                "Imported progress: {} completions, {} entries, {} skipped",
                summary.completed, summary.progress, summary.skipped
            );
            Some(summary.into())
        }
        InputLine::View { quest_id, player_id } => match book.view(&quest_id, player_id) {
            Some(view) => Some(OutputLine::View {
                quest_id,
                player_id,
                name: view.name,
                complete: view.complete,
                tasks: view.tasks,
                rewards: view.rewards,
            }),
            None => {
                warn!("View requested for unknown quest '{}'", quest_id);
                None
            }
        },
    }
}

fn emit(output: &OutputLine) {
    match serde_json::to_string(output) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Failed to serialize output: {}", e),
    }
}

// ============================================================================
// Persistence
// ============================================================================

/// Write every dirty quest. Quests that fail to save stay dirty.
async fn save_dirty(state: &AppState) {
    let batch: Vec<(String, Vec<(u32, Value)>)> = {
        let mut tracker = state.tracker.write().await;
        let quest_ids = tracker.dirty.drain();
        let batch = quest_ids
            .into_iter()
            .map(|id| {
                let docs = tracker.book.task_documents(&id);
                (id, docs)
            })
            .collect();
        batch
    };

    let mut saved = 0;
    for (quest_id, docs) in batch {
        if docs.is_empty() {
            continue;
        }
        match state.db.save_quest(&quest_id, &docs).await {
            Ok(()) => saved += 1,
            Err(e) => {
                warn!("Auto-save failed for quest '{}': {}", quest_id, e);
                state.tracker.write().await.dirty.mark_quest_dirty(&quest_id);
            }
        }
    }

    if saved > 0 {
        info!("Auto-saved {} quest(s) to database", saved);
    }
}

async fn save_all(state: &AppState) {
    {
        let mut tracker = state.tracker.write().await;
        let Tracker { book, dirty } = &mut *tracker;
        for quest_id in book.quest_ids() {
            dirty.mark_quest_dirty(&quest_id);
        }
    }
    save_dirty(state).await;
}

/// Load stored progress into freshly loaded quests
async fn restore(state: &AppState) {
    let stored = match state.db.load_all().await {
        Ok(stored) => stored,
        Err(e) => {
            error!("Failed to load stored progress: {}", e);
            return;
        }
    };

    let last_saved = stored.iter().map(|task| task.updated_at).max();
    let mut tracker = state.tracker.write().await;
    let restored = stored
        .iter()
        .filter(|task| {
            tracker
                .book
                .restore_task_document(&task.quest_id, task.task_index, &task.document)
        })
        .count();
    match last_saved {
        Some(at) => info!(
            "Restored progress for {} of {} stored task(s), last saved {}",
            restored,
            stored.len(),
            at.to_rfc3339()
        ),
        None => info!("No stored progress to restore"),
    }
}

/// Reload quest definitions and drop stored progress of quests that are gone
async fn apply_reload(state: &AppState) {
    let removed = {
        let mut tracker = state.tracker.write().await;
        match tracker.book.reload() {
            Ok(summary) => {
                info!("Hot-reload completed successfully ({} quests)", summary.loaded);
                summary.removed
            }
            Err(e) => {
                error!("Hot-reload failed: {}", e);
                return;
            }
        }
    };

    for quest_id in removed {
        match state.db.delete_quest(&quest_id).await {
            Ok(rows) => info!("Dropped {} stored task(s) of removed quest '{}'", rows, quest_id),
            Err(e) => warn!("Failed to drop stored progress of '{}': {}", quest_id, e),
        }
    }
}

// ============================================================================
// Main
// ============================================================================

async fn open_input(config: &ServerConfig) -> std::io::Result<Box<dyn AsyncRead + Unpin + Send>> {
    if config.events_from_stdin() {
        Ok(Box::new(tokio::io::stdin()))
    } else {
        Ok(Box::new(tokio::fs::File::open(&config.events).await?))
    }
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = match ServerConfig::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging; stdout carries output lines
    let directive: Result<tracing_subscriber::filter::Directive, _> = config.log_filter.parse();
    let filter = match &directive {
        Ok(directive) => tracing_subscriber::EnvFilter::from_default_env().add_directive(directive.clone()),
        Err(_) => tracing_subscriber::EnvFilter::from_default_env(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    if let Err(e) = directive {
        warn!("Ignoring invalid log filter '{}': {}", config.log_filter, e);
    }

    let catalog = match Catalog::load_from_directory(&config.data_dir) {
        Ok(catalog) => catalog,
        Err(e) => {
            error!("Failed to load catalog: {}", e);
            Catalog::default()
        }
    };

    let mut book = QuestBook::new(&config.data_dir);
    if let Err(e) = book.load_all() {
        error!("Failed to load quests: {}", e);
    }

    let db = match Database::new(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let state = AppState {
        tracker: Arc::new(RwLock::new(Tracker {
            book,
            dirty: DirtyQuests::new(),
        })),
        catalog: Arc::new(catalog),
        db: Arc::new(db),
    };
    restore(&state).await;

    // Spawn hot-reload loop
    if config.hot_reload {
        let quests_dir = state.tracker.read().await.book.quests_dir().to_path_buf();
        if quests_dir.exists() {
            let mut rx = start_file_watcher(quests_dir);
            let reload_state = state.clone();
            tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    // Editors emit bursts; one reload covers them all
                    while rx.try_recv().is_ok() {}
                    debug!("Reload triggered by {:?}", event.path);
                    apply_reload(&reload_state).await;
                }
            });
        } else {
            warn!("Hot reload disabled: {:?} does not exist", quests_dir);
        }
    }

    // Spawn auto-save loop
    let save_state = state.clone();
    let autosave = config.autosave_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(autosave);
        interval.tick().await;
        loop {
            interval.tick().await;
            save_dirty(&save_state).await;
        }
    });

    let input = match open_input(&config).await {
        Ok(input) => input,
        Err(e) => {
            error!("Failed to open event input '{}': {}", config.events, e);
            std::process::exit(1);
        }
    };
    let mut lines = BufReader::new(input).lines();
    info!("Reading events from {}", if config.events_from_stdin() { "stdin" } else { config.events.as_str() });

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let mut tracker = state.tracker.write().await;
                    if let Some(output) = handle_line(&mut tracker, &state.catalog, &line) {
                        emit(&output);
                    }
                }
                Ok(None) => {
                    info!("Event input closed");
                    break;
                }
                Err(e) => {
                    error!("Failed to read event input: {}", e);
                    break;
                }
            },
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    save_all(&state).await;
    info!("Progress saved, exiting");
}
