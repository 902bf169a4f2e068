//! Line-oriented stdin console for the headless notifier.
//!
//! Stands in for the host UI: it reports visibility transitions, routes
//! and the open conversation, and drives the notification operations.

use std::str::FromStr;

use tokio::sync::mpsc;

use crate::bootstrap::Services;
use crate::navigation::Navigator;

const INPUT_CAPACITY: usize = 16;

const HELP: &str = "\
commands:
  visible | hidden          report page visibility
  list                      show notifications
  read <id> | read-all      mark as read
  delete <id>               delete a notification
  refresh | count           re-fetch the list / the unread count
  open <conversation>       set the active conversation
  close                     clear the active conversation
  route <path>              navigate
  sound on|off              toggle sound cues
  volume <0..1>             set cue volume
  sounds                    list sound assets
  cue <id> | cue default    replace the generic cue
  settings                  list stored settings
  reset <KEY>               restore a setting's default (on restart)
  status | help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Visible,
    Hidden,
    List,
    Read(String),
    ReadAll,
    Delete(String),
    Refresh,
    Count,
    Open(String),
    Close,
    Route(String),
    Sound(bool),
    Volume(f32),
    Sounds,
    Cue(Option<String>),
    Settings,
    Reset(String),
    Status,
    Help,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),

    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),

    #[error("invalid argument for '{command}': {value}")]
    InvalidArgument { command: &'static str, value: String },
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let name = parts.next().ok_or(CommandError::Empty)?;
        let arg = parts.next();
        let required = |command: &'static str| -> Result<String, CommandError> {
            arg.map(str::to_string)
                .ok_or(CommandError::MissingArgument(command))
        };

        let command = match name.to_ascii_lowercase().as_str() {
            "visible" => Self::Visible,
            "hidden" => Self::Hidden,
            "list" | "ls" => Self::List,
            "read" => Self::Read(required("read")?),
            "read-all" => Self::ReadAll,
            "delete" | "rm" => Self::Delete(required("delete")?),
            "refresh" => Self::Refresh,
            "count" => Self::Count,
            "open" => Self::Open(required("open")?),
            "close" => Self::Close,
            "route" => Self::Route(required("route")?),
            "sound" => match required("sound")?.as_str() {
                "on" => Self::Sound(true),
                "off" => Self::Sound(false),
                other => {
                    return Err(CommandError::InvalidArgument {
                        command: "sound",
                        value: other.to_string(),
                    });
                }
            },
            "volume" => {
                let raw = required("volume")?;
                match raw.parse::<f32>() {
                    Ok(v) if (0.0..=1.0).contains(&v) => Self::Volume(v),
                    _ => {
                        return Err(CommandError::InvalidArgument {
                            command: "volume",
                            value: raw,
                        });
                    }
                }
            }
            "sounds" => Self::Sounds,
            "cue" => match required("cue")?.as_str() {
                "default" | "none" => Self::Cue(None),
                id => Self::Cue(Some(id.to_string())),
            },
            "settings" => Self::Settings,
            "reset" => Self::Reset(required("reset")?.to_ascii_uppercase()),
            "status" => Self::Status,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

/// Read stdin on a plain thread so a pending read never holds up runtime
/// shutdown.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(INPUT_CAPACITY);
    let spawned = std::thread::Builder::new()
        .name("inkbridge-stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lines() {
                let Ok(line) = line else { break };
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        tracing::error!("Failed to start console reader: {e}");
    }
    rx
}

/// Run the console until `quit`, end of input or shutdown.
pub async fn run(services: Services) {
    let mut lines = spawn_stdin_reader();
    println!("{HELP}");
    loop {
        let line = tokio::select! {
            _ = services.shutdown.cancelled() => break,
            line = lines.recv() => match line {
                Some(line) => line,
                None => {
                    tracing::info!("Console input closed");
                    break;
                }
            },
        };
        if line.trim().is_empty() {
            continue;
        }
        // Any console input counts as user interaction.
        services.sound.mark_user_interaction();

        match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(command) => execute(&services, command).await,
            Err(e) => println!("{e}"),
        }
    }
    services.shutdown.cancel();
}

pub async fn execute(services: &Services, command: Command) {
    let center = services.provider.center();
    match command {
        Command::Visible => services.visibility.set_visible(true),
        Command::Hidden => services.visibility.set_visible(false),
        Command::List => print_list(services),
        Command::Read(id) => report(center.mark_as_read(&id).await, "marked as read"),
        Command::ReadAll => report(center.mark_all_as_read().await, "all marked as read"),
        Command::Delete(id) => report(center.remove_notification(&id).await, "deleted"),
        Command::Refresh => {
            report(center.fetch_notifications().await, "refreshed");
            print_list(services);
        }
        Command::Count => match center.refresh_unread_count().await {
            Some(count) => println!("unread: {count}"),
            None => println!("failed"),
        },
        Command::Open(conversation) => center.set_active_conversation(Some(conversation)),
        Command::Close => center.set_active_conversation(None),
        Command::Route(path) => services.navigator.navigate(&path),
        Command::Sound(enabled) => {
            services.sound.set_enabled(enabled);
            persist_sound_preferences(services);
        }
        Command::Volume(volume) => {
            services.sound.set_volume(volume);
            persist_sound_preferences(services);
        }
        Command::Sounds => {
            let ids = services.sound.library().ids();
            if ids.is_empty() {
                println!("no sound assets (built-in tones only)");
            } else {
                println!("{}", ids.join(" "));
            }
        }
        Command::Cue(sound) => {
            services.sound.set_selected_sound(sound);
            persist_sound_preferences(services);
        }
        Command::Settings => print_settings(services),
        Command::Reset(key) => match services.settings.reset_setting(&key) {
            Ok(()) => println!("{key} reset"),
            Err(e) => println!("{e}"),
        },
        Command::Status => print_status(services),
        Command::Help => println!("{HELP}"),
        Command::Quit => services.shutdown.cancel(),
    }
}

fn report(ok: bool, what: &str) {
    if ok {
        println!("{what}");
    } else {
        println!("failed (see log)");
    }
}

fn persist_sound_preferences(services: &Services) {
    if let Err(e) = services
        .settings
        .save_sound_preferences(&services.sound.preferences())
    {
        tracing::warn!("Failed to save sound preferences: {e}");
    }
}

fn print_settings(services: &Services) {
    match services.settings.get_all_settings() {
        Ok(settings) => {
            for s in settings {
                println!("{:<30} {:<28} {}", s.key, s.value, s.description);
            }
        }
        Err(e) => println!("{e}"),
    }
}

fn print_list(services: &Services) {
    let snapshot = services.provider.center().snapshot();
    println!(
        "{} notification(s), {} unread",
        snapshot.notifications.len(),
        snapshot.unread_count
    );
    for n in &snapshot.notifications {
        println!(
            "{} {} [{}] {}: {} {}",
            if n.read { " " } else { "*" },
            n.created_at.format("%Y-%m-%d %H:%M"),
            n.kind.as_str(),
            n.title,
            n.message,
            n.link.as_deref().unwrap_or_default(),
        );
        println!("    id={}", n.id);
    }
}

fn print_status(services: &Services) {
    let center = services.provider.center();
    let prefs = services.sound.preferences();
    println!("attached:   {}", services.provider.is_attached());
    println!("connection: {:?}", center.connection_state());
    println!("visible:    {}", services.visibility.is_page_visible());
    println!("route:      {}", services.navigator.current_route());
    println!(
        "sound:      enabled={} volume={:.2} selected={}",
        prefs.enabled,
        prefs.volume,
        prefs.selected_sound.as_deref().unwrap_or("-")
    );
    println!("desktop:    {}", services.desktop.permission_status().as_str());
}
