//! GroupChat CLI
//!
//! Terminal front end over the client core:
//! - Sign in and out, inspect the current account
//! - Manage groups and members
//! - Read, send and live-watch messages
//! - Handle notifications and invitations
//! - Check credits

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use groupchat::api::{CreateGroupRequest, RegisterRequest};
use groupchat::config::generate_default_config;
use groupchat::credits::{estimated_messages, format_credits, MODEL_PRICES};
use groupchat::display::{message_time, time_ago};
use groupchat::models::{GroupId, MemberRole, Message, NotificationId};
use groupchat::realtime::native::TokioConnector;
use groupchat::realtime::{kind, ConnectionStatus, InboundEvent, OfflineConnector, RealtimeConnector};
use groupchat::store::persist::FileStorage;
use groupchat::{CancellationToken, Config, GroupChatClient, Navigator};

#[derive(Parser)]
#[command(name = "groupchat")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Group chat with AI assistants, from the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ~/.config/groupchat/config.toml or ./groupchat.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend URL, overrides the config file
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in with email and password
    Login {
        email: String,
        #[arg(short, long)]
        password: String,
    },

    /// Create an account and sign in
    Register {
        email: String,
        username: String,
        #[arg(short, long)]
        password: String,
        #[arg(long)]
        full_name: Option<String>,
    },

    /// Forget the saved session
    Logout,

    /// Show the signed-in account
    Whoami,

    /// List your groups
    Groups,

    /// Create a group
    CreateGroup {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        private: bool,
        /// AI model answering in the group (openai-gpt4, openai-gpt3.5, gemini)
        #[arg(long)]
        ai_model: Option<String>,
    },

    /// Join a public group
    Join { group: GroupId },

    /// Leave a group
    Leave { group: GroupId },

    /// List a group's members
    Members { group: GroupId },

    /// Invite someone by email
    Invite { group: GroupId, email: String },

    /// Change a member's role (admin, moderator, member)
    SetRole {
        group: GroupId,
        user: i64,
        role: MemberRole,
    },

    /// Show recent messages
    Messages {
        group: GroupId,
        /// Number of pages to load, newest first
        #[arg(short, long, default_value = "1")]
        pages: u32,
    },

    /// Send a message
    Send { group: GroupId, content: String },

    /// Follow a group live until Ctrl-C
    Watch { group: GroupId },

    /// List notifications
    Notifications {
        #[arg(short, long)]
        unread: bool,
    },

    /// Mark a notification as read
    Read { id: NotificationId },

    /// Mark all notifications as read
    ReadAll,

    /// Accept the invitation carried by a notification
    Accept { id: NotificationId },

    /// Decline the invitation carried by a notification
    Decline { id: NotificationId },

    /// Show the credit balance and what it buys
    Credits,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

struct CliNavigator;

impl Navigator for CliNavigator {
    fn go_to_login(&self) {
        eprintln!("Session expired. Sign in again with: groupchat login <email> -p <password>");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        let config = generate_default_config();
        match output {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, &config)?;
                println!("Config written to {:?}", path);
            }
            None => print!("{}", config),
        }
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.trim_end_matches('/').to_string();
    }
    groupchat::logging::init_logging(&config.logging)?;

    let connector: Arc<dyn RealtimeConnector> = match cli.command {
        Commands::Watch { .. } => Arc::new(TokioConnector),
        _ => Arc::new(OfflineConnector),
    };
    let storage = Arc::new(
        FileStorage::new(&config.storage.dir)
            .with_context(|| format!("Cannot open session directory {}", config.storage.dir))?,
    );
    let client = GroupChatClient::new(config, storage, Arc::new(CliNavigator), connector)?;
    client.restore();

    let cancel = CancellationToken::new();
    let json = cli.format == "json";

    match cli.command {
        Commands::Login { email, password } => {
            let user = client
                .login(&email, &password, &cancel)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message("Login failed")))?;
            println!("Signed in as {} ({})", user.display_name(), user.email);
        }

        Commands::Register {
            email,
            username,
            password,
            full_name,
        } => {
            let request = RegisterRequest {
                email,
                username,
                password,
                full_name,
            };
            let user = client
                .register(&request, &cancel)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message("Registration failed")))?;
            println!("Account created. Signed in as {}", user.display_name());
        }

        Commands::Logout => {
            client.logout();
            println!("Signed out.");
        }

        Commands::Whoami => {
            require_session(&client)?;
            client.refresh_user(&cancel).await?;
            let Some(user) = client.session().user() else {
                bail!("Not signed in");
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&user)?);
            } else {
                println!("{} <{}>", user.display_name(), user.email);
                println!("  Username: {}", user.username);
                println!("  Credits:  {}", format_credits(user.credits));
                println!("  Member since {}", user.created_at.format("%Y-%m-%d"));
            }
        }

        Commands::Groups => {
            require_session(&client)?;
            client.fetch_groups(&cancel).await?;
            let groups = client.groups().groups();

            if json {
                println!("{}", serde_json::to_string_pretty(&groups)?);
            } else if groups.is_empty() {
                println!("You are not in any group yet.");
                println!();
                println!("Create one with:");
                println!("  groupchat create-group \"Book Club\"");
            } else {
                println!("{:<6} {:<30} {:<8} {:<8} {}", "ID", "Name", "Members", "Private", "AI");
                println!("{}", "-".repeat(70));
                for group in groups {
                    let ai = if group.ai_enabled {
                        group.ai_model.as_deref().unwrap_or("on")
                    } else {
                        "-"
                    };
                    println!(
                        "{:<6} {:<30} {:<8} {:<8} {}",
                        group.id,
                        truncate(&group.name, 30),
                        group.member_count,
                        if group.is_private { "yes" } else { "no" },
                        ai
                    );
                }
            }
        }

        Commands::CreateGroup {
            name,
            description,
            private,
            ai_model,
        } => {
            require_session(&client)?;
            let ai_enabled = ai_model.is_some() && client.config().features.enable_ai_chat;
            let request = CreateGroupRequest {
                name,
                description,
                is_private: private,
                ai_enabled,
                ai_model: ai_model.filter(|_| ai_enabled),
            };
            let group = client.create_group(&request, &cancel).await?;
            println!("Created group {} ({})", group.name, group.id);
        }

        Commands::Join { group } => {
            require_session(&client)?;
            client.join_group(group, &cancel).await?;
            println!("Joined group {}", group);
        }

        Commands::Leave { group } => {
            require_session(&client)?;
            client.leave_group(group, &cancel).await?;
            println!("Left group {}", group);
        }

        Commands::Members { group } => {
            require_session(&client)?;
            let members = client.chat().fetch_members(group, &cancel).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&members)?);
            } else {
                println!("{:<8} {:<24} {:<10} {}", "User", "Name", "Role", "Joined");
                println!("{}", "-".repeat(60));
                for member in members {
                    let name = member
                        .user
                        .as_ref()
                        .map(|u| u.full_name.clone().unwrap_or_else(|| u.username.clone()))
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{:<8} {:<24} {:<10} {}",
                        member.user_id,
                        truncate(&name, 24),
                        member.role,
                        member.joined_at.format("%Y-%m-%d")
                    );
                }
            }
        }

        Commands::Invite { group, email } => {
            require_session(&client)?;
            client.groups().invite_user(group, &email, &cancel).await?;
            println!("Invitation sent to {}", email);
        }

        Commands::SetRole { group, user, role } => {
            require_session(&client)?;
            client
                .groups()
                .update_member_role(group, user, role, &cancel)
                .await?;
            println!("User {} is now {} of group {}", user, role, group);
        }

        Commands::Messages { group, pages } => {
            require_session(&client)?;
            client.chat().fetch_messages(group, 1, &cancel).await?;
            for _ in 1..pages.max(1) {
                if client.chat().load_more(group, &cancel).await? == 0 {
                    break;
                }
            }

            let messages = client.chat().messages(group);
            if json {
                println!("{}", serde_json::to_string_pretty(&messages)?);
            } else if messages.is_empty() {
                println!("No messages yet.");
            } else {
                for message in &messages {
                    print_message(message);
                }
                if client.chat().has_more(group) {
                    println!();
                    println!("(older messages available, use --pages {})", pages + 1);
                }
            }
        }

        Commands::Send { group, content } => {
            require_session(&client)?;
            let message = client.chat().send_message(group, &content, &cancel).await?;
            print_message(&message);
        }

        Commands::Watch { group } => {
            require_session(&client)?;
            watch(&client, group, &cancel).await?;
        }

        Commands::Notifications { unread } => {
            require_session(&client)?;
            client
                .notifications()
                .fetch_notifications(50, 0, unread, &cancel)
                .await?;
            let notifications = client.notifications().notifications();

            if json {
                println!("{}", serde_json::to_string_pretty(&notifications)?);
            } else if notifications.is_empty() {
                println!("No notifications.");
            } else {
                let now = Utc::now();
                println!("{} unread", client.notifications().unread_count());
                println!();
                for n in notifications {
                    let marker = if n.is_read { " " } else { "*" };
                    println!("{} [{}] {} ({})", marker, n.id, n.title, time_ago(n.created_at, now));
                    println!("      {}", n.message);
                    if n.invitation_id().is_some() && !n.is_read {
                        println!("      groupchat accept {}  |  groupchat decline {}", n.id, n.id);
                    }
                }
            }
        }

        Commands::Read { id } => {
            require_session(&client)?;
            client.mark_notification_read(id, &cancel).await?;
            println!("Marked {} as read", id);
        }

        Commands::ReadAll => {
            require_session(&client)?;
            client.mark_all_notifications_read(&cancel).await?;
            println!("All notifications marked as read");
        }

        Commands::Accept { id } => {
            require_session(&client)?;
            let notification = find_notification(&client, id, &cancel).await?;
            let group_name = client.accept_invitation(&notification, &cancel).await?;
            println!("You joined {}", group_name);
        }

        Commands::Decline { id } => {
            require_session(&client)?;
            let notification = find_notification(&client, id, &cancel).await?;
            client.decline_invitation(&notification, &cancel).await?;
            println!("Invitation declined");
        }

        Commands::Credits => {
            require_session(&client)?;
            let balance = client.refresh_credits(&cancel).await?;
            println!("Balance: {} credits", format_credits(balance));
            println!();
            println!(
                "  ~{} GPT-3.5 messages",
                estimated_messages(balance, "openai-gpt3.5")
            );
            println!("  ~{} GPT-4 messages", estimated_messages(balance, "openai-gpt4"));
            println!();
            println!("{:<10} {}", "Model", "Credits per reply");
            println!("{}", "-".repeat(30));
            for (_, label, price) in MODEL_PRICES {
                println!("{:<10} {}", label, price);
            }
        }

        Commands::Config { .. } => {}
    }

    Ok(())
}

fn require_session(client: &GroupChatClient) -> anyhow::Result<()> {
    if !client.is_authenticated() {
        bail!("Not signed in. Run: groupchat login <email> -p <password>");
    }
    Ok(())
}

async fn find_notification(
    client: &GroupChatClient,
    id: NotificationId,
    cancel: &CancellationToken,
) -> anyhow::Result<groupchat::models::Notification> {
    client.fetch_notifications(cancel).await?;
    client
        .notifications()
        .notifications()
        .into_iter()
        .find(|n| n.id == id)
        .with_context(|| format!("Notification {} not found", id))
}

/// Print history, then live messages and typing until Ctrl-C or the
/// channel gives up
async fn watch(
    client: &Arc<GroupChatClient>,
    group: GroupId,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    client.chat().fetch_messages(group, 1, cancel).await?;
    for message in client.chat().messages(group) {
        print_message(&message);
    }

    let Some(channel) = client.realtime() else {
        bail!("Realtime channel unavailable");
    };
    client.select_group(Some(group));

    for frame_kind in [kind::MESSAGE, kind::NEW_MESSAGE] {
        channel.on_fn(frame_kind, move |frame| {
            if let InboundEvent::Message(message) = frame.event()? {
                if message.group_id == group {
                    print_message(&message);
                }
            }
            Ok(())
        });
    }
    for frame_kind in [kind::USER_JOINED, kind::USER_LEFT] {
        channel.on_fn(frame_kind, move |frame| {
            if let Some(user_id) = frame.user_id.filter(|_| frame.group_id == Some(group)) {
                let verb = if frame.kind == kind::USER_JOINED { "joined" } else { "left" };
                println!("-- user {} {}", user_id, verb);
            }
            Ok(())
        });
    }

    println!("-- watching group {} (Ctrl-C to stop)", group);
    let mut tick = tokio::time::interval(Duration::from_secs(1));
    let mut last_typing = Vec::new();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tick.tick() => {
                if channel.status().snapshot() == ConnectionStatus::GaveUp {
                    bail!("Connection lost and reconnect attempts exhausted");
                }
                let now = Utc::now();
                client.chat().prune_typing(now);
                let typing = client.chat().typing_users(group, now);
                if typing != last_typing && !typing.is_empty() {
                    let ids: Vec<String> = typing.iter().map(|id| format!("user {}", id)).collect();
                    if let Some(line) = groupchat::display::typing_line(&ids) {
                        println!("-- {}", line);
                    }
                }
                last_typing = typing;
            }
        }
    }

    client.stop_realtime();
    Ok(())
}

fn print_message(message: &Message) {
    let marker = if message.is_ai_message { "[AI] " } else { "" };
    println!(
        "{} {}{}: {}",
        message_time(message.created_at),
        marker,
        message.author_name(),
        message.content
    );
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
