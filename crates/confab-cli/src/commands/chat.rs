//! Interactive chat session.
//!
//! Lines starting with `:` are REPL controls handled here; everything
//! else (including `/imagine` and `/help`) goes through the session
//! controller.

use std::io::Write as _;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use confab_core::model::MessageRole;
use confab_core::session::{SendOutcome, SessionController};
use confab_gateway::HttpGenerationGateway;

use super::setup;

pub async fn run() -> Result<()> {
    let setup = setup().await?;
    let gateway =
        HttpGenerationGateway::from_settings(&setup.config.gateway, setup.secrets.as_ref())
            .context("failed to configure generation gateway")?;
    let controller = SessionController::new(
        setup.config.session.owner_id.clone(),
        setup.store,
        Arc::new(gateway),
    )
    .with_history_window(setup.config.session.history_window);

    controller.load().await?;
    match controller.active_conversation_id().await {
        Some(_) => print_active_title(&controller).await,
        None => println!("No conversations yet; your first message starts one."),
    }
    println!("Type :help for session controls, /help for chat commands.");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }

        if let Some(control) = line.strip_prefix(':') {
            if !handle_control(&controller, control).await? {
                break;
            }
            continue;
        }

        match controller.send_message(&line).await? {
            SendOutcome::Ignored => {}
            SendOutcome::Completed { .. } | SendOutcome::LocalReply { .. } => {
                print_last_reply(&controller).await;
            }
        }
    }

    // Best-effort final write before exit; normal persistence is
    // fire-and-forget and may still be in flight.
    if let Some(id) = controller.active_conversation_id().await {
        if let Err(err) = controller.flush(&id).await {
            tracing::warn!("final flush failed: {err}");
        }
    }
    Ok(())
}

/// Handles a `:` control line. Returns false when the session should end.
async fn handle_control(controller: &SessionController, control: &str) -> Result<bool> {
    let (name, arg) = match control.split_once(' ') {
        Some((name, arg)) => (name, arg.trim()),
        None => (control, ""),
    };

    match name {
        "quit" | "q" => return Ok(false),
        "help" => {
            println!(":list            show conversations");
            println!(":switch <n>      switch to conversation n");
            println!(":new             start a new conversation");
            println!(":rename <title>  rename the current conversation");
            println!(":clear           clear the current conversation");
            println!(":delete          delete the current conversation");
            println!(":quit            exit");
        }
        "list" => {
            let active = controller.active_conversation_id().await;
            for (index, conversation) in controller.conversations().await.iter().enumerate() {
                let marker = if active.as_deref() == Some(&conversation.id) {
                    "*"
                } else {
                    " "
                };
                println!("{marker} {index}: {}", conversation.title);
            }
        }
        "switch" => match arg.parse::<usize>() {
            Ok(index) => {
                let conversations = controller.conversations().await;
                match conversations.get(index) {
                    Some(conversation) => {
                        let id = conversation.id.clone();
                        controller.select_conversation(&id).await?;
                        print_active_title(controller).await;
                        print_recent_messages(controller).await;
                    }
                    None => println!("No conversation at index {index}"),
                }
            }
            Err(_) => println!("Usage: :switch <n>"),
        },
        "new" => {
            controller.create_conversation().await?;
            print_active_title(controller).await;
        }
        "rename" => {
            if arg.is_empty() {
                println!("Usage: :rename <title>");
            } else if let Some(id) = controller.active_conversation_id().await {
                controller.rename_conversation(&id, arg).await?;
                print_active_title(controller).await;
            } else {
                println!("No active conversation");
            }
        }
        "clear" => {
            controller.clear_messages().await?;
        }
        "delete" => {
            if let Some(id) = controller.active_conversation_id().await {
                controller.delete_conversation(&id).await?;
                match controller.active_conversation_id().await {
                    Some(_) => print_active_title(controller).await,
                    None => println!("No conversations left."),
                }
            } else {
                println!("No active conversation");
            }
        }
        other => println!("Unknown control :{other}; try :help"),
    }
    Ok(true)
}

async fn print_active_title(controller: &SessionController) {
    let active = controller.active_conversation_id().await;
    if let Some(active) = active {
        if let Some(conversation) = controller
            .conversations()
            .await
            .iter()
            .find(|c| c.id == active)
        {
            println!("-- {} --", conversation.title);
        }
    }
}

async fn print_recent_messages(controller: &SessionController) {
    let messages = controller.active_messages().await;
    for message in messages.iter().rev().take(6).rev() {
        print_message_line(message);
    }
}

async fn print_last_reply(controller: &SessionController) {
    let messages = controller.active_messages().await;
    if let Some(reply) = messages
        .iter()
        .rev()
        .find(|m| m.role == MessageRole::Assistant)
    {
        print_message_line(reply);
    }
}

fn print_message_line(message: &confab_core::model::ChatMessage) {
    let speaker = match message.role {
        MessageRole::User => "you",
        MessageRole::Assistant => "assistant",
    };
    if let Some(url) = &message.image_url {
        println!("{speaker}: {} [{url}]", message.content);
    } else if let Some(url) = &message.uploaded_image_url {
        println!("{speaker}: [uploaded image: {url}]");
    } else {
        println!("{speaker}: {}", message.content);
    }
}
