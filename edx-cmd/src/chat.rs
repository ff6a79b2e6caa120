//! Interactive chat loop over stdin, logged to the in-memory conversation log.

use crate::ask::print_outcome;
use crate::turn::{run_turn, Collaborators};
use edx_db::models::{ChatInfo, Role};
use edx_db::Database;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "Ask about an Indian state's environment. Commands: :history, :new, :quit";

enum Input<'a> {
    Quit,
    NewChat,
    History,
    Query(&'a str),
    Blank,
}

fn classify(line: &str) -> Input<'_> {
    match line.trim() {
        "" => Input::Blank,
        ":quit" | ":q" => Input::Quit,
        ":new" => Input::NewChat,
        ":history" => Input::History,
        query => Input::Query(query),
    }
}

pub async fn run_chat(collaborators: &Collaborators) -> anyhow::Result<()> {
    let db = Database::new()?;
    let mut current: Option<ChatInfo> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{}", HELP);
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match classify(&line) {
            Input::Blank => continue,
            Input::Quit => break,
            Input::NewChat => {
                current = None;
                println!("Started a new chat.");
            }
            Input::History => print_history(&db, current.as_ref())?,
            Input::Query(query) => {
                let chat = match &current {
                    Some(chat) => chat.clone(),
                    None => {
                        let chat = db.create_chat(query)?;
                        current = Some(chat.clone());
                        chat
                    }
                };
                db.append_message(chat.id, Role::User, query)?;
                let outcome = run_turn(query, collaborators).await;
                print_outcome(&outcome)?;
                db.append_message(chat.id, Role::Assistant, &outcome.message())?;
            }
        }
    }
    Ok(())
}

fn print_history(db: &Database, current: Option<&ChatInfo>) -> anyhow::Result<()> {
    let chats = db.query_chats()?;
    if chats.is_empty() {
        println!("No chats yet.");
        return Ok(());
    }
    for chat in &chats {
        let marker = if current.is_some_and(|c| c.id == chat.id) { "*" } else { " " };
        println!("{} {} {} ({})", marker, chat.id, chat.name, chat.created_at);
    }
    if let Some(chat) = current {
        for message in db.query_messages(chat.id)? {
            println!("[{}] {}", message.role, message.content);
        }
    }
    Ok(())
}
