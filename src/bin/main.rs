use intent_chatbot::{
    chat_log::ChatLog,
    config::AppConfig,
    conversational::{is_farewell, Chatbot},
    intents::IntentCatalog,
    session::ChatSession,
};
use std::io::{self, BufRead, Write};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Logs go to stderr so they never mix with the conversation
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let config = AppConfig::from_env()?;

    let catalog = IntentCatalog::load(&config.intents_path)?;
    let chatbot = Chatbot::train_with_config(catalog, &config.classifier)?;

    let chat_log = ChatLog::new(&config.chat_log_path);
    if let Err(e) = chat_log.ensure_exists() {
        warn!("Chat log unavailable, conversation will not be recorded: {}", e);
    }

    let mut session = ChatSession::new(Uuid::new_v4());
    let mut rng = rand::thread_rng();

    info!(session_id = %session.session_id, "Chat session started");

    println!("🤖 Welcome to the Chatbot! Type a message, /history to replay the log, /quit to leave.");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("🗣 You: ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let input = line.trim();
        match input {
            "" => continue,
            "/quit" => break,
            "/history" => {
                print_history(&chat_log);
                continue;
            }
            _ => {}
        }

        let reply = chatbot.chat(input, &mut rng, Some(&chat_log));
        if let Some(warning) = &reply.log_warning {
            eprintln!("⚠️  {}", warning);
        }

        println!("🤖 Chatbot: {}", reply.answer);
        session.record_exchange(input, reply.answer.as_str());

        if is_farewell(&reply.answer) {
            println!("Thank you for chatting with me. Have a great day!");
            break;
        }
    }

    info!(
        session_id = %session.session_id,
        messages = session.message_count(),
        "Chat session ended"
    );

    Ok(())
}

fn print_history(chat_log: &ChatLog) {
    match chat_log.read_all() {
        Ok(entries) if entries.is_empty() => println!("No conversation history found."),
        Ok(entries) => {
            println!("\n=== CONVERSATION HISTORY ===");
            for entry in entries {
                println!("🗣 User: {}", entry.user_input);
                println!("🤖 Chatbot: {}", entry.bot_response);
                println!("⏰ Timestamp: {}", entry.timestamp);
                println!("---");
            }
        }
        Err(e) => eprintln!("Failed to read conversation history: {}", e),
    }
}
