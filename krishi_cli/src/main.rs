// krishi_cli/src/main.rs

mod session;

use anyhow::Context;
use clap::{Parser, Subcommand};
use gemini_client::GeminiClient;
use krishi_config::ServiceConfig;
use krishi_core::UserType;
use orchestrator::{KnowledgeBase, Orchestrator, PipelineSettings, PromptRules};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::sync::Arc;

use crate::session::{Input, Session, HELP};

#[derive(Parser)]
#[command(name = "krishi", about = "Krishi Sahayak from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive session (default).
    Chat {
        #[arg(long)]
        lang: Option<String>,
        #[arg(long, value_parser = parse_user_type)]
        user_type: Option<UserType>,
    },
    /// Resolve one query and print the reply as JSON.
    Ask {
        text: String,
        #[arg(long)]
        lang: Option<String>,
        #[arg(long, value_parser = parse_user_type)]
        user_type: Option<UserType>,
    },
    /// List models this API key can use for generateContent.
    Models,
}

fn parse_user_type(label: &str) -> Result<UserType, String> {
    UserType::parse(label).ok_or_else(|| format!("expected 'farmer' or 'buyer', got '{}'", label))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    krishi_config::load_env_files();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = ServiceConfig::from_env().context("configuration error")?;
    let gemini = GeminiClient::new(&config.gemini)?;

    match cli.command.unwrap_or(Command::Chat {
        lang: None,
        user_type: None,
    }) {
        Command::Models => {
            for name in gemini.list_models().await? {
                println!("{}", name);
            }
        }
        Command::Ask {
            text,
            lang,
            user_type,
        } => {
            let orchestrator = build_orchestrator(&config, gemini)?;
            let session = Session::new(
                lang.unwrap_or_else(|| config.default_language.clone()),
                user_type,
            );
            let resolution = orchestrator.resolve(&session.request(&text)).await;
            println!("{}", serde_json::to_string_pretty(&resolution.reply)?);
        }
        Command::Chat { lang, user_type } => {
            let orchestrator = build_orchestrator(&config, gemini)?;
            let session = Session::new(
                lang.unwrap_or_else(|| config.default_language.clone()),
                user_type,
            );
            run_chat(&orchestrator, session).await?;
        }
    }

    Ok(())
}

fn build_orchestrator(
    config: &ServiceConfig,
    gemini: GeminiClient,
) -> anyhow::Result<Orchestrator> {
    let knowledge = match &config.knowledge_path {
        Some(path) => KnowledgeBase::load(path)?,
        None => KnowledgeBase::market_rates(),
    };
    let rules = match &config.rules_path {
        Some(path) => PromptRules::load(path)?,
        None => PromptRules::default(),
    };
    Ok(Orchestrator::new(
        Arc::new(gemini),
        knowledge,
        rules,
        PipelineSettings {
            default_language: config.default_language.clone(),
            echo_errors: config.echo_errors,
        },
    ))
}

async fn run_chat(orchestrator: &Orchestrator, mut session: Session) -> anyhow::Result<()> {
    println!("Krishi Sahayak. Ask about mandi prices, crops, transport or weather.");
    println!("{}", HELP);

    let mut editor = DefaultEditor::new()?;
    loop {
        let line = match editor.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };
        let input = Session::parse(&line);
        if input == Input::Exit {
            println!("Dhanyavaad!");
            break;
        }
        if input != Input::Empty {
            editor.add_history_entry(line.as_str())?;
        }
        if let Some(output) = respond(orchestrator, &mut session, input).await {
            println!("{}", output);
        }
    }

    Ok(())
}

/// Text to print for one line of input, if any.
async fn respond(
    orchestrator: &Orchestrator,
    session: &mut Session,
    input: Input,
) -> Option<String> {
    match input {
        Input::Empty | Input::Exit => None,
        Input::Help => Some(HELP.to_string()),
        Input::Invalid(reason) => Some(format!("[Error] {}", reason)),
        Input::Query(text) => {
            let resolution = orchestrator.resolve(&session.request(&text)).await;
            tracing::debug!("[Cli] Resolved with outcome {:?}", resolution.outcome);
            Some(format!(
                "[Krishi Sahayak] {} ({})",
                resolution.reply.voice_response, resolution.reply.intent
            ))
        }
        settings_change => {
            session.apply(&settings_change);
            Some(format!(
                "[Session] language={} user={}",
                session.language,
                session.user_type.map(|u| u.as_str()).unwrap_or("none")
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use krishi_core::KnowledgeEntry;
    use orchestrator::test_util::ScriptedGenerator;

    fn orchestrator(generator: Arc<ScriptedGenerator>) -> Orchestrator {
        Orchestrator::new(
            generator,
            KnowledgeBase::new(vec![KnowledgeEntry::new("kanda", "2400 INR/Quintal")]),
            PromptRules::default(),
            PipelineSettings::default(),
        )
    }

    #[tokio::test]
    async fn session_language_reaches_the_prompt() {
        let generator = Arc::new(
            ScriptedGenerator::new().reply(r#"{"voiceResponse":"Paus yeil","intent":"WEATHER"}"#),
        );
        let orchestrator = orchestrator(generator.clone());
        let mut session = Session::new("en", None);

        let changed = respond(&orchestrator, &mut session, Session::parse(":lang mr")).await;
        assert_eq!(changed.as_deref(), Some("[Session] language=mr user=none"));

        let output = respond(&orchestrator, &mut session, Session::parse("paus padel ka?")).await;
        assert_eq!(output.as_deref(), Some("[Krishi Sahayak] Paus yeil (WEATHER)"));
        assert!(generator.prompts()[0].contains("Target Language: \"mr\""));
    }

    #[tokio::test]
    async fn price_query_is_answered_locally() {
        let generator = Arc::new(ScriptedGenerator::new());
        let orchestrator = orchestrator(generator.clone());
        let mut session = Session::new("en", Some(UserType::Buyer));

        let output = respond(&orchestrator, &mut session, Session::parse("kanda rate")).await;

        assert_eq!(
            output.as_deref(),
            Some("[Krishi Sahayak] The current mandi price for kanda is 2400 INR/Quintal. (SELL)")
        );
        assert_eq!(generator.call_count(), 0);
    }

    #[test]
    fn user_type_flag_parses() {
        assert_eq!(parse_user_type("farmer"), Ok(UserType::Farmer));
        assert!(parse_user_type("trader").is_err());
    }
}
