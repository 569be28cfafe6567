use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use beritabank::models::language::Language;
use beritabank::repositories::storage::FileStore;
use beritabank::services::app::{AppContext, ResendOutcome};
use beritabank::services::gating::{Route, Screen};
use beritabank::services::onboarding::{BankOption, BankSearch, InputKind, Step};
use beritabank::settings::Settings;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "beritabank.toml")]
    config: String,
    /// Overrides `logging.config` from the settings file.
    #[arg(long)]
    log4rs: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Register { username: String, email: String },
    Login { username: String },
    Logout,
    /// Show which step of account setup comes next.
    Status,
    Verify { code: String },
    Resend {
        /// Keep running and show the countdown until a new code can be requested.
        #[arg(long)]
        wait: bool,
    },
    Onboard,
    Me,
    Banks {
        #[arg(long)]
        limit: Option<u32>,
    },
    Articles {
        #[arg(long)]
        limit: Option<u32>,
    },
    Article { id: String },
    Summary,
    Chat { message: Option<String> },
    Tags,
    UpdateDesc { message: String },
    ChangePassword,
    DeleteAccount {
        #[arg(long)]
        yes: bool,
    },
    Language { value: Option<Language> },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    let settings = Settings::load(&args.config).context("Failed to load settings")?;

    let log_config = args.log4rs.as_deref().unwrap_or(&settings.logging.config);
    init_logging(log_config)?;

    let dir = settings
        .storage
        .dir
        .clone()
        .or_else(FileStore::default_dir)
        .ok_or_else(|| anyhow!("No storage directory available, set storage.dir"))?;
    log::debug!("Using storage at {}", dir.display());

    let mut app = AppContext::from_settings(&settings, Arc::new(FileStore::new(dir)))?;
    if let Err(e) = run(&mut app, args.command).await {
        log::error!("{:#}", e);
        eprintln!("[ERROR] {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn init_logging(path: &str) -> Result<(), anyhow::Error> {
    if Path::new(path).exists() {
        if !Path::new("logs").exists() {
            fs::create_dir("logs")?;
        }
        return log4rs::init_file(path, Default::default())
            .map_err(|e| anyhow!("Could not initialize logging: {}", e));
    }

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{d(%H:%M:%S)} {h({l})} {t} - {m}{n}")))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(LevelFilter::Warn))
        .map_err(|e| anyhow!("Could not build logging config: {}", e))?;
    log4rs::init_config(config).map_err(|e| anyhow!("Could not initialize logging: {}", e))?;
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn describe_route(route: Route) -> &'static str {
    match route.screen() {
        Screen::MarketingHome => "Not signed in. Use `login` or `register`.",
        Screen::Loading => "Checking account status...",
        Screen::EmailVerification => {
            "Verify your email: run `verify <code>` with the code we sent, or `resend`."
        }
        Screen::OnboardingQuestionnaire => "Tell us about yourself: run `onboard`.",
        Screen::Assistant => "All set. Try `summary`, `chat` or `articles`.",
    }
}

async fn run(app: &mut AppContext, command: Command) -> Result<()> {
    match command {
        Command::Register { username, email } => {
            let password = prompt("Password: ")?;
            let route = app.register(&username, &email, &password).await?;
            println!("Welcome, {}! {}", username, describe_route(route));
        }
        Command::Login { username } => {
            let password = prompt("Password: ")?;
            let route = app.login(&username, &password).await?;
            println!("{}", describe_route(route));
        }
        Command::Logout => {
            app.logout().await;
            println!("Signed out.");
        }
        Command::Status => {
            let route = app.current_route().await?;
            println!("[{}] {}", route, describe_route(route));
            if let Some(guidance) = app.cached_status().await.and_then(|s| s.guidance) {
                println!("{}", guidance);
            }
        }
        Command::Verify { code } => {
            let route = app.verify(&code).await?;
            println!("Email verified. {}", describe_route(route));
        }
        Command::Resend { wait } => {
            let countdown = match app.resend_code().await? {
                ResendOutcome::Sent(countdown) => {
                    println!("A new code is on its way.");
                    countdown
                }
                ResendOutcome::StillValid { message, countdown } => {
                    println!("{}", message);
                    countdown
                }
            };
            println!("You can request another code in {}.", countdown.display());
            if wait {
                wait_for_resend(app).await?;
            }
        }
        Command::Onboard => onboard(app).await?,
        Command::Me => {
            let me = app.me().await?;
            println!("{} <{}> verified={}", me.username, me.email, me.is_verified);
            if !me.desc.is_empty() {
                println!("{}", me.desc);
            }
        }
        Command::Banks { limit } => {
            for bank in app.banks(limit).await? {
                println!("{}", bank.name);
                for (key, value) in &bank.details {
                    println!("  {}: {}", key, value);
                }
            }
        }
        Command::Articles { limit } => {
            let language = app.language();
            for article in app.articles(limit).await? {
                println!(
                    "[{}] {} ({})",
                    article.importance.unwrap_or_default(),
                    article.title_in(language),
                    article.id
                );
            }
        }
        Command::Article { id } => {
            let language = app.language();
            let article = app.article(&id).await?;
            println!("{}", article.title_in(language));
            if let Some(date) = &article.date {
                println!("{}", date);
            }
            if let Some(content) = article.content_in(language) {
                println!("\n{}", content);
            }
        }
        Command::Summary => {
            let language = app.language();
            let payload = app.daily_summary().await?;
            let summary = &payload.daily_summary;
            if let Some(day) = summary.updated_on() {
                println!("Daily summary for {}", day);
            }
            println!("{}\n\n{}", summary.summary(language), summary.advice(language));
        }
        Command::Chat { message } => {
            let reply = app.chat(message.as_deref()).await?;
            println!("{}", reply.message);
        }
        Command::Tags => {
            let tags = app.preference_tags().await?;
            println!("Banks: {}", tags.banks.join(", "));
            println!("Assets: {}", tags.assets.join(", "));
        }
        Command::UpdateDesc { message } => {
            let update = app.update_description(&message).await?;
            if let Some(reply) = &update.reply {
                println!("{}", reply);
            }
            if update.desc_updated {
                println!("New description: {}", update.new_desc);
            }
        }
        Command::ChangePassword => {
            let current = prompt("Current password: ")?;
            let new = prompt("New password: ")?;
            app.change_password(&current, &new).await?;
            println!("Password changed.");
        }
        Command::DeleteAccount { yes } => {
            if !yes && prompt("Type DELETE to confirm: ")? != "DELETE" {
                println!("Cancelled.");
                return Ok(());
            }
            app.delete_account().await?;
            println!("Account deleted.");
        }
        Command::Language { value } => {
            if let Some(language) = value {
                app.set_language(language);
            }
            println!("{}", app.language());
        }
    }

    Ok(())
}

async fn wait_for_resend(app: &AppContext) -> Result<()> {
    let mut updates = app.countdown().subscribe();
    while !updates.borrow().can_resend() {
        updates.changed().await?;
        print!("\r{}  ", updates.borrow().display());
        io::stdout().flush()?;
    }
    println!("\nYou can request a new code now.");
    Ok(())
}

async fn onboard(app: &mut AppContext) -> Result<()> {
    let route = app.current_route().await?;
    if route != Route::NeedsOnboarding {
        println!("{}", describe_route(route));
        return Ok(());
    }

    let mut sequencer = app.start_onboarding();
    println!("Press enter on an empty line to skip a question.");
    let description = loop {
        let question = *sequencer.current();
        println!("\n({}/{}) {}?", sequencer.index() + 1, sequencer.len(), question.prompt);

        let answer = match question.input {
            InputKind::FreeText => prompt("> ")?,
            InputKind::SingleSelect(options) => {
                for (i, option) in options.iter().enumerate() {
                    println!("  {}. {}", i + 1, option);
                }
                let choice = prompt("> ")?;
                match choice.trim().parse::<usize>() {
                    Ok(n) if (1..=options.len()).contains(&n) => options[n - 1].to_string(),
                    _ => choice,
                }
            }
            InputKind::BankSearch => ask_bank()?,
        };

        let step = if answer.trim().is_empty() {
            sequencer.skip()?
        } else {
            sequencer.advance(&answer)?
        };
        if let Step::Completed(description) = step {
            break description;
        }
    };

    let route = app.submit_onboarding(&description).await?;
    println!("\nThanks! {}", describe_route(route));
    Ok(())
}

fn ask_bank() -> Result<String> {
    let mut search = BankSearch::new();
    loop {
        search.set_query(&prompt("Search banks: ")?);
        if search.query().trim().is_empty() {
            return Ok(String::new());
        }

        let options = search.options();
        for (i, option) in options.iter().enumerate() {
            match option {
                BankOption::Bank(name) => println!("  {}. {}", i + 1, name),
                BankOption::Other => println!("  {}. Other (type it in)", i + 1),
            }
        }

        let choice = prompt("Pick a number, or enter to search again: ")?;
        let Ok(n) = choice.trim().parse::<usize>() else {
            continue;
        };
        let Some(option) = options.get(n.wrapping_sub(1)).copied() else {
            continue;
        };
        match search.select(option) {
            Some(name) => return Ok(name),
            None => return prompt("Your bank: "),
        }
    }
}
