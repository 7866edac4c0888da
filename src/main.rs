use agro_advisor::acquire::{DirectorySource, FileSource, ImageSource};
use agro_advisor::api::HttpApi;
use agro_advisor::auth::{register, Auth};
use agro_advisor::cli::{Cli, Commands};
use agro_advisor::config::Config;
use agro_advisor::error::{AdvisorError, Result};
use agro_advisor::history::{explain_record, History, HistoryView};
use agro_advisor::results::{ResultsLayout, ResultsView};
use agro_advisor::storage::LocalStore;
use agro_advisor::workflow::{cleanup_pending, LeafWorkflow, SaveOutcome, SoilWorkflow};
use agro_advisor::ui;
use agro_advisor_common::{CarriedLeafContext, Lang, RecordKind, Translator};
use anyhow::Context;
use clap::Parser;
use dialoguer::{Input, Select};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Everything a command needs, built once at start-up
struct Session {
    config: Config,
    t: Translator,
    api: HttpApi,
    store: LocalStore,
    auth: Auth,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_filter());

    let config = Config::load().context("failed to load configuration")?;
    let locale = std::env::var("LANG").ok();
    let t = Translator::new(config.resolve_lang(cli.lang, locale.as_deref()));

    // settings commands work even when the backend URL is broken
    match cli.command {
        Commands::Config {
            show,
            set_backend_url,
            set_image_base_url,
            set_timeout,
        } => return config_command(config, &t, show, set_backend_url, set_image_base_url, set_timeout),
        Commands::Language { lang } => return language_command(config, t, lang),
        _ => {}
    }

    let store_path = LocalStore::default_path().context("failed to locate local storage")?;
    let mut store = LocalStore::open(&store_path);
    let api = HttpApi::new(&config).context("failed to create HTTP client")?;
    Auth::restore_session(&api, &store);

    if cleanup_pending(&api, &mut store).await? {
        println!("{}", t.t("leafPredict:cleanupPending"));
    }

    let auth = Auth::check_status(&store);
    let mut session = Session {
        config,
        t,
        api,
        store,
        auth,
    };

    if let Err(e) = run(&mut session, cli.command).await {
        if !matches!(e, AdvisorError::Cancelled) {
            eprintln!("{}", ui::error_line(&e, &session.t, "common:unknown"));
        }
        std::process::exit(1);
    }
    Ok(())
}

async fn run(s: &mut Session, command: Commands) -> Result<()> {
    let t = s.t;
    match command {
        Commands::Login { email } => {
            println!("🔑 {}\n", t.t("login:title"));
            let (email, password) = ui::prompt_login(email, &t)?;
            match s.auth.login(&s.api, &mut s.store, &email, &password, &t).await {
                Ok(message) => println!("✔ {}", message),
                Err(AdvisorError::Validation(errors)) => return Err(AdvisorError::Validation(errors)),
                Err(_) => {
                    let message = s.auth.state().error.clone().unwrap_or_default();
                    println!("✗ {}", t.t_with("login:failed", &[("message", &message)]));
                }
            }
        }

        Commands::Register => {
            println!("📝 {}\n", t.t("registration:title"));
            let form = ui::prompt_registration(&t)?;
            match register(&s.api, &form, &t).await {
                Ok(message) => println!("✔ {}", message),
                Err(e @ (AdvisorError::Validation(_) | AdvisorError::Conflict { .. })) => return Err(e),
                Err(e) => {
                    let message = e.user_message(&t, "common:unknown");
                    println!("✗ {}", t.t_with("registration:errors.server", &[("message", &message)]));
                }
            }
        }

        Commands::Logout => match s.auth.logout(&s.api, &mut s.store).await {
            Ok(()) => println!("✔ {}", t.t("login:logout.success")),
            Err(_) => println!("{}", t.t("login:logout.failed")),
        },

        Commands::Profile => {
            if !s.auth.is_logged_in() {
                println!("{}", t.t("profile:noProfile.title"));
                println!("{}", t.t("profile:noProfile.message"));
                return Ok(());
            }
            let user = s.auth.profile(&s.api).await?;
            ui::print_profile(user, &t);
        }

        Commands::Leaf {
            file,
            library,
            camera,
            with_soil,
        } => {
            let source = image_source(file, library, camera, &t)?;
            leaf_command(s, source.as_ref(), with_soil).await?;
        }

        Commands::Soil => soil_command(s, None).await?,

        Commands::Saved { kind } => {
            println!("📚 {}\n", t.t("saved:title"));
            if !s.auth.is_logged_in() {
                ui::print_sign_in_prompt(&t);
                return Ok(());
            }
            println!("{}", t.t("saved:loading"));
            let history = History::load(&s.auth, &s.api, HistoryView::Saved).await?;
            let records: Vec<_> = match kind {
                Some(kind) => history.by_kind(kind),
                None => history.records().iter().collect(),
            };
            if records.is_empty() {
                println!("{}", t.t("saved:empty"));
            }
            for record in records {
                ui::print_record_line(record, &t);
            }
        }

        Commands::Search { query } => {
            println!("🔍 {}\n", t.t("search:title"));
            if !s.auth.is_logged_in() {
                ui::print_sign_in_prompt(&t);
                return Ok(());
            }
            let history = History::load(&s.auth, &s.api, HistoryView::Search).await?;
            let found = history.search(&query);
            if found.is_empty() {
                println!("{}", t.t("search:empty"));
            } else {
                println!("{}", t.t_with("search:resultsTitle", &[("count", &found.len().to_string())]));
                for record in &found {
                    ui::print_record_line(record, &t);
                }
            }
        }

        Commands::Details { id, explain } => {
            if !s.auth.is_logged_in() {
                ui::print_sign_in_prompt(&t);
                return Ok(());
            }
            let history = History::load(&s.auth, &s.api, HistoryView::Saved).await?;
            let Some(record) = history.find(&id) else {
                println!("{}", t.t_with("saved:notFound", &[("id", &id)]));
                return Ok(());
            };
            ui::print_record(record, &t, &s.config);
            if explain {
                println!("\n{}", t.t("soil-result:buttons.generating"));
                match explain_record(&s.api, record, &t).await {
                    Ok(text) => println!("\n{}\n{}", t.t("saved:explainTitle"), text),
                    Err(_) => println!("{}", t.t("soil-result:gptError.failed")),
                }
            }
        }

        Commands::Delete { id, yes } => {
            if !s.auth.is_logged_in() {
                ui::print_sign_in_prompt(&t);
                return Ok(());
            }
            let mut history = History::load(&s.auth, &s.api, HistoryView::Saved).await?;
            let Some(record) = history.find(&id) else {
                println!("{}", t.t_with("saved:notFound", &[("id", &id)]));
                return Ok(());
            };
            let kind: RecordKind = record.kind();
            ui::print_record_line(record, &t);

            let prompt = t.t("saved:deleteConfirm");
            match history
                .delete(&s.api, kind, &id, || if yes { Ok(true) } else { ui::confirm(&prompt) })
                .await
            {
                Ok(true) => println!("✔ {}", t.t("saved:deleted")),
                Ok(false) => {}
                Err(e) => {
                    let message = e.user_message(&t, "common:unknown");
                    println!("✗ {}", t.t_with("saved:deleteFailed", &[("message", &message)]));
                }
            }
        }

        Commands::Config { .. } | Commands::Language { .. } => {}
    }
    Ok(())
}

/// Source from the flags, or ask when none was given
fn image_source(
    file: Option<PathBuf>,
    library: Option<PathBuf>,
    camera: Option<PathBuf>,
    t: &Translator,
) -> Result<Box<dyn ImageSource>> {
    if let Some(path) = file {
        return Ok(Box::new(FileSource::new(&path)));
    }
    if let Some(dir) = library {
        return Ok(Box::new(DirectorySource::library(&dir, ui::library_chooser(*t))));
    }
    if let Some(dir) = camera {
        return Ok(Box::new(DirectorySource::camera(&dir)));
    }

    let options = [
        t.t("leafPredict:source.camera"),
        t.t("leafPredict:source.library"),
        t.t("leafPredict:source.path"),
    ];
    let choice = Select::new()
        .with_prompt(t.t("leafPredict:source.prompt"))
        .items(&options)
        .default(2)
        .interact_opt()?
        .ok_or(AdvisorError::Cancelled)?;
    let path: String = Input::new()
        .with_prompt(t.t("leafPredict:pathPrompt"))
        .interact_text()?;
    let path = PathBuf::from(path.trim());

    Ok(match choice {
        0 => Box::new(DirectorySource::camera(&path)),
        1 => Box::new(DirectorySource::library(&path, ui::library_chooser(*t))),
        _ => Box::new(FileSource::new(&path)),
    })
}

async fn leaf_command(s: &mut Session, source: &dyn ImageSource, with_soil: bool) -> Result<()> {
    let t = s.t;
    println!("🌿 {}\n", t.t("leafPredict:title"));

    let mut flow = LeafWorkflow::new(t);
    if !flow.select(source)? {
        return Err(AdvisorError::Cancelled);
    }
    if let Some(image) = flow.selection() {
        println!(
            "{}",
            t.t_with(
                "leafPredict:selected",
                &[("file", &image.file_name), ("size", &ui::format_size(image.size_bytes))]
            )
        );
    }

    let (bar, progress) = ui::upload_progress(&t.t("leafPredict:uploading"));
    let uploaded = flow.upload(&s.api, &mut s.store, progress).await;
    bar.finish_and_clear();
    let predicted = match uploaded {
        Ok(_) => {
            println!("{}", t.t("leafPredict:predicting"));
            flow.predict(&s.api).await.cloned()
        }
        Err(e) => Err(e),
    };
    let result = match predicted {
        Ok(result) => result,
        Err(e) => {
            let message = flow
                .error()
                .map(str::to_string)
                .unwrap_or_else(|| e.user_message(&t, "leafPredict:errUnknown"));
            println!("✗ {}", message);
            return Ok(());
        }
    };
    ui::print_prediction(&result, &t);

    if with_soil {
        return soil_command(s, flow.carried_context()).await;
    }

    let actions = [
        t.t("leafPredict:actions.explain"),
        t.t("leafPredict:actions.save"),
        t.t("leafPredict:actions.soil"),
        t.t("leafPredict:actions.done"),
    ];
    loop {
        let choice = Select::new()
            .with_prompt(t.t("leafPredict:actions.prompt"))
            .items(&actions)
            .default(0)
            .interact_opt()?;
        match choice {
            Some(0) => {
                println!("{}", t.t("leafPredict:explaining"));
                match flow.explain(&s.api).await {
                    Ok(text) => println!("\n{}\n", text),
                    Err(_) => println!("✗ {}", flow.explain_error().unwrap_or_default()),
                }
            }
            Some(1) => match flow.save(&s.api, &mut s.store).await {
                Ok(SaveOutcome::Saved(message)) => println!("✔ {}", message),
                Ok(SaveOutcome::AlreadySaved) => println!("{}", t.t("leafPredict:save.locked")),
                Err(_) => {
                    let message = flow.save_error().unwrap_or_default();
                    println!("✗ {}", t.t_with("leafPredict:save.failed", &[("message", message)]));
                }
            },
            Some(2) => return soil_command(s, flow.carried_context()).await,
            _ => return Ok(()),
        }
    }
}

async fn soil_command(s: &mut Session, carried: Option<CarriedLeafContext>) -> Result<()> {
    let t = s.t;
    println!("🧪 {}\n", t.t("soilInput:title"));

    let mut flow = SoilWorkflow::new();
    if let Some(ctx) = carried {
        if flow.apply_carried(ctx) {
            let disease = flow
                .carried()
                .and_then(|c| c.disease.as_deref())
                .map(|d| t.disease_name(d))
                .unwrap_or_default();
            println!("{}", t.t_with("soilInput:carried", &[("disease", &disease)]));
        }
    }
    ui::prompt_soil_form(&mut flow, &t)?;

    println!("{}", t.t("soilInput:submitting"));
    let params = flow.submit(&s.api, &t).await;
    let mut view = ResultsView::new(params, t);
    ui::print_results(&view, &t, &s.config);
    if matches!(view.layout(), ResultsLayout::ErrorBanner(_)) {
        return Ok(());
    }

    let actions = [
        t.t("soil-result:buttons.gptDetails"),
        t.t("soil-result:buttons.save"),
        t.t("soil-result:buttons.done"),
    ];
    loop {
        let choice = Select::new()
            .with_prompt(t.t("leafPredict:actions.prompt"))
            .items(&actions)
            .default(0)
            .interact_opt()?;
        match choice {
            Some(0) => {
                println!("{}", t.t("soil-result:buttons.generating"));
                match view.explain(&s.api).await {
                    Ok(text) => println!("\n{}\n", text),
                    Err(_) => println!("✗ {}", view.explain_error().unwrap_or_default()),
                }
            }
            Some(1) => {
                println!("{}", t.t("soil-result:buttons.saving"));
                match view.save(&s.api, &mut s.store).await {
                    Ok(SaveOutcome::Saved(message)) => println!("✔ {}", message),
                    Ok(SaveOutcome::AlreadySaved) => println!("{}", t.t("soil-result:save.locked")),
                    Err(_) => {
                        let message = view.save_error().unwrap_or_default();
                        println!("✗ {}", t.t_with("soil-result:save.failed", &[("message", message)]));
                    }
                }
            }
            _ => return Ok(()),
        }
    }
}

fn config_command(
    mut config: Config,
    t: &Translator,
    show: bool,
    backend_url: Option<String>,
    image_base_url: Option<String>,
    timeout: Option<u64>,
) -> anyhow::Result<()> {
    let changed = backend_url.is_some() || image_base_url.is_some() || timeout.is_some();
    if let Some(url) = backend_url {
        config.backend_url = url;
    }
    if let Some(url) = image_base_url {
        config.image_base_url = url;
    }
    if let Some(seconds) = timeout {
        config.timeout_seconds = seconds;
    }
    if changed {
        let path = config.save().context("failed to save configuration")?;
        println!("✔ {}", t.t_with("common:config.saved", &[("path", &path.display().to_string())]));
    }

    if show || !changed {
        let lang = config
            .language
            .map(|l| t.lang_name(l))
            .unwrap_or_else(|| t.t("common:notAvailable"));
        println!("  {}: {}", t.t("common:config.backendUrl"), config.backend_url);
        println!("  {}: {}", t.t("common:config.imageBaseUrl"), config.image_base_url);
        println!("  {}: {}", t.t("common:config.timeout"), config.timeout_seconds);
        println!("  {}: {}", t.t("common:config.language"), lang);
        if let Ok(path) = Config::config_path() {
            println!("  {}: {}", t.t("common:config.path"), path.display());
        }
    }
    Ok(())
}

fn language_command(mut config: Config, t: Translator, lang: Option<Lang>) -> anyhow::Result<()> {
    let Some(lang) = lang else {
        println!("{}", t.t_with("common:language.current", &[("lang", &t.lang_name(t.lang()))]));
        return Ok(());
    };
    config.language = Some(lang);
    config.save().context("failed to save configuration")?;

    let t = Translator::new(lang);
    println!("✔ {}", t.t_with("common:language.changed", &[("lang", &t.lang_name(lang))]));
    Ok(())
}
